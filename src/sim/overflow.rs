//! Overflow detection
//!
//! Only settled fruit count: a fruit spawned above the line (every drop is)
//! gets `settle_threshold_ms` to fall before it can end the run.

use super::registry::FruitView;
use crate::ladder::FruitKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverflowDetector {
    pub ceiling_y: f32,
    pub settle_threshold_ms: u64,
}

impl OverflowDetector {
    pub fn new(ceiling_y: f32, settle_threshold_ms: u64) -> Self {
        Self {
            ceiling_y,
            settle_threshold_ms,
        }
    }

    /// Old enough to be judged
    #[inline]
    pub fn is_settled(&self, fruit: &FruitView, now: u64) -> bool {
        now.saturating_sub(fruit.created_at) > self.settle_threshold_ms
    }

    /// Top edge above the ceiling line
    #[inline]
    pub fn crosses_ceiling(&self, fruit: &FruitView) -> bool {
        fruit.pos.y - FruitKind::of(fruit.rank).radius < self.ceiling_y
    }

    /// First settled fruit crossing the line, if any
    pub fn find_overflow<'a>(&self, fruits: &'a [FruitView], now: u64) -> Option<&'a FruitView> {
        fruits
            .iter()
            .find(|f| self.is_settled(f, now) && self.crosses_ceiling(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::registry::FruitId;
    use glam::Vec2;

    fn fruit(y: f32, created_at: u64) -> FruitView {
        FruitView {
            id: FruitId(0),
            pos: Vec2::new(100.0, y),
            rank: 0,
            created_at,
        }
    }

    #[test]
    fn test_fresh_fruit_above_line_ignored() {
        let detector = OverflowDetector::new(50.0, 2000);
        let fruits = [fruit(50.0, 1000)];
        assert!(detector.find_overflow(&fruits, 3000).is_none());
    }

    #[test]
    fn test_settled_fruit_above_line_overflows() {
        let detector = OverflowDetector::new(50.0, 2000);
        let fruits = [fruit(50.0, 1000)];
        assert!(detector.find_overflow(&fruits, 3001).is_some());
    }

    #[test]
    fn test_settled_fruit_below_line_ok() {
        let detector = OverflowDetector::new(50.0, 2000);
        // Grape radius 18: top edge at 68 - 18 = 50, not above the line
        let fruits = [fruit(68.0, 0)];
        assert!(detector.find_overflow(&fruits, 10_000).is_none());
        let fruits = [fruit(67.9, 0)];
        assert!(detector.find_overflow(&fruits, 10_000).is_some());
    }

    #[test]
    fn test_clock_before_creation_is_not_settled() {
        let detector = OverflowDetector::new(50.0, 2000);
        assert!(!detector.is_settled(&fruit(10.0, 5000), 100));
    }
}
