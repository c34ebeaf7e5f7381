//! Merge resolution
//!
//! Once per frame, after the physics step: walk the touching pairs, pick the
//! same-rank fruit that may merge, and claim their bodies so nothing consumes
//! them twice while their removal and the merged spawn are still in flight.

use std::collections::HashSet;

use glam::Vec2;

use super::physics::{BodyHandle, PhysicsWorld};
use super::registry::{BodyRegistry, FruitId, FruitInstance};
use crate::ladder::{FruitKind, Rank};
use crate::midpoint;

/// An accepted merge, captured before its inputs are removed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeEvent {
    pub inputs: [FruitId; 2],
    pub bodies: [BodyHandle; 2],
    /// Midpoint of the inputs at merge time
    pub pos: Vec2,
    /// Rank of the fruit the merge produces
    pub rank: Rank,
    /// Score awarded for the produced fruit
    pub points: u64,
}

/// Selects merges and tracks bodies claimed as merge inputs
#[derive(Debug, Clone)]
pub struct MergeResolver {
    /// Bodies claimed but not yet released
    pending: HashSet<BodyHandle>,
    pair_scan_cap: usize,
    merges_per_frame: usize,
}

impl MergeResolver {
    pub fn new(pair_scan_cap: usize, merges_per_frame: usize) -> Self {
        Self {
            pending: HashSet::new(),
            pair_scan_cap: pair_scan_cap.max(1),
            merges_per_frame: merges_per_frame.max(1),
        }
    }

    /// Whether two fruit may merge right now
    pub fn is_eligible(&self, a: &FruitInstance, b: &FruitInstance) -> bool {
        a.rank == b.rank
            && FruitKind::can_merge(a.rank)
            && !self.pending.contains(&a.body)
            && !self.pending.contains(&b.body)
    }

    /// Scan this step's contacts and claim up to `merges_per_frame` pairs.
    ///
    /// Pairs beyond the cap stay unclaimed and are picked up by a later scan.
    pub fn collect<P: PhysicsWorld>(
        &mut self,
        physics: &P,
        registry: &BodyRegistry,
    ) -> Vec<MergeEvent> {
        let mut merges = Vec::new();

        for pair in physics.contacts().iter().take(self.pair_scan_cap) {
            // Walls, floor and half-removed bodies carry no fruit
            let (Some(a), Some(b)) = (registry.fruit_for(pair.a), registry.fruit_for(pair.b))
            else {
                continue;
            };
            if !self.is_eligible(a, b) {
                continue;
            }
            let (Some(pos_a), Some(pos_b)) = (physics.position(a.body), physics.position(b.body))
            else {
                continue;
            };

            self.pending.insert(a.body);
            self.pending.insert(b.body);

            let rank = a.rank + 1;
            merges.push(MergeEvent {
                inputs: [a.id, b.id],
                bodies: [a.body, b.body],
                pos: midpoint(pos_a, pos_b),
                rank,
                points: FruitKind::of(rank).points,
            });

            if merges.len() >= self.merges_per_frame {
                break;
            }
        }

        merges
    }

    /// Return claimed bodies to the eligible pool
    pub fn release(&mut self, bodies: &[BodyHandle]) {
        for body in bodies {
            self.pending.remove(body);
        }
    }

    pub fn is_pending(&self, body: BodyHandle) -> bool {
        self.pending.contains(&body)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::MAX_RANK;
    use crate::sim::physics::{ArenaPhysics, BodyMaterial};
    use proptest::prelude::*;

    fn world() -> ArenaPhysics {
        ArenaPhysics::new(350.0, 500.0, 1000.0, 0.005)
    }

    /// Place fruit side by side on the floor, each overlapping its neighbour
    /// by a pixel, and step once so the contacts are reported
    fn touching_row(physics: &mut ArenaPhysics, reg: &mut BodyRegistry, ranks: &[Rank]) {
        let mut x = 10.0;
        for &rank in ranks {
            let r = FruitKind::of(rank).radius;
            x += r;
            reg.spawn(physics, Vec2::new(x, 500.0 - r), rank, 0);
            x += r - 1.0;
        }
        physics.step(0.001);
    }

    #[test]
    fn test_same_rank_pair_merges() {
        let mut physics = world();
        let mut reg = BodyRegistry::new();
        touching_row(&mut physics, &mut reg, &[0, 0]);

        let mut resolver = MergeResolver::new(50, 3);
        let merges = resolver.collect(&physics, &reg);
        assert_eq!(merges.len(), 1);
        assert_eq!(merges[0].rank, 1);
        assert_eq!(merges[0].points, FruitKind::of(1).points);
        assert!(resolver.is_pending(merges[0].bodies[0]));
        assert!(resolver.is_pending(merges[0].bodies[1]));
    }

    #[test]
    fn test_merge_point_is_midpoint() {
        let mut physics = world();
        let mut reg = BodyRegistry::new();
        touching_row(&mut physics, &mut reg, &[2, 2]);

        let views = reg.snapshot(&physics);
        let mut resolver = MergeResolver::new(50, 3);
        let merges = resolver.collect(&physics, &reg);
        assert_eq!(merges[0].pos, midpoint(views[0].pos, views[1].pos));
    }

    #[test]
    fn test_different_ranks_do_not_merge() {
        let mut physics = world();
        let mut reg = BodyRegistry::new();
        touching_row(&mut physics, &mut reg, &[0, 1]);

        let mut resolver = MergeResolver::new(50, 3);
        assert!(resolver.collect(&physics, &reg).is_empty());
        assert_eq!(resolver.pending_len(), 0);
    }

    #[test]
    fn test_watermelons_never_merge() {
        let mut physics = world();
        let mut reg = BodyRegistry::new();
        touching_row(&mut physics, &mut reg, &[MAX_RANK, MAX_RANK]);

        let mut resolver = MergeResolver::new(50, 3);
        assert!(resolver.collect(&physics, &reg).is_empty());
    }

    #[test]
    fn test_untagged_bodies_ignored() {
        let mut physics = world();
        let reg = BodyRegistry::new();
        let mat = BodyMaterial {
            density: 0.001,
            restitution: 0.4,
            friction: 0.5,
        };
        physics.add_circle(Vec2::new(100.0, 482.0), 18.0, mat);
        physics.add_circle(Vec2::new(135.0, 482.0), 18.0, mat);
        physics.step(0.001);
        assert!(!physics.contacts().is_empty());

        let mut resolver = MergeResolver::new(50, 3);
        assert!(resolver.collect(&physics, &reg).is_empty());
    }

    #[test]
    fn test_body_not_claimed_twice_in_one_scan() {
        // Three touching grapes: the middle one touches both neighbours
        let mut physics = world();
        let mut reg = BodyRegistry::new();
        touching_row(&mut physics, &mut reg, &[0, 0, 0]);

        let mut resolver = MergeResolver::new(50, 3);
        let merges = resolver.collect(&physics, &reg);
        assert_eq!(merges.len(), 1, "middle grape can only be consumed once");
    }

    #[test]
    fn test_pending_blocks_next_scan_until_released() {
        let mut physics = world();
        let mut reg = BodyRegistry::new();
        touching_row(&mut physics, &mut reg, &[0, 0]);

        let mut resolver = MergeResolver::new(50, 3);
        let merges = resolver.collect(&physics, &reg);
        assert_eq!(merges.len(), 1);
        assert!(resolver.collect(&physics, &reg).is_empty());

        resolver.release(&merges[0].bodies);
        assert_eq!(resolver.collect(&physics, &reg).len(), 1);
    }

    #[test]
    fn test_per_frame_cap_defers_excess() {
        let mut physics = world();
        let mut reg = BodyRegistry::new();
        // Four separated same-rank pairs
        for i in 0..4 {
            let x = 20.0 + i as f32 * 80.0;
            reg.spawn(&mut physics, Vec2::new(x, 482.0), 0, 0);
            reg.spawn(&mut physics, Vec2::new(x + 35.0, 482.0), 0, 0);
        }
        physics.step(0.001);

        let mut resolver = MergeResolver::new(50, 3);
        assert_eq!(resolver.collect(&physics, &reg).len(), 3);
        assert_eq!(resolver.collect(&physics, &reg).len(), 1);
    }

    #[test]
    fn test_scan_cap_limits_pairs_examined() {
        let mut physics = world();
        let mut reg = BodyRegistry::new();
        // First contact is a mismatched pair, second a matching one
        touching_row(&mut physics, &mut reg, &[1, 0, 0]);

        let mut capped = MergeResolver::new(1, 3);
        assert!(capped.collect(&physics, &reg).is_empty());
        let mut open = MergeResolver::new(50, 3);
        assert_eq!(open.collect(&physics, &reg).len(), 1);
    }

    proptest! {
        #[test]
        fn prop_no_body_consumed_twice(ranks in proptest::collection::vec(0u8..2, 2..7)) {
            let mut physics = world();
            let mut reg = BodyRegistry::new();
            touching_row(&mut physics, &mut reg, &ranks);

            let mut resolver = MergeResolver::new(50, 3);
            let mut seen = HashSet::new();
            for _ in 0..4 {
                for merge in resolver.collect(&physics, &reg) {
                    for body in merge.bodies {
                        prop_assert!(seen.insert(body), "body {:?} claimed twice", body);
                    }
                }
            }
        }
    }
}
