//! Fruit evolution ladder
//!
//! Nine fruit types ordered by rank. Two fruit of the same rank merge into
//! one of the next rank; the Watermelon at the top never merges further.

use glam::Vec2;

/// Position of a fruit type in the ladder (0 = Grape)
pub type Rank = u8;

/// Highest rank (Watermelon)
pub const MAX_RANK: Rank = (FRUITS.len() - 1) as Rank;

/// Static description of one fruit type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FruitKind {
    pub name: &'static str,
    /// Collision radius (pixels)
    pub radius: f32,
    /// Score awarded when this fruit is produced by a merge
    pub points: u64,
    pub density: f32,
    pub restitution: f32,
    pub friction: f32,
    /// CSS colour for solid rendering and particles
    pub color: &'static str,
    /// Pixel-art sprite path
    pub sprite: &'static str,
}

pub const FRUITS: [FruitKind; 9] = [
    FruitKind {
        name: "Grape",
        radius: 18.0,
        points: 1,
        density: 0.0008,
        restitution: 0.6,
        friction: 0.4,
        color: "#8b5cf6",
        sprite: "/fruits/grape.png",
    },
    FruitKind {
        name: "Blueberry",
        radius: 25.0,
        points: 6,
        density: 0.001,
        restitution: 0.4,
        friction: 0.6,
        color: "#3b82f6",
        sprite: "/fruits/blueberry.png",
    },
    FruitKind {
        name: "Guava",
        radius: 32.0,
        points: 10,
        density: 0.0012,
        restitution: 0.4,
        friction: 0.7,
        color: "#10b981",
        sprite: "/fruits/guava.png",
    },
    FruitKind {
        name: "Banana",
        radius: 40.0,
        points: 3,
        density: 0.0009,
        restitution: 0.5,
        friction: 0.5,
        color: "#fbbf24",
        sprite: "/fruits/banana.png",
    },
    FruitKind {
        name: "Orange",
        radius: 48.0,
        points: 15,
        density: 0.0013,
        restitution: 0.3,
        friction: 0.7,
        color: "#f97316",
        sprite: "/fruits/orange.png",
    },
    FruitKind {
        name: "Apple",
        radius: 60.0,
        points: 21,
        density: 0.0014,
        restitution: 0.3,
        friction: 0.8,
        color: "#ef4444",
        sprite: "/fruits/apple.png",
    },
    FruitKind {
        name: "Peach",
        radius: 75.0,
        points: 28,
        density: 0.0015,
        restitution: 0.25,
        friction: 0.8,
        color: "#f472b6",
        sprite: "/fruits/peach.png",
    },
    FruitKind {
        name: "Pineapple",
        radius: 95.0,
        points: 36,
        density: 0.0016,
        restitution: 0.2,
        friction: 0.9,
        color: "#eab308",
        sprite: "/fruits/pineapple.png",
    },
    FruitKind {
        name: "Watermelon",
        radius: 115.0,
        points: 45,
        density: 0.0018,
        restitution: 0.15,
        friction: 0.9,
        color: "#22c55e",
        sprite: "/fruits/watermelon.png",
    },
];

impl FruitKind {
    /// Look up a fruit type, clamping out-of-range ranks to Watermelon
    #[inline]
    pub fn of(rank: Rank) -> &'static FruitKind {
        &FRUITS[(rank as usize).min(FRUITS.len() - 1)]
    }

    /// Whether two fruit of this rank can still merge
    #[inline]
    pub fn can_merge(rank: Rank) -> bool {
        rank < MAX_RANK
    }
}

/// Evolution chart slots per row
pub const CHART_COLUMNS: usize = 5;
/// Height of one evolution chart row
pub const CHART_ROW_HEIGHT: f32 = 40.0;

/// Total height of the evolution chart strip
pub fn chart_height() -> f32 {
    FRUITS.len().div_ceil(CHART_COLUMNS) as f32 * CHART_ROW_HEIGHT
}

/// Slot centres of the evolution chart in rank order, for a strip of
/// `width` starting at `top`
pub fn chart_slots(width: f32, top: f32) -> impl Iterator<Item = (Rank, Vec2)> {
    let slot_w = width / CHART_COLUMNS as f32;
    (0..FRUITS.len()).map(move |i| {
        let (row, col) = (i / CHART_COLUMNS, i % CHART_COLUMNS);
        let center = Vec2::new(
            (col as f32 + 0.5) * slot_w,
            top + (row as f32 + 0.5) * CHART_ROW_HEIGHT,
        );
        (i as Rank, center)
    })
}
