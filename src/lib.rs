//! Melon Merge - a fruit-merging physics puzzle
//!
//! Core modules:
//! - `ladder`: The fixed fruit evolution table
//! - `sim`: Deterministic engine (body registry, merges, difficulty, overflow, game loop)
//! - `effects`: Particle bursts reacting to merges
//! - `audio`: Merge tones (Web Audio on wasm32)
//! - `tuning`: Data-driven engine constants

pub mod audio;
pub mod effects;
pub mod ladder;
pub mod sim;
pub mod tuning;

pub use ladder::{FRUITS, FruitKind, MAX_RANK, Rank};
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Arena dimensions (pixels, y grows downward)
    pub const ARENA_WIDTH: f32 = 350.0;
    pub const ARENA_HEIGHT: f32 = 500.0;
    /// Thickness of the static floor and side walls
    pub const WALL_THICKNESS: f32 = 20.0;

    /// Height at which dropped fruit spawn
    pub const DROP_Y: f32 = 50.0;
    /// Game-over line: settled fruit whose top edge crosses it ends the run
    pub const CEILING_Y: f32 = 50.0;

    /// Fixed logical step per frame (milliseconds)
    pub const FRAME_STEP_MS: u64 = 20;

    /// Gravity (pixels/s², downward)
    pub const GRAVITY: f32 = 1000.0;
    /// Per-second fraction of velocity lost to air
    pub const AIR_FRICTION: f32 = 0.005;

    /// Highest rank the next-piece generator may offer (Orange)
    pub const RANK_CAP: u8 = 4;
    /// Contact pairs examined per frame
    pub const PAIR_SCAN_CAP: usize = 50;
    /// Merges accepted per frame
    pub const MERGES_PER_FRAME: usize = 3;

    /// Delay before a merged fruit appears
    pub const MERGE_SPAWN_DELAY_MS: u64 = 100;
    /// Delay before merge inputs leave the pending set (must exceed spawn delay)
    pub const PENDING_RELEASE_MS: u64 = 150;
    /// Age after which a fruit counts as settled
    pub const SETTLE_THRESHOLD_MS: u64 = 2000;
    /// Cooldown between drops
    pub const DROP_COOLDOWN_MS: u64 = 500;
}

/// Midpoint of two positions
#[inline]
pub fn midpoint(a: Vec2, b: Vec2) -> Vec2 {
    (a + b) * 0.5
}

/// Whether a point lies inside the arena rectangle `[0, w] x [0, h]`
#[inline]
pub fn in_arena(pos: Vec2, width: f32, height: f32) -> bool {
    pos.x >= 0.0 && pos.x <= width && pos.y >= 0.0 && pos.y <= height
}
