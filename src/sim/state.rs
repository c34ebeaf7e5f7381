//! Game state and per-frame snapshot types

use std::fmt;

use glam::Vec2;

use super::registry::{FruitId, FruitView};
use crate::effects::Particle;
use crate::ladder::Rank;

/// Lifecycle of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Physics not attached yet; every command is ignored
    Uninitialized,
    /// Physics ready, nothing dropped yet
    Ready,
    /// Active gameplay
    Running,
    /// Run ended; only reset brings the game back
    GameOver,
}

/// Scalar game state
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub phase: GamePhase,
    /// Never decreases within a session
    pub score: u64,
    /// Largest rank dropped or produced this session
    pub highest_rank: Rank,
    /// Rank of the fruit the next drop releases
    pub next_rank: Rank,
    /// Aim position (x) for the next drop
    pub aim_x: f32,
    /// Drop cooldown active
    pub drop_in_flight: bool,
    /// Logical clock (ms)
    pub now: u64,
    /// Frames run this session
    pub frame: u64,
}

impl GameState {
    pub fn new(aim_x: f32) -> Self {
        Self {
            phase: GamePhase::Uninitialized,
            score: 0,
            highest_rank: 0,
            next_rank: 0,
            aim_x,
            drop_in_flight: false,
            now: 0,
            frame: 0,
        }
    }

    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    /// Ready or Running
    #[inline]
    pub fn is_live(&self) -> bool {
        matches!(self.phase, GamePhase::Ready | GamePhase::Running)
    }
}

/// Things that happened during a frame, for UI and effects
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    Dropped { id: FruitId, rank: Rank },
    Merged { pos: Vec2, rank: Rank, points: u64 },
    Spawned { id: FruitId, rank: Rank },
    GameOver { score: u64 },
}

/// Why a drop was refused. Never shown to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropRejected {
    /// Physics not initialized
    NotReady,
    /// Previous drop still cooling down
    InFlight,
    /// Run is over
    GameOver,
    /// Pointer released outside the arena
    OutOfBounds,
}

impl fmt::Display for DropRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let why = match self {
            DropRejected::NotReady => "physics not ready",
            DropRejected::InFlight => "drop in flight",
            DropRejected::GameOver => "game over",
            DropRejected::OutOfBounds => "outside arena",
        };
        f.write_str(why)
    }
}

/// Read-only view published once per frame for rendering
#[derive(Debug, Clone, Default)]
pub struct FrameSnapshot {
    pub fruits: Vec<FruitView>,
    pub particles: Vec<Particle>,
    pub score: u64,
    pub next_rank: Rank,
    pub aim_x: f32,
    pub is_game_over: bool,
    /// Drop guide shown (not in flight, not over)
    pub show_drop_line: bool,
    pub audio_enabled: bool,
}

impl FrameSnapshot {
    /// Fruit of a given rank in the snapshot
    pub fn count_rank(&self, rank: Rank) -> usize {
        self.fruits.iter().filter(|f| f.rank == rank).count()
    }
}
