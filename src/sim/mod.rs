//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed logical step per frame
//! - Seeded RNG only
//! - Stable iteration order (by fruit ID)
//! - No rendering or platform dependencies

pub mod difficulty;
pub mod engine;
pub mod merge;
pub mod overflow;
pub mod physics;
pub mod registry;
pub mod scheduler;
pub mod state;

pub use difficulty::NextPieceGenerator;
pub use engine::Engine;
pub use merge::{MergeEvent, MergeResolver};
pub use overflow::OverflowDetector;
pub use physics::{ArenaPhysics, BodyHandle, BodyMaterial, ContactPair, PhysicsWorld};
pub use registry::{BodyRegistry, FruitId, FruitInstance, FruitView};
pub use scheduler::{Deferred, Scheduler};
pub use state::{DropRejected, FrameSnapshot, GameEvent, GamePhase, GameState};
