//! Game loop driver
//!
//! `Engine` owns every piece of game state and runs one frame as a fixed
//! pipeline:
//!
//! 1. Physics step
//! 2. Merge resolution (claims, removals, score)
//! 3. Deferred callbacks that came due (merged spawns, releases, cooldown)
//! 4. Snapshot of live positions
//! 5. Overflow check
//! 6. Particle decay
//!
//! A fruit spawned in stage 3 is absent from the contact list stage 2 read,
//! so a merge output can only merge again from the following frame on.

use glam::Vec2;

use super::difficulty::NextPieceGenerator;
use super::merge::{MergeEvent, MergeResolver};
use super::overflow::OverflowDetector;
use super::physics::{ArenaPhysics, PhysicsWorld};
use super::registry::{BodyRegistry, FruitId, FruitView};
use super::scheduler::{Deferred, Scheduler};
use super::state::{DropRejected, FrameSnapshot, GameEvent, GamePhase, GameState};
use crate::audio::{MergeAudio, ToneSink};
use crate::effects::ParticleSystem;
use crate::in_arena;
use crate::ladder::{FruitKind, Rank};
use crate::tuning::Tuning;

/// The merge game, generic over its physics backend
#[derive(Debug)]
pub struct Engine<P: PhysicsWorld> {
    tuning: Tuning,
    physics: Option<P>,
    registry: BodyRegistry,
    resolver: MergeResolver,
    generator: NextPieceGenerator,
    overflow: OverflowDetector,
    scheduler: Scheduler,
    particles: ParticleSystem,
    audio: MergeAudio,
    state: GameState,
    snapshot: FrameSnapshot,
    events: Vec<GameEvent>,
}

impl Engine<ArenaPhysics> {
    /// Engine with the built-in arena physics already attached
    pub fn with_arena(tuning: Tuning, seed: u64) -> Self {
        let physics = ArenaPhysics::from_tuning(&tuning);
        let mut engine = Self::new(tuning, seed);
        engine.attach_physics(physics);
        engine
    }
}

impl<P: PhysicsWorld> Engine<P> {
    /// Create an engine waiting for its physics world
    pub fn new(tuning: Tuning, seed: u64) -> Self {
        let tuning = tuning.validate();
        let mut engine = Self {
            physics: None,
            registry: BodyRegistry::new(),
            resolver: MergeResolver::new(tuning.pair_scan_cap, tuning.merges_per_frame),
            generator: NextPieceGenerator::new(seed, tuning.rank_cap),
            overflow: OverflowDetector::new(tuning.ceiling_y, tuning.settle_threshold_ms),
            scheduler: Scheduler::new(),
            particles: ParticleSystem::new(seed ^ 0x9e37_79b9_7f4a_7c15),
            audio: MergeAudio::new(),
            state: GameState::new(tuning.arena_width / 2.0),
            snapshot: FrameSnapshot::default(),
            events: Vec::new(),
            tuning,
        };
        engine.publish(Vec::new());
        engine
    }

    /// Physics finished initializing: Uninitialized -> Ready
    pub fn attach_physics(&mut self, physics: P) -> bool {
        if self.physics.is_some() {
            log::warn!("Physics already attached, ignoring");
            return false;
        }
        self.physics = Some(physics);
        self.state.phase = GamePhase::Ready;
        self.state.next_rank = 0;
        self.publish(Vec::new());
        log::info!("Physics ready");
        true
    }

    /// Audio started after a user gesture
    pub fn enable_audio(&mut self, sink: Box<dyn ToneSink>) {
        self.audio.enable(sink);
        self.snapshot.audio_enabled = true;
    }

    pub fn audio_mut(&mut self) -> &mut MergeAudio {
        &mut self.audio
    }

    /// Toggle particle bursts
    pub fn set_particles_enabled(&mut self, enabled: bool) {
        self.particles.set_enabled(enabled);
    }

    // === Commands ===

    /// Move the drop guide. Ignored before Ready, after game over and while a
    /// drop is in flight.
    pub fn set_aim_x(&mut self, x: f32) -> bool {
        if !self.state.is_live() || self.state.drop_in_flight {
            return false;
        }
        self.state.aim_x = self.clamp_aim(x, self.state.next_rank);
        self.snapshot.aim_x = self.state.aim_x;
        true
    }

    /// Drop the next fruit at the current aim
    pub fn request_drop(&mut self) -> Result<FruitId, DropRejected> {
        self.check_drop()?;
        let Some(physics) = self.physics.as_mut() else {
            return Err(DropRejected::NotReady);
        };

        let rank = self.state.next_rank;
        let x = clamp_to_arena(self.state.aim_x, rank, self.tuning.arena_width);
        let id = self.registry.spawn(
            physics,
            Vec2::new(x, self.tuning.drop_y),
            rank,
            self.state.now,
        );

        self.state.phase = GamePhase::Running;
        self.state.drop_in_flight = true;
        self.scheduler.schedule(
            self.state.now,
            self.tuning.drop_cooldown_ms,
            Deferred::EndDropCooldown,
        );

        self.state.highest_rank = self.state.highest_rank.max(rank);
        self.state.next_rank = self.generator.next(self.state.highest_rank);
        self.events.push(GameEvent::Dropped { id, rank });
        self.snapshot.show_drop_line = false;
        self.snapshot.next_rank = self.state.next_rank;
        log::debug!("Dropped {} at x={:.1}", FruitKind::of(rank).name, x);
        Ok(id)
    }

    /// Drop from a pointer release; positions outside the arena are ignored
    pub fn request_drop_at(&mut self, pointer: Vec2) -> Result<FruitId, DropRejected> {
        self.check_drop()?;
        if !in_arena(pointer, self.tuning.arena_width, self.tuning.arena_height) {
            log::trace!("Drop rejected: pointer {:?} outside arena", pointer);
            return Err(DropRejected::OutOfBounds);
        }
        self.request_drop()
    }

    /// Start over. Always succeeds; tasks scheduled before the reset become
    /// no-ops.
    pub fn reset(&mut self) {
        match self.physics.as_mut() {
            Some(physics) => self.registry.clear(physics),
            None => self.registry.forget_all(),
        }
        self.resolver.clear();
        self.scheduler.new_session();
        self.particles.clear();
        self.events.clear();

        self.state = GameState::new(self.tuning.arena_width / 2.0);
        if self.physics.is_some() {
            self.state.phase = GamePhase::Ready;
        }
        self.publish(Vec::new());
        log::info!("Game reset");
    }

    /// Spawn a fruit directly (merge outputs, debugging, scripted setups)
    pub fn spawn_fruit(&mut self, pos: Vec2, rank: Rank) -> Option<FruitId> {
        let physics = self.physics.as_mut()?;
        Some(self.registry.spawn(physics, pos, rank, self.state.now))
    }

    // === Frame pipeline ===

    /// Run one display frame
    pub fn frame(&mut self) -> &FrameSnapshot {
        match self.state.phase {
            GamePhase::Uninitialized => return &self.snapshot,
            GamePhase::GameOver => {
                // Frozen board; let the last particles finish
                self.particles.update();
                self.snapshot.particles = self.particles.particles().to_vec();
                return &self.snapshot;
            }
            GamePhase::Ready | GamePhase::Running => {}
        }

        self.state.now += self.tuning.frame_step_ms;
        self.state.frame += 1;

        self.step_physics();
        self.resolve_merges();
        self.run_deferred();
        let fruits = self.take_snapshot();
        self.check_overflow(&fruits);
        self.particles.update();
        self.publish(fruits);

        &self.snapshot
    }

    fn step_physics(&mut self) {
        if let Some(physics) = self.physics.as_mut() {
            physics.step(self.tuning.frame_step_secs());
        }
    }

    fn resolve_merges(&mut self) {
        let Some(physics) = self.physics.as_mut() else {
            return;
        };
        let merges: Vec<MergeEvent> = self.resolver.collect(&*physics, &self.registry);
        if merges.is_empty() {
            return;
        }

        let now = self.state.now;
        for merge in &merges {
            self.particles.burst(merge.pos, merge.rank);
            self.audio.play_merge(merge.rank);
            for id in merge.inputs {
                self.registry.remove(physics, id);
            }
            self.state.score += merge.points;
            raise_highest(&mut self.state, &mut self.generator, merge.rank);

            self.scheduler.schedule(
                now,
                self.tuning.merge_spawn_delay_ms,
                Deferred::SpawnMerged {
                    pos: merge.pos,
                    rank: merge.rank,
                },
            );
            self.scheduler.schedule(
                now,
                self.tuning.pending_release_ms,
                Deferred::ReleasePending {
                    bodies: merge.bodies,
                },
            );
            self.events.push(GameEvent::Merged {
                pos: merge.pos,
                rank: merge.rank,
                points: merge.points,
            });
            log::debug!(
                "Merged into {} (+{}) at ({:.0}, {:.0})",
                FruitKind::of(merge.rank).name,
                merge.points,
                merge.pos.x,
                merge.pos.y
            );
        }
    }

    fn run_deferred(&mut self) {
        for task in self.scheduler.take_due(self.state.now) {
            match task {
                Deferred::SpawnMerged { pos, rank } => {
                    if let Some(id) = self.spawn_fruit(pos, rank) {
                        self.events.push(GameEvent::Spawned { id, rank });
                    }
                }
                Deferred::ReleasePending { bodies } => self.resolver.release(&bodies),
                Deferred::EndDropCooldown => self.state.drop_in_flight = false,
            }
        }
    }

    fn take_snapshot(&self) -> Vec<FruitView> {
        match self.physics.as_ref() {
            Some(physics) => self.registry.snapshot(physics),
            None => Vec::new(),
        }
    }

    fn check_overflow(&mut self, fruits: &[FruitView]) {
        if let Some(fruit) = self.overflow.find_overflow(fruits, self.state.now) {
            self.state.phase = GamePhase::GameOver;
            self.events.push(GameEvent::GameOver {
                score: self.state.score,
            });
            log::info!(
                "Game over: {} crossed the line (score {})",
                FruitKind::of(fruit.rank).name,
                self.state.score
            );
        }
    }

    fn publish(&mut self, fruits: Vec<FruitView>) {
        self.snapshot = FrameSnapshot {
            fruits,
            particles: self.particles.particles().to_vec(),
            score: self.state.score,
            next_rank: self.state.next_rank,
            aim_x: self.state.aim_x,
            is_game_over: self.state.is_game_over(),
            show_drop_line: self.state.is_live() && !self.state.drop_in_flight,
            audio_enabled: self.audio.is_enabled(),
        };
    }

    // === Helpers ===

    fn check_drop(&self) -> Result<(), DropRejected> {
        match self.state.phase {
            GamePhase::Uninitialized => Err(DropRejected::NotReady),
            GamePhase::GameOver => Err(DropRejected::GameOver),
            _ if self.state.drop_in_flight => Err(DropRejected::InFlight),
            _ => Ok(()),
        }
    }

    fn clamp_aim(&self, x: f32, rank: Rank) -> f32 {
        clamp_to_arena(x, rank, self.tuning.arena_width)
    }

    // === Accessors ===

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Snapshot published by the last frame or command
    pub fn snapshot(&self) -> &FrameSnapshot {
        &self.snapshot
    }

    /// Events since the last call
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn registry(&self) -> &BodyRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &MergeResolver {
        &self.resolver
    }

    pub fn physics(&self) -> Option<&P> {
        self.physics.as_ref()
    }

    pub fn physics_mut(&mut self) -> Option<&mut P> {
        self.physics.as_mut()
    }

    pub fn is_ready(&self) -> bool {
        self.physics.is_some()
    }
}

/// Widen the droppable range when a bigger fruit appears
fn raise_highest(state: &mut GameState, generator: &mut NextPieceGenerator, rank: Rank) {
    if rank > state.highest_rank {
        state.highest_rank = rank;
        state.next_rank = generator.next(rank);
        log::debug!("New largest fruit: {}", FruitKind::of(rank).name);
    }
}

/// Keep a fruit of `rank` fully inside the side walls
fn clamp_to_arena(x: f32, rank: Rank, width: f32) -> f32 {
    let r = FruitKind::of(rank).radius;
    x.clamp(r, (width - r).max(r))
}
