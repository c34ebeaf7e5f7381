//! Engine tuning
//!
//! Every constant that shapes a run, loadable from JSON so variants (desktop,
//! mobile) can override sizes and timings without code changes.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::ladder::{MAX_RANK, Rank};

/// Data-driven engine constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Arena ===
    pub arena_width: f32,
    pub arena_height: f32,
    /// Spawn height for dropped fruit
    pub drop_y: f32,
    /// Game-over line
    pub ceiling_y: f32,

    // === Physics ===
    /// Logical milliseconds advanced per frame
    pub frame_step_ms: u64,
    pub gravity: f32,
    pub air_friction: f32,

    // === Merging ===
    /// Contact pairs examined per frame
    pub pair_scan_cap: usize,
    /// Merges accepted per frame
    pub merges_per_frame: usize,
    pub merge_spawn_delay_ms: u64,
    pub pending_release_ms: u64,

    // === Rules ===
    pub settle_threshold_ms: u64,
    pub drop_cooldown_ms: u64,
    /// Highest rank the next-piece generator may offer
    pub rank_cap: Rank,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            arena_width: ARENA_WIDTH,
            arena_height: ARENA_HEIGHT,
            drop_y: DROP_Y,
            ceiling_y: CEILING_Y,

            frame_step_ms: FRAME_STEP_MS,
            gravity: GRAVITY,
            air_friction: AIR_FRICTION,

            pair_scan_cap: PAIR_SCAN_CAP,
            merges_per_frame: MERGES_PER_FRAME,
            merge_spawn_delay_ms: MERGE_SPAWN_DELAY_MS,
            pending_release_ms: PENDING_RELEASE_MS,

            settle_threshold_ms: SETTLE_THRESHOLD_MS,
            drop_cooldown_ms: DROP_COOLDOWN_MS,
            rank_cap: RANK_CAP,
        }
    }
}

impl Tuning {
    /// Parse tuning from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let tuning: Tuning = serde_json::from_str(json)?;
        Ok(tuning.validate())
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Frame step in seconds
    #[inline]
    pub fn frame_step_secs(&self) -> f32 {
        self.frame_step_ms as f32 / 1000.0
    }

    /// Correct values the engine cannot run with
    pub fn validate(mut self) -> Self {
        let defaults = Tuning::default();

        if self.frame_step_ms == 0 {
            log::warn!("frame_step_ms must be positive, using {}", defaults.frame_step_ms);
            self.frame_step_ms = defaults.frame_step_ms;
        }
        if !(self.arena_width > 0.0 && self.arena_height > 0.0) {
            log::warn!("arena size must be positive, using defaults");
            self.arena_width = defaults.arena_width;
            self.arena_height = defaults.arena_height;
        }
        if self.pair_scan_cap == 0 {
            log::warn!("pair_scan_cap must be at least 1");
            self.pair_scan_cap = 1;
        }
        if self.merges_per_frame == 0 {
            log::warn!("merges_per_frame must be at least 1");
            self.merges_per_frame = 1;
        }
        if self.pending_release_ms <= self.merge_spawn_delay_ms {
            let fixed = self.merge_spawn_delay_ms + self.frame_step_ms;
            log::warn!(
                "pending_release_ms ({}) must exceed merge_spawn_delay_ms ({}), using {}",
                self.pending_release_ms,
                self.merge_spawn_delay_ms,
                fixed
            );
            self.pending_release_ms = fixed;
        }
        if self.rank_cap > MAX_RANK {
            log::warn!("rank_cap {} beyond ladder, clamping to {}", self.rank_cap, MAX_RANK);
            self.rank_cap = MAX_RANK;
        }
        self
    }
}
