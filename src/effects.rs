//! Merge particle bursts
//!
//! Purely cosmetic: particles never feed back into the engine. Units are
//! per frame, matching the one-update-per-display-frame loop.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::ladder::{FruitKind, Rank};

/// Maximum particles alive at once
pub const MAX_PARTICLES: usize = 512;
/// Downward acceleration (pixels/frame²)
const PARTICLE_GRAVITY: f32 = 0.1;
/// Horizontal velocity kept per frame
const PARTICLE_DRAG: f32 = 0.98;

/// A particle for visual effects
#[derive(Debug, Clone)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Frames left
    pub life: f32,
    pub max_life: f32,
    /// Current diameter, shrinks with life
    pub size: f32,
    pub max_size: f32,
    pub color: &'static str,
}

impl Particle {
    /// Remaining life in `[0, 1]`, used for opacity
    #[inline]
    pub fn alpha(&self) -> f32 {
        (self.life / self.max_life).clamp(0.0, 1.0)
    }

    /// Advance one frame. Returns false when expired.
    pub fn tick(&mut self) -> bool {
        self.pos += self.vel;
        self.vel.y += PARTICLE_GRAVITY;
        self.vel.x *= PARTICLE_DRAG;
        self.life -= 1.0;
        self.size = self.max_size * self.alpha();
        self.life > 0.0
    }
}

/// Owns live particles and the cosmetic RNG
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
    rng: Pcg32,
    enabled: bool,
}

impl ParticleSystem {
    pub fn new(seed: u64) -> Self {
        Self {
            particles: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
            enabled: true,
        }
    }

    /// Disable bursts (reduced-effects variant); live particles still decay
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Number of particles a burst for `rank` emits
    #[inline]
    pub fn burst_size(rank: Rank) -> usize {
        (8 + rank as usize * 2).min(16)
    }

    /// Ring of particles at a merge point, coloured like the produced fruit
    pub fn burst(&mut self, pos: Vec2, rank: Rank) {
        if !self.enabled {
            return;
        }
        let color = FruitKind::of(rank).color;
        let count = Self::burst_size(rank);

        for i in 0..count {
            if self.particles.len() >= MAX_PARTICLES {
                break;
            }
            let angle = std::f32::consts::TAU * i as f32 / count as f32;
            let speed = self.rng.random_range(2.0..5.0);
            let size = self.rng.random_range(3.0..7.0);
            let life = self.rng.random_range(60.0..90.0);

            self.particles.push(Particle {
                pos,
                // Slight upward bias
                vel: Vec2::new(angle.cos() * speed, angle.sin() * speed - 1.0),
                life,
                max_life: life,
                size,
                max_size: size,
                color,
            });
        }
    }

    /// Advance every particle one frame and drop the expired
    pub fn update(&mut self) {
        self.particles.retain_mut(|p| p.tick());
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_size_grows_then_caps() {
        assert_eq!(ParticleSystem::burst_size(0), 8);
        assert_eq!(ParticleSystem::burst_size(3), 14);
        assert_eq!(ParticleSystem::burst_size(4), 16);
        assert_eq!(ParticleSystem::burst_size(8), 16);
    }

    #[test]
    fn test_burst_uses_output_colour() {
        let mut fx = ParticleSystem::new(1);
        fx.burst(Vec2::new(100.0, 100.0), 2);
        assert_eq!(fx.particles().len(), 12);
        assert!(fx.particles().iter().all(|p| p.color == FruitKind::of(2).color));
    }

    #[test]
    fn test_particles_expire() {
        let mut fx = ParticleSystem::new(1);
        fx.burst(Vec2::new(100.0, 100.0), 0);
        for _ in 0..59 {
            fx.update();
        }
        assert!(!fx.particles().is_empty(), "minimum life is 60 frames");
        for _ in 0..31 {
            fx.update();
        }
        assert!(fx.particles().is_empty());
    }

    #[test]
    fn test_particle_shrinks_and_falls() {
        let mut p = Particle {
            pos: Vec2::ZERO,
            vel: Vec2::new(2.0, -1.0),
            life: 10.0,
            max_life: 10.0,
            size: 4.0,
            max_size: 4.0,
            color: "#fff",
        };
        assert!(p.tick());
        assert!((p.size - 3.6).abs() < 1e-5);
        assert!(p.vel.y > -1.0);
        assert!(p.vel.x < 2.0);
    }

    #[test]
    fn test_disabled_system_emits_nothing() {
        let mut fx = ParticleSystem::new(1);
        fx.set_enabled(false);
        fx.burst(Vec2::ZERO, 5);
        assert!(fx.particles().is_empty());
    }
}
