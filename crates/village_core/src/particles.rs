//! Decorative particle bursts.
//!
//! Particles never feed back into the simulation. They draw from their own
//! RNG stream so that emitting (or not emitting) them cannot shift the
//! random sequence gameplay depends on.

use serde::{Deserialize, Serialize};

use crate::components::Color;
use crate::math::{polar, DVec2};
use crate::rng::SimRng;

/// Per-tick size decay factor.
const SHRINK: f64 = 0.95;

/// Particles smaller than this are dropped.
const MIN_SIZE: f64 = 0.1;

/// Salt mixed into the simulation seed for the particle stream.
const PARTICLE_SEED_SALT: u64 = 0x5eed_0f_d0_57;

/// Shape of a particle burst.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Burst {
    /// Upper bound of the initial speed.
    pub speed: f64,
    /// Nominal lifetime in seconds.
    pub life: f64,
    /// Nominal size.
    pub size: f64,
}

impl Burst {
    /// Burst with the given speed and life at the default size.
    #[must_use]
    pub const fn new(speed: f64, life: f64) -> Self {
        Self {
            speed,
            life,
            size: 5.0,
        }
    }

    /// Override the size.
    #[must_use]
    pub const fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }
}

impl Default for Burst {
    fn default() -> Self {
        Self::new(50.0, 1.0)
    }
}

/// A single decoration particle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// World position.
    pub position: DVec2,
    /// Units per second.
    pub velocity: DVec2,
    /// Remaining seconds.
    pub life: f64,
    /// Current size.
    pub size: f64,
    /// Display color.
    pub color: Color,
}

/// Owner of every live particle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
    rng: SimRng,
}

impl ParticleSystem {
    /// Create an empty system with a stream derived from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            particles: Vec::new(),
            rng: SimRng::from_seed(seed ^ PARTICLE_SEED_SALT),
        }
    }

    /// Emit `count` particles from `origin` in random directions.
    pub fn emit(&mut self, origin: DVec2, color: Color, count: usize, burst: Burst) {
        for _ in 0..count {
            let direction = self.rng.angle();
            let speed = self.rng.next_f64() * burst.speed;
            let life = burst.life * (0.5 + self.rng.next_f64() * 0.5);
            let size = burst.size * (0.5 + self.rng.next_f64() * 0.5);
            self.particles.push(Particle {
                position: origin,
                velocity: polar(direction, speed),
                life,
                size,
                color,
            });
        }
    }

    /// Move, age and shrink every particle, dropping expired ones.
    pub fn update(&mut self, dt: f64) {
        for particle in &mut self.particles {
            particle.position += particle.velocity * dt;
            particle.life -= dt;
            particle.size *= SHRINK;
        }
        self.particles.retain(|p| p.life > 0.0 && p.size >= MIN_SIZE);
    }

    /// Live particles.
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Number of live particles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Whether no particle is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

impl Default for ParticleSystem {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_and_expire() {
        let mut system = ParticleSystem::new(1);
        system.emit(DVec2::ZERO, Color::WHITE, 10, Burst::new(100.0, 0.5));
        assert_eq!(system.len(), 10);

        for _ in 0..60 {
            system.update(1.0 / 60.0);
        }
        assert!(system.is_empty());
    }

    #[test]
    fn test_speed_bounded() {
        let mut system = ParticleSystem::new(3);
        system.emit(DVec2::ZERO, Color::WHITE, 50, Burst::new(150.0, 1.0));
        for p in system.particles() {
            assert!(p.velocity.length() < 150.0 + 1e-9);
            assert!(p.life >= 0.5 && p.life <= 1.0);
        }
    }

    #[test]
    fn test_shrink_removes_tiny() {
        let mut system = ParticleSystem::new(5);
        system.emit(DVec2::ZERO, Color::WHITE, 1, Burst::new(0.0, 1000.0).with_size(0.2));
        for _ in 0..40 {
            system.update(0.001);
        }
        assert!(system.is_empty());
    }
}
