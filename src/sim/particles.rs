//! Spray droplets and glass shards
//!
//! Both follow simple ballistic motion. Droplets fall back into the water
//! and feed their momentum into the wave; shards only fade out.

use std::collections::VecDeque;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::wave::WaveField;
use crate::consts::{BASE_SIZE, EPSILON};
use crate::tuning::Tuning;

/// Margin outside the viewport before a particle is discarded (px)
const OFFSCREEN_MARGIN: f32 = 120.0;

/// A water droplet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Droplet {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Steps lived
    pub age: u32,
    /// Lifetime in steps
    pub life: u32,
}

/// A glass shard
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shard {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub angle: f32,
    pub spin: f32,
    pub age: u32,
    pub life: u32,
    /// Visual variant tag (outline shape picked by the renderer)
    pub variant: u8,
}

#[inline]
fn fade(age: u32, life: u32) -> f32 {
    (1.0 - age as f32 / life.max(1) as f32).clamp(0.0, 1.0)
}

impl Droplet {
    pub fn opacity(&self) -> f32 {
        fade(self.age, self.life)
    }
}

impl Shard {
    pub fn opacity(&self) -> f32 {
        fade(self.age, self.life)
    }
}

/// All live particles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Particles {
    pub droplets: VecDeque<Droplet>,
    pub shards: Vec<Shard>,
}

impl Particles {
    pub fn clear(&mut self) {
        self.droplets.clear();
        self.shards.clear();
    }

    fn push_droplet(&mut self, droplet: Droplet, tuning: &Tuning) {
        if tuning.max_droplets == 0 {
            return;
        }
        while self.droplets.len() >= tuning.max_droplets {
            self.droplets.pop_front();
        }
        self.droplets.push_back(droplet);
    }

    /// Fan of droplets thrown up from a surface point
    pub fn spawn_splash(&mut self, at: Vec2, energy: f32, rng: &mut Pcg32, tuning: &Tuning) {
        if !tuning.spray_enabled {
            return;
        }
        let energy = energy.max(0.0);
        let count = (5.0 + energy * 35.0).clamp(5.0, 24.0) as usize;
        for _ in 0..count {
            let theta = rng.random_range(-85.0f32..85.0).to_radians();
            let speed = (1.3 + energy * 3.0) * rng.random_range(0.5f32..1.3);
            let droplet = Droplet {
                pos: at + Vec2::new(rng.random_range(-16.0..16.0), rng.random_range(-4.0..4.0)),
                vel: Vec2::new(theta.sin(), -theta.cos()) * speed,
                radius: rng.random_range(1.2..4.2),
                age: 0,
                life: rng.random_range(16..46),
            };
            self.push_droplet(droplet, tuning);
        }
    }

    /// Droplets thrown when a body plunges in, biased by its motion
    pub fn spawn_entry_splash(&mut self, at: Vec2, count: usize, body_vel: Vec2, rng: &mut Pcg32, tuning: &Tuning) {
        if !tuning.spray_enabled {
            return;
        }
        let base = 0.9 + body_vel.y.abs() * 0.3;
        for _ in 0..count {
            let theta = rng.random_range(-80.0f32..80.0).to_radians();
            let speed = base * rng.random_range(0.55f32..1.25);
            let droplet = Droplet {
                pos: at + Vec2::new(rng.random_range(-20.0..20.0), rng.random_range(-6.0..4.0)),
                vel: Vec2::new(theta.sin() * speed + body_vel.x * 0.13, -theta.cos() * speed),
                radius: rng.random_range(1.4..4.2),
                age: 0,
                life: rng.random_range(18..45),
            };
            self.push_droplet(droplet, tuning);
        }
    }

    /// Stylised explosion of shards for a broken body; returns how many were spawned
    pub fn spawn_shards(
        &mut self,
        center: Vec2,
        base_vel: Vec2,
        size: f32,
        mass: f32,
        impulse: f32,
        rng: &mut Pcg32,
        tuning: &Tuning,
    ) -> usize {
        let energy = (impulse.max(0.0) / mass.max(EPSILON)).sqrt();
        let size_ratio = size / BASE_SIZE;
        let count = (8.0 + size_ratio * 10.0 + energy * 3.0).round().clamp(6.0, 48.0) as usize;
        let speed = 1.5 + energy * 0.8;
        let mut spawned = 0;
        for _ in 0..count {
            if self.shards.len() >= tuning.max_shards {
                break;
            }
            let dir = rng.random_range(0.0f32..std::f32::consts::TAU);
            let offset = Vec2::new(dir.cos(), dir.sin()) * rng.random_range(0.0..size * 0.4);
            self.shards.push(Shard {
                pos: center + offset,
                vel: base_vel + Vec2::new(dir.cos(), dir.sin()) * speed * rng.random_range(0.4f32..1.2),
                radius: (size * rng.random_range(0.06f32..0.16)).max(1.5),
                angle: rng.random_range(0.0..std::f32::consts::TAU),
                spin: rng.random_range(-0.35..0.35),
                age: 0,
                life: rng.random_range(40..90),
                variant: rng.random_range(0..4),
            });
            spawned += 1;
        }
        spawned
    }

    /// Advance all particles one step; droplets are reabsorbed by the wave in water mode
    pub fn step(&mut self, wave: &mut WaveField, water: bool, bounds: Vec2, tuning: &Tuning) {
        if water {
            self.droplets.retain_mut(|d| {
                d.age += 1;
                d.vel.y += tuning.droplet_gravity;
                d.vel *= tuning.droplet_damping;
                d.pos += d.vel;
                if d.vel.y > 0.0 && d.pos.y >= wave.surface_y(d.pos.x) {
                    let amount = tuning.droplet_reabsorb_gain * d.vel.y * d.radius;
                    wave.apply_reaction_impulse(d.pos.x, amount, tuning.wave_reaction_width);
                    return false;
                }
                d.age < d.life && in_bounds(d.pos, bounds)
            });
        } else {
            self.droplets.clear();
        }

        self.shards.retain_mut(|s| {
            s.age += 1;
            s.vel.y += tuning.shard_gravity;
            s.vel *= tuning.shard_damping;
            s.pos += s.vel;
            s.angle += s.spin;
            s.age < s.life && in_bounds(s.pos, bounds)
        });
    }
}

#[inline]
fn in_bounds(p: Vec2, bounds: Vec2) -> bool {
    p.x > -OFFSCREEN_MARGIN && p.x < bounds.x + OFFSCREEN_MARGIN && p.y < bounds.y + OFFSCREEN_MARGIN
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(7)
    }

    #[test]
    fn test_droplet_cap_evicts_oldest() {
        let tuning = Tuning {
            max_droplets: 8,
            ..Default::default()
        };
        let mut particles = Particles::default();
        let mut rng = rng();
        particles.spawn_splash(Vec2::new(100.0, 100.0), 0.0, &mut rng, &tuning);
        let first = particles.droplets[0];
        particles.spawn_splash(Vec2::new(500.0, 100.0), 0.0, &mut rng, &tuning);
        assert_eq!(particles.droplets.len(), 8);
        assert!(!particles.droplets.contains(&first));
        assert!(particles.droplets.back().is_some_and(|d| d.pos.x > 400.0));
    }

    #[test]
    fn test_falling_droplet_is_reabsorbed() {
        let tuning = Tuning::default();
        let mut wave = WaveField::new(800.0, 8.0, 300.0);
        let mut particles = Particles::default();
        particles.droplets.push_back(Droplet {
            pos: Vec2::new(400.0, 295.0),
            vel: Vec2::new(0.0, 6.0),
            radius: 3.0,
            age: 0,
            life: 100,
        });
        particles.step(&mut wave, true, Vec2::new(800.0, 600.0), &tuning);
        assert!(particles.droplets.is_empty());
        let i = wave.index_for_x(400.0);
        assert!(wave.velocities()[i] > 0.0);
    }

    #[test]
    fn test_land_mode_clears_droplets() {
        let tuning = Tuning::default();
        let mut wave = WaveField::new(800.0, 8.0, 300.0);
        let mut particles = Particles::default();
        particles.spawn_splash(Vec2::new(100.0, 100.0), 1.0, &mut rng(), &tuning);
        particles.step(&mut wave, false, Vec2::new(800.0, 600.0), &tuning);
        assert!(particles.droplets.is_empty());
    }

    #[test]
    fn test_shards_respect_cap_and_fade() {
        let tuning = Tuning {
            max_shards: 5,
            ..Default::default()
        };
        let mut wave = WaveField::new(800.0, 8.0, 300.0);
        let mut particles = Particles::default();
        let n = particles.spawn_shards(Vec2::new(400.0, 100.0), Vec2::ZERO, 56.0, 1.0, 20.0, &mut rng(), &tuning);
        assert_eq!(n, 5);
        assert_eq!(particles.shards.len(), 5);
        let before = particles.shards[0].opacity();
        particles.step(&mut wave, false, Vec2::new(800.0, 600.0), &tuning);
        assert!(particles.shards.iter().all(|s| s.opacity() < before));
        for _ in 0..100 {
            particles.step(&mut wave, false, Vec2::new(800.0, 6000.0), &tuning);
        }
        assert!(particles.shards.is_empty());
    }

    #[test]
    fn test_bigger_breaks_throw_more_shards() {
        let tuning = Tuning::default();
        let mut small = Particles::default();
        let mut large = Particles::default();
        let a = small.spawn_shards(Vec2::ZERO, Vec2::ZERO, 30.0, 0.3, 1.0, &mut rng(), &tuning);
        let b = large.spawn_shards(Vec2::ZERO, Vec2::ZERO, 120.0, 4.0, 60.0, &mut rng(), &tuning);
        assert!(b > a);
    }
}
