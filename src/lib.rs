//! Slop Sandbox - an interactive real-time 2D physics sandbox
//!
//! Core modules:
//! - `sim`: Deterministic simulation (wave field, rigid bodies, collisions, welds, fracture)
//! - `sandbox`: Simulation controller (fixed-step clock, input routing, snapshots)
//! - `tuning`: Flat set of tuning knobs with documented defaults and ranges

pub mod sandbox;
pub mod sim;
pub mod tuning;

pub use sandbox::Sandbox;
pub use tuning::Tuning;

use glam::Vec2;

/// Engine configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz); body velocities are expressed in px/step
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum whole steps run per clock tick (bounds catch-up work)
    pub const MAX_STEPS_PER_TICK: u32 = 12;
    /// Largest wall-clock delta a single tick will account for (seconds)
    pub const MAX_TICK_ELAPSED: f32 = 0.25;

    /// Reference body edge length (px); reference square area is its square
    pub const BASE_SIZE: f32 = 56.0;
    pub const BASE_HALF: f32 = BASE_SIZE * 0.5;
    pub const REFERENCE_AREA: f32 = BASE_SIZE * BASE_SIZE;

    /// Ground slab half thickness (px), land mode
    pub const GROUND_HALF_THICKNESS: f32 = 24.0;
    /// Ground centre as a fraction of viewport height
    pub const GROUND_CENTER_FRACTION: f32 = 0.74;
    /// Water rest line as a fraction of viewport height
    pub const WATER_BASELINE_FRACTION: f32 = 0.58;

    /// Spawn log length before the oldest half is dropped
    pub const SPAWN_LOG_CAP: usize = 4096;
    /// Freeform strokes are reduced to at most this many points before hulling
    pub const FREEFORM_MAX_POINTS: usize = 48;
    /// Maximum vertices kept in a reduced collision ring
    pub const COLLISION_RING_MAX: usize = 12;

    /// Glass grace period after the flag is toggled on (steps)
    pub const GLASS_GRACE_STEPS: u32 = 60;

    /// Division guard used throughout the engine
    pub const EPSILON: f32 = 1.0e-6;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Rotate a vector counter-clockwise (in math orientation) by `angle` radians
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    let (s, c) = angle.sin_cos();
    Vec2::new(v.x * c - v.y * s, v.x * s + v.y * c)
}

/// Scalar 2D cross product `a.x * b.y - a.y * b.x`
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Velocity of a point at offset `r` on a body spinning at `omega` (ω × r)
#[inline]
pub fn perp_cross(omega: f32, r: Vec2) -> Vec2 {
    Vec2::new(-omega * r.y, omega * r.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_normalize_angle_wraps() {
        assert!((normalize_angle(3.0 * PI + 0.5) - (-PI + 0.5)).abs() < 1e-4);
        assert!((normalize_angle(-2.0 * PI - 0.25) + 0.25).abs() < 1e-4);
        assert!((normalize_angle(-FRAC_PI_2) + FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let r = rotate(Vec2::new(1.0, 0.0), FRAC_PI_2);
        assert!(r.x.abs() < 1e-6);
        assert!((r.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_perp_cross_matches_cross() {
        // (ω × r) · d == ω * (r × d)
        let r = Vec2::new(3.0, -2.0);
        let d = Vec2::new(0.5, 1.5);
        let omega = 0.7;
        assert!((perp_cross(omega, r).dot(d) - omega * cross(r, d)).abs() < 1e-5);
    }
}
