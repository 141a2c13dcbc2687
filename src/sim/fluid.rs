//! Two-way coupling between bodies and the wave field
//!
//! Each body is probed at a fixed pattern of local sample points. Submerged
//! samples contribute buoyancy and drag (relative to the local surface
//! motion) at their own position, which produces torque, and push a
//! reaction impulse back into the wave.

use glam::Vec2;

use super::body::{RigidBody, Shape};
use super::geometry::point_in_polygon;
use super::wave::WaveField;
use crate::consts::{BASE_SIZE, EPSILON};
use crate::cross;
use crate::tuning::Tuning;

/// Upper bound on polygon samples; spacing widens to stay under it
const MAX_POLYGON_SAMPLES: usize = 64;
/// Immersion ratio is clamped to this (bodies can sit below the surface)
const MAX_IMMERSION: f32 = 1.25;

/// Body-local sample pattern for the body's shape
pub fn sample_points(body: &RigidBody, tuning: &Tuning) -> Vec<Vec2> {
    match &body.shape {
        Shape::Box { half } => {
            let step = *half * 0.75;
            let mut out = Vec::with_capacity(9);
            for gy in -1..=1 {
                for gx in -1..=1 {
                    out.push(Vec2::new(gx as f32 * step.x, gy as f32 * step.y));
                }
            }
            out
        }
        Shape::Circle { radius } => {
            let r = radius * 0.7;
            let mut out = Vec::with_capacity(9);
            out.push(Vec2::ZERO);
            for k in 0..8 {
                let a = k as f32 * std::f32::consts::TAU / 8.0;
                out.push(Vec2::new(a.cos(), a.sin()) * r);
            }
            out
        }
        Shape::Polygon { vertices, .. } => polygon_samples(vertices, tuning.polygon_sample_density),
    }
}

/// Grid clipped to the polygon, denser for higher `density`
fn polygon_samples(ring: &[Vec2], density: f32) -> Vec<Vec2> {
    let (lo, hi) = ring
        .iter()
        .fold((Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() || !hi.is_finite() {
        return vec![Vec2::ZERO];
    }
    let extent = hi - lo;
    let mut spacing = (BASE_SIZE / density.max(1.0)).max(2.0);
    loop {
        let nx = (extent.x / spacing).floor() as usize + 1;
        let ny = (extent.y / spacing).floor() as usize + 1;
        if nx * ny <= MAX_POLYGON_SAMPLES * 2 {
            break;
        }
        spacing *= 1.5;
    }
    let nx = (extent.x / spacing).floor() as usize + 1;
    let ny = (extent.y / spacing).floor() as usize + 1;
    let offset = (extent - Vec2::new((nx - 1) as f32, (ny - 1) as f32) * spacing) * 0.5;
    let mut out: Vec<Vec2> = (0..ny)
        .flat_map(|j| (0..nx).map(move |i| lo + offset + Vec2::new(i as f32, j as f32) * spacing))
        .filter(|p| point_in_polygon(*p, ring))
        .take(MAX_POLYGON_SAMPLES)
        .collect();
    if out.is_empty() {
        out.push(Vec2::ZERO);
    }
    out
}

/// Immersion of a body: depth of its lowest point below the surface over its height
pub fn immersion(body: &RigidBody, wave: &WaveField) -> f32 {
    let (lo, hi) = body.aabb();
    let height = (hi.y - lo.y).max(1.0);
    ((hi.y - wave.surface_y(body.pos.x)) / height).clamp(0.0, MAX_IMMERSION)
}

/// Result of probing one body against the water
#[derive(Debug, Clone, Default)]
pub struct FluidForces {
    /// Net force (mass * px/step²)
    pub force: Vec2,
    /// Net torque about the centre of mass
    pub torque: f32,
    /// Fraction of samples under water
    pub submerged: f32,
    /// Immersion ratio (see `immersion`)
    pub immersion: f32,
    /// (x, amount) impulses to inject into the wave
    pub reactions: Vec<(f32, f32)>,
}

/// Buoyancy, drag and flotation for one body
pub fn body_forces(body: &RigidBody, wave: &WaveField, tuning: &Tuning) -> FluidForces {
    let samples = sample_points(body, tuning);
    let share = 1.0 / samples.len().max(1) as f32;
    let (lo, hi) = body.aabb();
    let height = (hi.y - lo.y).max(1.0);
    let g = tuning.fall_gravity();

    let mut out = FluidForces {
        immersion: immersion(body, wave),
        ..Default::default()
    };
    let mut wet = 0usize;

    for local in samples {
        let p = body.to_world(local);
        let depth = p.y - wave.surface_y(p.x);
        if depth <= 0.0 {
            continue;
        }
        wet += 1;
        let f = (depth / height).clamp(0.0, 1.0);
        let mass_share = body.mass * share;

        let buoyancy = Vec2::new(0.0, -g * mass_share * (tuning.buoyancy_base + tuning.buoyancy_submersion * f));

        let fluid_vel = Vec2::new(wave.slope_at(p.x) * tuning.slope_flow, wave.velocity_at(p.x));
        let rel = body.velocity_at(p) - fluid_vel;
        let drag = Vec2::new(-tuning.drag_x * rel.x, -tuning.drag_y * rel.y) * mass_share;

        let force = buoyancy + drag;
        out.force += force;
        out.torque += cross(p - body.pos, force);
        out.reactions.push((p.x, tuning.fluid_reaction_scale * share * rel.y * f.max(0.25)));
    }

    out.submerged = wet as f32 * share;
    if wet == 0 {
        return out;
    }

    // Spring-damper toward the target immersion near the flotation line
    let error = out.immersion - tuning.flotation_target;
    if error.abs() < tuning.flotation_band {
        let spring = -g * body.mass * tuning.flotation_spring * error * height;
        let damper = -tuning.flotation_damper * body.vel.y * body.mass;
        out.force.y += (spring + damper).clamp(-2.0 * g * body.mass, 2.0 * g * body.mass);
    }
    out
}

/// Entry splash size when a body plunges into the water; `None` for gentle entries
pub fn entry_splash(prev_immersion: f32, immersion: f32, vertical_speed: f32, tuning: &Tuning) -> Option<usize> {
    let speed = vertical_speed.abs();
    let plunge = immersion - prev_immersion > 0.18;
    let fast_entry = prev_immersion <= 0.02 && immersion > 0.08 && speed > tuning.entry_splash_speed;
    if !(plunge || fast_entry) || speed <= EPSILON {
        return None;
    }
    Some((4.0 + speed * 0.8).clamp(4.0, 18.0) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::BASE_HALF;
    use crate::sim::geometry;

    fn water() -> WaveField {
        WaveField::new(800.0, 8.0, 300.0)
    }

    #[test]
    fn test_sample_patterns() {
        let tuning = Tuning::default();
        let boxed = RigidBody::new(1, Shape::Box { half: Vec2::splat(BASE_HALF) }, Vec2::ZERO, &tuning);
        assert_eq!(sample_points(&boxed, &tuning).len(), 9);
        let round = RigidBody::new(2, Shape::Circle { radius: 20.0 }, Vec2::ZERO, &tuning);
        assert_eq!(sample_points(&round, &tuning).len(), 9);
        let tri = RigidBody::new(
            3,
            Shape::polygon(vec![Vec2::new(-40.0, 30.0), Vec2::new(40.0, 30.0), Vec2::new(0.0, -40.0)]),
            Vec2::ZERO,
            &tuning,
        );
        let pts = sample_points(&tri, &tuning);
        assert!(pts.len() > 3 && pts.len() <= MAX_POLYGON_SAMPLES);
        if let Shape::Polygon { vertices, .. } = &tri.shape {
            assert!(pts.iter().all(|p| geometry::point_in_polygon(*p, vertices)));
        }
    }

    #[test]
    fn test_dry_body_feels_nothing() {
        let tuning = Tuning::default();
        let body = RigidBody::new(1, Shape::Box { half: Vec2::splat(BASE_HALF) }, Vec2::new(400.0, 100.0), &tuning);
        let f = body_forces(&body, &water(), &tuning);
        assert_eq!(f.force, Vec2::ZERO);
        assert_eq!(f.submerged, 0.0);
        assert!(f.reactions.is_empty());
    }

    #[test]
    fn test_submerged_body_is_pushed_up() {
        let tuning = Tuning::default();
        let body = RigidBody::new(1, Shape::Box { half: Vec2::splat(BASE_HALF) }, Vec2::new(400.0, 400.0), &tuning);
        let f = body_forces(&body, &water(), &tuning);
        assert_eq!(f.submerged, 1.0);
        assert!(f.force.y < -tuning.fall_gravity() * body.mass);
        assert!(f.torque.abs() < 1e-3);
    }

    #[test]
    fn test_drag_opposes_motion() {
        let tuning = Tuning::default();
        let mut body = RigidBody::new(1, Shape::Box { half: Vec2::splat(BASE_HALF) }, Vec2::new(400.0, 400.0), &tuning);
        body.vel = Vec2::new(5.0, 0.0);
        let f = body_forces(&body, &water(), &tuning);
        assert!(f.force.x < 0.0);
    }

    #[test]
    fn test_half_submerged_box_feels_torque_when_tilted_flow() {
        let tuning = Tuning::default();
        let mut body = RigidBody::new(1, Shape::Box { half: Vec2::splat(BASE_HALF) }, Vec2::new(400.0, 300.0), &tuning);
        body.omega = 0.3;
        let f = body_forces(&body, &water(), &tuning);
        // Spinning body is slowed by drag torque
        assert!(f.torque < 0.0);
    }

    #[test]
    fn test_entry_splash_thresholds() {
        let tuning = Tuning::default();
        assert!(entry_splash(0.0, 0.3, 8.0, &tuning).is_some());
        assert!(entry_splash(0.0, 0.1, 1.0, &tuning).is_none());
        assert_eq!(entry_splash(0.0, 0.5, 100.0, &tuning), Some(18));
    }
}
