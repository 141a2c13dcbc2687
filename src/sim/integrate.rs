//! Force integration and world bounds
//!
//! - `integrate` applies gravity (and fluid forces in water), then advances
//!   velocity and pose by one substep
//! - `confine` keeps bodies inside the viewport walls and resolves contact
//!   against the flat ground line (seabed in water)
//! - `substep_count` picks the adaptive substep count

use glam::Vec2;

use super::body::{RigidBody, Shape};
use super::fluid::{FluidForces, body_forces};
use super::solver::Impact;
use super::wave::WaveField;
use crate::consts::EPSILON;
use crate::tuning::Tuning;
use crate::{cross, normalize_angle};

/// Vertices within this distance of the lowest point count as support (px)
const SUPPORT_TOLERANCE: f32 = 1.0;
/// Boxes within this angle of axis-aligned may be snapped flat when settling
const SNAP_WINDOW: f32 = 10.0 * std::f32::consts::PI / 180.0;
/// One substep per this much speed (px/step)
const SPEED_PER_SUBSTEP: f32 = 5.0;
const MAX_SUBSTEPS: u32 = 6;

/// Playfield extents for a step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
    /// Screen y of the top of the ground (or seabed)
    pub ground_top: f32,
}

/// Advance every free body by one substep; returns wave reaction impulses (x, amount)
pub fn integrate(bodies: &mut [RigidBody], wave: Option<&WaveField>, tuning: &Tuning, step_scale: f32) -> Vec<(f32, f32)> {
    let g = tuning.fall_gravity();
    let mut reactions = Vec::new();
    for body in bodies.iter_mut() {
        if body.dragged {
            continue;
        }
        let fluid = wave.map(|w| body_forces(body, w, tuning)).unwrap_or_default();
        let FluidForces { force, torque, submerged, .. } = fluid;
        let force = force + Vec2::new(0.0, g * body.mass);

        body.vel += force / body.mass.max(EPSILON) * step_scale;
        body.omega += torque / body.inertia.max(EPSILON) * step_scale;

        if submerged > 0.0 {
            body.omega *= (1.0 - tuning.drag_angular * submerged * step_scale).max(0.0);
        }
        body.omega *= tuning.air_angular_damping.powf(step_scale);
        // Linear air drag only over water so land free fall stays exact
        if wave.is_some() {
            body.vel *= tuning.air_damping.powf(step_scale);
        }

        body.clamp_velocity(tuning);
        body.pos += body.vel * step_scale;
        body.angle = normalize_angle(body.angle + body.omega * step_scale);

        reactions.extend(fluid.reactions.into_iter().map(|(x, amount)| (x, amount * step_scale)));
    }
    reactions
}

/// Resolve walls and ground for every body; ground hits are reported as impacts
pub fn confine(bodies: &mut [RigidBody], bounds: Bounds, tuning: &Tuning) -> Vec<Impact> {
    let mut impacts = Vec::new();
    for body in bodies.iter_mut() {
        walls(body, bounds, tuning);
        if let Some(hit) = ground(body, bounds.ground_top, tuning) {
            impacts.push(hit);
        }
    }
    impacts
}

fn walls(body: &mut RigidBody, bounds: Bounds, tuning: &Tuning) {
    let (lo, hi) = body.aabb();
    let mut hit = false;
    if lo.x < 0.0 {
        body.pos.x -= lo.x;
        if body.vel.x < 0.0 {
            body.vel.x *= tuning.wall_bounce;
        }
        hit = true;
    } else if hi.x > bounds.width {
        body.pos.x -= hi.x - bounds.width;
        if body.vel.x > 0.0 {
            body.vel.x *= tuning.wall_bounce;
        }
        hit = true;
    }
    if lo.y < 0.0 {
        body.pos.y -= lo.y;
        if body.vel.y < 0.0 {
            body.vel.y *= tuning.wall_bounce;
        }
        hit = true;
    }
    if hit && !body.dragged {
        body.omega *= tuning.wall_angular_damping;
    }
}

/// Lowest support of a body: (contact point, penetration below `top`, support width)
fn support(body: &RigidBody, top: f32) -> Option<(Vec2, f32, f32)> {
    match &body.shape {
        Shape::Circle { radius } => {
            let pen = body.pos.y + radius - top;
            (pen > 0.0).then_some((Vec2::new(body.pos.x, top), pen, 0.0))
        }
        _ => {
            let ring = body.world_ring()?;
            let lowest = ring.iter().map(|v| v.y).fold(f32::MIN, f32::max);
            let pen = lowest - top;
            if pen <= 0.0 {
                return None;
            }
            let feet: Vec<Vec2> = ring.into_iter().filter(|v| v.y >= lowest - SUPPORT_TOLERANCE).collect();
            let n = feet.len().max(1) as f32;
            let point = feet.iter().copied().sum::<Vec2>() / n;
            let (min_x, max_x) = feet
                .iter()
                .fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v.x), hi.max(v.x)));
            Some((Vec2::new(point.x, top), pen, (max_x - min_x).max(0.0)))
        }
    }
}

fn ground_restitution(body: &RigidBody, tuning: &Tuning) -> f32 {
    if body.material.glass {
        tuning.glass_restitution
    } else if body.material.bouncy {
        tuning.ground_restitution.max(tuning.bouncy_restitution)
    } else {
        tuning.ground_restitution
    }
}

fn ground_friction(body: &RigidBody, tuning: &Tuning) -> f32 {
    let mut mu = tuning.ground_friction;
    if body.material.sticky {
        mu *= tuning.sticky_friction_scale;
    }
    if body.material.slippery {
        mu = mu.min(tuning.slippery_friction);
    }
    mu
}

/// Contact against the flat ground line
fn ground(body: &mut RigidBody, top: f32, tuning: &Tuning) -> Option<Impact> {
    let (point, pen, width) = support(body, top)?;
    body.pos.y -= pen;
    if body.dragged {
        return None;
    }

    let r = point - body.pos;
    let approach = body.velocity_at(point).y;
    let mut impact = None;
    if approach > 0.0 {
        let e = if approach < tuning.resting_speed_threshold { 0.0 } else { ground_restitution(body, tuning) };
        let normal = Vec2::new(0.0, -1.0);
        let rn = cross(r, normal);
        let k = (body.inv_mass() + body.inv_inertia() * rn * rn).max(EPSILON);
        let jn = (1.0 + e) * approach / k;
        body.apply_impulse(normal * jn, point);

        let slide = body.velocity_at(point).x;
        let rt = cross(r, Vec2::X);
        let kt = (body.inv_mass() + body.inv_inertia() * rt * rt).max(EPSILON);
        let limit = ground_friction(body, tuning) * jn;
        let jt = (-slide / kt).clamp(-limit, limit);
        body.apply_impulse(Vec2::new(jt, 0.0), point);

        impact = Some(Impact {
            body: body.id,
            impulse: jn,
            closing_speed: approach,
        });
    }
    body.omega *= tuning.ground_angular_damping;
    settle(body, top, width, tuning);
    impact
}

/// Zero residual motion of a slow grounded body; snap a nearly flat box on a narrow support
fn settle(body: &mut RigidBody, top: f32, support_width: f32, tuning: &Tuning) {
    if body.vel.length() >= tuning.settle_speed || body.omega.abs() >= tuning.settle_angular_speed {
        return;
    }
    body.vel = Vec2::ZERO;
    body.omega = 0.0;

    let Shape::Box { half } = body.shape else {
        return;
    };
    if support_width >= 2.0 * half.x.min(half.y) * tuning.settle_support_fraction {
        return;
    }
    let quarter = std::f32::consts::FRAC_PI_2;
    let snapped = (body.angle / quarter).round() * quarter;
    if (body.angle - snapped).abs() > SNAP_WINDOW {
        return;
    }
    body.angle = normalize_angle(snapped);
    let lowest = body.aabb().1.y;
    body.pos.y -= lowest - top;
}

/// Adaptive substep count from the fastest body and the body count
pub fn substep_count(bodies: &[RigidBody]) -> u32 {
    let fastest = bodies
        .iter()
        .filter(|b| !b.dragged)
        .map(|b| b.vel.length())
        .filter(|s| s.is_finite())
        .fold(0.0f32, f32::max);
    let mut steps = ((fastest / SPEED_PER_SUBSTEP).ceil() as u32).max(1);
    if bodies.len() > 24 {
        steps = steps.max(3);
    } else if bodies.len() > 12 {
        steps = steps.max(2);
    }
    steps.min(MAX_SUBSTEPS)
}
