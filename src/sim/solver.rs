//! Contact resolution (sequential impulses)
//!
//! Per substep:
//! 1. `find_contacts` runs the broad phase (AABB overlap, welded partners
//!    skipped) and the narrow phase
//! 2. `correct_positions` pushes overlapping groups apart by inverse mass
//! 3. `solve` iterates normal and friction impulses with accumulated clamping,
//!    a Baumgarte bias and resting-contact restitution cutoff
//!
//! Impulse totals and closing speeds are reported back as `Impact`s for the
//! fracture model.

use glam::Vec2;

use super::body::{BodyId, RigidBody, pair_mut};
use super::collision::{Manifold, collide};
use super::weld::Aggregates;
use crate::consts::EPSILON;
use crate::cross;
use crate::tuning::Tuning;

/// Per-contact solver state
#[derive(Debug, Clone, Copy, Default)]
struct ContactState {
    point: Vec2,
    penetration: f32,
    ra: Vec2,
    rb: Vec2,
    normal_mass: f32,
    tangent_mass: f32,
    bias: f32,
    normal_impulse: f32,
    tangent_impulse: f32,
}

/// Coefficients resolved from both bodies' materials
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairMaterial {
    pub restitution: f32,
    pub friction_static: f32,
    pub friction_dynamic: f32,
    pub sticky: bool,
}

impl PairMaterial {
    pub fn resolve(a: &RigidBody, b: &RigidBody, tuning: &Tuning) -> Self {
        let (ma, mb) = (a.material, b.material);
        let restitution = if ma.glass || mb.glass {
            tuning.glass_restitution
        } else if ma.bouncy || mb.bouncy {
            tuning.restitution.max(tuning.bouncy_restitution)
        } else {
            tuning.restitution
        };
        let sticky = ma.sticky || mb.sticky;
        let mut fs = tuning.friction_static;
        let mut fd = tuning.friction_dynamic;
        if sticky {
            fs *= tuning.sticky_friction_scale;
            fd *= tuning.sticky_friction_scale;
        }
        if ma.slippery || mb.slippery {
            fs = fs.min(tuning.slippery_friction);
            fd = fd.min(tuning.slippery_friction);
        }
        Self {
            restitution,
            friction_static: fs,
            friction_dynamic: fd,
            sticky,
        }
    }
}

/// A colliding pair with its manifold
#[derive(Debug, Clone)]
pub struct ContactPair {
    /// Body indices
    pub a: usize,
    pub b: usize,
    pub manifold: Manifold,
    pub material: PairMaterial,
    /// Approach speed along the normal before resolution (px/step)
    pub closing_speed: f32,
    contacts: Vec<ContactState>,
}

impl ContactPair {
    /// Total normal impulse applied over all iterations
    pub fn normal_impulse(&self) -> f32 {
        self.contacts.iter().map(|c| c.normal_impulse).sum()
    }
}

/// Collision report for one body in one substep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    pub body: BodyId,
    pub impulse: f32,
    pub closing_speed: f32,
}

#[inline]
fn aabb_overlap(a: (Vec2, Vec2), b: (Vec2, Vec2)) -> bool {
    a.0.x <= b.1.x && b.0.x <= a.1.x && a.0.y <= b.1.y && b.0.y <= a.1.y
}

/// Broad + narrow phase over all body pairs outside a shared aggregate
pub fn find_contacts(bodies: &[RigidBody], aggregates: &Aggregates, tuning: &Tuning) -> Vec<ContactPair> {
    let boxes: Vec<(Vec2, Vec2)> = bodies.iter().map(RigidBody::aabb).collect();
    let mut pairs = Vec::new();
    for i in 0..bodies.len() {
        for j in (i + 1)..bodies.len() {
            if aggregates.same(i, j) || !aabb_overlap(boxes[i], boxes[j]) {
                continue;
            }
            if bodies[i].inv_mass() == 0.0 && bodies[j].inv_mass() == 0.0 {
                continue;
            }
            if let Some(manifold) = collide(&bodies[i], &bodies[j]) {
                pairs.push(ContactPair {
                    a: i,
                    b: j,
                    material: PairMaterial::resolve(&bodies[i], &bodies[j], tuning),
                    contacts: manifold
                        .contacts
                        .iter()
                        .map(|c| ContactState {
                            point: c.point,
                            penetration: c.penetration,
                            ..Default::default()
                        })
                        .collect(),
                    manifold,
                    closing_speed: 0.0,
                });
            }
        }
    }
    pairs
}

/// Split-by-inverse-mass positional correction; moves whole weld groups
pub fn correct_positions(bodies: &mut [RigidBody], pairs: &[ContactPair], aggregates: &Aggregates, tuning: &Tuning) {
    for pair in pairs {
        let (ga, gb) = (aggregates.group[pair.a], aggregates.group[pair.b]);
        if ga == gb {
            continue;
        }
        let (inv_a, inv_b) = (aggregates.inv_mass[ga], aggregates.inv_mass[gb]);
        let inv_sum = inv_a + inv_b;
        if inv_sum <= EPSILON {
            continue;
        }
        let depth = (pair.manifold.max_penetration() - tuning.collision_slop).max(0.0);
        if depth <= 0.0 {
            continue;
        }
        let push = pair.manifold.normal * (depth * tuning.correction_fraction / inv_sum);
        aggregates.translate(bodies, ga, -push * inv_a);
        aggregates.translate(bodies, gb, push * inv_b);
    }
}

/// Recompute contacts and apply positional correction only (no velocity change)
pub fn resolve_penetration(bodies: &mut [RigidBody], aggregates: &Aggregates, tuning: &Tuning) {
    let pairs = find_contacts(bodies, aggregates, tuning);
    correct_positions(bodies, &pairs, aggregates, tuning);
}

#[inline]
fn relative_velocity(a: &RigidBody, b: &RigidBody, c: &ContactState) -> Vec2 {
    b.vel + crate::perp_cross(b.omega, c.rb) - a.vel - crate::perp_cross(a.omega, c.ra)
}

#[inline]
fn effective_mass(a: &RigidBody, b: &RigidBody, ra: Vec2, rb: Vec2, dir: Vec2) -> f32 {
    let rna = cross(ra, dir);
    let rnb = cross(rb, dir);
    let k = a.inv_mass() + b.inv_mass() + a.inv_inertia() * rna * rna + b.inv_inertia() * rnb * rnb;
    if k > EPSILON { 1.0 / k } else { 0.0 }
}

fn apply_pair_impulse(a: &mut RigidBody, b: &mut RigidBody, c: &ContactState, impulse: Vec2) {
    a.vel -= impulse * a.inv_mass();
    a.omega -= cross(c.ra, impulse) * a.inv_inertia();
    b.vel += impulse * b.inv_mass();
    b.omega += cross(c.rb, impulse) * b.inv_inertia();
}

/// Precompute lever arms, effective masses and bias targets
fn prepare(bodies: &[RigidBody], pair: &mut ContactPair, tuning: &Tuning, step_scale: f32) {
    let (a, b) = (&bodies[pair.a], &bodies[pair.b]);
    let n = pair.manifold.normal;
    let t = Vec2::new(n.y, -n.x);
    let mut closing: f32 = 0.0;
    for c in &mut pair.contacts {
        c.ra = c.point - a.pos;
        c.rb = c.point - b.pos;
        c.normal_mass = effective_mass(a, b, c.ra, c.rb, n);
        c.tangent_mass = effective_mass(a, b, c.ra, c.rb, t);
        let vn = relative_velocity(a, b, c).dot(n);
        closing = closing.max(-vn);

        let restitution_bias = if -vn > tuning.resting_speed_threshold {
            -pair.material.restitution * vn
        } else {
            0.0
        };
        let residual = (c.penetration * (1.0 - tuning.correction_fraction) - tuning.collision_slop).max(0.0);
        let penetration_bias = (tuning.baumgarte_bias * residual / step_scale.max(EPSILON)).min(tuning.max_bias_velocity);
        c.bias = restitution_bias.max(penetration_bias);
    }
    pair.closing_speed = closing;
}

/// Run the sequential-impulse iterations over all pairs
pub fn solve(bodies: &mut [RigidBody], pairs: &mut [ContactPair], tuning: &Tuning, step_scale: f32, iterations: u32) -> Vec<Impact> {
    for pair in pairs.iter_mut() {
        prepare(bodies, pair, tuning, step_scale);
    }

    let iterations = iterations.max(1);
    for iteration in 0..iterations {
        let last = iteration + 1 == iterations;
        for pair in pairs.iter_mut() {
            let Some((a, b)) = pair_mut(bodies, pair.a, pair.b) else { continue };
            let n = pair.manifold.normal;
            let t = Vec2::new(n.y, -n.x);
            let mat = pair.material;

            for c in &mut pair.contacts {
                // Normal
                let vn = relative_velocity(a, b, c).dot(n);
                let lambda = c.normal_mass * (c.bias - vn);
                let accumulated = (c.normal_impulse + lambda).max(0.0);
                let applied = accumulated - c.normal_impulse;
                c.normal_impulse = accumulated;
                apply_pair_impulse(a, b, c, n * applied);

                // Friction
                let vt = relative_velocity(a, b, c).dot(t);
                let mu = if vt.abs() < tuning.static_friction_speed {
                    mat.friction_static
                } else {
                    mat.friction_dynamic
                };
                let support = tuning.support_estimate_gain * c.penetration * c.normal_mass;
                let limit = mu * c.normal_impulse.max(support);
                let lambda = -c.tangent_mass * vt;
                let accumulated = (c.tangent_impulse + lambda).clamp(-limit, limit);
                let applied = accumulated - c.tangent_impulse;
                c.tangent_impulse = accumulated;
                apply_pair_impulse(a, b, c, t * applied);

                // Adhesion resists slow separation
                if last && mat.sticky {
                    let vn = relative_velocity(a, b, c).dot(n);
                    if vn > 0.0 && vn < tuning.sticky_release_speed {
                        let pull = -c.normal_mass * vn * tuning.sticky_adhesion;
                        apply_pair_impulse(a, b, c, n * pull);
                    }
                }
            }
        }
    }

    let mut impacts = Vec::with_capacity(pairs.len() * 2);
    for pair in pairs.iter() {
        let impulse = pair.normal_impulse();
        for idx in [pair.a, pair.b] {
            impacts.push(Impact {
                body: bodies[idx].id,
                impulse,
                closing_speed: pair.closing_speed,
            });
        }
    }
    impacts
}

/// Solver iterations for the current scene
pub fn iteration_count(body_count: usize, has_wheels: bool, tuning: &Tuning) -> u32 {
    let base = tuning.collision_iterations;
    let scaled = (base + (body_count / 12) as u32).min(base * 2);
    if has_wheels { scaled + tuning.wheel_extra_iterations } else { scaled }
}
