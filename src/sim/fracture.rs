//! Damage model for glass bodies
//!
//! Damage grows from impacts (impulse or closing speed over a
//! strength-scaled threshold) and from sustained overload (the weight
//! resting on a body exceeds its capacity). It decays when neither is
//! active. A body breaks on a single heavy impact, on overload with enough
//! damage, or on fatigue alone.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;

use super::body::{BodyId, RigidBody};
use super::solver::Impact;
use crate::consts::{BASE_SIZE, EPSILON};
use crate::tuning::Tuning;

/// Margin added around a body's AABB when looking for bodies resting on it (px)
const SUPPORT_MARGIN: f32 = 2.0;

/// Queued removal of a broken body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShatterRequest {
    pub body: BodyId,
    /// Largest impulse seen this step (drives the explosion size)
    pub impulse: f32,
}

/// Why a body broke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakCause {
    Impact,
    Overload,
    Fatigue,
}

/// Strength factor: heavier and larger bodies tolerate more
pub fn strength(body: &RigidBody, tuning: &Tuning) -> f32 {
    let mass_ratio = (body.mass / tuning.base_mass.max(EPSILON)).max(0.05);
    let size_ratio = (body.size() / BASE_SIZE).max(0.05);
    (mass_ratio.powf(0.35) * size_ratio.powf(0.25)).clamp(0.3, 4.0)
}

/// Normalised excess of an impact over the strength-scaled thresholds
pub fn impact_input(impulse: f32, closing_speed: f32, strength: f32, tuning: &Tuning) -> f32 {
    let impulse_limit = (tuning.glass_impulse_threshold * strength).max(EPSILON);
    let speed_limit = (tuning.glass_speed_threshold * strength.sqrt()).max(EPSILON);
    let by_impulse = (impulse - impulse_limit).max(0.0) / impulse_limit;
    let by_speed = (closing_speed - speed_limit).max(0.0) / speed_limit;
    by_impulse.max(by_speed)
}

fn inflated(aabb: (Vec2, Vec2)) -> (Vec2, Vec2) {
    (aabb.0 - Vec2::splat(SUPPORT_MARGIN), aabb.1 + Vec2::splat(SUPPORT_MARGIN))
}

fn overlaps(a: (Vec2, Vec2), b: (Vec2, Vec2)) -> bool {
    a.0.x <= b.1.x && b.0.x <= a.1.x && a.0.y <= b.1.y && b.0.y <= a.1.y
}

/// Mass resting on body `index`, walking upward through touching bodies
pub fn supported_load(bodies: &[RigidBody], index: usize) -> f32 {
    let boxes: Vec<(Vec2, Vec2)> = bodies.iter().map(RigidBody::aabb).collect();
    let mut visited = BTreeSet::from([index]);
    load_above(bodies, &boxes, index, &mut visited)
}

fn load_above(bodies: &[RigidBody], boxes: &[(Vec2, Vec2)], index: usize, visited: &mut BTreeSet<usize>) -> f32 {
    let zone = inflated(boxes[index]);
    let below = &bodies[index];
    let mut load = 0.0;
    for (j, other) in bodies.iter().enumerate() {
        if visited.contains(&j) || other.dragged || other.pos.y >= below.pos.y {
            continue;
        }
        if !overlaps(zone, boxes[j]) {
            continue;
        }
        visited.insert(j);
        load += other.mass + load_above(bodies, boxes, j, visited);
    }
    load
}

/// Update damage on every glass body and collect the ones that break
pub fn evaluate(bodies: &mut [RigidBody], impacts: &[Impact], tuning: &Tuning) -> Vec<(ShatterRequest, BreakCause)> {
    // Strongest impact per body this step
    let mut strongest: BTreeMap<BodyId, (f32, f32)> = BTreeMap::new();
    for hit in impacts {
        let entry = strongest.entry(hit.body).or_insert((0.0, 0.0));
        entry.0 = entry.0.max(hit.impulse);
        entry.1 = entry.1.max(hit.closing_speed);
    }

    let loads: Vec<f32> = (0..bodies.len())
        .map(|i| if bodies[i].material.glass { supported_load(bodies, i) } else { 0.0 })
        .collect();

    let mut broken = Vec::new();
    for (i, body) in bodies.iter_mut().enumerate() {
        if !body.material.glass {
            continue;
        }
        let s = strength(body, tuning);
        let (impulse, closing) = strongest.get(&body.id).copied().unwrap_or((0.0, 0.0));
        let input = impact_input(impulse, closing, s, tuning);
        let capacity = (body.mass * tuning.glass_capacity_ratio * s).max(EPSILON);
        let ratio = loads[i] / capacity;
        let overloaded = ratio > 1.0;

        if body.glass_grace > 0 {
            body.glass_grace -= 1;
            body.damage = (body.damage - tuning.glass_decay).max(0.0);
            continue;
        }

        let mut active = false;
        if input > 0.0 {
            body.damage += input * tuning.glass_impact_damage;
            active = true;
        }
        if overloaded {
            body.damage += ratio * tuning.glass_overload_damage;
            active = true;
        }
        if !active {
            body.damage = (body.damage - tuning.glass_decay).max(0.0);
        }

        let cause = if input >= tuning.glass_single_break {
            Some(BreakCause::Impact)
        } else if overloaded && body.damage >= tuning.glass_overload_break {
            Some(BreakCause::Overload)
        } else if body.damage >= tuning.glass_fatigue_break {
            Some(BreakCause::Fatigue)
        } else {
            None
        };
        if let Some(cause) = cause {
            broken.push((
                ShatterRequest {
                    body: body.id,
                    impulse: impulse.max(body.mass * closing),
                },
                cause,
            ));
        }
    }
    broken
}

/// Per-body shatter queue keeping the strongest request
#[derive(Debug, Clone, Default)]
pub struct ShatterQueue {
    pending: BTreeMap<BodyId, ShatterRequest>,
}

impl ShatterQueue {
    pub fn push(&mut self, request: ShatterRequest) {
        self.pending
            .entry(request.body)
            .and_modify(|r| {
                if request.impulse > r.impulse {
                    *r = request;
                }
            })
            .or_insert(request);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take every queued request in id order
    pub fn drain(&mut self) -> Vec<ShatterRequest> {
        std::mem::take(&mut self.pending).into_values().collect()
    }
}
