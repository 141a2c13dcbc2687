//! Pointer drag and throw
//!
//! Dragged bodies are kinematic: they follow the pointer, keep their
//! orientation and carry the pointer velocity so contacts push others.
//! On release the velocity over a short rolling window becomes the throw.

use std::collections::VecDeque;

use glam::Vec2;

use super::body::{BodyId, RigidBody, Shape, VelocityLimits, index_of};
use crate::consts::{EPSILON, SIM_DT};
use crate::tuning::Tuning;

/// Below this window duration no velocity is estimated (s)
const MIN_SAMPLE_SPAN: f64 = 1.0e-3;
/// Dominant axis must exceed the other by this factor to damp the minor axis
const AXIS_DOMINANCE: f32 = 2.5;
/// Minor-axis multiplier for strongly axis-aligned throws
const MINOR_AXIS_DAMPING: f32 = 0.35;
/// Spin imparted to thrown circles per unit of rolling speed
const CIRCLE_SPIN_GAIN: f32 = 0.8;

/// An active drag of one or more bodies
#[derive(Debug, Clone)]
pub struct DragState {
    /// Body under the pointer when the drag began
    pub anchor: BodyId,
    /// Every dragged body with its offset from the pointer
    pub members: Vec<(BodyId, Vec2)>,
    history: VecDeque<(f64, Vec2)>,
}

impl DragState {
    /// Grab `members` (which must include `anchor`) at `pointer`
    pub fn begin(bodies: &mut [RigidBody], anchor: BodyId, members: &[BodyId], pointer: Vec2, time: f64) -> Option<Self> {
        index_of(bodies, anchor)?;
        let mut grabbed = Vec::with_capacity(members.len());
        for &id in members {
            let Some(i) = index_of(bodies, id) else {
                continue;
            };
            let body = &mut bodies[i];
            body.dragged = true;
            body.vel = Vec2::ZERO;
            body.omega = 0.0;
            grabbed.push((id, body.pos - pointer));
        }
        if !grabbed.iter().any(|(id, _)| *id == anchor) {
            return None;
        }
        log::debug!("Drag started on body {anchor} ({} bodies)", grabbed.len());
        Some(Self {
            anchor,
            members: grabbed,
            history: VecDeque::from([(time, pointer)]),
        })
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.members.iter().any(|(m, _)| *m == id)
    }

    /// Record a pointer sample and drop samples older than the window
    pub fn track(&mut self, pointer: Vec2, time: f64, window: f32) {
        self.history.push_back((time, pointer));
        let cutoff = time - window as f64;
        while self.history.len() > 1 && self.history.front().is_some_and(|(t, _)| *t < cutoff) {
            self.history.pop_front();
        }
    }

    /// Pointer velocity over the rolling window (px/step)
    pub fn release_velocity(&self) -> Vec2 {
        let (Some(&(t0, p0)), Some(&(t1, p1))) = (self.history.front(), self.history.back()) else {
            return Vec2::ZERO;
        };
        let span = t1 - t0;
        if span < MIN_SAMPLE_SPAN {
            return Vec2::ZERO;
        }
        (p1 - p0) / span as f32 * SIM_DT
    }

    /// Move every dragged body to follow the pointer
    pub fn follow(&self, bodies: &mut [RigidBody], pointer: Vec2) {
        let vel = self.release_velocity();
        for &(id, offset) in &self.members {
            if let Some(i) = index_of(bodies, id) {
                let body = &mut bodies[i];
                body.pos = pointer + offset;
                body.vel = vel;
                body.omega = 0.0;
            }
        }
    }

    /// Let go of every member, throwing it with the estimated release velocity
    pub fn release(self, bodies: &mut [RigidBody], tuning: &Tuning) {
        let throw = throw_velocity(self.release_velocity(), tuning);
        for &(id, _) in &self.members {
            if let Some(i) = index_of(bodies, id) {
                apply_throw(&mut bodies[i], throw, tuning);
            }
        }
        log::debug!("Released body {} at ({:.1}, {:.1}) px/step", self.anchor, throw.x, throw.y);
    }

    /// Drop the drag without throwing (members simply stop being kinematic)
    pub fn cancel(self, bodies: &mut [RigidBody]) {
        for &(id, _) in &self.members {
            if let Some(i) = index_of(bodies, id) {
                bodies[i].dragged = false;
                bodies[i].vel = Vec2::ZERO;
            }
        }
    }
}

/// Shape a raw release velocity into a throw: axis stabilisation, inertia,
/// speed boost and the throw-boosted limits
pub fn throw_velocity(raw: Vec2, tuning: &Tuning) -> Vec2 {
    if !raw.is_finite() {
        return Vec2::ZERO;
    }
    let mut v = raw;
    let (ax, ay) = (v.x.abs(), v.y.abs());
    if ax > ay * AXIS_DOMINANCE {
        v.y *= MINOR_AXIS_DAMPING;
    } else if ay > ax * AXIS_DOMINANCE {
        v.x *= MINOR_AXIS_DAMPING;
    }

    let boost = 1.0 + tuning.throw_speed_boost * (v.length() / tuning.throw_boost_reference.max(EPSILON)).min(1.0);
    v *= tuning.throw_linear_inertia * boost;

    let lim = VelocityLimits::from_tuning(tuning, true);
    Vec2::new(v.x.clamp(-lim.x, lim.x), v.y.clamp(-lim.y, lim.y))
}

/// Hand a throw to one body and open its grace window
pub fn apply_throw(body: &mut RigidBody, throw: Vec2, tuning: &Tuning) {
    body.dragged = false;
    body.vel = throw;
    body.omega = match body.shape {
        Shape::Circle { radius } => throw.x / radius.max(EPSILON) * CIRCLE_SPIN_GAIN * tuning.throw_angular_inertia,
        _ => 0.0,
    };
    body.throw_grace = tuning.throw_grace_steps;
    body.clamp_velocity(tuning);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::BASE_HALF;
    use proptest::prelude::*;

    fn bodies() -> Vec<RigidBody> {
        let tuning = Tuning::default();
        vec![
            RigidBody::new(1, Shape::Box { half: Vec2::splat(BASE_HALF) }, Vec2::new(100.0, 100.0), &tuning),
            RigidBody::new(2, Shape::Circle { radius: 20.0 }, Vec2::new(200.0, 100.0), &tuning),
        ]
    }

    #[test]
    fn test_drag_follows_pointer_keeping_offset() {
        let mut bodies = bodies();
        bodies[0].angle = 0.4;
        let mut drag = DragState::begin(&mut bodies, 1, &[1], Vec2::new(110.0, 90.0), 0.0).expect("live body");
        assert!(bodies[0].dragged);
        drag.track(Vec2::new(130.0, 90.0), 0.05, 0.12);
        drag.follow(&mut bodies, Vec2::new(130.0, 90.0));
        assert_eq!(bodies[0].pos, Vec2::new(120.0, 100.0));
        assert_eq!(bodies[0].angle, 0.4);
        assert_eq!(bodies[0].omega, 0.0);
    }

    #[test]
    fn test_release_velocity_uses_window_endpoints() {
        let mut bodies = bodies();
        let mut drag = DragState::begin(&mut bodies, 1, &[1], Vec2::ZERO, 0.0).expect("live body");
        // Old samples fall out of the window
        drag.track(Vec2::new(1000.0, 0.0), 0.5, 0.12);
        drag.track(Vec2::new(1060.0, 0.0), 0.6, 0.12);
        let v = drag.release_velocity();
        // 60 px over 0.1 s = 600 px/s = 10 px/step
        assert!((v.x - 10.0).abs() < 1e-3);
        assert_eq!(v.y, 0.0);
    }

    #[test]
    fn test_held_still_releases_without_throw() {
        let mut bodies = bodies();
        let mut drag = DragState::begin(&mut bodies, 1, &[1], Vec2::ZERO, 0.0).expect("live body");
        drag.track(Vec2::new(50.0, 0.0), 0.05, 0.12);
        drag.track(Vec2::new(50.0, 0.0), 1.0, 0.12);
        drag.release(&mut bodies, &Tuning::default());
        assert!(!bodies[0].dragged);
        assert_eq!(bodies[0].vel, Vec2::ZERO);
    }

    #[test]
    fn test_axis_aligned_throw_damps_minor_axis() {
        let tuning = Tuning {
            throw_speed_boost: 0.0,
            ..Default::default()
        };
        let v = throw_velocity(Vec2::new(10.0, 1.0), &tuning);
        assert!((v.x - 10.0).abs() < 1e-4);
        assert!((v.y - 0.35).abs() < 1e-4);
        // Diagonal throws are left alone
        let d = throw_velocity(Vec2::new(5.0, 4.0), &tuning);
        assert_eq!(d, Vec2::new(5.0, 4.0));
    }

    #[test]
    fn test_thrown_circle_spins_and_gets_grace() {
        let tuning = Tuning::default();
        let mut bodies = bodies();
        apply_throw(&mut bodies[1], Vec2::new(4.0, 0.0), &tuning);
        assert_eq!(bodies[1].throw_grace, tuning.throw_grace_steps);
        assert!(bodies[1].omega > 0.0);
        apply_throw(&mut bodies[0], Vec2::new(4.0, 0.0), &tuning);
        assert_eq!(bodies[0].omega, 0.0);
    }

    #[test]
    fn test_unknown_anchor_is_rejected() {
        let mut bodies = bodies();
        assert!(DragState::begin(&mut bodies, 9, &[9], Vec2::ZERO, 0.0).is_none());
    }

    proptest! {
        #[test]
        fn prop_throw_respects_boosted_limits(x in -5000.0f32..5000.0, y in -5000.0f32..5000.0) {
            let tuning = Tuning::default();
            let lim = VelocityLimits::from_tuning(&tuning, true);
            let v = throw_velocity(Vec2::new(x, y), &tuning);
            prop_assert!(v.x.abs() <= lim.x + 1e-3);
            prop_assert!(v.y.abs() <= lim.y + 1e-3);
        }
    }
}
