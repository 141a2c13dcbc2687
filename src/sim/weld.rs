//! Weld and wheel constraints
//!
//! Welds form an undirected graph over body ids. Each step the graph is
//! rebuilt from the live constraint list and split into connected
//! components ("aggregates"). An aggregate is resolved as one rigid unit:
//! poses are projected outward from a root by breadth-first traversal, then
//! velocities are replaced by a single rigid motion. Wheel-flagged bodies are
//! pinned by position only and keep their own spin.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::{BodyId, RigidBody, index_of};
use crate::consts::EPSILON;
use crate::tuning::Tuning;
use crate::{cross, normalize_angle, perp_cross, rotate};

/// Pose changes smaller than these are not written back
const POSITION_EPS: f32 = 1.0e-3;
const ANGLE_EPS: f32 = 1.0e-5;

/// Fraction of the averaged wheel-anchor error removed per stabilization pass
const WHEEL_HOST_GAIN: f32 = 0.5;

/// Rigid connection between two bodies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeldConstraint {
    pub a: BodyId,
    pub b: BodyId,
    /// Anchor in A's local frame
    pub anchor_a: Vec2,
    /// Anchor in B's local frame
    pub anchor_b: Vec2,
    /// `angle_b - angle_a` at creation
    pub rest_angle: f32,
}

impl WeldConstraint {
    /// Capture the current relative pose of two bodies around a world anchor
    pub fn new(a: &RigidBody, b: &RigidBody, world_anchor: Vec2) -> Self {
        Self {
            a: a.id,
            b: b.id,
            anchor_a: a.to_local(world_anchor),
            anchor_b: b.to_local(world_anchor),
            rest_angle: normalize_angle(b.angle - a.angle),
        }
    }

    #[inline]
    pub fn involves(&self, id: BodyId) -> bool {
        self.a == id || self.b == id
    }

    /// The body on the other end, if `id` is one of the ends
    pub fn other(&self, id: BodyId) -> Option<BodyId> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }

    /// Anchors and rest angle seen from `from`: (anchor on from, anchor on other, other angle - from angle)
    fn oriented(&self, from: BodyId) -> (Vec2, Vec2, f32) {
        if from == self.a {
            (self.anchor_a, self.anchor_b, self.rest_angle)
        } else {
            (self.anchor_b, self.anchor_a, -self.rest_angle)
        }
    }
}

/// Drop self-loops, welds to missing bodies and wheel marks with no remaining weld
pub fn prune(welds: &mut Vec<WeldConstraint>, wheels: &mut BTreeSet<BodyId>, bodies: &[RigidBody]) {
    let before = welds.len();
    welds.retain(|w| w.a != w.b && index_of(bodies, w.a).is_some() && index_of(bodies, w.b).is_some());
    if welds.len() != before {
        log::debug!("Pruned {} stale welds", before - welds.len());
    }
    wheels.retain(|id| welds.iter().any(|w| w.involves(*id)));
}

/// Connected components of the weld graph, by body index
#[derive(Debug, Clone, Default)]
pub struct Aggregates {
    /// Body index -> group index
    pub group: Vec<usize>,
    /// Group index -> member body indices (ascending)
    pub members: Vec<Vec<usize>>,
    /// Group index -> combined inverse mass (0 when any member is held)
    pub inv_mass: Vec<f32>,
}

impl Aggregates {
    /// Every body in its own group
    pub fn singletons(bodies: &[RigidBody]) -> Self {
        let n = bodies.len();
        Self {
            group: (0..n).collect(),
            members: (0..n).map(|i| vec![i]).collect(),
            inv_mass: bodies.iter().map(RigidBody::inv_mass).collect(),
        }
    }

    /// Rebuild components from the weld list (adjacency sets + BFS)
    pub fn build(bodies: &[RigidBody], welds: &[WeldConstraint]) -> Self {
        let adjacency = adjacency(bodies, welds);
        let n = bodies.len();
        let mut group = vec![usize::MAX; n];
        let mut members = Vec::new();
        for start in 0..n {
            if group[start] != usize::MAX {
                continue;
            }
            let g = members.len();
            let mut list = Vec::new();
            let mut queue = VecDeque::from([start]);
            group[start] = g;
            while let Some(cur) = queue.pop_front() {
                list.push(cur);
                if let Some(next) = adjacency.get(&cur) {
                    for &nb in next {
                        if group[nb] == usize::MAX {
                            group[nb] = g;
                            queue.push_back(nb);
                        }
                    }
                }
            }
            list.sort_unstable();
            members.push(list);
        }
        let inv_mass = members
            .iter()
            .map(|list| {
                if list.iter().any(|&i| bodies[i].dragged) {
                    0.0
                } else {
                    1.0 / list.iter().map(|&i| bodies[i].mass).sum::<f32>().max(EPSILON)
                }
            })
            .collect();
        Self {
            group,
            members,
            inv_mass,
        }
    }

    #[inline]
    pub fn same(&self, a: usize, b: usize) -> bool {
        self.group.get(a).is_some_and(|g| self.group.get(b) == Some(g))
    }

    /// Groups with more than one member
    pub fn welded(&self) -> impl Iterator<Item = &[usize]> {
        self.members.iter().filter(|m| m.len() > 1).map(Vec::as_slice)
    }

    /// Move a whole group rigidly
    pub fn translate(&self, bodies: &mut [RigidBody], group: usize, delta: Vec2) {
        if let Some(list) = self.members.get(group) {
            for &i in list {
                bodies[i].pos += delta;
            }
        }
    }
}

/// Body index -> neighbours with the welds joining them
fn adjacency(bodies: &[RigidBody], welds: &[WeldConstraint]) -> BTreeMap<usize, BTreeSet<usize>> {
    let mut adj: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
    for w in welds {
        if let (Some(a), Some(b)) = (index_of(bodies, w.a), index_of(bodies, w.b)) {
            if a != b {
                adj.entry(a).or_default().insert(b);
                adj.entry(b).or_default().insert(a);
            }
        }
    }
    adj
}

/// Root of an aggregate: the held non-wheel body, else the lowest-id non-wheel member
fn pick_root(bodies: &[RigidBody], members: &[usize], wheels: &BTreeSet<BodyId>) -> usize {
    let is_wheel = |i: usize| wheels.contains(&bodies[i].id);
    members
        .iter()
        .copied()
        .find(|&i| bodies[i].dragged && !is_wheel(i))
        .or_else(|| members.iter().copied().find(|&i| !is_wheel(i)))
        .unwrap_or(members[0])
}

/// Project every aggregate onto its rest configuration
pub fn project(bodies: &mut [RigidBody], welds: &[WeldConstraint], aggregates: &Aggregates, wheels: &BTreeSet<BodyId>, tuning: &Tuning) {
    if welds.is_empty() {
        return;
    }
    let stiffness = tuning.weld_stiffness;
    for members in aggregates.welded() {
        let root = pick_root(bodies, members, wheels);
        // Virtual angle each body would have if everything were rigid
        let mut frame: BTreeMap<usize, f32> = BTreeMap::new();
        frame.insert(root, bodies[root].angle);
        let mut queue = VecDeque::from([root]);

        while let Some(cur) = queue.pop_front() {
            let cur_id = bodies[cur].id;
            let cur_pos = bodies[cur].pos;
            let cur_frame = frame.get(&cur).copied().unwrap_or(bodies[cur].angle);

            for w in welds.iter().filter(|w| w.involves(cur_id)) {
                let Some(nb_id) = w.other(cur_id) else { continue };
                let Some(nb) = index_of(bodies, nb_id) else { continue };
                if frame.contains_key(&nb) {
                    continue;
                }
                let (anchor_cur, anchor_nb, rest) = w.oriented(cur_id);
                let nb_frame = cur_frame + rest;
                frame.insert(nb, nb_frame);
                queue.push_back(nb);

                let world_anchor = cur_pos + rotate(anchor_cur, cur_frame);
                let target_pos = world_anchor - rotate(anchor_nb, nb_frame);
                let body = &mut bodies[nb];
                if body.dragged {
                    continue;
                }
                if (target_pos - body.pos).length() > POSITION_EPS {
                    body.pos = if stiffness >= 1.0 {
                        target_pos
                    } else {
                        body.pos + (target_pos - body.pos) * stiffness
                    };
                }
                if !wheels.contains(&nb_id) {
                    let delta = normalize_angle(nb_frame - body.angle);
                    if delta.abs() > ANGLE_EPS {
                        body.angle = if stiffness >= 1.0 { nb_frame } else { body.angle + delta * stiffness };
                    }
                }
            }
        }
    }
}

/// Nudge hosts carrying two or more wheels toward all wheel anchors at once
pub fn stabilize_wheel_hosts(bodies: &mut [RigidBody], welds: &[WeldConstraint], wheels: &BTreeSet<BodyId>) {
    if wheels.is_empty() {
        return;
    }
    let mut hosts: BTreeMap<BodyId, Vec<&WeldConstraint>> = BTreeMap::new();
    for w in welds {
        match (wheels.contains(&w.a), wheels.contains(&w.b)) {
            (false, true) => hosts.entry(w.a).or_default().push(w),
            (true, false) => hosts.entry(w.b).or_default().push(w),
            _ => {}
        }
    }
    for (host_id, links) in hosts {
        if links.len() < 2 {
            continue;
        }
        let Some(h) = index_of(bodies, host_id) else { continue };
        if bodies[h].dragged {
            continue;
        }
        let mut shift = Vec2::ZERO;
        let mut turn = 0.0;
        let mut count = 0.0;
        for w in &links {
            let wheel_id = w.other(host_id).unwrap_or(host_id);
            let Some(wi) = index_of(bodies, wheel_id) else { continue };
            let (anchor_host, anchor_wheel, _) = w.oriented(host_id);
            let host = &bodies[h];
            let wheel = &bodies[wi];
            let on_host = host.to_world(anchor_host);
            let on_wheel = wheel.to_world(anchor_wheel);
            shift += on_wheel - on_host;
            let r = on_host - host.pos;
            let r_target = on_wheel - host.pos;
            if r.length_squared() > EPSILON && r_target.length_squared() > EPSILON {
                turn += cross(r, r_target).atan2(r.dot(r_target));
            }
            count += 1.0;
        }
        if count > 0.0 {
            let host = &mut bodies[h];
            host.pos += shift / count * WHEEL_HOST_GAIN;
            host.angle = normalize_angle(host.angle + turn / count * WHEEL_HOST_GAIN);
        }
    }
}

/// Replace member velocities of each aggregate by one rigid motion
pub fn sync_velocities(bodies: &mut [RigidBody], aggregates: &Aggregates, wheels: &BTreeSet<BodyId>, tuning: &Tuning) {
    let blend = tuning.weld_damping;
    for members in aggregates.welded() {
        if let Some(&held) = members.iter().find(|&&i| bodies[i].dragged) {
            let vel = bodies[held].vel;
            for &i in members {
                bodies[i].vel = vel;
                if !wheels.contains(&bodies[i].id) {
                    bodies[i].omega = 0.0;
                }
            }
            continue;
        }

        let mut mass = 0.0;
        let mut weighted = Vec2::ZERO;
        let mut momentum = Vec2::ZERO;
        for &i in members {
            let b = &bodies[i];
            mass += b.mass;
            weighted += b.pos * b.mass;
            momentum += b.vel * b.mass;
        }
        let mass = mass.max(EPSILON);
        let centroid = weighted / mass;
        let center_vel = momentum / mass;

        let mut angular_momentum = 0.0;
        let mut inertia = 0.0;
        for &i in members {
            let b = &bodies[i];
            let r = b.pos - centroid;
            angular_momentum += cross(r, b.vel * b.mass);
            inertia += b.mass * r.length_squared();
            if !wheels.contains(&b.id) {
                angular_momentum += b.inertia * b.omega;
                inertia += b.inertia;
            }
        }
        let omega = angular_momentum / inertia.max(EPSILON);

        for &i in members {
            let b = &mut bodies[i];
            let target = center_vel + perp_cross(omega, b.pos - centroid);
            b.vel += (target - b.vel) * blend;
            if !wheels.contains(&b.id) {
                b.omega += (omega - b.omega) * blend;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::body::Shape;

    fn body(id: BodyId, at: Vec2) -> RigidBody {
        RigidBody::new(id, Shape::Box { half: Vec2::splat(20.0) }, at, &Tuning::default())
    }

    fn chain() -> (Vec<RigidBody>, Vec<WeldConstraint>) {
        let bodies = vec![
            body(1, Vec2::new(100.0, 100.0)),
            body(2, Vec2::new(140.0, 100.0)),
            body(3, Vec2::new(180.0, 100.0)),
        ];
        let welds = vec![
            WeldConstraint::new(&bodies[0], &bodies[1], Vec2::new(120.0, 100.0)),
            WeldConstraint::new(&bodies[1], &bodies[2], Vec2::new(160.0, 100.0)),
        ];
        (bodies, welds)
    }

    #[test]
    fn test_components_include_singletons() {
        let (mut bodies, welds) = chain();
        bodies.push(body(9, Vec2::new(400.0, 0.0)));
        let agg = Aggregates::build(&bodies, &welds);
        assert_eq!(agg.members.len(), 2);
        assert!(agg.same(0, 2));
        assert!(!agg.same(0, 3));
        assert_eq!(agg.welded().count(), 1);
    }

    #[test]
    fn test_cycle_is_one_component() {
        let (bodies, mut welds) = chain();
        welds.push(WeldConstraint::new(&bodies[2], &bodies[0], Vec2::new(140.0, 120.0)));
        let agg = Aggregates::build(&bodies, &welds);
        assert_eq!(agg.members, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_projection_restores_rest_pose() {
        let tuning = Tuning::default();
        let (mut bodies, welds) = chain();
        bodies[0].angle = 0.5;
        let agg = Aggregates::build(&bodies, &welds);
        project(&mut bodies, &welds, &agg, &BTreeSet::new(), &tuning);
        for w in &welds {
            let a = &bodies[index_of(&bodies, w.a).expect("live")];
            let b = &bodies[index_of(&bodies, w.b).expect("live")];
            assert!((a.to_world(w.anchor_a) - b.to_world(w.anchor_b)).length() < 1e-3);
            assert!((normalize_angle(b.angle - a.angle) - w.rest_angle).abs() < 1e-5);
        }
    }

    #[test]
    fn test_projection_is_idempotent() {
        let tuning = Tuning::default();
        let (mut bodies, welds) = chain();
        bodies[0].angle = -0.3;
        bodies[2].pos.y += 7.0;
        let agg = Aggregates::build(&bodies, &welds);
        project(&mut bodies, &welds, &agg, &BTreeSet::new(), &tuning);
        let settled: Vec<(Vec2, f32)> = bodies.iter().map(|b| (b.pos, b.angle)).collect();
        project(&mut bodies, &welds, &agg, &BTreeSet::new(), &tuning);
        let again: Vec<(Vec2, f32)> = bodies.iter().map(|b| (b.pos, b.angle)).collect();
        assert_eq!(settled, again);
    }

    #[test]
    fn test_wheel_keeps_its_angle() {
        let tuning = Tuning::default();
        let (mut bodies, welds) = chain();
        let wheels = BTreeSet::from([3]);
        bodies[2].angle = 1.2;
        let agg = Aggregates::build(&bodies, &welds);
        project(&mut bodies, &welds, &agg, &wheels, &tuning);
        assert_eq!(bodies[2].angle, 1.2);
    }

    #[test]
    fn test_sync_gives_one_rigid_motion() {
        let tuning = Tuning::default();
        let (mut bodies, welds) = chain();
        bodies[0].omega = 0.2;
        bodies[2].vel = Vec2::new(0.0, 3.0);
        let momentum_before: Vec2 = bodies.iter().map(|b| b.vel * b.mass).sum();
        let agg = Aggregates::build(&bodies, &welds);
        sync_velocities(&mut bodies, &agg, &BTreeSet::new(), &tuning);
        assert!((bodies[0].omega - bodies[1].omega).abs() < 1e-6);
        assert!((bodies[1].omega - bodies[2].omega).abs() < 1e-6);
        let momentum_after: Vec2 = bodies.iter().map(|b| b.vel * b.mass).sum();
        assert!((momentum_after - momentum_before).length() < 1e-4);
    }

    #[test]
    fn test_two_wheel_host_settles_between_its_wheels() {
        let tuning = Tuning::default();
        let wheel = |id: BodyId, at: Vec2| RigidBody::new(id, Shape::Circle { radius: 12.0 }, at, &tuning);
        let mut bodies = vec![
            RigidBody::new(1, Shape::Box { half: Vec2::new(40.0, 10.0) }, Vec2::new(100.0, 100.0), &tuning),
            wheel(2, Vec2::new(60.0, 110.0)),
            wheel(3, Vec2::new(140.0, 110.0)),
        ];
        let welds = vec![
            WeldConstraint::new(&bodies[0], &bodies[1], bodies[1].pos),
            WeldConstraint::new(&bodies[0], &bodies[2], bodies[2].pos),
        ];
        let wheels = BTreeSet::from([2, 3]);
        bodies[0].pos += Vec2::new(6.0, -4.0);
        bodies[0].angle = 0.08;
        bodies[1].omega = 0.3;
        bodies[1].angle = 0.7;
        bodies[2].omega = -0.2;

        let errors = |bodies: &[RigidBody]| -> Vec<f32> {
            welds
                .iter()
                .map(|w| {
                    let a = &bodies[index_of(bodies, w.a).expect("live")];
                    let b = &bodies[index_of(bodies, w.b).expect("live")];
                    (a.to_world(w.anchor_a) - b.to_world(w.anchor_b)).length()
                })
                .collect()
        };

        let before = errors(&bodies);
        stabilize_wheel_hosts(&mut bodies, &welds, &wheels);
        let after = errors(&bodies);
        assert!(after[0] < before[0]);
        assert!(after[1] < before[1]);

        let agg = Aggregates::build(&bodies, &welds);
        for _ in 0..tuning.weld_iterations {
            stabilize_wheel_hosts(&mut bodies, &welds, &wheels);
            project(&mut bodies, &welds, &agg, &wheels, &tuning);
        }
        assert!(errors(&bodies).iter().all(|e| *e < 1e-2));
        assert_eq!(bodies[1].omega, 0.3);
        assert_eq!(bodies[2].omega, -0.2);
        assert_eq!(bodies[1].angle, 0.7);
    }

    #[test]
    fn test_prune_drops_stale_links() {
        let (bodies, mut welds) = chain();
        let mut wheels = BTreeSet::from([3]);
        let survivors: Vec<RigidBody> = bodies[..2].to_vec();
        prune(&mut welds, &mut wheels, &survivors);
        assert_eq!(welds.len(), 1);
        assert!(wheels.is_empty());
    }
}
