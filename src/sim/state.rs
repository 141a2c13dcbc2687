//! World state and editing operations
//!
//! Everything the simulation mutates lives in `World`: bodies (sorted by id),
//! welds, wheel marks, the wave field, particles, the seeded RNG and the
//! bookkeeping used by the editing tools. All edits are synchronous and
//! happen between steps.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::body::{BodyId, MaterialFlag, RigidBody, Shape, index_of, pair_mut};
use super::drag::DragState;
use super::fracture::ShatterQueue;
use super::geometry;
use super::input::Interaction;
use super::integrate::Bounds;
use super::particles::Particles;
use super::wave::WaveField;
use super::weld::WeldConstraint;
use crate::consts::*;
use crate::normalize_angle;
use crate::tuning::Tuning;

/// Keep spawned bodies this far from walls and ground (px)
const SPAWN_MARGIN: f32 = 4.0;
/// Padding around a body's bounds for the fallback pick (px)
const PICK_PADDING: f32 = 15.0;
/// Seabed centre as a fraction of the viewport height (water mode)
const SEABED_CENTER_FRACTION: f32 = 0.94;

const QUAD_MIN_SIDE: f32 = 10.0;
const QUAD_RAISED_SIDE: f32 = 22.0;
const QUAD_MAX_ASPECT: f32 = 12.0;
const MIN_DRAWN_SIZE: f32 = 12.0;

/// Rotation step for the rotate commands (degrees)
pub const ROTATE_STEP_DEG: f32 = 2.8;
/// Snap increment (degrees)
pub const SNAP_STEP_DEG: f32 = 15.0;

/// Scene location
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    /// Flat ground, no fluid
    #[default]
    Land,
    /// Wave-field water over a seabed
    Water,
}

/// Result of a weld-tool click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeldOutcome {
    /// First body marked
    Pending(BodyId),
    /// Pending body clicked again
    Cancelled,
    Welded(BodyId, BodyId),
    /// Nothing under the pointer, or the pair was already welded
    Ignored,
}

/// The whole simulated scene
#[derive(Debug, Clone)]
pub struct World {
    pub tuning: Tuning,
    pub location: Location,
    /// Viewport size (px)
    pub size: Vec2,
    /// Live bodies, sorted by id
    pub bodies: Vec<RigidBody>,
    pub welds: Vec<WeldConstraint>,
    pub wheels: BTreeSet<BodyId>,
    pub wave: WaveField,
    pub particles: Particles,
    pub rng: Pcg32,
    pub interaction: Interaction,
    pub drag: Option<DragState>,
    /// First body picked by the weld tool
    pub pending_weld: Option<BodyId>,
    pub shatters: ShatterQueue,
    /// Immersion of each body at the end of the previous step
    pub immersion: BTreeMap<BodyId, f32>,
    /// Simulation step counter
    pub steps: u64,
    /// Spawn order for undo (oldest first)
    spawn_log: Vec<BodyId>,
    next_id: BodyId,
}

impl World {
    /// Create an empty world covering `size`
    pub fn new(size: Vec2, tuning: Tuning) -> Self {
        let tuning = tuning.sanitized();
        let size = size.max(Vec2::ONE);
        Self {
            wave: WaveField::new(size.x, tuning.wave_sample_spacing, size.y * WATER_BASELINE_FRACTION),
            rng: Pcg32::seed_from_u64(tuning.seed),
            tuning,
            location: Location::default(),
            size,
            bodies: Vec::new(),
            welds: Vec::new(),
            wheels: BTreeSet::new(),
            particles: Particles::default(),
            interaction: Interaction::default(),
            drag: None,
            pending_weld: None,
            shatters: ShatterQueue::default(),
            immersion: BTreeMap::new(),
            steps: 0,
            spawn_log: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new body id
    pub fn next_body_id(&mut self) -> BodyId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    #[inline]
    pub fn is_water(&self) -> bool {
        self.location == Location::Water
    }

    /// Screen y of the ground top (land) or seabed top (water)
    pub fn ground_top(&self) -> f32 {
        let fraction = match self.location {
            Location::Land => GROUND_CENTER_FRACTION,
            Location::Water => SEABED_CENTER_FRACTION,
        };
        self.size.y * fraction - GROUND_HALF_THICKNESS
    }

    pub fn bounds(&self) -> Bounds {
        Bounds {
            width: self.size.x,
            height: self.size.y,
            ground_top: self.ground_top(),
        }
    }

    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        index_of(&self.bodies, id).map(|i| &self.bodies[i])
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        index_of(&self.bodies, id).map(|i| &mut self.bodies[i])
    }

    /// Spawn log, oldest first
    pub fn spawn_log(&self) -> &[BodyId] {
        &self.spawn_log
    }

    /// Replace the tuning; body masses are re-derived
    pub fn set_tuning(&mut self, tuning: Tuning) {
        self.tuning = tuning.sanitized();
        for body in &mut self.bodies {
            body.recompute_mass(&self.tuning);
        }
    }

    pub fn set_location(&mut self, location: Location) {
        if self.location == location {
            return;
        }
        self.location = location;
        self.immersion.clear();
        if location == Location::Land {
            self.particles.droplets.clear();
        }
        log::info!("Scene location set to {location:?}");
    }

    /// Rescale body positions and the wave field to a new viewport
    pub fn resize(&mut self, size: Vec2) {
        let size = size.max(Vec2::ONE);
        let scale = size / self.size;
        for body in &mut self.bodies {
            body.pos *= scale;
        }
        self.size = size;
        self.wave.rescale(size.x, size.y * WATER_BASELINE_FRACTION);
        self.interaction.cancel_gesture();
        log::info!("Viewport resized to {:.0}x{:.0}", size.x, size.y);
    }

    /// Remove everything and zero the water
    pub fn reset_scene(&mut self) {
        self.bodies.clear();
        self.welds.clear();
        self.wheels.clear();
        self.particles.clear();
        self.wave.clear();
        self.drag = None;
        self.pending_weld = None;
        self.shatters.drain();
        self.immersion.clear();
        self.spawn_log.clear();
        self.interaction.cancel_gesture();
        log::info!("Scene reset");
    }

    // === Spawning ===

    fn clamp_spawn(&self, pos: Vec2, half: Vec2) -> Vec2 {
        let fit = |v: f32, lo: f32, hi: f32| if lo > hi { (lo + hi) * 0.5 } else { v.clamp(lo, hi) };
        let m = SPAWN_MARGIN;
        Vec2::new(
            fit(pos.x, half.x + m, self.size.x - half.x - m),
            fit(pos.y, half.y + m, self.ground_top() - half.y - m),
        )
    }

    fn log_spawn(&mut self, id: BodyId) {
        if self.spawn_log.len() >= SPAWN_LOG_CAP {
            self.spawn_log.drain(..SPAWN_LOG_CAP / 2);
        }
        self.spawn_log.push(id);
    }

    /// Insert a body with a ready shape, clamped into the playfield
    pub fn insert_body(&mut self, shape: Shape, pos: Vec2) -> Option<BodyId> {
        if self.bodies.len() >= self.tuning.max_bodies {
            log::debug!("Spawn refused: body cap {} reached", self.tuning.max_bodies);
            return None;
        }
        if !pos.is_finite() {
            return None;
        }
        let pos = self.clamp_spawn(pos, shape.local_half_extents());
        let id = self.next_body_id();
        self.bodies.push(RigidBody::new(id, shape, pos, &self.tuning));
        self.log_spawn(id);
        Some(id)
    }

    /// Polygon from a world-space ring; centred on its centroid
    fn insert_polygon(&mut self, world_ring: &[Vec2]) -> Option<BodyId> {
        let mut ring = world_ring.to_vec();
        geometry::ensure_ccw(&mut ring);
        if !geometry::is_valid_ring(&ring) {
            log::debug!("Spawn refused: degenerate polygon ({} vertices)", ring.len());
            return None;
        }
        let (center, local) = geometry::recenter(&ring);
        self.insert_body(Shape::polygon(local), center)
    }

    pub fn spawn_box(&mut self, at: Vec2) -> Option<BodyId> {
        self.insert_body(Shape::Box { half: Vec2::splat(BASE_HALF) }, at)
    }

    pub fn spawn_circle(&mut self, at: Vec2) -> Option<BodyId> {
        self.insert_body(Shape::Circle { radius: BASE_HALF }, at)
    }

    /// Equilateral triangle of reference height
    pub fn spawn_triangle(&mut self, at: Vec2) -> Option<BodyId> {
        let ring = triangle_ring(at, 2.0 * BASE_SIZE / 3f32.sqrt(), BASE_SIZE);
        self.insert_polygon(&ring)
    }

    /// Box from a drag rectangle
    pub fn spawn_quad_from_rect(&mut self, a: Vec2, b: Vec2) -> Option<BodyId> {
        let (lo, hi) = (a.min(b), a.max(b));
        let mut size = hi - lo;
        if size.x < QUAD_MIN_SIDE || size.y < QUAD_MIN_SIDE {
            log::debug!("Quad refused: {:.0}x{:.0} too small", size.x, size.y);
            return None;
        }
        size = size.max(Vec2::splat(QUAD_RAISED_SIDE));
        if size.x > size.y * QUAD_MAX_ASPECT {
            size.x = size.y * QUAD_MAX_ASPECT;
        } else if size.y > size.x * QUAD_MAX_ASPECT {
            size.y = size.x * QUAD_MAX_ASPECT;
        }
        self.insert_body(Shape::Box { half: size * 0.5 }, (lo + hi) * 0.5)
    }

    /// Circle from a drag rectangle; `perfect` uses the larger side from the start corner
    pub fn spawn_circle_from_rect(&mut self, a: Vec2, b: Vec2, perfect: bool) -> Option<BodyId> {
        let extent = (b - a).abs();
        let (diameter, center) = if perfect {
            let d = extent.max_element().max(MIN_DRAWN_SIZE);
            let dir = Vec2::new(
                if b.x < a.x { -1.0 } else { 1.0 },
                if b.y < a.y { -1.0 } else { 1.0 },
            );
            (d, a + dir * d * 0.5)
        } else {
            (extent.min_element(), (a + b) * 0.5)
        };
        if diameter < MIN_DRAWN_SIZE {
            log::debug!("Circle refused: diameter {diameter:.1}");
            return None;
        }
        self.insert_body(Shape::Circle { radius: diameter * 0.5 }, center)
    }

    /// Equilateral triangle fitted into a drag rectangle
    pub fn spawn_triangle_from_rect(&mut self, a: Vec2, b: Vec2) -> Option<BodyId> {
        let extent = (b - a).abs();
        let mut h = extent.y;
        let mut w = 2.0 * h / 3f32.sqrt();
        if w > extent.x {
            w = extent.x;
            h = w * 3f32.sqrt() * 0.5;
        }
        if w < MIN_DRAWN_SIZE || h < MIN_DRAWN_SIZE {
            log::debug!("Triangle refused: {w:.1}x{h:.1}");
            return None;
        }
        self.insert_polygon(&triangle_ring((a + b) * 0.5, w, h))
    }

    /// Convex body from a freehand stroke
    pub fn spawn_freeform(&mut self, stroke: &[Vec2]) -> Option<BodyId> {
        let points = geometry::resample(stroke, FREEFORM_MAX_POINTS);
        let hull = geometry::convex_hull(&points);
        self.insert_polygon(&hull)
    }

    // === Selection ===

    /// Body under a point: exact hit first (topmost), else nearest centre within padded bounds
    pub fn pick(&self, at: Vec2) -> Option<BodyId> {
        if let Some(hit) = self.bodies.iter().rev().find(|b| b.contains_point(at)) {
            return Some(hit.id);
        }
        self.bodies
            .iter()
            .rev()
            .filter(|b| {
                let (lo, hi) = b.aabb();
                let pad = Vec2::splat(PICK_PADDING);
                at.cmpge(lo - pad).all() && at.cmple(hi + pad).all()
            })
            .min_by(|a, b| a.pos.distance_squared(at).total_cmp(&b.pos.distance_squared(at)))
            .map(|b| b.id)
    }

    pub fn selected_ids(&self) -> Vec<BodyId> {
        self.bodies.iter().filter(|b| b.selected).map(|b| b.id).collect()
    }

    pub fn clear_selection(&mut self) {
        self.bodies.iter_mut().for_each(|b| b.selected = false);
    }

    /// Select bodies whose centres lie in the rectangle; returns how many
    pub fn select_in_rect(&mut self, a: Vec2, b: Vec2, additive: bool) -> usize {
        let (lo, hi) = (a.min(b), a.max(b));
        let mut count = 0;
        for body in &mut self.bodies {
            let inside = body.pos.cmpge(lo).all() && body.pos.cmple(hi).all();
            if inside {
                body.selected = true;
                count += 1;
            } else if !additive {
                body.selected = false;
            }
        }
        count
    }

    // === Editing ===

    /// Remove a body and every reference to it
    pub fn delete_body(&mut self, id: BodyId) -> bool {
        let Some(i) = index_of(&self.bodies, id) else {
            return false;
        };
        self.bodies.remove(i);
        self.welds.retain(|w| !w.involves(id));
        self.wheels.remove(&id);
        self.wheels.retain(|w| self.welds.iter().any(|weld| weld.involves(*w)));
        self.spawn_log.retain(|s| *s != id);
        self.immersion.remove(&id);
        if self.pending_weld == Some(id) {
            self.pending_weld = None;
        }
        if let Some(drag) = &mut self.drag {
            drag.members.retain(|(m, _)| *m != id);
            if drag.members.is_empty() || drag.anchor == id {
                if let Some(drag) = self.drag.take() {
                    drag.cancel(&mut self.bodies);
                }
                self.interaction.cancel_gesture();
            }
        }
        log::debug!("Removed body {id}");
        true
    }

    /// Remove the most recent spawn that is still alive
    pub fn undo_last_spawn(&mut self) -> Option<BodyId> {
        while let Some(id) = self.spawn_log.pop() {
            if index_of(&self.bodies, id).is_some() {
                self.delete_body(id);
                return Some(id);
            }
        }
        None
    }

    /// Rotate every selected body by `degrees`; with `snap` the result lands on 15° multiples
    pub fn rotate_selection(&mut self, degrees: f32, snap: bool) -> usize {
        let mut count = 0;
        for body in self.bodies.iter_mut().filter(|b| b.selected) {
            body.angle = if snap {
                snap_angle(body.angle + degrees.to_radians())
            } else {
                normalize_angle(body.angle + degrees.to_radians())
            };
            body.omega = 0.0;
            count += 1;
        }
        count
    }

    /// Round every selected body's angle to the nearest 15°
    pub fn snap_selection(&mut self) -> usize {
        self.rotate_selection(0.0, true)
    }

    /// Weld tool click on the body under `at`
    pub fn weld_click(&mut self, at: Vec2) -> WeldOutcome {
        let Some(id) = self.pick(at) else {
            return WeldOutcome::Ignored;
        };
        match self.pending_weld.take() {
            None => {
                self.pending_weld = Some(id);
                WeldOutcome::Pending(id)
            }
            Some(first) if first == id => WeldOutcome::Cancelled,
            Some(first) => {
                if self.weld(first, id) {
                    WeldOutcome::Welded(first, id)
                } else {
                    WeldOutcome::Ignored
                }
            }
        }
    }

    /// Weld two bodies at the midpoint of their centres
    pub fn weld(&mut self, a: BodyId, b: BodyId) -> bool {
        if a == b || self.welds.iter().any(|w| w.involves(a) && w.involves(b)) {
            return false;
        }
        let (Some(ia), Some(ib)) = (index_of(&self.bodies, a), index_of(&self.bodies, b)) else {
            return false;
        };
        let (ba, bb) = (&self.bodies[ia], &self.bodies[ib]);
        let anchor = (ba.pos + bb.pos) * 0.5;
        self.welds.push(WeldConstraint::new(ba, bb, anchor));
        log::debug!("Welded {a} to {b}");
        true
    }

    /// Toggle a welded body between rigid member and free-spinning wheel
    pub fn toggle_wheel(&mut self, id: BodyId) -> bool {
        if index_of(&self.bodies, id).is_none() || !self.welds.iter().any(|w| w.involves(id)) {
            return false;
        }
        let becoming_wheel = !self.wheels.contains(&id);
        for w in self.welds.iter_mut().filter(|w| w.involves(id)) {
            let (Some(ia), Some(ib)) = (index_of(&self.bodies, w.a), index_of(&self.bodies, w.b)) else {
                continue;
            };
            let Some((ba, bb)) = pair_mut(&mut self.bodies, ia, ib) else {
                continue;
            };
            let anchor = if becoming_wheel {
                if w.a == id { ba.pos } else { bb.pos }
            } else {
                (ba.pos + bb.pos) * 0.5
            };
            *w = WeldConstraint::new(ba, bb, anchor);
        }
        if becoming_wheel {
            self.wheels.insert(id);
        } else {
            self.wheels.remove(&id);
        }
        log::debug!("Body {id} wheel mode: {becoming_wheel}");
        true
    }

    /// Toggle a material flag; turning glass on starts a grace period
    pub fn toggle_material(&mut self, id: BodyId, flag: MaterialFlag) -> Option<bool> {
        let body = self.body_mut(id)?;
        let on = body.material.toggle(flag);
        if flag == MaterialFlag::Glass {
            body.reset_glass();
        }
        Some(on)
    }

    // === Water ===

    /// Drop impulse on the surface, with spray when strong enough
    pub fn disturb_water(&mut self, x: f32, strength: f32, spray_energy: f32) {
        if !self.is_water() {
            return;
        }
        self.wave.add_drop_impulse(x, strength, self.tuning.pointer_impulse_radius);
        if strength.abs() > self.tuning.spray_impulse_threshold {
            let at = Vec2::new(x, self.wave.surface_y(x));
            self.particles.spawn_splash(at, spray_energy, &mut self.rng, &self.tuning);
        }
    }
}

/// Isoceles triangle (apex up) whose bounding box is centred on `center`
fn triangle_ring(center: Vec2, base: f32, height: f32) -> Vec<Vec2> {
    let (hb, hh) = (base * 0.5, height * 0.5);
    vec![
        center + Vec2::new(0.0, -hh),
        center + Vec2::new(-hb, hh),
        center + Vec2::new(hb, hh),
    ]
}

/// Nearest multiple of 15°
pub fn snap_angle(angle: f32) -> f32 {
    let step = SNAP_STEP_DEG.to_radians();
    normalize_angle((angle / step).round() * step)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        World::new(Vec2::new(800.0, 600.0), Tuning::default())
    }

    #[test]
    fn test_ground_depends_on_location() {
        let mut w = world();
        assert!((w.ground_top() - (600.0 * 0.74 - 24.0)).abs() < 1e-3);
        w.set_location(Location::Water);
        assert!((w.ground_top() - (600.0 * 0.94 - 24.0)).abs() < 1e-3);
    }

    #[test]
    fn test_spawn_is_clamped_above_ground() {
        let mut w = world();
        let id = w.spawn_box(Vec2::new(-50.0, 5000.0)).expect("spawned");
        let b = w.body(id).expect("live");
        let (lo, hi) = b.aabb();
        assert!(lo.x >= SPAWN_MARGIN - 1e-3);
        assert!(hi.y <= w.ground_top() - SPAWN_MARGIN + 1e-3);
    }

    #[test]
    fn test_body_cap_refuses_spawns() {
        let tuning = Tuning {
            max_bodies: 2,
            ..Default::default()
        };
        let mut w = World::new(Vec2::new(800.0, 600.0), tuning);
        assert!(w.spawn_box(Vec2::new(100.0, 100.0)).is_some());
        assert!(w.spawn_circle(Vec2::new(200.0, 100.0)).is_some());
        assert!(w.spawn_triangle(Vec2::new(300.0, 100.0)).is_none());
        assert_eq!(w.bodies.len(), 2);
    }

    #[test]
    fn test_ids_are_sorted_and_never_reused() {
        let mut w = world();
        let a = w.spawn_box(Vec2::new(100.0, 100.0)).expect("spawned");
        w.delete_body(a);
        let b = w.spawn_box(Vec2::new(100.0, 100.0)).expect("spawned");
        assert!(b > a);
        w.spawn_circle(Vec2::new(300.0, 100.0));
        assert!(w.bodies.windows(2).all(|p| p[0].id < p[1].id));
    }

    #[test]
    fn test_drawn_quad_rules() {
        let mut w = world();
        assert!(w.spawn_quad_from_rect(Vec2::new(100.0, 100.0), Vec2::new(108.0, 150.0)).is_none());
        let id = w
            .spawn_quad_from_rect(Vec2::new(100.0, 100.0), Vec2::new(115.0, 160.0))
            .expect("spawned");
        let Some(Shape::Box { half }) = w.body(id).map(|b| b.shape.clone()) else {
            panic!("box expected");
        };
        assert_eq!(half, Vec2::new(11.0, 30.0));
        let long = w
            .spawn_quad_from_rect(Vec2::new(10.0, 100.0), Vec2::new(790.0, 122.0))
            .expect("spawned");
        let Some(Shape::Box { half }) = w.body(long).map(|b| b.shape.clone()) else {
            panic!("box expected");
        };
        assert!((half.x / half.y - QUAD_MAX_ASPECT).abs() < 1e-4);
    }

    #[test]
    fn test_drawn_circle_rules() {
        let mut w = world();
        assert!(w.spawn_circle_from_rect(Vec2::new(0.0, 0.0), Vec2::new(40.0, 8.0), false).is_none());
        let perfect = w
            .spawn_circle_from_rect(Vec2::new(100.0, 100.0), Vec2::new(140.0, 108.0), true)
            .expect("spawned");
        assert_eq!(w.body(perfect).map(|b| b.shape.clone()), Some(Shape::Circle { radius: 20.0 }));
    }

    #[test]
    fn test_drawn_triangle_fits_rect() {
        let mut w = world();
        let id = w
            .spawn_triangle_from_rect(Vec2::new(100.0, 100.0), Vec2::new(140.0, 200.0))
            .expect("spawned");
        let (lo, hi) = w.body(id).expect("live").aabb();
        assert!((hi.x - lo.x - 40.0).abs() < 1e-2);
        assert!((hi.y - lo.y - 20.0 * 3f32.sqrt()).abs() < 1e-2);
        assert!(w.spawn_triangle_from_rect(Vec2::ZERO, Vec2::new(8.0, 100.0)).is_none());
    }

    #[test]
    fn test_freeform_takes_hull_and_rejects_lines() {
        let mut w = world();
        let stroke: Vec<Vec2> = (0..100)
            .map(|i| {
                let a = i as f32 / 100.0 * std::f32::consts::TAU;
                Vec2::new(300.0 + 40.0 * a.cos(), 200.0 + 30.0 * a.sin())
            })
            .collect();
        let id = w.spawn_freeform(&stroke).expect("spawned");
        let Some(Shape::Polygon { vertices, collision }) = w.body(id).map(|b| b.shape.clone()) else {
            panic!("polygon expected");
        };
        assert!(vertices.len() > COLLISION_RING_MAX);
        assert!(collision.is_some_and(|c| c.len() <= COLLISION_RING_MAX));
        assert!(geometry::centroid(&vertices).length() < 1e-2);

        let line: Vec<Vec2> = (0..20).map(|i| Vec2::new(i as f32 * 5.0, 100.0)).collect();
        assert!(w.spawn_freeform(&line).is_none());
    }

    #[test]
    fn test_pick_prefers_exact_then_nearest() {
        let mut w = world();
        let a = w.spawn_box(Vec2::new(100.0, 100.0)).expect("spawned");
        let b = w.spawn_box(Vec2::new(300.0, 100.0)).expect("spawned");
        assert_eq!(w.pick(Vec2::new(110.0, 110.0)), Some(a));
        // Just outside b, within padding
        assert_eq!(w.pick(Vec2::new(300.0 + BASE_HALF + 10.0, 100.0)), Some(b));
        assert_eq!(w.pick(Vec2::new(600.0, 300.0)), None);
    }

    #[test]
    fn test_rubber_band_selects_by_centre() {
        let mut w = world();
        let a = w.spawn_box(Vec2::new(100.0, 100.0)).expect("spawned");
        let b = w.spawn_box(Vec2::new(300.0, 100.0)).expect("spawned");
        assert_eq!(w.select_in_rect(Vec2::new(50.0, 50.0), Vec2::new(150.0, 150.0), false), 1);
        assert_eq!(w.selected_ids(), vec![a]);
        w.select_in_rect(Vec2::new(250.0, 50.0), Vec2::new(350.0, 150.0), true);
        assert_eq!(w.selected_ids(), vec![a, b]);
    }

    #[test]
    fn test_delete_cleans_welds_wheels_and_log() {
        let mut w = world();
        let a = w.spawn_box(Vec2::new(100.0, 100.0)).expect("spawned");
        let b = w.spawn_circle(Vec2::new(160.0, 100.0)).expect("spawned");
        assert!(w.weld(a, b));
        assert!(w.toggle_wheel(b));
        w.pending_weld = Some(a);
        assert!(w.delete_body(a));
        assert!(w.welds.is_empty());
        assert!(w.wheels.is_empty());
        assert_eq!(w.pending_weld, None);
        assert_eq!(w.spawn_log(), &[b]);
        assert!(!w.delete_body(a));
    }

    #[test]
    fn test_undo_skips_dead_entries() {
        let mut w = world();
        let a = w.spawn_box(Vec2::new(100.0, 100.0)).expect("spawned");
        let b = w.spawn_box(Vec2::new(300.0, 100.0)).expect("spawned");
        // Removed outside the undo path (e.g. shattered) but still logged
        let i = index_of(&w.bodies, b).expect("live");
        w.bodies.remove(i);
        assert_eq!(w.undo_last_spawn(), Some(a));
        assert_eq!(w.undo_last_spawn(), None);
    }

    #[test]
    fn test_spawn_log_drops_oldest_half() {
        let mut w = world();
        for id in 0..SPAWN_LOG_CAP as BodyId {
            w.log_spawn(id);
        }
        w.log_spawn(9999);
        assert_eq!(w.spawn_log().len(), SPAWN_LOG_CAP / 2 + 1);
        assert_eq!(w.spawn_log()[0], (SPAWN_LOG_CAP / 2) as BodyId);
    }

    #[test]
    fn test_rotate_and_snap_selection() {
        let mut w = world();
        let id = w.spawn_box(Vec2::new(100.0, 100.0)).expect("spawned");
        w.body_mut(id).expect("live").selected = true;
        w.body_mut(id).expect("live").omega = 0.3;
        w.rotate_selection(ROTATE_STEP_DEG, false);
        let b = w.body(id).expect("live");
        assert!((b.angle - ROTATE_STEP_DEG.to_radians()).abs() < 1e-5);
        assert_eq!(b.omega, 0.0);
        w.rotate_selection(SNAP_STEP_DEG, true);
        assert!((w.body(id).expect("live").angle - 15f32.to_radians()).abs() < 1e-5);
        w.body_mut(id).expect("live").angle = 0.3;
        w.snap_selection();
        assert!((w.body(id).expect("live").angle - 15f32.to_radians()).abs() < 1e-5);
    }

    #[test]
    fn test_weld_tool_flow() {
        let mut w = world();
        let a = w.spawn_box(Vec2::new(100.0, 100.0)).expect("spawned");
        let b = w.spawn_box(Vec2::new(200.0, 100.0)).expect("spawned");
        assert_eq!(w.weld_click(Vec2::new(500.0, 300.0)), WeldOutcome::Ignored);
        assert_eq!(w.weld_click(Vec2::new(100.0, 100.0)), WeldOutcome::Pending(a));
        assert_eq!(w.weld_click(Vec2::new(100.0, 100.0)), WeldOutcome::Cancelled);
        assert_eq!(w.weld_click(Vec2::new(100.0, 100.0)), WeldOutcome::Pending(a));
        assert_eq!(w.weld_click(Vec2::new(200.0, 100.0)), WeldOutcome::Welded(a, b));
        let weld = &w.welds[0];
        assert_eq!(weld.anchor_a, Vec2::new(50.0, 0.0));
        assert_eq!(weld.anchor_b, Vec2::new(-50.0, 0.0));
        // Same pair twice is ignored
        assert!(!w.weld(b, a));
    }

    #[test]
    fn test_wheel_toggle_reanchors() {
        let mut w = world();
        let host = w.spawn_box(Vec2::new(100.0, 100.0)).expect("spawned");
        let wheel = w.spawn_circle(Vec2::new(180.0, 100.0)).expect("spawned");
        assert!(!w.toggle_wheel(wheel));
        w.weld(host, wheel);
        assert!(w.toggle_wheel(wheel));
        assert!(w.wheels.contains(&wheel));
        assert_eq!(w.welds[0].anchor_b, Vec2::ZERO);
        assert_eq!(w.welds[0].anchor_a, Vec2::new(80.0, 0.0));
        assert!(w.toggle_wheel(wheel));
        assert!(w.wheels.is_empty());
        assert_eq!(w.welds[0].anchor_b, Vec2::new(-40.0, 0.0));
    }

    #[test]
    fn test_glass_toggle_starts_grace() {
        let mut w = world();
        let id = w.spawn_box(Vec2::new(100.0, 100.0)).expect("spawned");
        w.body_mut(id).expect("live").damage = 0.7;
        assert_eq!(w.toggle_material(id, MaterialFlag::Glass), Some(true));
        let b = w.body(id).expect("live");
        assert_eq!(b.damage, 0.0);
        assert_eq!(b.glass_grace, GLASS_GRACE_STEPS);
        assert_eq!(w.toggle_material(99, MaterialFlag::Bouncy), None);
    }

    #[test]
    fn test_resize_scales_positions() {
        let mut w = world();
        let id = w.spawn_box(Vec2::new(200.0, 150.0)).expect("spawned");
        w.resize(Vec2::new(1600.0, 300.0));
        assert_eq!(w.body(id).expect("live").pos, Vec2::new(400.0, 75.0));
        assert!((w.wave.baseline - 300.0 * WATER_BASELINE_FRACTION).abs() < 1e-3);
    }

    #[test]
    fn test_reset_clears_scene() {
        let mut w = world();
        w.set_location(Location::Water);
        let a = w.spawn_box(Vec2::new(100.0, 100.0)).expect("spawned");
        let b = w.spawn_box(Vec2::new(200.0, 100.0)).expect("spawned");
        w.weld(a, b);
        w.disturb_water(400.0, 3.0, 0.35);
        assert!(!w.particles.droplets.is_empty());
        w.reset_scene();
        assert!(w.bodies.is_empty() && w.welds.is_empty());
        assert!(w.particles.droplets.is_empty());
        assert!(w.wave.velocities().iter().all(|v| *v == 0.0));
        assert_eq!(w.undo_last_spawn(), None);
    }

    #[test]
    fn test_switching_to_land_clears_droplets() {
        let mut w = world();
        w.set_location(Location::Water);
        w.disturb_water(400.0, 3.0, 0.35);
        w.set_location(Location::Land);
        assert!(w.particles.droplets.is_empty());
    }
}
