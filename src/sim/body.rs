//! Rigid body entities
//!
//! Bodies are owned by the world in a `Vec` kept sorted by id. Shape
//! differences are data (a tagged enum) and material differences are
//! coefficient overrides looked up by the solver.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry;
use crate::consts::*;
use crate::tuning::Tuning;
use crate::{perp_cross, rotate};

/// Stable body identifier (never reused within a world)
pub type BodyId = u32;

/// Shape discriminant exposed to renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    Box,
    Circle,
    Polygon,
}

/// Collision shape in body-local coordinates (centroid at the origin)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Box { half: Vec2 },
    Circle { radius: f32 },
    Polygon {
        /// Visual ring (counter-clockwise)
        vertices: Vec<Vec2>,
        /// Reduced ring used for collision when the visual ring is large
        collision: Option<Vec<Vec2>>,
    },
}

impl Shape {
    /// Build a polygon shape from a centred, counter-clockwise ring
    pub fn polygon(mut vertices: Vec<Vec2>) -> Self {
        geometry::ensure_ccw(&mut vertices);
        let collision = geometry::reduce_ring(&vertices);
        Shape::Polygon {
            vertices,
            collision,
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Box { .. } => ShapeKind::Box,
            Shape::Circle { .. } => ShapeKind::Circle,
            Shape::Polygon { .. } => ShapeKind::Polygon,
        }
    }

    pub fn area(&self) -> f32 {
        match self {
            Shape::Box { half } => 4.0 * half.x * half.y,
            Shape::Circle { radius } => std::f32::consts::PI * radius * radius,
            Shape::Polygon { vertices, .. } => geometry::area(vertices),
        }
    }

    /// Polar moment of inertia divided by mass
    pub fn inertia_per_mass(&self) -> f32 {
        match self {
            Shape::Box { half } => (4.0 * half.x * half.x + 4.0 * half.y * half.y) / 12.0,
            Shape::Circle { radius } => 0.5 * radius * radius,
            Shape::Polygon { vertices, .. } => geometry::inertia_per_mass(vertices),
        }
    }

    /// Local ring used by the narrow phase (None for circles)
    pub fn collision_ring(&self) -> Option<Vec<Vec2>> {
        match self {
            Shape::Box { half } => Some(geometry::box_ring(half.x, half.y)),
            Shape::Circle { .. } => None,
            Shape::Polygon {
                vertices,
                collision,
            } => Some(collision.clone().unwrap_or_else(|| vertices.clone())),
        }
    }

    /// Radius of the bounding circle around the local origin
    pub fn bounding_radius(&self) -> f32 {
        match self {
            Shape::Box { half } => half.length(),
            Shape::Circle { radius } => *radius,
            Shape::Polygon { vertices, .. } => geometry::bounding_radius(vertices),
        }
    }

    /// Half extents of the unrotated local bounding box
    pub fn local_half_extents(&self) -> Vec2 {
        match self {
            Shape::Box { half } => *half,
            Shape::Circle { radius } => Vec2::splat(*radius),
            Shape::Polygon { vertices, .. } => vertices
                .iter()
                .fold(Vec2::ZERO, |acc, v| acc.max(v.abs())),
        }
    }

    /// Mass ratio knob for this shape
    fn mass_ratio(&self, tuning: &Tuning) -> f32 {
        match self {
            Shape::Box { .. } => tuning.box_mass_ratio,
            Shape::Circle { .. } => tuning.circle_mass_ratio,
            Shape::Polygon { .. } => tuning.polygon_mass_ratio,
        }
    }
}

/// Material flag set; each flag is a coefficient override in the solver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub bouncy: bool,
    pub slippery: bool,
    pub sticky: bool,
    pub glass: bool,
}

/// Which material flag a tool toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialFlag {
    Bouncy,
    Slippery,
    Sticky,
    Glass,
}

impl Material {
    pub fn toggle(&mut self, flag: MaterialFlag) -> bool {
        let slot = match flag {
            MaterialFlag::Bouncy => &mut self.bouncy,
            MaterialFlag::Slippery => &mut self.slippery,
            MaterialFlag::Sticky => &mut self.sticky,
            MaterialFlag::Glass => &mut self.glass,
        };
        *slot = !*slot;
        *slot
    }
}

/// Per-axis and angular velocity ceilings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityLimits {
    pub x: f32,
    pub y: f32,
    pub angular: f32,
}

impl VelocityLimits {
    pub fn from_tuning(tuning: &Tuning, thrown: bool) -> Self {
        let m = if thrown { tuning.throw_limit_multiplier } else { 1.0 };
        Self {
            x: tuning.max_velocity_x * m,
            y: tuning.max_velocity_y * m,
            angular: tuning.max_angular_velocity * m,
        }
    }
}

/// A rigid body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigidBody {
    pub id: BodyId,
    pub shape: Shape,
    /// Centre of mass (screen px)
    pub pos: Vec2,
    pub angle: f32,
    /// Linear velocity (px/step)
    pub vel: Vec2,
    /// Angular velocity (rad/step)
    pub omega: f32,
    pub mass: f32,
    pub inertia: f32,
    pub material: Material,
    /// Steps left in which the boosted throw limits apply
    #[serde(default)]
    pub throw_grace: u32,
    /// Accumulated glass damage
    #[serde(default)]
    pub damage: f32,
    /// Steps left in which glass damage may only decay
    #[serde(default)]
    pub glass_grace: u32,
    #[serde(default)]
    pub selected: bool,
    /// Held by the pointer; treated as kinematic by the solver
    #[serde(default)]
    pub dragged: bool,
}

impl RigidBody {
    pub fn new(id: BodyId, shape: Shape, pos: Vec2, tuning: &Tuning) -> Self {
        let mut body = Self {
            id,
            shape,
            pos,
            angle: 0.0,
            vel: Vec2::ZERO,
            omega: 0.0,
            mass: 1.0,
            inertia: 1.0,
            material: Material::default(),
            throw_grace: 0,
            damage: 0.0,
            glass_grace: 0,
            selected: false,
            dragged: false,
        };
        body.recompute_mass(tuning);
        body
    }

    /// Derive mass and inertia from the shape and the body tuning knobs
    pub fn recompute_mass(&mut self, tuning: &Tuning) {
        let area = self.shape.area().max(EPSILON);
        self.mass = (tuning.base_mass * self.shape.mass_ratio(tuning) * area / REFERENCE_AREA).max(EPSILON);
        self.inertia = (self.mass * self.shape.inertia_per_mass() * tuning.base_inertia_scale).max(EPSILON);
    }

    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    #[inline]
    pub fn inv_mass(&self) -> f32 {
        if self.dragged { 0.0 } else { 1.0 / self.mass.max(EPSILON) }
    }

    #[inline]
    pub fn inv_inertia(&self) -> f32 {
        if self.dragged { 0.0 } else { 1.0 / self.inertia.max(EPSILON) }
    }

    /// Characteristic length (square root of area)
    pub fn size(&self) -> f32 {
        self.shape.area().max(EPSILON).sqrt()
    }

    #[inline]
    pub fn to_world(&self, local: Vec2) -> Vec2 {
        self.pos + rotate(local, self.angle)
    }

    #[inline]
    pub fn to_local(&self, world: Vec2) -> Vec2 {
        rotate(world - self.pos, -self.angle)
    }

    /// Collision ring transformed into world space (None for circles)
    pub fn world_ring(&self) -> Option<Vec<Vec2>> {
        self.shape
            .collision_ring()
            .map(|ring| ring.into_iter().map(|v| self.to_world(v)).collect())
    }

    /// Velocity of the material point currently at `world`
    #[inline]
    pub fn velocity_at(&self, world: Vec2) -> Vec2 {
        self.vel + perp_cross(self.omega, world - self.pos)
    }

    /// Apply an impulse at a world point
    pub fn apply_impulse(&mut self, impulse: Vec2, at: Vec2) {
        let r = at - self.pos;
        self.vel += impulse * self.inv_mass();
        self.omega += crate::cross(r, impulse) * self.inv_inertia();
    }

    /// World-space axis-aligned bounding box (min, max)
    pub fn aabb(&self) -> (Vec2, Vec2) {
        match &self.shape {
            Shape::Circle { radius } => (self.pos - Vec2::splat(*radius), self.pos + Vec2::splat(*radius)),
            _ => match self.world_ring() {
                Some(ring) if !ring.is_empty() => ring
                    .iter()
                    .fold((Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)), |(lo, hi), &v| {
                        (lo.min(v), hi.max(v))
                    }),
                _ => (self.pos, self.pos),
            },
        }
    }

    /// Exact point-in-shape test
    pub fn contains_point(&self, world: Vec2) -> bool {
        match &self.shape {
            Shape::Circle { radius } => (world - self.pos).length_squared() <= radius * radius,
            Shape::Box { half } => {
                let l = self.to_local(world);
                l.x.abs() <= half.x && l.y.abs() <= half.y
            }
            Shape::Polygon { vertices, .. } => geometry::point_in_polygon(self.to_local(world), vertices),
        }
    }

    pub fn limits(&self, tuning: &Tuning) -> VelocityLimits {
        VelocityLimits::from_tuning(tuning, self.throw_grace > 0)
    }

    /// Clamp velocities to the configured (possibly throw-boosted) limits
    pub fn clamp_velocity(&mut self, tuning: &Tuning) {
        let lim = self.limits(tuning);
        self.vel.x = self.vel.x.clamp(-lim.x, lim.x);
        self.vel.y = self.vel.y.clamp(-lim.y, lim.y);
        self.omega = self.omega.clamp(-lim.angular, lim.angular);
        if !self.vel.is_finite() {
            self.vel = Vec2::ZERO;
        }
        if !self.omega.is_finite() {
            self.omega = 0.0;
        }
    }

    /// Start a glass grace period with fresh damage
    pub fn reset_glass(&mut self) {
        self.damage = 0.0;
        self.glass_grace = if self.material.glass { GLASS_GRACE_STEPS } else { 0 };
    }
}

/// Index of a body in an id-sorted slice
#[inline]
pub fn index_of(bodies: &[RigidBody], id: BodyId) -> Option<usize> {
    bodies.binary_search_by_key(&id, |b| b.id).ok()
}

/// Borrow two distinct bodies mutably
pub fn pair_mut(bodies: &mut [RigidBody], a: usize, b: usize) -> Option<(&mut RigidBody, &mut RigidBody)> {
    if a == b || a >= bodies.len() || b >= bodies.len() {
        return None;
    }
    if a < b {
        let (lo, hi) = bodies.split_at_mut(b);
        Some((&mut lo[a], &mut hi[0]))
    } else {
        let (lo, hi) = bodies.split_at_mut(a);
        Some((&mut hi[0], &mut lo[b]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_mut_orders_arguments() {
        let tuning = Tuning::default();
        let mut bodies: Vec<RigidBody> = (0..3)
            .map(|i| RigidBody::new(i, Shape::Circle { radius: 5.0 }, Vec2::ZERO, &tuning))
            .collect();
        let (a, b) = pair_mut(&mut bodies, 2, 0).expect("distinct");
        assert_eq!((a.id, b.id), (2, 0));
        assert!(pair_mut(&mut bodies, 1, 1).is_none());
    }

    #[test]
    fn test_reference_box_has_base_mass() {
        let tuning = Tuning::default();
        let body = RigidBody::new(1, Shape::Box { half: Vec2::splat(BASE_HALF) }, Vec2::ZERO, &tuning);
        assert!((body.mass - tuning.base_mass).abs() < 1e-5);
    }

    #[test]
    fn test_polygon_mass_scales_with_area() {
        let tuning = Tuning::default();
        let small = RigidBody::new(1, Shape::polygon(geometry::box_ring(20.0, 10.0)), Vec2::ZERO, &tuning);
        let large = RigidBody::new(2, Shape::polygon(geometry::box_ring(40.0, 10.0)), Vec2::ZERO, &tuning);
        let expected = tuning.base_mass * tuning.polygon_mass_ratio * 800.0 / REFERENCE_AREA;
        assert!((small.mass - expected).abs() < 1e-5);
        assert!((large.mass / small.mass - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_world_transform_roundtrip() {
        let tuning = Tuning::default();
        let mut body = RigidBody::new(1, Shape::Box { half: Vec2::new(10.0, 5.0) }, Vec2::new(100.0, 50.0), &tuning);
        body.angle = 0.7;
        let p = Vec2::new(3.0, -4.0);
        assert!((body.to_local(body.to_world(p)) - p).length() < 1e-4);
        assert!(body.contains_point(body.to_world(Vec2::new(9.0, 4.0))));
        assert!(!body.contains_point(body.to_world(Vec2::new(11.0, 0.0))));
    }

    #[test]
    fn test_off_centre_impulse_spins() {
        let tuning = Tuning::default();
        let mut body = RigidBody::new(1, Shape::Box { half: Vec2::splat(BASE_HALF) }, Vec2::ZERO, &tuning);
        body.apply_impulse(Vec2::new(0.0, 1.0), Vec2::new(BASE_HALF, 0.0));
        assert!(body.vel.y > 0.0);
        assert!(body.omega > 0.0);
        // The struck point moves faster than the centre
        let v = body.velocity_at(Vec2::new(BASE_HALF, 0.0));
        assert!(v.y > body.vel.y);
    }

    #[test]
    fn test_dragged_body_is_kinematic() {
        let tuning = Tuning::default();
        let mut body = RigidBody::new(1, Shape::Circle { radius: 10.0 }, Vec2::ZERO, &tuning);
        body.dragged = true;
        body.apply_impulse(Vec2::new(5.0, 5.0), Vec2::new(10.0, 0.0));
        assert_eq!(body.vel, Vec2::ZERO);
        assert_eq!(body.omega, 0.0);
    }

    #[test]
    fn test_throw_grace_raises_limits() {
        let tuning = Tuning::default();
        let mut body = RigidBody::new(1, Shape::Circle { radius: 10.0 }, Vec2::ZERO, &tuning);
        body.vel = Vec2::new(1000.0, -1000.0);
        body.omega = 50.0;
        body.clamp_velocity(&tuning);
        assert_eq!(body.vel.x, tuning.max_velocity_x);
        assert_eq!(body.vel.y, -tuning.max_velocity_y);
        body.vel = Vec2::new(1000.0, 0.0);
        body.throw_grace = 3;
        body.clamp_velocity(&tuning);
        assert!((body.vel.x - tuning.max_velocity_x * tuning.throw_limit_multiplier).abs() < 1e-4);
    }
}
