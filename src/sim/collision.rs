//! Narrow-phase collision between body shapes
//!
//! - circle/circle: distance test, one contact halfway between the surfaces
//! - polygon/circle: closest point on the polygon boundary, with the normal
//!   flipped when the circle centre is inside
//! - polygon/polygon: SAT for the reference face, then the incident edge is
//!   clipped against the reference side planes (0-2 contacts)
//!
//! Every manifold normal points from body A toward body B. A missing manifold
//! is the ordinary "not touching" answer.

use glam::Vec2;

use super::body::{RigidBody, Shape};
use super::geometry::{closest_point_on_segment, edge_normal, point_in_polygon};
use crate::consts::EPSILON;

/// Reference face is switched to B only when it separates noticeably better
const REFERENCE_RELATIVE_TOL: f32 = 0.98;
const REFERENCE_ABSOLUTE_TOL: f32 = 0.1;

/// One contact point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    /// World position of the contact
    pub point: Vec2,
    /// Overlap depth along the manifold normal (px, positive)
    pub penetration: f32,
}

/// Contact manifold for one colliding pair
#[derive(Debug, Clone, PartialEq)]
pub struct Manifold {
    /// Unit normal from A toward B
    pub normal: Vec2,
    pub contacts: Vec<ContactPoint>,
}

impl Manifold {
    fn single(normal: Vec2, point: Vec2, penetration: f32) -> Self {
        Self {
            normal,
            contacts: vec![ContactPoint { point, penetration }],
        }
    }

    /// Deepest penetration among the contacts
    pub fn max_penetration(&self) -> f32 {
        self.contacts.iter().map(|c| c.penetration).fold(0.0, f32::max)
    }

    fn flipped(mut self) -> Self {
        self.normal = -self.normal;
        self
    }
}

/// World-space collision view of a body
enum Collider {
    Circle { center: Vec2, radius: f32 },
    Polygon(Vec<Vec2>),
}

impl Collider {
    fn of(body: &RigidBody) -> Self {
        match (&body.shape, body.world_ring()) {
            (Shape::Circle { radius }, _) => Collider::Circle {
                center: body.pos,
                radius: *radius,
            },
            (_, Some(ring)) => Collider::Polygon(ring),
            (_, None) => Collider::Circle {
                center: body.pos,
                radius: body.shape.bounding_radius(),
            },
        }
    }
}

/// Bounding-circle rejection test
#[inline]
pub fn bounds_overlap(a: &RigidBody, b: &RigidBody) -> bool {
    let r = a.shape.bounding_radius() + b.shape.bounding_radius();
    (b.pos - a.pos).length_squared() <= r * r
}

/// Collide two bodies; `None` when they do not overlap
pub fn collide(a: &RigidBody, b: &RigidBody) -> Option<Manifold> {
    if !bounds_overlap(a, b) {
        return None;
    }
    match (Collider::of(a), Collider::of(b)) {
        (Collider::Circle { center: ca, radius: ra }, Collider::Circle { center: cb, radius: rb }) => {
            circle_circle(ca, ra, cb, rb)
        }
        (Collider::Polygon(ring), Collider::Circle { center, radius }) => polygon_circle(&ring, center, radius),
        (Collider::Circle { center, radius }, Collider::Polygon(ring)) => {
            polygon_circle(&ring, center, radius).map(Manifold::flipped)
        }
        (Collider::Polygon(ra), Collider::Polygon(rb)) => polygon_polygon(&ra, &rb),
    }
}

/// Circle against circle
pub fn circle_circle(ca: Vec2, ra: f32, cb: Vec2, rb: f32) -> Option<Manifold> {
    let d = cb - ca;
    let dist = d.length();
    let penetration = ra + rb - dist;
    if penetration <= 0.0 {
        return None;
    }
    let normal = if dist > EPSILON { d / dist } else { Vec2::Y };
    let surface_a = ca + normal * ra;
    let surface_b = cb - normal * rb;
    Some(Manifold::single(normal, (surface_a + surface_b) * 0.5, penetration))
}

/// Polygon (A) against circle (B)
pub fn polygon_circle(ring: &[Vec2], center: Vec2, radius: f32) -> Option<Manifold> {
    if ring.len() < 3 {
        return None;
    }
    let mut closest = ring[0];
    let mut best_dist_sq = f32::MAX;
    let mut best_edge = 0;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        let p = closest_point_on_segment(center, a, b);
        let d = (center - p).length_squared();
        if d < best_dist_sq {
            best_dist_sq = d;
            closest = p;
            best_edge = i;
        }
    }
    let dist = best_dist_sq.sqrt();
    let inside = point_in_polygon(center, ring);
    let fallback = edge_normal(ring[best_edge], ring[(best_edge + 1) % ring.len()]);

    if inside {
        // Flipped: the circle escapes through the nearest face
        let normal = if dist > EPSILON { (closest - center) / dist } else { fallback };
        Some(Manifold::single(normal, closest, radius + dist))
    } else {
        if dist >= radius {
            return None;
        }
        let normal = if dist > EPSILON { (center - closest) / dist } else { fallback };
        Some(Manifold::single(normal, closest, radius - dist))
    }
}

/// Largest separation of `b` from any face of `a`, with that face's index
fn max_separation(a: &[Vec2], b: &[Vec2]) -> (f32, usize) {
    let mut best = f32::MIN;
    let mut best_edge = 0;
    for i in 0..a.len() {
        let v1 = a[i];
        let n = edge_normal(v1, a[(i + 1) % a.len()]);
        let deepest = b.iter().map(|&p| n.dot(p - v1)).fold(f32::MAX, f32::min);
        if deepest > best {
            best = deepest;
            best_edge = i;
        }
    }
    (best, best_edge)
}

/// Keep the part of a two-point segment with `normal·p - offset <= 0`
fn clip_segment(points: [Vec2; 2], normal: Vec2, offset: f32) -> Option<[Vec2; 2]> {
    let d0 = normal.dot(points[0]) - offset;
    let d1 = normal.dot(points[1]) - offset;
    let mut out = [Vec2::ZERO; 2];
    let mut count = 0;
    if d0 <= 0.0 {
        out[count] = points[0];
        count += 1;
    }
    if d1 <= 0.0 {
        out[count] = points[1];
        count += 1;
    }
    if d0 * d1 < 0.0 && count < 2 {
        let t = d0 / (d0 - d1);
        out[count] = points[0] + (points[1] - points[0]) * t;
        count += 1;
    }
    (count == 2).then_some(out)
}

/// Convex polygon (A) against convex polygon (B)
pub fn polygon_polygon(ring_a: &[Vec2], ring_b: &[Vec2]) -> Option<Manifold> {
    if ring_a.len() < 3 || ring_b.len() < 3 {
        return None;
    }
    let (sep_a, edge_a) = max_separation(ring_a, ring_b);
    if sep_a > 0.0 {
        return None;
    }
    let (sep_b, edge_b) = max_separation(ring_b, ring_a);
    if sep_b > 0.0 {
        return None;
    }

    let flip = sep_b > REFERENCE_RELATIVE_TOL * sep_a + REFERENCE_ABSOLUTE_TOL;
    let (reference, incident, ref_edge) = if flip {
        (ring_b, ring_a, edge_b)
    } else {
        (ring_a, ring_b, edge_a)
    };

    let v1 = reference[ref_edge];
    let v2 = reference[(ref_edge + 1) % reference.len()];
    let ref_normal = edge_normal(v1, v2);
    let tangent = (v2 - v1).normalize_or_zero();

    let inc_edge = (0..incident.len())
        .min_by(|&i, &j| {
            let ni = edge_normal(incident[i], incident[(i + 1) % incident.len()]).dot(ref_normal);
            let nj = edge_normal(incident[j], incident[(j + 1) % incident.len()]).dot(ref_normal);
            ni.partial_cmp(&nj).unwrap_or(std::cmp::Ordering::Equal)
        })
        .unwrap_or(0);
    let inc = [incident[inc_edge], incident[(inc_edge + 1) % incident.len()]];

    let clipped = clip_segment(inc, -tangent, -tangent.dot(v1))?;
    let clipped = clip_segment(clipped, tangent, tangent.dot(v2))?;

    let contacts: Vec<ContactPoint> = clipped
        .iter()
        .filter_map(|&p| {
            let separation = ref_normal.dot(p - v1);
            (separation < 0.0).then_some(ContactPoint {
                point: p,
                penetration: -separation,
            })
        })
        .collect();
    if contacts.is_empty() {
        return None;
    }

    let normal = if flip { -ref_normal } else { ref_normal };
    Some(Manifold { normal, contacts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::BASE_HALF;
    use crate::tuning::Tuning;
    use proptest::prelude::*;

    fn square(at: Vec2) -> RigidBody {
        RigidBody::new(1, Shape::Box { half: Vec2::splat(BASE_HALF) }, at, &Tuning::default())
    }

    fn circle(at: Vec2, radius: f32) -> RigidBody {
        RigidBody::new(2, Shape::Circle { radius }, at, &Tuning::default())
    }

    #[test]
    fn test_overlapping_boxes_give_two_contacts() {
        let depth = 3.0;
        let a = square(Vec2::ZERO);
        let b = square(Vec2::new(2.0 * BASE_HALF - depth, 0.0));
        let m = collide(&a, &b).expect("boxes overlap");
        assert_eq!(m.contacts.len(), 2);
        assert!((m.normal - Vec2::X).length() < 1e-5);
        for c in &m.contacts {
            assert!((c.penetration - depth).abs() < 1e-3);
        }
    }

    #[test]
    fn test_normal_points_from_a_to_b() {
        let a = square(Vec2::new(0.0, 50.0));
        let b = square(Vec2::new(5.0, 0.0));
        let m = collide(&a, &b).expect("boxes overlap");
        assert!(m.normal.y < -0.99);
        let m = collide(&b, &a).expect("boxes overlap");
        assert!(m.normal.y > 0.99);
    }

    #[test]
    fn test_circle_circle_contact() {
        let a = circle(Vec2::ZERO, 10.0);
        let b = circle(Vec2::new(16.0, 0.0), 10.0);
        let m = collide(&a, &b).expect("circles overlap");
        assert_eq!(m.contacts.len(), 1);
        assert!((m.contacts[0].penetration - 4.0).abs() < 1e-5);
        assert!((m.contacts[0].point - Vec2::new(8.0, 0.0)).length() < 1e-5);
        assert!(collide(&a, &circle(Vec2::new(21.0, 0.0), 10.0)).is_none());
    }

    #[test]
    fn test_box_circle_outside_and_inside() {
        let b = square(Vec2::ZERO);
        // Circle resting into the top face (screen y-down, top is negative y)
        let c = circle(Vec2::new(0.0, -BASE_HALF - 8.0), 10.0);
        let m = collide(&b, &c).expect("touching");
        assert!((m.normal - Vec2::new(0.0, -1.0)).length() < 1e-5);
        assert!((m.contacts[0].penetration - 2.0).abs() < 1e-4);

        // Centre inside the box near the top face
        let c = circle(Vec2::new(0.0, -BASE_HALF + 4.0), 10.0);
        let m = collide(&b, &c).expect("deep");
        assert!(m.normal.y < -0.99);
        assert!((m.contacts[0].penetration - 14.0).abs() < 1e-4);

        // Swapping the order flips the normal
        let m = collide(&c, &b).expect("deep");
        assert!(m.normal.y > 0.99);
    }

    #[test]
    fn test_rotated_box_corner_hits_face() {
        let a = square(Vec2::ZERO);
        let mut b = square(Vec2::new(0.0, -(BASE_HALF + BASE_HALF * std::f32::consts::SQRT_2) + 2.0));
        b.angle = std::f32::consts::FRAC_PI_4;
        let m = collide(&a, &b).expect("corner overlaps");
        assert_eq!(m.contacts.len(), 1);
        assert!((m.contacts[0].penetration - 2.0).abs() < 1e-2);
        assert!(m.normal.y < -0.99);
    }

    proptest! {
        #[test]
        fn prop_separated_bounds_never_collide(
            angle_a in -3.2f32..3.2,
            angle_b in -3.2f32..3.2,
            dir in -3.2f32..3.2,
            gap in 0.01f32..200.0,
        ) {
            let mut a = square(Vec2::ZERO);
            a.angle = angle_a;
            let reach = 2.0 * a.shape.bounding_radius() + gap;
            let mut b = square(Vec2::new(dir.cos(), dir.sin()) * reach);
            b.angle = angle_b;
            prop_assert!(collide(&a, &b).is_none());
        }

        #[test]
        fn prop_penetration_is_positive(
            dx in -50.0f32..50.0,
            dy in -50.0f32..50.0,
            angle in -3.2f32..3.2,
        ) {
            let a = square(Vec2::ZERO);
            let mut b = square(Vec2::new(dx, dy));
            b.angle = angle;
            if let Some(m) = collide(&a, &b) {
                prop_assert!((m.normal.length() - 1.0).abs() < 1e-3);
                for c in &m.contacts {
                    prop_assert!(c.penetration > 0.0);
                }
            }
        }
    }
}
