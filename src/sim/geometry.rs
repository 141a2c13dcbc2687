//! Polygon geometry for body shapes
//!
//! Vertex rings are stored counter-clockwise in the math sense (positive
//! shoelace area). Screen space is y-down, so the outward normal of edge
//! `b - a` is `(e.y, -e.x)` normalized either way.

use glam::Vec2;

use crate::consts::{COLLISION_RING_MAX, EPSILON};
use crate::cross;

/// Rings with less area than this are treated as degenerate (px²)
pub const MIN_POLYGON_AREA: f32 = 4.0;

/// Shoelace signed area (positive for counter-clockwise rings)
pub fn signed_area(ring: &[Vec2]) -> f32 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        sum += cross(a, b);
    }
    sum * 0.5
}

/// Unsigned polygon area
#[inline]
pub fn area(ring: &[Vec2]) -> f32 {
    signed_area(ring).abs()
}

/// Area centroid; falls back to the vertex average for degenerate rings
pub fn centroid(ring: &[Vec2]) -> Vec2 {
    if ring.is_empty() {
        return Vec2::ZERO;
    }
    let a = signed_area(ring);
    if a.abs() < EPSILON {
        return ring.iter().copied().sum::<Vec2>() / ring.len() as f32;
    }
    let mut c = Vec2::ZERO;
    for i in 0..ring.len() {
        let p = ring[i];
        let q = ring[(i + 1) % ring.len()];
        c += (p + q) * cross(p, q);
    }
    c / (6.0 * a)
}

/// Polar moment of inertia per unit mass about the centroid
pub fn inertia_per_mass(ring: &[Vec2]) -> f32 {
    if ring.len() < 3 {
        return 1.0;
    }
    let c = centroid(ring);
    let mut num = 0.0;
    let mut den = 0.0;
    for i in 0..ring.len() {
        let a = ring[i] - c;
        let b = ring[(i + 1) % ring.len()] - c;
        let w = cross(a, b);
        num += w * (a.dot(a) + a.dot(b) + b.dot(b));
        den += w;
    }
    (num / (6.0 * den.abs().max(EPSILON)) * den.signum()).abs().max(EPSILON)
}

/// Reorder a ring to be counter-clockwise
pub fn ensure_ccw(ring: &mut [Vec2]) {
    if signed_area(ring) < 0.0 {
        ring.reverse();
    }
}

/// Convex hull (Andrew's monotone chain), counter-clockwise, collinear points dropped
pub fn convex_hull(points: &[Vec2]) -> Vec<Vec2> {
    let mut pts: Vec<Vec2> = points.iter().copied().filter(|p| p.is_finite()).collect();
    pts.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
    });
    pts.dedup_by(|a, b| (*a - *b).length_squared() < 1e-6);
    if pts.len() < 3 {
        return pts;
    }

    let mut hull: Vec<Vec2> = Vec::with_capacity(pts.len() * 2);
    for &p in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 1] - hull[hull.len() - 2], p - hull[hull.len() - 2]) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(hull[hull.len() - 1] - hull[hull.len() - 2], p - hull[hull.len() - 2]) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Crossing-number point-in-polygon test (works for non-convex rings too)
pub fn point_in_polygon(p: Vec2, ring: &[Vec2]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Closest point to `p` on segment `a..b`
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Outward unit normal of edge `a -> b` on a counter-clockwise ring
#[inline]
pub fn edge_normal(a: Vec2, b: Vec2) -> Vec2 {
    let e = b - a;
    Vec2::new(e.y, -e.x).normalize_or_zero()
}

/// Largest distance from the origin to a ring vertex
pub fn bounding_radius(ring: &[Vec2]) -> f32 {
    ring.iter().map(|v| v.length()).fold(0.0, f32::max)
}

/// Axis-aligned box ring centred on the origin
pub fn box_ring(half_w: f32, half_h: f32) -> Vec<Vec2> {
    vec![
        Vec2::new(-half_w, -half_h),
        Vec2::new(half_w, -half_h),
        Vec2::new(half_w, half_h),
        Vec2::new(-half_w, half_h),
    ]
}

/// Shift a ring so its area centroid sits at the origin; returns (centroid, local ring)
pub fn recenter(ring: &[Vec2]) -> (Vec2, Vec<Vec2>) {
    let c = centroid(ring);
    (c, ring.iter().map(|&v| v - c).collect())
}

/// Evenly resample a point list down to at most `max` points (keeps first/last)
pub fn resample(points: &[Vec2], max: usize) -> Vec<Vec2> {
    if points.len() <= max || max < 2 {
        return points.to_vec();
    }
    let step = (points.len() - 1) as f32 / (max - 1) as f32;
    (0..max)
        .map(|i| {
            let idx = ((i as f32 * step).round() as usize).min(points.len() - 1);
            points[idx]
        })
        .collect()
}

/// Reduced collision ring: drop the vertex contributing least area until the ring fits
pub fn reduce_ring(ring: &[Vec2]) -> Option<Vec<Vec2>> {
    if ring.len() <= COLLISION_RING_MAX {
        return None;
    }
    let mut out = ring.to_vec();
    while out.len() > COLLISION_RING_MAX {
        let n = out.len();
        let mut best = 0;
        let mut best_area = f32::MAX;
        for i in 0..n {
            let prev = out[(i + n - 1) % n];
            let next = out[(i + 1) % n];
            let tri = cross(out[i] - prev, next - prev).abs();
            if tri < best_area {
                best_area = tri;
                best = i;
            }
        }
        out.remove(best);
    }
    Some(out)
}

/// True if the ring has enough vertices and area to become a body
pub fn is_valid_ring(ring: &[Vec2]) -> bool {
    ring.len() >= 3 && area(ring) >= MIN_POLYGON_AREA && ring.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<Vec2> {
        box_ring(0.5, 0.5)
    }

    #[test]
    fn test_square_area_and_centroid() {
        let sq = unit_square();
        assert!((signed_area(&sq) - 1.0).abs() < 1e-6);
        assert!(centroid(&sq).length() < 1e-6);
    }

    #[test]
    fn test_square_inertia_matches_closed_form() {
        let ring = box_ring(28.0, 14.0);
        let expected = (56.0f32 * 56.0 + 28.0 * 28.0) / 12.0;
        assert!((inertia_per_mass(&ring) - expected).abs() / expected < 1e-4);
    }

    #[test]
    fn test_hull_drops_interior_points() {
        let pts = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(5.0, 2.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
            Vec2::new(4.0, 6.0),
        ];
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert!(signed_area(&hull) > 0.0);
        assert!((area(&hull) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_hull_of_collinear_points_is_degenerate() {
        let pts: Vec<Vec2> = (0..5).map(|i| Vec2::new(i as f32, i as f32)).collect();
        assert!(convex_hull(&pts).len() < 3);
    }

    #[test]
    fn test_point_in_polygon() {
        let sq = unit_square();
        assert!(point_in_polygon(Vec2::new(0.1, -0.2), &sq));
        assert!(!point_in_polygon(Vec2::new(0.7, 0.0), &sq));
    }

    #[test]
    fn test_closest_point_on_segment_clamps() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 0.0);
        assert_eq!(closest_point_on_segment(Vec2::new(-5.0, 3.0), a, b), a);
        assert_eq!(closest_point_on_segment(Vec2::new(4.0, 3.0), a, b), Vec2::new(4.0, 0.0));
    }

    #[test]
    fn test_edge_normal_points_outward() {
        let sq = unit_square();
        // Edge from (-.5,-.5) to (.5,-.5) is the y = -0.5 side
        let n = edge_normal(sq[0], sq[1]);
        assert!((n - Vec2::new(0.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn test_reduce_ring_caps_vertex_count() {
        let ring: Vec<Vec2> = (0..30)
            .map(|i| {
                let a = i as f32 / 30.0 * std::f32::consts::TAU;
                Vec2::new(a.cos(), a.sin()) * 40.0
            })
            .collect();
        let reduced = reduce_ring(&ring).expect("ring is larger than the cap");
        assert_eq!(reduced.len(), COLLISION_RING_MAX);
        assert!(area(&reduced) > 0.8 * area(&ring));
        assert!(reduce_ring(&reduced).is_none());
    }
}
