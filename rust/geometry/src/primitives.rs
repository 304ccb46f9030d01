// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar primitives: segments, rings and the distance queries the topology
//! and host-resolution code is built on.

use dxf2bim_core::Point2D;
use nalgebra::{Point2, Vector2};

use crate::bool2d::{compute_signed_area, point_in_contour};

/// Epsilon for floating point comparisons in 2D operations
pub const EPSILON_2D: f64 = 1e-9;

#[inline]
pub fn to_point(p: &Point2D) -> Point2<f64> {
    Point2::new(p.x, p.y)
}

#[inline]
pub fn from_point(p: &Point2<f64>) -> Point2D {
    Point2D::new(p.x, p.y)
}

pub fn to_ring(points: &[Point2D]) -> Vec<Point2<f64>> {
    points.iter().map(to_point).collect()
}

/// A straight segment in the drawing plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub a: Point2<f64>,
    pub b: Point2<f64>,
}

/// Where two segments meet
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Crossing {
    /// Single point, with the parameter along each segment.
    Point { t: f64, u: f64 },
    /// Collinear overlap.
    Overlap,
}

#[inline]
fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

impl Segment {
    pub fn new(a: Point2<f64>, b: Point2<f64>) -> Self {
        Self { a, b }
    }

    pub fn from_points(a: &Point2D, b: &Point2D) -> Self {
        Self::new(to_point(a), to_point(b))
    }

    pub fn vector(&self) -> Vector2<f64> {
        self.b - self.a
    }

    pub fn length(&self) -> f64 {
        self.vector().norm()
    }

    pub fn midpoint(&self) -> Point2<f64> {
        nalgebra::center(&self.a, &self.b)
    }

    /// Unit direction, `None` for a zero-length segment.
    pub fn direction(&self) -> Option<Vector2<f64>> {
        let v = self.vector();
        let len = v.norm();
        if len > EPSILON_2D {
            Some(v / len)
        } else {
            None
        }
    }

    pub fn is_finite(&self) -> bool {
        self.a.x.is_finite() && self.a.y.is_finite() && self.b.x.is_finite() && self.b.y.is_finite()
    }

    /// Parameter of the orthogonal projection of `p`, clamped to [0, 1].
    pub fn project(&self, p: &Point2<f64>) -> f64 {
        let v = self.vector();
        let len2 = v.norm_squared();
        if len2 <= EPSILON_2D * EPSILON_2D {
            return 0.0;
        }
        ((p - self.a).dot(&v) / len2).clamp(0.0, 1.0)
    }

    pub fn point_at(&self, t: f64) -> Point2<f64> {
        self.a + self.vector() * t
    }

    pub fn distance_to_point(&self, p: &Point2<f64>) -> f64 {
        (p - self.point_at(self.project(p))).norm()
    }

    /// Intersection with another segment, endpoints included.
    pub fn crossing(&self, other: &Segment) -> Option<Crossing> {
        let r = self.vector();
        let s = other.vector();
        let denom = cross(&r, &s);
        let qp = other.a - self.a;
        let scale = r.norm().max(s.norm()).max(1.0);

        if denom.abs() <= EPSILON_2D * scale * scale {
            // Parallel: overlap only when collinear and the projections meet.
            if cross(&qp, &r).abs() > EPSILON_2D * scale * scale {
                return None;
            }
            let len2 = r.norm_squared();
            if len2 <= EPSILON_2D {
                return None;
            }
            let t0 = qp.dot(&r) / len2;
            let t1 = t0 + s.dot(&r) / len2;
            let (lo, hi) = if t0 < t1 { (t0, t1) } else { (t1, t0) };
            if hi < -EPSILON_2D || lo > 1.0 + EPSILON_2D {
                None
            } else {
                Some(Crossing::Overlap)
            }
        } else {
            let t = cross(&qp, &s) / denom;
            let u = cross(&qp, &r) / denom;
            let eps = EPSILON_2D * 10.0;
            if (-eps..=1.0 + eps).contains(&t) && (-eps..=1.0 + eps).contains(&u) {
                Some(Crossing::Point {
                    t: t.clamp(0.0, 1.0),
                    u: u.clamp(0.0, 1.0),
                })
            } else {
                None
            }
        }
    }

    pub fn intersects(&self, other: &Segment) -> bool {
        self.crossing(other).is_some()
    }

    pub fn distance_to_segment(&self, other: &Segment) -> f64 {
        if self.intersects(other) {
            return 0.0;
        }
        self.distance_to_point(&other.a)
            .min(self.distance_to_point(&other.b))
            .min(other.distance_to_point(&self.a))
            .min(other.distance_to_point(&self.b))
    }
}

/// Consecutive segments of a chain, closing it when asked.
pub fn chain_segments(points: &[Point2<f64>], closed: bool) -> Vec<Segment> {
    let mut segments: Vec<Segment> = points
        .windows(2)
        .map(|w| Segment::new(w[0], w[1]))
        .collect();
    if closed && points.len() > 2 {
        segments.push(Segment::new(points[points.len() - 1], points[0]));
    }
    segments
}

/// Edges of a ring, the closing edge included.
pub fn ring_edges(ring: &[Point2<f64>]) -> Vec<Segment> {
    chain_segments(ring, true)
}

pub fn polygon_area(ring: &[Point2<f64>]) -> f64 {
    compute_signed_area(ring).abs()
}

/// True when no two non-adjacent edges of the ring touch.
pub fn is_simple_ring(ring: &[Point2<f64>]) -> bool {
    let edges = ring_edges(ring);
    let n = edges.len();
    if n < 3 {
        return false;
    }
    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            if adjacent {
                continue;
            }
            if edges[i].intersects(&edges[j]) {
                return false;
            }
        }
    }
    true
}

/// Distance from a polygon, interior included, to a segment. Zero when the
/// segment touches or enters the polygon.
pub fn polygon_segment_distance(ring: &[Point2<f64>], segment: &Segment) -> f64 {
    if point_in_contour(&segment.a, ring) || point_in_contour(&segment.b, ring) {
        return 0.0;
    }
    ring_edges(ring)
        .iter()
        .map(|edge| edge.distance_to_segment(segment))
        .fold(f64::INFINITY, f64::min)
}

/// Distance from a polygon to a chain of segments.
pub fn polygon_chain_distance(ring: &[Point2<f64>], chain: &[Segment]) -> f64 {
    chain
        .iter()
        .map(|s| polygon_segment_distance(ring, s))
        .fold(f64::INFINITY, f64::min)
}

/// Distance between two polygons, interiors included.
pub fn polygon_distance(a: &[Point2<f64>], b: &[Point2<f64>]) -> f64 {
    if a.iter().any(|p| point_in_contour(p, b)) || b.iter().any(|p| point_in_contour(p, a)) {
        return 0.0;
    }
    let edges_b = ring_edges(b);
    ring_edges(a)
        .iter()
        .flat_map(|ea| edges_b.iter().map(move |eb| ea.distance_to_segment(eb)))
        .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(x0, y0),
            Point2::new(x0 + size, y0),
            Point2::new(x0 + size, y0 + size),
            Point2::new(x0, y0 + size),
        ]
    }

    #[test]
    fn test_point_distance_clamps_to_endpoints() {
        let s = Segment::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0));
        assert_relative_eq!(s.distance_to_point(&Point2::new(5.0, 3.0)), 3.0);
        assert_relative_eq!(s.distance_to_point(&Point2::new(13.0, 4.0)), 5.0);
    }

    #[test]
    fn test_crossing_point() {
        let a = Segment::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0));
        let b = Segment::new(Point2::new(4.0, -2.0), Point2::new(4.0, 2.0));
        match a.crossing(&b) {
            Some(Crossing::Point { t, u }) => {
                assert_relative_eq!(t, 0.4);
                assert_relative_eq!(u, 0.5);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parallel_segments() {
        let a = Segment::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0));
        let b = Segment::new(Point2::new(0.0, 1.0), Point2::new(10.0, 1.0));
        assert!(a.crossing(&b).is_none());
        assert_relative_eq!(a.distance_to_segment(&b), 1.0);

        let c = Segment::new(Point2::new(5.0, 0.0), Point2::new(15.0, 0.0));
        assert_eq!(a.crossing(&c), Some(Crossing::Overlap));
    }

    #[test]
    fn test_simple_ring() {
        assert!(is_simple_ring(&square(0.0, 0.0, 1.0)));
        let bowtie = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ];
        assert!(!is_simple_ring(&bowtie));
    }

    #[test]
    fn test_polygon_segment_distance() {
        let ring = square(0.0, 0.0, 4.0);
        let inside = Segment::new(Point2::new(1.0, 1.0), Point2::new(2.0, 2.0));
        assert_eq!(polygon_segment_distance(&ring, &inside), 0.0);

        let outside = Segment::new(Point2::new(0.0, 4.05), Point2::new(4.0, 4.05));
        assert_relative_eq!(polygon_segment_distance(&ring, &outside), 0.05, epsilon = 1e-9);
    }

    #[test]
    fn test_polygon_distance_symmetric() {
        let a = square(0.0, 0.0, 4.0);
        let b = square(4.1, 0.0, 4.0);
        assert_relative_eq!(polygon_distance(&a, &b), 0.1, epsilon = 1e-9);
        assert_relative_eq!(polygon_distance(&b, &a), 0.1, epsilon = 1e-9);

        let nested = square(1.0, 1.0, 1.0);
        assert_eq!(polygon_distance(&a, &nested), 0.0);
    }
}
