// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D Boolean Operations for Footprint Repair
//!
//! Drawn room outlines are frequently self-intersecting (a closing vertex
//! dragged past the first edge, a bow-tie from a mis-snapped corner). This
//! module resolves such rings into valid simple polygons with the i_overlay
//! crate before any distance or area query runs on them.

use crate::error::{Error, Result};
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use nalgebra::Point2;

/// Minimum area threshold - polygons smaller than this are considered degenerate
const MIN_AREA_THRESHOLD: f64 = 1e-10;

/// A simple polygon produced by the overlay
#[derive(Debug, Clone, PartialEq)]
pub struct SimplePolygon {
    /// Outer boundary (counter-clockwise)
    pub outer: Vec<Point2<f64>>,
    /// Holes (clockwise)
    pub holes: Vec<Vec<Point2<f64>>>,
}

impl SimplePolygon {
    pub fn area(&self) -> f64 {
        compute_signed_area(&self.outer).abs()
            - self
                .holes
                .iter()
                .map(|h| compute_signed_area(h).abs())
                .sum::<f64>()
    }
}

/// Resolve a possibly self-intersecting ring into simple polygons.
///
/// The ring is filled with the non-zero rule, so a bow-tie yields its two
/// lobes and a ring that doubles back over itself yields its covered area.
pub fn repair_ring(ring: &[Point2<f64>]) -> Result<Vec<SimplePolygon>> {
    if ring.len() < 3 {
        return Err(Error::InvalidPolygon(
            "Ring must have at least 3 vertices".to_string(),
        ));
    }
    if ring.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(Error::NonFinite("ring"));
    }

    let subject = vec![contour_to_path(ring)];
    let clip: Vec<Vec<[f64; 2]>> = Vec::new();
    let result = subject.overlay(&clip, OverlayRule::Union, FillRule::NonZero);

    Ok(shapes_to_polygons(&result))
}

/// Largest simple polygon covered by `ring`.
pub fn repair_ring_largest(ring: &[Point2<f64>]) -> Result<SimplePolygon> {
    repair_ring(ring)?
        .into_iter()
        .max_by(|a, b| a.area().total_cmp(&b.area()))
        .ok_or_else(|| {
            Error::InvalidPolygon("Boolean operation resulted in empty geometry".to_string())
        })
}

/// Compute the signed area of a 2D contour
/// Positive = counter-clockwise, Negative = clockwise
pub fn compute_signed_area(contour: &[Point2<f64>]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    let n = contour.len();

    for i in 0..n {
        let j = (i + 1) % n;
        area += contour[i].x * contour[j].y;
        area -= contour[j].x * contour[i].y;
    }

    area * 0.5
}

/// Check if a point is inside a contour using ray casting
pub fn point_in_contour(point: &Point2<f64>, contour: &[Point2<f64>]) -> bool {
    if contour.len() < 3 {
        return false;
    }

    let mut inside = false;
    let n = contour.len();

    let mut j = n - 1;
    for i in 0..n {
        let pi = &contour[i];
        let pj = &contour[j];

        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Compute bounding box of a contour
pub fn contour_bounds(contour: &[Point2<f64>]) -> Option<(Point2<f64>, Point2<f64>)> {
    let (first, rest) = contour.split_first()?;
    let mut min = *first;
    let mut max = *first;

    for p in rest {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }

    Some((min, max))
}

// ============================================================================
// Internal Helper Functions
// ============================================================================

/// Convert a Point2 contour to i_overlay path format
fn contour_to_path(contour: &[Point2<f64>]) -> Vec<[f64; 2]> {
    contour.iter().map(|p| [p.x, p.y]).collect()
}

fn path_to_contour(path: &[[f64; 2]]) -> Vec<Point2<f64>> {
    path.iter().map(|p| Point2::new(p[0], p[1])).collect()
}

fn is_valid_contour(contour: &[Point2<f64>]) -> bool {
    contour.len() >= 3 && compute_signed_area(contour).abs() > MIN_AREA_THRESHOLD
}

fn ensure_ccw(contour: &[Point2<f64>]) -> Vec<Point2<f64>> {
    if compute_signed_area(contour) < 0.0 {
        contour.iter().rev().copied().collect()
    } else {
        contour.to_vec()
    }
}

fn ensure_cw(contour: &[Point2<f64>]) -> Vec<Point2<f64>> {
    if compute_signed_area(contour) > 0.0 {
        contour.iter().rev().copied().collect()
    } else {
        contour.to_vec()
    }
}

/// Convert i_overlay result shapes to polygons
///
/// i_overlay returns Vec<Vec<Vec<[f64; 2]>>> where:
/// - Outer Vec: list of shapes
/// - Middle Vec: list of contours per shape (first is outer, rest are holes)
/// - Inner Vec: list of points per contour
fn shapes_to_polygons(shapes: &[Vec<Vec<[f64; 2]>>]) -> Vec<SimplePolygon> {
    shapes
        .iter()
        .filter_map(|shape| {
            let (outer, holes) = shape.split_first()?;
            let outer = path_to_contour(outer);
            if !is_valid_contour(&outer) {
                return None;
            }
            let holes = holes
                .iter()
                .map(|h| path_to_contour(h))
                .filter(|h| is_valid_contour(h))
                .map(|h| ensure_cw(&h))
                .collect();
            Some(SimplePolygon {
                outer: ensure_ccw(&outer),
                holes,
            })
        })
        .collect()
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
    fn test_compute_signed_area_ccw() {
        assert_relative_eq!(compute_signed_area(&square(0.0, 0.0, 1.0)), 1.0);
    }

    #[test]
    fn test_compute_signed_area_cw() {
        let cw: Vec<_> = square(0.0, 0.0, 1.0).into_iter().rev().collect();
        assert_relative_eq!(compute_signed_area(&cw), -1.0);
        assert!(compute_signed_area(&ensure_ccw(&cw)) > 0.0);
    }

    #[test]
    fn test_repair_simple_ring_keeps_area() {
        let fixed = repair_ring_largest(&square(0.0, 0.0, 3.0)).unwrap();
        assert_relative_eq!(fixed.area(), 9.0, epsilon = 1e-6);
        assert!(fixed.holes.is_empty());
    }

    #[test]
    fn test_repair_bowtie() {
        let bowtie = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(2.0, 0.0),
            Point2::new(0.0, 2.0),
        ];
        let parts = repair_ring(&bowtie).unwrap();
        let total: f64 = parts.iter().map(SimplePolygon::area).sum();
        assert_relative_eq!(total, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_repair_rejects_short_ring() {
        assert!(repair_ring(&[Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)]).is_err());
    }

    #[test]
    fn test_point_in_contour() {
        let sq = square(0.0, 0.0, 1.0);
        assert!(point_in_contour(&Point2::new(0.5, 0.5), &sq));
        assert!(!point_in_contour(&Point2::new(1.5, 0.5), &sq));
    }
}
