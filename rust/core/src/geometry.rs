// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity geometry normalization
//!
//! Turns a raw [`DxfEntity`] into a [`GeometryRecord`]: plan coordinates plus
//! the derived scalars (length, area, perimeter, angle, bounds) every later
//! stage reads. Records are immutable once built; all derived values are
//! computed here exactly once.
//!
//! Values stay in drawing units. Conversion to metres is the caller's job,
//! using the document's [`UnitScale`](crate::units::UnitScale).

use std::collections::BTreeMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{DxfEntity, EntityData};
use crate::error::{Error, Result};
use crate::types::{Bounds, Point2D, Point3D};

/// Discriminant of a [`Shape`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GeometryKind {
    Line,
    Circle,
    Arc,
    Polyline,
    Text,
    Insert,
    Dimension,
    Ellipse,
    Hatch,
    Spline,
    Other,
}

/// Normalized plan geometry with derived scalars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "UPPERCASE")]
pub enum Shape {
    Line {
        start: Point2D,
        end: Point2D,
        length: f64,
        /// Direction in degrees, `atan2(dy, dx)`.
        angle: f64,
    },
    Circle {
        center: Point2D,
        radius: f64,
        area: f64,
        circumference: f64,
    },
    Arc {
        center: Point2D,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        /// Counter-clockwise sweep in degrees, (0, 360].
        sweep: f64,
        length: f64,
        /// Sector area.
        area: f64,
    },
    Polyline {
        points: Vec<Point2D>,
        closed: bool,
        /// Path length of the open chain.
        length: f64,
        /// Path length including the closing segment when closed.
        perimeter: f64,
        area: Option<f64>,
    },
    Text {
        text: String,
        insert: Point2D,
        height: Option<f64>,
        rotation: f64,
        /// Rough extent of the string, characters times height.
        width: Option<f64>,
    },
    Insert {
        block_name: String,
        insert: Point2D,
        scale: Point3D,
        rotation: f64,
    },
    Dimension {
        dimension_type: Option<i32>,
        text: Option<String>,
        def_point: Option<Point2D>,
        measurement: Option<f64>,
    },
    Ellipse {
        center: Point2D,
        major_axis: Point2D,
        ratio: f64,
        major_radius: f64,
        minor_radius: f64,
        area: f64,
    },
    Hatch {
        boundary: Vec<Point2D>,
        area: f64,
        perimeter: f64,
    },
    Spline {
        points: Vec<Point2D>,
        closed: bool,
        length: f64,
        area: Option<f64>,
    },
    Other {
        kind: String,
        attributes: BTreeMap<String, Value>,
    },
}

/// One normalized entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryRecord {
    pub handle: String,
    pub layer: String,
    pub elevation: f64,
    pub thickness: Option<f64>,
    pub shape: Shape,
    pub bounds: Option<Bounds>,
}

/// Signed shoelace area, positive for counter-clockwise rings.
pub fn signed_area(points: &[Point2D]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    area * 0.5
}

/// Sum of segment lengths along a chain, optionally closing it.
pub fn path_length(points: &[Point2D], closed: bool) -> f64 {
    let mut length: f64 = points.windows(2).map(|w| w[0].distance_to(&w[1])).sum();
    if closed && points.len() > 2 {
        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            length += last.distance_to(first);
        }
    }
    length
}

fn plan(p: &Point3D) -> Point2D {
    p.xy()
}

fn check_finite(handle: &str, points: &[Point2D]) -> Result<()> {
    if points.iter().all(Point2D::is_finite) {
        Ok(())
    } else {
        Err(Error::invalid_entity(handle, "non-finite coordinate"))
    }
}

fn check_scalar(handle: &str, name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::invalid_entity(handle, format!("non-finite {}", name)))
    }
}

/// Ring without a duplicated closing vertex.
fn open_ring(mut points: Vec<Point2D>) -> Vec<Point2D> {
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

fn arc_sweep(start_angle: f64, end_angle: f64) -> f64 {
    let sweep = (end_angle - start_angle).rem_euclid(360.0);
    if sweep == 0.0 {
        360.0
    } else {
        sweep
    }
}

fn arc_bounds(center: Point2D, radius: f64, start_angle: f64, sweep: f64) -> Bounds {
    let at = |deg: f64| {
        let rad = deg.to_radians();
        Point2D::new(center.x + radius * rad.cos(), center.y + radius * rad.sin())
    };
    let mut bounds = Bounds::from_points([at(start_angle)].iter())
        .unwrap_or_else(|| Bounds::new(center.x, center.y, center.x, center.y));
    bounds.include(&at(start_angle + sweep));
    // Axis crossings inside the sweep extend the box.
    let first_quadrant = (start_angle / 90.0).ceil() as i64;
    let last_quadrant = ((start_angle + sweep) / 90.0).floor() as i64;
    for q in first_quadrant..=last_quadrant {
        bounds.include(&at(q as f64 * 90.0));
    }
    bounds
}

impl GeometryRecord {
    /// Normalize one entity. Fails for geometry no later stage can use:
    /// non-finite coordinates, negative radii, chains with fewer than two
    /// points.
    pub fn from_entity(entity: &DxfEntity) -> Result<Self> {
        let handle = entity.handle.as_str();
        let shape = match &entity.data {
            EntityData::Line { start, end } => {
                let (start, end) = (plan(start), plan(end));
                check_finite(handle, &[start, end])?;
                let dx = end.x - start.x;
                let dy = end.y - start.y;
                Shape::Line {
                    start,
                    end,
                    length: (dx * dx + dy * dy).sqrt(),
                    angle: dy.atan2(dx).to_degrees(),
                }
            }
            EntityData::Circle { center, radius } => {
                let center = plan(center);
                check_finite(handle, &[center])?;
                check_scalar(handle, "radius", *radius)?;
                if *radius < 0.0 {
                    return Err(Error::invalid_entity(handle, "negative radius"));
                }
                Shape::Circle {
                    center,
                    radius: *radius,
                    area: PI * radius * radius,
                    circumference: 2.0 * PI * radius,
                }
            }
            EntityData::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            } => {
                let center = plan(center);
                check_finite(handle, &[center])?;
                check_scalar(handle, "radius", *radius)?;
                check_scalar(handle, "start angle", *start_angle)?;
                check_scalar(handle, "end angle", *end_angle)?;
                if *radius < 0.0 {
                    return Err(Error::invalid_entity(handle, "negative radius"));
                }
                let sweep = arc_sweep(*start_angle, *end_angle);
                let sweep_rad = sweep.to_radians();
                Shape::Arc {
                    center,
                    radius: *radius,
                    start_angle: *start_angle,
                    end_angle: *end_angle,
                    sweep,
                    length: radius * sweep_rad,
                    area: 0.5 * radius * radius * sweep_rad,
                }
            }
            EntityData::Polyline { points, closed } => {
                let points: Vec<Point2D> = points.iter().map(plan).collect();
                check_finite(handle, &points)?;
                if points.len() < 2 {
                    return Err(Error::invalid_entity(handle, "polyline needs two points"));
                }
                // A chain whose last vertex repeats the first is closed.
                let closed = *closed
                    || (points.len() > 3 && points.first() == points.last());
                let points = if closed { open_ring(points) } else { points };
                let length = path_length(&points, false);
                let perimeter = path_length(&points, closed);
                let area = if closed && points.len() >= 3 {
                    Some(signed_area(&points).abs())
                } else {
                    None
                };
                Shape::Polyline {
                    points,
                    closed,
                    length,
                    perimeter,
                    area,
                }
            }
            EntityData::Text {
                text,
                insert,
                height,
                rotation,
            } => {
                let insert = plan(insert);
                check_finite(handle, &[insert])?;
                let chars = text.chars().count() as f64;
                Shape::Text {
                    text: text.clone(),
                    insert,
                    height: *height,
                    rotation: *rotation,
                    width: height.filter(|h| h.is_finite()).map(|h| h * chars),
                }
            }
            EntityData::Insert {
                block_name,
                insert,
                scale,
                rotation,
            } => {
                let insert_point = plan(insert);
                check_finite(handle, &[insert_point])?;
                Shape::Insert {
                    block_name: block_name.clone(),
                    insert: insert_point,
                    scale: *scale,
                    rotation: *rotation,
                }
            }
            EntityData::Dimension {
                dimension_type,
                text,
                def_point,
                measurement,
            } => Shape::Dimension {
                dimension_type: *dimension_type,
                text: text.clone(),
                def_point: def_point.as_ref().map(plan).filter(Point2D::is_finite),
                measurement: measurement.filter(|m| m.is_finite()),
            },
            EntityData::Ellipse {
                center,
                major_axis,
                ratio,
            } => {
                let center = plan(center);
                let axis = plan(major_axis);
                check_finite(handle, &[center, axis])?;
                check_scalar(handle, "ratio", *ratio)?;
                if *ratio <= 0.0 || *ratio > 1.0 {
                    return Err(Error::invalid_entity(handle, "ellipse ratio outside (0, 1]"));
                }
                let major_radius = (axis.x * axis.x + axis.y * axis.y).sqrt();
                let minor_radius = major_radius * ratio;
                Shape::Ellipse {
                    center,
                    major_axis: axis,
                    ratio: *ratio,
                    major_radius,
                    minor_radius,
                    area: PI * major_radius * minor_radius,
                }
            }
            EntityData::Hatch { boundary, area } => {
                let boundary = open_ring(boundary.iter().map(plan).collect());
                check_finite(handle, &boundary)?;
                let computed = signed_area(&boundary).abs();
                let area = match area {
                    Some(a) if a.is_finite() && *a > 0.0 => *a,
                    _ => computed,
                };
                if boundary.len() < 3 && area <= 0.0 {
                    return Err(Error::invalid_entity(handle, "hatch without boundary"));
                }
                Shape::Hatch {
                    perimeter: path_length(&boundary, true),
                    boundary,
                    area,
                }
            }
            EntityData::Spline { points, closed } => {
                let points: Vec<Point2D> = points.iter().map(plan).collect();
                check_finite(handle, &points)?;
                if points.len() < 2 {
                    return Err(Error::invalid_entity(handle, "spline needs two points"));
                }
                let closed = *closed || (points.len() > 3 && points.first() == points.last());
                let points = if closed { open_ring(points) } else { points };
                let area = if closed && points.len() >= 3 {
                    Some(signed_area(&points).abs())
                } else {
                    None
                };
                Shape::Spline {
                    length: path_length(&points, closed),
                    points,
                    closed,
                    area,
                }
            }
            EntityData::Other { kind, attributes } => Shape::Other {
                kind: kind.clone(),
                attributes: attributes.clone(),
            },
        };

        let elevation = entity
            .properties
            .elevation
            .filter(|e| e.is_finite())
            .unwrap_or_else(|| first_z(&entity.data));

        let bounds = shape_bounds(&shape);
        Ok(GeometryRecord {
            handle: entity.handle.clone(),
            layer: entity.layer.clone(),
            elevation,
            thickness: entity.properties.thickness.filter(|t| t.is_finite() && *t > 0.0),
            shape,
            bounds,
        })
    }

    pub fn kind(&self) -> GeometryKind {
        match &self.shape {
            Shape::Line { .. } => GeometryKind::Line,
            Shape::Circle { .. } => GeometryKind::Circle,
            Shape::Arc { .. } => GeometryKind::Arc,
            Shape::Polyline { .. } => GeometryKind::Polyline,
            Shape::Text { .. } => GeometryKind::Text,
            Shape::Insert { .. } => GeometryKind::Insert,
            Shape::Dimension { .. } => GeometryKind::Dimension,
            Shape::Ellipse { .. } => GeometryKind::Ellipse,
            Shape::Hatch { .. } => GeometryKind::Hatch,
            Shape::Spline { .. } => GeometryKind::Spline,
            Shape::Other { .. } => GeometryKind::Other,
        }
    }

    /// Linear extent: segment, arc or chain length.
    pub fn length(&self) -> Option<f64> {
        match &self.shape {
            Shape::Line { length, .. }
            | Shape::Arc { length, .. }
            | Shape::Spline { length, .. } => Some(*length),
            Shape::Polyline {
                closed,
                length,
                perimeter,
                ..
            } => Some(if *closed { *perimeter } else { *length }),
            _ => None,
        }
    }

    pub fn area(&self) -> Option<f64> {
        match &self.shape {
            Shape::Circle { area, .. }
            | Shape::Arc { area, .. }
            | Shape::Ellipse { area, .. }
            | Shape::Hatch { area, .. } => Some(*area),
            Shape::Polyline { area, .. } | Shape::Spline { area, .. } => *area,
            _ => None,
        }
    }

    pub fn radius(&self) -> Option<f64> {
        match &self.shape {
            Shape::Circle { radius, .. } | Shape::Arc { radius, .. } => Some(*radius),
            _ => None,
        }
    }

    pub fn center(&self) -> Option<Point2D> {
        match &self.shape {
            Shape::Circle { center, .. }
            | Shape::Arc { center, .. }
            | Shape::Ellipse { center, .. } => Some(*center),
            _ => None,
        }
    }

    /// Insertion point of TEXT and INSERT entities.
    pub fn insert_point(&self) -> Option<Point2D> {
        match &self.shape {
            Shape::Text { insert, .. } | Shape::Insert { insert, .. } => Some(*insert),
            _ => None,
        }
    }

    /// Ordered vertices of linear geometry.
    pub fn points(&self) -> Vec<Point2D> {
        match &self.shape {
            Shape::Line { start, end, .. } => vec![*start, *end],
            Shape::Polyline { points, .. } | Shape::Spline { points, .. } => points.clone(),
            Shape::Hatch { boundary, .. } => boundary.clone(),
            _ => Vec::new(),
        }
    }

    /// Closed ring of at least three vertices, when the entity encloses an area.
    pub fn polygon(&self) -> Option<Vec<Point2D>> {
        match &self.shape {
            Shape::Polyline {
                points,
                closed: true,
                ..
            }
            | Shape::Spline {
                points,
                closed: true,
                ..
            } if points.len() >= 3 => Some(points.clone()),
            Shape::Hatch { boundary, .. } if boundary.len() >= 3 => Some(boundary.clone()),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        match &self.shape {
            Shape::Polyline { closed, .. } | Shape::Spline { closed, .. } => *closed,
            Shape::Hatch { .. } | Shape::Circle { .. } | Shape::Ellipse { .. } => true,
            _ => false,
        }
    }

    pub fn block_name(&self) -> Option<&str> {
        match &self.shape {
            Shape::Insert { block_name, .. } => Some(block_name),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.shape {
            Shape::Text { text, .. } => Some(text),
            Shape::Dimension { text, .. } => text.as_deref(),
            _ => None,
        }
    }

    /// Best single point representing the entity.
    pub fn anchor_point(&self) -> Option<Point2D> {
        match &self.shape {
            Shape::Text { insert, .. } | Shape::Insert { insert, .. } => Some(*insert),
            Shape::Dimension { def_point, .. } => *def_point,
            Shape::Circle { center, .. }
            | Shape::Arc { center, .. }
            | Shape::Ellipse { center, .. } => Some(*center),
            _ => self.bounds.map(|b| b.center()),
        }
    }
}

fn first_z(data: &EntityData) -> f64 {
    let z = match data {
        EntityData::Line { start, .. } => start.z,
        EntityData::Circle { center, .. }
        | EntityData::Arc { center, .. }
        | EntityData::Ellipse { center, .. } => center.z,
        EntityData::Polyline { points, .. } | EntityData::Spline { points, .. } => {
            points.first().map(|p| p.z).unwrap_or(0.0)
        }
        EntityData::Text { insert, .. } | EntityData::Insert { insert, .. } => insert.z,
        _ => 0.0,
    };
    if z.is_finite() {
        z
    } else {
        0.0
    }
}

fn shape_bounds(shape: &Shape) -> Option<Bounds> {
    match shape {
        Shape::Line { start, end, .. } => Bounds::from_points([*start, *end].iter()),
        Shape::Circle { center, radius, .. } => Some(Bounds::new(
            center.x - radius,
            center.y - radius,
            center.x + radius,
            center.y + radius,
        )),
        Shape::Arc {
            center,
            radius,
            start_angle,
            sweep,
            ..
        } => Some(arc_bounds(*center, *radius, *start_angle, *sweep)),
        Shape::Polyline { points, .. } | Shape::Spline { points, .. } => {
            Bounds::from_points(points.iter())
        }
        Shape::Hatch { boundary, .. } => Bounds::from_points(boundary.iter()),
        Shape::Ellipse {
            center,
            major_radius,
            ..
        } => Some(Bounds::new(
            center.x - major_radius,
            center.y - major_radius,
            center.x + major_radius,
            center.y + major_radius,
        )),
        Shape::Text { insert, .. } | Shape::Insert { insert, .. } => {
            Some(Bounds::new(insert.x, insert.y, insert.x, insert.y))
        }
        Shape::Dimension { def_point, .. } => {
            def_point.map(|p| Bounds::new(p.x, p.y, p.x, p.y))
        }
        Shape::Other { .. } => None,
    }
}

/// Union of every record's bounds.
pub fn drawing_bounds(records: &[GeometryRecord]) -> Option<Bounds> {
    records
        .iter()
        .filter_map(|r| r.bounds)
        .filter(Bounds::is_finite)
        .reduce(|acc, b| acc.union(&b))
}
