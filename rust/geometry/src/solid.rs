// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extruded solids and CSG trees
//!
//! Every body the BIM graph carries is a planar profile swept along ±Z, or a
//! boolean tree over such sweeps. Walls with openings become
//! `Difference(wall, Union(openings))`.
//!
//! Volumes are exact for the shapes the builder produces: openings share the
//! host wall's frame, so every subtracted box is axis-aligned in the wall's
//! local coordinates and the removed volume is computed by coordinate
//! compression. Boxes that are rotated relative to the base are replaced by
//! their local bounding box, which over-estimates the removed volume.

use dxf2bim_core::{Point2D, Point3D};
use nalgebra::{Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::bool2d::{compute_signed_area, contour_bounds};
use crate::error::{Error, Result};
use crate::primitives::{to_ring, EPSILON_2D};

/// Local frame of a solid: origin plus an in-plane x axis. Z is always up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub location: Point3D,
    /// Unit x axis in the drawing plane.
    pub ref_direction: [f64; 2],
}

impl Placement {
    pub fn at(location: Point3D) -> Self {
        Self {
            location,
            ref_direction: [1.0, 0.0],
        }
    }

    /// Frame whose x axis follows `direction`; a zero direction keeps world x.
    pub fn oriented(location: Point3D, direction: Vector2<f64>) -> Self {
        let norm = direction.norm();
        let ref_direction = if norm > EPSILON_2D && norm.is_finite() {
            [direction.x / norm, direction.y / norm]
        } else {
            [1.0, 0.0]
        };
        Self {
            location,
            ref_direction,
        }
    }

    pub fn with_z(mut self, z: f64) -> Self {
        self.location.z = z;
        self
    }

    pub fn origin(&self) -> Point3<f64> {
        Point3::new(self.location.x, self.location.y, self.location.z)
    }

    pub fn x_axis(&self) -> Vector3<f64> {
        Vector3::new(self.ref_direction[0], self.ref_direction[1], 0.0)
    }

    pub fn y_axis(&self) -> Vector3<f64> {
        Vector3::z().cross(&self.x_axis())
    }

    /// Rotation of the x axis from world x, in degrees.
    pub fn angle_degrees(&self) -> f64 {
        self.ref_direction[1]
            .atan2(self.ref_direction[0])
            .to_degrees()
    }

    pub fn to_world(&self, local: &Vector3<f64>) -> Point3<f64> {
        self.origin() + self.x_axis() * local.x + self.y_axis() * local.y + Vector3::z() * local.z
    }

    pub fn to_local(&self, world: &Point3<f64>) -> Vector3<f64> {
        let d = world - self.origin();
        Vector3::new(d.dot(&self.x_axis()), d.dot(&self.y_axis()), d.z)
    }

    pub fn is_finite(&self) -> bool {
        self.location.is_finite()
            && self.ref_direction[0].is_finite()
            && self.ref_direction[1].is_finite()
    }
}

/// Swept cross-section, in placement-local coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Profile {
    /// Centered on the placement origin, `x_dim` along the x axis.
    Rectangle { x_dim: f64, y_dim: f64 },
    Polygon { points: Vec<Point2D> },
}

impl Profile {
    pub fn area(&self) -> f64 {
        match self {
            Profile::Rectangle { x_dim, y_dim } => x_dim * y_dim,
            Profile::Polygon { points } => compute_signed_area(&to_ring(points)).abs(),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Profile::Rectangle { x_dim, y_dim } => {
                if !(x_dim.is_finite() && y_dim.is_finite()) || *x_dim <= 0.0 || *y_dim <= 0.0 {
                    return Err(Error::InvalidExtrusion(format!(
                        "rectangle {} x {} must be positive",
                        x_dim, y_dim
                    )));
                }
            }
            Profile::Polygon { points } => {
                if points.len() < 3 {
                    return Err(Error::InvalidPolygon(
                        "profile needs at least 3 vertices".to_string(),
                    ));
                }
                if points.iter().any(|p| !p.is_finite()) {
                    return Err(Error::NonFinite("profile"));
                }
                if self.area() <= EPSILON_2D {
                    return Err(Error::InvalidPolygon("profile has no area".to_string()));
                }
            }
        }
        Ok(())
    }

    /// Local bounds `(min, max)` of the cross-section.
    fn bounds(&self) -> ([f64; 2], [f64; 2]) {
        match self {
            Profile::Rectangle { x_dim, y_dim } => {
                ([-x_dim / 2.0, -y_dim / 2.0], [x_dim / 2.0, y_dim / 2.0])
            }
            Profile::Polygon { points } => match contour_bounds(&to_ring(points)) {
                Some((min, max)) => ([min.x, min.y], [max.x, max.y]),
                None => ([0.0, 0.0], [0.0, 0.0]),
            },
        }
    }
}

/// Sweep direction; plan extrusions only go up or down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtrusionDirection {
    Up,
    Down,
}

impl ExtrusionDirection {
    pub fn vector(&self) -> Vector3<f64> {
        match self {
            ExtrusionDirection::Up => Vector3::z(),
            ExtrusionDirection::Down => -Vector3::z(),
        }
    }
}

/// A profile swept along ±Z from its placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtrudedSolid {
    pub profile: Profile,
    pub position: Placement,
    pub direction: ExtrusionDirection,
    pub depth: f64,
}

impl ExtrudedSolid {
    pub fn new(
        profile: Profile,
        position: Placement,
        direction: ExtrusionDirection,
        depth: f64,
    ) -> Result<Self> {
        if !depth.is_finite() || depth <= 0.0 {
            return Err(Error::InvalidExtrusion(format!(
                "depth {} must be positive",
                depth
            )));
        }
        if !position.is_finite() {
            return Err(Error::NonFinite("placement"));
        }
        profile.validate()?;
        Ok(Self {
            profile,
            position,
            direction,
            depth,
        })
    }

    /// Upward box of `x_dim` by `y_dim`, centered on the placement origin.
    pub fn rectangle(x_dim: f64, y_dim: f64, position: Placement, depth: f64) -> Result<Self> {
        Self::new(
            Profile::Rectangle { x_dim, y_dim },
            position,
            ExtrusionDirection::Up,
            depth,
        )
    }

    pub fn volume(&self) -> f64 {
        self.profile.area() * self.depth
    }

    /// Axis-aligned bounds in the solid's own frame.
    pub fn local_box(&self) -> Box3 {
        let (min, max) = self.profile.bounds();
        let (z0, z1) = match self.direction {
            ExtrusionDirection::Up => (0.0, self.depth),
            ExtrusionDirection::Down => (-self.depth, 0.0),
        };
        Box3 {
            min: [min[0], min[1], z0],
            max: [max[0], max[1], z1],
        }
    }

    /// Bounds of this solid expressed in `frame`.
    pub fn box_in_frame(&self, frame: &Placement) -> Box3 {
        let local = self.local_box();
        let corners: SmallVec<[Vector3<f64>; 8]> = local
            .corners()
            .iter()
            .map(|c| frame.to_local(&self.position.to_world(c)))
            .collect();
        Box3::enclosing(&corners)
    }
}

/// Axis-aligned box given by its min and max corners
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Box3 {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Box3 {
    pub fn volume(&self) -> f64 {
        (0..3)
            .map(|i| (self.max[i] - self.min[i]).max(0.0))
            .product()
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.max[i] - self.min[i] <= 0.0)
    }

    pub fn intersection(&self, other: &Box3) -> Box3 {
        let mut out = *self;
        for i in 0..3 {
            out.min[i] = self.min[i].max(other.min[i]);
            out.max[i] = self.max[i].min(other.max[i]);
        }
        out
    }

    fn corners(&self) -> [Vector3<f64>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vector3::new(a[0], a[1], a[2]),
            Vector3::new(b[0], a[1], a[2]),
            Vector3::new(a[0], b[1], a[2]),
            Vector3::new(b[0], b[1], a[2]),
            Vector3::new(a[0], a[1], b[2]),
            Vector3::new(b[0], a[1], b[2]),
            Vector3::new(a[0], b[1], b[2]),
            Vector3::new(b[0], b[1], b[2]),
        ]
    }

    fn enclosing(points: &[Vector3<f64>]) -> Box3 {
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for p in points {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        Box3 { min, max }
    }
}

/// Exact volume of a union of axis-aligned boxes by coordinate compression.
pub fn union_volume(boxes: &[Box3]) -> f64 {
    let boxes: Vec<&Box3> = boxes.iter().filter(|b| !b.is_empty()).collect();
    if boxes.is_empty() {
        return 0.0;
    }

    let axis = |i: usize| {
        let mut coords: Vec<f64> = boxes.iter().flat_map(|b| [b.min[i], b.max[i]]).collect();
        coords.sort_by(f64::total_cmp);
        coords.dedup();
        coords
    };
    let (xs, ys, zs) = (axis(0), axis(1), axis(2));

    let mut volume = 0.0;
    for xw in xs.windows(2) {
        for yw in ys.windows(2) {
            for zw in zs.windows(2) {
                let mid = [
                    (xw[0] + xw[1]) / 2.0,
                    (yw[0] + yw[1]) / 2.0,
                    (zw[0] + zw[1]) / 2.0,
                ];
                let covered = boxes
                    .iter()
                    .any(|b| (0..3).all(|i| b.min[i] <= mid[i] && mid[i] <= b.max[i]));
                if covered {
                    volume += (xw[1] - xw[0]) * (yw[1] - yw[0]) * (zw[1] - zw[0]);
                }
            }
        }
    }
    volume
}

/// Constructive solid geometry tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operator", rename_all = "snake_case")]
pub enum Solid {
    Extrusion(ExtrudedSolid),
    Union { operands: Vec<Solid> },
    Difference { first: Box<Solid>, second: Box<Solid> },
}

impl From<ExtrudedSolid> for Solid {
    fn from(solid: ExtrudedSolid) -> Self {
        Solid::Extrusion(solid)
    }
}

impl Solid {
    /// `base MINUS (cut_1 ∪ cut_2 ∪ …)`. Without cuts the base is returned
    /// unchanged.
    pub fn difference(base: Solid, mut cuts: Vec<Solid>) -> Solid {
        let second = match cuts.len() {
            0 => return base,
            1 => cuts.remove(0),
            _ => Solid::Union { operands: cuts },
        };
        Solid::Difference {
            first: Box::new(base),
            second: Box::new(second),
        }
    }

    pub fn is_boolean(&self) -> bool {
        !matches!(self, Solid::Extrusion(_))
    }

    /// Innermost extrusion a difference chain starts from.
    pub fn base_extrusion(&self) -> Option<&ExtrudedSolid> {
        match self {
            Solid::Extrusion(e) => Some(e),
            Solid::Difference { first, .. } => first.base_extrusion(),
            Solid::Union { .. } => None,
        }
    }

    /// Every extrusion leaf of the tree.
    pub fn leaves(&self) -> Vec<&ExtrudedSolid> {
        match self {
            Solid::Extrusion(e) => vec![e],
            Solid::Union { operands } => operands.iter().flat_map(Solid::leaves).collect(),
            Solid::Difference { first, second } => {
                let mut out = first.leaves();
                out.extend(second.leaves());
                out
            }
        }
    }

    pub fn volume(&self) -> f64 {
        match self {
            Solid::Extrusion(e) => e.volume(),
            Solid::Union { operands } => {
                let leaves: Vec<&ExtrudedSolid> =
                    operands.iter().flat_map(Solid::leaves).collect();
                match leaves.first() {
                    Some(first) if operands.iter().all(|o| !o.is_boolean()) => {
                        let frame = first.position;
                        if leaves.iter().all(|l| is_box_aligned(l, &frame)) {
                            let boxes: Vec<Box3> =
                                leaves.iter().map(|l| l.box_in_frame(&frame)).collect();
                            union_volume(&boxes)
                        } else {
                            operands.iter().map(Solid::volume).sum()
                        }
                    }
                    _ => operands.iter().map(Solid::volume).sum(),
                }
            }
            Solid::Difference { .. } => {
                let Some(base) = self.base_extrusion() else {
                    return 0.0;
                };
                let frame = base.position;
                let bounds = base.local_box();
                let cuts: Vec<Box3> = self
                    .subtracted()
                    .iter()
                    .map(|c| c.box_in_frame(&frame).intersection(&bounds))
                    .collect();
                (base.volume() - union_volume(&cuts)).max(0.0)
            }
        }
    }

    /// Extrusions subtracted along the difference chain.
    fn subtracted(&self) -> Vec<&ExtrudedSolid> {
        match self {
            Solid::Difference { first, second } => {
                let mut out = first.subtracted();
                out.extend(second.leaves());
                out
            }
            _ => Vec::new(),
        }
    }
}

/// Rectangle profile whose axes are parallel to the frame's.
fn is_box_aligned(solid: &ExtrudedSolid, frame: &Placement) -> bool {
    if !matches!(solid.profile, Profile::Rectangle { .. }) {
        return false;
    }
    let d = solid.position.x_axis().dot(&frame.x_axis()).abs();
    d < 1e-9 || (d - 1.0).abs() < 1e-9
}
