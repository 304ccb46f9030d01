// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! DXF2BIM Geometry Processing
//!
//! Planar queries on drawing line work and the solid model of the BIM graph:
//!
//! - **Primitives**: segments, rings and the distance tests used for host
//!   resolution, adjacency and space boundaries
//! - **Polygonization**: closed faces recovered from loose wall lines
//! - **Footprint repair**: self-intersecting outlines resolved with i_overlay
//! - **Solids**: rectangle/polygon extrusions and CSG trees with volumes

pub mod bool2d;
pub mod error;
pub mod polygonize;
pub mod primitives;
pub mod solid;
pub mod spatial;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use bool2d::{repair_ring, repair_ring_largest, SimplePolygon};
pub use error::{Error, Result};
pub use polygonize::{polygonize, PlanarFace};
pub use primitives::{
    chain_segments, polygon_area, polygon_chain_distance, polygon_distance,
    polygon_segment_distance, to_point, to_ring, Segment,
};
pub use solid::{union_volume, Box3, ExtrudedSolid, ExtrusionDirection, Placement, Profile, Solid};
pub use spatial::VertexIndex;
