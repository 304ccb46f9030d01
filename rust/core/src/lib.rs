// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # DXF2BIM Core
//!
//! Drawing-level building blocks of the DXF to BIM pipeline.
//!
//! ## Overview
//!
//! - **Entity records**: typed DXF entities, layers and header variables,
//!   decodable from a JSON interchange document
//! - **Geometry normalization**: plan coordinates plus derived length, area,
//!   perimeter and bounds per entity
//! - **Unit inference**: drawing units to metres from the header or the extents
//! - **Layer classification**: category, discipline and system from a layer name
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dxf2bim_core::{classify_layer_name, DxfEntity, GeometryRecord, LayerCategory};
//!
//! let c = classify_layer_name("A-WALL-EXIST");
//! assert_eq!(c.category, LayerCategory::Wall);
//!
//! let line = DxfEntity::line("1F", "A-WALL", (0.0, 0.0), (3000.0, 0.0));
//! let record = GeometryRecord::from_entity(&line)?;
//! assert_eq!(record.length(), Some(3000.0));
//! ```

pub mod entity;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod types;
pub mod units;

pub use entity::{DxfDocument, DxfEntity, DxfHeader, DxfLayer, EntityData, EntityProperties};
pub use error::{Error, Result};
pub use geometry::{drawing_bounds, signed_area, GeometryKind, GeometryRecord, Shape};
pub use layer::{
    classify_layer_name, classify_layers, ClassificationSource, Discipline, LayerCategory,
    LayerClassification, LayerInfo, LayerTable,
};
pub use types::{Bounds, Point2D, Point3D};
pub use units::{UnitScale, UnitSource};
