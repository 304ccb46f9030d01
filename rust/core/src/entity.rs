// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! DXF entity, layer and header records
//!
//! These are the already-tokenized records handed over by a DXF reader. They
//! can be built in-process or decoded from the JSON interchange document:
//!
//! ```json
//! {
//!   "header":   { "insunits": 4 },
//!   "layers":   [ { "name": "A-WALL" } ],
//!   "entities": [ { "type": "LINE", "handle": "1F", "layer": "A-WALL",
//!                   "start": { "x": 0, "y": 0 }, "end": { "x": 3000, "y": 0 } } ]
//! }
//! ```
//!
//! Entity kinds the engine does not know keep their raw attributes in
//! [`EntityData::Other`] instead of being inspected field by field.

use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::types::{Bounds, Point3D};

fn default_layer() -> String {
    "0".to_string()
}

fn default_true() -> bool {
    true
}

fn unit_scale() -> Point3D {
    Point3D::new(1.0, 1.0, 1.0)
}

/// Kind-specific payload of a DXF entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityData {
    #[serde(rename = "LINE")]
    Line { start: Point3D, end: Point3D },

    #[serde(rename = "CIRCLE")]
    Circle { center: Point3D, radius: f64 },

    /// Angles in degrees, counter-clockwise from `start_angle` to `end_angle`.
    #[serde(rename = "ARC")]
    Arc {
        center: Point3D,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },

    #[serde(rename = "LWPOLYLINE", alias = "POLYLINE")]
    Polyline {
        #[serde(alias = "vertices")]
        points: Vec<Point3D>,
        #[serde(default)]
        closed: bool,
    },

    #[serde(rename = "TEXT", alias = "MTEXT")]
    Text {
        text: String,
        insert: Point3D,
        #[serde(default)]
        height: Option<f64>,
        #[serde(default)]
        rotation: f64,
    },

    #[serde(rename = "INSERT")]
    Insert {
        #[serde(alias = "name")]
        block_name: String,
        insert: Point3D,
        #[serde(default = "unit_scale")]
        scale: Point3D,
        #[serde(default)]
        rotation: f64,
    },

    #[serde(rename = "DIMENSION")]
    Dimension {
        #[serde(default)]
        dimension_type: Option<i32>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        def_point: Option<Point3D>,
        #[serde(default)]
        measurement: Option<f64>,
    },

    /// `major_axis` is relative to `center`; `ratio` is minor / major.
    #[serde(rename = "ELLIPSE")]
    Ellipse {
        center: Point3D,
        major_axis: Point3D,
        ratio: f64,
    },

    #[serde(rename = "HATCH")]
    Hatch {
        #[serde(default)]
        boundary: Vec<Point3D>,
        #[serde(default)]
        area: Option<f64>,
    },

    #[serde(rename = "SPLINE")]
    Spline {
        #[serde(alias = "fit_points")]
        points: Vec<Point3D>,
        #[serde(default)]
        closed: bool,
    },

    /// Any kind without a dedicated variant.
    #[serde(skip)]
    Other {
        kind: String,
        attributes: BTreeMap<String, Value>,
    },
}

impl EntityData {
    /// DXF type name of the entity.
    pub fn kind(&self) -> &str {
        match self {
            EntityData::Line { .. } => "LINE",
            EntityData::Circle { .. } => "CIRCLE",
            EntityData::Arc { .. } => "ARC",
            EntityData::Polyline { .. } => "LWPOLYLINE",
            EntityData::Text { .. } => "TEXT",
            EntityData::Insert { .. } => "INSERT",
            EntityData::Dimension { .. } => "DIMENSION",
            EntityData::Ellipse { .. } => "ELLIPSE",
            EntityData::Hatch { .. } => "HATCH",
            EntityData::Spline { .. } => "SPLINE",
            EntityData::Other { kind, .. } => kind,
        }
    }

    fn is_known_kind(kind: &str) -> bool {
        matches!(
            kind,
            "LINE"
                | "CIRCLE"
                | "ARC"
                | "LWPOLYLINE"
                | "POLYLINE"
                | "TEXT"
                | "MTEXT"
                | "INSERT"
                | "DIMENSION"
                | "ELLIPSE"
                | "HATCH"
                | "SPLINE"
        )
    }
}

/// Optional scalars DXF carries on any entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityProperties {
    pub thickness: Option<f64>,
    pub elevation: Option<f64>,
}

/// One drawing entity as delivered by the reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEntity", into = "RawEntity")]
pub struct DxfEntity {
    pub handle: String,
    pub layer: String,
    pub color: Option<i32>,
    pub linetype: Option<String>,
    pub data: EntityData,
    pub properties: EntityProperties,
}

impl DxfEntity {
    pub fn new(handle: impl Into<String>, layer: impl Into<String>, data: EntityData) -> Self {
        Self {
            handle: handle.into(),
            layer: layer.into(),
            color: None,
            linetype: None,
            data,
            properties: EntityProperties::default(),
        }
    }

    pub fn with_properties(mut self, properties: EntityProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn line(
        handle: impl Into<String>,
        layer: impl Into<String>,
        start: (f64, f64),
        end: (f64, f64),
    ) -> Self {
        Self::new(
            handle,
            layer,
            EntityData::Line {
                start: Point3D::new(start.0, start.1, 0.0),
                end: Point3D::new(end.0, end.1, 0.0),
            },
        )
    }

    pub fn arc(
        handle: impl Into<String>,
        layer: impl Into<String>,
        center: (f64, f64),
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    ) -> Self {
        Self::new(
            handle,
            layer,
            EntityData::Arc {
                center: Point3D::new(center.0, center.1, 0.0),
                radius,
                start_angle,
                end_angle,
            },
        )
    }

    pub fn polyline(
        handle: impl Into<String>,
        layer: impl Into<String>,
        points: &[(f64, f64)],
        closed: bool,
    ) -> Self {
        Self::new(
            handle,
            layer,
            EntityData::Polyline {
                points: points.iter().map(|&(x, y)| Point3D::new(x, y, 0.0)).collect(),
                closed,
            },
        )
    }

    pub fn kind(&self) -> &str {
        self.data.kind()
    }
}

/// Wire shape of an entity: the DXF type tag, common fields, and the
/// kind-specific attributes flattened next to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawEntity {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    handle: String,
    #[serde(default = "default_layer")]
    layer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    linetype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thickness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    elevation: Option<f64>,
    #[serde(flatten)]
    attributes: Map<String, Value>,
}

impl TryFrom<RawEntity> for DxfEntity {
    type Error = String;

    fn try_from(raw: RawEntity) -> std::result::Result<Self, Self::Error> {
        let kind = raw.kind.trim().to_uppercase();
        let data = if EntityData::is_known_kind(&kind) {
            let mut tagged = Map::new();
            tagged.insert(kind.clone(), Value::Object(raw.attributes));
            serde_json::from_value::<EntityData>(Value::Object(tagged))
                .map_err(|e| format!("entity {} ({}): {}", raw.handle, kind, e))?
        } else {
            EntityData::Other {
                kind,
                attributes: raw.attributes.into_iter().collect(),
            }
        };

        Ok(DxfEntity {
            handle: raw.handle,
            layer: raw.layer,
            color: raw.color,
            linetype: raw.linetype,
            data,
            properties: EntityProperties {
                thickness: raw.thickness,
                elevation: raw.elevation,
            },
        })
    }
}

impl From<DxfEntity> for RawEntity {
    fn from(entity: DxfEntity) -> Self {
        let (kind, attributes) = match entity.data {
            EntityData::Other { kind, attributes } => (kind, attributes.into_iter().collect()),
            data => match serde_json::to_value(&data) {
                Ok(Value::Object(mut tagged)) => {
                    let kind = data.kind().to_string();
                    match tagged.remove(&kind) {
                        Some(Value::Object(attributes)) => (kind, attributes),
                        _ => (kind, Map::new()),
                    }
                }
                _ => (data.kind().to_string(), Map::new()),
            },
        };

        RawEntity {
            kind,
            handle: entity.handle,
            layer: entity.layer,
            color: entity.color,
            linetype: entity.linetype,
            thickness: entity.properties.thickness,
            elevation: entity.properties.elevation,
            attributes,
        }
    }
}

/// Layer table entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DxfLayer {
    pub name: String,
    #[serde(default)]
    pub color: Option<i32>,
    #[serde(default)]
    pub linetype: Option<String>,
    #[serde(default = "default_true")]
    pub on: bool,
    #[serde(default)]
    pub frozen: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_true")]
    pub plot: bool,
}

impl DxfLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
            linetype: None,
            on: true,
            frozen: false,
            locked: false,
            plot: true,
        }
    }
}

/// Header variables relevant to unit inference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DxfHeader {
    /// `$INSUNITS` code, 0 meaning unitless.
    #[serde(default, alias = "$INSUNITS")]
    pub insunits: Option<i32>,
    /// Unit name as reported by some readers ("millimeters", "feet", ...).
    #[serde(default, alias = "units")]
    pub units_name: Option<String>,
    /// `$EXTMIN` / `$EXTMAX` drawing extents.
    #[serde(default)]
    pub extents: Option<Bounds>,
}

/// A complete drawing in interchange form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DxfDocument {
    #[serde(default)]
    pub header: DxfHeader,
    #[serde(default)]
    pub layers: Vec<DxfLayer>,
    #[serde(default)]
    pub entities: Vec<DxfEntity>,
}

impl DxfDocument {
    /// Decode a document from its JSON interchange form.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::from)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).map_err(Error::from)
    }

    pub fn layer(&self, name: &str) -> Option<&DxfLayer> {
        self.layers.iter().find(|l| l.name == name)
    }
}
