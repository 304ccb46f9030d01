// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Architectural elements produced by the classifier.

use std::collections::BTreeSet;
use std::fmt;

use dxf2bim_core::{Discipline, GeometryRecord, LayerCategory, LayerClassification};
use serde::{Deserialize, Serialize};

/// Layer name carried by rooms recovered from wall loops
pub const GENERATED_SPACE_LAYER: &str = "__generated_space__";

/// What an entity is, as a building element
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Wall,
    Door,
    Window,
    Floor,
    Ceiling,
    Space,
    Column,
    Beam,
    Stair,
    MepPlumbing,
    MepHvac,
    MepElectrical,
    MepFireProtection,
    MepEquipment,
    Furniture,
    Fixture,
}

impl ElementType {
    pub const ALL: [ElementType; 16] = [
        ElementType::Wall,
        ElementType::Door,
        ElementType::Window,
        ElementType::Floor,
        ElementType::Ceiling,
        ElementType::Space,
        ElementType::Column,
        ElementType::Beam,
        ElementType::Stair,
        ElementType::MepPlumbing,
        ElementType::MepHvac,
        ElementType::MepElectrical,
        ElementType::MepFireProtection,
        ElementType::MepEquipment,
        ElementType::Furniture,
        ElementType::Fixture,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Wall => "wall",
            ElementType::Door => "door",
            ElementType::Window => "window",
            ElementType::Floor => "floor",
            ElementType::Ceiling => "ceiling",
            ElementType::Space => "space",
            ElementType::Column => "column",
            ElementType::Beam => "beam",
            ElementType::Stair => "stair",
            ElementType::MepPlumbing => "mep_plumbing",
            ElementType::MepHvac => "mep_hvac",
            ElementType::MepElectrical => "mep_electrical",
            ElementType::MepFireProtection => "mep_fire_protection",
            ElementType::MepEquipment => "mep_equipment",
            ElementType::Furniture => "furniture",
            ElementType::Fixture => "fixture",
        }
    }

    /// Base confidence of a predicate match, before the layer bonus.
    pub fn base_confidence(&self) -> f64 {
        match self {
            ElementType::Wall => 0.85,
            ElementType::Door | ElementType::Column => 0.80,
            ElementType::Window | ElementType::Beam => 0.78,
            ElementType::Floor => 0.75,
            ElementType::Ceiling => 0.70,
            ElementType::Space => 0.68,
            ElementType::Stair | ElementType::Furniture => 0.65,
            ElementType::MepPlumbing
            | ElementType::MepHvac
            | ElementType::MepElectrical
            | ElementType::MepFireProtection
            | ElementType::MepEquipment => 0.70,
            ElementType::Fixture => 0.62,
        }
    }

    /// Spaces and floors both delimit rooms.
    pub fn is_spatial(&self) -> bool {
        matches!(self, ElementType::Space | ElementType::Floor)
    }

    pub fn is_opening_filler(&self) -> bool {
        matches!(self, ElementType::Door | ElementType::Window)
    }

    pub fn is_mep(&self) -> bool {
        matches!(
            self,
            ElementType::MepPlumbing
                | ElementType::MepHvac
                | ElementType::MepElectrical
                | ElementType::MepFireProtection
                | ElementType::MepEquipment
        )
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Indices of the elements a wall or space touches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementRelations {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adjacent_walls: Vec<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adjacent_spaces: Vec<usize>,
}

impl ElementRelations {
    pub fn is_empty(&self) -> bool {
        self.adjacent_walls.is_empty() && self.adjacent_spaces.is_empty()
    }
}

/// Snapshot of the source layer's classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerMetadata {
    pub category: LayerCategory,
    pub discipline: Discipline,
    pub system: Option<String>,
    pub confidence: f64,
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "ElementRelations::is_empty")]
    pub relations: ElementRelations,
}

impl LayerMetadata {
    fn unclassified() -> Self {
        Self {
            category: LayerCategory::Other,
            discipline: Discipline::General,
            system: None,
            confidence: 0.0,
            tags: BTreeSet::new(),
            relations: ElementRelations::default(),
        }
    }
}

impl From<&LayerClassification> for LayerMetadata {
    fn from(c: &LayerClassification) -> Self {
        Self {
            category: c.category,
            discipline: c.discipline,
            system: c.system.clone(),
            confidence: c.confidence,
            tags: c.tags.clone(),
            relations: ElementRelations::default(),
        }
    }
}

/// Physical attributes derived from the geometry, in drawing units
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thickness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sill_height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_metadata: Option<LayerMetadata>,
}

/// One classified entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitecturalElement {
    pub element_type: ElementType,
    pub layer: String,
    pub handle: String,
    pub geometry: GeometryRecord,
    pub properties: ElementProperties,
    pub confidence: f64,
}

impl ArchitecturalElement {
    pub fn is_generated(&self) -> bool {
        self.properties.generated || self.layer == GENERATED_SPACE_LAYER
    }

    /// Relationship slot, created on first use.
    pub fn relations_mut(&mut self) -> &mut ElementRelations {
        &mut self
            .properties
            .layer_metadata
            .get_or_insert_with(LayerMetadata::unclassified)
            .relations
    }

    pub fn relations(&self) -> Option<&ElementRelations> {
        self.properties.layer_metadata.as_ref().map(|m| &m.relations)
    }

    pub fn discipline(&self) -> Option<Discipline> {
        self.properties.layer_metadata.as_ref().map(|m| m.discipline)
    }

    pub fn system(&self) -> Option<&str> {
        self.properties
            .layer_metadata
            .as_ref()
            .and_then(|m| m.system.as_deref())
    }
}
