// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Engine configuration.
//!
//! Defaults reproduce the stock thresholds; a handful of knobs can be
//! overridden from environment variables with [`EngineConfig::from_env`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::element::ElementType;

/// Geometry thresholds of the element classifier, in metres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierThresholds {
    /// Elements below this confidence are never created.
    pub min_confidence: f64,
    pub wall_min_length_m: f64,
    /// Closed outlines no wider than this on average read as wall strips.
    pub wall_strip_max_width_m: f64,
    pub door_min_radius_m: f64,
    pub door_max_radius_m: f64,
    pub window_min_width_m: f64,
    pub window_max_width_m: f64,
    pub floor_min_area_m2: f64,
    pub space_min_area_m2: f64,
    pub column_min_radius_m: f64,
    pub column_max_radius_m: f64,
    /// Classify entities on a rayon pool.
    pub parallel: bool,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            wall_min_length_m: 0.5,
            wall_strip_max_width_m: 0.6,
            door_min_radius_m: 0.4,
            door_max_radius_m: 1.3,
            window_min_width_m: 0.4,
            window_max_width_m: 4.0,
            floor_min_area_m2: 2.0,
            space_min_area_m2: 2.0,
            column_min_radius_m: 0.08,
            column_max_radius_m: 0.5,
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Wall/space and space/space adjacency tolerance.
    pub adjacency_tolerance_m: f64,
    /// Faces smaller than this are not turned into rooms.
    pub min_generated_space_m2: f64,
    /// Vertex snapping tolerance while polygonizing wall lines.
    pub snap_tolerance_m: f64,
    pub synthesize_spaces: bool,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            adjacency_tolerance_m: 0.1,
            min_generated_space_m2: 2.0,
            snap_tolerance_m: 0.01,
            synthesize_spaces: true,
        }
    }
}

/// Sizes used when an element carries no dimension of its own, in metres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BimDefaults {
    pub project_name: String,
    pub site_name: String,
    pub building_name: String,
    pub storey_name: String,
    pub storey_elevation_m: f64,
    pub storey_height_m: f64,
    pub wall_thickness_m: f64,
    pub wall_height_m: f64,
    pub door_width_m: f64,
    pub door_height_m: f64,
    pub window_width_m: f64,
    pub window_height_m: f64,
    pub window_sill_height_m: f64,
    pub slab_thickness_m: f64,
    pub ceiling_height_m: f64,
    pub ceiling_thickness_m: f64,
    pub column_size_m: f64,
    pub beam_width_m: f64,
    pub beam_depth_m: f64,
    /// Door leaf / window panel thickness.
    pub panel_thickness_m: f64,
    /// Hosts further than this from an opening are rejected. `None` keeps
    /// the nearest wall however far it is.
    pub max_host_distance_m: Option<f64>,
    /// Space boundary distance, in drawing units.
    pub space_boundary_tolerance: f64,
}

impl Default for BimDefaults {
    fn default() -> Self {
        Self {
            project_name: "DXF Conversion".to_string(),
            site_name: "Default Site".to_string(),
            building_name: "Default Building".to_string(),
            storey_name: "Ground Floor".to_string(),
            storey_elevation_m: 0.0,
            storey_height_m: 3.0,
            wall_thickness_m: 0.2,
            wall_height_m: 2.7,
            door_width_m: 0.9,
            door_height_m: 2.1,
            window_width_m: 1.2,
            window_height_m: 1.2,
            window_sill_height_m: 0.9,
            slab_thickness_m: 0.15,
            ceiling_height_m: 2.7,
            ceiling_thickness_m: 0.1,
            column_size_m: 0.3,
            beam_width_m: 0.3,
            beam_depth_m: 0.5,
            panel_thickness_m: 0.05,
            max_host_distance_m: None,
            space_boundary_tolerance: 0.2,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub classifier: ClassifierThresholds,
    pub topology: TopologyConfig,
    pub bim: BimDefaults,
    /// Material slug per element type, resolved through the asset catalog.
    pub material_assignments: BTreeMap<ElementType, String>,
}

impl EngineConfig {
    /// Defaults overlaid with `DXF2BIM_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Unparsable values keep the current
    /// setting.
    pub fn overlay<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("DXF2BIM_PROJECT_NAME").filter(|s| !s.trim().is_empty()) {
            self.bim.project_name = name;
        }
        if let Some(name) = lookup("DXF2BIM_STOREY_NAME").filter(|s| !s.trim().is_empty()) {
            self.bim.storey_name = name;
        }
        self.classifier.min_confidence = lookup("DXF2BIM_MIN_CONFIDENCE")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| (0.0..=1.0).contains(v))
            .unwrap_or(self.classifier.min_confidence);
        if let Some(raw) = lookup("DXF2BIM_MAX_HOST_DISTANCE_M") {
            let raw = raw.trim();
            if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
                self.bim.max_host_distance_m = None;
            } else if let Ok(v) = raw.parse::<f64>() {
                if v.is_finite() && v > 0.0 {
                    self.bim.max_host_distance_m = Some(v);
                }
            }
        }
        self.bim.space_boundary_tolerance = lookup("DXF2BIM_SPACE_BOUNDARY_TOLERANCE")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or(self.bim.space_boundary_tolerance);
        self.classifier.parallel = lookup("DXF2BIM_PARALLEL")
            .and_then(|v| parse_flag(&v))
            .unwrap_or(self.classifier.parallel);
        self
    }

    /// Attach a material slug to every element of `element_type`.
    pub fn with_material(mut self, element_type: ElementType, slug: impl Into<String>) -> Self {
        self.material_assignments.insert(element_type, slug.into());
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
