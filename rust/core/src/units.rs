// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Unit inference for DXF drawings
//!
//! Resolves the multiplier that converts drawing coordinates to metres.
//! Explicit header information always wins; the `$INSUNITS` code 0 means
//! "unitless" and falls through to a heuristic on the drawing extents.

use serde::{Deserialize, Serialize};

use crate::entity::DxfHeader;
use crate::types::Bounds;

/// Scale used when neither the header nor the extents say anything useful.
pub const DEFAULT_SCALE_TO_M: f64 = 0.001;

/// `$INSUNITS` code to metres multiplier
#[inline]
pub fn insunits_multiplier(code: i32) -> Option<f64> {
    match code {
        1 => Some(0.0254),     // Inches
        2 => Some(0.3048),     // Feet
        3 => Some(1609.344),   // Miles
        4 => Some(0.001),      // Millimeters
        5 => Some(0.01),       // Centimeters
        6 => Some(1.0),        // Meters
        7 => Some(1000.0),     // Kilometers
        8 => Some(2.54e-8),    // Microinches
        9 => Some(2.54e-5),    // Mils
        10 => Some(0.9144),    // Yards
        11 => Some(1e-10),     // Angstroms
        12 => Some(1e-9),      // Nanometers
        13 => Some(1e-6),      // Microns
        14 => Some(0.1),       // Decimeters
        15 => Some(10.0),      // Decameters
        16 => Some(100.0),     // Hectometers
        _ => None,             // Unitless or unknown
    }
}

/// Unit name, as some readers report it, to metres multiplier
pub fn unit_name_multiplier(name: &str) -> Option<f64> {
    match name.trim().to_ascii_lowercase().as_str() {
        "inches" | "inch" | "in" => Some(0.0254),
        "feet" | "foot" | "ft" => Some(0.3048),
        "millimeters" | "millimetres" | "millimeter" | "millimetre" | "mm" => Some(0.001),
        "centimeters" | "centimetres" | "centimeter" | "centimetre" | "cm" => Some(0.01),
        "meters" | "metres" | "meter" | "metre" | "m" => Some(1.0),
        "kilometers" | "kilometres" | "kilometer" | "kilometre" | "km" => Some(1000.0),
        _ => None,
    }
}

/// Scale guessed from the largest side of the drawing extents.
///
/// Floor plans in millimetres span thousands of units, in centimetres
/// hundreds, in metres tens.
pub fn heuristic_multiplier(max_dim: f64) -> f64 {
    if (1000.0..100_000.0).contains(&max_dim) {
        0.001
    } else if (50.0..1000.0).contains(&max_dim) {
        0.01
    } else if (0.5..200.0).contains(&max_dim) {
        1.0
    } else {
        DEFAULT_SCALE_TO_M
    }
}

/// Where a [`UnitScale`] came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitSource {
    HeaderName { name: String },
    HeaderCode { code: i32 },
    BoundsHeuristic { max_dim: f64 },
    Default,
}

/// Conversion between drawing units and metres
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitScale {
    pub scale_to_m: f64,
    pub source: UnitSource,
}

impl Default for UnitScale {
    fn default() -> Self {
        Self {
            scale_to_m: DEFAULT_SCALE_TO_M,
            source: UnitSource::Default,
        }
    }
}

impl UnitScale {
    pub fn meters() -> Self {
        Self {
            scale_to_m: 1.0,
            source: UnitSource::HeaderCode { code: 6 },
        }
    }

    pub fn from_multiplier(scale_to_m: f64, source: UnitSource) -> Self {
        Self { scale_to_m, source }
    }

    /// Resolve the document scale. Header name, then `$INSUNITS`, then the
    /// extent heuristic, then millimetres.
    pub fn infer(header: &DxfHeader, bounds: Option<Bounds>) -> Self {
        if let Some(name) = header.units_name.as_deref() {
            if let Some(scale_to_m) = unit_name_multiplier(name) {
                return Self::from_multiplier(
                    scale_to_m,
                    UnitSource::HeaderName {
                        name: name.to_string(),
                    },
                );
            }
        }

        if let Some(code) = header.insunits {
            if let Some(scale_to_m) = insunits_multiplier(code) {
                return Self::from_multiplier(scale_to_m, UnitSource::HeaderCode { code });
            }
        }

        match header.extents.or(bounds).filter(Bounds::is_finite) {
            Some(b) => {
                let max_dim = b.max_dimension();
                Self::from_multiplier(
                    heuristic_multiplier(max_dim),
                    UnitSource::BoundsHeuristic { max_dim },
                )
            }
            None => Self::default(),
        }
    }

    pub fn is_explicit(&self) -> bool {
        matches!(
            self.source,
            UnitSource::HeaderName { .. } | UnitSource::HeaderCode { .. }
        )
    }

    #[inline]
    pub fn to_meters(&self, value: f64) -> f64 {
        value * self.scale_to_m
    }

    #[inline]
    pub fn to_units(&self, meters: f64) -> f64 {
        meters / self.scale_to_m
    }

    #[inline]
    pub fn area_to_m2(&self, value: f64) -> f64 {
        value * self.scale_to_m * self.scale_to_m
    }

    #[inline]
    pub fn area_to_units(&self, square_meters: f64) -> f64 {
        square_meters / (self.scale_to_m * self.scale_to_m)
    }
}
