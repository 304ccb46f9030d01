// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property tests for layer classification and unit inference

use dxf2bim_core::layer::tokenize;
use dxf2bim_core::{
    classify_layer_name, Bounds, ClassificationSource, DxfHeader, UnitScale,
};
use proptest::prelude::*;

/// Any layer name yields a confidence in [0, 1].
#[test]
fn proptest_confidence_in_unit_interval() {
    proptest!(|(name in ".{0,64}")| {
        let c = classify_layer_name(&name);
        prop_assert!((0.0..=1.0).contains(&c.confidence));
        if c.source == ClassificationSource::Fallback {
            prop_assert!(c.confidence <= 0.2);
        }
    });
}

/// Layer-like names built from drafting vocabulary behave the same way.
#[test]
fn proptest_drafting_names() {
    proptest!(|(name in "[AaSsMmEePp]-(WALL|DOOR|COL|HVAC|FURN|RM|XYZ)(-[A-Z0-9]{1,5}){0,2}")| {
        let c = classify_layer_name(&name);
        prop_assert!((0.0..=1.0).contains(&c.confidence));
        if c.source == ClassificationSource::Rule {
            prop_assert!(c.confidence >= 0.25);
            prop_assert!(c.system.is_some());
        }
    });
}

/// Re-tokenizing joined tokens changes nothing.
#[test]
fn proptest_tokenize_idempotent() {
    proptest!(|(name in ".{0,64}")| {
        let once = tokenize(&name);
        let twice = tokenize(&once.join("_"));
        prop_assert_eq!(once, twice);
    });
}

/// Classification is deterministic.
#[test]
fn proptest_classification_is_pure() {
    proptest!(|(name in "[A-Za-z0-9_ -]{0,32}")| {
        prop_assert_eq!(classify_layer_name(&name), classify_layer_name(&name));
    });
}

/// Explicit header units win no matter how the coordinates are scaled.
#[test]
fn proptest_header_units_beat_heuristic() {
    proptest!(|(code in prop::sample::select(vec![1, 2, 4, 5, 6]), extent in 0.01f64..1.0e6)| {
        let header = DxfHeader { insunits: Some(code), ..Default::default() };
        let bounds = Some(Bounds::new(0.0, 0.0, extent, extent / 2.0));
        let scale = UnitScale::infer(&header, bounds);
        let expected = dxf2bim_core::units::insunits_multiplier(code).unwrap();
        prop_assert_eq!(scale.scale_to_m, expected);
    });
}
