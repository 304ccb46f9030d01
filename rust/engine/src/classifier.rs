// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Element classification
//!
//! Each normalized entity runs through a fixed cascade of predicates:
//!
//! ```text
//! wall → door → window → floor → ceiling → space → column → beam → stair
//!      → MEP (plumbing, hvac, electrical, fire, equipment) → furniture → fixture
//! ```
//!
//! The first predicate that holds decides the type. A predicate holds on any
//! one of three signals: the layer (category, discipline, tags, tokens), the
//! block name of an INSERT, or a geometric range in metres. Geometric ranges
//! only apply on layers that claim no category of their own, so a long duct
//! line on an HVAC layer never turns into a wall.
//!
//! ```text
//! confidence = clamp(base + min(0.35, 0.4 * layer_confidence)
//!                         + 0.05 * semantic_hit, 0.3, 1.0)
//! ```

use std::borrow::Cow;
use std::collections::BTreeSet;

use dxf2bim_core::{
    classify_layer_name, Discipline, GeometryKind, GeometryRecord, LayerCategory,
    LayerClassification, LayerTable, UnitScale,
};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::config::ClassifierThresholds;
use crate::element::{ArchitecturalElement, ElementProperties, ElementType, LayerMetadata};

const DOOR_BLOCKS: &[&str] = &["DOOR", "DR"];
const WINDOW_BLOCKS: &[&str] = &["WINDOW", "WIN"];
const COLUMN_BLOCKS: &[&str] = &["COLUMN", "COL", "PILAR"];
const COLUMN_NAMES: &[&str] = &["COLUMN", "COL", "PILAR", "PIER"];
const BEAM_NAMES: &[&str] = &["BEAM", "GIRDER"];
const STAIR_NAMES: &[&str] = &["STAIR", "STEPS"];
const ROOM_WORDS: &[&str] = &["ROOM", "SPACE", "AREA", "OFFICE", "BEDROOM", "KITCHEN"];
const FURNITURE_TOKENS: &[&str] = &["FURN", "FURNITURE", "SOFA", "BED", "TABLE", "CHAIR"];
const FURNITURE_TAGS: &[&str] = &["FURNITURE", "MILLWORK", "CASEWORK"];
const FURNITURE_BLOCKS: &[&str] = &["SOFA", "BED", "CHAIR", "TABLE", "WARDROBE", "CABINET"];
const FIXTURE_WORDS: &[&str] = &[
    "SINK", "WC", "TOILET", "BATH", "SHOWER", "OVEN", "COOK", "HOB", "APPLIANCE", "FRIDGE",
    "LIGHT",
];
const PLUMBING_TOKENS: &[&str] = &["PLUMBING", "SANITARY", "DRAIN", "WASTE"];
const HVAC_TOKENS: &[&str] = &["HVAC", "DUCT", "VENT", "AIR"];
const ELECTRICAL_TOKENS: &[&str] = &["ELECT", "ELECTRICAL", "POWER", "LIGHT", "LIGHTING", "DATA"];
const FIRE_TOKENS: &[&str] = &["FIRE", "SPRINKLER", "ALARM"];
const EQUIPMENT_TAGS: &[&str] = &["MOTOR", "EQUIPMENT"];

/// What the source layer says about its entities
#[derive(Debug, Clone, PartialEq)]
pub struct LayerContext {
    pub name_upper: String,
    pub category: LayerCategory,
    pub discipline: Discipline,
    pub system: Option<String>,
    pub confidence: f64,
    /// Matched keywords and the category, uppercased.
    pub tags: BTreeSet<String>,
    /// Raw name tokens. Abbreviations are not expanded here; the layer
    /// category already reflects them.
    pub tokens: BTreeSet<String>,
    pub semantic_hit: bool,
    metadata: LayerMetadata,
}

impl LayerContext {
    pub fn new(name: &str, classification: &LayerClassification) -> Self {
        let mut tags: BTreeSet<String> =
            classification.tags.iter().map(|t| t.to_uppercase()).collect();
        tags.insert(classification.category.as_str().to_uppercase());
        Self {
            name_upper: name.to_uppercase(),
            category: classification.category,
            discipline: classification.discipline,
            system: classification.system.clone(),
            confidence: classification.confidence,
            tags,
            tokens: classification.tokens.iter().cloned().collect(),
            semantic_hit: classification.has_semantic_hit(),
            metadata: LayerMetadata::from(classification),
        }
    }

    /// Context for a layer missing from the table: classify its name.
    pub fn from_name(name: &str) -> Self {
        Self::new(name, &classify_layer_name(name))
    }

    fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    fn has_token(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    fn any_token(&self, words: &[&str]) -> bool {
        words.iter().any(|w| self.tokens.contains(*w))
    }

    fn any_tag(&self, words: &[&str]) -> bool {
        words.iter().any(|w| self.tags.contains(*w))
    }

    fn name_contains(&self, words: &[&str]) -> bool {
        words.iter().any(|w| self.name_upper.contains(w))
    }

    /// The layer claims no category, so geometry may decide.
    fn is_unclaimed(&self) -> bool {
        matches!(
            self.category,
            LayerCategory::Other | LayerCategory::Structure
        )
    }

    /// Final confidence for a predicate with the given base.
    pub fn confidence_for(&self, base: f64) -> f64 {
        let mut confidence = base;
        if self.confidence > 0.0 {
            confidence += (self.confidence * 0.4).min(0.35);
        }
        if self.semantic_hit {
            confidence += 0.05;
        }
        confidence.clamp(0.3, 1.0)
    }
}

/// Element classifier bound to one document's layers and units
pub struct ElementClassifier<'a> {
    scale: &'a UnitScale,
    thresholds: &'a ClassifierThresholds,
    contexts: FxHashMap<String, LayerContext>,
}

impl<'a> ElementClassifier<'a> {
    pub fn new(layers: &LayerTable, scale: &'a UnitScale, thresholds: &'a ClassifierThresholds) -> Self {
        let contexts = layers
            .iter()
            .map(|info| (info.name.clone(), LayerContext::new(&info.name, &info.classification)))
            .collect();
        Self {
            scale,
            thresholds,
            contexts,
        }
    }

    pub fn context(&self, layer: &str) -> Cow<'_, LayerContext> {
        match self.contexts.get(layer) {
            Some(ctx) => Cow::Borrowed(ctx),
            None => Cow::Owned(LayerContext::from_name(layer)),
        }
    }

    /// Classify every record, keeping input order.
    pub fn classify_all(&mut self, records: &[GeometryRecord]) -> Vec<ArchitecturalElement> {
        for record in records {
            if !self.contexts.contains_key(&record.layer) {
                let ctx = LayerContext::from_name(&record.layer);
                self.contexts.insert(record.layer.clone(), ctx);
            }
        }

        let this: &Self = self;
        let elements: Vec<ArchitecturalElement> = if this.thresholds.parallel {
            records
                .par_iter()
                .map(|r| this.classify(r))
                .collect::<Vec<_>>()
                .into_iter()
                .flatten()
                .collect()
        } else {
            records.iter().filter_map(|r| this.classify(r)).collect()
        };

        tracing::debug!(
            records = records.len(),
            elements = elements.len(),
            "classified entities"
        );
        elements
    }

    pub fn classify(&self, record: &GeometryRecord) -> Option<ArchitecturalElement> {
        let ctx = self.context(&record.layer);
        classify_record(record, &ctx, self.scale, self.thresholds)
    }
}

/// Run the cascade on one record.
pub fn classify_record(
    record: &GeometryRecord,
    ctx: &LayerContext,
    scale: &UnitScale,
    thresholds: &ClassifierThresholds,
) -> Option<ArchitecturalElement> {
    let cascade = Cascade {
        record,
        ctx,
        scale,
        t: thresholds,
    };
    let element_type = cascade.element_type()?;
    let confidence = ctx.confidence_for(element_type.base_confidence());
    if confidence < thresholds.min_confidence {
        return None;
    }

    let properties = derive_properties(element_type, record, ctx, scale);
    Some(ArchitecturalElement {
        element_type,
        layer: record.layer.clone(),
        handle: record.handle.clone(),
        geometry: record.clone(),
        properties,
        confidence,
    })
}

struct Cascade<'r> {
    record: &'r GeometryRecord,
    ctx: &'r LayerContext,
    scale: &'r UnitScale,
    t: &'r ClassifierThresholds,
}

impl Cascade<'_> {
    fn element_type(&self) -> Option<ElementType> {
        if self.is_wall() {
            return Some(ElementType::Wall);
        }
        if self.is_door() {
            return Some(ElementType::Door);
        }
        if self.is_window() {
            return Some(ElementType::Window);
        }
        if self.is_floor() {
            return Some(ElementType::Floor);
        }
        if self.is_ceiling() {
            return Some(ElementType::Ceiling);
        }
        if self.is_space() {
            return Some(ElementType::Space);
        }
        if self.is_column() {
            return Some(ElementType::Column);
        }
        if self.is_beam() {
            return Some(ElementType::Beam);
        }
        if self.is_stair() {
            return Some(ElementType::Stair);
        }
        if let Some(mep) = self.mep_type() {
            return Some(mep);
        }
        if self.is_furniture() {
            return Some(ElementType::Furniture);
        }
        if self.is_fixture() {
            return Some(ElementType::Fixture);
        }
        None
    }

    fn kind(&self) -> GeometryKind {
        self.record.kind()
    }

    fn geometry_allowed(&self) -> bool {
        self.ctx.is_unclaimed()
    }

    fn block_matches(&self, words: &[&str]) -> bool {
        self.record
            .block_name()
            .map(|name| {
                let upper = name.to_uppercase();
                words.iter().any(|w| upper.contains(w))
            })
            .unwrap_or(false)
    }

    fn length_m(&self) -> Option<f64> {
        self.record.length().map(|l| self.scale.to_meters(l))
    }

    fn radius_m(&self) -> Option<f64> {
        self.record.radius().map(|r| self.scale.to_meters(r))
    }

    /// Area of a closed outline in m², for the kinds that can bound a room.
    fn enclosed_area_m2(&self) -> Option<f64> {
        match self.kind() {
            GeometryKind::Polyline | GeometryKind::Hatch | GeometryKind::Spline
                if self.record.is_closed() =>
            {
                self.record.area().map(|a| self.scale.area_to_m2(a))
            }
            _ => None,
        }
    }

    fn is_wall(&self) -> bool {
        let ctx = self.ctx;
        if ctx.category == LayerCategory::Wall || ctx.has_tag("WALL") || ctx.has_token("WALL") {
            return true;
        }
        if ctx.discipline == Discipline::Architectural && ctx.name_upper.contains("WALL") {
            return true;
        }
        if !self.geometry_allowed() {
            return false;
        }
        match self.kind() {
            GeometryKind::Line => self
                .length_m()
                .map_or(false, |l| l > self.t.wall_min_length_m),
            GeometryKind::Polyline if self.record.is_closed() => {
                strip_dimensions(self.record).map_or(false, |(length, width)| {
                    let (length, width) = (self.scale.to_meters(length), self.scale.to_meters(width));
                    width <= self.t.wall_strip_max_width_m
                        && length > self.t.wall_min_length_m
                        && length >= 2.0 * width
                })
            }
            _ => false,
        }
    }

    fn is_door(&self) -> bool {
        let ctx = self.ctx;
        if ctx.category == LayerCategory::Door || ctx.has_tag("DOOR") || ctx.has_token("DOOR") {
            return true;
        }
        if self.block_matches(DOOR_BLOCKS) {
            return true;
        }
        self.geometry_allowed()
            && self.kind() == GeometryKind::Arc
            && self.radius_m().map_or(false, |r| {
                (self.t.door_min_radius_m..=self.t.door_max_radius_m).contains(&r)
            })
    }

    fn is_window(&self) -> bool {
        let ctx = self.ctx;
        if ctx.category == LayerCategory::Window || ctx.has_tag("WINDOW") || ctx.has_token("WINDOW")
        {
            return true;
        }
        if self.block_matches(WINDOW_BLOCKS) {
            return true;
        }
        self.geometry_allowed()
            && self.kind() == GeometryKind::Line
            && self.length_m().map_or(false, |w| {
                (self.t.window_min_width_m..=self.t.window_max_width_m).contains(&w)
            })
    }

    fn is_floor(&self) -> bool {
        let ctx = self.ctx;
        if ctx.category == LayerCategory::Floor
            || ctx.any_tag(&["FLOOR", "SLAB"])
            || ctx.any_token(&["FLOOR", "SLAB"])
        {
            return true;
        }
        self.geometry_allowed()
            && self
                .enclosed_area_m2()
                .map_or(false, |a| a > self.t.floor_min_area_m2)
    }

    fn is_ceiling(&self) -> bool {
        let ctx = self.ctx;
        ctx.category == LayerCategory::Ceiling
            || ctx.has_tag("CEILING")
            || ctx.any_token(&["CEIL", "CEILING"])
    }

    fn is_space(&self) -> bool {
        let ctx = self.ctx;
        if ctx.category == LayerCategory::Space || ctx.any_tag(&["ROOM", "SPACE"]) {
            return true;
        }
        if self.kind() == GeometryKind::Text {
            if let Some(text) = self.record.text() {
                let upper = text.to_uppercase();
                if ROOM_WORDS.iter().any(|w| upper.contains(w)) {
                    return true;
                }
            }
        }
        self.geometry_allowed()
            && self
                .enclosed_area_m2()
                .map_or(false, |a| a > self.t.space_min_area_m2)
    }

    fn is_column(&self) -> bool {
        let ctx = self.ctx;
        if ctx.category == LayerCategory::StructureColumn || ctx.has_tag("COLUMN") {
            return true;
        }
        if ctx.discipline == Discipline::Structural && ctx.name_contains(COLUMN_NAMES) {
            return true;
        }
        if ctx.any_token(&["COLUMN", "COL"]) || self.block_matches(COLUMN_BLOCKS) {
            return true;
        }
        self.geometry_allowed()
            && self.kind() == GeometryKind::Circle
            && self.radius_m().map_or(false, |r| {
                (self.t.column_min_radius_m..=self.t.column_max_radius_m).contains(&r)
            })
    }

    fn is_beam(&self) -> bool {
        let ctx = self.ctx;
        ctx.category == LayerCategory::StructureBeam
            || ctx.any_tag(BEAM_NAMES)
            || (ctx.discipline == Discipline::Structural && ctx.name_contains(BEAM_NAMES))
            || ctx.any_token(BEAM_NAMES)
            || self.block_matches(BEAM_NAMES)
    }

    fn is_stair(&self) -> bool {
        self.ctx.category == LayerCategory::Stair
            || self.ctx.name_contains(STAIR_NAMES)
            || self.block_matches(STAIR_NAMES)
    }

    fn mep_type(&self) -> Option<ElementType> {
        let ctx = self.ctx;
        match ctx.category {
            LayerCategory::MepPlumbing => return Some(ElementType::MepPlumbing),
            LayerCategory::MepHvac => return Some(ElementType::MepHvac),
            LayerCategory::MepElectrical => return Some(ElementType::MepElectrical),
            LayerCategory::MepFireProtection => return Some(ElementType::MepFireProtection),
            _ => {}
        }
        if ctx.discipline == Discipline::Plumbing || ctx.any_token(PLUMBING_TOKENS) {
            return Some(ElementType::MepPlumbing);
        }
        if ctx.discipline == Discipline::Mechanical || ctx.any_token(HVAC_TOKENS) {
            return Some(ElementType::MepHvac);
        }
        if ctx.discipline == Discipline::Electrical || ctx.any_token(ELECTRICAL_TOKENS) {
            return Some(ElementType::MepElectrical);
        }
        if ctx.discipline == Discipline::FireProtection || ctx.any_token(FIRE_TOKENS) {
            return Some(ElementType::MepFireProtection);
        }
        if ctx.any_tag(EQUIPMENT_TAGS) {
            return Some(ElementType::MepEquipment);
        }
        None
    }

    fn is_furniture(&self) -> bool {
        let ctx = self.ctx;
        ctx.category == LayerCategory::Furniture
            || (ctx.discipline == Discipline::Interior && ctx.any_token(FURNITURE_TOKENS))
            || ctx.any_tag(FURNITURE_TAGS)
            || self.block_matches(FURNITURE_BLOCKS)
    }

    fn is_fixture(&self) -> bool {
        let ctx = self.ctx;
        ctx.category == LayerCategory::Equipment
            || ctx.any_token(FIXTURE_WORDS)
            || self.block_matches(FIXTURE_WORDS)
            || ctx.any_tag(FIXTURE_WORDS)
    }
}

/// Length and width of the rectangle with the same area and perimeter as a
/// closed outline. `None` when no such rectangle exists.
pub fn strip_dimensions(record: &GeometryRecord) -> Option<(f64, f64)> {
    let area = record.area()?;
    let perimeter = record.length()?;
    if area <= 0.0 || perimeter <= 0.0 {
        return None;
    }
    let half = perimeter / 2.0;
    let disc = half * half - 4.0 * area;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    Some(((half + root) / 2.0, (half - root) / 2.0))
}

fn derive_properties(
    element_type: ElementType,
    record: &GeometryRecord,
    ctx: &LayerContext,
    scale: &UnitScale,
) -> ElementProperties {
    let mut props = ElementProperties {
        elevation: (record.elevation != 0.0).then_some(record.elevation),
        // DXF thickness is the extrusion along Z.
        height: record.thickness,
        layer_metadata: Some(ctx.metadata.clone()),
        ..ElementProperties::default()
    };

    match element_type {
        ElementType::Wall => {
            props.area = record.area();
            match strip_dimensions(record).filter(|_| record.kind() == GeometryKind::Polyline) {
                Some((length, width)) => {
                    props.length = Some(length);
                    props.thickness = Some(width);
                }
                None => props.length = record.length(),
            }
        }
        ElementType::Door => {
            props.width = record
                .radius()
                .or_else(|| record.length())
                .or_else(|| Some(scale.to_units(0.9)));
        }
        ElementType::Window => {
            props.width = record.length().or_else(|| Some(scale.to_units(1.2)));
        }
        ElementType::Floor | ElementType::Space => {
            props.area = record.area();
            if let Some(text) = record.text() {
                props.name = Some(text.trim().to_string());
            }
        }
        ElementType::Beam => {
            props.length = record.length();
        }
        _ => {}
    }

    if props.name.is_none() {
        props.name = record.block_name().map(str::to_string);
    }
    props
}
