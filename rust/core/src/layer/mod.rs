// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Layer classification
//!
//! CAD layer names carry most of a drawing's semantics, but every office
//! names them differently: `A-WALL-EXIST`, `MUR_PORTEUR`, `S-COL`,
//! `M-HVAC-DUCT`, `0`. The classifier maps a name to a [`LayerCategory`],
//! a [`Discipline`] and a building system.
//!
//! ## Scoring
//!
//! The name is tokenized and expanded (see [`tokenize`]) and scored against
//! every rule in [`rules::LAYER_RULES`]. A rule matches when one of its
//! keywords is among the expanded tokens or one of its patterns occurs in
//! the uppercased name:
//!
//! ```text
//! score = priority + 6 * matched_keywords + 10 * pattern_hits
//! confidence = clamp(score / 100, 0.25, 1.0)
//! ```
//!
//! The highest score wins, ties go to the higher static priority and then
//! to the earlier rule. Names no rule matches fall back to plain substring
//! checks with a confidence of at most 0.2.
//!
//! Classification is pure and never fails.

pub mod rules;
pub mod tokenize;

use std::collections::BTreeSet;
use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::entity::DxfLayer;
use rules::{category_discipline, DISCIPLINE_HINTS, LAYER_RULES, LEGACY_PATTERNS};
pub use tokenize::{expand, tokenize, Tokens};

/// Confidence of a substring-only match
pub const FALLBACK_CONFIDENCE: f64 = 0.2;

/// Semantic category of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerCategory {
    Wall,
    Door,
    Window,
    Floor,
    Ceiling,
    Space,
    Dimension,
    Text,
    StructureColumn,
    StructureBeam,
    StructureFoundation,
    Stair,
    Furniture,
    Equipment,
    MepPlumbing,
    MepHvac,
    MepElectrical,
    MepFireProtection,
    Landscape,
    Grid,
    Roof,
    /// Generic structural member, only produced by the substring fallback.
    Structure,
    Other,
}

impl LayerCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerCategory::Wall => "wall",
            LayerCategory::Door => "door",
            LayerCategory::Window => "window",
            LayerCategory::Floor => "floor",
            LayerCategory::Ceiling => "ceiling",
            LayerCategory::Space => "space",
            LayerCategory::Dimension => "dimension",
            LayerCategory::Text => "text",
            LayerCategory::StructureColumn => "structure_column",
            LayerCategory::StructureBeam => "structure_beam",
            LayerCategory::StructureFoundation => "structure_foundation",
            LayerCategory::Stair => "stair",
            LayerCategory::Furniture => "furniture",
            LayerCategory::Equipment => "equipment",
            LayerCategory::MepPlumbing => "mep_plumbing",
            LayerCategory::MepHvac => "mep_hvac",
            LayerCategory::MepElectrical => "mep_electrical",
            LayerCategory::MepFireProtection => "mep_fire_protection",
            LayerCategory::Landscape => "landscape",
            LayerCategory::Grid => "grid",
            LayerCategory::Roof => "roof",
            LayerCategory::Structure => "structure",
            LayerCategory::Other => "other",
        }
    }

    pub fn is_mep(&self) -> bool {
        matches!(
            self,
            LayerCategory::MepPlumbing
                | LayerCategory::MepHvac
                | LayerCategory::MepElectrical
                | LayerCategory::MepFireProtection
        )
    }
}

impl fmt::Display for LayerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drawing discipline a layer belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    Architectural,
    Structural,
    Mechanical,
    Electrical,
    Plumbing,
    FireProtection,
    Site,
    Annotation,
    Interior,
    Equipment,
    General,
}

impl Discipline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Discipline::Architectural => "architectural",
            Discipline::Structural => "structural",
            Discipline::Mechanical => "mechanical",
            Discipline::Electrical => "electrical",
            Discipline::Plumbing => "plumbing",
            Discipline::FireProtection => "fire_protection",
            Discipline::Site => "site",
            Discipline::Annotation => "annotation",
            Discipline::Interior => "interior",
            Discipline::Equipment => "equipment",
            Discipline::General => "general",
        }
    }
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which path produced a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Rule,
    Fallback,
}

/// Result of classifying one layer name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerClassification {
    pub category: LayerCategory,
    pub discipline: Discipline,
    pub system: Option<String>,
    /// In [0, 1], rounded to three decimals.
    pub confidence: f64,
    pub source: ClassificationSource,
    /// Matched keywords and patterns plus the category name.
    pub tags: BTreeSet<String>,
    /// Raw uppercase tokens of the name.
    pub tokens: Tokens,
}

impl LayerClassification {
    /// True when the layer told us anything beyond "unknown".
    pub fn has_semantic_hit(&self) -> bool {
        self.category != LayerCategory::Other
            || self.system.is_some()
            || self.discipline != Discipline::General
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

struct RuleMatch<'a> {
    score: u32,
    priority: u32,
    rule: &'a rules::LayerRule,
    keywords: Vec<&'static str>,
    patterns: Vec<&'static str>,
}

/// Classify a layer name.
pub fn classify_layer_name(name: &str) -> LayerClassification {
    let upper = name.to_uppercase();
    let tokens = tokenize(name);
    let expanded = expand(&tokens);

    let mut best: Option<RuleMatch<'_>> = None;
    for rule in LAYER_RULES {
        let keywords: Vec<&'static str> = rule
            .keywords
            .iter()
            .copied()
            .filter(|kw| expanded.contains(*kw))
            .collect();
        let patterns: Vec<&'static str> = rule
            .patterns
            .iter()
            .copied()
            .filter(|p| upper.contains(*p))
            .collect();
        if keywords.is_empty() && patterns.is_empty() {
            continue;
        }

        // Priority only counts once a keyword matched; patterns add on top.
        let mut score = 10 * patterns.len() as u32;
        if !keywords.is_empty() {
            score += rule.priority + 6 * keywords.len() as u32;
        }
        let better = match &best {
            None => true,
            Some(current) => (score, rule.priority) > (current.score, current.priority),
        };
        if better {
            best = Some(RuleMatch {
                score,
                priority: rule.priority,
                rule,
                keywords,
                patterns,
            });
        }
    }

    match best {
        Some(m) => {
            let mut tags: BTreeSet<String> = m
                .keywords
                .iter()
                .chain(m.patterns.iter())
                .map(|s| s.to_string())
                .collect();
            tags.insert(m.rule.category.as_str().to_string());
            LayerClassification {
                category: m.rule.category,
                discipline: m.rule.discipline,
                system: Some(m.rule.system.to_string()),
                confidence: round3((m.score as f64 / 100.0).clamp(0.25, 1.0)),
                source: ClassificationSource::Rule,
                tags,
                tokens,
            }
        }
        None => fallback_classification(&upper, tokens, &expanded),
    }
}

fn fallback_classification(
    upper: &str,
    tokens: Tokens,
    expanded: &BTreeSet<String>,
) -> LayerClassification {
    let category = legacy_category(upper);
    let discipline = infer_discipline(expanded, category);
    let mut tags = BTreeSet::new();
    let confidence = if category == LayerCategory::Other {
        0.0
    } else {
        tags.insert(category.as_str().to_string());
        FALLBACK_CONFIDENCE
    };
    LayerClassification {
        category,
        discipline,
        system: None,
        confidence,
        source: ClassificationSource::Fallback,
        tags,
        tokens,
    }
}

/// Plain substring classification over the uppercased name.
pub fn legacy_category(upper: &str) -> LayerCategory {
    LEGACY_PATTERNS
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| upper.contains(n)))
        .map(|(category, _)| *category)
        .unwrap_or(LayerCategory::Other)
}

/// First discipline whose hints intersect the tokens, else the category's.
pub fn infer_discipline(expanded: &BTreeSet<String>, category: LayerCategory) -> Discipline {
    DISCIPLINE_HINTS
        .iter()
        .find(|(_, hints)| hints.iter().any(|h| expanded.contains(*h)))
        .map(|(discipline, _)| *discipline)
        .or_else(|| category_discipline(category))
        .unwrap_or(Discipline::General)
}

/// A layer table entry with its classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub name: String,
    pub color: Option<i32>,
    pub linetype: Option<String>,
    pub on: bool,
    pub frozen: bool,
    pub locked: bool,
    pub plot: bool,
    pub classification: LayerClassification,
}

impl LayerInfo {
    pub fn from_layer(layer: &DxfLayer) -> Self {
        Self {
            name: layer.name.clone(),
            color: layer.color,
            linetype: layer.linetype.clone(),
            on: layer.on,
            frozen: layer.frozen,
            locked: layer.locked,
            plot: layer.plot,
            classification: classify_layer_name(&layer.name),
        }
    }

    pub fn category(&self) -> LayerCategory {
        self.classification.category
    }

    pub fn confidence(&self) -> f64 {
        self.classification.confidence
    }
}

/// All classified layers of one document, keyed by name
#[derive(Debug, Clone, Default)]
pub struct LayerTable {
    layers: FxHashMap<String, LayerInfo>,
    order: Vec<String>,
}

impl LayerTable {
    pub fn get(&self, name: &str) -> Option<&LayerInfo> {
        self.layers.get(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Layers in table order.
    pub fn iter(&self) -> impl Iterator<Item = &LayerInfo> {
        self.order.iter().filter_map(|name| self.layers.get(name))
    }

    pub fn insert(&mut self, info: LayerInfo) {
        if !self.layers.contains_key(&info.name) {
            self.order.push(info.name.clone());
        }
        self.layers.insert(info.name.clone(), info);
    }
}

/// Classify a document's layer table. Later duplicates replace earlier ones.
pub fn classify_layers(layers: &[DxfLayer]) -> LayerTable {
    let mut table = LayerTable::default();
    for layer in layers {
        table.insert(LayerInfo::from_layer(layer));
    }
    tracing::debug!(layers = table.len(), "classified layer table");
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_architectural_wall_layer() {
        let c = classify_layer_name("A-WALL-EXIST");
        assert_eq!(c.category, LayerCategory::Wall);
        assert_eq!(c.discipline, Discipline::Architectural);
        assert_eq!(c.source, ClassificationSource::Rule);
        assert!(c.confidence >= 0.8);
        assert!(c.tags.contains("A-WALL"));
        assert!(c.tags.contains("WALL"));
        assert_eq!(c.system.as_deref(), Some("enclosure"));
    }

    #[test]
    fn test_abbreviation_expansion_drives_match() {
        let c = classify_layer_name("S-COLS");
        assert_eq!(c.category, LayerCategory::StructureColumn);
        assert_eq!(c.discipline, Discipline::Structural);

        let c = classify_layer_name("rm_names");
        assert_eq!(c.category, LayerCategory::Space);
    }

    #[test]
    fn test_highest_score_wins() {
        // HVAC and MECHANICAL both hit the hvac rule, VENT also hits plumbing.
        let c = classify_layer_name("M-HVAC-VENT");
        assert_eq!(c.category, LayerCategory::MepHvac);
        assert_eq!(c.discipline, Discipline::Mechanical);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let c = classify_layer_name("A-WALL WALLS PARTITION MUR C-WALL");
        assert_eq!(c.confidence, 1.0);

        let c = classify_layer_name("TEXT");
        assert_eq!(c.confidence, 0.64);
    }

    #[test]
    fn test_pattern_only_match_scores_low() {
        // "WALL-" is a pattern hit, but no token is a wall keyword.
        let c = classify_layer_name("XWALL-");
        assert_eq!(c.category, LayerCategory::Wall);
        assert_eq!(c.source, ClassificationSource::Rule);
        assert_eq!(c.confidence, 0.25);
        assert!(c.tags.contains("WALL-"));

        // keyword plus pattern: 95 + 6 + 10
        let c = classify_layer_name("A-WALL");
        assert_eq!(c.confidence, 1.0);
        let c = classify_layer_name("XDOOR-");
        assert_eq!(c.category, LayerCategory::Door);
        assert_eq!(c.confidence, 0.25);
    }

    #[test]
    fn test_fallback_substring() {
        let c = classify_layer_name("XXWALLXX");
        assert_eq!(c.category, LayerCategory::Wall);
        assert_eq!(c.source, ClassificationSource::Fallback);
        assert_eq!(c.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(c.discipline, Discipline::Architectural);
    }

    #[test]
    fn test_unknown_layer() {
        let c = classify_layer_name("0");
        assert_eq!(c.category, LayerCategory::Other);
        assert_eq!(c.confidence, 0.0);
        assert_eq!(c.discipline, Discipline::General);
        assert!(c.tags.is_empty());
        assert!(!c.has_semantic_hit());
    }

    #[test]
    fn test_discipline_hint_without_category() {
        let c = classify_layer_name("E-XYZ");
        assert_eq!(c.category, LayerCategory::Other);
        assert_eq!(c.discipline, Discipline::Electrical);
        assert!(c.has_semantic_hit());
    }

    #[test]
    fn test_classify_layers_table() {
        let layers = vec![DxfLayer::new("A-DOOR"), DxfLayer::new("0")];
        let table = classify_layers(&layers);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("A-DOOR").unwrap().category(), LayerCategory::Door);
        assert!(table.get("missing").is_none());
        let names: Vec<&str> = table.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["A-DOOR", "0"]);
    }
}
