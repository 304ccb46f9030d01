// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Summary counts over a run

use std::collections::BTreeMap;

use dxf2bim_core::layer::ClassificationSource;
use dxf2bim_core::{Discipline, LayerCategory, LayerTable};
use serde::{Deserialize, Serialize};

use crate::element::{ArchitecturalElement, ElementType};

/// Lower bound of the high confidence band.
pub const HIGH_CONFIDENCE: f64 = 0.75;
/// Lower bound of the medium confidence band.
pub const MEDIUM_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceBands {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl ConfidenceBands {
    fn record(&mut self, confidence: f64) {
        if confidence >= HIGH_CONFIDENCE {
            self.high += 1;
        } else if confidence >= MEDIUM_CONFIDENCE {
            self.medium += 1;
        } else {
            self.low += 1;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementStatistics {
    pub total_elements: usize,
    pub by_type: BTreeMap<ElementType, usize>,
    /// Sum of element areas, drawing units squared.
    pub total_area: f64,
    /// Sum of element lengths, drawing units.
    pub total_length: f64,
    pub average_confidence: f64,
    pub by_discipline: BTreeMap<Discipline, usize>,
    pub by_system: BTreeMap<String, usize>,
    pub confidence: ConfidenceBands,
    pub generated: usize,
}

impl ElementStatistics {
    pub fn from_elements(elements: &[ArchitecturalElement]) -> Self {
        let mut stats = Self {
            total_elements: elements.len(),
            ..Self::default()
        };
        let mut confidence_sum = 0.0;
        for element in elements {
            *stats.by_type.entry(element.element_type).or_default() += 1;
            stats.total_area += element.properties.area.unwrap_or(0.0);
            stats.total_length += element.properties.length.unwrap_or(0.0);
            confidence_sum += element.confidence;
            stats.confidence.record(element.confidence);
            if let Some(discipline) = element.discipline() {
                *stats.by_discipline.entry(discipline).or_default() += 1;
            }
            if let Some(system) = element.system() {
                *stats.by_system.entry(system.to_string()).or_default() += 1;
            }
            if element.is_generated() {
                stats.generated += 1;
            }
        }
        if !elements.is_empty() {
            stats.average_confidence = confidence_sum / elements.len() as f64;
        }
        stats
    }

    pub fn count(&self, element_type: ElementType) -> usize {
        self.by_type.get(&element_type).copied().unwrap_or(0)
    }
}

/// How well the layer table was understood
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerStatistics {
    pub total_layers: usize,
    pub by_category: BTreeMap<LayerCategory, usize>,
    pub by_discipline: BTreeMap<Discipline, usize>,
    pub average_confidence: f64,
    /// Layers matched by a rule rather than the substring fallback.
    pub rule_matched: usize,
}

impl LayerStatistics {
    pub fn from_table(table: &LayerTable) -> Self {
        let mut stats = Self {
            total_layers: table.len(),
            ..Self::default()
        };
        let mut confidence_sum = 0.0;
        for layer in table.iter() {
            let c = &layer.classification;
            *stats.by_category.entry(c.category).or_default() += 1;
            *stats.by_discipline.entry(c.discipline).or_default() += 1;
            confidence_sum += c.confidence;
            if c.source == ClassificationSource::Rule {
                stats.rule_matched += 1;
            }
        }
        if stats.total_layers > 0 {
            stats.average_confidence = confidence_sum / stats.total_layers as f64;
        }
        stats
    }
}

/// Everything counted during one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Entities in the input document.
    pub total_entities: usize,
    /// Entities that failed normalization.
    pub skipped_entities: usize,
    pub elements: ElementStatistics,
    pub layers: LayerStatistics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use dxf2bim_core::{classify_layers, DxfEntity, DxfLayer, GeometryRecord, LayerClassification};

    use crate::element::{ElementProperties, LayerMetadata};

    fn element(element_type: ElementType, layer: &str, confidence: f64) -> ArchitecturalElement {
        let geometry =
            GeometryRecord::from_entity(&DxfEntity::line("1", layer, (0.0, 0.0), (2.0, 0.0))).unwrap();
        let classification: LayerClassification = dxf2bim_core::classify_layer_name(layer);
        ArchitecturalElement {
            element_type,
            layer: layer.to_string(),
            handle: "1".to_string(),
            geometry,
            properties: ElementProperties {
                length: Some(2.0),
                area: (element_type == ElementType::Space).then_some(12.0),
                layer_metadata: Some(LayerMetadata::from(&classification)),
                ..ElementProperties::default()
            },
            confidence,
        }
    }

    #[test]
    fn test_element_statistics() {
        let elements = vec![
            element(ElementType::Wall, "A-WALL", 0.97),
            element(ElementType::Wall, "A-WALL", 0.85),
            element(ElementType::Space, "A-AREA", 0.6),
            element(ElementType::MepPlumbing, "P-PIPE", 0.45),
        ];
        let stats = ElementStatistics::from_elements(&elements);

        assert_eq!(stats.total_elements, 4);
        assert_eq!(stats.count(ElementType::Wall), 2);
        assert_eq!(stats.count(ElementType::Door), 0);
        assert_relative_eq!(stats.total_length, 8.0);
        assert_relative_eq!(stats.total_area, 12.0);
        assert_relative_eq!(stats.average_confidence, (0.97 + 0.85 + 0.6 + 0.45) / 4.0);
        assert_eq!(
            stats.confidence,
            ConfidenceBands {
                high: 2,
                medium: 1,
                low: 1
            }
        );
        assert_eq!(stats.by_discipline.get(&Discipline::Architectural), Some(&3));
        assert_eq!(stats.by_discipline.values().sum::<usize>(), 4);
        assert_eq!(stats.generated, 0);
    }

    #[test]
    fn test_band_edges() {
        let mut bands = ConfidenceBands::default();
        bands.record(0.75);
        bands.record(0.5);
        bands.record(0.4999);
        assert_eq!((bands.high, bands.medium, bands.low), (1, 1, 1));
    }

    #[test]
    fn test_empty_inputs() {
        let stats = ElementStatistics::from_elements(&[]);
        assert_eq!(stats.average_confidence, 0.0);
        let layers = LayerStatistics::from_table(&LayerTable::default());
        assert_eq!(layers.total_layers, 0);
        assert_eq!(layers.average_confidence, 0.0);
    }

    #[test]
    fn test_layer_statistics() {
        let table = classify_layers(&[
            DxfLayer::new("A-WALL"),
            DxfLayer::new("A-DOOR"),
            DxfLayer::new("XYZ123"),
        ]);
        let stats = LayerStatistics::from_table(&table);
        assert_eq!(stats.total_layers, 3);
        assert_eq!(stats.by_category.get(&LayerCategory::Wall), Some(&1));
        assert_eq!(stats.by_category.get(&LayerCategory::Other), Some(&1));
        assert_eq!(stats.rule_matched, 2);
        assert!(stats.average_confidence > 0.0 && stats.average_confidence < 1.0);
    }
}
