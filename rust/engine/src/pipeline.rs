// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end extraction
//!
//! Stages run strictly forward: normalize, classify layers, infer units,
//! classify elements, topology, graph. Only malformed input aborts a run;
//! every later failure is reported through [`ExtractionResult::diagnostics`]
//! and the graph tier.

use std::sync::Arc;

use dxf2bim_core::{
    classify_layers, drawing_bounds, DxfDocument, DxfEntity, DxfHeader, DxfLayer, GeometryRecord,
    LayerInfo, LayerTable, UnitScale,
};
use serde::Serialize;

use crate::bim::{self, GraphOutput, GraphTier};
use crate::catalog::{Catalog, MaterialResolver};
use crate::classifier::ElementClassifier;
use crate::config::EngineConfig;
use crate::element::ArchitecturalElement;
use crate::error::{Diagnostic, Result, Stage};
use crate::statistics::{ElementStatistics, LayerStatistics, Statistics};
use crate::topology::{Relationships, TopologyEngine};

/// Everything one run produced
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    /// False only when no graph tier could be built.
    pub success: bool,
    pub elements: Vec<ArchitecturalElement>,
    pub relationships: Relationships,
    pub graph: GraphOutput,
    pub statistics: Statistics,
    /// Classified layers, table order first, then layers only seen on entities.
    pub layers: Vec<LayerInfo>,
    pub scale: UnitScale,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionResult {
    pub fn bim_graph(&self) -> Option<&bim::BimGraph> {
        self.graph.graph()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Run the whole pipeline over one drawing.
pub fn extract_and_build(
    entities: &[DxfEntity],
    layers: &[DxfLayer],
    header: &DxfHeader,
    config: &EngineConfig,
    materials: Option<&dyn MaterialResolver>,
) -> ExtractionResult {
    let mut diagnostics = Vec::new();

    let records = normalize(entities, &mut diagnostics);
    let skipped_entities = entities.len() - records.len();

    let mut table = classify_layers(layers);
    register_entity_layers(&mut table, &records);

    let scale = UnitScale::infer(header, drawing_bounds(&records));
    tracing::debug!(
        scale_to_m = scale.scale_to_m,
        explicit = scale.is_explicit(),
        "resolved drawing units"
    );

    let mut elements =
        ElementClassifier::new(&table, &scale, &config.classifier).classify_all(&records);

    let (relationships, topology_diagnostics) =
        TopologyEngine::new(&scale, &config.topology).run(&mut elements);
    diagnostics.extend(topology_diagnostics);

    let (graph, graph_diagnostics) = bim::synthesize(&elements, &scale, config, materials);
    diagnostics.extend(graph_diagnostics);

    let error = match &graph {
        GraphOutput::Native { .. } => None,
        GraphOutput::Degraded { error, .. } => Some(error.to_string()),
        GraphOutput::Empty { errors, .. } => Some(
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        ),
    };

    let statistics = Statistics {
        total_entities: entities.len(),
        skipped_entities,
        elements: ElementStatistics::from_elements(&elements),
        layers: LayerStatistics::from_table(&table),
    };

    tracing::info!(
        entities = entities.len(),
        elements = elements.len(),
        spaces = relationships.summary.spaces,
        tier = ?graph.tier(),
        diagnostics = diagnostics.len(),
        "extraction finished"
    );

    ExtractionResult {
        success: graph.tier() != GraphTier::Empty,
        elements,
        relationships,
        graph,
        statistics,
        layers: table.iter().cloned().collect(),
        scale,
        diagnostics,
        error,
    }
}

/// Normalize every entity, skipping the invalid ones.
fn normalize(entities: &[DxfEntity], diagnostics: &mut Vec<Diagnostic>) -> Vec<GeometryRecord> {
    let mut records = Vec::with_capacity(entities.len());
    for entity in entities {
        match GeometryRecord::from_entity(entity) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::debug!(handle = %entity.handle, error = %e, "skipping entity");
                diagnostics.push(
                    Diagnostic::warning(Stage::Normalize, e).with_handle(entity.handle.clone()),
                );
            }
        }
    }
    records
}

/// Layers referenced by entities but absent from the table, classified by name.
fn register_entity_layers(table: &mut LayerTable, records: &[GeometryRecord]) {
    for record in records {
        if table.get(&record.layer).is_none() {
            table.insert(LayerInfo::from_layer(&DxfLayer::new(record.layer.clone())));
        }
    }
}

/// Reusable pipeline with its configuration and asset catalog
#[derive(Debug, Clone, Default)]
pub struct Engine {
    pub config: EngineConfig,
    pub catalog: Option<Arc<Catalog>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            catalog: None,
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Swap in a fresh catalog snapshot. Runs in flight keep the old one.
    pub fn set_catalog(&mut self, catalog: Arc<Catalog>) {
        self.catalog = Some(catalog);
    }

    pub fn process(&self, document: &DxfDocument) -> ExtractionResult {
        let materials = self
            .catalog
            .as_deref()
            .map(|catalog| catalog as &dyn MaterialResolver);
        extract_and_build(
            &document.entities,
            &document.layers,
            &document.header,
            &self.config,
            materials,
        )
    }

    /// Decode a JSON interchange document and process it.
    pub fn process_json(&self, json: &str) -> Result<ExtractionResult> {
        let document = DxfDocument::from_json(json)?;
        Ok(self.process(&document))
    }
}
