// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BIM graph synthesis

pub mod builder;
pub mod fallback;
pub mod graph;

pub use builder::{normalize_length, placement_point, GraphBuilder};
pub use fallback::{degraded_stub, empty_stub, GraphOutput, GraphTier};
pub use graph::{
    BimGraph, BoundaryKind, BoundaryLocation, EntityId, GlobalId, IdAllocator, Product,
    ProductKind, Relationship, Representation, RepresentationType, SpatialKind, SpatialNode,
};

use dxf2bim_core::UnitScale;

use crate::catalog::MaterialResolver;
use crate::config::EngineConfig;
use crate::element::ArchitecturalElement;
use crate::error::Diagnostic;

/// Build the graph, falling back to a text stub when that fails.
pub fn synthesize(
    elements: &[ArchitecturalElement],
    scale: &UnitScale,
    config: &EngineConfig,
    materials: Option<&dyn MaterialResolver>,
) -> (GraphOutput, Vec<Diagnostic>) {
    let project_name = config.bim.project_name.as_str();
    fallback::resolve_tiers(
        project_name,
        elements.len(),
        || {
            GraphBuilder::new(&config.bim, scale)
                .with_materials(&config.material_assignments, materials)
                .build(elements)
        },
        || degraded_stub(project_name, elements),
    )
}
