// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Graph output tiers.
//!
//! A native [`BimGraph`] is the normal result. When it cannot be built the
//! engine still answers with an IFC text stub: first a degraded one listing
//! every element with stand-in openings and boundaries, and as a last
//! resort an empty project.

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};

use super::graph::{BimGraph, EntityId, IdAllocator, ProductKind};
use crate::element::{ArchitecturalElement, ElementType};
use crate::error::{Diagnostic, Stage, StageError};

/// Stand-in boundaries are limited to this many spaces and walls each.
const STUB_BOUNDARY_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphTier {
    Native,
    Degraded,
    Empty,
}

/// What the graph stage produced, and why it fell back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum GraphOutput {
    Native {
        graph: BimGraph,
    },
    Degraded {
        stub: String,
        error: StageError,
    },
    Empty {
        stub: String,
        errors: Vec<StageError>,
    },
}

impl GraphOutput {
    pub fn tier(&self) -> GraphTier {
        match self {
            GraphOutput::Native { .. } => GraphTier::Native,
            GraphOutput::Degraded { .. } => GraphTier::Degraded,
            GraphOutput::Empty { .. } => GraphTier::Empty,
        }
    }

    pub fn graph(&self) -> Option<&BimGraph> {
        match self {
            GraphOutput::Native { graph } => Some(graph),
            _ => None,
        }
    }

    pub fn stub(&self) -> Option<&str> {
        match self {
            GraphOutput::Native { .. } => None,
            GraphOutput::Degraded { stub, .. } | GraphOutput::Empty { stub, .. } => Some(stub),
        }
    }

    /// Errors that caused the fallback, in the order they happened.
    pub fn errors(&self) -> Vec<&StageError> {
        match self {
            GraphOutput::Native { .. } => Vec::new(),
            GraphOutput::Degraded { error, .. } => vec![error],
            GraphOutput::Empty { errors, .. } => errors.iter().collect(),
        }
    }
}

/// Walk the tiers until one succeeds.
pub(crate) fn resolve_tiers<N, D>(
    project_name: &str,
    element_count: usize,
    native: N,
    degraded: D,
) -> (GraphOutput, Vec<Diagnostic>)
where
    N: FnOnce() -> Result<(BimGraph, Vec<Diagnostic>), StageError>,
    D: FnOnce() -> Result<String, StageError>,
{
    let native_error = match native() {
        Ok((graph, diagnostics)) => return (GraphOutput::Native { graph }, diagnostics),
        Err(error) => error,
    };
    tracing::warn!(error = %native_error, "Native graph failed, writing degraded stub");
    let mut diagnostics = vec![Diagnostic::from(native_error.clone())];

    match degraded() {
        Ok(stub) => (
            GraphOutput::Degraded {
                stub,
                error: native_error,
            },
            diagnostics,
        ),
        Err(degraded_error) => {
            tracing::warn!(error = %degraded_error, "Degraded stub failed, writing empty project");
            diagnostics.push(Diagnostic::from(degraded_error.clone()));
            (
                GraphOutput::Empty {
                    stub: empty_stub(project_name, element_count),
                    errors: vec![native_error, degraded_error],
                },
                diagnostics,
            )
        }
    }
}

/// STEP string literal body: quotes doubled, backslashes escaped.
fn step_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

fn write_header(out: &mut String, project_name: &str, description: &str) -> fmt::Result {
    let name = step_string(project_name);
    writeln!(out, "ISO-10303-21;")?;
    writeln!(out, "HEADER;")?;
    writeln!(out, "FILE_DESCRIPTION(('{}'),'2;1');", description)?;
    writeln!(out, "FILE_NAME('{}.ifc','',(''),(''),'dxf2bim','dxf2bim','');", name)?;
    writeln!(out, "FILE_SCHEMA(('IFC4'));")?;
    writeln!(out, "ENDSEC;")?;
    writeln!(out, "DATA;")
}

fn write_footer(out: &mut String) -> fmt::Result {
    writeln!(out, "ENDSEC;")?;
    writeln!(out, "END-ISO-10303-21;")
}

/// Attributes of each IFC4 entity written to a stub.
fn attribute_count(kind: ProductKind) -> usize {
    match kind {
        ProductKind::Door | ProductKind::Window => 13,
        ProductKind::Space => 11,
        _ => 9,
    }
}

/// Element listing with synthesized relationships.
///
/// Doors and windows are voided into walls round-robin and the first few
/// spaces are bounded by the first few walls; the geometry is not consulted,
/// so this is only a stand-in for the native graph.
pub fn degraded_stub(
    project_name: &str,
    elements: &[ArchitecturalElement],
) -> Result<String, StageError> {
    write_degraded(project_name, elements)
        .map_err(|e| StageError::new(Stage::BimGraph, format!("degraded stub: {}", e)))
}

fn write_degraded(project_name: &str, elements: &[ArchitecturalElement]) -> Result<String, fmt::Error> {
    let mut ids = IdAllocator::new(project_name);
    let mut out = String::new();
    write_header(&mut out, project_name, "ViewDefinition [DegradedExport]")?;

    let (project, gid) = ids.next("IfcProject");
    writeln!(
        out,
        "#{}=IFCPROJECT('{}',$,'{}',$,$,$,$,$,$);",
        project.0,
        gid,
        step_string(project_name)
    )?;

    let mut counts: BTreeMap<ElementType, usize> = BTreeMap::new();
    for element in elements {
        *counts.entry(element.element_type).or_default() += 1;
    }
    let summary: Vec<String> = counts.iter().map(|(t, n)| format!("{}: {}", t, n)).collect();
    writeln!(out, "/* elements: {} ({}) */", elements.len(), summary.join(", "))?;

    let mut walls: Vec<EntityId> = Vec::new();
    let mut fillers: Vec<(EntityId, ElementType)> = Vec::new();
    let mut spaces: Vec<EntityId> = Vec::new();
    for (index, element) in elements.iter().enumerate() {
        let kind = ProductKind::for_element(element.element_type);
        let (id, gid) = ids.next(kind.ifc_class());
        let name = format!("{:?} {} on {}", kind, index, element.layer);
        writeln!(
            out,
            "#{}={}('{}',$,'{}'{});",
            id.0,
            kind.ifc_class().to_ascii_uppercase(),
            gid,
            step_string(&name),
            ",$".repeat(attribute_count(kind) - 3)
        )?;
        match kind {
            ProductKind::Wall => walls.push(id),
            ProductKind::Door | ProductKind::Window => fillers.push((id, element.element_type)),
            ProductKind::Space => spaces.push(id),
            _ => {}
        }
    }

    if !walls.is_empty() {
        for (n, (filler, element_type)) in fillers.iter().enumerate() {
            let wall = walls[n % walls.len()];
            let (opening, gid) = ids.next(ProductKind::Opening.ifc_class());
            writeln!(
                out,
                "#{}=IFCOPENINGELEMENT('{}',$,'Opening for {} {}'{});",
                opening.0,
                gid,
                element_type,
                n,
                ",$".repeat(attribute_count(ProductKind::Opening) - 3)
            )?;
            let (voids, gid) = ids.next("IfcRelVoidsElement");
            writeln!(out, "#{}=IFCRELVOIDSELEMENT('{}',$,$,$,#{},#{});", voids.0, gid, wall.0, opening.0)?;
            let (fills, gid) = ids.next("IfcRelFillsElement");
            writeln!(out, "#{}=IFCRELFILLSELEMENT('{}',$,$,$,#{},#{});", fills.0, gid, opening.0, filler.0)?;
        }
    }

    for space in spaces.iter().take(STUB_BOUNDARY_LIMIT) {
        for wall in walls.iter().take(STUB_BOUNDARY_LIMIT) {
            let (boundary, gid) = ids.next("IfcRelSpaceBoundary");
            writeln!(
                out,
                "#{}=IFCRELSPACEBOUNDARY('{}',$,$,$,#{},#{},$,.PHYSICAL.,.INTERNAL.);",
                boundary.0, gid, space.0, wall.0
            )?;
        }
    }

    write_footer(&mut out)?;
    Ok(out)
}

/// Bare project, the tier that cannot fail.
pub fn empty_stub(project_name: &str, element_count: usize) -> String {
    let mut ids = IdAllocator::new(project_name);
    let (project, gid) = ids.next("IfcProject");
    let name = step_string(project_name);
    format!(
        "ISO-10303-21;\nHEADER;\nFILE_DESCRIPTION(('ViewDefinition [EmptyExport]'),'2;1');\n\
         FILE_NAME('{name}.ifc','',(''),(''),'dxf2bim','dxf2bim','');\nFILE_SCHEMA(('IFC4'));\n\
         ENDSEC;\nDATA;\n#{id}=IFCPROJECT('{gid}',$,'{name}',$,$,$,$,$,$);\n\
         /* elements processed: {element_count} */\nENDSEC;\nEND-ISO-10303-21;\n",
        name = name,
        id = project.0,
        gid = gid,
        element_count = element_count,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dxf2bim_core::{DxfEntity, GeometryRecord};

    use crate::element::ElementProperties;

    fn element(element_type: ElementType, handle: &str) -> ArchitecturalElement {
        let geometry =
            GeometryRecord::from_entity(&DxfEntity::line(handle, "L", (0.0, 0.0), (1.0, 0.0))).unwrap();
        ArchitecturalElement {
            element_type,
            layer: "L".to_string(),
            handle: handle.to_string(),
            geometry,
            properties: ElementProperties::default(),
            confidence: 0.8,
        }
    }

    fn lines_with(stub: &str, needle: &str) -> usize {
        stub.lines().filter(|l| l.contains(needle)).count()
    }

    #[test]
    fn test_degraded_stub_relationships() {
        let elements = vec![
            element(ElementType::Wall, "1"),
            element(ElementType::Wall, "2"),
            element(ElementType::Door, "3"),
            element(ElementType::Window, "4"),
            element(ElementType::Door, "5"),
            element(ElementType::Space, "6"),
        ];
        let stub = degraded_stub("O'Brien House", &elements).unwrap();

        assert!(stub.starts_with("ISO-10303-21;"));
        assert!(stub.trim_end().ends_with("END-ISO-10303-21;"));
        assert!(stub.contains("'O''Brien House'"));
        assert!(stub.contains("/* elements: 6 (wall: 2, door: 2, window: 1, space: 1) */"));
        assert_eq!(lines_with(&stub, "=IFCWALL("), 2);
        assert_eq!(lines_with(&stub, "=IFCOPENINGELEMENT("), 3);
        assert_eq!(lines_with(&stub, "=IFCRELVOIDSELEMENT("), 3);
        assert_eq!(lines_with(&stub, "=IFCRELFILLSELEMENT("), 3);
        assert_eq!(lines_with(&stub, "=IFCRELSPACEBOUNDARY("), 2);
        // entity ids follow the project: walls are #2 and #3, the third
        // opening goes back to the first wall
        let voids: Vec<&str> = stub.lines().filter(|l| l.contains("IFCRELVOIDSELEMENT")).collect();
        assert!(voids[0].contains(",#2,"));
        assert!(voids[1].contains(",#3,"));
        assert!(voids[2].contains(",#2,"));
    }

    #[test]
    fn test_degraded_stub_without_walls() {
        let elements = vec![element(ElementType::Door, "1"), element(ElementType::Space, "2")];
        let stub = degraded_stub("P", &elements).unwrap();
        assert_eq!(lines_with(&stub, "IFCOPENINGELEMENT"), 0);
        assert_eq!(lines_with(&stub, "IFCRELSPACEBOUNDARY"), 0);
        assert_eq!(lines_with(&stub, "=IFCDOOR("), 1);
    }

    #[test]
    fn test_boundary_stand_ins_are_capped() {
        let mut elements: Vec<_> = (0..7).map(|i| element(ElementType::Wall, &format!("w{}", i))).collect();
        elements.extend((0..6).map(|i| element(ElementType::Space, &format!("s{}", i))));
        let stub = degraded_stub("P", &elements).unwrap();
        assert_eq!(lines_with(&stub, "IFCRELSPACEBOUNDARY"), 25);
    }

    #[test]
    fn test_empty_stub() {
        let stub = empty_stub("Demo", 12);
        assert!(stub.contains("IFCPROJECT("));
        assert!(stub.contains("/* elements processed: 12 */"));
        assert_eq!(lines_with(&stub, "=IFC"), 1);
    }

    #[test]
    fn test_tiers() {
        let failing = || -> Result<(BimGraph, Vec<Diagnostic>), StageError> {
            Err(StageError::new(Stage::BimGraph, "boom"))
        };

        let (output, diagnostics) = resolve_tiers("P", 0, failing, || Ok("stub".to_string()));
        assert_eq!(output.tier(), GraphTier::Degraded);
        assert_eq!(output.stub(), Some("stub"));
        assert_eq!(output.errors().len(), 1);
        assert_eq!(diagnostics.len(), 1);

        let (output, diagnostics) = resolve_tiers("P", 3, failing, || {
            Err(StageError::new(Stage::BimGraph, "still broken"))
        });
        assert_eq!(output.tier(), GraphTier::Empty);
        assert!(output.graph().is_none());
        assert!(output.stub().unwrap().contains("elements processed: 3"));
        let messages: Vec<&str> = output.errors().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["boom", "still broken"]);
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn test_output_serializes_tier() {
        let output = GraphOutput::Empty {
            stub: empty_stub("P", 0),
            errors: vec![],
        };
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["tier"], "empty");
    }
}
