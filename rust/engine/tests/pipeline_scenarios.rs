// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end runs over small drawings

use approx::assert_relative_eq;
use dxf2bim_core::{Discipline, DxfEntity, DxfHeader, DxfLayer, LayerCategory};
use dxf2bim_engine::bim::{ProductKind, RepresentationType};
use dxf2bim_engine::{
    extract_and_build, ElementType, Engine, EngineConfig, ExtractionResult, GraphTier,
};

fn metres() -> DxfHeader {
    DxfHeader {
        insunits: Some(6),
        ..DxfHeader::default()
    }
}

fn run(entities: &[DxfEntity], layers: &[DxfLayer], header: &DxfHeader) -> ExtractionResult {
    extract_and_build(entities, layers, header, &EngineConfig::default(), None)
}

#[test]
fn test_wall_layer_name() {
    let result = run(
        &[DxfEntity::line("1", "A-WALL-EXIST", (0.0, 0.0), (4.0, 0.0))],
        &[DxfLayer::new("A-WALL-EXIST")],
        &metres(),
    );
    let layer = &result.layers[0];
    assert_eq!(layer.category(), LayerCategory::Wall);
    assert_eq!(layer.classification.discipline, Discipline::Architectural);
    assert!(layer.confidence() >= 0.8);
    assert_eq!(result.elements[0].element_type, ElementType::Wall);
}

#[test]
fn test_long_line_on_default_layer() {
    let result = run(
        &[DxfEntity::line("1", "0", (0.0, 0.0), (3.0, 0.0))],
        &[DxfLayer::new("0")],
        &metres(),
    );
    assert!(result.scale.is_explicit());
    assert_eq!(result.elements.len(), 1);
    assert_eq!(result.elements[0].element_type, ElementType::Wall);
    assert_relative_eq!(result.elements[0].confidence, 0.85);
}

#[test]
fn test_swing_arc_on_unclassified_layer() {
    let result = run(
        &[DxfEntity::arc("1", "XYZ123", (0.0, 0.0), 0.6, 0.0, 90.0)],
        &[],
        &metres(),
    );
    assert_eq!(result.elements.len(), 1);
    assert_eq!(result.elements[0].element_type, ElementType::Door);
    assert_eq!(result.statistics.elements.count(ElementType::Door), 1);
}

#[test]
fn test_room_recovered_from_wall_loop() {
    let entities = [
        DxfEntity::line("1", "A-WALL", (0.0, 0.0), (5000.0, 0.0)),
        DxfEntity::line("2", "A-WALL", (5000.0, 0.0), (5000.0, 4000.0)),
        DxfEntity::line("3", "A-WALL", (5000.0, 4000.0), (0.0, 4000.0)),
        DxfEntity::line("4", "A-WALL", (0.0, 4000.0), (0.0, 0.0)),
    ];
    let result = run(&entities, &[DxfLayer::new("A-WALL")], &DxfHeader::default());

    assert_relative_eq!(result.scale.scale_to_m, 0.001);
    let spaces: Vec<_> = result
        .elements
        .iter()
        .filter(|e| e.element_type == ElementType::Space)
        .collect();
    assert_eq!(spaces.len(), 1);
    assert!(spaces[0].is_generated());
    assert_relative_eq!(spaces[0].properties.area.unwrap(), 20_000_000.0, epsilon = 1e-3);

    assert_eq!(result.relationships.summary.generated_spaces, 1);
    let space = &result.relationships.spaces[0];
    assert_relative_eq!(space.area_m2.unwrap(), 20.0, epsilon = 1e-9);
    assert_eq!(space.adjacent_walls.len(), 4);

    let graph = result.bim_graph().unwrap();
    let product = graph.product_for_element(4).unwrap();
    assert_eq!(product.kind, ProductKind::Space);
    assert_eq!(graph.boundaries_of(product.id).len(), 4);
    assert_eq!(result.statistics.elements.generated, 1);
}

#[test]
fn test_door_cuts_nearest_wall() {
    let entities = [
        DxfEntity::line("W1", "A-WALL", (0.0, 0.0), (4.0, 0.0)),
        DxfEntity::line("W2", "A-WALL", (0.0, 5.05), (4.0, 5.05)),
        DxfEntity::arc("D", "A-DOOR", (2.0, 0.05), 0.9, 0.0, 90.0),
    ];
    let result = run(&entities, &[], &metres());
    assert_eq!(result.graph.tier(), GraphTier::Native);
    assert_eq!(result.elements[2].element_type, ElementType::Door);

    let graph = result.bim_graph().unwrap();
    let host = graph.product_for_element(0).unwrap();
    let other = graph.product_for_element(1).unwrap();
    let door = graph.product_for_element(2).unwrap();

    let openings = graph.openings_in(host.id);
    assert_eq!(openings.len(), 1);
    assert_eq!(graph.host_of(openings[0]), Some(host.id));
    assert_eq!(graph.filler_of(openings[0]), Some(door.id));
    assert!(graph.openings_in(other.id).is_empty());
    assert_eq!(graph.relationship_count("IfcRelVoidsElement"), 1);
    assert_eq!(graph.relationship_count("IfcRelFillsElement"), 1);

    let clipped = host.representation.as_ref().unwrap();
    assert_eq!(clipped.representation_type, RepresentationType::Clipping);
    let unclipped = other.solid().unwrap().volume();
    assert_relative_eq!(unclipped, 4.0 * 0.2 * 2.7, epsilon = 1e-9);
    assert!(clipped.solid.volume() < unclipped);
    assert_relative_eq!(clipped.solid.volume(), unclipped - 0.9 * 0.2 * 2.1, epsilon = 1e-9);

    assert!(graph.validate().is_ok());
}

#[test]
fn test_door_cuts_through_strip_wall() {
    let entities = [
        DxfEntity::polyline(
            "W",
            "A-WALL",
            &[(0.0, 0.0), (4.0, 0.0), (4.0, 0.2), (0.0, 0.2)],
            true,
        ),
        DxfEntity::arc("D", "A-DOOR", (2.0, 0.0), 0.9, 0.0, 90.0),
    ];
    let result = run(&entities, &[], &metres());
    assert_eq!(result.elements[0].element_type, ElementType::Wall);
    assert_eq!(result.elements[1].element_type, ElementType::Door);

    let graph = result.bim_graph().unwrap();
    let wall = graph.product_for_element(0).unwrap();
    assert_eq!(graph.openings_in(wall.id).len(), 1);

    let clipped = wall.representation.as_ref().unwrap();
    assert_eq!(clipped.representation_type, RepresentationType::Clipping);
    let full = 4.0 * 0.2 * 2.7;
    assert_relative_eq!(full - clipped.solid.volume(), 0.9 * 0.2 * 2.1, epsilon = 1e-9);
}

#[test]
fn test_pattern_only_layer_keeps_low_confidence() {
    let result = run(
        &[DxfEntity::line("1", "XWINDOW-", (0.0, 0.0), (1.2, 0.0))],
        &[DxfLayer::new("XWINDOW-")],
        &metres(),
    );
    let layer = &result.layers[0];
    assert_eq!(layer.category(), LayerCategory::Window);
    assert_relative_eq!(layer.confidence(), 0.25);

    // base 0.78 + 0.25 * 0.4 + 0.05
    let window = &result.elements[0];
    assert_eq!(window.element_type, ElementType::Window);
    assert_relative_eq!(window.confidence, 0.93, epsilon = 1e-9);
}

#[test]
fn test_bad_storey_falls_back_to_stub() {
    let mut config = EngineConfig::default();
    config.bim.storey_height_m = 0.0;
    let entities = [
        DxfEntity::line("W1", "A-WALL", (0.0, 0.0), (4.0, 0.0)),
        DxfEntity::arc("D", "A-DOOR", (2.0, 0.05), 0.9, 0.0, 90.0),
    ];
    let result = extract_and_build(&entities, &[], &metres(), &config, None);

    assert!(result.success);
    assert_eq!(result.graph.tier(), GraphTier::Degraded);
    assert!(result.bim_graph().is_none());
    let stub = result.graph.stub().unwrap();
    assert!(stub.starts_with("ISO-10303-21;"));
    assert!(stub.contains("IFCPROJECT"));
    assert!(stub.contains("IFCWALL"));
    assert!(stub.contains("IFCRELVOIDSELEMENT"));
    assert!(result.error.is_some());
    assert!(result.has_errors());
}

#[test]
fn test_json_document() {
    let json = r#"{
        "header": {"$INSUNITS": 6},
        "layers": [{"name": "A-WALL"}, {"name": "A-DOOR"}],
        "entities": [
            {"type": "LINE", "handle": "1", "layer": "A-WALL",
             "start": {"x": 0, "y": 0}, "end": {"x": 6, "y": 0}},
            {"type": "ARC", "handle": "2", "layer": "A-DOOR",
             "center": {"x": 3, "y": 0}, "radius": 0.9, "start_angle": 0, "end_angle": 90},
            {"type": "VIEWPORT", "handle": "3", "layer": "0", "width": 10}
        ]
    }"#;
    let config = EngineConfig::default().with_material(ElementType::Wall, "brick");
    let result = Engine::new(config).process_json(json).unwrap();

    assert_eq!(result.statistics.total_entities, 3);
    assert_eq!(result.statistics.elements.count(ElementType::Wall), 1);
    assert_eq!(result.statistics.elements.count(ElementType::Door), 1);
    let graph = result.bim_graph().unwrap();
    assert_eq!(graph.count(ProductKind::Opening), 1);
    // no catalog attached, so the slug stays unresolved
    assert!(graph.products.iter().all(|p| p.material.is_none()));

    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["graph"]["tier"], "native");
    assert_eq!(value["success"], true);
}
