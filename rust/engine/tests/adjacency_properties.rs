// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property tests for room adjacency and wall clipping

use dxf2bim_core::{DxfEntity, DxfHeader};
use dxf2bim_engine::bim::RepresentationType;
use dxf2bim_engine::{extract_and_build, ElementType, EngineConfig};
use proptest::prelude::*;

fn metres() -> DxfHeader {
    DxfHeader {
        insunits: Some(6),
        ..DxfHeader::default()
    }
}

/// A row of rooms; each gap is either shared wall or a clear corridor.
fn room_row(widths: &[f64], gaps: &[bool]) -> Vec<DxfEntity> {
    let mut x = 0.0;
    let mut rooms = Vec::new();
    for (i, width) in widths.iter().enumerate() {
        let pts = [(x, 0.0), (x + width, 0.0), (x + width, 3.0), (x, 3.0)];
        rooms.push(DxfEntity::polyline(format!("R{i}"), "A-AREA", &pts, true));
        x += width;
        if gaps.get(i).copied().unwrap_or(false) {
            x += 1.5;
        }
    }
    rooms
}

/// Space/space adjacency is symmetric and matches the shared edges.
#[test]
fn proptest_space_adjacency_symmetric() {
    proptest!(|(
        widths in prop::collection::vec(2.0f64..6.0, 1..6),
        gaps in prop::collection::vec(any::<bool>(), 6),
    )| {
        let rooms = room_row(&widths, &gaps);
        let result = extract_and_build(&rooms, &[], &metres(), &EngineConfig::default(), None);
        prop_assert_eq!(result.elements.len(), widths.len());
        prop_assert!(result.elements.iter().all(|e| e.element_type == ElementType::Space));

        let spaces = &result.relationships.spaces;
        for space in spaces {
            for other in &space.adjacent_spaces {
                let back = result.relationships.space(*other).unwrap();
                prop_assert!(back.adjacent_spaces.contains(&space.element_index));
            }
        }
        for i in 0..widths.len().saturating_sub(1) {
            let touching = result
                .relationships
                .space(i)
                .unwrap()
                .adjacent_spaces
                .contains(&(i + 1));
            prop_assert_eq!(touching, !gaps[i]);
        }
    });
}

/// Walls that host nothing keep their plain extrusion.
#[test]
fn proptest_unhosted_walls_keep_swept_solid() {
    proptest!(|(
        length in 1.0f64..20.0,
        offset in 3.0f64..10.0,
    )| {
        let entities = [
            DxfEntity::line("W1", "A-WALL", (0.0, 0.0), (length, 0.0)),
            DxfEntity::line("W2", "A-WALL", (0.0, offset), (length, offset)),
        ];
        let result = extract_and_build(&entities, &[], &metres(), &EngineConfig::default(), None);
        let graph = result.bim_graph().unwrap();
        for product in &graph.products {
            let repr = product.representation.as_ref().unwrap();
            prop_assert_eq!(repr.representation_type, RepresentationType::SweptSolid);
            prop_assert!((repr.solid.volume() - length * 0.2 * 2.7).abs() < 1e-9);
        }
    });
}
