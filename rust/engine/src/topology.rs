// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topology: rooms, the walls around them and their neighbours.
//!
//! Two passes over the classified elements:
//!
//! 1. **Space synthesis.** A drawing with walls but no room outline gets its
//!    rooms from the faces of the wall arrangement.
//! 2. **Adjacency.** A wall bounds a space when it passes within the
//!    tolerance of the space polygon; two spaces are neighbours when their
//!    polygons, each grown by the tolerance, overlap. Space adjacency is
//!    symmetric.
//!
//! The tolerance is 10 cm converted to drawing units. Results are written
//! back into each element's relation metadata and returned as a report.

use dxf2bim_core::geometry::path_length;
use dxf2bim_core::{Bounds, GeometryRecord, Point2D, Shape, UnitScale};
use dxf2bim_geometry::primitives::{chain_segments, from_point, is_simple_ring};
use dxf2bim_geometry::{
    polygon_area, polygon_chain_distance, polygon_distance, polygonize, repair_ring_largest,
    to_ring, Point2, Segment,
};
use serde::{Deserialize, Serialize};

use crate::config::TopologyConfig;
use crate::element::{
    ArchitecturalElement, ElementProperties, ElementType, GENERATED_SPACE_LAYER,
};
use crate::error::{Diagnostic, Stage, StageError};

/// Confidence assigned to rooms recovered from wall loops
pub const GENERATED_SPACE_CONFIDENCE: f64 = 0.45;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjacentWall {
    pub element_index: usize,
    pub layer: String,
    pub length_m: Option<f64>,
    pub length_raw: Option<f64>,
    /// Gap between wall and space, in drawing units.
    pub distance: f64,
}

/// Relationships of one space or floor element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceRelationship {
    pub element_index: usize,
    pub element_type: ElementType,
    pub name: Option<String>,
    pub layer: String,
    pub generated: bool,
    pub area_m2: Option<f64>,
    pub area_raw: Option<f64>,
    /// Nearest first.
    pub adjacent_walls: Vec<AdjacentWall>,
    pub adjacent_spaces: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSummary {
    pub spaces: usize,
    pub walls: usize,
    pub generated_spaces: usize,
    pub average_area_m2: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationships {
    pub spaces: Vec<SpaceRelationship>,
    pub summary: RelationshipSummary,
    pub scale_to_m: f64,
}

impl Relationships {
    pub fn empty(scale: &UnitScale) -> Self {
        Self {
            scale_to_m: scale.scale_to_m,
            ..Self::default()
        }
    }

    pub fn space(&self, element_index: usize) -> Option<&SpaceRelationship> {
        self.spaces.iter().find(|s| s.element_index == element_index)
    }
}

/// Plan segments of a wall element.
pub fn wall_segments(element: &ArchitecturalElement) -> Vec<Segment> {
    let points = to_ring(&element.geometry.points());
    if points.len() < 2 {
        return Vec::new();
    }
    chain_segments(&points, element.geometry.is_closed())
        .into_iter()
        .filter(|s| s.length() > 0.0)
        .collect()
}

/// Valid ring of a space-like element, repaired when it self-intersects.
pub fn space_ring(element: &ArchitecturalElement) -> Result<Option<Vec<Point2<f64>>>, StageError> {
    let Some(points) = element.geometry.polygon() else {
        return Ok(None);
    };
    let ring = to_ring(&points);
    if polygon_area(&ring) <= 0.0 {
        return Ok(None);
    }
    if is_simple_ring(&ring) {
        return Ok(Some(ring));
    }
    let repaired = repair_ring_largest(&ring).map_err(|e| StageError::new(Stage::Topology, e))?;
    Ok(Some(repaired.outer))
}

pub struct TopologyEngine<'a> {
    scale: &'a UnitScale,
    config: &'a TopologyConfig,
}

impl<'a> TopologyEngine<'a> {
    pub fn new(scale: &'a UnitScale, config: &'a TopologyConfig) -> Self {
        Self { scale, config }
    }

    /// Adjacency tolerance in drawing units, never under 1 cm.
    pub fn tolerance(&self) -> f64 {
        self.scale
            .to_units(self.config.adjacency_tolerance_m.max(0.01))
    }

    /// Synthesize missing rooms, then compute adjacency. Never fails; any
    /// problem ends up in the returned diagnostics.
    pub fn run(&self, elements: &mut Vec<ArchitecturalElement>) -> (Relationships, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();

        if self.config.synthesize_spaces {
            match self.synthesize_spaces(elements) {
                Ok(generated) if !generated.is_empty() => {
                    tracing::info!(
                        spaces = generated.len(),
                        "generated fallback spaces from wall geometry"
                    );
                    elements.extend(generated);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "space synthesis failed");
                    diagnostics.push(err.into());
                }
            }
        }

        let relationships = match self.relationships(elements, &mut diagnostics) {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(error = %err, "relationship computation failed");
                diagnostics.push(err.into());
                Relationships::empty(self.scale)
            }
        };
        (relationships, diagnostics)
    }

    /// Rooms from the faces of the wall arrangement, when the drawing has
    /// walls but no space or floor.
    pub fn synthesize_spaces(
        &self,
        elements: &[ArchitecturalElement],
    ) -> Result<Vec<ArchitecturalElement>, StageError> {
        if elements.iter().any(|e| e.element_type.is_spatial()) {
            return Ok(Vec::new());
        }

        let segments: Vec<Segment> = elements
            .iter()
            .filter(|e| e.element_type == ElementType::Wall)
            .flat_map(wall_segments)
            .collect();
        if segments.len() < 3 {
            return Ok(Vec::new());
        }

        let snap = self.scale.to_units(self.config.snap_tolerance_m);
        let faces = polygonize(&segments, snap)
            .map_err(|e| StageError::new(Stage::Topology, format!("polygonize: {e}")))?;

        let min_area = self.scale.area_to_units(self.config.min_generated_space_m2);
        let generated = faces
            .into_iter()
            .filter(|face| face.area >= min_area)
            .enumerate()
            .map(|(i, face)| {
                let points: Vec<Point2D> = face.exterior.iter().map(from_point).collect();
                generated_space(i + 1, points, face.area)
            })
            .collect();
        Ok(generated)
    }

    /// Wall/space and space/space adjacency over the current elements.
    pub fn relationships(
        &self,
        elements: &mut [ArchitecturalElement],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Relationships, StageError> {
        let tolerance = self.tolerance();

        let walls: Vec<(usize, Vec<Segment>)> = elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.element_type == ElementType::Wall)
            .map(|(i, e)| (i, wall_segments(e)))
            .filter(|(_, segs)| !segs.is_empty())
            .collect();

        let mut rings: Vec<(usize, Vec<Point2<f64>>)> = Vec::new();
        for (i, element) in elements.iter().enumerate() {
            if !element.element_type.is_spatial() {
                continue;
            }
            match space_ring(element) {
                Ok(Some(ring)) => rings.push((i, ring)),
                Ok(None) => {}
                Err(err) => diagnostics.push(
                    Diagnostic::warning(Stage::Topology, err.message)
                        .with_handle(element.handle.clone())
                        .with_element(i),
                ),
            }
        }

        let mut report = Relationships::empty(self.scale);
        report.summary.walls = walls.len();
        if rings.is_empty() {
            return Ok(report);
        }

        for (space_index, ring) in &rings {
            let mut adjacent: Vec<AdjacentWall> = Vec::new();
            for (wall_index, segments) in &walls {
                let distance = polygon_chain_distance(ring, segments);
                if !distance.is_finite() {
                    return Err(StageError::new(
                        Stage::Topology,
                        format!("non-finite distance to wall {wall_index}"),
                    ));
                }
                if distance <= tolerance {
                    let wall = &elements[*wall_index];
                    let length_raw = wall.properties.length;
                    adjacent.push(AdjacentWall {
                        element_index: *wall_index,
                        layer: wall.layer.clone(),
                        length_m: length_raw.map(|l| self.scale.to_meters(l)),
                        length_raw,
                        distance,
                    });
                }
            }
            adjacent.sort_by(|a, b| {
                a.distance
                    .total_cmp(&b.distance)
                    .then(a.element_index.cmp(&b.element_index))
            });

            let element = &elements[*space_index];
            let area_raw = element.properties.area.or_else(|| Some(polygon_area(ring)));
            report.spaces.push(SpaceRelationship {
                element_index: *space_index,
                element_type: element.element_type,
                name: element.properties.name.clone(),
                layer: element.layer.clone(),
                generated: element.is_generated(),
                area_m2: area_raw.map(|a| self.scale.area_to_m2(a)),
                area_raw,
                adjacent_walls: adjacent,
                adjacent_spaces: Vec::new(),
            });
        }

        // Both polygons grown by the tolerance overlap when their gap is at
        // most twice the tolerance.
        for i in 0..rings.len() {
            for j in (i + 1)..rings.len() {
                if polygon_distance(&rings[i].1, &rings[j].1) <= 2.0 * tolerance {
                    let (a, b) = (rings[i].0, rings[j].0);
                    report.spaces[i].adjacent_spaces.push(b);
                    report.spaces[j].adjacent_spaces.push(a);
                }
            }
        }

        for space in &report.spaces {
            let relations = elements[space.element_index].relations_mut();
            relations.adjacent_walls = space.adjacent_walls.iter().map(|w| w.element_index).collect();
            relations.adjacent_spaces = space.adjacent_spaces.clone();
            for wall in &space.adjacent_walls {
                let wall_relations = elements[wall.element_index].relations_mut();
                if !wall_relations.adjacent_spaces.contains(&space.element_index) {
                    wall_relations.adjacent_spaces.push(space.element_index);
                }
            }
        }

        let areas: Vec<f64> = report.spaces.iter().filter_map(|s| s.area_m2).collect();
        report.summary.spaces = report.spaces.len();
        report.summary.generated_spaces = report.spaces.iter().filter(|s| s.generated).count();
        report.summary.average_area_m2 = if areas.is_empty() {
            0.0
        } else {
            areas.iter().sum::<f64>() / areas.len() as f64
        };

        tracing::debug!(
            spaces = report.summary.spaces,
            walls = report.summary.walls,
            "computed space relationships"
        );
        Ok(report)
    }
}

fn generated_space(n: usize, points: Vec<Point2D>, area: f64) -> ArchitecturalElement {
    let bounds = Bounds::from_points(points.iter());
    let perimeter = path_length(&points, true);
    let geometry = GeometryRecord {
        handle: format!("generated-space-{n}"),
        layer: GENERATED_SPACE_LAYER.to_string(),
        elevation: 0.0,
        thickness: None,
        shape: Shape::Polyline {
            length: path_length(&points, false),
            perimeter,
            points,
            closed: true,
            area: Some(area),
        },
        bounds,
    };
    ArchitecturalElement {
        element_type: ElementType::Space,
        layer: GENERATED_SPACE_LAYER.to_string(),
        handle: geometry.handle.clone(),
        geometry,
        properties: ElementProperties {
            area: Some(area),
            name: Some(format!("Generated Space {n}")),
            generated: true,
            ..ElementProperties::default()
        },
        confidence: GENERATED_SPACE_CONFIDENCE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{classify_record, LayerContext};
    use crate::config::ClassifierThresholds;
    use approx::assert_relative_eq;
    use dxf2bim_core::DxfEntity;

    fn classify(entity: DxfEntity, scale: &UnitScale) -> ArchitecturalElement {
        let record = GeometryRecord::from_entity(&entity).unwrap();
        let ctx = LayerContext::from_name(&record.layer);
        classify_record(&record, &ctx, scale, &ClassifierThresholds::default()).unwrap()
    }

    fn rectangle_walls(x0: f64, y0: f64, w: f64, h: f64, scale: &UnitScale) -> Vec<ArchitecturalElement> {
        let c = [(x0, y0), (x0 + w, y0), (x0 + w, y0 + h), (x0, y0 + h)];
        (0..4)
            .map(|i| {
                classify(
                    DxfEntity::line(format!("w{i}"), "A-WALL", c[i], c[(i + 1) % 4]),
                    scale,
                )
            })
            .collect()
    }

    #[test]
    fn test_rectangle_yields_one_generated_space() {
        let scale = UnitScale::default();
        let config = TopologyConfig::default();
        let mut elements = rectangle_walls(0.0, 0.0, 5000.0, 4000.0, &scale);
        let (report, diagnostics) = TopologyEngine::new(&scale, &config).run(&mut elements);

        assert!(diagnostics.is_empty());
        assert_eq!(elements.len(), 5);
        let space = &elements[4];
        assert_eq!(space.element_type, ElementType::Space);
        assert!(space.properties.generated);
        assert_eq!(space.layer, GENERATED_SPACE_LAYER);
        assert_eq!(space.properties.name.as_deref(), Some("Generated Space 1"));
        assert_relative_eq!(space.confidence, 0.45);
        assert_relative_eq!(space.properties.area.unwrap(), 20_000_000.0, epsilon = 1e-3);

        assert_eq!(report.summary.spaces, 1);
        assert_eq!(report.summary.generated_spaces, 1);
        assert_relative_eq!(report.summary.average_area_m2, 20.0, epsilon = 1e-6);
        let walls: Vec<usize> = report.spaces[0].adjacent_walls.iter().map(|w| w.element_index).collect();
        assert_eq!(walls, vec![0, 1, 2, 3]);
        assert_eq!(elements[0].relations().unwrap().adjacent_spaces, vec![4]);
    }

    #[test]
    fn test_small_faces_are_dropped() {
        let scale = UnitScale::default();
        let config = TopologyConfig::default();
        // 1 m x 1 m closet
        let elements = rectangle_walls(0.0, 0.0, 1000.0, 1000.0, &scale);
        let engine = TopologyEngine::new(&scale, &config);
        assert!(engine.synthesize_spaces(&elements).unwrap().is_empty());
    }

    #[test]
    fn test_existing_space_suppresses_synthesis() {
        let scale = UnitScale::default();
        let config = TopologyConfig::default();
        let mut elements = rectangle_walls(0.0, 0.0, 5000.0, 4000.0, &scale);
        elements.push(classify(
            DxfEntity::polyline(
                "room",
                "A-AREA",
                &[(0.0, 0.0), (5000.0, 0.0), (5000.0, 4000.0), (0.0, 4000.0)],
                true,
            ),
            &scale,
        ));
        let engine = TopologyEngine::new(&scale, &config);
        assert!(engine.synthesize_spaces(&elements).unwrap().is_empty());
    }

    #[test]
    fn test_two_rooms_share_a_wall() {
        let scale = UnitScale::default();
        let config = TopologyConfig::default();
        let room = |h: &str, x0: f64| {
            classify(
                DxfEntity::polyline(
                    h,
                    "0",
                    &[(x0, 0.0), (x0 + 4000.0, 0.0), (x0 + 4000.0, 3000.0), (x0, 3000.0)],
                    true,
                ),
                &scale,
            )
        };
        let mut elements = vec![
            room("a", 0.0),
            room("b", 4050.0),
            room("c", 20000.0),
            classify(DxfEntity::line("w", "A-WALL", (4025.0, 0.0), (4025.0, 3000.0)), &scale),
        ];
        let (report, _) = TopologyEngine::new(&scale, &config).run(&mut elements);

        assert_eq!(report.space(0).unwrap().adjacent_spaces, vec![1]);
        assert_eq!(report.space(1).unwrap().adjacent_spaces, vec![0]);
        assert!(report.space(2).unwrap().adjacent_spaces.is_empty());
        assert_eq!(report.space(0).unwrap().adjacent_walls[0].element_index, 3);
        assert_eq!(elements[3].relations().unwrap().adjacent_spaces, vec![0, 1]);
    }

    #[test]
    fn test_no_spaces_reports_walls_only() {
        let scale = UnitScale::default();
        let config = TopologyConfig {
            synthesize_spaces: false,
            ..TopologyConfig::default()
        };
        let mut elements = rectangle_walls(0.0, 0.0, 5000.0, 4000.0, &scale);
        let (report, _) = TopologyEngine::new(&scale, &config).run(&mut elements);
        assert!(report.spaces.is_empty());
        assert_eq!(report.summary.walls, 4);
    }
}
