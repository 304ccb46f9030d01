// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Element list to [`BimGraph`].
//!
//! One product per element, in element order. Doors and windows are hosted
//! once every wall exists: each gets an opening in its nearest wall, and
//! walls with openings have their body replaced by a boolean difference.

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::TAU;

use dxf2bim_core::{Point2D, Point3D, UnitScale};
use dxf2bim_geometry::primitives::{from_point, ring_edges};
use dxf2bim_geometry::{
    to_point, to_ring, ExtrudedSolid, ExtrusionDirection, Placement, Profile, Segment, Solid,
    Vector2,
};

use super::graph::{
    BimGraph, BoundaryKind, BoundaryLocation, IdAllocator, Product, ProductKind, Relationship,
    Representation, RepresentationType, SpatialKind, SpatialNode,
};
use crate::catalog::MaterialResolver;
use crate::config::BimDefaults;
use crate::element::{ArchitecturalElement, ElementType};
use crate::error::{Diagnostic, Stage, StageError};
use crate::topology::wall_segments;

/// Smallest length any generated body may have, in metres.
const MIN_LENGTH_M: f64 = 0.01;
const COLUMN_SIDES: usize = 16;

/// Length in drawing units for a raw property value.
///
/// Values that look like metres in a millimetre or centimetre drawing are
/// scaled up; missing or non-positive values take `default_m`. The result is
/// never below 1 cm.
pub fn normalize_length(raw: Option<f64>, default_m: f64, scale: &UnitScale) -> f64 {
    let fallback = scale.to_units(default_m);
    let candidate = raw
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(|v| {
            if scale.scale_to_m < 0.1 && v.abs() < 10.0 {
                scale.to_units(v)
            } else {
                v
            }
        })
        .unwrap_or(fallback);

    let min_units = scale.to_units(MIN_LENGTH_M);
    if candidate < min_units {
        min_units.max(fallback)
    } else {
        candidate
    }
}

/// Where a product sits: bounds centre, circle/arc centre, midpoint of the
/// first two vertices, then the entity's anchor.
pub fn placement_point(element: &ArchitecturalElement) -> Option<Point2D> {
    let geometry = &element.geometry;
    if let Some(bounds) = geometry.bounds.filter(|b| b.is_finite()) {
        return Some(bounds.center());
    }
    if let Some(center) = geometry.center() {
        return Some(center);
    }
    let points = geometry.points();
    if points.len() >= 2 {
        return Some(points[0].midpoint(&points[1]));
    }
    geometry.anchor_point()
}

/// Frame of a wall body, kept for hosting and clipping
struct WallFrame {
    product: usize,
    segments: Vec<Segment>,
    placement: Placement,
    thickness: f64,
    half_length: f64,
}

impl WallFrame {
    /// `point` projected onto the body's centre line, kept within its ends.
    fn axis_foot(&self, point: &Point2D) -> Point2D {
        let origin = self.placement.location;
        let [dx, dy] = self.placement.ref_direction;
        let t = ((point.x - origin.x) * dx + (point.y - origin.y) * dy)
            .clamp(-self.half_length, self.half_length);
        Point2D::new(origin.x + t * dx, origin.y + t * dy)
    }
}

/// Door or window waiting for its host
struct PendingFiller {
    product: usize,
    element_index: usize,
    point: Point2D,
}

/// Turns classified elements into a validated [`BimGraph`]
pub struct GraphBuilder<'a> {
    defaults: &'a BimDefaults,
    scale: &'a UnitScale,
    assignments: &'a BTreeMap<ElementType, String>,
    materials: Option<&'a dyn MaterialResolver>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(defaults: &'a BimDefaults, scale: &'a UnitScale) -> Self {
        static NO_ASSIGNMENTS: BTreeMap<ElementType, String> = BTreeMap::new();
        Self {
            defaults,
            scale,
            assignments: &NO_ASSIGNMENTS,
            materials: None,
        }
    }

    /// Attach materials by element type, resolved through `resolver`.
    pub fn with_materials(
        mut self,
        assignments: &'a BTreeMap<ElementType, String>,
        resolver: Option<&'a dyn MaterialResolver>,
    ) -> Self {
        self.assignments = assignments;
        self.materials = resolver;
        self
    }

    fn length(&self, raw: Option<f64>, default_m: f64) -> f64 {
        normalize_length(raw, default_m, self.scale)
    }

    /// Build and validate the graph.
    ///
    /// Geometry problems on single elements become diagnostics and leave the
    /// product without a body. Invalid settings or a graph that fails
    /// validation are errors.
    pub fn build(
        &self,
        elements: &[ArchitecturalElement],
    ) -> Result<(BimGraph, Vec<Diagnostic>), StageError> {
        let d = self.defaults;
        if !(d.storey_height_m.is_finite() && d.storey_height_m > 0.0) {
            return Err(StageError::new(
                Stage::BimGraph,
                format!("storey height {} must be positive", d.storey_height_m),
            ));
        }
        if !d.storey_elevation_m.is_finite() {
            return Err(StageError::new(Stage::BimGraph, "storey elevation is not finite"));
        }

        let mut diagnostics = Vec::new();
        let mut ids = IdAllocator::new(&d.project_name);
        let elevation = self.scale.to_units(d.storey_elevation_m);

        let project = spatial(&mut ids, SpatialKind::Project, &d.project_name, 0.0);
        let site = spatial(&mut ids, SpatialKind::Site, &d.site_name, 0.0);
        let building = spatial(&mut ids, SpatialKind::Building, &d.building_name, 0.0);
        let storey = spatial(&mut ids, SpatialKind::Storey, &d.storey_name, elevation);

        let mut products: Vec<Product> = Vec::with_capacity(elements.len());
        let mut walls: Vec<WallFrame> = Vec::new();
        let mut fillers: Vec<PendingFiller> = Vec::new();
        let mut warned_materials = BTreeSet::new();

        for (index, element) in elements.iter().enumerate() {
            let kind = ProductKind::for_element(element.element_type);
            let (id, global_id) = ids.next(kind.ifc_class());
            let location = placement_point(element).unwrap_or_default();
            let mut product = Product {
                id,
                global_id,
                kind,
                name: element
                    .properties
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("{:?} {}", kind, index)),
                element_index: Some(index),
                element_type: Some(element.element_type),
                placement: Placement::at(Point3D::new(location.x, location.y, elevation)),
                representation: None,
                material: self.material(element.element_type, &mut warned_materials, &mut diagnostics),
            };

            let body = match kind {
                ProductKind::Wall => {
                    let frame = self.wall_body(element, location, elevation);
                    frame.map(|found| {
                        found.map(|(solid, segments)| {
                            walls.push(WallFrame {
                                product: products.len(),
                                segments,
                                placement: solid.position,
                                thickness: solid_width(&solid),
                                half_length: solid_length(&solid) / 2.0,
                            });
                            solid
                        })
                    })
                }
                ProductKind::Door | ProductKind::Window => {
                    let point = element
                        .geometry
                        .center()
                        .or_else(|| element.geometry.insert_point())
                        .unwrap_or(location);
                    fillers.push(PendingFiller {
                        product: products.len(),
                        element_index: index,
                        point,
                    });
                    Ok(None)
                }
                ProductKind::Slab => {
                    let thickness = self.length(element.properties.thickness, d.slab_thickness_m);
                    self.plan_body(element, location, elevation, ExtrusionDirection::Down, thickness)
                }
                ProductKind::Covering => {
                    let z = elevation + self.length(None, d.ceiling_height_m);
                    let thickness =
                        self.length(element.properties.thickness, d.ceiling_thickness_m);
                    self.plan_body(element, location, z, ExtrusionDirection::Down, thickness)
                }
                ProductKind::Space => {
                    let height = self.length(None, d.storey_height_m);
                    self.plan_body(element, location, elevation, ExtrusionDirection::Up, height)
                }
                ProductKind::Column => self.column_body(element, location, elevation),
                ProductKind::Beam => self.beam_body(element, elevation),
                ProductKind::Opening | ProductKind::Proxy => Ok(None),
            };

            match body {
                Ok(Some(solid)) => {
                    product.placement = solid.position;
                    product.representation = Some(Representation::swept(solid));
                }
                Ok(None) => {
                    if kind == ProductKind::Wall {
                        diagnostics.push(
                            Diagnostic::warning(Stage::BimGraph, "wall has no plan segments")
                                .with_handle(element.handle.as_str())
                                .with_element(index),
                        );
                    }
                }
                Err(error) => {
                    tracing::debug!(handle = %element.handle, error = %error, "Body generation skipped");
                    diagnostics.push(
                        Diagnostic::warning(Stage::BimGraph, format!("{} body skipped: {}", kind.ifc_class(), error))
                            .with_handle(element.handle.as_str())
                            .with_element(index),
                    );
                }
            }
            products.push(product);
        }

        // Hosting: openings, voids and fills
        let mut hosted: Vec<Relationship> = Vec::new();
        let mut cuts: BTreeMap<usize, Vec<Solid>> = BTreeMap::new();
        let mut openings: Vec<Product> = Vec::new();
        for filler in &fillers {
            let element = &elements[filler.element_index];
            let Some((wall_index, distance)) = nearest_wall(&walls, &filler.point) else {
                diagnostics.push(
                    Diagnostic::warning(Stage::BimGraph, "no wall to host opening")
                        .with_handle(element.handle.as_str())
                        .with_element(filler.element_index),
                );
                continue;
            };
            if let Some(max_m) = d.max_host_distance_m {
                if distance > self.scale.to_units(max_m) {
                    diagnostics.push(
                        Diagnostic::warning(
                            Stage::BimGraph,
                            format!("nearest wall is {:.3} units away, beyond the host cutoff", distance),
                        )
                        .with_handle(element.handle.as_str())
                        .with_element(filler.element_index),
                    );
                    continue;
                }
            }

            let wall = &walls[wall_index];
            let props = &element.properties;
            let is_door = element.element_type == ElementType::Door;
            let (width, height, base) = if is_door {
                (
                    self.length(props.width, d.door_width_m),
                    self.length(props.height, d.door_height_m),
                    elevation,
                )
            } else {
                (
                    self.length(props.width, d.window_width_m),
                    self.length(props.height, d.window_height_m),
                    elevation + self.length(props.sill_height, d.window_sill_height_m),
                )
            };

            // Centre line, not the hit edge, so strip walls are cut through.
            let foot = wall.axis_foot(&filler.point);
            let direction = Vector2::new(wall.placement.ref_direction[0], wall.placement.ref_direction[1]);
            let frame = Placement::oriented(Point3D::new(foot.x, foot.y, base), direction);

            let opening_solid = match ExtrudedSolid::rectangle(width, wall.thickness, frame, height) {
                Ok(solid) => solid,
                Err(error) => {
                    diagnostics.push(
                        Diagnostic::warning(Stage::BimGraph, format!("opening skipped: {}", error))
                            .with_handle(element.handle.as_str())
                            .with_element(filler.element_index),
                    );
                    continue;
                }
            };

            let (opening_id, opening_gid) = ids.next(ProductKind::Opening.ifc_class());
            let host_id = products[wall.product].id;
            let filler_product = &mut products[filler.product];
            openings.push(Product {
                id: opening_id,
                global_id: opening_gid,
                kind: ProductKind::Opening,
                name: format!("Opening for {}", filler_product.name),
                element_index: Some(filler.element_index),
                element_type: None,
                placement: frame,
                representation: Some(Representation::swept(opening_solid.clone())),
                material: None,
            });

            filler_product.placement = frame.with_z(base + height / 2.0);
            let panel = Placement::oriented(Point3D::new(foot.x, foot.y, base + height * 0.01), direction);
            let panel_thickness = self.length(None, d.panel_thickness_m).min(wall.thickness);
            match ExtrudedSolid::rectangle(width * 0.95, panel_thickness, panel, height * 0.98) {
                Ok(solid) => filler_product.representation = Some(Representation::swept(solid)),
                Err(error) => diagnostics.push(
                    Diagnostic::warning(Stage::BimGraph, format!("panel body skipped: {}", error))
                        .with_element(filler.element_index),
                ),
            }

            cuts.entry(wall_index).or_default().push(opening_solid.into());
            hosted.push(Relationship::Voids {
                wall: host_id,
                opening: opening_id,
            });
            hosted.push(Relationship::Fills {
                opening: opening_id,
                element: filler_product.id,
            });
        }

        // Boolean clipping of hosting walls
        for (wall_index, wall_cuts) in cuts {
            let product = &mut products[walls[wall_index].product];
            if let Some(base) = product.representation.take() {
                product.representation = Some(Representation {
                    representation_type: RepresentationType::Clipping,
                    solid: Solid::difference(base.solid, wall_cuts),
                });
            }
        }

        let boundaries = self.space_boundaries(elements, &products, &walls);

        let spaces: Vec<_> = products
            .iter()
            .filter(|p| p.kind == ProductKind::Space)
            .map(|p| p.id)
            .collect();
        let contained: Vec<_> = products
            .iter()
            .chain(openings.iter())
            .filter(|p| p.kind != ProductKind::Space)
            .map(|p| p.id)
            .collect();
        products.extend(openings);

        let mut relationships = vec![
            Relationship::Aggregates {
                relating: project.id,
                related: vec![site.id],
            },
            Relationship::Aggregates {
                relating: site.id,
                related: vec![building.id],
            },
            Relationship::Aggregates {
                relating: building.id,
                related: vec![storey.id],
            },
        ];
        if !spaces.is_empty() {
            relationships.push(Relationship::Aggregates {
                relating: storey.id,
                related: spaces,
            });
        }
        if !contained.is_empty() {
            relationships.push(Relationship::ContainedInStructure {
                structure: storey.id,
                elements: contained,
            });
        }
        relationships.extend(hosted);
        relationships.extend(boundaries);

        let graph = BimGraph {
            project,
            site,
            building,
            storey,
            products,
            relationships,
        };
        graph
            .validate()
            .map_err(|e| StageError::new(Stage::BimGraph, e))?;

        tracing::info!(
            products = graph.products.len(),
            relationships = graph.relationships.len(),
            walls = walls.len(),
            openings = graph.count(ProductKind::Opening),
            "BIM graph built"
        );
        Ok((graph, diagnostics))
    }

    fn material(
        &self,
        element_type: ElementType,
        warned: &mut BTreeSet<String>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<crate::catalog::MaterialInfo> {
        let slug = self.assignments.get(&element_type)?;
        let resolved = self.materials.and_then(|resolver| resolver.resolve(slug));
        if resolved.is_none() && warned.insert(slug.clone()) {
            diagnostics.push(Diagnostic::warning(
                Stage::BimGraph,
                format!("material '{}' for {} not found in catalog", slug, element_type),
            ));
        }
        resolved
    }

    /// Wall box along its main direction, plus the plan segments used for
    /// hosting. Closed outlines run along their longest edge.
    fn wall_body(
        &self,
        element: &ArchitecturalElement,
        location: Point2D,
        elevation: f64,
    ) -> dxf2bim_geometry::Result<Option<(ExtrudedSolid, Vec<Segment>)>> {
        let segments = wall_segments(element);
        let axis = if element.geometry.polygon().is_some() {
            segments
                .iter()
                .max_by(|a, b| a.length().total_cmp(&b.length()))
        } else {
            segments.first()
        };
        let Some(axis) = axis.copied() else {
            return Ok(None);
        };
        let Some(direction) = axis.direction() else {
            return Ok(None);
        };

        let d = self.defaults;
        let length = element
            .properties
            .length
            .or_else(|| element.geometry.length())
            .filter(|l| l.is_finite() && *l > 0.0)
            .unwrap_or_else(|| axis.length());
        let thickness = self.length(element.properties.thickness, d.wall_thickness_m);
        let height = self.length(element.properties.height, d.wall_height_m);

        let placement = Placement::oriented(Point3D::new(location.x, location.y, elevation), direction);
        let solid = ExtrudedSolid::rectangle(length, thickness, placement, height)?;
        Ok(Some((solid, segments)))
    }

    /// Outline (polygon, else bounds rectangle) swept from `z`.
    fn plan_body(
        &self,
        element: &ArchitecturalElement,
        location: Point2D,
        z: f64,
        direction: ExtrusionDirection,
        depth: f64,
    ) -> dxf2bim_geometry::Result<Option<ExtrudedSolid>> {
        let outline = element
            .geometry
            .polygon()
            .or_else(|| element.geometry.bounds.map(|b| b.corners().to_vec()));
        let Some(outline) = outline else {
            return Ok(None);
        };
        let points = outline
            .iter()
            .map(|p| Point2D::new(p.x - location.x, p.y - location.y))
            .collect();
        let placement = Placement::at(Point3D::new(location.x, location.y, z));
        ExtrudedSolid::new(Profile::Polygon { points }, placement, direction, depth).map(Some)
    }

    fn column_body(
        &self,
        element: &ArchitecturalElement,
        location: Point2D,
        elevation: f64,
    ) -> dxf2bim_geometry::Result<Option<ExtrudedSolid>> {
        let d = self.defaults;
        let height = self.length(None, d.storey_height_m);
        let placement = Placement::at(Point3D::new(location.x, location.y, elevation));
        let profile = match element.geometry.radius().filter(|r| *r > 0.0) {
            Some(radius) => Profile::Polygon {
                points: (0..COLUMN_SIDES)
                    .map(|i| {
                        let angle = TAU * i as f64 / COLUMN_SIDES as f64;
                        Point2D::new(radius * angle.cos(), radius * angle.sin())
                    })
                    .collect(),
            },
            None => {
                let size = self.length(element.properties.width, d.column_size_m);
                Profile::Rectangle {
                    x_dim: size,
                    y_dim: size,
                }
            }
        };
        ExtrudedSolid::new(profile, placement, ExtrusionDirection::Up, height).map(Some)
    }

    /// Rectangle along the beam line, hung from the storey height.
    fn beam_body(
        &self,
        element: &ArchitecturalElement,
        elevation: f64,
    ) -> dxf2bim_geometry::Result<Option<ExtrudedSolid>> {
        let d = self.defaults;
        let Some(axis) = wall_segments(element).into_iter().next() else {
            return Ok(None);
        };
        let Some(direction) = axis.direction() else {
            return Ok(None);
        };
        let depth = self.length(None, d.beam_depth_m);
        let width = self.length(element.properties.width, d.beam_width_m);
        let length = element.properties.length.unwrap_or_else(|| axis.length());
        let top = elevation + self.length(None, d.storey_height_m);
        let mid = from_point(&axis.midpoint());
        let placement = Placement::oriented(Point3D::new(mid.x, mid.y, top - depth), direction);
        ExtrudedSolid::rectangle(length, width, placement, depth).map(Some)
    }

    /// Physical boundary between a space and every wall one of its edges
    /// comes close to.
    fn space_boundaries(
        &self,
        elements: &[ArchitecturalElement],
        products: &[Product],
        walls: &[WallFrame],
    ) -> Vec<Relationship> {
        let tolerance = self.defaults.space_boundary_tolerance;
        let mut boundaries = Vec::new();
        for product in products.iter().filter(|p| p.kind == ProductKind::Space) {
            let Some(element) = product.element_index.and_then(|i| elements.get(i)) else {
                continue;
            };
            let outline = element
                .geometry
                .polygon()
                .or_else(|| element.geometry.bounds.map(|b| b.corners().to_vec()));
            let Some(outline) = outline else {
                continue;
            };
            let edges = ring_edges(&to_ring(&outline));
            for wall in walls {
                let close = edges.iter().any(|edge| {
                    wall.segments
                        .iter()
                        .any(|segment| edge.distance_to_segment(segment) < tolerance)
                });
                if close {
                    boundaries.push(Relationship::SpaceBoundary {
                        space: product.id,
                        wall: products[wall.product].id,
                        boundary: BoundaryKind::Physical,
                        location: BoundaryLocation::Internal,
                    });
                }
            }
        }
        boundaries
    }
}

fn spatial(ids: &mut IdAllocator, kind: SpatialKind, name: &str, elevation: f64) -> SpatialNode {
    let (id, global_id) = ids.next(kind.ifc_class());
    SpatialNode {
        id,
        global_id,
        kind,
        name: name.to_string(),
        elevation,
    }
}

fn solid_length(solid: &ExtrudedSolid) -> f64 {
    match solid.profile {
        Profile::Rectangle { x_dim, .. } => x_dim,
        Profile::Polygon { .. } => {
            let b = solid.local_box();
            b.max[0] - b.min[0]
        }
    }
}

fn solid_width(solid: &ExtrudedSolid) -> f64 {
    match solid.profile {
        Profile::Rectangle { y_dim, .. } => y_dim,
        Profile::Polygon { .. } => {
            let b = solid.local_box();
            b.max[1] - b.min[1]
        }
    }
}

/// Wall with the segment closest to `point`: (wall, distance). Ties keep
/// the earlier wall.
fn nearest_wall(walls: &[WallFrame], point: &Point2D) -> Option<(usize, f64)> {
    let p = to_point(point);
    let mut best: Option<(usize, f64)> = None;
    for (index, wall) in walls.iter().enumerate() {
        for segment in &wall.segments {
            let distance = segment.distance_to_point(&p);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((index, distance));
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use dxf2bim_core::{DxfEntity, GeometryRecord};

    use crate::element::ElementProperties;

    fn element(element_type: ElementType, entity: DxfEntity) -> ArchitecturalElement {
        let geometry = GeometryRecord::from_entity(&entity).unwrap();
        ArchitecturalElement {
            element_type,
            layer: geometry.layer.clone(),
            handle: geometry.handle.clone(),
            geometry,
            properties: ElementProperties::default(),
            confidence: 0.9,
        }
    }

    fn wall(handle: &str, a: (f64, f64), b: (f64, f64)) -> ArchitecturalElement {
        element(ElementType::Wall, DxfEntity::line(handle, "A-WALL", a, b))
    }

    fn build(elements: &[ArchitecturalElement]) -> (BimGraph, Vec<Diagnostic>) {
        let defaults = BimDefaults::default();
        let scale = UnitScale::meters();
        GraphBuilder::new(&defaults, &scale).build(elements).unwrap()
    }

    #[test]
    fn test_normalize_length() {
        let mm = UnitScale::default();
        let m = UnitScale::meters();
        assert_relative_eq!(normalize_length(Some(200.0), 0.2, &mm), 200.0);
        // metres in a millimetre drawing
        assert_relative_eq!(normalize_length(Some(2.7), 2.7, &mm), 2700.0);
        assert_relative_eq!(normalize_length(None, 0.2, &mm), 200.0);
        assert_relative_eq!(normalize_length(Some(-1.0), 0.9, &m), 0.9);
        // below the 1 cm floor
        assert_relative_eq!(normalize_length(Some(0.001), 0.2, &m), 0.2);
        assert_relative_eq!(normalize_length(Some(0.001), 0.0, &m), 0.01);
    }

    #[test]
    fn test_spatial_hierarchy() {
        let (graph, diagnostics) = build(&[]);
        assert!(diagnostics.is_empty());
        assert!(graph.products.is_empty());
        assert_eq!(graph.storey.name, "Ground Floor");
        assert_eq!(graph.project.id.0, 1);
        assert_eq!(graph.storey.id.0, 4);
        assert_eq!(graph.relationship_count("IfcRelAggregates"), 3);
    }

    #[test]
    fn test_wall_body() {
        let (graph, _) = build(&[wall("1", (0.0, 0.0), (0.0, 4.0))]);
        let product = &graph.products[0];
        assert_eq!(product.kind, ProductKind::Wall);
        assert_eq!(product.name, "Wall 0");
        let repr = product.representation.as_ref().unwrap();
        assert_eq!(repr.representation_type, RepresentationType::SweptSolid);
        // 4 x 0.2 x 2.7
        assert_relative_eq!(repr.solid.volume(), 2.16, epsilon = 1e-9);
        assert_relative_eq!(product.placement.angle_degrees(), 90.0, epsilon = 1e-9);
        assert_relative_eq!(product.placement.location.y, 2.0);
    }

    #[test]
    fn test_door_is_hosted_on_nearest_wall() {
        let mut door = element(
            ElementType::Door,
            DxfEntity::arc("D", "A-DOOR", (2.0, 0.05), 0.9, 0.0, 90.0),
        );
        door.properties.width = Some(0.9);
        let elements = vec![
            wall("W1", (0.0, 0.0), (4.0, 0.0)),
            wall("W2", (0.0, 5.0), (4.0, 5.0)),
            door,
        ];
        let (graph, diagnostics) = build(&elements);
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);

        let host = graph.product_for_element(0).unwrap();
        let other = graph.product_for_element(1).unwrap();
        let door = graph.product_for_element(2).unwrap();

        let openings = graph.openings_in(host.id);
        assert_eq!(openings.len(), 1);
        assert!(graph.openings_in(other.id).is_empty());
        assert_eq!(graph.filler_of(openings[0]), Some(door.id));

        let clipped = host.representation.as_ref().unwrap();
        assert_eq!(clipped.representation_type, RepresentationType::Clipping);
        // 4 x 0.2 x 2.7 minus 0.9 x 0.2 x 2.1
        assert_relative_eq!(clipped.solid.volume(), 2.16 - 0.378, epsilon = 1e-9);
        assert_eq!(
            other.representation.as_ref().unwrap().representation_type,
            RepresentationType::SweptSolid
        );

        // door centred at half height on the wall line
        assert_relative_eq!(door.placement.location.z, 1.05, epsilon = 1e-9);
        assert_relative_eq!(door.placement.location.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_strip_wall_is_cut_through() {
        let mut strip = element(
            ElementType::Wall,
            DxfEntity::polyline("W", "A-WALL", &[(0.0, 0.0), (4.0, 0.0), (4.0, 0.2), (0.0, 0.2)], true),
        );
        strip.properties.length = Some(4.0);
        strip.properties.thickness = Some(0.2);
        let mut door = element(
            ElementType::Door,
            DxfEntity::arc("D", "A-DOOR", (2.0, 0.0), 0.9, 0.0, 90.0),
        );
        door.properties.width = Some(0.9);
        let (graph, diagnostics) = build(&[strip, door]);
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);

        let wall = graph.product_for_element(0).unwrap();
        let opening = graph.openings_in(wall.id)[0];
        let opening = graph.product(opening).unwrap();
        // on the centre line, not the face the door was drawn against
        assert_relative_eq!(opening.placement.location.y, 0.1, epsilon = 1e-9);

        let clipped = wall.solid().unwrap().volume();
        assert_relative_eq!(clipped, 2.16 - 0.9 * 0.2 * 2.1, epsilon = 1e-9);
    }

    #[test]
    fn test_window_sits_on_sill() {
        let elements = vec![
            wall("W1", (0.0, 0.0), (6.0, 0.0)),
            element(
                ElementType::Window,
                DxfEntity::line("G", "A-GLAZ", (2.0, 0.0), (3.2, 0.0)),
            ),
        ];
        let (graph, _) = build(&elements);
        let window = graph.product_for_element(1).unwrap();
        let opening = graph.opening_for(window.id).and_then(|id| graph.product(id)).unwrap();
        assert_relative_eq!(opening.placement.location.z, 0.9, epsilon = 1e-9);
        assert_relative_eq!(window.placement.location.z, 1.5, epsilon = 1e-9);
        let cut = opening.solid().unwrap().volume();
        assert_relative_eq!(cut, 1.2 * 0.2 * 1.2, epsilon = 1e-9);
    }

    #[test]
    fn test_host_cutoff() {
        let mut defaults = BimDefaults::default();
        defaults.max_host_distance_m = Some(1.0);
        let scale = UnitScale::meters();
        let elements = vec![
            wall("W1", (0.0, 0.0), (4.0, 0.0)),
            element(ElementType::Door, DxfEntity::arc("D", "A-DOOR", (2.0, 3.0), 0.9, 0.0, 90.0)),
        ];
        let (graph, diagnostics) = GraphBuilder::new(&defaults, &scale).build(&elements).unwrap();
        assert_eq!(graph.count(ProductKind::Opening), 0);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].element_index, Some(1));
    }

    #[test]
    fn test_slab_and_space() {
        let floor = element(
            ElementType::Floor,
            DxfEntity::polyline("F", "A-FLOR", &[(0.0, 0.0), (4.0, 0.0), (4.0, 3.0), (0.0, 3.0)], true),
        );
        let mut space = element(
            ElementType::Space,
            DxfEntity::polyline("S", "A-AREA", &[(0.0, 0.0), (4.0, 0.0), (4.0, 3.0), (0.0, 3.0)], true),
        );
        space.properties.name = Some("Kitchen".to_string());
        let elements = vec![floor, space, wall("W", (0.0, 0.0), (4.0, 0.0))];
        let (graph, _) = build(&elements);

        let slab = graph.product_for_element(0).unwrap();
        assert_eq!(slab.kind, ProductKind::Slab);
        assert_relative_eq!(slab.solid().unwrap().volume(), 12.0 * 0.15, epsilon = 1e-9);

        let space = graph.product_for_element(1).unwrap();
        assert_eq!(space.name, "Kitchen");
        let wall = graph.product_for_element(2).unwrap();
        assert_eq!(graph.boundaries_of(space.id), vec![wall.id]);

        // spaces are aggregated, not contained
        let aggregated = graph.relationships.iter().any(|r| {
            matches!(r, Relationship::Aggregates { relating, related } if *relating == graph.storey.id && related.contains(&space.id))
        });
        assert!(aggregated);
    }

    #[test]
    fn test_column_and_proxy() {
        let column = element(
            ElementType::Column,
            DxfEntity::new(
                "C",
                "S-COLS",
                dxf2bim_core::EntityData::Circle {
                    center: Point3D::new(1.0, 1.0, 0.0),
                    radius: 0.2,
                },
            ),
        );
        let stair = element(ElementType::Stair, DxfEntity::line("T", "A-STRS", (0.0, 0.0), (1.0, 0.0)));
        let (graph, _) = build(&[column, stair]);

        let column = graph.product_for_element(0).unwrap();
        let volume = column.solid().unwrap().volume();
        // 16-gon inscribed in r = 0.2, 3 m tall
        let expected = 0.5 * 16.0 * 0.04 * (TAU / 16.0).sin() * 3.0;
        assert_relative_eq!(volume, expected, epsilon = 1e-9);

        let proxy = graph.product_for_element(1).unwrap();
        assert_eq!(proxy.kind, ProductKind::Proxy);
        assert!(proxy.representation.is_none());
    }

    #[test]
    fn test_invalid_storey_height_fails() {
        let mut defaults = BimDefaults::default();
        defaults.storey_height_m = 0.0;
        let scale = UnitScale::meters();
        let err = GraphBuilder::new(&defaults, &scale).build(&[]).unwrap_err();
        assert_eq!(err.stage, Stage::BimGraph);
    }

    #[test]
    fn test_unresolved_material_warns_once() {
        let defaults = BimDefaults::default();
        let scale = UnitScale::meters();
        let mut assignments = BTreeMap::new();
        assignments.insert(ElementType::Wall, "concrete".to_string());
        let elements = vec![wall("1", (0.0, 0.0), (4.0, 0.0)), wall("2", (0.0, 1.0), (4.0, 1.0))];
        let (graph, diagnostics) = GraphBuilder::new(&defaults, &scale)
            .with_materials(&assignments, None)
            .build(&elements)
            .unwrap();
        assert!(graph.products.iter().all(|p| p.material.is_none()));
        assert_eq!(diagnostics.len(), 1);
    }
}
