// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory BIM graph: spatial hierarchy, products and relationships.
//!
//! The graph mirrors the IFC entities a writer would emit (`IfcWall`,
//! `IfcRelVoidsElement`, ...) without committing to a file format. Entity
//! ids are sequential and GlobalIds are derived from the project name and
//! the id, so the same input always yields the same graph.

use std::fmt;

use dxf2bim_geometry::{Placement, Solid};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::MaterialInfo;
use crate::element::ElementType;
use crate::error::GraphError;

const IFC_ALPHABET: &[u8; 64] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_$";

/// Sequential id of a graph entity, unique within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 22-character IFC GlobalId (a UUID in IFC's base-64 alphabet)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalId(String);

impl GlobalId {
    pub fn from_uuid(uuid: &Uuid) -> Self {
        let n = uuid.as_u128();
        let mut out = String::with_capacity(22);
        // 2 leading bits, then 21 groups of 6
        out.push(IFC_ALPHABET[((n >> 126) & 0x3) as usize] as char);
        for i in 0..21 {
            let shift = 120 - 6 * i;
            out.push(IFC_ALPHABET[((n >> shift) & 0x3f) as usize] as char);
        }
        Self(out)
    }

    /// Decode back to the UUID, `None` for a malformed id.
    pub fn to_uuid(&self) -> Option<Uuid> {
        if self.0.len() != 22 {
            return None;
        }
        let mut n: u128 = 0;
        for (i, byte) in self.0.bytes().enumerate() {
            let digit = IFC_ALPHABET.iter().position(|&c| c == byte)? as u128;
            if i == 0 && digit > 3 {
                return None;
            }
            n = (n << 6) | digit;
        }
        Some(Uuid::from_u128(n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hands out sequential entity ids and their deterministic GlobalIds
#[derive(Debug, Clone)]
pub struct IdAllocator {
    namespace: Uuid,
    next: u32,
}

impl IdAllocator {
    pub fn new(project_name: &str) -> Self {
        Self {
            namespace: Uuid::new_v5(&Uuid::NAMESPACE_OID, project_name.as_bytes()),
            next: 1,
        }
    }

    pub fn next(&mut self, kind: &str) -> (EntityId, GlobalId) {
        let id = EntityId(self.next);
        self.next += 1;
        let key = format!("{}:{}", kind, id.0);
        (id, GlobalId::from_uuid(&Uuid::new_v5(&self.namespace, key.as_bytes())))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpatialKind {
    Project,
    Site,
    Building,
    Storey,
}

impl SpatialKind {
    pub fn ifc_class(&self) -> &'static str {
        match self {
            SpatialKind::Project => "IfcProject",
            SpatialKind::Site => "IfcSite",
            SpatialKind::Building => "IfcBuilding",
            SpatialKind::Storey => "IfcBuildingStorey",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialNode {
    pub id: EntityId,
    pub global_id: GlobalId,
    pub kind: SpatialKind,
    pub name: String,
    /// Drawing units; only meaningful for storeys.
    pub elevation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductKind {
    Wall,
    Door,
    Window,
    Slab,
    Covering,
    Space,
    Column,
    Beam,
    Opening,
    Proxy,
}

impl ProductKind {
    pub fn ifc_class(&self) -> &'static str {
        match self {
            ProductKind::Wall => "IfcWall",
            ProductKind::Door => "IfcDoor",
            ProductKind::Window => "IfcWindow",
            ProductKind::Slab => "IfcSlab",
            ProductKind::Covering => "IfcCovering",
            ProductKind::Space => "IfcSpace",
            ProductKind::Column => "IfcColumn",
            ProductKind::Beam => "IfcBeam",
            ProductKind::Opening => "IfcOpeningElement",
            ProductKind::Proxy => "IfcBuildingElementProxy",
        }
    }

    /// Product kind an element type becomes.
    pub fn for_element(element_type: ElementType) -> Self {
        match element_type {
            ElementType::Wall => ProductKind::Wall,
            ElementType::Door => ProductKind::Door,
            ElementType::Window => ProductKind::Window,
            ElementType::Floor => ProductKind::Slab,
            ElementType::Ceiling => ProductKind::Covering,
            ElementType::Space => ProductKind::Space,
            ElementType::Column => ProductKind::Column,
            ElementType::Beam => ProductKind::Beam,
            _ => ProductKind::Proxy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepresentationType {
    SweptSolid,
    Clipping,
}

/// Body geometry of a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Representation {
    pub representation_type: RepresentationType,
    pub solid: Solid,
}

impl Representation {
    pub fn swept(solid: impl Into<Solid>) -> Self {
        Self {
            representation_type: RepresentationType::SweptSolid,
            solid: solid.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: EntityId,
    pub global_id: GlobalId,
    pub kind: ProductKind,
    pub name: String,
    /// Index of the source element; openings point at the element they
    /// were cut for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_type: Option<ElementType>,
    pub placement: Placement,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub representation: Option<Representation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<MaterialInfo>,
}

impl Product {
    pub fn solid(&self) -> Option<&Solid> {
        self.representation.as_ref().map(|r| &r.solid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryKind {
    Physical,
    Virtual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryLocation {
    Internal,
    External,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Relationship {
    /// Spatial decomposition: site in project, spaces in storey, ...
    Aggregates {
        relating: EntityId,
        related: Vec<EntityId>,
    },
    ContainedInStructure {
        structure: EntityId,
        elements: Vec<EntityId>,
    },
    Voids {
        wall: EntityId,
        opening: EntityId,
    },
    Fills {
        opening: EntityId,
        element: EntityId,
    },
    SpaceBoundary {
        space: EntityId,
        wall: EntityId,
        boundary: BoundaryKind,
        location: BoundaryLocation,
    },
}

impl Relationship {
    pub fn ifc_class(&self) -> &'static str {
        match self {
            Relationship::Aggregates { .. } => "IfcRelAggregates",
            Relationship::ContainedInStructure { .. } => "IfcRelContainedInSpatialStructure",
            Relationship::Voids { .. } => "IfcRelVoidsElement",
            Relationship::Fills { .. } => "IfcRelFillsElement",
            Relationship::SpaceBoundary { .. } => "IfcRelSpaceBoundary",
        }
    }
}

/// A complete single-storey building model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BimGraph {
    pub project: SpatialNode,
    pub site: SpatialNode,
    pub building: SpatialNode,
    pub storey: SpatialNode,
    /// Sorted by id.
    pub products: Vec<Product>,
    pub relationships: Vec<Relationship>,
}

impl BimGraph {
    pub fn spatial_nodes(&self) -> [&SpatialNode; 4] {
        [&self.project, &self.site, &self.building, &self.storey]
    }

    pub fn product(&self, id: EntityId) -> Option<&Product> {
        self.products
            .binary_search_by_key(&id, |p| p.id)
            .ok()
            .map(|i| &self.products[i])
    }

    /// The product built from element `index` (openings excluded).
    pub fn product_for_element(&self, index: usize) -> Option<&Product> {
        self.products
            .iter()
            .find(|p| p.kind != ProductKind::Opening && p.element_index == Some(index))
    }

    pub fn products_of(&self, kind: ProductKind) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(move |p| p.kind == kind)
    }

    pub fn count(&self, kind: ProductKind) -> usize {
        self.products_of(kind).count()
    }

    /// Host wall of an opening.
    pub fn host_of(&self, opening: EntityId) -> Option<EntityId> {
        self.relationships.iter().find_map(|r| match r {
            Relationship::Voids { wall, opening: o } if *o == opening => Some(*wall),
            _ => None,
        })
    }

    pub fn openings_in(&self, wall: EntityId) -> Vec<EntityId> {
        self.relationships
            .iter()
            .filter_map(|r| match r {
                Relationship::Voids { wall: w, opening } if *w == wall => Some(*opening),
                _ => None,
            })
            .collect()
    }

    pub fn filler_of(&self, opening: EntityId) -> Option<EntityId> {
        self.relationships.iter().find_map(|r| match r {
            Relationship::Fills { opening: o, element } if *o == opening => Some(*element),
            _ => None,
        })
    }

    /// Opening a door or window sits in.
    pub fn opening_for(&self, element: EntityId) -> Option<EntityId> {
        self.relationships.iter().find_map(|r| match r {
            Relationship::Fills { opening, element: e } if *e == element => Some(*opening),
            _ => None,
        })
    }

    pub fn boundaries_of(&self, space: EntityId) -> Vec<EntityId> {
        self.relationships
            .iter()
            .filter_map(|r| match r {
                Relationship::SpaceBoundary { space: s, wall, .. } if *s == space => Some(*wall),
                _ => None,
            })
            .collect()
    }

    pub fn relationship_count(&self, class: &str) -> usize {
        self.relationships
            .iter()
            .filter(|r| r.ifc_class() == class)
            .count()
    }

    /// Check structural invariants: every reference resolves to an entity of
    /// the right kind, each opening is voided exactly once and filled at most
    /// once, voided walls carry a clipping body and the others their plain
    /// extrusion.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut kinds: FxHashMap<EntityId, Option<ProductKind>> = FxHashMap::default();
        for node in self.spatial_nodes() {
            if kinds.insert(node.id, None).is_some() {
                return Err(GraphError::DuplicateId(node.id.0));
            }
        }
        for product in &self.products {
            if kinds.insert(product.id, Some(product.kind)).is_some() {
                return Err(GraphError::DuplicateId(product.id.0));
            }
        }

        let kind_of = |id: EntityId| -> Result<Option<ProductKind>, GraphError> {
            kinds
                .get(&id)
                .copied()
                .ok_or(GraphError::DanglingReference(id.0))
        };
        let expect = |id: EntityId,
                      allowed: &[ProductKind],
                      expected: &'static str|
         -> Result<(), GraphError> {
            match kind_of(id)? {
                Some(kind) if allowed.contains(&kind) => Ok(()),
                _ => Err(GraphError::WrongKind { id: id.0, expected }),
            }
        };
        let expect_spatial = |id: EntityId| -> Result<(), GraphError> {
            match kind_of(id)? {
                None => Ok(()),
                Some(_) => Err(GraphError::WrongKind {
                    id: id.0,
                    expected: "a spatial element",
                }),
            }
        };

        let mut voids: FxHashMap<EntityId, usize> = FxHashMap::default();
        let mut fills: FxHashMap<EntityId, usize> = FxHashMap::default();
        let mut voided_walls: FxHashSet<EntityId> = FxHashSet::default();

        for rel in &self.relationships {
            match rel {
                Relationship::Aggregates { relating, related } => {
                    expect_spatial(*relating)?;
                    for id in related {
                        kind_of(*id)?;
                    }
                }
                Relationship::ContainedInStructure {
                    structure,
                    elements,
                } => {
                    expect_spatial(*structure)?;
                    for id in elements {
                        kind_of(*id)?;
                    }
                }
                Relationship::Voids { wall, opening } => {
                    expect(*wall, &[ProductKind::Wall], "a wall")?;
                    expect(*opening, &[ProductKind::Opening], "an opening")?;
                    *voids.entry(*opening).or_default() += 1;
                    voided_walls.insert(*wall);
                }
                Relationship::Fills { opening, element } => {
                    expect(*opening, &[ProductKind::Opening], "an opening")?;
                    expect(
                        *element,
                        &[ProductKind::Door, ProductKind::Window],
                        "a door or window",
                    )?;
                    *fills.entry(*opening).or_default() += 1;
                }
                Relationship::SpaceBoundary { space, wall, .. } => {
                    expect(*space, &[ProductKind::Space], "a space")?;
                    expect(*wall, &[ProductKind::Wall], "a wall")?;
                }
            }
        }

        for opening in self.products_of(ProductKind::Opening) {
            let count = voids.get(&opening.id).copied().unwrap_or(0);
            if count != 1 {
                return Err(GraphError::VoidsCount {
                    opening: opening.id.0,
                    count,
                });
            }
            let count = fills.get(&opening.id).copied().unwrap_or(0);
            if count > 1 {
                return Err(GraphError::FillsCount {
                    opening: opening.id.0,
                    count,
                });
            }
        }

        for wall in self.products_of(ProductKind::Wall) {
            let representation = wall.representation.as_ref();
            if voided_walls.contains(&wall.id) {
                let clipped = representation.map_or(false, |r| {
                    r.representation_type == RepresentationType::Clipping
                        && matches!(r.solid, Solid::Difference { .. })
                });
                if !clipped {
                    return Err(GraphError::WallRepresentation {
                        wall: wall.id.0,
                        reason: "voided wall must carry a clipping body",
                    });
                }
            } else if let Some(r) = representation {
                if r.representation_type != RepresentationType::SweptSolid || r.solid.is_boolean() {
                    return Err(GraphError::WallRepresentation {
                        wall: wall.id.0,
                        reason: "wall without openings must keep its swept solid",
                    });
                }
            }
        }

        Ok(())
    }
}
