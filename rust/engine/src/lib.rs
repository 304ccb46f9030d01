// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # DXF2BIM Engine
//!
//! Semantic extraction from normalized DXF drawings and synthesis of a BIM
//! graph with hosted openings and clipped wall solids.
//!
//! ## Overview
//!
//! - **Element classification**: walls, doors, windows, spaces, structure and
//!   MEP from layer semantics, block names and geometry
//! - **Topology**: wall/space adjacency and rooms recovered from wall loops
//! - **BIM graph**: spatial hierarchy, products, openings and space boundaries,
//!   with text stubs when the native graph cannot be built
//! - **Asset catalog**: materials, fixtures and room styles from disk
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dxf2bim_engine::{Engine, EngineConfig};
//!
//! let engine = Engine::new(EngineConfig::from_env());
//! let result = engine.process_json(&std::fs::read_to_string("plan.json")?)?;
//! println!("{} elements, tier {:?}", result.elements.len(), result.graph.tier());
//! ```

pub mod bim;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod element;
pub mod error;
pub mod pipeline;
pub mod statistics;
pub mod topology;

pub use bim::{BimGraph, GraphOutput, GraphTier};
pub use catalog::{Catalog, MaterialInfo, MaterialResolver};
pub use classifier::ElementClassifier;
pub use config::{BimDefaults, ClassifierThresholds, EngineConfig, TopologyConfig};
pub use element::{ArchitecturalElement, ElementProperties, ElementType};
pub use error::{Diagnostic, EngineError, Result, Severity, Stage, StageError};
pub use pipeline::{extract_and_build, Engine, ExtractionResult};
pub use statistics::Statistics;
pub use topology::{Relationships, SpaceRelationship, TopologyEngine};
