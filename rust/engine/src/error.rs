// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that abort a whole run
#[derive(Error, Debug)]
pub enum EngineError {
    /// Unreadable or malformed input document.
    #[error("Parse error: {0}")]
    Parse(#[from] dxf2bim_core::Error),

    #[error("Catalog error at {path}: {message}")]
    Catalog { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    pub fn catalog(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        EngineError::Catalog {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Broken invariant found by `BimGraph::validate`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("relationship references unknown entity #{0}")]
    DanglingReference(u32),

    #[error("entity #{id} should be {expected}")]
    WrongKind { id: u32, expected: &'static str },

    #[error("opening #{opening} has {count} voids relationships, expected exactly one")]
    VoidsCount { opening: u32, count: usize },

    #[error("opening #{opening} is filled {count} times")]
    FillsCount { opening: u32, count: usize },

    #[error("wall #{wall} representation does not match its openings: {reason}")]
    WallRepresentation { wall: u32, reason: &'static str },

    #[error("duplicate entity id #{0}")]
    DuplicateId(u32),
}

/// Pipeline stage an error or diagnostic belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Normalize,
    LayerClassification,
    ElementClassification,
    Topology,
    BimGraph,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Normalize => "normalize",
            Stage::LayerClassification => "layer_classification",
            Stage::ElementClassification => "element_classification",
            Stage::Topology => "topology",
            Stage::BimGraph => "bim_graph",
        };
        f.write_str(name)
    }
}

/// Failure contained within one stage
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{stage} failed: {message}")]
pub struct StageError {
    pub stage: Stage,
    pub message: String,
}

impl StageError {
    pub fn new(stage: Stage, message: impl ToString) -> Self {
        Self {
            stage,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Non-fatal problem recorded during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub severity: Severity,
    /// Source entity handle, when the problem is tied to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_index: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(stage: Stage, message: impl ToString) -> Self {
        Self {
            stage,
            severity: Severity::Warning,
            handle: None,
            element_index: None,
            message: message.to_string(),
        }
    }

    pub fn error(stage: Stage, message: impl ToString) -> Self {
        Self {
            severity: Severity::Error,
            ..Self::warning(stage, message)
        }
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    pub fn with_element(mut self, index: usize) -> Self {
        self.element_index = Some(index);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl From<StageError> for Diagnostic {
    fn from(err: StageError) -> Self {
        Diagnostic::error(err.stage, err.message)
    }
}
