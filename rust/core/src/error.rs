// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for drawing-level operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading or normalizing drawing records
#[derive(Error, Debug)]
pub enum Error {
    /// The interchange document could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Reading the interchange document failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A single entity carries geometry that cannot be normalized.
    #[error("Invalid entity {handle}: {reason}")]
    InvalidEntity { handle: String, reason: String },
}

impl Error {
    pub fn invalid_entity(handle: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEntity {
            handle: handle.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
