// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the parsing layer.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while opening, parsing or navigating an IFC model.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IFC file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IFC file is not valid UTF-8 text")]
    Encoding,

    #[error("Not a STEP physical file: {0}")]
    NotStep(String),

    #[error("Parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Entity #{0} not found")]
    EntityNotFound(u32),

    #[error("Entity #{id} is {actual}, expected {expected}")]
    UnexpectedType {
        id: u32,
        expected: &'static str,
        actual: String,
    },
}

impl Error {
    /// Build a parse error at a byte position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            position,
            message: message.into(),
        }
    }

    /// True when the model file itself is missing, as opposed to unreadable.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::FileNotFound(_))
    }
}
