// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for boundary extraction.

use thiserror::Error;

/// Result type alias for boundary extraction.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while extracting a boundary.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Topology error: {0}")]
    Topology(#[from] marginline_topology::Error),

    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Invalid FDI tooth number: {0}")]
    InvalidTooth(u8),
}

impl Error {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
