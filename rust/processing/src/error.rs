// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Import pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    #[error("Parse error: {0}")]
    Core(#[from] flt_lite_core::Error),

    #[error("Geometry error: {0}")]
    Geometry(#[from] flt_lite_geometry::Error),

    #[error("Import task failed: {0}")]
    Join(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the import stopped because it was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Core(flt_lite_core::Error::Cancelled)
                | Self::Geometry(flt_lite_geometry::Error::Cancelled)
                | Self::Geometry(flt_lite_geometry::Error::Core(
                    flt_lite_core::Error::Cancelled
                ))
        )
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Join(err.to_string())
    }
}
