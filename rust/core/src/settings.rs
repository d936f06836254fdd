// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

/// Options for one import
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ImportSettings {
    /// Searched after the referencing file's own directory
    pub additional_search_directories: Vec<PathBuf>,
    /// Load external reference targets; when off, references are kept as
    /// empty nodes
    pub follow_external_references: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            additional_search_directories: Vec::new(),
            follow_external_references: true,
        }
    }
}

impl ImportSettings {
    pub fn with_search_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.additional_search_directories.push(dir.into());
        self
    }

    pub fn without_references(mut self) -> Self {
        self.follow_external_references = false;
        self
    }
}
