// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Root record of one OpenFlight file

use std::path::{Path, PathBuf};

use crate::graph::NodeKey;
use crate::header::Header;
use crate::material::MaterialBank;
use crate::palette::{MaterialEntry, Palettes, TextureEntry};
use crate::records::ExternalReference;

/// One parsed file: header, palettes and the material bank its faces use
#[derive(Debug, Clone, Default)]
pub struct Database {
    pub path: PathBuf,
    pub header: Header,
    pub palettes: Palettes,
    pub materials: MaterialBank,
    /// The external reference node that loaded this file
    pub referenced_by: Option<NodeKey>,
    /// Database owning `referenced_by`
    pub parent_database: Option<NodeKey>,
    /// Palette override flags of the referencing record
    pub override_flags: i32,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>, materials: MaterialBank) -> Self {
        Self {
            path: path.into(),
            materials,
            ..Default::default()
        }
    }

    /// Directory relative references inside this file resolve against
    pub fn directory(&self) -> Option<&Path> {
        self.path.parent().filter(|dir| !dir.as_os_str().is_empty())
    }

    pub fn is_root(&self) -> bool {
        self.referenced_by.is_none()
    }

    pub fn overrides_materials(&self) -> bool {
        self.override_flags & ExternalReference::FLAG_MATERIAL_PALETTE_OVERRIDE != 0
    }

    pub fn overrides_textures(&self) -> bool {
        self.override_flags & ExternalReference::FLAG_TEXTURE_PALETTE_OVERRIDE != 0
    }

    pub fn overrides_colors(&self) -> bool {
        self.override_flags & ExternalReference::FLAG_COLOR_PALETTE_OVERRIDE != 0
    }

    pub fn material(&self, index: i32) -> Option<&MaterialEntry> {
        self.palettes.material(index)
    }

    pub fn texture(&self, index: i32) -> Option<&TextureEntry> {
        self.palettes.texture(index)
    }
}
