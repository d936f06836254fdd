// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! External reference record (opcode 63)

use std::path::PathBuf;

use slotmap::Key;

use crate::error::Result;
use crate::graph::NodeKey;
use crate::stream::FieldReader;

/// What a reference record did with its target file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReferenceRole {
    /// First reference to the file; parsed the sub-database
    Owner,
    /// Later reference; instantiates the owner's result
    Alias { owner: NodeKey },
    /// Missing, unreadable, corrupt or cyclic target
    #[default]
    Broken,
    /// Reference following was disabled
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExternalReference {
    /// Path as written in the file
    pub path: String,
    /// Canonical path of the target when it was found
    pub resolved: Option<PathBuf>,
    pub flags: i32,
    pub view_as_bounding_box: bool,
    pub role: ReferenceRole,
    /// Root of the sub-database for owners
    pub database: NodeKey,
}

impl Default for ExternalReference {
    fn default() -> Self {
        Self {
            path: String::new(),
            resolved: None,
            flags: 0,
            view_as_bounding_box: false,
            role: ReferenceRole::Broken,
            database: NodeKey::null(),
        }
    }
}

impl ExternalReference {
    pub const LAYOUT_LEN: usize = 200 + 4 + 4 + 2;

    pub const FLAG_COLOR_PALETTE_OVERRIDE: i32 = i32::MIN;
    pub const FLAG_MATERIAL_PALETTE_OVERRIDE: i32 = 0x4000_0000;
    pub const FLAG_TEXTURE_PALETTE_OVERRIDE: i32 = 0x2000_0000;
    pub const FLAG_LINE_STYLE_PALETTE_OVERRIDE: i32 = 0x1000_0000;
    pub const FLAG_SOUND_PALETTE_OVERRIDE: i32 = 0x0800_0000;
    pub const FLAG_LIGHT_SOURCE_PALETTE_OVERRIDE: i32 = 0x0400_0000;
    pub const FLAG_ROOFLINE: i32 = 0x0200_0000;

    pub fn read(reader: &mut FieldReader<'_>) -> Result<Self> {
        let path = reader.fixed_string(200)?;
        reader.skip(4)?;
        Ok(Self {
            path,
            flags: reader.i32()?,
            view_as_bounding_box: reader.i16()? == 1,
            ..Default::default()
        })
    }

    /// Record id shown for this reference
    pub fn display_id(&self) -> String {
        if self.role == ReferenceRole::Broken {
            format!("Broken Ref: {}", self.path)
        } else {
            format!("Ref: {}", self.path)
        }
    }

    pub fn overrides_materials(&self) -> bool {
        self.flags & Self::FLAG_MATERIAL_PALETTE_OVERRIDE != 0
    }

    pub fn overrides_textures(&self) -> bool {
        self.flags & Self::FLAG_TEXTURE_PALETTE_OVERRIDE != 0
    }

    pub fn overrides_colors(&self) -> bool {
        self.flags & Self::FLAG_COLOR_PALETTE_OVERRIDE != 0
    }

    /// The sub-database shares the parent's material bank
    pub fn shares_material_bank(&self) -> bool {
        self.overrides_materials() || self.overrides_textures()
    }

    pub fn is_owner(&self) -> bool {
        self.role == ReferenceRole::Owner
    }

    pub fn owner(&self) -> Option<NodeKey> {
        match self.role {
            ReferenceRole::Alias { owner } => Some(owner),
            _ => None,
        }
    }
}
