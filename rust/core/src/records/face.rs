// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Face (opcode 5) and vertex list (opcode 72) records

use smallvec::SmallVec;

use crate::error::Result;
use crate::log::{DiagnosticKind, ImportLog};
use crate::palette::{ColorPalette, PackedColor, VertexPalette};
use crate::stream::FieldReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DrawType {
    #[default]
    SolidCullBackface,
    SolidNoCull,
    WireframeClosed,
    WireframeOpen,
    SurroundAlternateColor,
    OmnidirectionalLight,
    UnidirectionalLight,
    BidirectionalLight,
    Other(i8),
}

impl DrawType {
    pub fn from_raw(raw: i8) -> Self {
        match raw {
            0 => Self::SolidCullBackface,
            1 => Self::SolidNoCull,
            2 => Self::WireframeClosed,
            3 => Self::WireframeOpen,
            4 => Self::SurroundAlternateColor,
            8 => Self::OmnidirectionalLight,
            9 => Self::UnidirectionalLight,
            10 => Self::BidirectionalLight,
            other => Self::Other(other),
        }
    }

    pub fn is_double_sided(self) -> bool {
        matches!(self, Self::SolidNoCull | Self::BidirectionalLight)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LightMode {
    /// Face color, not illuminated
    #[default]
    Flat,
    /// Vertex colors, not illuminated
    Gouraud,
    /// Face color and vertex normals
    Lit,
    /// Vertex colors and vertex normals
    LitGouraud,
    Other(u8),
}

impl LightMode {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Flat,
            1 => Self::Gouraud,
            2 => Self::Lit,
            3 => Self::LitGouraud,
            other => Self::Other(other),
        }
    }

    pub fn uses_vertex_colors(self) -> bool {
        matches!(self, Self::Gouraud | Self::LitGouraud)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TemplateBillboard {
    #[default]
    Off,
    FixedNoAlphaBlending,
    AxialRotate,
    PointRotate,
    Other(i8),
}

impl TemplateBillboard {
    pub fn from_raw(raw: i8) -> Self {
        match raw {
            0 => Self::Off,
            1 => Self::FixedNoAlphaBlending,
            2 => Self::AxialRotate,
            4 => Self::PointRotate,
            other => Self::Other(other),
        }
    }
}

/// Polygon attributes; the vertices live in the child [`VertexList`]
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Face {
    pub ir_color: i32,
    pub priority: i16,
    pub draw_type: DrawType,
    pub tex_white: bool,
    pub color_name_index: u16,
    pub alternate_color_name_index: u16,
    pub billboard: TemplateBillboard,
    /// -1 when none
    pub detail_texture: i16,
    /// -1 when none
    pub texture: i16,
    /// -1 when none
    pub material: i16,
    pub surface_material_code: i16,
    pub feature_id: i16,
    pub ir_material: i32,
    pub transparency: u16,
    pub lod_generation_control: u8,
    pub line_style: u8,
    pub flags: i32,
    pub light_mode: LightMode,
    pub packed_color: PackedColor,
    pub alternate_packed_color: PackedColor,
    pub texture_mapping: i16,
    pub color_index: u32,
    pub alternate_color_index: u32,
    pub shader: i16,
}

impl Face {
    pub const LAYOUT_LEN: usize = 76;

    pub const FLAG_TERRAIN: i32 = i32::MIN;
    pub const FLAG_NO_COLOR: i32 = 0x4000_0000;
    pub const FLAG_NO_ALTERNATE_COLOR: i32 = 0x2000_0000;
    pub const FLAG_PACKED_COLOR: i32 = 0x1000_0000;
    pub const FLAG_CULTURE_CUTOUT: i32 = 0x0800_0000;
    pub const FLAG_HIDDEN: i32 = 0x0400_0000;
    pub const FLAG_ROOFLINE: i32 = 0x0200_0000;

    pub fn read(reader: &mut FieldReader<'_>) -> Result<(String, Self)> {
        let id = reader.fixed_string(8)?;
        let mut face = Face {
            ir_color: reader.i32()?,
            priority: reader.i16()?,
            draw_type: DrawType::from_raw(reader.i8()?),
            tex_white: reader.bool()?,
            color_name_index: reader.u16()?,
            alternate_color_name_index: reader.u16()?,
            ..Default::default()
        };
        reader.skip(1)?;
        face.billboard = TemplateBillboard::from_raw(reader.i8()?);
        face.detail_texture = reader.i16()?;
        face.texture = reader.i16()?;
        face.material = reader.i16()?;
        face.surface_material_code = reader.i16()?;
        face.feature_id = reader.i16()?;
        face.ir_material = reader.i32()?;
        face.transparency = reader.u16()?;
        face.lod_generation_control = reader.u8()?;
        face.line_style = reader.u8()?;
        face.flags = reader.i32()?;
        face.light_mode = LightMode::from_raw(reader.u8()?);
        reader.skip(7)?;
        face.packed_color = reader.packed_color()?;
        face.alternate_packed_color = reader.packed_color()?;
        face.texture_mapping = reader.i16()?;
        reader.skip(2)?;
        face.color_index = reader.u32()?;
        face.alternate_color_index = reader.u32()?;
        reader.skip(2)?;
        face.shader = reader.i16()?;
        Ok((id, face))
    }

    #[inline]
    pub fn is_hidden(&self) -> bool {
        self.flags & Self::FLAG_HIDDEN != 0
    }

    /// Opacity in `[0, 1]`; transparency 65535 is fully clear
    pub fn alpha(&self) -> f32 {
        1.0 - self.transparency as f32 / u16::MAX as f32
    }

    /// Primary color from the packed field or the color palette
    pub fn color(&self, colors: Option<&ColorPalette>) -> PackedColor {
        if self.flags & Self::FLAG_NO_COLOR != 0 {
            return PackedColor::WHITE;
        }
        if self.flags & Self::FLAG_PACKED_COLOR != 0 {
            return PackedColor {
                a: 255,
                ..self.packed_color
            };
        }
        colors
            .and_then(|colors| colors.resolve(self.color_index))
            .unwrap_or(PackedColor::WHITE)
    }
}

/// Byte offsets into the owning database's vertex palette
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VertexList {
    pub offsets: SmallVec<[i32; 4]>,
}

impl VertexList {
    /// Read `body.len() / 4` offsets, dropping any the palette does not hold
    pub fn read(
        reader: &mut FieldReader<'_>,
        palette: &VertexPalette,
        log: &ImportLog,
    ) -> Result<Self> {
        let count = reader.remaining() / 4;
        let mut offsets = SmallVec::with_capacity(count);
        for _ in 0..count {
            let offset = reader.i32()?;
            if palette.contains(offset) {
                offsets.push(offset);
            } else {
                log.warn(
                    DiagnosticKind::UnresolvedReference,
                    format!(
                        "Unable to find vertex for byte offset {} in the palette, this vertex will be ignored.",
                        offset
                    ),
                );
            }
        }
        Ok(Self { offsets })
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}
