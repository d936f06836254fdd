// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Palette stores
//!
//! A database carries four flat tables that geometry records point into:
//! vertices (by byte offset inside the vertex palette), colors (by index),
//! materials and textures (by their explicit index field). Entries are
//! immutable once read.

use std::path::Path;

use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::opcode::Opcode;
use crate::stream::FieldReader;

/// 8-bit RGBA color, stored on disk as A, B, G, R
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PackedColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl PackedColor {
    pub const WHITE: PackedColor = PackedColor {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };

    /// Scale RGB by `intensity` in `[0, 1]`, alpha untouched
    pub fn scaled(self, intensity: f32) -> Self {
        let k = intensity.clamp(0.0, 1.0);
        let scale = |c: u8| (c as f32 * k).round() as u8;
        Self {
            r: scale(self.r),
            g: scale(self.g),
            b: scale(self.b),
            a: self.a,
        }
    }
}

/// Floating-point RGB as stored in material palettes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    fn read(reader: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            r: reader.f32()?,
            g: reader.f32()?,
            b: reader.f32()?,
        })
    }
}

// ============================================================================
// Vertices
// ============================================================================

/// Which of the four vertex record layouts a vertex was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VertexFormat {
    Color,
    ColorNormal,
    ColorNormalUv,
    ColorUv,
}

impl VertexFormat {
    pub fn from_opcode(opcode: Opcode) -> Option<Self> {
        match opcode {
            Opcode::VertexWithColor => Some(Self::Color),
            Opcode::VertexWithColorNormal => Some(Self::ColorNormal),
            Opcode::VertexWithColorNormalUv => Some(Self::ColorNormalUv),
            Opcode::VertexWithColorUv => Some(Self::ColorUv),
            _ => None,
        }
    }

    pub fn has_normal(self) -> bool {
        matches!(self, Self::ColorNormal | Self::ColorNormalUv)
    }

    pub fn has_uv(self) -> bool {
        matches!(self, Self::ColorUv | Self::ColorNormalUv)
    }
}

/// Vertex palette entry. Coordinates and normals are kept in file axes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vertex {
    pub format: VertexFormat,
    pub color_name_index: u16,
    pub flags: i16,
    pub coordinate: [f64; 3],
    pub packed_color: PackedColor,
    pub color_index: u32,
    pub normal: Option<[f32; 3]>,
    pub uv: Option<[f32; 2]>,
}

impl Vertex {
    pub const FLAG_START_HARD_EDGE: i16 = i16::MIN;
    pub const FLAG_NORMAL_FROZEN: i16 = 0x4000;
    pub const FLAG_NO_COLOR: i16 = 0x2000;
    pub const FLAG_PACKED_COLOR: i16 = 0x1000;

    /// Decode a vertex record body
    pub fn read(format: VertexFormat, reader: &mut FieldReader<'_>) -> Result<Self> {
        let color_name_index = reader.u16()?;
        let flags = reader.i16()?;
        let coordinate = reader.f64x3()?;
        let packed_color = reader.packed_color()?;
        let color_index = reader.u32()?;
        let normal = if format.has_normal() {
            Some(reader.f32x3()?)
        } else {
            None
        };
        let uv = if format.has_uv() {
            Some([reader.f32()?, reader.f32()?])
        } else {
            None
        };

        Ok(Self {
            format,
            color_name_index,
            flags,
            coordinate,
            packed_color,
            color_index,
            normal,
            uv,
        })
    }

    /// Fixed body size for a layout
    pub fn layout_len(format: VertexFormat) -> usize {
        let base = 2 + 2 + 24 + 4 + 4;
        let normal = if format.has_normal() { 12 } else { 0 };
        let uv = if format.has_uv() { 8 } else { 0 };
        base + normal + uv
    }

    pub fn has_packed_color(&self) -> bool {
        self.flags & Self::FLAG_PACKED_COLOR != 0
    }

    pub fn has_no_color(&self) -> bool {
        self.flags & Self::FLAG_NO_COLOR != 0
    }
}

/// Vertices keyed by their byte offset inside the vertex palette record
#[derive(Debug, Clone, Default)]
pub struct VertexPalette {
    /// Total length field of the palette record
    pub declared_length: i32,
    vertices: FxHashMap<i32, Vertex>,
    next_offset: i32,
}

impl VertexPalette {
    /// Offset of the first vertex: the palette header is 8 bytes
    pub const FIRST_OFFSET: i32 = 8;

    pub fn new(declared_length: i32) -> Self {
        Self {
            declared_length,
            vertices: FxHashMap::default(),
            next_offset: Self::FIRST_OFFSET,
        }
    }

    /// Append a vertex read from a record of `record_len` bytes, returning its offset
    pub fn push(&mut self, vertex: Vertex, record_len: u16) -> i32 {
        let offset = self.next_offset;
        self.vertices.insert(offset, vertex);
        self.next_offset += record_len as i32;
        offset
    }

    #[inline]
    pub fn get(&self, offset: i32) -> Option<&Vertex> {
        self.vertices.get(&offset)
    }

    #[inline]
    pub fn contains(&self, offset: i32) -> bool {
        self.vertices.contains_key(&offset)
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

// ============================================================================
// Colors
// ============================================================================

/// Color palette: 1024 packed colors with optional names
#[derive(Debug, Clone)]
pub struct ColorPalette {
    pub colors: Vec<PackedColor>,
    pub names: FxHashMap<u16, String>,
}

impl ColorPalette {
    pub const COLOR_COUNT: usize = 1024;
    const RESERVED: usize = 128;
    /// Body size without the optional name table
    pub const LAYOUT_LEN: usize = Self::RESERVED + Self::COLOR_COUNT * 4;

    /// Decode a color palette body (already padded to [`Self::LAYOUT_LEN`])
    pub fn read(reader: &mut FieldReader<'_>) -> Result<Self> {
        reader.skip(Self::RESERVED)?;
        let mut colors = Vec::with_capacity(Self::COLOR_COUNT);
        for _ in 0..Self::COLOR_COUNT {
            colors.push(reader.packed_color()?);
        }

        let mut names = FxHashMap::default();
        if reader.remaining() >= 4 {
            let count = reader.i32()?.max(0);
            for _ in 0..count {
                // A damaged name table only loses names
                let Some((index, name)) = Self::read_name(reader) else {
                    break;
                };
                if let Some(name) = name {
                    names.insert(index, name);
                }
            }
        }

        Ok(Self { colors, names })
    }

    fn read_name(reader: &mut FieldReader<'_>) -> Option<(u16, Option<String>)> {
        let len = reader.i16().ok()?;
        reader.skip(2).ok()?;
        let index = reader.i16().ok()?;
        reader.skip(2).ok()?;
        if len <= 8 || index < 0 || index as usize >= Self::COLOR_COUNT {
            return Some((0, None));
        }
        let name = reader.fixed_string(len as usize - 8).ok()?;
        Some((index as u16, Some(name)))
    }

    /// Palette entry by raw index
    pub fn get(&self, index: usize) -> Option<PackedColor> {
        self.colors.get(index).copied()
    }

    /// Resolve a face/vertex color index: upper bits select the palette
    /// entry, the low 7 bits are the intensity.
    pub fn resolve(&self, color_index: u32) -> Option<PackedColor> {
        let entry = (color_index / 128) as usize;
        let intensity = (color_index % 128) as f32 / 127.0;
        self.get(entry).map(|c| c.scaled(intensity))
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            colors: vec![PackedColor::WHITE; Self::COLOR_COUNT],
            names: FxHashMap::default(),
        }
    }
}

// ============================================================================
// Materials
// ============================================================================

/// Material palette entry
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaterialEntry {
    pub index: i32,
    pub name: String,
    pub flags: i32,
    pub ambient: Rgb,
    pub diffuse: Rgb,
    pub specular: Rgb,
    pub emissive: Rgb,
    pub shininess: f32,
    pub alpha: f32,
}

impl MaterialEntry {
    pub const LAYOUT_LEN: usize = 4 + 12 + 4 + 4 * 12 + 4 + 4;
    pub const FLAG_USED: i32 = i32::MIN;

    pub fn read(reader: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            index: reader.i32()?,
            name: reader.fixed_string(12)?,
            flags: reader.i32()?,
            ambient: Rgb::read(reader)?,
            diffuse: Rgb::read(reader)?,
            specular: Rgb::read(reader)?,
            emissive: Rgb::read(reader)?,
            shininess: reader.f32()?,
            alpha: reader.f32()?,
        })
    }

    /// Shininess in `[0, 1]`; the file stores `[0, 128]`
    pub fn normalized_shininess(&self) -> f32 {
        self.shininess / 128.0
    }

    /// Visual equality: colors exact, shininess and alpha approximately equal
    pub fn same_appearance(&self, other: &MaterialEntry) -> bool {
        const EPSILON: f32 = 1e-6;
        let close = |a: f32, b: f32| (a - b).abs() <= EPSILON * a.abs().max(b.abs()).max(1.0);

        self.ambient == other.ambient
            && self.diffuse == other.diffuse
            && self.specular == other.specular
            && self.emissive == other.emissive
            && close(self.shininess, other.shininess)
            && close(self.alpha, other.alpha)
    }
}

// ============================================================================
// Textures
// ============================================================================

/// External decoder a texture file needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextureCodec {
    /// SGI image (`.rgb`, `.rgba`, `.bw`, `.int`, `.inta`, `.sgi`)
    Sgi,
    /// DirectDraw surface (DXT)
    Dds,
    /// Anything a general-purpose image loader handles
    Other,
}

impl TextureCodec {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("rgb" | "rgba" | "bw" | "int" | "inta" | "sgi") => Self::Sgi,
            Some("dds") => Self::Dds,
            _ => Self::Other,
        }
    }
}

/// Texture palette entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextureEntry {
    pub file_name: String,
    pub index: i32,
    pub location: [i32; 2],
}

impl TextureEntry {
    pub const LAYOUT_LEN: usize = 200 + 4 + 8;

    pub fn read(reader: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            file_name: reader.fixed_string(200)?,
            index: reader.i32()?,
            location: [reader.i32()?, reader.i32()?],
        })
    }

    pub fn codec(&self) -> TextureCodec {
        TextureCodec::from_path(&self.file_name)
    }
}

/// The four palettes of one database
#[derive(Debug, Clone, Default)]
pub struct Palettes {
    pub vertices: VertexPalette,
    pub colors: Option<ColorPalette>,
    pub materials: FxHashMap<i32, MaterialEntry>,
    pub textures: FxHashMap<i32, TextureEntry>,
}

impl Palettes {
    pub fn material(&self, index: i32) -> Option<&MaterialEntry> {
        self.materials.get(&index)
    }

    pub fn texture(&self, index: i32) -> Option<&TextureEntry> {
        self.textures.get(&index)
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
            && self.colors.is_none()
            && self.materials.is_empty()
            && self.textures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Endianness;

    fn material(shininess: f32, alpha: f32) -> MaterialEntry {
        MaterialEntry {
            index: 0,
            name: "m".into(),
            flags: 0,
            ambient: Rgb::default(),
            diffuse: Rgb {
                r: 1.0,
                g: 0.5,
                b: 0.25,
            },
            specular: Rgb::default(),
            emissive: Rgb::default(),
            shininess,
            alpha,
        }
    }

    #[test]
    fn test_vertex_palette_offsets() {
        let vertex = Vertex {
            format: VertexFormat::Color,
            color_name_index: 0,
            flags: 0,
            coordinate: [0.0; 3],
            packed_color: PackedColor::WHITE,
            color_index: 0,
            normal: None,
            uv: None,
        };
        let mut palette = VertexPalette::new(0);
        assert_eq!(palette.push(vertex.clone(), 40), 8);
        assert_eq!(palette.push(vertex.clone(), 56), 48);
        assert_eq!(palette.push(vertex, 40), 104);
        assert!(palette.contains(48));
        assert!(!palette.contains(12));
        assert_eq!(palette.len(), 3);
    }

    #[test]
    fn test_vertex_layouts() {
        assert_eq!(Vertex::layout_len(VertexFormat::Color), 36);
        assert_eq!(Vertex::layout_len(VertexFormat::ColorNormal), 48);
        assert_eq!(Vertex::layout_len(VertexFormat::ColorNormalUv), 56);
        assert_eq!(Vertex::layout_len(VertexFormat::ColorUv), 44);
    }

    #[test]
    fn test_read_vertex_with_uv() {
        let mut body = Vec::new();
        body.extend_from_slice(&3u16.to_be_bytes());
        body.extend_from_slice(&0x1000i16.to_be_bytes());
        for v in [1.0f64, 2.0, 3.0] {
            body.extend_from_slice(&v.to_be_bytes());
        }
        body.extend_from_slice(&[255, 0, 128, 64]);
        body.extend_from_slice(&7u32.to_be_bytes());
        body.extend_from_slice(&0.25f32.to_be_bytes());
        body.extend_from_slice(&0.75f32.to_be_bytes());

        let mut reader = FieldReader::new(&body, Endianness::Big);
        let vertex = Vertex::read(VertexFormat::ColorUv, &mut reader).unwrap();
        assert_eq!(vertex.coordinate, [1.0, 2.0, 3.0]);
        assert_eq!(
            vertex.packed_color,
            PackedColor {
                r: 64,
                g: 128,
                b: 0,
                a: 255
            }
        );
        assert_eq!(vertex.uv, Some([0.25, 0.75]));
        assert!(vertex.normal.is_none());
        assert!(vertex.has_packed_color());
    }

    #[test]
    fn test_color_index_intensity() {
        let mut palette = ColorPalette::default();
        palette.colors[2] = PackedColor {
            r: 254,
            g: 128,
            b: 0,
            a: 255,
        };
        let full = palette.resolve(2 * 128 + 127).unwrap();
        assert_eq!(full.r, 254);
        let off = palette.resolve(2 * 128).unwrap();
        assert_eq!((off.r, off.a), (0, 255));
        assert!(palette.resolve(5000 * 128).is_none());
    }

    #[test]
    fn test_material_appearance_compares_shininess() {
        let a = material(32.0, 1.0);
        assert!(a.same_appearance(&material(32.0, 1.0)));
        assert!(!a.same_appearance(&material(64.0, 1.0)));
        assert!(!a.same_appearance(&material(32.0, 0.5)));
    }

    #[test]
    fn test_texture_codec() {
        assert_eq!(TextureCodec::from_path("bark.RGB"), TextureCodec::Sgi);
        assert_eq!(TextureCodec::from_path("a/b/leaf.inta"), TextureCodec::Sgi);
        assert_eq!(TextureCodec::from_path("road.dds"), TextureCodec::Dds);
        assert_eq!(TextureCodec::from_path("sky.png"), TextureCodec::Other);
        assert_eq!(TextureCodec::from_path("noext"), TextureCodec::Other);
    }
}
