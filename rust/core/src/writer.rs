// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Big-endian record encoder
//!
//! Produces OpenFlight record streams field by field. Used to build test
//! fixtures and small databases programmatically; it writes current-revision
//! layouts and does not track nesting for the caller.

use std::path::Path;

use crate::error::{Error, Result};
use crate::header::Header;
use crate::opcode::Opcode;
use crate::palette::{ColorPalette, MaterialEntry, PackedColor, Rgb, TextureEntry, Vertex, VertexPalette};
use crate::records::{Face, Group, Lod, Object};

/// Appends encoded records to an in-memory buffer
#[derive(Debug, Clone, Default)]
pub struct FltWriter {
    buf: Vec<u8>,
}

/// Field encoder for one record body
#[derive(Debug, Clone, Default)]
pub struct BodyWriter {
    buf: Vec<u8>,
}

impl BodyWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn i8(&mut self, v: i8) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn i16(&mut self, v: i16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn i32(&mut self, v: i32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn f32(&mut self, v: f32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn f64(&mut self, v: f64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn f64x3(&mut self, v: [f64; 3]) -> &mut Self {
        v.iter().fold(self, |w, &x| w.f64(x))
    }

    pub fn zeros(&mut self, n: usize) -> &mut Self {
        self.buf.resize(self.buf.len() + n, 0);
        self
    }

    /// Fixed-width string, truncated or NUL-padded to `len`
    pub fn fixed_string(&mut self, s: &str, len: usize) -> &mut Self {
        let bytes = s.as_bytes();
        let n = bytes.len().min(len);
        self.buf.extend_from_slice(&bytes[..n]);
        self.zeros(len - n)
    }

    pub fn packed_color(&mut self, c: PackedColor) -> &mut Self {
        self.buf.extend_from_slice(&[c.a, c.b, c.g, c.r]);
        self
    }

    fn rgb(&mut self, c: Rgb) -> &mut Self {
        self.f32(c.r).f32(c.g).f32(c.b)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl FltWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw record: opcode, total length, `body`
    pub fn record(&mut self, opcode: Opcode, body: &[u8]) -> &mut Self {
        let length = (body.len() + 4) as u16;
        self.buf.extend_from_slice(&opcode.raw().to_be_bytes());
        self.buf.extend_from_slice(&length.to_be_bytes());
        self.buf.extend_from_slice(body);
        self
    }

    fn body(&mut self, opcode: Opcode, body: BodyWriter) -> &mut Self {
        self.record(opcode, &body.into_bytes())
    }

    /// Header with format revision 16.4, meters
    pub fn header(&mut self, id: &str) -> &mut Self {
        let mut b = BodyWriter::new();
        b.fixed_string(id, 8).i32(1640).i32(0);
        b.zeros(Header::LAYOUT_LEN - b.len());
        self.body(Opcode::Header, b)
    }

    pub fn push(&mut self) -> &mut Self {
        self.record(Opcode::PushLevel, &[])
    }

    pub fn pop(&mut self) -> &mut Self {
        self.record(Opcode::PopLevel, &[])
    }

    pub fn push_extension(&mut self) -> &mut Self {
        self.record(Opcode::PushExtension, &[0u8; 20])
    }

    pub fn pop_extension(&mut self) -> &mut Self {
        self.record(Opcode::PopExtension, &[0u8; 20])
    }

    pub fn long_id(&mut self, id: &str) -> &mut Self {
        let mut bytes = id.as_bytes().to_vec();
        bytes.push(0);
        self.record(Opcode::LongId, &bytes)
    }

    pub fn comment(&mut self, text: &str) -> &mut Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        self.record(Opcode::Comment, &bytes)
    }

    pub fn matrix(&mut self, m: &[f32; 16]) -> &mut Self {
        let mut b = BodyWriter::new();
        for &v in m {
            b.f32(v);
        }
        self.body(Opcode::Matrix, b)
    }

    pub fn group(&mut self, id: &str) -> &mut Self {
        let mut b = BodyWriter::new();
        b.fixed_string(id, 8).zeros(Group::LAYOUT_LEN - 8);
        self.body(Opcode::Group, b)
    }

    pub fn object(&mut self, id: &str) -> &mut Self {
        let mut b = BodyWriter::new();
        b.fixed_string(id, 8).zeros(Object::LAYOUT_LEN - 8 + 2);
        self.body(Opcode::Object, b)
    }

    pub fn lod(&mut self, id: &str, switch_in: f64, switch_out: f64) -> &mut Self {
        let mut b = BodyWriter::new();
        b.fixed_string(id, 8).zeros(4).f64(switch_in).f64(switch_out);
        b.zeros(Lod::LAYOUT_LEN - b.len());
        self.body(Opcode::LevelOfDetail, b)
    }

    pub fn switch(&mut self, id: &str, current: i32, masks: &[u32]) -> &mut Self {
        let mut b = BodyWriter::new();
        b.fixed_string(id, 8)
            .zeros(4)
            .i32(current)
            .i32(masks.len() as i32)
            .i32(1);
        for &mask in masks {
            b.u32(mask);
        }
        self.body(Opcode::Switch, b)
    }

    pub fn face(&mut self, id: &str, face: &Face) -> &mut Self {
        let mut b = BodyWriter::new();
        b.fixed_string(id, 8)
            .i32(face.ir_color)
            .i16(face.priority)
            .i8(draw_type_raw(face))
            .u8(face.tex_white as u8)
            .u16(face.color_name_index)
            .u16(face.alternate_color_name_index)
            .zeros(1)
            .i8(0)
            .i16(face.detail_texture)
            .i16(face.texture)
            .i16(face.material)
            .i16(face.surface_material_code)
            .i16(face.feature_id)
            .i32(face.ir_material)
            .u16(face.transparency)
            .u8(face.lod_generation_control)
            .u8(face.line_style)
            .i32(face.flags)
            .u8(light_mode_raw(face))
            .zeros(7)
            .packed_color(face.packed_color)
            .packed_color(face.alternate_packed_color)
            .i16(face.texture_mapping)
            .zeros(2)
            .u32(face.color_index)
            .u32(face.alternate_color_index)
            .zeros(2)
            .i16(face.shader);
        self.body(Opcode::Face, b)
    }

    /// Vertex palette header plus one record per vertex; returns the offsets
    pub fn vertex_palette(&mut self, vertices: &[Vertex]) -> Vec<i32> {
        let encoded: Vec<(Opcode, BodyWriter)> = vertices.iter().map(encode_vertex).collect();
        let total: usize = 8 + encoded.iter().map(|(_, b)| b.len() + 4).sum::<usize>();

        let mut header = BodyWriter::new();
        header.i32(total as i32);
        self.body(Opcode::VertexPalette, header);

        let mut offsets = Vec::with_capacity(encoded.len());
        let mut offset = VertexPalette::FIRST_OFFSET;
        for (opcode, body) in encoded {
            offsets.push(offset);
            offset += body.len() as i32 + 4;
            self.body(opcode, body);
        }
        offsets
    }

    pub fn vertex_list(&mut self, offsets: &[i32]) -> &mut Self {
        let mut b = BodyWriter::new();
        for &offset in offsets {
            b.i32(offset);
        }
        self.body(Opcode::VertexList, b)
    }

    pub fn color_palette(&mut self, colors: &[PackedColor]) -> &mut Self {
        let mut b = BodyWriter::new();
        b.zeros(128);
        for i in 0..ColorPalette::COLOR_COUNT {
            b.packed_color(colors.get(i).copied().unwrap_or(PackedColor::WHITE));
        }
        self.body(Opcode::ColorPalette, b)
    }

    pub fn material(&mut self, m: &MaterialEntry) -> &mut Self {
        let mut b = BodyWriter::new();
        b.i32(m.index)
            .fixed_string(&m.name, 12)
            .i32(m.flags)
            .rgb(m.ambient)
            .rgb(m.diffuse)
            .rgb(m.specular)
            .rgb(m.emissive)
            .f32(m.shininess)
            .f32(m.alpha);
        self.body(Opcode::MaterialPalette, b)
    }

    pub fn texture(&mut self, t: &TextureEntry) -> &mut Self {
        let mut b = BodyWriter::new();
        b.fixed_string(&t.file_name, 200)
            .i32(t.index)
            .i32(t.location[0])
            .i32(t.location[1]);
        self.body(Opcode::TexturePalette, b)
    }

    pub fn external_reference(&mut self, path: &str, flags: i32) -> &mut Self {
        let mut b = BodyWriter::new();
        b.fixed_string(path, 200).zeros(4).i32(flags).i16(0).zeros(2);
        self.body(Opcode::ExternalReference, b)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(&self) -> Vec<u8> {
        self.buf.clone()
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, &self.buf).map_err(|e| Error::io(path, e))
    }
}

fn encode_vertex(v: &Vertex) -> (Opcode, BodyWriter) {
    let mut b = BodyWriter::new();
    b.u16(v.color_name_index)
        .i16(v.flags)
        .f64x3(v.coordinate)
        .packed_color(v.packed_color)
        .u32(v.color_index);
    if let Some(n) = v.normal {
        b.f32(n[0]).f32(n[1]).f32(n[2]);
    }
    if let Some(uv) = v.uv {
        b.f32(uv[0]).f32(uv[1]);
    }
    let opcode = match (v.normal.is_some(), v.uv.is_some()) {
        (false, false) => Opcode::VertexWithColor,
        (true, false) => Opcode::VertexWithColorNormal,
        (true, true) => Opcode::VertexWithColorNormalUv,
        (false, true) => Opcode::VertexWithColorUv,
    };
    (opcode, b)
}

fn draw_type_raw(face: &Face) -> i8 {
    use crate::records::DrawType::*;
    match face.draw_type {
        SolidCullBackface => 0,
        SolidNoCull => 1,
        WireframeClosed => 2,
        WireframeOpen => 3,
        SurroundAlternateColor => 4,
        OmnidirectionalLight => 8,
        UnidirectionalLight => 9,
        BidirectionalLight => 10,
        Other(raw) => raw,
    }
}

fn light_mode_raw(face: &Face) -> u8 {
    use crate::records::LightMode::*;
    match face.light_mode {
        Flat => 0,
        Gouraud => 1,
        Lit => 2,
        LitGouraud => 3,
        Other(raw) => raw,
    }
}
