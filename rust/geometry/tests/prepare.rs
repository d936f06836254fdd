// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Prepare pass over parsed in-memory databases

use std::sync::Arc;

use flt_lite_core::{
    CancellationToken, Face, FltWriter, ImportSettings, LightMode, Opcode, PackedColor,
    ParseOutput, Parser, Vertex, VertexFormat,
};
use flt_lite_geometry::{prepare_for_import, Error};

fn vertex(x: f64, y: f64, z: f64) -> Vertex {
    Vertex {
        format: VertexFormat::ColorNormalUv,
        color_name_index: 0,
        flags: Vertex::FLAG_PACKED_COLOR,
        coordinate: [x, y, z],
        packed_color: PackedColor {
            r: 255,
            g: 0,
            b: 0,
            a: 255,
        },
        color_index: 0,
        normal: Some([0.0, 0.0, 1.0]),
        uv: Some([x as f32, y as f32]),
    }
}

fn face(transparency: u16) -> Face {
    Face {
        material: -1,
        texture: -1,
        detail_texture: -1,
        transparency,
        ..Default::default()
    }
}

fn parse(w: &FltWriter) -> ParseOutput {
    Parser::new(ImportSettings::default())
        .parse_bytes("test.flt", &w.finish())
        .unwrap()
}

#[test]
fn test_triangle_is_swapped_and_reversed() {
    let mut w = FltWriter::new();
    w.header("tri");
    let offsets = w.vertex_palette(&[
        vertex(0.0, 0.0, 0.0),
        vertex(1.0, 0.0, 0.0),
        vertex(0.0, 1.0, 0.0),
    ]);
    w.push().object("o1").push();
    w.face("f1", &face(0)).push().vertex_list(&offsets).pop();
    w.pop().pop();

    let out = parse(&w);
    let scene = prepare_for_import(&out.graph, &out.log, &CancellationToken::new()).unwrap();
    let object = out.graph.find_by_opcode(Opcode::Object)[0];
    let mesh = scene.get(object).unwrap();

    assert_eq!(scene.len(), 1);
    assert_eq!(mesh.vertex_count(), 3);
    assert_eq!(
        mesh.positions,
        [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]
    );
    assert_eq!(&mesh.normals[..3], &[0.0, 1.0, 0.0]);
    assert_eq!(&mesh.uvs[2..4], &[1.0, 0.0]);
    assert_eq!(mesh.sub_meshes.len(), 1);
    assert_eq!(mesh.sub_meshes[0].indices, [2, 1, 0]);
    // flat shading takes the face color, not the packed vertex color
    assert_eq!(mesh.colors[0], PackedColor::WHITE);
    assert!(!out.log.has_problems(), "{}", out.log);
}

#[test]
fn test_quad_with_gouraud_colors() {
    let mut w = FltWriter::new();
    w.header("quad");
    let offsets = w.vertex_palette(&[
        vertex(0.0, 0.0, 0.0),
        vertex(2.0, 0.0, 0.0),
        vertex(2.0, 2.0, 0.0),
        vertex(0.0, 2.0, 0.0),
    ]);
    let quad = Face {
        light_mode: LightMode::Gouraud,
        ..face(0)
    };
    w.push().group("g").push();
    w.face("q", &quad).push().vertex_list(&offsets).pop();
    w.pop().pop();

    let out = parse(&w);
    let scene = prepare_for_import(&out.graph, &out.log, &CancellationToken::new()).unwrap();
    let group = out.graph.find_by_opcode(Opcode::Group)[0];
    let mesh = scene.get(group).unwrap();

    assert_eq!(mesh.triangle_count(), 2);
    assert!(mesh.sub_meshes[0].indices.iter().all(|&i| i < 4));
    assert_eq!(
        mesh.colors[1],
        PackedColor {
            r: 255,
            g: 0,
            b: 0,
            a: 255
        }
    );
}

#[test]
fn test_faces_group_by_material_and_share_the_bank() {
    let mut w = FltWriter::new();
    w.header("mats");
    let offsets = w.vertex_palette(&[
        vertex(0.0, 0.0, 0.0),
        vertex(1.0, 0.0, 0.0),
        vertex(0.0, 1.0, 0.0),
    ]);
    w.push();
    w.object("o1").push();
    for (id, transparency) in [("f1", 0), ("f2", 0), ("f3", 1000)] {
        w.face(id, &face(transparency)).push().vertex_list(&offsets).pop();
    }
    w.pop();
    w.object("o2").push();
    w.face("f4", &face(0)).push().vertex_list(&offsets).pop();
    w.pop();
    w.pop();

    let out = parse(&w);
    let scene = prepare_for_import(&out.graph, &out.log, &CancellationToken::new()).unwrap();
    let objects = out.graph.find_by_opcode(Opcode::Object);
    let first = scene.get(objects[0]).unwrap();
    let second = scene.get(objects[1]).unwrap();

    assert_eq!(first.vertex_count(), 9);
    assert_eq!(first.sub_meshes.len(), 2);
    assert_eq!(first.sub_meshes[0].indices, [2, 1, 0, 5, 4, 3]);
    assert_eq!(first.sub_meshes[1].indices, [8, 7, 6]);
    assert_eq!(first.sub_meshes[0].material.id, 0);
    assert_eq!(first.sub_meshes[1].material.id, 1);

    assert_eq!(second.sub_meshes.len(), 1);
    assert!(Arc::ptr_eq(
        &first.sub_meshes[0].material,
        &second.sub_meshes[0].material
    ));
    assert_eq!(out.materials.len(), 2);
    assert!(first.sub_meshes[1].material.is_transparent());
}

#[test]
fn test_hidden_and_degenerate_faces_add_nothing() {
    let mut w = FltWriter::new();
    w.header("skip");
    let offsets = w.vertex_palette(&[
        vertex(0.0, 0.0, 0.0),
        vertex(1.0, 0.0, 0.0),
        vertex(0.0, 1.0, 0.0),
    ]);
    let hidden = Face {
        flags: Face::FLAG_HIDDEN,
        ..face(0)
    };
    w.push().object("o1").push();
    w.face("hidden", &hidden).push().vertex_list(&offsets).pop();
    w.face("line", &face(0)).push().vertex_list(&offsets[..2]).pop();
    w.pop().pop();

    let out = parse(&w);
    let scene = prepare_for_import(&out.graph, &out.log, &CancellationToken::new()).unwrap();
    assert!(scene.is_empty());
    assert!(out.materials.is_empty());
}

#[test]
fn test_cancelled_prepare() {
    let mut w = FltWriter::new();
    w.header("db");
    let offsets = w.vertex_palette(&[
        vertex(0.0, 0.0, 0.0),
        vertex(1.0, 0.0, 0.0),
        vertex(0.0, 1.0, 0.0),
    ]);
    w.push().object("o1").push();
    w.face("f1", &face(0)).push().vertex_list(&offsets).pop();
    w.pop().pop();

    let out = parse(&w);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = prepare_for_import(&out.graph, &out.log, &cancel).unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}
