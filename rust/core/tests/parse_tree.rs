// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tree construction from in-memory databases

use flt_lite_core::{
    CancellationToken, DiagnosticKind, Error, Face, FltWriter, ImportSettings, MaterialEntry,
    NodeClass, Opcode, PackedColor, Parser, RecordKind, Rgb, Vertex, VertexFormat,
};

fn vertex(x: f64, y: f64, z: f64) -> Vertex {
    Vertex {
        format: VertexFormat::ColorNormal,
        color_name_index: 0,
        flags: 0,
        coordinate: [x, y, z],
        packed_color: PackedColor::WHITE,
        color_index: 0,
        normal: Some([0.0, 0.0, 1.0]),
        uv: None,
    }
}

fn untextured_face() -> Face {
    Face {
        material: 0,
        texture: -1,
        detail_texture: -1,
        ..Default::default()
    }
}

fn parser() -> Parser {
    Parser::new(ImportSettings::default())
}

#[test]
fn test_triangle_database() {
    let mut w = FltWriter::new();
    w.header("tri");
    w.material(&MaterialEntry {
        index: 0,
        name: "grey".into(),
        flags: MaterialEntry::FLAG_USED,
        ambient: Rgb::default(),
        diffuse: Rgb { r: 0.5, g: 0.5, b: 0.5 },
        specular: Rgb::default(),
        emissive: Rgb::default(),
        shininess: 0.0,
        alpha: 1.0,
    });
    let offsets = w.vertex_palette(&[
        vertex(0.0, 0.0, 0.0),
        vertex(1.0, 0.0, 0.0),
        vertex(0.0, 1.0, 0.0),
    ]);
    w.push();
    w.object("o1");
    w.push();
    w.face("p1", &untextured_face());
    w.push();
    w.vertex_list(&offsets);
    w.pop();
    w.pop();
    w.pop();

    let out = parser().parse_bytes("tri.flt", &w.finish()).unwrap();
    let graph = &out.graph;

    let faces = graph.find_by_opcode(Opcode::Face);
    assert_eq!(faces.len(), 1);
    let lists = graph.children(faces[0]);
    assert_eq!(lists.len(), 1);
    let list = graph[lists[0]].as_vertex_list().unwrap();
    assert_eq!(list.offsets.as_slice(), offsets.as_slice());

    let db = graph.database_of(faces[0]).unwrap();
    assert_eq!(db.palettes.vertices.len(), 3);
    assert_eq!(db.header.format_revision, 1640);
    assert!(db.palettes.material(0).is_some());
    assert!(!out.log.has_problems(), "{}", out.log);
}

#[test]
fn test_empty_database_has_no_children() {
    let mut w = FltWriter::new();
    w.header("empty");
    w.color_palette(&[]);
    w.vertex_palette(&[]);

    let out = parser().parse_bytes("empty.flt", &w.finish()).unwrap();
    assert!(out.graph.children(out.root).is_empty());
    assert_eq!(out.graph.len(), 1);
    assert!(!out.log.has_problems(), "{}", out.log);
    assert!(out.graph[out.root].as_database().unwrap().palettes.colors.is_some());
}

#[test]
fn test_sibling_groups_are_thrown_back() {
    let mut w = FltWriter::new();
    w.header("db");
    w.push();
    w.group("a");
    w.group("b");
    w.lod("c", 100.0, 0.0);
    w.pop();

    let out = parser().parse_bytes("siblings.flt", &w.finish()).unwrap();
    let ids: Vec<_> = out
        .graph
        .children(out.root)
        .iter()
        .map(|&k| out.graph[k].id.clone())
        .collect();
    assert_eq!(ids, ["a", "b", "c"]);
    for &child in out.graph.children(out.root) {
        assert!(out.graph.children(child).is_empty());
    }
}

#[test]
fn test_consecutive_faces_share_parent() {
    let mut w = FltWriter::new();
    w.header("db");
    let offsets = w.vertex_palette(&[
        vertex(0.0, 0.0, 0.0),
        vertex(1.0, 0.0, 0.0),
        vertex(1.0, 1.0, 0.0),
    ]);
    w.push();
    w.group("g");
    w.push();
    for id in ["f1", "f2"] {
        w.face(id, &untextured_face());
        w.push();
        w.vertex_list(&offsets);
        w.pop();
    }
    // a face without vertex list children ends at the next sibling
    w.face("f3", &untextured_face());
    w.pop();
    w.pop();

    let out = parser().parse_bytes("faces.flt", &w.finish()).unwrap();
    let group = out.graph.find_by_opcode(Opcode::Group)[0];
    let classes: Vec<_> = out
        .graph
        .children(group)
        .iter()
        .map(|&k| out.graph[k].class())
        .collect();
    assert_eq!(classes, [NodeClass::Face, NodeClass::Face, NodeClass::Face]);
    assert_eq!(out.graph.children(out.graph.children(group)[2]).len(), 0);
}

#[test]
fn test_balanced_levels_close_cleanly() {
    let mut w = FltWriter::new();
    w.header("db");
    w.push();
    w.group("outer");
    w.push();
    w.group("inner");
    w.push();
    w.object("leaf");
    w.pop();
    w.pop();
    w.pop();

    let out = parser().parse_bytes("levels.flt", &w.finish()).unwrap();
    let leaf = out.graph.find_by_opcode(Opcode::Object)[0];
    assert_eq!(out.graph[leaf].level, 3);
    assert_eq!(out.graph.depth(leaf), 3);
    assert_eq!(
        out.log
            .entries()
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Structural)
            .count(),
        0
    );
}

#[test]
fn test_unbalanced_push_ends_at_eof() {
    let mut w = FltWriter::new();
    w.header("db");
    w.push();
    w.group("open");
    w.push();
    w.object("never closed");

    let out = parser().parse_bytes("open.flt", &w.finish()).unwrap();
    assert_eq!(out.graph.find_by_opcode(Opcode::Object).len(), 1);
    assert!(out
        .log
        .problems()
        .iter()
        .any(|d| d.kind == DiagnosticKind::Structural));
}

#[test]
fn test_switch_and_dof_payloads() {
    let mut w = FltWriter::new();
    w.header("db");
    w.push();
    w.switch("sw", 0, &[0b101]);
    w.push();
    w.group("on");
    w.group("off");
    w.group("on2");
    w.pop();
    w.pop();

    let out = parser().parse_bytes("switch.flt", &w.finish()).unwrap();
    let sw = out.graph.find_by_opcode(Opcode::Switch)[0];
    let RecordKind::Switch(switch) = &out.graph[sw].kind else {
        panic!("expected a switch");
    };
    let visible: Vec<_> = (0..out.graph.children(sw).len())
        .map(|i| switch.is_child_active(i))
        .collect();
    assert_eq!(visible, [true, false, true]);
}

#[test]
fn test_cancelled_before_parse() {
    let mut w = FltWriter::new();
    w.header("db");
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = parser()
        .with_cancellation(cancel)
        .parse_bytes("db.flt", &w.finish())
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[test]
fn test_truncated_record_is_structural_error() {
    let mut data = FltWriter::new().header("db").push().finish();
    // group header claiming 44 bytes with only 10 present
    data.extend_from_slice(&[0, 2, 0, 44, 1, 2, 3, 4, 5, 6]);
    let err = parser().parse_bytes("cut.flt", &data).unwrap_err();
    assert!(matches!(err, Error::Truncated { .. }));
}
