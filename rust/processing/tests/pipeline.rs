// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end imports of databases written to disk

use std::path::Path;

use flt_lite_core::{
    CancellationToken, DiagnosticKind, Face, FltWriter, ImportSettings, Opcode, PackedColor,
    TextureCodec, TextureEntry, Vertex, VertexFormat,
};
use flt_lite_geometry::{MeshData, Vector3};
use flt_lite_processing::{
    emit, import_file, import_many, parse_async, parse_async_with_cancel, Error, ImportSummary,
    NodeInfo, SceneEmitter,
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

fn translation(x: f32, y: f32, z: f32) -> [f32; 16] {
    let mut m = [0.0; 16];
    m[0] = 1.0;
    m[5] = 1.0;
    m[10] = 1.0;
    m[15] = 1.0;
    m[12] = x;
    m[13] = y;
    m[14] = z;
    m
}

/// Database with one object holding one triangle
fn write_leaf(path: &Path) {
    let mut w = FltWriter::new();
    w.header("leaf");
    let offsets = w.vertex_palette(&[
        vertex(0.0, 0.0, 0.0),
        vertex(1.0, 0.0, 0.0),
        vertex(0.0, 1.0, 0.0),
    ]);
    let face = Face {
        material: -1,
        texture: -1,
        detail_texture: -1,
        ..Default::default()
    };
    w.push().object("trunk").push();
    w.face("f1", &face).push().vertex_list(&offsets).pop();
    w.pop().pop();
    w.write_to(path).unwrap();
}

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Node { id: String, parent: Option<usize> },
    Mesh { node: usize, triangles: usize },
    Instance { id: String, owner: usize, position: Vector3<f64> },
}

#[derive(Default)]
struct Recorder {
    events: Vec<Event>,
    handles: usize,
}

impl Recorder {
    fn next_handle(&mut self) -> usize {
        self.handles += 1;
        self.handles - 1
    }
}

impl SceneEmitter for Recorder {
    type Handle = usize;

    fn create_node(&mut self, parent: Option<&usize>, info: &NodeInfo<'_>) -> usize {
        self.events.push(Event::Node {
            id: info.id.to_string(),
            parent: parent.copied(),
        });
        self.next_handle()
    }

    fn attach_mesh(&mut self, node: &usize, mesh: &MeshData) {
        self.events.push(Event::Mesh {
            node: *node,
            triangles: mesh.triangle_count(),
        });
    }

    fn create_instance(&mut self, _parent: Option<&usize>, owner: &usize, info: &NodeInfo<'_>) -> usize {
        self.events.push(Event::Instance {
            id: info.id.to_string(),
            owner: *owner,
            position: info.transform.position,
        });
        self.next_handle()
    }
}

#[test]
fn test_single_file_summary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("leaf.flt");
    write_leaf(&path);

    let result = import_file(&path, &ImportSettings::default()).unwrap();
    let summary = ImportSummary::from_result(&result);
    assert_eq!(summary.databases, 1);
    assert_eq!(summary.faces, 1);
    assert_eq!(summary.meshes, 1);
    assert_eq!(summary.triangles, 1);
    assert_eq!(summary.materials, 1);
    assert_eq!(summary.records["Object"], 1);
    assert!(summary.diagnostics.iter().all(|d| d.kind == DiagnosticKind::Progress));

    let json = summary.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["triangles"], 1);
    assert_eq!(value["references"]["owners"], 0);
}

#[test]
fn test_textures_resolve_through_search_directories() {
    let models = tempfile::tempdir().unwrap();
    let library = tempfile::tempdir().unwrap();
    std::fs::write(library.path().join("bark.rgb"), [0u8; 16]).unwrap();

    let mut w = FltWriter::new();
    w.header("textured");
    w.texture(&TextureEntry {
        file_name: "D:\\textures\\bark.rgb".to_string(),
        index: 0,
        location: [0, 0],
    });
    w.texture(&TextureEntry {
        file_name: "gone/rock.dds".to_string(),
        index: 1,
        location: [0, 0],
    });
    let offsets = w.vertex_palette(&[
        vertex(0.0, 0.0, 0.0),
        vertex(1.0, 0.0, 0.0),
        vertex(0.0, 1.0, 0.0),
    ]);
    w.push().object("wall").push();
    for (id, texture) in [("f1", 0), ("f2", 1)] {
        let face = Face {
            material: -1,
            texture,
            detail_texture: -1,
            ..Default::default()
        };
        w.face(id, &face).push().vertex_list(&offsets).pop();
    }
    w.pop().pop();
    let path = models.path().join("textured.flt");
    w.write_to(&path).unwrap();

    let settings = ImportSettings::default().with_search_directory(library.path());
    let result = import_file(&path, &settings).unwrap();

    assert_eq!(result.materials.len(), 2);
    assert_eq!(result.textures.len(), 2);
    let bark = result.textures[0].main.as_ref().unwrap();
    assert_eq!(bark.path, library.path().join("bark.rgb").canonicalize().unwrap());
    assert_eq!(bark.codec, TextureCodec::Sgi);
    assert!(result.textures[1].main.is_none());
    assert_eq!(result.textures[1].missing(), 1);

    let unresolved: Vec<_> = result
        .log
        .problems()
        .into_iter()
        .filter(|d| d.kind == DiagnosticKind::UnresolvedReference)
        .collect();
    assert_eq!(unresolved.len(), 1);
    assert!(unresolved[0].message.contains("rock.dds"));

    let summary = ImportSummary::from_result(&result);
    assert_eq!(summary.textures.resolved, 1);
    assert_eq!(summary.textures.missing, 1);
}

#[test]
fn test_aliases_emit_instances_with_own_transforms() {
    let dir = tempfile::tempdir().unwrap();
    write_leaf(&dir.path().join("tree.flt"));

    let mut w = FltWriter::new();
    w.header("forest").push();
    w.external_reference("tree.flt", 0).matrix(&translation(0.0, 5.0, 0.0));
    w.external_reference("tree.flt", 0).matrix(&translation(10.0, 0.0, 0.0));
    w.external_reference("tree.flt", 0).matrix(&translation(20.0, 0.0, 3.0));
    w.pop();
    let main = dir.path().join("forest.flt");
    w.write_to(&main).unwrap();

    let result = import_file(&main, &ImportSettings::default()).unwrap();
    // only the owner's sub-database was prepared
    assert_eq!(result.prepared.len(), 1);
    assert_eq!(result.graph.find_by_opcode(Opcode::Object).len(), 1);

    let mut recorder = Recorder::default();
    let root = emit(&result, &mut recorder).unwrap();
    assert_eq!(root, Some(0));
    assert_eq!(
        recorder.events,
        [
            Event::Node {
                id: "forest".into(),
                parent: None
            },
            Event::Node {
                id: "Ref: tree.flt".into(),
                parent: Some(0)
            },
            Event::Node {
                id: "leaf".into(),
                parent: Some(1)
            },
            Event::Node {
                id: "trunk".into(),
                parent: Some(2)
            },
            Event::Mesh {
                node: 3,
                triangles: 1
            },
            Event::Instance {
                id: "Ref: tree.flt".into(),
                owner: 1,
                position: Vector3::new(10.0, 0.0, 0.0)
            },
            Event::Instance {
                id: "Ref: tree.flt".into(),
                owner: 1,
                position: Vector3::new(20.0, 3.0, 0.0)
            },
        ]
    );

    let owner = result.graph.find_by_opcode(Opcode::ExternalReference)[0];
    let matrix = result.graph[owner].matrix.unwrap();
    assert_eq!(matrix[13], 5.0);

    let summary = ImportSummary::from_result(&result);
    assert_eq!(summary.references.owners, 1);
    assert_eq!(summary.references.aliases, 2);
}

#[test]
fn test_batch_import_keeps_order_and_errors() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.flt");
    let b = dir.path().join("b.flt");
    write_leaf(&a);
    write_leaf(&b);
    let missing = dir.path().join("missing.flt");

    let results = import_many(&[a.clone(), missing.clone(), b.clone()], &ImportSettings::default());
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0, a);
    assert!(results[0].1.is_ok());
    assert_eq!(results[1].0, missing);
    assert!(matches!(
        results[1].1,
        Err(Error::Core(flt_lite_core::Error::Io { .. }))
    ));
    assert!(results[2].1.is_ok());
}

#[tokio::test]
async fn test_parse_async_runs_off_thread() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("leaf.flt");
    write_leaf(&path);

    let result = parse_async(path, ImportSettings::default()).await.unwrap();
    assert_eq!(result.prepared.triangle_count(), 1);
}

#[tokio::test]
async fn test_parse_async_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("leaf.flt");
    write_leaf(&path);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = parse_async_with_cancel(path, ImportSettings::default(), cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}
