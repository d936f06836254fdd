// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Prepare pass
//!
//! Builds one [`MeshData`] per mesh-bearing node: an interior node with at
//! least one Face child. Nodes are processed in parallel; their material
//! keys are then registered in node order so bank ids are stable between
//! runs.

use flt_lite_core::{
    CancellationToken, ColorPalette, Face, ImportLog, MaterialKey, Node, NodeKey, PackedColor,
    PaletteLookup, SceneGraph, Vertex,
};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::mesh::{MeshData, SubMesh};
use crate::transform::swap_yz;
use crate::triangulation::triangulate_face;
use crate::{Point3, Vector3};

/// Meshes keyed by the node that owns them
#[derive(Debug, Clone, Default)]
pub struct PreparedScene {
    pub meshes: FxHashMap<NodeKey, MeshData>,
}

impl PreparedScene {
    pub fn get(&self, node: NodeKey) -> Option<&MeshData> {
        self.meshes.get(&node)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.values().map(MeshData::vertex_count).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.values().map(MeshData::triangle_count).sum()
    }
}

/// Mesh of one node before its material keys are registered
struct PendingMesh {
    node: NodeKey,
    database: NodeKey,
    mesh: MeshData,
    buckets: Vec<(MaterialKey, Vec<u32>)>,
}

impl PendingMesh {
    /// Local linear search keeps the sub-mesh order of first appearance
    fn bucket(&mut self, key: MaterialKey) -> &mut Vec<u32> {
        let index = match self.buckets.iter().position(|(k, _)| *k == key) {
            Some(index) => index,
            None => {
                self.buckets.push((key, Vec::new()));
                self.buckets.len() - 1
            }
        };
        &mut self.buckets[index].1
    }
}

/// Interior nodes with at least one Face child, in tree order.
///
/// Alias references carry no geometry of their own and are left out.
pub fn mesh_bearing_nodes(graph: &SceneGraph) -> Vec<NodeKey> {
    let Some(root) = graph.root() else {
        return Vec::new();
    };
    graph
        .depth_first(root)
        .filter(|&key| {
            let node = &graph[key];
            node.is_interior()
                && !node.is_alias()
                && graph
                    .children(key)
                    .iter()
                    .any(|&child| graph[child].as_face().is_some())
        })
        .collect()
}

/// Triangulate every visible face and group the triangles by material.
///
/// Cancellation is checked once per node.
pub fn prepare_for_import(
    graph: &SceneGraph,
    log: &ImportLog,
    cancel: &CancellationToken,
) -> Result<PreparedScene> {
    let nodes = mesh_bearing_nodes(graph);

    let pending = nodes
        .par_iter()
        .map(|&key| {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            Ok(build_node_mesh(graph, key, log))
        })
        .collect::<Result<Vec<_>>>()?;

    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let mut meshes = FxHashMap::default();
    for pending in pending.into_iter().flatten() {
        let Some(db) = graph.get(pending.database).and_then(Node::as_database) else {
            continue;
        };
        let sub_meshes = pending
            .buckets
            .into_iter()
            .map(|(key, indices)| SubMesh {
                material: db.materials.find_or_create(&key),
                indices,
            })
            .collect();
        meshes.insert(
            pending.node,
            MeshData {
                sub_meshes,
                ..pending.mesh
            },
        );
    }

    let scene = PreparedScene { meshes };
    tracing::debug!(
        nodes = scene.len(),
        vertices = scene.vertex_count(),
        triangles = scene.triangle_count(),
        "Prepared meshes"
    );
    Ok(scene)
}

fn build_node_mesh(graph: &SceneGraph, key: NodeKey, log: &ImportLog) -> Option<PendingMesh> {
    let node = graph.get(key)?;
    let lookup = PaletteLookup::for_database(graph, node.database)?;
    let mut pending = PendingMesh {
        node: key,
        database: node.database,
        mesh: MeshData::new(),
        buckets: Vec::new(),
    };

    for &child in graph.children(key) {
        let Some(face) = graph[child].as_face() else {
            continue;
        };
        if face.is_hidden() {
            continue;
        }
        let Some(db) = graph.database_of(child) else {
            continue;
        };

        let vertices: SmallVec<[&Vertex; 8]> = graph
            .children(child)
            .iter()
            .filter_map(|&k| graph[k].as_vertex_list())
            .flat_map(|list| list.offsets.iter())
            .filter_map(|&offset| db.palettes.vertices.get(offset))
            .collect();
        if vertices.len() < 3 {
            continue;
        }

        append_face(&mut pending, face, &vertices, &lookup, log);
    }

    (!pending.mesh.is_empty()).then_some(pending)
}

fn append_face(
    pending: &mut PendingMesh,
    face: &Face,
    vertices: &[&Vertex],
    lookup: &PaletteLookup<'_>,
    log: &ImportLog,
) {
    let colors = lookup.colors();
    let face_color = face.color(colors);
    let alpha = (face.alpha() * 255.0).round() as u8;
    let per_vertex = face.light_mode.uses_vertex_colors();

    let start = pending.mesh.vertex_count() as u32;
    let mut positions: SmallVec<[Point3<f64>; 8]> = SmallVec::with_capacity(vertices.len());
    let mut normal_sum = Vector3::zeros();

    for vertex in vertices {
        let [x, y, z] = vertex.coordinate;
        positions.push(Point3::new(x, y, z));

        let normal = vertex.normal.unwrap_or([0.0; 3]);
        normal_sum += Vector3::new(normal[0] as f64, normal[1] as f64, normal[2] as f64);

        let color = if per_vertex {
            vertex_color(vertex, face_color, colors)
        } else {
            face_color
        };
        pending.mesh.add_vertex(
            swap_yz(vertex.coordinate),
            [normal[0], normal[2], normal[1]],
            vertex.uv.unwrap_or([0.0; 2]),
            PackedColor { a: alpha, ..color },
        );
    }

    let key = MaterialKey::resolve(face, lookup, log);
    let triangles = triangulate_face(&positions, &normal_sum);
    pending
        .bucket(key)
        .extend(triangles.into_iter().map(|i| start + i));
}

fn vertex_color(
    vertex: &Vertex,
    face_color: PackedColor,
    colors: Option<&ColorPalette>,
) -> PackedColor {
    if vertex.has_no_color() {
        face_color
    } else if vertex.has_packed_color() {
        vertex.packed_color
    } else {
        colors
            .and_then(|palette| palette.resolve(vertex.color_index))
            .unwrap_or(face_color)
    }
}
