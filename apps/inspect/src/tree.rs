// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Indented outline of an emitted scene.

use std::fmt::Write;

use flt_lite_core::RecordKind;
use flt_lite_geometry::MeshData;
use flt_lite_processing::{NodeInfo, SceneEmitter};

#[derive(Debug, Clone)]
pub struct TreeHandle {
    depth: usize,
    label: String,
}

/// [`SceneEmitter`] that renders one line per node.
#[derive(Debug, Default)]
pub struct TreePrinter {
    out: String,
}

impl TreePrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn line(&mut self, depth: usize, text: &str) {
        let _ = writeln!(self.out, "{:indent$}{}", "", text, indent = depth * 2);
    }
}

fn label(info: &NodeInfo<'_>) -> String {
    let mut label = format!("{} {}", info.opcode.name(), info.id);
    match &info.node.kind {
        RecordKind::Lod(lod) => {
            let _ = write!(label, " [in {} out {}]", lod.switch_in, lod.switch_out);
        }
        RecordKind::Switch(switch) => {
            let _ = write!(label, " [mask {}]", switch.current_mask);
        }
        _ => {}
    }
    if !info.transform.is_identity(1e-9) {
        let p = info.transform.position;
        let _ = write!(label, " @ ({:.3}, {:.3}, {:.3})", p.x, p.y, p.z);
    }
    label
}

impl SceneEmitter for TreePrinter {
    type Handle = TreeHandle;

    fn create_node(&mut self, parent: Option<&TreeHandle>, info: &NodeInfo<'_>) -> TreeHandle {
        let depth = parent.map_or(0, |p| p.depth + 1);
        let label = label(info);
        self.line(depth, &label);
        TreeHandle { depth, label }
    }

    fn attach_mesh(&mut self, node: &TreeHandle, mesh: &MeshData) {
        let text = format!(
            "mesh: {} vertices, {} triangles, {} material(s)",
            mesh.vertex_count(),
            mesh.triangle_count(),
            mesh.sub_meshes.len()
        );
        self.line(node.depth + 1, &text);
    }

    fn create_instance(
        &mut self,
        parent: Option<&TreeHandle>,
        owner: &TreeHandle,
        info: &NodeInfo<'_>,
    ) -> TreeHandle {
        let depth = parent.map_or(0, |p| p.depth + 1);
        let label = format!("{} -> instance of {}", label(info), owner.label);
        self.line(depth, &label);
        TreeHandle { depth, label }
    }
}
