// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Emit pass
//!
//! Walks the prepared graph depth-first and hands every interior node to a
//! host-provided [`SceneEmitter`]. Faces and vertex lists are folded into the
//! meshes of their parents and never emitted on their own.

use flt_lite_core::{CancellationToken, Node, NodeKey, Opcode};
use flt_lite_geometry::{MeshData, Transform};
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::pipeline::ImportResult;

/// What a host needs to create one scene object
#[derive(Debug, Clone)]
pub struct NodeInfo<'a> {
    pub key: NodeKey,
    pub id: &'a str,
    pub opcode: Opcode,
    pub comment: Option<&'a str>,
    /// Local transform in host axes
    pub transform: Transform,
    pub node: &'a Node,
}

impl<'a> NodeInfo<'a> {
    fn new(key: NodeKey, node: &'a Node) -> Self {
        Self {
            key,
            id: &node.id,
            opcode: node.opcode,
            comment: node.comment.as_deref(),
            transform: node
                .matrix
                .as_ref()
                .map(Transform::from_record_matrix)
                .unwrap_or_default(),
            node,
        }
    }
}

/// Host scene construction callbacks.
///
/// Called on the thread running [`emit`], parents before children.
pub trait SceneEmitter {
    type Handle: Clone;

    fn create_node(&mut self, parent: Option<&Self::Handle>, info: &NodeInfo<'_>) -> Self::Handle;

    fn attach_mesh(&mut self, node: &Self::Handle, mesh: &MeshData);

    /// Place another copy of `owner`'s subtree for an alias reference
    fn create_instance(
        &mut self,
        parent: Option<&Self::Handle>,
        owner: &Self::Handle,
        info: &NodeInfo<'_>,
    ) -> Self::Handle;
}

/// Emit the whole import, returning the root handle
pub fn emit<E: SceneEmitter>(result: &ImportResult, emitter: &mut E) -> Result<Option<E::Handle>> {
    emit_with_cancel(result, emitter, &CancellationToken::new())
}

/// [`emit`] that checks `cancel` before each node
pub fn emit_with_cancel<E: SceneEmitter>(
    result: &ImportResult,
    emitter: &mut E,
    cancel: &CancellationToken,
) -> Result<Option<E::Handle>> {
    let graph = &result.graph;
    if graph.get(result.root).is_none() {
        return Ok(None);
    }

    let mut handles: FxHashMap<NodeKey, E::Handle> = FxHashMap::default();
    let mut root_handle = None;
    let mut stack: Vec<(NodeKey, Option<E::Handle>)> = vec![(result.root, None)];

    while let Some((key, parent)) = stack.pop() {
        cancel.check()?;
        let node = &graph[key];
        if !node.is_interior() {
            continue;
        }
        let info = NodeInfo::new(key, node);

        let owner = node
            .as_reference()
            .and_then(|xref| xref.owner())
            .and_then(|owner| handles.get(&owner).cloned());
        let handle = match owner {
            Some(owner) => emitter.create_instance(parent.as_ref(), &owner, &info),
            None => emitter.create_node(parent.as_ref(), &info),
        };

        if let Some(mesh) = result.prepared.get(key) {
            emitter.attach_mesh(&handle, mesh);
        }

        if node.as_reference().is_some_and(|xref| xref.is_owner()) {
            handles.insert(key, handle.clone());
        }
        if root_handle.is_none() {
            root_handle = Some(handle.clone());
        }

        for &child in graph.children(key).iter().rev() {
            stack.push((child, Some(handle.clone())));
        }
    }

    Ok(root_handle)
}
