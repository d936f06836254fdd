// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-backed record tree
//!
//! One import produces one [`SceneGraph`]: the root database plus every
//! sub-database loaded through external references, linked as a forest
//! under the reference nodes. Parents own their children through ordered
//! key lists; the `parent` key on each node is a non-owning back reference.
//! Dropping the graph drops the whole tree.

use slotmap::{new_key_type, SlotMap};

use crate::opcode::Opcode;
use crate::records::{Database, Node};

new_key_type! {
    /// Key for a record node
    pub struct NodeKey;
}

#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    pub(crate) nodes: SlotMap<NodeKey, Node>,
    root: Option<NodeKey>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root: None,
        }
    }

    /// Root database of the import
    pub fn root(&self) -> Option<NodeKey> {
        self.root
    }

    pub(crate) fn set_root(&mut self, key: NodeKey) {
        self.root = Some(key);
    }

    #[inline]
    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    /// Insert a node and append it to `parent`'s children
    pub fn insert(&mut self, mut node: Node, parent: Option<NodeKey>) -> NodeKey {
        node.parent = parent;
        let key = self.nodes.insert(node);
        if let Some(parent) = parent {
            if let Some(p) = self.nodes.get_mut(parent) {
                p.children.push(key);
            }
        }
        key
    }

    /// Detach `key` from its parent and drop it with all descendants
    pub fn remove_subtree(&mut self, key: NodeKey) {
        if let Some(parent) = self.parent(key) {
            if let Some(p) = self.nodes.get_mut(parent) {
                p.children.retain(|&c| c != key);
            }
        }
        let doomed: Vec<_> = self.depth_first(key).collect();
        for k in doomed {
            self.nodes.remove(k);
        }
        if self.root == Some(key) {
            self.root = None;
        }
    }

    /// Ordered children, empty for unknown keys
    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.nodes
            .get(key)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(key)?.parent
    }

    /// Database record the node was read from
    pub fn database_of(&self, key: NodeKey) -> Option<&Database> {
        let db = self.nodes.get(key)?.database;
        self.nodes.get(db)?.as_database()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &Node)> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Keys of every database record, root first, in load order
    pub fn databases(&self) -> Vec<NodeKey> {
        match self.root {
            Some(root) => self
                .depth_first(root)
                .filter(|&k| self.nodes[k].as_database().is_some())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Nodes with the given opcode, in tree order
    pub fn find_by_opcode(&self, opcode: Opcode) -> Vec<NodeKey> {
        match self.root {
            Some(root) => self
                .depth_first(root)
                .filter(|&k| self.nodes[k].opcode == opcode)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Pre-order walk starting at `key`
    pub fn depth_first(&self, key: NodeKey) -> DepthFirst<'_> {
        let stack = if self.nodes.contains_key(key) {
            vec![key]
        } else {
            Vec::new()
        };
        DepthFirst { graph: self, stack }
    }

    /// Number of ancestors above `key`
    pub fn depth(&self, key: NodeKey) -> usize {
        let mut depth = 0;
        let mut current = self.parent(key);
        while let Some(p) = current {
            depth += 1;
            current = self.parent(p);
        }
        depth
    }
}

impl std::ops::Index<NodeKey> for SceneGraph {
    type Output = Node;

    fn index(&self, key: NodeKey) -> &Node {
        &self.nodes[key]
    }
}

impl std::ops::IndexMut<NodeKey> for SceneGraph {
    fn index_mut(&mut self, key: NodeKey) -> &mut Node {
        &mut self.nodes[key]
    }
}

/// Pre-order iterator returned by [`SceneGraph::depth_first`]
pub struct DepthFirst<'a> {
    graph: &'a SceneGraph,
    stack: Vec<NodeKey>,
}

impl Iterator for DepthFirst<'_> {
    type Item = NodeKey;

    fn next(&mut self) -> Option<NodeKey> {
        let key = self.stack.pop()?;
        self.stack
            .extend(self.graph.children(key).iter().rev().copied());
        Some(key)
    }
}
