// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! External reference deduplication
//!
//! The first reference to a file owns it and parses the sub-database; every
//! later reference to the same resolved path is an alias of that owner.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;

use crate::graph::NodeKey;

/// Resolved path -> owning reference node, one per import. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ExternalReferenceBank {
    owners: Arc<Mutex<FxHashMap<PathBuf, NodeKey>>>,
}

impl ExternalReferenceBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    /// Register `node` as the owner of `path`.
    ///
    /// Returns `false` and leaves the bank unchanged when the path already
    /// has an owner.
    pub fn add(&self, path: impl Into<PathBuf>, node: NodeKey) -> bool {
        let mut owners = self.lock();
        let path = path.into();
        if owners.contains_key(&path) {
            return false;
        }
        owners.insert(path, node);
        true
    }

    /// Register `node` unless the path is taken; returns the owner either way
    pub fn claim(&self, path: impl Into<PathBuf>, node: NodeKey) -> NodeKey {
        *self.lock().entry(path.into()).or_insert(node)
    }

    /// Drop every entry owned by one of `nodes`, returning how many went.
    ///
    /// Used when a partially parsed sub-database is discarded, so the next
    /// reference to one of its files becomes the owner again.
    pub fn forget(&self, nodes: &[NodeKey]) -> usize {
        let mut owners = self.lock();
        let before = owners.len();
        owners.retain(|_, owner| !nodes.contains(owner));
        before - owners.len()
    }

    /// Whether `node` is the registered owner of `path`
    pub fn contains_me(&self, path: &Path, node: NodeKey) -> bool {
        self.lock().get(path) == Some(&node)
    }

    pub fn get(&self, path: &Path) -> Option<NodeKey> {
        self.lock().get(path).copied()
    }

    /// All (path, owner) pairs, sorted by path
    pub fn owners(&self) -> Vec<(PathBuf, NodeKey)> {
        let mut owners: Vec<_> = self
            .lock()
            .iter()
            .map(|(path, key)| (path.clone(), *key))
            .collect();
        owners.sort_by(|a, b| a.0.cmp(&b.0));
        owners
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, FxHashMap<PathBuf, NodeKey>> {
        self.owners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_first_add_wins() {
        let mut keys: SlotMap<NodeKey, ()> = SlotMap::with_key();
        let (a, b) = (keys.insert(()), keys.insert(()));
        let path = Path::new("/db/tree.flt");

        let bank = ExternalReferenceBank::new();
        assert!(bank.add(path, a));
        assert!(!bank.add(path, b));
        assert!(bank.contains(path));
        assert!(bank.contains_me(path, a));
        assert!(!bank.contains_me(path, b));
        assert_eq!(bank.get(path), Some(a));
        assert_eq!(bank.claim(path, b), a);
        assert_eq!(bank.owners().len(), 1);
    }

    #[test]
    fn test_clones_share_owners() {
        let mut keys: SlotMap<NodeKey, ()> = SlotMap::with_key();
        let a = keys.insert(());
        let bank = ExternalReferenceBank::new();
        let shared = bank.clone();
        shared.add("/db/house.flt", a);
        assert!(bank.contains(Path::new("/db/house.flt")));
        assert!(!bank.contains(Path::new("/db/other.flt")));
    }

    #[test]
    fn test_forget_releases_paths() {
        let mut keys: SlotMap<NodeKey, ()> = SlotMap::with_key();
        let (a, b, c) = (keys.insert(()), keys.insert(()), keys.insert(()));
        let bank = ExternalReferenceBank::new();
        bank.add("/db/a.flt", a);
        bank.add("/db/b.flt", b);

        assert_eq!(bank.forget(&[b, c]), 1);
        assert!(bank.contains(Path::new("/db/a.flt")));
        assert!(!bank.contains(Path::new("/db/b.flt")));
        assert_eq!(bank.claim("/db/b.flt", c), c);
    }
}
