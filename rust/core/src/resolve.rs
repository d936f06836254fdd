// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! File resolution for external references and textures
//!
//! Paths written into OpenFlight files are frequently stale: absolute paths
//! from another machine, or relative paths against a directory layout that
//! no longer exists. [`FileResolver`] tries the path as written, then
//! against every directory known to the import, then just the file name in
//! those directories. Directories of successfully resolved files are learned
//! so later lookups find their siblings.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use rustc_hash::FxHashMap;

/// Resolver shared by every database of one import. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FileResolver {
    inner: Arc<ResolverInner>,
}

#[derive(Debug, Default)]
struct ResolverInner {
    /// Search roots given at construction, never modified
    roots: Vec<PathBuf>,
    state: Mutex<ResolverState>,
}

#[derive(Debug, Default)]
struct ResolverState {
    /// Directories learned while resolving, in discovery order
    learned: Vec<PathBuf>,
    /// (requesting directory, requested name) -> resolved path
    cache: FxHashMap<(Option<PathBuf>, String), PathBuf>,
}

impl FileResolver {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            inner: Arc::new(ResolverInner {
                roots: roots.into_iter().map(Into::into).collect(),
                state: Mutex::new(ResolverState::default()),
            }),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.inner.roots
    }

    /// Learned directories followed by the search roots
    pub fn known_directories(&self) -> Vec<PathBuf> {
        let state = self.lock();
        let mut dirs = state.learned.clone();
        for root in &self.inner.roots {
            if !dirs.contains(root) {
                dirs.push(root.clone());
            }
        }
        dirs
    }

    /// Remember a directory to search
    pub fn add_directory(&self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        let mut state = self.lock();
        if !state.learned.contains(&dir) {
            state.learned.push(dir);
        }
    }

    /// Resolve `name` as written in a file located in `relative_to`.
    ///
    /// Returns a canonical path, or `None` when nothing on disk matches.
    pub fn find(&self, name: &str, relative_to: Option<&Path>) -> Option<PathBuf> {
        let name = normalize_separators(name);
        if name.is_empty() {
            return None;
        }

        let key = (relative_to.map(Path::to_path_buf), name.clone());
        if let Some(hit) = self.lock().cache.get(&key) {
            return Some(hit.clone());
        }

        let requested = Path::new(&name);
        let mut dirs = Vec::new();
        if let Some(dir) = relative_to {
            dirs.push(dir.to_path_buf());
        }
        for dir in self.known_directories() {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }

        let found = if requested.has_root() {
            requested.is_file().then(|| requested.to_path_buf())
        } else {
            dirs.iter()
                .map(|dir| dir.join(requested))
                .find(|candidate| candidate.is_file())
        }
        .or_else(|| {
            let file_name = requested.file_name()?;
            dirs.iter()
                .map(|dir| dir.join(file_name))
                .find(|candidate| candidate.is_file())
        })?;

        let resolved = std::fs::canonicalize(&found).unwrap_or(found);
        if let Some(parent) = resolved.parent() {
            self.add_directory(parent);
        }
        self.lock().cache.insert(key, resolved.clone());
        Some(resolved)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ResolverState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Paths authored on Windows use backslashes
fn normalize_separators(name: &str) -> String {
    let trimmed = name.trim();
    if cfg!(windows) {
        trimmed.to_string()
    } else {
        trimmed.replace('\\', "/")
    }
}
