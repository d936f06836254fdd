// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parallel import of independent root databases

use std::path::{Path, PathBuf};

use flt_lite_core::{CancellationToken, FileResolver, ImportSettings};
use rayon::prelude::*;

use crate::error::Result;
use crate::pipeline::{import_file_with, ImportResult};

/// Import every path in parallel, in input order.
///
/// The imports share one [`FileResolver`] so directories learned by one
/// file speed up the others. Nothing else is shared.
pub fn import_many<P>(paths: &[P], settings: &ImportSettings) -> Vec<(PathBuf, Result<ImportResult>)>
where
    P: AsRef<Path> + Sync,
{
    import_many_with(paths, settings, &CancellationToken::new())
}

pub fn import_many_with<P>(
    paths: &[P],
    settings: &ImportSettings,
    cancel: &CancellationToken,
) -> Vec<(PathBuf, Result<ImportResult>)>
where
    P: AsRef<Path> + Sync,
{
    let resolver = FileResolver::new(settings.additional_search_directories.clone());
    tracing::info!(files = paths.len(), "Starting batch import");

    paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            let result = import_file_with(path, settings, &resolver, cancel);
            if let Err(err) = &result {
                tracing::warn!(path = %path.display(), error = %err, "Import failed");
            }
            (path.to_path_buf(), result)
        })
        .collect()
}
