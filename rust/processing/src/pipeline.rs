// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parse and prepare passes for one root database

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use flt_lite_core::{
    CancellationToken, ExternalReferenceBank, FileResolver, ImportLog, ImportSettings,
    IntermediateMaterial, MaterialBank, NodeKey, Parser, ResolvedTexture, SceneGraph,
};
use flt_lite_geometry::{prepare_for_import, PreparedScene};

use crate::error::Result;

/// A parsed and prepared import, ready to be emitted
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub path: PathBuf,
    pub graph: SceneGraph,
    pub root: NodeKey,
    pub prepared: PreparedScene,
    pub log: ImportLog,
    pub references: ExternalReferenceBank,
    /// Every intermediate material of the import, one entry per distinct
    /// material across all banks
    pub materials: Vec<Arc<IntermediateMaterial>>,
    /// Texture files of every textured material, in material order
    pub textures: Vec<MaterialTextures>,
}

impl ImportResult {
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }
}

/// Texture files located for one material
#[derive(Debug, Clone)]
pub struct MaterialTextures {
    pub material: Arc<IntermediateMaterial>,
    pub main: Option<ResolvedTexture>,
    pub detail: Option<ResolvedTexture>,
}

impl MaterialTextures {
    pub fn resolved(&self) -> usize {
        self.main.is_some() as usize + self.detail.is_some() as usize
    }

    /// Texture entries whose file was not found
    pub fn missing(&self) -> usize {
        (self.material.main_texture.is_some() && self.main.is_none()) as usize
            + (self.material.detail_texture.is_some() && self.detail.is_none()) as usize
    }
}

/// Parse `path` and prepare its meshes
pub fn import_file(path: impl AsRef<Path>, settings: &ImportSettings) -> Result<ImportResult> {
    let resolver = FileResolver::new(settings.additional_search_directories.clone());
    import_file_with(path, settings, &resolver, &CancellationToken::new())
}

/// [`import_file`] with a shared resolver and a cancellation token
pub fn import_file_with(
    path: impl AsRef<Path>,
    settings: &ImportSettings,
    resolver: &FileResolver,
    cancel: &CancellationToken,
) -> Result<ImportResult> {
    let path = path.as_ref();
    let start = Instant::now();
    tracing::info!(path = %path.display(), "Starting import");

    let output = Parser::new(settings.clone())
        .with_resolver(resolver.clone())
        .with_cancellation(cancel.clone())
        .parse_file(path)?;
    let parse_time = start.elapsed();

    let prepared = prepare_for_import(&output.graph, &output.log, cancel)?;
    let banks = material_banks(&output.graph, output.root, &output.materials);
    let textures = resolve_textures(&banks, resolver, &output.log);
    let materials: Vec<_> = banks
        .iter()
        .flat_map(|(bank, _)| bank.materials())
        .collect();

    tracing::info!(
        path = %path.display(),
        parse_time_ms = parse_time.as_millis() as u64,
        total_time_ms = start.elapsed().as_millis() as u64,
        meshes = prepared.len(),
        triangles = prepared.triangle_count(),
        materials = materials.len(),
        textures = textures.len(),
        diagnostics = output.log.len(),
        "Import complete"
    );

    Ok(ImportResult {
        path: path.to_path_buf(),
        graph: output.graph,
        root: output.root,
        prepared,
        log: output.log,
        references: output.references,
        materials,
        textures,
    })
}

/// The root bank followed by every unshared sub-database bank, in database
/// order, each with the directory its texture names are relative to
fn material_banks<'g>(
    graph: &'g SceneGraph,
    root: NodeKey,
    root_bank: &'g MaterialBank,
) -> Vec<(&'g MaterialBank, Option<&'g Path>)> {
    let directory = move |key: NodeKey| {
        graph
            .get(key)
            .and_then(|node| node.as_database())
            .and_then(|db| db.path.parent())
    };

    let mut banks = vec![(root_bank, directory(root))];
    for key in graph.databases() {
        if let Some(db) = graph[key].as_database() {
            if !banks.iter().any(|(bank, _)| bank.shares_with(&db.materials)) {
                banks.push((&db.materials, directory(key)));
            }
        }
    }
    banks
}

/// Locate the texture files of every textured material.
///
/// Missing files are logged by [`IntermediateMaterial::texture_paths`].
fn resolve_textures(
    banks: &[(&MaterialBank, Option<&Path>)],
    resolver: &FileResolver,
    log: &ImportLog,
) -> Vec<MaterialTextures> {
    banks
        .iter()
        .flat_map(|&(bank, directory)| {
            bank.materials()
                .into_iter()
                .filter(|m| m.main_texture.is_some() || m.detail_texture.is_some())
                .map(move |material| {
                    let (main, detail) = material.texture_paths(resolver, directory, log);
                    MaterialTextures {
                        material,
                        main,
                        detail,
                    }
                })
        })
        .collect()
}

/// Run [`import_file`] on the blocking thread pool
pub async fn parse_async(path: impl Into<PathBuf>, settings: ImportSettings) -> Result<ImportResult> {
    parse_async_with_cancel(path, settings, CancellationToken::new()).await
}

/// [`parse_async`] that stops early once `cancel` fires
pub async fn parse_async_with_cancel(
    path: impl Into<PathBuf>,
    settings: ImportSettings,
    cancel: CancellationToken,
) -> Result<ImportResult> {
    let path = path.into();
    tokio::task::spawn_blocking(move || {
        let resolver = FileResolver::new(settings.additional_search_directories.clone());
        import_file_with(&path, &settings, &resolver, &cancel)
    })
    .await?
}
