// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Intermediate materials and their deduplication
//!
//! Faces reference a material palette entry, a texture, a detail texture,
//! a transparency and a light mode. Faces agreeing on all five share one
//! [`IntermediateMaterial`], handed out by a [`MaterialBank`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::graph::{NodeKey, SceneGraph};
use crate::log::{DiagnosticKind, ImportLog};
use crate::palette::{ColorPalette, MaterialEntry, Palettes, TextureCodec, TextureEntry};
use crate::records::{Face, LightMode};
use crate::resolve::FileResolver;

/// Palettes visible from one database, most authoritative first.
///
/// A sub-database loaded with a palette override flag looks up entries in
/// the referencing database before its own.
#[derive(Debug, Clone)]
pub struct PaletteLookup<'a> {
    materials: Vec<&'a Palettes>,
    textures: Vec<&'a Palettes>,
    colors: Vec<&'a Palettes>,
}

impl<'a> PaletteLookup<'a> {
    /// Lookup over a single database's palettes
    pub fn single(palettes: &'a Palettes) -> Self {
        Self {
            materials: vec![palettes],
            textures: vec![palettes],
            colors: vec![palettes],
        }
    }

    /// Lookup for database node `database`, following override flags upward
    pub fn for_database(graph: &'a SceneGraph, database: NodeKey) -> Option<Self> {
        let db = graph.get(database)?.as_database()?;
        let mut lookup = Self::single(&db.palettes);

        let (mut materials, mut textures, mut colors) =
            (db.overrides_materials(), db.overrides_textures(), db.overrides_colors());
        let mut current = db;
        while let Some(parent) = current
            .parent_database
            .and_then(|k| graph.get(k))
            .and_then(|n| n.as_database())
        {
            if !(materials || textures || colors) {
                break;
            }
            if materials {
                lookup.materials.insert(0, &parent.palettes);
            }
            if textures {
                lookup.textures.insert(0, &parent.palettes);
            }
            if colors {
                lookup.colors.insert(0, &parent.palettes);
            }
            materials &= parent.overrides_materials();
            textures &= parent.overrides_textures();
            colors &= parent.overrides_colors();
            current = parent;
        }
        Some(lookup)
    }

    pub fn material(&self, index: i32) -> Option<&'a MaterialEntry> {
        self.materials.iter().find_map(|p| p.material(index))
    }

    pub fn texture(&self, index: i32) -> Option<&'a TextureEntry> {
        self.textures.iter().find_map(|p| p.texture(index))
    }

    pub fn colors(&self) -> Option<&'a ColorPalette> {
        self.colors.iter().find_map(|p| p.colors.as_ref())
    }
}

/// Everything that makes two faces look different
#[derive(Debug, Clone, Default)]
pub struct MaterialKey {
    pub material: Option<MaterialEntry>,
    pub main_texture: Option<TextureEntry>,
    pub detail_texture: Option<TextureEntry>,
    pub transparency: u16,
    pub light_mode: LightMode,
}

impl PartialEq for MaterialKey {
    fn eq(&self, other: &Self) -> bool {
        let same_material = match (&self.material, &other.material) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                a.index == b.index && a.name == b.name && a.same_appearance(b)
            }
            _ => false,
        };
        same_material
            && self.main_texture == other.main_texture
            && self.detail_texture == other.detail_texture
            && self.transparency == other.transparency
            && self.light_mode == other.light_mode
    }
}

impl MaterialKey {
    /// Resolve the palette indices of `face`.
    ///
    /// `-1` means none. An index missing from the palettes is logged and
    /// treated as none.
    pub fn resolve(face: &Face, palettes: &PaletteLookup<'_>, log: &ImportLog) -> Self {
        let material = lookup_index(face.material, "material", log, |i| palettes.material(i));
        let main_texture = lookup_index(face.texture, "texture", log, |i| palettes.texture(i));
        let detail_texture = lookup_index(face.detail_texture, "detail texture", log, |i| {
            palettes.texture(i)
        });

        Self {
            material: material.cloned(),
            main_texture: main_texture.cloned(),
            detail_texture: detail_texture.cloned(),
            transparency: face.transparency,
            light_mode: face.light_mode,
        }
    }
}

fn lookup_index<'a, T>(
    index: i16,
    what: &str,
    log: &ImportLog,
    get: impl FnOnce(i32) -> Option<&'a T>,
) -> Option<&'a T> {
    if index < 0 {
        return None;
    }
    let found = get(index as i32);
    if found.is_none() {
        log.warn(
            DiagnosticKind::UnresolvedReference,
            format!("Could not find {} index {} in the palette", what, index),
        );
    }
    found
}

/// A texture file located on disk
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResolvedTexture {
    pub path: PathBuf,
    pub codec: TextureCodec,
}

/// Deduplicated material shared by every face with the same key
#[derive(Debug, Clone)]
pub struct IntermediateMaterial {
    /// Registration order within the bank
    pub id: usize,
    pub material: Option<MaterialEntry>,
    pub main_texture: Option<TextureEntry>,
    pub detail_texture: Option<TextureEntry>,
    pub transparency: u16,
    pub light_mode: LightMode,
}

impl IntermediateMaterial {
    pub fn key(&self) -> MaterialKey {
        MaterialKey {
            material: self.material.clone(),
            main_texture: self.main_texture.clone(),
            detail_texture: self.detail_texture.clone(),
            transparency: self.transparency,
            light_mode: self.light_mode,
        }
    }

    pub fn matches(&self, key: &MaterialKey) -> bool {
        self.key() == *key
    }

    /// Display name derived from the palette entries
    pub fn name(&self) -> String {
        let mut name = match &self.material {
            Some(m) if !m.name.is_empty() => m.name.clone(),
            Some(m) => format!("material_{}", m.index),
            None => "default".to_string(),
        };
        if let Some(tex) = &self.main_texture {
            let file = Path::new(&tex.file_name.replace('\\', "/"))
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            name.push('_');
            name.push_str(&file);
        }
        name
    }

    /// Opacity combining face transparency and material alpha
    pub fn alpha(&self) -> f32 {
        let face = 1.0 - self.transparency as f32 / u16::MAX as f32;
        let material = self.material.as_ref().map_or(1.0, |m| m.alpha);
        face * material
    }

    pub fn is_transparent(&self) -> bool {
        self.alpha() < 1.0
    }

    /// Locate the main and detail texture files on disk.
    ///
    /// Files that cannot be found are logged and returned as `None`.
    pub fn texture_paths(
        &self,
        resolver: &FileResolver,
        relative_to: Option<&Path>,
        log: &ImportLog,
    ) -> (Option<ResolvedTexture>, Option<ResolvedTexture>) {
        let locate = |entry: &Option<TextureEntry>| {
            let entry = entry.as_ref()?;
            match resolver.find(&entry.file_name, relative_to) {
                Some(path) => Some(ResolvedTexture {
                    codec: TextureCodec::from_path(&path),
                    path,
                }),
                None => {
                    log.warn(
                        DiagnosticKind::UnresolvedReference,
                        format!("Could not find texture file: {}", entry.file_name),
                    );
                    None
                }
            }
        };
        (locate(&self.main_texture), locate(&self.detail_texture))
    }
}

/// Registry of intermediate materials. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MaterialBank {
    materials: Arc<Mutex<Vec<Arc<IntermediateMaterial>>>>,
}

impl MaterialBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing material equal to `key`, or a newly registered one
    pub fn find_or_create(&self, key: &MaterialKey) -> Arc<IntermediateMaterial> {
        let mut materials = self.lock();
        if let Some(existing) = materials.iter().find(|m| m.matches(key)) {
            return Arc::clone(existing);
        }

        let created = Arc::new(IntermediateMaterial {
            id: materials.len(),
            material: key.material.clone(),
            main_texture: key.main_texture.clone(),
            detail_texture: key.detail_texture.clone(),
            transparency: key.transparency,
            light_mode: key.light_mode,
        });
        materials.push(Arc::clone(&created));
        created
    }

    pub fn materials(&self) -> Vec<Arc<IntermediateMaterial>> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether both handles point at the same registry
    pub fn shares_with(&self, other: &MaterialBank) -> bool {
        Arc::ptr_eq(&self.materials, &other.materials)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<IntermediateMaterial>>> {
        self.materials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
