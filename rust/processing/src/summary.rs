// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Serializable import statistics

use std::collections::BTreeMap;
use std::fmt;

use flt_lite_core::{Diagnostic, ReferenceRole, Severity};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pipeline::ImportResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceCounts {
    pub owners: usize,
    pub aliases: usize,
    pub broken: usize,
    pub skipped: usize,
}

/// Texture files referenced by the materials of an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureCounts {
    pub resolved: usize,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub file: String,
    pub databases: usize,
    pub nodes: usize,
    /// Node count per record name
    pub records: BTreeMap<String, usize>,
    pub faces: usize,
    pub meshes: usize,
    pub vertices: usize,
    pub triangles: usize,
    pub materials: usize,
    pub textures: TextureCounts,
    pub references: ReferenceCounts,
    pub diagnostics: Vec<Diagnostic>,
}

impl ImportSummary {
    pub fn from_result(result: &ImportResult) -> Self {
        let graph = &result.graph;
        let mut records: BTreeMap<String, usize> = BTreeMap::new();
        let mut references = ReferenceCounts::default();
        let mut faces = 0;

        for (_, node) in graph.iter() {
            *records.entry(node.opcode.name().to_string()).or_default() += 1;
            if node.as_face().is_some() {
                faces += 1;
            }
            if let Some(xref) = node.as_reference() {
                match xref.role {
                    ReferenceRole::Owner => references.owners += 1,
                    ReferenceRole::Alias { .. } => references.aliases += 1,
                    ReferenceRole::Broken => references.broken += 1,
                    ReferenceRole::Skipped => references.skipped += 1,
                }
            }
        }

        Self {
            file: result.path.display().to_string(),
            databases: graph.databases().len(),
            nodes: graph.len(),
            records,
            faces,
            meshes: result.prepared.len(),
            vertices: result.prepared.vertex_count(),
            triangles: result.prepared.triangle_count(),
            materials: result.materials.len(),
            textures: TextureCounts {
                resolved: result.textures.iter().map(|t| t.resolved()).sum(),
                missing: result.textures.iter().map(|t| t.missing()).sum(),
            },
            references,
            diagnostics: result.log.entries(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.file)?;
        writeln!(
            f,
            "  databases: {}  nodes: {}  faces: {}",
            self.databases, self.nodes, self.faces
        )?;
        writeln!(
            f,
            "  meshes: {}  vertices: {}  triangles: {}  materials: {}",
            self.meshes, self.vertices, self.triangles, self.materials
        )?;
        writeln!(
            f,
            "  textures: {} found, {} missing",
            self.textures.resolved, self.textures.missing
        )?;
        writeln!(
            f,
            "  references: {} owner(s), {} alias(es), {} broken, {} skipped",
            self.references.owners,
            self.references.aliases,
            self.references.broken,
            self.references.skipped
        )?;
        for (name, count) in &self.records {
            writeln!(f, "    {:<24} {}", name, count)?;
        }
        write!(
            f,
            "  diagnostics: {} error(s), {} warning(s)",
            self.count(Severity::Error),
            self.count(Severity::Warning)
        )
    }
}
