// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use std::sync::Arc;

use flt_lite_core::{IntermediateMaterial, PackedColor};
use nalgebra::Point3;

/// Triangles of one material within a [`MeshData`]
#[derive(Debug, Clone)]
pub struct SubMesh {
    pub material: Arc<IntermediateMaterial>,
    /// Triangle indices (i0, i1, i2) into the owning mesh's vertices
    pub indices: Vec<u32>,
}

impl SubMesh {
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Vertex streams of one mesh-bearing node, in host (Y-up) axes
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f32>,
    /// Vertex normals (nx, ny, nz), zero when the vertex has none
    pub normals: Vec<f32>,
    /// Texture coordinates (u, v), zero when the vertex has none
    pub uvs: Vec<f32>,
    pub colors: Vec<PackedColor>,
    pub sub_meshes: Vec<SubMesh>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a vertex and return its index
    #[inline]
    pub fn add_vertex(
        &mut self,
        position: [f64; 3],
        normal: [f32; 3],
        uv: [f32; 2],
        color: PackedColor,
    ) -> u32 {
        let index = self.vertex_count() as u32;
        self.positions
            .extend(position.iter().map(|&c| c as f32));
        self.normals.extend_from_slice(&normal);
        self.uvs.extend_from_slice(&uv);
        self.colors.push(color);
        index
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.sub_meshes.iter().map(SubMesh::triangle_count).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Whether any vertex index needs more than 16 bits
    pub fn needs_wide_indices(&self) -> bool {
        self.vertex_count() >= u16::MAX as usize
    }

    /// Calculate bounds (min, max)
    pub fn bounds(&self) -> (Point3<f32>, Point3<f32>) {
        if self.is_empty() {
            return (Point3::origin(), Point3::origin());
        }

        let mut min = Point3::new(f32::MAX, f32::MAX, f32::MAX);
        let mut max = Point3::new(f32::MIN, f32::MIN, f32::MIN);

        self.positions.chunks_exact(3).for_each(|chunk| {
            let (x, y, z) = (chunk[0], chunk[1], chunk[2]);
            min.x = min.x.min(x);
            min.y = min.y.min(y);
            min.z = min.z.min(z);
            max.x = max.x.max(x);
            max.y = max.y.max(y);
            max.z = max.z.max(z);
        });

        (min, max)
    }
}
