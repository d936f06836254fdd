// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! FLT-Lite Geometry Processing
//!
//! Turns the faces of a parsed record tree into per-node meshes: ear-clipping
//! triangulation, the Y/Z axis swap, matrix decomposition and the parallel
//! prepare pass.

pub mod error;
pub mod mesh;
pub mod prepare;
pub mod transform;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, UnitQuaternion, Vector2, Vector3};

pub use error::{Error, Result};
pub use mesh::{MeshData, SubMesh};
pub use prepare::{prepare_for_import, PreparedScene};
pub use transform::{swap_yz, Transform};
pub use triangulation::{
    calculate_polygon_normal, ear_clip, polygon_area, project_to_2d, triangulate_face,
    triangulate_polygon,
};
