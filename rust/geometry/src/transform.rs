// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Local transforms from Matrix records
//!
//! OpenFlight is Z-up; scene hosts get coordinates with Y and Z exchanged.
//! Positions, normals and decomposed transforms all go through the same
//! swap.

use nalgebra::{Matrix3, Matrix4, Point3, Rotation3, UnitQuaternion, Vector3};

/// Exchange the Y and Z components
#[inline]
pub fn swap_yz(v: [f64; 3]) -> [f64; 3] {
    [v[0], v[2], v[1]]
}

/// Permutation exchanging Y and Z
#[inline]
fn swap_matrix() -> Matrix3<f64> {
    Matrix3::new(
        1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, //
        0.0, 1.0, 0.0,
    )
}

/// Position, rotation and scale in swapped axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
    pub scale: Vector3<f64>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// Decompose the 16 floats of a Matrix record.
    ///
    /// The record stores the matrix row by row with the translation in the
    /// last row, which is the column-major layout of the transform acting on
    /// column vectors.
    pub fn from_record_matrix(values: &[f32; 16]) -> Self {
        let m = Matrix4::from_iterator(values.iter().map(|&v| v as f64));

        let position = Vector3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
        let scale = Vector3::new(
            m.fixed_view::<1, 3>(0, 0).norm(),
            m.fixed_view::<1, 3>(1, 0).norm(),
            m.fixed_view::<1, 3>(2, 0).norm(),
        );

        // Strip per-axis scale before extracting the rotation
        let mut linear: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
        for mut column in linear.column_iter_mut() {
            let norm = column.norm();
            if norm > f64::EPSILON {
                column /= norm;
            }
        }
        let rotation = Rotation3::from_matrix(&linear);

        Self::from_file_axes(position, rotation, scale)
    }

    /// Convert a transform expressed in file axes
    pub fn from_file_axes(
        position: Vector3<f64>,
        rotation: Rotation3<f64>,
        scale: Vector3<f64>,
    ) -> Self {
        let swap = swap_matrix();
        let swapped = Rotation3::from_matrix_unchecked(swap * rotation.matrix() * swap);
        Self {
            position: Vector3::new(position.x, position.z, position.y),
            rotation: UnitQuaternion::from_rotation_matrix(&swapped),
            scale: Vector3::new(scale.x, scale.z, scale.y),
        }
    }

    pub fn is_identity(&self, epsilon: f64) -> bool {
        self.position.norm() <= epsilon
            && self.rotation.angle() <= epsilon
            && (self.scale - Vector3::new(1.0, 1.0, 1.0)).norm() <= epsilon
    }

    /// Scale, then rotate, then translate
    pub fn to_matrix(&self) -> Matrix4<f64> {
        Matrix4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }

    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        let scaled = Point3::new(p.x * self.scale.x, p.y * self.scale.y, p.z * self.scale.z);
        self.rotation * scaled + self.position
    }
}
