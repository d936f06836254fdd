// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon triangulation utilities
//!
//! Faces are planar polygons of arbitrary vertex count. Triangles are taken
//! as they are; larger polygons are projected onto their plane and cut with
//! a bounded ear-clipping pass.

use smallvec::SmallVec;

use crate::{Error, Point2, Point3, Result, Vector3};

/// Minimum doubled ear area
const EAR_EPSILON: f64 = 1e-12;

/// Signed area, positive for counter-clockwise winding
#[inline]
pub fn polygon_area(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    let mut prev = n - 1;
    for (curr, p) in points.iter().enumerate() {
        let q = &points[prev];
        area += q.x * p.y - p.x * q.y;
        prev = curr;
    }
    area * 0.5
}

/// Strict containment: points on an edge are outside
#[inline]
fn inside_triangle(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>, p: &Point2<f64>) -> bool {
    let ab_p = (c.x - b.x) * (p.y - b.y) - (c.y - b.y) * (p.x - b.x);
    let ca_p = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    let bc_p = (a.x - c.x) * (p.y - c.y) - (a.y - c.y) * (p.x - c.x);
    ab_p > 0.0 && ca_p > 0.0 && bc_p > 0.0
}

fn is_ear(points: &[Point2<f64>], remaining: &[usize], u: usize, v: usize, w: usize) -> bool {
    let a = &points[remaining[u]];
    let b = &points[remaining[v]];
    let c = &points[remaining[w]];

    let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    if cross <= EAR_EPSILON {
        return false;
    }

    remaining
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != u && i != v && i != w)
        .all(|(_, &p)| !inside_triangle(a, b, c, &points[p]))
}

/// Ear-clip a simple polygon.
///
/// Returns flat triangle indices into `points`, every triangle wound
/// counter-clockwise. Gives up after `2 * n` consecutive misses, so
/// degenerate input yields a partial or empty list.
pub fn ear_clip(points: &[Point2<f64>]) -> Vec<usize> {
    let n = points.len();
    let mut indices = Vec::with_capacity(n.saturating_sub(2) * 3);
    if n < 3 {
        return indices;
    }

    let mut remaining: SmallVec<[usize; 16]> = if polygon_area(points) > 0.0 {
        (0..n).collect()
    } else {
        (0..n).rev().collect()
    };

    let mut attempts = 2 * n;
    let mut v = n - 1;
    while remaining.len() > 2 {
        if attempts == 0 {
            break;
        }
        attempts -= 1;

        let nv = remaining.len();
        let u = if v >= nv { 0 } else { v };
        v = if u + 1 >= nv { 0 } else { u + 1 };
        let w = if v + 1 >= nv { 0 } else { v + 1 };

        if is_ear(points, &remaining, u, v, w) {
            indices.extend_from_slice(&[remaining[u], remaining[v], remaining[w]]);
            remaining.remove(v);
            attempts = 2 * remaining.len();
        }
    }

    indices
}

/// Triangulate a 2D polygon, rejecting fewer than three points
pub fn triangulate_polygon(points: &[Point2<f64>]) -> Result<Vec<usize>> {
    if points.len() < 3 {
        return Err(Error::Triangulation(
            "Need at least 3 points to triangulate".to_string(),
        ));
    }
    Ok(ear_clip(points))
}

/// Triangulate one face given its positions in file axes.
///
/// `normal_hint` is the sum of the vertex normals; when it vanishes the
/// polygon's own normal is used. Triangles come out in reversed winding,
/// matching the Y/Z swap applied to the vertices.
pub fn triangulate_face(positions: &[Point3<f64>], normal_hint: &Vector3<f64>) -> Vec<u32> {
    match positions.len() {
        0..=2 => Vec::new(),
        3 => vec![2, 1, 0],
        _ => {
            let normal = normal_hint
                .try_normalize(1e-10)
                .unwrap_or_else(|| calculate_polygon_normal(positions));
            let (points, _, _, _) = project_to_2d(positions, &normal);
            ear_clip(&points)
                .chunks_exact(3)
                .flat_map(|tri| [tri[2] as u32, tri[1] as u32, tri[0] as u32])
                .collect()
        }
    }
}

/// Project 3D points onto the plane perpendicular to `normal`.
///
/// Returns the 2D points with the `(u, v)` basis and origin used. The basis
/// is right-handed around `normal`, so counter-clockwise loops stay
/// counter-clockwise.
pub fn project_to_2d(
    points_3d: &[Point3<f64>],
    normal: &Vector3<f64>,
) -> (Vec<Point2<f64>>, Vector3<f64>, Vector3<f64>, Point3<f64>) {
    if points_3d.is_empty() {
        return (
            Vec::new(),
            Vector3::zeros(),
            Vector3::zeros(),
            Point3::origin(),
        );
    }

    let origin = points_3d[0];

    // Axis least parallel to the normal gives a stable cross product
    let abs_x = normal.x.abs();
    let abs_y = normal.y.abs();
    let abs_z = normal.z.abs();

    let reference = if abs_x <= abs_y && abs_x <= abs_z {
        Vector3::new(1.0, 0.0, 0.0)
    } else if abs_y <= abs_z {
        Vector3::new(0.0, 1.0, 0.0)
    } else {
        Vector3::new(0.0, 0.0, 1.0)
    };

    let u_axis = normal.cross(&reference).normalize();
    let v_axis = normal.cross(&u_axis).normalize();

    let points_2d = points_3d
        .iter()
        .map(|p| {
            let v = p - origin;
            Point2::new(v.dot(&u_axis), v.dot(&v_axis))
        })
        .collect();

    (points_2d, u_axis, v_axis, origin)
}

/// Unit normal of a polygon, `+Z` for degenerate input
pub fn calculate_polygon_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let n = points.len();

    if n < 3 {
        return Vector3::new(0.0, 0.0, 1.0);
    }

    if n == 3 {
        let normal = (points[1] - points[0]).cross(&(points[2] - points[0]));
        return normal
            .try_normalize(1e-10)
            .unwrap_or_else(|| Vector3::new(0.0, 0.0, 1.0));
    }

    // Newell's method
    let mut normal = Vector3::<f64>::zeros();
    for i in 0..n {
        let current = &points[i];
        let next = &points[(i + 1) % n];

        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }

    normal
        .try_normalize(1e-10)
        .unwrap_or_else(|| Vector3::new(0.0, 0.0, 1.0))
}
