// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bounding volumes and the view frustum used for visibility testing.

use glam::{Mat4, Vec3, Vec4};

/// A sphere enclosing a piece of geometry, used for frustum culling and
/// shadow-camera fitting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Center of the sphere.
    pub center: Vec3,
    /// Radius of the sphere. A negative radius marks an empty sphere.
    pub radius: f32,
}

impl BoundingSphere {
    /// An empty sphere; it never intersects anything.
    pub const EMPTY: Self = Self {
        center: Vec3::ZERO,
        radius: -1.0,
    };

    /// Creates a sphere from its center and radius.
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Computes a sphere from tightly packed `xyz` positions.
    ///
    /// The center is the middle of the positions' axis-aligned bounds and the
    /// radius the farthest position from it.
    pub fn from_positions(positions: &[f32]) -> Self {
        let mut points = positions
            .chunks_exact(3)
            .map(|p| Vec3::new(p[0], p[1], p[2]));
        let Some(first) = points.next() else {
            return Self::EMPTY;
        };
        let (min, max) = points
            .clone()
            .fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        let center = (min + max) * 0.5;
        let radius = std::iter::once(first)
            .chain(points)
            .map(|p| p.distance_squared(center))
            .fold(0.0f32, f32::max)
            .sqrt();
        Self { center, radius }
    }

    /// Returns `true` if the sphere contains no volume.
    pub fn is_empty(&self) -> bool {
        self.radius < 0.0
    }

    /// Returns this sphere transformed by an affine matrix.
    ///
    /// The radius is scaled by the largest axis scale so the result still
    /// encloses the transformed geometry.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let scale = matrix
            .x_axis
            .truncate()
            .length_squared()
            .max(matrix.y_axis.truncate().length_squared())
            .max(matrix.z_axis.truncate().length_squared())
            .sqrt();
        Self {
            center: matrix.transform_point3(self.center),
            radius: self.radius * scale,
        }
    }
}

impl Default for BoundingSphere {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// A plane in Hessian normal form: `normal . p + constant = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal of the plane.
    pub normal: Vec3,
    /// Signed distance from the origin along the normal.
    pub constant: f32,
}

impl Plane {
    /// Creates a plane from a normal and constant. The normal is normalized.
    pub fn new(normal: Vec3, constant: f32) -> Self {
        Self::from_vec4(normal.extend(constant))
    }

    /// Creates a normalized plane from packed `(a, b, c, d)` coefficients.
    pub fn from_vec4(v: Vec4) -> Self {
        let length = v.truncate().length();
        if length <= f32::EPSILON {
            return Self {
                normal: Vec3::Z,
                constant: 0.0,
            };
        }
        let v = v / length;
        Self {
            normal: v.truncate(),
            constant: v.w,
        }
    }

    /// Signed distance from `point` to the plane.
    #[inline]
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.constant
    }

    /// Returns the plane transformed by `matrix`.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let point = matrix.transform_point3(self.normal * -self.constant);
        let normal_matrix = matrix.inverse().transpose();
        let normal = normal_matrix.transform_vector3(self.normal).normalize_or_zero();
        Self {
            normal,
            constant: -normal.dot(point),
        }
    }

    /// Packs the plane into `(normal, constant)` for shader upload.
    pub fn to_vec4(&self) -> Vec4 {
        self.normal.extend(self.constant)
    }
}

/// The six planes bounding a camera's visible volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far planes, all facing inwards.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extracts the frustum from a combined `projection * view` matrix.
    pub fn from_matrix(m: &Mat4) -> Self {
        let (r0, r1, r2, r3) = (m.row(0), m.row(1), m.row(2), m.row(3));
        Self {
            planes: [
                Plane::from_vec4(r3 + r0),
                Plane::from_vec4(r3 - r0),
                Plane::from_vec4(r3 + r1),
                Plane::from_vec4(r3 - r1),
                Plane::from_vec4(r3 + r2),
                Plane::from_vec4(r3 - r2),
            ],
        }
    }

    /// Returns `true` if any part of `sphere` lies inside the frustum.
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        if sphere.is_empty() {
            return false;
        }
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(sphere.center) >= -sphere.radius)
    }

    /// Returns `true` if `point` lies inside the frustum.
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(point) >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera_frustum() -> Frustum {
        let projection = Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, 100.0);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        Frustum::from_matrix(&(projection * view))
    }

    #[test]
    fn test_sphere_from_positions() {
        let sphere =
            BoundingSphere::from_positions(&[-1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0]);
        assert_eq!(sphere.center, Vec3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(sphere.radius, 2f32.sqrt(), epsilon = 1e-6);
    }

    #[test]
    fn test_empty_positions_give_empty_sphere() {
        assert!(BoundingSphere::from_positions(&[]).is_empty());
    }

    #[test]
    fn test_sphere_transform_scales_radius() {
        let sphere = BoundingSphere::new(Vec3::ZERO, 1.0);
        let m = Mat4::from_scale_rotation_translation(
            Vec3::new(1.0, 3.0, 2.0),
            glam::Quat::IDENTITY,
            Vec3::new(5.0, 0.0, 0.0),
        );
        let t = sphere.transformed(&m);
        assert_eq!(t.center, Vec3::new(5.0, 0.0, 0.0));
        assert_relative_eq!(t.radius, 3.0);
    }

    #[test]
    fn test_frustum_culls_behind_camera() {
        let frustum = camera_frustum();
        assert!(frustum.intersects_sphere(&BoundingSphere::new(Vec3::ZERO, 0.5)));
        assert!(!frustum.intersects_sphere(&BoundingSphere::new(Vec3::new(0.0, 0.0, 10.0), 0.5)));
        assert!(!frustum.intersects_sphere(&BoundingSphere::new(Vec3::new(0.0, 0.0, -200.0), 1.0)));
    }

    #[test]
    fn test_frustum_partial_overlap_is_visible() {
        let frustum = camera_frustum();
        // Center outside the right plane, radius reaching back in.
        assert!(frustum.intersects_sphere(&BoundingSphere::new(Vec3::new(3.3, 0.0, 0.0), 1.0)));
        assert!(!frustum.contains_point(Vec3::new(3.3, 0.0, 0.0)));
    }

    #[test]
    fn test_plane_distance() {
        let plane = Plane::new(Vec3::new(0.0, 2.0, 0.0), -2.0);
        assert_relative_eq!(plane.distance_to_point(Vec3::new(0.0, 3.0, 0.0)), 2.0);
    }
}
