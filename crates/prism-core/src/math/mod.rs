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

//! Provides the math primitives used across the renderer.
//!
//! Vectors, matrices and quaternions come from `glam`; this module adds the
//! bounding volumes and the view frustum needed for culling, plus the linear
//! colour type used by materials and lights.

/// A small constant for floating-point comparisons.
pub const EPSILON: f32 = 1e-5;

pub use std::f32::consts::{FRAC_PI_2, PI};

pub mod bounds;
pub mod color;

pub use self::bounds::{BoundingSphere, Frustum, Plane};
pub use self::color::Color;
pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

/// Converts an angle from degrees to radians.
///
/// # Examples
///
/// ```
/// use prism_core::math::{degrees_to_radians, PI};
/// assert_eq!(degrees_to_radians(180.0), PI);
/// ```
#[inline]
pub fn degrees_to_radians(degrees: f32) -> f32 {
    degrees * (PI / 180.0)
}

/// Returns `true` if `value` is a power of two.
#[inline]
pub fn is_power_of_two(value: u32) -> bool {
    value != 0 && value & (value - 1) == 0
}
