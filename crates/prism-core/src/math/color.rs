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

//! Defines the `Color` type used by materials, lights and clears.

use std::ops::{Add, Mul};

/// A colour in **linear RGB** space using `f32` components.
///
/// Components may exceed `1.0` for HDR intensities. Opacity is carried
/// separately by the owners of a colour (materials, clear settings).
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[derive(serde::Serialize, serde::Deserialize)]
#[repr(C)]
pub struct Color {
    /// The red component in linear space.
    pub r: f32,
    /// The green component in linear space.
    pub g: f32,
    /// The blue component in linear space.
    pub b: f32,
}

impl Color {
    /// White (`[1.0, 1.0, 1.0]`).
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);
    /// Black (`[0.0, 0.0, 0.0]`).
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);

    /// Creates a new colour from linear components.
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Creates a colour from a packed `0xRRGGBB` sRGB value.
    ///
    /// # Example
    /// ```
    /// use prism_core::math::Color;
    /// assert_eq!(Color::from_hex(0xffffff), Color::WHITE);
    /// ```
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
        Self::new(channel(16), channel(8), channel(0))
    }

    /// Returns the components as an array.
    #[inline]
    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Returns the components as a vector.
    #[inline]
    pub fn to_vec3(self) -> glam::Vec3 {
        glam::Vec3::new(self.r, self.g, self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Add for Color {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

impl Mul<f32> for Color {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.r * rhs, self.g * rhs, self.b * rhs)
    }
}

#[inline]
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_hex_extremes() {
        assert_eq!(Color::from_hex(0x000000), Color::BLACK);
        assert_eq!(Color::from_hex(0xffffff), Color::WHITE);
    }

    #[test]
    fn test_from_hex_is_linearized() {
        let c = Color::from_hex(0x808080);
        assert_relative_eq!(c.r, 0.2158605, epsilon = 1e-5);
        assert_eq!(c.r, c.g);
        assert_eq!(c.g, c.b);
    }

    #[test]
    fn test_scale_and_add() {
        let c = Color::new(0.5, 0.25, 1.0) * 2.0 + Color::new(0.0, 0.5, 0.0);
        assert_eq!(c, Color::new(1.0, 1.0, 2.0));
    }
}
