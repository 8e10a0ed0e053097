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

//! Light sources and their shadow configuration.

use super::asset::{Asset, AssetId};
use crate::math::{Color, Vec3};

/// The shape of a light's emission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightType {
    /// Uniform light from every direction.
    Ambient,
    /// Parallel rays, like the sun. The light shines from its position
    /// towards `target`.
    Directional {
        /// World-space point the light aims at.
        target: Vec3,
    },
    /// Omnidirectional light from a point.
    Point {
        /// Cut-off distance (0 = infinite).
        distance: f32,
        /// Physical falloff exponent.
        decay: f32,
    },
    /// A cone of light.
    Spot {
        /// World-space point the cone aims at.
        target: Vec3,
        /// Cut-off distance (0 = infinite).
        distance: f32,
        /// Half-angle of the cone in radians.
        angle: f32,
        /// Fraction of the cone attenuated at its edge, in `[0, 1]`.
        penumbra: f32,
        /// Physical falloff exponent.
        decay: f32,
    },
    /// Sky/ground gradient ambient light.
    Hemisphere {
        /// Colour coming from below.
        ground_color: Color,
    },
}

/// Shadow map parameters of a shadow-casting light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightShadow {
    /// Shadow map resolution (square).
    pub map_size: u32,
    /// Depth bias applied when comparing.
    pub bias: f32,
    /// Offset along the surface normal applied when comparing.
    pub normal_bias: f32,
    /// Filter radius for PCF and VSM.
    pub radius: f32,
    /// Blur taps for VSM.
    pub blur_samples: u32,
    /// Near plane of the shadow camera.
    pub camera_near: f32,
    /// Far plane of the shadow camera.
    pub camera_far: f32,
    /// Half extent of a directional light's orthographic shadow camera.
    pub camera_extent: f32,
}

impl Default for LightShadow {
    fn default() -> Self {
        Self {
            map_size: 512,
            bias: 0.0,
            normal_bias: 0.0,
            radius: 1.0,
            blur_samples: 8,
            camera_near: 0.5,
            camera_far: 500.0,
            camera_extent: 5.0,
        }
    }
}

/// A light placed in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    id: AssetId<Light>,
    /// Emission shape.
    pub kind: LightType,
    /// Colour.
    pub color: Color,
    /// Scalar intensity.
    pub intensity: f32,
    /// World-space position (direction source for directional lights).
    pub position: Vec3,
    /// Whether the light renders a shadow map.
    pub cast_shadow: bool,
    /// Shadow parameters.
    pub shadow: LightShadow,
    /// Whether the light contributes at all.
    pub visible: bool,
}

impl Light {
    fn with_kind(kind: LightType, color: Color, intensity: f32) -> Self {
        Self {
            id: AssetId::generate(),
            kind,
            color,
            intensity,
            position: Vec3::ZERO,
            cast_shadow: false,
            shadow: LightShadow::default(),
            visible: true,
        }
    }

    /// Creates an ambient light.
    pub fn ambient(color: Color, intensity: f32) -> Self {
        Self::with_kind(LightType::Ambient, color, intensity)
    }

    /// Creates a directional light shining from `position` towards the origin.
    ///
    /// ```
    /// use prism_core::math::{Color, Vec3};
    /// use prism_core::scene::Light;
    ///
    /// let sun = Light::directional(Color::WHITE, 2.0, Vec3::new(0.0, 10.0, 0.0));
    /// assert_eq!(sun.direction(), Some(Vec3::new(0.0, -1.0, 0.0)));
    /// ```
    pub fn directional(color: Color, intensity: f32, position: Vec3) -> Self {
        let kind = LightType::Directional { target: Vec3::ZERO };
        let mut light = Self::with_kind(kind, color, intensity);
        light.position = position;
        light
    }

    /// Creates a point light.
    pub fn point(color: Color, intensity: f32, position: Vec3, distance: f32) -> Self {
        let kind = LightType::Point { distance, decay: 2.0 };
        let mut light = Self::with_kind(kind, color, intensity);
        light.position = position;
        light
    }

    /// Creates a spot light aimed at `target`.
    pub fn spot(color: Color, intensity: f32, position: Vec3, target: Vec3, angle: f32) -> Self {
        let mut light = Self::with_kind(
            LightType::Spot {
                target,
                distance: 0.0,
                angle,
                penumbra: 0.0,
                decay: 2.0,
            },
            color,
            intensity,
        );
        light.position = position;
        light
    }

    /// Creates a hemisphere light with `color` from above.
    pub fn hemisphere(sky: Color, ground: Color, intensity: f32) -> Self {
        let kind = LightType::Hemisphere { ground_color: ground };
        let mut light = Self::with_kind(kind, sky, intensity);
        light.position = Vec3::Y;
        light
    }

    /// The light's identity.
    pub fn id(&self) -> AssetId<Light> {
        self.id
    }

    /// Enables shadow casting.
    pub fn with_shadow(mut self, shadow: LightShadow) -> Self {
        self.cast_shadow = true;
        self.shadow = shadow;
        self
    }

    /// World-space direction of travel for directional and spot lights.
    pub fn direction(&self) -> Option<Vec3> {
        match self.kind {
            LightType::Directional { target } | LightType::Spot { target, .. } => {
                Some((target - self.position).normalize_or_zero())
            }
            _ => None,
        }
    }

    /// Returns `true` for light types that can render a shadow map.
    pub fn supports_shadows(&self) -> bool {
        matches!(
            self.kind,
            LightType::Directional { .. } | LightType::Point { .. } | LightType::Spot { .. }
        )
    }
}

impl Asset for Light {
    fn id(&self) -> AssetId<Self> {
        self.id
    }
}
