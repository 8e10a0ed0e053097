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

use prism_core::math::{Mat4, Vec2, Vec3, FRAC_PI_2};
use prism_core::renderer::{TextureId, Viewport};
use prism_core::scene::{Camera, Light, LightType};

/// One render of a shadow map: the camera and the region of the map it fills.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowView {
    /// Camera placed at the light.
    pub camera: Camera,
    /// Region of the shadow map drawn by this view.
    pub viewport: Viewport,
}

/// What a lit program needs to sample one light's shadow map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowMapInfo {
    /// World to shadow-map transform. For point lights this only moves the
    /// light to the origin; the cube lookup happens in the shader.
    pub matrix: Mat4,
    /// The rendered map.
    pub texture: TextureId,
    /// Map size in texels.
    pub map_size: Vec2,
    /// Depth bias.
    pub bias: f32,
    /// Offset along the normal.
    pub normal_bias: f32,
    /// Filter radius.
    pub radius: f32,
    /// Near plane of the light camera.
    pub camera_near: f32,
    /// Far plane of the light camera.
    pub camera_far: f32,
}

impl ShadowMapInfo {
    /// Builds the sampling data for `light` rendered into `texture`.
    pub fn new(light: &Light, texture: TextureId) -> Self {
        let (width, height) = shadow_map_size(light);
        let matrix = match light.kind {
            LightType::Point { .. } => Mat4::from_translation(-light.position),
            _ => {
                let view = light_views(light).first().map(|v| v.camera.view_projection());
                texture_space() * view.unwrap_or(Mat4::IDENTITY)
            }
        };
        Self {
            matrix,
            texture,
            map_size: Vec2::new(width as f32, height as f32),
            bias: light.shadow.bias,
            normal_bias: light.shadow.normal_bias,
            radius: light.shadow.radius,
            camera_near: light.shadow.camera_near,
            camera_far: far_plane(light),
        }
    }
}

/// Size of the texture backing `light`'s shadow map. Point lights pack six
/// faces into a 4:2 layout.
pub fn shadow_map_size(light: &Light) -> (u32, u32) {
    let size = light.shadow.map_size.max(1);
    match light.kind {
        LightType::Point { .. } => (size * 4, size * 2),
        _ => (size, size),
    }
}

/// The views `light` renders its shadow map from; empty for lights that cast
/// no shadows.
pub fn light_views(light: &Light) -> Vec<ShadowView> {
    let shadow = &light.shadow;
    let size = shadow.map_size.max(1);
    let full = Viewport::full(size, size);
    match light.kind {
        LightType::Directional { target } => {
            let e = shadow.camera_extent;
            let camera = Camera::orthographic(-e, e, -e, e, shadow.camera_near, shadow.camera_far)
                .look_at(light.position, target, up_for(target - light.position));
            vec![ShadowView { camera, viewport: full }]
        }
        LightType::Spot { target, angle, .. } => {
            let fov = (angle * 2.0).clamp(0.01, 3.1);
            let camera = Camera::perspective(fov, 1.0, shadow.camera_near, far_plane(light))
                .look_at(light.position, target, up_for(target - light.position));
            vec![ShadowView { camera, viewport: full }]
        }
        LightType::Point { .. } => {
            // Face direction, up vector and tile within the 4x2 grid.
            const FACES: [(Vec3, Vec3, (u32, u32)); 6] = [
                (Vec3::X, Vec3::Y, (2, 1)),
                (Vec3::NEG_X, Vec3::Y, (0, 1)),
                (Vec3::Z, Vec3::Y, (3, 1)),
                (Vec3::NEG_Z, Vec3::Y, (1, 1)),
                (Vec3::Y, Vec3::Z, (3, 0)),
                (Vec3::NEG_Y, Vec3::NEG_Z, (1, 0)),
            ];
            let far = far_plane(light);
            FACES
                .iter()
                .map(|&(direction, up, (x, y))| ShadowView {
                    camera: Camera::perspective(FRAC_PI_2, 1.0, shadow.camera_near, far).look_at(
                        light.position,
                        light.position + direction,
                        up,
                    ),
                    viewport: Viewport {
                        x: (x * size) as i32,
                        y: (y * size) as i32,
                        width: size,
                        height: size,
                    },
                })
                .collect()
        }
        LightType::Ambient | LightType::Hemisphere { .. } => Vec::new(),
    }
}

fn far_plane(light: &Light) -> f32 {
    match light.kind {
        LightType::Point { distance, .. } | LightType::Spot { distance, .. } if distance > 0.0 => {
            distance
        }
        _ => light.shadow.camera_far,
    }
}

fn up_for(direction: Vec3) -> Vec3 {
    if direction.normalize_or_zero().cross(Vec3::Y).length_squared() < 1e-6 {
        Vec3::Z
    } else {
        Vec3::Y
    }
}

/// Maps clip space `[-1, 1]` to texture space `[0, 1]`.
fn texture_space() -> Mat4 {
    Mat4::from_translation(Vec3::splat(0.5)) * Mat4::from_scale(Vec3::splat(0.5))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use prism_core::math::Color;
    use prism_core::scene::LightShadow;

    fn shadow(map_size: u32) -> LightShadow {
        LightShadow {
            map_size,
            ..LightShadow::default()
        }
    }

    #[test]
    fn test_point_light_packs_six_faces() {
        let light =
            Light::point(Color::WHITE, 1.0, Vec3::new(0.0, 2.0, 0.0), 0.0).with_shadow(shadow(64));
        assert_eq!(shadow_map_size(&light), (256, 128));
        let views = light_views(&light);
        assert_eq!(views.len(), 6);
        let mut tiles: Vec<_> = views.iter().map(|v| (v.viewport.x, v.viewport.y)).collect();
        tiles.sort_unstable();
        tiles.dedup();
        assert_eq!(tiles.len(), 6);
        assert!(views.iter().all(|v| v.viewport.width == 64));
    }

    #[test]
    fn test_directional_shadow_matrix_maps_target_to_center() {
        let light = Light::directional(Color::WHITE, 1.0, Vec3::new(0.0, 10.0, 0.1))
            .with_shadow(shadow(512));
        let info = ShadowMapInfo::new(&light, TextureId(1));
        let p = info.matrix.project_point3(Vec3::ZERO);
        assert_relative_eq!(p.x, 0.5, epsilon = 1e-4);
        assert_relative_eq!(p.y, 0.5, epsilon = 1e-4);
        assert!(p.z > 0.0 && p.z < 1.0);
    }

    #[test]
    fn test_straight_down_light_has_valid_view() {
        let light = Light::directional(Color::WHITE, 1.0, Vec3::new(0.0, 10.0, 0.0));
        let views = light_views(&light);
        assert!(!views[0].camera.view.is_nan());
    }

    #[test]
    fn test_point_matrix_is_light_relative() {
        let light =
            Light::point(Color::WHITE, 1.0, Vec3::new(1.0, 2.0, 3.0), 25.0).with_shadow(shadow(32));
        let info = ShadowMapInfo::new(&light, TextureId(1));
        assert_eq!(info.matrix.transform_point3(Vec3::new(1.0, 2.0, 3.0)), Vec3::ZERO);
        assert_eq!(info.camera_far, 25.0);
        assert_eq!(info.map_size, Vec2::new(128.0, 64.0));
    }

    #[test]
    fn test_ambient_casts_nothing() {
        assert!(light_views(&Light::ambient(Color::WHITE, 1.0)).is_empty());
    }
}
