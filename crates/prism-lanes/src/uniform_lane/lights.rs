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

//! Scene lights reduced to the arrays lit programs read.

use super::units::TextureUnits;
use super::values::UniformValues;
use crate::program_lane::LightsHash;
use crate::shadow_lane::ShadowMapInfo;
use ahash::AHashMap;
use prism_core::math::{Mat4, Vec2, Vec3};
use prism_core::renderer::{TextureId, UniformValue};
use prism_core::scene::{AssetId, Light, LightType};

/// A directional light in view space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLightUniforms {
    /// Unit vector pointing towards the light.
    pub direction: Vec3,
    /// Colour scaled by intensity.
    pub color: Vec3,
}

/// A point light in view space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLightUniforms {
    /// Position.
    pub position: Vec3,
    /// Colour scaled by intensity.
    pub color: Vec3,
    /// Cut-off distance (0 = infinite).
    pub distance: f32,
    /// Falloff exponent.
    pub decay: f32,
}

/// A spot light in view space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLightUniforms {
    /// Position.
    pub position: Vec3,
    /// Unit vector from the target towards the light.
    pub direction: Vec3,
    /// Colour scaled by intensity.
    pub color: Vec3,
    /// Cut-off distance (0 = infinite).
    pub distance: f32,
    /// Falloff exponent.
    pub decay: f32,
    /// Cosine of the cone half-angle.
    pub cone_cos: f32,
    /// Cosine of the angle where the penumbra starts.
    pub penumbra_cos: f32,
}

/// A hemisphere light in view space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HemisphereLightUniforms {
    /// Unit vector towards the sky.
    pub direction: Vec3,
    /// Sky colour scaled by intensity.
    pub sky_color: Vec3,
    /// Ground colour scaled by intensity.
    pub ground_color: Vec3,
}

/// The lights of one frame, as seen from one camera.
///
/// Within each kind, lights with a rendered shadow map come first so that the
/// shadow arrays line up with the first entries of the light arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightsState {
    /// Light counts, part of every lit program's key.
    pub hash: LightsHash,
    /// Sum of ambient lights.
    pub ambient: Vec3,
    /// Directional lights.
    pub directional: Vec<DirectionalLightUniforms>,
    /// Point lights.
    pub point: Vec<PointLightUniforms>,
    /// Spot lights.
    pub spot: Vec<SpotLightUniforms>,
    /// Hemisphere lights.
    pub hemisphere: Vec<HemisphereLightUniforms>,
    /// Shadow maps of the first directional lights.
    pub directional_shadows: Vec<ShadowMapInfo>,
    /// Shadow maps of the first point lights.
    pub point_shadows: Vec<ShadowMapInfo>,
    /// Shadow maps of the first spot lights.
    pub spot_shadows: Vec<ShadowMapInfo>,
}

impl LightsState {
    /// Rebuilds the state from `lights` for a camera with the given `view`
    /// matrix. `shadows` holds the maps rendered this frame.
    pub fn setup(
        &mut self,
        lights: &[Light],
        view: &Mat4,
        shadows: &AHashMap<AssetId<Light>, ShadowMapInfo>,
    ) {
        *self = Self::default();
        let visible = || lights.iter().filter(|light| light.visible);

        for light in visible() {
            if let LightType::Ambient = light.kind {
                self.ambient += light.color.to_vec3() * light.intensity;
            }
        }

        for with_shadow in [true, false] {
            for light in visible() {
                let shadow = shadows.get(&light.id());
                if shadow.is_some() != with_shadow {
                    continue;
                }
                let color = light.color.to_vec3() * light.intensity;
                let position = view.transform_point3(light.position);
                let towards_light = -light.direction().unwrap_or(Vec3::NEG_Y);
                let towards_light = view.transform_vector3(towards_light).normalize_or_zero();

                match light.kind {
                    LightType::Ambient => {}
                    LightType::Directional { .. } => {
                        self.directional.push(DirectionalLightUniforms {
                            direction: towards_light,
                            color,
                        });
                        self.directional_shadows.extend(shadow);
                    }
                    LightType::Point { distance, decay } => {
                        self.point.push(PointLightUniforms {
                            position,
                            color,
                            distance,
                            decay,
                        });
                        self.point_shadows.extend(shadow);
                    }
                    LightType::Spot {
                        distance,
                        angle,
                        penumbra,
                        decay,
                        ..
                    } => {
                        self.spot.push(SpotLightUniforms {
                            position,
                            direction: towards_light,
                            color,
                            distance,
                            decay,
                            cone_cos: angle.cos(),
                            penumbra_cos: (angle * (1.0 - penumbra)).cos(),
                        });
                        self.spot_shadows.extend(shadow);
                    }
                    LightType::Hemisphere { ground_color } => {
                        self.hemisphere.push(HemisphereLightUniforms {
                            direction: view.transform_vector3(light.position).normalize_or_zero(),
                            sky_color: color,
                            ground_color: ground_color.to_vec3() * light.intensity,
                        });
                    }
                }
            }
        }

        self.hash = LightsHash {
            directional: self.directional.len() as u32,
            point: self.point.len() as u32,
            spot: self.spot.len() as u32,
            hemisphere: self.hemisphere.len() as u32,
            directional_shadows: self.directional_shadows.len() as u32,
            point_shadows: self.point_shadows.len() as u32,
            spot_shadows: self.spot_shadows.len() as u32,
        };
    }

    /// Writes light and shadow uniforms. Shadow maps are bound through `bind`
    /// on units taken from `units`.
    pub fn write(
        &self,
        values: &mut UniformValues,
        units: &mut TextureUnits,
        bind: &mut dyn FnMut(u32, TextureId),
    ) {
        values.set("ambientLightColor", self.ambient);

        if !self.directional.is_empty() {
            let l = &self.directional;
            values.set("directionalLightDirection", vec3s(l, |l| l.direction));
            values.set("directionalLightColor", vec3s(l, |l| l.color));
        }
        if !self.point.is_empty() {
            let l = &self.point;
            values.set("pointLightPosition", vec3s(l, |l| l.position));
            values.set("pointLightColor", vec3s(l, |l| l.color));
            values.set("pointLightDistance", floats(l, |l| l.distance));
            values.set("pointLightDecay", floats(l, |l| l.decay));
        }
        if !self.spot.is_empty() {
            let l = &self.spot;
            values.set("spotLightPosition", vec3s(l, |l| l.position));
            values.set("spotLightDirection", vec3s(l, |l| l.direction));
            values.set("spotLightColor", vec3s(l, |l| l.color));
            values.set("spotLightDistance", floats(l, |l| l.distance));
            values.set("spotLightDecay", floats(l, |l| l.decay));
            values.set("spotLightConeCos", floats(l, |l| l.cone_cos));
            values.set("spotLightPenumbraCos", floats(l, |l| l.penumbra_cos));
        }
        if !self.hemisphere.is_empty() {
            let l = &self.hemisphere;
            values.set("hemisphereLightDirection", vec3s(l, |l| l.direction));
            values.set("hemisphereLightSkyColor", vec3s(l, |l| l.sky_color));
            values.set("hemisphereLightGroundColor", vec3s(l, |l| l.ground_color));
        }

        for (prefix, shadows) in [
            ("directional", &self.directional_shadows),
            ("spot", &self.spot_shadows),
            ("point", &self.point_shadows),
        ] {
            if shadows.is_empty() {
                continue;
            }
            let samplers: Vec<i32> = shadows
                .iter()
                .map(|shadow| match units.allocate() {
                    Some(unit) => {
                        bind(unit, shadow.texture);
                        unit as i32
                    }
                    None => 0,
                })
                .collect();
            let matrices = shadows.iter().map(|s| s.matrix).collect();
            values.set(format!("{prefix}ShadowMatrix"), UniformValue::Mat4Array(matrices));
            values.set(format!("{prefix}ShadowMap"), UniformValue::IntArray(samplers));
            values.set(
                format!("{prefix}ShadowMapSize"),
                UniformValue::Vec2Array(shadows.iter().map(|s| s.map_size).collect::<Vec<Vec2>>()),
            );
            values.set(format!("{prefix}ShadowBias"), floats(shadows, |s| s.bias));
            values.set(format!("{prefix}ShadowNormalBias"), floats(shadows, |s| s.normal_bias));
            values.set(format!("{prefix}ShadowRadius"), floats(shadows, |s| s.radius));
            if prefix == "point" {
                values.set("pointShadowCameraNear", floats(shadows, |s| s.camera_near));
                values.set("pointShadowCameraFar", floats(shadows, |s| s.camera_far));
            }
        }
    }
}

fn vec3s<T>(items: &[T], f: impl Fn(&T) -> Vec3) -> UniformValue {
    UniformValue::Vec3Array(items.iter().map(f).collect())
}

fn floats<T>(items: &[T], f: impl Fn(&T) -> f32) -> UniformValue {
    UniformValue::FloatArray(items.iter().map(f).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use prism_core::math::Color;

    fn shadow_info(texture: usize) -> ShadowMapInfo {
        ShadowMapInfo {
            matrix: Mat4::IDENTITY,
            texture: TextureId(texture),
            map_size: Vec2::splat(512.0),
            bias: 0.0,
            normal_bias: 0.0,
            radius: 1.0,
            camera_near: 0.5,
            camera_far: 50.0,
        }
    }

    #[test]
    fn test_counts_and_ambient_sum() {
        let lights = vec![
            Light::ambient(Color::WHITE, 0.25),
            Light::ambient(Color::new(1.0, 0.0, 0.0), 0.5),
            Light::directional(Color::WHITE, 1.0, Vec3::Y),
            Light::point(Color::WHITE, 2.0, Vec3::ZERO, 0.0),
            Light::hemisphere(Color::WHITE, Color::BLACK, 1.0),
        ];
        let mut state = LightsState::default();
        state.setup(&lights, &Mat4::IDENTITY, &AHashMap::new());
        assert_eq!(state.ambient, Vec3::new(0.75, 0.25, 0.25));
        assert_eq!(
            state.hash,
            LightsHash {
                directional: 1,
                point: 1,
                hemisphere: 1,
                ..LightsHash::default()
            }
        );
        assert_eq!(state.point[0].color, Vec3::splat(2.0));
    }

    #[test]
    fn test_hidden_lights_are_ignored() {
        let mut light = Light::point(Color::WHITE, 1.0, Vec3::ZERO, 0.0);
        light.visible = false;
        let mut state = LightsState::default();
        state.setup(&[light], &Mat4::IDENTITY, &AHashMap::new());
        assert_eq!(state.hash, LightsHash::default());
    }

    #[test]
    fn test_directions_are_in_view_space_towards_light() {
        let light = Light::directional(Color::WHITE, 1.0, Vec3::new(0.0, 10.0, 0.0));
        let view = Mat4::from_rotation_x(std::f32::consts::FRAC_PI_2);
        let mut state = LightsState::default();
        state.setup(&[light], &view, &AHashMap::new());
        let expected = view.transform_vector3(Vec3::Y);
        assert_relative_eq!(state.directional[0].direction.distance(expected), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_shadow_casters_come_first() {
        let plain = Light::spot(Color::new(1.0, 0.0, 0.0), 1.0, Vec3::Y, Vec3::ZERO, 0.5);
        let caster = Light::spot(Color::new(0.0, 1.0, 0.0), 1.0, Vec3::Y, Vec3::ZERO, 0.5);
        let mut shadows = AHashMap::new();
        shadows.insert(caster.id(), shadow_info(7));

        let mut state = LightsState::default();
        state.setup(&[plain, caster], &Mat4::IDENTITY, &shadows);
        assert_eq!(state.spot[0].color, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(state.hash.spot, 2);
        assert_eq!(state.hash.spot_shadows, 1);

        let mut values = UniformValues::new();
        let mut units = TextureUnits::new(16);
        let mut bound = Vec::new();
        state.write(&mut values, &mut units, &mut |unit, texture| bound.push((unit, texture)));
        assert_eq!(bound, vec![(0, TextureId(7))]);
        assert_eq!(values.get("spotShadowMap"), Some(&UniformValue::IntArray(vec![0])));
        assert!(values.get("pointShadowMap").is_none());
        assert_relative_eq!(state.spot[0].cone_cos, 0.5f32.cos());
    }
}
