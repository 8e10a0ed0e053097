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

//! GLSL generation from [`ProgramParameters`].

use super::parameters::{FeatureFlags, ProgramParameters};
use prism_core::renderer::{ProgramDescriptor, ShadowMapType};
use prism_core::scene::{DepthPacking, MaterialKind, ShaderSource};
use std::fmt::Write;

mod chunks {
    pub const COMMON: &str = include_str!("shaders/common.glsl");
    pub const VERTEX_PARS: &str = include_str!("shaders/vertex_pars.glsl");
    pub const MESH_VERTEX: &str = include_str!("shaders/meshes.vert.glsl");
    pub const FRAGMENT_PARS: &str = include_str!("shaders/fragment_pars.glsl");
    pub const SHADOWMAP_PARS: &str = include_str!("shaders/shadowmap_pars.glsl");
    pub const LIGHTS_PARS: &str = include_str!("shaders/lights_pars.glsl");
    pub const BASIC: &str = include_str!("shaders/basic.frag.glsl");
    pub const LAMBERT: &str = include_str!("shaders/lambert.frag.glsl");
    pub const PHONG: &str = include_str!("shaders/phong.frag.glsl");
    pub const STANDARD: &str = include_str!("shaders/standard.frag.glsl");
    pub const DEPTH: &str = include_str!("shaders/depth.frag.glsl");
    pub const DISTANCE: &str = include_str!("shaders/distance.frag.glsl");
    pub const NORMAL: &str = include_str!("shaders/normal.frag.glsl");
    pub const FULLSCREEN_VERTEX: &str = include_str!("shaders/fullscreen.vert.glsl");
    pub const VSM_BLUR: &str = include_str!("shaders/vsm_blur.frag.glsl");
}

const FLAG_DEFINES: [(FeatureFlags, &str); 17] = [
    (FeatureFlags::MAP, "USE_MAP"),
    (FeatureFlags::NORMAL_MAP, "USE_NORMALMAP"),
    (FeatureFlags::EMISSIVE_MAP, "USE_EMISSIVEMAP"),
    (FeatureFlags::ALPHA_MAP, "USE_ALPHAMAP"),
    (FeatureFlags::ROUGHNESS_MAP, "USE_ROUGHNESSMAP"),
    (FeatureFlags::METALNESS_MAP, "USE_METALNESSMAP"),
    (FeatureFlags::AO_MAP, "USE_AOMAP"),
    (FeatureFlags::VERTEX_COLORS, "USE_COLOR"),
    (FeatureFlags::ALPHA_TEST, "USE_ALPHATEST"),
    (FeatureFlags::FLAT_SHADING, "FLAT_SHADED"),
    (FeatureFlags::DOUBLE_SIDED, "DOUBLE_SIDED"),
    (FeatureFlags::FLIP_SIDED, "FLIP_SIDED"),
    (FeatureFlags::FOG, "USE_FOG"),
    (FeatureFlags::LOG_DEPTH, "USE_LOGDEPTHBUF"),
    (FeatureFlags::PREMULTIPLIED_ALPHA, "PREMULTIPLIED_ALPHA"),
    (FeatureFlags::SHADOW_MAP, "USE_SHADOWMAP"),
    (FeatureFlags::CLEARCOAT, "USE_CLEARCOAT"),
];

/// Generates program sources.
pub struct ProgramSource;

impl ProgramSource {
    /// Builds both stages for `parameters`.
    ///
    /// Every stage starts with the same prefix (version, precision, then one
    /// `#define` per feature, count and user define) so that both stages agree
    /// on which declarations are active.
    pub fn generate(parameters: &ProgramParameters) -> ProgramDescriptor {
        let prefix = Self::prefix(parameters);
        let (vertex, fragment) = match &parameters.kind {
            MaterialKind::Shader(ShaderSource { vertex, fragment }) => {
                return ProgramDescriptor {
                    label: parameters.label.clone(),
                    vertex_source: concat(&[&prefix, chunks::VERTEX_PARS, vertex]),
                    fragment_source: concat(&[&prefix, fragment]),
                };
            }
            MaterialKind::Basic => (chunks::MESH_VERTEX, chunks::BASIC),
            MaterialKind::Lambert => (chunks::MESH_VERTEX, chunks::LAMBERT),
            MaterialKind::Phong => (chunks::MESH_VERTEX, chunks::PHONG),
            MaterialKind::Standard | MaterialKind::Physical => {
                (chunks::MESH_VERTEX, chunks::STANDARD)
            }
            MaterialKind::Depth(_) => (chunks::MESH_VERTEX, chunks::DEPTH),
            MaterialKind::Distance => (chunks::MESH_VERTEX, chunks::DISTANCE),
            MaterialKind::Normal => (chunks::MESH_VERTEX, chunks::NORMAL),
        };

        let fragment_source = if parameters.kind.is_lit() {
            concat(&[
                &prefix,
                chunks::COMMON,
                chunks::FRAGMENT_PARS,
                chunks::SHADOWMAP_PARS,
                chunks::LIGHTS_PARS,
                fragment,
            ])
        } else {
            concat(&[&prefix, chunks::COMMON, chunks::FRAGMENT_PARS, fragment])
        };

        ProgramDescriptor {
            label: parameters.label.clone(),
            vertex_source: concat(&[&prefix, chunks::COMMON, chunks::VERTEX_PARS, vertex]),
            fragment_source,
        }
    }

    /// Sources of the separable blur used to soften variance shadow maps.
    pub fn vsm_blur() -> ShaderSource {
        ShaderSource {
            vertex: chunks::FULLSCREEN_VERTEX.to_string(),
            fragment: chunks::VSM_BLUR.to_string(),
        }
    }

    fn prefix(parameters: &ProgramParameters) -> String {
        let mut out = String::with_capacity(1024);
        let precision = parameters.precision.qualifier();
        // Writing into a String cannot fail.
        let _ = writeln!(out, "#version 300 es");
        let _ = writeln!(out, "precision {precision} float;");
        let _ = writeln!(out, "precision {precision} int;");
        let name = parameters.label.replace(['\n', '\r'], " ");
        let _ = writeln!(out, "#define SHADER_NAME {name}");

        for (flag, name) in FLAG_DEFINES {
            if parameters.features.contains(flag) {
                let _ = writeln!(out, "#define {name}");
            }
        }
        if parameters.kind == MaterialKind::Physical {
            let _ = writeln!(out, "#define PHYSICAL");
        }
        if parameters.features.contains(FeatureFlags::SHADOW_MAP) {
            let name = match parameters.shadow_map_type {
                ShadowMapType::Basic => "SHADOWMAP_TYPE_BASIC",
                ShadowMapType::Pcf => "SHADOWMAP_TYPE_PCF",
                ShadowMapType::PcfSoft => "SHADOWMAP_TYPE_PCF_SOFT",
                ShadowMapType::Vsm => "SHADOWMAP_TYPE_VSM",
            };
            let _ = writeln!(out, "#define {name}");
        }
        if let Some(packing) = parameters.depth_packing() {
            let value = match packing {
                DepthPacking::Basic => 3200,
                DepthPacking::Rgba => 3201,
            };
            let _ = writeln!(out, "#define DEPTH_PACKING {value}");
        }

        let lights = &parameters.lights;
        let counts = [
            ("NUM_DIR_LIGHTS", lights.directional),
            ("NUM_POINT_LIGHTS", lights.point),
            ("NUM_SPOT_LIGHTS", lights.spot),
            ("NUM_HEMI_LIGHTS", lights.hemisphere),
            ("NUM_DIR_LIGHT_SHADOWS", lights.directional_shadows),
            ("NUM_POINT_LIGHT_SHADOWS", lights.point_shadows),
            ("NUM_SPOT_LIGHT_SHADOWS", lights.spot_shadows),
            ("NUM_CLIPPING_PLANES", parameters.clipping_planes),
            (
                "UNION_CLIPPING_PLANES",
                parameters.clipping_planes - parameters.clipping_intersection,
            ),
        ];
        for (name, count) in counts {
            let _ = writeln!(out, "#define {name} {count}");
        }

        for (name, value) in &parameters.defines {
            let _ = writeln!(out, "#define {name} {value}");
        }
        out
    }
}

fn concat(parts: &[&str]) -> String {
    let mut out = String::with_capacity(parts.iter().map(|p| p.len() + 1).sum());
    for part in parts {
        out.push_str(part);
        if !part.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program_lane::{LightsHash, ProgramEnvironment};
    use prism_core::renderer::{GraphicsDevice, RendererCapabilities, RendererSettings};
    use prism_core::scene::{AssetId, Material};
    use prism_infra::graphics::headless::HeadlessDevice;

    fn parameters(material: &Material, environment: &ProgramEnvironment) -> ProgramParameters {
        let device = HeadlessDevice::new();
        let caps =
            RendererCapabilities::resolve(&device.capabilities(), &RendererSettings::default());
        ProgramParameters::new(material, environment, &caps)
    }

    fn uniform_names(material: &Material, environment: &ProgramEnvironment) -> Vec<String> {
        let device = HeadlessDevice::new();
        let descriptor = ProgramSource::generate(&parameters(material, environment));
        let id = device.create_program(&descriptor).unwrap();
        device
            .program_reflection(id)
            .unwrap()
            .uniforms
            .into_iter()
            .map(|u| u.name)
            .collect()
    }

    #[test]
    fn test_every_builtin_kind_compiles() {
        let device = HeadlessDevice::new();
        let environment = ProgramEnvironment {
            lights: LightsHash {
                directional: 1,
                point: 1,
                spot: 1,
                hemisphere: 1,
                directional_shadows: 1,
                point_shadows: 1,
                spot_shadows: 1,
            },
            shadow_map_enabled: true,
            fog: true,
            global_clipping_planes: 2,
            ..ProgramEnvironment::default()
        };
        for kind in [
            MaterialKind::Basic,
            MaterialKind::Lambert,
            MaterialKind::Phong,
            MaterialKind::Standard,
            MaterialKind::Physical,
            MaterialKind::Depth(DepthPacking::Basic),
            MaterialKind::Depth(DepthPacking::Rgba),
            MaterialKind::Distance,
            MaterialKind::Normal,
            MaterialKind::Shader(ProgramSource::vsm_blur()),
        ] {
            let material = Material::with(kind.clone(), |m| {
                m.map = Some(AssetId::generate());
                m.alpha_test = 0.5;
                m.vertex_colors = true;
            });
            let descriptor = ProgramSource::generate(&parameters(&material, &environment));
            assert!(
                device.create_program(&descriptor).is_ok(),
                "{kind:?} failed to compile"
            );
        }
    }

    #[test]
    fn test_light_arrays_follow_counts() {
        let environment = ProgramEnvironment {
            lights: LightsHash {
                directional: 2,
                ..LightsHash::default()
            },
            ..ProgramEnvironment::default()
        };
        let names = uniform_names(&Material::new(MaterialKind::Lambert), &environment);
        assert!(names.iter().any(|n| n == "directionalLightColor"));
        assert!(!names.iter().any(|n| n == "pointLightColor"));
        assert!(!names.iter().any(|n| n == "receiveShadow"));
    }

    #[test]
    fn test_unlit_kinds_skip_light_uniforms() {
        let basic = Material::new(MaterialKind::Basic);
        let names = uniform_names(&basic, &ProgramEnvironment::default());
        assert!(names.iter().any(|n| n == "diffuse"));
        assert!(names.iter().any(|n| n == "modelViewMatrix"));
        assert!(!names.iter().any(|n| n == "ambientLightColor"));
        assert!(!names.iter().any(|n| n == "map"));
    }

    #[test]
    fn test_prefix_carries_user_defines_and_precision() {
        let material = Material::with(MaterialKind::Basic, |m| {
            m.defines.insert("TILE_COUNT".into(), "4".into());
        });
        let params = parameters(&material, &ProgramEnvironment::default());
        let descriptor = ProgramSource::generate(&params);
        assert!(descriptor.fragment_source.starts_with("#version 300 es\nprecision highp float;"));
        assert!(descriptor.vertex_source.contains("#define TILE_COUNT 4"));
        assert!(descriptor.fragment_source.contains("#define NUM_CLIPPING_PLANES 0"));
    }

    #[test]
    fn test_custom_shader_keeps_user_source() {
        let source = ShaderSource {
            vertex: "void main() { gl_Position = vec4(position, 1.0); }".into(),
            fragment: "uniform float time;\nout vec4 fragColor;\n\
                       void main() { fragColor = vec4(time); }"
                .into(),
        };
        let material = Material::new(MaterialKind::Shader(source));
        let names = uniform_names(&material, &ProgramEnvironment::default());
        assert!(names.iter().any(|n| n == "time"));
        assert!(names.iter().any(|n| n == "projectionMatrix"));
    }
}
