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

//! The inputs that decide which program a material needs.

use bitflags::bitflags;
use prism_core::renderer::{Precision, RendererCapabilities, ShadowMapType};
use prism_core::scene::{DepthPacking, MaterialKind, MaterialProperties, ShaderSource, Side};
use std::collections::BTreeMap;
use std::fmt;

bitflags! {
    /// Boolean switches that each add a `#define` to the generated source.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct FeatureFlags: u32 {
        /// Colour map.
        const MAP = 1 << 0;
        /// Tangent-space normal map.
        const NORMAL_MAP = 1 << 1;
        /// Emissive map.
        const EMISSIVE_MAP = 1 << 2;
        /// Alpha map.
        const ALPHA_MAP = 1 << 3;
        /// Roughness map.
        const ROUGHNESS_MAP = 1 << 4;
        /// Metalness map.
        const METALNESS_MAP = 1 << 5;
        /// Ambient occlusion map.
        const AO_MAP = 1 << 6;
        /// Per-vertex colours.
        const VERTEX_COLORS = 1 << 7;
        /// Fragments below the alpha threshold are discarded.
        const ALPHA_TEST = 1 << 8;
        /// Face normals from derivatives.
        const FLAT_SHADING = 1 << 9;
        /// Both faces are rendered.
        const DOUBLE_SIDED = 1 << 10;
        /// Only back faces are rendered.
        const FLIP_SIDED = 1 << 11;
        /// Linear scene fog.
        const FOG = 1 << 12;
        /// Logarithmic depth buffer.
        const LOG_DEPTH = 1 << 13;
        /// Output colour is premultiplied by alpha.
        const PREMULTIPLIED_ALPHA = 1 << 14;
        /// Shadow maps are sampled.
        const SHADOW_MAP = 1 << 15;
        /// Clearcoat layer of the physical model.
        const CLEARCOAT = 1 << 16;
    }
}

/// Light and shadow counts per light kind.
///
/// Two frames with the same hash can reuse the same programs; any change in
/// a count changes the generated code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightsHash {
    /// Directional lights.
    pub directional: u32,
    /// Point lights.
    pub point: u32,
    /// Spot lights.
    pub spot: u32,
    /// Hemisphere lights.
    pub hemisphere: u32,
    /// Directional lights with a rendered shadow map.
    pub directional_shadows: u32,
    /// Point lights with a rendered shadow map.
    pub point_shadows: u32,
    /// Spot lights with a rendered shadow map.
    pub spot_shadows: u32,
}

impl LightsHash {
    /// Number of shadow maps across every kind.
    pub fn shadow_count(&self) -> u32 {
        self.directional_shadows + self.point_shadows + self.spot_shadows
    }
}

/// Per-frame inputs that do not come from the material itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramEnvironment {
    /// Light counts of the scene being rendered.
    pub lights: LightsHash,
    /// Whether the renderer has shadow mapping enabled.
    pub shadow_map_enabled: bool,
    /// Filtering used when sampling shadow maps.
    pub shadow_map_type: ShadowMapType,
    /// Whether the scene has fog.
    pub fog: bool,
    /// Renderer-wide clipping planes.
    pub global_clipping_planes: u32,
}

/// The identity of a generated program.
///
/// Identical keys always resolve to the same cached program.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramKey(String);

impl ProgramKey {
    /// The key as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgramKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything that affects the code generated for one material.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramParameters {
    /// Name used in labels and diagnostics.
    pub label: String,
    /// Shading model.
    pub kind: MaterialKind,
    /// Float precision qualifier.
    pub precision: Precision,
    /// Enabled features.
    pub features: FeatureFlags,
    /// Filtering of shadow lookups, meaningful with [`FeatureFlags::SHADOW_MAP`].
    pub shadow_map_type: ShadowMapType,
    /// Lights contributing to this program. Zero for unlit kinds.
    pub lights: LightsHash,
    /// Total clipping planes (global and material).
    pub clipping_planes: u32,
    /// Planes combined by intersection rather than union.
    pub clipping_intersection: u32,
    /// User `#define`s, in name order.
    pub defines: BTreeMap<String, String>,
}

impl ProgramParameters {
    /// Gathers the parameters for `material` rendered under `environment`.
    pub fn new(
        material: &MaterialProperties,
        environment: &ProgramEnvironment,
        capabilities: &RendererCapabilities,
    ) -> Self {
        let lit = material.kind.is_lit();
        let mut features = FeatureFlags::empty();
        let mut set = |flag: FeatureFlags, on: bool| features.set(flag, on);

        set(FeatureFlags::MAP, material.map.is_some());
        set(FeatureFlags::NORMAL_MAP, material.normal_map.is_some() && lit);
        set(FeatureFlags::EMISSIVE_MAP, material.emissive_map.is_some() && lit);
        set(FeatureFlags::ALPHA_MAP, material.alpha_map.is_some());
        let pbr = is_pbr(&material.kind);
        set(FeatureFlags::ROUGHNESS_MAP, material.roughness_map.is_some() && pbr);
        set(FeatureFlags::METALNESS_MAP, material.metalness_map.is_some() && pbr);
        set(FeatureFlags::AO_MAP, material.ao_map.is_some() && lit);
        set(FeatureFlags::VERTEX_COLORS, material.vertex_colors);
        set(FeatureFlags::ALPHA_TEST, material.alpha_test > 0.0);
        set(FeatureFlags::FLAT_SHADING, material.flat_shading);
        set(FeatureFlags::DOUBLE_SIDED, material.side == Side::Double);
        set(FeatureFlags::FLIP_SIDED, material.side == Side::Back);
        set(FeatureFlags::FOG, material.fog && environment.fog);
        set(FeatureFlags::LOG_DEPTH, capabilities.logarithmic_depth_buffer);
        set(FeatureFlags::PREMULTIPLIED_ALPHA, material.premultiplied_alpha);
        set(
            FeatureFlags::SHADOW_MAP,
            lit && environment.shadow_map_enabled && environment.lights.shadow_count() > 0,
        );
        set(
            FeatureFlags::CLEARCOAT,
            material.kind == MaterialKind::Physical && material.clearcoat > 0.0,
        );

        let material_planes = material.clipping_planes.len() as u32;
        Self {
            label: if material.name.is_empty() {
                material.kind.name().to_string()
            } else {
                material.name.clone()
            },
            kind: material.kind.clone(),
            precision: capabilities.precision,
            shadow_map_type: environment.shadow_map_type,
            lights: if lit { environment.lights } else { LightsHash::default() },
            clipping_planes: environment.global_clipping_planes + material_planes,
            clipping_intersection: if material.clip_intersection { material_planes } else { 0 },
            defines: material.defines.clone(),
            features,
        }
    }

    /// Custom sources of a [`MaterialKind::Shader`] material.
    pub fn custom_source(&self) -> Option<&ShaderSource> {
        match &self.kind {
            MaterialKind::Shader(source) => Some(source),
            _ => None,
        }
    }

    /// Depth packing of a [`MaterialKind::Depth`] material.
    pub fn depth_packing(&self) -> Option<DepthPacking> {
        match self.kind {
            MaterialKind::Depth(packing) => Some(packing),
            _ => None,
        }
    }

    /// Folds the parameters into a key, in a fixed order.
    ///
    /// The label is not part of the key: two materials that generate the
    /// same code share a program whatever they are called.
    pub fn key(&self) -> ProgramKey {
        let mut parts: Vec<String> = Vec::with_capacity(16);
        parts.push(self.kind.name().to_string());
        if let Some(source) = self.custom_source() {
            parts.push(framed(&source.vertex));
            parts.push(framed(&source.fragment));
        }
        if let Some(packing) = self.depth_packing() {
            parts.push(format!("{packing:?}"));
        }
        parts.push(self.precision.qualifier().to_string());
        parts.push(format!("{:x}", self.features.bits()));
        if self.features.contains(FeatureFlags::SHADOW_MAP) {
            parts.push(format!("{:?}", self.shadow_map_type));
        }
        let l = &self.lights;
        parts.push(format!(
            "{},{},{},{},{},{},{}",
            l.directional,
            l.point,
            l.spot,
            l.hemisphere,
            l.directional_shadows,
            l.point_shadows,
            l.spot_shadows
        ));
        parts.push(format!("{},{}", self.clipping_planes, self.clipping_intersection));
        parts.extend(
            self.defines
                .iter()
                .map(|(name, value)| format!("{}={}", framed(name), framed(value))),
        );
        ProgramKey(parts.join("|"))
    }
}

/// Prefixes user text with its byte length so separators inside it
/// cannot shift part boundaries.
fn framed(text: &str) -> String {
    format!("{}:{}", text.len(), text)
}

fn is_pbr(kind: &MaterialKind) -> bool {
    matches!(kind, MaterialKind::Standard | MaterialKind::Physical)
}
