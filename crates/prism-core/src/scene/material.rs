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

//! Materials: how a surface looks and which GPU state it needs.

use super::asset::{Asset, AssetId};
use super::texture::Texture;
use crate::math::{Color, Plane, Vec2};
use crate::renderer::api::{BlendMode, CompareFunction, PolygonOffset, StencilState, UniformValue};
use std::collections::BTreeMap;
use std::ops::Deref;

/// Which faces of a polygon are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Side {
    /// Front faces only.
    #[default]
    Front,
    /// Back faces only.
    Back,
    /// Both faces.
    Double,
}

impl Side {
    /// The opposite side; `Double` stays `Double`.
    pub fn flipped(self) -> Self {
        match self {
            Side::Front => Side::Back,
            Side::Back => Side::Front,
            Side::Double => Side::Double,
        }
    }
}

/// How depth is written by a [`MaterialKind::Depth`] material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthPacking {
    /// Grey-scale depth in the colour channels.
    #[default]
    Basic,
    /// Depth packed across the four RGBA channels.
    Rgba,
}

/// User-provided shader stages for [`MaterialKind::Shader`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderSource {
    /// Vertex stage body (without the generated prefix).
    pub vertex: String,
    /// Fragment stage body (without the generated prefix).
    pub fragment: String,
}

/// The closed set of material kinds the renderer can generate programs for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum MaterialKind {
    /// Unlit colour and texture.
    #[default]
    Basic,
    /// Per-vertex diffuse lighting.
    Lambert,
    /// Per-fragment Blinn-Phong lighting.
    Phong,
    /// Metallic-roughness physically based lighting.
    Standard,
    /// [`Standard`](Self::Standard) with a clear-coat layer.
    Physical,
    /// Depth output, used for shadow maps and depth pre-passes.
    Depth(DepthPacking),
    /// Distance-to-light output, used for point-light shadow maps.
    Distance,
    /// View-space normals as colours.
    Normal,
    /// Custom shader stages.
    Shader(ShaderSource),
}

impl MaterialKind {
    /// Short, stable name used in program labels and cache keys.
    pub fn name(&self) -> &'static str {
        match self {
            MaterialKind::Basic => "basic",
            MaterialKind::Lambert => "lambert",
            MaterialKind::Phong => "phong",
            MaterialKind::Standard => "standard",
            MaterialKind::Physical => "physical",
            MaterialKind::Depth(_) => "depth",
            MaterialKind::Distance => "distance",
            MaterialKind::Normal => "normal",
            MaterialKind::Shader(_) => "shader",
        }
    }

    /// Returns `true` if programs of this kind read scene lights.
    pub fn is_lit(&self) -> bool {
        matches!(
            self,
            MaterialKind::Lambert
                | MaterialKind::Phong
                | MaterialKind::Standard
                | MaterialKind::Physical
        )
    }
}

/// Every user-editable property of a [`Material`].
///
/// Reachable read-only through `Deref` on [`Material`] and mutably only
/// through [`Material::edit`], which advances the material's version.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialProperties {
    /// Material kind.
    pub kind: MaterialKind,
    /// Debug name.
    pub name: String,
    /// Whether objects using this material are drawn.
    pub visible: bool,

    // --- Surface ---
    /// Base colour.
    pub color: Color,
    /// Opacity in `[0, 1]`; only effective when `transparent` is set.
    pub opacity: f32,
    /// Emitted colour.
    pub emissive: Color,
    /// Scale applied to `emissive`.
    pub emissive_intensity: f32,
    /// Specular colour (Phong).
    pub specular: Color,
    /// Specular exponent (Phong).
    pub shininess: f32,
    /// Surface roughness (Standard, Physical).
    pub roughness: f32,
    /// Metalness (Standard, Physical).
    pub metalness: f32,
    /// Clear-coat strength (Physical).
    pub clearcoat: f32,
    /// Clear-coat roughness (Physical).
    pub clearcoat_roughness: f32,
    /// Fragments with alpha below this value are discarded (0 = off).
    pub alpha_test: f32,
    /// Use per-vertex colours.
    pub vertex_colors: bool,
    /// Use face normals instead of interpolated ones.
    pub flat_shading: bool,
    /// Affected by scene fog.
    pub fog: bool,

    // --- Textures ---
    /// Colour map.
    pub map: Option<AssetId<Texture>>,
    /// Tangent-space normal map.
    pub normal_map: Option<AssetId<Texture>>,
    /// Normal map strength per axis.
    pub normal_scale: Vec2,
    /// Emissive map.
    pub emissive_map: Option<AssetId<Texture>>,
    /// Grey-scale opacity map.
    pub alpha_map: Option<AssetId<Texture>>,
    /// Roughness map (green channel).
    pub roughness_map: Option<AssetId<Texture>>,
    /// Metalness map (blue channel).
    pub metalness_map: Option<AssetId<Texture>>,
    /// Ambient occlusion map (red channel).
    pub ao_map: Option<AssetId<Texture>>,
    /// Ambient occlusion strength.
    pub ao_map_intensity: f32,

    // --- Render state ---
    /// Blending preset.
    pub blending: BlendMode,
    /// Colours are premultiplied by alpha.
    pub premultiplied_alpha: bool,
    /// Drawn in the transparent pass, back to front.
    pub transparent: bool,
    /// Depth testing.
    pub depth_test: bool,
    /// Depth writes.
    pub depth_write: bool,
    /// Depth comparison.
    pub depth_func: CompareFunction,
    /// Stencil configuration; `None` disables stencil testing.
    pub stencil: Option<StencilState>,
    /// Rendered faces.
    pub side: Side,
    /// Rendered faces in shadow passes; `None` uses the opposite of `side`.
    pub shadow_side: Option<Side>,
    /// Polygon offset; `None` disables it.
    pub polygon_offset: Option<PolygonOffset>,
    /// Colour writes.
    pub color_write: bool,
    /// Alpha-to-coverage on multi-sampled targets.
    pub alpha_to_coverage: bool,

    // --- Clipping ---
    /// World-space clipping planes local to this material.
    pub clipping_planes: Vec<Plane>,
    /// Clip only where all planes agree instead of where any does.
    pub clip_intersection: bool,

    // --- Custom shaders ---
    /// Extra `#define`s injected into generated programs.
    pub defines: BTreeMap<String, String>,
    /// Uniform values for custom shaders.
    pub uniforms: BTreeMap<String, UniformValue>,
    /// Sampler uniforms for custom shaders.
    pub textures: BTreeMap<String, AssetId<Texture>>,
}

impl MaterialProperties {
    fn for_kind(kind: MaterialKind) -> Self {
        Self {
            kind,
            name: String::new(),
            visible: true,
            color: Color::WHITE,
            opacity: 1.0,
            emissive: Color::BLACK,
            emissive_intensity: 1.0,
            specular: Color::new(0.067, 0.067, 0.067),
            shininess: 30.0,
            roughness: 1.0,
            metalness: 0.0,
            clearcoat: 0.0,
            clearcoat_roughness: 0.0,
            alpha_test: 0.0,
            vertex_colors: false,
            flat_shading: false,
            fog: true,
            map: None,
            normal_map: None,
            normal_scale: Vec2::ONE,
            emissive_map: None,
            alpha_map: None,
            roughness_map: None,
            metalness_map: None,
            ao_map: None,
            ao_map_intensity: 1.0,
            blending: BlendMode::Normal,
            premultiplied_alpha: false,
            transparent: false,
            depth_test: true,
            depth_write: true,
            depth_func: CompareFunction::LessEqual,
            stencil: None,
            side: Side::Front,
            shadow_side: None,
            polygon_offset: None,
            color_write: true,
            alpha_to_coverage: false,
            clipping_planes: Vec::new(),
            clip_intersection: false,
            defines: BTreeMap::new(),
            uniforms: BTreeMap::new(),
            textures: BTreeMap::new(),
        }
    }

    /// Every texture referenced by the material, including custom samplers.
    pub fn texture_refs(&self) -> impl Iterator<Item = AssetId<Texture>> + '_ {
        [
            self.map,
            self.normal_map,
            self.emissive_map,
            self.alpha_map,
            self.roughness_map,
            self.metalness_map,
            self.ao_map,
        ]
        .into_iter()
        .flatten()
        .chain(self.textures.values().copied())
    }
}

/// A versioned, identity-carrying material.
///
/// ```
/// use prism_core::math::Color;
/// use prism_core::scene::{Material, MaterialKind};
///
/// let mut material = Material::new(MaterialKind::Standard);
/// let before = material.version();
/// material.edit(|m| m.color = Color::new(1.0, 0.0, 0.0));
/// assert_eq!(material.version(), before + 1);
/// assert_eq!(material.color, Color::new(1.0, 0.0, 0.0));
/// ```
#[derive(Debug, Clone)]
pub struct Material {
    id: AssetId<Material>,
    version: u64,
    properties: MaterialProperties,
}

impl Material {
    /// Creates a material of `kind` with default properties.
    pub fn new(kind: MaterialKind) -> Self {
        Self {
            id: AssetId::generate(),
            version: 0,
            properties: MaterialProperties::for_kind(kind),
        }
    }

    /// Creates a material and configures it before first use.
    pub fn with(kind: MaterialKind, configure: impl FnOnce(&mut MaterialProperties)) -> Self {
        let mut material = Self::new(kind);
        configure(&mut material.properties);
        material
    }

    /// The material's identity.
    pub fn id(&self) -> AssetId<Material> {
        self.id
    }

    /// The current version. Every mutation advances it.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Mutates the material's properties and advances its version once.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut MaterialProperties) -> R) -> R {
        let result = f(&mut self.properties);
        self.version += 1;
        result
    }

    /// Advances the version without changing any property, forcing caches
    /// to re-evaluate the material.
    pub fn bump_version(&mut self) {
        self.version += 1;
    }
}

impl Deref for Material {
    type Target = MaterialProperties;

    fn deref(&self) -> &MaterialProperties {
        &self.properties
    }
}

impl Asset for Material {
    fn id(&self) -> AssetId<Self> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_materials_have_distinct_ids() {
        let a = Material::new(MaterialKind::Basic);
        let b = Material::new(MaterialKind::Basic);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.version(), 0);
    }

    #[test]
    fn test_edit_bumps_version_once() {
        let mut m = Material::new(MaterialKind::Phong);
        m.edit(|p| {
            p.shininess = 10.0;
            p.transparent = true;
        });
        assert_eq!(m.version(), 1);
        assert!(m.transparent);
        m.bump_version();
        assert_eq!(m.version(), 2);
    }

    #[test]
    fn test_with_does_not_bump_version() {
        let m = Material::with(MaterialKind::Lambert, |p| p.opacity = 0.5);
        assert_eq!(m.version(), 0);
        assert_eq!(m.opacity, 0.5);
    }

    #[test]
    fn test_clone_keeps_identity() {
        let m = Material::new(MaterialKind::Normal);
        assert_eq!(m.clone().id(), m.id());
    }

    #[test]
    fn test_texture_refs_include_custom_samplers() {
        let map = AssetId::<Texture>::generate();
        let custom = AssetId::<Texture>::generate();
        let m = Material::with(MaterialKind::Basic, |p| {
            p.map = Some(map);
            p.textures.insert("lut".into(), custom);
        });
        assert_eq!(m.texture_refs().collect::<Vec<_>>(), vec![map, custom]);
    }

    #[test]
    fn test_kind_names_and_lighting() {
        assert_eq!(MaterialKind::Depth(DepthPacking::Rgba).name(), "depth");
        assert!(MaterialKind::Physical.is_lit());
        assert!(!MaterialKind::Basic.is_lit());
        assert_eq!(Side::Front.flipped(), Side::Back);
    }
}
