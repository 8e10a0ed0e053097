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

use prism_core::renderer::{
    BlendMode, BlendState, ColorWrites, CompareFunction, CullFace, FrontFace, PolygonOffset,
    StencilState,
};
use prism_core::scene::{MaterialProperties, Side};

/// The fixed-function state one draw needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    /// Blending, `None` when disabled.
    pub blend: Option<BlendState>,
    /// Depth test enable.
    pub depth_test: bool,
    /// Depth comparison.
    pub depth_func: CompareFunction,
    /// Depth writes.
    pub depth_write: bool,
    /// Stencil test, `None` when disabled.
    pub stencil: Option<StencilState>,
    /// Faces to cull, `None` to draw both.
    pub cull_face: Option<CullFace>,
    /// Winding of front faces.
    pub front_face: FrontFace,
    /// Depth offset, `None` when disabled.
    pub polygon_offset: Option<PolygonOffset>,
    /// Colour channels written.
    pub color_write: ColorWrites,
    /// Alpha-to-coverage enable.
    pub alpha_to_coverage: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            blend: None,
            depth_test: true,
            depth_func: CompareFunction::LessEqual,
            depth_write: true,
            stencil: None,
            cull_face: Some(CullFace::Back),
            front_face: FrontFace::Ccw,
            polygon_offset: None,
            color_write: ColorWrites::ALL,
            alpha_to_coverage: false,
        }
    }
}

impl RenderState {
    /// Derives the state for `material`.
    ///
    /// `flip_sided` is set for objects with a mirrored world transform, which
    /// reverses their winding.
    pub fn from_material(material: &MaterialProperties, flip_sided: bool) -> Self {
        Self::for_side(material, material.side, flip_sided)
    }

    /// Like [`from_material`](Self::from_material) but culling `side` instead
    /// of the material's own side. Shadow passes render with
    /// `shadow_side` when it is set.
    pub fn for_side(material: &MaterialProperties, side: Side, flip_sided: bool) -> Self {
        // Opaque materials with normal blending draw without blending at all.
        let blend = if !material.transparent && material.blending == BlendMode::Normal {
            None
        } else {
            material.blending.resolve(material.premultiplied_alpha)
        };
        let cull_face = match side {
            Side::Front => Some(CullFace::Back),
            Side::Back => Some(CullFace::Front),
            Side::Double => None,
        };
        Self {
            blend,
            depth_test: material.depth_test,
            depth_func: material.depth_func,
            depth_write: material.depth_write,
            stencil: material.stencil,
            cull_face,
            front_face: if flip_sided { FrontFace::Cw } else { FrontFace::Ccw },
            polygon_offset: material.polygon_offset,
            color_write: if material.color_write {
                ColorWrites::ALL
            } else {
                ColorWrites::empty()
            },
            alpha_to_coverage: material.alpha_to_coverage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::scene::{Material, MaterialKind};

    #[test]
    fn test_opaque_normal_blending_is_disabled() {
        let state = RenderState::from_material(&Material::new(MaterialKind::Basic), false);
        assert_eq!(state.blend, None);
        assert_eq!(state.cull_face, Some(CullFace::Back));
        assert_eq!(state.front_face, FrontFace::Ccw);
    }

    #[test]
    fn test_transparent_materials_blend() {
        let material = Material::with(MaterialKind::Basic, |m| m.transparent = true);
        let state = RenderState::from_material(&material, false);
        assert_eq!(state.blend, BlendMode::Normal.resolve(false));
    }

    #[test]
    fn test_additive_blending_applies_when_opaque() {
        let material = Material::with(MaterialKind::Basic, |m| m.blending = BlendMode::Additive);
        assert!(RenderState::from_material(&material, false).blend.is_some());
    }

    #[test]
    fn test_sides_and_mirroring() {
        let double = Material::with(MaterialKind::Basic, |m| m.side = Side::Double);
        assert_eq!(RenderState::from_material(&double, false).cull_face, None);

        let back = Material::with(MaterialKind::Basic, |m| m.side = Side::Back);
        let state = RenderState::from_material(&back, true);
        assert_eq!(state.cull_face, Some(CullFace::Front));
        assert_eq!(state.front_face, FrontFace::Cw);
    }

    #[test]
    fn test_color_write_off_masks_everything() {
        let material = Material::with(MaterialKind::Basic, |m| m.color_write = false);
        assert_eq!(RenderState::from_material(&material, false).color_write, ColorWrites::empty());
    }
}
