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

//! Renders the shadow maps sampled by lit materials.

use super::draw_context::{material_slots, DrawContext, PassInputs};
use ahash::AHashMap;
use prism_core::math::{Plane, Vec2};
use prism_core::renderer::{
    ClearFlags, ClearValues, ColorWrites, GraphicsDevice, RenderError, ShadowMapType,
    TextureFormat, Viewport,
};
use prism_core::scene::{
    AssetId, DepthPacking, Geometry, Light, LightType, Material, MaterialKind, MaterialProperties,
    RenderTarget, Scene,
};
use prism_lanes::program_lane::{ProgramEnvironment, ProgramSource};
use prism_lanes::shadow_lane::{light_views, shadow_map_size, ShadowMapInfo};
use prism_lanes::uniform_lane::{refresh_vsm_blur, TransformInputs};

#[derive(Debug)]
struct ShadowMap {
    target: RenderTarget,
    // Intermediate target of the separable blur, variance maps only.
    blur: Option<RenderTarget>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DepthKind {
    Depth,
    VarianceDepth,
    Distance,
}

/// A depth material carrying the clipping and cut-out inputs of one caster
/// material.
#[derive(Debug)]
struct DepthVariant {
    source_version: u64,
    material: Material,
}

type DepthVariants = AHashMap<(AssetId<Material>, DepthKind), DepthVariant>;

/// Shadow map targets and the materials that fill them.
pub(crate) struct ShadowPass {
    maps: AHashMap<AssetId<Light>, ShadowMap>,
    infos: AHashMap<AssetId<Light>, ShadowMapInfo>,
    variants: DepthVariants,
    depth: Material,
    variance_depth: Material,
    distance: Material,
    blur_vertical: Material,
    blur_horizontal: Material,
    quad: Geometry,
}

impl ShadowPass {
    pub fn new() -> Self {
        let named = |kind: MaterialKind, name: &str| {
            Material::with(kind, |m| m.name = name.to_string())
        };
        let blur = |name: &str, horizontal: bool| {
            Material::with(MaterialKind::Shader(ProgramSource::vsm_blur()), |m| {
                m.name = name.to_string();
                m.depth_test = false;
                m.depth_write = false;
                if horizontal {
                    m.defines.insert("HORIZONTAL_PASS".to_string(), "1".to_string());
                }
            })
        };
        Self {
            maps: AHashMap::new(),
            infos: AHashMap::new(),
            variants: AHashMap::new(),
            depth: named(MaterialKind::Depth(DepthPacking::Rgba), "ShadowDepth"),
            variance_depth: named(MaterialKind::Depth(DepthPacking::Basic), "ShadowVarianceDepth"),
            distance: named(MaterialKind::Distance, "ShadowDistance"),
            blur_vertical: blur("ShadowBlurVertical", false),
            blur_horizontal: blur("ShadowBlurHorizontal", true),
            quad: Geometry::plane(2.0, 2.0),
        }
    }

    /// Maps rendered by the last [`render`](Self::render), by light.
    pub fn infos(&self) -> &AHashMap<AssetId<Light>, ShadowMapInfo> {
        &self.infos
    }

    /// Renders one map per visible shadow-casting light.
    ///
    /// A light whose map cannot be allocated is skipped with a warning and
    /// lights the scene unshadowed. Only a lost context aborts the pass.
    pub fn render(
        &mut self,
        context: &mut DrawContext,
        scene: &Scene,
        kind: ShadowMapType,
        clipping_planes: &[Plane],
    ) -> Result<(), RenderError> {
        self.infos.clear();
        let casters: Vec<&Light> = scene
            .lights
            .iter()
            .filter(|light| light.visible && light.cast_shadow && light.supports_shadows())
            .collect();

        let stale: Vec<_> = self
            .maps
            .keys()
            .filter(|id| !casters.iter().any(|light| light.id() == **id))
            .copied()
            .collect();
        for id in stale {
            if let Some(map) = self.maps.remove(&id) {
                release_map(context, &map);
            }
        }

        let environment = ProgramEnvironment {
            global_clipping_planes: clipping_planes.len() as u32,
            ..ProgramEnvironment::default()
        };
        for light in casters {
            match self.render_light(context, scene, light, kind, &environment, clipping_planes) {
                Ok(info) => {
                    self.infos.insert(light.id(), info);
                }
                Err(RenderError::ContextLost) => return Err(RenderError::ContextLost),
                Err(error) => log::warn!("Shadow map of {:?} skipped: {error}", light.id()),
            }
        }
        Ok(())
    }

    fn render_light(
        &mut self,
        context: &mut DrawContext,
        scene: &Scene,
        light: &Light,
        kind: ShadowMapType,
        environment: &ProgramEnvironment,
        clipping_planes: &[Plane],
    ) -> Result<ShadowMapInfo, RenderError> {
        let variance = kind == ShadowMapType::Vsm && !matches!(light.kind, LightType::Point { .. });
        let format = if variance && context.capabilities.float_textures {
            TextureFormat::Rgba16Float
        } else {
            TextureFormat::Rgba8
        };
        let (width, height) = shadow_map_size(light);
        let map = self.maps.entry(light.id()).or_insert_with(|| ShadowMap {
            target: RenderTarget::new(width, height),
            blur: None,
        });
        if map.target.format != format {
            map.target.format = format;
            map.target.bump_version();
        }
        map.target.set_size(width, height);

        let device = context.device.clone();
        let device: &dyn GraphicsDevice = device.as_ref();
        let gpu = context.targets.update(device, &map.target, &context.capabilities)?;
        context.state.bind_framebuffer(device, Some(gpu.framebuffer));
        context.state.set_viewport(device, Viewport::full(width, height));
        context.state.force_color_mask(device, ColorWrites::ALL);
        context.state.force_depth_mask(device, true);
        device.clear(
            ClearFlags::COLOR | ClearFlags::DEPTH,
            &ClearValues {
                color: [1.0; 4],
                ..ClearValues::default()
            },
        );

        let (base, depth_kind) = match light.kind {
            LightType::Point { .. } => (&self.distance, DepthKind::Distance),
            _ if variance => (&self.variance_depth, DepthKind::VarianceDepth),
            _ => (&self.depth, DepthKind::Depth),
        };
        let distance = match light.kind {
            LightType::Point { .. } => {
                let info = ShadowMapInfo::new(light, gpu.texture());
                Some((light.position, info.camera_near, info.camera_far))
            }
            _ => None,
        };

        for view in light_views(light) {
            context.state.set_viewport(device, view.viewport);
            let frustum = view.camera.frustum();
            let log_depth = context.capabilities.logarithmic_depth_buffer;
            let pass = PassInputs {
                transforms: TransformInputs::new(&view.camera, log_depth),
                environment,
                lights: None,
                fog: None,
                clipping_planes,
                depth_buffer: true,
                stencil_buffer: false,
                distance,
            };

            for object in scene.objects.iter().filter(|o| o.visible && o.cast_shadow) {
                let Some(geometry) = scene.geometries.get(object.geometry) else {
                    continue;
                };
                let sphere = geometry.bounding_sphere().transformed(&object.world_matrix);
                if object.frustum_culled
                    && !sphere.is_empty()
                    && !frustum.intersects_sphere(&sphere)
                {
                    continue;
                }
                let slots = material_slots(object, geometry, scene.override_material);
                for (material_id, group) in slots {
                    let Some(source) = scene.materials.get(material_id) else {
                        continue;
                    };
                    if !source.visible {
                        continue;
                    }
                    let side = source.shadow_side.unwrap_or_else(|| source.side.flipped());
                    let material = depth_material(&mut self.variants, base, depth_kind, source);
                    let textures = &scene.textures;
                    match context.draw(&pass, textures, object, geometry, material, group, side) {
                        Ok(()) => {}
                        Err(RenderError::ContextLost) => return Err(RenderError::ContextLost),
                        Err(error) => context.skip_item(&object.name, &error),
                    }
                }
            }
        }

        if variance {
            let blur = map.blur.get_or_insert_with(|| {
                let mut target = RenderTarget::new(width, height);
                target.depth_buffer = false;
                target
            });
            if blur.format != format {
                blur.format = format;
                blur.bump_version();
            }
            blur.set_size(width, height);
            let blur_gpu = context.targets.update(device, blur, &context.capabilities)?;
            let resolution = Vec2::new(width as f32, height as f32);
            let (radius, samples) = (light.shadow.radius, light.shadow.blur_samples);

            context.state.bind_framebuffer(device, Some(blur_gpu.framebuffer));
            context.state.set_viewport(device, Viewport::full(width, height));
            context.draw_fullscreen(
                &self.blur_vertical,
                &self.quad,
                gpu.texture(),
                |values, unit| refresh_vsm_blur(values, unit, resolution, Vec2::Y, radius, samples),
            )?;
            context.state.bind_framebuffer(device, Some(gpu.framebuffer));
            context.draw_fullscreen(
                &self.blur_horizontal,
                &self.quad,
                blur_gpu.texture(),
                |values, unit| refresh_vsm_blur(values, unit, resolution, Vec2::X, radius, samples),
            )?;
        }

        Ok(ShadowMapInfo::new(light, gpu.texture()))
    }

    /// Forgets rendered maps after a context loss. Targets are re-allocated
    /// on the next render.
    pub fn invalidate(&mut self) {
        self.infos.clear();
    }

    /// Releases the depth variants derived from `material`.
    pub fn release_material(&mut self, context: &mut DrawContext, material: AssetId<Material>) {
        self.variants.retain(|(source, _), variant| {
            if *source != material {
                return true;
            }
            context.release_material(variant.material.id());
            false
        });
    }

    /// Releases every map and the pass's own programs and buffers.
    pub fn dispose(&mut self, context: &mut DrawContext) {
        for (_, map) in self.maps.drain() {
            release_map(context, &map);
        }
        for (_, variant) in self.variants.drain() {
            context.release_material(variant.material.id());
        }
        self.infos.clear();
        for material in [
            &self.depth,
            &self.variance_depth,
            &self.distance,
            &self.blur_vertical,
            &self.blur_horizontal,
        ] {
            context.release_material(material.id());
        }
        context.release_geometry(self.quad.id());
    }
}

/// The material drawing `source` into a shadow map.
///
/// Casters that clip or cut out fragments get their own copy of `base`, kept
/// in step with `source`; every other caster shares `base`.
fn depth_material<'a>(
    variants: &'a mut DepthVariants,
    base: &'a Material,
    kind: DepthKind,
    source: &Material,
) -> &'a Material {
    let shapes_depth = !source.clipping_planes.is_empty()
        || source.alpha_test > 0.0
        || source.map.is_some()
        || source.alpha_map.is_some();
    if !shapes_depth {
        return base;
    }
    let variant = variants.entry((source.id(), kind)).or_insert_with(|| DepthVariant {
        source_version: source.version(),
        material: Material::with(base.kind.clone(), |m| {
            m.name = base.name.clone();
            carry_depth_inputs(m, source);
        }),
    });
    if variant.source_version != source.version() {
        variant.material.edit(|m| carry_depth_inputs(m, source));
        variant.source_version = source.version();
    }
    &variant.material
}

fn carry_depth_inputs(target: &mut MaterialProperties, source: &MaterialProperties) {
    target.clipping_planes = source.clipping_planes.clone();
    target.clip_intersection = source.clip_intersection;
    target.alpha_test = source.alpha_test;
    target.opacity = source.opacity;
    target.map = source.map;
    target.alpha_map = source.alpha_map;
}

fn release_map(context: &mut DrawContext, map: &ShadowMap) {
    context.release_render_target(map.target.id());
    if let Some(blur) = &map.blur {
        context.release_render_target(blur.id());
    }
}
