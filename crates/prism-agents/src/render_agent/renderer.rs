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

//! Defines the Renderer, the per-frame orchestrator of the lanes.

use super::draw_context::{material_slots, DrawContext, PassInputs};
use super::shadow_pass::ShadowPass;
use ahash::AHashMap;
use prism_core::math::{Color, Frustum, Plane};
use prism_core::renderer::{
    ClearFlags, ClearValues, ColorWrites, FramebufferId, GraphicsDevice, PixelRect, RenderError,
    RenderStats, RendererCapabilities, RendererSettings, ShadowSettings, Viewport,
};
use prism_core::scene::{
    AssetId, BufferAttribute, Camera, Geometry, LightType, Material, RenderTarget, Scene,
    Texture,
};
use prism_lanes::program_lane::ProgramEnvironment;
use prism_lanes::render_list_lane::{
    painter_sort_stable, reverse_painter_sort_stable, RenderItem, RenderItemComparator,
    RenderList, RenderLists,
};
use prism_lanes::resource_lane::GpuRenderTarget;
use prism_lanes::uniform_lane::{LightsState, TransformInputs};
use std::sync::Arc;

/// The surface a frame is drawn into.
#[derive(Debug, Clone, Copy)]
struct Surface {
    framebuffer: Option<FramebufferId>,
    width: u32,
    height: u32,
    depth: bool,
    stencil: bool,
}

/// Draws scenes through a [`GraphicsDevice`], caching every GPU resource it
/// creates.
///
/// The renderer owns its caches; nothing is shared between two renderers.
/// Every frame operation takes `&mut self`.
pub struct Renderer {
    // Caches, state tracker, uniform scratch and stats shared with the shadow pass.
    context: DrawContext,
    // Construction-time configuration. The surface size and shadow flags may change later.
    settings: RendererSettings,
    // Render lists pooled per scene.
    lists: RenderLists,
    // Light uniforms of the frame being drawn.
    lights: LightsState,
    // Shadow map targets and the depth materials rendering them.
    shadows: ShadowPass,
    opaque_sort: RenderItemComparator,
    transparent_sort: RenderItemComparator,
    // Target selected by the caller; `None` draws to the default surface.
    render_target: Option<RenderTarget>,
    // Multi-sampled stand-in for the default surface when antialiasing.
    msaa_target: Option<RenderTarget>,
    // Renderer-wide clipping planes, in world space.
    clipping_planes: Vec<Plane>,
    // Set between a context loss and its restoration.
    context_lost: bool,
}

impl Renderer {
    /// Creates a renderer drawing through `device`.
    ///
    /// Settings are validated first, then reconciled with what the device
    /// supports; every requested feature the device lacks degrades with a
    /// warning.
    pub fn new(device: Arc<dyn GraphicsDevice>, settings: RendererSettings) -> Self {
        let settings = settings.validate();
        let device_caps = device.capabilities();
        let capabilities = RendererCapabilities::resolve(&device_caps, &settings);
        log::info!(
            "Renderer: created on '{}' ({} precision, {}x MSAA, {} texture units)",
            device_caps.adapter_name,
            capabilities.precision.qualifier(),
            capabilities.samples,
            capabilities.max_texture_units
        );

        let msaa_target = (capabilities.samples > 1).then(|| {
            let mut target = RenderTarget::new(settings.width, settings.height)
                .with_samples(capabilities.samples);
            target.depth_buffer = settings.depth;
            target.stencil_buffer = settings.stencil;
            target
        });

        Self {
            context: DrawContext::new(device, capabilities),
            settings,
            lists: RenderLists::new(),
            lights: LightsState::default(),
            shadows: ShadowPass::new(),
            opaque_sort: painter_sort_stable,
            transparent_sort: reverse_painter_sort_stable,
            render_target: None,
            msaa_target,
            clipping_planes: Vec::new(),
            context_lost: false,
        }
    }

    /// Draws `scene` as seen by `camera`.
    ///
    /// Items that fail to compile or upload are skipped and counted in
    /// [`RenderStats::skipped_items`]; the rest of the frame is still drawn.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ContextLost`] when the device context is gone.
    /// Every cache is invalidated and rebuilt once the context comes back.
    pub fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<(), RenderError> {
        self.check_context()?;
        match self.render_frame(scene, camera) {
            Err(RenderError::ContextLost) => {
                self.notify_context_lost();
                Err(RenderError::ContextLost)
            }
            result => result,
        }
    }

    fn render_frame(&mut self, scene: &Scene, camera: &Camera) -> Result<(), RenderError> {
        self.context.begin_frame();

        // 1. Frustum of the camera.
        let frustum = camera.frustum();

        // 2. Project the scene into its render list, uploading geometries on the way.
        {
            let list = self.lists.get(scene.id(), 0);
            list.init();
            project(&mut self.context, list, scene, camera, &frustum)?;
            if self.settings.sort_objects {
                list.sort(self.opaque_sort, self.transparent_sort);
            }
            list.finish();
        }

        // 3. Shadow maps, then the lights that sample them.
        let shadow = self.settings.shadow_map;
        if shadow.enabled && (shadow.auto_update || shadow.needs_update) {
            self.shadows
                .render(&mut self.context, scene, shadow.kind, &self.clipping_planes)?;
            self.settings.shadow_map.needs_update = false;
        }
        let no_shadows = AHashMap::new();
        let infos = if shadow.enabled { self.shadows.infos() } else { &no_shadows };
        self.lights.setup(&scene.lights, &camera.view, infos);
        let environment = self.environment(scene);

        // 4-5. Opaque then transparent items into the output surface.
        let surface = match self.bind_output() {
            Ok(surface) => surface,
            Err(RenderError::ContextLost) => return Err(RenderError::ContextLost),
            Err(error) => {
                log::warn!("Renderer: nothing drawn this frame: {error}");
                self.context.end_frame();
                return Ok(());
            }
        };
        if self.settings.auto_clear {
            let (color, alpha) = match scene.background {
                Some(color) => (color, 1.0),
                None => (self.settings.clear_color, self.settings.clear_alpha()),
            };
            self.clear_surface(&surface, Some((color, alpha)), true, true);
        }
        let log_depth = self.context.capabilities.logarithmic_depth_buffer;
        let pass = PassInputs {
            transforms: TransformInputs::new(camera, log_depth),
            environment: &environment,
            lights: Some(&self.lights),
            fog: scene.fog.as_ref(),
            clipping_planes: &self.clipping_planes,
            depth_buffer: surface.depth,
            stencil_buffer: surface.stencil,
            distance: None,
        };
        let list = self.lists.get(scene.id(), 0);
        for item in list.opaque().chain(list.transparent()) {
            draw_item(&mut self.context, &pass, scene, item)?;
        }

        // 6. Resolve multi-sampled output.
        match self.resolve_output(&surface) {
            Ok(()) => {}
            Err(RenderError::ContextLost) => return Err(RenderError::ContextLost),
            Err(error) => log::warn!("Renderer: output not resolved: {error}"),
        }
        self.context.end_frame();
        Ok(())
    }

    /// Compiles the programs every material of `scene` will need, without
    /// drawing. Shadow-casting lights are counted as if their maps were
    /// already rendered.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ContextLost`] when the device context is gone.
    /// Materials that fail to compile are logged and skipped.
    pub fn compile(&mut self, scene: &Scene, camera: &Camera) -> Result<(), RenderError> {
        self.check_context()?;
        self.lights.setup(&scene.lights, &camera.view, &AHashMap::new());
        if self.settings.shadow_map.enabled {
            let hash = &mut self.lights.hash;
            for light in scene
                .lights
                .iter()
                .filter(|light| light.visible && light.cast_shadow)
            {
                match light.kind {
                    LightType::Directional { .. } => hash.directional_shadows += 1,
                    LightType::Spot { .. } => hash.spot_shadows += 1,
                    LightType::Point { .. } => hash.point_shadows += 1,
                    LightType::Ambient | LightType::Hemisphere { .. } => {}
                }
            }
        }
        let environment = self.environment(scene);

        for object in &scene.objects {
            let Some(geometry) = scene.geometries.get(object.geometry) else {
                continue;
            };
            for (id, _) in material_slots(object, geometry, scene.override_material) {
                let Some(material) = scene.materials.get(id) else {
                    continue;
                };
                match self.context.resolve_program(material, &environment) {
                    Ok(_) | Err(RenderError::ShaderCompile { .. }) => {}
                    Err(RenderError::ContextLost) => {
                        self.notify_context_lost();
                        return Err(RenderError::ContextLost);
                    }
                    Err(error) => log::warn!("Renderer: could not compile {id:?}: {error}"),
                }
            }
        }
        log::debug!("Renderer: {} programs live after compile", self.context.programs.len());
        Ok(())
    }

    /// Clears the current output surface.
    ///
    /// # Errors
    ///
    /// Fails when the output target cannot be allocated or the context is lost.
    pub fn clear(&mut self, color: bool, depth: bool, stencil: bool) -> Result<(), RenderError> {
        self.check_context()?;
        let surface = self.bind_output()?;
        let color = color.then(|| (self.settings.clear_color, self.settings.clear_alpha()));
        self.clear_surface(&surface, color, depth, stencil);
        Ok(())
    }

    fn check_context(&mut self) -> Result<(), RenderError> {
        if self.context.device.is_context_lost() {
            if !self.context_lost {
                self.notify_context_lost();
            }
            return Err(RenderError::ContextLost);
        }
        if self.context_lost {
            self.notify_context_restored();
        }
        Ok(())
    }

    fn environment(&self, scene: &Scene) -> ProgramEnvironment {
        ProgramEnvironment {
            lights: self.lights.hash,
            shadow_map_enabled: self.settings.shadow_map.enabled,
            shadow_map_type: self.settings.shadow_map.kind,
            fog: scene.fog.is_some(),
            global_clipping_planes: self.clipping_planes.len() as u32,
        }
    }

    fn bind_output(&mut self) -> Result<Surface, RenderError> {
        let device = self.context.device.clone();
        let device = device.as_ref();
        let (width, height) = (self.settings.width, self.settings.height);

        let surface = if let Some(target) = &self.render_target {
            let gpu = self.context.targets.update(device, target, &self.context.capabilities)?;
            Surface {
                framebuffer: Some(gpu.framebuffer),
                width: gpu.width,
                height: gpu.height,
                depth: target.depth_buffer,
                stencil: target.depth_buffer && target.stencil_buffer,
            }
        } else if let Some(gpu) = self.bind_msaa(device)? {
            Surface {
                framebuffer: Some(gpu.framebuffer),
                width,
                height,
                depth: self.settings.depth,
                stencil: self.settings.depth && self.settings.stencil,
            }
        } else {
            Surface {
                framebuffer: None,
                width,
                height,
                depth: self.settings.depth,
                stencil: self.settings.stencil,
            }
        };

        self.context.state.bind_framebuffer(device, surface.framebuffer);
        self.context
            .state
            .set_viewport(device, Viewport::full(surface.width, surface.height));
        Ok(surface)
    }

    /// Allocates the multi-sampled stand-in for the default surface.
    ///
    /// A stand-in that cannot be allocated is dropped for good and the
    /// renderer draws to the default surface without antialiasing.
    fn bind_msaa(
        &mut self,
        device: &dyn GraphicsDevice,
    ) -> Result<Option<GpuRenderTarget>, RenderError> {
        let Some(target) = &mut self.msaa_target else {
            return Ok(None);
        };
        target.set_size(self.settings.width, self.settings.height);
        match self.context.targets.update(device, target, &self.context.capabilities) {
            Ok(gpu) => Ok(Some(gpu)),
            Err(RenderError::ContextLost) => Err(RenderError::ContextLost),
            Err(error) => {
                let fallback = RenderError::UnsupportedCapability(format!(
                    "{}x antialiasing ({error})",
                    target.samples
                ));
                log::warn!("Renderer: {fallback}; drawing without antialiasing");
                let id = target.id();
                self.context.targets.dispose(device, id);
                self.msaa_target = None;
                Ok(None)
            }
        }
    }

    fn clear_surface(
        &mut self,
        surface: &Surface,
        color: Option<(Color, f32)>,
        depth: bool,
        stencil: bool,
    ) {
        let device = self.context.device.as_ref();
        let state = &mut self.context.state;
        let mut flags = ClearFlags::empty();
        let mut values = ClearValues::default();
        if let Some((rgb, alpha)) = color {
            state.force_color_mask(device, ColorWrites::ALL);
            let c = rgb.to_vec3();
            values.color = if self.settings.premultiplied_alpha {
                [c.x * alpha, c.y * alpha, c.z * alpha, alpha]
            } else {
                [c.x, c.y, c.z, alpha]
            };
            flags |= ClearFlags::COLOR;
        }
        if depth && surface.depth {
            state.force_depth_mask(device, true);
            flags |= ClearFlags::DEPTH;
        }
        if stencil && surface.stencil {
            state.set_stencil_mask(device, u32::MAX);
            flags |= ClearFlags::STENCIL;
        }
        if !flags.is_empty() {
            device.clear(flags, &values);
        }
    }

    fn resolve_output(&mut self, surface: &Surface) -> Result<(), RenderError> {
        let device = self.context.device.as_ref();
        if let Some(target) = &self.render_target {
            if target.is_multisampled() {
                self.context.targets.resolve(device, target.id())?;
            }
        } else if let Some(target) = &self.msaa_target {
            if let Some(gpu) = self.context.targets.get(target.id()) {
                let (width, height) = (surface.width, surface.height);
                device
                    .blit_framebuffer(gpu.framebuffer, None, width, height, ClearFlags::COLOR)
                    .map_err(|e| RenderError::upload("multi-sampled surface resolve", e))?;
            }
        }
        Ok(())
    }

    /// Selects where the next frames are drawn. `None` draws to the default
    /// surface.
    ///
    /// The target is captured as it is now: call again after resizing it.
    pub fn set_render_target(&mut self, target: Option<&RenderTarget>) {
        self.render_target = target.cloned();
    }

    /// The target frames are currently drawn into.
    pub fn render_target(&self) -> Option<&RenderTarget> {
        self.render_target.as_ref()
    }

    /// Reads back RGBA8 pixels of `target`'s colour attachment, resolved when
    /// it is multi-sampled.
    ///
    /// # Errors
    ///
    /// Fails when the target cannot be allocated, the rectangle lies outside
    /// of it, or the context is lost.
    pub fn read_render_target_pixels(
        &mut self,
        target: &RenderTarget,
        rect: PixelRect,
    ) -> Result<Vec<u8>, RenderError> {
        self.check_context()?;
        let device = self.context.device.clone();
        let device = device.as_ref();
        let gpu = self.context.targets.update(device, target, &self.context.capabilities)?;
        self.context
            .state
            .bind_framebuffer(device, Some(gpu.read_framebuffer()));
        device
            .read_pixels(rect)
            .map_err(|e| RenderError::upload(format!("pixels of {:?}", target.id()), e))
    }

    /// Resizes the default surface.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.settings.width = width.max(1);
        self.settings.height = height.max(1);
    }

    /// Replaces the opaque comparator; `None` restores the default.
    pub fn set_opaque_sort(&mut self, comparator: Option<RenderItemComparator>) {
        self.opaque_sort = comparator.unwrap_or(painter_sort_stable);
    }

    /// Replaces the transparent comparator; `None` restores the default.
    pub fn set_transparent_sort(&mut self, comparator: Option<RenderItemComparator>) {
        self.transparent_sort = comparator.unwrap_or(reverse_painter_sort_stable);
    }

    /// Sets the renderer-wide clipping planes, in world space.
    pub fn set_clipping_planes(&mut self, planes: Vec<Plane>) {
        self.clipping_planes = planes;
    }

    /// Shadow map settings, e.g. to request a single update with
    /// `needs_update` while `auto_update` is off.
    pub fn shadow_map_mut(&mut self) -> &mut ShadowSettings {
        &mut self.settings.shadow_map
    }

    /// Counters of the last frame.
    pub fn info(&self) -> &RenderStats {
        &self.context.stats
    }

    /// Validated settings.
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    /// Features in use after reconciliation with the device.
    pub fn capabilities(&self) -> &RendererCapabilities {
        &self.context.capabilities
    }

    /// Releases the program references held by `material`, and the shadow
    /// depth variants derived from it. Returns `false` when it was never
    /// drawn.
    pub fn dispose_material(&mut self, material: AssetId<Material>) -> bool {
        self.shadows.release_material(&mut self.context, material);
        self.context.release_material(material)
    }

    /// Releases every buffer `geometry` uploaded.
    pub fn dispose_geometry(&mut self, geometry: AssetId<Geometry>) -> bool {
        self.context.release_geometry(geometry)
    }

    /// Releases the buffer of one attribute.
    pub fn dispose_attribute(&mut self, attribute: AssetId<BufferAttribute>) -> bool {
        self.context.release_attribute(attribute)
    }

    /// Releases the GPU copy of `texture`.
    pub fn dispose_texture(&mut self, texture: AssetId<Texture>) -> bool {
        self.context.release_texture(texture)
    }

    /// Releases the attachments of `target`.
    pub fn dispose_render_target(&mut self, target: AssetId<RenderTarget>) -> bool {
        self.context.release_render_target(target)
    }

    /// Releases every GPU resource the renderer created.
    pub fn dispose(&mut self) {
        self.shadows.dispose(&mut self.context);
        self.context.dispose();
        self.lists.dispose();
        log::info!("Renderer: disposed");
    }

    /// Drops every cached handle after the device lost its context.
    ///
    /// Nothing is destroyed on the device: its handles are already gone.
    pub fn notify_context_lost(&mut self) {
        log::warn!("Renderer: context lost, invalidating every cache");
        self.context.invalidate();
        self.shadows.invalidate();
        self.context_lost = true;
    }

    /// Resumes rendering after the context came back. Resources are
    /// re-created lazily by the next frames.
    pub fn notify_context_restored(&mut self) {
        log::info!("Renderer: context restored");
        self.context.invalidate();
        self.context_lost = false;
    }

    /// Whether the renderer considers its context lost.
    pub fn is_context_lost(&self) -> bool {
        self.context_lost
    }
}

/// Pushes one render item per visible material slot of every object that
/// survives frustum culling.
fn project(
    context: &mut DrawContext,
    list: &mut RenderList,
    scene: &Scene,
    camera: &Camera,
    frustum: &Frustum,
) -> Result<(), RenderError> {
    for (index, object) in scene.objects.iter().enumerate() {
        if !object.visible {
            continue;
        }
        let Some(geometry) = scene.geometries.get(object.geometry) else {
            log::debug!("'{}' references missing {:?}", object.name, object.geometry);
            continue;
        };
        let sphere = geometry.bounding_sphere().transformed(&object.world_matrix);
        if object.frustum_culled && !sphere.is_empty() && !frustum.intersects_sphere(&sphere) {
            continue;
        }
        match context.sync_geometry(geometry) {
            Ok(()) => {}
            Err(RenderError::ContextLost) => return Err(RenderError::ContextLost),
            Err(error) => {
                context.skip_item(&object.name, &error);
                continue;
            }
        }

        let center = if sphere.is_empty() {
            object.world_matrix.w_axis.truncate()
        } else {
            sphere.center
        };
        let depth = -camera.view.transform_point3(center).z;
        for (material_id, group) in material_slots(object, geometry, scene.override_material) {
            let Some(material) = scene.materials.get(material_id) else {
                log::debug!("'{}' references missing {material_id:?}", object.name);
                continue;
            };
            if !material.visible {
                continue;
            }
            let item = RenderItem {
                id: 0,
                object: object.id(),
                object_index: index,
                geometry: object.geometry,
                material: material_id,
                program_sort_id: context.materials.sort_id(material_id, &context.programs),
                group_order: object.group_order,
                render_order: object.render_order,
                depth,
                group,
            };
            list.push(item, material.transparent);
        }
    }
    Ok(())
}

fn draw_item(
    context: &mut DrawContext,
    pass: &PassInputs<'_>,
    scene: &Scene,
    item: &RenderItem,
) -> Result<(), RenderError> {
    let (Some(object), Some(geometry), Some(material)) = (
        scene.objects.get(item.object_index),
        scene.geometries.get(item.geometry),
        scene.materials.get(item.material),
    ) else {
        return Ok(());
    };
    let (textures, group, side) = (&scene.textures, item.group, material.side);
    match context.draw(pass, textures, object, geometry, material, group, side) {
        Err(RenderError::ContextLost) => Err(RenderError::ContextLost),
        Err(error) => {
            context.skip_item(&object.name, &error);
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}
