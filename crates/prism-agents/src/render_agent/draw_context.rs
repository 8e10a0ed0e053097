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

//! Caches and per-draw scratch shared by every pass of a frame.

use super::materials::MaterialPrograms;
use prism_core::math::{Plane, Vec3};
use prism_core::renderer::{
    DeviceError, GraphicsDevice, PrimitiveMode, ProgramId, RenderError, RenderStats,
    RendererCapabilities, TextureId,
};
use prism_core::scene::{
    AssetId, Assets, BufferAttribute, Fog, Geometry, GeometryGroup, Material, RenderTarget,
    SceneObject, Side, Texture,
};
use prism_lanes::program_lane::{ProgramCache, ProgramEnvironment, ProgramHandle};
use prism_lanes::resource_lane::{AttributeCache, GeometryCache, RenderTargetCache, TextureCache};
use prism_lanes::state_lane::{GpuStateTracker, RenderState};
use prism_lanes::uniform_lane::{
    refresh_clipping, refresh_distance, refresh_fog, refresh_material, refresh_transforms,
    LightsState, TextureUnits, TransformInputs, UniformBinder, UniformValues,
};
use std::sync::Arc;

/// What one pass feeds every draw it issues.
pub(crate) struct PassInputs<'a> {
    pub transforms: TransformInputs,
    pub environment: &'a ProgramEnvironment,
    /// `None` in passes that do not light (shadow depth passes).
    pub lights: Option<&'a LightsState>,
    pub fog: Option<&'a Fog>,
    pub clipping_planes: &'a [Plane],
    /// Whether the bound surface has a depth buffer.
    pub depth_buffer: bool,
    /// Whether the bound surface has a stencil buffer.
    pub stencil_buffer: bool,
    /// Reference point, near and far of the distance material.
    pub distance: Option<(Vec3, f32, f32)>,
}

/// Every GPU-side cache of one renderer.
pub(crate) struct DrawContext {
    pub device: Arc<dyn GraphicsDevice>,
    pub capabilities: RendererCapabilities,
    pub programs: ProgramCache,
    pub materials: MaterialPrograms,
    pub state: GpuStateTracker,
    pub attributes: AttributeCache,
    pub geometries: GeometryCache,
    pub textures: TextureCache,
    pub targets: RenderTargetCache,
    pub binder: UniformBinder,
    pub units: TextureUnits,
    pub values: UniformValues,
    pub stats: RenderStats,
    pub frame: u64,
}

impl DrawContext {
    pub fn new(device: Arc<dyn GraphicsDevice>, capabilities: RendererCapabilities) -> Self {
        let units = TextureUnits::new(capabilities.max_texture_units);
        Self {
            device,
            capabilities,
            programs: ProgramCache::new(),
            materials: MaterialPrograms::default(),
            state: GpuStateTracker::new(),
            attributes: AttributeCache::new(),
            geometries: GeometryCache::new(),
            textures: TextureCache::new(),
            targets: RenderTargetCache::new(),
            binder: UniformBinder::new(),
            units,
            values: UniformValues::new(),
            stats: RenderStats::default(),
            frame: 0,
        }
    }

    pub fn begin_frame(&mut self) {
        self.frame += 1;
        self.stats.begin_frame();
    }

    /// Copies the live cache sizes into the stats.
    pub fn end_frame(&mut self) {
        self.stats.programs = self.programs.len() as u32;
        self.stats.geometries = self.geometries.len() as u32;
        self.stats.textures = self.textures.len() as u32;
    }

    /// Uploads whatever changed in `geometry` since it was last drawn.
    pub fn sync_geometry(&mut self, geometry: &Geometry) -> Result<(), RenderError> {
        self.geometries
            .update(self.device.as_ref(), &mut self.attributes, geometry, self.frame)
    }

    /// Resolves the program of `material` without drawing anything.
    pub fn resolve_program(
        &mut self,
        material: &Material,
        environment: &ProgramEnvironment,
    ) -> Result<ProgramHandle, RenderError> {
        let device = self.device.as_ref();
        let (binder, state) = (&mut self.binder, &mut self.state);
        self.materials.resolve(
            device,
            &mut self.programs,
            material,
            environment,
            &self.capabilities,
            &mut |id| forget_program(binder, state, id),
        )
    }

    /// Issues one draw of `geometry` (or its `group`) with `material`.
    ///
    /// Faces are culled according to `side`, which is the material's own side
    /// in colour passes and its shadow side in depth passes.
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &mut self,
        pass: &PassInputs<'_>,
        textures: &Assets<Texture>,
        object: &SceneObject,
        geometry: &Geometry,
        material: &Material,
        group: Option<GeometryGroup>,
        side: Side,
    ) -> Result<(), RenderError> {
        let handle = self.resolve_program(material, pass.environment)?;
        let device = self.device.as_ref();
        let program = self
            .programs
            .get(handle)
            .ok_or_else(|| missing_program(material, handle))?;

        let mut state = RenderState::for_side(material, side, object.is_mirrored());
        if !pass.depth_buffer {
            state.depth_test = false;
            state.depth_write = false;
        }
        if !pass.stencil_buffer {
            state.stencil = None;
        }
        self.state.apply(device, &state);
        self.state.use_program(device, Some(program.id()));

        self.geometries
            .update(device, &mut self.attributes, geometry, self.frame)?;
        self.geometries.bind(device, &self.attributes, geometry, program);

        self.units.reset();
        self.values.clear();
        refresh_transforms(&mut self.values, &object.world_matrix, &pass.transforms);

        let mut failure = None;
        {
            let (cache, units, tracker) = (&mut self.textures, &mut self.units, &mut self.state);
            let capabilities = &self.capabilities;
            let mut sampler = |id: AssetId<Texture>| -> Option<i32> {
                let Some(texture) = textures.get(id) else {
                    log::debug!("{:?} references missing {id:?}", material.id());
                    return None;
                };
                let gpu = match cache.update(device, texture, capabilities) {
                    Ok(gpu) => gpu,
                    Err(error) => {
                        failure.get_or_insert(error);
                        return None;
                    }
                };
                let unit = units.allocate()?;
                tracker.bind_texture(device, unit, Some(gpu.id));
                Some(unit as i32)
            };
            refresh_material(&mut self.values, material, &mut sampler);
        }
        if let Some(error) = failure {
            return Err(error);
        }

        if material.kind.is_lit() {
            if let Some(lights) = pass.lights {
                let tracker = &mut self.state;
                lights.write(&mut self.values, &mut self.units, &mut |unit, texture| {
                    tracker.bind_texture(device, unit, Some(texture))
                });
                self.values.set("receiveShadow", i32::from(object.receive_shadow));
            }
        }
        if material.fog {
            if let Some(fog) = pass.fog {
                refresh_fog(&mut self.values, fog);
            }
        }
        refresh_clipping(&mut self.values, pass.clipping_planes, material, &pass.transforms.view);
        if let Some((reference, near, far)) = pass.distance {
            refresh_distance(&mut self.values, reference, near, far);
        }
        self.binder.upload(device, program, &self.values);

        let (first, count) = draw_span(geometry, group);
        if count == 0 {
            return Ok(());
        }
        submit(device, geometry, object.primitive, first, count)?;
        self.stats.record_draw(object.primitive, count);
        Ok(())
    }

    /// Draws `quad` with a full-screen `material` sampling `source` on the
    /// first texture unit.
    pub fn draw_fullscreen(
        &mut self,
        material: &Material,
        quad: &Geometry,
        source: TextureId,
        fill: impl FnOnce(&mut UniformValues, i32),
    ) -> Result<(), RenderError> {
        let handle = self.resolve_program(material, &ProgramEnvironment::default())?;
        let device = self.device.as_ref();
        let program = self
            .programs
            .get(handle)
            .ok_or_else(|| missing_program(material, handle))?;

        self.state.apply(device, &RenderState::from_material(material, false));
        self.state.use_program(device, Some(program.id()));
        self.geometries
            .update(device, &mut self.attributes, quad, self.frame)?;
        self.geometries.bind(device, &self.attributes, quad, program);

        self.units.reset();
        let unit = self.units.allocate().ok_or_else(|| {
            RenderError::UnsupportedCapability("no texture unit for a full-screen pass".to_string())
        })?;
        self.state.bind_texture(device, unit, Some(source));
        self.values.clear();
        fill(&mut self.values, unit as i32);
        self.binder.upload(device, program, &self.values);

        let (first, count) = draw_span(quad, None);
        submit(device, quad, PrimitiveMode::Triangles, first, count)?;
        self.stats.record_draw(PrimitiveMode::Triangles, count);
        Ok(())
    }

    /// Logs a failed item and counts it as skipped.
    pub fn skip_item(&mut self, name: &str, error: &RenderError) {
        self.stats.skipped_items += 1;
        match error {
            // Already reported with sources when the build failed.
            RenderError::ShaderCompile { label, .. } => {
                log::debug!("Skipping '{name}': program '{label}' is unavailable")
            }
            other => log::warn!("Skipping '{name}': {other}"),
        }
    }

    pub fn release_material(&mut self, material: AssetId<Material>) -> bool {
        let device = self.device.as_ref();
        let (binder, state) = (&mut self.binder, &mut self.state);
        self.materials.release(device, &mut self.programs, material, &mut |id| {
            forget_program(binder, state, id)
        })
    }

    pub fn release_geometry(&mut self, geometry: AssetId<Geometry>) -> bool {
        self.geometries
            .dispose(self.device.as_ref(), &mut self.attributes, geometry)
    }

    pub fn release_attribute(&mut self, attribute: AssetId<BufferAttribute>) -> bool {
        let removed = self.attributes.remove(self.device.as_ref(), attribute);
        if removed {
            self.geometries.reset_binding();
        }
        removed
    }

    pub fn release_texture(&mut self, texture: AssetId<Texture>) -> bool {
        match self.textures.dispose(self.device.as_ref(), texture) {
            Some(id) => {
                self.state.forget_texture(id);
                true
            }
            None => false,
        }
    }

    pub fn release_render_target(&mut self, target: AssetId<RenderTarget>) -> bool {
        if let Some(gpu) = self.targets.get(target).copied() {
            self.state.forget_framebuffer(gpu.framebuffer);
            self.state.forget_texture(gpu.color);
            if let Some((framebuffer, texture)) = gpu.resolve {
                self.state.forget_framebuffer(framebuffer);
                self.state.forget_texture(texture);
            }
        }
        self.targets.dispose(self.device.as_ref(), target)
    }

    /// Forgets every GPU handle without calling the device, after its
    /// context went away.
    pub fn invalidate(&mut self) {
        self.programs.invalidate();
        self.materials.clear();
        self.attributes.clear();
        self.geometries.clear();
        self.textures.clear();
        self.targets.clear();
        self.binder.clear();
        self.state.invalidate();
    }

    /// Destroys every GPU resource the caches own.
    pub fn dispose(&mut self) {
        let device = self.device.as_ref();
        self.programs.dispose(device);
        self.materials.clear();
        self.attributes.dispose(device);
        self.geometries.clear();
        self.textures.dispose_all(device);
        self.targets.dispose_all(device);
        self.binder.clear();
        self.state.invalidate();
    }
}

fn forget_program(binder: &mut UniformBinder, state: &mut GpuStateTracker, id: ProgramId) {
    binder.forget_program(id);
    state.forget_program(id);
}

fn missing_program(material: &Material, handle: ProgramHandle) -> RenderError {
    RenderError::upload(
        format!("program of {:?}", material.id()),
        DeviceError::InvalidHandle {
            kind: "program",
            id: handle.id().0,
        },
    )
}

/// First element and element count drawn for `geometry`, clipped to its
/// draw range and to `group`.
pub(crate) fn draw_span(geometry: &Geometry, group: Option<GeometryGroup>) -> (u32, u32) {
    let total = geometry.element_count();
    let range = geometry.draw_range;
    let mut start = range.start.min(total);
    let mut end = range
        .count
        .map_or(total, |count| range.start.saturating_add(count))
        .min(total);
    if let Some(group) = group {
        start = start.max(group.start);
        end = end.min(group.start.saturating_add(group.count));
    }
    (start, end.saturating_sub(start))
}

fn submit(
    device: &dyn GraphicsDevice,
    geometry: &Geometry,
    mode: PrimitiveMode,
    first: u32,
    count: u32,
) -> Result<(), RenderError> {
    match geometry.index() {
        Some(index) => {
            let format = index.index_format().ok_or_else(|| {
                RenderError::upload(
                    format!("index of {:?}", geometry.id()),
                    DeviceError::InvalidFormat("indices must be u16 or u32".to_string()),
                )
            })?;
            device.draw_indexed(mode, format, first, count);
        }
        None => device.draw(mode, first, count),
    }
    Ok(())
}

/// The materials `object` is drawn with, one per geometry group when it
/// has several materials.
pub(crate) fn material_slots(
    object: &SceneObject,
    geometry: &Geometry,
    override_material: Option<AssetId<Material>>,
) -> Vec<(AssetId<Material>, Option<GeometryGroup>)> {
    if let Some(material) = override_material {
        return vec![(material, None)];
    }
    if object.materials.len() > 1 && !geometry.groups().is_empty() {
        return geometry
            .groups()
            .iter()
            .filter_map(|group| {
                object
                    .materials
                    .get(group.material_index)
                    .map(|material| (*material, Some(*group)))
            })
            .collect();
    }
    object
        .materials
        .first()
        .map(|material| vec![(*material, None)])
        .unwrap_or_default()
}
