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

use super::command::{Command, DrawRecord};
use super::glsl;
use prism_core::renderer::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Construction parameters of a [`HeadlessDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessConfig {
    /// Limits reported through [`GraphicsDevice::capabilities`].
    pub capabilities: DeviceCapabilities,
    /// Bytes of buffer and texture storage before allocations fail.
    pub memory_budget: u64,
    /// Width of the default surface.
    pub width: u32,
    /// Height of the default surface.
    pub height: u32,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            capabilities: DeviceCapabilities {
                adapter_name: "Headless Reference".to_string(),
                ..DeviceCapabilities::default()
            },
            memory_budget: 256 * 1024 * 1024,
            width: 1280,
            height: 720,
        }
    }
}

impl HeadlessConfig {
    /// Picks an adapter profile for a power preference.
    pub fn for_power_preference(preference: PowerPreference) -> Self {
        let base = Self::default();
        match preference {
            PowerPreference::Default => base,
            PowerPreference::HighPerformance => Self {
                capabilities: DeviceCapabilities {
                    adapter_name: "Headless Discrete".to_string(),
                    max_texture_units: 32,
                    max_texture_size: 16384,
                    max_samples: 8,
                    ..base.capabilities
                },
                memory_budget: 1024 * 1024 * 1024,
                ..base
            },
            PowerPreference::LowPower => Self {
                capabilities: DeviceCapabilities {
                    adapter_name: "Headless Integrated".to_string(),
                    max_texture_units: 8,
                    max_texture_size: 4096,
                    max_samples: 4,
                    max_anisotropy: 4,
                    ..base.capabilities
                },
                memory_budget: 128 * 1024 * 1024,
                ..base
            },
        }
    }
}

#[derive(Debug)]
struct ProgramEntry {
    label: String,
    reflection: ProgramReflection,
    slots: HashMap<UniformLocation, (String, UniformType)>,
    values: BTreeMap<String, UniformValue>,
}

#[derive(Debug)]
struct TextureEntry {
    width: u32,
    height: u32,
    format: TextureFormat,
    samples: u32,
    levels: Vec<Vec<u8>>,
}

impl TextureEntry {
    fn level_size(&self, level: u32) -> u64 {
        let w = (self.width >> level).max(1);
        let h = (self.height >> level).max(1);
        u64::from(w) * u64::from(h) * u64::from(self.format.bytes_per_texel())
    }

    fn byte_size(&self) -> u64 {
        self.levels.iter().map(|l| l.len() as u64).sum::<u64>() * u64::from(self.samples.max(1))
    }
}

#[derive(Debug)]
struct FramebufferEntry {
    color: Option<TextureId>,
}

#[derive(Debug, Default)]
struct DeviceState {
    programs: HashMap<ProgramId, ProgramEntry>,
    buffers: HashMap<BufferId, Vec<u8>>,
    textures: HashMap<TextureId, TextureEntry>,
    framebuffers: HashMap<FramebufferId, FramebufferEntry>,
    current_program: Option<ProgramId>,
    framebuffer: Option<FramebufferId>,
    surface: Vec<u8>,
    surface_size: (u32, u32),
    memory_used: u64,
    log: Vec<Command>,
    draws: Vec<DrawRecord>,
}

impl DeviceState {
    fn reserve(&mut self, bytes: u64, budget: u64) -> Result<(), DeviceError> {
        let available = budget.saturating_sub(self.memory_used);
        if bytes > available {
            return Err(DeviceError::OutOfMemory {
                requested: bytes,
                available,
            });
        }
        self.memory_used += bytes;
        Ok(())
    }

    /// Colour storage of the bound framebuffer: `(width, height, format, bytes)`.
    fn color_target(&mut self) -> Option<(u32, u32, TextureFormat, &mut Vec<u8>)> {
        match self.framebuffer {
            None => {
                let (w, h) = self.surface_size;
                Some((w, h, TextureFormat::Rgba8, &mut self.surface))
            }
            Some(fb) => {
                let color = self.framebuffers.get(&fb)?.color?;
                let texture = self.textures.get_mut(&color)?;
                let (w, h, format) = (texture.width, texture.height, texture.format);
                texture.levels.first_mut().map(|level| (w, h, format, level))
            }
        }
    }
}

/// An in-memory graphics device that validates and records every call.
///
/// ```
/// use prism_core::renderer::{GraphicsDevice, ProgramDescriptor};
/// use prism_infra::graphics::headless::HeadlessDevice;
///
/// let device = HeadlessDevice::new();
/// let program = device.create_program(&ProgramDescriptor {
///     label: "flat".into(),
///     vertex_source: "in vec3 position;\nuniform mat4 mvp;\nvoid main() {}".into(),
///     fragment_source: "uniform vec3 color;\nvoid main() {}".into(),
/// });
/// let reflection = device.program_reflection(program.unwrap()).unwrap();
/// assert_eq!(reflection.uniforms.len(), 2);
/// ```
#[derive(Debug)]
pub struct HeadlessDevice {
    config: HeadlessConfig,
    state: Mutex<DeviceState>,
    context_lost: AtomicBool,
    next_id: AtomicUsize,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    /// Creates a device with the default profile.
    pub fn new() -> Self {
        Self::with_config(HeadlessConfig::default())
    }

    /// Creates a device with explicit limits.
    pub fn with_config(config: HeadlessConfig) -> Self {
        let state = DeviceState {
            surface: vec![0; (config.width as usize) * (config.height as usize) * 4],
            surface_size: (config.width, config.height),
            ..DeviceState::default()
        };
        Self {
            config,
            state: Mutex::new(state),
            context_lost: AtomicBool::new(false),
            next_id: AtomicUsize::new(1),
        }
    }

    /// Creates a device matching renderer settings (power preference and
    /// surface size).
    pub fn from_settings(settings: &RendererSettings) -> Self {
        Self::with_config(HeadlessConfig {
            width: settings.width,
            height: settings.height,
            ..HeadlessConfig::for_power_preference(settings.power_preference)
        })
    }

    /// The configuration the device was created with.
    pub fn config(&self) -> &HeadlessConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        // Every table update is a single insert or remove.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn ensure_alive(&self) -> Result<(), DeviceError> {
        if self.is_context_lost() {
            Err(DeviceError::ContextLost)
        } else {
            Ok(())
        }
    }

    fn record(&self, command: Command) {
        if !self.is_context_lost() {
            self.lock().log.push(command);
        }
    }

    // --- Simulation controls ---

    /// Simulates the platform revoking the context. Every handle dies.
    pub fn lose_context(&self) {
        self.context_lost.store(true, Ordering::SeqCst);
        let mut state = self.lock();
        state.programs.clear();
        state.buffers.clear();
        state.textures.clear();
        state.framebuffers.clear();
        state.current_program = None;
        state.framebuffer = None;
        state.memory_used = 0;
        log::warn!("HeadlessDevice: context lost");
    }

    /// Simulates the platform handing back a fresh context.
    pub fn restore_context(&self) {
        self.context_lost.store(false, Ordering::SeqCst);
        log::info!("HeadlessDevice: context restored");
    }

    // --- Inspection ---

    /// Every call recorded since the last [`clear_log`](Self::clear_log).
    pub fn commands(&self) -> Vec<Command> {
        self.lock().log.clone()
    }

    /// Counts recorded calls matching `predicate`.
    pub fn count_commands(&self, predicate: impl Fn(&Command) -> bool) -> usize {
        self.lock().log.iter().filter(|c| predicate(c)).count()
    }

    /// Every draw recorded since the last [`clear_log`](Self::clear_log).
    pub fn draws(&self) -> Vec<DrawRecord> {
        self.lock().draws.clone()
    }

    /// Forgets recorded calls and draws.
    pub fn clear_log(&self) {
        let mut state = self.lock();
        state.log.clear();
        state.draws.clear();
    }

    /// Number of live programs.
    pub fn live_programs(&self) -> usize {
        self.lock().programs.len()
    }

    /// Number of live buffers.
    pub fn live_buffers(&self) -> usize {
        self.lock().buffers.len()
    }

    /// Number of live textures.
    pub fn live_textures(&self) -> usize {
        self.lock().textures.len()
    }

    /// Number of live framebuffers.
    pub fn live_framebuffers(&self) -> usize {
        self.lock().framebuffers.len()
    }

    /// Bytes of buffer and texture storage in use.
    pub fn memory_used(&self) -> u64 {
        self.lock().memory_used
    }

    /// Current contents of a buffer.
    pub fn buffer_data(&self, id: BufferId) -> Option<Vec<u8>> {
        self.lock().buffers.get(&id).cloned()
    }

    fn build_program(&self, descriptor: &ProgramDescriptor) -> Result<ProgramEntry, DeviceError> {
        let stage = |stage: ShaderStage, source: &str| {
            glsl::preprocess(stage, source)
                .and_then(|pre| glsl::validate(stage, &pre).map(|()| pre))
                .map_err(|log| DeviceError::CompileFailed { stage, log })
        };
        let vertex = stage(ShaderStage::Vertex, &descriptor.vertex_source)?;
        let fragment = stage(ShaderStage::Fragment, &descriptor.fragment_source)?;

        let mut uniforms: Vec<ActiveUniform> = Vec::new();
        for decl in glsl::uniforms(&vertex).into_iter().chain(glsl::uniforms(&fragment)) {
            let Some(ty) = UniformType::from_glsl(&decl.ty) else {
                continue;
            };
            let existing = uniforms
                .iter()
                .find(|u| u.name == decl.name)
                .map(|u| (u.ty, u.array_len));
            match existing {
                Some(existing) if existing != (ty, decl.array_len) => {
                    return Err(DeviceError::LinkFailed {
                        log: format!(
                            "uniform '{}' declared with different types in the two stages",
                            decl.name
                        ),
                    });
                }
                Some(_) => {}
                None => uniforms.push(ActiveUniform {
                    location: UniformLocation(uniforms.len() as u32),
                    name: decl.name,
                    ty,
                    array_len: decl.array_len,
                }),
            }
        }

        let attributes: Vec<ActiveAttribute> = glsl::vertex_inputs(&vertex)
            .into_iter()
            .enumerate()
            .map(|(i, decl)| ActiveAttribute {
                components: match decl.ty.as_str() {
                    "vec2" => 2,
                    "vec3" => 3,
                    "vec4" => 4,
                    _ => 1,
                },
                name: decl.name,
                location: AttributeLocation(i as u32),
            })
            .collect();
        if attributes.len() as u32 > self.config.capabilities.max_vertex_attributes {
            return Err(DeviceError::LinkFailed {
                log: format!(
                    "too many vertex attributes ({} > {})",
                    attributes.len(),
                    self.config.capabilities.max_vertex_attributes
                ),
            });
        }

        let slots = uniforms
            .iter()
            .map(|u| (u.location, (u.name.clone(), u.ty)))
            .collect();
        Ok(ProgramEntry {
            label: descriptor.label.clone(),
            reflection: ProgramReflection {
                uniforms,
                attributes,
            },
            slots,
            values: BTreeMap::new(),
        })
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn capabilities(&self) -> DeviceCapabilities {
        self.config.capabilities.clone()
    }

    fn is_context_lost(&self) -> bool {
        self.context_lost.load(Ordering::SeqCst)
    }

    fn create_program(&self, descriptor: &ProgramDescriptor) -> Result<ProgramId, DeviceError> {
        self.ensure_alive()?;
        let entry = self.build_program(descriptor)?;
        let id = ProgramId(self.next_id());
        let mut state = self.lock();
        state.log.push(Command::CreateProgram {
            id,
            label: descriptor.label.clone(),
        });
        state.programs.insert(id, entry);
        log::debug!("HeadlessDevice: created program {id:?} '{}'", descriptor.label);
        Ok(id)
    }

    fn program_reflection(&self, id: ProgramId) -> Result<ProgramReflection, DeviceError> {
        self.ensure_alive()?;
        self.lock()
            .programs
            .get(&id)
            .map(|p| p.reflection.clone())
            .ok_or(DeviceError::InvalidHandle {
                kind: "program",
                id: id.0,
            })
    }

    fn destroy_program(&self, id: ProgramId) {
        let mut state = self.lock();
        if state.programs.remove(&id).is_some() {
            if state.current_program == Some(id) {
                state.current_program = None;
            }
            state.log.push(Command::DestroyProgram(id));
        }
    }

    fn use_program(&self, id: Option<ProgramId>) {
        if self.is_context_lost() {
            return;
        }
        let mut state = self.lock();
        let current = id.filter(|id| state.programs.contains_key(id));
        state.current_program = current;
        state.log.push(Command::UseProgram(id));
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, DeviceError> {
        self.ensure_alive()?;
        let mut state = self.lock();
        state.reserve(descriptor.size, self.config.memory_budget)?;
        let id = BufferId(self.next_id());
        state.buffers.insert(id, vec![0; descriptor.size as usize]);
        state.log.push(Command::CreateBuffer {
            id,
            size: descriptor.size,
        });
        Ok(id)
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), DeviceError> {
        self.ensure_alive()?;
        let mut state = self.lock();
        let buffer = state.buffers.get_mut(&id).ok_or(DeviceError::InvalidHandle {
            kind: "buffer",
            id: id.0,
        })?;
        let start = offset as usize;
        let end = start + data.len();
        if end > buffer.len() {
            return Err(DeviceError::InvalidFormat(format!(
                "write of {} bytes at offset {offset} overruns buffer of {} bytes",
                data.len(),
                buffer.len()
            )));
        }
        buffer[start..end].copy_from_slice(data);
        state.log.push(Command::WriteBuffer {
            id,
            offset,
            len: data.len() as u64,
        });
        Ok(())
    }

    fn destroy_buffer(&self, id: BufferId) {
        let mut state = self.lock();
        if let Some(buffer) = state.buffers.remove(&id) {
            state.memory_used = state.memory_used.saturating_sub(buffer.len() as u64);
            state.log.push(Command::DestroyBuffer(id));
        }
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, DeviceError> {
        self.ensure_alive()?;
        let caps = &self.config.capabilities;
        if descriptor.width == 0
            || descriptor.height == 0
            || descriptor.width.max(descriptor.height) > caps.max_texture_size
        {
            return Err(DeviceError::InvalidFormat(format!(
                "texture size {}x{} outside 1..={}",
                descriptor.width, descriptor.height, caps.max_texture_size
            )));
        }
        if descriptor.samples > 1 && descriptor.samples > caps.max_samples {
            return Err(DeviceError::Unsupported(format!(
                "{} samples (maximum {})",
                descriptor.samples, caps.max_samples
            )));
        }
        if descriptor.format.is_float() && !caps.float_textures {
            return Err(DeviceError::Unsupported(format!("{:?} textures", descriptor.format)));
        }

        let mut entry = TextureEntry {
            width: descriptor.width,
            height: descriptor.height,
            format: descriptor.format,
            samples: descriptor.samples,
            levels: Vec::new(),
        };
        entry.levels = (0..descriptor.mip_levels.max(1))
            .map(|level| vec![0; entry.level_size(level) as usize])
            .collect();

        let mut state = self.lock();
        state.reserve(entry.byte_size(), self.config.memory_budget)?;
        let id = TextureId(self.next_id());
        state.textures.insert(id, entry);
        state.log.push(Command::CreateTexture {
            id,
            width: descriptor.width,
            height: descriptor.height,
        });
        Ok(id)
    }

    fn write_texture(&self, id: TextureId, level: u32, data: &[u8]) -> Result<(), DeviceError> {
        self.ensure_alive()?;
        let mut state = self.lock();
        let texture = state.textures.get_mut(&id).ok_or(DeviceError::InvalidHandle {
            kind: "texture",
            id: id.0,
        })?;
        let expected = texture.level_size(level);
        let slot = texture
            .levels
            .get_mut(level as usize)
            .ok_or_else(|| DeviceError::InvalidFormat(format!("mip level {level} not allocated")))?;
        if data.len() as u64 != expected {
            return Err(DeviceError::InvalidFormat(format!(
                "level {level} expects {expected} bytes, got {}",
                data.len()
            )));
        }
        slot.copy_from_slice(data);
        state.log.push(Command::WriteTexture {
            id,
            level,
            len: data.len() as u64,
        });
        Ok(())
    }

    fn generate_mipmaps(&self, id: TextureId) -> Result<(), DeviceError> {
        self.ensure_alive()?;
        let mut state = self.lock();
        let texture = state.textures.get(&id).ok_or(DeviceError::InvalidHandle {
            kind: "texture",
            id: id.0,
        })?;
        if texture.levels.len() < 2 {
            return Err(DeviceError::InvalidFormat(
                "texture was created without mip levels".to_string(),
            ));
        }
        state.log.push(Command::GenerateMipmaps(id));
        Ok(())
    }

    fn destroy_texture(&self, id: TextureId) {
        let mut state = self.lock();
        if let Some(texture) = state.textures.remove(&id) {
            state.memory_used = state.memory_used.saturating_sub(texture.byte_size());
            state.log.push(Command::DestroyTexture(id));
        }
    }

    fn bind_texture(&self, unit: u32, texture: Option<TextureId>) {
        self.record(Command::BindTexture { unit, texture });
    }

    fn create_framebuffer(
        &self,
        descriptor: &FramebufferDescriptor,
    ) -> Result<FramebufferId, DeviceError> {
        self.ensure_alive()?;
        let mut state = self.lock();
        for attachment in [descriptor.color, descriptor.depth_stencil].into_iter().flatten() {
            if !state.textures.contains_key(&attachment) {
                return Err(DeviceError::InvalidHandle {
                    kind: "texture",
                    id: attachment.0,
                });
            }
        }
        let id = FramebufferId(self.next_id());
        state.framebuffers.insert(
            id,
            FramebufferEntry {
                color: descriptor.color,
            },
        );
        state.log.push(Command::CreateFramebuffer(id));
        Ok(id)
    }

    fn bind_framebuffer(&self, id: Option<FramebufferId>) {
        if self.is_context_lost() {
            return;
        }
        let mut state = self.lock();
        let bound = id.filter(|id| state.framebuffers.contains_key(id));
        state.framebuffer = bound;
        state.log.push(Command::BindFramebuffer(id));
    }

    fn blit_framebuffer(
        &self,
        source: FramebufferId,
        destination: Option<FramebufferId>,
        width: u32,
        height: u32,
        buffers: ClearFlags,
    ) -> Result<(), DeviceError> {
        self.ensure_alive()?;
        let mut state = self.lock();
        let invalid = |id: FramebufferId| DeviceError::InvalidHandle {
            kind: "framebuffer",
            id: id.0,
        };
        let source_color = state.framebuffers.get(&source).ok_or(invalid(source))?.color;
        if let Some(destination) = destination {
            if !state.framebuffers.contains_key(&destination) {
                return Err(invalid(destination));
            }
        }

        if buffers.contains(ClearFlags::COLOR) {
            let pixels = source_color
                .and_then(|c| state.textures.get(&c))
                .and_then(|t| t.levels.first().cloned());
            let bound = state.framebuffer;
            state.framebuffer = destination;
            if let (Some(pixels), Some((w, h, _, target))) = (pixels, state.color_target()) {
                if (w, h) == (width, height) && target.len() == pixels.len() {
                    target.copy_from_slice(&pixels);
                }
            }
            state.framebuffer = bound;
        }
        state.log.push(Command::BlitFramebuffer {
            source,
            destination,
        });
        Ok(())
    }

    fn destroy_framebuffer(&self, id: FramebufferId) {
        let mut state = self.lock();
        if state.framebuffers.remove(&id).is_some() {
            if state.framebuffer == Some(id) {
                state.framebuffer = None;
            }
            state.log.push(Command::DestroyFramebuffer(id));
        }
    }

    fn read_pixels(&self, rect: PixelRect) -> Result<Vec<u8>, DeviceError> {
        self.ensure_alive()?;
        let mut state = self.lock();
        state.log.push(Command::ReadPixels(rect));
        let (width, height, format, pixels) = state
            .color_target()
            .ok_or_else(|| {
                DeviceError::InvalidFormat("framebuffer has no colour attachment".into())
            })?;
        if format != TextureFormat::Rgba8 {
            return Err(DeviceError::Unsupported(format!("reading back {format:?} pixels")));
        }
        if rect.x + rect.width > width || rect.y + rect.height > height {
            return Err(DeviceError::InvalidFormat(format!(
                "read rectangle {rect:?} outside {width}x{height} target"
            )));
        }
        let mut out = Vec::with_capacity((rect.width * rect.height * 4) as usize);
        for row in rect.y..rect.y + rect.height {
            let start = ((row * width + rect.x) * 4) as usize;
            out.extend_from_slice(&pixels[start..start + (rect.width * 4) as usize]);
        }
        Ok(out)
    }

    fn set_viewport(&self, viewport: Viewport) {
        self.record(Command::SetViewport(viewport));
    }

    fn clear(&self, buffers: ClearFlags, values: &ClearValues) {
        if self.is_context_lost() {
            return;
        }
        let mut state = self.lock();
        if buffers.contains(ClearFlags::COLOR) {
            if let Some((_, _, TextureFormat::Rgba8, target)) = state.color_target() {
                let texel = values.color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
                for chunk in target.chunks_exact_mut(4) {
                    chunk.copy_from_slice(&texel);
                }
            }
        }
        state.log.push(Command::Clear(buffers));
    }

    fn set_capability(&self, capability: Capability, enabled: bool) {
        self.record(Command::SetCapability { capability, enabled });
    }

    fn set_blend_equation(&self, color: BlendEquation, alpha: BlendEquation) {
        self.record(Command::SetBlendEquation { color, alpha });
    }

    fn set_blend_func(
        &self,
        src_color: BlendFactor,
        dst_color: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) {
        self.record(Command::SetBlendFunc {
            src_color,
            dst_color,
            src_alpha,
            dst_alpha,
        });
    }

    fn set_depth_func(&self, func: CompareFunction) {
        self.record(Command::SetDepthFunc(func));
    }

    fn set_depth_mask(&self, write: bool) {
        self.record(Command::SetDepthMask(write));
    }

    fn set_stencil_func(&self, func: CompareFunction, reference: i32, mask: u32) {
        self.record(Command::SetStencilFunc { func, reference, mask });
    }

    fn set_stencil_op(
        &self,
        fail: StencilOperation,
        depth_fail: StencilOperation,
        pass: StencilOperation,
    ) {
        self.record(Command::SetStencilOp {
            fail,
            depth_fail,
            pass,
        });
    }

    fn set_stencil_mask(&self, mask: u32) {
        self.record(Command::SetStencilMask(mask));
    }

    fn set_cull_face(&self, face: CullFace) {
        self.record(Command::SetCullFace(face));
    }

    fn set_front_face(&self, face: FrontFace) {
        self.record(Command::SetFrontFace(face));
    }

    fn set_polygon_offset(&self, factor: f32, units: f32) {
        self.record(Command::SetPolygonOffset { factor, units });
    }

    fn set_color_mask(&self, mask: ColorWrites) {
        self.record(Command::SetColorMask(mask));
    }

    fn set_uniform(&self, location: UniformLocation, value: &UniformValue) {
        if self.is_context_lost() {
            return;
        }
        let mut state = self.lock();
        let Some(program_id) = state.current_program else {
            log::warn!("HeadlessDevice: set_uniform({location:?}) with no program in use");
            return;
        };
        let Some(program) = state.programs.get_mut(&program_id) else {
            return;
        };
        let Some((name, ty)) = program.slots.get(&location).cloned() else {
            log::warn!(
                "HeadlessDevice: unknown uniform location {location:?} in '{}'",
                program.label
            );
            return;
        };
        if !value.matches(ty) {
            log::warn!("HeadlessDevice: uniform '{name}' is {ty:?}, got {value:?}");
            return;
        }
        program.values.insert(name.clone(), value.clone());
        state.log.push(Command::SetUniform {
            program: program_id,
            name,
            value: value.clone(),
        });
    }

    fn set_vertex_attribute(
        &self,
        location: AttributeLocation,
        buffer: BufferId,
        _layout: &VertexAttributeLayout,
    ) {
        self.record(Command::SetVertexAttribute { location, buffer });
    }

    fn disable_vertex_attribute(&self, location: AttributeLocation) {
        self.record(Command::DisableVertexAttribute(location));
    }

    fn bind_index_buffer(&self, buffer: Option<BufferId>) {
        self.record(Command::BindIndexBuffer(buffer));
    }

    fn draw(&self, mode: PrimitiveMode, first: u32, count: u32) {
        self.record_draw(mode, first, count, false);
    }

    fn draw_indexed(&self, mode: PrimitiveMode, _format: IndexFormat, first: u32, count: u32) {
        self.record_draw(mode, first, count, true);
    }
}

impl HeadlessDevice {
    fn record_draw(&self, mode: PrimitiveMode, first: u32, count: u32, indexed: bool) {
        if self.is_context_lost() {
            return;
        }
        let mut state = self.lock();
        let Some(program_id) = state.current_program else {
            log::warn!("HeadlessDevice: draw with no program in use");
            return;
        };
        let Some(program) = state.programs.get(&program_id) else {
            return;
        };
        let record = DrawRecord {
            program: program_id,
            program_label: program.label.clone(),
            mode,
            first,
            count,
            indexed,
            framebuffer: state.framebuffer,
            uniforms: program.values.clone(),
        };
        state.draws.push(record);
        state.log.push(Command::Draw {
            mode,
            first,
            count,
            indexed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = "in vec3 position;\nin vec2 uv;\n\
        uniform mat4 modelViewMatrix;\nvoid main() {\n}\n";
    const FRAGMENT: &str = "#ifdef USE_MAP\nuniform sampler2D map;\n#endif\n\
        uniform vec3 diffuse;\nvoid main() {\n}\n";

    fn program(device: &HeadlessDevice, fragment: &str) -> Result<ProgramId, DeviceError> {
        device.create_program(&ProgramDescriptor {
            label: "test".into(),
            vertex_source: VERTEX.into(),
            fragment_source: fragment.into(),
        })
    }

    fn buffer(device: &HeadlessDevice, size: u64) -> Result<BufferId, DeviceError> {
        device.create_buffer(&BufferDescriptor {
            label: None,
            target: BufferTarget::Vertex,
            usage: BufferUsage::Static,
            size,
        })
    }

    #[test]
    fn test_reflection_reports_active_declarations() {
        let device = HeadlessDevice::new();
        let id = program(&device, FRAGMENT).unwrap();
        let reflection = device.program_reflection(id).unwrap();
        let names: Vec<_> = reflection.uniforms.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["modelViewMatrix", "diffuse"]);
        assert_eq!(reflection.attributes.len(), 2);
        assert_eq!(reflection.attributes[1].components, 2);

        let with_map = program(&device, &format!("#define USE_MAP\n{FRAGMENT}")).unwrap();
        assert_eq!(device.program_reflection(with_map).unwrap().uniforms.len(), 3);
    }

    #[test]
    fn test_compile_errors_carry_driver_log() {
        let device = HeadlessDevice::new();
        let err = program(&device, "#error missing chunk\nvoid main() {}\n").unwrap_err();
        match err {
            DeviceError::CompileFailed { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(log.contains("missing chunk"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(device.live_programs(), 0);
    }

    #[test]
    fn test_link_fails_on_conflicting_uniforms() {
        let device = HeadlessDevice::new();
        let err = program(&device, "uniform vec4 modelViewMatrix;\nvoid main() {}\n").unwrap_err();
        assert!(matches!(err, DeviceError::LinkFailed { .. }));
    }

    #[test]
    fn test_uniforms_are_program_state() {
        let device = HeadlessDevice::new();
        let id = program(&device, FRAGMENT).unwrap();
        let diffuse = device
            .program_reflection(id)
            .unwrap()
            .uniforms
            .into_iter()
            .find(|u| u.name == "diffuse")
            .unwrap();
        device.use_program(Some(id));
        device.set_uniform(diffuse.location, &UniformValue::Vec3(glam_vec3(1.0, 0.5, 0.0)));
        // Wrong type is rejected like a driver error.
        device.set_uniform(diffuse.location, &UniformValue::Float(1.0));
        device.draw(PrimitiveMode::Triangles, 0, 3);

        let draws = device.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(
            draws[0].uniform("diffuse"),
            Some(&UniformValue::Vec3(glam_vec3(1.0, 0.5, 0.0)))
        );
    }

    fn glam_vec3(x: f32, y: f32, z: f32) -> prism_core::math::Vec3 {
        prism_core::math::Vec3::new(x, y, z)
    }

    #[test]
    fn test_memory_budget() {
        let device = HeadlessDevice::with_config(HeadlessConfig {
            memory_budget: 100,
            ..HeadlessConfig::default()
        });
        let a = buffer(&device, 60).unwrap();
        let err = buffer(&device, 60).unwrap_err();
        assert_eq!(
            err,
            DeviceError::OutOfMemory {
                requested: 60,
                available: 40
            }
        );
        device.destroy_buffer(a);
        assert!(buffer(&device, 60).is_ok());
    }

    #[test]
    fn test_write_buffer_bounds() {
        let device = HeadlessDevice::new();
        let id = buffer(&device, 8).unwrap();
        device.write_buffer(id, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(device.buffer_data(id).unwrap(), vec![0, 0, 0, 0, 1, 2, 3, 4]);
        assert!(device.write_buffer(id, 6, &[0; 4]).is_err());
    }

    #[test]
    fn test_context_loss_kills_handles() {
        let device = HeadlessDevice::new();
        let id = buffer(&device, 8).unwrap();
        device.lose_context();
        assert!(device.is_context_lost());
        assert_eq!(buffer(&device, 8), Err(DeviceError::ContextLost));
        assert_eq!(device.live_buffers(), 0);

        device.restore_context();
        assert!(matches!(
            device.write_buffer(id, 0, &[0]),
            Err(DeviceError::InvalidHandle { .. })
        ));
        assert!(buffer(&device, 8).is_ok());
    }

    #[test]
    fn test_clear_and_read_pixels_on_render_target() {
        let device = HeadlessDevice::new();
        let color = device
            .create_texture(&TextureDescriptor {
                label: None,
                width: 2,
                height: 2,
                format: TextureFormat::Rgba8,
                mip_levels: 1,
                samples: 0,
                sampler: SamplerDescriptor::default(),
            })
            .unwrap();
        let fb = device
            .create_framebuffer(&FramebufferDescriptor {
                label: None,
                color: Some(color),
                depth_stencil: None,
            })
            .unwrap();
        device.bind_framebuffer(Some(fb));
        device.clear(
            ClearFlags::COLOR,
            &ClearValues {
                color: [1.0, 0.0, 0.0, 1.0],
                ..ClearValues::default()
            },
        );
        let pixels = device
            .read_pixels(PixelRect {
                x: 1,
                y: 1,
                width: 1,
                height: 1,
            })
            .unwrap();
        assert_eq!(pixels, vec![255, 0, 0, 255]);
        assert!(device
            .read_pixels(PixelRect {
                x: 1,
                y: 1,
                width: 2,
                height: 1
            })
            .is_err());
    }

    #[test]
    fn test_power_preference_profiles() {
        let high = HeadlessConfig::for_power_preference(PowerPreference::HighPerformance);
        let low = HeadlessConfig::for_power_preference(PowerPreference::LowPower);
        assert!(high.capabilities.max_texture_units > low.capabilities.max_texture_units);
        assert_ne!(high.capabilities.adapter_name, low.capabilities.adapter_name);
    }

    #[test]
    fn test_unsupported_sample_count() {
        let device = HeadlessDevice::new();
        let err = device
            .create_texture(&TextureDescriptor {
                label: None,
                width: 4,
                height: 4,
                format: TextureFormat::Rgba8,
                mip_levels: 1,
                samples: 64,
                sampler: SamplerDescriptor::default(),
            })
            .unwrap_err();
        assert!(matches!(err, DeviceError::Unsupported(_)));
    }
}
