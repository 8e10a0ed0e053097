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

use crate::renderer::api::*;
use crate::renderer::capabilities::DeviceCapabilities;
use crate::renderer::error::DeviceError;
use std::fmt::Debug;

/// The GPU command surface the renderer drives.
///
/// This trait mirrors an immediate-mode graphics API: objects are created and
/// addressed through integer handles, fixed-function state is set with
/// individual calls, and uniforms apply to the program currently in use.
/// Resource creation and uploads are fallible; state and draw calls are not,
/// matching drivers that silently ignore them once the context is lost.
///
/// Implementations must be usable through `Arc<dyn GraphicsDevice>`, hence the
/// `&self` receivers; backends keep their object tables behind interior
/// mutability.
pub trait GraphicsDevice: Send + Sync + Debug + 'static {
    /// Returns the device limits and optional features.
    fn capabilities(&self) -> DeviceCapabilities;

    /// Returns `true` once the underlying context has been invalidated.
    ///
    /// Every handle issued before the loss is dead; nothing needs to be
    /// destroyed, but everything must be re-created after restoration.
    fn is_context_lost(&self) -> bool;

    // --- Programs ---

    /// Compiles both stages of `descriptor` and links them into a program.
    /// ## Errors
    /// * `DeviceError::CompileFailed` / `DeviceError::LinkFailed` - carrying the driver log.
    /// * `DeviceError::ContextLost` - if the context is lost.
    fn create_program(&self, descriptor: &ProgramDescriptor) -> Result<ProgramId, DeviceError>;

    /// Returns the active uniforms and vertex inputs of a linked program.
    /// ## Errors
    /// * `DeviceError::InvalidHandle` - if `id` is not a live program.
    fn program_reflection(&self, id: ProgramId) -> Result<ProgramReflection, DeviceError>;

    /// Destroys a program. Unknown handles are ignored.
    fn destroy_program(&self, id: ProgramId);

    /// Makes `id` the program used by subsequent uniform and draw calls.
    fn use_program(&self, id: Option<ProgramId>);

    // --- Buffers ---

    /// Allocates an uninitialized buffer.
    /// ## Errors
    /// * `DeviceError::OutOfMemory` - if the allocation does not fit.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, DeviceError>;

    /// Writes `data` into a buffer starting at byte `offset`.
    /// ## Errors
    /// * `DeviceError::InvalidFormat` - if the write runs past the end of the buffer.
    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), DeviceError>;

    /// Destroys a buffer. Unknown handles are ignored.
    fn destroy_buffer(&self, id: BufferId);

    // --- Textures ---

    /// Allocates a texture with storage for every requested mip level.
    /// ## Errors
    /// * `DeviceError::OutOfMemory` - if the allocation does not fit.
    /// * `DeviceError::Unsupported` - if the format or sample count is unavailable.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, DeviceError>;

    /// Replaces the contents of one mip level.
    /// ## Errors
    /// * `DeviceError::InvalidFormat` - if `data` does not match the level size.
    fn write_texture(&self, id: TextureId, level: u32, data: &[u8]) -> Result<(), DeviceError>;

    /// Fills every mip level below the base from the base level.
    fn generate_mipmaps(&self, id: TextureId) -> Result<(), DeviceError>;

    /// Destroys a texture. Unknown handles are ignored.
    fn destroy_texture(&self, id: TextureId);

    /// Binds `texture` to a texture unit (or unbinds the unit).
    fn bind_texture(&self, unit: u32, texture: Option<TextureId>);

    // --- Framebuffers ---

    /// Creates a framebuffer from existing textures.
    fn create_framebuffer(
        &self,
        descriptor: &FramebufferDescriptor,
    ) -> Result<FramebufferId, DeviceError>;

    /// Binds a framebuffer for drawing; `None` selects the default surface.
    fn bind_framebuffer(&self, id: Option<FramebufferId>);

    /// Copies (and resolves, if multi-sampled) `width x height` pixels
    /// between framebuffers.
    fn blit_framebuffer(
        &self,
        source: FramebufferId,
        destination: Option<FramebufferId>,
        width: u32,
        height: u32,
        buffers: ClearFlags,
    ) -> Result<(), DeviceError>;

    /// Destroys a framebuffer. Its attachments are not destroyed.
    fn destroy_framebuffer(&self, id: FramebufferId);

    /// Reads RGBA8 pixels from the bound framebuffer.
    fn read_pixels(&self, rect: PixelRect) -> Result<Vec<u8>, DeviceError>;

    // --- Fixed-function state ---

    /// Sets the viewport rectangle.
    fn set_viewport(&self, viewport: Viewport);

    /// Clears the selected buffers of the bound framebuffer.
    fn clear(&self, buffers: ClearFlags, values: &ClearValues);

    /// Enables or disables a capability.
    fn set_capability(&self, capability: Capability, enabled: bool);

    /// Sets the colour and alpha blend equations.
    fn set_blend_equation(&self, color: BlendEquation, alpha: BlendEquation);

    /// Sets the colour and alpha blend factors.
    fn set_blend_func(
        &self,
        src_color: BlendFactor,
        dst_color: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    );

    /// Sets the depth comparison.
    fn set_depth_func(&self, func: CompareFunction);

    /// Enables or disables depth writes.
    fn set_depth_mask(&self, write: bool);

    /// Sets the stencil comparison.
    fn set_stencil_func(&self, func: CompareFunction, reference: i32, mask: u32);

    /// Sets the stencil update operations.
    fn set_stencil_op(
        &self,
        fail: StencilOperation,
        depth_fail: StencilOperation,
        pass: StencilOperation,
    );

    /// Sets the stencil write mask.
    fn set_stencil_mask(&self, mask: u32);

    /// Selects the faces to cull.
    fn set_cull_face(&self, face: CullFace);

    /// Selects the front-face winding.
    fn set_front_face(&self, face: FrontFace);

    /// Sets the polygon offset parameters.
    fn set_polygon_offset(&self, factor: f32, units: f32);

    /// Sets the colour write mask.
    fn set_color_mask(&self, mask: ColorWrites);

    // --- Uniforms, attributes and draws ---

    /// Sets a uniform of the program in use.
    fn set_uniform(&self, location: UniformLocation, value: &UniformValue);

    /// Feeds an attribute slot from a buffer and enables it.
    fn set_vertex_attribute(
        &self,
        location: AttributeLocation,
        buffer: BufferId,
        layout: &VertexAttributeLayout,
    );

    /// Disables an attribute slot.
    fn disable_vertex_attribute(&self, location: AttributeLocation);

    /// Binds the index buffer used by [`draw_indexed`](Self::draw_indexed).
    fn bind_index_buffer(&self, buffer: Option<BufferId>);

    /// Draws `count` vertices starting at `first`.
    fn draw(&self, mode: PrimitiveMode, first: u32, count: u32);

    /// Draws `count` indices starting at index `first` of the bound index buffer.
    fn draw_indexed(&self, mode: PrimitiveMode, format: IndexFormat, first: u32, count: u32);
}
