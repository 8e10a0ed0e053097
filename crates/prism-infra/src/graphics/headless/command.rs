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

//! The record of every call made against a [`HeadlessDevice`](super::HeadlessDevice).

use prism_core::renderer::*;
use std::collections::BTreeMap;

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum Command {
    CreateProgram { id: ProgramId, label: String },
    DestroyProgram(ProgramId),
    UseProgram(Option<ProgramId>),
    CreateBuffer { id: BufferId, size: u64 },
    WriteBuffer { id: BufferId, offset: u64, len: u64 },
    DestroyBuffer(BufferId),
    CreateTexture { id: TextureId, width: u32, height: u32 },
    WriteTexture { id: TextureId, level: u32, len: u64 },
    GenerateMipmaps(TextureId),
    DestroyTexture(TextureId),
    BindTexture { unit: u32, texture: Option<TextureId> },
    CreateFramebuffer(FramebufferId),
    BindFramebuffer(Option<FramebufferId>),
    BlitFramebuffer { source: FramebufferId, destination: Option<FramebufferId> },
    DestroyFramebuffer(FramebufferId),
    ReadPixels(PixelRect),
    SetViewport(Viewport),
    Clear(ClearFlags),
    SetCapability { capability: Capability, enabled: bool },
    SetBlendEquation { color: BlendEquation, alpha: BlendEquation },
    SetBlendFunc {
        src_color: BlendFactor,
        dst_color: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    },
    SetDepthFunc(CompareFunction),
    SetDepthMask(bool),
    SetStencilFunc { func: CompareFunction, reference: i32, mask: u32 },
    SetStencilOp { fail: StencilOperation, depth_fail: StencilOperation, pass: StencilOperation },
    SetStencilMask(u32),
    SetCullFace(CullFace),
    SetFrontFace(FrontFace),
    SetPolygonOffset { factor: f32, units: f32 },
    SetColorMask(ColorWrites),
    SetUniform { program: ProgramId, name: String, value: UniformValue },
    SetVertexAttribute { location: AttributeLocation, buffer: BufferId },
    DisableVertexAttribute(AttributeLocation),
    BindIndexBuffer(Option<BufferId>),
    Draw { mode: PrimitiveMode, first: u32, count: u32, indexed: bool },
}

impl Command {
    /// Returns `true` for fixed-function pipeline state changes.
    pub fn is_state_change(&self) -> bool {
        matches!(
            self,
            Command::SetCapability { .. }
                | Command::SetBlendEquation { .. }
                | Command::SetBlendFunc { .. }
                | Command::SetDepthFunc(_)
                | Command::SetDepthMask(_)
                | Command::SetStencilFunc { .. }
                | Command::SetStencilOp { .. }
                | Command::SetStencilMask(_)
                | Command::SetCullFace(_)
                | Command::SetFrontFace(_)
                | Command::SetPolygonOffset { .. }
                | Command::SetColorMask(_)
        )
    }

    /// Returns `true` for buffer and texture data uploads.
    pub fn is_upload(&self) -> bool {
        matches!(self, Command::WriteBuffer { .. } | Command::WriteTexture { .. })
    }

    /// Returns `true` for draw calls.
    pub fn is_draw(&self) -> bool {
        matches!(self, Command::Draw { .. })
    }
}

/// Snapshot of the pipeline taken at each draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    /// Program in use.
    pub program: ProgramId,
    /// Label the program was created with.
    pub program_label: String,
    /// Primitive assembly.
    pub mode: PrimitiveMode,
    /// First vertex or index.
    pub first: u32,
    /// Vertex or index count.
    pub count: u32,
    /// Whether an index buffer was used.
    pub indexed: bool,
    /// Bound framebuffer (`None` = default surface).
    pub framebuffer: Option<FramebufferId>,
    /// Every uniform value currently stored in the program, by name.
    pub uniforms: BTreeMap<String, UniformValue>,
}

impl DrawRecord {
    /// Returns the value of a uniform at draw time.
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }
}
