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

use super::render_state::RenderState;
use prism_core::renderer::{
    BlendEquation, BlendFactor, Capability, ColorWrites, CompareFunction, CullFace, FramebufferId,
    FrontFace, GraphicsDevice, ProgramId, StencilOperation, TextureId, Viewport,
};

/// What the device is known to have bound. `None` means unknown, which
/// forces the next setter to issue its call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateSnapshot {
    /// Per [`Capability::index`].
    pub capabilities: [Option<bool>; Capability::ALL.len()],
    /// Colour and alpha blend equations.
    pub blend_equation: Option<(BlendEquation, BlendEquation)>,
    /// Colour and alpha source/destination factors.
    pub blend_func: Option<[BlendFactor; 4]>,
    /// Depth comparison.
    pub depth_func: Option<CompareFunction>,
    /// Depth writes.
    pub depth_mask: Option<bool>,
    /// Stencil comparison, reference and read mask.
    pub stencil_func: Option<(CompareFunction, i32, u32)>,
    /// Stencil fail, depth-fail and pass operations.
    pub stencil_op: Option<[StencilOperation; 3]>,
    /// Stencil write mask.
    pub stencil_mask: Option<u32>,
    /// Culled faces.
    pub cull_face: Option<CullFace>,
    /// Front-face winding.
    pub front_face: Option<FrontFace>,
    /// Polygon offset factor and units.
    pub polygon_offset: Option<(f32, f32)>,
    /// Colour write mask.
    pub color_mask: Option<ColorWrites>,
    /// Program in use.
    pub program: Option<Option<ProgramId>>,
    /// Bound framebuffer, `Some(None)` for the default surface.
    pub framebuffer: Option<Option<FramebufferId>>,
    /// Viewport rectangle.
    pub viewport: Option<Viewport>,
    /// Texture bound to each unit, indexed by unit.
    pub texture_units: Vec<Option<Option<TextureId>>>,
}

/// Issues device state calls only when they change something.
#[derive(Debug, Default)]
pub struct GpuStateTracker {
    snapshot: StateSnapshot,
}

impl GpuStateTracker {
    /// Creates a tracker that knows nothing about the device.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current knowledge about the device.
    pub fn snapshot(&self) -> &StateSnapshot {
        &self.snapshot
    }

    /// Forgets everything, forcing full re-application.
    pub fn invalidate(&mut self) {
        self.snapshot = StateSnapshot::default();
    }

    /// Applies every field of `state`.
    pub fn apply(&mut self, device: &dyn GraphicsDevice, state: &RenderState) {
        match state.blend {
            None => self.set_capability(device, Capability::Blend, false),
            Some(blend) => {
                self.set_capability(device, Capability::Blend, true);
                let equation = (blend.color.equation, blend.alpha.equation);
                if self.snapshot.blend_equation != Some(equation) {
                    device.set_blend_equation(equation.0, equation.1);
                    self.snapshot.blend_equation = Some(equation);
                }
                let factors = [blend.color.src, blend.color.dst, blend.alpha.src, blend.alpha.dst];
                if self.snapshot.blend_func != Some(factors) {
                    device.set_blend_func(factors[0], factors[1], factors[2], factors[3]);
                    self.snapshot.blend_func = Some(factors);
                }
            }
        }

        self.set_capability(device, Capability::DepthTest, state.depth_test);
        if state.depth_test && self.snapshot.depth_func != Some(state.depth_func) {
            device.set_depth_func(state.depth_func);
            self.snapshot.depth_func = Some(state.depth_func);
        }
        self.force_depth_mask(device, state.depth_write);

        match state.stencil {
            None => self.set_capability(device, Capability::StencilTest, false),
            Some(stencil) => {
                self.set_capability(device, Capability::StencilTest, true);
                let func = (stencil.compare, stencil.reference, stencil.read_mask);
                if self.snapshot.stencil_func != Some(func) {
                    device.set_stencil_func(func.0, func.1, func.2);
                    self.snapshot.stencil_func = Some(func);
                }
                let ops = [stencil.fail_op, stencil.depth_fail_op, stencil.pass_op];
                if self.snapshot.stencil_op != Some(ops) {
                    device.set_stencil_op(ops[0], ops[1], ops[2]);
                    self.snapshot.stencil_op = Some(ops);
                }
                self.set_stencil_mask(device, stencil.write_mask);
            }
        }

        match state.cull_face {
            None => self.set_capability(device, Capability::CullFace, false),
            Some(face) => {
                self.set_capability(device, Capability::CullFace, true);
                if self.snapshot.cull_face != Some(face) {
                    device.set_cull_face(face);
                    self.snapshot.cull_face = Some(face);
                }
            }
        }
        if self.snapshot.front_face != Some(state.front_face) {
            device.set_front_face(state.front_face);
            self.snapshot.front_face = Some(state.front_face);
        }

        match state.polygon_offset {
            None => self.set_capability(device, Capability::PolygonOffsetFill, false),
            Some(offset) => {
                self.set_capability(device, Capability::PolygonOffsetFill, true);
                let params = (offset.factor, offset.units);
                if self.snapshot.polygon_offset != Some(params) {
                    device.set_polygon_offset(params.0, params.1);
                    self.snapshot.polygon_offset = Some(params);
                }
            }
        }

        self.force_color_mask(device, state.color_write);
        self.set_capability(device, Capability::SampleAlphaToCoverage, state.alpha_to_coverage);
    }

    /// Enables or disables a capability.
    pub fn set_capability(
        &mut self,
        device: &dyn GraphicsDevice,
        capability: Capability,
        enabled: bool,
    ) {
        let slot = &mut self.snapshot.capabilities[capability.index()];
        if *slot != Some(enabled) {
            device.set_capability(capability, enabled);
            *slot = Some(enabled);
        }
    }

    /// Sets depth writes regardless of any material, e.g. before a depth clear.
    pub fn force_depth_mask(&mut self, device: &dyn GraphicsDevice, write: bool) {
        if self.snapshot.depth_mask != Some(write) {
            device.set_depth_mask(write);
            self.snapshot.depth_mask = Some(write);
        }
    }

    /// Sets the colour mask regardless of any material, e.g. before a colour clear.
    pub fn force_color_mask(&mut self, device: &dyn GraphicsDevice, mask: ColorWrites) {
        if self.snapshot.color_mask != Some(mask) {
            device.set_color_mask(mask);
            self.snapshot.color_mask = Some(mask);
        }
    }

    /// Sets the stencil write mask.
    pub fn set_stencil_mask(&mut self, device: &dyn GraphicsDevice, mask: u32) {
        if self.snapshot.stencil_mask != Some(mask) {
            device.set_stencil_mask(mask);
            self.snapshot.stencil_mask = Some(mask);
        }
    }

    /// Makes `program` current. Returns `true` when a call was issued.
    pub fn use_program(&mut self, device: &dyn GraphicsDevice, program: Option<ProgramId>) -> bool {
        if self.snapshot.program == Some(program) {
            return false;
        }
        device.use_program(program);
        self.snapshot.program = Some(program);
        true
    }

    /// Binds `framebuffer`, `None` for the default surface. Returns `true`
    /// when a call was issued.
    pub fn bind_framebuffer(
        &mut self,
        device: &dyn GraphicsDevice,
        framebuffer: Option<FramebufferId>,
    ) -> bool {
        if self.snapshot.framebuffer == Some(framebuffer) {
            return false;
        }
        device.bind_framebuffer(framebuffer);
        self.snapshot.framebuffer = Some(framebuffer);
        true
    }

    /// Sets the viewport.
    pub fn set_viewport(&mut self, device: &dyn GraphicsDevice, viewport: Viewport) {
        if self.snapshot.viewport != Some(viewport) {
            device.set_viewport(viewport);
            self.snapshot.viewport = Some(viewport);
        }
    }

    /// Binds `texture` to `unit`.
    pub fn bind_texture(
        &mut self,
        device: &dyn GraphicsDevice,
        unit: u32,
        texture: Option<TextureId>,
    ) {
        let index = unit as usize;
        if self.snapshot.texture_units.len() <= index {
            self.snapshot.texture_units.resize(index + 1, None);
        }
        if self.snapshot.texture_units[index] != Some(texture) {
            device.bind_texture(unit, texture);
            self.snapshot.texture_units[index] = Some(texture);
        }
    }

    /// Marks bindings of a destroyed program as unknown.
    pub fn forget_program(&mut self, program: ProgramId) {
        if self.snapshot.program == Some(Some(program)) {
            self.snapshot.program = None;
        }
    }

    /// Marks bindings of a destroyed texture as unknown.
    pub fn forget_texture(&mut self, texture: TextureId) {
        for unit in &mut self.snapshot.texture_units {
            if *unit == Some(Some(texture)) {
                *unit = None;
            }
        }
    }

    /// Marks bindings of a destroyed framebuffer as unknown.
    pub fn forget_framebuffer(&mut self, framebuffer: FramebufferId) {
        if self.snapshot.framebuffer == Some(Some(framebuffer)) {
            self.snapshot.framebuffer = None;
        }
    }
}
