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

//! Draw, clear, framebuffer and read-back descriptors.

use super::TextureId;
use bitflags::bitflags;

/// How vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveMode {
    /// Independent triangles.
    #[default]
    Triangles,
    /// Connected triangle strip.
    TriangleStrip,
    /// Independent line segments.
    Lines,
    /// Connected line strip.
    LineStrip,
    /// Points.
    Points,
}

impl PrimitiveMode {
    /// Number of primitives produced by `count` vertices.
    pub fn primitive_count(self, count: u32) -> u32 {
        match self {
            PrimitiveMode::Triangles => count / 3,
            PrimitiveMode::TriangleStrip => count.saturating_sub(2),
            PrimitiveMode::Lines => count / 2,
            PrimitiveMode::LineStrip => count.saturating_sub(1),
            PrimitiveMode::Points => count,
        }
    }
}

bitflags! {
    /// Buffers cleared by [`GraphicsDevice::clear`](crate::renderer::GraphicsDevice::clear).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u8 {
        /// The colour attachment.
        const COLOR = 1 << 0;
        /// The depth attachment.
        const DEPTH = 1 << 1;
        /// The stencil attachment.
        const STENCIL = 1 << 2;
    }
}

/// Values written by a clear.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearValues {
    /// RGBA colour.
    pub color: [f32; 4],
    /// Depth value.
    pub depth: f32,
    /// Stencil value.
    pub stencil: u32,
}

impl Default for ClearValues {
    fn default() -> Self {
        Self {
            color: [0.0, 0.0, 0.0, 1.0],
            depth: 1.0,
            stencil: 0,
        }
    }
}

/// Attachments of a framebuffer to be created by
/// [`GraphicsDevice::create_framebuffer`](crate::renderer::GraphicsDevice::create_framebuffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferDescriptor<'a> {
    /// Debug label.
    pub label: Option<&'a str>,
    /// Colour attachment.
    pub color: Option<TextureId>,
    /// Depth or depth-stencil attachment.
    pub depth_stencil: Option<TextureId>,
}

/// A rectangle of pixels to read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    /// Left edge.
    pub x: u32,
    /// Bottom edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_counts() {
        assert_eq!(PrimitiveMode::Triangles.primitive_count(9), 3);
        assert_eq!(PrimitiveMode::TriangleStrip.primitive_count(5), 3);
        assert_eq!(PrimitiveMode::TriangleStrip.primitive_count(1), 0);
        assert_eq!(PrimitiveMode::Lines.primitive_count(4), 2);
        assert_eq!(PrimitiveMode::Points.primitive_count(7), 7);
    }
}
