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

//! Fixed-function pipeline state: blending, depth, stencil, culling and masks.

use bitflags::bitflags;

/// A server-side capability toggled with enable/disable calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// Colour blending.
    Blend,
    /// Depth testing.
    DepthTest,
    /// Stencil testing.
    StencilTest,
    /// Face culling.
    CullFace,
    /// Polygon offset for filled primitives.
    PolygonOffsetFill,
    /// Alpha-to-coverage on multi-sampled targets.
    SampleAlphaToCoverage,
    /// Scissor testing.
    ScissorTest,
}

impl Capability {
    /// Every capability, in a stable order.
    pub const ALL: [Capability; 7] = [
        Capability::Blend,
        Capability::DepthTest,
        Capability::StencilTest,
        Capability::CullFace,
        Capability::PolygonOffsetFill,
        Capability::SampleAlphaToCoverage,
        Capability::ScissorTest,
    ];

    /// Dense index of this capability, usable as an array slot.
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// A comparison function used for depth and stencil tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunction {
    /// The test never passes.
    Never,
    /// Passes if the new value is less than the stored one.
    Less,
    /// Passes if the values are equal.
    Equal,
    /// Passes if the new value is less than or equal to the stored one.
    #[default]
    LessEqual,
    /// Passes if the new value is greater than the stored one.
    Greater,
    /// Passes if the values differ.
    NotEqual,
    /// Passes if the new value is greater than or equal to the stored one.
    GreaterEqual,
    /// The test always passes.
    Always,
}

/// The operation applied to a stored stencil value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StencilOperation {
    /// Keep the current value.
    #[default]
    Keep,
    /// Set the value to zero.
    Zero,
    /// Replace the value with the reference value.
    Replace,
    /// Increment, clamping at the maximum.
    IncrementClamp,
    /// Decrement, clamping at zero.
    DecrementClamp,
    /// Bitwise invert the value.
    Invert,
    /// Increment, wrapping to zero.
    IncrementWrap,
    /// Decrement, wrapping to the maximum.
    DecrementWrap,
}

/// Complete stencil configuration for one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilState {
    /// Comparison against the stored value.
    pub compare: CompareFunction,
    /// Reference value for the comparison and for `Replace`.
    pub reference: i32,
    /// Mask applied to both operands before comparing.
    pub read_mask: u32,
    /// Mask applied when writing stencil values.
    pub write_mask: u32,
    /// Operation when the stencil test fails.
    pub fail_op: StencilOperation,
    /// Operation when the stencil test passes but depth fails.
    pub depth_fail_op: StencilOperation,
    /// Operation when both tests pass.
    pub pass_op: StencilOperation,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            compare: CompareFunction::Always,
            reference: 0,
            read_mask: 0xff,
            write_mask: 0xff,
            fail_op: StencilOperation::Keep,
            depth_fail_op: StencilOperation::Keep,
            pass_op: StencilOperation::Keep,
        }
    }
}

/// The equation combining source and destination colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendEquation {
    /// `src + dst`
    #[default]
    Add,
    /// `src - dst`
    Subtract,
    /// `dst - src`
    ReverseSubtract,
    /// `min(src, dst)`
    Min,
    /// `max(src, dst)`
    Max,
}

/// A multiplier applied to a blend operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstColor,
    OneMinusDstColor,
    DstAlpha,
    OneMinusDstAlpha,
    SrcAlphaSaturate,
}

/// One half (colour or alpha) of a blend configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponent {
    /// Source factor.
    pub src: BlendFactor,
    /// Destination factor.
    pub dst: BlendFactor,
    /// Combining equation.
    pub equation: BlendEquation,
}

impl BlendComponent {
    /// Builds an additive component from two factors.
    pub const fn add(src: BlendFactor, dst: BlendFactor) -> Self {
        Self {
            src,
            dst,
            equation: BlendEquation::Add,
        }
    }
}

/// Resolved blending for one draw, as issued to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    /// Colour channel blending.
    pub color: BlendComponent,
    /// Alpha channel blending.
    pub alpha: BlendComponent,
}

/// The blending preset selected by a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Blending disabled.
    None,
    /// Standard "over" compositing.
    #[default]
    Normal,
    /// Adds the source onto the destination.
    Additive,
    /// Subtracts the source from the destination.
    Subtractive,
    /// Multiplies the destination by the source.
    Multiply,
    /// Explicit factors and equations.
    Custom(BlendState),
}

impl BlendMode {
    /// Resolves the preset into concrete factors.
    ///
    /// Returns `None` when blending must be disabled. `premultiplied_alpha`
    /// selects the factor set for colours already multiplied by alpha.
    pub fn resolve(self, premultiplied_alpha: bool) -> Option<BlendState> {
        use BlendFactor::*;
        let same = |src, dst| BlendState {
            color: BlendComponent::add(src, dst),
            alpha: BlendComponent::add(src, dst),
        };
        let split = |src, dst, src_a, dst_a| BlendState {
            color: BlendComponent::add(src, dst),
            alpha: BlendComponent::add(src_a, dst_a),
        };
        match (self, premultiplied_alpha) {
            (BlendMode::None, _) => None,
            (BlendMode::Normal, true) => Some(same(One, OneMinusSrcAlpha)),
            (BlendMode::Normal, false) => {
                Some(split(SrcAlpha, OneMinusSrcAlpha, One, OneMinusSrcAlpha))
            }
            (BlendMode::Additive, true) => Some(same(One, One)),
            (BlendMode::Additive, false) => Some(split(SrcAlpha, One, One, One)),
            (BlendMode::Subtractive, true) => {
                Some(split(Zero, OneMinusSrcColor, Zero, OneMinusSrcAlpha))
            }
            (BlendMode::Subtractive, false) => Some(split(Zero, OneMinusSrcColor, Zero, One)),
            (BlendMode::Multiply, true) => Some(split(Zero, SrcColor, Zero, SrcAlpha)),
            (BlendMode::Multiply, false) => Some(split(Zero, SrcColor, Zero, One)),
            (BlendMode::Custom(state), _) => Some(state),
        }
    }
}

/// Which faces are discarded when culling is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullFace {
    /// Cull back faces.
    Back,
    /// Cull front faces.
    Front,
    /// Cull every polygon.
    FrontAndBack,
}

/// The winding order that identifies front faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    /// Counter-clockwise winding is front facing.
    #[default]
    Ccw,
    /// Clockwise winding is front facing.
    Cw,
}

/// Depth offset applied to filled polygons.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PolygonOffset {
    /// Scale applied to the polygon's depth slope.
    pub factor: f32,
    /// Constant offset in depth-buffer units.
    pub units: f32,
}

bitflags! {
    /// Colour channels enabled for writing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWrites: u8 {
        /// Red channel.
        const RED = 1 << 0;
        /// Green channel.
        const GREEN = 1 << 1;
        /// Blue channel.
        const BLUE = 1 << 2;
        /// Alpha channel.
        const ALPHA = 1 << 3;
        /// All channels.
        const ALL = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits() | Self::ALPHA.bits();
    }
}

/// A viewport or scissor rectangle, in pixels from the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport {
    /// Left edge.
    pub x: i32,
    /// Bottom edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Viewport {
    /// Creates a viewport covering `width x height` from the origin.
    pub const fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_blending_resolves_to_none() {
        assert_eq!(BlendMode::None.resolve(false), None);
        assert_eq!(BlendMode::None.resolve(true), None);
    }

    #[test]
    fn test_normal_blending_depends_on_premultiplication() {
        let straight = BlendMode::Normal.resolve(false).unwrap();
        let premultiplied = BlendMode::Normal.resolve(true).unwrap();
        assert_eq!(straight.color.src, BlendFactor::SrcAlpha);
        assert_eq!(premultiplied.color.src, BlendFactor::One);
        assert_eq!(straight.color.dst, premultiplied.color.dst);
    }

    #[test]
    fn test_custom_blending_passes_through() {
        let state = BlendState {
            color: BlendComponent {
                src: BlendFactor::DstColor,
                dst: BlendFactor::Zero,
                equation: BlendEquation::Max,
            },
            alpha: BlendComponent::add(BlendFactor::One, BlendFactor::Zero),
        };
        assert_eq!(BlendMode::Custom(state).resolve(true), Some(state));
    }

    #[test]
    fn test_capability_indices_are_dense() {
        for (i, cap) in Capability::ALL.iter().enumerate() {
            assert_eq!(cap.index(), i);
        }
    }

    #[test]
    fn test_color_writes_all() {
        assert_eq!(ColorWrites::ALL.bits(), 0b1111);
        assert!(ColorWrites::ALL.contains(ColorWrites::ALPHA));
    }
}
