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

//! Texture descriptors and sampling parameters.

/// The texel format of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    /// Single 8-bit channel.
    R8,
    /// Two 8-bit channels.
    Rg8,
    /// Three 8-bit channels.
    Rgb8,
    /// Four 8-bit channels.
    #[default]
    Rgba8,
    /// Four half-float channels.
    Rgba16Float,
    /// Four float channels.
    Rgba32Float,
    /// 24-bit depth.
    Depth24,
    /// 24-bit depth with 8-bit stencil.
    Depth24Stencil8,
    /// 32-bit float depth.
    Depth32Float,
}

impl TextureFormat {
    /// Bytes per texel.
    pub const fn bytes_per_texel(self) -> u32 {
        match self {
            TextureFormat::R8 => 1,
            TextureFormat::Rg8 => 2,
            TextureFormat::Rgb8 => 3,
            TextureFormat::Rgba8 | TextureFormat::Depth24 | TextureFormat::Depth24Stencil8 => 4,
            TextureFormat::Depth32Float => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Rgba32Float => 16,
        }
    }

    /// Returns `true` for depth (and depth-stencil) formats.
    pub const fn is_depth(self) -> bool {
        matches!(
            self,
            TextureFormat::Depth24 | TextureFormat::Depth24Stencil8 | TextureFormat::Depth32Float
        )
    }

    /// Returns `true` for floating-point colour formats.
    pub const fn is_float(self) -> bool {
        matches!(self, TextureFormat::Rgba16Float | TextureFormat::Rgba32Float)
    }
}

/// Texel filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest texel.
    Nearest,
    /// Linear interpolation.
    #[default]
    Linear,
    /// Linear interpolation between linearly filtered mip levels.
    LinearMipmapLinear,
}

impl FilterMode {
    /// Returns `true` if this filter samples mip levels.
    pub const fn uses_mipmaps(self) -> bool {
        matches!(self, FilterMode::LinearMipmapLinear)
    }
}

/// Behaviour for texture coordinates outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    /// Clamp to the edge texel.
    #[default]
    ClampToEdge,
    /// Tile.
    Repeat,
    /// Tile, mirroring every other repetition.
    MirroredRepeat,
}

/// Sampling state attached to a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SamplerDescriptor {
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Horizontal wrapping.
    pub wrap_s: WrapMode,
    /// Vertical wrapping.
    pub wrap_t: WrapMode,
    /// Anisotropic filtering level (1 = off).
    pub anisotropy: u8,
}

/// Describes a texture to be created by
/// [`GraphicsDevice::create_texture`](crate::renderer::GraphicsDevice::create_texture).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor<'a> {
    /// Debug label.
    pub label: Option<&'a str>,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Texel format.
    pub format: TextureFormat,
    /// Number of mip levels to allocate (at least 1).
    pub mip_levels: u32,
    /// Sample count; 0 or 1 for single-sampled textures.
    pub samples: u32,
    /// Sampling state.
    pub sampler: SamplerDescriptor,
}

impl TextureDescriptor<'_> {
    /// Size in bytes of the base level.
    pub fn base_level_size(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height) * u64::from(self.format.bytes_per_texel())
    }
}

/// Number of mip levels in a full chain for the given dimensions.
pub fn full_mip_chain(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_mip_chain() {
        assert_eq!(full_mip_chain(1, 1), 1);
        assert_eq!(full_mip_chain(256, 256), 9);
        assert_eq!(full_mip_chain(300, 20), 9);
    }

    #[test]
    fn test_base_level_size() {
        let desc = TextureDescriptor {
            label: None,
            width: 4,
            height: 2,
            format: TextureFormat::Rgba8,
            mip_levels: 1,
            samples: 0,
            sampler: SamplerDescriptor::default(),
        };
        assert_eq!(desc.base_level_size(), 32);
    }

    #[test]
    fn test_depth_formats() {
        assert!(TextureFormat::Depth24Stencil8.is_depth());
        assert!(!TextureFormat::Rgba16Float.is_depth());
        assert!(TextureFormat::Rgba16Float.is_float());
    }
}
