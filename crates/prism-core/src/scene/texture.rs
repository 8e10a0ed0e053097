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

//! CPU-side images sampled by materials.

use super::asset::{Asset, AssetId};
use crate::renderer::api::{SamplerDescriptor, TextureFormat};

/// Pixel data of the base mip level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Tightly packed texels, bottom row first.
    pub data: Vec<u8>,
}

/// A versioned image with sampling parameters.
#[derive(Debug, Clone)]
pub struct Texture {
    id: AssetId<Texture>,
    version: u64,
    /// Debug name.
    pub name: String,
    /// Pixel data.
    pub image: TextureImage,
    /// Texel format of `image.data`.
    pub format: TextureFormat,
    /// Filtering and wrapping.
    pub sampler: SamplerDescriptor,
    /// Build a full mip chain after each upload.
    pub generate_mipmaps: bool,
}

impl Texture {
    /// Creates a texture from raw texels.
    pub fn new(width: u32, height: u32, format: TextureFormat, data: Vec<u8>) -> Self {
        Self {
            id: AssetId::generate(),
            version: 0,
            name: String::new(),
            image: TextureImage { width, height, data },
            format,
            sampler: SamplerDescriptor {
                anisotropy: 1,
                ..SamplerDescriptor::default()
            },
            generate_mipmaps: false,
        }
    }

    /// A `size x size` RGBA8 texture filled with one colour.
    pub fn solid(size: u32, rgba: [u8; 4]) -> Self {
        let texels = (size * size) as usize;
        Self::new(size, size, TextureFormat::Rgba8, rgba.repeat(texels))
    }

    /// The texture's identity.
    pub fn id(&self) -> AssetId<Texture> {
        self.id
    }

    /// The current version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Marks the image or sampler as modified, forcing a re-upload.
    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    /// Mutates the texture and advances its version once.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut Texture) -> R) -> R {
        let result = f(self);
        self.version += 1;
        result
    }
}

impl Asset for Texture {
    fn id(&self) -> AssetId<Self> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_texture_size() {
        let t = Texture::solid(4, [255, 0, 0, 255]);
        assert_eq!(t.image.data.len(), 64);
        assert_eq!(&t.image.data[4..8], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_edit_bumps_version() {
        let mut t = Texture::solid(1, [0; 4]);
        t.edit(|t| t.generate_mipmaps = true);
        assert_eq!(t.version(), 1);
        assert!(t.generate_mipmaps);
    }
}
