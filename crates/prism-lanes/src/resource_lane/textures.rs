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

//! Sampled textures.

use ahash::AHashMap;
use prism_core::renderer::{
    full_mip_chain, FilterMode, GraphicsDevice, RenderError, RendererCapabilities,
    SamplerDescriptor, TextureDescriptor, TextureFormat, TextureId,
};
use prism_core::scene::{AssetId, Texture};

/// The GPU side of one [`Texture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuTexture {
    /// Device texture.
    pub id: TextureId,
    /// Texture version last uploaded.
    pub version: u64,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Texel format.
    pub format: TextureFormat,
    /// Allocated mip levels.
    pub mip_levels: u32,
    /// Sampling state after degradation.
    pub sampler: SamplerDescriptor,
}

/// Textures keyed by identity.
#[derive(Debug, Default)]
pub struct TextureCache {
    textures: AHashMap<AssetId<Texture>, GpuTexture>,
    warned_npot: bool,
    warned_anisotropy: bool,
}

impl TextureCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads `texture` if its version moved since the last upload.
    ///
    /// The texture is re-allocated when its size, format, mip count or
    /// sampler changed; otherwise only the base level is rewritten.
    pub fn update(
        &mut self,
        device: &dyn GraphicsDevice,
        texture: &Texture,
        capabilities: &RendererCapabilities,
    ) -> Result<GpuTexture, RenderError> {
        let id = texture.id();
        let cached = self.textures.get(&id).copied();
        if let Some(gpu) = cached.filter(|gpu| gpu.version == texture.version()) {
            return Ok(gpu);
        }

        let (width, height) = (texture.image.width, texture.image.height);
        let mut sampler = texture.sampler;
        if sampler.anisotropy > capabilities.max_anisotropy {
            if !self.warned_anisotropy {
                log::warn!(
                    "Anisotropy {} exceeds the device maximum {}; clamping.",
                    sampler.anisotropy,
                    capabilities.max_anisotropy
                );
                self.warned_anisotropy = true;
            }
            sampler.anisotropy = capabilities.max_anisotropy;
        }

        let power_of_two = width.is_power_of_two() && height.is_power_of_two();
        let mipmaps = texture.generate_mipmaps && (power_of_two || capabilities.npot_mipmaps);
        if texture.generate_mipmaps && !mipmaps && !self.warned_npot {
            log::warn!(
                "Texture '{}' is {width}x{height}; skipping mipmaps for a non power-of-two size.",
                texture.name
            );
            self.warned_npot = true;
        }
        if !mipmaps && sampler.min_filter.uses_mipmaps() {
            sampler.min_filter = FilterMode::Linear;
        }
        let mip_levels = if mipmaps { full_mip_chain(width, height) } else { 1 };

        let label = || {
            if texture.name.is_empty() {
                format!("texture {id:?}")
            } else {
                format!("texture '{}'", texture.name)
            }
        };
        let reusable = cached.filter(|gpu| {
            (gpu.width, gpu.height, gpu.format, gpu.mip_levels, gpu.sampler)
                == (width, height, texture.format, mip_levels, sampler)
        });
        let (texture_id, created) = match reusable {
            Some(gpu) => (gpu.id, false),
            None => {
                if let Some(stale) = cached {
                    device.destroy_texture(stale.id);
                    self.textures.remove(&id);
                }
                let created = device
                    .create_texture(&TextureDescriptor {
                        label: Some(texture.name.as_str()),
                        width,
                        height,
                        format: texture.format,
                        mip_levels,
                        samples: 0,
                        sampler,
                    })
                    .map_err(|e| RenderError::upload(label(), e))?;
                (created, true)
            }
        };

        let upload = device.write_texture(texture_id, 0, &texture.image.data).and_then(|()| {
            if mip_levels > 1 {
                device.generate_mipmaps(texture_id)
            } else {
                Ok(())
            }
        });
        if let Err(e) = upload {
            if created {
                device.destroy_texture(texture_id);
            }
            return Err(RenderError::upload(label(), e));
        }

        let gpu = GpuTexture {
            id: texture_id,
            version: texture.version(),
            width,
            height,
            format: texture.format,
            mip_levels,
            sampler,
        };
        self.textures.insert(id, gpu);
        Ok(gpu)
    }

    /// The uploaded texture for `id`, if any.
    pub fn get(&self, id: AssetId<Texture>) -> Option<&GpuTexture> {
        self.textures.get(&id)
    }

    /// Releases the texture of `id` immediately.
    pub fn dispose(
        &mut self,
        device: &dyn GraphicsDevice,
        id: AssetId<Texture>,
    ) -> Option<TextureId> {
        let gpu = self.textures.remove(&id)?;
        device.destroy_texture(gpu.id);
        Some(gpu.id)
    }

    /// Number of live textures.
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Whether no texture is live.
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Releases every texture.
    pub fn dispose_all(&mut self, device: &dyn GraphicsDevice) {
        for gpu in self.textures.values() {
            device.destroy_texture(gpu.id);
        }
        self.textures.clear();
    }

    /// Forgets every texture without device calls (context loss).
    pub fn clear(&mut self) {
        self.textures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::renderer::{DeviceCapabilities, DeviceError, RendererSettings};
    use prism_infra::graphics::headless::{Command, HeadlessConfig, HeadlessDevice};

    fn caps(device: &HeadlessDevice) -> RendererCapabilities {
        RendererCapabilities::resolve(&device.capabilities(), &RendererSettings::default())
    }

    #[test]
    fn test_upload_once_per_version() {
        let device = HeadlessDevice::new();
        let mut cache = TextureCache::new();
        let mut texture = Texture::solid(4, [255, 0, 0, 255]);
        let first = cache.update(&device, &texture, &caps(&device)).unwrap();

        device.clear_log();
        cache.update(&device, &texture, &caps(&device)).unwrap();
        assert!(device.commands().is_empty());

        texture.edit(|t| t.image.data[0] = 0);
        let second = cache.update(&device, &texture, &caps(&device)).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(
            device.commands(),
            vec![Command::WriteTexture {
                id: first.id,
                level: 0,
                len: 64
            }]
        );
    }

    #[test]
    fn test_resize_reallocates() {
        let device = HeadlessDevice::new();
        let mut cache = TextureCache::new();
        let mut texture = Texture::solid(4, [0; 4]);
        let first = cache.update(&device, &texture, &caps(&device)).unwrap();
        texture.edit(|t| {
            t.image.width = 2;
            t.image.height = 2;
            t.image.data.truncate(16);
        });
        let second = cache.update(&device, &texture, &caps(&device)).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(device.live_textures(), 1);
    }

    #[test]
    fn test_mipmaps_generated_for_power_of_two() {
        let device = HeadlessDevice::new();
        let mut cache = TextureCache::new();
        let mut texture = Texture::solid(8, [0; 4]);
        texture.generate_mipmaps = true;
        let gpu = cache.update(&device, &texture, &caps(&device)).unwrap();
        assert_eq!(gpu.mip_levels, 4);
        assert!(device.commands().contains(&Command::GenerateMipmaps(gpu.id)));
    }

    #[test]
    fn test_npot_mipmaps_degrade() {
        let device = HeadlessDevice::with_config(HeadlessConfig {
            capabilities: DeviceCapabilities {
                npot_mipmaps: false,
                ..DeviceCapabilities::default()
            },
            ..HeadlessConfig::default()
        });
        let mut cache = TextureCache::new();
        let mut texture = Texture::new(3, 5, TextureFormat::R8, vec![0; 15]);
        texture.generate_mipmaps = true;
        texture.sampler.min_filter = FilterMode::LinearMipmapLinear;
        let gpu = cache.update(&device, &texture, &caps(&device)).unwrap();
        assert_eq!(gpu.mip_levels, 1);
        assert_eq!(gpu.sampler.min_filter, FilterMode::Linear);
        assert_eq!(device.count_commands(|c| matches!(c, Command::GenerateMipmaps(_))), 0);
    }

    #[test]
    fn test_anisotropy_is_clamped() {
        let device = HeadlessDevice::with_config(HeadlessConfig {
            capabilities: DeviceCapabilities {
                max_anisotropy: 2,
                ..DeviceCapabilities::default()
            },
            ..HeadlessConfig::default()
        });
        let mut cache = TextureCache::new();
        let mut texture = Texture::solid(2, [0; 4]);
        texture.sampler.anisotropy = 16;
        let gpu = cache.update(&device, &texture, &caps(&device)).unwrap();
        assert_eq!(gpu.sampler.anisotropy, 2);
    }

    #[test]
    fn test_bad_data_reports_and_leaks_nothing() {
        let device = HeadlessDevice::new();
        let mut cache = TextureCache::new();
        let texture = Texture::new(4, 4, TextureFormat::Rgba8, vec![0; 3]);
        let err = cache.update(&device, &texture, &caps(&device)).unwrap_err();
        assert!(matches!(
            err,
            RenderError::ResourceUpload {
                source: DeviceError::InvalidFormat(_),
                ..
            }
        ));
        assert_eq!(device.live_textures(), 0);
        assert!(cache.get(texture.id()).is_none());
    }

    #[test]
    fn test_dispose_releases_texture() {
        let device = HeadlessDevice::new();
        let mut cache = TextureCache::new();
        let texture = Texture::solid(2, [0; 4]);
        let gpu = cache.update(&device, &texture, &caps(&device)).unwrap();
        assert_eq!(cache.dispose(&device, texture.id()), Some(gpu.id));
        assert_eq!(cache.dispose(&device, texture.id()), None);
        assert_eq!(device.live_textures(), 0);
    }
}
