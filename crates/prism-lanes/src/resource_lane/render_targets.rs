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

//! Off-screen framebuffers.

use ahash::AHashMap;
use prism_core::renderer::{
    ClearFlags, FramebufferDescriptor, FramebufferId, GraphicsDevice, RenderError,
    RendererCapabilities, SamplerDescriptor, TextureDescriptor, TextureFormat, TextureId,
};
use prism_core::scene::{AssetId, RenderTarget};

/// The GPU side of one [`RenderTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuRenderTarget {
    /// Framebuffer drawn into.
    pub framebuffer: FramebufferId,
    /// Colour attachment of `framebuffer`.
    pub color: TextureId,
    /// Depth or depth-stencil attachment of `framebuffer`.
    pub depth_stencil: Option<TextureId>,
    /// Single-sampled framebuffer and colour texture a multi-sampled target
    /// resolves into.
    pub resolve: Option<(FramebufferId, TextureId)>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Target version this allocation matches.
    pub version: u64,
    /// Effective sample count.
    pub samples: u32,
}

impl GpuRenderTarget {
    /// The texture holding the final, samplable image.
    pub fn texture(&self) -> TextureId {
        self.resolve.map_or(self.color, |(_, texture)| texture)
    }

    /// The framebuffer to read pixels back from.
    pub fn read_framebuffer(&self) -> FramebufferId {
        self.resolve.map_or(self.framebuffer, |(framebuffer, _)| framebuffer)
    }

    fn destroy(&self, device: &dyn GraphicsDevice) {
        device.destroy_framebuffer(self.framebuffer);
        device.destroy_texture(self.color);
        if let Some(depth) = self.depth_stencil {
            device.destroy_texture(depth);
        }
        if let Some((framebuffer, texture)) = self.resolve {
            device.destroy_framebuffer(framebuffer);
            device.destroy_texture(texture);
        }
    }
}

/// Render targets keyed by identity.
#[derive(Debug, Default)]
pub struct RenderTargetCache {
    targets: AHashMap<AssetId<RenderTarget>, GpuRenderTarget>,
    warned_samples: bool,
}

impl RenderTargetCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the attachments of `target`, re-allocating them when its
    /// version moved.
    pub fn update(
        &mut self,
        device: &dyn GraphicsDevice,
        target: &RenderTarget,
        capabilities: &RendererCapabilities,
    ) -> Result<GpuRenderTarget, RenderError> {
        let id = target.id();
        if let Some(gpu) = self.targets.get(&id) {
            if gpu.version == target.version() {
                return Ok(*gpu);
            }
            log::debug!("{id:?} changed, re-allocating its attachments");
            gpu.destroy(device);
            self.targets.remove(&id);
        }

        let mut samples = if target.is_multisampled() { target.samples } else { 0 };
        if samples > capabilities.max_samples {
            if !self.warned_samples {
                log::warn!(
                    "{samples}x multi-sampling is not supported (maximum {}); clamping.",
                    capabilities.max_samples
                );
                self.warned_samples = true;
            }
            samples = if capabilities.max_samples > 1 { capabilities.max_samples } else { 0 };
        }

        let mut allocation = Allocation::new(device);
        let gpu = allocation
            .build(target, samples)
            .map_err(|e| RenderError::upload(format!("render target {id:?}"), e))?;
        allocation.keep();
        self.targets.insert(id, gpu);
        Ok(gpu)
    }

    /// The allocation for `id`, if any.
    pub fn get(&self, id: AssetId<RenderTarget>) -> Option<&GpuRenderTarget> {
        self.targets.get(&id)
    }

    /// Copies a multi-sampled target into its single-sampled texture.
    /// Returns `false` for targets that need no resolve.
    pub fn resolve(
        &self,
        device: &dyn GraphicsDevice,
        id: AssetId<RenderTarget>,
    ) -> Result<bool, RenderError> {
        let Some(gpu) = self.targets.get(&id) else {
            return Ok(false);
        };
        let Some((framebuffer, _)) = gpu.resolve else {
            return Ok(false);
        };
        let (width, height) = (gpu.width, gpu.height);
        device
            .blit_framebuffer(gpu.framebuffer, Some(framebuffer), width, height, ClearFlags::COLOR)
            .map_err(|e| RenderError::upload(format!("render target {id:?} resolve"), e))?;
        Ok(true)
    }

    /// Releases every attachment of `id`.
    pub fn dispose(&mut self, device: &dyn GraphicsDevice, id: AssetId<RenderTarget>) -> bool {
        match self.targets.remove(&id) {
            Some(gpu) => {
                gpu.destroy(device);
                true
            }
            None => false,
        }
    }

    /// Number of live targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether no target is live.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Releases every target.
    pub fn dispose_all(&mut self, device: &dyn GraphicsDevice) {
        for gpu in self.targets.values() {
            gpu.destroy(device);
        }
        self.targets.clear();
    }

    /// Forgets every target without device calls (context loss).
    pub fn clear(&mut self) {
        self.targets.clear();
    }
}

/// Objects created while building a target, destroyed again unless the
/// build completes.
struct Allocation<'a> {
    device: &'a dyn GraphicsDevice,
    textures: Vec<TextureId>,
    framebuffers: Vec<FramebufferId>,
}

impl<'a> Allocation<'a> {
    fn new(device: &'a dyn GraphicsDevice) -> Self {
        Self {
            device,
            textures: Vec::new(),
            framebuffers: Vec::new(),
        }
    }

    fn texture(
        &mut self,
        width: u32,
        height: u32,
        format: TextureFormat,
        samples: u32,
    ) -> Result<TextureId, prism_core::renderer::DeviceError> {
        let id = self.device.create_texture(&TextureDescriptor {
            label: None,
            width,
            height,
            format,
            mip_levels: 1,
            samples,
            sampler: SamplerDescriptor::default(),
        })?;
        self.textures.push(id);
        Ok(id)
    }

    fn framebuffer(
        &mut self,
        color: TextureId,
        depth_stencil: Option<TextureId>,
    ) -> Result<FramebufferId, prism_core::renderer::DeviceError> {
        let id = self.device.create_framebuffer(&FramebufferDescriptor {
            label: None,
            color: Some(color),
            depth_stencil,
        })?;
        self.framebuffers.push(id);
        Ok(id)
    }

    fn build(
        &mut self,
        target: &RenderTarget,
        samples: u32,
    ) -> Result<GpuRenderTarget, prism_core::renderer::DeviceError> {
        let (width, height) = (target.width(), target.height());
        let color = self.texture(width, height, target.format, samples)?;
        let depth_format = match (target.depth_buffer, target.stencil_buffer) {
            (true, true) => Some(TextureFormat::Depth24Stencil8),
            (true, false) => Some(TextureFormat::Depth24),
            (false, _) => None,
        };
        let depth_stencil = match depth_format {
            Some(format) => Some(self.texture(width, height, format, samples)?),
            None => None,
        };
        let framebuffer = self.framebuffer(color, depth_stencil)?;
        let resolve = if samples > 1 {
            let texture = self.texture(width, height, target.format, 0)?;
            Some((self.framebuffer(texture, None)?, texture))
        } else {
            None
        };
        Ok(GpuRenderTarget {
            framebuffer,
            color,
            depth_stencil,
            resolve,
            width,
            height,
            version: target.version(),
            samples,
        })
    }

    fn keep(mut self) {
        self.textures.clear();
        self.framebuffers.clear();
    }
}

impl Drop for Allocation<'_> {
    fn drop(&mut self) {
        for framebuffer in self.framebuffers.drain(..) {
            self.device.destroy_framebuffer(framebuffer);
        }
        for texture in self.textures.drain(..) {
            self.device.destroy_texture(texture);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::renderer::{ClearValues, PixelRect, RendererSettings};
    use prism_infra::graphics::headless::{Command, HeadlessConfig, HeadlessDevice};

    fn caps(device: &HeadlessDevice) -> RendererCapabilities {
        RendererCapabilities::resolve(&device.capabilities(), &RendererSettings::default())
    }

    #[test]
    fn test_single_sampled_target() {
        let device = HeadlessDevice::new();
        let mut cache = RenderTargetCache::new();
        let target = RenderTarget::new(8, 4);
        let gpu = cache.update(&device, &target, &caps(&device)).unwrap();
        assert!(gpu.resolve.is_none());
        assert!(gpu.depth_stencil.is_some());
        assert_eq!(gpu.texture(), gpu.color);
        assert_eq!(device.live_textures(), 2);
        assert_eq!(device.live_framebuffers(), 1);
        assert!(!cache.resolve(&device, target.id()).unwrap());
    }

    #[test]
    fn test_resize_reallocates() {
        let device = HeadlessDevice::new();
        let mut cache = RenderTargetCache::new();
        let mut target = RenderTarget::new(8, 4);
        let first = cache.update(&device, &target, &caps(&device)).unwrap();
        device.clear_log();
        assert_eq!(cache.update(&device, &target, &caps(&device)).unwrap(), first);
        assert!(device.commands().is_empty());

        target.set_size(16, 16);
        let second = cache.update(&device, &target, &caps(&device)).unwrap();
        assert_ne!(first.framebuffer, second.framebuffer);
        assert_eq!((second.width, second.height), (16, 16));
        assert_eq!(device.live_textures(), 2);
        assert_eq!(device.live_framebuffers(), 1);
    }

    #[test]
    fn test_multisampled_target_resolves() {
        let device = HeadlessDevice::new();
        let mut cache = RenderTargetCache::new();
        let target = RenderTarget::new(2, 2).with_samples(4);
        let gpu = cache.update(&device, &target, &caps(&device)).unwrap();
        let (resolve_fb, resolve_tex) = gpu.resolve.unwrap();
        assert_eq!(gpu.texture(), resolve_tex);
        assert_eq!(gpu.read_framebuffer(), resolve_fb);

        device.bind_framebuffer(Some(gpu.framebuffer));
        device.clear(
            ClearFlags::COLOR,
            &ClearValues {
                color: [1.0, 0.0, 0.0, 1.0],
                ..ClearValues::default()
            },
        );
        assert!(cache.resolve(&device, target.id()).unwrap());
        device.bind_framebuffer(Some(resolve_fb));
        let pixels = device
            .read_pixels(PixelRect {
                x: 0,
                y: 0,
                width: 1,
                height: 1,
            })
            .unwrap();
        assert_eq!(pixels, vec![255, 0, 0, 255]);
    }

    #[test]
    fn test_excess_samples_are_clamped() {
        let device = HeadlessDevice::new();
        let mut cache = RenderTargetCache::new();
        let max = device.capabilities().max_samples;
        let target = RenderTarget::new(2, 2).with_samples(max * 2);
        let gpu = cache.update(&device, &target, &caps(&device)).unwrap();
        assert_eq!(gpu.samples, max);
    }

    #[test]
    fn test_failed_allocation_leaks_nothing() {
        let device = HeadlessDevice::with_config(HeadlessConfig {
            memory_budget: 100,
            ..HeadlessConfig::default()
        });
        let mut cache = RenderTargetCache::new();
        let target = RenderTarget::new(4, 4);
        let err = cache.update(&device, &target, &caps(&device)).unwrap_err();
        assert!(matches!(err, RenderError::ResourceUpload { .. }));
        assert_eq!(device.live_textures(), 0);
        assert_eq!(device.live_framebuffers(), 0);
        assert!(cache.is_empty());
        assert_eq!(device.count_commands(|c| matches!(c, Command::DestroyTexture(_))), 1);
    }

    #[test]
    fn test_dispose_releases_everything() {
        let device = HeadlessDevice::new();
        let mut cache = RenderTargetCache::new();
        let target = RenderTarget::new(2, 2).with_samples(4);
        cache.update(&device, &target, &caps(&device)).unwrap();
        assert!(cache.dispose(&device, target.id()));
        assert_eq!(device.live_textures(), 0);
        assert_eq!(device.live_framebuffers(), 0);
        assert!(!cache.dispose(&device, target.id()));
    }
}
