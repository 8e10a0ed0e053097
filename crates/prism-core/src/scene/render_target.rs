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

//! Off-screen surfaces a frame can be rendered into.

use super::asset::{Asset, AssetId};
use crate::renderer::api::TextureFormat;

/// An off-screen colour surface with optional depth and stencil buffers.
///
/// Like every other scene resource the target only describes what the GPU
/// side should look like; the renderer allocates the framebuffer lazily and
/// recreates it when [`version`](Self::version) changes.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTarget {
    id: AssetId<RenderTarget>,
    version: u64,
    width: u32,
    height: u32,
    /// Format of the colour attachment.
    pub format: TextureFormat,
    /// Whether a depth buffer is attached.
    pub depth_buffer: bool,
    /// Whether the depth buffer carries a stencil component.
    pub stencil_buffer: bool,
    /// MSAA sample count. `0` or `1` means single-sampled.
    pub samples: u32,
}

impl RenderTarget {
    /// A single-sampled RGBA8 target with a depth buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            id: AssetId::generate(),
            version: 0,
            width: width.max(1),
            height: height.max(1),
            format: TextureFormat::Rgba8,
            depth_buffer: true,
            stencil_buffer: false,
            samples: 0,
        }
    }

    /// Sets the MSAA sample count.
    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    /// Unique identity of this target.
    pub fn id(&self) -> AssetId<RenderTarget> {
        self.id
    }

    /// Incremented whenever the GPU side must be rebuilt.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether resolving requires a separate single-sampled framebuffer.
    pub fn is_multisampled(&self) -> bool {
        self.samples > 1
    }

    /// Resizes the target. A no-op when the size is unchanged.
    pub fn set_size(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.version += 1;
        }
    }

    /// Marks the attachments as changed after editing the public fields.
    pub fn bump_version(&mut self) {
        self.version += 1;
    }
}

impl Asset for RenderTarget {
    fn id(&self) -> AssetId<Self> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_size_only_bumps_on_change() {
        let mut target = RenderTarget::new(64, 32);
        target.set_size(64, 32);
        assert_eq!(target.version(), 0);
        target.set_size(128, 32);
        assert_eq!(target.version(), 1);
        assert_eq!((target.width(), target.height()), (128, 32));
    }

    #[test]
    fn test_zero_sizes_are_clamped() {
        let target = RenderTarget::new(0, 0);
        assert_eq!((target.width(), target.height()), (1, 1));
        assert_eq!(target.clone().with_samples(4).id(), target.id());
    }

    #[test]
    fn test_multisampling() {
        assert!(!RenderTarget::new(4, 4).with_samples(1).is_multisampled());
        assert!(RenderTarget::new(4, 4).with_samples(4).is_multisampled());
    }
}
