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

//! Vertex and index buffers.

use ahash::AHashMap;
use prism_core::renderer::{
    BufferDescriptor, BufferId, BufferTarget, ElementType, GraphicsDevice, RenderError,
};
use prism_core::scene::{AssetId, BufferAttribute};

/// The GPU side of one [`BufferAttribute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuBuffer {
    /// Device buffer.
    pub id: BufferId,
    /// Attribute version last uploaded.
    pub version: u64,
    /// Allocated size in bytes.
    pub byte_len: u64,
    /// Element type of the uploaded data.
    pub element_type: ElementType,
    /// Components per vertex.
    pub item_size: u32,
    /// Whether integer data is normalized when read.
    pub normalized: bool,
    /// Vertex or index data.
    pub target: BufferTarget,
}

/// Buffers keyed by attribute identity.
#[derive(Debug, Default)]
pub struct AttributeCache {
    buffers: AHashMap<AssetId<BufferAttribute>, GpuBuffer>,
    generation: u64,
}

impl AttributeCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Brings the buffer for `attribute` up to date.
    ///
    /// - first use: create and upload everything;
    /// - same version: nothing;
    /// - grown beyond the allocation: recreate and upload everything;
    /// - one version ahead with a pending update range: upload the range;
    /// - otherwise: upload everything into the existing buffer.
    pub fn update(
        &mut self,
        device: &dyn GraphicsDevice,
        attribute: &BufferAttribute,
        target: BufferTarget,
    ) -> Result<GpuBuffer, RenderError> {
        let id = attribute.id();
        let bytes = attribute.data().as_bytes();
        let byte_len = bytes.len() as u64;
        let label = || format!("attribute {id:?}");

        let cached = match self.buffers.get(&id).copied() {
            Some(buffer) if buffer.version == attribute.version() => return Ok(buffer),
            Some(buffer) if byte_len > buffer.byte_len => {
                log::debug!("{id:?} grew to {byte_len} bytes, recreating its buffer");
                device.destroy_buffer(buffer.id);
                self.buffers.remove(&id);
                None
            }
            cached => cached,
        };

        let buffer = match cached {
            Some(mut buffer) => {
                let range = attribute
                    .update_range()
                    .filter(|_| buffer.version + 1 == attribute.version());
                match range {
                    Some(range) => {
                        let element = attribute.data().element_type().size() as usize;
                        let start = (range.offset * element).min(bytes.len());
                        let end = ((range.offset + range.count) * element).min(bytes.len());
                        device
                            .write_buffer(buffer.id, start as u64, &bytes[start..end])
                            .map_err(|e| RenderError::upload(label(), e))?;
                    }
                    None => device
                        .write_buffer(buffer.id, 0, bytes)
                        .map_err(|e| RenderError::upload(label(), e))?,
                }
                buffer.version = attribute.version();
                buffer.element_type = attribute.data().element_type();
                buffer.item_size = attribute.item_size();
                buffer.normalized = attribute.normalized;
                buffer
            }
            None => {
                let buffer_id = device
                    .create_buffer(&BufferDescriptor {
                        label: None,
                        target,
                        usage: attribute.usage,
                        size: byte_len,
                    })
                    .map_err(|e| RenderError::upload(label(), e))?;
                if let Err(e) = device.write_buffer(buffer_id, 0, bytes) {
                    device.destroy_buffer(buffer_id);
                    return Err(RenderError::upload(label(), e));
                }
                self.generation += 1;
                GpuBuffer {
                    id: buffer_id,
                    version: attribute.version(),
                    byte_len,
                    element_type: attribute.data().element_type(),
                    item_size: attribute.item_size(),
                    normalized: attribute.normalized,
                    target,
                }
            }
        };
        self.buffers.insert(id, buffer);
        Ok(buffer)
    }

    /// The buffer mirroring `id`, if uploaded.
    pub fn get(&self, id: AssetId<BufferAttribute>) -> Option<&GpuBuffer> {
        self.buffers.get(&id)
    }

    /// Releases the buffer of `id` immediately.
    pub fn remove(&mut self, device: &dyn GraphicsDevice, id: AssetId<BufferAttribute>) -> bool {
        match self.buffers.remove(&id) {
            Some(buffer) => {
                device.destroy_buffer(buffer.id);
                self.generation += 1;
                true
            }
            None => false,
        }
    }

    /// Incremented whenever a buffer handle is created or released, so that
    /// cached vertex bindings can tell they went stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of live buffers.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Whether no buffer is live.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Forgets every buffer without device calls (context loss).
    pub fn clear(&mut self) {
        self.buffers.clear();
        self.generation += 1;
    }

    /// Releases every buffer.
    pub fn dispose(&mut self, device: &dyn GraphicsDevice) {
        for buffer in self.buffers.values() {
            device.destroy_buffer(buffer.id);
        }
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::renderer::DeviceError;
    use prism_core::scene::AttributeData;
    use prism_infra::graphics::headless::{Command, HeadlessConfig, HeadlessDevice};

    fn uploads(device: &HeadlessDevice) -> Vec<Command> {
        device.commands().into_iter().filter(Command::is_upload).collect()
    }

    #[test]
    fn test_unchanged_version_uploads_nothing() {
        let device = HeadlessDevice::new();
        let mut cache = AttributeCache::new();
        let attribute = BufferAttribute::from_f32(vec![0.0; 9], 3);

        cache.update(&device, &attribute, BufferTarget::Vertex).unwrap();
        device.clear_log();
        cache.update(&device, &attribute, BufferTarget::Vertex).unwrap();
        assert!(device.commands().is_empty());
    }

    #[test]
    fn test_update_range_uploads_sub_range() {
        let device = HeadlessDevice::new();
        let mut cache = AttributeCache::new();
        let mut attribute = BufferAttribute::from_f32(vec![0.0; 9], 3);
        let gpu = cache.update(&device, &attribute, BufferTarget::Vertex).unwrap();

        attribute.edit_range(3, 3, |data| {
            if let AttributeData::F32(v) = data {
                v[3..6].copy_from_slice(&[1.0, 2.0, 3.0]);
            }
        });
        device.clear_log();
        cache.update(&device, &attribute, BufferTarget::Vertex).unwrap();
        assert_eq!(
            uploads(&device),
            vec![Command::WriteBuffer {
                id: gpu.id,
                offset: 12,
                len: 12
            }]
        );
        let data = device.buffer_data(gpu.id).unwrap();
        assert_eq!(&data[12..16], &1.0f32.to_ne_bytes());
    }

    #[test]
    fn test_stale_range_falls_back_to_full_upload() {
        let device = HeadlessDevice::new();
        let mut cache = AttributeCache::new();
        let mut attribute = BufferAttribute::from_f32(vec![0.0; 9], 3);
        cache.update(&device, &attribute, BufferTarget::Vertex).unwrap();

        attribute.edit_range(0, 3, |_| ());
        attribute.bump_version();
        device.clear_log();
        cache.update(&device, &attribute, BufferTarget::Vertex).unwrap();
        assert!(matches!(
            uploads(&device).as_slice(),
            [Command::WriteBuffer { offset: 0, len: 36, .. }]
        ));
    }

    #[test]
    fn test_growth_recreates_buffer() {
        let device = HeadlessDevice::new();
        let mut cache = AttributeCache::new();
        let mut attribute = BufferAttribute::from_f32(vec![0.0; 3], 3);
        let first = cache.update(&device, &attribute, BufferTarget::Vertex).unwrap();
        let generation = cache.generation();

        attribute.set_data(AttributeData::F32(vec![0.0; 6]));
        let second = cache.update(&device, &attribute, BufferTarget::Vertex).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(second.byte_len, 24);
        assert!(cache.generation() > generation);
        assert_eq!(device.live_buffers(), 1);
    }

    #[test]
    fn test_upload_failure_is_reported() {
        let device = HeadlessDevice::with_config(HeadlessConfig {
            memory_budget: 8,
            ..HeadlessConfig::default()
        });
        let mut cache = AttributeCache::new();
        let attribute = BufferAttribute::from_f32(vec![0.0; 9], 3);
        let err = cache.update(&device, &attribute, BufferTarget::Vertex).unwrap_err();
        assert!(matches!(
            err,
            RenderError::ResourceUpload {
                source: DeviceError::OutOfMemory { .. },
                ..
            }
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remove_and_dispose() {
        let device = HeadlessDevice::new();
        let mut cache = AttributeCache::new();
        let a = BufferAttribute::from_f32(vec![0.0; 3], 3);
        let b = BufferAttribute::from_f32(vec![0.0; 3], 3);
        cache.update(&device, &a, BufferTarget::Vertex).unwrap();
        cache.update(&device, &b, BufferTarget::Vertex).unwrap();

        assert!(cache.remove(&device, a.id()));
        assert!(!cache.remove(&device, a.id()));
        assert_eq!(device.live_buffers(), 1);
        cache.dispose(&device);
        assert_eq!(device.live_buffers(), 0);
        assert!(cache.is_empty());
    }
}
