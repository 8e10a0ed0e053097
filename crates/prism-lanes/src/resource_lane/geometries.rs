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

//! Per-geometry bookkeeping on top of the [`AttributeCache`].

use super::attributes::AttributeCache;
use crate::program_lane::ProgramEntry;
use ahash::AHashMap;
use prism_core::renderer::{
    BufferTarget, GraphicsDevice, ProgramId, RenderError, VertexAttributeLayout,
};
use prism_core::scene::{AssetId, BufferAttribute, Geometry};

#[derive(Debug, Default)]
struct GeometryRecord {
    frame: Option<u64>,
    version: u64,
    // Every attribute this geometry ever referenced, so that disposal also
    // frees buffers of attributes that were replaced since.
    attributes: Vec<AssetId<BufferAttribute>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VertexBinding {
    geometry: AssetId<Geometry>,
    program: ProgramId,
    version: u64,
    generation: u64,
}

/// Tracks which geometries were synced this frame and the vertex binding
/// currently set on the device.
#[derive(Debug, Default)]
pub struct GeometryCache {
    records: AHashMap<AssetId<Geometry>, GeometryRecord>,
    binding: Option<VertexBinding>,
}

impl GeometryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads every attribute and the index of `geometry`, at most once per
    /// `frame`.
    pub fn update(
        &mut self,
        device: &dyn GraphicsDevice,
        attributes: &mut AttributeCache,
        geometry: &Geometry,
        frame: u64,
    ) -> Result<(), RenderError> {
        let record = self.records.entry(geometry.id()).or_default();
        if record.frame == Some(frame) {
            return Ok(());
        }

        for (_, attribute) in geometry.attributes() {
            attributes.update(device, attribute, BufferTarget::Vertex)?;
            if !record.attributes.contains(&attribute.id()) {
                record.attributes.push(attribute.id());
            }
        }
        if let Some(index) = geometry.index() {
            attributes.update(device, index, BufferTarget::Index)?;
            if !record.attributes.contains(&index.id()) {
                record.attributes.push(index.id());
            }
        }
        if record.version != geometry.version() {
            log::debug!("{:?} changed structure (version {})", geometry.id(), geometry.version());
            record.version = geometry.version();
        }
        record.frame = Some(frame);
        Ok(())
    }

    /// Feeds the program's vertex inputs from `geometry` and binds its index
    /// buffer. Inputs the geometry lacks are disabled.
    ///
    /// Returns `false` without touching the device when the same geometry is
    /// already bound for the same program and nothing was re-allocated.
    pub fn bind(
        &mut self,
        device: &dyn GraphicsDevice,
        attributes: &AttributeCache,
        geometry: &Geometry,
        program: &ProgramEntry,
    ) -> bool {
        let binding = VertexBinding {
            geometry: geometry.id(),
            program: program.id(),
            version: geometry.version(),
            generation: attributes.generation(),
        };
        if self.binding == Some(binding) {
            return false;
        }

        for input in program.attributes() {
            let buffer = geometry
                .attribute(&input.name)
                .and_then(|attribute| attributes.get(attribute.id()));
            match buffer {
                Some(buffer) => device.set_vertex_attribute(
                    input.location,
                    buffer.id,
                    &VertexAttributeLayout {
                        components: buffer.item_size.min(4),
                        element_type: buffer.element_type,
                        normalized: buffer.normalized,
                        stride: 0,
                        offset: 0,
                    },
                ),
                None => device.disable_vertex_attribute(input.location),
            }
        }
        let index = geometry
            .index()
            .and_then(|index| attributes.get(index.id()))
            .map(|buffer| buffer.id);
        device.bind_index_buffer(index);

        self.binding = Some(binding);
        true
    }

    /// Forgets the current vertex binding so the next [`bind`](Self::bind)
    /// re-issues it.
    pub fn reset_binding(&mut self) {
        self.binding = None;
    }

    /// Releases every buffer the geometry referenced.
    pub fn dispose(
        &mut self,
        device: &dyn GraphicsDevice,
        attributes: &mut AttributeCache,
        id: AssetId<Geometry>,
    ) -> bool {
        let Some(record) = self.records.remove(&id) else {
            return false;
        };
        for attribute in record.attributes {
            attributes.remove(device, attribute);
        }
        if self.binding.is_some_and(|binding| binding.geometry == id) {
            self.binding = None;
        }
        true
    }

    /// Number of geometries seen.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no geometry was seen.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Forgets everything without device calls (context loss).
    pub fn clear(&mut self) {
        self.records.clear();
        self.binding = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program_lane::{ProgramCache, ProgramEnvironment, ProgramHandle, ProgramParameters};
    use prism_core::renderer::{RendererCapabilities, RendererSettings};
    use prism_core::scene::{Material, MaterialKind};
    use prism_infra::graphics::headless::{Command, HeadlessDevice};

    fn program(
        device: &HeadlessDevice,
        cache: &mut ProgramCache,
        kind: MaterialKind,
    ) -> ProgramHandle {
        let caps =
            RendererCapabilities::resolve(&device.capabilities(), &RendererSettings::default());
        let material = Material::new(kind);
        let params = ProgramParameters::new(&material, &ProgramEnvironment::default(), &caps);
        cache.acquire(device, &params).unwrap()
    }

    #[test]
    fn test_update_runs_once_per_frame() {
        let device = HeadlessDevice::new();
        let mut attributes = AttributeCache::new();
        let mut geometries = GeometryCache::new();
        let geometry = Geometry::cuboid(1.0, 1.0, 1.0);

        geometries.update(&device, &mut attributes, &geometry, 1).unwrap();
        let created = device.count_commands(|c| matches!(c, Command::CreateBuffer { .. }));
        let buffers = geometry.attributes().count() + usize::from(geometry.index().is_some());
        assert_eq!(created, buffers);

        device.clear_log();
        geometries.update(&device, &mut attributes, &geometry, 1).unwrap();
        geometries.update(&device, &mut attributes, &geometry, 2).unwrap();
        assert!(device.commands().is_empty());
    }

    #[test]
    fn test_bind_skips_identical_binding() {
        let device = HeadlessDevice::new();
        let mut programs = ProgramCache::new();
        let mut attributes = AttributeCache::new();
        let mut geometries = GeometryCache::new();
        let basic = program(&device, &mut programs, MaterialKind::Basic);
        let geometry = Geometry::cuboid(1.0, 1.0, 1.0);
        geometries.update(&device, &mut attributes, &geometry, 1).unwrap();

        let entry = programs.get(basic).unwrap();
        assert!(geometries.bind(&device, &attributes, &geometry, entry));
        device.clear_log();
        assert!(!geometries.bind(&device, &attributes, &geometry, entry));
        assert!(device.commands().is_empty());
    }

    #[test]
    fn test_missing_inputs_are_disabled() {
        let device = HeadlessDevice::new();
        let mut programs = ProgramCache::new();
        let mut attributes = AttributeCache::new();
        let mut geometries = GeometryCache::new();
        let basic = program(&device, &mut programs, MaterialKind::Basic);
        let mut geometry = Geometry::new();
        geometry.set_attribute("position", BufferAttribute::from_f32(vec![0.0; 9], 3));
        geometries.update(&device, &mut attributes, &geometry, 1).unwrap();

        let entry = programs.get(basic).unwrap();
        device.clear_log();
        geometries.bind(&device, &attributes, &geometry, entry);
        let enabled = device.count_commands(|c| matches!(c, Command::SetVertexAttribute { .. }));
        let disabled = device.count_commands(|c| matches!(c, Command::DisableVertexAttribute(_)));
        assert_eq!(enabled, 1);
        assert_eq!(enabled + disabled, entry.attributes().len());
        assert!(device.commands().contains(&Command::BindIndexBuffer(None)));
    }

    #[test]
    fn test_dispose_releases_replaced_attributes() {
        let device = HeadlessDevice::new();
        let mut attributes = AttributeCache::new();
        let mut geometries = GeometryCache::new();
        let mut geometry = Geometry::new();
        geometry.set_attribute("position", BufferAttribute::from_f32(vec![0.0; 9], 3));
        geometries.update(&device, &mut attributes, &geometry, 1).unwrap();
        geometry.set_attribute("position", BufferAttribute::from_f32(vec![1.0; 9], 3));
        geometries.update(&device, &mut attributes, &geometry, 2).unwrap();
        assert_eq!(device.live_buffers(), 2);

        assert!(geometries.dispose(&device, &mut attributes, geometry.id()));
        assert_eq!(device.live_buffers(), 0);
        assert!(!geometries.dispose(&device, &mut attributes, geometry.id()));
    }
}
