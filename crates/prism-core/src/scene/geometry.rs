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

//! Vertex data: attributes, indices, draw ranges and material groups.

use super::asset::{Asset, AssetId};
use crate::math::BoundingSphere;
use crate::renderer::api::{BufferUsage, ElementType, IndexFormat};
use std::collections::BTreeMap;

/// Typed storage of one attribute.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum AttributeData {
    F32(Vec<f32>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl AttributeData {
    /// Number of scalar components.
    pub fn len(&self) -> usize {
        match self {
            AttributeData::F32(v) => v.len(),
            AttributeData::U8(v) => v.len(),
            AttributeData::U16(v) => v.len(),
            AttributeData::U32(v) => v.len(),
        }
    }

    /// Returns `true` if there is no data.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Component type.
    pub fn element_type(&self) -> ElementType {
        match self {
            AttributeData::F32(_) => ElementType::F32,
            AttributeData::U8(_) => ElementType::U8,
            AttributeData::U16(_) => ElementType::U16,
            AttributeData::U32(_) => ElementType::U32,
        }
    }

    /// Raw bytes, in native endianness.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            AttributeData::F32(v) => bytemuck::cast_slice(v),
            AttributeData::U8(v) => v.as_slice(),
            AttributeData::U16(v) => bytemuck::cast_slice(v),
            AttributeData::U32(v) => bytemuck::cast_slice(v),
        }
    }

    /// Byte length of the data.
    pub fn byte_len(&self) -> u64 {
        self.as_bytes().len() as u64
    }
}

/// A range of components modified since the previous version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateRange {
    /// The attribute version this range was recorded for.
    pub version: u64,
    /// First modified component.
    pub offset: usize,
    /// Number of modified components.
    pub count: usize,
}

/// One named stream of per-vertex (or index) data.
///
/// Cloning an attribute keeps its identity: both copies map to the same GPU
/// buffer, which is how attributes are shared between geometries.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferAttribute {
    id: AssetId<BufferAttribute>,
    version: u64,
    data: AttributeData,
    item_size: u32,
    /// Integer data is normalized to `[0, 1]` when read by shaders.
    pub normalized: bool,
    /// Update frequency hint.
    pub usage: BufferUsage,
    update_range: Option<UpdateRange>,
}

impl BufferAttribute {
    /// Creates an attribute whose vertices each have `item_size` components.
    pub fn new(data: AttributeData, item_size: u32) -> Self {
        Self {
            id: AssetId::generate(),
            version: 0,
            data,
            item_size: item_size.max(1),
            normalized: false,
            usage: BufferUsage::Static,
            update_range: None,
        }
    }

    /// Shorthand for float attributes.
    pub fn from_f32(data: Vec<f32>, item_size: u32) -> Self {
        Self::new(AttributeData::F32(data), item_size)
    }

    /// The attribute's identity.
    pub fn id(&self) -> AssetId<BufferAttribute> {
        self.id
    }

    /// The current version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The attribute's data.
    pub fn data(&self) -> &AttributeData {
        &self.data
    }

    /// Components per vertex.
    pub fn item_size(&self) -> u32 {
        self.item_size
    }

    /// Number of vertices (or indices for an index attribute).
    pub fn count(&self) -> u32 {
        (self.data.len() / self.item_size as usize) as u32
    }

    /// The range modified by the latest [`edit_range`](Self::edit_range), if
    /// it was the most recent mutation.
    pub fn update_range(&self) -> Option<UpdateRange> {
        self.update_range.filter(|range| range.version == self.version)
    }

    /// Replaces the data entirely.
    pub fn set_data(&mut self, data: AttributeData) {
        self.data = data;
        self.version += 1;
    }

    /// Mutates the data in place; the whole attribute is re-uploaded.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut AttributeData) -> R) -> R {
        let result = f(&mut self.data);
        self.version += 1;
        result
    }

    /// Mutates the data and records that only `count` components starting at
    /// `offset` changed, allowing a partial upload.
    pub fn edit_range<R>(
        &mut self,
        offset: usize,
        count: usize,
        f: impl FnOnce(&mut AttributeData) -> R,
    ) -> R {
        let result = f(&mut self.data);
        self.version += 1;
        self.update_range = Some(UpdateRange {
            version: self.version,
            offset,
            count,
        });
        result
    }

    /// Advances the version, forcing a full re-upload.
    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    /// Index format, if the data can be used as an index buffer.
    pub fn index_format(&self) -> Option<IndexFormat> {
        match self.data {
            AttributeData::U16(_) => Some(IndexFormat::U16),
            AttributeData::U32(_) => Some(IndexFormat::U32),
            _ => None,
        }
    }
}

impl Asset for BufferAttribute {
    fn id(&self) -> AssetId<Self> {
        self.id
    }
}

/// A sub-range of a geometry drawn with its own material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryGroup {
    /// First vertex (or index).
    pub start: u32,
    /// Number of vertices (or indices).
    pub count: u32,
    /// Index into the object's material list.
    pub material_index: usize,
}

/// The portion of a geometry drawn by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DrawRange {
    /// First vertex (or index).
    pub start: u32,
    /// Number of vertices (or indices); `None` draws to the end.
    pub count: Option<u32>,
}

/// A set of named vertex attributes with an optional index.
#[derive(Debug, Clone)]
pub struct Geometry {
    id: AssetId<Geometry>,
    version: u64,
    attributes: BTreeMap<String, BufferAttribute>,
    index: Option<BufferAttribute>,
    groups: Vec<GeometryGroup>,
    /// The range drawn when the object has a single material.
    pub draw_range: DrawRange,
    bounding_sphere: BoundingSphere,
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new()
    }
}

impl Geometry {
    /// Creates an empty geometry.
    pub fn new() -> Self {
        Self {
            id: AssetId::generate(),
            version: 0,
            attributes: BTreeMap::new(),
            index: None,
            groups: Vec::new(),
            draw_range: DrawRange::default(),
            bounding_sphere: BoundingSphere::EMPTY,
        }
    }

    /// The geometry's identity.
    pub fn id(&self) -> AssetId<Geometry> {
        self.id
    }

    /// Structural version: advances when attributes or the index are added,
    /// replaced or removed. Data changes are tracked per attribute.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Adds or replaces an attribute. Returns the previous one, if any.
    pub fn set_attribute(
        &mut self,
        name: impl Into<String>,
        attribute: BufferAttribute,
    ) -> Option<BufferAttribute> {
        let name = name.into();
        let is_position = name == "position";
        let previous = self.attributes.insert(name, attribute);
        self.version += 1;
        if is_position {
            self.compute_bounding_sphere();
        }
        previous
    }

    /// Removes an attribute.
    pub fn remove_attribute(&mut self, name: &str) -> Option<BufferAttribute> {
        let removed = self.attributes.remove(name);
        if removed.is_some() {
            self.version += 1;
        }
        removed
    }

    /// Returns an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&BufferAttribute> {
        self.attributes.get(name)
    }

    /// Returns an attribute mutably; edits advance the attribute's own version.
    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut BufferAttribute> {
        self.attributes.get_mut(name)
    }

    /// Iterates over the attributes in name order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &BufferAttribute)> {
        self.attributes.iter().map(|(name, attr)| (name.as_str(), attr))
    }

    /// Sets the index attribute.
    pub fn set_index(&mut self, index: Option<BufferAttribute>) {
        self.index = index;
        self.version += 1;
    }

    /// The index attribute.
    pub fn index(&self) -> Option<&BufferAttribute> {
        self.index.as_ref()
    }

    /// The index attribute, mutably.
    pub fn index_mut(&mut self) -> Option<&mut BufferAttribute> {
        self.index.as_mut()
    }

    /// Adds a material group.
    pub fn add_group(&mut self, start: u32, count: u32, material_index: usize) {
        self.groups.push(GeometryGroup {
            start,
            count,
            material_index,
        });
    }

    /// Removes every material group.
    pub fn clear_groups(&mut self) {
        self.groups.clear();
    }

    /// The material groups.
    pub fn groups(&self) -> &[GeometryGroup] {
        &self.groups
    }

    /// The bounding sphere computed from the `position` attribute.
    pub fn bounding_sphere(&self) -> &BoundingSphere {
        &self.bounding_sphere
    }

    /// Recomputes the bounding sphere from the `position` attribute.
    pub fn compute_bounding_sphere(&mut self) {
        self.bounding_sphere = match self.attributes.get("position").map(|a| a.data()) {
            Some(AttributeData::F32(positions)) => BoundingSphere::from_positions(positions),
            _ => BoundingSphere::EMPTY,
        };
    }

    /// Number of vertices (or indices) addressed by draws.
    pub fn element_count(&self) -> u32 {
        match (&self.index, self.attributes.get("position")) {
            (Some(index), _) => index.count(),
            (None, Some(position)) => position.count(),
            (None, None) => 0,
        }
    }

    /// A `width x height` quad in the XY plane, facing +Z.
    pub fn plane(width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        let mut geometry = Self::new();
        geometry.set_attribute(
            "position",
            BufferAttribute::from_f32(
                vec![-hw, -hh, 0.0, hw, -hh, 0.0, hw, hh, 0.0, -hw, hh, 0.0],
                3,
            ),
        );
        geometry.set_attribute("normal", BufferAttribute::from_f32([0.0, 0.0, 1.0].repeat(4), 3));
        geometry.set_attribute(
            "uv",
            BufferAttribute::from_f32(vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0], 2),
        );
        let index = AttributeData::U16(vec![0, 1, 2, 0, 2, 3]);
        geometry.set_index(Some(BufferAttribute::new(index, 1)));
        geometry
    }

    /// An axis-aligned box centred on the origin, with one group per face
    /// pair (`+x/-x`, `+y/-y`, `+z/-z`).
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let half = [width * 0.5, height * 0.5, depth * 0.5];
        let mut positions = Vec::with_capacity(72);
        let mut normals = Vec::with_capacity(72);
        let mut uvs = Vec::with_capacity(48);
        let mut indices = Vec::with_capacity(36);
        let mut geometry = Self::new();

        // (normal axis, u axis, v axis)
        let faces = [(0usize, 1usize, 2usize), (1, 2, 0), (2, 0, 1)];
        for (pair, &(n, u, v)) in faces.iter().enumerate() {
            for sign in [1.0f32, -1.0] {
                let base = (positions.len() / 3) as u16;
                for (su, sv) in [(-1.0f32, -1.0f32), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                    let mut p = [0.0f32; 3];
                    p[n] = half[n] * sign;
                    p[u] = half[u] * su * sign;
                    p[v] = half[v] * sv;
                    positions.extend_from_slice(&p);
                    let mut normal = [0.0f32; 3];
                    normal[n] = sign;
                    normals.extend_from_slice(&normal);
                    uvs.extend_from_slice(&[(su + 1.0) * 0.5, (sv + 1.0) * 0.5]);
                }
                indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
            }
            geometry.add_group(pair as u32 * 12, 12, pair);
        }

        geometry.set_attribute("position", BufferAttribute::from_f32(positions, 3));
        geometry.set_attribute("normal", BufferAttribute::from_f32(normals, 3));
        geometry.set_attribute("uv", BufferAttribute::from_f32(uvs, 2));
        geometry.set_index(Some(BufferAttribute::new(AttributeData::U16(indices), 1)));
        geometry
    }
}

impl Asset for Geometry {
    fn id(&self) -> AssetId<Self> {
        self.id
    }
}
