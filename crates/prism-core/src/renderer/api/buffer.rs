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

//! Buffer descriptors and vertex layouts.

/// The binding point a buffer is created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Per-vertex attribute data.
    Vertex,
    /// Element indices.
    Index,
}

/// A hint describing how often a buffer's contents change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferUsage {
    /// Written once, drawn many times.
    #[default]
    Static,
    /// Rewritten occasionally.
    Dynamic,
    /// Rewritten every frame.
    Stream,
}

/// Describes a buffer to be created by
/// [`GraphicsDevice::create_buffer`](crate::renderer::GraphicsDevice::create_buffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDescriptor<'a> {
    /// Debug label.
    pub label: Option<&'a str>,
    /// Binding point.
    pub target: BufferTarget,
    /// Update frequency hint.
    pub usage: BufferUsage,
    /// Size in bytes.
    pub size: u64,
}

/// The scalar type of one vertex or index component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// 32-bit float.
    F32,
    /// Unsigned byte.
    U8,
    /// Unsigned 16-bit integer.
    U16,
    /// Unsigned 32-bit integer.
    U32,
}

impl ElementType {
    /// Size of one component in bytes.
    pub const fn size(self) -> u64 {
        match self {
            ElementType::U8 => 1,
            ElementType::U16 => 2,
            ElementType::F32 | ElementType::U32 => 4,
        }
    }
}

/// The integer type of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    /// 16-bit indices.
    U16,
    /// 32-bit indices.
    U32,
}

/// How a bound buffer feeds one vertex attribute slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttributeLayout {
    /// Components per vertex (1 to 4).
    pub components: u32,
    /// Component type.
    pub element_type: ElementType,
    /// Whether integer data is normalized to `[0, 1]`.
    pub normalized: bool,
    /// Byte distance between consecutive vertices (0 = tightly packed).
    pub stride: u32,
    /// Byte offset of the first component.
    pub offset: u64,
}
