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

//! Drawable objects placed in a scene.

use super::asset::{Asset, AssetId};
use super::geometry::Geometry;
use super::material::Material;
use crate::math::Mat4;
use crate::renderer::api::PrimitiveMode;

/// A geometry drawn with one or more materials at a resolved world transform.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    id: AssetId<SceneObject>,
    /// Debug name.
    pub name: String,
    /// Object to world transform, already propagated through any hierarchy.
    pub world_matrix: Mat4,
    /// The drawn geometry.
    pub geometry: AssetId<Geometry>,
    /// Materials; with more than one, the geometry's groups select per range.
    pub materials: Vec<AssetId<Material>>,
    /// Primitive assembly.
    pub primitive: PrimitiveMode,
    /// Whether the object is drawn.
    pub visible: bool,
    /// Rendered into shadow maps.
    pub cast_shadow: bool,
    /// Samples shadow maps.
    pub receive_shadow: bool,
    /// Skipped when its bounding sphere is outside the view frustum.
    pub frustum_culled: bool,
    /// Explicit ordering within a render list; lower draws first.
    pub render_order: i32,
    /// Ordering of the group the object belongs to; lower draws first.
    pub group_order: i32,
}

impl SceneObject {
    /// Creates a mesh object drawing `geometry` with a single material.
    pub fn mesh(geometry: AssetId<Geometry>, material: AssetId<Material>) -> Self {
        Self {
            id: AssetId::generate(),
            name: String::new(),
            world_matrix: Mat4::IDENTITY,
            geometry,
            materials: vec![material],
            primitive: PrimitiveMode::Triangles,
            visible: true,
            cast_shadow: false,
            receive_shadow: false,
            frustum_culled: true,
            render_order: 0,
            group_order: 0,
        }
    }

    /// Sets the world transform.
    pub fn with_transform(mut self, world_matrix: Mat4) -> Self {
        self.world_matrix = world_matrix;
        self
    }

    /// The object's identity.
    pub fn id(&self) -> AssetId<SceneObject> {
        self.id
    }

    /// Returns `true` if the transform mirrors the object, which flips the
    /// winding of its faces.
    pub fn is_mirrored(&self) -> bool {
        self.world_matrix.determinant() < 0.0
    }
}

impl Asset for SceneObject {
    fn id(&self) -> AssetId<Self> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    #[test]
    fn test_negative_scale_is_mirrored() {
        let object = SceneObject::mesh(AssetId::generate(), AssetId::generate());
        assert!(!object.is_mirrored());
        let mirrored = object.with_transform(Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0)));
        assert!(mirrored.is_mirrored());
    }
}
