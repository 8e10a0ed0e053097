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

//! The root container handed to the renderer each frame.

use super::asset::{AssetId, Assets};
use super::geometry::Geometry;
use super::light::Light;
use super::material::Material;
use super::object::SceneObject;
use super::texture::Texture;
use crate::math::Color;

/// Linear distance fog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    /// Fog colour.
    pub color: Color,
    /// Distance where fog starts.
    pub near: f32,
    /// Distance where fog is opaque.
    pub far: f32,
}

/// Objects, lights and the assets they reference.
#[derive(Debug, Default)]
pub struct Scene {
    id: SceneId,
    /// Drawable objects in traversal order.
    pub objects: Vec<SceneObject>,
    /// Lights.
    pub lights: Vec<Light>,
    /// Materials referenced by objects.
    pub materials: Assets<Material>,
    /// Geometries referenced by objects.
    pub geometries: Assets<Geometry>,
    /// Textures referenced by materials.
    pub textures: Assets<Texture>,
    /// Optional fog.
    pub fog: Option<Fog>,
    /// Colour the target is cleared to instead of the renderer's clear colour.
    pub background: Option<Color>,
    /// Material used for every object instead of its own.
    pub override_material: Option<AssetId<Material>>,
}

/// Identity of a [`Scene`], used to pool per-scene render lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(pub u64);

impl Default for SceneId {
    fn default() -> Self {
        SceneId(AssetId::<Scene>::generate().raw())
    }
}

impl Scene {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// The scene's identity.
    pub fn id(&self) -> SceneId {
        self.id
    }

    /// Adds an object and returns its id.
    pub fn add(&mut self, object: SceneObject) -> AssetId<SceneObject> {
        let id = object.id();
        self.objects.push(object);
        id
    }

    /// Adds a light and returns its id.
    pub fn add_light(&mut self, light: Light) -> AssetId<Light> {
        let id = light.id();
        self.lights.push(light);
        id
    }

    /// Returns an object by id.
    pub fn object(&self, id: AssetId<SceneObject>) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id() == id)
    }

    /// Returns an object by id, mutably.
    pub fn object_mut(&mut self, id: AssetId<SceneObject>) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.id() == id)
    }

    /// Removes an object by id.
    pub fn remove(&mut self, id: AssetId<SceneObject>) -> Option<SceneObject> {
        let index = self.objects.iter().position(|o| o.id() == id)?;
        Some(self.objects.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenes_have_distinct_ids() {
        assert_ne!(Scene::new().id(), Scene::new().id());
    }

    #[test]
    fn test_add_and_remove_objects() {
        let mut scene = Scene::new();
        let geometry = scene.geometries.insert(Geometry::plane(1.0, 1.0));
        let material = scene.materials.insert(Material::new(Default::default()));
        let id = scene.add(SceneObject::mesh(geometry, material));
        assert!(scene.object(id).is_some());
        scene.object_mut(id).unwrap().render_order = 3;
        assert_eq!(scene.remove(id).map(|o| o.render_order), Some(3));
        assert!(scene.objects.is_empty());
    }
}
