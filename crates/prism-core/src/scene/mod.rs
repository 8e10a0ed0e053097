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

//! The CPU-side scene model consumed by the renderer each frame.
//!
//! Every asset owned by a [`Scene`] carries a typed [`AssetId`] and, where it
//! can be uploaded, a version counter. Mutation goes through explicit APIs
//! (`edit`, `bump_version`, dedicated setters) that advance the version, so
//! the renderer's caches can decide between reuse and re-upload by comparing
//! integers.

pub mod asset;
pub mod camera;
pub mod geometry;
pub mod light;
pub mod material;
pub mod object;
pub mod render_target;
#[allow(clippy::module_inception)]
pub mod scene;
pub mod texture;

pub use self::asset::{Asset, AssetId, Assets};
pub use self::camera::Camera;
pub use self::geometry::{
    AttributeData, BufferAttribute, DrawRange, Geometry, GeometryGroup, UpdateRange,
};
pub use self::light::{Light, LightShadow, LightType};
pub use self::material::{
    DepthPacking, Material, MaterialKind, MaterialProperties, ShaderSource, Side,
};
pub use self::object::SceneObject;
pub use self::render_target::RenderTarget;
pub use self::scene::{Fog, Scene, SceneId};
pub use self::texture::{Texture, TextureImage};
