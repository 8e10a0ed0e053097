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

//! Resource lane: CPU resources mirrored on the GPU.
//!
//! Each cache is keyed by the CPU resource's [`AssetId`](prism_core::scene::AssetId)
//! and remembers the version it last synced. A resource is uploaded only when
//! its version moved. Shared resources are not reference counted: disposing
//! one releases it for every holder.

mod attributes;
mod geometries;
mod render_targets;
mod textures;

pub use self::attributes::{AttributeCache, GpuBuffer};
pub use self::geometries::GeometryCache;
pub use self::render_targets::{GpuRenderTarget, RenderTargetCache};
pub use self::textures::{GpuTexture, TextureCache};
