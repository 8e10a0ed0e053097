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

//! # Prism Lanes
//!
//! The hot path of the renderer. Each lane owns one cache or one per-frame
//! pipeline and talks to the GPU only through
//! [`GraphicsDevice`](prism_core::renderer::GraphicsDevice):
//!
//! - [`program_lane`]: program keys, source generation, compile cache.
//! - [`state_lane`]: fixed-function state diffing.
//! - [`resource_lane`]: version-driven buffer, texture and render-target caches.
//! - [`uniform_lane`]: light setup, uniform diffing, texture units.
//! - [`render_list_lane`]: per-frame render item arena and sorting.
//! - [`shadow_lane`]: light-space cameras for shadow maps.
//!
//! Lanes hold no global state. The orchestrating renderer in `prism-agents`
//! owns one instance of each.

#![warn(missing_docs)]

pub mod program_lane;
pub mod render_list_lane;
pub mod resource_lane;
pub mod shadow_lane;
pub mod state_lane;
pub mod uniform_lane;
