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

//! # Prism Agents
//!
//! The orchestration layer. [`render_agent::Renderer`] owns one instance of
//! every lane from `prism-lanes` and drives them through a frame: projecting
//! the scene into render lists, rendering shadow maps, dispatching draws and
//! resolving multi-sampled output. [`animation_loop::AnimationLoop`] hooks a
//! per-frame callback into whatever scheduler the host provides.

#![warn(missing_docs)]

pub mod animation_loop;
pub mod render_agent;
