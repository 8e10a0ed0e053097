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

//! Acts as the orchestrator of the rendering subsystem.
//!
//! The [`Renderer`] owns one instance of every lane and runs them in a fixed
//! order each frame:
//!
//! 1. Build the view frustum of the camera.
//! 2. Project the scene: cull objects, push one render item per material slot
//!    and upload changed geometry.
//! 3. Render a shadow map for every visible shadow-casting light, blurring it
//!    when variance shadow maps are configured.
//! 4. Draw the opaque list, then 5. the transparent list.
//! 6. Resolve multi-sampled output.
//!
//! Per item the renderer resolves the material's program, applies the state
//! diff, binds buffers and textures, uploads changed uniforms and draws. A
//! failure that concerns a single item (compile error, upload error) skips
//! that item only. A lost context invalidates every cache and fails the
//! frame with [`RenderError::ContextLost`](prism_core::renderer::RenderError).

mod draw_context;
mod materials;
mod renderer;
mod shadow_pass;

pub use self::renderer::Renderer;
