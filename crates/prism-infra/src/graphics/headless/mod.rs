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

//! An in-memory [`GraphicsDevice`](prism_core::renderer::GraphicsDevice).
//!
//! The headless device behaves like a strict immediate-mode driver without
//! rasterizing anything: it compiles (preprocesses and validates) shader
//! sources, reflects their active uniforms and inputs, enforces a memory
//! budget, simulates context loss, and records every call so callers can
//! inspect exactly what the renderer issued.

mod command;
mod device;
pub mod glsl;

pub use self::command::{Command, DrawRecord};
pub use self::device::{HeadlessConfig, HeadlessDevice};
