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

//! Provides the public, backend-agnostic rendering contracts.
//!
//! This module is the "common language" between the renderer and its backend:
//! the [`GraphicsDevice`] trait, the handle and descriptor types it speaks in,
//! the error taxonomy, and the settings, capabilities and statistics exposed
//! by the renderer. The caching and dispatch logic lives in `prism-lanes` and
//! `prism-agents`; concrete backends live in `prism-infra`.

pub mod api;
pub mod capabilities;
pub mod error;
pub mod settings;
pub mod stats;
pub mod traits;

pub use self::api::*;
pub use self::capabilities::{DeviceCapabilities, RendererCapabilities};
pub use self::error::{DeviceError, RenderError};
pub use self::settings::{
    PowerPreference, Precision, RendererSettings, ShadowMapType, ShadowSettings,
};
pub use self::stats::RenderStats;
pub use self::traits::GraphicsDevice;
