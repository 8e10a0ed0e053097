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

//! Graphics backends.

pub mod headless;

use prism_core::renderer::{GraphicsDevice, RendererSettings};
use std::sync::Arc;

/// Creates the device selected by `settings`, ready to hand to a renderer.
///
/// The power preference picks the adapter profile; the surface size comes
/// from the settings' width and height.
pub fn create_device(settings: &RendererSettings) -> anyhow::Result<Arc<dyn GraphicsDevice>> {
    let device = headless::HeadlessDevice::from_settings(settings);
    log::info!(
        "Created graphics device '{}' ({}x{})",
        device.capabilities().adapter_name,
        settings.width,
        settings.height
    );
    Ok(Arc::new(device))
}
