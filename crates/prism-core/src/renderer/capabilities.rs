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

//! Device limits and the renderer's resolved feature set.

use super::settings::{Precision, RendererSettings};
use log::warn;

/// Limits and optional features reported by a [`GraphicsDevice`](super::GraphicsDevice).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// Human readable adapter name.
    pub adapter_name: String,
    /// Number of texture units available to a fragment shader.
    pub max_texture_units: u32,
    /// Number of vertex attribute slots.
    pub max_vertex_attributes: u32,
    /// Largest texture dimension.
    pub max_texture_size: u32,
    /// Largest sample count for multi-sampled targets (0 = none).
    pub max_samples: u32,
    /// Largest anisotropic filtering level (1 = unsupported).
    pub max_anisotropy: u8,
    /// Best float precision in fragment shaders.
    pub max_precision: Precision,
    /// Float colour textures can be rendered to and sampled.
    pub float_textures: bool,
    /// Fragment shaders may write depth.
    pub fragment_depth: bool,
    /// Mipmaps can be generated for non power-of-two textures.
    pub npot_mipmaps: bool,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            adapter_name: "unknown".to_string(),
            max_texture_units: 16,
            max_vertex_attributes: 16,
            max_texture_size: 4096,
            max_samples: 4,
            max_anisotropy: 16,
            max_precision: Precision::High,
            float_textures: true,
            fragment_depth: true,
            npot_mipmaps: true,
        }
    }
}

/// The feature set a renderer actually uses, after reconciling its
/// [`RendererSettings`] with what the device supports.
///
/// Every requested feature the device lacks degrades here, once, with a
/// warning. Shader generation and caching only ever see the resolved values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererCapabilities {
    /// Shader precision.
    pub precision: Precision,
    /// Logarithmic depth buffer enabled.
    pub logarithmic_depth_buffer: bool,
    /// Sample count of the internal multi-sampled target (0 = none).
    pub samples: u32,
    /// Largest MSAA sample count the device accepts for render targets.
    pub max_samples: u32,
    /// Texture units available per draw.
    pub max_texture_units: u32,
    /// Vertex attribute slots.
    pub max_vertex_attributes: u32,
    /// Largest texture dimension.
    pub max_texture_size: u32,
    /// Largest anisotropy level.
    pub max_anisotropy: u8,
    /// Float textures available (VSM shadow maps).
    pub float_textures: bool,
    /// Mipmaps for non power-of-two textures.
    pub npot_mipmaps: bool,
}

impl RendererCapabilities {
    /// Sample count requested when `antialias` is on.
    pub const ANTIALIAS_SAMPLES: u32 = 4;

    /// Resolves the settings against the device limits.
    pub fn resolve(device: &DeviceCapabilities, settings: &RendererSettings) -> Self {
        let precision = if settings.precision > device.max_precision {
            warn!(
                "{} precision is not supported by '{}'; using {} instead.",
                settings.precision.qualifier(),
                device.adapter_name,
                device.max_precision.qualifier()
            );
            device.max_precision
        } else {
            settings.precision
        };

        let logarithmic_depth_buffer = if settings.logarithmic_depth_buffer
            && !device.fragment_depth
        {
            warn!(
                "Logarithmic depth buffer needs fragment depth writes, which '{}' lacks; disabled.",
                device.adapter_name
            );
            false
        } else {
            settings.logarithmic_depth_buffer
        };

        let samples = if settings.antialias {
            if device.max_samples == 0 {
                warn!(
                    "Antialiasing requested but '{}' has no multi-sample support; disabled.",
                    device.adapter_name
                );
                0
            } else {
                Self::ANTIALIAS_SAMPLES.min(device.max_samples)
            }
        } else {
            0
        };

        Self {
            precision,
            logarithmic_depth_buffer,
            samples,
            max_samples: device.max_samples,
            max_texture_units: device.max_texture_units,
            max_vertex_attributes: device.max_vertex_attributes,
            max_texture_size: device.max_texture_size,
            max_anisotropy: device.max_anisotropy,
            float_textures: device.float_textures,
            npot_mipmaps: device.npot_mipmaps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_keeps_supported_settings() {
        let settings = RendererSettings {
            antialias: true,
            logarithmic_depth_buffer: true,
            ..RendererSettings::default()
        };
        let caps = RendererCapabilities::resolve(&DeviceCapabilities::default(), &settings);
        assert_eq!(caps.precision, Precision::High);
        assert!(caps.logarithmic_depth_buffer);
        assert_eq!(caps.samples, 4);
    }

    #[test]
    fn test_resolve_degrades_unsupported_features() {
        let device = DeviceCapabilities {
            max_precision: Precision::Medium,
            fragment_depth: false,
            max_samples: 0,
            ..DeviceCapabilities::default()
        };
        let settings = RendererSettings {
            antialias: true,
            logarithmic_depth_buffer: true,
            ..RendererSettings::default()
        };
        let caps = RendererCapabilities::resolve(&device, &settings);
        assert_eq!(caps.precision, Precision::Medium);
        assert!(!caps.logarithmic_depth_buffer);
        assert_eq!(caps.samples, 0);
    }

    #[test]
    fn test_samples_clamped_to_device_maximum() {
        let device = DeviceCapabilities {
            max_samples: 2,
            ..DeviceCapabilities::default()
        };
        let settings = RendererSettings {
            antialias: true,
            ..RendererSettings::default()
        };
        assert_eq!(RendererCapabilities::resolve(&device, &settings).samples, 2);
    }
}
