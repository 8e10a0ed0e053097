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

//! Construction-time renderer configuration.

use crate::math::Color;
use anyhow::Context;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Floating-point precision requested for generated shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    /// `lowp`
    Low,
    /// `mediump`
    Medium,
    /// `highp`
    #[default]
    High,
}

impl Precision {
    /// The shading-language qualifier for this precision.
    pub const fn qualifier(self) -> &'static str {
        match self {
            Precision::Low => "lowp",
            Precision::Medium => "mediump",
            Precision::High => "highp",
        }
    }
}

/// Adapter selection hint forwarded to the graphics backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerPreference {
    /// Let the backend decide.
    #[default]
    Default,
    /// Prefer an integrated, power-efficient adapter.
    LowPower,
    /// Prefer a discrete, high-performance adapter.
    HighPerformance,
}

/// Filtering technique used when sampling shadow maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadowMapType {
    /// Single depth comparison, hard edges.
    Basic,
    /// Percentage-closer filtering.
    #[default]
    Pcf,
    /// Percentage-closer filtering with bilinear-weighted taps.
    PcfSoft,
    /// Variance shadow maps, blurred after rendering.
    Vsm,
}

/// Shadow map configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    /// Whether shadow passes run at all.
    pub enabled: bool,
    /// Filtering technique.
    pub kind: ShadowMapType,
    /// Re-render shadow maps every frame. When `false`, maps are only
    /// rendered after [`needs_update`](Self::needs_update) is set.
    pub auto_update: bool,
    /// Request a single shadow re-render while `auto_update` is off.
    pub needs_update: bool,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: ShadowMapType::default(),
            auto_update: true,
            needs_update: false,
        }
    }
}

/// Options recognized when a renderer is constructed.
///
/// Every field has a default, so a settings file only needs the values it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Render into a multi-sampled target resolved at the end of the frame.
    pub antialias: bool,
    /// The default target has an alpha channel (clears to transparent).
    pub alpha: bool,
    /// The default target has a depth buffer.
    pub depth: bool,
    /// The default target has a stencil buffer.
    pub stencil: bool,
    /// Requested shader precision.
    pub precision: Precision,
    /// Adapter selection hint.
    pub power_preference: PowerPreference,
    /// Use a logarithmic depth buffer for large depth ranges.
    pub logarithmic_depth_buffer: bool,
    /// Output colours are premultiplied by alpha.
    pub premultiplied_alpha: bool,
    /// Sort render lists every frame.
    pub sort_objects: bool,
    /// Clear the target before each render.
    pub auto_clear: bool,
    /// Colour used for clears.
    pub clear_color: Color,
    /// Drawing surface width in pixels.
    pub width: u32,
    /// Drawing surface height in pixels.
    pub height: u32,
    /// Shadow map configuration.
    pub shadow_map: ShadowSettings,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            antialias: false,
            alpha: false,
            depth: true,
            stencil: true,
            precision: Precision::High,
            power_preference: PowerPreference::Default,
            logarithmic_depth_buffer: false,
            premultiplied_alpha: true,
            sort_objects: true,
            auto_clear: true,
            clear_color: Color::BLACK,
            width: Self::DEFAULT_WIDTH,
            height: Self::DEFAULT_HEIGHT,
            shadow_map: ShadowSettings::default(),
        }
    }
}

impl RendererSettings {
    const DEFAULT_WIDTH: u32 = 1280;
    const DEFAULT_HEIGHT: u32 = 720;

    /// Reads settings from a JSON file and validates them.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not valid JSON for this type.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read renderer settings from {path:?}"))?;
        let settings: RendererSettings = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse renderer settings in {path:?}"))?;
        info!("Loaded renderer settings from {path:?}");
        Ok(settings.validate())
    }

    /// Replaces values that can never work with their defaults.
    pub fn validate(mut self) -> Self {
        if self.width == 0 || self.height == 0 {
            warn!(
                "Surface size {}x{} is empty. Using {}x{} instead.",
                self.width,
                self.height,
                Self::DEFAULT_WIDTH,
                Self::DEFAULT_HEIGHT
            );
            self.width = Self::DEFAULT_WIDTH;
            self.height = Self::DEFAULT_HEIGHT;
        }
        if self.shadow_map.needs_update && self.shadow_map.auto_update {
            self.shadow_map.needs_update = false;
        }
        self
    }

    /// Alpha written by colour clears.
    pub fn clear_alpha(&self) -> f32 {
        if self.alpha {
            0.0
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validate_replaces_empty_surface() {
        let settings = RendererSettings {
            width: 0,
            ..RendererSettings::default()
        }
        .validate();
        assert_eq!(settings.width, 1280);
        assert_eq!(settings.height, 720);
    }

    #[test]
    fn test_validate_preserves_valid_values() {
        let valid = RendererSettings {
            antialias: true,
            precision: Precision::Medium,
            width: 640,
            height: 480,
            ..RendererSettings::default()
        };
        assert_eq!(valid.clone().validate(), valid);
    }

    #[test]
    fn test_load_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "antialias": true, "precision": "medium",
                "shadow_map": {{ "enabled": true, "kind": "vsm" }} }}"#
        )
        .unwrap();

        let settings = RendererSettings::load_from_path(file.path()).unwrap();
        assert!(settings.antialias);
        assert_eq!(settings.precision, Precision::Medium);
        assert!(settings.shadow_map.enabled);
        assert_eq!(settings.shadow_map.kind, ShadowMapType::Vsm);
        assert!(settings.shadow_map.auto_update);
        assert!(settings.depth);
        assert_eq!(settings.width, 1280);
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = RendererSettings::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RendererSettings::load_from_path(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_clear_alpha_follows_alpha_flag() {
        assert_eq!(RendererSettings::default().clear_alpha(), 1.0);
        let settings = RendererSettings {
            alpha: true,
            ..RendererSettings::default()
        };
        assert_eq!(settings.clear_alpha(), 0.0);
    }
}
