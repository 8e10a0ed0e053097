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

//! Defines the hierarchy of error types for the rendering subsystem.
//!
//! [`DeviceError`] is what a [`GraphicsDevice`](super::GraphicsDevice) backend
//! reports. [`RenderError`] is the renderer-level taxonomy built on top of it:
//! compile and upload failures are local to a single render item, unsupported
//! capabilities degrade, and a lost context invalidates every cache.

use crate::renderer::api::ShaderStage;
use thiserror::Error;

/// An error reported by a graphics backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// A shader stage failed to compile.
    #[error("{stage:?} shader compilation failed: {log}")]
    CompileFailed {
        /// The stage that failed.
        stage: ShaderStage,
        /// The driver's diagnostic log.
        log: String,
    },
    /// The compiled stages failed to link into a program.
    #[error("program link failed: {log}")]
    LinkFailed {
        /// The driver's diagnostic log.
        log: String,
    },
    /// The allocation would exceed the device's available memory.
    #[error("out of GPU memory ({requested} bytes requested, {available} available)")]
    OutOfMemory {
        /// Size of the failed allocation.
        requested: u64,
        /// Bytes still available at the time of the request.
        available: u64,
    },
    /// Data did not match the format or size declared for the resource.
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    /// The handle does not refer to a live resource.
    #[error("invalid {kind} handle {id}")]
    InvalidHandle {
        /// Resource kind (`"buffer"`, `"texture"`, ...).
        kind: &'static str,
        /// Raw handle value.
        id: usize,
    },
    /// The backend does not support the requested feature.
    #[error("unsupported feature: {0}")]
    Unsupported(String),
    /// The underlying context is gone; no call can succeed until it is restored.
    #[error("graphics context lost")]
    ContextLost,
    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// An error raised by the renderer while preparing or dispatching a frame.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// A shader program failed to compile or link.
    #[error("shader program '{label}' failed to build: {log}")]
    ShaderCompile {
        /// Human readable program label (material kind).
        label: String,
        /// Cache key of the failed configuration.
        key: String,
        /// Full generated vertex source.
        vertex_source: String,
        /// Full generated fragment source.
        fragment_source: String,
        /// The driver's diagnostic log.
        log: String,
    },
    /// Creating or writing a buffer, texture or render target failed.
    #[error("upload of {resource} failed: {source}")]
    ResourceUpload {
        /// Label of the resource being uploaded.
        resource: String,
        /// The backend failure.
        #[source]
        source: DeviceError,
    },
    /// A requested feature is unavailable on this device.
    #[error("unsupported capability: {0}")]
    UnsupportedCapability(String),
    /// The graphics context was lost; caches have been invalidated.
    #[error("graphics context lost")]
    ContextLost,
}

impl RenderError {
    /// Wraps a backend failure that occurred while uploading `resource`.
    ///
    /// A lost context is surfaced as [`RenderError::ContextLost`] rather than
    /// as an upload failure so callers can react to it globally.
    pub fn upload(resource: impl Into<String>, source: DeviceError) -> Self {
        match source {
            DeviceError::ContextLost => RenderError::ContextLost,
            DeviceError::Unsupported(what) => RenderError::UnsupportedCapability(what),
            source => RenderError::ResourceUpload {
                resource: resource.into(),
                source,
            },
        }
    }

    /// Returns `true` if the error only affects the item being drawn.
    pub fn is_item_local(&self) -> bool {
        matches!(
            self,
            RenderError::ShaderCompile { .. } | RenderError::ResourceUpload { .. }
        )
    }
}

impl From<DeviceError> for RenderError {
    fn from(err: DeviceError) -> Self {
        RenderError::upload("device resource", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_device_error_display() {
        let err = DeviceError::OutOfMemory {
            requested: 64,
            available: 32,
        };
        assert_eq!(
            err.to_string(),
            "out of GPU memory (64 bytes requested, 32 available)"
        );
        let err = DeviceError::CompileFailed {
            stage: ShaderStage::Fragment,
            log: "0:12: syntax error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Fragment shader compilation failed: 0:12: syntax error"
        );
    }

    #[test]
    fn test_upload_error_keeps_source() {
        let err = RenderError::upload(
            "attribute 'position'",
            DeviceError::InvalidFormat("odd size".into()),
        );
        assert!(err.is_item_local());
        assert_eq!(
            err.to_string(),
            "upload of attribute 'position' failed: invalid format: odd size"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_context_lost_is_not_an_upload_error() {
        let err = RenderError::upload("texture", DeviceError::ContextLost);
        assert_eq!(err, RenderError::ContextLost);
        assert!(!err.is_item_local());
    }

    #[test]
    fn test_unsupported_maps_to_capability_error() {
        let err: RenderError = DeviceError::Unsupported("float textures".into()).into();
        assert_eq!(err, RenderError::UnsupportedCapability("float textures".into()));
    }
}
