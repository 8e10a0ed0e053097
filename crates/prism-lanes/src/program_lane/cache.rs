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

//! Shared, reference-counted compiled programs.

use super::parameters::{ProgramKey, ProgramParameters};
use super::source::ProgramSource;
use ahash::AHashMap;
use prism_core::renderer::{
    ActiveAttribute, ActiveUniform, DeviceError, GraphicsDevice, ProgramId, RenderError,
};

/// A reference to a cached program, held by whoever acquired it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(ProgramId);

impl ProgramHandle {
    /// The device program behind this handle.
    pub fn id(self) -> ProgramId {
        self.0
    }
}

/// A linked program and what it exposes.
#[derive(Debug)]
pub struct ProgramEntry {
    id: ProgramId,
    key: ProgramKey,
    label: String,
    sort_id: u32,
    ref_count: usize,
    uniforms: AHashMap<String, ActiveUniform>,
    attributes: Vec<ActiveAttribute>,
}

impl ProgramEntry {
    /// Device handle.
    pub fn id(&self) -> ProgramId {
        self.id
    }

    /// Cache key the program was built for.
    pub fn key(&self) -> &ProgramKey {
        &self.key
    }

    /// Label used in diagnostics.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Stable ordering value used to group draws by program.
    pub fn sort_id(&self) -> u32 {
        self.sort_id
    }

    /// Number of live acquisitions.
    pub fn ref_count(&self) -> usize {
        self.ref_count
    }

    /// Looks up an active uniform by name.
    pub fn uniform(&self, name: &str) -> Option<&ActiveUniform> {
        self.uniforms.get(name)
    }

    /// Active vertex inputs.
    pub fn attributes(&self) -> &[ActiveAttribute] {
        &self.attributes
    }
}

/// Deduplicates programs by [`ProgramKey`].
///
/// Every [`acquire`](Self::acquire) must be balanced by one
/// [`release`](Self::release). The program is destroyed when the last
/// holder releases it.
#[derive(Debug, Default)]
pub struct ProgramCache {
    entries: AHashMap<ProgramKey, ProgramEntry>,
    keys: AHashMap<ProgramId, ProgramKey>,
    failed: AHashMap<ProgramKey, RenderError>,
    next_sort_id: u32,
}

impl ProgramCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the program for `parameters`, compiling it on first use.
    ///
    /// A key that failed to build is remembered: later calls return the same
    /// error without recompiling or logging again.
    pub fn acquire(
        &mut self,
        device: &dyn GraphicsDevice,
        parameters: &ProgramParameters,
    ) -> Result<ProgramHandle, RenderError> {
        let key = parameters.key();
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.ref_count += 1;
            log::trace!("Program '{}' reused ({} holders)", entry.label, entry.ref_count);
            return Ok(ProgramHandle(entry.id));
        }
        if let Some(error) = self.failed.get(&key) {
            return Err(error.clone());
        }

        let descriptor = ProgramSource::generate(parameters);
        let id = match device.create_program(&descriptor) {
            Ok(id) => id,
            Err(DeviceError::CompileFailed { log, .. } | DeviceError::LinkFailed { log }) => {
                log::error!(
                    "Shader program '{}' failed to build: {}\n\
                     --- vertex ---\n{}\n--- fragment ---\n{}",
                    descriptor.label,
                    log,
                    descriptor.vertex_source,
                    descriptor.fragment_source
                );
                let error = RenderError::ShaderCompile {
                    label: descriptor.label,
                    key: key.to_string(),
                    vertex_source: descriptor.vertex_source,
                    fragment_source: descriptor.fragment_source,
                    log,
                };
                self.failed.insert(key, error.clone());
                return Err(error);
            }
            Err(other) => {
                return Err(RenderError::upload(format!("program '{}'", descriptor.label), other))
            }
        };

        let reflection = match device.program_reflection(id) {
            Ok(reflection) => reflection,
            Err(err) => {
                device.destroy_program(id);
                return Err(RenderError::upload(format!("program '{}'", descriptor.label), err));
            }
        };

        let sort_id = self.next_sort_id;
        self.next_sort_id += 1;
        log::debug!("Compiled program '{}' ({id:?}, sort id {sort_id})", descriptor.label);
        self.keys.insert(id, key.clone());
        self.entries.insert(
            key.clone(),
            ProgramEntry {
                id,
                key,
                label: descriptor.label,
                sort_id,
                ref_count: 1,
                uniforms: reflection
                    .uniforms
                    .into_iter()
                    .map(|u| (u.name.clone(), u))
                    .collect(),
                attributes: reflection.attributes,
            },
        );
        Ok(ProgramHandle(id))
    }

    /// Drops one reference. Returns `true` when the program was destroyed.
    pub fn release(&mut self, device: &dyn GraphicsDevice, handle: ProgramHandle) -> bool {
        let Some(key) = self.keys.get(&handle.0) else {
            log::warn!("Released unknown program {:?}", handle.0);
            return false;
        };
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        entry.ref_count = entry.ref_count.saturating_sub(1);
        if entry.ref_count > 0 {
            return false;
        }

        let key = key.clone();
        self.keys.remove(&handle.0);
        if let Some(entry) = self.entries.remove(&key) {
            log::debug!("Destroying program '{}' ({:?})", entry.label, entry.id);
            device.destroy_program(entry.id);
        }
        true
    }

    /// Looks up a live program.
    pub fn get(&self, handle: ProgramHandle) -> Option<&ProgramEntry> {
        self.keys.get(&handle.0).and_then(|key| self.entries.get(key))
    }

    /// Number of live programs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no program is live.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Holders of the program built for `key`, `0` when none is live.
    pub fn reference_count(&self, key: &ProgramKey) -> usize {
        self.entries.get(key).map_or(0, |e| e.ref_count)
    }

    /// Forgets every program without touching the device.
    ///
    /// Used after a context loss, when the device handles are already gone.
    pub fn invalidate(&mut self) {
        self.entries.clear();
        self.keys.clear();
        self.failed.clear();
    }

    /// Destroys every live program.
    pub fn dispose(&mut self, device: &dyn GraphicsDevice) {
        for entry in self.entries.values() {
            device.destroy_program(entry.id);
        }
        self.invalidate();
    }
}
