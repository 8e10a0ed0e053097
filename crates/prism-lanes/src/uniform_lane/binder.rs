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

//! Diffing uniform uploads per program.

use super::values::UniformValues;
use crate::program_lane::ProgramEntry;
use ahash::AHashMap;
use prism_core::renderer::{GraphicsDevice, ProgramId, UniformLocation, UniformValue};

/// Remembers the last value uploaded to every (program, location) pair.
///
/// Uniform storage belongs to the program on the device, so a value only
/// needs uploading when it differs from what that program last received,
/// regardless of which programs ran in between.
#[derive(Debug, Default)]
pub struct UniformBinder {
    uploaded: AHashMap<(ProgramId, UniformLocation), UniformValue>,
}

impl UniformBinder {
    /// Creates an empty binder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads the values `program` uses and has not already received.
    ///
    /// The program must be in use on the device. Names the program does not
    /// declare are skipped, as are values of the wrong type. Returns the
    /// number of uploads issued.
    pub fn upload(
        &mut self,
        device: &dyn GraphicsDevice,
        program: &ProgramEntry,
        values: &UniformValues,
    ) -> usize {
        let mut issued = 0;
        for (name, value) in values.iter() {
            let Some(active) = program.uniform(name) else {
                continue;
            };
            if !value.matches(active.ty) {
                log::debug!(
                    "Uniform '{name}' of program '{}' is {:?}; ignoring {value:?}",
                    program.label(),
                    active.ty
                );
                continue;
            }
            let key = (program.id(), active.location);
            if self.uploaded.get(&key) == Some(value) {
                continue;
            }
            device.set_uniform(active.location, value);
            self.uploaded.insert(key, value.clone());
            issued += 1;
        }
        issued
    }

    /// Drops the values recorded for a destroyed program.
    pub fn forget_program(&mut self, id: ProgramId) {
        self.uploaded.retain(|(program, _), _| *program != id);
    }

    /// Forgets everything (context loss).
    pub fn clear(&mut self) {
        self.uploaded.clear();
    }
}
