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

//! Tracks which cached program each material currently holds.

use ahash::AHashMap;
use prism_core::renderer::{GraphicsDevice, ProgramId, RenderError, RendererCapabilities};
use prism_core::scene::{AssetId, Material};
use prism_lanes::program_lane::{
    ProgramCache, ProgramEnvironment, ProgramHandle, ProgramKey, ProgramParameters,
};

#[derive(Debug)]
struct MaterialRecord {
    version: u64,
    environment: ProgramEnvironment,
    current: ProgramKey,
    programs: AHashMap<ProgramKey, Result<ProgramHandle, RenderError>>,
}

/// Per-material program references.
///
/// A material keeps one reference per program key it has been drawn with,
/// so moving between scenes with different lights, fog or clipping reuses
/// programs instead of rebuilding them. A version change drops every key
/// held for the old version, after the new program has been acquired, so a
/// rebuild that lands on the same key keeps the program alive.
#[derive(Debug, Default)]
pub(crate) struct MaterialPrograms {
    records: AHashMap<AssetId<Material>, MaterialRecord>,
}

impl MaterialPrograms {
    /// Returns the program for `material` under `environment`.
    ///
    /// `destroyed` is called with every program that stopped existing as a
    /// consequence, so that per-program state elsewhere can be dropped.
    pub fn resolve(
        &mut self,
        device: &dyn GraphicsDevice,
        programs: &mut ProgramCache,
        material: &Material,
        environment: &ProgramEnvironment,
        capabilities: &RendererCapabilities,
        destroyed: &mut dyn FnMut(ProgramId),
    ) -> Result<ProgramHandle, RenderError> {
        let id = material.id();
        let version = material.version();
        if let Some(record) = self.records.get(&id) {
            if record.version == version && record.environment == *environment {
                if let Some(program) = record.programs.get(&record.current) {
                    return program.clone();
                }
            }
        }

        let parameters = ProgramParameters::new(material, environment, capabilities);
        let key = parameters.key();
        if let Some(record) = self.records.get_mut(&id) {
            if record.version == version {
                record.environment = environment.clone();
                record.current = key.clone();
                if let Some(program) = record.programs.get(&key) {
                    return program.clone();
                }
                let program = programs.acquire(device, &parameters);
                if !matches!(program, Err(RenderError::ContextLost)) {
                    record.programs.insert(key, program.clone());
                }
                return program;
            }
        }

        let program = programs.acquire(device, &parameters);
        if matches!(program, Err(RenderError::ContextLost)) {
            return program;
        }
        let mut held = AHashMap::new();
        held.insert(key.clone(), program.clone());
        let previous = self.records.insert(
            id,
            MaterialRecord {
                version,
                environment: environment.clone(),
                current: key,
                programs: held,
            },
        );
        if let Some(previous) = previous {
            release_all(device, programs, previous, destroyed);
        }
        program
    }

    /// Sort rank of the program `material` resolved to last, 0 when unknown.
    pub fn sort_id(&self, material: AssetId<Material>, programs: &ProgramCache) -> u32 {
        self.records
            .get(&material)
            .and_then(|record| record.programs.get(&record.current))
            .and_then(|program| program.as_ref().ok())
            .and_then(|handle| programs.get(*handle))
            .map_or(0, |entry| entry.sort_id())
    }

    /// Drops every reference held by `material`. Returns `false` when the
    /// material was never drawn.
    pub fn release(
        &mut self,
        device: &dyn GraphicsDevice,
        programs: &mut ProgramCache,
        material: AssetId<Material>,
        destroyed: &mut dyn FnMut(ProgramId),
    ) -> bool {
        let Some(record) = self.records.remove(&material) else {
            return false;
        };
        release_all(device, programs, record, destroyed);
        true
    }

    /// Forgets every record without touching the device.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Materials with a record.
    pub fn len(&self) -> usize {
        self.records.len()
    }
}

fn release_all(
    device: &dyn GraphicsDevice,
    programs: &mut ProgramCache,
    record: MaterialRecord,
    destroyed: &mut dyn FnMut(ProgramId),
) {
    for handle in record.programs.into_values().filter_map(Result::ok) {
        if programs.release(device, handle) {
            destroyed(handle.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::renderer::RendererSettings;
    use prism_core::scene::{MaterialKind, ShaderSource};
    use prism_lanes::program_lane::LightsHash;
    use prism_infra::graphics::headless::{Command, HeadlessDevice};

    fn capabilities(device: &HeadlessDevice) -> RendererCapabilities {
        RendererCapabilities::resolve(&device.capabilities(), &RendererSettings::default())
    }

    #[test]
    fn test_unchanged_material_reuses_its_program() {
        let device = HeadlessDevice::new();
        let caps = capabilities(&device);
        let (mut records, mut programs) = (MaterialPrograms::default(), ProgramCache::new());
        let material = Material::new(MaterialKind::Basic);
        let env = ProgramEnvironment::default();

        let first = records.resolve(&device, &mut programs, &material, &env, &caps, &mut |_| {});
        let second = records.resolve(&device, &mut programs, &material, &env, &caps, &mut |_| {});
        assert_eq!(first, second);
        assert_eq!(programs.len(), 1);
        assert_eq!(programs.get(first.unwrap()).unwrap().ref_count(), 1);
    }

    #[test]
    fn test_material_edit_swaps_program() {
        let device = HeadlessDevice::new();
        let caps = capabilities(&device);
        let (mut records, mut programs) = (MaterialPrograms::default(), ProgramCache::new());
        let mut material = Material::new(MaterialKind::Basic);
        let env = ProgramEnvironment::default();
        let first = records
            .resolve(&device, &mut programs, &material, &env, &caps, &mut |_| {})
            .unwrap();

        material.edit(|m| m.vertex_colors = true);
        let mut destroyed = Vec::new();
        let second = records
            .resolve(&device, &mut programs, &material, &env, &caps, &mut |id| destroyed.push(id))
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(destroyed, vec![first.id()]);
        assert_eq!(programs.len(), 1);
    }

    #[test]
    fn test_version_bump_with_same_key_keeps_program() {
        let device = HeadlessDevice::new();
        let caps = capabilities(&device);
        let (mut records, mut programs) = (MaterialPrograms::default(), ProgramCache::new());
        let mut material = Material::new(MaterialKind::Lambert);
        let env = ProgramEnvironment::default();
        let first = records
            .resolve(&device, &mut programs, &material, &env, &caps, &mut |_| {})
            .unwrap();
        device.clear_log();

        material.edit(|m| m.opacity = 0.5);
        let second = records
            .resolve(&device, &mut programs, &material, &env, &caps, &mut |_| panic!("destroyed"))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(device.count_commands(|c| matches!(c, Command::CreateProgram { .. })), 0);
    }

    #[test]
    fn test_environment_changes_keep_every_program() {
        let device = HeadlessDevice::new();
        let caps = capabilities(&device);
        let (mut records, mut programs) = (MaterialPrograms::default(), ProgramCache::new());
        let material = Material::new(MaterialKind::Lambert);
        let dark = ProgramEnvironment::default();
        let lit = ProgramEnvironment {
            lights: LightsHash {
                directional: 1,
                ..LightsHash::default()
            },
            ..ProgramEnvironment::default()
        };

        let mut handles = Vec::new();
        for _ in 0..5 {
            for env in [&lit, &dark] {
                let handle = records
                    .resolve(&device, &mut programs, &material, env, &caps, &mut |_| {
                        panic!("destroyed")
                    })
                    .unwrap();
                handles.push(handle);
            }
        }
        assert_eq!(device.count_commands(|c| matches!(c, Command::CreateProgram { .. })), 2);
        assert_eq!(programs.len(), 2);
        assert_ne!(handles[0], handles[1]);
        assert!(handles.chunks(2).all(|pair| pair == &handles[..2]));

        let mut destroyed = 0;
        assert!(records.release(&device, &mut programs, material.id(), &mut |_| destroyed += 1));
        assert_eq!(destroyed, 2);
        assert_eq!(device.live_programs(), 0);
    }

    #[test]
    fn test_edit_drops_programs_of_every_environment() {
        let device = HeadlessDevice::new();
        let caps = capabilities(&device);
        let (mut records, mut programs) = (MaterialPrograms::default(), ProgramCache::new());
        let mut material = Material::new(MaterialKind::Lambert);
        let dark = ProgramEnvironment::default();
        let fog = ProgramEnvironment {
            fog: true,
            ..ProgramEnvironment::default()
        };
        records.resolve(&device, &mut programs, &material, &dark, &caps, &mut |_| {}).unwrap();
        records.resolve(&device, &mut programs, &material, &fog, &caps, &mut |_| {}).unwrap();
        assert_eq!(programs.len(), 2);

        material.edit(|m| m.alpha_test = 0.5);
        let mut destroyed = 0;
        records
            .resolve(&device, &mut programs, &material, &fog, &caps, &mut |_| destroyed += 1)
            .unwrap();
        assert_eq!(destroyed, 2);
        assert_eq!(programs.len(), 1);
    }

    #[test]
    fn test_failed_compile_is_remembered() {
        let device = HeadlessDevice::new();
        let caps = capabilities(&device);
        let (mut records, mut programs) = (MaterialPrograms::default(), ProgramCache::new());
        let material = Material::new(MaterialKind::Shader(ShaderSource {
            vertex: "void main() {}".to_string(),
            fragment: "#error broken\nvoid main() {}".to_string(),
        }));
        let env = ProgramEnvironment::default();

        let first = records.resolve(&device, &mut programs, &material, &env, &caps, &mut |_| {});
        assert!(matches!(first, Err(RenderError::ShaderCompile { .. })));
        device.clear_log();
        let second = records.resolve(&device, &mut programs, &material, &env, &caps, &mut |_| {});
        assert_eq!(first, second);
        assert!(device.commands().is_empty());
    }

    #[test]
    fn test_release_destroys_last_reference() {
        let device = HeadlessDevice::new();
        let caps = capabilities(&device);
        let (mut records, mut programs) = (MaterialPrograms::default(), ProgramCache::new());
        let a = Material::new(MaterialKind::Basic);
        let b = Material::new(MaterialKind::Basic);
        let env = ProgramEnvironment::default();
        records.resolve(&device, &mut programs, &a, &env, &caps, &mut |_| {}).unwrap();
        records.resolve(&device, &mut programs, &b, &env, &caps, &mut |_| {}).unwrap();

        let mut destroyed = 0;
        assert!(records.release(&device, &mut programs, a.id(), &mut |_| destroyed += 1));
        assert_eq!(destroyed, 0);
        assert!(records.release(&device, &mut programs, b.id(), &mut |_| destroyed += 1));
        assert_eq!(destroyed, 1);
        assert!(!records.release(&device, &mut programs, b.id(), &mut |_| destroyed += 1));
        assert_eq!(device.live_programs(), 0);
    }
}
