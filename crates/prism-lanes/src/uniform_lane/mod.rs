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

//! Uniform lane: computing per-draw uniform values and uploading only the
//! ones that changed.
//!
//! Values are gathered by name into [`UniformValues`] by the `refresh_*`
//! functions, then [`UniformBinder::upload`] resolves the names against the
//! program's active uniforms and diffs them against what each program last
//! received.

mod binder;
mod lights;
mod refresh;
mod units;
mod values;

pub use self::binder::UniformBinder;
pub use self::lights::{
    DirectionalLightUniforms, HemisphereLightUniforms, LightsState, PointLightUniforms,
    SpotLightUniforms,
};
pub use self::refresh::{
    refresh_clipping, refresh_distance, refresh_fog, refresh_material, refresh_transforms,
    refresh_vsm_blur, TransformInputs,
};
pub use self::units::TextureUnits;
pub use self::values::UniformValues;
