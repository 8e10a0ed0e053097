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

//! Filling [`UniformValues`] from scene data.

use super::values::UniformValues;
use prism_core::math::{Mat3, Mat4, Plane, Vec2, Vec3};
use prism_core::renderer::UniformValue;
use prism_core::scene::{AssetId, Camera, Fog, MaterialProperties, Texture};
use std::f32::consts::LN_2;

/// Camera data shared by every draw of a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformInputs {
    /// World to view.
    pub view: Mat4,
    /// View to clip.
    pub projection: Mat4,
    /// World-space camera position.
    pub camera_position: Vec3,
    /// `logDepthBufFC`, when the logarithmic depth buffer is on.
    pub log_depth_factor: Option<f32>,
}

impl TransformInputs {
    /// Captures `camera` for one pass.
    pub fn new(camera: &Camera, logarithmic_depth_buffer: bool) -> Self {
        Self {
            view: camera.view,
            projection: camera.projection,
            camera_position: camera.position(),
            log_depth_factor: logarithmic_depth_buffer
                .then(|| 2.0 / ((camera.far + 1.0).ln() / LN_2)),
        }
    }
}

/// Object and camera matrices.
pub fn refresh_transforms(values: &mut UniformValues, world: &Mat4, inputs: &TransformInputs) {
    let model_view = inputs.view * *world;
    values.set("modelMatrix", *world);
    values.set("modelViewMatrix", model_view);
    values.set("projectionMatrix", inputs.projection);
    values.set("viewMatrix", inputs.view);
    values.set("normalMatrix", Mat3::from_mat4(model_view).inverse().transpose());
    values.set("cameraPosition", inputs.camera_position);
    if let Some(factor) = inputs.log_depth_factor {
        values.set("logDepthBufFC", factor);
    }
}

/// Material constants, maps and custom uniforms.
///
/// `sampler` binds a texture and returns its unit, or `None` when the texture
/// cannot be sampled this draw; the sampler uniform is then left unset.
pub fn refresh_material(
    values: &mut UniformValues,
    material: &MaterialProperties,
    sampler: &mut dyn FnMut(AssetId<Texture>) -> Option<i32>,
) {
    values.set("diffuse", material.color.to_vec3());
    values.set("opacity", material.opacity);
    values.set("alphaTest", material.alpha_test);
    values.set("emissive", material.emissive.to_vec3() * material.emissive_intensity);
    values.set("specular", material.specular.to_vec3());
    values.set("shininess", material.shininess.max(1e-4));
    values.set("roughness", material.roughness);
    values.set("metalness", material.metalness);
    values.set("clearcoat", material.clearcoat);
    values.set("clearcoatRoughness", material.clearcoat_roughness);
    values.set("aoMapIntensity", material.ao_map_intensity);
    values.set("normalScale", material.normal_scale);

    let maps = [
        ("map", material.map),
        ("alphaMap", material.alpha_map),
        ("aoMap", material.ao_map),
        ("emissiveMap", material.emissive_map),
        ("normalMap", material.normal_map),
        ("roughnessMap", material.roughness_map),
        ("metalnessMap", material.metalness_map),
    ];
    for (name, texture) in maps {
        if let Some(unit) = texture.and_then(&mut *sampler) {
            values.set(name, unit);
        }
    }

    for (name, value) in &material.uniforms {
        values.set(name.clone(), value.clone());
    }
    for (name, texture) in &material.textures {
        if let Some(unit) = sampler(*texture) {
            values.set(name.clone(), unit);
        }
    }
}

/// Linear scene fog.
pub fn refresh_fog(values: &mut UniformValues, fog: &Fog) {
    values.set("fogColor", fog.color.to_vec3());
    values.set("fogNear", fog.near);
    values.set("fogFar", fog.far);
}

/// Renderer-wide planes followed by the material's, in view space.
pub fn refresh_clipping(
    values: &mut UniformValues,
    global: &[Plane],
    material: &MaterialProperties,
    view: &Mat4,
) {
    let planes: Vec<_> = global
        .iter()
        .chain(&material.clipping_planes)
        .map(|plane| plane.transformed(view).to_vec4())
        .collect();
    if !planes.is_empty() {
        values.set("clippingPlanes", UniformValue::Vec4Array(planes));
    }
}

/// Reference point of the distance material used by point-light shadows.
pub fn refresh_distance(values: &mut UniformValues, reference: Vec3, near: f32, far: f32) {
    values.set("referencePosition", reference);
    values.set("nearDistance", near);
    values.set("farDistance", far);
}

/// One pass of the separable variance shadow map blur.
pub fn refresh_vsm_blur(
    values: &mut UniformValues,
    unit: i32,
    resolution: Vec2,
    direction: Vec2,
    radius: f32,
    samples: u32,
) {
    values.set("shadowPass", unit);
    values.set("resolution", resolution);
    values.set("direction", direction);
    values.set("radius", radius);
    values.set("samples", samples as f32);
}
