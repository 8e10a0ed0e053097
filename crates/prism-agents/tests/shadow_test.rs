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

//! Integration tests for the shadow map pass.
//!
//! Shadow maps are rendered into off-screen framebuffers before the main
//! pass, so their draws are told apart by the bound framebuffer and the
//! label of the built-in material that produced them.

use prism_agents::render_agent::Renderer;
use prism_core::{
    math::{Color, Mat4, Plane, Vec3},
    renderer::{RendererSettings, ShadowMapType, ShadowSettings, UniformValue},
    scene::{Camera, Geometry, Light, Material, MaterialKind, Scene, SceneObject},
};
use prism_infra::graphics::headless::{DrawRecord, HeadlessDevice};
use std::sync::Arc;

fn shadowed(kind: ShadowMapType) -> RendererSettings {
    RendererSettings {
        shadow_map: ShadowSettings {
            enabled: true,
            kind,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn setup(settings: RendererSettings) -> (Arc<HeadlessDevice>, Renderer) {
    let device = Arc::new(HeadlessDevice::from_settings(&settings));
    let renderer = Renderer::new(device.clone(), settings);
    (device, renderer)
}

fn camera() -> Camera {
    Camera::perspective(1.0, 16.0 / 9.0, 0.1, 100.0).look_at(
        Vec3::new(0.0, 2.0, 6.0),
        Vec3::ZERO,
        Vec3::Y,
    )
}

/// Helper: a lit floor that receives shadows and a box that casts them.
fn shadow_scene(light: Light) -> Scene {
    let mut scene = Scene::new();
    let material = scene.materials.insert(Material::new(MaterialKind::Lambert));

    let floor = scene.geometries.insert(Geometry::plane(10.0, 10.0));
    let mut floor = SceneObject::mesh(floor, material)
        .with_transform(Mat4::from_rotation_x(-std::f32::consts::FRAC_PI_2));
    floor.receive_shadow = true;
    scene.add(floor);

    let cube = scene.geometries.insert(Geometry::cuboid(1.0, 1.0, 1.0));
    let mut cube =
        SceneObject::mesh(cube, material).with_transform(Mat4::from_translation(Vec3::Y));
    cube.cast_shadow = true;
    cube.receive_shadow = true;
    scene.add(cube);

    let mut light = light;
    light.cast_shadow = true;
    scene.add_light(light);
    scene
}

fn sun() -> Light {
    Light::directional(Color::WHITE, 1.0, Vec3::new(3.0, 5.0, 2.0))
}

fn labelled<'a>(draws: &'a [DrawRecord], label: &str) -> Vec<&'a DrawRecord> {
    draws.iter().filter(|d| d.program_label == label).collect()
}

fn main_pass(draws: &[DrawRecord]) -> Vec<&DrawRecord> {
    draws.iter().filter(|d| d.framebuffer.is_none()).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Directional and spot lights
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_directional_shadow_map_is_rendered_before_the_main_pass() {
    let (device, mut renderer) = setup(shadowed(ShadowMapType::Pcf));
    let scene = shadow_scene(sun());

    renderer.render(&scene, &camera()).unwrap();

    let draws = device.draws();
    let depth = labelled(&draws, "ShadowDepth");
    // Only the cube casts.
    assert_eq!(depth.len(), 1);
    assert!(depth.iter().all(|d| d.framebuffer.is_some()));
    let first_main = draws.iter().position(|d| d.framebuffer.is_none()).unwrap();
    let last_shadow = draws.iter().rposition(|d| d.framebuffer.is_some()).unwrap();
    assert!(last_shadow < first_main);
}

#[test]
fn test_cut_out_casters_keep_their_clipping_and_alpha_test() {
    let (device, mut renderer) = setup(shadowed(ShadowMapType::Pcf));
    let mut scene = shadow_scene(sun());
    let cut_out = scene.materials.insert(Material::with(MaterialKind::Lambert, |m| {
        m.alpha_test = 0.5;
        m.clipping_planes = vec![Plane::new(Vec3::X, 10.0)];
    }));
    let leaf = scene.geometries.insert(Geometry::plane(1.0, 1.0));
    let mut leaf = SceneObject::mesh(leaf, cut_out)
        .with_transform(Mat4::from_translation(Vec3::new(1.5, 1.0, 0.0)));
    leaf.cast_shadow = true;
    scene.add(leaf);

    renderer.render(&scene, &camera()).unwrap();

    let draws = device.draws();
    let depth = labelled(&draws, "ShadowDepth");
    assert_eq!(depth.len(), 2);
    assert_ne!(depth[0].program, depth[1].program);
    let cut = depth
        .iter()
        .find(|d| d.uniform("alphaTest") == Some(&UniformValue::Float(0.5)))
        .expect("the cut-out caster keeps its alpha test");
    assert!(matches!(
        cut.uniform("clippingPlanes"),
        Some(UniformValue::Vec4Array(planes)) if planes.len() == 1
    ));

    // The variant follows edits of its source and goes away with it.
    scene.materials.get_mut(cut_out).unwrap().edit(|m| m.alpha_test = 0.25);
    device.clear_log();
    renderer.render(&scene, &camera()).unwrap();
    let draws = device.draws();
    assert!(labelled(&draws, "ShadowDepth")
        .iter()
        .any(|d| d.uniform("alphaTest") == Some(&UniformValue::Float(0.25))));

    let live = device.live_programs();
    assert!(renderer.dispose_material(cut_out));
    assert_eq!(device.live_programs(), live - 2);
}

#[test]
fn test_receivers_sample_the_shadow_map() {
    let (device, mut renderer) = setup(shadowed(ShadowMapType::Pcf));
    let scene = shadow_scene(sun());

    renderer.render(&scene, &camera()).unwrap();

    let draws = device.draws();
    let main = main_pass(&draws);
    assert!(!main.is_empty());
    for draw in main {
        assert_eq!(draw.uniform("receiveShadow"), Some(&UniformValue::Int(1)));
        assert!(matches!(
            draw.uniform("directionalShadowMatrix"),
            Some(UniformValue::Mat4Array(m)) if m.len() == 1
        ));
        assert!(matches!(
            draw.uniform("directionalShadowMap"),
            Some(UniformValue::IntArray(u)) if u.len() == 1
        ));
    }
}

#[test]
fn test_spot_light_renders_one_view() {
    let light = Light::spot(Color::WHITE, 1.0, Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, 0.6);
    let (device, mut renderer) = setup(shadowed(ShadowMapType::Basic));
    let scene = shadow_scene(light);

    renderer.render(&scene, &camera()).unwrap();

    let draws = device.draws();
    assert_eq!(labelled(&draws, "ShadowDepth").len(), 1);
    assert!(main_pass(&draws)
        .iter()
        .all(|d| d.uniform("spotShadowMap").is_some()));
}

// ─────────────────────────────────────────────────────────────────────────────
// Point lights and VSM
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_point_light_renders_six_faces_with_distance_material() {
    let light = Light::point(Color::WHITE, 1.0, Vec3::new(0.0, 4.0, 0.0), 20.0);
    let (device, mut renderer) = setup(shadowed(ShadowMapType::Pcf));
    let scene = shadow_scene(light);

    renderer.render(&scene, &camera()).unwrap();

    let draws = device.draws();
    let distance = labelled(&draws, "ShadowDistance");
    assert_eq!(distance.len(), 6);
    assert!(distance.iter().all(|d| d.uniform("referencePosition").is_some()));
    assert!(labelled(&draws, "ShadowDepth").is_empty());
}

#[test]
fn test_vsm_blurs_each_map_twice() {
    let (device, mut renderer) = setup(shadowed(ShadowMapType::Vsm));
    let scene = shadow_scene(sun());

    renderer.render(&scene, &camera()).unwrap();

    let draws = device.draws();
    assert_eq!(labelled(&draws, "ShadowVarianceDepth").len(), 1);
    let vertical = labelled(&draws, "ShadowBlurVertical");
    let horizontal = labelled(&draws, "ShadowBlurHorizontal");
    assert_eq!(vertical.len(), 1);
    assert_eq!(horizontal.len(), 1);
    assert_ne!(vertical[0].framebuffer, horizontal[0].framebuffer);
    assert_ne!(vertical[0].program, horizontal[0].program, "the passes differ by a define");
}

// ─────────────────────────────────────────────────────────────────────────────
// Update policy
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_disabled_shadows_render_no_maps() {
    let (device, mut renderer) = setup(RendererSettings::default());
    let scene = shadow_scene(sun());

    renderer.render(&scene, &camera()).unwrap();

    let draws = device.draws();
    assert!(draws.iter().all(|d| d.framebuffer.is_none()));
    assert!(draws.iter().all(|d| d.uniform("directionalShadowMap").is_none()));
}

#[test]
fn test_manual_update_renders_maps_once() {
    let (device, mut renderer) = setup(shadowed(ShadowMapType::Pcf));
    renderer.shadow_map_mut().auto_update = false;
    renderer.shadow_map_mut().needs_update = true;
    let scene = shadow_scene(sun());

    renderer.render(&scene, &camera()).unwrap();
    assert_eq!(labelled(&device.draws(), "ShadowDepth").len(), 1);
    assert!(!renderer.settings().shadow_map.needs_update);

    device.clear_log();
    renderer.render(&scene, &camera()).unwrap();
    let draws = device.draws();
    assert!(labelled(&draws, "ShadowDepth").is_empty());
    // The map rendered earlier is still sampled.
    assert!(main_pass(&draws)
        .iter()
        .all(|d| d.uniform("directionalShadowMap").is_some()));
}

#[test]
fn test_removed_caster_light_releases_its_map() {
    let (device, mut renderer) = setup(shadowed(ShadowMapType::Pcf));
    let mut scene = shadow_scene(sun());
    renderer.render(&scene, &camera()).unwrap();
    let with_map = device.live_framebuffers();
    assert!(with_map > 0);

    scene.lights[0].cast_shadow = false;
    renderer.render(&scene, &camera()).unwrap();
    assert!(device.live_framebuffers() < with_map);
}
