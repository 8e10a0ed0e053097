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

// Prism Sandbox
// Renders a few frames of a shadowed scene on the headless device and logs
// what the renderer did.

use anyhow::{bail, Result};
use prism_agents::{animation_loop::AnimationLoop, render_agent::Renderer};
use prism_core::{
    math::{Color, Mat4, Vec3, FRAC_PI_2},
    renderer::{RendererSettings, ShadowMapType},
    scene::{AssetId, Camera, Fog, Geometry, Light, Material, MaterialKind, Scene, SceneObject},
};

const FRAMES: u32 = 120;
const FRAME_MS: f64 = 1000.0 / 60.0;

struct Demo {
    renderer: Renderer,
    scene: Scene,
    camera: Camera,
    cubes: Vec<AssetId<SceneObject>>,
    failed: bool,
}

impl Demo {
    fn update(&mut self, timestamp: f64) {
        let angle = (timestamp / 1000.0) as f32;
        for (i, id) in self.cubes.iter().enumerate() {
            if let Some(cube) = self.scene.object_mut(*id) {
                let x = i as f32 * 1.5 - 3.0;
                cube.world_matrix = Mat4::from_translation(Vec3::new(x, 0.5, 0.0))
                    * Mat4::from_rotation_y(angle + i as f32);
            }
        }
        if let Err(e) = self.renderer.render(&self.scene, &self.camera) {
            log::error!("Frame at {timestamp:.1}ms failed: {e}");
            self.failed = true;
        }
    }
}

fn build_scene(cubes: &mut Vec<AssetId<SceneObject>>) -> Scene {
    let mut scene = Scene::new();
    scene.background = Some(Color::from_hex(0x202830));
    scene.fog = Some(Fog {
        color: Color::from_hex(0x202830),
        near: 10.0,
        far: 40.0,
    });

    let floor_material = scene.materials.insert(Material::with(MaterialKind::Standard, |m| {
        m.name = "Floor".to_string();
        m.color = Color::from_hex(0x808080);
        m.roughness = 0.9;
    }));
    let floor = scene.geometries.insert(Geometry::plane(20.0, 20.0));
    let mut floor = SceneObject::mesh(floor, floor_material)
        .with_transform(Mat4::from_rotation_x(-FRAC_PI_2));
    floor.receive_shadow = true;
    scene.add(floor);

    let cube = scene.geometries.insert(Geometry::cuboid(1.0, 1.0, 1.0));
    let glass = scene.materials.insert(Material::with(MaterialKind::Phong, |m| {
        m.name = "Glass".to_string();
        m.color = Color::from_hex(0x88ccff);
        m.opacity = 0.5;
        m.transparent = true;
    }));
    for (i, hex) in [0xff4040, 0x40ff40, 0x4040ff, 0xffff40, 0xff40ff].into_iter().enumerate() {
        let material = if i == 2 {
            glass
        } else {
            scene
                .materials
                .insert(Material::with(MaterialKind::Lambert, |m| m.color = Color::from_hex(hex)))
        };
        let mut object = SceneObject::mesh(cube, material);
        object.name = format!("Cube {i}");
        object.cast_shadow = true;
        object.receive_shadow = true;
        cubes.push(scene.add(object));
    }

    scene.add_light(Light::ambient(Color::WHITE, 0.2));
    let mut sun = Light::directional(Color::WHITE, 1.0, Vec3::new(4.0, 8.0, 3.0));
    sun.cast_shadow = true;
    scene.add_light(sun);
    scene
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut settings = match std::env::args().nth(1) {
        Some(path) => RendererSettings::load_from_path(path)?,
        None => RendererSettings::default(),
    };
    settings.shadow_map.enabled = true;
    settings.shadow_map.kind = ShadowMapType::PcfSoft;

    let device = prism_infra::graphics::create_device(&settings)?;
    let aspect = settings.width as f32 / settings.height as f32;
    let mut cubes = Vec::new();
    let scene = build_scene(&mut cubes);
    let mut demo = Demo {
        renderer: Renderer::new(device, settings),
        scene,
        camera: Camera::perspective(0.9, aspect, 0.1, 100.0).look_at(
            Vec3::new(0.0, 4.0, 9.0),
            Vec3::ZERO,
            Vec3::Y,
        ),
        cubes,
        failed: false,
    };
    demo.renderer.compile(&demo.scene, &demo.camera)?;

    let mut animation = AnimationLoop::new();
    animation.set_callback(|demo: &mut Demo, timestamp| demo.update(timestamp));
    animation.start();
    for frame in 0..FRAMES {
        animation.tick(&mut demo, f64::from(frame) * FRAME_MS);
        if demo.failed {
            animation.stop();
            bail!("rendering stopped after {} frames", animation.frames());
        }
    }
    animation.stop();

    let info = demo.renderer.info();
    log::info!(
        "Rendered {} frames; last one: {} calls, {} triangles, \
         {} programs, {} geometries, {} textures",
        animation.frames(),
        info.calls,
        info.triangles,
        info.programs,
        info.geometries,
        info.textures
    );
    demo.renderer.dispose();
    Ok(())
}
