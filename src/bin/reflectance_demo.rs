//! Three copies of a model lit with Phong, Cook-Torrance and toon shading
//!
//! Run with:
//!   cargo run --bin reflectance_demo -- --model path/to/model.glb

use clap::Parser;
use glam::Vec3;
use reflectance_lab::{
    app::{self, AppContext, DemoError, DemoHandler},
    backend::Frame,
    config::DemoArgs,
    pipeline::{begin_scene_pass, ReflectancePass},
    resources::{GpuModel, Mesh, Model},
    scene::{
        Camera, CameraController, FreeFlyController, ModelRenderer, PointLight, Scene, Spin,
        Transform,
    },
    shading::{ShadingModel, ShadingParams},
};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.1,
    b: 0.1,
    a: 1.0,
};

const INSTANCE_POSITIONS: [Vec3; 3] = [
    Vec3::new(-3.5, -1.0, 0.0),
    Vec3::new(0.0, 0.5, 0.0),
    Vec3::new(3.5, -1.0, 0.0),
];

struct ReflectanceDemo {
    scene: Scene,
    controller: FreeFlyController,
    params: ShadingParams,
    pass: ReflectancePass,
    models: Vec<GpuModel>,
    model_name: String,
    adapter_name: String,
    fps: f32,
    frame_ms: f32,
}

/// Sphere of radius 2, used when no model is given
fn fallback_model() -> Model {
    let mut mesh = Mesh::sphere(48, 24);
    for vertex in &mut mesh.vertices {
        vertex.position *= 4.0;
    }
    mesh.name = "sphere".to_string();
    Model::from_mesh(mesh)
}

impl ReflectanceDemo {
    fn new(ctx: &mut AppContext, args: &DemoArgs) -> Result<Self, DemoError> {
        let model = match &args.model {
            Some(path) => Model::load(path)?,
            None => {
                log::info!("No --model given, using a generated sphere");
                fallback_model()
            }
        };

        let device = ctx.backend.device();
        let models = vec![GpuModel::upload(device, &model)];
        let pass = ReflectancePass::new(device, ctx.backend.surface_format());

        let mut scene = Scene::new(Camera::default(), PointLight::default());
        for (i, (position, shading)) in INSTANCE_POSITIONS
            .iter()
            .zip(ShadingModel::ALL)
            .enumerate()
        {
            scene.spawn_spinning_model(
                Transform::from_position_scale(*position, Vec3::splat(0.5)),
                ModelRenderer::new(0, shading),
                Spin::new(Vec3::new(0.2, 1.0, 0.3), 0.6 + 0.1 * i as f32),
            );
        }

        let mut controller = FreeFlyController::default();
        controller.sync_with_camera(&scene.camera);

        Ok(Self {
            scene,
            controller,
            params: ShadingParams::default(),
            pass,
            models,
            model_name: model.name,
            adapter_name: ctx.backend.adapter_info().name,
            fps: 0.0,
            frame_ms: 0.0,
        })
    }

    fn light_window(&mut self, ctx: &egui::Context) {
        let light = &mut self.scene.light;
        egui::Window::new("Light Controls")
            .default_pos([10.0, 10.0])
            .show(ctx, |ui| {
                ui.label("Position");
                ui.add(egui::Slider::new(&mut light.position.x, -10.0..=10.0).text("x"));
                ui.add(egui::Slider::new(&mut light.position.y, -10.0..=10.0).text("y"));
                ui.add(egui::Slider::new(&mut light.position.z, -10.0..=10.0).text("z"));
                ui.separator();

                let mut color = light.color.to_array();
                ui.horizontal(|ui| {
                    ui.label("Color");
                    ui.color_edit_button_rgb(&mut color);
                });
                light.color = Vec3::from_array(color);

                ui.add(egui::Slider::new(&mut light.ambient, 0.0..=1.0).text("ambient"));
                ui.add(egui::Slider::new(&mut light.diffuse, 0.0..=2.0).text("diffuse"));
                ui.add(egui::Slider::new(&mut light.specular, 0.0..=2.0).text("specular"));
                ui.separator();

                let cook = &mut self.params.cook_torrance;
                ui.add(egui::Slider::new(&mut cook.roughness, 0.05..=1.0).text("roughness"));
                ui.add(egui::Slider::new(&mut cook.metallic, 0.0..=1.0).text("metallic"));
            });
    }

    fn material_windows(&mut self, ctx: &egui::Context) {
        let phong = &mut self.params.phong;
        egui::Window::new("Phong Material")
            .default_pos([10.0, 330.0])
            .show(ctx, |ui| {
                ui.add(egui::Slider::new(&mut phong.ambient_strength, 0.0..=1.0).text("ambient"));
                ui.add(
                    egui::Slider::new(&mut phong.specular_strength, 0.0..=2.0).text("specular"),
                );
                ui.add(egui::Slider::new(&mut phong.shininess, 1.0..=128.0).text("shininess"));
            });

        let toon = &mut self.params.toon;
        egui::Window::new("Toon")
            .default_pos([10.0, 470.0])
            .show(ctx, |ui| {
                ui.add(egui::Slider::new(&mut toon.bands, 2..=8).text("bands"));
                ui.add(egui::Slider::new(&mut toon.rim_strength, 0.0..=1.0).text("rim"));
            });
    }

    fn stats_panel(&self, ctx: &egui::Context) {
        let position = self.scene.camera.position;
        egui::Window::new("Stats")
            .anchor(egui::Align2::RIGHT_TOP, [-10.0, 10.0])
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(format!("FPS: {:.1} ({:.2} ms)", self.fps, self.frame_ms));
                ui.label(format!(
                    "Camera: ({:.2}, {:.2}, {:.2})",
                    position.x, position.y, position.z
                ));
                ui.label(format!("Draws: {}", self.pass.draw_count()));
                ui.label(format!("Model: {}", self.model_name));
                ui.label(format!("GPU: {}", self.adapter_name));
                ui.separator();
                let labels: Vec<&str> = ShadingModel::ALL.iter().map(|m| m.label()).collect();
                ui.label(format!("Left to right: {}", labels.join(", ")));
            });
    }
}

impl DemoHandler for ReflectanceDemo {
    fn update(&mut self, ctx: &mut AppContext, dt: f32) {
        if let Some(input) = ctx.camera_input() {
            self.controller.update(&mut self.scene.camera, input, dt);
        }
        self.scene.advance(ctx.elapsed);
        self.fps = ctx.fps();
        self.frame_ms = ctx.frame_ms();
    }

    fn ui(&mut self, ctx: &egui::Context) {
        self.light_window(ctx);
        self.material_windows(ctx);
        self.stats_panel(ctx);
    }

    fn render(&mut self, ctx: &AppContext, frame: &mut Frame) {
        self.pass.prepare(
            ctx.backend.queue(),
            &mut self.scene,
            &self.params,
            &self.models,
        );

        let mut pass = begin_scene_pass(
            &mut frame.encoder,
            &frame.view,
            ctx.depth.view(),
            CLEAR_COLOR,
        );
        self.pass.draw(&mut pass, &self.models);
    }

    fn resize(&mut self, ctx: &AppContext) {
        let (width, height) = ctx.surface_extent();
        self.scene.camera.set_aspect(width, height);
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = DemoArgs::parse();
    if let Err(err) = args.validate() {
        log::error!("{}", err);
        std::process::exit(2);
    }

    let config = args.window_config("Reflectance Models");
    let result = app::run(config, args.run_options(), |ctx| {
        ReflectanceDemo::new(ctx, &args)
    });

    if let Err(err) = result {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
