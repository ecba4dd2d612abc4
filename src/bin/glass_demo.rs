//! Refractive glass model inside an HDR environment
//!
//! Run with:
//!   cargo run --bin glass_demo -- --hdr path/to/environment.hdr --model path/to/model.glb
//!   cargo run --bin glass_demo -- --skybox-faces path/to/skybox/

use clap::Parser;
use glam::Vec3;
use reflectance_lab::{
    app::{self, AppContext, DemoError, DemoHandler},
    backend::{Frame, WgpuBackend},
    config::DemoArgs,
    pipeline::{
        begin_scene_pass,
        glass_pass::{fresnel, schlick_f0},
        GlassParams, GlassPass, HdrConverter, ReflectancePass, SkyboxParams, SkyboxPass,
    },
    resources::{load_face_images, Cubemap, GpuModel, HdrImage, HdrTexture, Mesh, Model},
    scene::{
        Camera, CameraController, FreeFlyController, ModelRenderer, PointLight, Scene, Spin,
        Transform,
    },
    shading::{ShadingModel, ShadingParams},
};

const PROCEDURAL_SKY_SIZE: (u32, u32) = (1024, 512);

/// How the model surface is shaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SurfaceMode {
    Glass,
    Reflectance(ShadingModel),
}

struct GlassDemo {
    scene: Scene,
    controller: FreeFlyController,
    glass_params: GlassParams,
    sky_params: SkyboxParams,
    shading_params: ShadingParams,
    mode: SurfaceMode,
    skybox: SkyboxPass,
    glass: GlassPass,
    reflectance: ReflectancePass,
    models: Vec<GpuModel>,
    environment_label: String,
    fps: f32,
    frame_ms: f32,
    // Kept alive for the bind groups above
    _environment: Cubemap,
}

fn load_environment(backend: &WgpuBackend, args: &DemoArgs) -> Result<(Cubemap, String), DemoError> {
    let device = backend.device();
    let queue = backend.queue();

    if let Some(dir) = &args.skybox_faces {
        let faces = load_face_images(dir)?;
        let cubemap = Cubemap::from_faces(device, queue, &faces)?;
        return Ok((cubemap, format!("faces in {}", dir.display())));
    }

    let (image, label) = match &args.hdr {
        Some(path) => (HdrImage::load(path)?, path.display().to_string()),
        None => {
            log::info!("No --hdr given, using a procedural sky");
            let (width, height) = PROCEDURAL_SKY_SIZE;
            (HdrImage::procedural_sky(width, height), "procedural sky".to_string())
        }
    };

    let converter = HdrConverter::new(device, args.cubemap_size)?;
    let cubemap = if args.cpu_convert {
        let faces = HdrConverter::convert_cpu(&image, converter.size());
        let cubemap = Cubemap::from_hdr_faces(device, queue, converter.size(), &faces)?;
        converter.generate_mipmaps(device, queue, &cubemap)?;
        cubemap
    } else {
        let source = HdrTexture::upload(device, queue, &image);
        let cubemap = Cubemap::new(device, converter.size());
        converter.convert(device, queue, &source, &cubemap)?;
        cubemap
    };

    Ok((cubemap, label))
}

fn fallback_model() -> Model {
    let mut mesh = Mesh::sphere(64, 32);
    for vertex in &mut mesh.vertices {
        vertex.position *= 3.0;
    }
    mesh.name = "sphere".to_string();
    Model::from_mesh(mesh)
}

impl GlassDemo {
    fn new(ctx: &mut AppContext, args: &DemoArgs) -> Result<Self, DemoError> {
        let model = match &args.model {
            Some(path) => Model::load(path)?,
            None => fallback_model(),
        };
        let (environment, environment_label) = load_environment(&ctx.backend, args)?;

        let device = ctx.backend.device();
        let format = ctx.backend.surface_format();
        let skybox = SkyboxPass::new(device, format, &environment);
        let glass = GlassPass::new(device, format, &environment);
        let reflectance = ReflectancePass::new(device, format);
        let models = vec![GpuModel::upload(device, &model)];

        let mut scene = Scene::new(Camera::default(), PointLight::default());
        scene.spawn_spinning_model(
            Transform::from_position(Vec3::ZERO),
            ModelRenderer::new(0, ShadingModel::CookTorrance),
            Spin::new(Vec3::Y, 0.2),
        );
        scene.camera.look_at(Vec3::ZERO);

        let mut controller = FreeFlyController::default();
        controller.sync_with_camera(&scene.camera);

        Ok(Self {
            scene,
            controller,
            glass_params: GlassParams::default(),
            sky_params: SkyboxParams::default(),
            shading_params: ShadingParams::default(),
            mode: SurfaceMode::Glass,
            skybox,
            glass,
            reflectance,
            models,
            environment_label,
            fps: 0.0,
            frame_ms: 0.0,
            _environment: environment,
        })
    }

    fn glass_window(&mut self, ctx: &egui::Context) {
        let params = &mut self.glass_params;
        let sky = &mut self.sky_params;
        egui::Window::new("Glass")
            .default_pos([10.0, 10.0])
            .show(ctx, |ui| {
                ui.add(egui::Slider::new(&mut params.ior, 1.0..=2.5).text("ior"));
                ui.add(egui::Slider::new(&mut params.dispersion, 0.0..=0.1).text("dispersion"));
                ui.add(
                    egui::Slider::new(&mut params.fresnel_power, 1.0..=8.0).text("fresnel power"),
                );

                let mut tint = params.tint.to_array();
                ui.horizontal(|ui| {
                    ui.label("Tint");
                    ui.color_edit_button_rgb(&mut tint);
                });
                params.tint = Vec3::from_array(tint);

                ui.add(egui::Slider::new(&mut params.transmission, 0.0..=1.0).text("transmission"));
                ui.add(egui::Slider::new(&mut params.roughness, 0.0..=1.0).text("roughness"));
                ui.add(egui::Slider::new(&mut params.exposure, 0.1..=4.0).text("exposure"));
                ui.add(
                    egui::Slider::new(&mut sky.rotation, -std::f32::consts::PI..=std::f32::consts::PI)
                        .text("skybox rotation"),
                );
                ui.separator();

                ui.label(format!("F0: {:.4}", schlick_f0(params.ior)));
                ui.label(format!(
                    "Reflectance at 60°: {:.3}",
                    fresnel(params.ior, 0.5, params.fresnel_power)
                ));
            });
    }

    fn reflectance_window(&mut self, ctx: &egui::Context) {
        let mut use_reflectance = matches!(self.mode, SurfaceMode::Reflectance(_));
        let mut model = match self.mode {
            SurfaceMode::Reflectance(model) => model,
            SurfaceMode::Glass => ShadingModel::CookTorrance,
        };

        egui::Window::new("Reflectance")
            .default_pos([10.0, 380.0])
            .show(ctx, |ui| {
                ui.checkbox(&mut use_reflectance, "Use reflectance model");
                ui.add_enabled_ui(use_reflectance, |ui| {
                    for candidate in ShadingModel::ALL {
                        ui.radio_value(&mut model, candidate, candidate.label());
                    }
                });
            });

        let mode = if use_reflectance {
            SurfaceMode::Reflectance(model)
        } else {
            SurfaceMode::Glass
        };
        if mode != self.mode {
            if let SurfaceMode::Reflectance(model) = mode {
                self.scene.set_all_shading(model);
            }
            log::info!("Surface mode: {:?}", mode);
            self.mode = mode;
        }
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
                ui.label(format!("Environment: {}", self.environment_label));
            });
    }
}

impl DemoHandler for GlassDemo {
    fn update(&mut self, ctx: &mut AppContext, dt: f32) {
        if let Some(input) = ctx.camera_input() {
            self.controller.update(&mut self.scene.camera, input, dt);
        }
        self.scene.advance(ctx.elapsed);
        self.sky_params = self.sky_params.with_exposure(self.glass_params.exposure);
        self.fps = ctx.fps();
        self.frame_ms = ctx.frame_ms();
    }

    fn ui(&mut self, ctx: &egui::Context) {
        self.glass_window(ctx);
        self.reflectance_window(ctx);
        self.stats_panel(ctx);
    }

    fn render(&mut self, ctx: &AppContext, frame: &mut Frame) {
        let queue = ctx.backend.queue();
        self.skybox
            .update_uniforms(queue, &self.scene.camera, &self.sky_params);

        match self.mode {
            SurfaceMode::Glass => self.glass.prepare(
                queue,
                &mut self.scene,
                &self.glass_params,
                self.sky_params.rotation,
                &self.models,
            ),
            SurfaceMode::Reflectance(_) => self.reflectance.prepare(
                queue,
                &mut self.scene,
                &self.shading_params,
                &self.models,
            ),
        }

        let mut pass = begin_scene_pass(
            &mut frame.encoder,
            &frame.view,
            ctx.depth.view(),
            wgpu::Color::BLACK,
        );
        match self.mode {
            SurfaceMode::Glass => self.glass.draw(&mut pass, &self.models),
            SurfaceMode::Reflectance(_) => self.reflectance.draw(&mut pass, &self.models),
        }
        // Last, so only uncovered pixels run the skybox shader
        self.skybox.draw(&mut pass);
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

    let config = args.window_config("Glass");
    let result = app::run(config, args.run_options(), |ctx| GlassDemo::new(ctx, &args));

    if let Err(err) = result {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
