use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use glam::{Mat4, Vec2, Vec3};

mod assets;
mod mesh;
mod noise;
mod renderer;
mod ui;

use mesh::{MeshEngine, MeshResult, TriangleMesh, generate_grid};
use renderer::{FrameParams, GpuState, OrbitCamera, RenderState};
use ui::{FrameStats, UiActions, UiState, apply_theme, draw_help_overlay, draw_side_panel};

/// Uniform scale applied to the unit-ish grid so it fills the default view.
const MODEL_SCALE: f32 = 25.0;

/// Extents of the generated plane before the model transform. The x/z spans
/// give the field its 2:1 footprint; y only scales vertex heights, which are
/// zero at generation time.
const GRID_SIZE: Vec3 = Vec3::new(1.0, 0.05, 0.5);

#[derive(Default)]
struct InputState {
    orbiting: bool,
    mouse_delta: Vec2,
}

struct App {
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    render_state: Option<RenderState>,
    egui_state: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
    egui_ctx: egui::Context,

    camera: OrbitCamera,
    mesh_engine: MeshEngine,
    ui_state: UiState,
    input: InputState,

    // CPU copy of the last uploaded mesh, kept so export never has to read
    // the GPU back.
    current_mesh: Option<TriangleMesh>,
    field_time: f32,
    last_error: Option<String>,

    stats: FrameStats,
    last_frame: Instant,
    frame_count: u32,
    fps_timer: Instant,

    last_vsync_state: bool,
    last_frame_time: Instant,
}

impl App {
    fn new() -> Self {
        Self {
            window: None,
            gpu: None,
            render_state: None,
            egui_state: None,
            egui_renderer: None,
            egui_ctx: egui::Context::default(),

            camera: OrbitCamera::default(),
            mesh_engine: MeshEngine::new(),
            ui_state: UiState::default(),
            input: InputState::default(),

            current_mesh: None,
            field_time: 0.0,
            last_error: None,

            stats: FrameStats::default(),
            last_frame: Instant::now(),
            frame_count: 0,
            fps_timer: Instant::now(),

            last_vsync_state: false,
            last_frame_time: Instant::now(),
        }
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> Result<(), String> {
        let gpu = pollster::block_on(GpuState::new(window.clone()))?;

        let egui_state = egui_winit::State::new(
            self.egui_ctx.clone(),
            self.egui_ctx.viewport_id(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            Some(2048),
        );

        let egui_renderer =
            egui_wgpu::Renderer::new(&gpu.device, gpu.config.format, None, 1, false);

        apply_theme(&self.egui_ctx);

        let shader_source = assets::load_shader_source()?;
        let surface_pixels = assets::load_surface_texture()?;

        let mut render_state = RenderState::new(
            &gpu.device,
            &gpu.queue,
            gpu.config.format,
            &shader_source,
            &surface_pixels,
            gpu.wireframe_supported,
        )?;

        // A mesh on disk takes priority over the generated grid. Failing to
        // parse a file the user put there is a startup error, not something
        // to silently paper over.
        let mesh = if Path::new(assets::MESH_PATH).exists() {
            let loaded = assets::load_mesh(Path::new(assets::MESH_PATH))
                .map_err(|e| format!("load {}: {}", assets::MESH_PATH, e))?;
            log::info!(
                "loaded {} ({} vertices)",
                assets::MESH_PATH,
                loaded.vertex_count()
            );
            loaded
        } else {
            generate_grid(
                self.ui_state.resolution_x,
                self.ui_state.resolution_z,
                GRID_SIZE,
            )
        };

        render_state.mesh_buffers.upload(&gpu.queue, &mesh);
        self.stats.vertex_count = mesh.vertex_count() as u32;
        self.stats.triangle_count = (mesh.index_count() / 3) as u32;
        self.current_mesh = Some(mesh);

        self.camera
            .set_aspect(gpu.config.width as f32, gpu.config.height as f32);

        self.window = Some(window);
        self.gpu = Some(gpu);
        self.render_state = Some(render_state);
        self.egui_state = Some(egui_state);
        self.egui_renderer = Some(egui_renderer);

        Ok(())
    }

    fn update(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        // The field clock only advances while the rate is nonzero, so a rate
        // of 0 freezes the relief in place rather than rewinding it.
        self.field_time += dt * self.ui_state.rate;

        self.frame_count += 1;
        if self.fps_timer.elapsed().as_secs_f32() >= 1.0 {
            self.stats.fps = self.frame_count as f32 / self.fps_timer.elapsed().as_secs_f32();
            self.frame_count = 0;
            self.fps_timer = Instant::now();
        }
        self.stats.frame_ms = dt * 1000.0;

        if self.input.orbiting {
            self.camera.process_mouse_movement(self.input.mouse_delta);
        }
        self.input.mouse_delta = Vec2::ZERO;

        self.drain_mesh_results();
    }

    fn drain_mesh_results(&mut self) {
        while let Some(result) = self.mesh_engine.try_recv_result() {
            match result {
                MeshResult::Grid { mesh, elapsed_ms } => {
                    if let (Some(gpu), Some(render_state)) =
                        (&self.gpu, &mut self.render_state)
                    {
                        render_state.mesh_buffers.upload(&gpu.queue, &mesh);
                    }
                    self.stats.vertex_count = mesh.vertex_count() as u32;
                    self.stats.triangle_count = (mesh.index_count() / 3) as u32;
                    self.stats.last_generation_ms = elapsed_ms;
                    self.current_mesh = Some(mesh);
                    self.last_error = None;
                }
                MeshResult::Exported { path } => {
                    log::info!("mesh exported to {path}");
                    self.last_error = None;
                }
                MeshResult::Error(e) => {
                    log::error!("{e}");
                    self.last_error = Some(e);
                }
            }
        }
    }

    fn render(&mut self, event_loop: &ActiveEventLoop) {
        if self.ui_state.fps_cap_enabled {
            let frame_duration = Duration::from_secs_f64(1.0 / self.ui_state.fps_cap as f64);
            let elapsed = self.last_frame_time.elapsed();
            if elapsed < frame_duration {
                std::thread::sleep(frame_duration - elapsed);
            }
        }
        self.last_frame_time = Instant::now();

        // Initialization put all of these in place; losing any of them
        // mid-run means the frame can never be drawn again.
        if self.gpu.is_none() || self.render_state.is_none() || self.current_mesh.is_none() {
            log::error!("rendering resources missing, shutting down");
            self.mesh_engine.stop();
            event_loop.exit();
            return;
        }

        let (Some(window), Some(egui_state)) = (&self.window, &mut self.egui_state) else {
            return;
        };

        let raw_input = egui_state.take_egui_input(window);

        let last_error = self
            .last_error
            .clone()
            .or_else(|| self.mesh_engine.last_error());
        let camera_distance = self.camera.distance;
        let wireframe_supported = self
            .gpu
            .as_ref()
            .is_some_and(|gpu| gpu.wireframe_supported);

        let mut ui_actions = UiActions::default();

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            ui_actions = draw_side_panel(
                ctx,
                &mut self.ui_state,
                &self.stats,
                &last_error,
                wireframe_supported,
            );
            draw_help_overlay(ctx, camera_distance);
        });

        self.handle_ui_actions(ui_actions);

        let Some(gpu) = &mut self.gpu else { return };
        let Some(render_state) = &mut self.render_state else {
            return;
        };
        let Some(window) = &self.window else { return };
        let Some(egui_state) = &mut self.egui_state else {
            return;
        };
        let Some(egui_renderer) = &mut self.egui_renderer else {
            return;
        };

        egui_state.handle_platform_output(window, full_output.platform_output);

        if self.ui_state.vsync_enabled != self.last_vsync_state {
            gpu.set_vsync(self.ui_state.vsync_enabled);
            self.last_vsync_state = self.ui_state.vsync_enabled;
        }

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.resize(gpu.size);
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("out of GPU memory, shutting down");
                self.mesh_engine.stop();
                event_loop.exit();
                return;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        render_state.write_frame_uniforms(
            &gpu.queue,
            &FrameParams {
                time: self.field_time,
                amplitude: self.ui_state.amplitude,
                octaves: self.ui_state.octaves,
                lacunarity: self.ui_state.lacunarity,
                falloff_enabled: self.ui_state.falloff_enabled,
                model: Mat4::from_scale(Vec3::splat(MODEL_SCALE)),
            },
        );
        render_state.update_camera(&gpu.queue, &self.camera);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, delta) in full_output.textures_delta.set {
            egui_renderer.update_texture(&gpu.device, &gpu.queue, id, &delta);
        }

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Main Encoder"),
            });

        egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        // Map passes always run first so the mesh pass samples this frame's
        // field, not last frame's.
        render_state.render_displacement(&mut encoder);
        render_state.render_normal_map(&mut encoder);

        if self.ui_state.show_maps {
            render_state.render_map_overlays(
                &view,
                &mut encoder,
                gpu.config.width,
                gpu.config.height,
            );
        }
        render_state.render_mesh(
            &view,
            &gpu.depth_texture,
            &mut encoder,
            !self.ui_state.show_maps,
            self.ui_state.wireframe,
        );

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut render_pass = render_pass.forget_lifetime();
            egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        for id in full_output.textures_delta.free {
            egui_renderer.free_texture(&id);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        window.request_redraw();
    }

    fn handle_ui_actions(&mut self, actions: UiActions) {
        if actions.regenerate_mesh {
            self.mesh_engine.generate(
                self.ui_state.resolution_x,
                self.ui_state.resolution_z,
                GRID_SIZE,
            );
        }

        if actions.export_mesh {
            if let Some(mesh) = &self.current_mesh {
                self.mesh_engine
                    .export(PathBuf::from(assets::EXPORT_PATH), mesh.clone());
            }
        }

        if actions.reload_shaders {
            self.reload_shaders();
        }

        if actions.reset_camera {
            self.camera.reset();
        }
    }

    fn reload_shaders(&mut self) {
        let (Some(gpu), Some(render_state)) = (&self.gpu, &mut self.render_state) else {
            return;
        };

        let source = match assets::load_shader_source() {
            Ok(s) => s,
            Err(e) => {
                log::error!("{e}");
                self.last_error = Some(e);
                return;
            }
        };

        match render_state.rebuild_pipelines(&gpu.device, gpu.config.format, &source) {
            Ok(()) => {
                log::info!("shader pipelines rebuilt");
                self.last_error = None;
            }
            Err(e) => {
                log::error!("{e}");
                self.last_error = Some(e);
            }
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: KeyCode, pressed: bool) {
        if !pressed {
            return;
        }

        match key {
            KeyCode::Escape => {
                self.mesh_engine.stop();
                event_loop.exit();
            }
            KeyCode::KeyS => self.reload_shaders(),
            KeyCode::KeyT => self.ui_state.show_maps = !self.ui_state.show_maps,
            KeyCode::KeyQ => self.ui_state.falloff_enabled = !self.ui_state.falloff_enabled,
            KeyCode::KeyW => {
                if self.gpu.as_ref().is_some_and(|gpu| gpu.wireframe_supported) {
                    self.ui_state.wireframe = !self.ui_state.wireframe;
                }
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let window_attrs = Window::default_attributes()
            .with_title("Noise Field")
            .with_inner_size(PhysicalSize::new(1280, 720));

        let window = match event_loop.create_window(window_attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        if let Err(e) = self.init_gpu(window) {
            log::error!("startup failed: {e}");
            self.mesh_engine.stop();
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(egui_state) = &mut self.egui_state {
            if let Some(window) = &self.window {
                let response = egui_state.on_window_event(window, &event);
                if response.consumed {
                    return;
                }
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                self.mesh_engine.stop();
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(size);
                    self.camera
                        .set_aspect(size.width as f32, size.height as f32);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.handle_key(event_loop, key, event.state == ElementState::Pressed);
                }
            }

            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                self.input.orbiting = state == ElementState::Pressed;
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    winit::event::MouseScrollDelta::LineDelta(_, y) => y,
                    winit::event::MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
                self.camera.process_scroll(scroll);
            }

            WindowEvent::RedrawRequested => {
                self.update();
                self.render(event_loop);
            }

            _ => {}
        }
    }

    fn device_event(&mut self, _: &ActiveEventLoop, _: winit::event::DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.input.orbiting {
                self.input.mouse_delta.x += delta.0 as f32;
                self.input.mouse_delta.y += delta.1 as f32;
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() {
    env_logger::init();

    let event_loop = EventLoop::new().unwrap();
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app).unwrap();
}
