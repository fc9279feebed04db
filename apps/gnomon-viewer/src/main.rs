use anyhow::Result;
use clap::Parser;
use egui::Context as EguiContext;
use glam::{Mat4, Vec2, Vec3};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use gnomon_assets::{load_obj, load_texture, procedural};
use gnomon_common::NodeId;
use gnomon_input::{MouseLook, ViewerAction};
use gnomon_render::{DayCycle, DemoConfig, FrameContext, OrbitCamera};
use gnomon_render_wgpu::SceneRenderer;
use gnomon_scene::{LightBuffer, NodeKind, SceneGraph};
use gnomon_tools::SceneInspector;

const GROUND_TEXTURE: &str = "assets/textures/ground.png";
const CENTERPIECE_OBJ: &str = "assets/models/centerpiece.obj";

#[derive(Parser)]
#[command(name = "gnomon-viewer", about = "Shadow-mapped scene graph demo viewer")]
struct Cli {
    /// Start with the camera auto-revolving
    #[arg(short, long)]
    revolve: bool,

    /// Path to a JSON config file (defaults apply when omitted)
    #[arg(long)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Scene graph plus the node ids the per-frame update drives.
struct SceneContent {
    graph: SceneGraph,
    sun_light: NodeId,
    sun_marker: Option<NodeId>,
}

/// Build the demo scene and upload its assets. Load failures degrade to
/// procedural geometry or an untextured material with a warning.
fn build_scene(
    config: &DemoConfig,
    renderer: &mut SceneRenderer,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> SceneContent {
    let mut graph = SceneGraph::new();

    let ground = graph.create_node();
    {
        let mesh = renderer.upload_mesh(device, &procedural::plane(160.0, 12.0));
        let node = graph.node_mut(ground);
        node.mesh = Some(mesh);
        match load_texture(GROUND_TEXTURE) {
            Ok(pixels) => node.texture = Some(renderer.upload_texture(device, queue, &pixels)),
            Err(err) => {
                tracing::warn!(path = GROUND_TEXTURE, error = %err, "ground texture unavailable");
            }
        }
    }
    graph.add_child(graph.root(), ground);

    // Centerpiece model, or a plain cube when the OBJ is missing.
    let centerpiece = graph.create_node();
    {
        let node_texture;
        let mesh = match load_obj(CENTERPIECE_OBJ) {
            Ok(data) => {
                node_texture = data.diffuse_texture.as_ref().and_then(|name| {
                    let path = Path::new(CENTERPIECE_OBJ).with_file_name(name);
                    match load_texture(&path) {
                        Ok(pixels) => Some(renderer.upload_texture(device, queue, &pixels)),
                        Err(err) => {
                            tracing::warn!(path = %path.display(), error = %err, "model texture unavailable");
                            None
                        }
                    }
                });
                renderer.upload_mesh(device, &data)
            }
            Err(err) => {
                tracing::warn!(path = CENTERPIECE_OBJ, error = %err, "model unavailable, using a cube");
                node_texture = None;
                renderer.upload_mesh(device, &procedural::cube(10.0))
            }
        };
        let node = graph.node_mut(centerpiece);
        node.mesh = Some(mesh);
        node.texture = node_texture;
        node.transform.position = Vec3::new(0.0, 14.0, -20.0);
        node.transform.rotation.y = 0.6;
    }
    graph.add_child(graph.root(), centerpiece);

    // A pedestal with a child satellite: the satellite's pivot sits back at
    // the pedestal center, so its rotation swings it around the parent and
    // the transform chain is visible on screen.
    let pedestal = graph.create_node();
    {
        let mesh = renderer.upload_mesh(device, &procedural::cube(6.0));
        let node = graph.node_mut(pedestal);
        node.mesh = Some(mesh);
        node.transform.position = Vec3::new(36.0, 6.0, -36.0);
    }
    graph.add_child(graph.root(), pedestal);

    let satellite = graph.create_node();
    {
        let mesh = renderer.upload_mesh(device, &procedural::cube(3.0));
        let node = graph.node_mut(satellite);
        node.mesh = Some(mesh);
        node.transform.position = Vec3::new(0.0, 16.0, 0.0);
        node.transform.reference_point = Vec3::new(0.0, -16.0, 0.0);
        node.transform.rotation.z = 0.7;
    }
    graph.add_child(pedestal, satellite);

    let sun_light = graph.create_node();
    {
        let node = graph.node_mut(sun_light);
        node.kind = NodeKind::PointLight;
        node.light_color = Vec3::new(1.0, 0.93, 0.78);
    }
    graph.add_child(graph.root(), sun_light);

    let sun_marker = config.show_sun_marker.then(|| {
        let id = graph.create_node();
        let mesh = renderer.upload_mesh(device, &procedural::cube(6.0));
        graph.node_mut(id).mesh = Some(mesh);
        graph.add_child(graph.root(), id);
        id
    });

    SceneContent {
        graph,
        sun_light,
        sun_marker,
    }
}

/// Everything the frame update reads and writes, independent of the GPU.
struct AppState {
    config: DemoConfig,
    camera: OrbitCamera,
    day: DayCycle,
    lights: LightBuffer,
    mouse_look: MouseLook,
    show_overlay: bool,
    cursor_captured: bool,
    last_frame: Instant,
    frame_time: f32,
}

impl AppState {
    fn new(config: DemoConfig, revolve: bool) -> Self {
        let mut camera = OrbitCamera {
            radius: config.orbit_radius,
            ..Default::default()
        };
        if revolve {
            camera.toggle_revolve(config.revolve_speed);
        }
        Self {
            day: DayCycle::new(config.sim_seconds_per_hour, config.light_distance),
            lights: LightBuffer::new(config.light_capacity),
            mouse_look: MouseLook::new(config.mouse_sensitivity),
            config,
            camera,
            show_overlay: false,
            cursor_captured: false,
            last_frame: Instant::now(),
            frame_time: 0.0,
        }
    }

    /// Step the clocks and produce this frame's context. The scene graph is
    /// updated and propagated here, so every matrix a render pass reads is
    /// fresh.
    fn update(&mut self, scene: &mut SceneContent, dt: f32) -> FrameContext {
        self.frame_time = dt;
        self.day.advance(f64::from(dt));
        self.camera.update(dt);
        let sun = self.day.sun_state();

        scene
            .graph
            .node_mut(scene.sun_light)
            .transform
            .position = sun.light_position;
        if let Some(marker) = scene.sun_marker {
            scene.graph.node_mut(marker).transform.position = sun.light_position;
        }

        let mut ctx = FrameContext::compose(&self.camera, &sun, self.day.day_progress());
        scene
            .graph
            .propagate(Mat4::IDENTITY, ctx.view_projection, &mut self.lights);
        if let Some(first) = self.lights.lights().first() {
            ctx.sun_color = first.color;
        }
        ctx
    }

    fn draw_overlay(&self, ctx: &EguiContext, scene: &SceneContent) {
        if !self.show_overlay {
            return;
        }
        let summary = SceneInspector::summary(&scene.graph, &self.lights);
        egui::Window::new("gnomon").default_width(280.0).show(ctx, |ui| {
            ui.label(format!("Frame: {:.2} ms", self.frame_time * 1000.0));
            ui.label(format!(
                "Camera: yaw {:.1}° pitch {:.1}° radius {:.0}",
                self.camera.yaw, self.camera.pitch, self.camera.radius
            ));
            ui.label(if self.camera.is_revolving() {
                "Mode: revolving (R to stop)"
            } else {
                "Mode: manual orbit (R to revolve)"
            });
            ui.separator();
            let sun = self.day.sun_state();
            ui.label(format!("Day progress: {:.1}%", self.day.day_progress() * 100.0));
            ui.label(format!(
                "Sun dir: ({:.2}, {:.2}, {:.2})  daylight {:.2}",
                sun.sun_dir.x, sun.sun_dir.y, sun.sun_dir.z, sun.day_factor
            ));
            ui.separator();
            ui.label(format!("{summary}"));
            for (i, light) in self.lights.lights().iter().enumerate() {
                ui.label(format!(
                    "light[{i}] pos=({:.0}, {:.0}, {:.0})",
                    light.position.x, light.position.y, light.position.z
                ));
            }
            ui.separator();
            ui.small("F1: overlay | R: revolve | Esc: release cursor | click: capture");
        });
    }
}

struct GpuApp {
    state: AppState,
    scene: Option<SceneContent>,
    window: Option<Arc<Window>>,
    surface: Option<wgpu::Surface<'static>>,
    device: Option<wgpu::Device>,
    queue: Option<wgpu::Queue>,
    config: Option<wgpu::SurfaceConfiguration>,
    renderer: Option<SceneRenderer>,
    egui_ctx: EguiContext,
    egui_winit: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
}

impl GpuApp {
    fn new(config: DemoConfig, revolve: bool) -> Self {
        Self {
            state: AppState::new(config, revolve),
            scene: None,
            window: None,
            surface: None,
            device: None,
            queue: None,
            config: None,
            renderer: None,
            egui_ctx: EguiContext::default(),
            egui_winit: None,
            egui_renderer: None,
        }
    }

    fn window_center(&self) -> Vec2 {
        let size = self
            .window
            .as_ref()
            .map(|w| w.inner_size())
            .unwrap_or(PhysicalSize::new(1, 1));
        Vec2::new(size.width as f32 / 2.0, size.height as f32 / 2.0)
    }

    fn warp_cursor_to_center(&self) {
        if let Some(window) = &self.window {
            let center = self.window_center();
            if let Err(err) =
                window.set_cursor_position(PhysicalPosition::new(center.x, center.y))
            {
                tracing::debug!(error = %err, "cursor warp unsupported");
            }
        }
    }

    fn set_cursor_captured(&mut self, captured: bool) {
        self.state.cursor_captured = captured;
        self.state.mouse_look.reset();
        if let Some(window) = &self.window {
            window.set_cursor_visible(!captured);
        }
        if captured {
            self.warp_cursor_to_center();
        }
    }

    fn action_for_key(key: KeyCode) -> ViewerAction {
        match key {
            KeyCode::KeyR => ViewerAction::ToggleRevolve,
            KeyCode::F1 => ViewerAction::ToggleOverlay,
            KeyCode::Escape => ViewerAction::ReleaseCursor,
            _ => ViewerAction::Noop,
        }
    }

    fn apply_action(&mut self, action: ViewerAction) {
        match action {
            ViewerAction::Look {
                delta_yaw,
                delta_pitch,
            } => {
                self.state.camera.apply_look(delta_yaw, delta_pitch);
                self.warp_cursor_to_center();
            }
            ViewerAction::ToggleRevolve => {
                let speed = self.state.config.revolve_speed;
                self.state.camera.toggle_revolve(speed);
                tracing::debug!(revolving = self.state.camera.is_revolving(), "revolve toggled");
            }
            ViewerAction::ToggleOverlay => {
                self.state.show_overlay = !self.state.show_overlay;
            }
            ViewerAction::ReleaseCursor => self.set_cursor_captured(false),
            ViewerAction::CaptureCursor => self.set_cursor_captured(true),
            ViewerAction::Noop => {}
        }
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        let dt = (now - self.state.last_frame).as_secs_f32().min(0.1);
        self.state.last_frame = now;

        let Some(scene) = &mut self.scene else {
            return;
        };
        let frame = self.state.update(scene, dt);

        let (Some(surface), Some(device), Some(queue)) =
            (&self.surface, &self.device, &self.queue)
        else {
            return;
        };

        let output = match surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                if let Some(config) = &self.config {
                    surface.configure(device, config);
                }
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        if let Some(renderer) = &mut self.renderer {
            renderer.render(device, queue, &view, &scene.graph, &frame, &self.state.lights);
        }

        let raw_input = self
            .egui_winit
            .as_mut()
            .expect("egui initialized with the window")
            .take_egui_input(self.window.as_ref().expect("window exists while drawing"));
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            self.state.draw_overlay(ctx, self.scene.as_ref().expect("scene built"));
        });

        self.egui_winit
            .as_mut()
            .expect("egui initialized")
            .handle_platform_output(
                self.window.as_ref().expect("window exists"),
                full_output.platform_output,
            );
        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let surface_config = self.config.as_ref().expect("surface configured");
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [surface_config.width, surface_config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        {
            let egui_renderer = self.egui_renderer.as_mut().expect("egui renderer built");
            for (id, image_delta) in &full_output.textures_delta.set {
                egui_renderer.update_texture(device, queue, *id, image_delta);
            }
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui_encoder"),
            });
            egui_renderer.update_buffers(device, queue, &mut encoder, &paint_jobs, &screen_descriptor);
            {
                let mut pass = encoder
                    .begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("egui_pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: &view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Load,
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: None,
                        ..Default::default()
                    })
                    .forget_lifetime();
                egui_renderer.render(&mut pass, &paint_jobs, &screen_descriptor);
            }
            queue.submit(std::iter::once(encoder.finish()));
            for id in &full_output.textures_delta.free {
                egui_renderer.free_texture(id);
            }
        }

        output.present();
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title(self.state.config.window_title.clone())
            .with_inner_size(PhysicalSize::new(
                self.state.config.window_width,
                self.state.config.window_height,
            ));
        let window = Arc::new(event_loop.create_window(attrs).expect("create window"));

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .expect("create surface");
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .expect("find adapter");
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("gnomon_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .expect("create device");

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        self.state.camera.set_aspect(size.width, size.height);

        let mut renderer = SceneRenderer::new(
            &device,
            &queue,
            surface_format,
            size.width,
            size.height,
            self.state.config.shadow_resolution,
        );
        let scene = build_scene(&self.state.config, &mut renderer, &device, &queue);
        let summary = SceneInspector::summary(&scene.graph, &self.state.lights);
        tracing::info!(
            nodes = scene.graph.count_nodes(scene.graph.root()),
            %summary,
            "scene built"
        );

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            backend = adapter.get_info().backend.to_str(),
            "GPU initialized"
        );

        self.window = Some(window);
        self.surface = Some(surface);
        self.device = Some(device);
        self.queue = Some(queue);
        self.config = Some(config);
        self.renderer = Some(renderer);
        self.scene = Some(scene);
        self.egui_winit = Some(egui_winit);
        self.egui_renderer = Some(egui_renderer);
        self.set_cursor_captured(true);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let (Some(egui_winit), Some(window)) = (&mut self.egui_winit, &self.window) {
            let response = egui_winit.on_window_event(window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let (Some(surface), Some(device), Some(config)) =
                    (&self.surface, &self.device, &mut self.config)
                {
                    config.width = new_size.width.max(1);
                    config.height = new_size.height.max(1);
                    surface.configure(device, config);
                    self.state.camera.set_aspect(config.width, config.height);
                    if let Some(renderer) = &mut self.renderer {
                        renderer.resize(device, config.width, config.height);
                    }
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                self.apply_action(Self::action_for_key(key));
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state: ElementState::Pressed,
                ..
            } => {
                if !self.state.cursor_captured {
                    self.apply_action(ViewerAction::CaptureCursor);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.state.cursor_captured {
                    let center = self.window_center();
                    let sample = Vec2::new(position.x as f32, position.y as f32);
                    let (delta_yaw, delta_pitch) =
                        self.state.mouse_look.sample(sample, center);
                    // Screen Y grows downward; pushing the mouse up looks up.
                    self.apply_action(ViewerAction::Look {
                        delta_yaw,
                        delta_pitch: -delta_pitch,
                    });
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = match &cli.config {
        Some(path) => DemoConfig::load(path)?,
        None => DemoConfig::default(),
    };
    tracing::info!(
        day_length_s = config.sim_seconds_per_hour * 24.0,
        orbit_radius = config.orbit_radius,
        lights = config.light_capacity,
        "gnomon-viewer starting"
    );

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(config, cli.revolve);
    event_loop.run_app(&mut app)?;

    Ok(())
}
