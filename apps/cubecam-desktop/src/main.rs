use anyhow::{Context as _, Result};
use cubecam_render::{RenderLoop, Viewport};
use cubecam_render_wgpu::{OrbitControls, WgpuRenderer};
use cubecam_scene::{Config, Stage, build_stage};
use cubecam_tools::{DebugPanel, stats_overlay};
use egui::Context as EguiContext;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

const INITIAL_SIZE: PhysicalSize<u32> = PhysicalSize::new(1280, 720);

/// Preferred on-screen MSAA sample count when the surface format allows it.
const MSAA_SAMPLES: u32 = 4;

/// Pixels of trackpad scroll that count as one wheel step.
const PIXELS_PER_WHEEL_STEP: f32 = 50.0;

#[derive(Debug, Default)]
struct Pointer {
    position: Option<(f32, f32)>,
    rotating: bool,
    panning: bool,
}

/// Application state.
struct AppState {
    stage: Stage,
    config: Config,
    panel: DebugPanel,
    render_loop: RenderLoop,
    controls: OrbitControls,
    viewport: Viewport,
    pointer: Pointer,
}

impl AppState {
    fn new() -> Self {
        let config = Config::default();
        let mut stage = build_stage(&config);
        let mut viewport = Viewport::new(INITIAL_SIZE.width, INITIAL_SIZE.height);
        viewport.resize(&mut stage.camera, INITIAL_SIZE.width, INITIAL_SIZE.height);
        let controls = OrbitControls::for_camera(&stage.camera);

        Self {
            stage,
            config,
            panel: DebugPanel::new(),
            render_loop: RenderLoop::new(),
            controls,
            viewport,
            pointer: Pointer::default(),
        }
    }

    fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        if pressed && key == KeyCode::F1 {
            self.panel.toggle();
        }
    }

    fn handle_button(&mut self, button: MouseButton, pressed: bool) {
        match button {
            MouseButton::Left => self.pointer.rotating = pressed,
            MouseButton::Right => self.pointer.panning = pressed,
            _ => {}
        }
    }

    fn pointer_moved(&mut self, x: f32, y: f32) {
        if let Some((last_x, last_y)) = self.pointer.position {
            let (dx, dy) = (x - last_x, y - last_y);
            let height = self.viewport.size().1 as f32;
            if self.pointer.rotating {
                self.controls.rotate(&mut self.stage.camera, dx, dy, height);
            } else if self.pointer.panning {
                self.controls.pan(&mut self.stage.camera, dx, dy, height);
            }
        }
        self.pointer.position = Some((x, y));
    }

    fn wheel(&mut self, delta: MouseScrollDelta) {
        let steps = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_WHEEL_STEP,
        };
        self.controls.zoom(&mut self.stage.camera, steps);
    }

    fn draw_ui(&mut self, ctx: &EguiContext) {
        for change in self.panel.show(ctx, &mut self.config) {
            change.apply(&mut self.stage);
        }
        stats_overlay(ctx, self.render_loop.stats());
    }
}

/// Window, surface and everything drawn into it. Exists once the event loop
/// has resumed.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    renderer: WgpuRenderer,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Gpu {
    fn new(event_loop: &ActiveEventLoop, egui_ctx: &EguiContext, stage: &Stage) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title("cubecam")
            .with_inner_size(INITIAL_SIZE);
        let window = Arc::new(event_loop.create_window(attrs).context("create window")?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("create surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("find adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("cubecam_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("create device")?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format =
            pick_surface_format(&surface_caps.formats).context("surface reports no formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let sample_count = if adapter
            .get_texture_format_features(surface_format)
            .flags
            .sample_count_supported(MSAA_SAMPLES)
        {
            MSAA_SAMPLES
        } else {
            1
        };

        let renderer = WgpuRenderer::new(
            &device,
            surface_format,
            sample_count,
            config.width,
            config.height,
            stage,
        )?;

        let egui_winit = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            renderer,
            egui_winit,
            egui_renderer,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.renderer.resize(&self.device, width, height);
    }

    fn draw_egui(
        &mut self,
        view: &wgpu::TextureView,
        egui_ctx: &EguiContext,
        full_output: egui::FullOutput,
    ) {
        self.egui_winit
            .handle_platform_output(&self.window, full_output.platform_output);

        let paint_jobs = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui_encoder"),
            });
        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
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
            self.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

struct GpuApp {
    state: AppState,
    gpu: Option<Gpu>,
    egui_ctx: EguiContext,
}

impl GpuApp {
    fn new() -> Self {
        Self {
            state: AppState::new(),
            gpu: None,
            egui_ctx: EguiContext::default(),
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
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

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        let mut frame = gpu.renderer.frame(&gpu.queue, &mut encoder, &view);
        if let Err(e) = self
            .state
            .render_loop
            .frame(&mut frame, &mut self.state.stage, Instant::now())
        {
            tracing::error!("frame failed: {e}");
            event_loop.exit();
            return;
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));

        let raw_input = gpu.egui_winit.take_egui_input(&gpu.window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            self.state.draw_ui(ctx);
        });
        gpu.draw_egui(&view, &self.egui_ctx, full_output);

        output.present();
        gpu.window.request_redraw();
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match Gpu::new(event_loop, &self.egui_ctx, &self.state.stage) {
            Ok(gpu) => {
                let size = gpu.window.inner_size();
                self.state
                    .viewport
                    .resize(&mut self.state.stage.camera, size.width, size.height);
                self.gpu = Some(gpu);
            }
            Err(e) => {
                tracing::error!("failed to initialise graphics: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
        // Releases always reach the controls so a drag never sticks.
        let release = matches!(
            event,
            WindowEvent::MouseInput {
                state: ElementState::Released,
                ..
            }
        );
        if response.consumed && !release {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if self.state.viewport.resize(
                    &mut self.state.stage.camera,
                    new_size.width,
                    new_size.height,
                ) {
                    let (width, height) = self.state.viewport.size();
                    gpu.resize(width, height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        ..
                    },
                ..
            } => {
                self.state
                    .handle_key(key, key_state == ElementState::Pressed);
            }
            WindowEvent::MouseInput { button, state, .. } => {
                self.state
                    .handle_button(button, state == ElementState::Pressed);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.state
                    .pointer_moved(position.x as f32, position.y as f32);
            }
            WindowEvent::CursorLeft { .. } => {
                self.state.pointer.position = None;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.state.wheel(delta);
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

/// Prefer an sRGB surface so the shaders' linear output is gamma encoded on
/// write. Any other format is used as-is, with a warning.
fn pick_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    if let Some(format) = formats.iter().find(|f| f.is_srgb()) {
        return Some(*format);
    }
    let format = formats.first().copied()?;
    tracing::warn!(?format, "no sRGB surface format, colors will look too dark");
    Some(format)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("cubecam-desktop starting");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new();
    event_loop.run_app(&mut app)?;

    Ok(())
}
