//! Windowed application runner.
//!
//! Provides [`run_windowed`], which drives a [`SceneApp`] inside a winit
//! event loop. Each `RedrawRequested` event:
//!
//! 1. Lets the app mutate its sprites and text objects ([`SceneApp::frame`]).
//! 2. Rebuilds the scene's vertex buffer.
//! 3. Draws the scene with the "scene" program, then the app's overlay.
//! 4. Presents the frame.
//!
//! Pressing `B` toggles click-barrier drawing; `Escape` closes the window.
//!
//! This module is feature-gated behind `renderer`.

use std::sync::Arc;

use kiln_scene::dispatch::{draw_scene, Viewport};
use kiln_scene::gpu::{GpuContext, GpuError, ProgramHandle};
use kiln_scene::scene::Scene;
use kiln_scene::shader::{ShaderCache, SCENE_PROGRAM};
use kiln_scene::SceneError;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{WindowAttributes, WindowId};

use super::context::WgpuContext;
use crate::config::RendererConfig;

/// Application hooks called by [`run_windowed`].
pub trait SceneApp {
    /// Create textures and build the scene. Called once, after the window
    /// and device exist and the shader manifest has been preloaded.
    fn init(
        &mut self,
        gpu: &mut WgpuContext,
        shaders: &ShaderCache,
        config: &RendererConfig,
    ) -> anyhow::Result<Scene>;

    /// Mutate scene entities before the frame's rebuild.
    fn frame(&mut self, _scene: &mut Scene) {}

    /// Draw anything outside the scene, after the scene's draw call.
    fn draw_overlay(
        &mut self,
        _gpu: &mut WgpuContext,
        _viewport: Viewport,
        _shaders: &ShaderCache,
    ) -> Result<(), SceneError> {
        Ok(())
    }
}

/// Open a window and run `app` until the window is closed.
///
/// # Errors
///
/// Returns an error if the event loop cannot be created, or if window,
/// device, shader, or scene initialization fails.
pub fn run_windowed<A: SceneApp>(config: RendererConfig, app: A) -> Result<(), anyhow::Error> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(winit::event_loop::ControlFlow::Poll);

    let mut runner = Runner {
        state: RunnerState::Pending { app, config },
        init_failed: false,
    };

    event_loop.run_app(&mut runner)?;

    if runner.init_failed {
        return Err(anyhow::anyhow!(
            "failed to initialize windowed renderer (see logs for details)"
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Internal state machine
// ---------------------------------------------------------------------------

/// Window creation has to wait for `resumed`, so the runner starts
/// `Pending` and becomes `Running` once the device and scene exist.
enum RunnerState<A> {
    Pending {
        app: A,
        config: RendererConfig,
    },
    Running(Box<Running<A>>),
    /// Placeholder while moving between states.
    Transitioning,
}

struct Running<A> {
    app: A,
    gpu: WgpuContext,
    scene: Scene,
    shaders: ShaderCache,
    scene_program: ProgramHandle,
}

struct Runner<A> {
    state: RunnerState<A>,
    init_failed: bool,
}

fn start<A: SceneApp>(
    event_loop: &ActiveEventLoop,
    mut app: A,
    config: &RendererConfig,
) -> anyhow::Result<Running<A>> {
    let window_attrs = WindowAttributes::default()
        .with_title(config.title.clone())
        .with_inner_size(winit::dpi::PhysicalSize::new(config.width, config.height));
    let window = Arc::new(event_loop.create_window(window_attrs)?);

    let mut gpu = pollster::block_on(WgpuContext::new(window.clone(), config.clear_color))?;

    let mut shaders = ShaderCache::new();
    let summary = shaders.preload(&mut gpu, &config.shaders);
    if !summary.all_loaded() {
        tracing::warn!(failed = ?summary.failed, "some shader programs are unusable");
    }
    let scene_program = shaders.get(SCENE_PROGRAM)?;

    let scene = app.init(&mut gpu, &shaders, config)?;
    tracing::info!(
        width = config.width,
        height = config.height,
        sprites = scene.sprites().len(),
        texts = scene.text_objects().len(),
        "scene window created"
    );

    // Kick off the first frame on backends that never send an initial
    // RedrawRequested.
    window.request_redraw();

    Ok(Running {
        app,
        gpu,
        scene,
        shaders,
        scene_program,
    })
}

impl<A: SceneApp> Running<A> {
    fn render(&mut self) -> Result<(), SceneError> {
        self.app.frame(&mut self.scene);

        // A failed rebuild keeps the previous upload, so the frame still draws.
        if let Err(e) = self.scene.update(&mut self.gpu) {
            tracing::debug!(
                error = %e,
                quads = self.scene.quad_count(),
                "scene rebuild failed; drawing previous frame"
            );
        }

        let (width, height) = self.gpu.surface_size();
        let viewport = Viewport::new(width, height);

        self.gpu.begin_frame()?;
        let drawn = draw_scene(&mut self.gpu, &self.scene, viewport, self.scene_program)
            .and_then(|()| {
                self.app
                    .draw_overlay(&mut self.gpu, viewport, &self.shaders)
            });
        self.gpu.end_frame()?;
        drawn
    }

    fn toggle_barriers(&mut self) {
        let draw = !self.scene.draw_barriers();
        self.scene.set_draw_barriers(draw);
        tracing::info!(draw, "click barrier drawing toggled");
    }
}

impl<A: SceneApp> ApplicationHandler for Runner<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let state = std::mem::replace(&mut self.state, RunnerState::Transitioning);
        self.state = match state {
            RunnerState::Pending { app, config } => match start(event_loop, app, &config) {
                Ok(running) => RunnerState::Running(Box::new(running)),
                Err(e) => {
                    tracing::error!(error = %e, "failed to initialize scene renderer -- exiting");
                    self.init_failed = true;
                    event_loop.exit();
                    RunnerState::Transitioning
                }
            },
            running @ RunnerState::Running(_) => running,
            RunnerState::Transitioning => {
                tracing::warn!("resumed called during state transition");
                RunnerState::Transitioning
            }
        };
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let RunnerState::Running(running) = &mut self.state else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("window close requested -- shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                tracing::debug!(
                    width = new_size.width,
                    height = new_size.height,
                    "window resized"
                );
                running.gpu.resize(new_size);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => match logical_key {
                Key::Named(NamedKey::Escape) => event_loop.exit(),
                Key::Character(c) if c.eq_ignore_ascii_case("b") => running.toggle_barriers(),
                _ => {}
            },
            WindowEvent::RedrawRequested => {
                match running.render() {
                    Ok(()) => {}
                    Err(SceneError::Gpu(GpuError::Surface(e))) => {
                        tracing::warn!(error = %e, "surface error -- reconfiguring");
                        let size = running.gpu.window().inner_size();
                        running.gpu.resize(size);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "frame failed");
                    }
                }

                running.gpu.window().request_redraw();
            }
            _ => {}
        }
    }
}
