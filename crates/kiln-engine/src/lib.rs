//! Kiln Engine -- wgpu backend and windowed runner for kiln scenes.
//!
//! [`kiln_scene`] packs and dispatches scenes against an abstract
//! [`GpuContext`](kiln_scene::gpu::GpuContext). This crate supplies the
//! real one, [`WgpuContext`](render::WgpuContext), the WGSL sources of the
//! bundled "scene" and "text" programs under `shaders/`, JSON renderer
//! configuration, and [`run_windowed`](render::run_windowed), which drives a
//! [`SceneApp`](render::SceneApp) in a winit window.
//!
//! # Feature Flags
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `renderer` | yes | `render` module: wgpu, winit, the windowed runner |
//!
//! # Running
//!
//! ```text
//! RUST_LOG=kiln_scene=debug cargo run -p kiln-engine --example clock_scene
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod render;

pub use kiln_scene;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::{ConfigError, RendererConfig};
    #[cfg(feature = "renderer")]
    pub use crate::render::{run_windowed, SceneApp, WgpuContext};
    pub use kiln_scene::prelude::*;
}
