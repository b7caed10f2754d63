//! wgpu backend and windowed runner for kiln scenes.
//!
//! This module is feature-gated behind `renderer`. Without the feature it
//! compiles to nothing and the engine only offers configuration loading;
//! scenes can still be driven through
//! [`HeadlessContext`](kiln_scene::headless::HeadlessContext).

#[cfg(feature = "renderer")]
pub mod app;
#[cfg(feature = "renderer")]
pub mod context;

#[cfg(feature = "renderer")]
pub use app::{run_windowed, SceneApp};
#[cfg(feature = "renderer")]
pub use context::{Uniforms, WgpuContext, TEXTURE_UNITS};
