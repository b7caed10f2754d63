//! Kiln Scene -- batched 2D scene renderer core.
//!
//! This crate packs the visible entities of a 2D scene (sprites, glyph-based
//! text, debug click barriers) into a single vertex buffer and issues one
//! indexed draw call per frame. It is GPU-agnostic: every operation that
//! touches GPU state receives an explicit [`GpuContext`](gpu::GpuContext),
//! so render-state side effects are visible in the interface. The
//! [`HeadlessContext`](headless::HeadlessContext) implementation records
//! those calls and is what the tests drive.
//!
//! # Frame Flow
//!
//! ```text
//! sprites ── depth_sort (once, at Scene::new)
//!    │
//!    ▼
//! Scene::update ── geometry::*_quad per entity ── QuadBatch ── upload
//!    │
//!    ▼
//! dispatch::draw_scene ── bind textures, uniforms ── draw_indexed
//! ```
//!
//! # Quick Start
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use kiln_scene::prelude::*;
//!
//! let mut gpu = HeadlessContext::new();
//! let atlas = gpu.create_texture(64, 16);
//!
//! let sprite = Rc::new(RefCell::new(Sprite::new(atlas, Vec2::new(16.0, 16.0))));
//! let mut scene = Scene::new(
//!     &mut gpu,
//!     SceneLimits::default(),
//!     vec![sprite.clone()],
//!     Vec::new(),
//!     Vec::new(),
//!     Vec::new(),
//! )
//! .unwrap();
//!
//! assert_eq!(scene.quad_count(), 1);
//!
//! sprite.borrow_mut().visible = false;
//! assert_eq!(scene.update(&mut gpu).unwrap(), 0);
//! ```

#![deny(unsafe_code)]

pub mod depth;
pub mod dispatch;
pub mod geometry;
pub mod gpu;
pub mod headless;
pub mod limits;
pub mod math;
pub mod scene;
pub mod shader;
pub mod sprite;
pub mod text;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while building, rebuilding, or drawing a scene.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// More sprites were handed to the scene than it may hold.
    #[error("scene holds at most {max} sprites, got {count}")]
    TooManySprites {
        count: usize,
        max: usize,
    },

    /// The frame needs more quads than the preallocated vertex buffer holds.
    #[error("frame needs {required} quads but the vertex buffer holds {capacity}")]
    CapacityExceeded {
        required: usize,
        capacity: usize,
    },

    /// The frame needs more texture units than are available.
    #[error("frame needs {required} texture slots but only {available} are available")]
    TextureSlotsExceeded {
        required: usize,
        available: usize,
    },

    /// A referenced entity was mutably borrowed elsewhere during a rebuild.
    #[error("{kind} #{index} is borrowed elsewhere; scene entities must not be held across update/draw")]
    EntityInUse {
        kind: &'static str,
        index: usize,
    },

    /// The same sprite or text object was handed to the scene twice.
    #[error("{kind} #{index} is the same object as {kind} #{first}")]
    DuplicateEntity {
        kind: &'static str,
        index: usize,
        first: usize,
    },

    /// The viewport has a zero width or height.
    #[error("cannot draw into an empty {width}x{height} viewport")]
    EmptyViewport {
        width: u32,
        height: u32,
    },

    /// A text object was drawn without a shader program.
    #[error("text object has no shader program")]
    MissingProgram,

    /// The GPU context rejected an operation.
    #[error(transparent)]
    Gpu(#[from] gpu::GpuError),

    /// Text content could not be applied.
    #[error(transparent)]
    Text(#[from] text::TextError),

    /// A shader program lookup failed.
    #[error(transparent)]
    Shader(#[from] shader::ShaderError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::depth::depth_sort;
    pub use crate::dispatch::{draw_scene, TextSurface, Viewport};
    pub use crate::geometry::{Quad, QuadBatch, QuadVertex};
    pub use crate::gpu::{
        GpuContext, GpuError, ProgramHandle, SceneBuffers, Texture, TextureHandle,
    };
    pub use crate::headless::{GpuCall, HeadlessContext};
    pub use crate::limits::SceneLimits;
    pub use crate::math::{Mat4, Vec2};
    pub use crate::scene::Scene;
    pub use crate::shader::{
        PreloadSummary, ShaderCache, ShaderError, ShaderManifest, ShaderProgramSource,
    };
    pub use crate::sprite::{ClickBarrier, Sprite, SpriteBehavior, SpriteRef};
    pub use crate::text::{
        text_obj_needs_update, GlyphLayout, GlyphQuad, GlyphTable, TextError, TextObject,
        TextRef,
    };
    pub use crate::SceneError;
}
