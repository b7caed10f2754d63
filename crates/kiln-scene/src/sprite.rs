//! Scene entities authored by gameplay code: sprites, click barriers, and
//! sprite behaviors.
//!
//! Sprites are shared, not owned: the scene keeps [`SpriteRef`]s while the
//! code that created a sprite keeps mutating it between frames.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::gpu::Texture;
use crate::math::Vec2;

/// Shared handle to a sprite referenced by a scene.
pub type SpriteRef = Rc<RefCell<Sprite>>;

/// A textured, optionally animated rectangle.
///
/// Animation frames sit side by side in the texture atlas, each
/// `texture_size` pixels large; `current_frame` selects one.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    /// Top-left corner, or center when `pivot_centered` is set.
    pub pos: Vec2,
    /// On-screen size in pixels.
    pub size: Vec2,
    /// Atlas texture holding the sprite's frames.
    pub texture: Texture,
    /// Pixel size of one frame inside the atlas.
    pub texture_size: Vec2,
    /// Index of the animation frame to draw.
    pub current_frame: u32,
    pub visible: bool,
    /// Whether `pos` denotes the sprite's center rather than its top-left.
    pub pivot_centered: bool,
    /// Paint order key; lower depth is drawn first (further back).
    pub depth: f32,
    /// Sampler unit assigned by the scene on every rebuild.
    pub texture_slot: u32,
}

impl Sprite {
    /// A visible, top-left anchored sprite at the origin whose frame size
    /// equals its on-screen size.
    pub fn new(texture: Texture, size: Vec2) -> Self {
        Self {
            pos: Vec2::ZERO,
            size,
            texture,
            texture_size: size,
            current_frame: 0,
            visible: true,
            pivot_centered: false,
            depth: 0.0,
            texture_slot: 0,
        }
    }

    #[must_use]
    pub fn at(mut self, pos: Vec2) -> Self {
        self.pos = pos;
        self
    }

    #[must_use]
    pub fn with_depth(mut self, depth: f32) -> Self {
        self.depth = depth;
        self
    }

    #[must_use]
    pub fn with_texture_size(mut self, texture_size: Vec2) -> Self {
        self.texture_size = texture_size;
        self
    }

    #[must_use]
    pub fn pivot_centered(mut self) -> Self {
        self.pivot_centered = true;
        self
    }

    /// Wrap the sprite in a shared handle.
    pub fn into_ref(self) -> SpriteRef {
        Rc::new(RefCell::new(self))
    }
}

/// Axis-aligned rectangle marking a clickable region.
///
/// The renderer only draws barriers for debugging; hit testing lives with
/// the input code.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClickBarrier {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl ClickBarrier {
    pub fn new(left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }
}

/// Pairs a sprite with the region that activates it and an opaque action
/// id interpreted by gameplay code.
///
/// The scene stores behaviors for its lifetime but attaches no logic to
/// them.
#[derive(Debug, Clone)]
pub struct SpriteBehavior {
    pub sprite: SpriteRef,
    pub click_barrier: ClickBarrier,
    pub action: u32,
}
