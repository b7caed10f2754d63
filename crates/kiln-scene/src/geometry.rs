//! Quad geometry generation.
//!
//! Every drawable becomes one quad: four [`QuadVertex`] values in the order
//! top-right, bottom-right, bottom-left, top-left. With the static index
//! pattern `0, 1, 3, 1, 2, 3` that order yields two triangles covering the
//! rectangle. Coordinates are window pixels with Y growing downward.
//!
//! The generators are pure functions of the entity they read. Appending to
//! the frame's vertex data goes through [`QuadBatch`], which enforces the
//! vertex buffer's capacity.

use crate::limits::{INDICES_PER_QUAD, VERTICES_PER_QUAD};
use crate::math::Vec2;
use crate::sprite::{ClickBarrier, Sprite};
use crate::text::{GlyphQuad, TextObject};
use crate::SceneError;

/// Texture slot written into barrier vertices. The scene shader treats a
/// negative slot as "untextured".
pub const UNTEXTURED_SLOT: f32 = -1.0;

// ---------------------------------------------------------------------------
// Vertex
// ---------------------------------------------------------------------------

/// One vertex of the packed scene buffer: position, UV, texture slot.
///
/// The slot is stored as `f32` because it travels through the same float
/// vertex attribute stream as position and UV.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Default, bytemuck_derive::Pod, bytemuck_derive::Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub texture_slot: f32,
}

impl QuadVertex {
    fn new(x: f32, y: f32, u: f32, v: f32, slot: f32) -> Self {
        Self {
            position: [x, y],
            uv: [u, v],
            texture_slot: slot,
        }
    }
}

/// Four vertices: top-right, bottom-right, bottom-left, top-left.
pub type Quad = [QuadVertex; 4];

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// UV rectangle `(u0, v0, u1, v1)` of a sprite's current frame.
///
/// Frames sit side by side along the atlas' X axis. Zero-sized atlases are
/// treated as one pixel to keep the division defined.
fn frame_uv(sprite: &Sprite) -> (f32, f32, f32, f32) {
    let atlas_w = sprite.texture.width.max(1) as f32;
    let atlas_h = sprite.texture.height.max(1) as f32;
    let frame_w = sprite.texture_size.x / atlas_w;

    let u0 = sprite.current_frame as f32 * frame_w;
    let u1 = u0 + frame_w;
    let v0 = 0.0;
    let v1 = sprite.texture_size.y / atlas_h;
    (u0, v0, u1, v1)
}

fn rect_quad(left: f32, top: f32, right: f32, bottom: f32, sprite: &Sprite) -> Quad {
    let (u0, v0, u1, v1) = frame_uv(sprite);
    let slot = sprite.texture_slot as f32;
    [
        QuadVertex::new(right, top, u1, v0, slot),
        QuadVertex::new(right, bottom, u1, v1, slot),
        QuadVertex::new(left, bottom, u0, v1, slot),
        QuadVertex::new(left, top, u0, v0, slot),
    ]
}

/// Quad for a sprite whose position is its top-left corner.
pub fn sprite_quad(sprite: &Sprite) -> Quad {
    let Vec2 { x, y } = sprite.pos;
    rect_quad(x, y, x + sprite.size.x, y + sprite.size.y, sprite)
}

/// Quad for a sprite whose position is its center.
pub fn pivot_centered_sprite_quad(sprite: &Sprite) -> Quad {
    let half_w = sprite.size.x / 2.0;
    let half_h = sprite.size.y / 2.0;
    let Vec2 { x, y } = sprite.pos;
    rect_quad(x - half_w, y - half_h, x + half_w, y + half_h, sprite)
}

/// Quad for a sprite, honoring its pivot mode.
pub fn quad_for_sprite(sprite: &Sprite) -> Quad {
    if sprite.pivot_centered {
        pivot_centered_sprite_quad(sprite)
    } else {
        sprite_quad(sprite)
    }
}

/// Quad for one glyph of a text object.
///
/// The glyph is drawn as a sprite of the font atlas, shifted right by
/// `column * h_padding` from the text origin, using the glyph's atlas slot
/// as the animation frame and the text object's texture slot.
pub fn glyph_quad(text: &TextObject, glyph: GlyphQuad) -> Quad {
    let glyph_sprite = Sprite {
        pos: Vec2::new(
            text.pos.x + glyph.column as f32 * text.h_padding,
            text.pos.y,
        ),
        size: text.glyph_size,
        texture: text.font,
        texture_size: text.glyph_texture_size,
        current_frame: u32::from(glyph.slot),
        visible: true,
        pivot_centered: false,
        depth: 0.0,
        texture_slot: text.texture_slot,
    };
    sprite_quad(&glyph_sprite)
}

/// Untextured debug quad covering a click barrier.
pub fn barrier_quad(barrier: &ClickBarrier) -> Quad {
    [
        QuadVertex::new(barrier.right, barrier.top, 0.0, 0.0, UNTEXTURED_SLOT),
        QuadVertex::new(barrier.right, barrier.bottom, 0.0, 0.0, UNTEXTURED_SLOT),
        QuadVertex::new(barrier.left, barrier.bottom, 0.0, 0.0, UNTEXTURED_SLOT),
        QuadVertex::new(barrier.left, barrier.top, 0.0, 0.0, UNTEXTURED_SLOT),
    ]
}

// ---------------------------------------------------------------------------
// Index buffer
// ---------------------------------------------------------------------------

/// Static index data for `quad_count` quads.
///
/// Quad `k` uses `{4k, 4k+1, 4k+3, 4k+1, 4k+2, 4k+3}`.
pub fn quad_indices(quad_count: usize) -> Vec<u32> {
    let mut indices = Vec::with_capacity(quad_count * INDICES_PER_QUAD);
    for quad in 0..quad_count {
        let offset = (quad * VERTICES_PER_QUAD) as u32;
        indices.extend_from_slice(&[
            offset,
            offset + 1,
            offset + 3,
            offset + 1,
            offset + 2,
            offset + 3,
        ]);
    }
    indices
}

// ---------------------------------------------------------------------------
// QuadBatch
// ---------------------------------------------------------------------------

/// Vertex data for one frame, bounded by the vertex buffer's capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadBatch {
    vertices: Vec<QuadVertex>,
    max_quads: usize,
}

impl QuadBatch {
    /// An empty batch that accepts at most `max_quads` quads.
    pub fn with_capacity(max_quads: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(max_quads * VERTICES_PER_QUAD),
            max_quads,
        }
    }

    /// Append a quad and return the advanced write cursor (vertex count).
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::CapacityExceeded`] if the batch is full; the
    /// batch is left unchanged.
    pub fn push(&mut self, quad: Quad) -> Result<usize, SceneError> {
        if self.quad_count() >= self.max_quads {
            return Err(SceneError::CapacityExceeded {
                required: self.quad_count() + 1,
                capacity: self.max_quads,
            });
        }
        self.vertices.extend_from_slice(&quad);
        Ok(self.vertices.len())
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / VERTICES_PER_QUAD
    }

    pub fn capacity(&self) -> usize {
        self.max_quads
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertices(&self) -> &[QuadVertex] {
        &self.vertices
    }

    /// Quad `index` of the batch, if present.
    pub fn quad(&self, index: usize) -> Option<&[QuadVertex]> {
        let start = index * VERTICES_PER_QUAD;
        self.vertices.get(start..start + VERTICES_PER_QUAD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{Texture, TextureHandle};

    fn atlas(width: u32, height: u32) -> Texture {
        Texture {
            handle: TextureHandle(1),
            width,
            height,
        }
    }

    #[test]
    fn sprite_quad_corners_are_top_left_anchored() {
        let sprite = Sprite::new(atlas(32, 32), Vec2::new(32.0, 16.0)).at(Vec2::new(10.0, 20.0));
        let quad = sprite_quad(&sprite);

        assert_eq!(quad[0].position, [42.0, 20.0]); // top right
        assert_eq!(quad[1].position, [42.0, 36.0]); // bottom right
        assert_eq!(quad[2].position, [10.0, 36.0]); // bottom left
        assert_eq!(quad[3].position, [10.0, 20.0]); // top left
    }

    #[test]
    fn pivot_centered_quad_is_symmetric_around_position() {
        let sprite = Sprite::new(atlas(32, 32), Vec2::new(20.0, 10.0))
            .at(Vec2::new(100.0, 50.0))
            .pivot_centered();
        let quad = quad_for_sprite(&sprite);

        assert_eq!(quad[0].position, [110.0, 45.0]);
        assert_eq!(quad[1].position, [110.0, 55.0]);
        assert_eq!(quad[2].position, [90.0, 55.0]);
        assert_eq!(quad[3].position, [90.0, 45.0]);
    }

    #[test]
    fn frame_offsets_uv_along_atlas_width() {
        let mut sprite = Sprite::new(atlas(64, 32), Vec2::new(16.0, 16.0));
        sprite.current_frame = 2;
        let quad = sprite_quad(&sprite);

        // Frame 2 of 16px frames in a 64px atlas spans u = 0.5..0.75.
        assert_eq!(quad[3].uv, [0.5, 0.0]);
        assert_eq!(quad[0].uv, [0.75, 0.0]);
        assert_eq!(quad[1].uv, [0.75, 0.5]);
        assert_eq!(quad[2].uv, [0.5, 0.5]);
    }

    #[test]
    fn sprite_quad_carries_texture_slot() {
        let mut sprite = Sprite::new(atlas(8, 8), Vec2::new(8.0, 8.0));
        sprite.texture_slot = 7;
        assert!(sprite_quad(&sprite).iter().all(|v| v.texture_slot == 7.0));
    }

    #[test]
    fn zero_sized_atlas_does_not_produce_nan() {
        let sprite = Sprite::new(atlas(0, 0), Vec2::new(4.0, 4.0));
        assert!(sprite_quad(&sprite)
            .iter()
            .all(|v| v.uv[0].is_finite() && v.uv[1].is_finite()));
    }

    #[test]
    fn barrier_quad_is_untextured() {
        let quad = barrier_quad(&ClickBarrier::new(1.0, 5.0, 2.0, 8.0));
        assert_eq!(quad[0].position, [5.0, 2.0]);
        assert_eq!(quad[1].position, [5.0, 8.0]);
        assert_eq!(quad[2].position, [1.0, 8.0]);
        assert_eq!(quad[3].position, [1.0, 2.0]);
        for vertex in quad {
            assert_eq!(vertex.uv, [0.0, 0.0]);
            assert_eq!(vertex.texture_slot, UNTEXTURED_SLOT);
        }
    }

    #[test]
    fn quad_indices_follow_fixed_winding() {
        let indices = quad_indices(3);
        assert_eq!(indices.len(), 18);
        for k in 0..3u32 {
            let at = (k * 6) as usize;
            assert_eq!(
                &indices[at..at + 6],
                &[4 * k, 4 * k + 1, 4 * k + 3, 4 * k + 1, 4 * k + 2, 4 * k + 3]
            );
        }
    }

    #[test]
    fn batch_push_returns_advanced_cursor() {
        let mut batch = QuadBatch::with_capacity(2);
        let quad = barrier_quad(&ClickBarrier::default());
        assert_eq!(batch.push(quad).unwrap(), 4);
        assert_eq!(batch.push(quad).unwrap(), 8);
        assert_eq!(batch.quad_count(), 2);
    }

    #[test]
    fn batch_rejects_push_past_capacity() {
        let mut batch = QuadBatch::with_capacity(1);
        let quad = barrier_quad(&ClickBarrier::default());
        batch.push(quad).unwrap();

        let err = batch.push(quad).unwrap_err();
        assert!(matches!(
            err,
            SceneError::CapacityExceeded {
                required: 2,
                capacity: 1
            }
        ));
        assert_eq!(batch.vertices().len(), 4, "failed push must not write");
    }
}
