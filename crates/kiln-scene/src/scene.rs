//! The scene buffer packer.
//!
//! A [`Scene`] references the sprites and text objects gameplay code owns,
//! and turns their current state into one packed vertex buffer on every
//! [`update`](Scene::update). Paint order is fixed when the scene is built:
//! sprites sorted back to front, then text glyphs, then (optionally) debug
//! click barriers.
//!
//! # Texture Slots
//!
//! Each rebuild hands out sampler units: sprite `i` gets unit `i` whether or
//! not it is visible, text object `j` gets unit `sprite_count + j`. The
//! draw dispatcher binds textures to those same units.
//!
//! # Failure
//!
//! Capacity checks happen before anything is written. A rejected rebuild
//! leaves the uploaded vertices, the quad count, and every entity's slot
//! exactly as they were.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::depth::depth_sort;
use crate::geometry::{barrier_quad, glyph_quad, quad_for_sprite, quad_indices, QuadBatch};
use crate::gpu::{GpuContext, SceneBuffers};
use crate::limits::SceneLimits;
use crate::sprite::{ClickBarrier, Sprite, SpriteBehavior, SpriteRef};
use crate::text::{TextObject, TextRef};
use crate::SceneError;

/// A packed, drawable 2D scene.
#[derive(Debug)]
pub struct Scene {
    limits: SceneLimits,
    sprites: Vec<SpriteRef>,
    behaviors: Vec<SpriteBehavior>,
    text_objects: Vec<TextRef>,
    click_barriers: Vec<ClickBarrier>,
    draw_barriers: bool,
    quad_count: usize,
    buffers: SceneBuffers,
}

impl Scene {
    /// Build a scene and pack its first frame.
    ///
    /// Sprites are depth-sorted once here. Each text object's
    /// `origin_pos` is set to its current `pos`. Barrier drawing starts off.
    ///
    /// # Errors
    ///
    /// - [`SceneError::TooManySprites`] if `sprites` exceeds
    ///   `limits.max_sprites`.
    /// - [`SceneError::DuplicateEntity`] if the same sprite or text object
    ///   is listed twice.
    /// - [`SceneError::EntityInUse`] if a sprite or text object is mutably
    ///   borrowed elsewhere.
    /// - Any error of the initial [`update`](Self::update).
    pub fn new(
        gpu: &mut dyn GpuContext,
        limits: SceneLimits,
        mut sprites: Vec<SpriteRef>,
        behaviors: Vec<SpriteBehavior>,
        text_objects: Vec<TextRef>,
        click_barriers: Vec<ClickBarrier>,
    ) -> Result<Self, SceneError> {
        if sprites.len() > limits.max_sprites {
            return Err(SceneError::TooManySprites {
                count: sprites.len(),
                max: limits.max_sprites,
            });
        }

        check_distinct("sprite", &sprites)?;
        check_distinct("text object", &text_objects)?;

        // Sorting borrows every sprite; check up front instead of panicking.
        for (index, sprite) in sprites.iter().enumerate() {
            sprite
                .try_borrow()
                .map_err(|_| SceneError::EntityInUse {
                    kind: "sprite",
                    index,
                })?;
        }
        depth_sort(&mut sprites);

        for (index, text) in text_objects.iter().enumerate() {
            let mut text = borrow_text_mut(text, index)?;
            text.origin_pos = text.pos;
        }

        let buffers = gpu.create_quad_buffers(
            &quad_indices(limits.max_quads),
            limits.vertex_capacity(),
        )?;

        let mut scene = Self {
            limits,
            sprites,
            behaviors,
            text_objects,
            click_barriers,
            draw_barriers: false,
            quad_count: 0,
            buffers,
        };
        scene.update(gpu)?;

        tracing::debug!(
            sprites = scene.sprites.len(),
            texts = scene.text_objects.len(),
            barriers = scene.click_barriers.len(),
            "scene initialized"
        );
        Ok(scene)
    }

    /// Re-pack the scene from the current entity state and upload it.
    ///
    /// Returns the number of quads now in the buffer.
    ///
    /// # Errors
    ///
    /// - [`SceneError::TextureSlotsExceeded`] if sprites plus text objects
    ///   need more units than `limits.max_texture_slots` or the context
    ///   provides.
    /// - [`SceneError::CapacityExceeded`] if the visible entities need more
    ///   quads than the vertex buffer holds.
    /// - [`SceneError::EntityInUse`] if an entity is borrowed elsewhere.
    /// - [`SceneError::Gpu`] if the upload fails.
    ///
    /// On error the previous frame's buffer and quad count are kept.
    pub fn update(&mut self, gpu: &mut dyn GpuContext) -> Result<usize, SceneError> {
        let batch = match self.pack_checked(gpu.max_texture_units() as usize) {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(error = %e, "scene rebuild rejected");
                return Err(e);
            }
        };

        if let Err(e) = gpu.upload_vertices(&self.buffers, batch.vertices()) {
            tracing::warn!(error = %e, quads = batch.quad_count(), "scene upload failed");
            return Err(e.into());
        }
        self.quad_count = batch.quad_count();

        tracing::debug!(
            quads = self.quad_count,
            slots = self.slot_count(),
            draw_barriers = self.draw_barriers,
            "scene rebuilt"
        );
        Ok(self.quad_count)
    }

    /// Pack the current entity state into a [`QuadBatch`] without uploading.
    ///
    /// Assigns texture slots exactly like [`update`](Self::update); the
    /// texture-unit cap is `limits.max_texture_slots`.
    ///
    /// # Errors
    ///
    /// Same as [`update`](Self::update), minus GPU failures.
    pub fn pack(&self) -> Result<QuadBatch, SceneError> {
        self.pack_checked(usize::MAX)
    }

    fn pack_checked(&self, context_units: usize) -> Result<QuadBatch, SceneError> {
        // Hold every borrow for the whole pack so the counts checked below
        // are the counts written.
        let mut sprites = self
            .sprites
            .iter()
            .enumerate()
            .map(|(index, s)| borrow_sprite_mut(s, index))
            .collect::<Result<Vec<_>, _>>()?;
        let mut texts = self
            .text_objects
            .iter()
            .enumerate()
            .map(|(index, t)| borrow_text_mut(t, index))
            .collect::<Result<Vec<_>, _>>()?;

        let available = self.limits.max_texture_slots.min(context_units);
        let required_slots = sprites.len() + texts.len();
        if required_slots > available {
            return Err(SceneError::TextureSlotsExceeded {
                required: required_slots,
                available,
            });
        }

        let required_quads = required_quads(&sprites, &texts, self.barrier_quad_count());
        if required_quads > self.limits.max_quads {
            return Err(SceneError::CapacityExceeded {
                required: required_quads,
                capacity: self.limits.max_quads,
            });
        }

        let mut batch = QuadBatch::with_capacity(self.limits.max_quads);

        for (slot, sprite) in sprites.iter_mut().enumerate() {
            sprite.texture_slot = slot as u32;
            if sprite.visible {
                batch.push(quad_for_sprite(sprite))?;
            }
        }

        let sprite_count = sprites.len();
        for (index, text) in texts.iter_mut().enumerate() {
            text.texture_slot = (sprite_count + index) as u32;
            if !text.visible {
                continue;
            }
            let text: &TextObject = text;
            for &glyph in text.layout().glyphs() {
                batch.push(glyph_quad(text, glyph))?;
            }
        }

        if self.draw_barriers {
            for barrier in &self.click_barriers {
                batch.push(barrier_quad(barrier))?;
            }
        }

        Ok(batch)
    }

    fn barrier_quad_count(&self) -> usize {
        if self.draw_barriers {
            self.click_barriers.len()
        } else {
            0
        }
    }

    /// Texture slots in use: one per sprite and per text object.
    pub fn slot_count(&self) -> usize {
        self.sprites.len() + self.text_objects.len()
    }

    /// Quads uploaded by the last successful rebuild.
    pub fn quad_count(&self) -> usize {
        self.quad_count
    }

    /// Sprites in paint order.
    pub fn sprites(&self) -> &[SpriteRef] {
        &self.sprites
    }

    pub fn text_objects(&self) -> &[TextRef] {
        &self.text_objects
    }

    pub fn click_barriers(&self) -> &[ClickBarrier] {
        &self.click_barriers
    }

    pub fn behaviors(&self) -> &[SpriteBehavior] {
        &self.behaviors
    }

    pub fn buffers(&self) -> &SceneBuffers {
        &self.buffers
    }

    pub fn limits(&self) -> &SceneLimits {
        &self.limits
    }

    pub fn draw_barriers(&self) -> bool {
        self.draw_barriers
    }

    /// Toggle debug barrier quads. Takes effect on the next rebuild.
    pub fn set_draw_barriers(&mut self, draw: bool) {
        self.draw_barriers = draw;
    }

    /// Release the scene's own containers.
    ///
    /// Sprites and text objects live on with their other owners. The GPU
    /// buffer handles are returned to the caller, who owns the context
    /// that can reclaim them.
    pub fn free(self) -> SceneBuffers {
        tracing::debug!(
            sprites = self.sprites.len(),
            texts = self.text_objects.len(),
            "scene freed"
        );
        self.buffers
    }
}

fn required_quads(
    sprites: &[RefMut<'_, Sprite>],
    texts: &[RefMut<'_, TextObject>],
    barriers: usize,
) -> usize {
    let sprite_quads = sprites.iter().filter(|s| s.visible).count();
    let glyph_quads: usize = texts
        .iter()
        .filter(|t| t.visible)
        .map(|t| t.glyph_count())
        .sum();
    sprite_quads + glyph_quads + barriers
}

/// Each entity owns one texture slot, so a reference may appear only once.
fn check_distinct<T>(kind: &'static str, entities: &[Rc<RefCell<T>>]) -> Result<(), SceneError> {
    for (index, entity) in entities.iter().enumerate() {
        if let Some(first) = entities[..index].iter().position(|e| Rc::ptr_eq(e, entity)) {
            return Err(SceneError::DuplicateEntity { kind, index, first });
        }
    }
    Ok(())
}

fn borrow_sprite_mut(sprite: &SpriteRef, index: usize) -> Result<RefMut<'_, Sprite>, SceneError> {
    sprite.try_borrow_mut().map_err(|_| SceneError::EntityInUse {
        kind: "sprite",
        index,
    })
}

fn borrow_text_mut(text: &TextRef, index: usize) -> Result<RefMut<'_, TextObject>, SceneError> {
    text.try_borrow_mut().map_err(|_| SceneError::EntityInUse {
        kind: "text object",
        index,
    })
}

/// Borrow a text object for reading during a draw.
pub(crate) fn borrow_text(text: &TextRef, index: usize) -> Result<Ref<'_, TextObject>, SceneError> {
    text.try_borrow().map_err(|_| SceneError::EntityInUse {
        kind: "text object",
        index,
    })
}

/// Borrow a sprite for reading during a draw.
pub(crate) fn borrow_sprite(sprite: &SpriteRef, index: usize) -> Result<Ref<'_, Sprite>, SceneError> {
    sprite.try_borrow().map_err(|_| SceneError::EntityInUse {
        kind: "sprite",
        index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::UNTEXTURED_SLOT;
    use crate::gpu::{GpuError, Texture};
    use crate::headless::HeadlessContext;
    use crate::math::Vec2;

    fn sprite(gpu: &mut HeadlessContext, depth: f32) -> SpriteRef {
        let texture: Texture = gpu.create_texture(32, 32);
        Sprite::new(texture, Vec2::new(32.0, 32.0))
            .with_depth(depth)
            .into_ref()
    }

    fn clock_text(gpu: &mut HeadlessContext, content: &str) -> TextRef {
        let font = gpu.create_texture(208, 16);
        let mut text = TextObject::new(font, Vec2::new(16.0, 16.0)).at(Vec2::new(5.0, 7.0));
        text.set_text(content).unwrap();
        text.into_ref()
    }

    fn scene(
        gpu: &mut HeadlessContext,
        sprites: Vec<SpriteRef>,
        texts: Vec<TextRef>,
        barriers: Vec<ClickBarrier>,
    ) -> Scene {
        Scene::new(gpu, SceneLimits::default(), sprites, Vec::new(), texts, barriers).unwrap()
    }

    #[test]
    fn new_sorts_sprites_by_depth() {
        let mut gpu = HeadlessContext::new();
        let front = sprite(&mut gpu, 2.0);
        let back = sprite(&mut gpu, -1.0);
        let scene = scene(&mut gpu, vec![front.clone(), back.clone()], vec![], vec![]);

        assert!(std::rc::Rc::ptr_eq(&scene.sprites()[0], &back));
        assert!(std::rc::Rc::ptr_eq(&scene.sprites()[1], &front));
    }

    #[test]
    fn new_records_text_origin_and_disables_barriers() {
        let mut gpu = HeadlessContext::new();
        let text = clock_text(&mut gpu, "12");
        let scene = scene(&mut gpu, vec![], vec![text.clone()], vec![ClickBarrier::default()]);

        assert_eq!(text.borrow().origin_pos, Vec2::new(5.0, 7.0));
        assert!(!scene.draw_barriers());
        assert_eq!(scene.quad_count(), 2);
    }

    #[test]
    fn too_many_sprites_are_rejected() {
        let mut gpu = HeadlessContext::new();
        let limits = SceneLimits {
            max_sprites: 1,
            ..SceneLimits::default()
        };
        let sprites = vec![sprite(&mut gpu, 0.0), sprite(&mut gpu, 0.0)];
        let err = Scene::new(&mut gpu, limits, sprites, vec![], vec![], vec![]).unwrap_err();
        assert!(matches!(err, SceneError::TooManySprites { count: 2, max: 1 }));
    }

    #[test]
    fn slots_follow_list_order_regardless_of_visibility() {
        let mut gpu = HeadlessContext::new();
        let a = sprite(&mut gpu, 0.0);
        let b = sprite(&mut gpu, 1.0);
        b.borrow_mut().visible = false;
        let c = sprite(&mut gpu, 2.0);
        let text = clock_text(&mut gpu, "1");

        let scene = scene(&mut gpu, vec![a.clone(), b.clone(), c.clone()], vec![text.clone()], vec![]);

        assert_eq!(a.borrow().texture_slot, 0);
        assert_eq!(b.borrow().texture_slot, 1);
        assert_eq!(c.borrow().texture_slot, 2);
        assert_eq!(text.borrow().texture_slot, 3);
        assert_eq!(scene.quad_count(), 3);
    }

    #[test]
    fn barriers_are_appended_when_enabled() {
        let mut gpu = HeadlessContext::new();
        let s = sprite(&mut gpu, 0.0);
        let barriers = vec![
            ClickBarrier::new(0.0, 10.0, 0.0, 10.0),
            ClickBarrier::new(20.0, 30.0, 0.0, 10.0),
        ];
        let mut scene = scene(&mut gpu, vec![s], vec![], barriers);
        assert_eq!(scene.quad_count(), 1);

        scene.set_draw_barriers(true);
        assert_eq!(scene.update(&mut gpu).unwrap(), 3);

        let vertices = gpu.vertices(scene.buffers());
        assert_eq!(vertices.len(), 12);
        assert!(vertices[4..].iter().all(|v| v.texture_slot == UNTEXTURED_SLOT));
    }

    #[test]
    fn rejected_rebuild_keeps_previous_frame() {
        let mut gpu = HeadlessContext::new();
        let limits = SceneLimits {
            max_quads: 2,
            ..SceneLimits::default()
        };
        let text = clock_text(&mut gpu, "1");
        let mut scene = Scene::new(&mut gpu, limits, vec![], vec![], vec![text.clone()], vec![]).unwrap();
        let before = gpu.vertices(scene.buffers()).to_vec();

        text.borrow_mut().set_text("12:30").unwrap();
        let err = scene.update(&mut gpu).unwrap_err();

        assert!(matches!(
            err,
            SceneError::CapacityExceeded {
                required: 5,
                capacity: 2
            }
        ));
        assert_eq!(scene.quad_count(), 1);
        assert_eq!(gpu.vertices(scene.buffers()), before.as_slice());
    }

    #[test]
    fn texture_slots_are_capped_by_the_context() {
        let mut gpu = HeadlessContext::with_texture_units(1);
        let sprites = vec![sprite(&mut gpu, 0.0), sprite(&mut gpu, 1.0)];
        let err = Scene::new(&mut gpu, SceneLimits::default(), sprites, vec![], vec![], vec![])
            .unwrap_err();
        assert!(matches!(
            err,
            SceneError::TextureSlotsExceeded {
                required: 2,
                available: 1
            }
        ));
    }

    #[test]
    fn failed_upload_keeps_previous_quad_count() {
        let mut gpu = HeadlessContext::new();
        let s = sprite(&mut gpu, 0.0);
        let mut scene = scene(&mut gpu, vec![s.clone()], vec![], vec![]);
        s.borrow_mut().visible = false;

        // A context that never created the scene's buffers rejects the upload.
        let mut other = HeadlessContext::new();
        let err = scene.update(&mut other).unwrap_err();

        assert!(matches!(
            err,
            SceneError::Gpu(GpuError::UnknownHandle {
                kind: "vertex array",
                ..
            })
        ));
        assert_eq!(scene.quad_count(), 1);
        assert_eq!(gpu.vertices(scene.buffers()).len(), 4);
    }

    #[test]
    fn duplicate_references_are_rejected_by_name() {
        let mut gpu = HeadlessContext::new();
        let s = sprite(&mut gpu, 0.0);
        let err = Scene::new(
            &mut gpu,
            SceneLimits::default(),
            vec![s.clone(), s.clone()],
            vec![],
            vec![],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SceneError::DuplicateEntity {
                kind: "sprite",
                index: 1,
                first: 0
            }
        ));

        let text = clock_text(&mut gpu, "1");
        let err = Scene::new(
            &mut gpu,
            SceneLimits::default(),
            vec![],
            vec![],
            vec![text.clone(), text.clone()],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SceneError::DuplicateEntity {
                kind: "text object",
                ..
            }
        ));
    }

    #[test]
    fn borrowed_entity_is_reported_not_panicked() {
        let mut gpu = HeadlessContext::new();
        let s = sprite(&mut gpu, 0.0);
        let mut scene = scene(&mut gpu, vec![s.clone()], vec![], vec![]);

        let _held = s.borrow_mut();
        let err = scene.update(&mut gpu).unwrap_err();
        assert!(matches!(
            err,
            SceneError::EntityInUse {
                kind: "sprite",
                index: 0
            }
        ));
    }

    #[test]
    fn free_returns_buffer_handles() {
        let mut gpu = HeadlessContext::new();
        let s = sprite(&mut gpu, 0.0);
        let scene = scene(&mut gpu, vec![s.clone()], vec![], vec![]);
        let buffers = *scene.buffers();

        assert_eq!(scene.free(), buffers);
        assert_eq!(std::rc::Rc::strong_count(&s), 1);
    }
}
