//! Draw dispatch: binding state and issuing draw calls.
//!
//! [`draw_scene`] draws a packed [`Scene`] in one indexed draw call.
//! [`TextSurface`] is the standalone path for a single text object with its
//! own buffers and program, used for overlays drawn outside any scene.
//!
//! Both mutate global GPU binding state (viewport, texture units, current
//! program) and leave it as the draw left it.

use crate::geometry::{glyph_quad, quad_indices, QuadBatch};
use crate::gpu::{GpuContext, ProgramHandle, SceneBuffers};
use crate::limits::{INDICES_PER_QUAD, VERTICES_PER_QUAD};
use crate::math::{centered_projection, pixel_projection, IDENTITY};
use crate::scene::{borrow_sprite, borrow_text, Scene};
use crate::text::{TextObject, MAX_TEXT_CHARS};
use crate::SceneError;

/// Uniform holding the pixel-to-clip projection.
pub const UNIFORM_PROJECTION: &str = "u_Projection";
/// Uniform holding the model matrix.
pub const UNIFORM_MODEL: &str = "u_Model";
/// Uniform holding the view matrix.
pub const UNIFORM_VIEW: &str = "u_View";
/// Sampler-unit array of the scene program.
pub const UNIFORM_TEXTURES: &str = "u_Textures";
/// Single sampler unit of the text program.
pub const UNIFORM_TEXTURE: &str = "u_Texture";

/// Target size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn check(self) -> Result<Self, SceneError> {
        if self.width == 0 || self.height == 0 {
            return Err(SceneError::EmptyViewport {
                width: self.width,
                height: self.height,
            });
        }
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// Draw the scene's last packed frame with `program`.
///
/// Binds each visible sprite's texture and every text object's font to the
/// unit assigned by the last rebuild, uploads `u_Textures = [0, n)` with one
/// unit per sprite and text object, a Y-down pixel projection, identity
/// model and view, then draws `quad_count * 6` indices.
///
/// # Errors
///
/// - [`SceneError::EmptyViewport`] for a zero-sized viewport.
/// - [`SceneError::EntityInUse`] if an entity is mutably borrowed.
/// - [`SceneError::Gpu`] if the context rejects a binding or the draw.
pub fn draw_scene(
    gpu: &mut dyn GpuContext,
    scene: &Scene,
    viewport: Viewport,
    program: ProgramHandle,
) -> Result<(), SceneError> {
    let viewport = viewport.check()?;
    gpu.set_viewport(viewport.width, viewport.height);

    for (index, sprite) in scene.sprites().iter().enumerate() {
        let sprite = borrow_sprite(sprite, index)?;
        if sprite.visible {
            gpu.bind_texture(sprite.texture_slot, sprite.texture.handle)?;
        }
    }
    for (index, text) in scene.text_objects().iter().enumerate() {
        let text = borrow_text(text, index)?;
        gpu.bind_texture(text.texture_slot, text.font.handle)?;
    }

    gpu.use_program(program)?;

    let samplers: Vec<i32> = (0..scene.slot_count() as i32).collect();
    gpu.set_uniform_samplers(UNIFORM_TEXTURES, &samplers)?;

    let projection = pixel_projection(viewport.width as f32, viewport.height as f32);
    gpu.set_uniform_mat4(UNIFORM_PROJECTION, &projection)?;
    gpu.set_uniform_mat4(UNIFORM_MODEL, &IDENTITY)?;
    gpu.set_uniform_mat4(UNIFORM_VIEW, &IDENTITY)?;

    let index_count = (scene.quad_count() * INDICES_PER_QUAD) as u32;
    gpu.draw_indexed(scene.buffers(), index_count)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// TextSurface
// ---------------------------------------------------------------------------

/// Buffers and draw state for one standalone text object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSurface {
    buffers: SceneBuffers,
    max_quads: usize,
    quad_count: usize,
}

impl TextSurface {
    /// Create buffers holding up to [`MAX_TEXT_CHARS`] glyphs.
    pub fn new(gpu: &mut dyn GpuContext) -> Result<Self, SceneError> {
        Self::with_capacity(gpu, MAX_TEXT_CHARS)
    }

    /// Create buffers holding up to `max_quads` glyphs.
    pub fn with_capacity(gpu: &mut dyn GpuContext, max_quads: usize) -> Result<Self, SceneError> {
        let buffers =
            gpu.create_quad_buffers(&quad_indices(max_quads), max_quads * VERTICES_PER_QUAD)?;
        Ok(Self {
            buffers,
            max_quads,
            quad_count: 0,
        })
    }

    /// Re-pack `text`'s glyphs and upload them.
    ///
    /// The text object draws from unit 0 on this path, so its texture slot
    /// is set to 0. Returns the number of glyph quads.
    ///
    /// # Errors
    ///
    /// [`SceneError::CapacityExceeded`] if the text has more glyphs than the
    /// surface holds; the previous upload is kept.
    pub fn update(&mut self, gpu: &mut dyn GpuContext, text: &mut TextObject) -> Result<usize, SceneError> {
        let required = text.glyph_count();
        if required > self.max_quads {
            return Err(SceneError::CapacityExceeded {
                required,
                capacity: self.max_quads,
            });
        }

        text.texture_slot = 0;
        let text: &TextObject = text;
        let mut batch = QuadBatch::with_capacity(self.max_quads);
        for &glyph in text.layout().glyphs() {
            batch.push(glyph_quad(text, glyph))?;
        }

        gpu.upload_vertices(&self.buffers, batch.vertices())?;
        self.quad_count = batch.quad_count();
        Ok(self.quad_count)
    }

    /// Draw the last uploaded glyphs with the text object's own program.
    ///
    /// Uses a projection centered on the viewport and samples the font
    /// from unit 0.
    ///
    /// # Errors
    ///
    /// - [`SceneError::EmptyViewport`] for a zero-sized viewport.
    /// - [`SceneError::MissingProgram`] if the text object has no program.
    /// - [`SceneError::Gpu`] if the context rejects a binding or the draw.
    pub fn draw(&self, gpu: &mut dyn GpuContext, text: &TextObject, viewport: Viewport) -> Result<(), SceneError> {
        let viewport = viewport.check()?;
        let program = text.program.ok_or(SceneError::MissingProgram)?;

        gpu.set_viewport(viewport.width, viewport.height);
        gpu.bind_texture(0, text.font.handle)?;
        gpu.use_program(program)?;

        gpu.set_uniform_i32(UNIFORM_TEXTURE, 0)?;
        let projection = centered_projection(viewport.width as f32, viewport.height as f32);
        gpu.set_uniform_mat4(UNIFORM_PROJECTION, &projection)?;
        gpu.set_uniform_mat4(UNIFORM_MODEL, &IDENTITY)?;
        gpu.set_uniform_mat4(UNIFORM_VIEW, &IDENTITY)?;

        let index_count = (self.quad_count * INDICES_PER_QUAD) as u32;
        gpu.draw_indexed(&self.buffers, index_count)?;
        Ok(())
    }

    pub fn quad_count(&self) -> usize {
        self.quad_count
    }

    pub fn buffers(&self) -> &SceneBuffers {
        &self.buffers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{GpuCall, HeadlessContext};
    use crate::limits::SceneLimits;
    use crate::math::Vec2;
    use crate::sprite::Sprite;

    #[test]
    fn empty_viewport_is_rejected_before_any_call() {
        let mut gpu = HeadlessContext::new();
        let scene = Scene::new(&mut gpu, SceneLimits::default(), vec![], vec![], vec![], vec![]).unwrap();
        let program = gpu.compile_program("vs", "fs").unwrap();
        gpu.clear_calls();

        let err = draw_scene(&mut gpu, &scene, Viewport::new(0, 600), program).unwrap_err();
        assert!(matches!(err, SceneError::EmptyViewport { width: 0, height: 600 }));
        assert!(gpu.calls().is_empty());
    }

    #[test]
    fn hidden_sprite_texture_is_not_bound() {
        let mut gpu = HeadlessContext::new();
        let shown = Sprite::new(gpu.create_texture(8, 8), Vec2::new(8.0, 8.0)).into_ref();
        let hidden = Sprite::new(gpu.create_texture(8, 8), Vec2::new(8.0, 8.0)).into_ref();
        hidden.borrow_mut().visible = false;

        let scene = Scene::new(
            &mut gpu,
            SceneLimits::default(),
            vec![shown.clone(), hidden],
            vec![],
            vec![],
            vec![],
        )
        .unwrap();
        let program = gpu.compile_program("vs", "fs").unwrap();

        gpu.begin_frame().unwrap();
        draw_scene(&mut gpu, &scene, Viewport::new(800, 600), program).unwrap();

        assert_eq!(gpu.bound_texture(0), Some(shown.borrow().texture.handle));
        assert_eq!(gpu.bound_texture(1), None);
        assert!(gpu.calls().contains(&GpuCall::SetSamplers {
            name: UNIFORM_TEXTURES.to_owned(),
            units: vec![0, 1],
        }));
    }

    #[test]
    fn text_surface_requires_a_program() {
        let mut gpu = HeadlessContext::new();
        let font = gpu.create_texture(208, 16);
        let mut text = TextObject::new(font, Vec2::new(16.0, 16.0));
        text.set_text("9").unwrap();

        let mut surface = TextSurface::new(&mut gpu).unwrap();
        surface.update(&mut gpu, &mut text).unwrap();

        gpu.begin_frame().unwrap();
        let err = surface.draw(&mut gpu, &text, Viewport::new(320, 240)).unwrap_err();
        assert!(matches!(err, SceneError::MissingProgram));
    }

    #[test]
    fn text_surface_draws_from_unit_zero() {
        let mut gpu = HeadlessContext::new();
        let program = gpu.compile_program("vs", "fs").unwrap();
        let font = gpu.create_texture(208, 16);
        let mut text = TextObject::new(font, Vec2::new(16.0, 16.0)).with_program(program);
        text.texture_slot = 4;
        text.set_text("12:30AM").unwrap();

        let mut surface = TextSurface::new(&mut gpu).unwrap();
        assert_eq!(surface.update(&mut gpu, &mut text).unwrap(), 6);
        assert_eq!(text.texture_slot, 0);

        gpu.begin_frame().unwrap();
        surface.draw(&mut gpu, &text, Viewport::new(320, 240)).unwrap();

        assert_eq!(gpu.bound_texture(0), Some(font.handle));
        let calls = gpu.calls();
        assert!(calls.contains(&GpuCall::SetInt {
            name: UNIFORM_TEXTURE.to_owned(),
            value: 0,
        }));
        assert!(calls.contains(&GpuCall::SetMat4 {
            name: UNIFORM_PROJECTION.to_owned(),
            value: centered_projection(320.0, 240.0),
        }));
        assert!(calls.contains(&GpuCall::DrawIndexed {
            vertex_array: surface.buffers().vertex_array,
            index_count: 36,
        }));
    }
}
