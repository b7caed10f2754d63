//! The explicit GPU context capability.
//!
//! Drawing mutates global GPU binding state: active texture units, the bound
//! program, the bound vertex array. Rather than hiding that behind free
//! functions, every operation that touches the GPU takes a
//! `&mut dyn GpuContext` (or a generic `G: GpuContext`). Implementations:
//!
//! - [`HeadlessContext`](crate::headless::HeadlessContext) records calls and
//!   keeps buffer contents in memory.
//! - `WgpuContext` in the `kiln-engine` crate drives a real device.
//!
//! Callers must not assume binding state is restored after a draw.

use crate::geometry::QuadVertex;
use crate::math::Mat4;

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Opaque handle to a GPU texture owned by the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Opaque handle to a linked shader program.
///
/// A `ProgramHandle` only exists for programs that compiled and linked;
/// failures are reported as errors, never as a null handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// Opaque handle to a vertex array (vertex layout + bound buffers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexArrayHandle(pub u32);

/// Opaque handle to a GPU buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// A texture handle together with its pixel dimensions.
///
/// Sprites use the dimensions as the atlas bounds when normalizing UVs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Texture {
    pub handle: TextureHandle,
    pub width: u32,
    pub height: u32,
}

/// The GPU objects backing one quad batch: a vertex array, a dynamic vertex
/// buffer, and a static index buffer.
///
/// The handles are plain values. Dropping a `SceneBuffers` does not release
/// the GPU objects; reclamation belongs to the context owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneBuffers {
    pub vertex_array: VertexArrayHandle,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    /// Capacity of the vertex buffer, in vertices.
    pub vertex_capacity: usize,
}

// ---------------------------------------------------------------------------
// GpuError
// ---------------------------------------------------------------------------

/// Errors reported by a [`GpuContext`].
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    /// An upload larger than the buffer it targets.
    #[error("upload of {len} vertices exceeds buffer capacity of {capacity}")]
    BufferOverflow {
        len: usize,
        capacity: usize,
    },

    /// A handle that this context never created.
    #[error("unknown {kind} handle {id}")]
    UnknownHandle {
        kind: &'static str,
        id: u32,
    },

    /// A texture unit at or beyond the context's unit cap.
    #[error("texture unit {unit} is out of range (context has {available} units)")]
    TextureUnitOutOfRange {
        unit: u32,
        available: u32,
    },

    /// A uniform upload or draw with no program bound.
    #[error("no shader program is bound")]
    NoProgram,

    /// Shader compilation failed; carries the driver's log.
    #[error("shader compilation failed: {0}")]
    Compile(String),

    /// Program linking failed; carries the driver's log.
    #[error("shader program linking failed: {0}")]
    Link(String),

    /// Pixel data whose length does not match the texture size.
    #[error("texture data is {actual} bytes, expected {expected}")]
    TextureData {
        expected: usize,
        actual: usize,
    },

    /// No adapter or device could be acquired.
    #[error("GPU device unavailable: {0}")]
    Device(String),

    /// The presentation surface could not provide a frame.
    #[error("surface error: {0}")]
    Surface(String),

    /// A draw was issued outside `begin_frame` / `end_frame`.
    #[error("draw issued outside of a frame")]
    NoFrame,
}

// ---------------------------------------------------------------------------
// GpuContext
// ---------------------------------------------------------------------------

/// The capability to create quad buffers, bind state, and draw.
///
/// The method set mirrors what the scene renderer needs and nothing more.
/// Uniform setters apply to the currently bound program, like GL's
/// `glUniform*` family.
pub trait GpuContext {
    /// Number of texture units the context can bind for one draw.
    fn max_texture_units(&self) -> u32;

    /// Create a vertex array with a vertex buffer of `vertex_capacity`
    /// vertices and a static index buffer filled with `indices`.
    fn create_quad_buffers(
        &mut self,
        indices: &[u32],
        vertex_capacity: usize,
    ) -> Result<SceneBuffers, GpuError>;

    /// Replace the whole vertex buffer with `vertices` (stream usage).
    ///
    /// Bytes past `vertices.len()` are unspecified afterwards; draws must
    /// only reference uploaded quads.
    fn upload_vertices(
        &mut self,
        buffers: &SceneBuffers,
        vertices: &[QuadVertex],
    ) -> Result<(), GpuError>;

    /// Resize the viewport to `width` x `height` pixels.
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Bind `texture` to sampler unit `unit`.
    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) -> Result<(), GpuError>;

    /// Make `program` the current program.
    fn use_program(&mut self, program: ProgramHandle) -> Result<(), GpuError>;

    /// Upload an integer array uniform (sampler units).
    fn set_uniform_samplers(&mut self, name: &str, units: &[i32]) -> Result<(), GpuError>;

    /// Upload a 4x4 matrix uniform.
    fn set_uniform_mat4(&mut self, name: &str, value: &Mat4) -> Result<(), GpuError>;

    /// Upload a single integer uniform.
    fn set_uniform_i32(&mut self, name: &str, value: i32) -> Result<(), GpuError>;

    /// Issue one indexed triangle draw of `index_count` indices from the
    /// start of `buffers`.
    fn draw_indexed(&mut self, buffers: &SceneBuffers, index_count: u32) -> Result<(), GpuError>;

    /// Compile a vertex and a fragment source and link them into a program.
    fn compile_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramHandle, GpuError>;

    /// Start a frame. Draws are only valid between `begin_frame` and
    /// `end_frame`.
    fn begin_frame(&mut self) -> Result<(), GpuError>;

    /// Finish and present the frame.
    fn end_frame(&mut self) -> Result<(), GpuError>;
}

/// Check that `data` holds exactly `width * height` RGBA8 pixels.
pub fn check_rgba_len(width: u32, height: u32, data: &[u8]) -> Result<(), GpuError> {
    let expected = width as usize * height as usize * 4;
    if data.len() != expected {
        return Err(GpuError::TextureData {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}
