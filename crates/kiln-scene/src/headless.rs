//! A recording GPU context for headless runs and tests.
//!
//! [`HeadlessContext`] implements [`GpuContext`] without a device. It logs
//! every call as a [`GpuCall`], keeps the contents of the buffers it hands
//! out, and tracks the bound program and texture units, so tests can assert
//! on exactly what a frame would have sent to the GPU.

use crate::geometry::QuadVertex;
use crate::gpu::{
    BufferHandle, GpuContext, GpuError, ProgramHandle, SceneBuffers, Texture, TextureHandle,
    VertexArrayHandle,
};
use crate::limits::MAX_SCENE_TEXTURES;
use crate::math::Mat4;

/// One recorded call on a [`HeadlessContext`].
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    CreateQuadBuffers {
        vertex_array: VertexArrayHandle,
        index_count: usize,
        vertex_capacity: usize,
    },
    UploadVertices {
        vertex_array: VertexArrayHandle,
        vertex_count: usize,
    },
    SetViewport {
        width: u32,
        height: u32,
    },
    BindTexture {
        unit: u32,
        texture: TextureHandle,
    },
    UseProgram(ProgramHandle),
    SetSamplers {
        name: String,
        units: Vec<i32>,
    },
    SetMat4 {
        name: String,
        value: Mat4,
    },
    SetInt {
        name: String,
        value: i32,
    },
    DrawIndexed {
        vertex_array: VertexArrayHandle,
        index_count: u32,
    },
    CompileProgram {
        result: Result<ProgramHandle, String>,
    },
    BeginFrame,
    EndFrame,
}

/// CPU-side copy of one vertex array's buffers.
#[derive(Debug, Clone, Default)]
struct HeadlessBuffers {
    indices: Vec<u32>,
    vertices: Vec<QuadVertex>,
    vertex_capacity: usize,
}

/// GPU context that records calls instead of issuing them.
#[derive(Debug, Clone)]
pub struct HeadlessContext {
    calls: Vec<GpuCall>,
    buffers: Vec<HeadlessBuffers>,
    textures: u32,
    programs: u32,
    texture_units: Vec<Option<TextureHandle>>,
    bound_program: Option<ProgramHandle>,
    viewport: (u32, u32),
    in_frame: bool,
}

impl HeadlessContext {
    /// A context with [`MAX_SCENE_TEXTURES`] texture units.
    pub fn new() -> Self {
        Self::with_texture_units(MAX_SCENE_TEXTURES as u32)
    }

    /// A context with `units` texture units, for exercising hardware caps
    /// below the scene's own limit.
    pub fn with_texture_units(units: u32) -> Self {
        Self {
            calls: Vec::new(),
            buffers: Vec::new(),
            textures: 0,
            programs: 0,
            texture_units: vec![None; units as usize],
            bound_program: None,
            viewport: (0, 0),
            in_frame: false,
        }
    }

    /// Allocate a texture handle of the given size.
    pub fn create_texture(&mut self, width: u32, height: u32) -> Texture {
        self.textures += 1;
        Texture {
            handle: TextureHandle(self.textures),
            width,
            height,
        }
    }

    /// Every call recorded so far, oldest first.
    pub fn calls(&self) -> &[GpuCall] {
        &self.calls
    }

    /// Forget recorded calls; buffer contents and bindings are kept.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Vertices most recently uploaded to `buffers`.
    pub fn vertices(&self, buffers: &SceneBuffers) -> &[QuadVertex] {
        self.buffers
            .get(buffers.vertex_array.0 as usize)
            .map_or(&[], |b| b.vertices.as_slice())
    }

    /// Static indices of `buffers`.
    pub fn indices(&self, buffers: &SceneBuffers) -> &[u32] {
        self.buffers
            .get(buffers.vertex_array.0 as usize)
            .map_or(&[], |b| b.indices.as_slice())
    }

    /// Texture currently bound to `unit`.
    pub fn bound_texture(&self, unit: u32) -> Option<TextureHandle> {
        self.texture_units.get(unit as usize).copied().flatten()
    }

    pub fn bound_program(&self) -> Option<ProgramHandle> {
        self.bound_program
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Number of draw calls recorded since the last [`clear_calls`](Self::clear_calls).
    pub fn draw_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, GpuCall::DrawIndexed { .. }))
            .count()
    }

    fn buffers_mut(&mut self, handle: VertexArrayHandle) -> Result<&mut HeadlessBuffers, GpuError> {
        self.buffers
            .get_mut(handle.0 as usize)
            .ok_or(GpuError::UnknownHandle {
                kind: "vertex array",
                id: handle.0,
            })
    }

    fn require_program(&self) -> Result<(), GpuError> {
        self.bound_program.map(|_| ()).ok_or(GpuError::NoProgram)
    }
}

impl Default for HeadlessContext {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuContext for HeadlessContext {
    fn max_texture_units(&self) -> u32 {
        self.texture_units.len() as u32
    }

    fn create_quad_buffers(
        &mut self,
        indices: &[u32],
        vertex_capacity: usize,
    ) -> Result<SceneBuffers, GpuError> {
        let id = self.buffers.len() as u32;
        self.buffers.push(HeadlessBuffers {
            indices: indices.to_vec(),
            vertices: Vec::new(),
            vertex_capacity,
        });

        let vertex_array = VertexArrayHandle(id);
        self.calls.push(GpuCall::CreateQuadBuffers {
            vertex_array,
            index_count: indices.len(),
            vertex_capacity,
        });

        Ok(SceneBuffers {
            vertex_array,
            vertex_buffer: BufferHandle(id * 2),
            index_buffer: BufferHandle(id * 2 + 1),
            vertex_capacity,
        })
    }

    fn upload_vertices(
        &mut self,
        buffers: &SceneBuffers,
        vertices: &[QuadVertex],
    ) -> Result<(), GpuError> {
        let target = self.buffers_mut(buffers.vertex_array)?;
        if vertices.len() > target.vertex_capacity {
            return Err(GpuError::BufferOverflow {
                len: vertices.len(),
                capacity: target.vertex_capacity,
            });
        }
        target.vertices.clear();
        target.vertices.extend_from_slice(vertices);

        self.calls.push(GpuCall::UploadVertices {
            vertex_array: buffers.vertex_array,
            vertex_count: vertices.len(),
        });
        Ok(())
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        self.calls.push(GpuCall::SetViewport { width, height });
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) -> Result<(), GpuError> {
        let available = self.max_texture_units();
        let slot = self
            .texture_units
            .get_mut(unit as usize)
            .ok_or(GpuError::TextureUnitOutOfRange { unit, available })?;
        *slot = Some(texture);
        self.calls.push(GpuCall::BindTexture { unit, texture });
        Ok(())
    }

    fn use_program(&mut self, program: ProgramHandle) -> Result<(), GpuError> {
        if program.0 == 0 || program.0 > self.programs {
            return Err(GpuError::UnknownHandle {
                kind: "program",
                id: program.0,
            });
        }
        self.bound_program = Some(program);
        self.calls.push(GpuCall::UseProgram(program));
        Ok(())
    }

    fn set_uniform_samplers(&mut self, name: &str, units: &[i32]) -> Result<(), GpuError> {
        self.require_program()?;
        self.calls.push(GpuCall::SetSamplers {
            name: name.to_owned(),
            units: units.to_vec(),
        });
        Ok(())
    }

    fn set_uniform_mat4(&mut self, name: &str, value: &Mat4) -> Result<(), GpuError> {
        self.require_program()?;
        self.calls.push(GpuCall::SetMat4 {
            name: name.to_owned(),
            value: *value,
        });
        Ok(())
    }

    fn set_uniform_i32(&mut self, name: &str, value: i32) -> Result<(), GpuError> {
        self.require_program()?;
        self.calls.push(GpuCall::SetInt {
            name: name.to_owned(),
            value,
        });
        Ok(())
    }

    fn draw_indexed(&mut self, buffers: &SceneBuffers, index_count: u32) -> Result<(), GpuError> {
        self.require_program()?;
        if !self.in_frame {
            return Err(GpuError::NoFrame);
        }
        self.buffers_mut(buffers.vertex_array)?;
        self.calls.push(GpuCall::DrawIndexed {
            vertex_array: buffers.vertex_array,
            index_count,
        });
        Ok(())
    }

    fn compile_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramHandle, GpuError> {
        let result = if vertex_source.trim().is_empty() {
            Err(GpuError::Compile("vertex stage: empty shader source".to_owned()))
        } else if fragment_source.trim().is_empty() {
            Err(GpuError::Compile("fragment stage: empty shader source".to_owned()))
        } else {
            self.programs += 1;
            Ok(ProgramHandle(self.programs))
        };

        self.calls.push(GpuCall::CompileProgram {
            result: result.as_ref().copied().map_err(ToString::to_string),
        });
        result
    }

    fn begin_frame(&mut self) -> Result<(), GpuError> {
        self.in_frame = true;
        self.calls.push(GpuCall::BeginFrame);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), GpuError> {
        if !self.in_frame {
            return Err(GpuError::NoFrame);
        }
        self.in_frame = false;
        self.calls.push(GpuCall::EndFrame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_over_capacity_is_rejected_and_keeps_contents() {
        let mut gpu = HeadlessContext::new();
        let buffers = gpu.create_quad_buffers(&[0, 1, 3, 1, 2, 3], 4).unwrap();

        let quad = [QuadVertex::default(); 4];
        gpu.upload_vertices(&buffers, &quad).unwrap();

        let too_many = [QuadVertex::default(); 8];
        let err = gpu.upload_vertices(&buffers, &too_many).unwrap_err();
        assert!(matches!(err, GpuError::BufferOverflow { len: 8, capacity: 4 }));
        assert_eq!(gpu.vertices(&buffers).len(), 4);
    }

    #[test]
    fn uniforms_require_a_bound_program() {
        let mut gpu = HeadlessContext::new();
        assert!(matches!(
            gpu.set_uniform_i32("u_Texture", 0),
            Err(GpuError::NoProgram)
        ));

        let program = gpu.compile_program("vs", "fs").unwrap();
        gpu.use_program(program).unwrap();
        gpu.set_uniform_i32("u_Texture", 0).unwrap();
    }

    #[test]
    fn blank_sources_fail_to_compile() {
        let mut gpu = HeadlessContext::new();
        assert!(matches!(
            gpu.compile_program("  ", "fs"),
            Err(GpuError::Compile(_))
        ));
        assert!(matches!(
            gpu.compile_program("vs", ""),
            Err(GpuError::Compile(_))
        ));
    }

    #[test]
    fn unknown_program_cannot_be_bound() {
        let mut gpu = HeadlessContext::new();
        assert!(gpu.use_program(ProgramHandle(3)).is_err());
        assert_eq!(gpu.bound_program(), None);
    }

    #[test]
    fn texture_units_are_capped() {
        let mut gpu = HeadlessContext::with_texture_units(2);
        let texture = gpu.create_texture(1, 1);
        gpu.bind_texture(1, texture.handle).unwrap();
        assert!(matches!(
            gpu.bind_texture(2, texture.handle),
            Err(GpuError::TextureUnitOutOfRange { unit: 2, available: 2 })
        ));
        assert_eq!(gpu.bound_texture(1), Some(texture.handle));
    }

    #[test]
    fn draws_outside_a_frame_are_rejected() {
        let mut gpu = HeadlessContext::new();
        let buffers = gpu.create_quad_buffers(&[], 0).unwrap();
        let program = gpu.compile_program("vs", "fs").unwrap();
        gpu.use_program(program).unwrap();

        assert!(matches!(gpu.draw_indexed(&buffers, 0), Err(GpuError::NoFrame)));
        gpu.begin_frame().unwrap();
        gpu.draw_indexed(&buffers, 0).unwrap();
        gpu.end_frame().unwrap();
        assert_eq!(gpu.draw_count(), 1);
    }
}
