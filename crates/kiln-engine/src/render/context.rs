//! wgpu implementation of the scene GPU context.
//!
//! [`WgpuContext`] maps the GL-style [`GpuContext`] calls the scene renderer
//! makes onto wgpu objects:
//!
//! | Context concept | wgpu object |
//! |-----------------|-------------|
//! | Vertex array | a vertex buffer plus an index buffer |
//! | Texture unit | one `texture_2d` binding of group 0 |
//! | Program | a render pipeline built from two WGSL modules |
//! | Uniforms | a staged [`Uniforms`] block in one uniform buffer |
//!
//! # Bind Group Layout
//!
//! | Binding | Contents |
//! |---------|----------|
//! | 0 | [`Uniforms`]: projection, model, view, single texture unit |
//! | 1..=16 | texture units 0..16 (unbound units hold a 1x1 white texture) |
//! | 17 | filtering sampler |
//!
//! Every program must declare a compatible group 0; the bundled shaders
//! under `shaders/` do.
//!
//! # Frames
//!
//! Uniforms are staged on the CPU and written when a draw is issued. Each
//! draw records and submits its own render pass so later uniform writes in
//! the same frame cannot leak into earlier draws. The first pass of a frame
//! clears to the configured color; [`end_frame`](GpuContext::end_frame)
//! presents.

use std::sync::Arc;

use kiln_scene::dispatch::{
    UNIFORM_MODEL, UNIFORM_PROJECTION, UNIFORM_TEXTURE, UNIFORM_TEXTURES, UNIFORM_VIEW,
};
use kiln_scene::geometry::QuadVertex;
use kiln_scene::gpu::{
    check_rgba_len, BufferHandle, GpuContext, GpuError, ProgramHandle, SceneBuffers, Texture,
    TextureHandle, VertexArrayHandle,
};
use kiln_scene::math::{Mat4, IDENTITY};
use wgpu::util::DeviceExt;

/// Texture units per draw. Matches the sampled-texture limit every adapter
/// supports, and the bindings declared by the bundled shaders.
pub const TEXTURE_UNITS: u32 = 16;

const UNIFORM_BINDING: u32 = 0;
const FIRST_TEXTURE_BINDING: u32 = 1;
const SAMPLER_BINDING: u32 = FIRST_TEXTURE_BINDING + TEXTURE_UNITS;

/// Handle of the 1x1 white texture filling unbound units.
const WHITE_TEXTURE: TextureHandle = TextureHandle(0);

// ---------------------------------------------------------------------------
// Vertex layout and uniforms
// ---------------------------------------------------------------------------

/// Vertex buffer layout of [`QuadVertex`] for the scene shaders.
fn quad_vertex_desc() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            wgpu::VertexAttribute {
                offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
            wgpu::VertexAttribute {
                offset: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32,
            },
        ],
    }
}

/// The uniform block shared by every program, laid out as WGSL expects.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck_derive::Pod, bytemuck_derive::Zeroable)]
pub struct Uniforms {
    pub projection: Mat4,
    pub model: Mat4,
    pub view: Mat4,
    pub texture_unit: i32,
    _padding: [i32; 3],
}

impl Default for Uniforms {
    fn default() -> Self {
        Self {
            projection: IDENTITY,
            model: IDENTITY,
            view: IDENTITY,
            texture_unit: 0,
            _padding: [0; 3],
        }
    }
}

// ---------------------------------------------------------------------------
// GPU-side objects
// ---------------------------------------------------------------------------

struct GpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct QuadBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    vertex_capacity: usize,
    index_count: u32,
}

struct Frame {
    output: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    cleared: bool,
}

// ---------------------------------------------------------------------------
// WgpuContext
// ---------------------------------------------------------------------------

/// A [`GpuContext`] drawing into a window surface.
pub struct WgpuContext {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    window: Arc<winit::window::Window>,
    clear_color: wgpu::Color,

    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    uniforms: Uniforms,

    textures: Vec<GpuTexture>,
    units: Vec<TextureHandle>,
    programs: Vec<wgpu::RenderPipeline>,
    bound_program: Option<ProgramHandle>,
    quad_buffers: Vec<QuadBuffers>,
    viewport: (u32, u32),
    frame: Option<Frame>,
}

impl WgpuContext {
    /// Initialize wgpu for `window`: surface, device, queue, shared layouts.
    ///
    /// This is an async function because wgpu adapter/device selection is
    /// asynchronous. Call with `.await` or use `pollster::block_on`.
    ///
    /// # Errors
    ///
    /// [`GpuError::Device`] if no suitable adapter or device is available,
    /// [`GpuError::Surface`] if the window surface cannot be created.
    pub async fn new(
        window: Arc<winit::window::Window>,
        clear_color: [f64; 4],
    ) -> Result<Self, GpuError> {
        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| GpuError::Surface(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| GpuError::Device("no suitable GPU adapter found".to_owned()))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("kiln_scene_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| GpuError::Device(e.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| GpuError::Surface("surface reports no formats".to_owned()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let bind_group_layout = create_bind_group_layout(&device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("kiln_scene_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("kiln_unit_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniforms = Uniforms::default();
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("kiln_uniforms"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let [r, g, b, a] = clear_color;
        let mut context = Self {
            surface,
            device,
            queue,
            config,
            window,
            clear_color: wgpu::Color { r, g, b, a },
            bind_group_layout,
            pipeline_layout,
            sampler,
            uniform_buffer,
            uniforms,
            textures: Vec::new(),
            units: vec![WHITE_TEXTURE; TEXTURE_UNITS as usize],
            programs: Vec::new(),
            bound_program: None,
            quad_buffers: Vec::new(),
            viewport: (width, height),
            frame: None,
        };

        let white = context.create_texture_rgba(1, 1, &[255, 255, 255, 255])?;
        debug_assert_eq!(white.handle, WHITE_TEXTURE);

        tracing::info!(
            width,
            height,
            format = ?format,
            backend = ?adapter.get_info().backend,
            "wgpu context initialized"
        );
        Ok(context)
    }

    /// Upload an RGBA8 image as a new texture.
    ///
    /// # Errors
    ///
    /// [`GpuError::TextureData`] if `rgba` is not `width * height * 4`
    /// bytes long.
    pub fn create_texture_rgba(
        &mut self,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<Texture, GpuError> {
        check_rgba_len(width, height, rgba)?;

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("kiln_texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let handle = TextureHandle(self.textures.len() as u32);
        self.textures.push(GpuTexture {
            _texture: texture,
            view,
        });
        Ok(Texture {
            handle,
            width,
            height,
        })
    }

    /// Resize the surface when the window size changes.
    ///
    /// Zero-sized requests (minimized windows) are ignored.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Current surface size in pixels.
    pub fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn window(&self) -> &winit::window::Window {
        &self.window
    }

    fn texture_view(&self, handle: TextureHandle) -> Result<&wgpu::TextureView, GpuError> {
        self.textures
            .get(handle.0 as usize)
            .map(|t| &t.view)
            .ok_or(GpuError::UnknownHandle {
                kind: "texture",
                id: handle.0,
            })
    }

    fn create_bind_group(&self) -> Result<wgpu::BindGroup, GpuError> {
        let views = self
            .units
            .iter()
            .map(|&handle| self.texture_view(handle))
            .collect::<Result<Vec<_>, _>>()?;

        let mut entries = Vec::with_capacity(views.len() + 2);
        entries.push(wgpu::BindGroupEntry {
            binding: UNIFORM_BINDING,
            resource: self.uniform_buffer.as_entire_binding(),
        });
        for (unit, view) in views.into_iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: FIRST_TEXTURE_BINDING + unit as u32,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }
        entries.push(wgpu::BindGroupEntry {
            binding: SAMPLER_BINDING,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        });

        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("kiln_units_bind_group"),
            layout: &self.bind_group_layout,
            entries: &entries,
        }))
    }

    fn quad_buffers(&self, handle: VertexArrayHandle) -> Result<&QuadBuffers, GpuError> {
        self.quad_buffers
            .get(handle.0 as usize)
            .ok_or(GpuError::UnknownHandle {
                kind: "vertex array",
                id: handle.0,
            })
    }

    fn require_program(&self) -> Result<ProgramHandle, GpuError> {
        self.bound_program.ok_or(GpuError::NoProgram)
    }

    fn create_module(&self, label: &str, source: &str) -> Result<wgpu::ShaderModule, GpuError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(GpuError::Compile(format!("{label}: {err}"))),
            None => Ok(module),
        }
    }

    /// Encode and submit one render pass, clearing first if this is the
    /// frame's first pass.
    fn submit_pass(&mut self, pipeline_index: usize, buffers: VertexArrayHandle, index_count: u32) -> Result<(), GpuError> {
        let bind_group = self.create_bind_group()?;
        let quad = self.quad_buffers(buffers)?;
        let pipeline = self
            .programs
            .get(pipeline_index)
            .ok_or(GpuError::NoProgram)?;
        let frame = self.frame.as_ref().ok_or(GpuError::NoFrame)?;

        let load = if frame.cleared {
            wgpu::LoadOp::Load
        } else {
            wgpu::LoadOp::Clear(self.clear_color)
        };
        let width = self.viewport.0.min(self.config.width).max(1);
        let height = self.viewport.1.min(self.config.height).max(1);
        let index_count = index_count.min(quad.index_count);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("kiln_scene_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("kiln_scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_vertex_buffer(0, quad.vertex.slice(..));
            pass.set_index_buffer(quad.index.slice(..), wgpu::IndexFormat::Uint32);
            if index_count > 0 {
                pass.draw_indexed(0..index_count, 0, 0..1);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        if let Some(frame) = self.frame.as_mut() {
            frame.cleared = true;
        }
        Ok(())
    }
}

fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let mut entries = Vec::with_capacity(TEXTURE_UNITS as usize + 2);
    entries.push(wgpu::BindGroupLayoutEntry {
        binding: UNIFORM_BINDING,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    });
    for unit in 0..TEXTURE_UNITS {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: FIRST_TEXTURE_BINDING + unit,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
    }
    entries.push(wgpu::BindGroupLayoutEntry {
        binding: SAMPLER_BINDING,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    });

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("kiln_units_bind_group_layout"),
        entries: &entries,
    })
}

impl GpuContext for WgpuContext {
    fn max_texture_units(&self) -> u32 {
        TEXTURE_UNITS
    }

    fn create_quad_buffers(
        &mut self,
        indices: &[u32],
        vertex_capacity: usize,
    ) -> Result<SceneBuffers, GpuError> {
        let stride = std::mem::size_of::<QuadVertex>();
        let vertex = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("kiln_quad_vertices"),
            size: (vertex_capacity.max(1) * stride) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        // An empty index list still needs a bindable buffer.
        let index_contents: &[u32] = if indices.is_empty() { &[0] } else { indices };
        let index = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("kiln_quad_indices"),
                contents: bytemuck::cast_slice(index_contents),
                usage: wgpu::BufferUsages::INDEX,
            });

        let id = self.quad_buffers.len() as u32;
        self.quad_buffers.push(QuadBuffers {
            vertex,
            index,
            vertex_capacity,
            index_count: indices.len() as u32,
        });
        tracing::debug!(id, vertex_capacity, indices = indices.len(), "quad buffers created");

        Ok(SceneBuffers {
            vertex_array: VertexArrayHandle(id),
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
        let target = self.quad_buffers(buffers.vertex_array)?;
        if vertices.len() > target.vertex_capacity {
            return Err(GpuError::BufferOverflow {
                len: vertices.len(),
                capacity: target.vertex_capacity,
            });
        }
        if !vertices.is_empty() {
            self.queue
                .write_buffer(&target.vertex, 0, bytemuck::cast_slice(vertices));
        }
        Ok(())
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) -> Result<(), GpuError> {
        self.texture_view(texture)?;
        let slot = self
            .units
            .get_mut(unit as usize)
            .ok_or(GpuError::TextureUnitOutOfRange {
                unit,
                available: TEXTURE_UNITS,
            })?;
        *slot = texture;
        Ok(())
    }

    fn use_program(&mut self, program: ProgramHandle) -> Result<(), GpuError> {
        if program.0 == 0 || program.0 as usize > self.programs.len() {
            return Err(GpuError::UnknownHandle {
                kind: "program",
                id: program.0,
            });
        }
        self.bound_program = Some(program);
        Ok(())
    }

    fn set_uniform_samplers(&mut self, name: &str, units: &[i32]) -> Result<(), GpuError> {
        self.require_program()?;
        if name != UNIFORM_TEXTURES {
            tracing::warn!(name, "unknown sampler array uniform");
            return Ok(());
        }
        // Units map one-to-one onto bindings; only the range is checked.
        if let Some(&unit) = units
            .iter()
            .find(|&&u| u < 0 || u as u32 >= TEXTURE_UNITS)
        {
            return Err(GpuError::TextureUnitOutOfRange {
                unit: unit.max(0) as u32,
                available: TEXTURE_UNITS,
            });
        }
        Ok(())
    }

    fn set_uniform_mat4(&mut self, name: &str, value: &Mat4) -> Result<(), GpuError> {
        self.require_program()?;
        match name {
            UNIFORM_PROJECTION => self.uniforms.projection = *value,
            UNIFORM_MODEL => self.uniforms.model = *value,
            UNIFORM_VIEW => self.uniforms.view = *value,
            _ => tracing::warn!(name, "unknown matrix uniform"),
        }
        Ok(())
    }

    fn set_uniform_i32(&mut self, name: &str, value: i32) -> Result<(), GpuError> {
        self.require_program()?;
        if name == UNIFORM_TEXTURE {
            self.uniforms.texture_unit = value;
        } else {
            tracing::warn!(name, "unknown integer uniform");
        }
        Ok(())
    }

    fn draw_indexed(&mut self, buffers: &SceneBuffers, index_count: u32) -> Result<(), GpuError> {
        let program = self.require_program()?;
        if self.frame.is_none() {
            return Err(GpuError::NoFrame);
        }
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));
        self.submit_pass(program.0 as usize - 1, buffers.vertex_array, index_count)
    }

    fn compile_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramHandle, GpuError> {
        let vertex = self.create_module("vertex stage", vertex_source)?;
        let fragment = self.create_module("fragment stage", fragment_source)?;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("kiln_scene_pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex,
                    entry_point: Some("vs_main"),
                    buffers: &[quad_vertex_desc()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.config.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
                cache: None,
            });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(GpuError::Link(err.to_string()));
        }

        self.programs.push(pipeline);
        Ok(ProgramHandle(self.programs.len() as u32))
    }

    fn begin_frame(&mut self) -> Result<(), GpuError> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                self.surface
                    .get_current_texture()
                    .map_err(|e| GpuError::Surface(e.to_string()))?
            }
            Err(e) => return Err(GpuError::Surface(e.to_string())),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.frame = Some(Frame {
            output,
            view,
            cleared: false,
        });
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), GpuError> {
        let frame = self.frame.take().ok_or(GpuError::NoFrame)?;

        if !frame.cleared {
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("kiln_clear_encoder"),
                });
            encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("kiln_clear_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.queue.submit(std::iter::once(encoder.finish()));
        }

        frame.output.present();
        Ok(())
    }
}
