//! WebGPU render pipelines for the globe scene
//!
//! Opaque passes (land dots, arc lines, markers) draw first; the translucent
//! globe sphere draws last over them with depth testing, so arcs on the far
//! side show through tinted.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;

use super::registry::ArcResources;
use super::shapes::{self, Mesh};
use super::vertex::{ColorVertex, MarkerInstance, MeshVertex};
use crate::camera::OrbitCamera;
use crate::consts::*;
use crate::sim::{GlobeEvent, GlobeState};
use crate::{hex_to_rgb, srgb_to_linear};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Marker sphere tessellation
const MARKER_SEGMENTS: u32 = 12;
/// Phong specular color (0x111111)
const SPECULAR: f32 = 0x11 as f32 / 255.0;

// ============================================================================
// GPU DATA STRUCTURES (must match globe.wgsl)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Globals {
    view_proj: [[f32; 4]; 4], // offset 0
    eye: [f32; 4],            // offset 64
    light_dir: [f32; 4],      // offset 80
    globe_color: [f32; 4],    // offset 96 - linear rgb + opacity
    lighting: [f32; 4],       // offset 112 - ambient, directional, shininess, specular
}

impl Globals {
    fn new(camera: &OrbitCamera) -> Self {
        let eye = camera.eye();
        let light = Vec3::from_array(LIGHT_POSITION).normalize();
        let [r, g, b] = srgb_to_linear(hex_to_rgb(GLOBE_COLOR));
        Self {
            view_proj: camera.view_proj().to_cols_array_2d(),
            eye: [eye.x, eye.y, eye.z, 1.0],
            light_dir: [light.x, light.y, light.z, 0.0],
            globe_color: [r, g, b, GLOBE_OPACITY],
            lighting: [
                AMBIENT_INTENSITY,
                LIGHT_INTENSITY,
                GLOBE_SHININESS,
                srgb_to_linear([SPECULAR; 3])[0],
            ],
        }
    }
}

struct MeshBuffers {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

impl MeshBuffers {
    fn upload(device: &wgpu::Device, mesh: &Mesh, label: &str) -> Self {
        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertices,
            indices,
            index_count: mesh.indices.len() as u32,
        }
    }
}

/// Per-pipeline knobs; everything else is shared
struct PipelineSpec<'a> {
    label: &'a str,
    vs: &'a str,
    fs: &'a str,
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    topology: wgpu::PrimitiveTopology,
    cull_mode: Option<wgpu::Face>,
    blend: wgpu::BlendState,
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    spec: PipelineSpec<'_>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(spec.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(spec.vs),
            buffers: spec.buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(spec.fs),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(spec.blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: spec.topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: spec.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

// ============================================================================
// GLOBE RENDER STATE
// ============================================================================

pub struct GlobeRenderState {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,

    dot_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    marker_pipeline: wgpu::RenderPipeline,
    globe_pipeline: wgpu::RenderPipeline,

    globals_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,

    globe_mesh: MeshBuffers,
    marker_mesh: MeshBuffers,
    marker_instances: wgpu::Buffer,
    marker_capacity: usize,
    marker_count: u32,

    dots: Option<(wgpu::Buffer, u32)>,
    arc_lines: ArcResources<wgpu::Buffer>,

    pub size: (u32, u32),
}

impl GlobeRenderState {
    pub async fn new(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        width: u32,
        height: u32,
        sphere_segments: u32,
    ) -> Result<Self, wgpu::RequestDeviceError> {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("globe-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await?;

        let surface_caps = surface.get_capabilities(adapter);
        log::info!("Surface formats: {:?}", surface_caps.formats);
        log::info!("Surface alpha modes: {:?}", surface_caps.alpha_modes);

        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        // Transparent canvas so the page shows behind the globe
        let alpha_mode = [
            wgpu::CompositeAlphaMode::PreMultiplied,
            wgpu::CompositeAlphaMode::PostMultiplied,
        ]
        .into_iter()
        .find(|m| surface_caps.alpha_modes.contains(m))
        .unwrap_or(surface_caps.alpha_modes[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        log::info!(
            "Surface config: {}x{}, format: {:?}, alpha: {:?}",
            config.width,
            config.height,
            config.format,
            config.alpha_mode
        );
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("globe_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("globe.wgsl").into()),
        });

        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("globals"),
            contents: bytemuck::bytes_of(&Globals::new(&OrbitCamera::new(
                config.width as f32 / config.height as f32,
            ))),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globe_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globe_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("globe_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let format = config.format;
        let dot_pipeline = create_pipeline(
            &device,
            &layout,
            &shader,
            format,
            PipelineSpec {
                label: "dot_pipeline",
                vs: "vs_color",
                fs: "fs_color",
                buffers: &[ColorVertex::desc()],
                topology: wgpu::PrimitiveTopology::PointList,
                cull_mode: None,
                blend: wgpu::BlendState::REPLACE,
            },
        );
        let line_pipeline = create_pipeline(
            &device,
            &layout,
            &shader,
            format,
            PipelineSpec {
                label: "line_pipeline",
                vs: "vs_color",
                fs: "fs_color",
                buffers: &[ColorVertex::desc()],
                topology: wgpu::PrimitiveTopology::LineStrip,
                cull_mode: None,
                blend: wgpu::BlendState::REPLACE,
            },
        );
        let marker_pipeline = create_pipeline(
            &device,
            &layout,
            &shader,
            format,
            PipelineSpec {
                label: "marker_pipeline",
                vs: "vs_marker",
                fs: "fs_color",
                buffers: &[MeshVertex::desc(), MarkerInstance::desc()],
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                blend: wgpu::BlendState::REPLACE,
            },
        );
        let globe_pipeline = create_pipeline(
            &device,
            &layout,
            &shader,
            format,
            PipelineSpec {
                label: "globe_pipeline",
                vs: "vs_globe",
                fs: "fs_globe",
                buffers: &[MeshVertex::desc()],
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                blend: wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
            },
        );

        let globe_mesh = MeshBuffers::upload(
            &device,
            &shapes::uv_sphere(RADIUS, sphere_segments, sphere_segments),
            "globe",
        );
        let marker_mesh = MeshBuffers::upload(
            &device,
            &shapes::uv_sphere(1.0, MARKER_SEGMENTS, MARKER_SEGMENTS),
            "marker",
        );

        let marker_capacity = 64;
        let marker_instances = Self::create_instance_buffer(&device, marker_capacity);
        let depth_view = create_depth_view(&device, config.width, config.height);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            dot_pipeline,
            line_pipeline,
            marker_pipeline,
            globe_pipeline,
            globals_buffer,
            bind_group,
            depth_view,
            globe_mesh,
            marker_mesh,
            marker_instances,
            marker_capacity,
            marker_count: 0,
            dots: None,
            arc_lines: ArcResources::new(),
            size: (width, height),
        })
    }

    fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("marker_instances"),
            size: (std::mem::size_of::<MarkerInstance>() * capacity) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width > 0 && new_height > 0 {
            self.size = (new_width, new_height);
            self.config.width = new_width;
            self.config.height = new_height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, new_width, new_height);
        }
    }

    /// Create and release GPU resources for simulation events
    pub fn apply_events(&mut self, state: &GlobeState, events: &[GlobeEvent]) {
        let device = &self.device;
        self.arc_lines.apply(
            state,
            events,
            |arc| {
                let vertices = shapes::arc_line_vertices(arc);
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("arc_line"),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                })
            },
            |buffer| buffer.destroy(),
        );

        for event in events {
            let GlobeEvent::DotsPlaced { count, .. } = *event else {
                continue;
            };
            let Some(dots) = state.land_dots.as_ref() else {
                continue;
            };
            if let Some((old, _)) = self.dots.take() {
                old.destroy();
            }
            if count == 0 {
                continue;
            }
            let vertices = shapes::land_dot_vertices(dots);
            let buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("land_dots"),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
            self.dots = Some((buffer, vertices.len() as u32));
        }
    }

    fn upload_markers(&mut self, state: &GlobeState) {
        let instances = shapes::marker_instances(&state.arcs);
        if instances.len() > self.marker_capacity {
            self.marker_capacity = instances.len().next_power_of_two();
            self.marker_instances.destroy();
            self.marker_instances = Self::create_instance_buffer(&self.device, self.marker_capacity);
        }
        if !instances.is_empty() {
            self.queue
                .write_buffer(&self.marker_instances, 0, bytemuck::cast_slice(&instances));
        }
        self.marker_count = instances.len() as u32;
    }

    /// Update GPU buffers from the scene and render
    pub fn render(
        &mut self,
        state: &GlobeState,
        camera: &OrbitCamera,
    ) -> Result<(), wgpu::SurfaceError> {
        self.queue.write_buffer(
            &self.globals_buffer,
            0,
            bytemuck::bytes_of(&Globals::new(camera)),
        );
        self.upload_markers(state);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("globe_encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("globe_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            render_pass.set_bind_group(0, &self.bind_group, &[]);

            if let Some((buffer, count)) = &self.dots {
                render_pass.set_pipeline(&self.dot_pipeline);
                render_pass.set_vertex_buffer(0, buffer.slice(..));
                render_pass.draw(0..*count, 0..1);
            }

            render_pass.set_pipeline(&self.line_pipeline);
            for arc in &state.arcs {
                let range = arc.draw_range();
                if range.len() < 2 {
                    continue;
                }
                if let Some(buffer) = self.arc_lines.get(arc.id) {
                    render_pass.set_vertex_buffer(0, buffer.slice(..));
                    render_pass.draw(range, 0..1);
                }
            }

            if self.marker_count > 0 {
                render_pass.set_pipeline(&self.marker_pipeline);
                render_pass.set_vertex_buffer(0, self.marker_mesh.vertices.slice(..));
                render_pass.set_vertex_buffer(1, self.marker_instances.slice(..));
                render_pass.set_index_buffer(
                    self.marker_mesh.indices.slice(..),
                    wgpu::IndexFormat::Uint32,
                );
                render_pass.draw_indexed(0..self.marker_mesh.index_count, 0, 0..self.marker_count);
            }

            // Translucent globe last
            render_pass.set_pipeline(&self.globe_pipeline);
            render_pass.set_vertex_buffer(0, self.globe_mesh.vertices.slice(..));
            render_pass.set_index_buffer(
                self.globe_mesh.indices.slice(..),
                wgpu::IndexFormat::Uint32,
            );
            render_pass.draw_indexed(0..self.globe_mesh.index_count, 0, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}
