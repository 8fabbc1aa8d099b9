pub mod mesh;
pub mod pipeline;
pub mod portal_renderer;
pub mod uniforms;

use std::fmt;
use std::sync::Arc;

use bytemuck::Zeroable;
use glam::Mat4;
use vista_core::camera::Camera;
use vista_core::lighting::RAYWHITE;
use vista_core::portal::PortalView;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::model::ModelData;
use crate::renderer::mesh::{GpuModel, SceneTexture};
use crate::renderer::pipeline::{SceneLayouts, ScenePipeline};
use crate::renderer::portal_renderer::{clear_color, PortalRenderer};
use crate::renderer::uniforms::{FrameParams, FrameUniform};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[derive(Debug)]
struct DepthTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthTexture {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Vista Depth Texture"),
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
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Loaded models and where they sit in the world.
pub struct SceneAssets<'a> {
    pub gallery: &'a ModelData,
    pub gallery_transform: Mat4,
    pub island: &'a ModelData,
    pub island_transform: Mat4,
    /// Index of the gallery mesh that shows the island.
    pub portal_mesh: usize,
}

#[derive(Debug)]
pub enum RendererInitError {
    CreateSurface(wgpu::CreateSurfaceError),
    RequestAdapter(wgpu::RequestAdapterError),
    RequestDevice(wgpu::RequestDeviceError),
    UnsupportedSurface,
    EmptyPortalMesh(usize),
}

impl fmt::Display for RendererInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateSurface(err) => write!(f, "failed to create surface: {err}"),
            Self::RequestAdapter(err) => write!(f, "failed to request adapter: {err}"),
            Self::RequestDevice(err) => write!(f, "failed to request device: {err}"),
            Self::UnsupportedSurface => write!(f, "adapter does not support this surface"),
            Self::EmptyPortalMesh(index) => {
                write!(f, "portal mesh {index} has no triangles to draw")
            }
        }
    }
}

impl std::error::Error for RendererInitError {}

pub struct Renderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    depth_texture: DepthTexture,
    layouts: SceneLayouts,
    lighting_pipeline: ScenePipeline,
    portal_renderer: PortalRenderer,
    frame_uniform_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    portal_frame_uniform_buffer: wgpu::Buffer,
    portal_frame_bind_group: wgpu::BindGroup,
    gallery: GpuModel,
    island: GpuModel,
    portal_mesh: usize,
    /// Look-at matrix of the last portal render; the surface projection must
    /// match the view currently held in the off-screen target.
    portal_look_at: Mat4,
    clear: wgpu::Color,
    _fallback_texture: SceneTexture,
    _material_sampler: wgpu::Sampler,
}

impl Renderer {
    pub fn new(window: Arc<Window>, assets: &SceneAssets<'_>) -> Result<Self, RendererInitError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(RendererInitError::CreateSurface)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(RendererInitError::RequestAdapter)?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Vista Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(RendererInitError::RequestDevice)?;

        let initial_size = window.inner_size();
        let surface_config = surface
            .get_default_config(&adapter, initial_size.width.max(1), initial_size.height.max(1))
            .ok_or(RendererInitError::UnsupportedSurface)?;
        surface.configure(&device, &surface_config);

        let layouts = SceneLayouts::new(&device);
        let lighting_pipeline =
            ScenePipeline::lighting(&device, &layouts, surface_config.format, DEPTH_FORMAT);

        let material_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let fallback_texture =
            SceneTexture::solid(&device, &queue, [255, 255, 255, 255], "Fallback Diffuse Texture");

        let gallery = GpuModel::upload(
            &device,
            &queue,
            &layouts,
            assets.gallery,
            assets.gallery_transform,
            &fallback_texture,
            &material_sampler,
            "Gallery",
        );
        let island = GpuModel::upload(
            &device,
            &queue,
            &layouts,
            assets.island,
            assets.island_transform,
            &fallback_texture,
            &material_sampler,
            "Island",
        );
        let portal_params = &gallery
            .mesh(assets.portal_mesh)
            .ok_or(RendererInitError::EmptyPortalMesh(assets.portal_mesh))?
            .params_buffer;

        let portal_renderer = PortalRenderer::new(
            &device,
            &layouts,
            surface_config.format,
            DEPTH_FORMAT,
            portal_params,
            surface_config.width,
            surface_config.height,
        );

        let (frame_uniform_buffer, frame_bind_group) =
            create_frame_binding(&device, &layouts, "Main Frame");
        let (portal_frame_uniform_buffer, portal_frame_bind_group) =
            create_frame_binding(&device, &layouts, "Portal Frame");
        let depth_texture = DepthTexture::new(&device, surface_config.width, surface_config.height);
        let clear = clear_color(RAYWHITE, surface_config.format);

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
            depth_texture,
            layouts,
            lighting_pipeline,
            portal_renderer,
            frame_uniform_buffer,
            frame_bind_group,
            portal_frame_uniform_buffer,
            portal_frame_bind_group,
            gallery,
            island,
            portal_mesh: assets.portal_mesh,
            portal_look_at: Mat4::IDENTITY,
            clear,
            _fallback_texture: fallback_texture,
            _material_sampler: material_sampler,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_texture = DepthTexture::new(&self.device, width, height);
        if let Some(portal_mesh) = self.gallery.mesh(self.portal_mesh) {
            self.portal_renderer.resize(
                &self.device,
                &self.layouts,
                &portal_mesh.params_buffer,
                width,
                height,
            );
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    pub fn portal_target_size(&self) -> (u32, u32) {
        self.portal_renderer.target_size()
    }

    /// Renders the island from `view` into the off-screen target and submits
    /// immediately, so it can run before the first frame as well as inside it.
    pub fn render_portal(&mut self, view: &PortalView, viewer_fovy: f32, params: &FrameParams) {
        let uniform = FrameUniform::new(&view.camera, view.look_at, viewer_fovy, params);
        self.queue.write_buffer(
            &self.portal_frame_uniform_buffer,
            0,
            bytemuck::bytes_of(&uniform),
        );
        self.portal_look_at = view.look_at;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Portal Command Encoder"),
            });
        self.portal_renderer.render_view(
            &mut encoder,
            &self.lighting_pipeline,
            &self.portal_frame_bind_group,
            &self.island,
            self.clear,
        );
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    pub fn render_frame(&mut self, camera: &Camera, params: &FrameParams) -> Result<(), wgpu::SurfaceError> {
        let uniform = FrameUniform::new(camera, self.portal_look_at, camera.fovy, params);
        self.queue
            .write_buffer(&self.frame_uniform_buffer, 0, bytemuck::bytes_of(&uniform));

        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Vista Command Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Vista Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(self.lighting_pipeline.pipeline());
            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
            self.gallery.draw(&mut render_pass, Some(self.portal_mesh));
            self.island.draw(&mut render_pass, None);

            if let Some(portal_mesh) = self.gallery.mesh(self.portal_mesh) {
                self.portal_renderer
                    .render_surface(&mut render_pass, &self.frame_bind_group, portal_mesh);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

fn create_frame_binding(
    device: &wgpu::Device,
    layouts: &SceneLayouts,
    label: &str,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{label} Uniform Buffer")),
        contents: bytemuck::bytes_of(&FrameUniform::zeroed()),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("{label} Bind Group")),
        layout: &layouts.frame,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    });
    (buffer, bind_group)
}
