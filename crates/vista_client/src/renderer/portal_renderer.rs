use tracing::debug;

use crate::renderer::mesh::{create_material_bind_group, GpuMesh, GpuModel};
use crate::renderer::pipeline::{SceneLayouts, ScenePipeline};

const PORTAL_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const RTT_SCALE: u32 = 2;

struct PortalRenderTarget {
    _color_texture: wgpu::Texture,
    color_view: wgpu::TextureView,
    _depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
}

/// Off-screen target the linked scene is drawn into, and the pipeline that
/// maps it onto the portal mesh of the host scene.
pub struct PortalRenderer {
    surface_pipeline: ScenePipeline,
    sampler: wgpu::Sampler,
    target: PortalRenderTarget,
    surface_bind_group: wgpu::BindGroup,
    target_width: u32,
    target_height: u32,
    color_format: wgpu::TextureFormat,
    max_dimension: u32,
}

impl PortalRenderer {
    pub fn new(
        device: &wgpu::Device,
        layouts: &SceneLayouts,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
        portal_params: &wgpu::Buffer,
        width: u32,
        height: u32,
    ) -> Self {
        let surface_pipeline = ScenePipeline::portal(device, layouts, color_format, depth_format);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Portal RTT Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let max_dimension = device.limits().max_texture_dimension_2d;
        let target_width = target_dimension(width, max_dimension);
        let target_height = target_dimension(height, max_dimension);
        let target = create_target(device, target_width, target_height, color_format);
        let surface_bind_group =
            create_surface_bind_group(device, layouts, portal_params, &target, &sampler);

        Self {
            surface_pipeline,
            sampler,
            target,
            surface_bind_group,
            target_width,
            target_height,
            color_format,
            max_dimension,
        }
    }

    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        layouts: &SceneLayouts,
        portal_params: &wgpu::Buffer,
        width: u32,
        height: u32,
    ) {
        let target_width = target_dimension(width, self.max_dimension);
        let target_height = target_dimension(height, self.max_dimension);
        if target_width == self.target_width && target_height == self.target_height {
            return;
        }

        debug!("Recreating portal target at {target_width}x{target_height}");
        self.target = create_target(device, target_width, target_height, self.color_format);
        self.surface_bind_group =
            create_surface_bind_group(device, layouts, portal_params, &self.target, &self.sampler);
        self.target_width = target_width;
        self.target_height = target_height;
    }

    pub fn target_size(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    /// Clears the off-screen target and draws `scene` into it.
    pub fn render_view(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        scene_pipeline: &ScenePipeline,
        frame_bind_group: &wgpu::BindGroup,
        scene: &GpuModel,
        clear: wgpu::Color,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Portal View Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.target.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        render_pass.set_pipeline(scene_pipeline.pipeline());
        render_pass.set_bind_group(0, frame_bind_group, &[]);
        scene.draw(&mut render_pass, None);
    }

    /// Draws the portal mesh textured with the off-screen target.
    pub fn render_surface<'a>(
        &'a self,
        render_pass: &mut wgpu::RenderPass<'a>,
        frame_bind_group: &'a wgpu::BindGroup,
        portal_mesh: &'a GpuMesh,
    ) {
        render_pass.set_pipeline(self.surface_pipeline.pipeline());
        render_pass.set_bind_group(0, frame_bind_group, &[]);
        render_pass.set_bind_group(1, &self.surface_bind_group, &[]);
        portal_mesh.draw(render_pass);
    }
}

/// Twice the window dimension, kept within the device texture limit.
fn target_dimension(dimension: u32, max_dimension: u32) -> u32 {
    dimension
        .max(1)
        .saturating_mul(RTT_SCALE)
        .min(max_dimension.max(1))
}

/// Converts an 8-bit sRGB color to a clear value for `format`.
pub fn clear_color(color: [u8; 4], format: wgpu::TextureFormat) -> wgpu::Color {
    let channel = |value: u8| {
        let value = value as f64 / 255.0;
        if format.is_srgb() {
            srgb_to_linear(value)
        } else {
            value
        }
    };
    wgpu::Color {
        r: channel(color[0]),
        g: channel(color[1]),
        b: channel(color[2]),
        a: color[3] as f64 / 255.0,
    }
}

fn srgb_to_linear(value: f64) -> f64 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

fn create_target(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    color_format: wgpu::TextureFormat,
) -> PortalRenderTarget {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let color_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Portal RTT Color Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: color_format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let color_view = color_texture.create_view(&wgpu::TextureViewDescriptor::default());

    let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Portal RTT Depth Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: PORTAL_DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());

    PortalRenderTarget {
        _color_texture: color_texture,
        color_view,
        _depth_texture: depth_texture,
        depth_view,
    }
}

fn create_surface_bind_group(
    device: &wgpu::Device,
    layouts: &SceneLayouts,
    portal_params: &wgpu::Buffer,
    target: &PortalRenderTarget,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    create_material_bind_group(
        device,
        &layouts.material,
        portal_params,
        &target.color_view,
        sampler,
        "Portal Surface Bind Group",
    )
}
