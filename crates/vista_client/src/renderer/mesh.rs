use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use tracing::{debug, warn};
use wgpu::util::DeviceExt;

use crate::model::{MeshData, ModelData};
use crate::renderer::pipeline::SceneLayouts;
use crate::renderer::uniforms::MaterialUniform;

const FALLBACK_TEXTURE_SIZE: u32 = 16;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SceneVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
}
const _: [(); 32] = [(); std::mem::size_of::<SceneVertex>()];

impl SceneVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2
    ];

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SceneVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

pub fn build_vertices(mesh: &MeshData) -> Vec<SceneVertex> {
    mesh.positions
        .iter()
        .zip(&mesh.normals)
        .zip(&mesh.tex_coords)
        .map(|((position, normal), tex_coord)| SceneVertex {
            position: *position,
            normal: *normal,
            tex_coord: *tex_coord,
        })
        .collect()
}

/// Translates in model space first, then scales uniformly.
pub fn model_transform(scale: f32, offset: Vec3) -> Mat4 {
    Mat4::from_scale(Vec3::splat(scale)) * Mat4::from_translation(offset)
}

#[derive(Debug)]
pub struct SceneTexture {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl SceneTexture {
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &image::RgbaImage,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: image.width().max(1),
            height: image.height().max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * size.width),
                rows_per_image: Some(size.height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }

    pub fn solid(device: &wgpu::Device, queue: &wgpu::Queue, color: [u8; 4], label: &str) -> Self {
        let image = image::RgbaImage::from_pixel(
            FALLBACK_TEXTURE_SIZE,
            FALLBACK_TEXTURE_SIZE,
            image::Rgba(color),
        );
        Self::from_image(device, queue, &image, label)
    }
}

#[derive(Debug)]
pub struct GpuMesh {
    /// Index into the source model's mesh list.
    pub index: usize,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    pub params_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl GpuMesh {
    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// One model uploaded with a fixed world transform.
#[derive(Debug)]
pub struct GpuModel {
    meshes: Vec<GpuMesh>,
    _textures: Vec<SceneTexture>,
}

impl GpuModel {
    #[allow(clippy::too_many_arguments)]
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &SceneLayouts,
        model: &ModelData,
        transform: Mat4,
        fallback: &SceneTexture,
        sampler: &wgpu::Sampler,
        label: &str,
    ) -> Self {
        let textures: Vec<Option<SceneTexture>> = model
            .materials
            .iter()
            .map(|material| {
                let path = material.diffuse_texture.as_ref()?;
                match image::open(path) {
                    Ok(image) => Some(SceneTexture::from_image(
                        device,
                        queue,
                        &image.to_rgba8(),
                        &format!("{label} Texture {}", material.name),
                    )),
                    Err(err) => {
                        warn!("Failed to load texture {}: {err}", path.display());
                        None
                    }
                }
            })
            .collect();

        let mut meshes = Vec::with_capacity(model.meshes.len());
        for (index, mesh) in model.meshes.iter().enumerate() {
            if mesh.indices.is_empty() {
                debug!("skipping empty mesh {} in {label}", mesh.name);
                continue;
            }

            let material = model.material_for(mesh);
            let diffuse = material.map_or([1.0; 4], |material| material.diffuse);
            let texture = mesh
                .material_id
                .and_then(|id| textures.get(id))
                .and_then(Option::as_ref)
                .unwrap_or(fallback);

            meshes.push(upload_mesh(
                device, layouts, mesh, index, transform, diffuse, texture, sampler, label,
            ));
        }

        Self {
            meshes,
            _textures: textures.into_iter().flatten().collect(),
        }
    }

    pub fn mesh(&self, index: usize) -> Option<&GpuMesh> {
        self.meshes.iter().find(|mesh| mesh.index == index)
    }

    /// Draws every mesh except `skip` with the currently bound pipeline.
    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>, skip: Option<usize>) {
        for mesh in &self.meshes {
            if Some(mesh.index) == skip {
                continue;
            }
            render_pass.set_bind_group(1, &mesh.bind_group, &[]);
            mesh.draw(render_pass);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn upload_mesh(
    device: &wgpu::Device,
    layouts: &SceneLayouts,
    mesh: &MeshData,
    index: usize,
    transform: Mat4,
    diffuse: [f32; 4],
    texture: &SceneTexture,
    sampler: &wgpu::Sampler,
    label: &str,
) -> GpuMesh {
    let vertices = build_vertices(mesh);
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{label} Vertex Buffer {}", mesh.name)),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{label} Index Buffer {}", mesh.name)),
        contents: bytemuck::cast_slice(&mesh.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    let params = MaterialUniform::new(transform, diffuse);
    let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{label} Material Buffer {}", mesh.name)),
        contents: bytemuck::bytes_of(&params),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let bind_group = create_material_bind_group(
        device,
        &layouts.material,
        &params_buffer,
        &texture.view,
        sampler,
        &format!("{label} Material Bind Group {}", mesh.name),
    );

    GpuMesh {
        index,
        vertex_buffer,
        index_buffer,
        index_count: mesh.indices.len() as u32,
        params_buffer,
        bind_group,
    }
}

pub fn create_material_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    params_buffer: &wgpu::Buffer,
    texture_view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(texture_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}
