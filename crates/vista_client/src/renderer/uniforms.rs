use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};
use vista_core::camera::Camera;
use vista_core::lighting::{Light, MAX_LIGHTS};

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    pub enabled: i32,
    pub kind: i32,
    _padding0: [i32; 2],
    pub position: [f32; 3],
    _padding1: f32,
    pub target: [f32; 3],
    _padding2: f32,
    pub color: [f32; 4],
}
const _: [(); 64] = [(); std::mem::size_of::<LightUniform>()];

impl LightUniform {
    pub fn from_light(light: &Light) -> Self {
        Self {
            enabled: i32::from(light.enabled),
            kind: light.kind.shader_value(),
            position: light.position.to_array(),
            target: light.target.to_array(),
            color: light.color_normalized().to_array(),
            ..Self::default()
        }
    }
}

/// Mirrors `FrameUniforms` in both WGSL programs.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    pub look_at: [[f32; 4]; 4],
    pub view_pos: [f32; 3],
    pub fovy: f32,
    pub ambient: [f32; 4],
    pub lights: [LightUniform; MAX_LIGHTS],
    pub screen_width: i32,
    pub screen_height: i32,
    pub is_portal: i32,
    _padding: i32,
}
const _: [(); 432] = [(); std::mem::size_of::<FrameUniform>()];

/// Lighting and screen state shared by every pass of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    pub light: Light,
    pub ambient: Vec4,
    pub is_portal: bool,
    pub screen_width: u32,
    pub screen_height: u32,
}

impl FrameParams {
    pub fn aspect(&self) -> f32 {
        self.screen_width.max(1) as f32 / self.screen_height.max(1) as f32
    }
}

impl FrameUniform {
    /// `camera` supplies the projection and view position; `look_at` is the
    /// viewer-aligned matrix the portal program re-projects with, and `fovy`
    /// always follows `viewer_fovy`.
    pub fn new(camera: &Camera, look_at: Mat4, viewer_fovy: f32, params: &FrameParams) -> Self {
        let mut lights = [LightUniform::default(); MAX_LIGHTS];
        lights[0] = LightUniform::from_light(&params.light);

        Self {
            view_proj: camera
                .view_projection_matrix(params.aspect())
                .to_cols_array_2d(),
            look_at: look_at.to_cols_array_2d(),
            view_pos: camera.position.to_array(),
            fovy: viewer_fovy,
            ambient: params.ambient.to_array(),
            lights,
            screen_width: params.screen_width as i32,
            screen_height: params.screen_height as i32,
            is_portal: i32::from(params.is_portal),
            _padding: 0,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct MaterialUniform {
    pub model: [[f32; 4]; 4],
    pub diffuse: [f32; 4],
}
const _: [(); 80] = [(); std::mem::size_of::<MaterialUniform>()];

impl MaterialUniform {
    pub fn new(model: Mat4, diffuse: [f32; 4]) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            diffuse,
        }
    }
}
