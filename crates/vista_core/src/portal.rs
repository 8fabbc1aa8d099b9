use std::fmt;

use glam::{Mat4, Vec3};

use crate::camera::Camera;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorError {
    EmptyMesh,
    RaggedPositions(usize),
}

impl fmt::Display for AnchorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMesh => write!(f, "portal mesh has no vertices"),
            Self::RaggedPositions(len) => {
                write!(f, "position buffer length {len} is not a multiple of 3")
            }
        }
    }
}

impl std::error::Error for AnchorError {}

/// World-space center of the portal surface. Computed once from the portal
/// mesh and never moved afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortalAnchor {
    position: Vec3,
}

impl PortalAnchor {
    pub fn new(position: Vec3) -> Self {
        Self { position }
    }

    /// Sums the vertices in order and scales the sum by
    /// `scale / vertex_count`, so identical inputs give identical bits.
    pub fn from_vertices<I>(vertices: I, scale: f32) -> Result<Self, AnchorError>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut sum = Vec3::ZERO;
        let mut count = 0usize;
        for vertex in vertices {
            sum.x += vertex.x;
            sum.y += vertex.y;
            sum.z += vertex.z;
            count += 1;
        }

        if count == 0 {
            return Err(AnchorError::EmptyMesh);
        }

        let scalar = scale / count as f32;
        Ok(Self {
            position: sum * scalar,
        })
    }

    /// Same as [`PortalAnchor::from_vertices`] for a flat `xyzxyz...` buffer.
    pub fn from_flat_positions(positions: &[f32], scale: f32) -> Result<Self, AnchorError> {
        if positions.len() % 3 != 0 {
            return Err(AnchorError::RaggedPositions(positions.len()));
        }
        Self::from_vertices(
            positions
                .chunks_exact(3)
                .map(|p| Vec3::new(p[0], p[1], p[2])),
            scale,
        )
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn distance_to(&self, point: Vec3) -> f32 {
        (point - self.position).length()
    }
}

/// Camera used to render the linked scene plus the viewer-aligned look-at
/// matrix the portal shader re-projects texture coordinates with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortalView {
    pub camera: Camera,
    pub look_at: Mat4,
}

/// Moves `base` by the viewer's offset from the anchor and points it along the
/// viewer's look direction. The base camera's own look direction is dropped.
pub fn project_portal_camera(viewer: &Camera, base: &Camera, anchor: &PortalAnchor) -> PortalView {
    let offset = viewer.position - anchor.position();

    let mut camera = *base;
    camera.position = base.position + offset;
    camera.target = camera.position + viewer.look_vector();

    PortalView {
        camera,
        look_at: viewer.view_matrix(),
    }
}
