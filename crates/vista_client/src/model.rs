use std::fmt;
use std::path::{Path, PathBuf};

use glam::Vec3;
use tracing::{debug, warn};
use vista_core::portal::{AnchorError, PortalAnchor};

#[derive(Debug)]
pub enum ModelLoadError {
    Tobj(PathBuf, tobj::LoadError),
    NoMeshes(PathBuf),
    MissingPortalMesh { material_index: usize },
    Anchor(AnchorError),
}

impl fmt::Display for ModelLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tobj(path, err) => write!(f, "failed to load {}: {err}", path.display()),
            Self::NoMeshes(path) => write!(f, "{} contains no meshes", path.display()),
            Self::MissingPortalMesh { material_index } => {
                write!(f, "no mesh uses portal material {material_index}")
            }
            Self::Anchor(err) => write!(f, "failed to compute portal anchor: {err}"),
        }
    }
}

impl std::error::Error for ModelLoadError {}

impl From<AnchorError> for ModelLoadError {
    fn from(err: AnchorError) -> Self {
        Self::Anchor(err)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub material_id: Option<usize>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn from_tobj(model: tobj::Model) -> Self {
        let name = model.name;
        let mesh = model.mesh;
        let positions: Vec<[f32; 3]> = mesh
            .positions
            .chunks_exact(3)
            .map(|p| [p[0], p[1], p[2]])
            .collect();

        let tex_coords = if mesh.texcoords.len() / 2 == positions.len() {
            // OBJ puts v = 0 at the bottom of the image.
            mesh.texcoords
                .chunks_exact(2)
                .map(|uv| [uv[0], 1.0 - uv[1]])
                .collect()
        } else {
            vec![[0.0, 0.0]; positions.len()]
        };

        let normals = if mesh.normals.len() / 3 == positions.len() {
            mesh.normals
                .chunks_exact(3)
                .map(|n| [n[0], n[1], n[2]])
                .collect()
        } else {
            debug!("mesh {name} has no normals; generating smooth normals");
            smooth_normals(&positions, &mesh.indices)
        };

        Self {
            name,
            positions,
            normals,
            tex_coords,
            indices: mesh.indices,
            material_id: mesh.material_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialData {
    pub name: String,
    pub diffuse: [f32; 4],
    pub diffuse_texture: Option<PathBuf>,
}

impl MaterialData {
    fn from_tobj(material: tobj::Material, base_dir: &Path) -> Self {
        let [r, g, b] = material.diffuse.unwrap_or([1.0, 1.0, 1.0]);
        let alpha = material.dissolve.unwrap_or(1.0);
        Self {
            name: material.name,
            diffuse: [r, g, b, alpha],
            diffuse_texture: material
                .diffuse_texture
                .filter(|texture| !texture.is_empty())
                .map(|texture| base_dir.join(texture)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelData {
    pub source: PathBuf,
    pub meshes: Vec<MeshData>,
    pub materials: Vec<MaterialData>,
}

impl ModelData {
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        let (models, materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)
            .map_err(|err| ModelLoadError::Tobj(path.to_path_buf(), err))?;
        let materials = materials.unwrap_or_else(|err| {
            warn!("No materials for {}: {err}", path.display());
            Vec::new()
        });
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_tobj(path, models, materials, base_dir)
    }

    fn from_tobj(
        path: &Path,
        models: Vec<tobj::Model>,
        materials: Vec<tobj::Material>,
        base_dir: &Path,
    ) -> Result<Self, ModelLoadError> {
        if models.is_empty() {
            return Err(ModelLoadError::NoMeshes(path.to_path_buf()));
        }

        Ok(Self {
            source: path.to_path_buf(),
            meshes: models.into_iter().map(MeshData::from_tobj).collect(),
            materials: materials
                .into_iter()
                .map(|material| MaterialData::from_tobj(material, base_dir))
                .collect(),
        })
    }

    pub fn material_for(&self, mesh: &MeshData) -> Option<&MaterialData> {
        mesh.material_id.and_then(|id| self.materials.get(id))
    }

    /// First mesh drawn with `material_index`.
    pub fn portal_mesh(&self, material_index: usize) -> Result<(usize, &MeshData), ModelLoadError> {
        self.meshes
            .iter()
            .enumerate()
            .find(|(_, mesh)| mesh.material_id == Some(material_index))
            .ok_or(ModelLoadError::MissingPortalMesh { material_index })
    }

    pub fn portal_anchor(
        &self,
        material_index: usize,
        scale: f32,
    ) -> Result<PortalAnchor, ModelLoadError> {
        let (_, mesh) = self.portal_mesh(material_index)?;
        let vertices = mesh.positions.iter().copied().map(Vec3::from);
        Ok(PortalAnchor::from_vertices(vertices, scale)?)
    }
}

fn smooth_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut accumulated = vec![Vec3::ZERO; positions.len()];
    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let pa = Vec3::from(positions[a]);
        let pb = Vec3::from(positions[b]);
        let pc = Vec3::from(positions[c]);
        // Unnormalized so larger faces weigh more.
        let face = (pb - pa).cross(pc - pa);
        accumulated[a] += face;
        accumulated[b] += face;
        accumulated[c] += face;
    }

    accumulated
        .into_iter()
        .map(|normal| normal.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::Path;

    use glam::Vec3;

    use super::{smooth_normals, ModelData, ModelLoadError};

    const GALLERY_OBJ: &str = "\
o wall
v -1.0 0.0 -0.5
v 1.0 0.0 -0.5
v 1.0 0.4 -0.5
v -1.0 0.4 -0.5
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0.0 0.0 1.0
f 1/1/1 2/2/1 3/3/1 4/4/1
o opening
v 0.25 0.1 -0.4
v 0.35 0.1 -0.4
v 0.35 0.3 -0.4
v 0.25 0.3 -0.4
f 5 6 7 8
";

    fn load_gallery(portal_material: usize) -> ModelData {
        let (models, _) = tobj::load_obj_buf(
            &mut Cursor::new(GALLERY_OBJ),
            &tobj::GPU_LOAD_OPTIONS,
            |_| Err(tobj::LoadError::OpenFileFailed),
        )
        .unwrap();
        let mut models = models;
        models[0].mesh.material_id = Some(0);
        models[1].mesh.material_id = Some(portal_material);
        ModelData::from_tobj(Path::new("gallery.obj"), models, Vec::new(), Path::new("."))
            .unwrap()
    }

    #[test]
    fn obj_meshes_are_triangulated_and_flipped() {
        let gallery = load_gallery(4);
        assert_eq!(gallery.meshes.len(), 2);

        let wall = &gallery.meshes[0];
        assert_eq!(wall.vertex_count(), 4);
        assert_eq!(wall.indices.len(), 6);
        assert!(wall.tex_coords.contains(&[0.0, 1.0]));
        assert!(wall.tex_coords.contains(&[1.0, 0.0]));
        assert!(wall.normals.iter().all(|n| *n == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn missing_normals_and_uvs_are_filled_in() {
        let gallery = load_gallery(4);
        let opening = &gallery.meshes[1];
        assert_eq!(opening.tex_coords, vec![[0.0, 0.0]; 4]);
        for normal in &opening.normals {
            assert!(Vec3::from(*normal).distance(Vec3::Z) < 1.0e-5);
        }
    }

    #[test]
    fn portal_mesh_is_first_with_matching_material() {
        let gallery = load_gallery(4);
        let (index, mesh) = gallery.portal_mesh(4).unwrap();
        assert_eq!(index, 1);
        assert_eq!(mesh.name, "opening");

        let (index, _) = load_gallery(0).portal_mesh(0).unwrap();
        assert_eq!(index, 0);

        assert!(matches!(
            gallery.portal_mesh(7),
            Err(ModelLoadError::MissingPortalMesh { material_index: 7 })
        ));
    }

    #[test]
    fn portal_anchor_is_scaled_mesh_center() {
        let gallery = load_gallery(4);
        let anchor = gallery.portal_anchor(4, 10.0).unwrap();
        assert!(anchor.position().distance(Vec3::new(3.0, 2.0, -4.0)) < 1.0e-5);
    }

    #[test]
    fn empty_model_is_rejected() {
        let result = ModelData::from_tobj(
            Path::new("empty.obj"),
            Vec::new(),
            Vec::new(),
            Path::new("."),
        );
        assert!(matches!(result, Err(ModelLoadError::NoMeshes(_))));
    }

    #[test]
    fn smooth_normals_ignore_out_of_range_indices() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]];
        let normals = smooth_normals(&positions, &[0, 1, 2, 0, 1, 9]);
        for normal in normals {
            assert!(Vec3::from(normal).distance(Vec3::Y) < 1.0e-5);
        }
    }
}
