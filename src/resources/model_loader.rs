//! OBJ/MTL model loading on top of `tobj`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::{Vec2, Vec3};

use crate::backend::types::{Vertex, VertexSemantic};
use crate::error::{ViewerError, ViewerResult};
use crate::resources::{Material, Mesh, Model, Texture, Texture2DLoader, UniformValue};

/// MTL properties that can be copied into material uniforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialProperty {
    DiffuseColor,
    DiffuseTexture,
    NormalTexture,
    SpecularTexture,
}

/// Builds [`Model`]s whose materials are clones of one default material
pub struct ModelLoader {
    default_material: Material,
    create_materials: bool,
    texture_loader: Texture2DLoader,
    attributes: Vec<(VertexSemantic, String)>,
    properties: Vec<(MaterialProperty, String)>,
}

impl ModelLoader {
    pub fn new(default_material: Material) -> Self {
        Self {
            default_material,
            create_materials: false,
            texture_loader: Texture2DLoader::new(),
            attributes: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// When enabled, every MTL material becomes its own material clone
    pub fn set_create_materials(&mut self, create: bool) {
        self.create_materials = create;
    }

    pub fn texture_loader_mut(&mut self) -> &mut Texture2DLoader {
        &mut self.texture_loader
    }

    /// Feed a vertex semantic to the vertex input with this name
    pub fn set_material_attribute(&mut self, semantic: VertexSemantic, name: &str) {
        self.attributes.retain(|(s, _)| *s != semantic);
        self.attributes.push((semantic, name.to_string()));
    }

    /// Copy an MTL property into the material uniform with this name
    pub fn set_material_property(&mut self, property: MaterialProperty, name: &str) {
        self.properties.retain(|(p, _)| *p != property);
        self.properties.push((property, name.to_string()));
    }

    pub fn load(&self, path: impl AsRef<Path>) -> ViewerResult<Model> {
        let path = path.as_ref();
        let options = tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ignore_points: true,
            ignore_lines: true,
            ..Default::default()
        };
        let (obj_models, obj_materials) =
            tobj::load_obj(path, &options).map_err(|e| ViewerError::ModelLoad {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let obj_materials = match obj_materials {
            Ok(materials) => materials,
            Err(e) => {
                log::warn!("No usable MTL for {}: {}", path.display(), e);
                Vec::new()
            }
        };

        let attributes = self.resolve_attributes();
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let neutral = NeutralTextures::new();
        let from_mtl = self.create_materials && !obj_materials.is_empty();
        let mut materials = if from_mtl {
            obj_materials
                .iter()
                .map(|m| self.create_material(m, &base_dir, &neutral))
                .collect::<ViewerResult<Vec<_>>>()?
        } else {
            vec![self.shared_material(&neutral)?]
        };
        let tagged = materials.len();
        // Objects without a usable usemtl share one default, appended on demand
        let mut untagged = (!from_mtl).then_some(0);

        let mut meshes = Vec::with_capacity(obj_models.len());
        for m in &obj_models {
            let material_index = match m.mesh.material_id.filter(|&id| id < tagged) {
                Some(id) => id,
                None => match untagged {
                    Some(index) => index,
                    None => {
                        log::debug!("{} has no material, using the default", m.name);
                        materials.push(self.shared_material(&neutral)?.with_name("default"));
                        let index = materials.len() - 1;
                        untagged = Some(index);
                        index
                    }
                },
            };
            meshes.push(convert_mesh(m, material_index));
        }

        log::info!(
            "Loaded model {}: {} meshes, {} materials",
            path.display(),
            meshes.len(),
            materials.len()
        );
        Ok(Model::new(meshes, materials, attributes))
    }

    fn resolve_attributes(&self) -> Vec<(VertexSemantic, u32)> {
        let program = self.default_material.program();
        self.attributes
            .iter()
            .filter_map(|(semantic, name)| match program.vertex_input(name) {
                Some(input) => Some((*semantic, input.location)),
                None => {
                    log::warn!("Vertex input {} not used by {}, skipping {:?}", name, program.label(), semantic);
                    None
                }
            })
            .collect()
    }

    fn create_material(
        &self,
        source: &tobj::Material,
        base_dir: &Path,
        neutral: &NeutralTextures,
    ) -> ViewerResult<Material> {
        let mut material = self.default_material.clone();
        material.set_name(source.name.clone());

        for (property, uniform) in &self.properties {
            let value: UniformValue = match property {
                MaterialProperty::DiffuseColor => match source.diffuse {
                    Some(color) => Vec3::from_array(color).into(),
                    None => continue,
                },
                MaterialProperty::DiffuseTexture => {
                    self.texture_or(&source.diffuse_texture, base_dir, true, &neutral.white)?
                }
                MaterialProperty::NormalTexture => {
                    self.texture_or(&source.normal_texture, base_dir, false, &neutral.normal)?
                }
                MaterialProperty::SpecularTexture => {
                    self.texture_or(&source.specular_texture, base_dir, false, &neutral.white)?
                }
            };
            material.set_uniform_value(uniform, value)?;
        }

        Ok(material)
    }

    /// The default material with neutral textures in its unbound texture slots
    fn shared_material(&self, neutral: &NeutralTextures) -> ViewerResult<Material> {
        let mut material = self.default_material.clone();
        for (property, uniform) in &self.properties {
            let fallback = match property {
                MaterialProperty::DiffuseColor => continue,
                MaterialProperty::NormalTexture => &neutral.normal,
                MaterialProperty::DiffuseTexture | MaterialProperty::SpecularTexture => &neutral.white,
            };
            if matches!(material.uniform_value(uniform), Some(UniformValue::Texture(None))) {
                material.set_uniform_value(uniform, Arc::clone(fallback))?;
            }
        }
        Ok(material)
    }

    fn texture_or(
        &self,
        file: &Option<String>,
        base_dir: &Path,
        srgb: bool,
        fallback: &Arc<Texture>,
    ) -> ViewerResult<UniformValue> {
        let texture = match file.as_deref().filter(|f| !f.is_empty()) {
            Some(file) => self.texture_loader.load(texture_path(base_dir, file), srgb)?,
            None => Arc::clone(fallback),
        };
        Ok(texture.into())
    }
}

struct NeutralTextures {
    white: Arc<Texture>,
    normal: Arc<Texture>,
}

impl NeutralTextures {
    fn new() -> Self {
        Self {
            white: Arc::new(Texture::white()),
            normal: Arc::new(Texture::default_normal()),
        }
    }
}

/// MTL texture paths are relative to the OBJ file and may use backslashes
fn texture_path(base_dir: &Path, file: &str) -> PathBuf {
    base_dir.join(file.replace('\\', "/"))
}

fn convert_mesh(model: &tobj::Model, material_index: usize) -> Mesh {
    let source = &model.mesh;
    let vertex_count = source.positions.len() / 3;
    let has_normals = source.normals.len() == source.positions.len();
    let has_uvs = source.texcoords.len() / 2 == vertex_count;

    let mut mesh = Mesh::new(&model.name).with_material(material_index);
    mesh.vertices = (0..vertex_count)
        .map(|i| Vertex {
            position: Vec3::from_slice(&source.positions[i * 3..i * 3 + 3]),
            normal: if has_normals {
                Vec3::from_slice(&source.normals[i * 3..i * 3 + 3])
            } else {
                Vec3::ZERO
            },
            tangent: Vec3::ZERO,
            bitangent: Vec3::ZERO,
            uv: if has_uvs {
                Vec2::from_slice(&source.texcoords[i * 2..i * 2 + 2])
            } else {
                Vec2::ZERO
            },
        })
        .collect();
    mesh.indices = source.indices.clone();

    if !has_normals {
        compute_normals(&mut mesh);
    }
    mesh.compute_tangents();
    mesh
}

/// Area-weighted smooth normals for meshes that ship without them
fn compute_normals(mesh: &mut Mesh) {
    let mut normals = vec![Vec3::ZERO; mesh.vertices.len()];
    for tri in mesh.indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a.max(b).max(c) >= mesh.vertices.len() {
            continue;
        }
        let p = |i: usize| mesh.vertices[i].position;
        let face = (p(b) - p(a)).cross(p(c) - p(a));
        for i in [a, b, c] {
            normals[i] += face;
        }
    }
    for (vertex, normal) in mesh.vertices.iter_mut().zip(normals) {
        vertex.normal = normal.normalize_or_zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_paths_are_relative_to_the_model() {
        let path = texture_path(Path::new("models/tea_set"), "textures\\cup_d.png");
        assert_eq!(path, PathBuf::from("models/tea_set/textures/cup_d.png"));
    }

    #[test]
    fn missing_normals_are_rebuilt_from_faces() {
        let mut mesh = Mesh::new("tri");
        for position in [Vec3::ZERO, Vec3::X, Vec3::Y] {
            mesh.vertices.push(Vertex {
                position,
                normal: Vec3::ZERO,
                tangent: Vec3::ZERO,
                bitangent: Vec3::ZERO,
                uv: Vec2::ZERO,
            });
        }
        mesh.indices = vec![0, 1, 2];
        compute_normals(&mut mesh);
        assert!(mesh.vertices.iter().all(|v| v.normal.abs_diff_eq(Vec3::Z, 1e-6)));
    }
}
