//! Loaded models: meshes plus the materials they reference

use std::sync::atomic::{AtomicU64, Ordering};

use crate::backend::types::{VertexBufferLayout, VertexSemantic, Vertex};
use crate::resources::{Material, Mesh};

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a model's mesh data; clones share it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId(u64);

/// A set of meshes sharing one material table
#[derive(Debug, Clone)]
pub struct Model {
    id: ModelId,
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
    /// Vertex semantics and the shader locations they feed
    attributes: Vec<(VertexSemantic, u32)>,
}

impl Model {
    pub fn new(meshes: Vec<Mesh>, materials: Vec<Material>, attributes: Vec<(VertexSemantic, u32)>) -> Self {
        Self {
            id: ModelId(NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed)),
            meshes,
            materials,
            attributes,
        }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn material(&self, index: usize) -> Option<&Material> {
        self.materials.get(index)
    }

    pub fn material_mut(&mut self, index: usize) -> Option<&mut Material> {
        self.materials.get_mut(index)
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn materials_mut(&mut self) -> &mut [Material] {
        &mut self.materials
    }

    /// Material used to draw a mesh, if its index is valid
    pub fn mesh_material(&self, mesh: &Mesh) -> Option<&Material> {
        mesh.material_index.and_then(|index| self.materials.get(index))
    }

    pub fn attributes(&self) -> &[(VertexSemantic, u32)] {
        &self.attributes
    }

    pub fn vertex_layout(&self) -> VertexBufferLayout {
        Vertex::layout(&self.attributes)
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }
}
