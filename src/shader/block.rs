use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3, Vec4};

use super::{UniformBlock, UniformType};
use crate::error::{ViewerError, ViewerResult};
use crate::resources::UniformValue;

/// CPU-side bytes of one reflected uniform block
#[derive(Debug, Clone)]
pub struct UniformBlockData {
    layout: Arc<UniformBlock>,
    bytes: Vec<u8>,
    revision: u64,
}

impl UniformBlockData {
    pub fn new(layout: Arc<UniformBlock>) -> Self {
        let bytes = vec![0; layout.size as usize];
        Self {
            layout,
            bytes,
            revision: 0,
        }
    }

    pub fn layout(&self) -> &UniformBlock {
        &self.layout
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Incremented by every successful [`UniformBlockData::set`]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layout.member(name).is_some()
    }

    pub fn set(&mut self, name: &str, value: &UniformValue) -> ViewerResult<()> {
        let layout = Arc::clone(&self.layout);
        let member = layout
            .member(name)
            .ok_or_else(|| ViewerError::UnknownUniform(name.to_string()))?;
        let offset = member.offset as usize;
        let mismatch = || ViewerError::UniformTypeMismatch {
            name: name.to_string(),
            expected: member.ty.name(),
            found: value.type_name(),
        };

        match (member.ty, value) {
            (UniformType::Float, UniformValue::Float(v)) => self.write(offset, bytemuck::bytes_of(v)),
            (UniformType::Vec2, UniformValue::Vec2(v)) => self.write(offset, bytemuck::bytes_of(v)),
            (UniformType::Vec3, UniformValue::Vec3(v)) => self.write(offset, bytemuck::bytes_of(v)),
            (UniformType::Vec4, UniformValue::Vec4(v)) => self.write(offset, bytemuck::bytes_of(v)),
            (UniformType::Mat4, UniformValue::Mat4(v)) => self.write(offset, bytemuck::bytes_of(v)),
            _ => return Err(mismatch()),
        }
        self.revision += 1;
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) {
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
    }

    /// Decode a member back into a value
    pub fn get(&self, name: &str) -> Option<UniformValue> {
        let member = self.layout.member(name)?;
        let start = member.offset as usize;
        let bytes = self.bytes.get(start..start + member.ty.size() as usize)?;
        Some(match member.ty {
            UniformType::Float => UniformValue::Float(bytemuck::pod_read_unaligned(bytes)),
            UniformType::Vec2 => UniformValue::Vec2(bytemuck::pod_read_unaligned::<Vec2>(bytes)),
            UniformType::Vec3 => UniformValue::Vec3(bytemuck::pod_read_unaligned::<Vec3>(bytes)),
            UniformType::Vec4 => UniformValue::Vec4(bytemuck::pod_read_unaligned::<Vec4>(bytes)),
            UniformType::Mat4 => UniformValue::Mat4(bytemuck::pod_read_unaligned::<Mat4>(bytes)),
            UniformType::Texture2D | UniformType::TextureCube => return None,
        })
    }
}
