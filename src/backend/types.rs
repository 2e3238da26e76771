//! Plain descriptors passed through [`GraphicsBackend`](super::GraphicsBackend)

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Pixel formats of model textures, skybox faces, depth and the swapchain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    /// Linear HDR, used for environment cubemaps
    Rgba16Float,
    Depth32Float,
}

impl TextureFormat {
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba16Float => 8,
            _ => 4,
        }
    }
}

/// Shape of a texture resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureDimension {
    #[default]
    D2,
    /// Six square faces stored as array layers
    Cube,
}

impl TextureDimension {
    pub fn layer_count(&self) -> u32 {
        match self {
            TextureDimension::D2 => 1,
            TextureDimension::Cube => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureUsage(u32);

impl TextureUsage {
    pub const COPY_DST: Self = Self(1 << 1);
    pub const TEXTURE_BINDING: Self = Self(1 << 2);
    pub const RENDER_ATTACHMENT: Self = Self(1 << 4);

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOr for TextureUsage {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferUsage(u32);

impl BufferUsage {
    pub const COPY_DST: Self = Self(1 << 3);
    pub const INDEX: Self = Self(1 << 4);
    pub const VERTEX: Self = Self(1 << 5);
    pub const UNIFORM: Self = Self(1 << 6);

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOr for BufferUsage {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub dimension: TextureDimension,
    pub mip_levels: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            width: 1,
            height: 1,
            dimension: TextureDimension::D2,
            mip_levels: 1,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
        }
    }
}

/// Target region of a texture upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureWrite {
    pub mip_level: u32,
    /// Array layer; the face index for cubemaps
    pub layer: u32,
    pub width: u32,
    pub height: u32,
}

impl TextureWrite {
    /// Full write of mip 0, layer 0
    pub fn base(width: u32, height: u32) -> Self {
        Self {
            mip_level: 0,
            layer: 0,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    pub size: u64,
    pub usage: BufferUsage,
}

/// Vertex attribute format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    pub fn size(&self) -> u64 {
        match self {
            VertexFormat::Float32 => 4,
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }
}

/// Vertex attribute description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u64,
}

/// Per-vertex buffer layout; the viewer never draws instanced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexBufferLayout {
    pub array_stride: u64,
    pub attributes: Vec<VertexAttribute>,
}

/// Meaning of a vertex attribute, independent of the shader input it feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VertexSemantic {
    Position,
    Normal,
    Tangent,
    Bitangent,
    TexCoord0,
}

impl VertexSemantic {
    pub const ALL: [VertexSemantic; 5] = [
        VertexSemantic::Position,
        VertexSemantic::Normal,
        VertexSemantic::Tangent,
        VertexSemantic::Bitangent,
        VertexSemantic::TexCoord0,
    ];
}

/// Standard vertex with position, normal, tangent frame and UV
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    pub const STRIDE: u64 = std::mem::size_of::<Self>() as u64;

    /// Byte offset and format of a semantic inside [`Vertex`]
    pub fn attribute(semantic: VertexSemantic) -> (u64, VertexFormat) {
        match semantic {
            VertexSemantic::Position => (0, VertexFormat::Float32x3),
            VertexSemantic::Normal => (12, VertexFormat::Float32x3),
            VertexSemantic::Tangent => (24, VertexFormat::Float32x3),
            VertexSemantic::Bitangent => (36, VertexFormat::Float32x3),
            VertexSemantic::TexCoord0 => (48, VertexFormat::Float32x2),
        }
    }

    /// Build a layout that feeds each semantic to the given shader location
    pub fn layout(locations: &[(VertexSemantic, u32)]) -> VertexBufferLayout {
        VertexBufferLayout {
            array_stride: Self::STRIDE,
            attributes: locations
                .iter()
                .map(|&(semantic, location)| {
                    let (offset, format) = Self::attribute(semantic);
                    VertexAttribute {
                        location,
                        format,
                        offset,
                    }
                })
                .collect(),
        }
    }
}

/// Faces dropped by the rasterizer; triangles are always counter-clockwise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Back,
}

/// Depth test; the skybox passes at the far plane with `LessEqual`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareFunction {
    Less,
    LessEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    ClampToEdge,
    Repeat,
}

/// Trilinear sampler; only the wrap mode varies
#[derive(Debug, Clone)]
pub struct SamplerDescriptor {
    pub label: Option<String>,
    pub address_mode: AddressMode,
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            address_mode: AddressMode::ClampToEdge,
        }
    }
}

impl SamplerDescriptor {
    /// Repeating UVs, used for model textures
    pub fn repeat(label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
            address_mode: AddressMode::Repeat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_attribute_offsets_match_struct_layout() {
        assert_eq!(Vertex::STRIDE, 56);
        let mut end = 0;
        for semantic in VertexSemantic::ALL {
            let (offset, format) = Vertex::attribute(semantic);
            assert_eq!(offset, end, "{semantic:?} is not packed after the previous field");
            end = offset + format.size();
        }
        assert_eq!(end, Vertex::STRIDE);
    }

    #[test]
    fn layout_uses_requested_locations() {
        let layout = Vertex::layout(&[
            (VertexSemantic::Position, 0),
            (VertexSemantic::TexCoord0, 4),
        ]);
        assert_eq!(layout.attributes.len(), 2);
        assert_eq!(layout.attributes[1].location, 4);
        assert_eq!(layout.attributes[1].offset, 48);
        assert_eq!(layout.attributes[1].format, VertexFormat::Float32x2);
    }

    #[test]
    fn cube_dimension_has_six_layers() {
        assert_eq!(TextureDimension::Cube.layer_count(), 6);
        assert_eq!(TextureDimension::D2.layer_count(), 1);
    }
}
