//! Texture loading and management

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::error::{ViewerError, ViewerResult};
use image::{DynamicImage, GenericImageView};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Texture`], used to cache GPU uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(u64);

impl TextureId {
    fn next() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Loaded texture data
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub data: Vec<u8>,
    pub name: String,
}

impl TextureData {
    /// Load texture from file
    pub fn from_file<P: AsRef<Path>>(path: P, srgb: bool) -> ViewerResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let img = image::open(path).map_err(|e| ViewerError::ImageLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self::from_image(img, &name, srgb))
    }

    fn from_image(img: DynamicImage, name: &str, srgb: bool) -> Self {
        let (width, height) = img.dimensions();
        let data = img.to_rgba8().into_raw();

        Self {
            width,
            height,
            format: if srgb {
                TextureFormat::Rgba8UnormSrgb
            } else {
                TextureFormat::Rgba8Unorm
            },
            data,
            name: name.to_string(),
        }
    }

    /// Create a solid color texture
    pub fn solid_color(color: [u8; 4], format: TextureFormat, name: &str) -> Self {
        Self {
            width: 1,
            height: 1,
            format,
            data: color.to_vec(),
            name: name.to_string(),
        }
    }

    /// Create a default white texture
    pub fn white() -> Self {
        Self::solid_color([255, 255, 255, 255], TextureFormat::Rgba8UnormSrgb, "white")
    }

    /// Create a default normal map (pointing up)
    pub fn default_normal() -> Self {
        // Normal pointing up: (0, 0, 1) in tangent space
        // Encoded as RGB: (0.5, 0.5, 1.0) * 255 = (128, 128, 255)
        Self::solid_color([128, 128, 255, 255], TextureFormat::Rgba8Unorm, "default_normal")
    }

    /// Flip rows so that the first row becomes the bottom of the image
    pub fn flip_vertical(&mut self) {
        let row = (self.width * self.format.bytes_per_pixel()) as usize;
        let rows = self.height as usize;
        for y in 0..rows / 2 {
            let (top, bottom) = self.data.split_at_mut((rows - 1 - y) * row);
            top[y * row..(y + 1) * row].swap_with_slice(&mut bottom[..row]);
        }
    }
}

/// An immutable texture asset shared between materials.
///
/// Texels live on the CPU until a renderer uploads them; every layer holds its
/// full mip chain, largest level first.
pub struct Texture {
    id: TextureId,
    name: String,
    width: u32,
    height: u32,
    format: TextureFormat,
    dimension: TextureDimension,
    layers: Vec<Vec<Vec<u8>>>,
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size", &(self.width, self.height))
            .field("format", &self.format)
            .field("dimension", &self.dimension)
            .field("mip_count", &self.mip_count())
            .finish()
    }
}

impl Texture {
    /// Wrap single-level 2D texel data
    pub fn from_data(data: TextureData) -> Self {
        Self {
            id: TextureId::next(),
            name: data.name,
            width: data.width,
            height: data.height,
            format: data.format,
            dimension: TextureDimension::D2,
            layers: vec![vec![data.data]],
        }
    }

    /// Build a cubemap from six faces, each with the same mip chain length
    pub fn cube(name: &str, size: u32, format: TextureFormat, faces: Vec<Vec<Vec<u8>>>) -> Self {
        debug_assert_eq!(faces.len(), 6);
        Self {
            id: TextureId::next(),
            name: name.to_string(),
            width: size,
            height: size,
            format,
            dimension: TextureDimension::Cube,
            layers: faces,
        }
    }

    pub fn white() -> Self {
        Self::from_data(TextureData::white())
    }

    pub fn default_normal() -> Self {
        Self::from_data(TextureData::default_normal())
    }

    /// Single-texel black cubemap
    pub fn black_cube() -> Self {
        let face = vec![vec![0u8, 0, 0, 255]];
        Self::cube("black_cube", 1, TextureFormat::Rgba8Unorm, vec![face; 6])
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn dimension(&self) -> TextureDimension {
        self.dimension
    }

    pub fn mip_count(&self) -> u32 {
        self.layers.first().map_or(0, |mips| mips.len() as u32)
    }

    /// Highest mip level a sampler may select
    pub fn max_lod(&self) -> f32 {
        self.mip_count().saturating_sub(1) as f32
    }

    /// Texels of one mip level of one layer
    pub fn level(&self, layer: u32, mip: u32) -> Option<&[u8]> {
        self.layers
            .get(layer as usize)?
            .get(mip as usize)
            .map(Vec::as_slice)
    }
}

/// GPU texture with its default view
#[derive(Debug, Clone, Copy)]
pub struct GpuTexture {
    pub handle: TextureHandle,
    pub view: TextureViewHandle,
}

impl GpuTexture {
    /// Create and upload every layer and mip level of a texture
    pub fn create<B: GraphicsBackend + ?Sized>(
        backend: &mut B,
        texture: &Texture,
    ) -> BackendResult<Self> {
        let handle = backend.create_texture(&TextureDescriptor {
            label: Some(texture.name.clone()),
            width: texture.width,
            height: texture.height,
            dimension: texture.dimension,
            mip_levels: texture.mip_count().max(1),
            format: texture.format,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
        })?;

        for (layer, mips) in texture.layers.iter().enumerate() {
            for (mip, texels) in mips.iter().enumerate() {
                let region = TextureWrite {
                    mip_level: mip as u32,
                    layer: layer as u32,
                    width: (texture.width >> mip).max(1),
                    height: (texture.height >> mip).max(1),
                };
                backend.write_texture(handle, texels, &region);
            }
        }

        let view = backend.create_texture_view(handle, texture.dimension)?;
        Ok(Self { handle, view })
    }
}

/// Loads 2D textures from disk, sharing repeated paths
#[derive(Default)]
pub struct Texture2DLoader {
    flip_vertical: bool,
    cache: Mutex<HashMap<(PathBuf, bool), Arc<Texture>>>,
}

impl Texture2DLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip images so that UV (0, 0) addresses the bottom-left texel
    pub fn with_flip_vertical(mut self, flip: bool) -> Self {
        self.flip_vertical = flip;
        self
    }

    pub fn set_flip_vertical(&mut self, flip: bool) {
        self.flip_vertical = flip;
    }

    pub fn flip_vertical(&self) -> bool {
        self.flip_vertical
    }

    /// Load an image; `srgb` selects color-encoded storage
    pub fn load(&self, path: impl AsRef<Path>, srgb: bool) -> ViewerResult<Arc<Texture>> {
        let path = path.as_ref();
        let key = (path.to_path_buf(), srgb);
        if let Some(texture) = self.cache.lock().get(&key) {
            return Ok(Arc::clone(texture));
        }

        let mut data = TextureData::from_file(path, srgb)?;
        if self.flip_vertical {
            data.flip_vertical();
        }
        log::info!("Loaded texture {} ({}x{})", path.display(), data.width, data.height);

        let texture = Arc::new(Texture::from_data(data));
        self.cache.lock().insert(key, Arc::clone(&texture));
        Ok(texture)
    }
}
