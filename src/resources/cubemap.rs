//! Equirectangular HDR environment maps converted to cubemaps on the CPU.

use std::path::Path;
use std::sync::Arc;

use glam::{Vec2, Vec3, Vec4};
use half::f16;

use crate::backend::types::TextureFormat;
use crate::error::{ViewerError, ViewerResult};
use crate::resources::Texture;

/// Loads a panorama and resamples it into a mipmapped `Rgba16Float` cubemap
#[derive(Debug, Clone, Default)]
pub struct CubemapLoader {
    face_size: Option<u32>,
}

impl CubemapLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the face resolution; defaults to a quarter of the panorama width
    pub fn with_face_size(mut self, size: u32) -> Self {
        self.face_size = Some(size.max(1));
        self
    }

    pub fn load(&self, path: impl AsRef<Path>) -> ViewerResult<Arc<Texture>> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|e| ViewerError::ImageLoad {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
            .to_rgba32f();
        let (width, height) = image.dimensions();
        let texels = image.into_raw();

        let size = self.face_size.unwrap_or((width / 4).max(1));
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("environment");
        let texture = equirect_to_cubemap(name, &texels, width, height, size);
        log::info!(
            "Loaded environment {} ({}x{} -> {}px faces, {} mips)",
            path.display(),
            width,
            height,
            size,
            texture.mip_count()
        );
        Ok(Arc::new(texture))
    }
}

/// Number of levels in a full mip chain for a square of `size` texels
pub fn mip_count(size: u32) -> u32 {
    32 - size.max(1).leading_zeros()
}

/// World direction through texel `(x, y)` of a cubemap face, in +X, -X, +Y, -Y, +Z, -Z order
pub fn cubemap_dir(face: u32, x: u32, y: u32, size: u32) -> Vec3 {
    let u = (x as f32 + 0.5) / size as f32 * 2.0 - 1.0;
    let v = (y as f32 + 0.5) / size as f32 * 2.0 - 1.0;

    let dir = match face {
        0 => Vec3::new(1.0, -v, -u),
        1 => Vec3::new(-1.0, -v, u),
        2 => Vec3::new(u, 1.0, v),
        3 => Vec3::new(u, -1.0, -v),
        4 => Vec3::new(u, -v, 1.0),
        _ => Vec3::new(-u, -v, -1.0),
    };

    dir.normalize()
}

fn sample_equirect(texels: &[f32], width: u32, height: u32, dir: Vec3) -> Vec4 {
    let inv_atan = Vec2::new(
        0.5 * std::f32::consts::FRAC_1_PI,
        std::f32::consts::FRAC_1_PI,
    );
    let uv = Vec2::new(dir.z.atan2(dir.x), dir.y.clamp(-1.0, 1.0).asin()) * inv_atan + 0.5;

    let x = ((uv.x * width as f32) as u32).min(width - 1);
    let y = (((1.0 - uv.y) * height as f32) as u32).min(height - 1);
    let idx = ((y * width + x) * 4) as usize;

    Vec4::new(texels[idx], texels[idx + 1], texels[idx + 2], 1.0)
}

/// 2x2 box filter of one level into the next
fn downsample(level: &[Vec4], size: u32) -> Vec<Vec4> {
    let half = (size / 2).max(1);
    let mut out = Vec::with_capacity((half * half) as usize);
    for y in 0..half {
        for x in 0..half {
            let mut sum = Vec4::ZERO;
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let sx = (x * 2 + dx).min(size - 1);
                let sy = (y * 2 + dy).min(size - 1);
                sum += level[(sy * size + sx) as usize];
            }
            out.push(sum * 0.25);
        }
    }
    out
}

fn encode_f16(level: &[Vec4]) -> Vec<u8> {
    let halves: Vec<f16> = level
        .iter()
        .flat_map(|texel| texel.to_array())
        .map(f16::from_f32)
        .collect();
    bytemuck::cast_slice(&halves).to_vec()
}

/// Resample RGBA32F panorama texels into a cubemap with a full mip chain
pub fn equirect_to_cubemap(name: &str, texels: &[f32], width: u32, height: u32, size: u32) -> Texture {
    let levels = mip_count(size);
    let faces = (0..6)
        .map(|face| {
            let mut level: Vec<Vec4> = (0..size * size)
                .map(|i| {
                    let dir = cubemap_dir(face, i % size, i / size, size);
                    sample_equirect(texels, width, height, dir)
                })
                .collect();

            let mut mips = Vec::with_capacity(levels as usize);
            let mut level_size = size;
            for _ in 0..levels {
                mips.push(encode_f16(&level));
                level = downsample(&level, level_size);
                level_size = (level_size / 2).max(1);
            }
            mips
        })
        .collect();

    Texture::cube(name, size, TextureFormat::Rgba16Float, faces)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_count_covers_full_chain() {
        assert_eq!(mip_count(1), 1);
        assert_eq!(mip_count(2), 2);
        assert_eq!(mip_count(256), 9);
        assert_eq!(mip_count(300), 9);
    }

    #[test]
    fn face_centers_point_along_axes() {
        let size = 3;
        let axes = [Vec3::X, -Vec3::X, Vec3::Y, -Vec3::Y, Vec3::Z, -Vec3::Z];
        for (face, axis) in axes.iter().enumerate() {
            let dir = cubemap_dir(face as u32, 1, 1, size);
            assert!(dir.abs_diff_eq(*axis, 1e-5), "face {face} center is {dir}");
        }
    }

    #[test]
    fn uniform_panorama_produces_uniform_cube() {
        let (w, h) = (8, 4);
        let texels: Vec<f32> = (0..w * h).flat_map(|_| [0.5, 0.25, 2.0, 1.0]).collect();
        let cube = equirect_to_cubemap("flat", &texels, w, h, 4);

        assert_eq!(cube.mip_count(), 3);
        assert_eq!(cube.max_lod(), 2.0);
        let smallest = cube.level(5, 2).unwrap();
        assert_eq!(smallest.len(), 8, "1x1 RGBA16F level");
        let red = f16::from_le_bytes([smallest[0], smallest[1]]);
        let blue = f16::from_le_bytes([smallest[4], smallest[5]]);
        assert_eq!(red.to_f32(), 0.5);
        assert_eq!(blue.to_f32(), 2.0);
    }

    #[test]
    fn missing_panorama_fails() {
        let err = CubemapLoader::new().load("missing/env.hdr").unwrap_err();
        assert!(matches!(err, ViewerError::ImageLoad { .. }));
    }
}
