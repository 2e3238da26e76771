//! Shared fixtures for the integration tests.
//!
//! An [`AssetRoot`] is a throwaway directory laid out like the viewer's asset
//! root: the bundled shaders, a tiny HDR skybox and a small OBJ model.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use scene_viewer::application::{MODEL_PATH, SKYBOX_PATH};

/// Temporary asset root, removed on drop
pub struct AssetRoot {
    root: PathBuf,
}

impl AssetRoot {
    pub fn new(name: &str) -> Self {
        let root = std::env::temp_dir().join(format!("scene-viewer-{}-{}", name, std::process::id()));
        if root.exists() {
            fs::remove_dir_all(&root).unwrap();
        }
        fs::create_dir_all(&root).unwrap();
        Self { root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Copy the shaders shipped with the crate
    pub fn with_shaders(self) -> Self {
        let source = Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders");
        let target = self.root.join("shaders");
        fs::create_dir_all(&target).unwrap();
        for entry in fs::read_dir(source).unwrap() {
            let entry = entry.unwrap();
            fs::copy(entry.path(), target.join(entry.file_name())).unwrap();
        }
        self
    }

    /// An 8x4 equirectangular sky, brighter towards the top
    pub fn with_skybox(self) -> Self {
        let path = self.root.join(SKYBOX_PATH);
        fs::create_dir_all(path.parent().unwrap()).unwrap();

        let (width, height) = (8usize, 4usize);
        let pixels: Vec<image::Rgb<f32>> = (0..width * height)
            .map(|i| {
                let row = (i / width) as f32;
                let sky = 1.0 - row / height as f32;
                image::Rgb([sky, sky, 1.0])
            })
            .collect();

        let file = fs::File::create(&path).unwrap();
        image::codecs::hdr::HdrEncoder::new(std::io::BufWriter::new(file))
            .encode(&pixels, width, height)
            .unwrap();
        self
    }

    /// One quad per material, each under its own object and `usemtl`
    pub fn with_model(self, material_count: usize) -> Self {
        let path = self.root.join(MODEL_PATH);
        fs::create_dir_all(path.parent().unwrap()).unwrap();

        let mut obj = String::new();
        if material_count > 0 {
            obj.push_str("mtllib tea_set.mtl\n");
        }
        obj.push_str("vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\nvn 0 0 1\n");
        let parts = material_count.max(1);
        for part in 0..parts {
            let x = part as f32 * 2.0;
            obj.push_str(&format!("o part{}\n", part));
            obj.push_str(&format!("v {} 0 0\nv {} 0 0\nv {} 1 0\nv {} 1 0\n", x, x + 1.0, x + 1.0, x));
            if material_count > 0 {
                obj.push_str(&format!("usemtl surface{}\n", part));
            }
            let base = part * 4;
            obj.push_str(&format!(
                "f {a}/1/1 {b}/2/1 {c}/3/1\nf {a}/1/1 {c}/3/1 {d}/4/1\n",
                a = base + 1,
                b = base + 2,
                c = base + 3,
                d = base + 4
            ));
        }
        fs::write(&path, obj).unwrap();

        if material_count > 0 {
            let mtl: String = (0..material_count)
                .map(|i| format!("newmtl surface{}\nKd 0.8 0.{} 0.2\nNs 10\n\n", i, i + 1))
                .collect();
            fs::write(path.with_extension("mtl"), mtl).unwrap();
        }
        self
    }

    /// Everything the application needs, with a three-material model
    pub fn complete(name: &str) -> Self {
        Self::new(name).with_shaders().with_skybox().with_model(3)
    }
}

impl Drop for AssetRoot {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}
