//! Temporary batch workspaces for tests.

use crate::config::BatchConfig;
use crate::item::BatchItem;
use abk_bundle::fixtures::jacket_template;
use abk_bundle::{resource_key, FamilyVariant, JACKET_VARIANTS};
use camino::{Utf8Path, Utf8PathBuf};
use image::{Rgb, RgbImage};

pub(crate) struct Workspace {
    // Held for its Drop.
    _dir: tempfile::TempDir,
    pub config: BatchConfig,
}

impl Workspace {
    /// Templates for both variants under `data/`, empty `inputs/`, `outputs/`.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

        let config = BatchConfig {
            template_dir: root.join("data"),
            inputs_dir: root.join("inputs"),
            output_dir: root.join("outputs"),
            id_table: root.join("ids.csv"),
            jobs: Some(2),
            ..Default::default()
        };
        std::fs::create_dir_all(&config.template_dir).unwrap();
        std::fs::create_dir_all(&config.inputs_dir).unwrap();

        for variant in JACKET_VARIANTS {
            jacket_template(
                variant.template_hash_key,
                config.template_id,
                variant.suffix,
                32,
                32,
            )
            .save(config.template_path(&variant))
            .unwrap();
        }

        Self { _dir: dir, config }
    }

    /// Create an (empty) item directory.
    pub fn item(&self, key: &str) -> BatchItem {
        let source_dir = self.config.inputs_dir.join(key);
        std::fs::create_dir_all(&source_dir).unwrap();
        BatchItem {
            key: key.to_string(),
            source_dir,
        }
    }

    /// Drop the companion stream from `variant`'s template.
    pub fn break_template(&self, variant: &FamilyVariant) {
        let path = self.config.template_path(variant);
        let mut package = abk_bundle::Package::load(&path).unwrap();
        package.files.remove(&resource_key(variant.template_hash_key));
        package.save(&path).unwrap();
    }
}

pub(crate) fn write_artwork(path: &Utf8Path, width: u32, height: u32) {
    RgbImage::from_pixel(width, height, Rgb([12, 200, 99]))
        .save(path)
        .unwrap();
}
