//! Batch configuration and the path conventions derived from it.

use crate::error::{Error, Result};
use abk_bundle::FamilyVariant;
use abk_registry::DEFAULT_FLOOR;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Directory under the output root that holds the generated bundles.
pub const BUNDLE_ROOT: &str = "AssetBundleImages";

pub const DEFAULT_TEMPLATE_ID: u32 = 1686;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Directory containing `ui_jacket_{template_id}{suffix}.ab` templates.
    pub template_dir: Utf8PathBuf,
    /// Identifier embedded in the template names.
    pub template_id: u32,
    /// Every sub-directory is one item; its name is the item key.
    pub inputs_dir: Utf8PathBuf,
    pub output_dir: Utf8PathBuf,
    pub id_table: Utf8PathBuf,
    /// Defaults to `{output_dir}/AssetBundleImages/AssetBundleImages`.
    pub manifest: Option<Utf8PathBuf>,
    pub id_floor: u32,
    /// Worker threads; `None` uses the available parallelism.
    pub jobs: Option<usize>,
    /// Rebuild items whose outputs already exist.
    pub force: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            template_dir: Utf8PathBuf::from("data"),
            template_id: DEFAULT_TEMPLATE_ID,
            inputs_dir: Utf8PathBuf::from("inputs"),
            output_dir: Utf8PathBuf::from("outputs"),
            id_table: Utf8PathBuf::from("ids.csv"),
            manifest: None,
            id_floor: DEFAULT_FLOOR,
            jobs: None,
            force: false,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.jobs == Some(0) {
            return Err(Error::InvalidConfig("jobs must be at least 1".to_string()));
        }
        if self.id_floor == 0 {
            return Err(Error::InvalidConfig("id_floor must be at least 1".to_string()));
        }
        if self.template_id > 999_999 {
            return Err(Error::InvalidConfig(format!(
                "template_id {} does not fit the six-digit naming scheme",
                self.template_id
            )));
        }
        Ok(())
    }

    pub fn bundle_root(&self) -> Utf8PathBuf {
        self.output_dir.join(BUNDLE_ROOT)
    }

    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.manifest
            .clone()
            .unwrap_or_else(|| self.bundle_root().join(BUNDLE_ROOT))
    }

    pub fn template_path(&self, variant: &FamilyVariant) -> Utf8PathBuf {
        self.template_dir.join(variant.file_name(self.template_id))
    }

    /// Final location of `variant` for item `id`.
    pub fn output_path(&self, variant: &FamilyVariant, id: u32) -> Utf8PathBuf {
        self.bundle_root()
            .join(variant.dir)
            .join(variant.file_name(id))
    }

    pub fn worker_count(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abk_bundle::{PRIMARY, SHADOW};

    #[test]
    fn test_default_paths() {
        let config = BatchConfig::default();
        assert_eq!(
            config.template_path(&PRIMARY),
            Utf8PathBuf::from("data/ui_jacket_001686.ab")
        );
        assert_eq!(
            config.template_path(&SHADOW),
            Utf8PathBuf::from("data/ui_jacket_001686_s.ab")
        );
        assert_eq!(
            config.output_path(&SHADOW, 2001),
            Utf8PathBuf::from("outputs/AssetBundleImages/jacket_s/ui_jacket_002001_s.ab")
        );
        assert_eq!(
            config.manifest_path(),
            Utf8PathBuf::from("outputs/AssetBundleImages/AssetBundleImages")
        );
    }

    #[test]
    fn test_validate() {
        assert!(BatchConfig::default().validate().is_ok());
        for config in [
            BatchConfig {
                jobs: Some(0),
                ..Default::default()
            },
            BatchConfig {
                id_floor: 0,
                ..Default::default()
            },
            BatchConfig {
                template_id: 1_000_000,
                ..Default::default()
            },
        ] {
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: BatchConfig = serde_json::from_str(r#"{"id_floor": 3000, "force": true}"#).unwrap();
        assert_eq!(config.id_floor, 3000);
        assert!(config.force);
        assert_eq!(config.template_id, DEFAULT_TEMPLATE_ID);
    }
}
