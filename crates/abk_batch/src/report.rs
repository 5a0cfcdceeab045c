use crate::error::{error_chain, Error, Result};
use crate::item::BatchItem;
use abk_registry::ManifestUpdate;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

/// Summary of a batch run. Serialized as the optional JSON report.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub built: Vec<ItemRecord>,
    pub skipped: Vec<ItemRecord>,
    pub failed: Vec<ItemFailure>,
    pub manifest: Option<ManifestSummary>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub key: String,
    pub id: u32,
    pub outputs: Vec<Utf8PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub key: String,
    /// `None` when the failure happened while allocating the id.
    pub id: Option<u32>,
    pub source_dir: Utf8PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestSummary {
    pub path: Utf8PathBuf,
    pub appended: usize,
    pub total: usize,
    /// Lengths of `names`/`infos` before padding, if they differed.
    pub padded_from: Option<(usize, usize)>,
}

impl ManifestSummary {
    pub fn new(path: &Utf8Path, update: &ManifestUpdate) -> Self {
        Self {
            path: path.to_path_buf(),
            appended: update.appended,
            total: update.total,
            padded_from: update.desync.map(|d| (d.names, d.infos)),
        }
    }
}

impl ItemFailure {
    pub fn new(item: &BatchItem, id: Option<u32>, error: &Error) -> Self {
        Self {
            key: item.key.clone(),
            id,
            source_dir: item.source_dir.clone(),
            error: error_chain(error),
        }
    }
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.built.len() + self.skipped.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Write the report as pretty-printed JSON.
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
