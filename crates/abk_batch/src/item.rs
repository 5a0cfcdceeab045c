use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};

/// One unit of batch work: an input directory and the external key naming it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub key: String,
    pub source_dir: Utf8PathBuf,
}

/// Every sub-directory of `inputs_dir`, sorted by name.
pub fn discover_items(inputs_dir: &Utf8Path) -> Result<Vec<BatchItem>> {
    if !inputs_dir.is_dir() {
        return Err(Error::InputsNotFound(inputs_dir.to_path_buf()));
    }

    let mut items = Vec::new();
    for entry in inputs_dir.read_dir_utf8()? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        items.push(BatchItem {
            key: entry.file_name().to_string(),
            source_dir: entry.path().to_path_buf(),
        });
    }
    items.sort_by(|a, b| a.key.cmp(&b.key));

    tracing::info!("Discovered {} items in {}", items.len(), inputs_dir);
    Ok(items)
}
