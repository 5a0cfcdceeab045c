//! The per-item pipeline: clone the template family, rename it, overlay the
//! artwork and move the finished packages into place.

use crate::config::BatchConfig;
use crate::error::{Error, Result};
use crate::item::BatchItem;
use abk_bundle::{
    find_source_image, load_source_image, overlay_image, rename_family, FamilyVariant, Package,
};
use camino::{Utf8Path, Utf8PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Built { outputs: Vec<Utf8PathBuf> },
    /// Every output already existed and the batch is not forced.
    Skipped,
}

/// Build every pending variant of `item` as `id`.
///
/// All variants are staged in a temporary directory under the output root and
/// only moved into place once every one of them succeeded. The staging
/// directory is removed on every exit path.
pub fn build_item(
    config: &BatchConfig,
    variants: &[FamilyVariant],
    item: &BatchItem,
    id: u32,
) -> Result<ItemOutcome> {
    let pending: Vec<(&FamilyVariant, Utf8PathBuf)> = variants
        .iter()
        .map(|variant| (variant, config.output_path(variant, id)))
        .filter(|(_, output)| config.force || !output.exists())
        .collect();

    if pending.is_empty() {
        tracing::debug!("Skipping '{}' ({}): outputs exist", item.key, id);
        return Ok(ItemOutcome::Skipped);
    }

    std::fs::create_dir_all(&config.output_dir)?;
    let staging = tempfile::Builder::new()
        .prefix(&format!("tmp_{id:06}_"))
        .tempdir_in(&config.output_dir)?;
    let staging_dir = Utf8Path::from_path(staging.path())
        .ok_or_else(|| Error::NonUtf8Path(staging.path().to_path_buf()))?;

    let artwork_path = find_source_image(&item.source_dir)?;
    tracing::debug!("'{}' artwork: {}", item.key, artwork_path);
    let artwork = load_source_image(&artwork_path)?;

    let mut staged = Vec::with_capacity(pending.len());
    for (variant, output) in &pending {
        let template_path = config.template_path(variant);
        if !template_path.is_file() {
            return Err(Error::TemplateNotFound(template_path));
        }

        // Fresh copy per variant and item; nothing is shared between workers.
        let mut package = Package::load(&template_path)?;
        let rename = variant.rename_for(config.template_id, id);
        let report = rename_family(&mut package, &rename)?;
        tracing::debug!(
            "'{}' {}: {} replacements, container key {}",
            item.key,
            variant.file_name(id),
            report.replacements,
            report.container_key
        );

        overlay_image(&mut package, &artwork)?;

        let staged_path = staging_dir.join(variant.file_name(id));
        package.save(&staged_path)?;
        staged.push((staged_path, output));
    }

    let outputs = publish(staged)?;

    tracing::info!("Built '{}' as {} ({} packages)", item.key, id, outputs.len());
    Ok(ItemOutcome::Built { outputs })
}

/// Move staged packages to their final paths. If any move fails, the ones
/// already published are removed again so the item is left without outputs.
fn publish(staged: Vec<(Utf8PathBuf, &Utf8PathBuf)>) -> Result<Vec<Utf8PathBuf>> {
    let mut outputs: Vec<Utf8PathBuf> = Vec::with_capacity(staged.len());
    for (staged_path, output) in staged {
        let moved = match output.parent() {
            Some(parent) => std::fs::create_dir_all(parent),
            None => Ok(()),
        }
        .and_then(|()| std::fs::rename(&staged_path, output));

        if let Err(error) = moved {
            for published in &outputs {
                if let Err(cleanup) = std::fs::remove_file(published) {
                    tracing::warn!("Failed to remove {} after error: {}", published, cleanup);
                }
            }
            return Err(error.into());
        }
        outputs.push(output.clone());
    }
    Ok(outputs)
}
