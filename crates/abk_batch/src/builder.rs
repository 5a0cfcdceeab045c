//! Batch orchestration.
//!
//! The [`BatchBuilder`] runs a full batch:
//!
//! 1. Discover items (sub-directories of the inputs root).
//! 2. Resolve every item's id through the [`IdTable`], sequentially and in
//!    discovery order. An item whose id cannot be allocated fails alone.
//! 3. Extend the dependency manifest once with the complete id set.
//! 4. Build the items on a bounded worker pool. Each item works on its own
//!    template copy and staging directory; a failed item is logged and recorded
//!    while its siblings carry on.

use crate::config::BatchConfig;
use crate::error::{error_chain, Error, Result};
use crate::item::{discover_items, BatchItem};
use crate::pipeline::{build_item, ItemOutcome};
use crate::report::{BatchReport, ItemFailure, ItemRecord, ManifestSummary};
use abk_bundle::{FamilyVariant, JACKET_VARIANTS};
use abk_registry::{extend_manifest, IdTable};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Progress information emitted during a batch run.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub stage: BatchStage,
    /// Key of the item that just finished (set during `BuildingItems`).
    pub current_item: Option<String>,
    /// Number of finished items; items complete in any order.
    pub current: u32,
    pub total: u32,
}

/// Emitted in order: `Discovering` -> `AllocatingIds` -> `ExtendingManifest` ->
/// `BuildingItems` (once per item) -> `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BatchStage {
    Discovering,
    AllocatingIds,
    ExtendingManifest,
    BuildingItems,
    Complete,
}

type ProgressCallback = Arc<dyn Fn(BatchProgress) + Send + Sync>;

pub struct BatchBuilder {
    config: BatchConfig,
    variants: Vec<FamilyVariant>,
    progress_callback: Option<ProgressCallback>,
}

impl BatchBuilder {
    /// A builder producing both jacket variants.
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            variants: JACKET_VARIANTS.to_vec(),
            progress_callback: None,
        }
    }

    pub fn with_variants(mut self, variants: Vec<FamilyVariant>) -> Self {
        self.variants = variants;
        self
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(BatchProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Run the batch. Only configuration, discovery and manifest failures abort
    /// the run; item failures end up in [`BatchReport::failed`].
    pub fn run(&self) -> Result<BatchReport> {
        self.run_with(build_item)
    }

    fn run_with<F>(&self, build: F) -> Result<BatchReport>
    where
        F: Fn(&BatchConfig, &[FamilyVariant], &BatchItem, u32) -> Result<ItemOutcome> + Sync,
    {
        let start_time = std::time::Instant::now();
        self.config.validate()?;

        tracing::info!("Building jackets...");
        tracing::info!("Templates: {}", self.config.template_dir);
        tracing::info!("Inputs: {}", self.config.inputs_dir);
        tracing::info!("Output: {}", self.config.output_dir);

        self.emit_progress(BatchStage::Discovering, None, 0, 0);
        let items = discover_items(&self.config.inputs_dir)?;
        let discovered = items.len() as u32;

        self.emit_progress(BatchStage::AllocatingIds, None, 0, discovered);
        let mut report = BatchReport::default();
        let resolved = self.resolve_ids(items, &mut report)?;

        self.emit_progress(BatchStage::ExtendingManifest, None, 0, discovered);
        let manifest_path = self.config.manifest_path();
        let ids: Vec<u32> = resolved.iter().map(|(_, id)| *id).collect();
        let update = extend_manifest(&manifest_path, &ids, &self.variants)?;
        report.manifest = Some(ManifestSummary::new(&manifest_path, &update));

        let total = resolved.len() as u32;
        self.emit_progress(BatchStage::BuildingItems, None, 0, total);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_count())
            .thread_name(|index| format!("jacket-worker-{index}"))
            .build()?;

        let finished = AtomicU32::new(0);
        let results: Vec<(&BatchItem, u32, Result<ItemOutcome>)> = pool.install(|| {
            resolved
                .par_iter()
                .map(|(item, id)| {
                    // A panic fails only this item.
                    let result = catch_unwind(AssertUnwindSafe(|| {
                        build(&self.config, &self.variants, item, *id)
                    }))
                    .unwrap_or_else(|payload| {
                        Err(Error::ItemPanicked(panic_message(payload.as_ref())))
                    });
                    if let Err(error) = &result {
                        log_failure(item, Some(*id), error);
                    }
                    let current = finished.fetch_add(1, Ordering::SeqCst) + 1;
                    self.emit_progress(
                        BatchStage::BuildingItems,
                        Some(item.key.clone()),
                        current,
                        total,
                    );
                    (item, *id, result)
                })
                .collect()
        });

        for (item, id, result) in results {
            match result {
                Ok(ItemOutcome::Built { outputs }) => report.built.push(ItemRecord {
                    key: item.key.clone(),
                    id,
                    outputs,
                }),
                Ok(ItemOutcome::Skipped) => report.skipped.push(ItemRecord {
                    key: item.key.clone(),
                    id,
                    outputs: self
                        .variants
                        .iter()
                        .map(|variant| self.config.output_path(variant, id))
                        .collect(),
                }),
                Err(error) => report
                    .failed
                    .push(ItemFailure::new(item, Some(id), &error)),
            }
        }

        report.duration_ms = start_time.elapsed().as_millis() as u64;
        self.emit_progress(BatchStage::Complete, None, total, total);

        tracing::info!(
            "Batch finished in {} ms: {} built, {} skipped, {} failed",
            report.duration_ms,
            report.built.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Allocate ids in discovery order. Table-level failures (an unreadable
    /// or corrupt table) abort the batch; a rejected key only fails its item.
    fn resolve_ids(
        &self,
        items: Vec<BatchItem>,
        report: &mut BatchReport,
    ) -> Result<Vec<(BatchItem, u32)>> {
        let table = IdTable::open(self.config.id_table.clone(), self.config.id_floor)?;

        let mut resolved = Vec::with_capacity(items.len());
        for item in items {
            match table.get_or_create(&item.key) {
                Ok(id) => resolved.push((item, id)),
                Err(abk_registry::Error::InvalidKey(key)) => {
                    let error = Error::Registry(abk_registry::Error::InvalidKey(key));
                    log_failure(&item, None, &error);
                    report.failed.push(ItemFailure::new(&item, None, &error));
                }
                Err(error) => return Err(error.into()),
            }
        }

        tracing::info!("Resolved ids for {} items", resolved.len());
        Ok(resolved)
    }

    /// Emit a progress event if a callback was registered.
    fn emit_progress(&self, stage: BatchStage, current_item: Option<String>, current: u32, total: u32) {
        if let Some(callback) = &self.progress_callback {
            callback(BatchProgress {
                stage,
                current_item,
                current,
                total,
            });
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn log_failure(item: &BatchItem, id: Option<u32>, error: &Error) {
    tracing::error!(
        key = %item.key,
        id = ?id,
        source_dir = %item.source_dir,
        "Item failed: {}",
        error_chain(error)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_artwork, Workspace};
    use abk_registry::{DependencyManifest, IdTable};
    use std::sync::Mutex;

    fn workspace_with_items() -> Workspace {
        let ws = Workspace::new();
        for key in ["songA", "songB"] {
            let item = ws.item(key);
            write_artwork(&item.source_dir.join("jacket.png"), 64, 48);
        }
        // No artwork.
        ws.item("songC");
        ws
    }

    #[test]
    fn test_batch_isolates_failed_item() {
        let ws = workspace_with_items();
        let report = BatchBuilder::new(ws.config.clone()).run().unwrap();

        let built: Vec<_> = report.built.iter().map(|r| (r.key.as_str(), r.id)).collect();
        let mut built_sorted = built.clone();
        built_sorted.sort();
        assert_eq!(built_sorted, vec![("songA", 2001), ("songB", 2002)]);

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].key, "songC");
        assert_eq!(report.failed[0].id, Some(2003));
        assert!(report.failed[0].error.contains("no source image"));

        for record in &report.built {
            for output in &record.outputs {
                assert!(output.is_file());
            }
        }
        for variant in JACKET_VARIANTS {
            assert!(!ws.config.output_path(&variant, 2003).exists());
        }
    }

    #[test]
    fn test_manifest_covers_every_allocated_id() {
        let ws = workspace_with_items();
        let report = BatchBuilder::new(ws.config.clone()).run().unwrap();

        let summary = report.manifest.unwrap();
        assert_eq!(summary.appended, 6);

        let manifest = DependencyManifest::load(&ws.config.manifest_path()).unwrap();
        assert_eq!(manifest.names.len(), manifest.infos.len());
        assert!(manifest
            .names
            .contains(&"jacket_s/ui_jacket_002003_s.ab".to_string()));
    }

    #[test]
    fn test_rerun_is_stable() {
        let ws = workspace_with_items();
        BatchBuilder::new(ws.config.clone()).run().unwrap();
        let report = BatchBuilder::new(ws.config.clone()).run().unwrap();

        assert!(report.built.is_empty());
        let mut skipped: Vec<_> = report.skipped.iter().map(|r| (r.key.as_str(), r.id)).collect();
        skipped.sort();
        assert_eq!(skipped, vec![("songA", 2001), ("songB", 2002)]);
        assert_eq!(report.manifest.unwrap().appended, 0);

        let table = IdTable::open(ws.config.id_table.clone(), ws.config.id_floor).unwrap();
        assert_eq!(table.records().unwrap().len(), 3);
    }

    #[test]
    fn test_force_rebuilds() {
        let mut ws = workspace_with_items();
        BatchBuilder::new(ws.config.clone()).run().unwrap();

        ws.config.force = true;
        ws.config.jobs = Some(1);
        let report = BatchBuilder::new(ws.config.clone()).run().unwrap();
        assert_eq!(report.built.len(), 2);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_progress_events() {
        let ws = workspace_with_items();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);

        BatchBuilder::new(ws.config.clone())
            .with_progress(move |progress| sink.lock().unwrap().push(progress))
            .run()
            .unwrap();

        let events = events.lock().unwrap();
        let stages: Vec<_> = events.iter().map(|e| e.stage).collect();
        assert_eq!(stages.first(), Some(&BatchStage::Discovering));
        assert_eq!(stages.last(), Some(&BatchStage::Complete));

        let mut building: Vec<_> = events
            .iter()
            .filter(|e| e.stage == BatchStage::BuildingItems && e.current_item.is_some())
            .map(|e| e.current)
            .collect();
        building.sort_unstable();
        assert_eq!(building, vec![1, 2, 3]);
        assert!(events
            .iter()
            .filter(|e| e.stage == BatchStage::BuildingItems)
            .all(|e| e.total == 3));
    }

    #[test]
    fn test_panicking_item_is_recorded_as_failure() {
        let ws = workspace_with_items();
        let report = BatchBuilder::new(ws.config.clone())
            .run_with(|config, variants, item, id| {
                if item.key == "songB" {
                    panic!("decoder exploded");
                }
                build_item(config, variants, item, id)
            })
            .unwrap();

        let failed: Vec<_> = report.failed.iter().map(|f| f.key.as_str()).collect();
        assert!(failed.contains(&"songB"));
        let songb = report.failed.iter().find(|f| f.key == "songB").unwrap();
        assert_eq!(songb.id, Some(2002));
        assert_eq!(songb.error, "item panicked: decoder exploded");

        assert_eq!(report.built.len(), 1);
        assert_eq!(report.built[0].key, "songA");
        assert_eq!(report.total(), 3);
    }

    #[test]
    fn test_missing_inputs_dir_aborts() {
        let mut ws = Workspace::new();
        ws.config.inputs_dir = ws.config.inputs_dir.join("missing");
        assert!(matches!(
            BatchBuilder::new(ws.config.clone()).run(),
            Err(Error::InputsNotFound(_))
        ));
    }
}
