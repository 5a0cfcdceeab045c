//! Batch generation of jacket bundles.
//!
//! Turns a directory of item folders into one package per item and variant,
//! registering every new package in the shared dependency manifest.
//!
//! # Example
//!
//! ```no_run
//! use abk_batch::{BatchBuilder, BatchConfig};
//!
//! # fn main() -> abk_batch::Result<()> {
//! let report = BatchBuilder::new(BatchConfig::default())
//!     .with_progress(|progress| {
//!         println!("{:?}: {}/{}", progress.stage, progress.current, progress.total);
//!     })
//!     .run()?;
//!
//! println!("built {}, failed {}", report.built.len(), report.failed.len());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod item;
pub mod pipeline;
pub mod report;

#[cfg(test)]
mod test_support;

pub use builder::{BatchBuilder, BatchProgress, BatchStage};
pub use config::{BatchConfig, BUNDLE_ROOT, DEFAULT_TEMPLATE_ID};
pub use error::{error_chain, Error, Result};
pub use item::{discover_items, BatchItem};
pub use pipeline::{build_item, ItemOutcome};
pub use report::{BatchReport, ItemFailure, ItemRecord, ManifestSummary};
