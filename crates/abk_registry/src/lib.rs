//! Shared state of a jacket batch: the persistent id table and the dependency
//! manifest.
//!
//! Both are explicit store objects. Open the [`IdTable`] once per batch and hand
//! it to whatever allocates ids; extend the manifest once, before any per-item
//! work, with [`extend_manifest`].

pub mod error;
pub mod id_table;
pub mod manifest;
mod utils;

pub use error::{Error, Result};
pub use id_table::{IdTable, IdentifierRecord, DEFAULT_FLOOR};
pub use manifest::{extend_manifest, BundleInfo, DependencyManifest, Desync, ManifestUpdate};
