//! Asset bundle packages for jacket artwork.
//!
//! This crate owns everything that happens to a single package:
//!
//! - **Model**: [`Package`] with its container index and blob store
//! - **Codec**: reading and writing the binary package format ([`codec`])
//! - **Renaming**: moving the template family to a new hash key and id ([`rename_family`])
//! - **Overlay**: swapping texture pixels for item artwork ([`overlay_image`])
//!
//! # Example
//!
//! ```no_run
//! use abk_bundle::{find_source_image, load_source_image, overlay_image, rename_family, Package, PRIMARY};
//! use camino::Utf8Path;
//!
//! # fn main() -> abk_bundle::Result<()> {
//! let mut package = Package::load("templates/ui_jacket_001686.ab")?;
//! rename_family(&mut package, &PRIMARY.rename_for(1686, 2001))?;
//!
//! let artwork = find_source_image(Utf8Path::new("inputs/songA"))?;
//! overlay_image(&mut package, &load_source_image(&artwork)?)?;
//!
//! package.save(format!("out/{}", PRIMARY.file_name(2001)))?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod error;
pub mod package;
pub mod rename;
pub mod texture;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use error::{Error, Result};
pub use package::{
    resource_key, AssetObject, AssetRef, Blob, ObjectClass, Package, SerializedFile,
    RESOURCE_SUFFIX,
};
pub use rename::{
    id_token, rename_family, FamilyRename, FamilyVariant, RenameReport, JACKET_VARIANTS, PRIMARY,
    SHADOW,
};
pub use texture::{
    find_source_image, fit_to_canvas, load_source_image, overlay_image, OverlayReport,
    TextureInfo,
};
