//! The shared dependency manifest.
//!
//! Two parallel sequences: bundle names and per-bundle info records. Index `i`
//! of one describes the same bundle as index `i` of the other.

use crate::error::{Error, Result};
use crate::utils::write_atomic;
use abk_bundle::FamilyVariant;
use binrw::{binrw, BinRead, BinWrite};
use camino::Utf8Path;
use std::collections::HashSet;
use std::io::{Cursor, Read, Seek, Write};

pub const MANIFEST_VERSION: u32 = 1;

/// Info record of one bundle: content hash and indices of its dependencies.
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BundleInfo {
    pub hash: [u8; 16],

    #[br(temp)]
    #[bw(calc = dependencies.len() as u32)]
    dependency_count: u32,
    #[br(count = dependency_count)]
    pub dependencies: Vec<i32>,
}

impl BundleInfo {
    /// Zero hash, no dependencies. Used for freshly registered bundles.
    pub fn placeholder() -> Self {
        Self::default()
    }
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq)]
struct ManifestName {
    #[br(temp)]
    #[bw(calc = name.len() as u32)]
    name_len: u32,
    #[br(count = name_len, try_map = String::from_utf8)]
    #[bw(map = |s| s.as_bytes().to_vec())]
    name: String,
}

#[binrw]
#[brw(little, magic = b"ABMF")]
#[derive(Debug, Clone, PartialEq)]
struct ManifestFile {
    version: u32,

    #[br(temp)]
    #[bw(calc = names.len() as u32)]
    name_count: u32,
    #[br(count = name_count)]
    names: Vec<ManifestName>,

    #[br(temp)]
    #[bw(calc = infos.len() as u32)]
    info_count: u32,
    #[br(count = info_count)]
    infos: Vec<BundleInfo>,
}

/// Lengths found by [`DependencyManifest::normalize`] before padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Desync {
    pub names: usize,
    pub infos: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DependencyManifest {
    pub names: Vec<String>,
    pub infos: Vec<BundleInfo>,
}

impl DependencyManifest {
    /// Load the manifest at `path`. A missing file is an empty manifest.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        match std::fs::read(path) {
            Ok(bytes) => Self::read_from(&mut Cursor::new(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No manifest at {}, starting empty", path);
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically replace the manifest at `path`.
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        write_atomic(path, &cursor.into_inner())
    }

    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let file = ManifestFile::read(reader)?;
        if file.version != MANIFEST_VERSION {
            return Err(Error::UnsupportedManifestVersion(file.version));
        }
        Ok(Self {
            names: file.names.into_iter().map(|n| n.name).collect(),
            infos: file.infos,
        })
    }

    pub fn write_to<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        ManifestFile {
            version: MANIFEST_VERSION,
            names: self
                .names
                .iter()
                .map(|name| ManifestName { name: name.clone() })
                .collect(),
            infos: self.infos.clone(),
        }
        .write(writer)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.names.len().min(self.infos.len())
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.infos.is_empty()
    }

    /// Bring `names` and `infos` to equal length.
    ///
    /// The shorter sequence is padded with copies of its own first element. An
    /// empty sequence has no first element and is padded with a placeholder
    /// (`""` or [`BundleInfo::placeholder`]). Returns the original lengths when
    /// padding happened.
    pub fn normalize(&mut self) -> Option<Desync> {
        let desync = Desync {
            names: self.names.len(),
            infos: self.infos.len(),
        };
        if desync.names == desync.infos {
            return None;
        }

        tracing::warn!(
            "Manifest out of sync ({} names, {} infos), padding the shorter sequence",
            desync.names,
            desync.infos
        );

        if desync.names < desync.infos {
            let fill = self.names.first().cloned().unwrap_or_else(|| {
                tracing::warn!("Manifest has no names to copy, padding with empty names");
                String::new()
            });
            self.names.resize(desync.infos, fill);
        } else {
            let fill = self.infos.first().cloned().unwrap_or_else(|| {
                tracing::warn!("Manifest has no infos to copy, padding with placeholders");
                BundleInfo::placeholder()
            });
            self.infos.resize(desync.names, fill);
        }

        Some(desync)
    }

    /// Append `name` with a placeholder info unless it is already registered.
    pub fn register(&mut self, name: &str) -> bool {
        if self.names.iter().any(|existing| existing == name) {
            return false;
        }
        self.names.push(name.to_string());
        self.infos.push(BundleInfo::placeholder());
        true
    }

    /// Register every variant of every id. Returns the number of appended entries.
    pub fn extend(&mut self, ids: &[u32], variants: &[FamilyVariant]) -> usize {
        let mut known: HashSet<String> = self.names.iter().cloned().collect();
        let mut appended = 0;
        for &id in ids {
            for variant in variants {
                let name = variant.bundle_name(id);
                if known.insert(name.clone()) {
                    self.names.push(name);
                    self.infos.push(BundleInfo::placeholder());
                    appended += 1;
                }
            }
        }
        appended
    }
}

/// Outcome of [`extend_manifest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestUpdate {
    pub desync: Option<Desync>,
    pub appended: usize,
    pub total: usize,
}

/// Load, normalize, extend with the batch's ids and save the manifest once.
pub fn extend_manifest(
    path: &Utf8Path,
    ids: &[u32],
    variants: &[FamilyVariant],
) -> Result<ManifestUpdate> {
    let mut manifest = DependencyManifest::load(path)?;
    let desync = manifest.normalize();
    let appended = manifest.extend(ids, variants);

    if desync.is_some() || appended > 0 {
        manifest.save(path)?;
        tracing::info!(
            "Manifest {}: appended {} entries ({} total)",
            path,
            appended,
            manifest.names.len()
        );
    } else {
        tracing::debug!("Manifest {} already up to date", path);
    }

    Ok(ManifestUpdate {
        desync,
        appended,
        total: manifest.names.len(),
    })
}
