//! Binary package format.
//!
//! Layout (little-endian):
//!
//! ```text
//! magic            [u8; 8]  "ABKPKG\0\0"
//! version          u32      1
//! name             u32 len + utf-8
//! container count  u32, then ContainerEntry * count
//! file count       u32, then FileEntry * count
//! ```
//!
//! Serialized blobs carry their object list as msgpack. Payloads larger than
//! [`COMPRESSION_THRESHOLD`] are zstd-compressed; every entry stores the xxh3
//! checksum of its uncompressed bytes.

use crate::error::{Error, Result};
use crate::package::{AssetRef, Blob, Package, SerializedFile};
use binrw::{binrw, BinRead, BinWrite};
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use camino::Utf8Path;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use xxhash_rust::xxh3::xxh3_64;

pub const MAGIC: [u8; 8] = *b"ABKPKG\0\0";
pub const VERSION: u32 = 1;

/// Payloads up to this size are stored raw.
pub const COMPRESSION_THRESHOLD: usize = 256;

const KIND_SERIALIZED: u8 = 0;
const KIND_RESOURCE: u8 = 1;

const COMPRESSION_NONE: u8 = 0;
const COMPRESSION_ZSTD: u8 = 1;

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq)]
struct ContainerEntry {
    #[br(temp)]
    #[bw(calc = path.len() as u32)]
    path_len: u32,
    #[br(count = path_len, try_map = String::from_utf8)]
    #[bw(map = |s| s.as_bytes().to_vec())]
    path: String,

    file_id: i32,
    path_id: i64,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq)]
struct FileEntry {
    #[br(temp)]
    #[bw(calc = name.len() as u32)]
    name_len: u32,
    #[br(count = name_len, try_map = String::from_utf8)]
    #[bw(map = |s| s.as_bytes().to_vec())]
    name: String,

    kind: u8,
    compression: u8,
    uncompressed_size: u64,
    checksum: u64,

    #[br(temp)]
    #[bw(calc = data.len() as u64)]
    data_len: u64,
    #[br(count = data_len as usize)]
    data: Vec<u8>,
}

impl FileEntry {
    fn encode(name: &str, blob: &Blob) -> Result<Self> {
        let (kind, raw) = match blob {
            Blob::Serialized(file) => (KIND_SERIALIZED, rmp_serde::to_vec_named(file)?),
            Blob::Resource(data) => (KIND_RESOURCE, data.clone()),
        };

        let checksum = xxh3_64(&raw);
        let uncompressed_size = raw.len() as u64;
        let (compression, data) = if raw.len() > COMPRESSION_THRESHOLD {
            (COMPRESSION_ZSTD, compress_zstd(&raw)?)
        } else {
            (COMPRESSION_NONE, raw)
        };

        Ok(Self {
            name: name.to_string(),
            kind,
            compression,
            uncompressed_size,
            checksum,
            data,
        })
    }

    fn decode(self) -> Result<(String, Blob)> {
        let raw = match self.compression {
            COMPRESSION_NONE => self.data,
            COMPRESSION_ZSTD => zstd::decode_all(self.data.as_slice())?,
            compression => {
                return Err(Error::InvalidCompression {
                    name: self.name,
                    compression,
                })
            }
        };

        let actual = xxh3_64(&raw);
        if actual != self.checksum || raw.len() as u64 != self.uncompressed_size {
            return Err(Error::ChecksumMismatch {
                name: self.name,
                expected: self.checksum,
                actual,
            });
        }

        let blob = match self.kind {
            KIND_SERIALIZED => Blob::Serialized(rmp_serde::from_slice::<SerializedFile>(&raw)?),
            KIND_RESOURCE => Blob::Resource(raw),
            kind => {
                return Err(Error::InvalidBlobKind {
                    name: self.name,
                    kind,
                })
            }
        };

        Ok((self.name, blob))
    }
}

/// Compress `data` with zstd at the default level used for package payloads.
pub fn compress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut encoder = zstd::Encoder::new(&mut out, 3)?;
    encoder.write_all(data)?;
    encoder.finish()?;
    Ok(out)
}

impl Package {
    /// Read a package from disk.
    pub fn load(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::read_from(&mut BufReader::new(file))
    }

    /// Write the package to disk, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Utf8Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(Error::InvalidMagic(magic));
        }

        let version = reader.read_u32::<LE>()?;
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let name = read_string(reader)?;

        let container_count = reader.read_u32::<LE>()?;
        let mut package = Package {
            name,
            ..Default::default()
        };
        for _ in 0..container_count {
            let entry = ContainerEntry::read(reader)?;
            package.container.insert(
                entry.path,
                AssetRef {
                    file_id: entry.file_id,
                    path_id: entry.path_id,
                },
            );
        }

        let file_count = reader.read_u32::<LE>()?;
        for _ in 0..file_count {
            let (name, blob) = FileEntry::read(reader)?.decode()?;
            package.files.insert(name, blob);
        }

        Ok(package)
    }

    pub fn write_to<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_u32::<LE>(VERSION)?;
        write_string(writer, &self.name)?;

        writer.write_u32::<LE>(self.container.len() as u32)?;
        for (path, asset) in &self.container {
            ContainerEntry {
                path: path.clone(),
                file_id: asset.file_id,
                path_id: asset.path_id,
            }
            .write(writer)?;
        }

        writer.write_u32::<LE>(self.files.len() as u32)?;
        for (name, blob) in &self.files {
            FileEntry::encode(name, blob)?.write(writer)?;
        }

        Ok(())
    }

    /// Serialize the package into an in-memory buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read_from(&mut Cursor::new(bytes))
    }
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = reader.read_u32::<LE>()?;
    let mut buf = vec![0; len as usize];
    reader.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| {
        Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    writer.write_u32::<LE>(value.len() as u32)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}
