//! Persistent external-key to numeric-id allocation.
//!
//! The table is a small text file:
//!
//! ```text
//! id,key
//! 2001,songA
//! 2002,songB
//! ```
//!
//! The id comes first so keys may contain commas. Every allocation re-reads the
//! whole file and every insert rewrites it, under an in-process mutex and an
//! exclusive lock on `<table>.lock`, so concurrent workers and concurrent
//! processes sharing one table never hand out the same id twice.

use crate::error::{Error, Result};
use crate::utils::write_atomic;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::sync::{Mutex, PoisonError};

pub const HEADER: &str = "id,key";

/// Ids handed out when the table is empty start here.
pub const DEFAULT_FLOOR: u32 = 2001;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierRecord {
    pub id: u32,
    pub key: String,
}

/// Handle on one persisted id table. Open it once per batch and share it.
#[derive(Debug)]
pub struct IdTable {
    path: Utf8PathBuf,
    lock_path: Utf8PathBuf,
    floor: u32,
    guard: Mutex<()>,
}

/// Advisory lock on the sibling lock file, released on drop.
struct TableLock(File);

impl Drop for TableLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.0);
    }
}

impl IdTable {
    /// Open the table at `path`. The file itself is created by the first allocation.
    pub fn open(path: impl Into<Utf8PathBuf>, floor: u32) -> Result<Self> {
        let path = path.into();
        let lock_path = Utf8PathBuf::from(format!("{path}.lock"));
        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            lock_path,
            floor,
            guard: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn floor(&self) -> u32 {
        self.floor
    }

    /// Return the id of `key`, allocating and persisting a new one if it is unseen.
    ///
    /// New ids are `max(existing) + 1`, never below the floor.
    pub fn get_or_create(&self, key: &str) -> Result<u32> {
        validate_key(key)?;

        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let _lock = self.lock(true)?;

        let mut records = self.read_records()?;
        if let Some(record) = records.iter().find(|r| r.key == key) {
            return Ok(record.id);
        }

        let id = match records.iter().map(|r| r.id).max() {
            Some(max) => max.checked_add(1).ok_or(Error::IdOverflow)?.max(self.floor),
            None => self.floor,
        };
        records.push(IdentifierRecord {
            id,
            key: key.to_string(),
        });
        self.write_records(&records)?;

        tracing::info!("Allocated id {} for '{}'", id, key);
        Ok(id)
    }

    /// Look up `key` without allocating.
    pub fn get(&self, key: &str) -> Result<Option<u32>> {
        Ok(self
            .records()?
            .into_iter()
            .find(|r| r.key == key)
            .map(|r| r.id))
    }

    /// All records in file order.
    pub fn records(&self) -> Result<Vec<IdentifierRecord>> {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let _lock = self.lock(false)?;
        self.read_records()
    }

    fn lock(&self, exclusive: bool) -> Result<TableLock> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?;
        if exclusive {
            fs2::FileExt::lock_exclusive(&file)?;
        } else {
            fs2::FileExt::lock_shared(&file)?;
        }
        Ok(TableLock(file))
    }

    fn read_records(&self) -> Result<Vec<IdentifierRecord>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        parse_table(&self.path, &contents)
    }

    fn write_records(&self, records: &[IdentifierRecord]) -> Result<()> {
        let mut contents = String::with_capacity(HEADER.len() + 1 + records.len() * 16);
        contents.push_str(HEADER);
        contents.push('\n');
        for record in records {
            contents.push_str(&format!("{},{}\n", record.id, record.key));
        }
        write_atomic(&self.path, contents.as_bytes())
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.contains(['\n', '\r']) {
        return Err(Error::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn parse_table(path: &Utf8Path, contents: &str) -> Result<Vec<IdentifierRecord>> {
    let corrupt = |line: usize, reason: String| Error::CorruptTable {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let mut lines = contents.lines().enumerate();
    match lines.next() {
        Some((_, header)) if header.trim_end() == HEADER => {}
        Some((_, header)) => return Err(corrupt(1, format!("unexpected header {header:?}"))),
        None => return Ok(Vec::new()),
    }

    let mut records = Vec::new();
    let mut keys = HashSet::new();
    let mut ids = HashSet::new();
    for (index, line) in lines {
        let line_no = index + 1;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        let (id, key) = line
            .split_once(',')
            .ok_or_else(|| corrupt(line_no, "missing ',' separator".to_string()))?;
        let id: u32 = id
            .trim()
            .parse()
            .map_err(|e| corrupt(line_no, format!("invalid id {id:?}: {e}")))?;
        if key.is_empty() {
            return Err(corrupt(line_no, "empty key".to_string()));
        }
        if !keys.insert(key) {
            return Err(corrupt(line_no, format!("duplicate key {key:?}")));
        }
        if !ids.insert(id) {
            return Err(corrupt(line_no, format!("duplicate id {id}")));
        }

        records.push(IdentifierRecord {
            id,
            key: key.to_string(),
        });
    }

    Ok(records)
}
