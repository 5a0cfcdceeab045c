use crate::error::{Error, Result};
use camino::Utf8Path;
use std::io::Write;

/// Replace `path` with `contents` via a sibling temp file and a rename, so
/// readers see either the old or the new file, never a partial one.
pub(crate) fn write_atomic(path: &Utf8Path, contents: &[u8]) -> Result<()> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|source| Error::Persist {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Parent directory of `path`, `.` for bare file names.
pub(crate) fn parent_dir(path: &Utf8Path) -> &Utf8Path {
    path.parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."))
}
