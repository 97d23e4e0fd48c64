use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Lists the entries directly under `artifacts_dir` (one hash-name subtree of the artifact
/// store) ordered oldest-first by last-modified time.
///
/// This is the full extent of cache-pruning support here: the ordering primitive only. Deciding
/// how many entries (or how much total size) to evict, and actually removing them, is an external
/// policy's job — it is free to call `std::fs::remove_file` on a prefix of the returned list.
pub fn artifacts_by_recency(artifacts_dir: &Path) -> io::Result<Vec<(PathBuf, SystemTime)>> {
    let mut entries = Vec::new();
    if !artifacts_dir.exists() {
        return Ok(entries);
    }
    for entry in std::fs::read_dir(artifacts_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let mtime = entry.metadata()?.modified()?;
        entries.push((entry.path(), mtime));
    }
    entries.sort_by_key(|(_, mtime)| *mtime);
    Ok(entries)
}
