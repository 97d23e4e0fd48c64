use log::warn;
use std::fs;
use std::io;
use std::path::Path;
use tempfile::NamedTempFile;

/// Copies `src` to `dst` by writing a temp sibling of `dst` and renaming it into place, so a
/// concurrent reader of `dst` never observes a partial write.
///
/// When `overwrite` is `false` and `dst` already exists, this is a no-op that still returns
/// `true`: callers use this to populate a content-addressed store, where an existing entry at
/// `dst` is assumed byte-identical by construction of the digest that named it.
///
/// Returns `false` (after logging a warning) on any I/O failure; the temp file is always cleaned
/// up.
pub fn atomic_copy(src: &Path, dst: &Path, overwrite: bool) -> bool {
    match try_atomic_copy(src, dst, overwrite) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to copy {} to {}: {}", src.display(), dst.display(), e);
            false
        }
    }
}

fn try_atomic_copy(src: &Path, dst: &Path, overwrite: bool) -> io::Result<()> {
    let parent = dst.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    {
        let mut src_file = fs::File::open(src)?;
        io::copy(&mut src_file, tmp.as_file_mut())?;
    }
    if overwrite {
        tmp.persist(dst).map_err(|e| e.error)?;
    } else if let Err(e) = tmp.persist_noclobber(dst) {
        if e.error.kind() != io::ErrorKind::AlreadyExists {
            return Err(e.error);
        }
    }
    Ok(())
}

/// Hard-links `src` to `dst`, falling back to [`atomic_copy`] with `overwrite = true` when the
/// link fails (e.g. `src` and `dst` are on different filesystems).
pub fn link_or_copy(src: &Path, dst: &Path) -> bool {
    if let Some(parent) = dst.parent() {
        if fs::create_dir_all(parent).is_err() {
            return false;
        }
    }
    match fs::hard_link(src, dst) {
        Ok(()) => true,
        Err(_) => atomic_copy(src, dst, true),
    }
}

/// Moves `box_path` to `work_path`, preferring a rename and falling back to
/// [`link_or_copy`] plus unlinking the source when the rename fails (typically because the two
/// paths are on different filesystems).
pub fn move_back(box_path: &Path, work_path: &Path) -> bool {
    if let Some(parent) = work_path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return false;
        }
    }
    if fs::rename(box_path, work_path).is_ok() {
        return true;
    }
    if !link_or_copy(box_path, work_path) {
        return false;
    }
    fs::remove_file(box_path).is_ok()
}
