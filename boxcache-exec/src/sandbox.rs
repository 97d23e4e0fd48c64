use crate::errors::BoxError;
use boxcache_store::link_or_copy;
use boxcache_types::TypedPath;
use std::env;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Owns one invocation's transient `in/`/`out/`/`temp/` tree (§4.E) and restores the process's
/// current directory on every exit path, including panics, via `Drop`. This is the RAII guard
/// the redesign notes call for in place of the source's scoped-cleanup-on-success-only pattern.
#[derive(Debug)]
pub(crate) struct SandboxRoot {
    root: TempDir,
    pub(crate) in_dir: PathBuf,
    pub(crate) out_dir: PathBuf,
    pub(crate) temp_dir: PathBuf,
    previous_cwd: PathBuf,
}

impl SandboxRoot {
    /// Creates a fresh, empty sandbox root under `tmp_root` (created if missing) with its three
    /// subdirectories, and records the caller's current directory for later restoration.
    pub(crate) fn create(tmp_root: &Path) -> Result<SandboxRoot, BoxError> {
        fs::create_dir_all(tmp_root)?;
        let root = TempDir::new_in(tmp_root)?;
        let in_dir = root.path().join("in");
        let out_dir = root.path().join("out");
        let temp_dir = root.path().join("temp");
        fs::create_dir(&in_dir)?;
        fs::create_dir(&out_dir)?;
        fs::create_dir(&temp_dir)?;
        let previous_cwd = env::current_dir()?;
        log::trace!("Sandbox root ready at {:?}", root.path());
        Ok(SandboxRoot {
            root,
            in_dir,
            out_dir,
            temp_dir,
            previous_cwd,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        self.root.path()
    }
}

impl Drop for SandboxRoot {
    fn drop(&mut self) {
        // the in/ directory may still be read-only from the call; restore write access before
        // the TempDir's own Drop tries to recursively remove the tree.
        if set_permissions(&self.in_dir, 0o700).is_err() {
            log::warn!("Cannot restore permissions on {:?}", self.in_dir);
        }
        if env::set_current_dir(&self.previous_cwd).is_err() {
            log::warn!("Cannot restore working directory to {:?}", self.previous_cwd);
        }
    }
}

pub(crate) fn set_permissions(path: &Path, mode: u32) -> IoResult<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(mode);
    fs::set_permissions(path, permissions)
}

type IoResult<T> = std::io::Result<T>;

/// Stages every declared input read-only into `in_dir`, linking from (or copying, on a
/// cross-filesystem link failure) its unboxed location under `work_dir`.
pub(crate) fn stage_inputs(
    in_dir: &Path,
    work_dir: &Path,
    inputs: &[&TypedPath],
) -> Result<(), BoxError> {
    for input in inputs {
        let dest = in_dir.join(input.as_boxed());
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let source = work_dir.join(input.as_unboxed());
        log::trace!("Staging {:?} -> {:?}", source, dest);
        if !link_or_copy(&source, &dest) {
            return Err(BoxError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("cannot stage input from {}", source.display()),
            )));
        }
    }
    Ok(())
}

/// Pre-creates the parent directories of every declared output under `out_dir`, so the child
/// process can write to them without having to `mkdir -p` itself.
pub(crate) fn precreate_output_dirs(
    out_dir: &Path,
    outputs: &[&TypedPath],
) -> Result<(), BoxError> {
    for output in outputs {
        let dest = out_dir.join(output.as_boxed());
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Lists every regular file remaining under `root`, as paths relative to it, sorted. Used after
/// harvest to detect undeclared outputs (§4.E step 9).
pub(crate) fn list_relative_files(root: &Path) -> IoResult<Vec<String>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let relative = path
                    .strip_prefix(root)
                    .expect("walked path is always under root")
                    .to_string_lossy()
                    .into_owned();
                files.push(relative);
            }
        }
    }
    files.sort();
    Ok(files)
}
