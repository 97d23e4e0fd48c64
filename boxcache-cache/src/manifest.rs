use boxcache_store::{atomic_copy, file_hexdigest, DigestError};
use boxcache_types::TypedPath;
use failure::Fail;
use log::warn;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::NamedTempFile;

/// A cache-store or cache-load operation failed for a reason more specific than "miss". Never
/// crosses the [`store`]/[`load`] boundary: both degrade a `CacheError` into a warning (store) or
/// a silent miss (load), per §7's propagation policy. Kept around for callers that want the
/// detail — see [`try_store`]/[`try_load`].
#[derive(Debug, Fail)]
pub enum CacheError {
    #[fail(display = "I/O error: {}", 0)]
    Io(#[fail(cause)] io::Error),
    #[fail(display = "{}", 0)]
    Digest(#[fail(cause)] DigestError),
}

impl From<io::Error> for CacheError {
    fn from(e: io::Error) -> Self {
        CacheError::Io(e)
    }
}

impl From<DigestError> for CacheError {
    fn from(e: DigestError) -> Self {
        CacheError::Digest(e)
    }
}

/// The filesystem locations one fingerprint maps to under a cache root (§3's "Cache layout").
#[derive(Debug, Clone)]
pub struct CachePaths {
    cache_dir: PathBuf,
    hash_name: String,
    fingerprint_hex: String,
}

impl CachePaths {
    pub fn new(cache_dir: &Path, hash_name: &str, fingerprint_hex: &str) -> CachePaths {
        CachePaths {
            cache_dir: cache_dir.to_path_buf(),
            hash_name: hash_name.to_owned(),
            fingerprint_hex: fingerprint_hex.to_owned(),
        }
    }

    /// `<cache_dir>/manifests/<hex[0:2]>/<hex>-output.manifest`
    pub fn manifest_path(&self) -> PathBuf {
        let prefix = &self.fingerprint_hex[..2.min(self.fingerprint_hex.len())];
        self.cache_dir
            .join("manifests")
            .join(prefix)
            .join(format!("{}-output.manifest", self.fingerprint_hex))
    }

    /// `<cache_dir>/artifacts/<hash_name>/`
    pub fn artifacts_dir(&self) -> PathBuf {
        self.cache_dir.join("artifacts").join(&self.hash_name)
    }

    /// `<cache_dir>/artifacts/<hash_name>/<content_hex>`
    pub fn artifact_path(&self, content_hex: &str) -> PathBuf {
        self.artifacts_dir().join(content_hex)
    }

    /// `<cache_dir>/all.log`
    pub fn log_path(&self) -> PathBuf {
        self.cache_dir.join("all.log")
    }

    pub fn hash_name(&self) -> &str {
        &self.hash_name
    }
}

fn mtime_string(path: &Path) -> io::Result<String> {
    let mtime = fs::metadata(path)?.modified()?;
    let secs = mtime
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64();
    Ok(format!("{:.6}", secs))
}

/// Stores the content of every declared `output` (read from `work_dir`) into the artifact store
/// and appends one manifest line per output, written atomically as a whole (component D, store
/// side). Best-effort: any failure is logged and degrades to `false`, it never fails the call that
/// produced the outputs.
pub fn store(outputs: &[&TypedPath], work_dir: &Path, paths: &CachePaths) -> bool {
    match try_store(outputs, work_dir, paths) {
        Ok(()) => true,
        Err(e) => {
            warn!(
                "Could not store {:?} into cache, reason: {}",
                outputs
                    .iter()
                    .map(|o| o.as_boxed().display().to_string())
                    .collect::<Vec<_>>(),
                e
            );
            false
        }
    }
}

/// Same as [`store`] but surfaces the reason for a failure instead of swallowing it.
pub fn try_store(
    outputs: &[&TypedPath],
    work_dir: &Path,
    paths: &CachePaths,
) -> Result<(), CacheError> {
    fs::create_dir_all(paths.artifacts_dir())?;
    let manifest_path = paths.manifest_path();
    let manifest_dir = manifest_path
        .parent()
        .expect("manifest path always has a parent")
        .to_path_buf();
    fs::create_dir_all(&manifest_dir)?;

    let mut tmp = NamedTempFile::new_in(&manifest_dir)?;
    for output in outputs {
        let work_path = work_dir.join(output.as_boxed());
        let digest = file_hexdigest(&work_path, paths.hash_name())?;
        let artifact_path = paths.artifact_path(&digest);
        // A pre-existing artifact at this digest is assumed identical by construction; leave it.
        atomic_copy(&work_path, &artifact_path, false);
        let mtime = mtime_string(&work_path)?;
        writeln!(tmp, "{} {} {}", digest, mtime, output.as_boxed().display())?;
    }
    tmp.persist(&manifest_path)
        .map_err(|e| CacheError::Io(e.error))?;
    Ok(())
}

/// Replays a cached manifest for `outputs` into `work_dir` (component D, load side). Returns
/// `false` on any kind of miss: no manifest, a manifest that doesn't name every declared output
/// (or names extras), or a missing artifact. Content digest is authoritative; the manifest's
/// `mtime` field is informational only and is never consulted here.
pub fn load(outputs: &[&TypedPath], work_dir: &Path, paths: &CachePaths) -> bool {
    try_load(outputs, work_dir, paths).unwrap_or(false)
}

/// Same as [`load`] but surfaces I/O errors distinct from an ordinary miss.
pub fn try_load(
    outputs: &[&TypedPath],
    work_dir: &Path,
    paths: &CachePaths,
) -> Result<bool, CacheError> {
    let content = match fs::read_to_string(paths.manifest_path()) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    let mut entries: HashMap<String, String> = HashMap::new();
    for line in content.lines() {
        // digest and mtime never contain spaces; the output name might, so only the first two
        // separators are significant (§6).
        let mut parts = line.splitn(3, ' ');
        if let (Some(digest), Some(_mtime), Some(name)) =
            (parts.next(), parts.next(), parts.next())
        {
            entries.insert(name.to_owned(), digest.to_owned());
        }
    }

    // Every manifest entry must be consumed by a declared output and vice versa; anything else
    // means the manifest is out of sync with what's being asked for now. Check this before
    // touching the filesystem so a miss never partially applies.
    if entries.len() != outputs.len() {
        return Ok(false);
    }
    let mut resolved = Vec::with_capacity(outputs.len());
    for output in outputs {
        let boxed_name = output.as_boxed().to_string_lossy().into_owned();
        match entries.get(&boxed_name) {
            Some(digest) => resolved.push((*output, digest.clone())),
            None => return Ok(false),
        }
    }

    for (output, digest) in resolved {
        let work_path = work_dir.join(output.as_boxed());
        let already_matches = work_path.exists()
            && file_hexdigest(&work_path, paths.hash_name())
                .map(|d| d == digest)
                .unwrap_or(false);
        if already_matches {
            continue;
        }
        let artifact_path = paths.artifact_path(&digest);
        if !artifact_path.exists() || !atomic_copy(&artifact_path, &work_path, true) {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxcache_types::TypedPath;
    use std::fs;

    #[test]
    fn store_then_load_round_trips() {
        let cache_dir = tempfile::tempdir().unwrap();
        let work_dir = tempfile::tempdir().unwrap();
        fs::write(work_dir.path().join("foo.o"), b"object code").unwrap();

        let output = TypedPath::output("foo.o").unwrap();
        let paths = CachePaths::new(cache_dir.path(), "sha256", "deadbeef");

        assert!(store(&[&output], work_dir.path(), &paths));
        assert!(paths.manifest_path().exists());

        let reload_dir = tempfile::tempdir().unwrap();
        assert!(load(&[&output], reload_dir.path(), &paths));
        assert_eq!(
            fs::read(reload_dir.path().join("foo.o")).unwrap(),
            b"object code"
        );
    }

    #[test]
    fn load_misses_with_no_manifest() {
        let cache_dir = tempfile::tempdir().unwrap();
        let work_dir = tempfile::tempdir().unwrap();
        let output = TypedPath::output("foo.o").unwrap();
        let paths = CachePaths::new(cache_dir.path(), "sha256", "deadbeef");
        assert!(!load(&[&output], work_dir.path(), &paths));
    }

    #[test]
    fn load_misses_when_declared_outputs_changed() {
        let cache_dir = tempfile::tempdir().unwrap();
        let work_dir = tempfile::tempdir().unwrap();
        fs::write(work_dir.path().join("foo.o"), b"object code").unwrap();
        let output = TypedPath::output("foo.o").unwrap();
        let paths = CachePaths::new(cache_dir.path(), "sha256", "deadbeef");
        assert!(store(&[&output], work_dir.path(), &paths));

        let extra_output = TypedPath::output("foo.su").unwrap();
        let reload_dir = tempfile::tempdir().unwrap();
        assert!(!load(&[&output, &extra_output], reload_dir.path(), &paths));
    }

    #[test]
    fn store_skips_unchanged_existing_artifact() {
        let cache_dir = tempfile::tempdir().unwrap();
        let work_dir = tempfile::tempdir().unwrap();
        fs::write(work_dir.path().join("foo.o"), b"object code").unwrap();
        let output = TypedPath::output("foo.o").unwrap();
        let paths = CachePaths::new(cache_dir.path(), "sha256", "deadbeef");
        assert!(store(&[&output], work_dir.path(), &paths));
        // storing again with byte-identical content must not error even though the artifact
        // already exists (overwrite=false semantics)
        assert!(store(&[&output], work_dir.path(), &paths));
    }

    #[test]
    fn store_reports_missing_output_as_a_non_fatal_warning() {
        let cache_dir = tempfile::tempdir().unwrap();
        let work_dir = tempfile::tempdir().unwrap();
        let output = TypedPath::output("nonexistent.o").unwrap();
        let paths = CachePaths::new(cache_dir.path(), "sha256", "deadbeef");
        assert!(!store(&[&output], work_dir.path(), &paths));
    }
}
