use boxcache_store::{DigestError, RunningDigest};
use boxcache_types::{EnvValue, ExtraInput, InvocationSpec, PathKind, TypedArg};
use failure::Fail;
use std::path::PathBuf;

/// A referenced input or executable could not be read while computing the fingerprint.
#[derive(Debug, Fail)]
pub enum FingerprintError {
    /// `hash_name` named an algorithm this crate doesn't support.
    #[fail(display = "Unknown hash algorithm {:?}", 0)]
    UnknownAlgorithm(String),
    /// An `Input` or `Exec` path referenced in the invocation could not be read.
    #[fail(display = "Cannot read {:?} while fingerprinting: {}", path, source)]
    UnreadableFile {
        path: PathBuf,
        #[fail(cause)]
        source: std::io::Error,
    },
}

impl From<DigestError> for FingerprintError {
    fn from(e: DigestError) -> Self {
        FingerprintError::UnknownAlgorithm(e.0)
    }
}

/// Computes the deterministic fingerprint that keys the cache for `spec` (§3, §4.C).
///
/// Feeds, in order: every typed argument's bare boxed string form (plus, for `Input`/`Exec`
/// arguments, the full bytes of the file at their unboxed path); every extra input, in the
/// caller's order (raw bytes, or boxed name followed by file content); then every `(name, value)`
/// environment pair in lexicographic order by name — guaranteed by `InvocationSpec::typed_env`
/// being a `BTreeMap`, so no explicit sort is needed here.
///
/// `cache_dir`, `shell`, `timeout`, and the `extra_outputs` field never contribute: two
/// invocations that differ only in those are cache-equivalent.
pub fn fingerprint(spec: &InvocationSpec) -> Result<String, FingerprintError> {
    let mut digest = RunningDigest::new(&spec.hash_name)?;

    for arg in &spec.typed_args {
        digest.update(arg.hash_key_string().as_bytes());
        if let TypedArg::Path(p) = arg {
            if matches!(p.kind(), PathKind::Input | PathKind::Exec) {
                hash_file(&mut digest, p.as_unboxed())?;
            }
        }
    }

    for extra in &spec.extra_inputs {
        match extra {
            ExtraInput::Bytes(bytes) => digest.update(bytes),
            ExtraInput::File(p) => {
                digest.update(p.as_boxed().to_string_lossy().as_bytes());
                hash_file(&mut digest, p.as_unboxed())?;
            }
        }
    }

    for (name, value) in &spec.typed_env {
        digest.update(name.as_bytes());
        match value {
            EnvValue::Literal(s) => digest.update(s.as_bytes()),
            EnvValue::TempDir(p) => digest.update(p.as_boxed().to_string_lossy().as_bytes()),
        }
    }

    Ok(digest.finish())
}

fn hash_file(
    digest: &mut boxcache_store::RunningDigest,
    path: &std::path::Path,
) -> Result<(), FingerprintError> {
    digest
        .update_file(path)
        .map_err(|source| FingerprintError::UnreadableFile {
            path: path.to_path_buf(),
            source,
        })
}
