use crate::overlap::OverlapError;
use crate::path::{PathKind, TypedPath};
use crate::TypedArg;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// A value bound to an environment variable name: either a literal string or a handle to one of
/// the invocation's temp directories (rewritten to its boxed location before the call).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValue {
    /// A literal environment value, used verbatim.
    Literal(String),
    /// A reference to a declared temp directory; resolved to its boxed path at staging time.
    TempDir(TypedPath),
}

/// An extra hashed input that does not appear on the command line: either raw bytes (e.g. a
/// config blob) or a file staged alongside the declared inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtraInput {
    /// Raw bytes contributed directly to the fingerprint.
    Bytes(Vec<u8>),
    /// A file staged into the sandbox and hashed by its boxed name and content.
    File(TypedPath),
}

/// The full, typed description of one `isolated_call` invocation.
///
/// Constructing one does no I/O; every field is a plain value. `cache_dir = None` disables
/// caching for this call (§6): `isolated_call` always executes and never stores or loads.
#[derive(Debug, Clone)]
pub struct InvocationSpec {
    /// The argument vector, in the order the child process will see it.
    pub typed_args: Vec<TypedArg>,
    /// Environment variables, keyed by name. Stored in a `BTreeMap` so iteration is always sorted
    /// lexicographically by name, which is exactly the order the fingerprint requires.
    pub typed_env: BTreeMap<String, EnvValue>,
    /// Inputs hashed and staged but not present on the command line.
    pub extra_inputs: Vec<ExtraInput>,
    /// Outputs harvested but not present on the command line.
    pub extra_outputs: Vec<TypedPath>,
    /// Root of the content-addressed cache; `None` disables caching.
    pub cache_dir: Option<PathBuf>,
    /// Name of the hash algorithm keying the cache (e.g. `"sha256"`).
    pub hash_name: String,
    /// Whether the child should be run through a shell.
    pub shell: bool,
    /// Wall-clock limit for the child process.
    pub timeout: Option<Duration>,
    /// Whether to strip `<in_dir_abspath>/` line prefixes from text outputs after a successful
    /// call (§4.H).
    pub strip_box_in_dir_prefix: bool,
}

impl InvocationSpec {
    /// A bare invocation with no extra inputs/outputs, caching disabled, sha256 fingerprints, and
    /// no timeout. Use the builder-style `with_*` methods to fill in the rest.
    pub fn new(typed_args: Vec<TypedArg>) -> InvocationSpec {
        InvocationSpec {
            typed_args,
            typed_env: BTreeMap::new(),
            extra_inputs: Vec::new(),
            extra_outputs: Vec::new(),
            cache_dir: None,
            hash_name: "sha256".to_owned(),
            shell: false,
            timeout: None,
            strip_box_in_dir_prefix: false,
        }
    }

    /// Declared output paths: those on the command line plus `extra_outputs`.
    pub fn declared_outputs(&self) -> Vec<&TypedPath> {
        self.typed_args
            .iter()
            .filter_map(|a| match a {
                TypedArg::Path(p) if p.kind() == PathKind::Output => Some(p),
                _ => None,
            })
            .chain(self.extra_outputs.iter())
            .collect()
    }

    /// Declared input paths: those on the command line plus file-backed `extra_inputs`.
    pub fn declared_inputs(&self) -> Vec<&TypedPath> {
        self.typed_args
            .iter()
            .filter_map(|a| match a {
                TypedArg::Path(p) if p.kind() == PathKind::Input => Some(p),
                _ => None,
            })
            .chain(self.extra_inputs.iter().filter_map(|e| match e {
                ExtraInput::File(p) => Some(p),
                ExtraInput::Bytes(_) => None,
            }))
            .collect()
    }

    /// Declared temp directories: those on the command line plus any bound to an env variable.
    pub fn declared_temp_dirs(&self) -> Vec<&TypedPath> {
        self.typed_args
            .iter()
            .filter_map(|a| match a {
                TypedArg::Path(p) if p.kind() == PathKind::TempDir => Some(p),
                _ => None,
            })
            .chain(self.typed_env.values().filter_map(|v| match v {
                EnvValue::TempDir(p) => Some(p),
                EnvValue::Literal(_) => None,
            }))
            .collect()
    }

    /// Declared temp files: those on the command line only (temp files cannot be bound to an env
    /// variable in this model).
    pub fn declared_temp_files(&self) -> Vec<&TypedPath> {
        self.typed_args
            .iter()
            .filter_map(|a| match a {
                TypedArg::Path(p) if p.kind() == PathKind::TempFile => Some(p),
                _ => None,
            })
            .collect()
    }

    /// Executable path, if one of the typed args is an `Exec`.
    pub fn executable(&self) -> Option<&TypedPath> {
        self.typed_args.iter().find_map(|a| match a {
            TypedArg::Path(p) if p.kind() == PathKind::Exec => Some(p),
            _ => None,
        })
    }

    /// Checks that the declared input, output, and temp-directory name sets are pairwise
    /// disjoint (component G). Must be called, and must succeed, before the child is spawned.
    pub fn validate_overlap(&self) -> Result<(), OverlapError> {
        crate::overlap::validate(
            &self.declared_inputs(),
            &self.declared_outputs(),
            &self.declared_temp_dirs(),
        )
    }
}
