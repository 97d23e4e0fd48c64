use failure::Fail;
use std::path::{Path, PathBuf};

/// What role a [`TypedPath`] plays in an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathKind {
    /// A file staged into `in/` before the call, read-only for the duration of the call.
    Input,
    /// A file the call is expected to produce under `out/`.
    Output,
    /// The executable to run. May be absolute; never staged into the sandbox.
    Exec,
    /// A scratch file living under `temp/`, not staged and not harvested.
    TempFile,
    /// A scratch directory living under `temp/`, not staged and not harvested.
    TempDir,
}

/// Failure constructing a [`TypedPath`]: the path had the wrong absoluteness for its kind.
#[derive(Debug, Fail)]
pub enum PathError {
    /// A non-`Exec` path was given as absolute; only `in/`- and `out/`-relative paths are valid.
    #[fail(display = "{:?} path {:?} must be relative, got an absolute path", kind, path)]
    MustBeRelative { kind: PathKind, path: PathBuf },
    /// An `Exec` path was given as relative; relative executables are never staged automatically.
    #[fail(display = "Exec path {:?} must be absolute", path)]
    ExecMustBeAbsolute { path: PathBuf },
}

/// A tagged filesystem path: `(kind, boxed_path, unboxed_path?)` per the data model.
///
/// `boxed_path` is where the path lives inside the sandbox; `unboxed_path` is where it lives (or
/// should be written) in the caller's working directory. For every kind but `Input` the two
/// coincide, so `unboxed_path` is only ever `Some` for an `Input` that is staged from an absolute
/// override location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypedPath {
    kind: PathKind,
    boxed_path: PathBuf,
    unboxed_path: Option<PathBuf>,
}

impl TypedPath {
    /// A file staged into the sandbox from `work_dir/boxed`.
    pub fn input<P: Into<PathBuf>>(boxed: P) -> Result<TypedPath, PathError> {
        TypedPath::new(PathKind::Input, boxed.into(), None)
    }

    /// A file staged into the sandbox from an absolute path outside the working directory.
    pub fn input_from<P: Into<PathBuf>, Q: Into<PathBuf>>(
        boxed: P,
        unboxed_abspath: Q,
    ) -> Result<TypedPath, PathError> {
        TypedPath::new(PathKind::Input, boxed.into(), Some(unboxed_abspath.into()))
    }

    /// A file the call must produce; harvested back to `work_dir/boxed` on success.
    pub fn output<P: Into<PathBuf>>(boxed: P) -> Result<TypedPath, PathError> {
        TypedPath::new(PathKind::Output, boxed.into(), None)
    }

    /// A scratch file under `temp/`, local to one invocation.
    pub fn temp_file<P: Into<PathBuf>>(boxed: P) -> Result<TypedPath, PathError> {
        TypedPath::new(PathKind::TempFile, boxed.into(), None)
    }

    /// A scratch directory under `temp/`, local to one invocation.
    pub fn temp_dir<P: Into<PathBuf>>(boxed: P) -> Result<TypedPath, PathError> {
        TypedPath::new(PathKind::TempDir, boxed.into(), None)
    }

    /// The executable to run. Must be an absolute host path; it is invoked directly and is never
    /// copied into the sandbox.
    pub fn exec<P: Into<PathBuf>>(path: P) -> Result<TypedPath, PathError> {
        let path = path.into();
        if !path.is_absolute() {
            return Err(PathError::ExecMustBeAbsolute { path });
        }
        Ok(TypedPath {
            kind: PathKind::Exec,
            boxed_path: path,
            unboxed_path: None,
        })
    }

    fn new(
        kind: PathKind,
        boxed_path: PathBuf,
        unboxed_path: Option<PathBuf>,
    ) -> Result<TypedPath, PathError> {
        if boxed_path.is_absolute() {
            return Err(PathError::MustBeRelative {
                kind,
                path: boxed_path,
            });
        }
        Ok(TypedPath {
            kind,
            boxed_path,
            unboxed_path,
        })
    }

    /// This path's role in the invocation.
    pub fn kind(&self) -> PathKind {
        self.kind
    }

    /// The path as seen from inside the sandbox.
    pub fn as_boxed(&self) -> &Path {
        &self.boxed_path
    }

    /// The path as seen from the caller's working directory: the override location for an
    /// `Input` that has one, else the boxed path itself.
    pub fn as_unboxed(&self) -> &Path {
        self.unboxed_path.as_deref().unwrap_or(&self.boxed_path)
    }

    /// The sandbox-relative prefix this kind's argument string is rewritten with on the command
    /// line: empty for `Exec`/`Input`, `../out` for `Output`, `../temp` for the two temp kinds.
    pub fn box_prefix(&self) -> &'static str {
        match self.kind {
            PathKind::Exec | PathKind::Input => "",
            PathKind::Output => "../out",
            PathKind::TempFile | PathKind::TempDir => "../temp",
        }
    }

    /// The command-line string the child process sees: `box_prefix()` joined with the boxed path.
    pub fn prefixed_boxed_path(&self) -> PathBuf {
        let prefix = self.box_prefix();
        if prefix.is_empty() {
            self.boxed_path.clone()
        } else {
            Path::new(prefix).join(&self.boxed_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_rejects_absolute_boxed_path() {
        let err = TypedPath::input("/etc/passwd").unwrap_err();
        assert!(format!("{}", err).contains("must be relative"));
    }

    #[test]
    fn exec_rejects_relative_path() {
        let err = TypedPath::exec("gcc").unwrap_err();
        assert!(format!("{}", err).contains("must be absolute"));
    }

    #[test]
    fn input_from_reports_override_as_unboxed() {
        let p = TypedPath::input_from("foo.c", "/tmp/staging/foo.c").unwrap();
        assert_eq!(p.as_boxed(), Path::new("foo.c"));
        assert_eq!(p.as_unboxed(), Path::new("/tmp/staging/foo.c"));
    }

    #[test]
    fn output_prefix_is_out() {
        let p = TypedPath::output("foo.o").unwrap();
        assert_eq!(p.prefixed_boxed_path(), Path::new("../out/foo.o"));
        assert_eq!(p.as_unboxed(), Path::new("foo.o"));
    }

    #[test]
    fn temp_dir_prefix_is_temp() {
        let p = TypedPath::temp_dir("scratch").unwrap();
        assert_eq!(p.prefixed_boxed_path(), Path::new("../temp/scratch"));
    }

    #[test]
    fn exec_prefix_is_empty_even_if_absolute() {
        let p = TypedPath::exec("/usr/bin/gcc").unwrap();
        assert_eq!(p.prefixed_boxed_path(), Path::new("/usr/bin/gcc"));
    }
}
