//! Typed representation of the arguments handed to a boxed execution.
//!
//! An invocation never deals with raw strings when it can help it: every argument is either a
//! [`TypedPath`] (classified as an input, an output, the executable, or a scratch file/directory)
//! or a plain [`TypedArg::Literal`]. Keeping the classification in the type instead of inferring it
//! from naming conventions is what lets [`InvocationSpec::validate_overlap`] and the fingerprint
//! (computed in `boxcache-cache`) stay simple: they never have to re-derive what a path "means".

mod overlap;
mod path;
mod spec;

pub use overlap::OverlapError;
pub use path::{PathError, PathKind, TypedPath};
pub use spec::{EnvValue, ExtraInput, InvocationSpec};

/// One element of the argument vector passed to the sandboxed process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedArg {
    /// A classified filesystem path (input, output, executable, or scratch file/directory).
    Path(TypedPath),
    /// An opaque literal, passed through to the child process untouched.
    Literal(String),
}

impl TypedArg {
    /// The string fed into the fingerprint for this argument: the bare boxed path for a
    /// [`TypedPath`], or the literal text itself. Never includes the `../out` / `../temp` prefix
    /// rewriting applied to the command line actually executed.
    pub fn hash_key_string(&self) -> String {
        match self {
            TypedArg::Path(p) => p.as_boxed().to_string_lossy().into_owned(),
            TypedArg::Literal(s) => s.clone(),
        }
    }

    /// The string the child process actually sees on its command line: the literal text, or the
    /// boxed path rewritten with the sandbox-relative prefix appropriate for its kind (see
    /// [`TypedPath::box_prefix`]).
    pub fn boxed_arg_string(&self) -> String {
        match self {
            TypedArg::Path(p) => p.prefixed_boxed_path().to_string_lossy().into_owned(),
            TypedArg::Literal(s) => s.clone(),
        }
    }

    /// Shortcut for `TypedArg::Path(path)`.
    pub fn path(path: TypedPath) -> TypedArg {
        TypedArg::Path(path)
    }

    /// Shortcut for `TypedArg::Literal(value.into())`.
    pub fn literal<S: Into<String>>(value: S) -> TypedArg {
        TypedArg::Literal(value.into())
    }
}
