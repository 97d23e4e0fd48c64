//! A sandboxed command-execution engine with a content-addressed output cache: the core of a
//! hermetic build step.
//!
//! Given a typed argument vector (an executable, declared input files, declared output files,
//! temporary directories, and literal strings) and an environment map, [`isolated_call`]
//! constructs a reproducible execution environment, runs the command, detects undeclared
//! side-effect outputs, and persists declared outputs by content hash so that a later invocation
//! with byte-identical inputs can replay them without spawning a process.
//!
//! ```no_run
//! use boxcache::{default_cache_dir, isolated_call, DriverLog, InvocationSpec, ProcessSpawn, TypedArg, TypedPath};
//! use std::path::Path;
//!
//! let spec = InvocationSpec::new(vec![
//!     TypedArg::path(TypedPath::exec("/usr/bin/gcc").unwrap()),
//!     TypedArg::literal("-c"),
//!     TypedArg::path(TypedPath::input("foo.c").unwrap()),
//!     TypedArg::literal("-o"),
//!     TypedArg::path(TypedPath::output("foo.o").unwrap()),
//! ]);
//! let log = DriverLog::open(Path::new("/tmp/boxcache/all.log")).unwrap();
//! let spawn = ProcessSpawn::default();
//! let status = isolated_call(&spec, Path::new("."), &spawn, &log).unwrap();
//! assert_eq!(status, 0);
//! let _ = default_cache_dir("boxcache");
//! ```

pub use boxcache_cache::{fingerprint, load, store, CacheError, CachePaths, FingerprintError};
pub use boxcache_exec::{
    default_cache_dir, default_log_dir, isolated_call, BoxError, DriverLog, ProcessSpawn,
    RecordedCall, RecordingSpawn, Spawn,
};
pub use boxcache_store::{
    artifacts_by_recency, atomic_copy, file_hexdigest, hash_bytes, link_or_copy, move_back,
    DigestError, HashAlgorithm, RunningDigest,
};
pub use boxcache_types::{
    EnvValue, ExtraInput, InvocationSpec, OverlapError, PathError, PathKind, TypedArg, TypedPath,
};
