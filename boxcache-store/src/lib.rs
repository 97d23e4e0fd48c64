//! Atomic file operations and the content-addressed artifact store.
//!
//! Every write that can be observed by a concurrent reader (another process loading from the same
//! cache) goes through [`atomic_copy`]: write to a temp sibling, then rename into place. On POSIX
//! filesystems a rename is atomic, so a reader either sees the old file or the new one, never a
//! partial write.

mod atomic;
mod digest;
mod recency;

pub use atomic::{atomic_copy, link_or_copy, move_back};
pub use digest::{file_hexdigest, hash_bytes, DigestError, HashAlgorithm, RunningDigest};
pub use recency::artifacts_by_recency;
