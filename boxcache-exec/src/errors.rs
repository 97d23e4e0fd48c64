use boxcache_cache::FingerprintError;
use boxcache_types::OverlapError;
use failure::Fail;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Everything that can make `isolated_call` fail outright, as opposed to merely returning a
/// non-zero exit status (§7's error taxonomy).
#[derive(Debug, Fail)]
pub enum BoxError {
    /// Declared input/output/temp-directory name sets are not disjoint.
    Overlap(#[fail(cause)] OverlapError),
    /// Files remained under the sandbox's output root after harvesting every declared output.
    UndeclaredOutput { root: PathBuf, names: Vec<String> },
    /// A filesystem operation failed during staging, scrubbing, or harvest.
    Io(#[fail(cause)] std::io::Error),
    /// A referenced input or executable could not be read while fingerprinting.
    Fingerprint(#[fail(cause)] FingerprintError),
    /// The child process did not exit within the supplied timeout and was killed.
    Timeout(Duration),
}

impl fmt::Display for BoxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BoxError::Overlap(e) => write!(f, "{}", e),
            BoxError::UndeclaredOutput { root, names } => write!(
                f,
                "Box output directory {} contain undeclared outputs {}",
                root.display(),
                python_list_repr(names)
            ),
            BoxError::Io(e) => write!(f, "I/O error: {}", e),
            BoxError::Fingerprint(e) => write!(f, "{}", e),
            BoxError::Timeout(d) => write!(f, "Child process timed out after {:?}", d),
        }
    }
}

fn python_list_repr(names: &[String]) -> String {
    let joined = names
        .iter()
        .map(|n| format!("'{}'", n))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", joined)
}

impl From<std::io::Error> for BoxError {
    fn from(e: std::io::Error) -> Self {
        BoxError::Io(e)
    }
}

impl From<OverlapError> for BoxError {
    fn from(e: OverlapError) -> Self {
        BoxError::Overlap(e)
    }
}

impl From<FingerprintError> for BoxError {
    fn from(e: FingerprintError) -> Self {
        BoxError::Fingerprint(e)
    }
}
