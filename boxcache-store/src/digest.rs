use blake2::Blake2b;
use failure::Fail;
use sha2::{Digest, Sha256, Sha512};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

/// A content hash was keyed by an algorithm name this crate doesn't recognize.
#[derive(Debug, Fail)]
#[fail(display = "Unknown hash algorithm {:?}", 0)]
pub struct DigestError(pub String);

/// The hash algorithms this store can key artifacts by. Selected at invocation time via
/// `hash_name` (§3); `sha256` is the recommended default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
    Blake2b,
}

impl HashAlgorithm {
    /// The name this variant is selected by, and the directory name under `artifacts/`.
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Blake2b => "blake2b",
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = DigestError;

    fn from_str(name: &str) -> Result<HashAlgorithm, DigestError> {
        match name {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            "blake2b" => Ok(HashAlgorithm::Blake2b),
            other => Err(DigestError(other.to_owned())),
        }
    }
}

/// An in-progress hash, fed incrementally from several unrelated sources (argument strings, file
/// contents, environment values) before being finalized. This is what lets the fingerprint
/// (`boxcache-cache`) chain bytes from many different places into one hash without buffering them
/// all in memory first.
pub enum RunningDigest {
    Sha256(Sha256),
    Sha512(Sha512),
    Blake2b(Blake2b),
}

impl RunningDigest {
    /// Starts a new running digest under the named algorithm.
    pub fn new(hash_name: &str) -> Result<RunningDigest, DigestError> {
        Ok(match HashAlgorithm::from_str(hash_name)? {
            HashAlgorithm::Sha256 => RunningDigest::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => RunningDigest::Sha512(Sha512::new()),
            HashAlgorithm::Blake2b => RunningDigest::Blake2b(Blake2b::new()),
        })
    }

    /// Feeds `bytes` into the digest.
    pub fn update(&mut self, bytes: &[u8]) {
        match self {
            RunningDigest::Sha256(h) => h.input(bytes),
            RunningDigest::Sha512(h) => h.input(bytes),
            RunningDigest::Blake2b(h) => h.input(bytes),
        }
    }

    /// Streams the full contents of the file at `path` into the digest, in fixed-size chunks.
    pub fn update_file(&mut self, path: &Path) -> io::Result<()> {
        let mut file = File::open(path)?;
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            self.update(&buf[..n]);
        }
        Ok(())
    }

    /// Consumes the digest, returning its lowercase hex encoding.
    pub fn finish(self) -> String {
        match self {
            RunningDigest::Sha256(h) => hex::encode(h.result()),
            RunningDigest::Sha512(h) => hex::encode(h.result()),
            RunningDigest::Blake2b(h) => hex::encode(h.result()),
        }
    }
}

/// Hex digest of `data` under the named algorithm.
pub fn hash_bytes(hash_name: &str, data: &[u8]) -> Result<String, DigestError> {
    let mut digest = RunningDigest::new(hash_name)?;
    digest.update(data);
    Ok(digest.finish())
}

/// Hex digest of the full contents of the file at `path`.
///
/// A missing or unreadable file is an I/O error, not an empty digest: a referenced input or
/// executable that cannot be read must fail the invocation (§4.C), not silently hash as empty.
pub fn file_hexdigest(path: &Path, hash_name: &str) -> io::Result<String> {
    let mut digest = RunningDigest::new(hash_name)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    digest.update_file(path)?;
    Ok(digest.finish())
}
