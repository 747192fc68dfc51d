//! Content digests for source files.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Computes the digest stored in [`docmirror_core::FileRecord::sha256`].
pub trait Checksum {
    /// Lowercase hex digest of the file's bytes. I/O errors are returned as-is;
    /// discovery decides what a failure means.
    fn digest_file(&self, path: &Path) -> io::Result<String>;
}

/// Streaming SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Checksum;

impl Checksum for Sha256Checksum {
    fn digest_file(&self, path: &Path) -> io::Result<String> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hex::encode(hasher.finalize()))
    }
}

/// SHA-256 of an in-memory buffer, hex encoded.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
