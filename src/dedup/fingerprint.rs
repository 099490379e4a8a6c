//! Content fingerprints used as duplicate index keys.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Read buffer size when hashing files already on disk.
const FILE_CHUNK_SIZE: usize = 64 * 1024;

/// SHA-256 digest of a byte buffer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint an in-memory payload.
    pub fn of(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(hasher.finalize().into())
    }

    /// Fingerprint a file by streaming it from disk.
    ///
    /// Produces the same value as [`Fingerprint::of`] on the file's bytes.
    pub fn of_file(path: &Path) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; FILE_CHUNK_SIZE];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self(hasher.finalize().into()))
    }

    /// Lowercase hex encoding of the digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..12])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_fingerprint_deterministic() {
        let data = b"the same bytes twice";
        assert_eq!(Fingerprint::of(data), Fingerprint::of(data));
    }

    #[test]
    fn test_fingerprint_single_byte_difference() {
        let a = b"payload-0001";
        let b = b"payload-0002";
        assert_ne!(Fingerprint::of(a), Fingerprint::of(b));
    }

    #[test]
    fn test_fingerprint_known_value() {
        assert_eq!(
            Fingerprint::of(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_file_matches_buffer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        // Larger than one read chunk so the streaming loop runs more than once
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &content).unwrap();

        assert_eq!(
            Fingerprint::of_file(&path).unwrap(),
            Fingerprint::of(&content)
        );
    }

    #[test]
    fn test_file_missing() {
        let dir = tempdir().unwrap();
        assert!(Fingerprint::of_file(&dir.path().join("nope")).is_err());
    }
}
