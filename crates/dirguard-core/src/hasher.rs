//! Streaming content digests.
//!
//! Files are read in bounded chunks and folded into the selected digest,
//! so memory use is independent of file size.

use crate::config::HashAlgorithm;
use crate::error::{IntegrityError, Result};
use sha2::{Digest, Sha256, Sha512};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Default read buffer (64KB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct Hasher {
    algorithm: HashAlgorithm,
    chunk_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

impl Hasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Same buffer size, different digest.
    pub fn with_algorithm(&self, algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            chunk_size: self.chunk_size,
        }
    }

    /// Hex digest of the file at `path`.
    pub fn digest(&self, path: &Path) -> Result<String> {
        let mut file = File::open(path).map_err(|e| IntegrityError::read(path, e))?;
        self.digest_reader(&mut file)
            .map_err(|e| IntegrityError::read(path, e))
    }

    /// Hex digest of everything `reader` yields.
    pub fn digest_reader<R: Read>(&self, reader: &mut R) -> std::io::Result<String> {
        match self.algorithm {
            HashAlgorithm::Sha256 => self.stream::<Sha256, _>(reader),
            HashAlgorithm::Sha512 => self.stream::<Sha512, _>(reader),
            HashAlgorithm::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                let mut buffer = vec![0u8; self.chunk_size];
                loop {
                    let n = reader.read(&mut buffer)?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buffer[..n]);
                }
                Ok(hasher.finalize().to_hex().to_string())
            }
        }
    }

    fn stream<D: Digest, R: Read>(&self, reader: &mut R) -> std::io::Result<String> {
        let mut hasher = D::new();
        let mut buffer = vec![0u8; self.chunk_size];
        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
        Ok(hex::encode(hasher.finalize()))
    }
}
