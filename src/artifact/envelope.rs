//! Checksummed wrapper for serialized objects

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// On-disk envelope around a bincode payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedObject {
    pub magic: [u8; 4],
    pub format_version: u32,
    /// Rust type name of the payload, informational only
    pub type_name: String,
    pub payload: Vec<u8>,
    pub checksum: u64,
}

impl SerializedObject {
    const MAGIC: [u8; 4] = *b"PHGD";
    const VERSION: u32 = 1;

    pub fn new(type_name: impl Into<String>, payload: Vec<u8>) -> Self {
        let checksum = Self::compute_checksum(&payload);
        Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            type_name: type_name.into(),
            payload,
            checksum,
        }
    }

    /// FNV-1a over the payload
    fn compute_checksum(data: &[u8]) -> u64 {
        const FNV_OFFSET: u64 = 14695981039346656037;
        const FNV_PRIME: u64 = 1099511628211;

        let mut hash = FNV_OFFSET;
        for byte in data {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        hash
    }

    /// Check magic, version and checksum.
    pub fn verify(&self) -> Result<()> {
        if self.magic != Self::MAGIC {
            return Err(PipelineError::Serialization(
                "not a pipeline object file".to_string(),
            ));
        }
        if self.format_version != Self::VERSION {
            return Err(PipelineError::Serialization(format!(
                "unsupported object format version {}",
                self.format_version
            )));
        }
        if Self::compute_checksum(&self.payload) != self.checksum {
            return Err(PipelineError::Serialization(
                "checksum verification failed, file may be corrupted".to_string(),
            ));
        }
        Ok(())
    }
}
