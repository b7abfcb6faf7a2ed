//! 摘要计算 - 流式计算位流摘要
//!
//! Supported algorithms: MD5, SHA-1, SHA-256, SHA-512. Names are matched
//! case-insensitively with or without the dash. Output is lowercase hex.

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::io::{ErrorKind, Read};
use std::str::FromStr;
use thiserror::Error;

const BUFFER_SIZE: usize = 8 * 1024;

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("Read failed while digesting: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported checksum algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl ChecksumAlgorithm {
    pub const fn name(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Md5 => "MD5",
            ChecksumAlgorithm::Sha1 => "SHA-1",
            ChecksumAlgorithm::Sha256 => "SHA-256",
            ChecksumAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// Digest everything `reader` yields
    pub fn digest_reader(&self, reader: &mut dyn Read) -> Result<String, DigestError> {
        match self {
            ChecksumAlgorithm::Md5 => hash_reader::<Md5>(reader),
            ChecksumAlgorithm::Sha1 => hash_reader::<Sha1>(reader),
            ChecksumAlgorithm::Sha256 => hash_reader::<Sha256>(reader),
            ChecksumAlgorithm::Sha512 => hash_reader::<Sha512>(reader),
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_uppercase())
            .collect();

        match normalized.as_str() {
            "MD5" => Ok(ChecksumAlgorithm::Md5),
            "SHA1" => Ok(ChecksumAlgorithm::Sha1),
            "SHA256" => Ok(ChecksumAlgorithm::Sha256),
            "SHA512" => Ok(ChecksumAlgorithm::Sha512),
            _ => Err(DigestError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

fn hash_reader<D: Digest>(reader: &mut dyn Read) -> Result<String, DigestError> {
    let mut hasher = D::new();
    let mut buffer = [0u8; BUFFER_SIZE];

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Parse `algorithm` and digest the stream with it
pub fn digest_stream(reader: &mut dyn Read, algorithm: &str) -> Result<String, DigestError> {
    let algorithm: ChecksumAlgorithm = algorithm.parse()?;
    tracing::trace!(algorithm = %algorithm, "Digesting stream");
    algorithm.digest_reader(reader)
}

/// Hex digests compare case-insensitively, ignoring surrounding whitespace
pub fn checksums_match(expected: &str, calculated: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(calculated.trim())
}
