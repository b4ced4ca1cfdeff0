//! Content fingerprinting primitives
//!
//! Provides [`Fingerprint`], a fixed-length digest of artifact content used to
//! recognise the placeholder page the artifact store serves for missing paths.

use md5::Md5;
use sha2::{Digest, Sha256};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Fingerprint of the "empty directory" page served by the GCS-backed Prow
/// artifact store, with every reference to the requested path stripped.
pub const DEFAULT_MISSING_PAGE_FINGERPRINT: &str = "b66c9aae6e6cf88de034b25232ba0181";

/// Digest algorithm behind a [`Fingerprint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FingerprintAlgorithm {
    /// 16-byte MD5 digest
    Md5,
    /// 32-byte SHA-256 digest
    Sha256,
}

impl FingerprintAlgorithm {
    /// Length of the digest in bytes
    #[inline]
    #[must_use]
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha256 => 32,
        }
    }
}

impl Display for FingerprintAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Md5 => f.write_str("md5"),
            Self::Sha256 => f.write_str("sha256"),
        }
    }
}

/// A content fingerprint
///
/// Collision resistance is not a security requirement here; the digest only
/// has to be stable. The algorithm is carried with the value so a configured
/// fingerprint always recomputes with the digest it was captured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fingerprint {
    /// MD5 digest
    Md5([u8; 16]),
    /// SHA-256 digest
    Sha256([u8; 32]),
}

impl Fingerprint {
    /// Compute the fingerprint of `data` with the given algorithm
    #[must_use]
    pub fn compute(algorithm: FingerprintAlgorithm, data: &[u8]) -> Self {
        match algorithm {
            FingerprintAlgorithm::Md5 => Self::Md5(Md5::digest(data).into()),
            FingerprintAlgorithm::Sha256 => Self::Sha256(Sha256::digest(data).into()),
        }
    }

    /// Algorithm this fingerprint was computed with
    #[inline]
    #[must_use]
    pub const fn algorithm(&self) -> FingerprintAlgorithm {
        match self {
            Self::Md5(_) => FingerprintAlgorithm::Md5,
            Self::Sha256(_) => FingerprintAlgorithm::Sha256,
        }
    }

    /// Raw digest bytes
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Md5(bytes) => bytes,
            Self::Sha256(bytes) => bytes,
        }
    }

    /// Check whether `data` has this fingerprint
    #[inline]
    #[must_use]
    pub fn matches(&self, data: &[u8]) -> bool {
        Self::compute(self.algorithm(), data) == *self
    }

    /// Create a fingerprint from raw digest bytes
    ///
    /// The algorithm is chosen by length: 16 bytes is MD5, 32 bytes is SHA-256.
    ///
    /// # Errors
    /// Returns error if the slice matches neither digest length
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FingerprintError> {
        match bytes.len() {
            16 => {
                let mut arr = [0u8; 16];
                arr.copy_from_slice(bytes);
                Ok(Self::Md5(arr))
            }
            32 => {
                let mut arr = [0u8; 32];
                arr.copy_from_slice(bytes);
                Ok(Self::Sha256(arr))
            }
            actual => Err(FingerprintError::InvalidLength { actual }),
        }
    }

    /// The built-in missing-page fingerprint
    #[must_use]
    pub fn default_missing_page() -> Self {
        // The constant is a literal 32-char hex string.
        DEFAULT_MISSING_PAGE_FINGERPRINT
            .parse()
            .unwrap_or(Self::Md5([0; 16]))
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.as_bytes()))
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())?;
        Self::from_slice(&bytes)
    }
}

impl serde::Serialize for Fingerprint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Fingerprint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when reading a fingerprint
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    /// Digest length matches no supported algorithm
    #[error("invalid fingerprint length: expected 16 (md5) or 32 (sha256) bytes, got {actual}")]
    InvalidLength { actual: usize },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_of_known_input() {
        let fp = Fingerprint::compute(FingerprintAlgorithm::Md5, b"hello");
        assert_eq!(fp.to_string(), "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(fp.algorithm(), FingerprintAlgorithm::Md5);
    }

    #[test]
    fn sha256_of_known_input() {
        let fp = Fingerprint::compute(FingerprintAlgorithm::Sha256, b"hello");
        assert_eq!(
            fp.to_string(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(fp.as_bytes().len(), FingerprintAlgorithm::Sha256.digest_len());
    }

    #[test]
    fn parse_picks_algorithm_from_length() {
        let md5: Fingerprint = DEFAULT_MISSING_PAGE_FINGERPRINT.parse().unwrap();
        assert_eq!(md5.algorithm(), FingerprintAlgorithm::Md5);

        let sha: Fingerprint = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
            .parse()
            .unwrap();
        assert_eq!(sha.algorithm(), FingerprintAlgorithm::Sha256);
    }

    #[test]
    fn parse_rejects_bad_length() {
        let result = "abcd".parse::<Fingerprint>();
        assert!(matches!(result, Err(FingerprintError::InvalidLength { actual: 2 })));
    }

    #[test]
    fn parse_rejects_non_hex() {
        let result = "zz".repeat(16).parse::<Fingerprint>();
        assert!(matches!(result, Err(FingerprintError::HexDecode(_))));
    }

    #[test]
    fn matches_recomputes_with_own_algorithm() {
        let fp = Fingerprint::compute(FingerprintAlgorithm::Sha256, b"page");
        assert!(fp.matches(b"page"));
        assert!(!fp.matches(b"other page"));
    }

    #[test]
    fn default_missing_page_is_the_constant() {
        assert_eq!(
            Fingerprint::default_missing_page().to_string(),
            DEFAULT_MISSING_PAGE_FINGERPRINT
        );
    }

    #[test]
    fn serde_as_hex_string() {
        let fp = Fingerprint::compute(FingerprintAlgorithm::Md5, b"hello");
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, "\"5d41402abc4b2a76b9719d911017c592\"");
        let decoded: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, fp);
    }
}
