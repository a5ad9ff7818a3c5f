//! One-way digest algorithms and the hex encrypter

use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

use regex::Regex;

/// Digest algorithms available to encryption markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Algorithm {
    #[serde(rename = "MD2")]
    Md2,
    #[default]
    #[serde(rename = "MD5")]
    Md5,
    #[serde(rename = "SHA-1")]
    Sha1,
    #[serde(rename = "SHA-256")]
    Sha256,
    #[serde(rename = "SHA-384")]
    Sha384,
    #[serde(rename = "SHA-512")]
    Sha512,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown digest algorithm '{0}'")]
pub struct UnknownAlgorithm(pub String);

impl Algorithm {
    pub const ALL: [Algorithm; 6] = [
        Algorithm::Md2,
        Algorithm::Md5,
        Algorithm::Sha1,
        Algorithm::Sha256,
        Algorithm::Sha384,
        Algorithm::Sha512,
    ];

    /// Canonical algorithm name (`MD5`, `SHA-256`, ...)
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Md2 => "MD2",
            Algorithm::Md5 => "MD5",
            Algorithm::Sha1 => "SHA-1",
            Algorithm::Sha256 => "SHA-256",
            Algorithm::Sha384 => "SHA-384",
            Algorithm::Sha512 => "SHA-512",
        }
    }

    /// Look up an algorithm by name, ignoring case and the dash
    pub fn from_name(name: &str) -> Option<Algorithm> {
        let wanted = name.trim().replace('-', "").to_uppercase();
        Self::ALL
            .into_iter()
            .find(|a| a.name().replace('-', "") == wanted)
    }

    /// Raw digest bytes of `input`
    pub fn digest(&self, input: &[u8]) -> Vec<u8> {
        match self {
            Algorithm::Md2 => md2::Md2::digest(input).to_vec(),
            Algorithm::Md5 => md5::Md5::digest(input).to_vec(),
            Algorithm::Sha1 => sha1::Sha1::digest(input).to_vec(),
            Algorithm::Sha256 => sha2::Sha256::digest(input).to_vec(),
            Algorithm::Sha384 => sha2::Sha384::digest(input).to_vec(),
            Algorithm::Sha512 => sha2::Sha512::digest(input).to_vec(),
        }
    }

    pub fn encrypter(self) -> Encrypter {
        Encrypter::new(self)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::from_name(s).ok_or_else(|| UnknownAlgorithm(s.to_string()))
    }
}

/// Hex-encoding digest encrypter bound to one algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encrypter {
    algorithm: Algorithm,
}

impl Encrypter {
    pub fn new(algorithm: Algorithm) -> Self {
        tracing::debug!(algorithm = algorithm.name(), "Established encrypter algorithm");
        Self { algorithm }
    }

    /// Resolve `name`, falling back to the default algorithm when unknown
    pub fn from_name(name: &str) -> Self {
        Self::from_name_or(name, Algorithm::default())
    }

    /// Resolve `name`, falling back to `fallback` when unknown
    pub fn from_name_or(name: &str, fallback: Algorithm) -> Self {
        match Algorithm::from_name(name) {
            Some(algorithm) => Self::new(algorithm),
            None => {
                tracing::warn!(
                    requested = name,
                    fallback = fallback.name(),
                    "Digest algorithm not available, using fallback"
                );
                Self::new(fallback)
            }
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Lower-case hex digest of `value`
    pub fn encrypt(&self, value: &str) -> String {
        hex::encode(self.algorithm.digest(value.as_bytes()))
    }
}

/// True when `value` already looks like an MD5 hex digest
pub fn is_digest(value: &str) -> bool {
    static DIGEST_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    DIGEST_REGEX
        .get_or_init(|| Regex::new(r"^[a-f0-9]{32}$").ok())
        .as_ref()
        .is_some_and(|regex| regex.is_match(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_known_vector() {
        let encrypted = Encrypter::new(Algorithm::Md5).encrypt("secret");
        assert_eq!(encrypted, "5ebe2294ecd0e0f08eab7690d2a6ee69");
        assert!(is_digest(&encrypted));
    }

    #[test]
    fn test_sha256_known_vector() {
        let encrypted = Algorithm::Sha256.encrypter().encrypt("abc");
        assert_eq!(
            encrypted,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_lengths() {
        assert_eq!(Algorithm::Md2.encrypter().encrypt("x").len(), 32);
        assert_eq!(Algorithm::Sha1.encrypter().encrypt("x").len(), 40);
        assert_eq!(Algorithm::Sha384.encrypter().encrypt("x").len(), 96);
        assert_eq!(Algorithm::Sha512.encrypter().encrypt("x").len(), 128);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Algorithm::from_name("sha-256"), Some(Algorithm::Sha256));
        assert_eq!(Algorithm::from_name("SHA256"), Some(Algorithm::Sha256));
        assert_eq!(Algorithm::from_name("md5"), Some(Algorithm::Md5));
        assert_eq!(Algorithm::from_name("whirlpool"), None);
        assert!("bogus".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_unknown_name_falls_back() {
        assert_eq!(Encrypter::from_name("whirlpool").algorithm(), Algorithm::Md5);
        assert_eq!(
            Encrypter::from_name_or("whirlpool", Algorithm::Sha1).algorithm(),
            Algorithm::Sha1
        );
    }

    #[test]
    fn test_is_digest_rejects_other_shapes() {
        assert!(!is_digest("plain-password"));
        assert!(!is_digest("5EBE2294ECD0E0F08EAB7690D2A6EE69"));
        assert!(!is_digest("5ebe2294ecd0e0f08eab7690d2a6ee6"));
    }

    #[test]
    fn test_serde_uses_canonical_names() {
        assert_eq!(serde_json::to_string(&Algorithm::Sha256).unwrap(), "\"SHA-256\"");
        let parsed: Algorithm = serde_json::from_str("\"MD5\"").unwrap();
        assert_eq!(parsed, Algorithm::Md5);
    }
}
