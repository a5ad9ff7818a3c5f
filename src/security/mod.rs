//! Digests, random value generation and tokens

pub mod algorithm;
pub mod random;
pub mod token;

pub use algorithm::{Algorithm, Encrypter, UnknownAlgorithm, is_digest};
pub use random::RandomSpec;
pub use token::{Token, TokenGenerator, UuidTokenGenerator};
