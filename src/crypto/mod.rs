//! Key material, enrollment signing, and certificate checks

pub mod der;
mod keys;

#[cfg(test)]
mod tests;

pub use der::{certificate_public_key, parse_rsa_public_key, RsaKeyParts};
pub use keys::KeyCertService;
