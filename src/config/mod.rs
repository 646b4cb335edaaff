//! Security configuration

use serde::{Deserialize, Serialize};

/// Where token values are kept between launches.
///
/// `Always` mirrors tokens into the secure store; `Never` keeps them in
/// memory only, so they vanish with the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersistencePolicy {
    /// Persist tokens in the secure store
    Always,
    /// Keep tokens in memory only
    Never,
}

/// Configuration for the authorization core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// RSA key size in bits for the proof-of-possession key pair
    #[serde(default = "default_key_size")]
    pub key_size_bits: usize,
    /// Secure store tag for the public key
    #[serde(default = "default_public_key_tag")]
    pub public_key_tag: String,
    /// Secure store tag for the private key
    #[serde(default = "default_private_key_tag")]
    pub private_key_tag: String,
    /// Secure store label for the enrollment certificate
    #[serde(default = "default_certificate_label")]
    pub certificate_label: String,
    /// Tenant of the backing authorization service, if any
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Default persistence policy for token storage
    #[serde(default = "default_persistence_policy")]
    pub persistence_policy: PersistencePolicy,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            key_size_bits: default_key_size(),
            public_key_tag: default_public_key_tag(),
            private_key_tag: default_private_key_tag(),
            certificate_label: default_certificate_label(),
            tenant_id: None,
            persistence_policy: default_persistence_policy(),
        }
    }
}

impl SecurityConfig {
    /// Merge another configuration over this one, keeping non-default fields
    pub fn merge(mut self, other: Self) -> Self {
        if other.key_size_bits != default_key_size() {
            self.key_size_bits = other.key_size_bits;
        }
        if other.public_key_tag != default_public_key_tag() {
            self.public_key_tag = other.public_key_tag;
        }
        if other.private_key_tag != default_private_key_tag() {
            self.private_key_tag = other.private_key_tag;
        }
        if other.certificate_label != default_certificate_label() {
            self.certificate_label = other.certificate_label;
        }
        if other.tenant_id.is_some() {
            self.tenant_id = other.tenant_id;
        }
        if other.persistence_policy != default_persistence_policy() {
            self.persistence_policy = other.persistence_policy;
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !matches!(self.key_size_bits, 512 | 1024 | 2048 | 4096) {
            return Err(format!(
                "unsupported RSA key size: {} (expected 512, 1024, 2048 or 4096)",
                self.key_size_bits
            ));
        }

        if self.public_key_tag.is_empty()
            || self.private_key_tag.is_empty()
            || self.certificate_label.is_empty()
        {
            return Err("key tags and certificate label must not be empty".to_string());
        }

        if self.public_key_tag == self.private_key_tag {
            return Err("public and private key tags must differ".to_string());
        }

        Ok(())
    }
}

fn default_key_size() -> usize {
    2048
}

fn default_public_key_tag() -> String {
    "authgate.publickey".to_string()
}

fn default_private_key_tag() -> String {
    "authgate.privatekey".to_string()
}

fn default_certificate_label() -> String {
    "authgate.certificate".to_string()
}

fn default_persistence_policy() -> PersistencePolicy {
    PersistencePolicy::Always
}
