//! Secure credential store abstraction
//!
//! Keychain-equivalent storage for token strings, RSA key material, and
//! certificates. Every operation is synchronous and individually atomic;
//! failures surface as [`SecurityError::Storage`].

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::utils::error::{Result, SecurityError};

/// Keychain-equivalent secure store.
///
/// String items, key material, and certificates live in separate namespaces,
/// matching platform keychains where generic passwords, keys, and
/// certificates are distinct item classes.
pub trait SecureStore: Send + Sync {
    /// Read a string item, `None` if absent
    fn get_string(&self, label: &str) -> Result<Option<String>>;

    /// Write a string item, replacing any existing value
    fn set_string(&self, label: &str, value: &str) -> Result<()>;

    /// Delete a string item; returns whether something was removed
    fn remove_string(&self, label: &str) -> bool;

    /// Read key material by tag; absent material is a storage error
    fn get_key_bytes(&self, tag: &str) -> Result<Vec<u8>>;

    /// Write key material under a tag, replacing any existing material
    fn set_key_bytes(&self, tag: &str, bytes: &[u8]) -> Result<()>;

    /// Delete key material; returns whether something was removed
    fn delete_key(&self, tag: &str) -> bool;

    /// Write a DER certificate under a label, replacing any existing one
    fn save_certificate(&self, label: &str, der: &[u8]) -> Result<()>;

    /// Read a DER certificate by label; absence is a storage error
    fn get_certificate(&self, label: &str) -> Result<Vec<u8>>;

    /// Delete a certificate; returns whether something was removed
    fn delete_certificate(&self, label: &str) -> bool;
}

#[derive(Default)]
struct StoreState {
    strings: HashMap<String, String>,
    keys: HashMap<String, Vec<u8>>,
    certificates: HashMap<String, Vec<u8>>,
}

/// In-memory [`SecureStore`] used in tests and as the default store when no
/// platform keychain is wired in.
#[derive(Default)]
pub struct InMemorySecureStore {
    state: Mutex<StoreState>,
}

impl InMemorySecureStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecureStore for InMemorySecureStore {
    fn get_string(&self, label: &str) -> Result<Option<String>> {
        Ok(self.state.lock().strings.get(label).cloned())
    }

    fn set_string(&self, label: &str, value: &str) -> Result<()> {
        self.state
            .lock()
            .strings
            .insert(label.to_string(), value.to_string());
        Ok(())
    }

    fn remove_string(&self, label: &str) -> bool {
        self.state.lock().strings.remove(label).is_some()
    }

    fn get_key_bytes(&self, tag: &str) -> Result<Vec<u8>> {
        self.state
            .lock()
            .keys
            .get(tag)
            .cloned()
            .ok_or_else(|| SecurityError::storage(format!("no key material under tag {tag}")))
    }

    fn set_key_bytes(&self, tag: &str, bytes: &[u8]) -> Result<()> {
        self.state.lock().keys.insert(tag.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete_key(&self, tag: &str) -> bool {
        self.state.lock().keys.remove(tag).is_some()
    }

    fn save_certificate(&self, label: &str, der: &[u8]) -> Result<()> {
        self.state
            .lock()
            .certificates
            .insert(label.to_string(), der.to_vec());
        Ok(())
    }

    fn get_certificate(&self, label: &str) -> Result<Vec<u8>> {
        self.state
            .lock()
            .certificates
            .get(label)
            .cloned()
            .ok_or_else(|| SecurityError::storage(format!("no certificate under label {label}")))
    }

    fn delete_certificate(&self, label: &str) -> bool {
        self.state.lock().certificates.remove(label).is_some()
    }
}
