//! RSA key pair and certificate service
//!
//! Generates the proof-of-possession key pair, signs enrollment payloads in
//! JWS layout, and checks certificates returned by the enrollment service
//! against the locally held key.

use std::sync::Arc;

use base64::Engine as _;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::SecurityConfig;
use crate::crypto::der;
use crate::store::SecureStore;
use crate::utils::error::{Result, SecurityError};
use crate::utils::BASE64_URL;

const JSON_ALG_KEY: &str = "alg";
const JSON_MOD_KEY: &str = "mod";
const JSON_EXP_KEY: &str = "exp";
const JSON_JPK_KEY: &str = "jpk";
const JSON_RSA_VALUE: &str = "RSA";
const JSON_RS256_VALUE: &str = "RS256";

const SCRATCH_KEY_TAG: &str = "authgate.certificate.publickey.scratch";

/// Key pair and certificate operations backed by a [`SecureStore`].
///
/// Key material is stored as DER: PKCS#1 for the public key, PKCS#1 for the
/// private key. Cryptographic calls block the caller; run them off any
/// latency-sensitive thread.
pub struct KeyCertService {
    store: Arc<dyn SecureStore>,
    config: SecurityConfig,
}

impl KeyCertService {
    /// Create a service over the given store and configuration
    pub fn new(store: Arc<dyn SecureStore>, config: SecurityConfig) -> Self {
        Self { store, config }
    }

    /// Generate a fresh RSA key pair under the configured tags.
    ///
    /// Existing material under either tag is deleted first, so regeneration
    /// never leaves stale keys behind.
    pub fn generate_key_pair(&self) -> Result<()> {
        self.store.delete_key(&self.config.public_key_tag);
        self.store.delete_key(&self.config.private_key_tag);

        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, self.config.key_size_bits)
            .map_err(|e| SecurityError::crypto(format!("key generation failed: {e}")))?;
        let public = RsaPublicKey::from(&private);

        let private_der = private
            .to_pkcs1_der()
            .map_err(|e| SecurityError::crypto(format!("private key encoding failed: {e}")))?;
        let public_der = public
            .to_pkcs1_der()
            .map_err(|e| SecurityError::crypto(format!("public key encoding failed: {e}")))?;

        self.store
            .set_key_bytes(&self.config.private_key_tag, private_der.as_bytes())?;
        self.store
            .set_key_bytes(&self.config.public_key_tag, public_der.as_bytes())?;

        debug!(key_size = self.config.key_size_bits, "generated RSA key pair");
        Ok(())
    }

    /// Build and sign a JWS-layout enrollment payload:
    /// `base64url(header).base64url(payload).base64url(signature)`.
    ///
    /// The header carries `RS256` plus the public key's modulus and exponent
    /// so the service can check proof of possession. Nothing is returned on
    /// failure, there is no partial output.
    pub fn sign_enrollment_payload(&self, payload: &Map<String, Value>) -> Result<String> {
        let public_der = self.store.get_key_bytes(&self.config.public_key_tag)?;
        let private_der = self.store.get_key_bytes(&self.config.private_key_tag)?;

        let header = jws_header(&public_der)?;
        let header_json = serde_json::to_string(&header)?;
        let payload_json = serde_json::to_string(&Value::Object(payload.clone()))?;

        let signing_input = format!(
            "{}.{}",
            BASE64_URL.encode(header_json.as_bytes()),
            BASE64_URL.encode(payload_json.as_bytes())
        );

        let private = RsaPrivateKey::from_pkcs1_der(&private_der)
            .map_err(|e| SecurityError::crypto(format!("private key decoding failed: {e}")))?;
        let digest = Sha256::digest(signing_input.as_bytes());
        let signature = private
            .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .map_err(|e| SecurityError::crypto(format!("signing failed: {e}")))?;

        Ok(format!("{signing_input}.{}", BASE64_URL.encode(signature)))
    }

    /// Check whether a certificate embeds the locally stored public key.
    ///
    /// The extracted key is parked under a scratch tag for the comparison
    /// and removed again on every exit path. `Ok(false)` means the
    /// certificate parsed fine but carries a different key; extraction and
    /// storage failures surface as errors.
    pub fn verify_certificate_matches_key(&self, cert_der: &[u8]) -> Result<bool> {
        let local = self.store.get_key_bytes(&self.config.public_key_tag)?;
        let embedded = der::certificate_public_key(cert_der)?;

        let scratch = ScratchKey::persist(self.store.as_ref(), SCRATCH_KEY_TAG, &embedded)?;
        let stored = self.store.get_key_bytes(SCRATCH_KEY_TAG)?;
        drop(scratch);

        Ok(stored == local)
    }

    /// Persist a certificate returned by the enrollment service
    pub fn save_certificate(&self, cert_der: &[u8]) -> Result<()> {
        self.store
            .save_certificate(&self.config.certificate_label, cert_der)
    }

    /// Read the stored enrollment certificate
    pub fn stored_certificate(&self) -> Result<Vec<u8>> {
        self.store.get_certificate(&self.config.certificate_label)
    }

    /// Delete the stored enrollment certificate; returns whether one existed
    pub fn delete_certificate(&self) -> bool {
        self.store.delete_certificate(&self.config.certificate_label)
    }
}

/// Builds the JWS header embedding the public key description
fn jws_header(public_der: &[u8]) -> Result<Value> {
    let parts = der::parse_rsa_public_key(public_der)?;

    let mut jpk = Map::new();
    jpk.insert(
        JSON_ALG_KEY.to_string(),
        Value::String(JSON_RSA_VALUE.to_string()),
    );
    jpk.insert(
        JSON_MOD_KEY.to_string(),
        Value::String(BASE64_URL.encode(&parts.modulus)),
    );
    jpk.insert(
        JSON_EXP_KEY.to_string(),
        Value::String(BASE64_URL.encode(&parts.exponent)),
    );

    let mut header = Map::new();
    header.insert(
        JSON_ALG_KEY.to_string(),
        Value::String(JSON_RS256_VALUE.to_string()),
    );
    header.insert(JSON_JPK_KEY.to_string(), Value::Object(jpk));

    Ok(Value::Object(header))
}

/// Deletes the scratch-tagged key when dropped, covering early returns
struct ScratchKey<'a> {
    store: &'a dyn SecureStore,
    tag: &'a str,
}

impl<'a> ScratchKey<'a> {
    fn persist(store: &'a dyn SecureStore, tag: &'a str, bytes: &[u8]) -> Result<Self> {
        store.set_key_bytes(tag, bytes)?;
        Ok(Self { store, tag })
    }
}

impl Drop for ScratchKey<'_> {
    fn drop(&mut self) {
        self.store.delete_key(self.tag);
    }
}
