//! Crypto module tests

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use base64::Engine as _;
    use rsa::pkcs1::DecodeRsaPublicKey;
    use rsa::{Pkcs1v15Sign, RsaPublicKey};
    use serde_json::{json, Map, Value};
    use sha2::{Digest, Sha256};

    use crate::config::SecurityConfig;
    use crate::crypto::der::test_fixtures;
    use crate::crypto::KeyCertService;
    use crate::store::{InMemorySecureStore, SecureStore};
    use crate::utils::error::SecurityError;
    use crate::utils::BASE64_URL;

    fn test_config() -> SecurityConfig {
        SecurityConfig {
            key_size_bits: 512, // small keys keep the tests fast
            ..SecurityConfig::default()
        }
    }

    fn service() -> (Arc<InMemorySecureStore>, KeyCertService) {
        let store = Arc::new(InMemorySecureStore::new());
        let service = KeyCertService::new(store.clone(), test_config());
        (store, service)
    }

    fn payload() -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("deviceId".to_string(), json!("dev-1"));
        map.insert("csr".to_string(), json!(true));
        map
    }

    #[test]
    fn test_signed_payload_verifies_against_stored_key() {
        let (store, service) = service();
        service.generate_key_pair().unwrap();

        let jws = service.sign_enrollment_payload(&payload()).unwrap();
        let segments: Vec<&str> = jws.split('.').collect();
        assert_eq!(segments.len(), 3);

        let public_der = store.get_key_bytes(&test_config().public_key_tag).unwrap();
        let public = RsaPublicKey::from_pkcs1_der(&public_der).unwrap();

        let signing_input = format!("{}.{}", segments[0], segments[1]);
        let digest = Sha256::digest(signing_input.as_bytes());
        let signature = BASE64_URL.decode(segments[2]).unwrap();

        public
            .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, &signature)
            .unwrap();
    }

    #[test]
    fn test_jws_header_carries_key_description() {
        let (store, service) = service();
        service.generate_key_pair().unwrap();

        let jws = service.sign_enrollment_payload(&payload()).unwrap();
        let header_b64 = jws.split('.').next().unwrap();
        let header: Value =
            serde_json::from_slice(&BASE64_URL.decode(header_b64).unwrap()).unwrap();

        assert_eq!(header["alg"], "RS256");
        assert_eq!(header["jpk"]["alg"], "RSA");

        let public_der = store.get_key_bytes(&test_config().public_key_tag).unwrap();
        let parts = crate::crypto::parse_rsa_public_key(&public_der).unwrap();
        assert_eq!(header["jpk"]["mod"], BASE64_URL.encode(&parts.modulus));
        assert_eq!(header["jpk"]["exp"], BASE64_URL.encode(&parts.exponent));
    }

    #[test]
    fn test_payload_segment_round_trips() {
        let (_store, service) = service();
        service.generate_key_pair().unwrap();

        let jws = service.sign_enrollment_payload(&payload()).unwrap();
        let payload_b64 = jws.split('.').nth(1).unwrap();
        let decoded: Value =
            serde_json::from_slice(&BASE64_URL.decode(payload_b64).unwrap()).unwrap();

        assert_eq!(decoded["deviceId"], "dev-1");
        assert_eq!(decoded["csr"], true);
    }

    #[test]
    fn test_regeneration_replaces_key_material() {
        let (store, service) = service();
        let tag = test_config().public_key_tag;

        service.generate_key_pair().unwrap();
        let first = store.get_key_bytes(&tag).unwrap();

        service.generate_key_pair().unwrap();
        let second = store.get_key_bytes(&tag).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_signing_without_keys_is_a_storage_error() {
        let (_store, service) = service();
        let err = service.sign_enrollment_payload(&payload()).unwrap_err();
        assert!(matches!(err, SecurityError::Storage(_)));
    }

    #[test]
    fn test_certificate_matching_own_key() {
        let (store, service) = service();
        service.generate_key_pair().unwrap();

        let public_der = store.get_key_bytes(&test_config().public_key_tag).unwrap();
        let cert = test_fixtures::certificate(&public_der);

        assert!(service.verify_certificate_matches_key(&cert).unwrap());
    }

    #[test]
    fn test_certificate_with_foreign_key_does_not_match() {
        let (_store, service) = service();
        service.generate_key_pair().unwrap();

        let foreign = test_fixtures::rsa_public_key(&[0x00, 0xaa, 0xbb], &[0x01, 0x00, 0x01]);
        let cert = test_fixtures::certificate(&foreign);

        assert_eq!(service.verify_certificate_matches_key(&cert).unwrap(), false);
    }

    #[test]
    fn test_garbage_certificate_is_an_error() {
        let (_store, service) = service();
        service.generate_key_pair().unwrap();

        assert!(service
            .verify_certificate_matches_key(&[0x01, 0x02, 0x03])
            .is_err());
    }

    #[test]
    fn test_verification_cleans_up_scratch_key() {
        let (store, service) = service();
        service.generate_key_pair().unwrap();

        let public_der = store.get_key_bytes(&test_config().public_key_tag).unwrap();
        let cert = test_fixtures::certificate(&public_der);
        service.verify_certificate_matches_key(&cert).unwrap();

        // the extracted key must not linger under its comparison tag
        assert!(store
            .get_key_bytes("authgate.certificate.publickey.scratch")
            .is_err());
    }

    #[test]
    fn test_certificate_storage_round_trip() {
        let (_store, service) = service();

        assert!(service.stored_certificate().is_err());
        service.save_certificate(&[0x30, 0x03, 0x02, 0x01, 0x00]).unwrap();
        assert_eq!(
            service.stored_certificate().unwrap(),
            vec![0x30, 0x03, 0x02, 0x01, 0x00]
        );

        assert!(service.delete_certificate());
        assert!(!service.delete_certificate());
        assert!(service.stored_certificate().is_err());
    }
}
