//! Authorization manager tests

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::json;

    use crate::challenge::{AuthorizationRequest, ChallengeData};
    use crate::config::{PersistencePolicy, SecurityConfig};
    use crate::manager::{
        AppIdentity, AuthorizationManager, AuthorizationProcess, AuthorizationResponse,
        DeviceIdentity, UserIdentity,
    };
    use crate::store::{InMemorySecureStore, SecureStore};
    use crate::utils::error::SecurityError;

    fn manager_over(store: Arc<InMemorySecureStore>, config: SecurityConfig) -> AuthorizationManager {
        AuthorizationManager::new(
            store,
            config,
            DeviceIdentity::new("testos", "1.0", "unit"),
            AppIdentity {
                id: "com.example.app".to_string(),
                version: "1.2.3".to_string(),
            },
        )
        .unwrap()
    }

    fn manager() -> (Arc<InMemorySecureStore>, AuthorizationManager) {
        let store = Arc::new(InMemorySecureStore::new());
        let manager = manager_over(store.clone(), SecurityConfig::default());
        (store, manager)
    }

    fn response() -> AuthorizationResponse {
        AuthorizationResponse {
            access_token: "acc.ess.token".to_string(),
            identity_token: "id.en.tity".to_string(),
        }
    }

    #[derive(Default)]
    struct CountingProcess {
        starts: AtomicUsize,
    }

    impl AuthorizationProcess for CountingProcess {
        fn start(&self) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct RecordingRequest {
        failures: AtomicUsize,
    }

    impl AuthorizationRequest for RecordingRequest {
        fn submit_answer(&self, _realm: &str, _answer: &ChallengeData) {}
        fn remove_expected_answer(&self, _realm: &str) {}
        fn request_failed(&self, _info: Option<&ChallengeData>) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_authorization_required_detection() {
        assert!(AuthorizationManager::is_authorization_required(
            401,
            "Bearer realm=\"app\""
        ));
        assert!(AuthorizationManager::is_authorization_required(403, "bearer"));
        assert!(AuthorizationManager::is_authorization_required(401, "BEARER challenge"));

        // wrong status, wrong scheme, empty header
        assert!(!AuthorizationManager::is_authorization_required(200, "Bearer"));
        assert!(!AuthorizationManager::is_authorization_required(401, "Basic realm=\"app\""));
        assert!(!AuthorizationManager::is_authorization_required(403, ""));
    }

    #[test]
    fn test_cached_header_requires_both_tokens() {
        let (_store, manager) = manager();
        assert_eq!(manager.cached_authorization_header(), None);

        manager
            .preferences()
            .set_access_token(Some("acc".to_string()))
            .unwrap();
        assert_eq!(manager.cached_authorization_header(), None);

        manager
            .preferences()
            .set_identity_token(Some("idt".to_string()))
            .unwrap();
        assert_eq!(
            manager.cached_authorization_header().as_deref(),
            Some("Bearer acc idt")
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let store: Arc<InMemorySecureStore> = Arc::new(InMemorySecureStore::new());
        let config = SecurityConfig {
            key_size_bits: 123,
            ..SecurityConfig::default()
        };
        let result = AuthorizationManager::new(
            store,
            config,
            DeviceIdentity::new("testos", "1.0", "unit"),
            AppIdentity {
                id: "app".to_string(),
                version: "1".to_string(),
            },
        );
        assert!(matches!(result, Err(SecurityError::Config(_))));
    }

    #[test]
    fn test_empty_realm_registration_is_ignored() {
        let (_store, manager) = manager();
        let delegate = Arc::new(NullDelegate);

        manager.register_authentication_delegate("", delegate);
        assert!(manager.challenge_handler_for_realm("").is_none());
    }

    #[test]
    fn test_challenge_for_unregistered_realm_fails_request() {
        let (_store, manager) = manager();
        let request = Arc::new(RecordingRequest::default());

        let mut challenge = ChallengeData::new();
        challenge.insert("question".to_string(), json!("otp"));
        manager.handle_challenge("nowhere", request.clone(), &challenge);

        assert_eq!(request.failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_register_and_unregister_realm() {
        let (_store, manager) = manager();
        manager.register_authentication_delegate("api", Arc::new(NullDelegate));
        assert!(manager.challenge_handler_for_realm("api").is_some());

        manager.unregister_authentication_delegate("api");
        assert!(manager.challenge_handler_for_realm("api").is_none());
    }

    struct NullDelegate;

    impl crate::challenge::AuthenticationDelegate for NullDelegate {
        fn on_challenge_received(
            &self,
            _context: &crate::challenge::ChallengeContext,
            _challenge: &ChallengeData,
        ) {
        }
        fn on_success(&self, _info: &ChallengeData) {}
        fn on_failure(&self, _info: &ChallengeData) {}
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_obtain_shares_one_process_run() {
        let (_store, manager) = manager();
        let manager = Arc::new(manager);
        let process = Arc::new(CountingProcess::default());
        manager.set_authorization_process(process.clone());

        let first = tokio::spawn({
            let manager = manager.clone();
            async move { manager.obtain_authorization().await }
        });
        let second = tokio::spawn({
            let manager = manager.clone();
            async move { manager.obtain_authorization().await }
        });

        // wait for both demands to be queued before resolving
        while manager.pending.lock().len() < 2 {
            tokio::task::yield_now().await;
        }
        manager.complete_authorization(Ok(response()));

        assert_eq!(first.await.unwrap().unwrap(), response());
        assert_eq!(second.await.unwrap().unwrap(), response());
        assert_eq!(process.starts.load(Ordering::SeqCst), 1);

        // tokens were stored and the header is now servable from cache
        assert_eq!(
            manager.cached_authorization_header().as_deref(),
            Some("Bearer acc.ess.token id.en.tity")
        );
        assert_eq!(manager.authorization_failure_count(), 0);
    }

    #[tokio::test]
    async fn test_obtain_without_process_fails() {
        let (_store, manager) = manager();
        let err = manager.obtain_authorization().await.unwrap_err();
        assert!(matches!(err, SecurityError::AuthorizationFailure(_)));
        assert_eq!(manager.authorization_failure_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_counter_tracks_outcomes() {
        let (_store, manager) = manager();
        let manager = Arc::new(manager);
        manager.set_authorization_process(Arc::new(CountingProcess::default()));

        let waiter = tokio::spawn({
            let manager = manager.clone();
            async move { manager.obtain_authorization().await }
        });
        while manager.pending.lock().is_empty() {
            tokio::task::yield_now().await;
        }
        manager.complete_authorization(Err("denied".to_string()));
        assert!(waiter.await.unwrap().is_err());
        assert_eq!(manager.authorization_failure_count(), 1);

        let waiter = tokio::spawn({
            let manager = manager.clone();
            async move { manager.obtain_authorization().await }
        });
        while manager.pending.lock().is_empty() {
            tokio::task::yield_now().await;
        }
        manager.complete_authorization(Ok(response()));
        assert!(waiter.await.unwrap().is_ok());
        assert_eq!(manager.authorization_failure_count(), 0);
    }

    #[test]
    fn test_policy_migration_scrubs_and_restores_store() {
        let (store, manager) = manager();
        manager
            .preferences()
            .set_access_token(Some("acc".to_string()))
            .unwrap();
        manager
            .preferences()
            .set_identity_token(Some("idt".to_string()))
            .unwrap();
        assert!(store.get_string("authgate.accessToken").unwrap().is_some());

        manager.set_persistence_policy(PersistencePolicy::Never).unwrap();
        assert!(store.get_string("authgate.accessToken").unwrap().is_none());
        assert!(store.get_string("authgate.idToken").unwrap().is_none());
        // runtime copies survive the migration
        assert!(manager.cached_authorization_header().is_some());

        manager.set_persistence_policy(PersistencePolicy::Always).unwrap();
        assert_eq!(
            store.get_string("authgate.accessToken").unwrap().as_deref(),
            Some("acc")
        );
        assert_eq!(
            store.get_string("authgate.idToken").unwrap().as_deref(),
            Some("idt")
        );
    }

    #[test]
    fn test_never_policy_keeps_tokens_out_of_the_store() {
        let store = Arc::new(InMemorySecureStore::new());
        let config = SecurityConfig {
            persistence_policy: PersistencePolicy::Never,
            ..SecurityConfig::default()
        };
        let manager = manager_over(store.clone(), config);

        manager
            .preferences()
            .set_access_token(Some("acc".to_string()))
            .unwrap();
        assert!(store.get_string("authgate.accessToken").unwrap().is_none());
        assert_eq!(manager.preferences().access_token().as_deref(), Some("acc"));
    }

    #[test]
    fn test_persisted_tokens_survive_reconstruction() {
        let store = Arc::new(InMemorySecureStore::new());
        {
            let manager = manager_over(store.clone(), SecurityConfig::default());
            manager.complete_authorization(Ok(response()));
        }

        let manager = manager_over(store, SecurityConfig::default());
        assert_eq!(
            manager.cached_authorization_header().as_deref(),
            Some("Bearer acc.ess.token id.en.tity")
        );
    }

    #[test]
    fn test_clear_forgets_tokens_and_user_and_rotates_session() {
        let (store, manager) = manager();
        manager.complete_authorization(Ok(response()));
        manager
            .set_user_identity(Some(&UserIdentity {
                id: "u1".to_string(),
                auth_by: "facebook".to_string(),
                display_name: "Dana".to_string(),
            }))
            .unwrap();
        manager.complete_authorization(Err("denied".to_string()));
        assert_eq!(manager.authorization_failure_count(), 1);
        let session_before = manager.session_id();

        manager.clear_authorization_data().unwrap();

        assert_eq!(manager.authorization_failure_count(), 0);
        assert_eq!(manager.cached_authorization_header(), None);
        assert!(manager.user_identity().unwrap().is_none());
        assert!(store.get_string("authgate.accessToken").unwrap().is_none());
        assert_ne!(manager.session_id(), session_before);

        // clearing again is harmless
        manager.clear_authorization_data().unwrap();
        assert_eq!(manager.cached_authorization_header(), None);
    }

    #[test]
    fn test_logout_clears_authorization_data() {
        let (_store, manager) = manager();
        manager.complete_authorization(Ok(response()));
        manager.logout().unwrap();
        assert_eq!(manager.cached_authorization_header(), None);
    }

    #[test]
    fn test_device_identity_is_stable_across_constructions() {
        let store = Arc::new(InMemorySecureStore::new());
        let first = manager_over(store.clone(), SecurityConfig::default())
            .device_identity()
            .unwrap()
            .unwrap();
        let second = manager_over(store, SecurityConfig::default())
            .device_identity()
            .unwrap()
            .unwrap();

        assert_eq!(first.id, second.id);
    }
}
