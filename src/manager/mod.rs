//! Authorization manager façade
//!
//! Front door for the subsystem: owns the token preferences, the per-realm
//! challenge handlers, and the key and certificate service, and funnels
//! concurrent authorization demand into a single in-flight process.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::challenge::{
    AuthenticationDelegate, AuthorizationRequest, ChallengeData, ChallengeHandler,
};
use crate::config::{PersistencePolicy, SecurityConfig};
use crate::crypto::KeyCertService;
use crate::store::SecureStore;
use crate::utils::error::{Result, SecurityError};

mod identity;
mod preferences;

#[cfg(test)]
mod tests;

pub use identity::{AppIdentity, DeviceIdentity, UserIdentity};
pub use preferences::AuthorizationPreferences;

/// Tokens produced by a completed authorization process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResponse {
    /// Raw access token
    pub access_token: String,
    /// Raw identity token
    pub identity_token: String,
}

/// The transport-specific flow that acquires tokens.
///
/// The manager starts it at most once per burst of demand; the
/// implementation reports back through
/// [`AuthorizationManager::complete_authorization`].
pub trait AuthorizationProcess: Send + Sync {
    /// Kick off the token acquisition flow
    fn start(&self);
}

/// Coordinates tokens, challenge handlers, and authorization flows.
///
/// Cheap to share behind an [`Arc`]; every method takes `&self`.
pub struct AuthorizationManager {
    preferences: AuthorizationPreferences,
    key_service: KeyCertService,
    handlers: DashMap<String, Arc<ChallengeHandler>>,
    process: Mutex<Option<Arc<dyn AuthorizationProcess>>>,
    pending: Mutex<Vec<oneshot::Sender<Result<AuthorizationResponse>>>>,
    failure_count: AtomicU32,
    session_id: Mutex<String>,
}

impl AuthorizationManager {
    /// Build a manager over `store` with the given configuration and client
    /// identities. Identities already in the store win over the supplied
    /// ones so the device identifier stays stable across launches.
    pub fn new(
        store: Arc<dyn SecureStore>,
        config: SecurityConfig,
        device_identity: DeviceIdentity,
        app_identity: AppIdentity,
    ) -> Result<Self> {
        config.validate().map_err(SecurityError::Config)?;

        let preferences =
            AuthorizationPreferences::new(store.clone(), config.persistence_policy)?;
        if preferences.device_identity()?.is_none() {
            preferences.set_device_identity(&device_identity)?;
        }
        if preferences.app_identity()?.is_none() {
            preferences.set_app_identity(&app_identity)?;
        }

        let key_service = KeyCertService::new(store, config);

        Ok(Self {
            preferences,
            key_service,
            handlers: DashMap::new(),
            process: Mutex::new(None),
            pending: Mutex::new(Vec::new()),
            failure_count: AtomicU32::new(0),
            session_id: Mutex::new(Uuid::new_v4().to_string()),
        })
    }

    /// Decide whether a response demands (re)authorization: a 401 or 403
    /// whose authenticate header mentions the bearer scheme.
    pub fn is_authorization_required(status: u16, www_authenticate: &str) -> bool {
        matches!(status, 401 | 403) && www_authenticate.to_lowercase().contains("bearer")
    }

    /// The cached `Bearer <access> <identity>` header, if both tokens are
    /// present.
    pub fn cached_authorization_header(&self) -> Option<String> {
        self.preferences.cached_authorization_header()
    }

    /// Install the process used to acquire tokens
    pub fn set_authorization_process(&self, process: Arc<dyn AuthorizationProcess>) {
        *self.process.lock() = Some(process);
    }

    /// Wait for authorization, starting the acquisition process if this is
    /// the first outstanding demand. Concurrent callers share one process
    /// run and all observe its outcome.
    pub async fn obtain_authorization(&self) -> Result<AuthorizationResponse> {
        let (sender, receiver) = oneshot::channel();

        let is_first = {
            let mut pending = self.pending.lock();
            pending.push(sender);
            pending.len() == 1
        };

        if is_first {
            let process = self.process.lock().clone();
            match process {
                Some(process) => {
                    debug!("starting authorization process");
                    process.start();
                }
                None => self.complete_authorization(Err(
                    "no authorization process configured".to_string(),
                )),
            }
        }

        receiver
            .await
            .map_err(|_| SecurityError::AuthorizationFailure("authorization abandoned".to_string()))?
    }

    /// Resolve every caller waiting in [`obtain_authorization`].
    ///
    /// On success the tokens are stored per the persistence policy and the
    /// failure counter resets; on failure the counter increments and each
    /// waiter receives the error.
    pub fn complete_authorization(&self, result: std::result::Result<AuthorizationResponse, String>) {
        let outcome = match result {
            Ok(response) => {
                let stored = self
                    .preferences
                    .set_access_token(Some(response.access_token.clone()))
                    .and_then(|()| {
                        self.preferences
                            .set_identity_token(Some(response.identity_token.clone()))
                    });
                match stored {
                    Ok(()) => {
                        self.failure_count.store(0, Ordering::SeqCst);
                        Ok(response)
                    }
                    Err(err) => {
                        error!(error = %err, "failed to store acquired tokens");
                        Err(err.to_string())
                    }
                }
            }
            Err(message) => {
                self.failure_count.fetch_add(1, Ordering::SeqCst);
                warn!(error = %message, "authorization process failed");
                Err(message)
            }
        };

        let waiters = std::mem::take(&mut *self.pending.lock());
        debug!(count = waiters.len(), "resolving authorization waiters");
        for waiter in waiters {
            let per_waiter = match &outcome {
                Ok(response) => Ok(response.clone()),
                Err(message) => Err(SecurityError::AuthorizationFailure(message.clone())),
            };
            // a dropped receiver stopped waiting, nothing to do
            let _ = waiter.send(per_waiter);
        }
    }

    /// Register a delegate for a realm, replacing any previous registration.
    /// An empty realm name is rejected.
    pub fn register_authentication_delegate(
        &self,
        realm: &str,
        delegate: Arc<dyn AuthenticationDelegate>,
    ) {
        if realm.is_empty() {
            error!("cannot register authentication delegate for an empty realm");
            return;
        }
        let handler = Arc::new(ChallengeHandler::new(realm, delegate));
        self.handlers.insert(realm.to_string(), handler);
    }

    /// Drop the delegate registered for `realm`
    pub fn unregister_authentication_delegate(&self, realm: &str) {
        self.handlers.remove(realm);
    }

    /// Handler registered for `realm`, if any
    pub fn challenge_handler_for_realm(&self, realm: &str) -> Option<Arc<ChallengeHandler>> {
        self.handlers.get(realm).map(|entry| entry.value().clone())
    }

    /// Route a realm challenge to its handler. A challenge for an
    /// unregistered realm fails the request immediately.
    pub fn handle_challenge(
        &self,
        realm: &str,
        request: Arc<dyn AuthorizationRequest>,
        challenge: &ChallengeData,
    ) {
        match self.challenge_handler_for_realm(realm) {
            Some(handler) => handler.handle_challenge(request, challenge),
            None => {
                warn!(realm = %realm, "challenge for unregistered realm");
                request.request_failed(Some(challenge));
            }
        }
    }

    /// Route a realm success notification to its handler
    pub fn handle_challenge_success(&self, realm: &str, info: &ChallengeData) {
        if let Some(handler) = self.challenge_handler_for_realm(realm) {
            handler.handle_success(info);
        }
    }

    /// Route a realm failure notification to its handler
    pub fn handle_challenge_failure(&self, realm: &str, info: &ChallengeData) {
        if let Some(handler) = self.challenge_handler_for_realm(realm) {
            handler.handle_failure(info);
        }
    }

    /// Current persistence policy
    pub fn persistence_policy(&self) -> PersistencePolicy {
        self.preferences.persistence_policy()
    }

    /// Change the persistence policy, migrating stored tokens to match
    pub fn set_persistence_policy(&self, policy: PersistencePolicy) -> Result<()> {
        self.preferences.set_persistence_policy(policy)
    }

    /// Forget tokens and the user identity, reset the failure counter, and
    /// rotate the session identifier. Safe to call repeatedly.
    pub fn clear_authorization_data(&self) -> Result<()> {
        self.preferences.clear_tokens();
        self.preferences.set_user_identity(None)?;
        self.failure_count.store(0, Ordering::SeqCst);
        *self.session_id.lock() = Uuid::new_v4().to_string();
        debug!("authorization data cleared");
        Ok(())
    }

    /// Log the user out; equivalent to clearing all authorization data
    pub fn logout(&self) -> Result<()> {
        self.clear_authorization_data()
    }

    /// Consecutive failed authorization attempts since the last success
    pub fn authorization_failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::SeqCst)
    }

    /// Identifier for the current authorization session
    pub fn session_id(&self) -> String {
        self.session_id.lock().clone()
    }

    /// Token preference layer
    pub fn preferences(&self) -> &AuthorizationPreferences {
        &self.preferences
    }

    /// Key pair and certificate operations
    pub fn key_service(&self) -> &KeyCertService {
        &self.key_service
    }

    /// Current user identity, if one was stored by a completed flow
    pub fn user_identity(&self) -> Result<Option<UserIdentity>> {
        self.preferences.user_identity()
    }

    /// Record the identity of the authenticated user
    pub fn set_user_identity(&self, identity: Option<&UserIdentity>) -> Result<()> {
        self.preferences.set_user_identity(identity)
    }

    /// Device identity recorded at construction
    pub fn device_identity(&self) -> Result<Option<DeviceIdentity>> {
        self.preferences.device_identity()
    }

    /// Application identity recorded at construction
    pub fn app_identity(&self) -> Result<Option<AppIdentity>> {
        self.preferences.app_identity()
    }
}
