//! Token and identity preferences
//!
//! Holds the runtime copies of the access and identity tokens and keeps the
//! [`SecureStore`] in sync according to the persistence policy. Under
//! `Always` every token write lands in the store; under `Never` tokens live
//! only in memory and the store is scrubbed. Identity records are always
//! persisted, they carry no credentials.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::PersistencePolicy;
use crate::manager::identity::{AppIdentity, DeviceIdentity, UserIdentity};
use crate::store::SecureStore;
use crate::utils::error::Result;

const ACCESS_TOKEN_LABEL: &str = "authgate.accessToken";
const ID_TOKEN_LABEL: &str = "authgate.idToken";
const USER_IDENTITY_LABEL: &str = "authgate.userIdentity";
const DEVICE_IDENTITY_LABEL: &str = "authgate.deviceIdentity";
const APP_IDENTITY_LABEL: &str = "authgate.appIdentity";

struct TokenState {
    policy: PersistencePolicy,
    access_token: Option<String>,
    identity_token: Option<String>,
}

/// Preference layer over a [`SecureStore`].
///
/// The runtime copy is the source of truth; the store mirrors it when the
/// policy allows. A single lock covers both tokens so the authorization
/// header is always built from a consistent pair.
pub struct AuthorizationPreferences {
    store: Arc<dyn SecureStore>,
    state: Mutex<TokenState>,
}

impl AuthorizationPreferences {
    /// Open preferences over `store`, hydrating persisted tokens when the
    /// policy allows persistence.
    pub fn new(store: Arc<dyn SecureStore>, policy: PersistencePolicy) -> Result<Self> {
        let (access_token, identity_token) = match policy {
            PersistencePolicy::Always => (
                store.get_string(ACCESS_TOKEN_LABEL)?,
                store.get_string(ID_TOKEN_LABEL)?,
            ),
            PersistencePolicy::Never => (None, None),
        };

        Ok(Self {
            store,
            state: Mutex::new(TokenState {
                policy,
                access_token,
                identity_token,
            }),
        })
    }

    /// Current persistence policy
    pub fn persistence_policy(&self) -> PersistencePolicy {
        self.state.lock().policy
    }

    /// Switch the persistence policy, migrating stored tokens to match:
    /// `Always` writes the runtime tokens through, `Never` scrubs them from
    /// the store. Runtime copies survive either way.
    pub fn set_persistence_policy(&self, policy: PersistencePolicy) -> Result<()> {
        let mut state = self.state.lock();
        if state.policy == policy {
            return Ok(());
        }
        state.policy = policy;
        debug!(?policy, "persistence policy changed");

        match policy {
            PersistencePolicy::Always => {
                if let Some(token) = &state.access_token {
                    self.store.set_string(ACCESS_TOKEN_LABEL, token)?;
                }
                if let Some(token) = &state.identity_token {
                    self.store.set_string(ID_TOKEN_LABEL, token)?;
                }
            }
            PersistencePolicy::Never => {
                self.store.remove_string(ACCESS_TOKEN_LABEL);
                self.store.remove_string(ID_TOKEN_LABEL);
            }
        }
        Ok(())
    }

    /// Current access token, if any
    pub fn access_token(&self) -> Option<String> {
        self.state.lock().access_token.clone()
    }

    /// Current identity token, if any
    pub fn identity_token(&self) -> Option<String> {
        self.state.lock().identity_token.clone()
    }

    /// Store a new access token, or clear it with `None`
    pub fn set_access_token(&self, token: Option<String>) -> Result<()> {
        self.set_token(ACCESS_TOKEN_LABEL, token, |state| &mut state.access_token)
    }

    /// Store a new identity token, or clear it with `None`
    pub fn set_identity_token(&self, token: Option<String>) -> Result<()> {
        self.set_token(ID_TOKEN_LABEL, token, |state| &mut state.identity_token)
    }

    /// Build the cached `Bearer <access> <identity>` header. `None` unless
    /// both tokens are present.
    pub fn cached_authorization_header(&self) -> Option<String> {
        let state = self.state.lock();
        match (&state.access_token, &state.identity_token) {
            (Some(access), Some(identity)) => Some(format!("Bearer {access} {identity}")),
            _ => None,
        }
    }

    /// Drop both tokens from memory and from the store
    pub fn clear_tokens(&self) {
        let mut state = self.state.lock();
        state.access_token = None;
        state.identity_token = None;
        self.store.remove_string(ACCESS_TOKEN_LABEL);
        self.store.remove_string(ID_TOKEN_LABEL);
    }

    /// Persisted user identity, if one has been established
    pub fn user_identity(&self) -> Result<Option<UserIdentity>> {
        self.get_json(USER_IDENTITY_LABEL)
    }

    /// Persist or clear the user identity
    pub fn set_user_identity(&self, identity: Option<&UserIdentity>) -> Result<()> {
        self.set_json(USER_IDENTITY_LABEL, identity)
    }

    /// Persisted device identity
    pub fn device_identity(&self) -> Result<Option<DeviceIdentity>> {
        self.get_json(DEVICE_IDENTITY_LABEL)
    }

    /// Persist the device identity
    pub fn set_device_identity(&self, identity: &DeviceIdentity) -> Result<()> {
        self.set_json(DEVICE_IDENTITY_LABEL, Some(identity))
    }

    /// Persisted application identity
    pub fn app_identity(&self) -> Result<Option<AppIdentity>> {
        self.get_json(APP_IDENTITY_LABEL)
    }

    /// Persist the application identity
    pub fn set_app_identity(&self, identity: &AppIdentity) -> Result<()> {
        self.set_json(APP_IDENTITY_LABEL, Some(identity))
    }

    fn set_token(
        &self,
        label: &str,
        token: Option<String>,
        slot: impl FnOnce(&mut TokenState) -> &mut Option<String>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let persist = state.policy == PersistencePolicy::Always;
        match (&token, persist) {
            (Some(value), true) => {
                self.store.set_string(label, value)?;
            }
            _ => {
                self.store.remove_string(label);
            }
        }
        *slot(&mut state) = token;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, label: &str) -> Result<Option<T>> {
        match self.store.get_string(label)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, label: &str, value: Option<&T>) -> Result<()> {
        match value {
            Some(value) => {
                self.store.set_string(label, &serde_json::to_string(value)?)?;
            }
            None => {
                self.store.remove_string(label);
            }
        }
        Ok(())
    }
}
