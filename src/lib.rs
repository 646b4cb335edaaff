//! # authgate
//!
//! Client-side authorization and token management for mobile backends.
//!
//! The crate covers four concerns:
//!
//! - **Tokens** ([`token`]): decoding three-segment bearer tokens and
//!   reading their claims, with expiry checks that fail closed.
//! - **Keys and certificates** ([`crypto`]): generating the
//!   proof-of-possession RSA key pair, signing enrollment payloads in JWS
//!   layout, and checking issued certificates against the local key.
//! - **Challenges** ([`challenge`]): per-realm handlers that serialize
//!   custom authentication challenges so concurrent requests trigger one
//!   delegate interaction.
//! - **Coordination** ([`manager`]): the [`AuthorizationManager`] façade
//!   tying tokens, persistence policy, and challenge routing together, and
//!   funneling concurrent authorization demand into a single flow.
//!
//! Token signatures are not verified here; that is the resource server's
//! job. This crate manages possession, caching, and renewal of the tokens.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use authgate::config::SecurityConfig;
//! use authgate::manager::{AppIdentity, AuthorizationManager, DeviceIdentity};
//! use authgate::store::InMemorySecureStore;
//!
//! # fn main() -> authgate::Result<()> {
//! let store = Arc::new(InMemorySecureStore::new());
//! let manager = AuthorizationManager::new(
//!     store,
//!     SecurityConfig::default(),
//!     DeviceIdentity::new("ios", "17.2", "iPhone15,3"),
//!     AppIdentity { id: "com.example.photos".into(), version: "2.4.1".into() },
//! )?;
//!
//! // attach this to outgoing requests when present
//! let header = manager.cached_authorization_header();
//! assert!(header.is_none());
//! # Ok(())
//! # }
//! ```

pub mod challenge;
pub mod config;
pub mod crypto;
pub mod manager;
pub mod store;
pub mod token;
pub mod utils;

pub use config::{PersistencePolicy, SecurityConfig};
pub use manager::{AuthorizationManager, AuthorizationResponse};
pub use token::{AccessToken, IdentityToken, Token};
pub use utils::error::{Result, SecurityError};
pub use utils::logging::init_logging;
