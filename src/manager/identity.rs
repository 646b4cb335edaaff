//! Client identity descriptors
//!
//! Small serializable records describing the device, the application, and
//! the authenticated user. They are persisted alongside the tokens so the
//! enrollment payload can be rebuilt without re-interrogating the platform.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Device the client runs on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Stable device identifier; generated once and persisted
    pub id: String,
    /// Operating system name
    pub os: String,
    /// Operating system version
    #[serde(rename = "osVersion")]
    pub os_version: String,
    /// Hardware model
    pub model: String,
}

impl DeviceIdentity {
    /// Describe a device with a freshly generated identifier
    pub fn new(os: impl Into<String>, os_version: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            os: os.into(),
            os_version: os_version.into(),
            model: model.into(),
        }
    }
}

/// Application the tokens were issued to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppIdentity {
    /// Application bundle or package identifier
    pub id: String,
    /// Application version string
    pub version: String,
}

/// User the current tokens describe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Subject identifier
    pub id: String,
    /// Authentication method that established the identity
    #[serde(rename = "authBy")]
    pub auth_by: String,
    /// Human readable display name
    #[serde(rename = "displayName")]
    pub display_name: String,
}
