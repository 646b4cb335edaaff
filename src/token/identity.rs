//! Identity token view with profile claims

use std::ops::Deref;

use serde_json::{Map, Value};

use crate::utils::error::Result;

use super::Token;

const NAME: &str = "name";
const EMAIL: &str = "email";
const GENDER: &str = "gender";
const LOCALE: &str = "locale";
const PICTURE: &str = "picture";
const IDENTITIES: &str = "identities";
const OAUTH_CLIENT: &str = "oauth_client";

/// Identity token: a decoded [`Token`] plus user profile claims
#[derive(Debug, Clone)]
pub struct IdentityToken {
    token: Token,
}

impl IdentityToken {
    /// Decode an identity token string
    pub fn decode(raw: &str) -> Result<Self> {
        Ok(Self {
            token: Token::decode(raw)?,
        })
    }

    /// `name` claim
    pub fn name(&self) -> Option<String> {
        self.token.string_claim(NAME)
    }

    /// `email` claim
    pub fn email(&self) -> Option<String> {
        self.token.string_claim(EMAIL)
    }

    /// `gender` claim
    pub fn gender(&self) -> Option<String> {
        self.token.string_claim(GENDER)
    }

    /// `locale` claim
    pub fn locale(&self) -> Option<String> {
        self.token.string_claim(LOCALE)
    }

    /// `picture` claim
    pub fn picture(&self) -> Option<String> {
        self.token.string_claim(PICTURE)
    }

    /// `identities` claim: federated identities linked to this user
    pub fn identities(&self) -> Option<Vec<Map<String, Value>>> {
        self.token.payload().get(IDENTITIES)?.as_array().map(|ids| {
            ids.iter()
                .filter_map(|id| id.as_object().cloned())
                .collect()
        })
    }

    /// View over the `oauth_client` claim describing the originating client
    pub fn oauth_client(&self) -> OAuthClient<'_> {
        OAuthClient {
            claims: self
                .token
                .payload()
                .get(OAUTH_CLIENT)
                .and_then(Value::as_object),
        }
    }
}

impl Deref for IdentityToken {
    type Target = Token;

    fn deref(&self) -> &Token {
        &self.token
    }
}

/// Read-only view over the nested `oauth_client` claim. Every accessor
/// yields `None` when the claim or key is absent.
#[derive(Debug, Clone, Copy)]
pub struct OAuthClient<'a> {
    claims: Option<&'a Map<String, Value>>,
}

impl OAuthClient<'_> {
    /// `type` key
    pub fn client_type(&self) -> Option<String> {
        self.string_claim("type")
    }

    /// `name` key
    pub fn name(&self) -> Option<String> {
        self.string_claim("name")
    }

    /// `software_id` key
    pub fn software_id(&self) -> Option<String> {
        self.string_claim("software_id")
    }

    /// `software_version` key
    pub fn software_version(&self) -> Option<String> {
        self.string_claim("software_version")
    }

    /// `device_id` key
    pub fn device_id(&self) -> Option<String> {
        self.string_claim("device_id")
    }

    /// `device_model` key
    pub fn device_model(&self) -> Option<String> {
        self.string_claim("device_model")
    }

    /// `device_os` key
    pub fn device_os(&self) -> Option<String> {
        self.string_claim("device_os")
    }

    fn string_claim(&self, key: &str) -> Option<String> {
        self.claims?.get(key).and_then(Value::as_str).map(str::to_string)
    }
}
