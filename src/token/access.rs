//! Access token view

use std::ops::Deref;

use crate::utils::error::Result;

use super::Token;

const SCOPE: &str = "scope";

/// Access token: a decoded [`Token`] plus the granted scope
#[derive(Debug, Clone)]
pub struct AccessToken {
    token: Token,
}

impl AccessToken {
    /// Decode an access token string
    pub fn decode(raw: &str) -> Result<Self> {
        Ok(Self {
            token: Token::decode(raw)?,
        })
    }

    /// `scope` claim
    pub fn scope(&self) -> Option<String> {
        self.token.string_claim(SCOPE)
    }
}

impl Deref for AccessToken {
    type Target = Token;

    fn deref(&self) -> &Token {
        &self.token
    }
}
