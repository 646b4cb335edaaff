//! Core token decoder

use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::utils::error::{Result, SecurityError};
use crate::utils::BASE64_URL;

const ISSUER: &str = "iss";
const SUBJECT: &str = "sub";
const AUDIENCE: &str = "aud";
const EXPIRATION: &str = "exp";
const ISSUED_AT: &str = "iat";
const TENANT: &str = "tenant";
const AUTH_METHODS: &str = "amr";

const ANONYMOUS_AUTH_METHOD: &str = "appid_anon";

/// A decoded three-segment bearer token.
///
/// Immutable once decoded; replaced wholesale when a new token arrives or on
/// logout. Claim accessors are total: a missing or mistyped optional claim
/// yields `None`, never an error.
#[derive(Debug, Clone)]
pub struct Token {
    raw: String,
    header: Map<String, Value>,
    payload: Map<String, Value>,
    signature: String,
}

impl Token {
    /// Decode a `header.payload.signature` token string.
    ///
    /// Fails with [`SecurityError::MalformedToken`] unless there are exactly
    /// three segments and the first two are base64url-encoded JSON objects.
    pub fn decode(raw: &str) -> Result<Self> {
        let segments: Vec<&str> = raw.split('.').collect();
        if segments.len() != 3 {
            return Err(SecurityError::malformed(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        }

        let header = decode_segment(segments[0])?;
        let payload = decode_segment(segments[1])?;

        Ok(Self {
            raw: raw.to_string(),
            header,
            payload,
            signature: segments[2].to_string(),
        })
    }

    /// The original encoded string
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Decoded header claims
    pub fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    /// Decoded payload claims
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// The third segment, still encoded
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// `iss` claim
    pub fn issuer(&self) -> Option<String> {
        self.string_claim(ISSUER)
    }

    /// `sub` claim
    pub fn subject(&self) -> Option<String> {
        self.string_claim(SUBJECT)
    }

    /// `aud` claim
    pub fn audience(&self) -> Option<String> {
        self.string_claim(AUDIENCE)
    }

    /// `tenant` claim
    pub fn tenant(&self) -> Option<String> {
        self.string_claim(TENANT)
    }

    /// `exp` claim as a UTC instant, `None` if absent or non-numeric
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.timestamp_claim(EXPIRATION)
    }

    /// `iat` claim as a UTC instant, `None` if absent or non-numeric
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp_claim(ISSUED_AT)
    }

    /// `amr` claim: the authentication methods the token was obtained with
    pub fn authentication_methods(&self) -> Option<Vec<String>> {
        self.payload.get(AUTH_METHODS)?.as_array().map(|methods| {
            methods
                .iter()
                .filter_map(|m| m.as_str().map(str::to_string))
                .collect()
        })
    }

    /// Whether the token has expired. A token without an `exp` claim counts
    /// as expired (fail closed).
    pub fn is_expired(&self) -> bool {
        match self.expiration() {
            Some(expiration) => expiration < Utc::now(),
            None => true,
        }
    }

    /// Whether the token was obtained through anonymous authentication
    pub fn is_anonymous(&self) -> bool {
        self.authentication_methods()
            .map_or(false, |methods| {
                methods.iter().any(|m| m == ANONYMOUS_AUTH_METHOD)
            })
    }

    pub(crate) fn string_claim(&self, key: &str) -> Option<String> {
        self.payload.get(key).and_then(Value::as_str).map(str::to_string)
    }

    fn timestamp_claim(&self, key: &str) -> Option<DateTime<Utc>> {
        let seconds = match self.payload.get(key)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))?,
            _ => return None,
        };
        Utc.timestamp_opt(seconds, 0).single()
    }
}

fn decode_segment(segment: &str) -> Result<Map<String, Value>> {
    let bytes = BASE64_URL
        .decode(segment)
        .map_err(|e| SecurityError::malformed(format!("segment is not valid base64url: {e}")))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| SecurityError::malformed("segment is not valid UTF-8"))?;

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(SecurityError::malformed("segment is not a JSON object")),
        Err(e) => Err(SecurityError::malformed(format!(
            "segment is not valid JSON: {e}"
        ))),
    }
}
