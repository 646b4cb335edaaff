//! Bearer token decoding and claim access
//!
//! This module decodes three-segment signed tokens and exposes typed views
//! over the access and identity token payloads. Signature verification is
//! deliberately out of scope here: tokens arrive over a channel that
//! verifies them (or not) at the transport layer.

mod access;
mod codec;
mod identity;


pub use access::AccessToken;
pub use codec::Token;
pub use identity::{IdentityToken, OAuthClient};
