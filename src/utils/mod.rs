//! Shared utilities: errors, logging, base64 plumbing

pub mod error;
pub mod logging;

use base64::{alphabet, engine};

/// URL-safe base64 engine shared by token decoding and JWS assembly.
/// Encodes without padding; decoding tolerates padded and unpadded input.
pub(crate) const BASE64_URL: engine::GeneralPurpose = engine::GeneralPurpose::new(
    &alphabet::URL_SAFE,
    engine::GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(engine::DecodePaddingMode::Indifferent),
);
