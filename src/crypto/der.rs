//! Minimal DER walker for RSA public key structures
//!
//! Parses just enough ASN.1 to pull the modulus and exponent out of a
//! PKCS#1 `RSAPublicKey` blob and to locate the subject public key inside a
//! DER certificate. Every read is bounds checked; malformed input surfaces
//! as [`SecurityError::Crypto`] rather than a panic.

use crate::utils::error::{Result, SecurityError};

const TAG_SEQUENCE: u8 = 0x30;
const TAG_INTEGER: u8 = 0x02;
const TAG_BIT_STRING: u8 = 0x03;
const TAG_EXPLICIT_VERSION: u8 = 0xa0;

/// Modulus and exponent extracted from a PKCS#1 `RSAPublicKey`.
///
/// The bytes are the raw INTEGER contents, including the leading zero octet
/// a positive modulus carries. The enrollment service expects exactly this
/// encoding, so it is not normalized here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaKeyParts {
    /// Modulus bytes
    pub modulus: Vec<u8>,
    /// Public exponent bytes
    pub exponent: Vec<u8>,
}

/// Extract modulus and exponent from PKCS#1 `RSAPublicKey` DER bytes.
pub fn parse_rsa_public_key(der: &[u8]) -> Result<RsaKeyParts> {
    let mut cursor = DerCursor::new(der);

    cursor.expect_tag(TAG_SEQUENCE)?;
    cursor.read_length()?;

    cursor.expect_tag(TAG_INTEGER)?;
    let modulus_len = cursor.read_length()?;
    let modulus = cursor.take(modulus_len)?.to_vec();

    cursor.expect_tag(TAG_INTEGER)?;
    let exponent_len = cursor.read_length()?;
    let exponent = cursor.take(exponent_len)?.to_vec();

    Ok(RsaKeyParts { modulus, exponent })
}

/// Extract the PKCS#1 public key bytes embedded in a DER certificate.
///
/// Walks `Certificate -> tbsCertificate -> subjectPublicKeyInfo` and returns
/// the BIT STRING contents, which for an RSA certificate are the PKCS#1
/// `RSAPublicKey` encoding.
pub fn certificate_public_key(cert_der: &[u8]) -> Result<Vec<u8>> {
    let mut cursor = DerCursor::new(cert_der);

    cursor.expect_tag(TAG_SEQUENCE)?;
    cursor.read_length()?;

    // tbsCertificate
    cursor.expect_tag(TAG_SEQUENCE)?;
    cursor.read_length()?;

    // version is explicitly tagged and optional
    if cursor.peek() == Some(TAG_EXPLICIT_VERSION) {
        cursor.skip_value()?;
    }

    // serialNumber, signature, issuer, validity, subject
    for _ in 0..5 {
        cursor.skip_value()?;
    }

    // subjectPublicKeyInfo
    cursor.expect_tag(TAG_SEQUENCE)?;
    cursor.read_length()?;

    // AlgorithmIdentifier
    cursor.skip_value()?;

    cursor.expect_tag(TAG_BIT_STRING)?;
    let length = cursor.read_length()?;
    let bits = cursor.take(length)?;

    match bits.split_first() {
        Some((0, key)) if !key.is_empty() => Ok(key.to_vec()),
        _ => Err(SecurityError::crypto(
            "certificate public key BIT STRING has unsupported padding",
        )),
    }
}

/// Checked cursor over a DER byte slice
struct DerCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DerCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn read_u8(&mut self) -> Result<u8> {
        let byte = self
            .data
            .get(self.pos)
            .copied()
            .ok_or_else(|| SecurityError::crypto("truncated DER structure"))?;
        self.pos += 1;
        Ok(byte)
    }

    fn expect_tag(&mut self, tag: u8) -> Result<()> {
        let found = self.read_u8()?;
        if found != tag {
            return Err(SecurityError::crypto(format!(
                "unexpected DER tag {found:#04x}, expected {tag:#04x}"
            )));
        }
        Ok(())
    }

    /// Read a length field: one byte below 0x80, or `n = byte - 0x80`
    /// big-endian length octets. Indefinite lengths are not DER and are
    /// rejected.
    fn read_length(&mut self) -> Result<usize> {
        let first = self.read_u8()?;
        if first < 0x80 {
            return Ok(first as usize);
        }

        let count = (first - 0x80) as usize;
        if count == 0 {
            return Err(SecurityError::crypto("indefinite DER length"));
        }
        if count > std::mem::size_of::<usize>() {
            return Err(SecurityError::crypto("oversized DER length field"));
        }

        let mut length: usize = 0;
        for _ in 0..count {
            let byte = self.read_u8()? as usize;
            length = length
                .checked_mul(0x100)
                .and_then(|l| l.checked_add(byte))
                .ok_or_else(|| SecurityError::crypto("DER length overflow"))?;
        }
        Ok(length)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| SecurityError::crypto("DER value extends past end of input"))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Skip one tag-length-value element
    fn skip_value(&mut self) -> Result<()> {
        self.read_u8()?;
        let length = self.read_length()?;
        self.take(length)?;
        Ok(())
    }
}
