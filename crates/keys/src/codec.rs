//! OpenSSH / PKCS#1 key parsing
//!
//! The public key is the usual one-line OpenSSH blob: an algorithm tag, the
//! base64 of the RFC 4253 wire encoding, and a comment. The comment is the
//! node's identity, which is why parsing it is part of identity derivation
//! and not just cryptography plumbing.
//!
//! Only `ssh-rsa` is supported; any other algorithm tag is a hard parse
//! error rather than a forward-compatible skip.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

const ALGO_RSA: &str = "ssh-rsa";
const PKCS1_TAG: &str = "RSA PRIVATE KEY";

/// Maximum public exponent width accepted, in bits.
const MAX_EXPONENT_BITS: u64 = 24;

/// Errors raised while decoding key material.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("malformed key blob: {0}")]
    Format(String),
    #[error("unsupported key algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// An RSA public key as carried in the peer registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsaPublicKey {
    pub e: BigUint,
    pub n: BigUint,
}

/// An RSA private key (PKCS#1). Held only to establish the local identity;
/// dirswarm never signs or decrypts with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPrivateKey {
    pub n: BigUint,
    pub e: BigUint,
    pub d: BigUint,
    pub p: BigUint,
    pub q: BigUint,
}

/// Parse a one-line OpenSSH public key blob into the key and the identity
/// carried in its comment field.
pub fn parse_public_key(blob: &[u8]) -> Result<(RsaPublicKey, String), KeyError> {
    let text = std::str::from_utf8(blob)
        .map_err(|_| KeyError::Format("public key blob is not UTF-8".into()))?;

    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() != 3 {
        return Err(KeyError::Format(format!(
            "expected 3 fields in public key blob, found {}",
            fields.len()
        )));
    }

    if fields[0] != ALGO_RSA {
        return Err(KeyError::UnsupportedAlgorithm(fields[0].to_string()));
    }

    let wire = BASE64
        .decode(fields[1])
        .map_err(|e| KeyError::Format(format!("base64 key material: {e}")))?;

    let key = parse_rsa_wire(&wire)?;

    // split_whitespace already dropped the trailing newline from the comment.
    Ok((key, fields[2].to_string()))
}

/// Parse a PEM-armored PKCS#1 RSA private key.
pub fn parse_private_key(blob: &[u8]) -> Result<RsaPrivateKey, KeyError> {
    let block =
        pem::parse(blob).map_err(|e| KeyError::Format(format!("no PEM block found: {e}")))?;

    if block.tag() != PKCS1_TAG {
        return Err(KeyError::Format(format!(
            "expected {PKCS1_TAG} PEM block, found {}",
            block.tag()
        )));
    }

    parse_pkcs1(block.contents())
}

/// RFC 4253 section 6.6: `string "ssh-rsa"`, `mpint e`, `mpint n`.
fn parse_rsa_wire(wire: &[u8]) -> Result<RsaPublicKey, KeyError> {
    let (algo, rest) = read_chunk(wire)?;
    if algo != ALGO_RSA.as_bytes() {
        return Err(KeyError::UnsupportedAlgorithm(
            String::from_utf8_lossy(algo).into_owned(),
        ));
    }

    let (e, rest) = read_mpint(rest)?;
    if e.bits() > MAX_EXPONENT_BITS {
        return Err(KeyError::Format("public exponent wider than 24 bits".into()));
    }
    if e < BigUint::from(3u8) || !e.bit(0) {
        return Err(KeyError::Format("public exponent must be odd and >= 3".into()));
    }

    let (n, _) = read_mpint(rest)?;

    Ok(RsaPublicKey { e, n })
}

/// One length-prefixed field: 4-byte big-endian length, then that many bytes.
fn read_chunk(input: &[u8]) -> Result<(&[u8], &[u8]), KeyError> {
    if input.len() < 4 {
        return Err(KeyError::Format("truncated length prefix".into()));
    }
    let len = u32::from_be_bytes([input[0], input[1], input[2], input[3]]) as usize;
    if input.len() < 4 + len {
        return Err(KeyError::Format("field shorter than declared length".into()));
    }
    Ok((&input[4..4 + len], &input[4 + len..]))
}

fn read_mpint(input: &[u8]) -> Result<(BigUint, &[u8]), KeyError> {
    let (bytes, rest) = read_chunk(input)?;
    // A set sign bit would make this a two's-complement negative; RSA key
    // material is always positive.
    if bytes.first().is_some_and(|b| b & 0x80 != 0) {
        return Err(KeyError::Format("negative integer in key material".into()));
    }
    Ok((BigUint::from_bytes_be(bytes), rest))
}

/// Minimal DER walk over `RSAPrivateKey ::= SEQUENCE` of nine INTEGERs
/// (version, n, e, d, p, q, dp, dq, qinv).
fn parse_pkcs1(der: &[u8]) -> Result<RsaPrivateKey, KeyError> {
    let mut reader = DerReader { buf: der };

    let mut body = DerReader {
        buf: reader.read_value(0x30)?,
    };

    let version = body.read_integer()?;
    if version != BigUint::from(0u8) {
        return Err(KeyError::Format("unsupported PKCS#1 version".into()));
    }

    let n = body.read_integer()?;
    let e = body.read_integer()?;
    let d = body.read_integer()?;
    let p = body.read_integer()?;
    let q = body.read_integer()?;

    // CRT coefficients: validated for presence, not retained.
    body.read_integer()?;
    body.read_integer()?;
    body.read_integer()?;

    Ok(RsaPrivateKey { n, e, d, p, q })
}

struct DerReader<'a> {
    buf: &'a [u8],
}

impl<'a> DerReader<'a> {
    /// Read one TLV with the expected tag and return its value bytes.
    fn read_value(&mut self, tag: u8) -> Result<&'a [u8], KeyError> {
        if self.buf.len() < 2 {
            return Err(KeyError::Format("truncated DER element".into()));
        }
        if self.buf[0] != tag {
            return Err(KeyError::Format(format!(
                "unexpected DER tag {:#04x}, wanted {tag:#04x}",
                self.buf[0]
            )));
        }

        let (len, header) = match self.buf[1] {
            short if short & 0x80 == 0 => (short as usize, 2),
            long => {
                let num_bytes = (long & 0x7f) as usize;
                if num_bytes == 0 || num_bytes > 4 || self.buf.len() < 2 + num_bytes {
                    return Err(KeyError::Format("bad DER length encoding".into()));
                }
                let mut len = 0usize;
                for &b in &self.buf[2..2 + num_bytes] {
                    len = len << 8 | b as usize;
                }
                (len, 2 + num_bytes)
            }
        };

        if self.buf.len() < header + len {
            return Err(KeyError::Format("DER element shorter than declared".into()));
        }

        let value = &self.buf[header..header + len];
        self.buf = &self.buf[header + len..];
        Ok(value)
    }

    fn read_integer(&mut self) -> Result<BigUint, KeyError> {
        let bytes = self.read_value(0x02)?;
        if bytes.is_empty() {
            return Err(KeyError::Format("empty DER integer".into()));
        }
        if bytes[0] & 0x80 != 0 {
            return Err(KeyError::Format("negative integer in key material".into()));
        }
        Ok(BigUint::from_bytes_be(bytes))
    }
}
