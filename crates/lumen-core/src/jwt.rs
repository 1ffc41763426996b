//! Unverified JWT decoding
//!
//! The wallet never validates JWT signatures itself: the proving oracle and
//! the ledger do. This module only splits the token, decodes the claims it
//! needs, and computes the issuer byte-alignment details the composite
//! signature carries.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Claims the wallet reads from an ID token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub iss: Option<String>,
    pub sub: Option<String>,
    #[serde(default)]
    pub aud: Option<Audience>,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub nonce: Option<String>,
}

/// Audience claim, encoded by providers as a single value or a list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

impl JwtClaims {
    /// The subject claim, required for all identity operations
    pub fn subject(&self) -> Result<&str> {
        self.sub
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::InvalidJwtClaims("missing sub claim".to_string()))
    }

    /// The issuer claim
    pub fn issuer(&self) -> Result<&str> {
        self.iss
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::InvalidJwtClaims("missing iss claim".to_string()))
    }

    /// Normalize the audience claim: lists collapse to their first element,
    /// and an empty result is an error.
    pub fn normalized_audience(&self) -> Result<&str> {
        let aud = match &self.aud {
            Some(Audience::Single(s)) => Some(s.as_str()),
            Some(Audience::Many(list)) => list.first().map(|s| s.as_str()),
            None => None,
        };
        aud.filter(|s| !s.is_empty())
            .ok_or_else(|| Error::InvalidJwtClaims("aud claim is empty".to_string()))
    }
}

/// Issuer location details carried inside the composite signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerDetails {
    /// The issuer string as it appears in the payload
    pub value: String,
    /// Byte offset of the issuer value within the decoded payload, mod 4
    pub index_mod4: u8,
}

/// A split-and-decoded JWT
#[derive(Debug, Clone)]
pub struct DecodedJwt {
    /// Header segment exactly as received (still base64url)
    pub header_base64: String,
    /// Payload segment exactly as received (still base64url)
    pub payload_base64: String,
    /// Decoded claims
    pub claims: JwtClaims,
}

impl DecodedJwt {
    /// Split a compact JWT and decode its payload claims. The signature
    /// segment is kept opaque.
    pub fn parse(token: &str) -> Result<Self> {
        let mut parts = token.split('.');
        let header = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::InvalidJwtClaims("missing JWT header".to_string()))?;
        let payload = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::InvalidJwtClaims("missing JWT payload".to_string()))?;
        let _signature = parts
            .next()
            .ok_or_else(|| Error::InvalidJwtClaims("missing JWT signature".to_string()))?;
        if parts.next().is_some() {
            return Err(Error::InvalidJwtClaims(
                "token has more than three segments".to_string(),
            ));
        }

        let payload_bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| Error::InvalidJwtClaims(format!("payload is not base64url: {}", e)))?;
        let claims: JwtClaims = serde_json::from_slice(&payload_bytes)
            .map_err(|e| Error::InvalidJwtClaims(format!("payload is not JSON: {}", e)))?;

        Ok(Self {
            header_base64: header.to_string(),
            payload_base64: payload.to_string(),
            claims,
        })
    }

    /// Compute the issuer details for the composite signature.
    ///
    /// The offset is the byte position of the issuer *value* inside the
    /// decoded payload, mod 4. This is the payload-position rule: computing
    /// the offset from the issuer string length alone gives a different
    /// (wrong) alignment whenever `iss` is not the first claim.
    pub fn issuer_details(&self) -> Result<IssuerDetails> {
        let issuer = self.claims.issuer()?;
        let payload = URL_SAFE_NO_PAD
            .decode(&self.payload_base64)
            .map_err(|e| Error::InvalidJwtClaims(format!("payload is not base64url: {}", e)))?;
        let payload_str = String::from_utf8(payload)
            .map_err(|e| Error::InvalidJwtClaims(format!("payload is not UTF-8: {}", e)))?;

        let needle = format!("\"iss\":\"{}\"", issuer);
        let key_start = payload_str.find(&needle).ok_or_else(|| {
            Error::InvalidJwtClaims("iss claim not found in raw payload".to_string())
        })?;
        // Skip `"iss":"` to land on the first byte of the value
        let value_start = key_start + 7;

        Ok(IssuerDetails {
            value: issuer.to_string(),
            index_mod4: (value_start % 4) as u8,
        })
    }
}
