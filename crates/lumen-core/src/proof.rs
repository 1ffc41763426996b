//! Canonical identity-proof shape
//!
//! The proving oracle has returned its proof points both wrapped
//! (`{"proofPoints": {...}}`) and unwrapped (`{"a": ..}`) over time.
//! Normalization happens exactly once, here, at the oracle-client boundary;
//! the rest of the codebase only ever sees [`IdentityProof`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::jwt::{DecodedJwt, IssuerDetails};

/// The three Groth16 group-element arrays, kept as opaque strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofPoints {
    pub a: Vec<String>,
    pub b: Vec<Vec<String>>,
    pub c: Vec<String>,
}

/// A zero-knowledge proof binding a JWT to an ephemeral key.
///
/// Produced once per (JWT, ephemeral key, PIN) triple and immutable
/// thereafter; it becomes useless if any of the three changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProof {
    pub proof_points: ProofPoints,
    pub iss_base64_details: IssuerDetails,
    pub header_base64: String,
}

impl IdentityProof {
    /// Normalize a raw oracle response into the canonical proof shape.
    ///
    /// `jwt` fills in the issuer details and header when the oracle omits
    /// them (older responses carried only the proof points).
    pub fn from_oracle_json(value: &serde_json::Value, jwt: &DecodedJwt) -> Result<Self> {
        let points = value.get("proofPoints").unwrap_or(value);

        let a = string_array(points, "a")?;
        let b = nested_string_array(points, "b")?;
        let c = string_array(points, "c")?;

        let iss_base64_details = match value.get("issBase64Details") {
            Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| {
                Error::ProverMalformedResponse(format!("bad issBase64Details: {}", e))
            })?,
            None => jwt.issuer_details()?,
        };

        let header_base64 = match value.get("headerBase64").and_then(|v| v.as_str()) {
            Some(h) => h.to_string(),
            None => jwt.header_base64.clone(),
        };

        Ok(Self {
            proof_points: ProofPoints { a, b, c },
            iss_base64_details,
            header_base64,
        })
    }
}

fn string_array(value: &serde_json::Value, key: &str) -> Result<Vec<String>> {
    let arr = value
        .get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| Error::ProverMalformedResponse(format!("missing proof point {}", key)))?;
    arr.iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::ProverMalformedResponse(format!("{} is not a string array", key)))
        })
        .collect()
}

fn nested_string_array(value: &serde_json::Value, key: &str) -> Result<Vec<Vec<String>>> {
    let arr = value
        .get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| Error::ProverMalformedResponse(format!("missing proof point {}", key)))?;
    arr.iter()
        .map(|row| {
            row.as_array()
                .ok_or_else(|| {
                    Error::ProverMalformedResponse(format!("{} is not a nested array", key))
                })?
                .iter()
                .map(|v| {
                    v.as_str().map(str::to_string).ok_or_else(|| {
                        Error::ProverMalformedResponse(format!("{} contains a non-string", key))
                    })
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use serde_json::json;

    fn fixture_jwt() -> DecodedJwt {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
        let payload =
            URL_SAFE_NO_PAD.encode(r#"{"iss":"https://issuer.example.com","sub":"s","aud":"a"}"#);
        DecodedJwt::parse(&format!("{}.{}.sig", header, payload)).unwrap()
    }

    fn points() -> serde_json::Value {
        json!({
            "a": ["1", "2", "3"],
            "b": [["4", "5"], ["6", "7"], ["8", "9"]],
            "c": ["10", "11", "12"],
        })
    }

    #[test]
    fn test_wrapped_response() {
        let value = json!({
            "proofPoints": points(),
            "issBase64Details": { "value": "https://issuer.example.com", "indexMod4": 0 },
            "headerBase64": "hdr",
        });
        let proof = IdentityProof::from_oracle_json(&value, &fixture_jwt()).unwrap();
        assert_eq!(proof.proof_points.a, vec!["1", "2", "3"]);
        assert_eq!(proof.header_base64, "hdr");
        assert_eq!(proof.iss_base64_details.index_mod4, 0);
    }

    #[test]
    fn test_unwrapped_response_fills_from_jwt() {
        let proof = IdentityProof::from_oracle_json(&points(), &fixture_jwt()).unwrap();
        assert_eq!(proof.proof_points.b.len(), 3);
        assert_eq!(proof.iss_base64_details.value, "https://issuer.example.com");
        assert_eq!(proof.header_base64, fixture_jwt().header_base64);
    }

    #[test]
    fn test_missing_point_array_is_malformed() {
        for key in ["a", "b", "c"] {
            let mut value = points();
            value.as_object_mut().unwrap().remove(key);
            let err = IdentityProof::from_oracle_json(&value, &fixture_jwt()).unwrap_err();
            assert!(matches!(err, Error::ProverMalformedResponse(_)), "{key}");
        }
    }

    #[test]
    fn test_serde_uses_oracle_field_names() {
        let value = json!({
            "proofPoints": points(),
            "issBase64Details": { "value": "i", "indexMod4": 2 },
            "headerBase64": "hdr",
        });
        let proof: IdentityProof = serde_json::from_value(value).unwrap();
        assert_eq!(proof.iss_base64_details.index_mod4, 2);
        let back = serde_json::to_value(&proof).unwrap();
        assert!(back.get("proofPoints").is_some());
        assert!(back.get("headerBase64").is_some());
    }
}
