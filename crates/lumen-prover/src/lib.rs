//! Lumen Prover - client for the external proving oracle
//!
//! The oracle is consumed as an opaque remote service: one request per
//! (JWT, ephemeral key, PIN) triple, no automatic retry. A transient oracle
//! failure surfaces to the caller, which re-prompts the user.

use lumen_core::{
    DecodedJwt, EphemeralIdentity, Error, IdentityProof, Pin, Result, KEY_CLAIM_NAME,
};
use serde::Serialize;
use tracing::{debug, instrument};

/// Request body the oracle expects. The salt travels base64-encoded - the
/// oracle treats it as an opaque blob, never as raw PIN digits.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProofRequestBody<'a> {
    jwt: &'a str,
    extended_ephemeral_public_key: String,
    jwt_randomness: &'a str,
    max_epoch: String,
    key_claim_name: &'a str,
    key_claim_value: &'a str,
    salt: String,
}

/// Proof oracle HTTP client
pub struct ProverClient {
    http: reqwest::Client,
    url: String,
}

impl ProverClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::ProverUnavailable(format!("failed to build client: {}", e)))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    /// Exchange (JWT, ephemeral public key, randomness, PIN salt) for an
    /// identity proof.
    #[instrument(skip_all, fields(url = %self.url))]
    pub async fn request_proof(
        &self,
        jwt: &str,
        identity: &EphemeralIdentity,
        pin: &Pin,
    ) -> Result<IdentityProof> {
        let decoded = DecodedJwt::parse(jwt)?;
        let subject = decoded.claims.subject()?;

        let body = ProofRequestBody {
            jwt,
            extended_ephemeral_public_key: identity.extended_public_key_base64(),
            jwt_randomness: &identity.randomness,
            max_epoch: identity.max_epoch.to_string(),
            key_claim_name: KEY_CLAIM_NAME,
            key_claim_value: subject,
            salt: pin.salt_base64(),
        };

        debug!(max_epoch = identity.max_epoch, "requesting identity proof");

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::ProverUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::ProverUnavailable(format!(
                "{} {} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("error"),
                text
            )));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::ProverMalformedResponse(e.to_string()))?;

        IdentityProof::from_oracle_json(&value, &decoded)
    }
}
