//! Login session aggregate

use serde::{Deserialize, Serialize};

use crate::derive::derive_address;
use crate::ephemeral::StoredEphemeral;
use crate::error::Result;
use crate::jwt::DecodedJwt;
use crate::pin::Pin;
use crate::proof::IdentityProof;
use crate::types::Address;

/// One login attempt's worth of state. Owned by the session store; the
/// signer and vault read it but never mutate it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub ephemeral: Option<StoredEphemeral>,
    pub proof: Option<IdentityProof>,
    pub id_token: Option<String>,
}

impl Session {
    /// A session may sign transactions only when both the ephemeral
    /// identity and the proof are present.
    pub fn is_complete(&self) -> bool {
        self.ephemeral.is_some() && self.proof.is_some()
    }

    pub fn ephemeral(&self) -> crate::Result<&StoredEphemeral> {
        self.ephemeral.as_ref().ok_or(crate::Error::MissingEphemeralKey)
    }

    pub fn proof(&self) -> crate::Result<&IdentityProof> {
        self.proof.as_ref().ok_or(crate::Error::MissingProof)
    }

    pub fn id_token(&self) -> crate::Result<&str> {
        self.id_token
            .as_deref()
            .ok_or_else(|| crate::Error::InvalidJwtClaims("no id token in session".to_string()))
    }
}

/// Public identity derived from (JWT, PIN)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub address: Address,
    pub subject: String,
    pub provider: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl UserIdentity {
    /// Derive the identity deterministically from the token and PIN.
    /// Stable across logins with the same PIN; a different PIN yields a
    /// different address by design.
    pub fn from_jwt(jwt: &DecodedJwt, pin: &Pin, provider: impl Into<String>) -> Result<Self> {
        let address = derive_address(&jwt.claims, pin)?;
        Ok(Self {
            address,
            subject: jwt.claims.subject()?.to_string(),
            provider: provider.into(),
            email: jwt.claims.email.clone(),
            display_name: jwt.claims.name.clone(),
        })
    }
}
