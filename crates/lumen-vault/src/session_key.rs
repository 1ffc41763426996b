//! Time-boxed decryption capability
//!
//! A session key is the ephemeral identity vouching, for a bounded window,
//! that its holder may ask key servers for shares under one policy package.
//! Key servers verify the challenge signature; they never see the PIN or
//! the JWT.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use lumen_core::{Address, EphemeralIdentity, ObjectId, Result};

/// How long a minted session key stays valid
pub const SESSION_KEY_TTL_MINUTES: i64 = 30;

/// Capability presented to key servers with every share request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionKey {
    pub address: Address,
    pub policy_package: ObjectId,
    pub expires_at: DateTime<Utc>,
    /// Ephemeral public key the servers verify the signature against
    pub ephemeral_public_key: [u8; 32],
    /// Ephemeral signature over the challenge message
    pub signature: Vec<u8>,
}

impl SessionKey {
    /// Mint a capability for (address, policy package), valid for the TTL
    /// from `now`.
    pub fn mint(
        identity: &EphemeralIdentity,
        address: Address,
        policy_package: ObjectId,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let expires_at = now + Duration::minutes(SESSION_KEY_TTL_MINUTES);
        let message = challenge_message(&address, &policy_package, &expires_at);
        let signature = identity.sign(&message).to_vec();
        Ok(Self {
            address,
            policy_package,
            expires_at,
            ephemeral_public_key: identity.public_key_bytes(),
            signature,
        })
    }

    /// The exact bytes the ephemeral key signed; servers rebuild and verify
    pub fn challenge(&self) -> Vec<u8> {
        challenge_message(&self.address, &self.policy_package, &self.expires_at)
    }

    /// Whether this key still authorizes requests for `address` at `now`
    pub fn is_valid_for(&self, address: &Address, now: DateTime<Utc>) -> bool {
        self.address == *address && now < self.expires_at
    }
}

fn challenge_message(
    address: &Address,
    policy_package: &ObjectId,
    expires_at: &DateTime<Utc>,
) -> Vec<u8> {
    let mut message = Vec::with_capacity(32 + 32 + 8 + 24);
    message.extend_from_slice(b"lumen-session-key-v1");
    message.extend_from_slice(address.as_bytes());
    message.extend_from_slice(policy_package.as_bytes());
    message.extend_from_slice(&expires_at.timestamp().to_le_bytes());
    message
}

/// Per-address session key cache.
///
/// Reads revalidate: an expired entry or one minted for a different login
/// is silently discarded and a fresh key is minted, never surfaced as an
/// error.
pub struct SessionKeyCache {
    entries: RwLock<HashMap<Address, SessionKey>>,
}

impl SessionKeyCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return a valid session key for `address`, minting one if the cached
    /// entry is missing or stale.
    pub async fn get_or_mint(
        &self,
        identity: &EphemeralIdentity,
        address: Address,
        policy_package: ObjectId,
        now: DateTime<Utc>,
    ) -> Result<SessionKey> {
        {
            let entries = self.entries.read().await;
            if let Some(key) = entries.get(&address) {
                if key.is_valid_for(&address, now)
                    && key.policy_package == policy_package
                    && key.ephemeral_public_key == identity.public_key_bytes()
                {
                    return Ok(key.clone());
                }
            }
        }

        debug!(address = %address.short(), "minting session key");
        let key = SessionKey::mint(identity, address, policy_package, now)?;
        self.entries.write().await.insert(address, key.clone());
        Ok(key)
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

impl Default for SessionKeyCache {
    fn default() -> Self {
        Self::new()
    }
}
