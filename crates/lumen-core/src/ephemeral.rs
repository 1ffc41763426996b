//! Ephemeral login identity
//!
//! One identity per login attempt: a fresh ed25519 keypair, high-entropy
//! randomness, and an epoch-bounded validity window. The identity never
//! leaves the device; only its public key, nonce, and signatures do.

use base64::{engine::general_purpose::STANDARD, engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};
use crate::ledger::LedgerClient;
use crate::types::hex_bytes_32;
use crate::{EPOCH_VALIDITY_BUFFER, NONCE_LENGTH};

/// Scheme flag prepended to the public key in its extended form
const ED25519_SCHEME_FLAG: u8 = 0x00;

/// In-memory ephemeral identity for one login attempt
pub struct EphemeralIdentity {
    signing_key: SigningKey,
    /// Opaque high-entropy randomness bound into the login nonce
    pub randomness: String,
    /// Last ledger epoch at which signatures from this key are valid
    pub max_epoch: u64,
}

/// Persistable form of an ephemeral identity (session storage envelope)
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct StoredEphemeral {
    #[serde(with = "hex_bytes_32")]
    pub secret_key: [u8; 32],
    pub randomness: String,
    pub nonce: String,
    #[zeroize(skip)]
    pub max_epoch: u64,
}

impl std::fmt::Debug for StoredEphemeral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredEphemeral")
            .field("secret_key", &"***")
            .field("nonce", &self.nonce)
            .field("max_epoch", &self.max_epoch)
            .finish()
    }
}

impl EphemeralIdentity {
    /// Generate a fresh identity with the given validity ceiling
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R, max_epoch: u64) -> Self {
        let signing_key = SigningKey::generate(rng);
        let mut randomness_bytes = [0u8; 16];
        rng.fill_bytes(&mut randomness_bytes);
        Self {
            signing_key,
            randomness: hex::encode(randomness_bytes),
            max_epoch,
        }
    }

    /// Begin a login attempt: fresh keypair and randomness, validity window
    /// bounded to the ledger's current epoch plus a small fixed buffer.
    ///
    /// The caller owns persistence; this function has no side effects beyond
    /// its return value, so the identity must be stored before the OAuth
    /// redirect leaves the page.
    pub async fn begin(ledger: &dyn LedgerClient) -> Result<(Self, String)> {
        let current_epoch = ledger.current_epoch().await?;
        let identity =
            Self::generate(&mut rand::rngs::OsRng, current_epoch + EPOCH_VALIDITY_BUFFER);
        let nonce = identity.login_nonce();
        Ok((identity, nonce))
    }

    /// Reconstruct the identity from its stored form
    pub fn from_stored(stored: &StoredEphemeral) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&stored.secret_key),
            randomness: stored.randomness.clone(),
            max_epoch: stored.max_epoch,
        }
    }

    /// Persistable form, carrying the precomputed nonce
    pub fn to_stored(&self, nonce: &str) -> StoredEphemeral {
        StoredEphemeral {
            secret_key: self.signing_key.to_bytes(),
            randomness: self.randomness.clone(),
            nonce: nonce.to_string(),
            max_epoch: self.max_epoch,
        }
    }

    /// The login nonce binding (public key, max epoch, randomness)
    pub fn login_nonce(&self) -> String {
        login_nonce(
            &self.signing_key.verifying_key(),
            self.max_epoch,
            &self.randomness,
        )
    }

    /// Raw public key bytes
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Extended public key (scheme flag + key bytes), base64 - the form the
    /// proving oracle expects
    pub fn extended_public_key_base64(&self) -> String {
        let mut extended = Vec::with_capacity(33);
        extended.push(ED25519_SCHEME_FLAG);
        extended.extend_from_slice(&self.public_key_bytes());
        STANDARD.encode(extended)
    }

    /// Sign arbitrary bytes (transaction bytes or a session-key challenge)
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Verify a signature produced by this identity
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> Result<()> {
        let sig = ed25519_dalek::Signature::from_bytes(signature);
        self.signing_key
            .verifying_key()
            .verify(message, &sig)
            .map_err(|_| Error::Crypto("ephemeral signature verification failed".to_string()))
    }
}

impl std::fmt::Debug for EphemeralIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralIdentity")
            .field("public_key", &hex::encode(self.public_key_bytes()))
            .field("max_epoch", &self.max_epoch)
            .finish()
    }
}

/// The protocol nonce function: H(public key, max epoch, randomness),
/// truncated and base64url-encoded without padding.
pub fn login_nonce(public_key: &VerifyingKey, max_epoch: u64, randomness: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(public_key.as_bytes());
    hasher.update(max_epoch.to_le_bytes());
    hasher.update(randomness.as_bytes());
    let digest = hasher.finalize();
    URL_SAFE_NO_PAD.encode(&digest[..NONCE_LENGTH])
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use crate::ledger::{ExecutionReceipt, FileRecord};
    use crate::types::{Address, ObjectId};

    fn test_rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(7)
    }

    struct FixedEpochLedger(u64);

    #[async_trait]
    impl LedgerClient for FixedEpochLedger {
        async fn current_epoch(&self) -> Result<u64> {
            Ok(self.0)
        }

        async fn execute_transaction(
            &self,
            _tx_bytes: &[u8],
            _signature: &str,
        ) -> Result<ExecutionReceipt> {
            Err(Error::LedgerRejected("not available in this test".to_string()))
        }

        async fn get_file_record(&self, _object: &ObjectId) -> Result<FileRecord> {
            Err(Error::Storage("not available in this test".to_string()))
        }

        async fn list_file_records(
            &self,
            _owner: &Address,
        ) -> Result<Vec<(ObjectId, FileRecord)>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_begin_bounds_validity_to_the_current_epoch() {
        let ledger = FixedEpochLedger(10);
        let (identity, nonce) = EphemeralIdentity::begin(&ledger).await.unwrap();

        assert_eq!(identity.max_epoch, 10 + EPOCH_VALIDITY_BUFFER);
        assert_eq!(nonce, identity.login_nonce());
    }

    #[test]
    fn test_stored_roundtrip_preserves_key() {
        let identity = EphemeralIdentity::generate(&mut test_rng(), 42);
        let nonce = identity.login_nonce();
        let stored = identity.to_stored(&nonce);
        let restored = EphemeralIdentity::from_stored(&stored);

        assert_eq!(identity.public_key_bytes(), restored.public_key_bytes());
        assert_eq!(restored.max_epoch, 42);
        assert_eq!(restored.login_nonce(), nonce);
    }

    #[test]
    fn test_nonce_binds_all_inputs() {
        let identity = EphemeralIdentity::generate(&mut test_rng(), 10);
        let base = identity.login_nonce();

        let mut other_epoch = EphemeralIdentity::generate(&mut test_rng(), 11);
        other_epoch.randomness = identity.randomness.clone();
        assert_ne!(base, other_epoch.login_nonce());

        let mut other_randomness = EphemeralIdentity::generate(&mut test_rng(), 10);
        other_randomness.randomness = "deadbeefdeadbeefdeadbeefdeadbeef".to_string();
        assert_ne!(base, other_randomness.login_nonce());
    }

    #[test]
    fn test_sign_verify() {
        let identity = EphemeralIdentity::generate(&mut test_rng(), 1);
        let sig = identity.sign(b"tx bytes");
        identity.verify(b"tx bytes", &sig).unwrap();
        assert!(identity.verify(b"other bytes", &sig).is_err());
    }

    #[test]
    fn test_extended_public_key_has_scheme_flag() {
        let identity = EphemeralIdentity::generate(&mut test_rng(), 1);
        let decoded = STANDARD.decode(identity.extended_public_key_base64()).unwrap();
        assert_eq!(decoded.len(), 33);
        assert_eq!(decoded[0], ED25519_SCHEME_FLAG);
        assert_eq!(&decoded[1..], identity.public_key_bytes());
    }
}
