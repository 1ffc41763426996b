//! Canonical session field schema
//!
//! Each field is independently settable and clearable. Plain strings are
//! stored verbatim; structured values go through a JSON envelope.

use lumen_core::{IdentityProof, Session, StoredEphemeral};
use tracing::warn;

use crate::store::SessionStore;

/// The persisted session fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionField {
    EphemeralSecretKey,
    Randomness,
    Nonce,
    ZkProof,
    MaxEpoch,
    IdToken,
}

impl SessionField {
    pub const ALL: [SessionField; 6] = [
        SessionField::EphemeralSecretKey,
        SessionField::Randomness,
        SessionField::Nonce,
        SessionField::ZkProof,
        SessionField::MaxEpoch,
        SessionField::IdToken,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            SessionField::EphemeralSecretKey => "ephemeral_secret_key",
            SessionField::Randomness => "randomness",
            SessionField::Nonce => "nonce",
            SessionField::ZkProof => "zk_proof",
            SessionField::MaxEpoch => "max_epoch",
            SessionField::IdToken => "id_token",
        }
    }
}

/// Persist a whole session. Absent parts clear their fields so a partially
/// reset session never leaves stale values behind.
pub fn save_session(store: &dyn SessionStore, session: &Session) {
    match &session.ephemeral {
        Some(ephemeral) => {
            store.set(
                SessionField::EphemeralSecretKey.key(),
                &hex::encode(ephemeral.secret_key),
            );
            store.set(SessionField::Randomness.key(), &ephemeral.randomness);
            store.set(SessionField::Nonce.key(), &ephemeral.nonce);
            store.set(SessionField::MaxEpoch.key(), &ephemeral.max_epoch.to_string());
        }
        None => {
            store.clear(SessionField::EphemeralSecretKey.key());
            store.clear(SessionField::Randomness.key());
            store.clear(SessionField::Nonce.key());
            store.clear(SessionField::MaxEpoch.key());
        }
    }

    match &session.proof {
        Some(proof) => match serde_json::to_string(proof) {
            Ok(json) => store.set(SessionField::ZkProof.key(), &json),
            Err(e) => warn!("failed to serialize proof for storage: {}", e),
        },
        None => store.clear(SessionField::ZkProof.key()),
    }

    match &session.id_token {
        Some(token) => store.set(SessionField::IdToken.key(), token),
        None => store.clear(SessionField::IdToken.key()),
    }
}

/// Load whatever session state the store holds. Unparseable fields are
/// treated as absent, so a corrupted entry degrades to "session not
/// started" instead of wedging the login flow.
pub fn load_session(store: &dyn SessionStore) -> Session {
    let ephemeral = load_ephemeral(store);
    let proof = store
        .get(SessionField::ZkProof.key())
        .and_then(|json| match serde_json::from_str::<IdentityProof>(&json) {
            Ok(proof) => Some(proof),
            Err(e) => {
                warn!("stored proof is unreadable, treating as absent: {}", e);
                None
            }
        });
    let id_token = store.get(SessionField::IdToken.key());

    Session {
        ephemeral,
        proof,
        id_token,
    }
}

fn load_ephemeral(store: &dyn SessionStore) -> Option<StoredEphemeral> {
    let secret_hex = store.get(SessionField::EphemeralSecretKey.key())?;
    let randomness = store.get(SessionField::Randomness.key())?;
    let nonce = store.get(SessionField::Nonce.key())?;
    let max_epoch = store
        .get(SessionField::MaxEpoch.key())?
        .parse::<u64>()
        .ok()?;

    let mut secret_key = [0u8; 32];
    if hex::decode_to_slice(&secret_hex, &mut secret_key).is_err() {
        warn!("stored ephemeral key is unreadable, treating as absent");
        return None;
    }

    Some(StoredEphemeral {
        secret_key,
        randomness,
        nonce,
        max_epoch,
    })
}

/// Clear every session field
pub fn clear_session(store: &dyn SessionStore) {
    for field in SessionField::ALL {
        store.clear(field.key());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySessionStore;
    use lumen_core::ephemeral::EphemeralIdentity;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn session_with_identity() -> Session {
        let identity = EphemeralIdentity::generate(&mut ChaCha20Rng::seed_from_u64(3), 17);
        let nonce = identity.login_nonce();
        Session {
            ephemeral: Some(identity.to_stored(&nonce)),
            proof: None,
            id_token: Some("header.payload.sig".to_string()),
        }
    }

    #[test]
    fn test_save_load_roundtrip() {
        let store = MemorySessionStore::new();
        let session = session_with_identity();
        save_session(&store, &session);

        let loaded = load_session(&store);
        let original = session.ephemeral.as_ref().unwrap();
        let restored = loaded.ephemeral.as_ref().unwrap();
        assert_eq!(restored.secret_key, original.secret_key);
        assert_eq!(restored.nonce, original.nonce);
        assert_eq!(restored.max_epoch, 17);
        assert_eq!(loaded.id_token.as_deref(), Some("header.payload.sig"));
        assert!(loaded.proof.is_none());
    }

    #[test]
    fn test_fields_independently_clearable() {
        let store = MemorySessionStore::new();
        save_session(&store, &session_with_identity());

        store.clear(SessionField::Nonce.key());
        // A missing component makes the whole ephemeral identity absent
        assert!(load_session(&store).ephemeral.is_none());
        // But the token field is untouched
        assert!(load_session(&store).id_token.is_some());
    }

    #[test]
    fn test_corrupt_field_degrades_to_absent() {
        let store = MemorySessionStore::new();
        save_session(&store, &session_with_identity());

        store.set(SessionField::EphemeralSecretKey.key(), "not-hex");
        assert!(load_session(&store).ephemeral.is_none());

        store.set(SessionField::ZkProof.key(), "{broken json");
        assert!(load_session(&store).proof.is_none());
    }

    #[test]
    fn test_clear_session_removes_everything() {
        let store = MemorySessionStore::new();
        save_session(&store, &session_with_identity());
        clear_session(&store);
        for field in SessionField::ALL {
            assert_eq!(store.get(field.key()), None);
        }
    }
}
