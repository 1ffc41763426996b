//! Envelope encryption for stored blobs
//!
//! One random data-encryption key (a curve25519 scalar) seals the payload
//! under ChaCha20-Poly1305. The key is Shamir-split and each share is
//! wrapped for exactly one key server via X25519 ECDH, then the wrapped
//! shares travel inside the encrypted object itself. The ciphertext alone
//! never reveals the key: unwrapping requires a server's secret.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use curve25519_dalek::montgomery::MontgomeryPoint;
use curve25519_dalek::scalar::Scalar;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use lumen_core::{Error, ObjectId, Result};

use crate::shamir::{self, KeyShare};

/// Random suffix appended to the registry id to form a file id
pub const FILE_NONCE_LENGTH: usize = 5;

/// Wire version written into every encoded envelope
pub const ENVELOPE_VERSION: u8 = 1;

/// A key share wrapped for one key server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedShare {
    /// Which configured server may unwrap this share
    pub server_id: String,
    /// Sender-side ephemeral X25519 public key
    pub ephemeral_public_key: [u8; 32],
    pub nonce: [u8; 12],
    pub ciphertext: Vec<u8>,
}

/// The stored blob: header, wrapped shares, sealed payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedObject {
    pub version: u8,
    /// Registry object bytes followed by a random 5-byte suffix
    pub file_id: Vec<u8>,
    pub threshold: u8,
    pub wrapped_shares: Vec<WrappedShare>,
    pub payload_nonce: [u8; 12],
    pub ciphertext: Vec<u8>,
}

impl EncryptedObject {
    /// Stable byte encoding for blob storage
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Crypto(format!("encode envelope: {}", e)))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let object: Self = bincode::deserialize(bytes)
            .map_err(|e| Error::Crypto(format!("decode envelope: {}", e)))?;
        if object.version != ENVELOPE_VERSION {
            return Err(Error::Crypto(format!(
                "unsupported envelope version {}",
                object.version
            )));
        }
        Ok(object)
    }

    /// The wrapped share addressed to a given server, if any
    pub fn share_for(&self, server_id: &str) -> Option<&WrappedShare> {
        self.wrapped_shares.iter().find(|s| s.server_id == server_id)
    }
}

/// Seal `data` for the given key-server set.
///
/// The file id is minted here: the registry object's bytes plus a fresh
/// random suffix, so every upload gets a distinct policy identity even for
/// identical content.
pub fn seal<R: RngCore + CryptoRng>(
    data: &[u8],
    registry: &ObjectId,
    servers: &[(String, [u8; 32])],
    threshold: usize,
    rng: &mut R,
) -> Result<EncryptedObject> {
    let mut file_id = registry.as_bytes().to_vec();
    let mut suffix = [0u8; FILE_NONCE_LENGTH];
    rng.fill_bytes(&mut suffix);
    file_id.extend_from_slice(&suffix);

    // Fresh data-encryption key as a scalar so it can be Shamir-split
    let mut dek_bytes = [0u8; 32];
    rng.fill_bytes(&mut dek_bytes);
    let mut dek = Scalar::from_bytes_mod_order(dek_bytes);
    dek_bytes.zeroize();

    let shares = shamir::split_secret(dek, threshold, servers.len(), rng)?;
    let wrapped_shares = shares
        .iter()
        .zip(servers)
        .map(|(share, (server_id, server_pub))| {
            wrap_share(share, server_id, server_pub, &file_id, rng)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut payload_nonce = [0u8; 12];
    rng.fill_bytes(&mut payload_nonce);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(dek.as_bytes()));
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&payload_nonce),
            Payload {
                msg: data,
                aad: &file_id,
            },
        )
        .map_err(|_| Error::Crypto("payload encryption failed".to_string()))?;
    dek.zeroize();

    Ok(EncryptedObject {
        version: ENVELOPE_VERSION,
        file_id,
        threshold: threshold as u8,
        wrapped_shares,
        payload_nonce,
        ciphertext,
    })
}

/// Open a sealed object with reconstructed key shares.
///
/// Fails closed: below-threshold share counts never reach the cipher, and
/// a wrong reconstruction fails the AEAD tag check, so no partial or
/// corrupted plaintext escapes.
pub fn open(object: &EncryptedObject, shares: &[KeyShare]) -> Result<Vec<u8>> {
    let threshold = object.threshold as usize;
    if shares.len() < threshold {
        return Err(Error::InsufficientKeyShards {
            received: shares.len(),
            threshold,
        });
    }

    let mut dek = shamir::reconstruct_secret(&shares[..threshold])?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(dek.as_bytes()));
    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(&object.payload_nonce),
            Payload {
                msg: &object.ciphertext,
                aad: &object.file_id,
            },
        )
        .map_err(|_| Error::Crypto("payload decryption failed".to_string()));
    dek.zeroize();
    plaintext
}

/// Wrap one share for one server: ephemeral X25519 ECDH, then AEAD with the
/// file id as associated data.
fn wrap_share<R: RngCore + CryptoRng>(
    share: &KeyShare,
    server_id: &str,
    server_pub: &[u8; 32],
    file_id: &[u8],
    rng: &mut R,
) -> Result<WrappedShare> {
    let mut eph_bytes = [0u8; 32];
    rng.fill_bytes(&mut eph_bytes);
    let eph_secret = Scalar::from_bytes_mod_order(eph_bytes);
    eph_bytes.zeroize();
    let eph_public = MontgomeryPoint::mul_base(&eph_secret);

    let shared = MontgomeryPoint(*server_pub) * eph_secret;
    let key = wrap_key(&shared, &eph_public.to_bytes(), server_pub);

    let mut nonce = [0u8; 12];
    rng.fill_bytes(&mut nonce);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: &share.to_bytes(),
                aad: file_id,
            },
        )
        .map_err(|_| Error::Crypto("share wrapping failed".to_string()))?;

    Ok(WrappedShare {
        server_id: server_id.to_string(),
        ephemeral_public_key: eph_public.to_bytes(),
        nonce,
        ciphertext,
    })
}

/// Server-side unwrap. The server's secret scalar recomputes the same ECDH
/// shared point the sender used.
pub fn unwrap_share(
    wrapped: &WrappedShare,
    server_secret: &Scalar,
    file_id: &[u8],
) -> Result<KeyShare> {
    let eph_public = MontgomeryPoint(wrapped.ephemeral_public_key);
    let server_pub = MontgomeryPoint::mul_base(server_secret);
    let shared = eph_public * server_secret;
    let key = wrap_key(&shared, &wrapped.ephemeral_public_key, &server_pub.to_bytes());

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(&wrapped.nonce),
            Payload {
                msg: &wrapped.ciphertext,
                aad: file_id,
            },
        )
        .map_err(|_| Error::Crypto("share unwrapping failed".to_string()))?;
    KeyShare::from_bytes(&plaintext)
}

/// Both key transcript participants bind the wrap key to the full exchange
fn wrap_key(shared: &MontgomeryPoint, eph_pub: &[u8; 32], server_pub: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(shared.as_bytes());
    hasher.update(eph_pub);
    hasher.update(server_pub);
    hasher.finalize().into()
}
