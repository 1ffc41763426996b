//! Shared in-process fakes for the Lumen integration tests
//!
//! The fakes are deliberately strict: the ledger verifies the ephemeral
//! signature inside every submitted composite signature, and the key
//! servers verify the session-key challenge before unwrapping anything.
//! A test passing here means the real protocol messages line up, not just
//! that the happy path was stubbed through.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use curve25519_dalek::montgomery::MontgomeryPoint;
use curve25519_dalek::scalar::Scalar;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use rand::{CryptoRng, RngCore};

use lumen_core::{
    derive_address, Address, BlobId, DecodedJwt, EphemeralIdentity, Error, ExecutionReceipt,
    FileRecord, IdentityProof, LedgerClient, ObjectId, Pin, Result, Session, TxDigest,
};
use lumen_signer::{CompositeSignature, TransactionKind};
use lumen_vault::{seal, shamir::KeyShare, BlobStore, KeyServer, ShareRequest};

/// In-memory ledger that actually verifies what it is handed
pub struct FakeLedger {
    epoch: u64,
    pub execute_calls: AtomicUsize,
    records: Mutex<HashMap<ObjectId, FileRecord>>,
    next_object: AtomicU64,
}

impl FakeLedger {
    pub fn new(epoch: u64) -> Self {
        Self {
            epoch,
            execute_calls: AtomicUsize::new(0),
            records: Mutex::new(HashMap::new()),
            next_object: AtomicU64::new(1),
        }
    }

    pub fn execute_count(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }

    fn mint_object(&self) -> ObjectId {
        let n = self.next_object.fetch_add(1, Ordering::SeqCst);
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&n.to_le_bytes());
        ObjectId::new(bytes)
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn current_epoch(&self) -> Result<u64> {
        Ok(self.epoch)
    }

    async fn execute_transaction(
        &self,
        tx_bytes: &[u8],
        signature: &str,
    ) -> Result<ExecutionReceipt> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);

        let composite = CompositeSignature::decode(signature)?;
        if composite.max_epoch < self.epoch {
            return Err(Error::LedgerRejected(format!(
                "ephemeral key expired at epoch {}",
                composite.max_epoch
            )));
        }

        let key_bytes: [u8; 32] = composite
            .ephemeral_public_key
            .as_slice()
            .try_into()
            .map_err(|_| Error::LedgerRejected("bad ephemeral public key".to_string()))?;
        let verifying_key = VerifyingKey::from_bytes(&key_bytes)
            .map_err(|_| Error::LedgerRejected("bad ephemeral public key".to_string()))?;
        let sig_bytes: [u8; 64] = composite
            .user_signature
            .as_slice()
            .try_into()
            .map_err(|_| Error::LedgerRejected("bad signature length".to_string()))?;
        verifying_key
            .verify(tx_bytes, &Signature::from_bytes(&sig_bytes))
            .map_err(|_| Error::LedgerRejected("signature verification failed".to_string()))?;

        let (sender, kind): (Address, TransactionKind) = bincode::deserialize(tx_bytes)
            .map_err(|e| Error::LedgerRejected(format!("undecodable transaction: {}", e)))?;

        let created_objects = match kind {
            TransactionKind::TransferToken { .. } => vec![],
            TransactionKind::RegisterFile {
                filename,
                mimetype,
                size,
                blob_id,
                allowed_addresses,
                ..
            } => {
                let object = self.mint_object();
                let record = FileRecord {
                    filename,
                    mimetype,
                    size,
                    blob_id,
                    owner: sender,
                    allowed_addresses,
                };
                self.records.lock().unwrap().insert(object, record);
                vec![object]
            }
            TransactionKind::AccessCheck { .. } => {
                return Err(Error::LedgerRejected(
                    "access checks are not executable".to_string(),
                ));
            }
        };

        Ok(ExecutionReceipt {
            digest: TxDigest::new(format!("digest-{}", self.execute_count())),
            created_objects,
        })
    }

    async fn get_file_record(&self, object: &ObjectId) -> Result<FileRecord> {
        self.records
            .lock()
            .unwrap()
            .get(object)
            .cloned()
            .ok_or_else(|| Error::LedgerRejected(format!("unknown object {}", object)))
    }

    async fn list_file_records(&self, owner: &Address) -> Result<Vec<(ObjectId, FileRecord)>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, record)| record.owner == *owner)
            .map(|(id, record)| (*id, record.clone()))
            .collect())
    }
}

/// In-memory blob store
#[derive(Default)]
pub struct FakeBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    next_id: AtomicU64,
}

impl FakeBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn put(&self, bytes: Vec<u8>, _epochs: u64) -> Result<BlobId> {
        let id = format!("blob-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.blobs.lock().unwrap().insert(id.clone(), bytes);
        Ok(BlobId::new(id))
    }

    async fn get(&self, blob_id: &BlobId) -> Result<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap()
            .get(blob_id.as_str())
            .cloned()
            .ok_or_else(|| Error::Storage(format!("no blob {}", blob_id)))
    }
}

/// Key server holding a real X25519 secret. Authorizes like the real one:
/// session-key signature, expiry, and the access-check transaction must all
/// line up before the share is unwrapped.
pub struct LocalKeyServer {
    id: String,
    secret: Scalar,
    healthy: AtomicBool,
}

impl LocalKeyServer {
    /// Generate a server and return it with its public key bytes
    pub fn generate<R: RngCore + CryptoRng>(id: impl Into<String>, rng: &mut R) -> (Self, [u8; 32]) {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        let secret = Scalar::from_bytes_mod_order(bytes);
        let public = MontgomeryPoint::mul_base(&secret).to_bytes();
        (
            Self {
                id: id.into(),
                secret,
                healthy: AtomicBool::new(true),
            },
            public,
        )
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyServer for LocalKeyServer {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch_share(&self, request: &ShareRequest) -> Result<KeyShare> {
        if !self.healthy.load(Ordering::SeqCst) {
            return Err(Error::Storage(format!("key server {} offline", self.id)));
        }

        let session_key = &request.session_key;
        if chrono::Utc::now() >= session_key.expires_at {
            return Err(Error::Storage("session key expired".to_string()));
        }
        let verifying_key = VerifyingKey::from_bytes(&session_key.ephemeral_public_key)
            .map_err(|_| Error::Storage("bad session public key".to_string()))?;
        let sig_bytes: [u8; 64] = session_key
            .signature
            .as_slice()
            .try_into()
            .map_err(|_| Error::Storage("bad session signature".to_string()))?;
        verifying_key
            .verify(&session_key.challenge(), &Signature::from_bytes(&sig_bytes))
            .map_err(|_| Error::Storage("session key signature invalid".to_string()))?;

        // The access-check transaction must name the same file
        let file_id =
            hex::decode(&request.file_id).map_err(|e| Error::Storage(e.to_string()))?;
        let tx_bytes = STANDARD
            .decode(&request.access_tx)
            .map_err(|e| Error::Storage(e.to_string()))?;
        let kind: TransactionKind = bincode::deserialize(&tx_bytes)
            .map_err(|e| Error::Storage(format!("undecodable access check: {}", e)))?;
        match kind {
            TransactionKind::AccessCheck { file_id: tx_file_id, .. } if tx_file_id == file_id => {}
            _ => return Err(Error::Storage("access check mismatch".to_string())),
        }

        seal::unwrap_share(&request.wrapped_share, &self.secret, &file_id)
    }
}

/// A compact JWT with an unverified signature segment, as the tests' OAuth
/// provider would mint it
pub fn fixture_token(iss: &str, sub: &str, aud: &str, nonce: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(
        r#"{{"iss":"{}","sub":"{}","aud":"{}","nonce":"{}","email":"user@example.com"}}"#,
        iss, sub, aud, nonce
    ));
    format!("{}.{}.test-signature", header, payload)
}

/// What the proof oracle would return for any request, wrapped shape
pub fn fixture_oracle_response() -> serde_json::Value {
    serde_json::json!({
        "proofPoints": {
            "a": ["11", "12", "1"],
            "b": [["21", "22"], ["23", "24"], ["1", "0"]],
            "c": ["31", "32", "1"],
        }
    })
}

pub const TEST_ISSUER: &str = "https://issuer.example.com";
pub const TEST_AUDIENCE: &str = "client-1";

/// A session that has completed the whole login flow, plus the address its
/// (token, PIN) pair derives
pub fn logged_in_session<R: RngCore + CryptoRng>(
    sub: &str,
    pin: &str,
    max_epoch: u64,
    rng: &mut R,
) -> Result<(Session, Address)> {
    let identity = EphemeralIdentity::generate(rng, max_epoch);
    let nonce = identity.login_nonce();
    let token = fixture_token(TEST_ISSUER, sub, TEST_AUDIENCE, &nonce);
    let jwt = DecodedJwt::parse(&token)?;
    let proof = IdentityProof::from_oracle_json(&fixture_oracle_response(), &jwt)?;
    let address = derive_address(&jwt.claims, &Pin::new(pin)?)?;
    let session = Session {
        ephemeral: Some(identity.to_stored(&nonce)),
        proof: Some(proof),
        id_token: Some(token),
    };
    Ok((session, address))
}
