//! Lumen Vault - threshold-encrypted blob storage
//!
//! Files are sealed under a fresh data-encryption key, the key is
//! Shamir-split across a key-server set, and the registration lives
//! on-chain as a policy object signed with the same ephemeral identity the
//! wallet logs in with. Download reverses the path: registration record,
//! blob fetch, session-key handshake, threshold share collection,
//! reconstruction, decrypt.

pub mod blob;
pub mod config;
pub mod keyserver;
pub mod seal;
pub mod session_key;
pub mod shamir;

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use lumen_core::{
    Address, BlobId, EphemeralIdentity, Error, FileRecord, LedgerClient, ObjectId, Result, Session,
};
use lumen_signer::{sign_and_execute, TransactionKind, UnsignedTransaction};

pub use blob::{BlobStore, HttpBlobStore};
pub use config::{KeyServerEntry, VaultConfig};
pub use keyserver::{fetch_key_shares, HttpKeyServer, KeyServer, ShareRequest};
pub use seal::{EncryptedObject, WrappedShare, ENVELOPE_VERSION};
pub use session_key::{SessionKey, SessionKeyCache};

/// A completed upload: the on-chain registration and the stored blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub object: ObjectId,
    pub blob_id: BlobId,
}

/// Client tying the ledger, blob store, and key servers together
pub struct VaultClient {
    config: VaultConfig,
    ledger: Arc<dyn LedgerClient>,
    blob: Arc<dyn BlobStore>,
    key_servers: Vec<Arc<dyn KeyServer>>,
    session_keys: SessionKeyCache,
}

impl VaultClient {
    pub fn new(
        config: VaultConfig,
        ledger: Arc<dyn LedgerClient>,
        blob: Arc<dyn BlobStore>,
        key_servers: Vec<Arc<dyn KeyServer>>,
    ) -> Self {
        Self {
            config,
            ledger,
            blob,
            key_servers,
            session_keys: SessionKeyCache::new(),
        }
    }

    /// Build a client whose blob store and key servers come from the
    /// configuration's URLs.
    pub fn from_config(config: VaultConfig, ledger: Arc<dyn LedgerClient>) -> Result<Self> {
        let blob: Arc<dyn BlobStore> = Arc::new(HttpBlobStore::new(
            config.publisher_url.clone(),
            config.aggregator_url.clone(),
        )?);
        let key_servers = config
            .key_servers
            .iter()
            .map(|s| {
                Ok(Arc::new(HttpKeyServer::new(s.id.clone(), s.url.clone())?)
                    as Arc<dyn KeyServer>)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(config, ledger, blob, key_servers))
    }

    /// Encrypt, store, then register a file.
    ///
    /// Order matters: the blob must exist before the on-chain record points
    /// at it. Encryption or upload failure leaves no partial state; a
    /// registration failure leaves an unreferenced blob that simply expires.
    pub async fn upload(
        &self,
        data: &[u8],
        filename: &str,
        mimetype: &str,
        allowed: Vec<Address>,
        session: &Session,
        pin: &str,
        user_address: Address,
    ) -> Result<FileHandle> {
        let object = seal::seal(
            data,
            &self.config.registry_object,
            &self.config.server_publics(),
            self.config.threshold,
            &mut rand::rngs::OsRng,
        )?;
        let encoded = object.encode()?;
        let size = encoded.len() as u64;

        let blob_id = self.blob.put(encoded, self.config.blob_epochs).await?;
        debug!(%blob_id, size, "blob stored");

        let allowed = effective_allowed(allowed, user_address);
        let tx = UnsignedTransaction::new(TransactionKind::RegisterFile {
            policy_package: self.config.policy_package,
            registry: self.config.registry_object,
            filename: filename.to_string(),
            mimetype: mimetype.to_string(),
            size,
            blob_id: blob_id.clone(),
            allowed_addresses: allowed,
        });
        let receipt = sign_and_execute(self.ledger.as_ref(), tx, session, pin, user_address).await?;
        let object = receipt
            .created_objects
            .first()
            .copied()
            .ok_or_else(|| Error::LedgerRejected("registration created no object".to_string()))?;

        info!(%blob_id, object = %object, "file registered");
        Ok(FileHandle { object, blob_id })
    }

    /// Fetch and decrypt a registered file.
    ///
    /// Any failure before the final decrypt yields no plaintext at all;
    /// there is no partial output path.
    pub async fn download(
        &self,
        file_object: &ObjectId,
        session: &Session,
        user_address: Address,
    ) -> Result<Vec<u8>> {
        let record = self.ledger.get_file_record(file_object).await?;
        if !record.allows(&user_address) {
            return Err(Error::Storage(format!(
                "address {} is not allowed to read this file",
                user_address.short()
            )));
        }

        let bytes = self.blob.get(&record.blob_id).await?;
        let object = EncryptedObject::decode(&bytes)?;

        let identity = EphemeralIdentity::from_stored(session.ephemeral()?);
        let session_key = self
            .session_keys
            .get_or_mint(
                &identity,
                user_address,
                self.config.policy_package,
                Utc::now(),
            )
            .await?;

        let access_tx = UnsignedTransaction::new(TransactionKind::AccessCheck {
            policy_package: self.config.policy_package,
            file_id: object.file_id.clone(),
        })
        .to_kind_bytes()?;

        let shares =
            fetch_key_shares(&self.key_servers, &object, &access_tx, &session_key).await?;
        seal::open(&object, &shares)
    }

    /// Registration records owned by an address
    pub async fn list_files(&self, owner: &Address) -> Result<Vec<(ObjectId, FileRecord)>> {
        self.ledger.list_file_records(owner).await
    }
}

/// An empty allow-list means "only the uploader"
fn effective_allowed(allowed: Vec<Address>, sender: Address) -> Vec<Address> {
    if allowed.is_empty() {
        vec![sender]
    } else {
        allowed
    }
}
