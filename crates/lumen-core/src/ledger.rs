//! Ledger client seam
//!
//! The ledger itself (consensus, execution, indexing) is an external
//! collaborator; this trait is the only surface the wallet needs from it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Address, BlobId, ObjectId, TxDigest};

/// Outcome of a successfully executed transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReceipt {
    pub digest: TxDigest,
    /// Objects the transaction created, in creation order
    pub created_objects: Vec<ObjectId>,
}

/// On-chain file registration record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub filename: String,
    pub mimetype: String,
    pub size: u64,
    pub blob_id: BlobId,
    pub owner: Address,
    pub allowed_addresses: Vec<Address>,
}

impl FileRecord {
    /// Whether the given address may decrypt this file
    pub fn allows(&self, address: &Address) -> bool {
        self.owner == *address || self.allowed_addresses.contains(address)
    }
}

/// Asynchronous ledger access. Implementations do not retry and do not
/// impose timeouts; callers own both.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current ledger epoch, used to bound ephemeral key validity
    async fn current_epoch(&self) -> Result<u64>;

    /// Submit signed transaction bytes with their composite signature.
    /// At-most-once from the wallet's perspective: resubmitting identical
    /// bytes after a failure is unsafe, so a retry needs a fresh transaction.
    async fn execute_transaction(
        &self,
        tx_bytes: &[u8],
        signature: &str,
    ) -> Result<ExecutionReceipt>;

    /// Read a file registration record
    async fn get_file_record(&self, object: &ObjectId) -> Result<FileRecord>;

    /// List file registration records owned by an address
    async fn list_file_records(&self, owner: &Address) -> Result<Vec<(ObjectId, FileRecord)>>;
}
