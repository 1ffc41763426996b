//! Transaction model
//!
//! Transactions are assembled unsigned, given a sender, then serialized to
//! the byte string the ephemeral key signs. The encoding is bincode and must
//! stay stable: the ledger verifies the signature over exactly these bytes.

use lumen_core::{Address, BlobId, Error, ObjectId, Result};
use serde::{Deserialize, Serialize};

/// What a transaction does on the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Move tokens to another address
    TransferToken { recipient: Address, amount: u64 },
    /// Register an encrypted file against the vault registry
    RegisterFile {
        policy_package: ObjectId,
        registry: ObjectId,
        filename: String,
        mimetype: String,
        size: u64,
        blob_id: BlobId,
        allowed_addresses: Vec<Address>,
    },
    /// Evaluate decryption access for a file id under the vault policy.
    /// Never executed - key servers dry-run it to authorize share release.
    AccessCheck {
        policy_package: ObjectId,
        file_id: Vec<u8>,
    },
}

/// A transaction before signing. The sender stays unset until the composer
/// binds it to the derived user address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub sender: Option<Address>,
    pub kind: TransactionKind,
}

impl UnsignedTransaction {
    pub fn new(kind: TransactionKind) -> Self {
        Self { sender: None, kind }
    }

    pub fn with_sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    /// The exact bytes the ephemeral key signs and the ledger executes.
    /// A transaction without a sender cannot be signed.
    pub fn to_signing_bytes(&self) -> Result<Vec<u8>> {
        let sender = self
            .sender
            .ok_or_else(|| Error::InvalidTransaction("sender not set".to_string()))?;
        bincode::serialize(&(sender, &self.kind))
            .map_err(|e| Error::InvalidTransaction(e.to_string()))
    }

    /// Sender-less encoding of the transaction body, used for access-check
    /// dry runs where the evaluating party supplies its own context.
    pub fn to_kind_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(&self.kind).map_err(|e| Error::InvalidTransaction(e.to_string()))
    }
}
