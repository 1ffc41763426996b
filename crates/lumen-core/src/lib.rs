//! Lumen Core - Shared types, key derivation, and ephemeral identity
//!
//! This crate provides the foundational types for the Lumen keyless wallet:
//! the error taxonomy, JWT handling, PIN-based address derivation, the
//! ephemeral login identity, and the canonical identity-proof shape.

pub mod derive;
pub mod ephemeral;
pub mod error;
pub mod jwt;
pub mod ledger;
pub mod pin;
pub mod proof;
pub mod session;
pub mod types;

pub use derive::{derive_address, derive_address_seed, AddressSeed};
pub use ephemeral::{login_nonce, EphemeralIdentity, StoredEphemeral};
pub use error::{Error, Result};
pub use jwt::{DecodedJwt, IssuerDetails, JwtClaims};
pub use ledger::{ExecutionReceipt, FileRecord, LedgerClient};
pub use pin::Pin;
pub use proof::{IdentityProof, ProofPoints};
pub use session::{Session, UserIdentity};
pub use types::{Address, BlobId, ObjectId, TxDigest};

/// How many epochs past the current one an ephemeral key stays valid.
/// Deliberately small: a short-lived-credential policy, not caller tunable.
pub const EPOCH_VALIDITY_BUFFER: u64 = 2;

/// Length of the derived login nonce in bytes (before base64url encoding).
pub const NONCE_LENGTH: usize = 20;

/// Claim used to bind the OAuth identity to the proof.
pub const KEY_CLAIM_NAME: &str = "sub";
