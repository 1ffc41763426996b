//! Lumen Signer - transaction model and composite-signature composer
//!
//! The ledger accepts a transaction only when its byte string is accompanied
//! by a composite signature: the identity proof, the address-seed
//! commitment, the validity ceiling, and an ephemeral signature over the
//! bytes. This crate owns that assembly.

pub mod composer;
pub mod composite;
pub mod tx;

pub use composer::sign_and_execute;
pub use composite::CompositeSignature;
pub use tx::{TransactionKind, UnsignedTransaction};
