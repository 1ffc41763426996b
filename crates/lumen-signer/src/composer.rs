//! Signing pipeline
//!
//! Turns a sender-less transaction plus a completed login session into an
//! executed ledger transaction. All preconditions are checked before any
//! network traffic; each missing ingredient reports its own error so the
//! UI can tell "enter your PIN" apart from "log in again".

use lumen_core::{
    derive_address_seed, Address, DecodedJwt, EphemeralIdentity, ExecutionReceipt, LedgerClient,
    Pin, Result, Session,
};
use tracing::{debug, info};

use crate::composite::CompositeSignature;
use crate::tx::UnsignedTransaction;

/// Sign `tx` with the session's ephemeral identity and submit it.
///
/// Submission is at-most-once: nothing here retries, and resubmitting
/// identical bytes after a ledger-side failure is unsafe, so a caller-level
/// retry needs a freshly built transaction.
pub async fn sign_and_execute(
    ledger: &dyn LedgerClient,
    tx: UnsignedTransaction,
    session: &Session,
    pin: &str,
    user_address: Address,
) -> Result<ExecutionReceipt> {
    // Preconditions, before any network call
    let pin = Pin::new(pin)?;
    let stored = session.ephemeral()?;
    let proof = session.proof()?;

    // 1. Reconstruct the ephemeral keypair from the stored secret
    let identity = EphemeralIdentity::from_stored(stored);

    // 2. Bind the transaction to the derived user address
    let tx = tx.with_sender(user_address);
    let tx_bytes = tx.to_signing_bytes()?;

    // 3. Sign the transaction bytes with the ephemeral key
    let user_signature = identity.sign(&tx_bytes);

    // 4. Decode the JWT; subject and audience must be present
    let jwt = DecodedJwt::parse(session.id_token()?)?;
    let subject = jwt.claims.subject()?;
    let audience = jwt.claims.normalized_audience()?;

    // 5. Recompute the secret address seed
    let seed = derive_address_seed(&pin, subject, audience);

    // 6. Assemble the composite signature
    let signature = CompositeSignature::new(
        proof,
        seed.to_hex(),
        identity.max_epoch,
        user_signature,
        identity.public_key_bytes(),
    );
    let encoded = signature.encode()?;
    debug!(
        sender = %user_address.short(),
        max_epoch = identity.max_epoch,
        "composite signature assembled"
    );

    // 7. Submit; the only network mutation in the pipeline
    let receipt = ledger.execute_transaction(&tx_bytes, &encoded).await?;
    info!(digest = %receipt.digest, "transaction executed");
    Ok(receipt)
}
