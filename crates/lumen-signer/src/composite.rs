//! Composite signature envelope
//!
//! What the ledger verifies: the zero-knowledge proof material, the address
//! seed commitment, the validity ceiling, and the ephemeral signature over
//! the transaction bytes, packed into one base64 string.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use lumen_core::{Error, IdentityProof, IssuerDetails, ProofPoints, Result};
use serde::{Deserialize, Serialize};

/// The full signature submitted alongside transaction bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeSignature {
    pub proof_points: ProofPoints,
    pub iss_base64_details: IssuerDetails,
    pub header_base64: String,
    /// Hex commitment of the derived address seed
    pub address_seed: String,
    /// Last epoch at which the ephemeral signature is acceptable
    pub max_epoch: u64,
    /// Ephemeral ed25519 signature over the transaction bytes
    pub user_signature: Vec<u8>,
    /// Ephemeral public key the ledger verifies `user_signature` against
    pub ephemeral_public_key: Vec<u8>,
}

impl CompositeSignature {
    pub fn new(
        proof: &IdentityProof,
        address_seed: String,
        max_epoch: u64,
        user_signature: [u8; 64],
        ephemeral_public_key: [u8; 32],
    ) -> Self {
        Self {
            proof_points: proof.proof_points.clone(),
            iss_base64_details: proof.iss_base64_details.clone(),
            header_base64: proof.header_base64.clone(),
            address_seed,
            max_epoch,
            user_signature: user_signature.to_vec(),
            ephemeral_public_key: ephemeral_public_key.to_vec(),
        }
    }

    /// Wire form: bincode then base64
    pub fn encode(&self) -> Result<String> {
        let bytes =
            bincode::serialize(self).map_err(|e| Error::Crypto(format!("encode signature: {}", e)))?;
        Ok(STANDARD.encode(bytes))
    }

    pub fn decode(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| Error::Crypto(format!("signature is not base64: {}", e)))?;
        bincode::deserialize(&bytes).map_err(|e| Error::Crypto(format!("decode signature: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> CompositeSignature {
        CompositeSignature {
            proof_points: ProofPoints {
                a: vec!["1".into(), "2".into(), "3".into()],
                b: vec![vec!["4".into(), "5".into()]],
                c: vec!["6".into(), "7".into()],
            },
            iss_base64_details: IssuerDetails {
                value: "https://issuer.example.com".into(),
                index_mod4: 1,
            },
            header_base64: "hdr".into(),
            address_seed: "ab".repeat(32),
            max_epoch: 12,
            user_signature: vec![9u8; 64],
            ephemeral_public_key: vec![7u8; 32],
        }
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let sig = fixture();
        let encoded = sig.encode().unwrap();
        assert_eq!(CompositeSignature::decode(&encoded).unwrap(), sig);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(CompositeSignature::decode("not base64 !!!").is_err());
        assert!(CompositeSignature::decode("AAAA").is_err());
    }
}
