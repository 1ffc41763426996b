#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lumen_vault::{EncryptedObject, WrappedShare, ENVELOPE_VERSION};

#[derive(Arbitrary, Debug)]
struct ShareParts {
    server_id: String,
    ephemeral_public_key: [u8; 32],
    nonce: [u8; 12],
    ciphertext: Vec<u8>,
}

#[derive(Arbitrary, Debug)]
struct EnvelopeParts {
    version: u8,
    file_id: Vec<u8>,
    threshold: u8,
    shares: Vec<ShareParts>,
    payload_nonce: [u8; 12],
    ciphertext: Vec<u8>,
}

fuzz_target!(|parts: EnvelopeParts| {
    let object = EncryptedObject {
        version: parts.version,
        file_id: parts.file_id,
        threshold: parts.threshold,
        wrapped_shares: parts
            .shares
            .into_iter()
            .map(|s| WrappedShare {
                server_id: s.server_id,
                ephemeral_public_key: s.ephemeral_public_key,
                nonce: s.nonce,
                ciphertext: s.ciphertext,
            })
            .collect(),
        payload_nonce: parts.payload_nonce,
        ciphertext: parts.ciphertext,
    };

    // Structurally valid envelopes always encode; decode inverts encode
    // exactly when the version is current
    let bytes = object.encode().unwrap();
    match EncryptedObject::decode(&bytes) {
        Ok(decoded) => {
            assert_eq!(decoded, object);
            assert_eq!(object.version, ENVELOPE_VERSION);
        }
        Err(_) => assert_ne!(object.version, ENVELOPE_VERSION),
    }
});
