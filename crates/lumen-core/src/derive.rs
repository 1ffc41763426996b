//! Address and address-seed derivation
//!
//! Both functions are pure: identical inputs always yield identical outputs,
//! on any device. The address is public; the address seed is a secret scalar
//! recomputed at signing time and never persisted or transmitted.

use sha3::{Digest, Sha3_256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::Result;
use crate::jwt::JwtClaims;
use crate::pin::Pin;
use crate::types::Address;

const ADDRESS_DOMAIN: &[u8] = b"lumen-address-v1";
const SEED_DOMAIN: &[u8] = b"lumen-address-seed-v1";

/// Secret scalar binding (PIN, subject, audience) into the composite
/// signature. Zeroized on drop; deliberately has no serde impls.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AddressSeed([u8; 32]);

impl AddressSeed {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex form for inclusion in the signature envelope. The seed is part
    /// of the signature the ledger verifies; it is secret only in the sense
    /// that it must never be logged or stored.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for AddressSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AddressSeed(***)")
    }
}

/// Domain-separated hash over length-prefixed fields
fn hash_fields(domain: &[u8], fields: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(domain);
    for field in fields {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field);
    }
    hasher.finalize().into()
}

/// Derive the public wallet address from JWT claims and the user PIN.
///
/// Same PIN, same identity, same wallet - on any device. Changing the PIN
/// yields a different address by design.
pub fn derive_address(claims: &JwtClaims, pin: &Pin) -> Result<Address> {
    let issuer = claims.issuer()?;
    let subject = claims.subject()?;
    let audience = claims.normalized_audience()?;

    let bytes = hash_fields(
        ADDRESS_DOMAIN,
        &[
            issuer.as_bytes(),
            audience.as_bytes(),
            subject.as_bytes(),
            pin.salt_bytes(),
        ],
    );
    Ok(Address::new(bytes))
}

/// Derive the secret address seed used at signing time.
pub fn derive_address_seed(pin: &Pin, subject: &str, audience: &str) -> AddressSeed {
    let bytes = hash_fields(
        SEED_DOMAIN,
        &[
            pin.salt_bytes(),
            crate::KEY_CLAIM_NAME.as_bytes(),
            subject.as_bytes(),
            audience.as_bytes(),
        ],
    );
    AddressSeed(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::Audience;
    use proptest::prelude::*;

    fn claims(iss: &str, sub: &str, aud: &str) -> JwtClaims {
        JwtClaims {
            iss: Some(iss.to_string()),
            sub: Some(sub.to_string()),
            aud: Some(Audience::Single(aud.to_string())),
            exp: None,
            email: None,
            name: None,
            nonce: None,
        }
    }

    #[test]
    fn test_address_deterministic() {
        let c = claims("https://i", "user-1", "client-1");
        let pin = Pin::new("111111").unwrap();
        let a1 = derive_address(&c, &pin).unwrap();
        let a2 = derive_address(&c, &pin).unwrap();
        assert_eq!(a1, a2);
    }

    #[test]
    fn test_different_pin_different_address() {
        let c = claims("https://i", "user-1", "client-1");
        let a1 = derive_address(&c, &Pin::new("111111").unwrap()).unwrap();
        let a2 = derive_address(&c, &Pin::new("222222").unwrap()).unwrap();
        assert_ne!(a1, a2);
    }

    #[test]
    fn test_field_boundaries_do_not_collide() {
        // Length prefixing keeps ("ab","c") and ("a","bc") distinct
        let a1 = derive_address(&claims("i", "ab", "c"), &Pin::new("1").unwrap()).unwrap();
        let a2 = derive_address(&claims("i", "a", "bc"), &Pin::new("1").unwrap()).unwrap();
        assert_ne!(a1, a2);
    }

    #[test]
    fn test_seed_distinct_from_address_input() {
        let pin = Pin::new("111111").unwrap();
        let s1 = derive_address_seed(&pin, "user-1", "client-1");
        let s2 = derive_address_seed(&pin, "user-1", "client-2");
        assert_ne!(s1.to_hex(), s2.to_hex());
    }

    proptest! {
        // Adjacent PINs in a sampled set never collide
        #[test]
        fn prop_pin_sensitivity(pin in 0u32..999_998) {
            let c = claims("https://i", "user-1", "client-1");
            let p1 = Pin::new(format!("{:06}", pin)).unwrap();
            let p2 = Pin::new(format!("{:06}", pin + 1)).unwrap();
            let a1 = derive_address(&c, &p1).unwrap();
            let a2 = derive_address(&c, &p2).unwrap();
            prop_assert_ne!(a1, a2);
        }
    }
}
