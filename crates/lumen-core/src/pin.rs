//! User PIN and its canonical salt encoding
//!
//! The PIN is the user-held secret that turns an OAuth identity into a
//! wallet. Address derivation, seed derivation, and the proving request must
//! all consume the PIN through the *same* encoding; any divergence produces
//! signatures the ledger silently rejects. This type is that single point.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// User secret PIN
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Pin(String);

impl Pin {
    /// Create a PIN. Rejects the empty string; everything else is the
    /// user's choice.
    pub fn new(pin: impl Into<String>) -> Result<Self> {
        let pin = pin.into();
        if pin.is_empty() {
            return Err(Error::MissingPin);
        }
        Ok(Self(pin))
    }

    /// The canonical salt bytes: the PIN's UTF-8 encoding, unpadded and
    /// untransformed. Both derivation functions hash exactly these bytes.
    pub fn salt_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The salt as the proving oracle expects it: base64 of the canonical
    /// salt bytes (the oracle treats the salt as an opaque blob).
    pub fn salt_base64(&self) -> String {
        STANDARD.encode(self.salt_bytes())
    }
}

// No Display/Debug of the PIN itself.
impl std::fmt::Debug for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Pin(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pin_rejected() {
        assert!(matches!(Pin::new(""), Err(Error::MissingPin)));
    }

    #[test]
    fn test_salt_base64_encodes_salt_bytes() {
        let pin = Pin::new("111111").unwrap();
        assert_eq!(pin.salt_bytes(), b"111111");
        assert_eq!(pin.salt_base64(), "MTExMTEx");
    }

    #[test]
    fn test_debug_redacts() {
        let pin = Pin::new("424242").unwrap();
        assert_eq!(format!("{:?}", pin), "Pin(***)");
    }
}
