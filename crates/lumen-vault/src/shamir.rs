//! Shamir secret sharing over the curve25519 scalar field
//!
//! The data-encryption key is a scalar split into one share per key server.
//! Any `threshold` shares reconstruct it exactly; fewer interpolate a
//! different scalar, so partial collusion learns nothing about the key.

use curve25519_dalek::scalar::Scalar;
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use lumen_core::{Error, Result};

/// f(x) = a_0 + a_1 x + ... + a_{t-1} x^{t-1}, with the secret at a_0
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretPolynomial {
    coefficients: Vec<Scalar>,
}

impl SecretPolynomial {
    pub fn from_secret<R: RngCore + CryptoRng>(
        secret: Scalar,
        threshold: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if threshold == 0 {
            return Err(Error::Crypto("threshold must be at least 1".to_string()));
        }
        let mut coefficients = vec![secret];
        for _ in 1..threshold {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            coefficients.push(Scalar::from_bytes_mod_order(bytes));
        }
        Ok(Self { coefficients })
    }

    /// Horner evaluation
    pub fn evaluate(&self, x: Scalar) -> Scalar {
        let mut result = Scalar::ZERO;
        for coeff in self.coefficients.iter().rev() {
            result = result * x + coeff;
        }
        result
    }
}

/// One server's share: the polynomial evaluated at a nonzero index
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyShare {
    /// 1-based share index; x = 0 would hand out the secret itself
    pub index: u8,
    pub value: Scalar,
}

impl KeyShare {
    pub fn to_bytes(&self) -> [u8; 33] {
        let mut out = [0u8; 33];
        out[0] = self.index;
        out[1..].copy_from_slice(self.value.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 33 || bytes[0] == 0 {
            return Err(Error::Crypto("malformed key share".to_string()));
        }
        let mut value = [0u8; 32];
        value.copy_from_slice(&bytes[1..]);
        let value = Option::<Scalar>::from(Scalar::from_canonical_bytes(value))
            .ok_or_else(|| Error::Crypto("share value is not a canonical scalar".to_string()))?;
        Ok(Self {
            index: bytes[0],
            value,
        })
    }
}

/// Split a secret into `count` shares with reconstruction threshold
/// `threshold`. Shares use indexes 1..=count.
pub fn split_secret<R: RngCore + CryptoRng>(
    secret: Scalar,
    threshold: usize,
    count: usize,
    rng: &mut R,
) -> Result<Vec<KeyShare>> {
    if threshold > count {
        return Err(Error::Crypto(format!(
            "threshold {} exceeds share count {}",
            threshold, count
        )));
    }
    if count > u8::MAX as usize {
        return Err(Error::Crypto("too many shares".to_string()));
    }
    let poly = SecretPolynomial::from_secret(secret, threshold, rng)?;
    Ok((1..=count as u8)
        .map(|index| KeyShare {
            index,
            value: poly.evaluate(Scalar::from(index as u64)),
        })
        .collect())
}

/// Lagrange interpolation at x = 0.
///
/// The caller enforces the threshold; this function reconstructs from
/// whatever it is given, and with too few shares the result is simply a
/// different scalar (the AEAD tag check downstream catches it).
pub fn reconstruct_secret(shares: &[KeyShare]) -> Result<Scalar> {
    if shares.is_empty() {
        return Err(Error::Crypto(
            "cannot reconstruct from zero shares".to_string(),
        ));
    }
    for (i, share) in shares.iter().enumerate() {
        if shares[..i].iter().any(|s| s.index == share.index) {
            return Err(Error::Crypto(format!(
                "duplicate share index {}",
                share.index
            )));
        }
    }

    let mut result = Scalar::ZERO;
    for (i, share_i) in shares.iter().enumerate() {
        let x_i = Scalar::from(share_i.index as u64);
        let mut basis = Scalar::ONE;
        for (j, share_j) in shares.iter().enumerate() {
            if i != j {
                let x_j = Scalar::from(share_j.index as u64);
                // L_i(0) *= -x_j / (x_i - x_j)
                basis *= -x_j * (x_i - x_j).invert();
            }
        }
        result += share_i.value * basis;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(99)
    }

    #[test]
    fn test_threshold_shares_reconstruct() {
        let secret = Scalar::from(424242u64);
        let shares = split_secret(secret, 2, 3, &mut rng()).unwrap();

        // Any 2 of 3 recover the secret
        for pair in [[0, 1], [0, 2], [1, 2]] {
            let subset = [shares[pair[0]], shares[pair[1]]];
            assert_eq!(reconstruct_secret(&subset).unwrap(), secret);
        }
    }

    #[test]
    fn test_below_threshold_reconstructs_wrong_scalar() {
        let secret = Scalar::from(7u64);
        let shares = split_secret(secret, 2, 3, &mut rng()).unwrap();
        let one = [shares[0]];
        assert_ne!(reconstruct_secret(&one).unwrap(), secret);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let secret = Scalar::from(1u64);
        assert!(split_secret(secret, 3, 2, &mut rng()).is_err());
        assert!(split_secret(secret, 0, 2, &mut rng()).is_err());
        assert!(reconstruct_secret(&[]).is_err());
    }

    #[test]
    fn test_duplicate_indexes_rejected() {
        let shares = split_secret(Scalar::from(5u64), 2, 3, &mut rng()).unwrap();
        let dup = [shares[0], shares[0]];
        assert!(reconstruct_secret(&dup).is_err());
    }

    #[test]
    fn test_zeroize_clears_coefficients() {
        let mut poly = SecretPolynomial::from_secret(Scalar::from(9u64), 3, &mut rng()).unwrap();
        assert_ne!(poly.evaluate(Scalar::from(4u64)), Scalar::ZERO);
        poly.zeroize();
        // All coefficients gone, so the polynomial is identically zero
        assert_eq!(poly.evaluate(Scalar::from(4u64)), Scalar::ZERO);
        assert_eq!(poly.evaluate(Scalar::ZERO), Scalar::ZERO);
    }

    #[test]
    fn test_share_byte_roundtrip() {
        let shares = split_secret(Scalar::from(11u64), 2, 2, &mut rng()).unwrap();
        for share in shares {
            let restored = KeyShare::from_bytes(&share.to_bytes()).unwrap();
            assert_eq!(restored, share);
        }
        assert!(KeyShare::from_bytes(&[0u8; 33]).is_err());
        assert!(KeyShare::from_bytes(&[1u8; 10]).is_err());
    }
}
