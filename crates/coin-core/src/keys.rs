use std::fmt;
use std::str::FromStr;

use rand_core::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CoinError;

/// A 32-byte secp256k1 private key that is zeroed when dropped.
///
/// Drivers borrow keys only for the duration of a sign call; any library key
/// objects built from these bytes are erased before sign returns.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; 32]);

impl PrivateKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parses 64 hex characters, with or without a `0x` prefix.
    pub fn from_hex(hex_str: &str) -> Result<Self, CoinError> {
        let hex_str = hex_str
            .strip_prefix("0x")
            .or_else(|| hex_str.strip_prefix("0X"))
            .unwrap_or(hex_str);

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex_str, &mut bytes)
            .map_err(|e| CoinError::InvalidKey(format!("expected 32 hex-encoded bytes: {e}")))?;
        Ok(Self(bytes))
    }

    /// Draws a uniformly random valid secp256k1 scalar from the OS RNG.
    pub fn generate() -> Self {
        let secret = k256::SecretKey::random(&mut OsRng);
        let mut bytes: [u8; 32] = secret.to_bytes().into();
        let key = Self(bytes);
        bytes.zeroize();
        key
    }

    pub fn expose_secret(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex of the key bytes, without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// A private key together with the address it controls on one chain.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret: PrivateKey,
    pub address: String,
}

impl FromStr for PrivateKey {
    type Err = CoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Returns the first key whose derived address equals `target`.
///
/// `derive` maps a key to an address under the chain's addressing scheme.
/// `Ok(None)` means no key matched; signers turn that into
/// [`CoinError::NoMatchingKey`]. Derivation failures are propagated.
pub fn select_key<'k, A, F>(
    target: &A,
    keys: &'k [PrivateKey],
    mut derive: F,
) -> Result<Option<&'k PrivateKey>, CoinError>
where
    A: PartialEq,
    F: FnMut(&PrivateKey) -> Result<A, CoinError>,
{
    for key in keys {
        if derive(key)? == *target {
            return Ok(Some(key));
        }
    }
    Ok(None)
}
