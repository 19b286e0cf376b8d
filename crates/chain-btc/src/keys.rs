use bitcoin::secp256k1::SecretKey;
use coin_core::PrivateKey;

use crate::error::BtcError;

/// Build a secp256k1 secret key from `key`.
///
/// The returned value is not zeroed on drop; prefer [`with_secret_key`] or
/// [`SecretKeys`], which erase it.
fn secret_key(key: &PrivateKey) -> Result<SecretKey, BtcError> {
    SecretKey::from_slice(key.expose_secret())
        .map_err(|e| BtcError::InvalidPrivateKey(format!("invalid secret key: {e}")))
}

/// Run `f` with a secret key built from `key`, erasing it afterwards.
pub(crate) fn with_secret_key<T>(
    key: &PrivateKey,
    f: impl FnOnce(&SecretKey) -> Result<T, BtcError>,
) -> Result<T, BtcError> {
    let mut secret = secret_key(key)?;
    let result = f(&secret);
    secret.non_secure_erase();
    result
}

/// Per-input signing keys, erased when dropped (including on early return).
pub(crate) struct SecretKeys(Vec<SecretKey>);

impl SecretKeys {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub(crate) fn push(&mut self, key: &PrivateKey) -> Result<(), BtcError> {
        self.0.push(secret_key(key)?);
        Ok(())
    }

    pub(crate) fn as_slice(&self) -> &[SecretKey] {
        &self.0
    }
}

impl Drop for SecretKeys {
    fn drop(&mut self) {
        for key in &mut self.0 {
            key.non_secure_erase();
        }
    }
}
