use async_trait::async_trait;

use crate::error::CoinError;
use crate::keys::{KeyPair, PrivateKey};
use crate::staged::{SignedTransaction, StagedTransaction};
use crate::transaction::Transaction;

/// The three-phase pipeline every ledger model implements.
///
/// A transfer moves strictly forward through `Transaction` (built) →
/// [`StagedTransaction`] (packed) → [`SignedTransaction`] (signed) → txid
/// (sent). Failed phases yield nothing usable; retrying is up to the caller.
#[async_trait]
pub trait ChainDriver: Send + Sync {
    /// Short identifier used in logs, e.g. `"bitcoin"`.
    fn name(&self) -> &'static str;

    /// Gathers the chain state needed to make `transaction` spendable.
    ///
    /// Talks to the network but never needs a private key.
    async fn pack(&self, transaction: Transaction) -> Result<StagedTransaction, CoinError>;

    /// Produces the signed wire payload.
    ///
    /// Pure computation over `staged` and `keys`: no network access, safe to
    /// run on an offline machine. Key material is not retained.
    fn sign(
        &self,
        staged: &StagedTransaction,
        keys: &[PrivateKey],
    ) -> Result<SignedTransaction, CoinError>;

    /// Broadcasts a signed transaction and returns its identifier.
    async fn send(&self, signed: &SignedTransaction) -> Result<String, CoinError>;

    /// The address `key` controls under this chain's default address type.
    fn address_for_key(&self, key: &PrivateKey) -> Result<String, CoinError>;

    /// Pairs `secret` with the address it controls.
    fn key_pair(&self, secret: PrivateKey) -> Result<KeyPair, CoinError> {
        let address = self.address_for_key(&secret)?;
        Ok(KeyPair { secret, address })
    }

    /// A fresh random key and its address.
    fn generate_key_pair(&self) -> Result<KeyPair, CoinError> {
        self.key_pair(PrivateKey::generate())
    }
}
