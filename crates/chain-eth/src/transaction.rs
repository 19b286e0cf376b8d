use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_rlp::{Decodable, Encodable, RlpDecodable, RlpEncodable};
use coin_core::PrivateKey;
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};

use crate::address::{pubkey_to_eth_address, signing_key};
use crate::error::EthError;

/// An unsigned legacy (pre-typed) transaction, signed under EIP-155.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    /// Call target: the recipient, or the token contract for token transfers.
    pub to: Address,
    /// Value in wei.
    pub value: U256,
    pub data: Bytes,
}

/// A signed transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone)]
pub struct SignedEthTransaction {
    /// RLP of `[nonce, gasPrice, gasLimit, to, value, data, v, r, s]`.
    pub raw_tx: Vec<u8>,
    /// Keccak-256 of `raw_tx`, 0x-prefixed.
    pub tx_hash: String,
}

impl SignedEthTransaction {
    /// `0x`-prefixed hex of the raw transaction.
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw_tx))
    }
}

/// Fields hashed for an EIP-155 signature: the transaction followed by
/// `chainId, 0, 0`.
#[derive(RlpEncodable)]
struct UnsignedFields {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: Address,
    value: U256,
    data: Bytes,
    chain_id: u64,
    empty_r: u8,
    empty_s: u8,
}

#[derive(RlpEncodable, RlpDecodable)]
struct SignedFields {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: Address,
    value: U256,
    data: Bytes,
    v: u64,
    r: U256,
    s: U256,
}

impl LegacyTransaction {
    /// Payload whose Keccak-256 hash gets signed.
    pub fn signing_payload(&self) -> Vec<u8> {
        let fields = UnsignedFields {
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: self.to,
            value: self.value,
            data: self.data.clone(),
            chain_id: self.chain_id,
            empty_r: 0,
            empty_s: 0,
        };
        let mut buf = Vec::with_capacity(fields.length());
        fields.encode(&mut buf);
        buf
    }

    pub fn signature_hash(&self) -> B256 {
        B256::from_slice(&Keccak256::digest(self.signing_payload()))
    }

    /// EIP-155 `v` for the given y-parity.
    fn v(&self, y_odd: bool) -> Result<u64, EthError> {
        self.chain_id
            .checked_mul(2)
            .and_then(|v| v.checked_add(35 + u64::from(y_odd)))
            .ok_or_else(|| {
                EthError::TransactionBuildError(format!(
                    "chain id {} is too large for EIP-155",
                    self.chain_id
                ))
            })
    }
}

/// Signs `tx` with `key`.
///
/// Signatures are deterministic (RFC 6979) and low-S normalized. The k256
/// signing key is zeroized when this returns.
pub fn sign_transaction(
    tx: &LegacyTransaction,
    key: &PrivateKey,
) -> Result<SignedEthTransaction, EthError> {
    let sighash = tx.signature_hash();
    // Fail on an oversized chain id before touching the key.
    tx.v(true)?;
    let signing_key = signing_key(key)?;

    let (signature, recovery_id): (Signature, RecoveryId) = signing_key
        .sign_prehash(sighash.as_slice())
        .map_err(|e| EthError::SigningError(e.to_string()))?;

    let fields = SignedFields {
        nonce: tx.nonce,
        gas_price: tx.gas_price,
        gas_limit: tx.gas_limit,
        to: tx.to,
        value: tx.value,
        data: tx.data.clone(),
        v: tx.v(recovery_id.is_y_odd())?,
        r: U256::from_be_slice(&signature.r().to_bytes()),
        s: U256::from_be_slice(&signature.s().to_bytes()),
    };

    let mut raw_tx = Vec::with_capacity(fields.length());
    fields.encode(&mut raw_tx);

    let tx_hash = format!("0x{}", hex::encode(Keccak256::digest(&raw_tx)));
    Ok(SignedEthTransaction { raw_tx, tx_hash })
}

/// Decodes a signed legacy transaction and recovers its sender.
pub fn decode_signed(raw_tx: &[u8]) -> Result<(LegacyTransaction, Address), EthError> {
    let fields = SignedFields::decode(&mut &raw_tx[..])
        .map_err(|e| EthError::EncodingError(format!("invalid RLP: {e}")))?;

    if fields.v < 35 {
        return Err(EthError::EncodingError(format!(
            "v = {} is not EIP-155 protected",
            fields.v
        )));
    }
    let chain_id = (fields.v - 35) / 2;
    let y_odd = (fields.v - 35) % 2 == 1;

    let tx = LegacyTransaction {
        chain_id,
        nonce: fields.nonce,
        gas_price: fields.gas_price,
        gas_limit: fields.gas_limit,
        to: fields.to,
        value: fields.value,
        data: fields.data,
    };

    let signature = Signature::from_scalars(
        fields.r.to_be_bytes::<32>(),
        fields.s.to_be_bytes::<32>(),
    )
    .map_err(|e| EthError::EncodingError(format!("invalid signature: {e}")))?;
    let recovery_id = RecoveryId::new(y_odd, false);

    let verifying_key =
        VerifyingKey::recover_from_prehash(tx.signature_hash().as_slice(), &signature, recovery_id)
            .map_err(|e| EthError::SigningError(format!("sender recovery failed: {e}")))?;

    let mut key_65 = [0u8; 65];
    key_65.copy_from_slice(k256::PublicKey::from(&verifying_key).to_encoded_point(false).as_bytes());
    let sender = pubkey_to_eth_address(&key_65)?;

    Ok((tx, sender))
}
