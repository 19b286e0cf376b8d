use alloy_primitives::Address;
use coin_core::PrivateKey;
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};

use crate::error::EthError;

/// Builds a k256 signing key from `key`. The key zeroizes itself on drop.
pub(crate) fn signing_key(key: &PrivateKey) -> Result<SigningKey, EthError> {
    SigningKey::from_bytes(key.expose_secret().into())
        .map_err(|e| EthError::InvalidPrivateKey(e.to_string()))
}

/// Derives the Ethereum address of an uncompressed secp256k1 public key
/// (65 bytes, starting with 0x04).
///
/// The address is the last 20 bytes of the Keccak-256 hash of the 64-byte key
/// without its prefix.
pub fn pubkey_to_eth_address(uncompressed_pubkey: &[u8; 65]) -> Result<Address, EthError> {
    if uncompressed_pubkey[0] != 0x04 {
        return Err(EthError::InvalidPrivateKey(
            "uncompressed key must start with 0x04".into(),
        ));
    }

    let hash = Keccak256::digest(&uncompressed_pubkey[1..]);
    Ok(Address::from_slice(&hash[12..]))
}

/// The address controlled by `key`.
pub fn address_for_key(key: &PrivateKey) -> Result<Address, EthError> {
    let signing_key = signing_key(key)?;
    let uncompressed = k256::PublicKey::from(signing_key.verifying_key()).to_encoded_point(false);

    let mut key_65 = [0u8; 65];
    key_65.copy_from_slice(uncompressed.as_bytes());
    pubkey_to_eth_address(&key_65)
}

/// Parses a 0x-prefixed address.
///
/// All-lowercase and all-uppercase forms are accepted as is; mixed case must
/// carry a valid EIP-55 checksum.
pub fn parse_address(address: &str) -> Result<Address, EthError> {
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| EthError::InvalidAddress(format!("{address}: must start with 0x")))?;

    if hex_part.len() != 40 {
        return Err(EthError::InvalidAddress(format!(
            "{address}: expected 40 hex characters, got {}",
            hex_part.len()
        )));
    }

    let mut raw = [0u8; 20];
    hex::decode_to_slice(hex_part, &mut raw)
        .map_err(|e| EthError::InvalidAddress(format!("{address}: {e}")))?;
    let parsed = Address::from(raw);

    let is_all_lower = !hex_part.chars().any(|c| c.is_ascii_uppercase());
    let is_all_upper = !hex_part.chars().any(|c| c.is_ascii_lowercase());
    if !is_all_lower && !is_all_upper && parsed.to_checksum(None)[2..] != *hex_part {
        return Err(EthError::InvalidAddress(format!("{address}: bad EIP-55 checksum")));
    }

    Ok(parsed)
}
