use bitcoin::address::{Address, AddressType, NetworkUnchecked};
use bitcoin::secp256k1::Secp256k1;
use bitcoin::CompressedPublicKey;
use coin_core::PrivateKey;

use crate::error::BtcError;
use crate::keys::with_secret_key;
use crate::network::BtcNetwork;

/// Parse an address string and require it to belong to `network`.
pub fn parse_address(address: &str, network: BtcNetwork) -> Result<Address, BtcError> {
    address
        .parse::<Address<NetworkUnchecked>>()
        .map_err(|e| BtcError::InvalidAddress(format!("failed to parse {address}: {e}")))?
        .require_network(network.to_bitcoin_network())
        .map_err(|e| BtcError::InvalidAddress(format!("{address} is not a {network} address: {e}")))
}

/// The legacy P2PKH address of `key`'s compressed public key.
pub fn p2pkh_address(key: &PrivateKey, network: BtcNetwork) -> Result<Address, BtcError> {
    let public_key = compressed_public_key(key)?;
    Ok(Address::p2pkh(public_key.pubkey_hash(), network.to_bitcoin_network()))
}

fn compressed_public_key(key: &PrivateKey) -> Result<CompressedPublicKey, BtcError> {
    let secp = Secp256k1::signing_only();
    with_secret_key(key, |secret| Ok(CompressedPublicKey(secret.public_key(&secp))))
}

/// Derive the address `key` controls, in the same format as `target`.
///
/// Native SegWit targets derive a P2WPKH address; everything else derives the
/// P2PKH address of the compressed public key (which is also how indexers
/// label pay-to-public-key outputs).
pub fn address_for_key(
    key: &PrivateKey,
    target: &Address,
    network: BtcNetwork,
) -> Result<Address, BtcError> {
    let public_key = compressed_public_key(key)?;

    let net = network.to_bitcoin_network();
    Ok(match target.address_type() {
        Some(AddressType::P2wpkh) => Address::p2wpkh(&public_key, net),
        _ => Address::p2pkh(public_key.pubkey_hash(), net),
    })
}
