use alloy_primitives::{Address, Bytes, U256};

use crate::abi::{argument_word, decode_address, decode_uint256, encode_function_call, AbiParam};
use crate::error::EthError;

/// Function selector for `transfer(address,uint256)`: `0xa9059cbb`.
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Encodes an ERC-20 `transfer(address,uint256)` call.
///
/// `amount` is in the token's smallest unit. The result is the 4-byte
/// selector followed by two ABI words (68 bytes).
pub fn encode_transfer(to: Address, amount: U256) -> Bytes {
    let params = [AbiParam::Address(to), AbiParam::Uint256(amount)];
    Bytes::from(encode_function_call(TRANSFER_SELECTOR, &params))
}

/// Decodes `transfer(address,uint256)` call data into `(recipient, amount)`.
pub fn decode_transfer(data: &[u8]) -> Result<(Address, U256), EthError> {
    if data.len() != 4 + 2 * crate::abi::WORD || data[..4] != TRANSFER_SELECTOR {
        return Err(EthError::EncodingError(
            "not an ERC-20 transfer call".into(),
        ));
    }
    let to = decode_address(argument_word(data, 0)?)?;
    let amount = decode_uint256(argument_word(data, 1)?)?;
    Ok((to, amount))
}
