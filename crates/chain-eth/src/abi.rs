//! Minimal ABI encoding for EVM function calls.
//!
//! Just enough to build static-argument contract call data such as an ERC-20
//! `transfer`, without pulling in a full ABI parser.

use alloy_primitives::{Address, U256};

use crate::error::EthError;

/// Size of one ABI word.
pub const WORD: usize = 32;

/// A single static ABI parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiParam {
    /// A 20-byte address, left-padded to 32 bytes.
    Address(Address),
    /// A 256-bit unsigned integer, big-endian.
    Uint256(U256),
}

/// Encodes `selector || word(params[0]) || word(params[1]) || ...`.
pub fn encode_function_call(selector: [u8; 4], params: &[AbiParam]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + params.len() * WORD);
    data.extend_from_slice(&selector);

    for param in params {
        data.extend_from_slice(&encode_param(param));
    }

    data
}

fn encode_param(param: &AbiParam) -> [u8; WORD] {
    match param {
        AbiParam::Address(addr) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(addr.as_slice());
            word
        }
        AbiParam::Uint256(value) => value.to_be_bytes(),
    }
}

/// Reads the `index`-th argument word after the 4-byte selector.
pub fn argument_word(data: &[u8], index: usize) -> Result<&[u8], EthError> {
    let start = 4 + index * WORD;
    data.get(start..start + WORD).ok_or_else(|| {
        EthError::EncodingError(format!(
            "call data of {} bytes has no argument {index}",
            data.len()
        ))
    })
}

/// Decodes an address argument, rejecting non-zero padding.
pub fn decode_address(word: &[u8]) -> Result<Address, EthError> {
    if word.len() != WORD || word[..12].iter().any(|b| *b != 0) {
        return Err(EthError::EncodingError("malformed address word".into()));
    }
    Ok(Address::from_slice(&word[12..]))
}

pub fn decode_uint256(word: &[u8]) -> Result<U256, EthError> {
    U256::try_from_be_slice(word)
        .ok_or_else(|| EthError::EncodingError("uint256 word longer than 32 bytes".into()))
}
