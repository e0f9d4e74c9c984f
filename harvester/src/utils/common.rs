//! Common utility and helper functions that are used across the project

use std::str::FromStr;

use alloy_primitives::{
    utils::{format_ether, parse_ether},
    Address, B256, U256,
};
use alloy_sol_types::SolCall;

use super::error::*;

/// Converts String to Address and returns HarvesterError on failure
pub fn string_to_address(input: &str) -> HarvesterResult<Address> {
    Address::from_str(input.trim()).map_err(decoding_err)
}

/// Converts a 0x-prefixed hash to `B256`
pub fn string_to_hash(input: &str) -> HarvesterResult<B256> {
    B256::from_str(input.trim()).map_err(decoding_err)
}

/// Parses a decimal token quantity ("1.5", "100") into its 18-decimal smallest-unit value
pub fn parse_amount(input: &str) -> HarvesterResult<U256> {
    let trimmed = input.trim();
    if trimmed.starts_with('-') {
        return Err(HarvesterError::Config(format!(
            "`{}` is negative, token amounts must be non-negative",
            input
        )));
    }
    parse_ether(trimmed).map_err(|err| {
        HarvesterError::Config(format!("`{}` is not a valid token amount: {}", input, err))
    })
}

/// Renders a smallest-unit value as a decimal token quantity
pub fn format_amount(amount: U256) -> String {
    format_ether(amount)
}

fn strip_hex_prefix(hex_data: &str) -> &str {
    hex_data
        .strip_prefix("0x")
        .or_else(|| hex_data.strip_prefix("0X"))
        .unwrap_or(hex_data)
}

/// Decodes a 0x-prefixed hex string into bytes
pub fn hex_to_bytes(hex_data: &str) -> HarvesterResult<Vec<u8>> {
    let stripped_hex = strip_hex_prefix(hex_data);
    // quantities may come back with an odd number of digits
    let padded = if stripped_hex.len() % 2 == 1 {
        format!("0{}", stripped_hex)
    } else {
        stripped_hex.to_string()
    };
    hex::decode(padded).map_err(|err| HarvesterError::DecodingError(err.to_string()))
}

/// Encodes bytes as a 0x-prefixed hex string
pub fn bytes_to_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

/// Parses a JSON-RPC quantity ("0x1a") into `u64`
pub fn quantity_to_u64(quantity: &str) -> HarvesterResult<u64> {
    u64::from_str_radix(strip_hex_prefix(quantity), 16).map_err(|err| {
        HarvesterError::DecodingError(format!("Invalid quantity `{}`: {}", quantity, err))
    })
}

/// Parses a JSON-RPC quantity ("0x1a") into `u128`
pub fn quantity_to_u128(quantity: &str) -> HarvesterResult<u128> {
    u128::from_str_radix(strip_hex_prefix(quantity), 16).map_err(|err| {
        HarvesterError::DecodingError(format!("Invalid quantity `{}`: {}", quantity, err))
    })
}

/// Returns `T` from the ABI encoded return data of `F`.
pub fn decode_abi_response<T, F: SolCall<Return = T>>(data: &[u8]) -> HarvesterResult<T> {
    F::abi_decode_returns(data, false).map_err(|err| HarvesterError::DecodingError(err.to_string()))
}
