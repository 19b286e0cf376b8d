use std::fmt;
use std::str::FromStr;

use alloy_primitives::utils::{format_units, parse_units, ParseUnits};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::CoinError;

/// A non-negative decimal quantity in a chain's human-readable display scale
/// (BTC, ETH, USDT ...), e.g. `0.00089`.
///
/// The value is kept as normalized decimal text: no sign, no leading zeros in
/// the integer part and no trailing zeros in the fraction. Two amounts are
/// equal exactly when they denote the same quantity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(String);

impl Amount {
    pub fn zero() -> Self {
        Self("0".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == "0"
    }

    /// Number of digits after the decimal point.
    pub fn fraction_digits(&self) -> usize {
        self.0.split_once('.').map_or(0, |(_, frac)| frac.len())
    }

    /// Converts to integer base units (satoshi, wei, token units) for an asset
    /// with `decimals` decimal places.
    ///
    /// Fails instead of truncating when the amount is more precise than the
    /// asset allows.
    pub fn to_base_units(&self, decimals: u8) -> Result<U256, CoinError> {
        if self.fraction_digits() > decimals as usize {
            return Err(CoinError::InvalidAmount(format!(
                "{} has more than {decimals} decimal places",
                self.0
            )));
        }

        match parse_units(&self.0, decimals)
            .map_err(|e| CoinError::InvalidAmount(format!("{}: {e}", self.0)))?
        {
            ParseUnits::U256(value) => Ok(value),
            ParseUnits::I256(_) => Err(CoinError::InvalidAmount(format!(
                "{} is negative",
                self.0
            ))),
        }
    }

    /// Builds an amount from integer base units of an asset with `decimals`
    /// decimal places.
    pub fn from_base_units(value: U256, decimals: u8) -> Result<Self, CoinError> {
        let text = format_units(value, decimals)
            .map_err(|e| CoinError::InvalidAmount(format!("cannot format {value}: {e}")))?;
        text.parse()
    }

    /// Convenience for satoshi-denominated values.
    pub fn from_sat(sat: u64) -> Self {
        // 8 decimals always formats.
        Self::from_base_units(U256::from(sat), 8).unwrap_or_else(|_| Self::zero())
    }
}

impl FromStr for Amount {
    type Err = CoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || CoinError::InvalidAmount(format!("not a non-negative decimal: {s:?}"));

        let (int_part, frac_part) = match s.split_once('.') {
            Some((int_part, frac_part)) if !frac_part.is_empty() => (int_part, frac_part),
            Some(_) => return Err(invalid()),
            None => (s, ""),
        };

        if int_part.is_empty()
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let int_part = match int_part.trim_start_matches('0') {
            "" => "0",
            trimmed => trimmed,
        };
        let frac_part = frac_part.trim_end_matches('0');

        if frac_part.is_empty() {
            Ok(Self(int_part.to_string()))
        } else {
            Ok(Self(format!("{int_part}.{frac_part}")))
        }
    }
}

impl TryFrom<String> for Amount {
    type Error = CoinError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
