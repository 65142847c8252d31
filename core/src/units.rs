//! Ether / wei conversions for demo payments.

use crate::error::{Error, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Decimals of a native EVM currency.
pub const ETHER_DECIMALS: u32 = 18;

/// Convert an ether amount into wei.
pub fn parse_ether(amount: Decimal) -> Result<u128> {
    if amount.is_sign_negative() {
        return Err(Error::Parse(format!("Negative amount: {}", amount)));
    }

    let wei = amount
        .checked_mul(Decimal::from(10u64.pow(ETHER_DECIMALS)))
        .ok_or_else(|| Error::Parse(format!("Amount too large: {}", amount)))?;

    if !wei.fract().is_zero() {
        return Err(Error::Parse(format!(
            "Amount has more than {} decimals: {}",
            ETHER_DECIMALS, amount
        )));
    }

    wei.to_u128()
        .ok_or_else(|| Error::Parse(format!("Amount out of range: {}", amount)))
}

/// Convert wei into an ether amount.
pub fn format_ether(wei: u128) -> Result<Decimal> {
    let wei = i128::try_from(wei).map_err(|_| Error::Parse(format!("Wei out of range: {}", wei)))?;
    Decimal::try_from_i128_with_scale(wei, ETHER_DECIMALS)
        .map(|d| d.normalize())
        .map_err(|e| Error::Parse(format!("Wei out of range: {}", e)))
}
