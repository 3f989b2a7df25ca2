//! Checked integer helpers shared by the accounting modules.
//!
//! Amounts are `u64`, every intermediate product is carried in `u128` and any
//! product that does not fit fails with `MathOverflow`. Ratios (value per
//! share, withdrawal snapshots) use a fixed point with 48 fractional bits.

use crate::error::VaultErrorCode;
use anchor_lang::prelude::*;
use num_traits::ToPrimitive;

pub const DECIMAL_FRACTIONAL_BITS: u32 = 48;
pub const DECIMAL_ONE: u128 = 1 << DECIMAL_FRACTIONAL_BITS;

pub const BPS_DENOMINATOR: u128 = 10_000;
pub const SECONDS_PER_YEAR: u128 = 31_536_000; // 365 days in seconds

/// `a * b / denominator`, truncated.
pub fn mul_div_floor(a: u128, b: u128, denominator: u128) -> Result<u128> {
    require!(denominator != 0, VaultErrorCode::MathOverflow);
    let product = a.checked_mul(b).ok_or(VaultErrorCode::MathOverflow)?;
    Ok(product / denominator)
}

/// `a * b / denominator`, rounded up.
pub fn mul_div_ceil(a: u128, b: u128, denominator: u128) -> Result<u128> {
    require!(denominator != 0, VaultErrorCode::MathOverflow);
    let product = a.checked_mul(b).ok_or(VaultErrorCode::MathOverflow)?;
    Ok(product.div_ceil(denominator))
}

pub fn checked_u64(value: u128) -> Result<u64> {
    Ok(value.to_u64().ok_or(VaultErrorCode::MathOverflow)?)
}

/// `numerator / denominator` as decimal bits, truncated.
///
/// Splits into quotient and remainder so a large numerator does not overflow
/// when shifted into the fixed point.
pub fn ratio_decimal_bits(numerator: u128, denominator: u128) -> Result<u128> {
    require!(denominator != 0, VaultErrorCode::MathOverflow);
    let whole = (numerator / denominator)
        .checked_mul(DECIMAL_ONE)
        .ok_or(VaultErrorCode::MathOverflow)?;
    let fraction = mul_div_floor(numerator % denominator, DECIMAL_ONE, denominator)?;
    Ok(whole
        .checked_add(fraction)
        .ok_or(VaultErrorCode::MathOverflow)?)
}

pub fn to_decimal_bits(amount: u64) -> u128 {
    (amount as u128) << DECIMAL_FRACTIONAL_BITS
}

pub fn decimal_bits_floor(bits: u128) -> Result<u64> {
    checked_u64(bits >> DECIMAL_FRACTIONAL_BITS)
}

pub fn pow10(decimals: u8) -> Result<u128> {
    Ok(10u128
        .checked_pow(decimals as u32)
        .ok_or(VaultErrorCode::MathOverflow)?)
}

/// Rescales a raw token amount between two decimal denominations, truncating.
pub fn scale_decimals(amount: u64, from_decimals: u8, to_decimals: u8) -> Result<u64> {
    checked_u64(mul_div_floor(
        amount as u128,
        pow10(to_decimals)?,
        pow10(from_decimals)?,
    )?)
}
