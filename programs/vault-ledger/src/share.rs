//! Share accounting: conversions between asset units and LP units.
//!
//! Every conversion prices shares with the fee-inclusive LP supply (minted
//! supply, unminted fee LP and pending management fee dilution) against the
//! total unlocked value. Divisions truncate in the vault's favor, except the
//! LP needed for a target withdrawal which rounds up.

use crate::error::VaultErrorCode;
use crate::fee::project_lp_supply_incl_fees;
use crate::locked_profit::total_unlocked_value;
use crate::math::{
    checked_u64, decimal_bits_floor, mul_div_ceil, pow10, ratio_decimal_bits, scale_decimals,
    BPS_DENOMINATOR,
};
use crate::state::Vault;
use anchor_lang::prelude::*;

/// LP minted for a deposit of `asset_amount` given the pool totals.
///
/// `lp = a * S * (10000 - fee) / (10000 * (V + a) - a * (10000 - fee))`
pub fn calculate_lp_for_deposit(
    asset_amount: u64,
    lp_supply: u64,
    total_unlocked_value: u64,
    issuance_fee: u16,
) -> Result<u64> {
    require!(total_unlocked_value > 0, VaultErrorCode::InvalidTotalAssets);
    let net_bps = BPS_DENOMINATOR
        .checked_sub(issuance_fee as u128)
        .ok_or(VaultErrorCode::InvalidFeeConfiguration)?;
    let amount = asset_amount as u128;

    let numerator = amount
        .checked_mul(lp_supply as u128)
        .and_then(|v| v.checked_mul(net_bps))
        .ok_or(VaultErrorCode::MathOverflow)?;
    let total_value_post_deposit = (total_unlocked_value as u128)
        .checked_add(amount)
        .ok_or(VaultErrorCode::MathOverflow)?;
    let denominator = BPS_DENOMINATOR
        .checked_mul(total_value_post_deposit)
        .and_then(|v| v.checked_sub(amount.checked_mul(net_bps)?))
        .ok_or(VaultErrorCode::MathOverflow)?;

    checked_u64(numerator / denominator)
}

/// Asset value of `lp_amount` net of the redemption fee, in decimal bits.
///
/// `assets = lp * V * (10000 - fee) / (S * 10000)`
pub fn calculate_assets_for_withdraw_decimal_bits(
    lp_amount: u64,
    lp_supply: u64,
    total_unlocked_value: u64,
    redemption_fee: u16,
) -> Result<u128> {
    require!(lp_supply > 0, VaultErrorCode::InvalidLpSupply);
    require!(total_unlocked_value > 0, VaultErrorCode::InvalidTotalAssets);
    let net_bps = BPS_DENOMINATOR
        .checked_sub(redemption_fee as u128)
        .ok_or(VaultErrorCode::InvalidFeeConfiguration)?;

    let numerator = (lp_amount as u128)
        .checked_mul(total_unlocked_value as u128)
        .and_then(|v| v.checked_mul(net_bps))
        .ok_or(VaultErrorCode::MathOverflow)?;
    let denominator = (lp_supply as u128)
        .checked_mul(BPS_DENOMINATOR)
        .ok_or(VaultErrorCode::MathOverflow)?;

    ratio_decimal_bits(numerator, denominator)
}

pub fn calculate_assets_for_withdraw(
    lp_amount: u64,
    lp_supply: u64,
    total_unlocked_value: u64,
    redemption_fee: u16,
) -> Result<u64> {
    decimal_bits_floor(calculate_assets_for_withdraw_decimal_bits(
        lp_amount,
        lp_supply,
        total_unlocked_value,
        redemption_fee,
    )?)
}

/// LP that must be burned to receive `asset_amount` after the redemption fee.
///
/// `lp = ceil(a * S * 10000 / (V * (10000 - fee)))`
pub fn calculate_lp_for_withdraw(
    asset_amount: u64,
    lp_supply: u64,
    total_unlocked_value: u64,
    redemption_fee: u16,
) -> Result<u64> {
    require!(lp_supply > 0, VaultErrorCode::InvalidLpSupply);
    require!(total_unlocked_value > 0, VaultErrorCode::InvalidTotalAssets);
    let net_bps = BPS_DENOMINATOR
        .checked_sub(redemption_fee as u128)
        .ok_or(VaultErrorCode::InvalidFeeConfiguration)?;
    require!(net_bps > 0, VaultErrorCode::InvalidFeeConfiguration);

    let numerator = (asset_amount as u128)
        .checked_mul(lp_supply as u128)
        .ok_or(VaultErrorCode::MathOverflow)?;
    let denominator = (total_unlocked_value as u128)
        .checked_mul(net_bps)
        .ok_or(VaultErrorCode::MathOverflow)?;

    checked_u64(mul_div_ceil(numerator, BPS_DENOMINATOR, denominator)?)
}

pub fn convert_assets_to_lp(vault: &Vault, asset_amount: u64, now: i64) -> Result<u64> {
    let lp_supply = project_lp_supply_incl_fees(vault, now)?;
    if lp_supply == 0 {
        // empty vault mints 1:1, adjusted for the decimal difference
        return scale_decimals(asset_amount, vault.asset.decimals, vault.lp.decimals);
    }
    calculate_lp_for_deposit(
        asset_amount,
        lp_supply,
        total_unlocked_value(vault, now)?,
        vault.fee_configuration.issuance_fee,
    )
}

pub fn convert_lp_to_assets_decimal_bits(vault: &Vault, lp_amount: u64, now: i64) -> Result<u128> {
    calculate_assets_for_withdraw_decimal_bits(
        lp_amount,
        project_lp_supply_incl_fees(vault, now)?,
        total_unlocked_value(vault, now)?,
        vault.fee_configuration.redemption_fee,
    )
}

pub fn convert_lp_to_assets(vault: &Vault, lp_amount: u64, now: i64) -> Result<u64> {
    decimal_bits_floor(convert_lp_to_assets_decimal_bits(vault, lp_amount, now)?)
}

pub fn convert_assets_to_lp_for_withdraw(
    vault: &Vault,
    asset_amount: u64,
    now: i64,
) -> Result<u64> {
    calculate_lp_for_withdraw(
        asset_amount,
        project_lp_supply_incl_fees(vault, now)?,
        total_unlocked_value(vault, now)?,
        vault.fee_configuration.redemption_fee,
    )
}

/// Asset value per LP unit in decimal bits, before redemption fees.
///
/// An empty vault reports the initial 1:1 rate scaled by the decimal
/// difference between the asset and the LP token.
pub fn share_price(vault: &Vault, now: i64) -> Result<u128> {
    let lp_supply = project_lp_supply_incl_fees(vault, now)?;
    if lp_supply == 0 {
        return ratio_decimal_bits(pow10(vault.asset.decimals)?, pow10(vault.lp.decimals)?);
    }
    ratio_decimal_bits(total_unlocked_value(vault, now)? as u128, lp_supply as u128)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{to_decimal_bits, DECIMAL_ONE};
    use test_case::test_case;

    fn vault(total_value: u64, lp_supply: u64) -> Vault {
        let mut vault = Vault::default();
        vault.asset.decimals = 6;
        vault.lp.decimals = 6;
        vault.asset.total_value = total_value;
        vault.asset.idle_amount = total_value;
        vault.lp.supply = lp_supply;
        vault
    }

    #[test]
    fn empty_vault_mints_one_to_one_scaled() {
        let mut v = vault(0, 0);
        v.lp.decimals = 12;
        assert_eq!(
            convert_assets_to_lp(&v, 1_000_000, 0).unwrap(),
            1_000_000 * 10u64.pow(6)
        );
        v.lp.decimals = 6;
        assert_eq!(convert_assets_to_lp(&v, 1_000_000, 0).unwrap(), 1_000_000);
    }

    #[test]
    fn empty_vault_ignores_issuance_fee() {
        let mut v = vault(0, 0);
        v.fee_configuration.issuance_fee = 100;
        assert_eq!(convert_assets_to_lp(&v, 500, 0).unwrap(), 500);
    }

    #[test]
    fn deposit_without_fee_is_proportional() {
        let v = vault(2_000_000, 1_000_000);
        assert_eq!(convert_assets_to_lp(&v, 100_000, 0).unwrap(), 50_000);
    }

    #[test]
    fn issuance_fee_reduces_minted_lp() {
        let mut v = vault(1_000_000, 1_000_000);
        v.fee_configuration.issuance_fee = 100;
        // 100_000 * 1e6 * 9900 / (1e4 * 1_100_000 - 100_000 * 9900)
        assert_eq!(convert_assets_to_lp(&v, 100_000, 0).unwrap(), 98_901);
    }

    #[test]
    fn fee_free_withdraw_is_exact() {
        let v = vault(1_000_000, 1_000_000);
        assert_eq!(convert_lp_to_assets(&v, 100_000, 0).unwrap(), 100_000);
        assert_eq!(
            convert_lp_to_assets_decimal_bits(&v, 100_000, 0).unwrap(),
            to_decimal_bits(100_000)
        );
    }

    #[test]
    fn redemption_fee_applied() {
        let mut v = vault(1_000_000, 1_000_000);
        v.fee_configuration.redemption_fee = 10;
        assert_eq!(convert_lp_to_assets(&v, 100_000, 0).unwrap(), 99_900);
    }

    #[test]
    fn lp_to_assets_guards() {
        let no_supply = vault(1_000, 0);
        assert_eq!(
            convert_lp_to_assets(&no_supply, 10, 0).unwrap_err(),
            VaultErrorCode::InvalidLpSupply.into()
        );
        let no_value = vault(0, 1_000);
        assert_eq!(
            convert_lp_to_assets(&no_value, 10, 0).unwrap_err(),
            VaultErrorCode::InvalidTotalAssets.into()
        );
        assert_eq!(
            convert_assets_to_lp(&no_value, 10, 0).unwrap_err(),
            VaultErrorCode::InvalidTotalAssets.into()
        );
    }

    #[test]
    fn overflowing_intermediate_is_reported() {
        assert_eq!(
            calculate_lp_for_deposit(u64::MAX, u64::MAX, 1, 0).unwrap_err(),
            VaultErrorCode::MathOverflow.into()
        );
        assert_eq!(
            calculate_assets_for_withdraw(u64::MAX, 1, u64::MAX, 0).unwrap_err(),
            VaultErrorCode::MathOverflow.into()
        );
    }

    #[test]
    fn lp_for_withdraw_rounds_up() {
        let mut v = vault(1_000_000, 1_000_000);
        v.fee_configuration.redemption_fee = 10;
        let lp = convert_assets_to_lp_for_withdraw(&v, 99_900, 0).unwrap();
        assert_eq!(lp, 100_000);
        // one more asset unit needs a whole extra LP
        let lp = convert_assets_to_lp_for_withdraw(&v, 99_901, 0).unwrap();
        assert_eq!(lp, 100_002);
        assert!(convert_lp_to_assets(&v, lp, 0).unwrap() >= 99_901);
    }

    #[test_case(1 ; "dust")]
    #[test_case(999 ; "small")]
    #[test_case(123_457 ; "odd")]
    #[test_case(10_000_000 ; "larger than the vault")]
    fn round_trip_never_gains(amount: u64) {
        let mut v = vault(3_333_333, 1_000_000);
        v.fee_configuration.issuance_fee = 25;
        v.fee_configuration.redemption_fee = 15;
        let lp = convert_assets_to_lp(&v, amount, 0).unwrap();
        let back = convert_lp_to_assets(&v, lp, 0).unwrap();
        assert!(back <= amount, "{} -> {} lp -> {}", amount, lp, back);

        let fee_free = vault(3_333_333, 1_000_000);
        let lp = convert_assets_to_lp(&fee_free, amount, 0).unwrap();
        assert!(convert_lp_to_assets(&fee_free, lp, 0).unwrap() <= amount);
    }

    #[test]
    fn share_price_tracks_unlocked_value() {
        assert_eq!(share_price(&vault(0, 0), 0).unwrap(), DECIMAL_ONE);
        assert_eq!(share_price(&vault(2_000, 1_000), 0).unwrap(), 2 * DECIMAL_ONE);

        let mut v = vault(2_000, 1_000);
        v.configuration.locked_profit_degradation_duration = 100;
        v.locked_profit_state.last_updated_locked_profit = 1_000;
        assert_eq!(share_price(&v, 0).unwrap(), DECIMAL_ONE);
        assert_eq!(share_price(&v, 50).unwrap(), DECIMAL_ONE + DECIMAL_ONE / 2);

        let mut lp_heavy = vault(1_000_000, 1_000_000);
        lp_heavy.lp.decimals = 9;
        lp_heavy.lp.supply = 0;
        lp_heavy.asset.total_value = 0;
        assert_eq!(share_price(&lp_heavy, 0).unwrap(), DECIMAL_ONE / 1_000);
    }
}
