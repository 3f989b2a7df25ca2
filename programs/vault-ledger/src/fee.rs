//! Fee accrual engine.
//!
//! Management fees accrue continuously and dilute holders: they are never
//! minted until harvest but are always part of the LP supply used for
//! pricing. Every state-mutating operation first crystallizes the pending
//! management fee and any performance fee above the high-water mark into the
//! fee accumulators; `harvest_fee` then mints the accumulators.

use crate::error::VaultErrorCode;
use crate::locked_profit::total_unlocked_value;
use crate::math::{
    checked_u64, mul_div_ceil, mul_div_floor, ratio_decimal_bits, BPS_DENOMINATOR, DECIMAL_ONE,
    SECONDS_PER_YEAR,
};
use crate::state::{FeeState, Vault};
use anchor_lang::prelude::*;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeeSplit {
    pub admin_lp: u64,
    pub manager_lp: u64,
    pub protocol_lp: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HarvestedFees {
    pub admin_lp: u64,
    pub manager_lp: u64,
    pub protocol_lp: u64,
}

impl HarvestedFees {
    pub fn total(&self) -> Result<u64> {
        Ok(self
            .admin_lp
            .checked_add(self.manager_lp)
            .and_then(|sum| sum.checked_add(self.protocol_lp))
            .ok_or(VaultErrorCode::MathOverflow)?)
    }
}

/// LP to mint so that the new shares are worth `fee_asset` out of
/// `total_value`: `ceil(fee * S / (V - fee))`.
///
/// The fee is clamped to `total_value - 1` so the denominator stays positive.
pub fn calculate_fee_lp(fee_asset: u128, lp_supply: u64, total_value: u64) -> Result<u64> {
    if fee_asset == 0 || lp_supply == 0 || total_value == 0 {
        return Ok(0);
    }
    let fee_asset = fee_asset.min(total_value as u128 - 1);
    let denominator = total_value as u128 - fee_asset;
    checked_u64(mul_div_ceil(fee_asset, lp_supply as u128, denominator)?)
}

struct ManagementFeeBase {
    lp_supply: u64,
    total_value: u64,
    elapsed: u128,
    rate: u128,
}

/// Management fee over one accrual window.
///
/// `pending_lp` rounds up and prices shares. `charged_lp` rounds down and is
/// what gets crystallized; `billed_secs` is the part of the window it pays
/// for, so the remainder keeps accruing.
struct ManagementFee {
    pending_lp: u64,
    charged_lp: u64,
    billed_secs: u128,
}

/// Inputs of the management fee, or `None` while nothing can be charged.
fn management_fee_base(vault: &Vault, now: i64) -> Result<Option<ManagementFeeBase>> {
    let last = vault.fee_update.last_management_fee_update_ts;
    let rate = vault.fee_configuration.total_management_fee();
    if last == 0 || rate == 0 {
        return Ok(None);
    }
    let lp_supply = vault.lp_supply_incl_accumulated_fees()?;
    let total_value = total_unlocked_value(vault, now)?;
    if lp_supply == 0 || total_value == 0 {
        return Ok(None);
    }
    Ok(Some(ManagementFeeBase {
        lp_supply,
        total_value,
        elapsed: now.saturating_sub(last).max(0) as u128,
        rate: rate as u128,
    }))
}

// fee = V * t * r / (10000 * year) and fee_lp = fee * S / (V - fee), so
// fee_lp = t * r * S / (10000 * year - t * r). Past the clamp the fee is
// V - 1 and the whole window is billed.
fn management_fee(base: &ManagementFeeBase) -> Result<ManagementFee> {
    let rate_time = base
        .elapsed
        .checked_mul(base.rate)
        .ok_or(VaultErrorCode::MathOverflow)?;
    let value_time = (base.total_value as u128)
        .checked_mul(base.elapsed)
        .ok_or(VaultErrorCode::MathOverflow)?;
    let fee_asset = mul_div_floor(value_time, base.rate, BPS_DENOMINATOR * SECONDS_PER_YEAR)?;
    if fee_asset >= base.total_value as u128 - 1 {
        let fee_lp = calculate_fee_lp(fee_asset, base.lp_supply, base.total_value)?;
        return Ok(ManagementFee {
            pending_lp: fee_lp,
            charged_lp: fee_lp,
            billed_secs: base.elapsed,
        });
    }

    let denominator = BPS_DENOMINATOR * SECONDS_PER_YEAR - rate_time;
    let pending_lp = checked_u64(mul_div_ceil(rate_time, base.lp_supply as u128, denominator)?)?;
    let charged_lp = checked_u64(mul_div_floor(rate_time, base.lp_supply as u128, denominator)?)?;
    let billed_secs = if charged_lp == 0 {
        0
    } else {
        let lp_after = (base.lp_supply as u128) + charged_lp as u128;
        mul_div_ceil(
            charged_lp as u128,
            BPS_DENOMINATOR * SECONDS_PER_YEAR,
            base.rate * lp_after,
        )?
    };
    Ok(ManagementFee {
        pending_lp,
        charged_lp,
        billed_secs,
    })
}

/// Effective LP supply at `now`: minted supply, unminted fee LP, and the
/// management fee dilution accrued since the last fee update.
pub fn project_lp_supply_incl_fees(vault: &Vault, now: i64) -> Result<u64> {
    let current = vault.lp_supply_incl_accumulated_fees()?;
    let pending = match management_fee_base(vault, now)? {
        Some(base) => management_fee(&base)?.pending_lp,
        None => 0,
    };
    Ok(current
        .checked_add(pending)
        .ok_or(VaultErrorCode::MathOverflow)?)
}

/// Splits a fee charge between manager and admin pro rata to their rates.
/// The protocol takes `protocol_fee` bps of the admin side.
pub fn split_fee_lp(
    fee_lp: u64,
    manager_rate: u16,
    admin_rate: u16,
    protocol_fee: u16,
) -> Result<FeeSplit> {
    let total_rate = manager_rate as u128 + admin_rate as u128;
    if fee_lp == 0 || total_rate == 0 {
        return Ok(FeeSplit::default());
    }
    let manager_lp = checked_u64(mul_div_floor(fee_lp as u128, manager_rate as u128, total_rate)?)?;
    let admin_side = fee_lp - manager_lp;
    let protocol_lp = checked_u64(mul_div_floor(
        admin_side as u128,
        protocol_fee as u128,
        BPS_DENOMINATOR,
    )?)?;
    Ok(FeeSplit {
        admin_lp: admin_side - protocol_lp,
        manager_lp,
        protocol_lp,
    })
}

fn credit(fee_state: &mut FeeState, split: FeeSplit) -> Result<()> {
    fee_state.accumulated_lp_admin_fees = fee_state
        .accumulated_lp_admin_fees
        .checked_add(split.admin_lp)
        .ok_or(VaultErrorCode::MathOverflow)?;
    fee_state.accumulated_lp_manager_fees = fee_state
        .accumulated_lp_manager_fees
        .checked_add(split.manager_lp)
        .ok_or(VaultErrorCode::MathOverflow)?;
    fee_state.accumulated_lp_protocol_fees = fee_state
        .accumulated_lp_protocol_fees
        .checked_add(split.protocol_lp)
        .ok_or(VaultErrorCode::MathOverflow)?;
    Ok(())
}

/// Moves the pending management fee into the accumulators.
///
/// The fee timestamp advances by the time the charged LP pays for. A window
/// worth less than one LP leaves it where it is.
pub fn accrue_management_fee(vault: &mut Vault, now: i64) -> Result<u64> {
    let last = vault.fee_update.last_management_fee_update_ts;
    let Some(base) = management_fee_base(vault, now)? else {
        vault.fee_update.last_management_fee_update_ts = now.max(last);
        return Ok(0);
    };
    let fee = management_fee(&base)?;
    let fee_lp = fee.charged_lp;
    if fee_lp == 0 {
        return Ok(0);
    }

    let fees = vault.fee_configuration;
    let split = split_fee_lp(
        fee_lp,
        fees.manager_management_fee,
        fees.admin_management_fee,
        fees.protocol_fee,
    )?;
    credit(&mut vault.fee_state, split)?;
    let billed = i64::try_from(fee.billed_secs).map_err(|_| VaultErrorCode::MathOverflow)?;
    vault.fee_update.last_management_fee_update_ts = last
        .checked_add(billed)
        .ok_or(VaultErrorCode::MathOverflow)?;

    msg!(
        "Management fee accrued: {} lp over {}s (manager {}, admin {}, protocol {})",
        fee_lp,
        fee.billed_secs,
        split.manager_lp,
        split.admin_lp,
        split.protocol_lp
    );
    Ok(fee_lp)
}

/// Charges the performance fee on value per share above the high-water mark
/// and raises the mark. The first observation of a non-empty vault only
/// seeds the mark.
pub fn accrue_performance_fee(vault: &mut Vault, now: i64) -> Result<u64> {
    let lp_supply = project_lp_supply_incl_fees(vault, now)?;
    let total_value = total_unlocked_value(vault, now)?;
    vault.fee_update.last_performance_fee_update_ts = now;
    if lp_supply == 0 || total_value == 0 {
        return Ok(0);
    }

    let asset_per_lp = ratio_decimal_bits(total_value as u128, lp_supply as u128)?;
    let high_water_mark = vault.high_water_mark.highest_asset_per_lp_decimal_bits;
    if high_water_mark == 0 {
        vault.high_water_mark.highest_asset_per_lp_decimal_bits = asset_per_lp;
        vault.high_water_mark.last_updated_ts = now;
        return Ok(0);
    }
    if asset_per_lp <= high_water_mark {
        return Ok(0);
    }

    let fees = vault.fee_configuration;
    let profit_per_lp = asset_per_lp - high_water_mark;
    let profit_asset = mul_div_floor(profit_per_lp, lp_supply as u128, DECIMAL_ONE)?;
    let fee_asset = mul_div_floor(
        profit_asset,
        fees.total_performance_fee() as u128,
        BPS_DENOMINATOR,
    )?;
    let fee_lp = calculate_fee_lp(fee_asset, lp_supply, total_value)?;
    let split = split_fee_lp(
        fee_lp,
        fees.manager_performance_fee,
        fees.admin_performance_fee,
        fees.protocol_fee,
    )?;
    credit(&mut vault.fee_state, split)?;

    let supply_after_fee = (lp_supply as u128)
        .checked_add(fee_lp as u128)
        .ok_or(VaultErrorCode::MathOverflow)?;
    let post_fee_asset_per_lp = ratio_decimal_bits(total_value as u128, supply_after_fee)?;
    vault.high_water_mark.highest_asset_per_lp_decimal_bits =
        high_water_mark.max(post_fee_asset_per_lp);
    vault.high_water_mark.last_updated_ts = now;

    if fee_lp > 0 {
        msg!(
            "Performance fee accrued: {} lp on {} profit (manager {}, admin {}, protocol {})",
            fee_lp,
            profit_asset,
            split.manager_lp,
            split.admin_lp,
            split.protocol_lp
        );
    }
    Ok(fee_lp)
}

pub fn accrue_fees(vault: &mut Vault, now: i64) -> Result<()> {
    accrue_management_fee(vault, now)?;
    accrue_performance_fee(vault, now)?;
    Ok(())
}

/// Mints every accumulated fee and resets the accumulators.
///
/// The fee-inclusive supply, and therefore the share price, is unchanged.
/// The management fee timestamp stays where accrual left it so sub-unit
/// fees survive frequent harvests.
pub fn harvest_fee(vault: &mut Vault, now: i64) -> Result<HarvestedFees> {
    accrue_fees(vault, now)?;

    let harvested = HarvestedFees {
        admin_lp: vault.fee_state.accumulated_lp_admin_fees,
        manager_lp: vault.fee_state.accumulated_lp_manager_fees,
        protocol_lp: vault.fee_state.accumulated_lp_protocol_fees,
    };
    vault.lp.supply = vault
        .lp
        .supply
        .checked_add(harvested.total()?)
        .ok_or(VaultErrorCode::MathOverflow)?;
    vault.fee_state = FeeState::default();
    vault.fee_update.last_performance_fee_update_ts = now;
    Ok(harvested)
}

/// Resets the high-water mark to the current value per share. Returns the
/// previous and the new mark.
pub fn calibrate_high_water_mark(vault: &mut Vault, now: i64) -> Result<(u128, u128)> {
    accrue_management_fee(vault, now)?;
    let lp_supply = project_lp_supply_incl_fees(vault, now)?;
    let total_value = total_unlocked_value(vault, now)?;
    let asset_per_lp = if lp_supply == 0 {
        0
    } else {
        ratio_decimal_bits(total_value as u128, lp_supply as u128)?
    };
    let previous = vault.high_water_mark.highest_asset_per_lp_decimal_bits;
    vault.high_water_mark.highest_asset_per_lp_decimal_bits = asset_per_lp;
    vault.high_water_mark.last_updated_ts = now;
    Ok((previous, asset_per_lp))
}

#[cfg(test)]
mod tests {
    use super::*;

    const YEAR: i64 = SECONDS_PER_YEAR as i64;

    fn vault(total_value: u64, lp_supply: u64) -> Vault {
        let mut vault = Vault::default();
        vault.asset.total_value = total_value;
        vault.asset.idle_amount = total_value;
        vault.lp.supply = lp_supply;
        vault.fee_update.last_management_fee_update_ts = 1;
        vault
    }

    #[test]
    fn one_year_management_fee_dilutes_half_a_percent() {
        let mut v = vault(1_000_000, 1_000_000);
        v.fee_configuration.manager_management_fee = 50;
        assert_eq!(project_lp_supply_incl_fees(&v, 1).unwrap(), 1_000_000);
        // 5_000 assets of fee -> ceil(5_000 * 1e6 / 995_000)
        assert_eq!(project_lp_supply_incl_fees(&v, 1 + YEAR).unwrap(), 1_005_026);
    }

    #[test]
    fn projection_needs_snapshot_rate_and_value() {
        let mut v = vault(1_000_000, 1_000_000);
        v.fee_configuration.admin_management_fee = 50;
        v.fee_update.last_management_fee_update_ts = 0;
        assert_eq!(project_lp_supply_incl_fees(&v, YEAR).unwrap(), 1_000_000);

        let mut v = vault(1_000_000, 1_000_000);
        assert_eq!(project_lp_supply_incl_fees(&v, YEAR).unwrap(), 1_000_000);

        v.fee_configuration.admin_management_fee = 50;
        v.asset.total_value = 0;
        v.asset.idle_amount = 0;
        assert_eq!(project_lp_supply_incl_fees(&v, YEAR).unwrap(), 1_000_000);
    }

    #[test]
    fn projection_includes_unminted_fees() {
        let mut v = vault(1_000_000, 1_000_000);
        v.fee_state.accumulated_lp_manager_fees = 40;
        v.fee_state.accumulated_lp_protocol_fees = 2;
        assert_eq!(project_lp_supply_incl_fees(&v, YEAR).unwrap(), 1_000_042);
    }

    #[test]
    fn fee_clamped_below_total_value() {
        let mut v = vault(1_000_000, 1_000_000);
        v.fee_configuration.manager_management_fee = 10_000;
        let projected = project_lp_supply_incl_fees(&v, 1 + 10 * YEAR).unwrap();
        assert_eq!(projected, 1_000_000 + 999_999 * 1_000_000);
    }

    #[test]
    fn management_fee_split_and_snapshot() {
        let mut v = vault(1_000_000, 1_000_000);
        v.fee_configuration.manager_management_fee = 50;
        v.fee_configuration.admin_management_fee = 50;
        v.fee_configuration.protocol_fee = 2_000;

        let before = project_lp_supply_incl_fees(&v, 1 + YEAR).unwrap();
        assert_eq!(before, 1_010_102);
        // 10_101.01 lp owed: the whole units are charged
        let fee_lp = accrue_management_fee(&mut v, 1 + YEAR).unwrap();
        assert_eq!(fee_lp, 10_101);
        assert_eq!(v.fee_state.accumulated_lp_manager_fees, 5_050);
        assert_eq!(v.fee_state.accumulated_lp_protocol_fees, 1_010);
        assert_eq!(v.fee_state.accumulated_lp_admin_fees, 4_041);
        // the last 31s are not paid for yet
        assert_eq!(v.fee_update.last_management_fee_update_ts, 1 + YEAR - 31);
        // crystallizing does not move the effective supply
        assert_eq!(project_lp_supply_incl_fees(&v, 1 + YEAR).unwrap(), before);
        assert_eq!(accrue_management_fee(&mut v, 1 + YEAR).unwrap(), 0);
    }

    #[test]
    fn sub_unit_fee_keeps_snapshot() {
        let mut v = vault(1_000_000, 1_000_000);
        v.fee_configuration.manager_management_fee = 50;
        assert_eq!(accrue_management_fee(&mut v, 2).unwrap(), 0);
        assert_eq!(v.fee_update.last_management_fee_update_ts, 1);
    }

    #[test]
    fn frequent_harvests_track_a_single_one() {
        let mut once = vault(1_000_000, 1_000_000);
        once.fee_configuration.manager_management_fee = 50;
        let mut often = once.clone();

        let single = harvest_fee(&mut once, 1 + YEAR).unwrap().manager_lp;
        assert_eq!(single, 5_025);

        let mut total = 0;
        let mut now = 1;
        while now < 1 + YEAR {
            now += 600;
            total += harvest_fee(&mut often, now).unwrap().manager_lp;
        }
        // minted fee lp is itself charged, so frequent harvests compound
        // slightly below the simple yearly rate
        assert!(total <= single, "{} > {}", total, single);
        assert!(single - total <= single / 200, "{} vs {}", total, single);
        assert_eq!(often.lp.supply, 1_000_000 + total);
    }

    #[test]
    fn first_accrual_sets_snapshot_without_charging() {
        let mut v = vault(1_000_000, 1_000_000);
        v.fee_configuration.manager_management_fee = 50;
        v.fee_update.last_management_fee_update_ts = 0;
        assert_eq!(accrue_management_fee(&mut v, 500).unwrap(), 0);
        assert_eq!(v.fee_update.last_management_fee_update_ts, 500);
    }

    #[test]
    fn performance_fee_only_above_high_water_mark() {
        let mut v = vault(1_000_000, 1_000_000);
        v.fee_update.last_management_fee_update_ts = 0;
        v.fee_configuration.manager_performance_fee = 1_000;

        // first observation seeds the mark at 1.0
        assert_eq!(accrue_performance_fee(&mut v, 10).unwrap(), 0);
        assert_eq!(v.high_water_mark.highest_asset_per_lp_decimal_bits, DECIMAL_ONE);

        v.asset.total_value = 1_200_000;
        let fee_lp = accrue_performance_fee(&mut v, 20).unwrap();
        assert_eq!(fee_lp, 16_949);
        assert_eq!(v.fee_state.accumulated_lp_manager_fees, 16_949);
        let mark = v.high_water_mark.highest_asset_per_lp_decimal_bits;
        assert!(mark > DECIMAL_ONE);
        assert_eq!(mark, ratio_decimal_bits(1_200_000, 1_016_949).unwrap());

        // same value: nothing new to charge
        assert_eq!(accrue_performance_fee(&mut v, 30).unwrap(), 0);

        // a drop never lowers the mark
        v.asset.total_value = 900_000;
        assert_eq!(accrue_performance_fee(&mut v, 40).unwrap(), 0);
        assert_eq!(v.high_water_mark.highest_asset_per_lp_decimal_bits, mark);

        // recovering to the old mark is not profit
        v.asset.total_value = 1_200_000;
        assert_eq!(accrue_performance_fee(&mut v, 50).unwrap(), 0);
    }

    #[test]
    fn performance_fee_ignores_locked_profit() {
        let mut v = vault(1_000_000, 1_000_000);
        v.fee_update.last_management_fee_update_ts = 0;
        v.fee_configuration.admin_performance_fee = 2_000;
        v.high_water_mark.highest_asset_per_lp_decimal_bits = DECIMAL_ONE;
        v.configuration.locked_profit_degradation_duration = 100;
        v.asset.total_value = 1_100_000;
        v.locked_profit_state.last_updated_locked_profit = 100_000;

        assert_eq!(accrue_performance_fee(&mut v, 0).unwrap(), 0);
        assert!(accrue_performance_fee(&mut v, 100).unwrap() > 0);
    }

    #[test]
    fn harvest_mints_and_is_idempotent() {
        let mut v = vault(1_000_000, 1_000_000);
        v.fee_configuration.manager_management_fee = 50;
        v.fee_configuration.admin_management_fee = 50;
        v.fee_configuration.protocol_fee = 2_000;

        let supply_before = project_lp_supply_incl_fees(&v, 1 + YEAR).unwrap();
        let harvested = harvest_fee(&mut v, 1 + YEAR).unwrap();
        assert_eq!(
            harvested,
            HarvestedFees {
                admin_lp: 4_041,
                manager_lp: 5_050,
                protocol_lp: 1_010,
            }
        );
        assert_eq!(v.lp.supply, 1_010_101);
        assert_eq!(v.fee_state, FeeState::default());
        assert_eq!(v.fee_update.last_management_fee_update_ts, 1 + YEAR - 31);
        assert_eq!(v.fee_update.last_performance_fee_update_ts, 1 + YEAR);
        assert_eq!(
            project_lp_supply_incl_fees(&v, 1 + YEAR).unwrap(),
            supply_before
        );

        let again = harvest_fee(&mut v, 1 + YEAR).unwrap();
        assert_eq!(again.total().unwrap(), 0);
        assert_eq!(v.lp.supply, 1_010_101);
    }

    #[test]
    fn calibration_can_lower_the_mark() {
        let mut v = vault(1_000_000, 1_000_000);
        v.high_water_mark.highest_asset_per_lp_decimal_bits = 2 * DECIMAL_ONE;
        let (previous, current) = calibrate_high_water_mark(&mut v, 10).unwrap();
        assert_eq!(previous, 2 * DECIMAL_ONE);
        assert_eq!(current, DECIMAL_ONE);
        assert_eq!(v.high_water_mark.highest_asset_per_lp_decimal_bits, DECIMAL_ONE);
        assert_eq!(v.high_water_mark.last_updated_ts, 10);
    }

    #[test]
    fn split_routes_protocol_cut_from_admin_side() {
        let split = split_fee_lp(1_000, 0, 100, 5_000).unwrap();
        assert_eq!(split.manager_lp, 0);
        assert_eq!(split.protocol_lp, 500);
        assert_eq!(split.admin_lp, 500);
        assert_eq!(split_fee_lp(1_000, 0, 0, 5_000).unwrap(), FeeSplit::default());
    }
}
