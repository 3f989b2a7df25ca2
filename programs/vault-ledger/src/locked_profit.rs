//! Locked-profit degradation.
//!
//! Profit reported by strategies is not reflected in the share price at once.
//! It is added to a locked amount that unlocks linearly over
//! `locked_profit_degradation_duration` seconds, and only the unlocked part of
//! `total_value` is ever used to price shares.

use crate::error::VaultErrorCode;
use crate::math::mul_div_floor;
use crate::state::Vault;
use anchor_lang::prelude::*;

/// Portion of `last_updated_locked_profit` still locked at `now`.
///
/// A zero duration disables locking. A clock earlier than `last_report` counts
/// as no elapsed time.
pub fn calculate_locked_profit(
    last_updated_locked_profit: u64,
    degradation_duration: i64,
    last_report: i64,
    now: i64,
) -> Result<u64> {
    if degradation_duration <= 0 {
        return Ok(0);
    }
    let duration = now.saturating_sub(last_report).max(0);
    if duration >= degradation_duration {
        return Ok(0);
    }
    let remaining = (degradation_duration - duration) as u128;
    let locked = mul_div_floor(
        last_updated_locked_profit as u128,
        remaining,
        degradation_duration as u128,
    )?;
    // remaining < duration so locked <= last_updated_locked_profit
    Ok(locked as u64)
}

pub fn locked_profit(vault: &Vault, now: i64) -> Result<u64> {
    calculate_locked_profit(
        vault.locked_profit_state.last_updated_locked_profit,
        vault.configuration.locked_profit_degradation_duration,
        vault.locked_profit_state.last_report,
        now,
    )
}

/// Total value minus the profit still locked at `now`.
pub fn total_unlocked_value(vault: &Vault, now: i64) -> Result<u64> {
    let locked = locked_profit(vault, now)?;
    Ok(vault
        .asset
        .total_value
        .checked_sub(locked)
        .ok_or(VaultErrorCode::InvalidVaultState)?)
}

/// Records a new total value reported by the strategy-accounting side.
///
/// A gain is added on top of the profit still locked. A loss is absorbed by
/// the locked profit first, so it only reaches the share price once the
/// locked amount is exhausted.
pub fn report_total_value(vault: &mut Vault, new_total_value: u64, now: i64) -> Result<()> {
    require!(
        new_total_value >= vault.asset.idle_amount,
        VaultErrorCode::InvalidVaultState
    );
    let still_locked = locked_profit(vault, now)?;
    let previous_total_value = vault.asset.total_value;

    let locked = if new_total_value >= previous_total_value {
        let profit = new_total_value - previous_total_value;
        still_locked
            .checked_add(profit)
            .ok_or(VaultErrorCode::MathOverflow)?
    } else {
        let loss = previous_total_value - new_total_value;
        still_locked.saturating_sub(loss)
    };

    // nothing to smooth when degradation is disabled
    let locked = if vault.configuration.locked_profit_degradation_duration == 0 {
        0
    } else {
        locked.min(new_total_value)
    };

    msg!(
        "Reported total value: {} -> {}, locked profit: {}",
        previous_total_value,
        new_total_value,
        locked
    );

    vault.asset.total_value = new_total_value;
    vault.locked_profit_state.last_updated_locked_profit = locked;
    vault.locked_profit_state.last_report = now;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1_000, 100, 0, 0 => 1_000 ; "at report time everything is locked")]
    #[test_case(1_000, 100, 0, 100 => 0 ; "exactly at duration everything is unlocked")]
    #[test_case(1_000, 100, 0, 250 => 0 ; "past duration")]
    #[test_case(1_000, 100, 0, 25 => 750 ; "linear quarter")]
    #[test_case(1_000, 0, 0, 0 => 0 ; "disabled")]
    #[test_case(1_000, 100, 50, 10 => 1_000 ; "clock before report")]
    #[test_case(999, 1_000, 0, 1 => 998 ; "truncates")]
    fn locked_profit_schedule(profit: u64, duration: i64, last_report: i64, now: i64) -> u64 {
        calculate_locked_profit(profit, duration, last_report, now).unwrap()
    }

    #[test]
    fn zero_duration_ignores_time() {
        for now in [-5, 0, 1, 1_000_000] {
            assert_eq!(calculate_locked_profit(77, 0, 0, now).unwrap(), 0);
        }
    }

    fn vault_with_value(total_value: u64, duration: i64) -> Vault {
        let mut vault = Vault::default();
        vault.asset.total_value = total_value;
        vault.configuration.locked_profit_degradation_duration = duration;
        vault
    }

    #[test]
    fn reported_profit_unlocks_linearly() {
        let mut vault = vault_with_value(1_000_000, 1_000);
        report_total_value(&mut vault, 1_100_000, 10_000).unwrap();

        assert_eq!(vault.asset.total_value, 1_100_000);
        assert_eq!(total_unlocked_value(&vault, 10_000).unwrap(), 1_000_000);
        assert_eq!(total_unlocked_value(&vault, 10_500).unwrap(), 1_050_000);
        assert_eq!(total_unlocked_value(&vault, 11_000).unwrap(), 1_100_000);
    }

    #[test]
    fn second_report_stacks_on_remaining_lock() {
        let mut vault = vault_with_value(1_000_000, 1_000);
        report_total_value(&mut vault, 1_100_000, 0).unwrap();
        // half unlocked, 50_000 still locked, another 20_000 arrives
        report_total_value(&mut vault, 1_120_000, 500).unwrap();
        assert_eq!(vault.locked_profit_state.last_updated_locked_profit, 70_000);
        assert_eq!(total_unlocked_value(&vault, 500).unwrap(), 1_050_000);
    }

    #[test]
    fn loss_consumes_locked_profit_first() {
        let mut vault = vault_with_value(1_000_000, 1_000);
        report_total_value(&mut vault, 1_100_000, 0).unwrap();
        report_total_value(&mut vault, 1_060_000, 0).unwrap();
        assert_eq!(vault.locked_profit_state.last_updated_locked_profit, 60_000);
        assert_eq!(total_unlocked_value(&vault, 0).unwrap(), 1_000_000);

        report_total_value(&mut vault, 900_000, 0).unwrap();
        assert_eq!(vault.locked_profit_state.last_updated_locked_profit, 0);
        assert_eq!(total_unlocked_value(&vault, 0).unwrap(), 900_000);
    }

    #[test]
    fn disabled_degradation_reports_immediately() {
        let mut vault = vault_with_value(1_000_000, 0);
        report_total_value(&mut vault, 1_500_000, 0).unwrap();
        assert_eq!(total_unlocked_value(&vault, 0).unwrap(), 1_500_000);
    }

    #[test]
    fn report_below_idle_is_rejected() {
        let mut vault = vault_with_value(1_000, 100);
        vault.asset.idle_amount = 600;
        assert_eq!(
            report_total_value(&mut vault, 500, 0).unwrap_err(),
            VaultErrorCode::InvalidVaultState.into()
        );
    }
}
