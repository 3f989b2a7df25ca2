//! Withdrawal request lifecycle.
//!
//! A request escrows LP and snapshots its asset value. After the waiting
//! period the request settles for the smaller of the snapshot and the value
//! of the escrowed LP at settlement time, so the vault's liability is fixed
//! when the request is made and a falling price is still passed on.

use crate::error::VaultErrorCode;
use crate::math::decimal_bits_floor;
use crate::share::{convert_assets_to_lp_for_withdraw, convert_lp_to_assets_decimal_bits};
use crate::state::{Vault, WithdrawalRequest};
use anchor_lang::prelude::*;

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestWithdrawVaultArgs {
    pub amount: u64,
    pub is_amount_in_lp: bool,
    pub is_withdraw_all: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SettledWithdrawal {
    pub asset_released: u64,
    pub lp_burned: u64,
}

/// LP a request escrows, resolved from the amount, the asset conversion or
/// the user's whole balance.
pub fn resolve_lp_amount(
    vault: &Vault,
    user_lp_balance: u64,
    args: &RequestWithdrawVaultArgs,
    now: i64,
) -> Result<u64> {
    let lp_amount = if args.is_withdraw_all {
        user_lp_balance
    } else {
        require!(args.amount > 0, VaultErrorCode::InvalidAmount);
        if args.is_amount_in_lp {
            args.amount
        } else {
            convert_assets_to_lp_for_withdraw(vault, args.amount, now)?
        }
    };
    require!(lp_amount > 0, VaultErrorCode::InvalidAmount);
    require!(
        lp_amount <= user_lp_balance,
        VaultErrorCode::InsufficientBalance
    );
    Ok(lp_amount)
}

/// Escrows LP against a new request. The caller removes the returned
/// `amount_lp_escrowed` from the user's balance.
pub fn request_withdraw(
    vault: &mut Vault,
    vault_key: Pubkey,
    user: Pubkey,
    user_lp_balance: u64,
    args: &RequestWithdrawVaultArgs,
    now: i64,
) -> Result<WithdrawalRequest> {
    let lp_amount = resolve_lp_amount(vault, user_lp_balance, args, now)?;
    let snapshot = convert_lp_to_assets_decimal_bits(vault, lp_amount, now)?;
    let withdrawable_from_ts = now
        .checked_add(vault.configuration.withdrawal_waiting_period)
        .ok_or(VaultErrorCode::MathOverflow)?;

    vault.lp.escrowed_amount = vault
        .lp
        .escrowed_amount
        .checked_add(lp_amount)
        .ok_or(VaultErrorCode::MathOverflow)?;

    msg!(
        "Withdrawal requested: {} lp escrowed, snapshot {} decimal bits, withdrawable from {}",
        lp_amount,
        snapshot,
        withdrawable_from_ts
    );

    Ok(WithdrawalRequest {
        vault: vault_key,
        user,
        amount_lp_escrowed: lp_amount,
        amount_asset_to_withdraw_decimal_bits: snapshot,
        requested_ts: now,
        withdrawable_from_ts,
    })
}

/// Releases the escrow of a request. Returns the LP owed back to the user.
pub fn cancel_request_withdraw(vault: &mut Vault, request: &WithdrawalRequest) -> Result<u64> {
    vault.lp.escrowed_amount = vault
        .lp
        .escrowed_amount
        .checked_sub(request.amount_lp_escrowed)
        .ok_or(VaultErrorCode::InvalidVaultState)?;
    msg!(
        "Withdrawal request cancelled: {} lp returned",
        request.amount_lp_escrowed
    );
    Ok(request.amount_lp_escrowed)
}

/// Payout of a request if it settled at `now`, ignoring the waiting period.
pub fn pending_withdrawal(vault: &Vault, request: &WithdrawalRequest, now: i64) -> Result<u64> {
    let present = convert_lp_to_assets_decimal_bits(vault, request.amount_lp_escrowed, now)?;
    decimal_bits_floor(present.min(request.amount_asset_to_withdraw_decimal_bits))
}

/// Burns the escrowed LP and pays the capped amount out of idle assets.
pub fn settle_withdraw(
    vault: &mut Vault,
    request: &WithdrawalRequest,
    now: i64,
) -> Result<SettledWithdrawal> {
    require!(
        now >= request.withdrawable_from_ts,
        VaultErrorCode::WithdrawalNotYetAvailable
    );
    let asset_released = pending_withdrawal(vault, request, now)?;
    require!(
        asset_released <= vault.asset.idle_amount,
        VaultErrorCode::InsufficientIdleAssets
    );

    let lp_burned = request.amount_lp_escrowed;
    vault.lp.escrowed_amount = vault
        .lp
        .escrowed_amount
        .checked_sub(lp_burned)
        .ok_or(VaultErrorCode::InvalidVaultState)?;
    vault.lp.supply = vault
        .lp
        .supply
        .checked_sub(lp_burned)
        .ok_or(VaultErrorCode::InvalidVaultState)?;
    vault.asset.idle_amount -= asset_released;
    vault.asset.total_value = vault
        .asset
        .total_value
        .checked_sub(asset_released)
        .ok_or(VaultErrorCode::InvalidVaultState)?;

    msg!(
        "Withdrawal settled: {} lp burned, {} assets released",
        lp_burned,
        asset_released
    );
    Ok(SettledWithdrawal {
        asset_released,
        lp_burned,
    })
}
