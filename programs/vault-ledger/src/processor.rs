use crate::adaptor::StrategyAdaptor;
use crate::error::VaultErrorCode;
use crate::events::*;
use crate::fee::{accrue_fees, calibrate_high_water_mark as calibrate, harvest_fee as harvest, HarvestedFees};
use crate::ledger::VaultLedger;
use crate::locked_profit::{locked_profit, report_total_value as report};
use crate::pda;
use crate::share::{convert_assets_to_lp, convert_lp_to_assets, share_price};
use crate::state::{HighWaterMark, Vault, VaultConfigField, VaultParams, WithdrawalRequest};
use crate::withdrawal::{self, RequestWithdrawVaultArgs};
use anchor_lang::prelude::*;

/*
# Fee crystallization

Every handler that moves assets or LP first runs `accrue_fees`, so the
management fee owed since the last update and any performance fee above the
high-water mark are booked at the rates and totals in force before the
operation. Read-only queries project the same management fee without
booking it, which keeps quotes and execution on the same share price.

Handlers work on a copy of the vault record and store it back only after
`validate_invariants` passes, so a failed operation leaves the ledger as it
was.
 */

pub fn initialize(
    address: Pubkey,
    params: VaultParams,
    protocol_fee_recipient: Pubkey,
    now: i64,
) -> Result<VaultLedger> {
    params.configuration.validate()?;
    params.fee_configuration.validate()?;

    let mut vault = Vault {
        admin: params.admin,
        manager: params.manager,
        configuration: params.configuration,
        fee_configuration: params.fee_configuration,
        ..Vault::default()
    };
    vault.asset.mint = params.asset_mint;
    vault.asset.decimals = params.asset_decimals;
    vault.lp.mint = pda::vault_lp_mint(&address);
    vault.lp.decimals = params.lp_decimals;
    vault.locked_profit_state.last_report = now;

    msg!(
        "Initializing vault {} for asset {} with lp mint {}",
        address,
        vault.asset.mint,
        vault.lp.mint
    );
    msg!(
        "Max cap: {}, start at: {}, waiting period: {}, degradation duration: {}",
        vault.configuration.max_cap,
        vault.configuration.start_at_ts,
        vault.configuration.withdrawal_waiting_period,
        vault.configuration.locked_profit_degradation_duration
    );

    let mut ledger = VaultLedger::new(address, Vault::default(), protocol_fee_recipient);
    ledger.commit(vault, now)?;

    emit!(VaultInitialized {
        vault: address,
        admin: params.admin,
        manager: params.manager,
        asset_mint: params.asset_mint,
        lp_mint: ledger.vault.lp.mint,
    });
    Ok(ledger)
}

pub fn update_vault_config(
    ledger: &mut VaultLedger,
    signer: Pubkey,
    field: VaultConfigField,
    now: i64,
) -> Result<()> {
    require_keys_eq!(signer, ledger.vault.admin, VaultErrorCode::InvalidAdmin);

    let mut vault = ledger.vault.clone();
    if field.is_fee_rate() {
        // fees owed so far are charged at the old rate
        accrue_fees(&mut vault, now)?;
    }
    if let VaultConfigField::LockedProfitDegradationDuration(_) = field {
        // restart the schedule from what is still locked under the old duration
        vault.locked_profit_state.last_updated_locked_profit = locked_profit(&vault, now)?;
        vault.locked_profit_state.last_report = now;
    }
    field.apply(&mut vault)?;
    ledger.commit(vault, now)?;

    msg!("Vault config updated: {:?}", field);
    emit!(VaultConfigUpdated {
        vault: ledger.address,
        signer,
        field,
    });
    Ok(())
}

pub fn deposit(ledger: &mut VaultLedger, user: Pubkey, amount: u64, now: i64) -> Result<u64> {
    require!(amount > 0, VaultErrorCode::InvalidAmount);
    require!(
        now >= ledger.vault.configuration.start_at_ts,
        VaultErrorCode::VaultNotStarted
    );

    let mut vault = ledger.vault.clone();
    accrue_fees(&mut vault, now)?;

    msg!("Current total_value: {}", vault.asset.total_value);
    msg!("Current lp supply: {}", vault.lp.supply);
    msg!("Deposit amount: {}", amount);

    let total_value = vault
        .asset
        .total_value
        .checked_add(amount)
        .ok_or(VaultErrorCode::MathOverflow)?;
    require!(
        total_value <= vault.configuration.max_cap,
        VaultErrorCode::MaxCapExceeded
    );

    let lp_to_mint = convert_assets_to_lp(&vault, amount, now)?;
    msg!("LP to mint calculated: {}", lp_to_mint);
    require!(lp_to_mint > 0, VaultErrorCode::DepositTooSmall);

    vault.asset.total_value = total_value;
    vault.asset.idle_amount = vault
        .asset
        .idle_amount
        .checked_add(amount)
        .ok_or(VaultErrorCode::MathOverflow)?;
    vault.lp.supply = vault
        .lp
        .supply
        .checked_add(lp_to_mint)
        .ok_or(VaultErrorCode::MathOverflow)?;

    if vault.high_water_mark.highest_asset_per_lp_decimal_bits == 0 {
        vault.high_water_mark = HighWaterMark {
            highest_asset_per_lp_decimal_bits: share_price(&vault, now)?,
            last_updated_ts: now,
        };
    }

    ledger.commit(vault, now)?;
    ledger.credit_lp(user, lp_to_mint)?;

    msg!("Emitting DepositEvent");
    emit!(DepositEvent {
        vault: ledger.address,
        user,
        deposit_amount: amount,
        minted_amount: lp_to_mint,
        lp_supply: ledger.vault.lp.supply,
        idle_amount: ledger.vault.asset.idle_amount,
        total_value: ledger.vault.asset.total_value,
        ts: now,
    });
    msg!("Emitted DepositEvent");

    Ok(lp_to_mint)
}

pub fn request_withdraw(
    ledger: &mut VaultLedger,
    user: Pubkey,
    args: RequestWithdrawVaultArgs,
    now: i64,
) -> Result<WithdrawalRequest> {
    msg!("Starting request withdraw process");
    require!(
        !ledger.requests.contains_key(&user),
        VaultErrorCode::AlreadyRequested
    );

    let mut vault = ledger.vault.clone();
    accrue_fees(&mut vault, now)?;

    let user_lp_balance = ledger.lp_balance(&user);
    let request = withdrawal::request_withdraw(
        &mut vault,
        ledger.address,
        user,
        user_lp_balance,
        &args,
        now,
    )?;

    ledger.commit(vault, now)?;
    ledger.debit_lp(&user, request.amount_lp_escrowed)?;
    ledger.requests.insert(user, request.clone());

    msg!(
        "Request receipt: {}",
        pda::request_withdraw_vault_receipt(&ledger.address, &user)
    );
    emit!(RequestWithdrawEvent {
        vault: ledger.address,
        user,
        amount_lp_escrowed: request.amount_lp_escrowed,
        amount_asset_to_withdraw_decimal_bits: request.amount_asset_to_withdraw_decimal_bits,
        withdrawable_from_ts: request.withdrawable_from_ts,
    });

    Ok(request)
}

pub fn cancel_request_withdraw(ledger: &mut VaultLedger, user: Pubkey, now: i64) -> Result<u64> {
    let request = ledger
        .requests
        .get(&user)
        .cloned()
        .ok_or(VaultErrorCode::WithdrawalRequestNotFound)?;

    let mut vault = ledger.vault.clone();
    let lp_returned = withdrawal::cancel_request_withdraw(&mut vault, &request)?;

    ledger.commit(vault, now)?;
    ledger.requests.remove(&user);
    ledger.credit_lp(user, lp_returned)?;

    emit!(CancelRequestWithdrawEvent {
        vault: ledger.address,
        user,
        lp_returned,
    });
    Ok(lp_returned)
}

pub fn withdraw(ledger: &mut VaultLedger, user: Pubkey, now: i64) -> Result<u64> {
    msg!("Starting withdraw process");
    let request = ledger
        .requests
        .get(&user)
        .cloned()
        .ok_or(VaultErrorCode::WithdrawalRequestNotFound)?;

    let mut vault = ledger.vault.clone();
    accrue_fees(&mut vault, now)?;
    msg!("total_value: {}", vault.asset.total_value);
    msg!("idle_amount: {}", vault.asset.idle_amount);

    let settled = withdrawal::settle_withdraw(&mut vault, &request, now)?;
    ledger.commit(vault, now)?;
    ledger.requests.remove(&user);

    msg!("Emitting WithdrawEvent");
    emit!(WithdrawEvent {
        vault: ledger.address,
        user,
        strategy: None,
        lp_burned: settled.lp_burned,
        asset_released: settled.asset_released,
        lp_supply: ledger.vault.lp.supply,
        total_value: ledger.vault.asset.total_value,
        ts: now,
    });
    msg!("Emitted WithdrawEvent");

    Ok(settled.asset_released)
}

/// Settles a request with assets pulled straight out of one strategy.
pub fn direct_withdraw_strategy(
    ledger: &mut VaultLedger,
    user: Pubkey,
    strategy: Pubkey,
    now: i64,
) -> Result<u64> {
    msg!("Starting direct withdraw process");
    let request = ledger
        .requests
        .get(&user)
        .cloned()
        .ok_or(VaultErrorCode::WithdrawalRequestNotFound)?;
    require!(
        ledger.strategies.contains_key(&strategy),
        VaultErrorCode::StrategyNotFound
    );
    require!(
        now >= request.withdrawable_from_ts,
        VaultErrorCode::WithdrawalNotYetAvailable
    );

    let mut vault = ledger.vault.clone();
    accrue_fees(&mut vault, now)?;
    let deployed = ledger.deployed_value()?;
    refresh(&mut vault, deployed, now)?;

    let payout = withdrawal::pending_withdrawal(&vault, &request, now)?;
    msg!("Amount to withdraw calculated: {}", payout);
    if payout > 0 {
        let adaptor = ledger
            .strategies
            .get_mut(&strategy)
            .ok_or(VaultErrorCode::StrategyNotFound)?;
        let received = adaptor.withdraw(payout)?;
        vault.asset.idle_amount = vault
            .asset
            .idle_amount
            .checked_add(received)
            .ok_or(VaultErrorCode::MathOverflow)?;
    }

    let settled = withdrawal::settle_withdraw(&mut vault, &request, now)?;
    let deployed = ledger.deployed_value()?;
    refresh(&mut vault, deployed, now)?;
    ledger.commit(vault, now)?;
    ledger.requests.remove(&user);

    msg!(
        "Direct withdraw receipt: {}",
        pda::direct_withdraw_init_receipt(&ledger.address, &strategy)
    );
    emit!(WithdrawEvent {
        vault: ledger.address,
        user,
        strategy: Some(strategy),
        lp_burned: settled.lp_burned,
        asset_released: settled.asset_released,
        lp_supply: ledger.vault.lp.supply,
        total_value: ledger.vault.asset.total_value,
        ts: now,
    });

    Ok(settled.asset_released)
}

pub fn harvest_fee(ledger: &mut VaultLedger, now: i64) -> Result<HarvestedFees> {
    let mut vault = ledger.vault.clone();
    let harvested = harvest(&mut vault, now)?;
    ledger.commit(vault, now)?;

    let admin = ledger.vault.admin;
    let manager = ledger.vault.manager;
    let protocol = ledger.protocol_fee_recipient;
    ledger.credit_lp(admin, harvested.admin_lp)?;
    ledger.credit_lp(manager, harvested.manager_lp)?;
    ledger.credit_lp(protocol, harvested.protocol_lp)?;

    msg!(
        "Harvested fees: admin {}, manager {}, protocol {} to {}",
        harvested.admin_lp,
        harvested.manager_lp,
        harvested.protocol_lp,
        pda::vault_lp_fee_auth(&ledger.address)
    );
    emit!(HarvestFeeEvent {
        vault: ledger.address,
        admin_lp: harvested.admin_lp,
        manager_lp: harvested.manager_lp,
        protocol_lp: harvested.protocol_lp,
        lp_supply: ledger.vault.lp.supply,
        ts: now,
    });
    Ok(harvested)
}

pub fn calibrate_high_water_mark(ledger: &mut VaultLedger, signer: Pubkey, now: i64) -> Result<()> {
    require_keys_eq!(signer, ledger.vault.admin, VaultErrorCode::InvalidAdmin);

    let mut vault = ledger.vault.clone();
    let (old, new) = calibrate(&mut vault, now)?;
    ledger.commit(vault, now)?;

    msg!("High-water mark calibrated: {} -> {}", old, new);
    emit!(HighWaterMarkCalibrated {
        vault: ledger.address,
        admin: signer,
        old_highest_asset_per_lp_decimal_bits: old,
        new_highest_asset_per_lp_decimal_bits: new,
        ts: now,
    });
    Ok(())
}

pub fn add_strategy(
    ledger: &mut VaultLedger,
    signer: Pubkey,
    strategy: Pubkey,
    adaptor: Box<dyn StrategyAdaptor>,
) -> Result<()> {
    require_keys_eq!(signer, ledger.vault.admin, VaultErrorCode::InvalidAdmin);
    require!(
        !ledger.strategies.contains_key(&strategy),
        VaultErrorCode::StrategyAlreadyAdded
    );
    require!(
        adaptor.current_value()? == 0,
        VaultErrorCode::StrategyNotEmpty
    );

    let strategy_type = adaptor.strategy_type();
    ledger.strategies.insert(strategy, adaptor);

    msg!(
        "Strategy {} ({:?}) added, init receipt {}",
        strategy,
        strategy_type,
        pda::strategy_init_receipt(&ledger.address, &strategy)
    );
    emit!(StrategyAdded {
        vault: ledger.address,
        strategy,
        strategy_type,
    });
    Ok(())
}

pub fn remove_strategy(ledger: &mut VaultLedger, signer: Pubkey, strategy: Pubkey) -> Result<()> {
    require_keys_eq!(signer, ledger.vault.admin, VaultErrorCode::InvalidAdmin);
    let adaptor = ledger
        .strategies
        .get(&strategy)
        .ok_or(VaultErrorCode::StrategyNotFound)?;
    require!(
        adaptor.current_value()? == 0,
        VaultErrorCode::StrategyNotEmpty
    );
    ledger.strategies.remove(&strategy);

    msg!("Strategy {} removed", strategy);
    emit!(StrategyRemoved {
        vault: ledger.address,
        strategy,
    });
    Ok(())
}

pub fn deposit_strategy(
    ledger: &mut VaultLedger,
    signer: Pubkey,
    strategy: Pubkey,
    amount: u64,
    now: i64,
) -> Result<()> {
    require_keys_eq!(signer, ledger.vault.manager, VaultErrorCode::InvalidManager);
    require!(amount > 0, VaultErrorCode::InvalidAmount);
    require!(
        ledger.strategies.contains_key(&strategy),
        VaultErrorCode::StrategyNotFound
    );
    require!(
        amount <= ledger.vault.asset.idle_amount,
        VaultErrorCode::InsufficientIdleAssets
    );

    let mut vault = ledger.vault.clone();
    accrue_fees(&mut vault, now)?;
    let deployed = ledger.deployed_value()?;
    refresh(&mut vault, deployed, now)?;

    let adaptor = ledger
        .strategies
        .get_mut(&strategy)
        .ok_or(VaultErrorCode::StrategyNotFound)?;
    adaptor.deposit(amount)?;
    let strategy_value = adaptor.current_value()?;
    vault.asset.idle_amount -= amount;

    let deployed = ledger.deployed_value()?;
    refresh(&mut vault, deployed, now)?;
    ledger.commit(vault, now)?;

    msg!(
        "Deposited {} into strategy {} via {}",
        amount,
        strategy,
        pda::vault_strategy_auth(&ledger.address, &strategy)
    );
    emit!(StrategyAllocationUpdated {
        vault: ledger.address,
        strategy,
        amount,
        is_withdraw: false,
        strategy_value,
        idle_amount: ledger.vault.asset.idle_amount,
    });
    Ok(())
}

pub fn withdraw_strategy(
    ledger: &mut VaultLedger,
    signer: Pubkey,
    strategy: Pubkey,
    amount: u64,
    now: i64,
) -> Result<u64> {
    require_keys_eq!(signer, ledger.vault.manager, VaultErrorCode::InvalidManager);
    require!(amount > 0, VaultErrorCode::InvalidAmount);

    let mut vault = ledger.vault.clone();
    accrue_fees(&mut vault, now)?;
    let deployed = ledger.deployed_value()?;
    refresh(&mut vault, deployed, now)?;

    let adaptor = ledger
        .strategies
        .get_mut(&strategy)
        .ok_or(VaultErrorCode::StrategyNotFound)?;
    let received = adaptor.withdraw(amount)?;
    let strategy_value = adaptor.current_value()?;
    vault.asset.idle_amount = vault
        .asset
        .idle_amount
        .checked_add(received)
        .ok_or(VaultErrorCode::MathOverflow)?;

    let deployed = ledger.deployed_value()?;
    refresh(&mut vault, deployed, now)?;
    ledger.commit(vault, now)?;

    msg!("Withdrew {} from strategy {}", received, strategy);
    emit!(StrategyAllocationUpdated {
        vault: ledger.address,
        strategy,
        amount: received,
        is_withdraw: true,
        strategy_value,
        idle_amount: ledger.vault.asset.idle_amount,
    });
    Ok(received)
}

/// Pushes a protocol index into a strategy. Takes effect on the next refresh.
pub fn update_strategy_index(
    ledger: &mut VaultLedger,
    signer: Pubkey,
    strategy: Pubkey,
    index: u128,
) -> Result<()> {
    require_keys_eq!(signer, ledger.vault.manager, VaultErrorCode::InvalidManager);

    let adaptor = ledger
        .strategies
        .get_mut(&strategy)
        .ok_or(VaultErrorCode::StrategyNotFound)?;
    adaptor.set_index(index)?;
    msg!(
        "Strategy {} index updated to {}, value {}",
        strategy,
        index,
        adaptor.current_value()?
    );
    Ok(())
}

/// Re-prices the vault as idle assets plus every strategy's current value.
pub fn refresh_total_value(ledger: &mut VaultLedger, now: i64) -> Result<u64> {
    let mut vault = ledger.vault.clone();
    accrue_fees(&mut vault, now)?;
    let old_total_value = vault.asset.total_value;
    let deployed = ledger.deployed_value()?;
    refresh(&mut vault, deployed, now)?;
    ledger.commit(vault, now)?;

    emit_total_value_reported(ledger, old_total_value, now)?;
    Ok(ledger.vault.asset.total_value)
}

/// Records a total value computed outside the ledger.
pub fn report_total_value(
    ledger: &mut VaultLedger,
    signer: Pubkey,
    new_total_value: u64,
    now: i64,
) -> Result<()> {
    require_keys_eq!(signer, ledger.vault.manager, VaultErrorCode::InvalidManager);

    let mut vault = ledger.vault.clone();
    accrue_fees(&mut vault, now)?;
    let old_total_value = vault.asset.total_value;
    report(&mut vault, new_total_value, now)?;
    ledger.commit(vault, now)?;

    emit_total_value_reported(ledger, old_total_value, now)
}

fn refresh(vault: &mut Vault, deployed: u64, now: i64) -> Result<()> {
    let total_value = vault
        .asset
        .idle_amount
        .checked_add(deployed)
        .ok_or(VaultErrorCode::MathOverflow)?;
    report(vault, total_value, now)
}

fn emit_total_value_reported(ledger: &VaultLedger, old_total_value: u64, now: i64) -> Result<()> {
    emit!(TotalValueReported {
        vault: ledger.address,
        old_total_value,
        new_total_value: ledger.vault.asset.total_value,
        locked_profit: locked_profit(&ledger.vault, now)?,
        ts: now,
    });
    Ok(())
}

pub fn preview_deposit(ledger: &VaultLedger, amount: u64, now: i64) -> Result<u64> {
    let lp = convert_assets_to_lp(&ledger.vault, amount, now)?;
    msg!("preview_deposit: {} assets = {} lp", amount, lp);
    Ok(lp)
}

pub fn preview_withdraw(ledger: &VaultLedger, lp_amount: u64, now: i64) -> Result<u64> {
    let assets = convert_lp_to_assets(&ledger.vault, lp_amount, now)?;
    msg!("preview_withdraw: {} lp = {} assets", lp_amount, assets);
    Ok(assets)
}

pub fn pending_withdrawal(ledger: &VaultLedger, user: &Pubkey, now: i64) -> Result<u64> {
    let request = ledger
        .requests
        .get(user)
        .ok_or(VaultErrorCode::WithdrawalRequestNotFound)?;
    withdrawal::pending_withdrawal(&ledger.vault, request, now)
}
