use crate::adaptor::StrategyType;
use anchor_lang::prelude::*;

#[event]
pub struct VaultInitialized {
    pub vault: Pubkey,
    pub admin: Pubkey,
    pub manager: Pubkey,
    pub asset_mint: Pubkey,
    pub lp_mint: Pubkey,
}

#[event]
pub struct VaultConfigUpdated {
    pub vault: Pubkey,
    pub signer: Pubkey,
    pub field: crate::state::VaultConfigField,
}

#[event]
pub struct DepositEvent {
    pub vault: Pubkey,
    pub user: Pubkey,
    pub deposit_amount: u64,
    pub minted_amount: u64,
    pub lp_supply: u64,
    pub idle_amount: u64,
    pub total_value: u64,
    pub ts: i64,
}

#[event]
pub struct RequestWithdrawEvent {
    pub vault: Pubkey,
    pub user: Pubkey,
    pub amount_lp_escrowed: u64,
    pub amount_asset_to_withdraw_decimal_bits: u128,
    pub withdrawable_from_ts: i64,
}

#[event]
pub struct CancelRequestWithdrawEvent {
    pub vault: Pubkey,
    pub user: Pubkey,
    pub lp_returned: u64,
}

#[event]
pub struct WithdrawEvent {
    pub vault: Pubkey,
    pub user: Pubkey,
    /// Set when the payout came straight out of a strategy.
    pub strategy: Option<Pubkey>,
    pub lp_burned: u64,
    pub asset_released: u64,
    pub lp_supply: u64,
    pub total_value: u64,
    pub ts: i64,
}

#[event]
pub struct HarvestFeeEvent {
    pub vault: Pubkey,
    pub admin_lp: u64,
    pub manager_lp: u64,
    pub protocol_lp: u64,
    pub lp_supply: u64,
    pub ts: i64,
}

#[event]
pub struct HighWaterMarkCalibrated {
    pub vault: Pubkey,
    pub admin: Pubkey,
    pub old_highest_asset_per_lp_decimal_bits: u128,
    pub new_highest_asset_per_lp_decimal_bits: u128,
    pub ts: i64,
}

#[event]
pub struct TotalValueReported {
    pub vault: Pubkey,
    pub old_total_value: u64,
    pub new_total_value: u64,
    pub locked_profit: u64,
    pub ts: i64,
}

#[event]
pub struct StrategyAdded {
    pub vault: Pubkey,
    pub strategy: Pubkey,
    pub strategy_type: StrategyType,
}

#[event]
pub struct StrategyRemoved {
    pub vault: Pubkey,
    pub strategy: Pubkey,
}

#[event]
pub struct StrategyAllocationUpdated {
    pub vault: Pubkey,
    pub strategy: Pubkey,
    /// Assets moved into the strategy, or out of it when `is_withdraw` is set.
    pub amount: u64,
    pub is_withdraw: bool,
    pub strategy_value: u64,
    pub idle_amount: u64,
}
