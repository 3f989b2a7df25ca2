use crate::error::VaultErrorCode;
use anchor_lang::prelude::*;

pub const MAX_FEE_BPS: u16 = 10_000;
pub const MAX_WITHDRAWAL_WAITING_PERIOD: i64 = 31_536_000; // 365 days in seconds
pub const MAX_LOCKED_PROFIT_DEGRADATION_DURATION: i64 = 31_536_000; // 365 days in seconds

#[account]
#[derive(Default, Debug, PartialEq)]
pub struct Vault {
    pub admin: Pubkey,
    pub manager: Pubkey,
    pub asset: VaultAsset,
    pub lp: VaultLp,
    pub configuration: VaultConfiguration,
    pub fee_configuration: FeeConfiguration,
    pub fee_state: FeeState,
    pub fee_update: FeeUpdate,
    pub high_water_mark: HighWaterMark,
    pub locked_profit_state: LockedProfitState,
}

impl Vault {
    /// Minted supply plus fee LP owed but not yet minted.
    pub fn lp_supply_incl_accumulated_fees(&self) -> Result<u64> {
        Ok(self
            .lp
            .supply
            .checked_add(self.fee_state.total()?)
            .ok_or(VaultErrorCode::MathOverflow)?)
    }

    /// Checks the cross-field invariants every operation must leave intact.
    pub fn validate_invariants(&self, now: i64) -> Result<()> {
        require!(
            self.asset.idle_amount <= self.asset.total_value,
            VaultErrorCode::InvalidVaultState
        );
        require!(
            crate::locked_profit::locked_profit(self, now)? <= self.asset.total_value,
            VaultErrorCode::InvalidVaultState
        );
        require!(
            self.lp.escrowed_amount <= self.lp.supply,
            VaultErrorCode::InvalidVaultState
        );
        Ok(())
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct VaultAsset {
    pub mint: Pubkey,
    pub decimals: u8,
    /// Assets held by the vault and not deployed to any strategy.
    pub idle_amount: u64,
    /// Idle plus deployed value backing all shares.
    pub total_value: u64,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct VaultLp {
    pub mint: Pubkey,
    pub decimals: u8,
    pub supply: u64,
    /// LP held against open withdrawal requests. Still part of `supply`.
    pub escrowed_amount: u64,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct VaultConfiguration {
    pub max_cap: u64,
    pub start_at_ts: i64,
    pub locked_profit_degradation_duration: i64,
    pub withdrawal_waiting_period: i64,
}

impl VaultConfiguration {
    pub fn validate(&self) -> Result<()> {
        require!(
            (0..=MAX_WITHDRAWAL_WAITING_PERIOD).contains(&self.withdrawal_waiting_period),
            VaultErrorCode::InvalidWaitingPeriod
        );
        require!(
            (0..=MAX_LOCKED_PROFIT_DEGRADATION_DURATION)
                .contains(&self.locked_profit_degradation_duration),
            VaultErrorCode::InvalidDegradationDuration
        );
        Ok(())
    }
}

/// Fee rates in basis points.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct FeeConfiguration {
    pub manager_performance_fee: u16,
    pub admin_performance_fee: u16,
    pub manager_management_fee: u16,
    pub admin_management_fee: u16,
    pub redemption_fee: u16,
    pub issuance_fee: u16,
    /// Protocol cut of the admin side of every management and performance fee.
    pub protocol_fee: u16,
}

impl FeeConfiguration {
    pub fn total_management_fee(&self) -> u32 {
        self.manager_management_fee as u32 + self.admin_management_fee as u32
    }

    pub fn total_performance_fee(&self) -> u32 {
        self.manager_performance_fee as u32 + self.admin_performance_fee as u32
    }

    pub fn validate(&self) -> Result<()> {
        let rates = [
            self.manager_performance_fee,
            self.admin_performance_fee,
            self.manager_management_fee,
            self.admin_management_fee,
            self.redemption_fee,
            self.issuance_fee,
            self.protocol_fee,
        ];
        require!(
            rates.iter().all(|rate| *rate <= MAX_FEE_BPS),
            VaultErrorCode::InvalidFeeConfiguration
        );
        require!(
            self.total_management_fee() <= MAX_FEE_BPS as u32,
            VaultErrorCode::InvalidFeeConfiguration
        );
        require!(
            self.total_performance_fee() <= MAX_FEE_BPS as u32,
            VaultErrorCode::InvalidFeeConfiguration
        );
        // a 100% entry or exit fee leaves nothing to convert
        require!(
            self.redemption_fee < MAX_FEE_BPS && self.issuance_fee < MAX_FEE_BPS,
            VaultErrorCode::InvalidFeeConfiguration
        );
        Ok(())
    }
}

/// LP owed to each fee recipient and not yet minted.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct FeeState {
    pub accumulated_lp_admin_fees: u64,
    pub accumulated_lp_manager_fees: u64,
    pub accumulated_lp_protocol_fees: u64,
}

impl FeeState {
    pub fn total(&self) -> Result<u64> {
        Ok(self
            .accumulated_lp_admin_fees
            .checked_add(self.accumulated_lp_manager_fees)
            .and_then(|sum| sum.checked_add(self.accumulated_lp_protocol_fees))
            .ok_or(VaultErrorCode::MathOverflow)?)
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct FeeUpdate {
    pub last_performance_fee_update_ts: i64,
    pub last_management_fee_update_ts: i64,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct HighWaterMark {
    /// Highest asset value per LP seen, 48 fractional bits.
    pub highest_asset_per_lp_decimal_bits: u128,
    pub last_updated_ts: i64,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct LockedProfitState {
    pub last_updated_locked_profit: u64,
    pub last_report: i64,
}

#[account]
#[derive(Default, Debug, PartialEq)]
pub struct WithdrawalRequest {
    pub vault: Pubkey,
    pub user: Pubkey,
    pub amount_lp_escrowed: u64,
    /// Asset value of the escrowed LP at request time, 48 fractional bits.
    pub amount_asset_to_withdraw_decimal_bits: u128,
    pub requested_ts: i64,
    pub withdrawable_from_ts: i64,
}

/// Parameters for creating a vault.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq)]
pub struct VaultParams {
    pub admin: Pubkey,
    pub manager: Pubkey,
    pub asset_mint: Pubkey,
    pub asset_decimals: u8,
    pub lp_decimals: u8,
    pub configuration: VaultConfiguration,
    pub fee_configuration: FeeConfiguration,
}

/// A single configuration change applied by `update_vault_config`.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VaultConfigField {
    MaxCap(u64),
    StartAtTs(i64),
    LockedProfitDegradationDuration(i64),
    WithdrawalWaitingPeriod(i64),
    ManagerPerformanceFee(u16),
    AdminPerformanceFee(u16),
    ManagerManagementFee(u16),
    AdminManagementFee(u16),
    RedemptionFee(u16),
    IssuanceFee(u16),
    ProtocolFee(u16),
    Manager(Pubkey),
}

impl VaultConfigField {
    /// Whether the change alters a fee rate, in which case fees owed at the
    /// old rate are accrued first.
    pub fn is_fee_rate(&self) -> bool {
        matches!(
            self,
            VaultConfigField::ManagerPerformanceFee(_)
                | VaultConfigField::AdminPerformanceFee(_)
                | VaultConfigField::ManagerManagementFee(_)
                | VaultConfigField::AdminManagementFee(_)
                | VaultConfigField::RedemptionFee(_)
                | VaultConfigField::IssuanceFee(_)
                | VaultConfigField::ProtocolFee(_)
        )
    }

    pub fn apply(&self, vault: &mut Vault) -> Result<()> {
        let mut configuration = vault.configuration;
        let mut fees = vault.fee_configuration;
        match *self {
            VaultConfigField::MaxCap(value) => configuration.max_cap = value,
            VaultConfigField::StartAtTs(value) => configuration.start_at_ts = value,
            VaultConfigField::LockedProfitDegradationDuration(value) => {
                configuration.locked_profit_degradation_duration = value
            }
            VaultConfigField::WithdrawalWaitingPeriod(value) => {
                configuration.withdrawal_waiting_period = value
            }
            VaultConfigField::ManagerPerformanceFee(value) => fees.manager_performance_fee = value,
            VaultConfigField::AdminPerformanceFee(value) => fees.admin_performance_fee = value,
            VaultConfigField::ManagerManagementFee(value) => fees.manager_management_fee = value,
            VaultConfigField::AdminManagementFee(value) => fees.admin_management_fee = value,
            VaultConfigField::RedemptionFee(value) => fees.redemption_fee = value,
            VaultConfigField::IssuanceFee(value) => fees.issuance_fee = value,
            VaultConfigField::ProtocolFee(value) => fees.protocol_fee = value,
            VaultConfigField::Manager(manager) => vault.manager = manager,
        }
        configuration.validate()?;
        fees.validate()?;
        vault.configuration = configuration;
        vault.fee_configuration = fees;
        Ok(())
    }
}
