//! Strategy adaptors.
//!
//! A strategy deploys idle vault assets into an external lending protocol.
//! Each protocol accounts for the position in its own unit (collateral
//! tokens, bank shares, scaled balances) priced by an index that only the
//! protocol advances, so every adaptor holds a unit balance plus the latest
//! index pushed in by the host.

use crate::error::VaultErrorCode;
use crate::math::{checked_u64, mul_div_ceil, mul_div_floor, pow10, DECIMAL_ONE};
use anchor_lang::prelude::*;

/// Reserve exchange rates are quoted with 18 decimals.
pub const WAD: u128 = 1_000_000_000_000_000_000;
pub const SPOT_CUMULATIVE_INTEREST_PRECISION: u128 = 10_000_000_000; // 1e10
pub const SPOT_BALANCE_DECIMALS: u8 = 9;
pub const SPOT_CUMULATIVE_INTEREST_DECIMALS: u8 = 10;

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyType {
    Solend,
    Drift,
    Marginfi,
    Kamino,
}

/// Capability surface the vault needs from a backing protocol.
pub trait StrategyAdaptor {
    fn strategy_type(&self) -> StrategyType;

    /// Deploys `amount` assets into the protocol.
    fn deposit(&mut self, amount: u64) -> Result<()>;

    /// Redeems at least `amount` assets from the protocol and returns what
    /// was received.
    fn withdraw(&mut self, amount: u64) -> Result<u64>;

    /// Asset value of the position at the last pushed index.
    fn current_value(&self) -> Result<u64>;

    /// Pushes the protocol's latest price index, in the adaptor's own unit.
    fn set_index(&mut self, index: u128) -> Result<()>;
}

/// Units minted for `amount` at `price` (assets per unit scaled by `scale`).
fn units_for_deposit(amount: u64, price: u128, scale: u128) -> Result<u64> {
    checked_u64(mul_div_floor(amount as u128, scale, price)?)
}

/// Units burned to redeem at least `amount`.
fn units_for_withdraw(amount: u64, price: u128, scale: u128) -> Result<u64> {
    checked_u64(mul_div_ceil(amount as u128, scale, price)?)
}

fn value_of(units: u64, price: u128, scale: u128) -> Result<u64> {
    checked_u64(mul_div_floor(units as u128, price, scale)?)
}

/// Burns the units backing `amount` out of `balance` and returns the assets
/// they redeem for.
fn redeem(balance: &mut u64, amount: u64, price: u128, scale: u128) -> Result<u64> {
    require!(amount > 0, VaultErrorCode::InvalidAmount);
    let units = units_for_withdraw(amount, price, scale)?;
    require!(
        units <= *balance,
        VaultErrorCode::InsufficientStrategyBalance
    );
    *balance -= units;
    value_of(units, price, scale)
}

/// Lending reserve that mints collateral tokens (Solend, Kamino).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollateralReserveAdaptor {
    strategy_type: StrategyType,
    collateral_amount: u64,
    /// Liquidity per collateral token, WAD scaled.
    exchange_rate_wad: u128,
}

impl CollateralReserveAdaptor {
    pub fn new(strategy_type: StrategyType) -> Result<Self> {
        require!(
            matches!(strategy_type, StrategyType::Solend | StrategyType::Kamino),
            VaultErrorCode::InvalidExchangeRate
        );
        Ok(Self {
            strategy_type,
            collateral_amount: 0,
            exchange_rate_wad: WAD,
        })
    }

    pub fn collateral_amount(&self) -> u64 {
        self.collateral_amount
    }

    pub fn set_exchange_rate(&mut self, exchange_rate_wad: u128) -> Result<()> {
        require!(exchange_rate_wad > 0, VaultErrorCode::InvalidExchangeRate);
        self.exchange_rate_wad = exchange_rate_wad;
        Ok(())
    }
}

impl StrategyAdaptor for CollateralReserveAdaptor {
    fn strategy_type(&self) -> StrategyType {
        self.strategy_type
    }

    fn deposit(&mut self, amount: u64) -> Result<()> {
        require!(amount > 0, VaultErrorCode::InvalidAmount);
        let minted = units_for_deposit(amount, self.exchange_rate_wad, WAD)?;
        self.collateral_amount = self
            .collateral_amount
            .checked_add(minted)
            .ok_or(VaultErrorCode::MathOverflow)?;
        Ok(())
    }

    fn withdraw(&mut self, amount: u64) -> Result<u64> {
        redeem(
            &mut self.collateral_amount,
            amount,
            self.exchange_rate_wad,
            WAD,
        )
    }

    fn current_value(&self) -> Result<u64> {
        value_of(self.collateral_amount, self.exchange_rate_wad, WAD)
    }

    fn set_index(&mut self, index: u128) -> Result<()> {
        self.set_exchange_rate(index)
    }
}

/// Marginfi bank position held as asset shares.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarginfiAdaptor {
    asset_shares: u64,
    /// Assets per share, 48 fractional bits.
    asset_share_value: u128,
}

impl Default for MarginfiAdaptor {
    fn default() -> Self {
        Self {
            asset_shares: 0,
            asset_share_value: DECIMAL_ONE,
        }
    }
}

impl MarginfiAdaptor {
    pub fn asset_shares(&self) -> u64 {
        self.asset_shares
    }

    pub fn set_asset_share_value(&mut self, asset_share_value: u128) -> Result<()> {
        require!(asset_share_value > 0, VaultErrorCode::InvalidExchangeRate);
        self.asset_share_value = asset_share_value;
        Ok(())
    }
}

impl StrategyAdaptor for MarginfiAdaptor {
    fn strategy_type(&self) -> StrategyType {
        StrategyType::Marginfi
    }

    fn deposit(&mut self, amount: u64) -> Result<()> {
        require!(amount > 0, VaultErrorCode::InvalidAmount);
        let shares = units_for_deposit(amount, self.asset_share_value, DECIMAL_ONE)?;
        self.asset_shares = self
            .asset_shares
            .checked_add(shares)
            .ok_or(VaultErrorCode::MathOverflow)?;
        Ok(())
    }

    fn withdraw(&mut self, amount: u64) -> Result<u64> {
        redeem(
            &mut self.asset_shares,
            amount,
            self.asset_share_value,
            DECIMAL_ONE,
        )
    }

    fn current_value(&self) -> Result<u64> {
        value_of(self.asset_shares, self.asset_share_value, DECIMAL_ONE)
    }

    fn set_index(&mut self, index: u128) -> Result<()> {
        self.set_asset_share_value(index)
    }
}

/// Drift spot market deposit held as a scaled balance.
///
/// `token_amount = scaled_balance * cumulative_deposit_interest / 10^(19 - decimals)`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriftSpotAdaptor {
    scaled_balance: u64,
    cumulative_deposit_interest: u128,
    precision_decrease: u128,
}

impl DriftSpotAdaptor {
    pub fn new(asset_decimals: u8) -> Result<Self> {
        let total_decimals = SPOT_BALANCE_DECIMALS + SPOT_CUMULATIVE_INTEREST_DECIMALS;
        require!(
            asset_decimals <= total_decimals,
            VaultErrorCode::InvalidExchangeRate
        );
        Ok(Self {
            scaled_balance: 0,
            cumulative_deposit_interest: SPOT_CUMULATIVE_INTEREST_PRECISION,
            precision_decrease: pow10(total_decimals - asset_decimals)?,
        })
    }

    pub fn scaled_balance(&self) -> u64 {
        self.scaled_balance
    }

    pub fn set_cumulative_deposit_interest(&mut self, cumulative_deposit_interest: u128) -> Result<()> {
        require!(
            cumulative_deposit_interest > 0,
            VaultErrorCode::InvalidExchangeRate
        );
        self.cumulative_deposit_interest = cumulative_deposit_interest;
        Ok(())
    }
}

impl StrategyAdaptor for DriftSpotAdaptor {
    fn strategy_type(&self) -> StrategyType {
        StrategyType::Drift
    }

    fn deposit(&mut self, amount: u64) -> Result<()> {
        require!(amount > 0, VaultErrorCode::InvalidAmount);
        let scaled = units_for_deposit(
            amount,
            self.cumulative_deposit_interest,
            self.precision_decrease,
        )?;
        self.scaled_balance = self
            .scaled_balance
            .checked_add(scaled)
            .ok_or(VaultErrorCode::MathOverflow)?;
        Ok(())
    }

    fn withdraw(&mut self, amount: u64) -> Result<u64> {
        redeem(
            &mut self.scaled_balance,
            amount,
            self.cumulative_deposit_interest,
            self.precision_decrease,
        )
    }

    fn current_value(&self) -> Result<u64> {
        value_of(
            self.scaled_balance,
            self.cumulative_deposit_interest,
            self.precision_decrease,
        )
    }

    fn set_index(&mut self, index: u128) -> Result<()> {
        self.set_cumulative_deposit_interest(index)
    }
}
