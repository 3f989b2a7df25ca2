pub mod adaptor;
/// # vault ledger - Share-Based Yield Vault Accounting
///
/// ## Business Process Flow
///
/// 1. Initial Setup:
///    - Admin creates a vault for one asset mint with its fee rates, max cap,
///      start time, withdrawal waiting period and profit degradation window
///    - The vault LP mint and authorities are derived from the vault address
///    - Admin registers strategies, each backed by a lending protocol adaptor
///
/// 2. User Deposit Flow:
///    - User deposits assets once the vault has started and below the max cap
///    - Assets are held idle until the manager deploys them to a strategy
///    - User receives LP priced on the unlocked vault value and the
///      fee-inclusive LP supply, less the issuance fee
///
/// 3. Withdrawal Flow:
///    a. Request:
///       - User escrows LP by LP amount, asset amount or whole balance
///       - The asset value of the escrowed LP is snapshotted
///       - The waiting period timer starts
///
///    b. Waiting Period:
///       - User can cancel and get the escrowed LP back unchanged
///       - The projected payout can be queried at any time
///
///    c. Settlement:
///       - After the waiting period the escrowed LP is burned
///       - User receives the lower of the snapshot and the present value,
///         net of the redemption fee, from idle assets or directly from a
///         strategy
///
/// 4. Fees and Profit:
///    - Management fees accrue continuously as LP dilution
///    - Performance fees are charged on value per LP above the high-water mark
///    - Fee LP is split between manager, admin and protocol and minted on
///      harvest
///    - Reported profit unlocks linearly over the degradation window before it
///      reaches the share price
///
/// 5. Administrative Functions:
///    - Update configuration one field at a time
///    - Recalibrate the high-water mark
///    - Manager moves assets between idle and strategies and reports value
///
/// Every operation takes the current unix timestamp from the caller. Each
/// mutating operation runs against a copy of the vault and only lands once
/// the vault invariants hold.
pub mod error;
pub mod events;
pub mod fee;
pub mod ledger;
pub mod locked_profit;
pub mod math;
pub mod pda;
pub mod processor;
pub mod share;
pub mod state;
pub mod withdrawal;

use adaptor::StrategyAdaptor;
use anchor_lang::prelude::*;
use fee::HarvestedFees;
pub use ledger::VaultLedger;
use state::{VaultConfigField, VaultParams, WithdrawalRequest};
use withdrawal::RequestWithdrawVaultArgs;

declare_id!("EwAei87GBsgeLueC7mShT2TNbH3BYumP4RskusxUFBn6");

impl VaultLedger {
    /// Creates a vault:
    /// - address: the vault account, seeds every derived address
    /// - params: authorities, asset, LP decimals and configuration
    /// - protocol_fee_recipient: receives the protocol cut of harvested fees
    pub fn initialize(
        address: Pubkey,
        params: VaultParams,
        protocol_fee_recipient: Pubkey,
        now: i64,
    ) -> Result<Self> {
        processor::initialize(address, params, protocol_fee_recipient, now)
    }

    /// Changes one configuration field. Admin only. Fee rate changes accrue
    /// fees at the old rate first.
    pub fn update_vault_config(
        &mut self,
        signer: Pubkey,
        field: VaultConfigField,
        now: i64,
    ) -> Result<()> {
        processor::update_vault_config(self, signer, field, now)
    }

    /// Handles user deposits:
    /// - Adds the assets to the idle balance
    /// - Mints LP to the user, returns the amount minted
    pub fn deposit(&mut self, user: Pubkey, amount: u64, now: i64) -> Result<u64> {
        processor::deposit(self, user, amount, now)
    }

    /// Opens a withdrawal request:
    /// - Escrows the user's LP
    /// - Snapshots its asset value and starts the waiting period
    pub fn request_withdraw(
        &mut self,
        user: Pubkey,
        args: RequestWithdrawVaultArgs,
        now: i64,
    ) -> Result<WithdrawalRequest> {
        processor::request_withdraw(self, user, args, now)
    }

    /// Closes the user's request and returns the escrowed LP.
    pub fn cancel_request_withdraw(&mut self, user: Pubkey, now: i64) -> Result<u64> {
        processor::cancel_request_withdraw(self, user, now)
    }

    /// Completes a request after the waiting period:
    /// - Burns the escrowed LP
    /// - Pays out of idle assets, returns the amount released
    pub fn withdraw(&mut self, user: Pubkey, now: i64) -> Result<u64> {
        processor::withdraw(self, user, now)
    }

    /// Completes a request with assets redeemed from `strategy`.
    pub fn direct_withdraw_strategy(
        &mut self,
        user: Pubkey,
        strategy: Pubkey,
        now: i64,
    ) -> Result<u64> {
        processor::direct_withdraw_strategy(self, user, strategy, now)
    }

    /// Mints accumulated fee LP to the admin, the manager and the protocol.
    pub fn harvest_fee(&mut self, now: i64) -> Result<HarvestedFees> {
        processor::harvest_fee(self, now)
    }

    /// Resets the high-water mark to the current value per LP. Admin only.
    pub fn calibrate_high_water_mark(&mut self, signer: Pubkey, now: i64) -> Result<()> {
        processor::calibrate_high_water_mark(self, signer, now)
    }

    pub fn add_strategy(
        &mut self,
        signer: Pubkey,
        strategy: Pubkey,
        adaptor: Box<dyn StrategyAdaptor>,
    ) -> Result<()> {
        processor::add_strategy(self, signer, strategy, adaptor)
    }

    pub fn remove_strategy(&mut self, signer: Pubkey, strategy: Pubkey) -> Result<()> {
        processor::remove_strategy(self, signer, strategy)
    }

    /// Moves idle assets into a strategy. Manager only.
    pub fn deposit_strategy(
        &mut self,
        signer: Pubkey,
        strategy: Pubkey,
        amount: u64,
        now: i64,
    ) -> Result<()> {
        processor::deposit_strategy(self, signer, strategy, amount, now)
    }

    /// Moves assets from a strategy back to idle. Manager only. Returns the
    /// assets received.
    pub fn withdraw_strategy(
        &mut self,
        signer: Pubkey,
        strategy: Pubkey,
        amount: u64,
        now: i64,
    ) -> Result<u64> {
        processor::withdraw_strategy(self, signer, strategy, amount, now)
    }

    /// Pushes the latest protocol index (exchange rate, share value or
    /// cumulative interest) into a strategy adaptor. Manager only.
    pub fn update_strategy_index(
        &mut self,
        signer: Pubkey,
        strategy: Pubkey,
        index: u128,
    ) -> Result<()> {
        processor::update_strategy_index(self, signer, strategy, index)
    }

    /// Re-prices the vault from idle assets and strategy values.
    pub fn refresh_total_value(&mut self, now: i64) -> Result<u64> {
        processor::refresh_total_value(self, now)
    }

    /// Records a total value computed outside the ledger. Manager only.
    pub fn report_total_value(&mut self, signer: Pubkey, total_value: u64, now: i64) -> Result<()> {
        processor::report_total_value(self, signer, total_value, now)
    }

    /// Asset value per LP, 48 fractional bits.
    pub fn share_price(&self, now: i64) -> Result<u128> {
        share::share_price(&self.vault, now)
    }

    pub fn pending_withdrawal(&self, user: &Pubkey, now: i64) -> Result<u64> {
        processor::pending_withdrawal(self, user, now)
    }

    /// LP a deposit of `amount` would mint at `now`.
    pub fn calculate_lp_for_deposit(&self, amount: u64, now: i64) -> Result<u64> {
        processor::preview_deposit(self, amount, now)
    }

    /// Assets `lp_amount` would redeem for at `now`.
    pub fn calculate_assets_for_withdraw(&self, lp_amount: u64, now: i64) -> Result<u64> {
        processor::preview_withdraw(self, lp_amount, now)
    }
}
