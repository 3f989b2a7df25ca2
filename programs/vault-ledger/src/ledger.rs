use crate::adaptor::StrategyAdaptor;
use crate::error::VaultErrorCode;
use crate::state::{Vault, WithdrawalRequest};
use anchor_lang::prelude::*;
use std::collections::BTreeMap;

/// One vault together with the holdings that hang off it: LP balances per
/// owner, the open withdrawal request of each user and the strategies the
/// vault deploys into.
///
/// Invariant: the LP balances plus `vault.lp.escrowed_amount` add up to
/// `vault.lp.supply`.
pub struct VaultLedger {
    pub address: Pubkey,
    pub vault: Vault,
    /// Receives the protocol share of harvested fees.
    pub protocol_fee_recipient: Pubkey,
    pub(crate) lp_balances: BTreeMap<Pubkey, u64>,
    pub(crate) requests: BTreeMap<Pubkey, WithdrawalRequest>,
    pub(crate) strategies: BTreeMap<Pubkey, Box<dyn StrategyAdaptor>>,
}

impl VaultLedger {
    pub(crate) fn new(address: Pubkey, vault: Vault, protocol_fee_recipient: Pubkey) -> Self {
        Self {
            address,
            vault,
            protocol_fee_recipient,
            lp_balances: BTreeMap::new(),
            requests: BTreeMap::new(),
            strategies: BTreeMap::new(),
        }
    }

    pub fn lp_balance(&self, owner: &Pubkey) -> u64 {
        self.lp_balances.get(owner).copied().unwrap_or(0)
    }

    pub fn lp_balances(&self) -> impl Iterator<Item = (&Pubkey, &u64)> {
        self.lp_balances.iter()
    }

    pub fn withdrawal_request(&self, user: &Pubkey) -> Option<&WithdrawalRequest> {
        self.requests.get(user)
    }

    pub fn strategy(&self, strategy: &Pubkey) -> Option<&dyn StrategyAdaptor> {
        self.strategies.get(strategy).map(|adaptor| adaptor.as_ref())
    }

    pub fn strategy_keys(&self) -> impl Iterator<Item = &Pubkey> {
        self.strategies.keys()
    }

    pub(crate) fn credit_lp(&mut self, owner: Pubkey, amount: u64) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self.lp_balances.entry(owner).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(VaultErrorCode::MathOverflow)?;
        Ok(())
    }

    pub(crate) fn debit_lp(&mut self, owner: &Pubkey, amount: u64) -> Result<()> {
        let balance = self
            .lp_balances
            .get_mut(owner)
            .ok_or(VaultErrorCode::InsufficientBalance)?;
        *balance = balance
            .checked_sub(amount)
            .ok_or(VaultErrorCode::InsufficientBalance)?;
        if *balance == 0 {
            self.lp_balances.remove(owner);
        }
        Ok(())
    }

    /// Sum of the strategies' current values.
    pub(crate) fn deployed_value(&self) -> Result<u64> {
        self.strategies.values().try_fold(0u64, |total, adaptor| {
            Ok(total
                .checked_add(adaptor.current_value()?)
                .ok_or(VaultErrorCode::MathOverflow)?)
        })
    }

    /// Replaces the vault record once it passes the invariant checks.
    pub(crate) fn commit(&mut self, vault: Vault, now: i64) -> Result<()> {
        vault.validate_invariants(now)?;
        self.vault = vault;
        Ok(())
    }
}
