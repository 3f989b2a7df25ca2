use anchor_lang::prelude::*;

#[error_code]
pub enum VaultErrorCode {
    #[msg("Invalid amount: zero or out of range input")]
    InvalidAmount = 1,
    #[msg("Invalid LP supply: fee-inclusive LP supply must be positive to convert LP to assets")]
    InvalidLpSupply = 2,
    #[msg("Invalid total assets: total unlocked value must be positive to price shares")]
    InvalidTotalAssets = 3,
    #[msg("Math overflow")]
    MathOverflow = 4,
    #[msg("A withdrawal request is already open for this user")]
    AlreadyRequested = 5,
    #[msg("Insufficient LP balance for the requested withdrawal")]
    InsufficientBalance = 6,
    #[msg("Withdrawal waiting period has not elapsed")]
    WithdrawalNotYetAvailable = 7,
    #[msg("Invalid fee configuration: rates must not exceed 10000 bps alone or combined")]
    InvalidFeeConfiguration = 8,
    #[msg("Invalid vault state: ledger invariant violated")]
    InvalidVaultState = 9,

    #[msg("Deposit would exceed the vault max cap")]
    MaxCapExceeded = 10,
    #[msg("Vault does not accept deposits before its start time")]
    VaultNotStarted = 11,
    #[msg("Deposit amount is too small - would not receive any LP tokens")]
    DepositTooSmall = 12,
    #[msg("Signer is not the vault admin")]
    InvalidAdmin = 13,
    #[msg("Signer is not the vault manager")]
    InvalidManager = 14,
    #[msg("Invalid withdrawal waiting period")]
    InvalidWaitingPeriod = 15,
    #[msg("Invalid locked profit degradation duration")]
    InvalidDegradationDuration = 16,
    #[msg("No withdrawal request is open for this user")]
    WithdrawalRequestNotFound = 17,
    #[msg("Insufficient idle assets in the vault")]
    InsufficientIdleAssets = 18,

    #[msg("Strategy is already added to the vault")]
    StrategyAlreadyAdded = 19,
    #[msg("Strategy is not added to the vault")]
    StrategyNotFound = 20,
    #[msg("Strategy still holds assets")]
    StrategyNotEmpty = 21,
    #[msg("Insufficient strategy balance")]
    InsufficientStrategyBalance = 22,
    #[msg("Invalid strategy exchange rate")]
    InvalidExchangeRate = 23,
}
