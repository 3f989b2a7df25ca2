//! Deterministic account addresses of a vault and its strategies.

use anchor_lang::prelude::*;

pub const VAULT_LP_MINT_SEED: &[u8] = b"vault_lp_mint";
pub const VAULT_LP_FEE_AUTH_SEED: &[u8] = b"vault_lp_fee_auth";
pub const VAULT_ASSET_IDLE_AUTH_SEED: &[u8] = b"vault_asset_idle_auth";
pub const VAULT_STRATEGY_AUTH_SEED: &[u8] = b"vault_strategy_auth";
pub const STRATEGY_INIT_RECEIPT_SEED: &[u8] = b"strategy_init_receipt";
pub const DIRECT_WITHDRAW_INIT_RECEIPT_SEED: &[u8] = b"direct_withdraw_init_receipt";
pub const ADAPTOR_ADD_RECEIPT_SEED: &[u8] = b"adaptor_add_receipt";
pub const REQUEST_WITHDRAW_VAULT_RECEIPT_SEED: &[u8] = b"request_withdraw_vault_receipt";

/// Program address for `namespace` followed by `components`, with its bump.
pub fn derive_address(namespace: &[u8], components: &[&Pubkey]) -> (Pubkey, u8) {
    let mut seeds: Vec<&[u8]> = Vec::with_capacity(components.len() + 1);
    seeds.push(namespace);
    seeds.extend(components.iter().map(|key| key.as_ref()));
    Pubkey::find_program_address(&seeds, &crate::ID)
}

pub fn vault_lp_mint(vault: &Pubkey) -> Pubkey {
    derive_address(VAULT_LP_MINT_SEED, &[vault]).0
}

pub fn vault_lp_fee_auth(vault: &Pubkey) -> Pubkey {
    derive_address(VAULT_LP_FEE_AUTH_SEED, &[vault]).0
}

pub fn vault_asset_idle_auth(vault: &Pubkey) -> Pubkey {
    derive_address(VAULT_ASSET_IDLE_AUTH_SEED, &[vault]).0
}

pub fn vault_strategy_auth(vault: &Pubkey, strategy: &Pubkey) -> Pubkey {
    derive_address(VAULT_STRATEGY_AUTH_SEED, &[vault, strategy]).0
}

pub fn strategy_init_receipt(vault: &Pubkey, strategy: &Pubkey) -> Pubkey {
    derive_address(STRATEGY_INIT_RECEIPT_SEED, &[vault, strategy]).0
}

pub fn direct_withdraw_init_receipt(vault: &Pubkey, strategy: &Pubkey) -> Pubkey {
    derive_address(DIRECT_WITHDRAW_INIT_RECEIPT_SEED, &[vault, strategy]).0
}

pub fn adaptor_add_receipt(vault: &Pubkey, adaptor_program: &Pubkey) -> Pubkey {
    derive_address(ADAPTOR_ADD_RECEIPT_SEED, &[vault, adaptor_program]).0
}

/// Address of the request a user holds against a vault.
pub fn request_withdraw_vault_receipt(vault: &Pubkey, user: &Pubkey) -> Pubkey {
    derive_address(REQUEST_WITHDRAW_VAULT_RECEIPT_SEED, &[vault, user]).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_are_deterministic_and_scoped() {
        let vault = Pubkey::new_unique();
        let other_vault = Pubkey::new_unique();
        let user = Pubkey::new_unique();

        assert_eq!(vault_lp_mint(&vault), vault_lp_mint(&vault));
        assert_ne!(vault_lp_mint(&vault), vault_lp_mint(&other_vault));
        assert_ne!(vault_lp_mint(&vault), vault_asset_idle_auth(&vault));
        assert_ne!(
            request_withdraw_vault_receipt(&vault, &user),
            request_withdraw_vault_receipt(&other_vault, &user)
        );
    }

    #[test]
    fn derived_address_matches_program_derivation() {
        let vault = Pubkey::new_unique();
        let strategy = Pubkey::new_unique();
        let (address, bump) = derive_address(VAULT_STRATEGY_AUTH_SEED, &[&vault, &strategy]);
        let recreated = Pubkey::create_program_address(
            &[
                VAULT_STRATEGY_AUTH_SEED,
                vault.as_ref(),
                strategy.as_ref(),
                &[bump],
            ],
            &crate::ID,
        )
        .unwrap();
        assert_eq!(address, recreated);
    }
}
