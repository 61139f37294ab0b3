#![cfg(test)]
use super::*;
use commons_shared::INDEX_SCALE;
use soroban_sdk::{
    testutils::Address as _,
    token::{Client as TokenClient, StellarAssetClient},
    Env, I256,
};

fn create_test_contract() -> (Env, Address, YieldLedgerContractClient<'static>) {
    let env = Env::default();
    let contract_id = env.register_contract(None, YieldLedgerContract);
    let client = YieldLedgerContractClient::new(&env, &contract_id);
    (env, contract_id, client)
}

/// Initializes the ledger with a funded reward token and returns
/// (admin, manager, reward_token).
fn setup_ledger(
    env: &Env,
    contract_id: &Address,
    client: &YieldLedgerContractClient,
) -> (Address, Address, Address) {
    let admin = Address::generate(env);
    let manager = Address::generate(env);
    let token_admin = Address::generate(env);
    let reward_token = env.register_stellar_asset_contract(token_admin);

    env.mock_all_auths();

    client.initialize(&admin, &manager, &reward_token);
    StellarAssetClient::new(env, &reward_token).mint(contract_id, &10_000_000i128);

    (admin, manager, reward_token)
}

fn units(env: &Env, n: i128) -> I256 {
    I256::from_i128(env, n).mul(&I256::from_i128(env, INDEX_SCALE))
}

#[test]
fn test_initialize() {
    let (env, contract_id, client) = create_test_contract();
    let (admin, manager, reward_token) = setup_ledger(&env, &contract_id, &client);

    let config = client.get_config();
    assert_eq!(config.admin, admin);
    assert_eq!(config.manager, manager);
    assert_eq!(config.reward_token, reward_token);

    let state = client.get_global_state();
    assert_eq!(state.cumulative_yield_per_share, units(&env, 0));
    assert_eq!(state.total_effective_stake, 0);
}

#[test]
fn test_initialize_twice_fails() {
    let (env, contract_id, client) = create_test_contract();
    let (admin, manager, reward_token) = setup_ledger(&env, &contract_id, &client);

    let result = client.try_initialize(&admin, &manager, &reward_token);
    assert_eq!(result, Err(Ok(LedgerError::AlreadyInitialized)));
}

#[test]
fn test_calls_before_initialize_fail() {
    let (env, _contract_id, client) = create_test_contract();
    let manager = Address::generate(&env);
    env.mock_all_auths();

    let result = client.try_report_interest(&manager, &10, &10);
    assert_eq!(result, Err(Ok(LedgerError::NotInitialized)));
}

#[test]
fn test_yield_scenario_with_donation() {
    let (env, contract_id, client) = create_test_contract();
    let (_admin, manager, reward_token) = setup_ledger(&env, &contract_id, &client);
    let staker = Address::generate(&env);

    assert_eq!(client.record_stake(&manager, &staker, &20, &0, &0), 20);
    assert_eq!(client.record_stake(&manager, &staker, &10, &3_000, &100), 7);

    let state = client.get_global_state();
    assert_eq!(state.cumulative_yield_per_share, units(&env, 5));
    assert_eq!(state.total_effective_stake, 27);

    let position = client.get_position(&staker).unwrap();
    assert_eq!(position.principal, 30);
    assert_eq!(position.effective_stake, 27);
    assert_eq!(position.donation_ratio_bps, 3_000);
    assert_eq!(position.yield_debt, units(&env, 35));

    client.report_interest(&manager, &27, &27);
    assert_eq!(client.get_global_state().cumulative_yield_per_share, units(&env, 6));

    assert_eq!(client.claimable_yield(&staker), 12_700);

    assert_eq!(client.withdraw_yield(&staker), 12_700);
    assert_eq!(TokenClient::new(&env, &reward_token).balance(&staker), 12_700);
    assert_eq!(client.get_position(&staker).unwrap().withdrawn, 12_700);
    assert_eq!(client.get_global_state().total_withdrawn, 12_700);
}

#[test]
fn test_withdraw_twice_pays_nothing_second_time() {
    let (env, contract_id, client) = create_test_contract();
    let (_admin, manager, reward_token) = setup_ledger(&env, &contract_id, &client);
    let staker = Address::generate(&env);

    client.record_stake(&manager, &staker, &50, &0, &0);
    client.report_interest(&manager, &25, &25);

    assert_eq!(client.withdraw_yield(&staker), 2_500);
    assert_eq!(client.withdraw_yield(&staker), 0);
    assert_eq!(client.claimable_yield(&staker), 0);
    assert_eq!(TokenClient::new(&env, &reward_token).balance(&staker), 2_500);
}

#[test]
fn test_raised_debt_clamps_claimable_to_zero() {
    let (env, contract_id, client) = create_test_contract();
    let (admin, manager, _reward_token) = setup_ledger(&env, &contract_id, &client);
    let staker = Address::generate(&env);

    client.record_stake(&manager, &staker, &20, &0, &0);
    client.record_stake(&manager, &staker, &10, &3_000, &100);
    client.report_interest(&manager, &27, &27);
    client.withdraw_yield(&staker);

    client.set_yield_debt(&admin, &staker, &3);

    let position = client.get_position(&staker).unwrap();
    assert_eq!(position.yield_debt, units(&env, 53));
    assert_eq!(client.claimable_yield(&staker), 0);
    assert_eq!(client.withdraw_yield(&staker), 0);
}

#[test]
fn test_interest_without_stake_is_absorbed() {
    let (env, contract_id, client) = create_test_contract();
    let (_admin, manager, _reward_token) = setup_ledger(&env, &contract_id, &client);

    client.report_interest(&manager, &100, &100);

    let state = client.get_global_state();
    assert_eq!(state.cumulative_yield_per_share, units(&env, 0));
    assert_eq!(state.total_interest_reported, 0);

    // Interest preceding the very first stake is dropped the same way.
    let staker = Address::generate(&env);
    client.record_stake(&manager, &staker, &10, &0, &40);
    assert_eq!(client.claimable_yield(&staker), 0);
}

#[test]
fn test_total_effective_stake_matches_positions() {
    let (env, contract_id, client) = create_test_contract();
    let (_admin, manager, _reward_token) = setup_ledger(&env, &contract_id, &client);

    let alice = Address::generate(&env);
    let bob = Address::generate(&env);
    let carol = Address::generate(&env);

    client.record_stake(&manager, &alice, &1_000, &2_500, &0);
    client.record_stake(&manager, &bob, &333, &1_000, &17);
    client.record_stake(&manager, &carol, &77, &0, &3);
    client.record_stake(&manager, &alice, &5, &9_999, &0);
    client.remove_stake(&manager, &bob, &100, &11);

    let sum = [&alice, &bob, &carol]
        .iter()
        .map(|s| client.get_position(s).unwrap().effective_stake)
        .sum::<i128>();
    assert_eq!(client.get_total_effective_stake(), sum);

    for staker in [&alice, &bob, &carol] {
        assert!(client.claimable_yield(staker) >= 0);
    }
}

#[test]
fn test_remove_stake_keeps_earned_yield() {
    let (env, contract_id, client) = create_test_contract();
    let (_admin, manager, _reward_token) = setup_ledger(&env, &contract_id, &client);
    let staker = Address::generate(&env);

    client.record_stake(&manager, &staker, &10, &0, &0);
    client.report_interest(&manager, &30, &30);

    assert_eq!(client.remove_stake(&manager, &staker, &10, &0), 10);

    let position = client.get_position(&staker).unwrap();
    assert_eq!(position.principal, 0);
    assert_eq!(position.effective_stake, 0);
    assert_eq!(client.get_total_effective_stake(), 0);
    assert_eq!(client.claimable_yield(&staker), 3_000);
    assert_eq!(client.withdraw_yield(&staker), 3_000);
}

#[test]
fn test_remove_stake_more_than_principal_fails() {
    let (env, contract_id, client) = create_test_contract();
    let (_admin, manager, _reward_token) = setup_ledger(&env, &contract_id, &client);
    let staker = Address::generate(&env);

    client.record_stake(&manager, &staker, &10, &0, &0);

    let result = client.try_remove_stake(&manager, &staker, &11, &0);
    assert_eq!(result, Err(Ok(LedgerError::InsufficientStake)));

    let stranger = Address::generate(&env);
    let result = client.try_remove_stake(&manager, &stranger, &1, &0);
    assert_eq!(result, Err(Ok(LedgerError::PositionNotFound)));
}

#[test]
fn test_only_manager_reports_and_records() {
    let (env, contract_id, client) = create_test_contract();
    let (_admin, _manager, _reward_token) = setup_ledger(&env, &contract_id, &client);
    let intruder = Address::generate(&env);
    let staker = Address::generate(&env);

    let result = client.try_report_interest(&intruder, &10, &10);
    assert_eq!(result, Err(Ok(LedgerError::Unauthorized)));

    let result = client.try_record_stake(&intruder, &staker, &10, &0, &0);
    assert_eq!(result, Err(Ok(LedgerError::Unauthorized)));
}

#[test]
fn test_only_admin_adjusts_debt() {
    let (env, contract_id, client) = create_test_contract();
    let (_admin, manager, _reward_token) = setup_ledger(&env, &contract_id, &client);
    let staker = Address::generate(&env);

    client.record_stake(&manager, &staker, &10, &0, &0);

    let result = client.try_set_yield_debt(&manager, &staker, &1);
    assert_eq!(result, Err(Ok(LedgerError::Unauthorized)));
}

#[test]
fn test_invalid_inputs_rejected() {
    let (env, contract_id, client) = create_test_contract();
    let (_admin, manager, _reward_token) = setup_ledger(&env, &contract_id, &client);
    let staker = Address::generate(&env);

    let result = client.try_record_stake(&manager, &staker, &10, &10_001, &0);
    assert_eq!(result, Err(Ok(LedgerError::InvalidInput)));

    let result = client.try_record_stake(&manager, &staker, &0, &0, &0);
    assert_eq!(result, Err(Ok(LedgerError::InvalidInput)));

    let result = client.try_report_interest(&manager, &10, &11);
    assert_eq!(result, Err(Ok(LedgerError::InvalidInput)));

    let result = client.try_report_interest(&manager, &10, &-1);
    assert_eq!(result, Err(Ok(LedgerError::InvalidInput)));
}

#[test]
fn test_partial_staker_interest_moves_index_by_staker_share() {
    let (env, contract_id, client) = create_test_contract();
    let (_admin, manager, _reward_token) = setup_ledger(&env, &contract_id, &client);
    let staker = Address::generate(&env);

    client.record_stake(&manager, &staker, &10, &0, &0);
    client.report_interest(&manager, &50, &20);

    let state = client.get_global_state();
    assert_eq!(state.cumulative_yield_per_share, units(&env, 2));
    assert_eq!(state.total_interest_reported, 50);
    assert_eq!(state.total_staker_interest, 20);
    assert_eq!(client.claimable_yield(&staker), 2_000);
}

#[test]
fn test_manager_rotation() {
    let (env, contract_id, client) = create_test_contract();
    let (admin, manager, _reward_token) = setup_ledger(&env, &contract_id, &client);
    let new_manager = Address::generate(&env);

    let result = client.try_set_manager(&manager, &new_manager);
    assert_eq!(result, Err(Ok(LedgerError::Unauthorized)));

    client.set_manager(&admin, &new_manager);
    assert_eq!(client.get_config().manager, new_manager);

    let result = client.try_report_interest(&manager, &1, &1);
    assert_eq!(result, Err(Ok(LedgerError::Unauthorized)));
}

#[test]
fn test_withdraw_without_position_returns_zero() {
    let (env, contract_id, client) = create_test_contract();
    let (_admin, _manager, _reward_token) = setup_ledger(&env, &contract_id, &client);
    let stranger = Address::generate(&env);

    assert_eq!(client.claimable_yield(&stranger), 0);
    assert_eq!(client.withdraw_yield(&stranger), 0);
    assert!(client.get_position(&stranger).is_none());
}

#[test]
fn test_index_overflow_returns_error() {
    let (env, contract_id, client) = create_test_contract();
    let (admin, manager, _reward_token) = setup_ledger(&env, &contract_id, &client);
    let early = Address::generate(&env);
    let late = Address::generate(&env);

    client.record_stake(&manager, &early, &1, &0, &0);
    client.report_interest(&manager, &(i128::MAX / 2), &(i128::MAX / 2));

    let result = client.try_record_stake(&manager, &late, &10_000_000_000_000, &0, &0);
    assert_eq!(result, Err(Ok(LedgerError::ArithmeticOverflow)));

    let result = client.try_set_yield_debt(&admin, &early, &10_000_000_000_000);
    assert_eq!(result, Err(Ok(LedgerError::ArithmeticOverflow)));

    // The failed calls left nothing behind.
    assert!(client.get_position(&late).is_none());
    assert_eq!(client.get_total_effective_stake(), 1);
}
