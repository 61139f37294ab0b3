//! Reward-per-share bookkeeping shared by every entry point of the ledger.
//!
//! `cumulative_yield_per_share` only ever grows. A position's `yield_debt`
//! records the index value its effective stake was "bought in" at, so newly
//! added stake never earns yield that accumulated before it arrived.

use commons_shared::fixed_point::{
    checked_add, checked_sub, index_increment, index_product, index_to_output,
};
use soroban_sdk::Env;

use crate::{GlobalYieldState, LedgerError, StakerPosition};

/// Spreads `amount` over the current total effective stake.
///
/// With no effective stake there is nobody to credit; the caller gets
/// `ZeroStakeDenominator` back and decides whether to absorb it.
pub fn distribute(
    env: &Env,
    state: &mut GlobalYieldState,
    amount: i128,
) -> Result<(), LedgerError> {
    if amount == 0 {
        return Ok(());
    }

    let increment = index_increment(env, amount, state.total_effective_stake)
        .ok_or(LedgerError::ZeroStakeDenominator)?;
    state.cumulative_yield_per_share =
        checked_add(env, &state.cumulative_yield_per_share, &increment)
            .ok_or(LedgerError::ArithmeticOverflow)?;

    Ok(())
}

/// Adds effective stake to a position, charging debt at the current index.
pub fn add_effective(
    env: &Env,
    state: &mut GlobalYieldState,
    position: &mut StakerPosition,
    added_effective: i128,
) -> Result<(), LedgerError> {
    let debt = index_product(env, added_effective, &state.cumulative_yield_per_share)
        .and_then(|charge| checked_add(env, &position.yield_debt, &charge))
        .ok_or(LedgerError::ArithmeticOverflow)?;

    position.effective_stake = position
        .effective_stake
        .checked_add(added_effective)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    state.total_effective_stake = state
        .total_effective_stake
        .checked_add(added_effective)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    position.yield_debt = debt;

    Ok(())
}

/// Removes effective stake from a position. Debt is released at the current
/// index so the yield already earned by the removed stake stays claimable.
pub fn remove_effective(
    env: &Env,
    state: &mut GlobalYieldState,
    position: &mut StakerPosition,
    removed_effective: i128,
) -> Result<(), LedgerError> {
    if removed_effective > position.effective_stake {
        return Err(LedgerError::InsufficientStake);
    }

    let debt = index_product(env, removed_effective, &state.cumulative_yield_per_share)
        .and_then(|released| checked_sub(env, &position.yield_debt, &released))
        .ok_or(LedgerError::ArithmeticOverflow)?;

    position.effective_stake = position
        .effective_stake
        .checked_sub(removed_effective)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    state.total_effective_stake = state
        .total_effective_stake
        .checked_sub(removed_effective)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    position.yield_debt = debt;

    Ok(())
}

/// Out-of-band debt correction: charges `effective_delta` units of stake at
/// the current index without touching the stake itself.
pub fn adjust_debt(
    env: &Env,
    state: &GlobalYieldState,
    position: &mut StakerPosition,
    effective_delta: i128,
) -> Result<(), LedgerError> {
    position.yield_debt = index_product(env, effective_delta, &state.cumulative_yield_per_share)
        .and_then(|delta| checked_add(env, &position.yield_debt, &delta))
        .ok_or(LedgerError::ArithmeticOverflow)?;

    Ok(())
}

/// Yield a position can still withdraw, at output precision.
///
/// `effective_stake * index - yield_debt` is truncated once, then the amount
/// already withdrawn is subtracted. The result is clamped at zero.
pub fn claimable(
    env: &Env,
    state: &GlobalYieldState,
    position: &StakerPosition,
) -> Result<i128, LedgerError> {
    let earned = index_product(env, position.effective_stake, &state.cumulative_yield_per_share)
        .and_then(|accrued| checked_sub(env, &accrued, &position.yield_debt))
        .and_then(|net| index_to_output(env, &net))
        .ok_or(LedgerError::ArithmeticOverflow)?;

    let remaining = earned
        .checked_sub(position.withdrawn)
        .ok_or(LedgerError::ArithmeticOverflow)?;

    Ok(remaining.max(0))
}
