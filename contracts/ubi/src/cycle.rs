//! Day and cycle arithmetic for the UBI pool.
//!
//! The daily pool is fixed lazily: the first claim or fish on a day past the
//! end of the current cycle divides the live pool balance by the configured
//! cycle length. Missed days are caught up in one step.

use commons_shared::days_between;

use crate::{CycleState, SchemeConfig};

/// Day index of `now` relative to the period start, `None` before it.
pub fn current_day(config: &SchemeConfig, now: u64) -> Option<u64> {
    if now < config.period_start {
        return None;
    }
    Some(days_between(config.period_start, now))
}

pub fn day_in_cycle(cycle: &CycleState, today: u64) -> u64 {
    match cycle.cycle_start_day {
        Some(start) => today.saturating_sub(start),
        None => 0,
    }
}

/// Whether the daily pool has to be recomputed on `today`.
pub fn is_recompute_due(cycle: &CycleState, today: u64) -> bool {
    if today == 0 {
        return false;
    }
    match cycle.cycle_start_day {
        Some(start) => today.saturating_sub(start) >= cycle.current_cycle_length as u64,
        None => true,
    }
}

/// Recomputes the daily pool when the current cycle has elapsed.
///
/// `cycle_length_days` is the governance setting at the time of the call; it
/// becomes the length of the new cycle. Returns the new daily pool if one was
/// fixed.
pub fn refresh(
    cycle: &mut CycleState,
    cycle_length_days: u32,
    today: u64,
    pool_balance: i128,
) -> Option<i128> {
    if !is_recompute_due(cycle, today) || cycle_length_days == 0 {
        return None;
    }

    cycle.daily_pool = pool_balance.max(0) / cycle_length_days as i128;
    cycle.cycle_start_day = Some(today);
    cycle.current_cycle_length = cycle_length_days;

    Some(cycle.daily_pool)
}

/// Per-claimant share of today's pool.
pub fn daily_entitlement(cycle: &CycleState) -> i128 {
    if cycle.active_claimant_count == 0 {
        return 0;
    }
    cycle.daily_pool / cycle.active_claimant_count as i128
}
