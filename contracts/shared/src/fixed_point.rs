//! Scaled-integer arithmetic for the two precision domains used by the ledgers.
//!
//! The yield index lives in the `INDEX_SCALE` (1e27) domain and is held as a
//! 256-bit host integer. Operations that could leave 256 bits are checked
//! up front and return `None`, since the host traps instead of wrapping. Currency amounts leave the index domain through
//! [`index_to_output`], which truncates to `OUTPUT_SCALE` (1e2).
//!
//! Every division here floors. Nothing rounds up.

use soroban_sdk::{Env, I256};

/// Precision of the cumulative yield index.
pub const INDEX_SCALE: i128 = 1_000_000_000_000_000_000_000_000_000;

/// Precision of reported currency amounts (two decimals).
pub const OUTPUT_SCALE: i128 = 100;

/// Divisor taking an index-domain value down to output precision.
pub const INDEX_TO_OUTPUT: i128 = INDEX_SCALE / OUTPUT_SCALE;

/// Basis points representing 100%.
pub const BPS_DENOMINATOR: i128 = 10_000;

pub fn zero(env: &Env) -> I256 {
    I256::from_i128(env, 0)
}

pub fn max_value(env: &Env) -> I256 {
    I256::from_parts(env, i64::MAX, u64::MAX, u64::MAX, u64::MAX)
}

pub fn min_value(env: &Env) -> I256 {
    I256::from_parts(env, i64::MIN, 0, 0, 0)
}

/// `a + b`, or `None` where the host would trap.
pub fn checked_add(env: &Env, a: &I256, b: &I256) -> Option<I256> {
    let zero = zero(env);
    if *b > zero && *a > max_value(env).sub(b) {
        return None;
    }
    if *b < zero && *a < min_value(env).sub(b) {
        return None;
    }
    Some(a.add(b))
}

/// `a - b`, or `None` where the host would trap.
pub fn checked_sub(env: &Env, a: &I256, b: &I256) -> Option<I256> {
    let zero = zero(env);
    if *b < zero && *a > max_value(env).add(b) {
        return None;
    }
    if *b > zero && *a < min_value(env).add(b) {
        return None;
    }
    Some(a.sub(b))
}

/// Index growth produced by spreading `amount` over `denominator` shares:
/// `floor(amount * INDEX_SCALE / denominator)`.
///
/// Returns `None` for a non-positive denominator; callers decide whether that
/// is an error or a no-op.
pub fn index_increment(env: &Env, amount: i128, denominator: i128) -> Option<I256> {
    if denominator <= 0 {
        return None;
    }
    // |amount| < 2^127 and INDEX_SCALE < 2^90, so this cannot leave 256 bits.
    let scaled = I256::from_i128(env, amount).mul(&I256::from_i128(env, INDEX_SCALE));
    Some(scaled.div(&I256::from_i128(env, denominator)))
}

/// `amount * index`, kept in the index domain. `None` when the product does
/// not fit in 256 bits.
pub fn index_product(env: &Env, amount: i128, index: &I256) -> Option<I256> {
    let zero = zero(env);
    if amount == 0 {
        return Some(zero);
    }

    // |amount * index| <= MAX holds iff |index| <= MAX / |amount|
    let magnitude = I256::from_i128(env, amount.checked_abs()?);
    let limit = max_value(env).div(&magnitude);
    if *index > limit || *index < zero.sub(&limit) {
        return None;
    }

    Some(I256::from_i128(env, amount).mul(index))
}

/// Truncates an index-domain value to output precision.
///
/// Negative inputs are clamped to zero before dividing so truncation never
/// rounds toward a larger payout.
pub fn index_to_output(env: &Env, value: &I256) -> Option<i128> {
    let zero = zero(env);
    if *value <= zero {
        return Some(0);
    }
    value.div(&I256::from_i128(env, INDEX_TO_OUTPUT)).to_i128()
}

/// Portion of `principal` that remains after donating `donation_ratio_bps`.
pub fn effective_amount(principal: i128, donation_ratio_bps: u32) -> Option<i128> {
    let bps = donation_ratio_bps as i128;
    if !(0..=BPS_DENOMINATOR).contains(&bps) {
        return None;
    }
    principal
        .checked_mul(BPS_DENOMINATOR - bps)?
        .checked_div(BPS_DENOMINATOR)
}

/// `floor(a * b / d)` on `i128` with a checked multiply.
pub fn mul_div_floor(a: i128, b: i128, d: i128) -> Option<i128> {
    if d == 0 {
        return None;
    }
    a.checked_mul(b)?.checked_div(d)
}
