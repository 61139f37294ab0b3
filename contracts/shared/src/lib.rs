#![no_std]
//! Shared math, constants and collaborator interfaces used by the Commons
//! staking and UBI contracts.

pub mod fixed_point;
pub mod interfaces;

pub use fixed_point::{BPS_DENOMINATOR, INDEX_SCALE, INDEX_TO_OUTPUT, OUTPUT_SCALE};
pub use interfaces::{FirstClaimPoolClient, IdentityClient};

// ============================================================================
// Constants
// ============================================================================

/// Seconds in a day
pub const SECONDS_PER_DAY: u64 = 86400;

/// Upper bound accepted for any day-denominated setting (10 years)
pub const MAX_DAYS_SETTING: u32 = 3650;

// ============================================================================
// Validation and time helpers
// ============================================================================

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: i128) -> bool {
    amount > 0
}

/// Validate that an amount is zero or positive
pub fn validate_non_negative_amount(amount: i128) -> bool {
    amount >= 0
}

/// Validate that a ratio is within 0-100% in basis points
pub fn validate_bps(bps: u32) -> bool {
    (bps as i128) <= BPS_DENOMINATOR
}

/// Validate a day-denominated setting such as a cycle length
pub fn validate_days(days: u32) -> bool {
    days > 0 && days <= MAX_DAYS_SETTING
}

/// Whole days elapsed from `start_time` to `end_time`, zero when `end_time` is earlier
pub fn days_between(start_time: u64, end_time: u64) -> u64 {
    if end_time <= start_time {
        return 0;
    }
    (end_time - start_time) / SECONDS_PER_DAY
}
