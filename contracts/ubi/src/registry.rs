//! Claimant activity rules: which path a claim takes and who can be fished.

use crate::{Claimant, UbiError};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClaimPath {
    /// Never seen by this scheme or its predecessors: flat bonus.
    FirstClaim,
    /// Daily entitlement. `rejoins` is set when the claimant is not currently
    /// counted as active (fished, or carried over from a predecessor).
    Daily { rejoins: bool },
}

pub fn claim_path(
    existing: Option<&Claimant>,
    known_to_predecessor: bool,
    today: u64,
) -> Result<ClaimPath, UbiError> {
    match existing {
        Some(claimant) if claimant.last_claim_day == today => Err(UbiError::AlreadyClaimedToday),
        Some(claimant) => Ok(ClaimPath::Daily { rejoins: claimant.is_fished }),
        None if known_to_predecessor => Ok(ClaimPath::Daily { rejoins: true }),
        None => Ok(ClaimPath::FirstClaim),
    }
}

pub fn is_inactive(claimant: &Claimant, today: u64, max_inactive_days: u32) -> bool {
    today.saturating_sub(claimant.last_claim_day) > max_inactive_days as u64
}

pub fn is_active(claimant: &Claimant, today: u64, max_inactive_days: u32) -> bool {
    !claimant.is_fished && !is_inactive(claimant, today, max_inactive_days)
}

/// Eligibility of `target` for fishing. Claimants that never claimed are not
/// counted as active, so there is nothing to reclaim from them.
pub fn check_fishable(
    target: Option<&Claimant>,
    today: u64,
    max_inactive_days: u32,
) -> Result<(), UbiError> {
    let claimant = target.ok_or(UbiError::NotInactive)?;

    if !is_inactive(claimant, today, max_inactive_days) {
        return Err(UbiError::NotInactive);
    }
    if claimant.is_fished {
        return Err(UbiError::AlreadyFished);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use soroban_sdk::{testutils::Address as _, Address, Env};

    fn claimant(env: &Env, last_claim_day: u64, is_fished: bool) -> Claimant {
        Claimant {
            account: Address::generate(env),
            last_claim_day,
            is_fished,
            total_claims: 1,
            total_claimed: 0,
        }
    }

    #[test]
    fn paths() {
        let env = Env::default();
        let regular = claimant(&env, 3, false);
        let fished = claimant(&env, 3, true);

        assert_eq!(claim_path(None, false, 5), Ok(ClaimPath::FirstClaim));
        assert_eq!(claim_path(None, true, 5), Ok(ClaimPath::Daily { rejoins: true }));
        assert_eq!(claim_path(Some(&regular), false, 5), Ok(ClaimPath::Daily { rejoins: false }));
        assert_eq!(claim_path(Some(&fished), false, 5), Ok(ClaimPath::Daily { rejoins: true }));
        assert_eq!(claim_path(Some(&regular), false, 3), Err(UbiError::AlreadyClaimedToday));
    }

    #[test]
    fn inactivity_window_is_exclusive() {
        let env = Env::default();
        let c = claimant(&env, 10, false);

        assert!(!is_inactive(&c, 13, 3));
        assert!(is_inactive(&c, 14, 3));
        assert!(is_active(&c, 13, 3));
        assert!(!is_active(&claimant(&env, 10, true), 11, 3));
    }

    #[test]
    fn fishing_checks_in_order() {
        let env = Env::default();

        assert_eq!(check_fishable(None, 100, 3), Err(UbiError::NotInactive));
        assert_eq!(
            check_fishable(Some(&claimant(&env, 98, false)), 100, 3),
            Err(UbiError::NotInactive)
        );
        assert_eq!(
            check_fishable(Some(&claimant(&env, 10, true)), 100, 3),
            Err(UbiError::AlreadyFished)
        );
        assert_eq!(check_fishable(Some(&claimant(&env, 10, false)), 100, 3), Ok(()));
    }
}
