//! Collaborator contracts the engine consumes but does not implement.

use soroban_sdk::{contractclient, Address, Env};

/// Identity / whitelist predicate gating UBI claims.
#[contractclient(name = "IdentityClient")]
pub trait IdentityInterface {
    fn is_whitelisted(env: Env, account: Address) -> bool;
}

/// Separate balance paying the one-time bonus on a claimant's first claim.
#[contractclient(name = "FirstClaimPoolClient")]
pub trait FirstClaimPoolInterface {
    /// Pays the flat bonus to `account` and returns the amount paid.
    /// Only the registered UBI scheme may call this.
    fn award_user(env: Env, account: Address) -> i128;

    /// Flat bonus currently paid per first claim.
    fn claim_amount(env: Env) -> i128;

    /// Registers the scheme allowed to call `award_user`.
    fn set_ubi_scheme(env: Env, scheme: Address);
}
