#![no_std]
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, log, symbol_short, token, Address, Env,
    Vec,
};
use commons_shared::{validate_days, FirstClaimPoolClient, IdentityClient};

use registry::ClaimPath;

mod cycle;
mod registry;

// Data Types
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SchemeStatus {
    Pending,
    Active,
    Expired, // Derived from period_end, never stored
    Succeeded,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SchemeConfig {
    pub admin: Address, // Governance authority
    pub reward_token: Address, // The UBI pool is this contract's balance of it
    pub identity: Address,
    pub first_claim_pool: Address,
    pub period_start: u64, // Unix seconds, day 0 starts here
    pub period_end: Option<u64>, // Inclusive; None runs until upgraded
    pub cycle_length_days: u32,
    pub max_inactive_days: u32,
    pub predecessor: Option<Address>,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CycleState {
    pub cycle_start_day: Option<u64>, // None until the first pool is fixed
    pub current_cycle_length: u32, // Length captured when the pool was fixed
    pub daily_pool: i128,
    pub active_claimant_count: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Claimant {
    pub account: Address,
    pub last_claim_day: u64,
    pub is_fished: bool,
    pub total_claims: u32,
    pub total_claimed: i128,
}

#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DailyStats {
    pub claimers: u32,
    pub amount: i128,
}

// Storage Keys
#[contracttype]
pub enum DataKey {
    Config,
    Status,
    Cycle,
    Upgraded,
    Successor,
    Claimant(Address),
    DailyStats(u64),
}

// Error Types
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum UbiError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Unauthorized = 3,
    InvalidInput = 4,
    SchemeNotActive = 5,
    InvalidState = 6,
    AlreadyClaimedToday = 7,
    NotInactive = 8,
    AlreadyFished = 9,
    AlreadyUpgraded = 10,
    PredecessorNotExpired = 11,
    ArithmeticOverflow = 12,
}

// Events
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CycleCalculatedEvent {
    pub day: u64,
    pub daily_pool: i128,
    pub cycle_length: u32,
    pub pool_balance: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UbiClaimedEvent {
    pub claimant: Address,
    pub amount: i128,
    pub first_claim: bool,
    pub day: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UserFishedEvent {
    pub target: Address,
    pub fisher: Address,
    pub reward: i128,
    pub day: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SchemeUpgradedEvent {
    pub predecessor: Address,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HandOverEvent {
    pub successor: Address,
    pub amount: i128,
    pub timestamp: u64,
}

#[contract]
pub struct UbiScheme;

#[contractimpl]
impl UbiScheme {
    /// Initialize the UBI scheme in the `Pending` state
    pub fn initialize(
        env: Env,
        admin: Address,
        reward_token: Address,
        identity: Address,
        first_claim_pool: Address,
        period_start: u64,
        period_end: Option<u64>,
        cycle_length_days: u32,
        max_inactive_days: u32,
        predecessor: Option<Address>,
    ) -> Result<(), UbiError> {
        // Check if already initialized
        if env.storage().instance().has(&DataKey::Config) {
            return Err(UbiError::AlreadyInitialized);
        }

        admin.require_auth();

        // Validate inputs
        if !validate_days(cycle_length_days) || !validate_days(max_inactive_days) {
            return Err(UbiError::InvalidInput);
        }
        if let Some(end) = period_end {
            if end <= period_start {
                return Err(UbiError::InvalidInput);
            }
        }

        let config = SchemeConfig {
            admin: admin.clone(),
            reward_token,
            identity,
            first_claim_pool,
            period_start,
            period_end,
            cycle_length_days,
            max_inactive_days,
            predecessor,
        };
        let cycle = CycleState {
            cycle_start_day: None,
            current_cycle_length: cycle_length_days,
            daily_pool: 0,
            active_claimant_count: 0,
        };

        env.storage().instance().set(&DataKey::Config, &config);
        env.storage().instance().set(&DataKey::Cycle, &cycle);
        env.storage().instance().set(&DataKey::Status, &SchemeStatus::Pending);
        env.storage().instance().set(&DataKey::Upgraded, &false);

        log!(&env, "UBI scheme initialized by admin: {}", admin);

        Ok(())
    }

    /// Move the scheme from `Pending` to `Active`. A scheme that replaces a
    /// predecessor takes over its pool on the way.
    pub fn start(env: Env, admin: Address) -> Result<(), UbiError> {
        admin.require_auth();

        let config = Self::get_config(env.clone())?;
        if config.admin != admin {
            return Err(UbiError::Unauthorized);
        }

        if Self::stored_status(&env)? != SchemeStatus::Pending {
            return Err(UbiError::InvalidState);
        }

        if let Some(predecessor) = config.predecessor.clone() {
            return Self::take_over(&env, config, predecessor);
        }

        env.storage().instance().set(&DataKey::Status, &SchemeStatus::Active);
        env.events().publish((symbol_short!("started"),), env.ledger().timestamp());

        FirstClaimPoolClient::new(&env, &config.first_claim_pool)
            .set_ubi_scheme(&env.current_contract_address());

        log!(&env, "UBI scheme started");

        Ok(())
    }

    /// Replace an expired predecessor: take over its pool balance and claimant
    /// history and become the first-claim pool's active scheme
    pub fn upgrade(env: Env, admin: Address, predecessor: Address) -> Result<(), UbiError> {
        admin.require_auth();

        let config = Self::get_config(env.clone())?;
        if config.admin != admin {
            return Err(UbiError::Unauthorized);
        }

        Self::take_over(&env, config, predecessor)
    }

    /// Predecessor side of an upgrade: called by the successor once this
    /// scheme has expired. Sends the whole remaining pool to the successor.
    /// The governance authority must sign for the move.
    pub fn hand_over(env: Env, admin: Address, successor: Address) -> Result<i128, UbiError> {
        admin.require_auth();
        successor.require_auth();

        let config = Self::get_config(env.clone())?;
        if config.admin != admin {
            return Err(UbiError::Unauthorized);
        }

        // Only an expired scheme can hand over, and only once
        match Self::status(env.clone())? {
            SchemeStatus::Expired => {}
            SchemeStatus::Succeeded => return Err(UbiError::AlreadyUpgraded),
            _ => return Err(UbiError::PredecessorNotExpired),
        }

        // Mark succeeded before the pool leaves
        env.storage().instance().set(&DataKey::Status, &SchemeStatus::Succeeded);
        env.storage().instance().set(&DataKey::Successor, &successor);

        let token = token::Client::new(&env, &config.reward_token);
        let amount = token.balance(&env.current_contract_address());

        let event = HandOverEvent {
            successor: successor.clone(),
            amount,
            timestamp: env.ledger().timestamp(),
        };
        env.events().publish((symbol_short!("handover"),), event);

        if amount > 0 {
            token.transfer(&env.current_contract_address(), &successor, &amount);
        }

        log!(&env, "UBI scheme handed {} to successor {}", amount, successor);

        Ok(amount)
    }

    /// Claim today's UBI. The first claim ever pays the flat bonus from the
    /// first-claim pool; later claims pay the daily entitlement.
    pub fn claim(env: Env, claimant: Address) -> Result<i128, UbiError> {
        claimant.require_auth();

        let config = Self::get_config(env.clone())?;
        let today = Self::active_day(&env, &config)?;

        // Check identity
        if !IdentityClient::new(&env, &config.identity).is_whitelisted(&claimant) {
            return Err(UbiError::Unauthorized);
        }

        // Pick first-claim or daily path
        let existing = Self::get_claimant(env.clone(), claimant.clone());
        let known = existing.is_none() && Self::known_to_predecessor(&env, &config, &claimant);
        let path = registry::claim_path(existing.as_ref(), known, today)?;

        let mut cycle = Self::load_cycle(&env)?;
        let mut record = existing.unwrap_or(Claimant {
            account: claimant.clone(),
            last_claim_day: today,
            is_fished: false,
            total_claims: 0,
            total_claimed: 0,
        });

        let (amount, recomputed) = match path {
            ClaimPath::FirstClaim => {
                cycle.active_claimant_count = cycle
                    .active_claimant_count
                    .checked_add(1)
                    .ok_or(UbiError::ArithmeticOverflow)?;
                let bonus = FirstClaimPoolClient::new(&env, &config.first_claim_pool).claim_amount();
                (bonus, None)
            }
            ClaimPath::Daily { rejoins } => {
                Self::prepare_daily(&env, &config, &mut cycle, rejoins, today)?
            }
        };

        // Update claimant record and daily stats
        record.last_claim_day = today;
        record.is_fished = false;
        record.total_claims = record.total_claims.saturating_add(1);
        record.total_claimed = record
            .total_claimed
            .checked_add(amount)
            .ok_or(UbiError::ArithmeticOverflow)?;

        let mut stats = Self::get_daily_stats(env.clone(), today);
        stats.claimers = stats.claimers.saturating_add(1);
        stats.amount = stats.amount.checked_add(amount).ok_or(UbiError::ArithmeticOverflow)?;

        // Store updated state
        env.storage().instance().set(&DataKey::Cycle, &cycle);
        env.storage().persistent().set(&DataKey::Claimant(claimant.clone()), &record);
        env.storage().persistent().set(&DataKey::DailyStats(today), &stats);

        if let Some(daily_pool) = recomputed {
            Self::publish_cycle(&env, &config, today, daily_pool);
        }
        // Emit events
        let first_claim = path == ClaimPath::FirstClaim;
        let event = UbiClaimedEvent {
            claimant: claimant.clone(),
            amount,
            first_claim,
            day: today,
        };
        env.events().publish((symbol_short!("claimed"),), event);

        // State is committed; payouts come last.
        if first_claim {
            let paid = FirstClaimPoolClient::new(&env, &config.first_claim_pool).award_user(&claimant);
            if paid != amount {
                return Err(UbiError::InvalidState);
            }
        } else if amount > 0 {
            token::Client::new(&env, &config.reward_token)
                .transfer(&env.current_contract_address(), &claimant, &amount);
        }

        log!(&env, "Claimant {} claimed {} on day {}", claimant, amount, today);

        Ok(amount)
    }

    /// Amount `claim` would pay right now, without changing anything.
    /// Returns 0 when the claimant already claimed today and fails the same
    /// way `claim` does for accounts outside the whitelist.
    pub fn check_entitlement(env: Env, claimant: Address) -> Result<i128, UbiError> {
        let config = Self::get_config(env.clone())?;
        let today = Self::active_day(&env, &config)?;

        if !IdentityClient::new(&env, &config.identity).is_whitelisted(&claimant) {
            return Err(UbiError::Unauthorized);
        }

        let existing = Self::get_claimant(env.clone(), claimant.clone());
        let known = existing.is_none() && Self::known_to_predecessor(&env, &config, &claimant);

        match registry::claim_path(existing.as_ref(), known, today) {
            Err(UbiError::AlreadyClaimedToday) => Ok(0),
            Err(e) => Err(e),
            Ok(ClaimPath::FirstClaim) => {
                Ok(FirstClaimPoolClient::new(&env, &config.first_claim_pool).claim_amount())
            }
            Ok(ClaimPath::Daily { rejoins }) => {
                let mut cycle = Self::load_cycle(&env)?;
                let (amount, _) = Self::prepare_daily(&env, &config, &mut cycle, rejoins, today)?;
                Ok(amount)
            }
        }
    }

    /// Reclaim an inactive claimant's entitlement. The fisher receives today's
    /// per-claimant amount and the target stops dividing future pools.
    pub fn fish(env: Env, fisher: Address, target: Address) -> Result<i128, UbiError> {
        fisher.require_auth();

        let config = Self::get_config(env.clone())?;
        let today = Self::active_day(&env, &config)?;

        // Recompute the daily pool first so the reward uses today's figures
        let mut cycle = Self::load_cycle(&env)?;
        let recomputed = Self::refresh_cycle(&env, &config, &mut cycle, today);

        let reward = Self::fish_one(&env, &config, &mut cycle, today, &fisher, &target)?;

        env.storage().instance().set(&DataKey::Cycle, &cycle);
        if let Some(daily_pool) = recomputed {
            Self::publish_cycle(&env, &config, today, daily_pool);
        }

        Self::pay_fisher(&env, &config, &fisher, reward);

        Ok(reward)
    }

    /// Fish every eligible address in `targets`. Ineligible addresses are
    /// skipped. Returns the total reward paid.
    pub fn fish_multi(env: Env, fisher: Address, targets: Vec<Address>) -> Result<i128, UbiError> {
        fisher.require_auth();

        let config = Self::get_config(env.clone())?;
        let today = Self::active_day(&env, &config)?;

        let mut cycle = Self::load_cycle(&env)?;
        let recomputed = Self::refresh_cycle(&env, &config, &mut cycle, today);

        let mut total_reward = 0i128;
        let mut fished = 0u32;
        for target in targets.iter() {
            match Self::fish_one(&env, &config, &mut cycle, today, &fisher, &target) {
                Ok(reward) => {
                    total_reward = total_reward
                        .checked_add(reward)
                        .ok_or(UbiError::ArithmeticOverflow)?;
                    fished += 1;
                }
                Err(_) => {
                    log!(&env, "Skipped fishing ineligible target {}", target);
                }
            }
        }

        env.storage().instance().set(&DataKey::Cycle, &cycle);
        if let Some(daily_pool) = recomputed {
            Self::publish_cycle(&env, &config, today, daily_pool);
        }

        Self::pay_fisher(&env, &config, &fisher, total_reward);

        log!(&env, "Fisher {} fished {} of {} targets", fisher, fished, targets.len());

        Ok(total_reward)
    }

    // Getter functions
    pub fn status(env: Env) -> Result<SchemeStatus, UbiError> {
        let config = Self::get_config(env.clone())?;
        let stored = Self::stored_status(&env)?;

        let expired = match config.period_end {
            Some(end) => env.ledger().timestamp() > end,
            None => false,
        };

        Ok(match stored {
            SchemeStatus::Active if expired => SchemeStatus::Expired,
            other => other,
        })
    }

    pub fn current_day(env: Env) -> Result<u64, UbiError> {
        let config = Self::get_config(env.clone())?;
        cycle::current_day(&config, env.ledger().timestamp()).ok_or(UbiError::SchemeNotActive)
    }

    pub fn current_day_in_cycle(env: Env) -> Result<u64, UbiError> {
        let today = Self::current_day(env.clone())?;
        let cycle = Self::load_cycle(&env)?;
        Ok(cycle::day_in_cycle(&cycle, today))
    }

    pub fn get_cycle_state(env: Env) -> Result<CycleState, UbiError> {
        Self::load_cycle(&env)
    }

    /// Per-claimant share of the currently fixed daily pool
    pub fn daily_entitlement(env: Env) -> Result<i128, UbiError> {
        let cycle = Self::load_cycle(&env)?;
        Ok(cycle::daily_entitlement(&cycle))
    }

    pub fn get_claimant(env: Env, account: Address) -> Option<Claimant> {
        env.storage().persistent().get(&DataKey::Claimant(account))
    }

    pub fn is_active_user(env: Env, account: Address) -> Result<bool, UbiError> {
        let today = Self::current_day(env.clone())?;
        let config = Self::get_config(env.clone())?;

        Ok(match Self::get_claimant(env, account) {
            Some(claimant) => registry::is_active(&claimant, today, config.max_inactive_days),
            None => false,
        })
    }

    /// Whether `account` has claimed from this scheme or any scheme it replaced
    pub fn is_not_new_user(env: Env, account: Address) -> bool {
        if env.storage().persistent().has(&DataKey::Claimant(account.clone())) {
            return true;
        }
        match Self::get_config(env.clone()) {
            Ok(config) => Self::known_to_predecessor(&env, &config, &account),
            Err(_) => false,
        }
    }

    pub fn total_claims(env: Env, account: Address) -> u32 {
        Self::get_claimant(env, account)
            .map(|claimant| claimant.total_claims)
            .unwrap_or(0)
    }

    pub fn get_daily_stats(env: Env, day: u64) -> DailyStats {
        env.storage().persistent()
            .get(&DataKey::DailyStats(day))
            .unwrap_or_default()
    }

    pub fn get_successor(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::Successor)
    }

    pub fn get_config(env: Env) -> Result<SchemeConfig, UbiError> {
        env.storage().instance()
            .get(&DataKey::Config)
            .ok_or(UbiError::NotInitialized)
    }

    // Admin functions
    pub fn set_cycle_length(env: Env, admin: Address, days: u32) -> Result<(), UbiError> {
        admin.require_auth();

        let mut config = Self::get_config(env.clone())?;
        if config.admin != admin {
            return Err(UbiError::Unauthorized);
        }

        // Only a running scheme takes a new cycle length
        if Self::status(env.clone())? != SchemeStatus::Active {
            return Err(UbiError::InvalidState);
        }

        if !validate_days(days) {
            return Err(UbiError::InvalidInput);
        }

        config.cycle_length_days = days;
        env.storage().instance().set(&DataKey::Config, &config);

        log!(&env, "Cycle length set to {} days from the next cycle", days);

        Ok(())
    }

    pub fn set_max_inactive_days(env: Env, admin: Address, days: u32) -> Result<(), UbiError> {
        admin.require_auth();

        let mut config = Self::get_config(env.clone())?;
        if config.admin != admin {
            return Err(UbiError::Unauthorized);
        }

        if Self::stored_status(&env)? == SchemeStatus::Succeeded {
            return Err(UbiError::InvalidState);
        }

        if !validate_days(days) {
            return Err(UbiError::InvalidInput);
        }

        config.max_inactive_days = days;
        env.storage().instance().set(&DataKey::Config, &config);

        log!(&env, "Max inactive days set to: {}", days);

        Ok(())
    }

    // Internal helper functions
    fn stored_status(env: &Env) -> Result<SchemeStatus, UbiError> {
        env.storage().instance()
            .get(&DataKey::Status)
            .ok_or(UbiError::NotInitialized)
    }

    fn load_cycle(env: &Env) -> Result<CycleState, UbiError> {
        env.storage().instance()
            .get(&DataKey::Cycle)
            .ok_or(UbiError::NotInitialized)
    }

    /// Today's day index, provided the scheme is accepting claims.
    fn active_day(env: &Env, config: &SchemeConfig) -> Result<u64, UbiError> {
        if Self::status(env.clone())? != SchemeStatus::Active {
            return Err(UbiError::SchemeNotActive);
        }
        cycle::current_day(config, env.ledger().timestamp()).ok_or(UbiError::SchemeNotActive)
    }

    fn known_to_predecessor(env: &Env, config: &SchemeConfig, account: &Address) -> bool {
        match &config.predecessor {
            Some(predecessor) => UbiSchemeClient::new(env, predecessor).is_not_new_user(account),
            None => false,
        }
    }

    fn pool_balance(env: &Env, config: &SchemeConfig) -> i128 {
        token::Client::new(env, &config.reward_token).balance(&env.current_contract_address())
    }

    fn refresh_cycle(
        env: &Env,
        config: &SchemeConfig,
        cycle: &mut CycleState,
        today: u64,
    ) -> Option<i128> {
        if !cycle::is_recompute_due(cycle, today) {
            return None;
        }
        cycle::refresh(cycle, config.cycle_length_days, today, Self::pool_balance(env, config))
    }

    /// Brings `cycle` up to date for a daily claim and returns the amount owed
    /// plus the new daily pool if one was fixed.
    fn prepare_daily(
        env: &Env,
        config: &SchemeConfig,
        cycle: &mut CycleState,
        rejoins: bool,
        today: u64,
    ) -> Result<(i128, Option<i128>), UbiError> {
        if rejoins {
            cycle.active_claimant_count = cycle
                .active_claimant_count
                .checked_add(1)
                .ok_or(UbiError::ArithmeticOverflow)?;
        }
        let recomputed = Self::refresh_cycle(env, config, cycle, today);
        Ok((cycle::daily_entitlement(cycle), recomputed))
    }

    /// Checks and records a single fishing. No tokens move here.
    fn fish_one(
        env: &Env,
        config: &SchemeConfig,
        cycle: &mut CycleState,
        today: u64,
        fisher: &Address,
        target: &Address,
    ) -> Result<i128, UbiError> {
        let existing = Self::get_claimant(env.clone(), target.clone());
        registry::check_fishable(existing.as_ref(), today, config.max_inactive_days)?;
        let mut claimant = existing.ok_or(UbiError::NotInactive)?;

        let reward = cycle::daily_entitlement(cycle);

        claimant.is_fished = true;
        cycle.active_claimant_count = cycle
            .active_claimant_count
            .checked_sub(1)
            .ok_or(UbiError::ArithmeticOverflow)?;

        env.storage().persistent().set(&DataKey::Claimant(target.clone()), &claimant);

        let event = UserFishedEvent {
            target: target.clone(),
            fisher: fisher.clone(),
            reward,
            day: today,
        };
        env.events().publish((symbol_short!("fished"),), event);

        Ok(reward)
    }

    fn pay_fisher(env: &Env, config: &SchemeConfig, fisher: &Address, amount: i128) {
        if amount > 0 {
            token::Client::new(env, &config.reward_token)
                .transfer(&env.current_contract_address(), fisher, &amount);
        }
    }

    fn publish_cycle(env: &Env, config: &SchemeConfig, today: u64, daily_pool: i128) {
        let event = CycleCalculatedEvent {
            day: today,
            daily_pool,
            cycle_length: config.cycle_length_days,
            pool_balance: Self::pool_balance(env, config),
        };
        env.events().publish((symbol_short!("cycle"),), event);

        log!(env, "Daily pool fixed at {} on day {}", daily_pool, today);
    }

    /// Shared by `start` and `upgrade`: activates a pending scheme, then pulls
    /// the predecessor's pool and registers with the first-claim pool. Both
    /// schemes must answer to the same governance authority.
    fn take_over(env: &Env, mut config: SchemeConfig, predecessor: Address) -> Result<(), UbiError> {
        if env.storage().instance().get(&DataKey::Upgraded).unwrap_or(false) {
            return Err(UbiError::AlreadyUpgraded);
        }

        // A running scheme cannot adopt a predecessor mid-period
        if Self::stored_status(env)? != SchemeStatus::Pending {
            return Err(UbiError::InvalidState);
        }

        let predecessor_client = UbiSchemeClient::new(env, &predecessor);
        if predecessor_client.get_config().admin != config.admin {
            return Err(UbiError::Unauthorized);
        }
        if predecessor_client.status() != SchemeStatus::Expired {
            return Err(UbiError::PredecessorNotExpired);
        }

        config.predecessor = Some(predecessor.clone());
        env.storage().instance().set(&DataKey::Config, &config);
        env.storage().instance().set(&DataKey::Upgraded, &true);
        env.storage().instance().set(&DataKey::Status, &SchemeStatus::Active);

        let event = SchemeUpgradedEvent {
            predecessor: predecessor.clone(),
            timestamp: env.ledger().timestamp(),
        };
        env.events().publish((symbol_short!("upgraded"),), event);

        let moved = predecessor_client.hand_over(&config.admin, &env.current_contract_address());
        FirstClaimPoolClient::new(env, &config.first_claim_pool)
            .set_ubi_scheme(&env.current_contract_address());

        log!(env, "UBI scheme took over {} from predecessor {}", moved, predecessor);

        Ok(())
    }
}
