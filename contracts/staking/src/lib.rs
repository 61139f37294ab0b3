#![no_std]
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, log, symbol_short, token, Address, Env,
    I256,
};
use commons_shared::{
    fixed_point::{effective_amount, mul_div_floor},
    validate_bps, validate_non_negative_amount, validate_positive_amount,
};

mod accumulator;
mod test;

// Data Types
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StakerPosition {
    pub staker: Address,
    pub principal: i128,
    pub donation_ratio_bps: u32, // Ratio used by the most recent stake
    pub effective_stake: i128, // Principal net of donations, summed per increment
    pub yield_debt: I256, // Index domain (1e27)
    pub withdrawn: i128, // Output precision (1e2), only grows
}

impl StakerPosition {
    pub fn new(env: &Env, staker: Address) -> Self {
        Self {
            staker,
            principal: 0,
            donation_ratio_bps: 0,
            effective_stake: 0,
            yield_debt: I256::from_i128(env, 0),
            withdrawn: 0,
        }
    }
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GlobalYieldState {
    pub cumulative_yield_per_share: I256, // Index domain (1e27), never decreases
    pub total_effective_stake: i128,
    pub total_interest_reported: i128,
    pub total_staker_interest: i128,
    pub total_withdrawn: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LedgerConfig {
    pub admin: Address, // Governance authority
    pub manager: Address, // Interest oracle / staking front-end
    pub reward_token: Address,
}

// Storage Keys
#[contracttype]
pub enum DataKey {
    Config,
    GlobalState,
    Position(Address),
}

// Error Types
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum LedgerError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Unauthorized = 3,
    InvalidInput = 4,
    ZeroStakeDenominator = 5,
    InsufficientStake = 6,
    PositionNotFound = 7,
    ArithmeticOverflow = 8,
}

// Events
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StakeRecordedEvent {
    pub staker: Address,
    pub principal_delta: i128,
    pub effective_delta: i128,
    pub donation_ratio_bps: u32,
    pub total_effective_stake: i128,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InterestDistributedEvent {
    pub total_interest: i128,
    pub staker_interest: i128,
    pub total_effective_stake: i128,
    pub cumulative_yield_per_share: I256,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct YieldWithdrawnEvent {
    pub staker: Address,
    pub amount: i128,
    pub total_withdrawn: i128,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DebtAdjustedEvent {
    pub staker: Address,
    pub effective_delta: i128,
    pub yield_debt: I256,
    pub timestamp: u64,
}

#[contract]
pub struct YieldLedgerContract;

#[contractimpl]
impl YieldLedgerContract {
    /// Initialize the yield ledger
    pub fn initialize(
        env: Env,
        admin: Address,
        manager: Address,
        reward_token: Address,
    ) -> Result<(), LedgerError> {
        // Check if already initialized
        if env.storage().instance().has(&DataKey::Config) {
            return Err(LedgerError::AlreadyInitialized);
        }

        admin.require_auth();

        let config = LedgerConfig {
            admin: admin.clone(),
            manager,
            reward_token,
        };
        let state = GlobalYieldState {
            cumulative_yield_per_share: I256::from_i128(&env, 0),
            total_effective_stake: 0,
            total_interest_reported: 0,
            total_staker_interest: 0,
            total_withdrawn: 0,
        };

        env.storage().instance().set(&DataKey::Config, &config);
        env.storage().instance().set(&DataKey::GlobalState, &state);

        log!(&env, "Yield ledger initialized by admin: {}", admin);

        Ok(())
    }

    /// Report newly earned interest. Only `staker_interest` moves the index;
    /// `total_interest` is kept for reporting.
    pub fn report_interest(
        env: Env,
        manager: Address,
        total_interest: i128,
        staker_interest: i128,
    ) -> Result<(), LedgerError> {
        manager.require_auth();

        // Verify manager
        let config = Self::get_config(env.clone())?;
        if config.manager != manager {
            return Err(LedgerError::Unauthorized);
        }

        let mut state = Self::load_state(&env)?;
        Self::settle_interest(&env, &mut state, total_interest, staker_interest)?;
        env.storage().instance().set(&DataKey::GlobalState, &state);

        Ok(())
    }

    /// Record additional principal for a staker. Interest earned before the
    /// stake is settled against the old total first.
    pub fn record_stake(
        env: Env,
        manager: Address,
        staker: Address,
        added_principal: i128,
        donation_ratio_bps: u32,
        preceding_interest: i128,
    ) -> Result<i128, LedgerError> {
        manager.require_auth();

        // Verify manager
        let config = Self::get_config(env.clone())?;
        if config.manager != manager {
            return Err(LedgerError::Unauthorized);
        }

        // Validate inputs
        if !validate_positive_amount(added_principal) || !validate_bps(donation_ratio_bps) {
            return Err(LedgerError::InvalidInput);
        }

        let mut state = Self::load_state(&env)?;
        // Settle interest earned before this stake against the old total
        Self::settle_interest(&env, &mut state, preceding_interest, preceding_interest)?;

        let added_effective = effective_amount(added_principal, donation_ratio_bps)
            .ok_or(LedgerError::ArithmeticOverflow)?;

        let mut position = Self::load_position(&env, &staker);
        accumulator::add_effective(&env, &mut state, &mut position, added_effective)?;
        position.principal = position
            .principal
            .checked_add(added_principal)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        position.donation_ratio_bps = donation_ratio_bps;

        // Store position and global state
        env.storage().persistent().set(&DataKey::Position(staker.clone()), &position);
        env.storage().instance().set(&DataKey::GlobalState, &state);

        // Emit event
        let event = StakeRecordedEvent {
            staker: staker.clone(),
            principal_delta: added_principal,
            effective_delta: added_effective,
            donation_ratio_bps,
            total_effective_stake: state.total_effective_stake,
            timestamp: env.ledger().timestamp(),
        };
        env.events().publish((symbol_short!("staked"),), event);

        log!(&env, "Staker {} added {} principal ({} effective)", staker, added_principal, added_effective);

        Ok(added_effective)
    }

    /// Remove principal from a staker. Effective stake leaves in proportion to
    /// the principal removed; yield already earned stays claimable.
    pub fn remove_stake(
        env: Env,
        manager: Address,
        staker: Address,
        removed_principal: i128,
        preceding_interest: i128,
    ) -> Result<i128, LedgerError> {
        manager.require_auth();

        // Verify manager
        let config = Self::get_config(env.clone())?;
        if config.manager != manager {
            return Err(LedgerError::Unauthorized);
        }

        if !validate_positive_amount(removed_principal) {
            return Err(LedgerError::InvalidInput);
        }

        // Get current position
        let mut position: StakerPosition = env.storage().persistent()
            .get(&DataKey::Position(staker.clone()))
            .ok_or(LedgerError::PositionNotFound)?;

        if removed_principal > position.principal {
            return Err(LedgerError::InsufficientStake);
        }

        let mut state = Self::load_state(&env)?;
        Self::settle_interest(&env, &mut state, preceding_interest, preceding_interest)?;

        // Effective stake leaves pro rata; a full exit takes all of it
        let removed_effective = if removed_principal == position.principal {
            position.effective_stake
        } else {
            mul_div_floor(position.effective_stake, removed_principal, position.principal)
                .ok_or(LedgerError::ArithmeticOverflow)?
        };

        accumulator::remove_effective(&env, &mut state, &mut position, removed_effective)?;
        position.principal -= removed_principal;

        env.storage().persistent().set(&DataKey::Position(staker.clone()), &position);
        env.storage().instance().set(&DataKey::GlobalState, &state);

        let event = StakeRecordedEvent {
            staker: staker.clone(),
            principal_delta: -removed_principal,
            effective_delta: -removed_effective,
            donation_ratio_bps: position.donation_ratio_bps,
            total_effective_stake: state.total_effective_stake,
            timestamp: env.ledger().timestamp(),
        };
        env.events().publish((symbol_short!("unstaked"),), event);

        log!(&env, "Staker {} removed {} principal ({} effective)", staker, removed_principal, removed_effective);

        Ok(removed_effective)
    }

    /// Governance correction of a staker's yield debt after an out-of-band
    /// change to its effective stake
    pub fn set_yield_debt(
        env: Env,
        admin: Address,
        staker: Address,
        effective_delta: i128,
    ) -> Result<(), LedgerError> {
        admin.require_auth();

        // Verify admin
        let config = Self::get_config(env.clone())?;
        if config.admin != admin {
            return Err(LedgerError::Unauthorized);
        }

        let mut position: StakerPosition = env.storage().persistent()
            .get(&DataKey::Position(staker.clone()))
            .ok_or(LedgerError::PositionNotFound)?;

        let state = Self::load_state(&env)?;
        accumulator::adjust_debt(&env, &state, &mut position, effective_delta)?;

        env.storage().persistent().set(&DataKey::Position(staker.clone()), &position);

        let event = DebtAdjustedEvent {
            staker: staker.clone(),
            effective_delta,
            yield_debt: position.yield_debt.clone(),
            timestamp: env.ledger().timestamp(),
        };
        env.events().publish((symbol_short!("debt_adj"),), event);

        log!(&env, "Yield debt of {} adjusted by {} effective units", staker, effective_delta);

        Ok(())
    }

    /// Yield the staker can withdraw right now, at output precision
    pub fn claimable_yield(env: Env, staker: Address) -> Result<i128, LedgerError> {
        let state = Self::load_state(&env)?;
        let position: Option<StakerPosition> = env.storage().persistent()
            .get(&DataKey::Position(staker));

        match position {
            Some(position) => accumulator::claimable(&env, &state, &position),
            None => Ok(0),
        }
    }

    /// Withdraw all claimable yield. Returns 0 and changes nothing when the
    /// position is already drained.
    pub fn withdraw_yield(env: Env, staker: Address) -> Result<i128, LedgerError> {
        staker.require_auth();

        let config = Self::get_config(env.clone())?;
        let mut state = Self::load_state(&env)?;
        let mut position: StakerPosition = match env.storage().persistent()
            .get(&DataKey::Position(staker.clone()))
        {
            Some(position) => position,
            None => return Ok(0),
        };

        // Calculate claimable yield
        let paid = accumulator::claimable(&env, &state, &position)?;
        if paid == 0 {
            return Ok(0);
        }

        // Record the withdrawal before paying out
        position.withdrawn = position
            .withdrawn
            .checked_add(paid)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        state.total_withdrawn = state
            .total_withdrawn
            .checked_add(paid)
            .ok_or(LedgerError::ArithmeticOverflow)?;

        env.storage().persistent().set(&DataKey::Position(staker.clone()), &position);
        env.storage().instance().set(&DataKey::GlobalState, &state);

        let event = YieldWithdrawnEvent {
            staker: staker.clone(),
            amount: paid,
            total_withdrawn: position.withdrawn,
            timestamp: env.ledger().timestamp(),
        };
        env.events().publish((symbol_short!("withdrawn"),), event);

        // State is committed; the transfer comes last.
        token::Client::new(&env, &config.reward_token)
            .transfer(&env.current_contract_address(), &staker, &paid);

        log!(&env, "Staker {} withdrew {} yield", staker, paid);

        Ok(paid)
    }

    // Getter functions
    pub fn get_position(env: Env, staker: Address) -> Option<StakerPosition> {
        env.storage().persistent().get(&DataKey::Position(staker))
    }

    pub fn get_global_state(env: Env) -> Result<GlobalYieldState, LedgerError> {
        Self::load_state(&env)
    }

    pub fn get_total_effective_stake(env: Env) -> i128 {
        Self::load_state(&env)
            .map(|state| state.total_effective_stake)
            .unwrap_or(0)
    }

    pub fn get_config(env: Env) -> Result<LedgerConfig, LedgerError> {
        env.storage().instance()
            .get(&DataKey::Config)
            .ok_or(LedgerError::NotInitialized)
    }

    // Admin functions
    pub fn set_manager(
        env: Env,
        admin: Address,
        new_manager: Address,
    ) -> Result<(), LedgerError> {
        admin.require_auth();

        let mut config = Self::get_config(env.clone())?;
        if config.admin != admin {
            return Err(LedgerError::Unauthorized);
        }

        config.manager = new_manager.clone();
        env.storage().instance().set(&DataKey::Config, &config);

        log!(&env, "Ledger manager set to: {}", new_manager);

        Ok(())
    }

    pub fn set_admin(env: Env, admin: Address, new_admin: Address) -> Result<(), LedgerError> {
        admin.require_auth();

        let mut config = Self::get_config(env.clone())?;
        if config.admin != admin {
            return Err(LedgerError::Unauthorized);
        }

        config.admin = new_admin.clone();
        env.storage().instance().set(&DataKey::Config, &config);

        log!(&env, "Ledger admin set to: {}", new_admin);

        Ok(())
    }

    // Internal helper functions
    fn load_state(env: &Env) -> Result<GlobalYieldState, LedgerError> {
        env.storage().instance()
            .get(&DataKey::GlobalState)
            .ok_or(LedgerError::NotInitialized)
    }

    fn load_position(env: &Env, staker: &Address) -> StakerPosition {
        env.storage().persistent()
            .get(&DataKey::Position(staker.clone()))
            .unwrap_or_else(|| StakerPosition::new(env, staker.clone()))
    }

    /// Applies an interest report to `state`. Interest arriving while nothing
    /// is staked is dropped with a log line rather than failing the call.
    fn settle_interest(
        env: &Env,
        state: &mut GlobalYieldState,
        total_interest: i128,
        staker_interest: i128,
    ) -> Result<(), LedgerError> {
        if !validate_non_negative_amount(staker_interest) || staker_interest > total_interest {
            return Err(LedgerError::InvalidInput);
        }
        if total_interest == 0 {
            return Ok(());
        }

        match accumulator::distribute(env, state, staker_interest) {
            Ok(()) => {}
            Err(LedgerError::ZeroStakeDenominator) => {
                log!(env, "No effective stake; {} interest not distributed", staker_interest);
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        state.total_interest_reported = state
            .total_interest_reported
            .checked_add(total_interest)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        state.total_staker_interest = state
            .total_staker_interest
            .checked_add(staker_interest)
            .ok_or(LedgerError::ArithmeticOverflow)?;

        let event = InterestDistributedEvent {
            total_interest,
            staker_interest,
            total_effective_stake: state.total_effective_stake,
            cumulative_yield_per_share: state.cumulative_yield_per_share.clone(),
            timestamp: env.ledger().timestamp(),
        };
        env.events().publish((symbol_short!("interest"),), event);

        Ok(())
    }
}
