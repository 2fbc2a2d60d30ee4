//! Executor registry: stake bookkeeping, slashing and checkins
//!
//! Active-set membership is never changed here. Registration and stake
//! changes only mark executors as pending or leave them for the rollover to
//! prune, so the set stays fixed for the whole epoch.

use cosmwasm_std::{BankMsg, Coin, DepsMut, Env, MessageInfo, Response, Storage, Uint128};

use crate::error::ContractError;
use crate::helpers::paid_amount;
use crate::state::{
    Config, CoordinatorState, Executor, ExecutorStatus, CONFIG, EXECUTORS, PENDING_EXECUTORS,
    STATE,
};

/// Why stake is being slashed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashReason {
    /// Committed but never revealed
    MissedReveal,
    /// Designated for rounds it never checked in for
    Inactive,
}

impl SlashReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlashReason::MissedReveal => "missed_reveal",
            SlashReason::Inactive => "inactive",
        }
    }
}

/// Decrease `executor.balance` by `amount`, floored at zero
///
/// The slashed stake moves to `state.slashed_balance`. Executors left below
/// the threshold are pruned from the active set at the next rollover.
pub fn slash(
    state: &mut CoordinatorState,
    executor: &mut Executor,
    amount: Uint128,
) -> Uint128 {
    let slashed = amount.min(executor.balance);
    executor.balance -= slashed;
    state.total_staked = state.total_staked.saturating_sub(slashed);
    state.slashed_balance += slashed;
    slashed
}

/// Record liveness of the designated executor of `round`
///
/// The first checkin of a round counts toward `rounds_checked_in_epoch`;
/// every designated execution counts toward the reward weight.
pub fn record_checkin(executor: &mut Executor, epoch: u64, round: u32, executed: bool) {
    let same_round = executor.last_checkin_epoch == epoch && executor.last_checkin_round == round;
    if !same_round {
        executor.rounds_checked_in_epoch += 1;
        executor.last_checkin_epoch = epoch;
        executor.last_checkin_round = round;
    }
    if executed {
        executor.executions_in_rounds_in_epoch += 1;
    }
}

fn queue_pending(
    storage: &mut dyn Storage,
    state: &mut CoordinatorState,
    config: &Config,
    executor: &mut Executor,
) -> Result<(), ContractError> {
    if state.executor_count >= config.max_executors {
        return Err(ContractError::ExecutorCapacityReached {
            max: config.max_executors,
        });
    }
    executor.status = ExecutorStatus::Pending;
    state.executor_count += 1;
    PENDING_EXECUTORS.save(storage, &executor.address, &true)?;
    Ok(())
}

pub fn execute_register(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let mut state = STATE.load(deps.storage)?;

    if EXECUTORS.has(deps.storage, &info.sender) {
        return Err(ContractError::AlreadyRegistered {
            address: info.sender.to_string(),
        });
    }

    let stake = paid_amount(&info, &config.staking_denom)?;
    if stake < config.staking_amount_per_module {
        return Err(ContractError::InsufficientStake {
            required: config.staking_amount_per_module.to_string(),
            provided: stake.to_string(),
        });
    }

    let mut executor = Executor::new(info.sender.clone(), stake, env.block.time.seconds());
    queue_pending(deps.storage, &mut state, &config, &mut executor)?;
    state.total_staked = state.total_staked.checked_add(stake)?;

    EXECUTORS.save(deps.storage, &info.sender, &executor)?;
    STATE.save(deps.storage, &state)?;

    Ok(Response::new()
        .add_attribute("action", "register")
        .add_attribute("executor", info.sender)
        .add_attribute("stake", stake)
        .add_attribute(
            "eligible_after",
            executor
                .last_registration_timestamp
                .saturating_add(config.minimum_registration_period)
                .to_string(),
        ))
}

pub fn execute_increase_stake(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let mut state = STATE.load(deps.storage)?;
    let mut executor = EXECUTORS
        .load(deps.storage, &info.sender)
        .map_err(|_| ContractError::ExecutorNotRegistered {
            address: info.sender.to_string(),
        })?;

    let amount = paid_amount(&info, &config.staking_denom)?;
    if amount.is_zero() {
        return Err(ContractError::InvalidFunds {
            expected: config.staking_denom.clone(),
            got: "nothing".to_string(),
        });
    }

    executor.balance = executor.balance.checked_add(amount)?;
    state.total_staked = state.total_staked.checked_add(amount)?;

    // Pruned executors queue up again once back above the threshold
    if executor.status == ExecutorStatus::Inactive
        && executor.balance >= config.staking_balance_threshold_per_module
    {
        queue_pending(deps.storage, &mut state, &config, &mut executor)?;
    }

    EXECUTORS.save(deps.storage, &info.sender, &executor)?;
    STATE.save(deps.storage, &state)?;

    Ok(Response::new()
        .add_attribute("action", "increase_stake")
        .add_attribute("executor", info.sender)
        .add_attribute("amount", amount)
        .add_attribute("balance", executor.balance)
        .add_attribute("status", executor.status.as_str()))
}

pub fn execute_withdraw(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    amount: Uint128,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let mut state = STATE.load(deps.storage)?;
    let mut executor = EXECUTORS
        .load(deps.storage, &info.sender)
        .map_err(|_| ContractError::ExecutorNotRegistered {
            address: info.sender.to_string(),
        })?;

    if amount.is_zero() || amount > executor.balance {
        return Err(ContractError::InsufficientBalance {
            requested: amount.to_string(),
            available: executor.balance.to_string(),
        });
    }

    executor.balance = executor.balance.checked_sub(amount)?;
    state.total_staked = state.total_staked.checked_sub(amount)?;

    EXECUTORS.save(deps.storage, &info.sender, &executor)?;
    STATE.save(deps.storage, &state)?;

    let below_threshold = executor.balance < config.staking_balance_threshold_per_module;
    let send_msg = BankMsg::Send {
        to_address: info.sender.to_string(),
        amount: vec![Coin {
            denom: config.staking_denom,
            amount,
        }],
    };

    Ok(Response::new()
        .add_message(send_msg)
        .add_attribute("action", "withdraw")
        .add_attribute("executor", info.sender)
        .add_attribute("amount", amount)
        .add_attribute("balance", executor.balance)
        .add_attribute(
            "pending_removal",
            (below_threshold && executor.status == ExecutorStatus::Active).to_string(),
        ))
}

pub fn execute_claim_rewards(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let mut state = STATE.load(deps.storage)?;
    let mut executor = EXECUTORS
        .load(deps.storage, &info.sender)
        .map_err(|_| ContractError::ExecutorNotRegistered {
            address: info.sender.to_string(),
        })?;

    let rewards = executor.rewards;
    if rewards.is_zero() {
        return Err(ContractError::NothingToClaim {});
    }

    executor.rewards = Uint128::zero();
    state.unclaimed_rewards = state.unclaimed_rewards.checked_sub(rewards)?;
    EXECUTORS.save(deps.storage, &info.sender, &executor)?;
    STATE.save(deps.storage, &state)?;

    let send_msg = BankMsg::Send {
        to_address: info.sender.to_string(),
        amount: vec![Coin {
            denom: config.tax.tax_denom,
            amount: rewards,
        }],
    };

    Ok(Response::new()
        .add_message(send_msg)
        .add_attribute("action", "claim_rewards")
        .add_attribute("executor", info.sender)
        .add_attribute("amount", rewards))
}
