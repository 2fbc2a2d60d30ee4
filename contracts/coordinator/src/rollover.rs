//! Epoch rollover: slashing, reward distribution and active-set maintenance
//!
//! Rollover is lazy. The `execute` entry point calls [`roll_if_due`] before
//! dispatching any message, so the first transaction observing
//! `now >= epoch_end_time` settles the finished epoch before its own effects
//! apply. The next epoch starts at the rollover timestamp.
//!
//! Every loop is bounded by `max_executors` or `rounds_per_epoch`, both fixed
//! at instantiation.

use cadence_types::{designated_index, split_pro_rata, Phase};
use cosmwasm_std::{Addr, Deps, Env, Event, HexBinary, Order, Response, StdResult, Storage, Uint128};

use crate::active_set;
use crate::error::ContractError;
use crate::randomness::slash_missed_reveals;
use crate::registry::{slash, SlashReason};
use crate::state::{
    Config, CoordinatorState, Executor, ExecutorStatus, COMMITMENTS, CONFIG, EPOCH_SEEDS,
    EXECUTORS, PENDING_EXECUTORS, STATE,
};

/// Roll over the current epoch if it has ended; returns the emitted events
pub fn roll_if_due(
    storage: &mut dyn Storage,
    env: &Env,
    config: &Config,
) -> Result<Vec<Event>, ContractError> {
    let mut state = STATE.load(storage)?;
    let now = env.block.time.seconds();
    if now < state.epoch_end_time {
        return Ok(vec![]);
    }

    let events = rollover(storage, config, &mut state, now)?;
    STATE.save(storage, &state)?;
    Ok(events)
}

/// Explicit rollover trigger
///
/// The rollover itself already ran in `execute`; `rolled_over` tells whether
/// it did. Fails when the epoch has not ended yet.
pub fn execute_initiate_epoch(
    deps: Deps,
    env: Env,
    rolled_over: bool,
) -> Result<Response, ContractError> {
    let state = STATE.load(deps.storage)?;
    if !rolled_over {
        let config = CONFIG.load(deps.storage)?;
        return Err(ContractError::WrongPhase {
            expected: Phase::Ended.to_string(),
            current: config
                .schedule
                .phase_at(state.epoch_end_time, env.block.time.seconds())
                .to_string(),
        });
    }

    Ok(Response::new()
        .add_attribute("action", "initiate_epoch")
        .add_attribute("epoch", state.epoch.to_string())
        .add_attribute("epoch_end_time", state.epoch_end_time.to_string()))
}

fn rollover(
    storage: &mut dyn Storage,
    config: &Config,
    state: &mut CoordinatorState,
    now: u64,
) -> Result<Vec<Event>, ContractError> {
    let ended_epoch = state.epoch;
    let seed = state.seed()?;
    let members = active_set::members(storage, config.max_executors)?;

    // 1. Commit-slash missed reveals, then inactive-slash absent designated executors
    let mut events = slash_missed_reveals(storage, config, state)?;
    clear_commitments(storage, config, ended_epoch)?;

    let mut designated_rounds = vec![0u32; members.len()];
    for round in 0..config.schedule.rounds_per_epoch {
        if let Some(index) = designated_index(&seed, round, members.len()) {
            designated_rounds[index] += 1;
        }
    }

    let mut executors: Vec<Executor> = members
        .iter()
        .map(|addr| EXECUTORS.load(storage, addr))
        .collect::<StdResult<_>>()?;

    for (executor, designated) in executors.iter_mut().zip(designated_rounds.iter()) {
        if *designated > 0 && executor.rounds_checked_in_epoch < *designated {
            let amount = slash(state, executor, config.inactive_slashing_amount_per_module);
            events.push(
                Event::new("cadence_slash")
                    .add_attribute("executor", executor.address.to_string())
                    .add_attribute("reason", SlashReason::Inactive.as_str())
                    .add_attribute("epoch", ended_epoch.to_string())
                    .add_attribute("designated_rounds", designated.to_string())
                    .add_attribute("rounds_checked_in", executor.rounds_checked_in_epoch.to_string())
                    .add_attribute("amount", amount)
                    .add_attribute("balance", executor.balance),
            );
        }
    }

    // 2. Distribute the epoch pool by designated executions
    let weights: Vec<u64> = executors
        .iter()
        .map(|e| e.executions_in_rounds_in_epoch)
        .collect();
    let pool = state.epoch_pool_balance;
    let split = split_pro_rata(pool, &weights);

    for (executor, payout) in executors.iter_mut().zip(split.payouts.iter()) {
        if payout.is_zero() {
            continue;
        }
        executor.rewards = executor.rewards.checked_add(*payout)?;
        events.push(
            Event::new("cadence_reward")
                .add_attribute("executor", executor.address.to_string())
                .add_attribute("epoch", ended_epoch.to_string())
                .add_attribute("executions", executor.executions_in_rounds_in_epoch.to_string())
                .add_attribute("amount", *payout),
        );
    }
    state.unclaimed_rewards = state.unclaimed_rewards.checked_add(split.distributed())?;
    state.protocol_balance = state.protocol_balance.checked_add(split.remainder)?;

    // 3. Promote the pool collected during the ended epoch
    state.epoch_pool_balance = state.next_epoch_pool_balance;
    state.next_epoch_pool_balance = Uint128::zero();

    // 4. Reset per-epoch counters and prune members below the threshold
    let mut removed = 0u32;
    for mut executor in executors {
        executor.rounds_checked_in_epoch = 0;
        executor.executions_in_rounds_in_epoch = 0;
        if executor.balance < config.staking_balance_threshold_per_module {
            active_set::remove(storage, &executor.address)?;
            executor.status = ExecutorStatus::Inactive;
            state.executor_count = state.executor_count.saturating_sub(1);
            removed += 1;
        }
        EXECUTORS.save(storage, &executor.address, &executor)?;
    }

    let added = activate_pending(storage, config, state, now)?;

    // 5. Archive the seed and open the next epoch
    let archived = HexBinary::from(seed.to_vec());
    EPOCH_SEEDS.save(storage, ended_epoch, &archived)?;
    state.prev_seed = archived;
    state.reveal_mix = Default::default();
    state.epoch = ended_epoch + 1;
    state.epoch_end_time = config.schedule.epoch_end_after(now)?;

    events.push(
        Event::new("cadence_rollover")
            .add_attribute("ended_epoch", ended_epoch.to_string())
            .add_attribute("epoch", state.epoch.to_string())
            .add_attribute("epoch_end_time", state.epoch_end_time.to_string())
            .add_attribute("seed", hex::encode(seed))
            .add_attribute("distributed", split.distributed())
            .add_attribute("protocol_remainder", split.remainder)
            .add_attribute("epoch_pool_balance", state.epoch_pool_balance)
            .add_attribute("removed", removed.to_string())
            .add_attribute("added", added.to_string())
            .add_attribute("active_count", active_set::len(storage)?.to_string()),
    );

    Ok(events)
}

fn clear_commitments(storage: &mut dyn Storage, config: &Config, epoch: u64) -> StdResult<()> {
    let committed: Vec<Addr> = COMMITMENTS
        .prefix(epoch)
        .keys(storage, None, None, Order::Ascending)
        .take(config.max_executors as usize)
        .collect::<StdResult<_>>()?;
    for addr in committed {
        COMMITMENTS.remove(storage, (epoch, &addr));
    }
    Ok(())
}

/// Move eligible pending executors into the active set
///
/// Pending executors that fell below the threshold before activation become
/// inactive; those still inside the registration period keep waiting.
fn activate_pending(
    storage: &mut dyn Storage,
    config: &Config,
    state: &mut CoordinatorState,
    now: u64,
) -> Result<u32, ContractError> {
    let pending: Vec<Addr> = PENDING_EXECUTORS
        .keys(storage, None, None, Order::Ascending)
        .take(config.max_executors as usize)
        .collect::<StdResult<_>>()?;

    let mut added = 0u32;
    for addr in pending {
        let mut executor = EXECUTORS.load(storage, &addr)?;
        if executor.balance < config.staking_balance_threshold_per_module {
            executor.status = ExecutorStatus::Inactive;
            state.executor_count = state.executor_count.saturating_sub(1);
        } else if executor.is_eligible(config, now) {
            active_set::insert(storage, &addr)?;
            executor.status = ExecutorStatus::Active;
            added += 1;
        } else {
            continue;
        }
        PENDING_EXECUTORS.remove(storage, &addr);
        EXECUTORS.save(storage, &addr, &executor)?;
    }

    Ok(added)
}
