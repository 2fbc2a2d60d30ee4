//! Commit-reveal handlers and designated executor selection

use cadence_types::{commitment_hash, designated_index, to_hash32, Phase, RoundWindow};
use cosmwasm_std::{
    Addr, Binary, DepsMut, Env, Event, HexBinary, MessageInfo, Order, Response, StdResult, Storage,
};

use crate::active_set;
use crate::error::ContractError;
use crate::registry::{record_checkin, slash, SlashReason};
use crate::state::{CommitData, Config, CoordinatorState, COMMITMENTS, CONFIG, EXECUTORS, STATE};

fn ensure_phase(
    config: &Config,
    state: &CoordinatorState,
    now: u64,
    expected: Phase,
) -> Result<(), ContractError> {
    let current = config.schedule.phase_at(state.epoch_end_time, now);
    if current != expected {
        return Err(ContractError::WrongPhase {
            expected: expected.to_string(),
            current: current.to_string(),
        });
    }
    Ok(())
}

/// Executor designated for `round` of the current epoch
///
/// `None` when the active set is empty. Only meaningful once reveals are
/// closed, before that the seed can still change.
pub fn designated_executor(
    storage: &dyn Storage,
    state: &CoordinatorState,
    round: u32,
) -> Result<Option<Addr>, ContractError> {
    let seed = state.seed()?;
    let len = active_set::len(storage)?;
    match designated_index(&seed, round, len as usize) {
        Some(index) => Ok(Some(active_set::get(storage, index as u32)?)),
        None => Ok(None),
    }
}

/// Round and window in which `executor` may act as designated executor at `now`
pub fn ensure_designated(
    storage: &dyn Storage,
    config: &Config,
    state: &CoordinatorState,
    now: u64,
    executor: &Addr,
) -> Result<RoundWindow, ContractError> {
    let schedule = &config.schedule;
    let round = schedule.designated_round(state.epoch_end_time, now)?;
    let window = schedule.round_window(state.epoch_end_time, round)?;

    match designated_executor(storage, state, round)? {
        Some(designated) if designated == *executor => Ok(window),
        _ => Err(ContractError::NotDesignatedExecutor { round }),
    }
}

pub fn execute_commit(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    commitment: HexBinary,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let state = STATE.load(deps.storage)?;
    let now = env.block.time.seconds();

    ensure_phase(&config, &state, now, Phase::Commit)?;

    if COMMITMENTS.has(deps.storage, (state.epoch, &info.sender)) {
        return Err(ContractError::AlreadyCommitted { epoch: state.epoch });
    }

    if !active_set::contains(deps.storage, &info.sender) {
        return Err(ContractError::NotActiveExecutor {
            address: info.sender.to_string(),
        });
    }

    to_hash32(commitment.as_slice())?;

    let commit = CommitData {
        commitment: commitment.clone(),
        committed_at: now,
        revealed_at: None,
        slashed: false,
    };
    COMMITMENTS.save(deps.storage, (state.epoch, &info.sender), &commit)?;

    Ok(Response::new()
        .add_attribute("action", "commit")
        .add_attribute("executor", info.sender)
        .add_attribute("epoch", state.epoch.to_string())
        .add_attribute("commitment", commitment.to_hex()))
}

pub fn execute_reveal(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    preimage: Binary,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let mut state = STATE.load(deps.storage)?;
    let now = env.block.time.seconds();

    ensure_phase(&config, &state, now, Phase::Reveal)?;

    let mut commit = COMMITMENTS
        .may_load(deps.storage, (state.epoch, &info.sender))?
        .ok_or(ContractError::NoCommitment { epoch: state.epoch })?;

    if commit.revealed_at.is_some() {
        return Err(ContractError::AlreadyRevealed { epoch: state.epoch });
    }

    let expected = commitment_hash(state.epoch, info.sender.as_str(), preimage.as_slice());
    if commit.commitment.as_slice() != expected.as_slice() {
        return Err(ContractError::CommitmentMismatch {});
    }

    state
        .reveal_mix
        .fold(info.sender.as_str(), preimage.as_slice())?;
    commit.revealed_at = Some(now);

    COMMITMENTS.save(deps.storage, (state.epoch, &info.sender), &commit)?;
    STATE.save(deps.storage, &state)?;

    Ok(Response::new()
        .add_attribute("action", "reveal")
        .add_attribute("executor", info.sender)
        .add_attribute("epoch", state.epoch.to_string())
        .add_attribute("reveal_count", state.reveal_mix.reveal_count.to_string()))
}

/// Commit-slash every unrevealed, not yet slashed commitment of the current epoch
///
/// Returns one event per slashed executor. Iteration is bounded by
/// `max_executors` since only active executors can commit.
pub fn slash_missed_reveals(
    storage: &mut dyn Storage,
    config: &Config,
    state: &mut CoordinatorState,
) -> Result<Vec<Event>, ContractError> {
    let missed: Vec<(Addr, CommitData)> = COMMITMENTS
        .prefix(state.epoch)
        .range(storage, None, None, Order::Ascending)
        .take(config.max_executors as usize)
        .collect::<StdResult<Vec<_>>>()?
        .into_iter()
        .filter(|(_, commit)| commit.revealed_at.is_none() && !commit.slashed)
        .collect();

    let mut events = Vec::with_capacity(missed.len());
    for (addr, mut commit) in missed {
        commit.slashed = true;
        COMMITMENTS.save(storage, (state.epoch, &addr), &commit)?;

        let Some(mut executor) = EXECUTORS.may_load(storage, &addr)? else {
            continue;
        };
        let amount = slash(state, &mut executor, config.commit_slashing_amount_per_module);
        EXECUTORS.save(storage, &addr, &executor)?;

        events.push(
            Event::new("cadence_slash")
                .add_attribute("executor", addr.to_string())
                .add_attribute("reason", SlashReason::MissedReveal.as_str())
                .add_attribute("epoch", state.epoch.to_string())
                .add_attribute("amount", amount)
                .add_attribute("balance", executor.balance),
        );
    }

    Ok(events)
}

pub fn execute_slash_missed_reveals(
    deps: DepsMut,
    env: Env,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let mut state = STATE.load(deps.storage)?;
    let phase = config
        .schedule
        .phase_at(state.epoch_end_time, env.block.time.seconds());

    if !phase.reveals_closed() {
        return Err(ContractError::WrongPhase {
            expected: Phase::Slashing.to_string(),
            current: phase.to_string(),
        });
    }

    let events = slash_missed_reveals(deps.storage, &config, &mut state)?;
    STATE.save(deps.storage, &state)?;

    Ok(Response::new()
        .add_attribute("action", "slash_missed_reveals")
        .add_attribute("epoch", state.epoch.to_string())
        .add_attribute("slashed_count", events.len().to_string())
        .add_events(events))
}

pub fn execute_check_in(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let state = STATE.load(deps.storage)?;
    let now = env.block.time.seconds();

    let window = ensure_designated(deps.storage, &config, &state, now, &info.sender)?;

    let mut executor = EXECUTORS
        .load(deps.storage, &info.sender)
        .map_err(|_| ContractError::ExecutorNotRegistered {
            address: info.sender.to_string(),
        })?;
    record_checkin(&mut executor, state.epoch, window.round, false);
    EXECUTORS.save(deps.storage, &info.sender, &executor)?;

    Ok(Response::new()
        .add_attribute("action", "check_in")
        .add_attribute("executor", info.sender)
        .add_attribute("epoch", state.epoch.to_string())
        .add_attribute("round", window.round.to_string())
        .add_attribute(
            "rounds_checked_in_epoch",
            executor.rounds_checked_in_epoch.to_string(),
        ))
}
