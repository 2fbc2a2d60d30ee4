use cadence_types::ModuleKind;
use cosmwasm_std::{Deps, Env, HexBinary, Order, StdError, StdResult};

use crate::active_set;
use crate::gate::{open_tax, ExecutionModule, FeeModule};
use crate::helpers::{commitment_to_response, executor_to_response};
use crate::modules::{WasmExecutionModule, WasmFeeModule};
use crate::msg::{
    ActiveExecutorsResponse, CommitmentResponse, ConfigResponse, DesignatedExecutorResponse,
    EncodedJobDataResponse, EpochSeedResponse, ExecutionQuoteResponse, ExecutorResponse,
    JobModulesResponse, ModuleEntry, ModulesResponse, PhaseResponse, StateResponse,
};
use crate::randomness::designated_executor;
use crate::state::{
    JobRecord, COMMITMENTS, CONFIG, EPOCH_SEEDS, EXECUTORS, JOBS, JOB_REGISTRIES, MODULES, STATE,
};

pub fn query_config(deps: Deps) -> StdResult<ConfigResponse> {
    let config = CONFIG.load(deps.storage)?;
    Ok(ConfigResponse {
        owner: config.owner.to_string(),
        treasury: config.treasury.to_string(),
        staking_denom: config.staking_denom,
        staking_amount_per_module: config.staking_amount_per_module,
        minimum_registration_period: config.minimum_registration_period,
        staking_balance_threshold_per_module: config.staking_balance_threshold_per_module,
        inactive_slashing_amount_per_module: config.inactive_slashing_amount_per_module,
        commit_slashing_amount_per_module: config.commit_slashing_amount_per_module,
        max_executors: config.max_executors,
        schedule: config.schedule,
        tax_denom: config.tax.tax_denom,
        execution_tax: config.tax.execution_tax,
        zero_fee_execution_tax: config.tax.zero_fee_execution_tax,
        protocol_pool_cut_bps: config.tax.protocol_pool_cut_bps,
    })
}

pub fn query_state(deps: Deps) -> StdResult<StateResponse> {
    let state = STATE.load(deps.storage)?;
    Ok(StateResponse {
        epoch: state.epoch,
        epoch_end_time: state.epoch_end_time,
        reveal_count: state.reveal_mix.reveal_count,
        epoch_pool_balance: state.epoch_pool_balance,
        next_epoch_pool_balance: state.next_epoch_pool_balance,
        protocol_balance: state.protocol_balance,
        slashed_balance: state.slashed_balance,
        unclaimed_rewards: state.unclaimed_rewards,
        total_staked: state.total_staked,
        executor_count: state.executor_count,
        active_count: active_set::len(deps.storage)?,
    })
}

pub fn query_executor(deps: Deps, address: String) -> StdResult<ExecutorResponse> {
    let address = deps.api.addr_validate(&address)?;
    let executor = EXECUTORS.load(deps.storage, &address)?;
    Ok(executor_to_response(deps.storage, executor))
}

pub fn query_active_executors(deps: Deps) -> StdResult<ActiveExecutorsResponse> {
    let config = CONFIG.load(deps.storage)?;
    let executors = active_set::members(deps.storage, config.max_executors)?
        .into_iter()
        .map(|addr| addr.to_string())
        .collect();
    Ok(ActiveExecutorsResponse { executors })
}

/// Phase as seen by the next transaction; an ended epoch reports `Ended`
/// until someone rolls it over
pub fn query_phase(deps: Deps, env: Env) -> StdResult<PhaseResponse> {
    let config = CONFIG.load(deps.storage)?;
    let state = STATE.load(deps.storage)?;
    let now = env.block.time.seconds();
    Ok(PhaseResponse {
        epoch: state.epoch,
        phase: config.schedule.phase_at(state.epoch_end_time, now),
        round: config.schedule.round_index(state.epoch_end_time, now).ok(),
        epoch_end_time: state.epoch_end_time,
    })
}

pub fn query_designated_executor(
    deps: Deps,
    env: Env,
    round: Option<u32>,
) -> StdResult<DesignatedExecutorResponse> {
    let config = CONFIG.load(deps.storage)?;
    let state = STATE.load(deps.storage)?;
    let schedule = &config.schedule;

    let round = match round {
        Some(round) => round,
        None => schedule
            .round_index(state.epoch_end_time, env.block.time.seconds())
            .map_err(|e| StdError::generic_err(e.to_string()))?,
    };
    let window = schedule
        .round_window(state.epoch_end_time, round)
        .map_err(|e| StdError::generic_err(e.to_string()))?;
    let executor = designated_executor(deps.storage, &state, round)
        .map_err(|e| StdError::generic_err(e.to_string()))?;

    Ok(DesignatedExecutorResponse {
        epoch: state.epoch,
        round,
        executor: executor.map(|addr| addr.to_string()),
        opens_at: window.opens_at,
        closes_at: window.closes_at,
    })
}

pub fn query_commitment(deps: Deps, epoch: u64, executor: String) -> StdResult<CommitmentResponse> {
    let executor = deps.api.addr_validate(&executor)?;
    let commit = COMMITMENTS.may_load(deps.storage, (epoch, &executor))?;
    Ok(commitment_to_response(commit))
}

/// Archived seed of a finished epoch; the current epoch's seed once reveals are closed
pub fn query_epoch_seed(deps: Deps, env: Env, epoch: u64) -> StdResult<EpochSeedResponse> {
    let state = STATE.load(deps.storage)?;

    let seed = if epoch < state.epoch {
        EPOCH_SEEDS.may_load(deps.storage, epoch)?
    } else if epoch == state.epoch {
        let config = CONFIG.load(deps.storage)?;
        let phase = config
            .schedule
            .phase_at(state.epoch_end_time, env.block.time.seconds());
        if phase.reveals_closed() {
            let seed = state
                .seed()
                .map_err(|e| StdError::generic_err(e.to_string()))?;
            Some(HexBinary::from(seed.to_vec()))
        } else {
            None
        }
    } else {
        None
    };

    Ok(EpochSeedResponse { epoch, seed })
}

fn load_job(deps: Deps, registry: &str, index: u64) -> StdResult<JobRecord> {
    let registry = deps.api.addr_validate(registry)?;
    JOBS.load(deps.storage, (&registry, index))
}

pub fn query_job_modules(deps: Deps, registry: String, index: u64) -> StdResult<JobModulesResponse> {
    let record = load_job(deps, &registry, index)?;
    Ok(JobModulesResponse {
        execution_selector: record.execution_selector,
        execution_module: record.execution_module.to_string(),
        fee_selector: record.fee_selector,
        fee_module: record.fee_module.to_string(),
        execution_window: record.execution_window,
    })
}

pub fn query_encoded_job_data(
    deps: Deps,
    registry: String,
    index: u64,
) -> StdResult<EncodedJobDataResponse> {
    let record = load_job(deps, &registry, index)?;
    Ok(EncodedJobDataResponse {
        execution_data: WasmExecutionModule::new(record.execution_module, deps.querier)
            .encoded_data(index)?,
        fee_data: WasmFeeModule::new(record.fee_module, deps.querier).encoded_data(index)?,
    })
}

pub fn query_execution_quote(
    deps: Deps,
    registry: String,
    index: u64,
    zero_fee_window: u64,
    variable_gas_consumption: u64,
) -> StdResult<ExecutionQuoteResponse> {
    let config = CONFIG.load(deps.storage)?;
    let record = load_job(deps, &registry, index)?;
    let execution_module = WasmExecutionModule::new(record.execution_module, deps.querier);
    let fee_module = WasmFeeModule::new(record.fee_module, deps.querier);

    let execution_time = execution_module.execution_time(index, record.execution_window)?;
    let quote = fee_module.execution_fee(
        index,
        record.execution_window,
        zero_fee_window,
        execution_time,
        variable_gas_consumption,
    )?;

    Ok(ExecutionQuoteResponse {
        execution_time,
        execution_fee: quote.fee,
        fee_token: quote.fee_token,
        in_zero_fee_window: quote.in_zero_fee_window,
        tax: open_tax(&config, quote.in_zero_fee_window),
    })
}

pub fn query_is_job_registry(deps: Deps, address: String) -> StdResult<bool> {
    let address = deps.api.addr_validate(&address)?;
    Ok(JOB_REGISTRIES.has(deps.storage, &address))
}

pub fn query_modules(deps: Deps) -> StdResult<ModulesResponse> {
    let mut modules = vec![];
    for kind in [ModuleKind::Execution, ModuleKind::Fee] {
        for entry in MODULES
            .prefix(kind.as_u8())
            .range(deps.storage, None, None, Order::Ascending)
        {
            let (selector, address) = entry?;
            modules.push(ModuleEntry {
                kind: kind.as_str().to_string(),
                selector,
                address: address.to_string(),
            });
        }
    }
    Ok(ModulesResponse { modules })
}
