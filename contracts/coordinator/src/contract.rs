use cadence_types::{ModuleKind, BPS_DENOMINATOR, PROTOCOL_VERSION};
use cosmwasm_std::{
    entry_point, to_json_binary, Binary, Deps, DepsMut, Env, HexBinary, MessageInfo, Reply,
    Response, StdError, StdResult, SubMsgResult, Uint128,
};
use sha2::{Digest, Sha256};

use crate::error::ContractError;
use crate::gate::{execute_on_execute_job, REPLY_IGNORE_APP_REVERT};
use crate::modules::{
    execute_add_job_registry, execute_add_module, execute_on_create_job, execute_on_delete_job,
    execute_on_update_fee_data, execute_withdraw_protocol_balance,
};
use crate::msg::{ExecuteMsg, InstantiateMsg, QueryMsg};
use crate::queries::{
    query_active_executors, query_commitment, query_config, query_designated_executor,
    query_encoded_job_data, query_epoch_seed, query_execution_quote, query_executor,
    query_is_job_registry, query_job_modules, query_modules, query_phase, query_state,
};
use crate::randomness::{
    execute_check_in, execute_commit, execute_reveal, execute_slash_missed_reveals,
};
use crate::registry::{
    execute_claim_rewards, execute_increase_stake, execute_register, execute_withdraw,
};
use crate::rollover::{execute_initiate_epoch, roll_if_due};
use crate::state::{Config, CoordinatorState, TaxConfig, CONFIG, STATE};

const GENESIS_DOMAIN: &[u8] = b"cadence/genesis/v1";

/// Collects every configuration problem instead of stopping at the first one
fn validate_instantiate(msg: &InstantiateMsg) -> Vec<String> {
    let mut errors = msg.schedule.validate();

    if msg.staking_denom.is_empty() {
        errors.push("staking_denom must not be empty".to_string());
    }
    if msg.tax_denom.is_empty() {
        errors.push("tax_denom must not be empty".to_string());
    }
    if msg.staking_amount_per_module.is_zero() {
        errors.push("staking_amount_per_module must be greater than 0".to_string());
    }
    if msg.staking_balance_threshold_per_module > msg.staking_amount_per_module {
        errors.push(
            "staking_balance_threshold_per_module must not exceed staking_amount_per_module"
                .to_string(),
        );
    }
    if msg.protocol_pool_cut_bps > BPS_DENOMINATOR {
        errors.push(format!(
            "protocol_pool_cut_bps must be at most {}",
            BPS_DENOMINATOR
        ));
    }
    if msg.zero_fee_execution_tax > msg.execution_tax {
        errors.push("zero_fee_execution_tax must not exceed execution_tax".to_string());
    }
    if msg.max_executors == 0 {
        errors.push("max_executors must be greater than 0".to_string());
    }

    errors
}

/// Seed of epoch 0, the `prev_seed` of the first epoch
fn genesis_seed(env: &Env) -> HexBinary {
    let mut hasher = Sha256::new();
    hasher.update(GENESIS_DOMAIN);
    hasher.update(env.contract.address.as_bytes());
    hasher.update(env.block.chain_id.as_bytes());
    hasher.update(env.block.height.to_be_bytes());
    HexBinary::from(hasher.finalize().to_vec())
}

#[entry_point]
pub fn instantiate(
    deps: DepsMut,
    env: Env,
    _info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    let errors = validate_instantiate(&msg);
    if !errors.is_empty() {
        return Err(ContractError::InvalidConfig {
            reason: errors.join("; "),
        });
    }

    let config = Config {
        owner: deps.api.addr_validate(&msg.owner)?,
        treasury: deps.api.addr_validate(&msg.treasury)?,
        staking_denom: msg.staking_denom,
        staking_amount_per_module: msg.staking_amount_per_module,
        minimum_registration_period: msg.minimum_registration_period,
        staking_balance_threshold_per_module: msg.staking_balance_threshold_per_module,
        inactive_slashing_amount_per_module: msg.inactive_slashing_amount_per_module,
        commit_slashing_amount_per_module: msg.commit_slashing_amount_per_module,
        max_executors: msg.max_executors,
        schedule: msg.schedule,
        tax: TaxConfig {
            tax_denom: msg.tax_denom,
            execution_tax: msg.execution_tax,
            zero_fee_execution_tax: msg.zero_fee_execution_tax,
            protocol_pool_cut_bps: msg.protocol_pool_cut_bps,
        },
    };

    let seed = genesis_seed(&env);
    let state = CoordinatorState {
        epoch: 1,
        epoch_end_time: config.schedule.epoch_end_after(env.block.time.seconds())?,
        prev_seed: seed.clone(),
        reveal_mix: Default::default(),
        epoch_pool_balance: Uint128::zero(),
        next_epoch_pool_balance: Uint128::zero(),
        protocol_balance: Uint128::zero(),
        slashed_balance: Uint128::zero(),
        unclaimed_rewards: Uint128::zero(),
        total_staked: Uint128::zero(),
        executor_count: 0,
    };

    CONFIG.save(deps.storage, &config)?;
    STATE.save(deps.storage, &state)?;

    Ok(Response::new()
        .add_attribute("action", "instantiate")
        .add_attribute("protocol_version", PROTOCOL_VERSION)
        .add_attribute("owner", config.owner)
        .add_attribute("epoch", state.epoch.to_string())
        .add_attribute("epoch_end_time", state.epoch_end_time.to_string())
        .add_attribute("genesis_seed", hex::encode(seed.as_slice())))
}

/// Rolls over a finished epoch before dispatching, so every handler observes
/// the epoch it is executed in
#[entry_point]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let events = roll_if_due(deps.storage, &env, &config)?;
    let rolled_over = !events.is_empty();

    let response = match msg {
        ExecuteMsg::Register {} => execute_register(deps, env, info),
        ExecuteMsg::IncreaseStake {} => execute_increase_stake(deps, env, info),
        ExecuteMsg::Withdraw { amount } => execute_withdraw(deps, env, info, amount),
        ExecuteMsg::ClaimRewards {} => execute_claim_rewards(deps, env, info),
        ExecuteMsg::Commit { commitment } => execute_commit(deps, env, info, commitment),
        ExecuteMsg::Reveal { preimage } => execute_reveal(deps, env, info, preimage),
        ExecuteMsg::SlashMissedReveals {} => execute_slash_missed_reveals(deps, env),
        ExecuteMsg::InitiateEpoch {} => execute_initiate_epoch(deps.as_ref(), env, rolled_over),
        ExecuteMsg::CheckIn {} => execute_check_in(deps, env, info),
        ExecuteMsg::OnCreateJob {
            index,
            execution_module,
            fee_module,
            execution_window,
            execution_input,
            fee_input,
        } => execute_on_create_job(
            deps,
            env,
            info,
            index,
            execution_module,
            fee_module,
            execution_window,
            execution_input,
            fee_input,
        ),
        ExecuteMsg::OnDeleteJob { index } => execute_on_delete_job(deps, info, index),
        ExecuteMsg::OnUpdateFeeData { index, input } => {
            execute_on_update_fee_data(deps, info, index, input)
        }
        ExecuteMsg::OnExecuteJob { executor, job } => {
            execute_on_execute_job(deps, env, info, executor, job)
        }
        ExecuteMsg::AddJobRegistry { registry } => execute_add_job_registry(deps, info, registry),
        ExecuteMsg::AddExecutionModule { module } => {
            execute_add_module(deps, info, ModuleKind::Execution, module)
        }
        ExecuteMsg::AddFeeModule { module } => {
            execute_add_module(deps, info, ModuleKind::Fee, module)
        }
        ExecuteMsg::WithdrawProtocolBalance {} => execute_withdraw_protocol_balance(deps, info),
    }?;

    Ok(response.add_events(events))
}

#[entry_point]
pub fn query(deps: Deps, env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        QueryMsg::Config {} => to_json_binary(&query_config(deps)?),
        QueryMsg::State {} => to_json_binary(&query_state(deps)?),
        QueryMsg::Executor { address } => to_json_binary(&query_executor(deps, address)?),
        QueryMsg::ActiveExecutors {} => to_json_binary(&query_active_executors(deps)?),
        QueryMsg::Phase {} => to_json_binary(&query_phase(deps, env)?),
        QueryMsg::DesignatedExecutor { round } => {
            to_json_binary(&query_designated_executor(deps, env, round)?)
        }
        QueryMsg::Commitment { epoch, executor } => {
            to_json_binary(&query_commitment(deps, epoch, executor)?)
        }
        QueryMsg::EpochSeed { epoch } => to_json_binary(&query_epoch_seed(deps, env, epoch)?),
        QueryMsg::JobModules { registry, index } => {
            to_json_binary(&query_job_modules(deps, registry, index)?)
        }
        QueryMsg::EncodedJobData { registry, index } => {
            to_json_binary(&query_encoded_job_data(deps, registry, index)?)
        }
        QueryMsg::ExecutionQuote {
            registry,
            index,
            zero_fee_window,
            variable_gas_consumption,
        } => to_json_binary(&query_execution_quote(
            deps,
            registry,
            index,
            zero_fee_window,
            variable_gas_consumption,
        )?),
        QueryMsg::IsJobRegistry { address } => {
            to_json_binary(&query_is_job_registry(deps, address)?)
        }
        QueryMsg::Modules {} => to_json_binary(&query_modules(deps)?),
    }
}

/// Swallows the failure of an application call flagged `ignore_app_revert`;
/// tax and bookkeeping of the execution stay committed
#[entry_point]
pub fn reply(_deps: DepsMut, _env: Env, msg: Reply) -> Result<Response, ContractError> {
    match msg.id {
        REPLY_IGNORE_APP_REVERT => match msg.result {
            SubMsgResult::Err(err) => Ok(Response::new()
                .add_attribute("action", "app_call_reverted")
                .add_attribute("error", err)),
            SubMsgResult::Ok(_) => Ok(Response::new()),
        },
        id => Err(StdError::generic_err(format!("unknown reply id: {}", id)).into()),
    }
}
