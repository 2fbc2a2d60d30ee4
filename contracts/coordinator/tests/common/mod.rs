#![allow(dead_code)]

use cadence_types::{
    commitment_hash, ExecutionModuleQueryMsg, ExecutionTimeResponse, FeeModuleQueryMsg, FeeQuote,
    Schedule,
};
use cosmwasm_std::testing::{message_info, mock_dependencies, mock_env, MockApi, MockQuerier};
use cosmwasm_std::{
    from_json, to_json_binary, Addr, Binary, Coin, ContractResult, Env, HexBinary, MemoryStorage,
    OwnedDeps, QuerierResult, Response, StdResult, SystemError, SystemResult, Timestamp, Uint128,
    WasmQuery,
};
use serde::de::DeserializeOwned;

use cadence_coordinator::contract::{execute, instantiate, query};
use cadence_coordinator::error::ContractError;
use cadence_coordinator::msg::{
    ExecuteMsg, ExecutionMode, ExecutorResponse, InstantiateMsg, JobExecution, QueryMsg,
    StateResponse,
};

pub type TestDeps = OwnedDeps<MemoryStorage, MockApi, MockQuerier>;

pub const STAKE_DENOM: &str = "ustake";
pub const TAX_DENOM: &str = "utax";
pub const STAKE: u128 = 1_000;
pub const EXECUTION_TAX: u128 = 1_000;
pub const ZERO_FEE_EXECUTION_TAX: u128 = 100;
pub const JOB_FEE: u128 = 50;
pub const EXECUTION_TIME: u64 = 1_000;

// 5 rounds of 30s with 5s buffers: commit 60, reveal 60, slashing 30, rounds 200
pub const ROUNDS_PER_EPOCH: u32 = 5;
pub const EPOCH_LENGTH: u64 = 350;
pub const REVEAL_OFFSET: u64 = 60;
pub const SLASHING_OFFSET: u64 = 120;
pub const ROUNDS_OFFSET: u64 = 150;
pub const SLOT_LENGTH: u64 = 40;
pub const ROUND_BUFFER: u64 = 5;

/// Job indices the mock execution module treats specially
pub const JOB: u64 = 1;
pub const EXPIRED_JOB: u64 = 2;
pub const IDLE_JOB: u64 = 3;

pub struct TestAddrs {
    pub owner: Addr,
    pub treasury: Addr,
    pub registry: Addr,
    pub execution_module: Addr,
    pub fee_module: Addr,
    pub executors: Vec<Addr>,
    pub stranger: Addr,
}

pub fn test_addrs(api: &MockApi) -> TestAddrs {
    TestAddrs {
        owner: api.addr_make("owner"),
        treasury: api.addr_make("treasury"),
        registry: api.addr_make("job_registry"),
        execution_module: api.addr_make("execution_module"),
        fee_module: api.addr_make("fee_module"),
        executors: (0..3)
            .map(|i| api.addr_make(&format!("executor{}", i)))
            .collect(),
        stranger: api.addr_make("stranger"),
    }
}

pub fn instantiate_msg(addrs: &TestAddrs) -> InstantiateMsg {
    InstantiateMsg {
        owner: addrs.owner.to_string(),
        treasury: addrs.treasury.to_string(),
        staking_denom: STAKE_DENOM.to_string(),
        staking_amount_per_module: Uint128::new(STAKE),
        minimum_registration_period: 0,
        staking_balance_threshold_per_module: Uint128::new(500),
        inactive_slashing_amount_per_module: Uint128::new(100),
        commit_slashing_amount_per_module: Uint128::new(200),
        max_executors: 10,
        schedule: Schedule {
            round_duration: 30,
            rounds_per_epoch: ROUNDS_PER_EPOCH,
            round_buffer: ROUND_BUFFER,
            commit_phase_duration: 60,
            reveal_phase_duration: 60,
            slashing_duration: 30,
        },
        tax_denom: TAX_DENOM.to_string(),
        execution_tax: Uint128::new(EXECUTION_TAX),
        zero_fee_execution_tax: Uint128::new(ZERO_FEE_EXECUTION_TAX),
        protocol_pool_cut_bps: 2_000,
    }
}

fn wasm_reply(res: StdResult<Binary>) -> QuerierResult {
    SystemResult::Ok(ContractResult::from(res))
}

fn execution_module_query(msg: &Binary) -> StdResult<Binary> {
    match from_json::<ExecutionModuleQueryMsg>(msg)? {
        ExecutionModuleQueryMsg::JobIsExpired { index, .. } => {
            to_json_binary(&(index == EXPIRED_JOB))
        }
        ExecutionModuleQueryMsg::JobIsInExecutionMode { index, .. } => {
            to_json_binary(&(index != IDLE_JOB))
        }
        ExecutionModuleQueryMsg::ExecutionTime { .. } => to_json_binary(&ExecutionTimeResponse {
            execution_time: EXECUTION_TIME,
        }),
        ExecutionModuleQueryMsg::EncodedData { index } => {
            to_json_binary(&Binary::from(index.to_be_bytes().to_vec()))
        }
    }
}

/// Any nonzero `zero_fee_window` counts as being inside it
fn fee_module_query(msg: &Binary) -> StdResult<Binary> {
    match from_json::<FeeModuleQueryMsg>(msg)? {
        FeeModuleQueryMsg::ExecutionFee {
            zero_fee_window, ..
        } => {
            let in_zero_fee_window = zero_fee_window > 0;
            to_json_binary(&FeeQuote {
                fee: if in_zero_fee_window {
                    Uint128::zero()
                } else {
                    Uint128::new(JOB_FEE)
                },
                fee_token: "ufee".to_string(),
                in_zero_fee_window,
            })
        }
        FeeModuleQueryMsg::EncodedData { .. } => to_json_binary(&Binary::from(b"fee".to_vec())),
    }
}

pub fn install_modules(deps: &mut TestDeps, addrs: &TestAddrs) {
    let execution_module = addrs.execution_module.to_string();
    let fee_module = addrs.fee_module.to_string();

    deps.querier.update_wasm(move |query| match query {
        WasmQuery::Smart { contract_addr, msg } if *contract_addr == execution_module => {
            wasm_reply(execution_module_query(msg))
        }
        WasmQuery::Smart { contract_addr, msg } if *contract_addr == fee_module => {
            wasm_reply(fee_module_query(msg))
        }
        _ => SystemResult::Err(SystemError::UnsupportedRequest {
            kind: "wasm".to_string(),
        }),
    });
}

/// Instantiated coordinator with mock modules at selector 0, an allowed job
/// registry and job `JOB` created; genesis is `env.block.time`
pub fn setup_contract() -> (TestDeps, Env, TestAddrs) {
    setup_contract_with(|_| {})
}

pub fn setup_contract_with(
    customize: impl FnOnce(&mut InstantiateMsg),
) -> (TestDeps, Env, TestAddrs) {
    let mut deps = mock_dependencies();
    let env = mock_env();
    let addrs = test_addrs(&deps.api);
    install_modules(&mut deps, &addrs);

    let mut msg = instantiate_msg(&addrs);
    customize(&mut msg);
    instantiate(deps.as_mut(), env.clone(), message_info(&addrs.owner, &[]), msg).unwrap();

    let owner = addrs.owner.clone();
    exec(&mut deps, &env, &owner, &[], ExecuteMsg::AddJobRegistry {
        registry: addrs.registry.to_string(),
    })
    .unwrap();
    exec(&mut deps, &env, &owner, &[], ExecuteMsg::AddExecutionModule {
        module: addrs.execution_module.to_string(),
    })
    .unwrap();
    exec(&mut deps, &env, &owner, &[], ExecuteMsg::AddFeeModule {
        module: addrs.fee_module.to_string(),
    })
    .unwrap();
    create_job(&mut deps, &env, &addrs, JOB).unwrap();

    (deps, env, addrs)
}

pub fn exec(
    deps: &mut TestDeps,
    env: &Env,
    sender: &Addr,
    funds: &[Coin],
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    execute(deps.as_mut(), env.clone(), message_info(sender, funds), msg)
}

pub fn query_as<T: DeserializeOwned>(deps: &TestDeps, env: &Env, msg: QueryMsg) -> T {
    from_json(query(deps.as_ref(), env.clone(), msg).unwrap()).unwrap()
}

/// `env` moved to `genesis + offset`
pub fn env_at(env: &Env, genesis: u64, offset: u64) -> Env {
    let mut env = env.clone();
    env.block.time = Timestamp::from_seconds(genesis + offset);
    env
}

/// Offset of epoch `epoch` from genesis when every rollover happens right at
/// the epoch end
pub fn epoch_offset(epoch: u64) -> u64 {
    EPOCH_LENGTH * (epoch - 1)
}

/// Offset of the first second `round` admits designated execution
pub fn round_open_offset(epoch: u64, round: u32) -> u64 {
    epoch_offset(epoch) + ROUNDS_OFFSET + SLOT_LENGTH * u64::from(round) + ROUND_BUFFER
}

pub fn create_job(
    deps: &mut TestDeps,
    env: &Env,
    addrs: &TestAddrs,
    index: u64,
) -> Result<Response, ContractError> {
    let registry = addrs.registry.clone();
    exec(deps, env, &registry, &[], ExecuteMsg::OnCreateJob {
        index,
        execution_module: 0,
        fee_module: 0,
        execution_window: 60,
        execution_input: Binary::from(b"every-minute".to_vec()),
        fee_input: Binary::from(b"flat".to_vec()),
    })
}

pub fn register(deps: &mut TestDeps, env: &Env, executor: &Addr, amount: u128) {
    exec(
        deps,
        env,
        executor,
        &[Coin::new(amount, STAKE_DENOM)],
        ExecuteMsg::Register {},
    )
    .unwrap();
}

pub fn initiate_epoch(deps: &mut TestDeps, env: &Env, sender: &Addr) -> Response {
    exec(deps, env, sender, &[], ExecuteMsg::InitiateEpoch {}).unwrap()
}

/// Registers all executors at genesis and rolls over into epoch 2, where
/// they form the active set
pub fn activate_executors(deps: &mut TestDeps, env: &Env, addrs: &TestAddrs) -> u64 {
    let genesis = env.block.time.seconds();
    for executor in addrs.executors.clone() {
        register(deps, env, &executor, STAKE);
    }
    let stranger = addrs.stranger.clone();
    initiate_epoch(deps, &env_at(env, genesis, epoch_offset(2)), &stranger);
    genesis
}

pub fn preimage(executor: &Addr) -> Vec<u8> {
    format!("secret-of-{}", executor).into_bytes()
}

pub fn commitment(epoch: u64, executor: &Addr, preimage: &[u8]) -> HexBinary {
    HexBinary::from(commitment_hash(epoch, executor.as_str(), preimage).to_vec())
}

pub fn commit(
    deps: &mut TestDeps,
    env: &Env,
    epoch: u64,
    executor: &Addr,
) -> Result<Response, ContractError> {
    exec(deps, env, executor, &[], ExecuteMsg::Commit {
        commitment: commitment(epoch, executor, &preimage(executor)),
    })
}

pub fn reveal(deps: &mut TestDeps, env: &Env, executor: &Addr) -> Result<Response, ContractError> {
    exec(deps, env, executor, &[], ExecuteMsg::Reveal {
        preimage: Binary::from(preimage(executor)),
    })
}

pub fn execute_job(
    deps: &mut TestDeps,
    env: &Env,
    addrs: &TestAddrs,
    executor: &Addr,
    mode: ExecutionMode,
    zero_fee_window: u64,
    tax: u128,
) -> Result<Response, ContractError> {
    let funds = if tax > 0 {
        vec![Coin::new(tax, TAX_DENOM)]
    } else {
        vec![]
    };
    let registry = addrs.registry.clone();
    exec(deps, env, &registry, &funds, ExecuteMsg::OnExecuteJob {
        executor: executor.to_string(),
        job: JobExecution {
            index: JOB,
            mode,
            zero_fee_window,
            variable_gas_consumption: 21_000,
            ignore_app_revert: false,
            app_call: None,
        },
    })
}

pub fn state(deps: &TestDeps, env: &Env) -> StateResponse {
    query_as(deps, env, QueryMsg::State {})
}

pub fn executor_info(deps: &TestDeps, env: &Env, executor: &Addr) -> ExecutorResponse {
    query_as(deps, env, QueryMsg::Executor {
        address: executor.to_string(),
    })
}

pub fn events_of<'a>(res: &'a Response, ty: &str) -> Vec<&'a cosmwasm_std::Event> {
    res.events.iter().filter(|e| e.ty == ty).collect()
}

pub fn attr<'a>(event: &'a cosmwasm_std::Event, key: &str) -> &'a str {
    event
        .attributes
        .iter()
        .find(|a| a.key == key)
        .map(|a| a.value.as_str())
        .unwrap()
}
