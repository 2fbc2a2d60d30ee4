//! Pluggable module registry and job hooks
//!
//! Modules are registered by the owner under the next free selector of their
//! kind. Job registries pick modules by selector when creating a job; the
//! resolved addresses are cached on the job record so later hooks never
//! resolve a selector again.

use cadence_types::{
    ExecutionModuleExecuteMsg, ExecutionModuleQueryMsg, ExecutionTimeResponse, FeeModuleExecuteMsg,
    FeeModuleQueryMsg, FeeQuote, ModuleKind,
};
use cosmwasm_std::{
    to_json_binary, Addr, BankMsg, Binary, Coin, CosmosMsg, DepsMut, Env, MessageInfo,
    QuerierWrapper, Response, StdResult, Storage, Uint128, WasmMsg,
};
use serde::Serialize;

use crate::error::ContractError;
use crate::gate::{ExecutionModule, FeeModule};
use crate::helpers::{ensure_job_registry, ensure_owner};
use crate::state::{JobRecord, CONFIG, JOBS, JOB_REGISTRIES, MODULES, MODULE_COUNTS, STATE};

/// Selectors are a single byte
const MAX_MODULES_PER_KIND: u16 = 256;

fn wasm_execute<T: Serialize>(contract: &Addr, msg: &T) -> StdResult<CosmosMsg> {
    Ok(WasmMsg::Execute {
        contract_addr: contract.to_string(),
        msg: to_json_binary(msg)?,
        funds: vec![],
    }
    .into())
}

/// Execution module contract reached through smart queries
pub struct WasmExecutionModule<'a> {
    pub addr: Addr,
    querier: QuerierWrapper<'a>,
}

impl<'a> WasmExecutionModule<'a> {
    pub fn new(addr: Addr, querier: QuerierWrapper<'a>) -> Self {
        Self { addr, querier }
    }

    pub fn encoded_data(&self, index: u64) -> StdResult<Binary> {
        self.querier
            .query_wasm_smart(&self.addr, &ExecutionModuleQueryMsg::EncodedData { index })
    }
}

impl ExecutionModule for WasmExecutionModule<'_> {
    fn job_is_expired(&self, index: u64, execution_window: u64) -> StdResult<bool> {
        self.querier.query_wasm_smart(
            &self.addr,
            &ExecutionModuleQueryMsg::JobIsExpired {
                index,
                execution_window,
            },
        )
    }

    fn job_is_in_execution_mode(&self, index: u64, execution_window: u64) -> StdResult<bool> {
        self.querier.query_wasm_smart(
            &self.addr,
            &ExecutionModuleQueryMsg::JobIsInExecutionMode {
                index,
                execution_window,
            },
        )
    }

    fn execution_time(&self, index: u64, execution_window: u64) -> StdResult<u64> {
        let res: ExecutionTimeResponse = self.querier.query_wasm_smart(
            &self.addr,
            &ExecutionModuleQueryMsg::ExecutionTime {
                index,
                execution_window,
            },
        )?;
        Ok(res.execution_time)
    }

    fn on_execute_job_msg(&self, index: u64, execution_window: u64) -> StdResult<CosmosMsg> {
        wasm_execute(
            &self.addr,
            &ExecutionModuleExecuteMsg::OnExecuteJob {
                index,
                execution_window,
            },
        )
    }
}

/// Fee module contract reached through smart queries
pub struct WasmFeeModule<'a> {
    pub addr: Addr,
    querier: QuerierWrapper<'a>,
}

impl<'a> WasmFeeModule<'a> {
    pub fn new(addr: Addr, querier: QuerierWrapper<'a>) -> Self {
        Self { addr, querier }
    }

    pub fn encoded_data(&self, index: u64) -> StdResult<Binary> {
        self.querier
            .query_wasm_smart(&self.addr, &FeeModuleQueryMsg::EncodedData { index })
    }
}

impl FeeModule for WasmFeeModule<'_> {
    fn execution_fee(
        &self,
        index: u64,
        execution_window: u64,
        zero_fee_window: u64,
        execution_time: u64,
        variable_gas_consumption: u64,
    ) -> StdResult<FeeQuote> {
        self.querier.query_wasm_smart(
            &self.addr,
            &FeeModuleQueryMsg::ExecutionFee {
                index,
                execution_window,
                zero_fee_window,
                execution_time,
                variable_gas_consumption,
            },
        )
    }

    fn on_execute_job_msg(
        &self,
        index: u64,
        execution_window: u64,
        zero_fee_window: u64,
        execution_time: u64,
        variable_gas_consumption: u64,
    ) -> StdResult<CosmosMsg> {
        wasm_execute(
            &self.addr,
            &FeeModuleExecuteMsg::OnExecuteJob {
                index,
                execution_window,
                zero_fee_window,
                execution_time,
                variable_gas_consumption,
            },
        )
    }
}

/// Store `module` under the next free selector of `kind`
pub fn register_module(
    storage: &mut dyn Storage,
    kind: ModuleKind,
    module: &Addr,
) -> Result<u8, ContractError> {
    let count = MODULE_COUNTS
        .may_load(storage, kind.as_u8())?
        .unwrap_or_default();
    if count >= MAX_MODULES_PER_KIND {
        return Err(ContractError::ModuleRegistryFull {
            kind: kind.as_str().to_string(),
        });
    }

    let selector = count as u8;
    MODULES.save(storage, (kind.as_u8(), selector), module)?;
    MODULE_COUNTS.save(storage, kind.as_u8(), &(count + 1))?;
    Ok(selector)
}

pub fn resolve_module(
    storage: &dyn Storage,
    kind: ModuleKind,
    selector: u8,
) -> Result<Addr, ContractError> {
    MODULES
        .may_load(storage, (kind.as_u8(), selector))?
        .ok_or(ContractError::UnknownModule {
            kind: kind.as_str().to_string(),
            selector,
        })
}

pub fn execute_add_job_registry(
    deps: DepsMut,
    info: MessageInfo,
    registry: String,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    ensure_owner(&config, &info.sender)?;

    let registry = deps.api.addr_validate(&registry)?;
    if JOB_REGISTRIES.has(deps.storage, &registry) {
        return Err(ContractError::JobRegistryAlreadyAdded {
            address: registry.to_string(),
        });
    }
    JOB_REGISTRIES.save(deps.storage, &registry, &true)?;

    Ok(Response::new()
        .add_attribute("action", "add_job_registry")
        .add_attribute("registry", registry))
}

pub fn execute_add_module(
    deps: DepsMut,
    info: MessageInfo,
    kind: ModuleKind,
    module: String,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    ensure_owner(&config, &info.sender)?;

    let module = deps.api.addr_validate(&module)?;
    let selector = register_module(deps.storage, kind, &module)?;

    Ok(Response::new()
        .add_attribute("action", "add_module")
        .add_attribute("kind", kind.as_str())
        .add_attribute("selector", selector.to_string())
        .add_attribute("module", module))
}

#[allow(clippy::too_many_arguments)]
pub fn execute_on_create_job(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    index: u64,
    execution_selector: u8,
    fee_selector: u8,
    execution_window: u64,
    execution_input: Binary,
    fee_input: Binary,
) -> Result<Response, ContractError> {
    ensure_job_registry(deps.storage, &info.sender)?;

    if JOBS.has(deps.storage, (&info.sender, index)) {
        return Err(ContractError::JobAlreadyExists { index });
    }

    let record = JobRecord {
        execution_selector,
        execution_module: resolve_module(deps.storage, ModuleKind::Execution, execution_selector)?,
        fee_selector,
        fee_module: resolve_module(deps.storage, ModuleKind::Fee, fee_selector)?,
        execution_window,
        created_at: env.block.time.seconds(),
    };
    JOBS.save(deps.storage, (&info.sender, index), &record)?;

    let execution_msg = wasm_execute(
        &record.execution_module,
        &ExecutionModuleExecuteMsg::OnCreateJob {
            index,
            input: execution_input,
            execution_window,
        },
    )?;
    let fee_msg = wasm_execute(
        &record.fee_module,
        &FeeModuleExecuteMsg::OnCreateJob {
            index,
            input: fee_input,
        },
    )?;

    Ok(Response::new()
        .add_message(execution_msg)
        .add_message(fee_msg)
        .add_attribute("action", "create_job")
        .add_attribute("registry", info.sender)
        .add_attribute("index", index.to_string())
        .add_attribute("execution_module", record.execution_module)
        .add_attribute("fee_module", record.fee_module))
}

pub fn execute_on_delete_job(
    deps: DepsMut,
    info: MessageInfo,
    index: u64,
) -> Result<Response, ContractError> {
    ensure_job_registry(deps.storage, &info.sender)?;

    let record = JOBS
        .may_load(deps.storage, (&info.sender, index))?
        .ok_or(ContractError::JobNotFound { index })?;
    JOBS.remove(deps.storage, (&info.sender, index));

    Ok(Response::new()
        .add_message(wasm_execute(
            &record.execution_module,
            &ExecutionModuleExecuteMsg::OnDeleteJob { index },
        )?)
        .add_message(wasm_execute(
            &record.fee_module,
            &FeeModuleExecuteMsg::OnDeleteJob { index },
        )?)
        .add_attribute("action", "delete_job")
        .add_attribute("registry", info.sender)
        .add_attribute("index", index.to_string()))
}

pub fn execute_on_update_fee_data(
    deps: DepsMut,
    info: MessageInfo,
    index: u64,
    input: Binary,
) -> Result<Response, ContractError> {
    ensure_job_registry(deps.storage, &info.sender)?;

    let record = JOBS
        .may_load(deps.storage, (&info.sender, index))?
        .ok_or(ContractError::JobNotFound { index })?;

    Ok(Response::new()
        .add_message(wasm_execute(
            &record.fee_module,
            &FeeModuleExecuteMsg::OnUpdateData { index, input },
        )?)
        .add_attribute("action", "update_fee_data")
        .add_attribute("registry", info.sender)
        .add_attribute("index", index.to_string()))
}

pub fn execute_withdraw_protocol_balance(
    deps: DepsMut,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    if info.sender != config.treasury {
        return Err(ContractError::Unauthorized {});
    }

    let mut state = STATE.load(deps.storage)?;
    let protocol = state.protocol_balance;
    let slashed = state.slashed_balance;
    if protocol.is_zero() && slashed.is_zero() {
        return Err(ContractError::NothingToClaim {});
    }

    state.protocol_balance = Uint128::zero();
    state.slashed_balance = Uint128::zero();
    STATE.save(deps.storage, &state)?;

    let mut response = Response::new()
        .add_attribute("action", "withdraw_protocol_balance")
        .add_attribute("treasury", config.treasury.to_string())
        .add_attribute("protocol_balance", protocol)
        .add_attribute("slashed_balance", slashed);

    for (denom, amount) in [
        (config.tax.tax_denom, protocol),
        (config.staking_denom, slashed),
    ] {
        if amount.is_zero() {
            continue;
        }
        response = response.add_message(BankMsg::Send {
            to_address: config.treasury.to_string(),
            amount: vec![Coin { denom, amount }],
        });
    }

    Ok(response)
}
