//! Wire interface of pluggable modules
//!
//! Execution modules decide *when* a job may run, fee modules decide *how much*
//! the job owner pays the executor. Both are separate contracts registered in
//! the coordinator under a small integer selector. The coordinator only
//! queries them for decisions and notifies them after its own state is saved.

use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Binary, Uint128};

/// Kind of pluggable module, part of the registry key
#[cw_serde]
#[derive(Copy, Eq)]
pub enum ModuleKind {
    Execution,
    Fee,
}

impl ModuleKind {
    pub fn as_u8(&self) -> u8 {
        match self {
            ModuleKind::Execution => 0,
            ModuleKind::Fee => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Execution => "execution",
            ModuleKind::Fee => "fee",
        }
    }
}

/// Messages the coordinator sends to an execution module
#[cw_serde]
pub enum ExecutionModuleExecuteMsg {
    /// Register timing parameters for a new job; the module replies with the
    /// initial execution time in the response data
    OnCreateJob {
        index: u64,
        input: Binary,
        execution_window: u64,
    },

    /// Record that the job ran at the current block time
    OnExecuteJob { index: u64, execution_window: u64 },

    OnDeleteJob { index: u64 },
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum ExecutionModuleQueryMsg {
    /// Scheduled execution time the job is currently being executed for;
    /// errors when the job is not executable at the queried block
    #[returns(ExecutionTimeResponse)]
    ExecutionTime { index: u64, execution_window: u64 },

    #[returns(bool)]
    JobIsExpired { index: u64, execution_window: u64 },

    #[returns(bool)]
    JobIsInExecutionMode { index: u64, execution_window: u64 },

    #[returns(Binary)]
    EncodedData { index: u64 },
}

#[cw_serde]
pub struct ExecutionTimeResponse {
    pub execution_time: u64,
}

/// Messages the coordinator sends to a fee module
#[cw_serde]
pub enum FeeModuleExecuteMsg {
    OnCreateJob { index: u64, input: Binary },

    OnExecuteJob {
        index: u64,
        execution_window: u64,
        zero_fee_window: u64,
        execution_time: u64,
        variable_gas_consumption: u64,
    },

    OnUpdateData { index: u64, input: Binary },

    OnDeleteJob { index: u64 },
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum FeeModuleQueryMsg {
    #[returns(FeeQuote)]
    ExecutionFee {
        index: u64,
        execution_window: u64,
        zero_fee_window: u64,
        execution_time: u64,
        variable_gas_consumption: u64,
    },

    #[returns(Binary)]
    EncodedData { index: u64 },
}

/// Fee the job owner pays the executor for one execution
#[cw_serde]
pub struct FeeQuote {
    pub fee: Uint128,
    pub fee_token: String,
    /// Execution falls inside the job's zero-fee window
    pub in_zero_fee_window: bool,
}

/// Price oracle consumed by pegged fee modules
#[cw_serde]
#[derive(QueryResponses)]
pub enum PriceOracleQueryMsg {
    #[returns(PriceResponse)]
    Price { token: String, oracle_data: Binary },
}

#[cw_serde]
pub struct PriceResponse {
    pub price_in_eth: Uint128,
    pub price_in_usd: Uint128,
}
