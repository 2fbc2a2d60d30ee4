use cadence_types::{Phase, Schedule};
use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Binary, HexBinary, Uint128};

#[cw_serde]
pub struct InstantiateMsg {
    pub owner: String,
    pub treasury: String,
    pub staking_denom: String,
    pub staking_amount_per_module: Uint128,
    pub minimum_registration_period: u64,
    pub staking_balance_threshold_per_module: Uint128,
    pub inactive_slashing_amount_per_module: Uint128,
    pub commit_slashing_amount_per_module: Uint128,
    pub max_executors: u32,
    pub schedule: Schedule,
    pub tax_denom: String,
    pub execution_tax: Uint128,
    pub zero_fee_execution_tax: Uint128,
    pub protocol_pool_cut_bps: u64,
}

#[cw_serde]
pub enum ExecuteMsg {
    /// Register as an executor (requires stake in the staking denom)
    Register {},

    /// Add the attached stake to the caller's balance
    IncreaseStake {},

    /// Withdraw stake; dropping below the threshold removes the executor from
    /// the active set at the next rollover
    Withdraw { amount: Uint128 },

    /// Pull rewards credited at past rollovers
    ClaimRewards {},

    /// Submit the epoch commitment (commit phase, active executors only)
    Commit { commitment: HexBinary },

    /// Reveal the committed preimage (reveal phase)
    Reveal { preimage: Binary },

    /// Apply commit-slashing to unrevealed commitments once reveals are closed
    SlashMissedReveals {},

    /// Roll over a finished epoch without doing anything else
    InitiateEpoch {},

    /// Prove liveness as the designated executor of the current round
    CheckIn {},

    /// Job registry hook: resolve module selectors and forward job creation
    OnCreateJob {
        index: u64,
        execution_module: u8,
        fee_module: u8,
        execution_window: u64,
        execution_input: Binary,
        fee_input: Binary,
    },

    /// Job registry hook: forward job deletion to the cached modules
    OnDeleteJob { index: u64 },

    /// Job registry hook: forward new fee parameters to the cached fee module
    OnUpdateFeeData { index: u64, input: Binary },

    /// Job registry hook: admit one execution attempt by `executor`.
    /// Open-mode tax is attached as funds in the tax denom; any excess is
    /// refunded to the calling registry.
    OnExecuteJob { executor: String, job: JobExecution },

    /// Allow a job registry to call the job hooks (owner only)
    AddJobRegistry { registry: String },

    /// Register an execution module under the next free selector (owner only)
    AddExecutionModule { module: String },

    /// Register a fee module under the next free selector (owner only)
    AddFeeModule { module: String },

    /// Send the protocol tax share and slashed stake to the treasury
    WithdrawProtocolBalance {},
}

/// How an executor wants its execution to be admitted
#[cw_serde]
#[derive(Copy, Eq)]
pub enum ExecutionMode {
    /// Tax-free, only for the designated executor inside its round window
    Designated,
    /// Open competition, pays the execution tax
    Open,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Designated => "designated",
            ExecutionMode::Open => "open",
        }
    }
}

#[cw_serde]
pub struct JobExecution {
    pub index: u64,
    pub mode: ExecutionMode,
    pub zero_fee_window: u64,
    pub variable_gas_consumption: u64,
    /// Swallow a failing application call; tax is still charged
    pub ignore_app_revert: bool,
    pub app_call: Option<AppCall>,
}

/// Target application call of a job
#[cw_serde]
pub struct AppCall {
    pub contract: String,
    pub msg: Binary,
}

/// Set as response data of `OnExecuteJob`
#[cw_serde]
pub struct ExecutionReceipt {
    pub executor: String,
    pub mode: ExecutionMode,
    pub epoch: u64,
    pub round: Option<u32>,
    pub execution_time: u64,
    pub execution_fee: Uint128,
    pub fee_token: String,
    pub in_zero_fee_window: bool,
    pub tax_paid: Uint128,
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    #[returns(ConfigResponse)]
    Config {},

    #[returns(StateResponse)]
    State {},

    #[returns(ExecutorResponse)]
    Executor { address: String },

    #[returns(ActiveExecutorsResponse)]
    ActiveExecutors {},

    #[returns(PhaseResponse)]
    Phase {},

    /// Designated executor of `round`, or of the current round when omitted
    #[returns(DesignatedExecutorResponse)]
    DesignatedExecutor { round: Option<u32> },

    #[returns(CommitmentResponse)]
    Commitment { epoch: u64, executor: String },

    /// Archived seed of a finished epoch, or the current seed once reveals closed
    #[returns(EpochSeedResponse)]
    EpochSeed { epoch: u64 },

    #[returns(JobModulesResponse)]
    JobModules { registry: String, index: u64 },

    #[returns(EncodedJobDataResponse)]
    EncodedJobData { registry: String, index: u64 },

    /// What an open-mode execution of the job would earn and cost right now
    #[returns(ExecutionQuoteResponse)]
    ExecutionQuote {
        registry: String,
        index: u64,
        zero_fee_window: u64,
        variable_gas_consumption: u64,
    },

    #[returns(bool)]
    IsJobRegistry { address: String },

    #[returns(ModulesResponse)]
    Modules {},
}

#[cw_serde]
pub struct ConfigResponse {
    pub owner: String,
    pub treasury: String,
    pub staking_denom: String,
    pub staking_amount_per_module: Uint128,
    pub minimum_registration_period: u64,
    pub staking_balance_threshold_per_module: Uint128,
    pub inactive_slashing_amount_per_module: Uint128,
    pub commit_slashing_amount_per_module: Uint128,
    pub max_executors: u32,
    pub schedule: Schedule,
    pub tax_denom: String,
    pub execution_tax: Uint128,
    pub zero_fee_execution_tax: Uint128,
    pub protocol_pool_cut_bps: u64,
}

#[cw_serde]
pub struct StateResponse {
    pub epoch: u64,
    pub epoch_end_time: u64,
    pub reveal_count: u32,
    pub epoch_pool_balance: Uint128,
    pub next_epoch_pool_balance: Uint128,
    pub protocol_balance: Uint128,
    pub slashed_balance: Uint128,
    pub unclaimed_rewards: Uint128,
    pub total_staked: Uint128,
    pub executor_count: u32,
    pub active_count: u32,
}

#[cw_serde]
pub struct ExecutorResponse {
    pub address: String,
    pub balance: Uint128,
    pub status: String,
    pub active: bool,
    pub last_registration_timestamp: u64,
    pub last_checkin_round: u32,
    pub last_checkin_epoch: u64,
    pub rounds_checked_in_epoch: u32,
    pub executions_in_rounds_in_epoch: u64,
    pub rewards: Uint128,
}

#[cw_serde]
pub struct ActiveExecutorsResponse {
    pub executors: Vec<String>,
}

#[cw_serde]
pub struct PhaseResponse {
    pub epoch: u64,
    pub phase: Phase,
    pub round: Option<u32>,
    pub epoch_end_time: u64,
}

#[cw_serde]
pub struct DesignatedExecutorResponse {
    pub epoch: u64,
    pub round: u32,
    pub executor: Option<String>,
    pub opens_at: u64,
    pub closes_at: u64,
}

#[cw_serde]
pub struct CommitmentResponse {
    pub commitment: Option<HexBinary>,
    pub committed_at: Option<u64>,
    pub revealed_at: Option<u64>,
    pub slashed: bool,
}

#[cw_serde]
pub struct EpochSeedResponse {
    pub epoch: u64,
    pub seed: Option<HexBinary>,
}

#[cw_serde]
pub struct JobModulesResponse {
    pub execution_selector: u8,
    pub execution_module: String,
    pub fee_selector: u8,
    pub fee_module: String,
    pub execution_window: u64,
}

#[cw_serde]
pub struct EncodedJobDataResponse {
    pub execution_data: Binary,
    pub fee_data: Binary,
}

#[cw_serde]
pub struct ExecutionQuoteResponse {
    pub execution_time: u64,
    pub execution_fee: Uint128,
    pub fee_token: String,
    pub in_zero_fee_window: bool,
    /// Tax an open-mode executor has to attach
    pub tax: Uint128,
}

#[cw_serde]
pub struct ModuleEntry {
    pub kind: String,
    pub selector: u8,
    pub address: String,
}

#[cw_serde]
pub struct ModulesResponse {
    pub modules: Vec<ModuleEntry>,
}
