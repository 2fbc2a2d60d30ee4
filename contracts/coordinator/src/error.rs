use cadence_types::{RandomnessError, ScheduleError};
use cosmwasm_std::{OverflowError, StdError};
use thiserror::Error;

/// Coarse classification of failures, used by callers deciding whether to retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller is not the owner, a job registry, an active or the designated executor
    Authorization,
    /// Wrong phase, round buffer, execution window, expired job
    Timing,
    /// Malformed input, configuration or commitment mismatch
    Validation,
    /// Insufficient stake, balance or tax; arithmetic overflow
    Economic,
    /// Storage / serialization failure
    Std,
}

#[derive(Error, Debug)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Overflow(#[from] OverflowError),

    #[error("Unauthorized")]
    Unauthorized {},

    #[error("Not a job registry: {address}")]
    NotJobRegistry { address: String },

    #[error("Not an active executor: {address}")]
    NotActiveExecutor { address: String },

    #[error("Not the designated executor for round {round}")]
    NotDesignatedExecutor { round: u32 },

    #[error("Wrong phase: expected {expected}, current {current}")]
    WrongPhase { expected: String, current: String },

    #[error("Round {round} buffer: designated window is [{opens_at}, {closes_at})")]
    InRoundBuffer {
        round: u32,
        opens_at: u64,
        closes_at: u64,
    },

    #[error("Round {round} out of bounds")]
    RoundOutOfBounds { round: u32 },

    #[error("Job {index} is not in its execution window")]
    NotInExecutionWindow { index: u64 },

    #[error("Job {index} is expired")]
    JobExpired { index: u64 },

    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("Invalid commitment: {reason}")]
    InvalidCommitment { reason: String },

    #[error("Already committed in epoch {epoch}")]
    AlreadyCommitted { epoch: u64 },

    #[error("No commitment in epoch {epoch}")]
    NoCommitment { epoch: u64 },

    #[error("Already revealed in epoch {epoch}")]
    AlreadyRevealed { epoch: u64 },

    #[error("Commitment mismatch")]
    CommitmentMismatch {},

    #[error("Invalid funds: expected {expected}, got {got}")]
    InvalidFunds { expected: String, got: String },

    #[error("Unknown {kind} module: selector {selector}")]
    UnknownModule { kind: String, selector: u8 },

    #[error("Module registry full for {kind} modules")]
    ModuleRegistryFull { kind: String },

    #[error("Job registry already added: {address}")]
    JobRegistryAlreadyAdded { address: String },

    #[error("Job already exists: {index}")]
    JobAlreadyExists { index: u64 },

    #[error("Job not found: {index}")]
    JobNotFound { index: u64 },

    #[error("Executor already registered: {address}")]
    AlreadyRegistered { address: String },

    #[error("Executor not registered: {address}")]
    ExecutorNotRegistered { address: String },

    #[error("Executor capacity reached: {max}")]
    ExecutorCapacityReached { max: u32 },

    #[error("Insufficient stake: required {required}, provided {provided}")]
    InsufficientStake { required: String, provided: String },

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: String, available: String },

    #[error("Insufficient tax: required {required}, provided {provided}")]
    InsufficientTax { required: String, provided: String },

    #[error("Nothing to claim")]
    NothingToClaim {},
}

impl ContractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContractError::Std(_) => ErrorKind::Std,
            ContractError::Unauthorized {}
            | ContractError::NotJobRegistry { .. }
            | ContractError::NotActiveExecutor { .. }
            | ContractError::NotDesignatedExecutor { .. } => ErrorKind::Authorization,
            ContractError::WrongPhase { .. }
            | ContractError::InRoundBuffer { .. }
            | ContractError::RoundOutOfBounds { .. }
            | ContractError::NotInExecutionWindow { .. }
            | ContractError::JobExpired { .. } => ErrorKind::Timing,
            ContractError::InvalidConfig { .. }
            | ContractError::InvalidCommitment { .. }
            | ContractError::AlreadyCommitted { .. }
            | ContractError::NoCommitment { .. }
            | ContractError::AlreadyRevealed { .. }
            | ContractError::CommitmentMismatch {}
            | ContractError::InvalidFunds { .. }
            | ContractError::UnknownModule { .. }
            | ContractError::ModuleRegistryFull { .. }
            | ContractError::JobRegistryAlreadyAdded { .. }
            | ContractError::JobAlreadyExists { .. }
            | ContractError::JobNotFound { .. }
            | ContractError::AlreadyRegistered { .. }
            | ContractError::ExecutorNotRegistered { .. } => ErrorKind::Validation,
            ContractError::Overflow(_)
            | ContractError::ExecutorCapacityReached { .. }
            | ContractError::InsufficientStake { .. }
            | ContractError::InsufficientBalance { .. }
            | ContractError::InsufficientTax { .. }
            | ContractError::NothingToClaim {} => ErrorKind::Economic,
        }
    }
}

impl From<ScheduleError> for ContractError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::NotInRoundsPhase { phase } => ContractError::WrongPhase {
                expected: "rounds".to_string(),
                current: phase.to_string(),
            },
            ScheduleError::RoundOutOfBounds { round, .. } => {
                ContractError::RoundOutOfBounds { round }
            }
            ScheduleError::InRoundBuffer {
                round,
                opens_at,
                closes_at,
            } => ContractError::InRoundBuffer {
                round,
                opens_at,
                closes_at,
            },
            err @ ScheduleError::EpochEndOverflow { .. } => ContractError::InvalidConfig {
                reason: err.to_string(),
            },
        }
    }
}

impl From<RandomnessError> for ContractError {
    fn from(err: RandomnessError) -> Self {
        ContractError::InvalidCommitment {
            reason: err.to_string(),
        }
    }
}
