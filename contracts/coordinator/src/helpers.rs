use cosmwasm_std::{Addr, MessageInfo, Storage, Uint128};

use crate::active_set;
use crate::error::ContractError;
use crate::msg::{CommitmentResponse, ExecutorResponse};
use crate::state::{CommitData, Config, Executor, JOB_REGISTRIES};

/// Amount of `denom` attached to the call; any other denom is rejected
pub fn paid_amount(info: &MessageInfo, denom: &str) -> Result<Uint128, ContractError> {
    if let Some(other) = info.funds.iter().find(|c| c.denom != denom) {
        return Err(ContractError::InvalidFunds {
            expected: denom.to_string(),
            got: other.denom.clone(),
        });
    }

    Ok(info.funds.iter().map(|c| c.amount).sum())
}

pub fn ensure_owner(config: &Config, sender: &Addr) -> Result<(), ContractError> {
    if *sender != config.owner {
        return Err(ContractError::Unauthorized {});
    }
    Ok(())
}

pub fn ensure_job_registry(storage: &dyn Storage, sender: &Addr) -> Result<(), ContractError> {
    if !JOB_REGISTRIES.has(storage, sender) {
        return Err(ContractError::NotJobRegistry {
            address: sender.to_string(),
        });
    }
    Ok(())
}

pub fn executor_to_response(storage: &dyn Storage, executor: Executor) -> ExecutorResponse {
    let active = active_set::contains(storage, &executor.address);
    ExecutorResponse {
        address: executor.address.to_string(),
        balance: executor.balance,
        status: executor.status.as_str().to_string(),
        active,
        last_registration_timestamp: executor.last_registration_timestamp,
        last_checkin_round: executor.last_checkin_round,
        last_checkin_epoch: executor.last_checkin_epoch,
        rounds_checked_in_epoch: executor.rounds_checked_in_epoch,
        executions_in_rounds_in_epoch: executor.executions_in_rounds_in_epoch,
        rewards: executor.rewards,
    }
}

pub fn commitment_to_response(commit: Option<CommitData>) -> CommitmentResponse {
    match commit {
        Some(commit) => CommitmentResponse {
            commitment: Some(commit.commitment),
            committed_at: Some(commit.committed_at),
            revealed_at: commit.revealed_at,
            slashed: commit.slashed,
        },
        None => CommitmentResponse {
            commitment: None,
            committed_at: None,
            revealed_at: None,
            slashed: false,
        },
    }
}
