//! Execution gate: decides between tax-free designated execution and taxed
//! open competition, and settles the tax.
//!
//! Timing and pricing are delegated to the job's execution and fee modules
//! through the [`ExecutionModule`] and [`FeeModule`] traits. The gate only
//! enforces who may skip the tax and where collected tax goes.

use cadence_types::{split_tax, FeeQuote};
use cosmwasm_std::{
    to_json_binary, Addr, BankMsg, Coin, CosmosMsg, DepsMut, Env, MessageInfo, Response,
    StdResult, Storage, SubMsg, Uint128, WasmMsg,
};

use crate::error::ContractError;
use crate::helpers::{ensure_job_registry, paid_amount};
use crate::modules::{WasmExecutionModule, WasmFeeModule};
use crate::msg::{ExecutionMode, ExecutionReceipt, JobExecution};
use crate::randomness::ensure_designated;
use crate::registry::record_checkin;
use crate::state::{Config, CoordinatorState, CONFIG, EXECUTORS, JOBS, STATE};

/// Reply id of application calls whose failure is swallowed
pub const REPLY_IGNORE_APP_REVERT: u64 = 1;

/// Timing side of a job
pub trait ExecutionModule {
    fn job_is_expired(&self, index: u64, execution_window: u64) -> StdResult<bool>;

    fn job_is_in_execution_mode(&self, index: u64, execution_window: u64) -> StdResult<bool>;

    /// Scheduled time the current execution is for
    fn execution_time(&self, index: u64, execution_window: u64) -> StdResult<u64>;

    /// Notification sent once the execution is admitted
    fn on_execute_job_msg(&self, index: u64, execution_window: u64) -> StdResult<CosmosMsg>;
}

/// Pricing side of a job
pub trait FeeModule {
    fn execution_fee(
        &self,
        index: u64,
        execution_window: u64,
        zero_fee_window: u64,
        execution_time: u64,
        variable_gas_consumption: u64,
    ) -> StdResult<FeeQuote>;

    fn on_execute_job_msg(
        &self,
        index: u64,
        execution_window: u64,
        zero_fee_window: u64,
        execution_time: u64,
        variable_gas_consumption: u64,
    ) -> StdResult<CosmosMsg>;
}

/// Result of an admitted execution
#[derive(Debug)]
pub struct GateOutcome {
    pub receipt: ExecutionReceipt,
    /// Module notifications, in send order
    pub messages: Vec<CosmosMsg>,
    /// Attached tax exceeding what was charged
    pub refund: Uint128,
}

/// Tax owed by an open-mode execution
pub fn open_tax(config: &Config, in_zero_fee_window: bool) -> Uint128 {
    if in_zero_fee_window {
        config.tax.zero_fee_execution_tax
    } else {
        config.tax.execution_tax
    }
}

/// Admit one execution attempt of `job` by `executor`
///
/// Mutates the executor record (designated mode) or `state` balances (open
/// mode); the caller saves `state`.
#[allow(clippy::too_many_arguments)]
pub fn admit_execution<E: ExecutionModule, F: FeeModule>(
    storage: &mut dyn Storage,
    config: &Config,
    state: &mut CoordinatorState,
    now: u64,
    executor: &Addr,
    job: &JobExecution,
    execution_window: u64,
    attached_tax: Uint128,
    execution_module: &E,
    fee_module: &F,
) -> Result<GateOutcome, ContractError> {
    let index = job.index;

    if execution_module.job_is_expired(index, execution_window)? {
        return Err(ContractError::JobExpired { index });
    }
    if !execution_module.job_is_in_execution_mode(index, execution_window)? {
        return Err(ContractError::NotInExecutionWindow { index });
    }

    let execution_time = execution_module.execution_time(index, execution_window)?;
    let quote = fee_module.execution_fee(
        index,
        execution_window,
        job.zero_fee_window,
        execution_time,
        job.variable_gas_consumption,
    )?;

    let (round, tax) = match job.mode {
        ExecutionMode::Designated => {
            let window = ensure_designated(storage, config, state, now, executor)?;
            let mut record = EXECUTORS.load(storage, executor).map_err(|_| {
                ContractError::ExecutorNotRegistered {
                    address: executor.to_string(),
                }
            })?;
            record_checkin(&mut record, state.epoch, window.round, true);
            EXECUTORS.save(storage, executor, &record)?;
            (Some(window.round), Uint128::zero())
        }
        ExecutionMode::Open => {
            let required = open_tax(config, quote.in_zero_fee_window);
            if attached_tax < required {
                return Err(ContractError::InsufficientTax {
                    required: required.to_string(),
                    provided: attached_tax.to_string(),
                });
            }
            let (protocol, pool) = split_tax(required, config.tax.protocol_pool_cut_bps);
            state.protocol_balance = state.protocol_balance.checked_add(protocol)?;
            state.next_epoch_pool_balance = state.next_epoch_pool_balance.checked_add(pool)?;
            (None, required)
        }
    };

    let messages = vec![
        execution_module.on_execute_job_msg(index, execution_window)?,
        fee_module.on_execute_job_msg(
            index,
            execution_window,
            job.zero_fee_window,
            execution_time,
            job.variable_gas_consumption,
        )?,
    ];

    Ok(GateOutcome {
        receipt: ExecutionReceipt {
            executor: executor.to_string(),
            mode: job.mode,
            epoch: state.epoch,
            round,
            execution_time,
            execution_fee: quote.fee,
            fee_token: quote.fee_token,
            in_zero_fee_window: quote.in_zero_fee_window,
            tax_paid: tax,
        },
        messages,
        refund: attached_tax - tax,
    })
}

pub fn execute_on_execute_job(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    executor: String,
    job: JobExecution,
) -> Result<Response, ContractError> {
    ensure_job_registry(deps.storage, &info.sender)?;
    let config = CONFIG.load(deps.storage)?;
    let mut state = STATE.load(deps.storage)?;
    let executor = deps.api.addr_validate(&executor)?;
    let record = JOBS
        .may_load(deps.storage, (&info.sender, job.index))?
        .ok_or(ContractError::JobNotFound { index: job.index })?;
    let attached_tax = paid_amount(&info, &config.tax.tax_denom)?;

    let execution_module = WasmExecutionModule::new(record.execution_module, deps.querier);
    let fee_module = WasmFeeModule::new(record.fee_module, deps.querier);

    let outcome = admit_execution(
        deps.storage,
        &config,
        &mut state,
        env.block.time.seconds(),
        &executor,
        &job,
        record.execution_window,
        attached_tax,
        &execution_module,
        &fee_module,
    )?;
    STATE.save(deps.storage, &state)?;

    let receipt = outcome.receipt;
    let mut response = Response::new()
        .add_messages(outcome.messages)
        .add_attribute("action", "execute_job")
        .add_attribute("registry", info.sender.to_string())
        .add_attribute("index", job.index.to_string())
        .add_attribute("executor", executor.to_string())
        .add_attribute("mode", receipt.mode.as_str())
        .add_attribute("epoch", receipt.epoch.to_string())
        .add_attribute("execution_time", receipt.execution_time.to_string())
        .add_attribute("execution_fee", receipt.execution_fee)
        .add_attribute("in_zero_fee_window", receipt.in_zero_fee_window.to_string())
        .add_attribute("tax_paid", receipt.tax_paid);
    if let Some(round) = receipt.round {
        response = response.add_attribute("round", round.to_string());
    }

    if let Some(app_call) = job.app_call {
        let call = WasmMsg::Execute {
            contract_addr: deps.api.addr_validate(&app_call.contract)?.to_string(),
            msg: app_call.msg,
            funds: vec![],
        };
        response = if job.ignore_app_revert {
            response.add_submessage(SubMsg::reply_on_error(call, REPLY_IGNORE_APP_REVERT))
        } else {
            response.add_submessage(SubMsg::new(call))
        };
    }

    // Excess goes back to whoever attached it
    if !outcome.refund.is_zero() {
        response = response.add_message(BankMsg::Send {
            to_address: info.sender.to_string(),
            amount: vec![Coin {
                denom: config.tax.tax_denom,
                amount: outcome.refund,
            }],
        });
    }

    Ok(response.set_data(to_json_binary(&receipt)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::active_set;
    use crate::state::{Executor, ExecutorStatus, TaxConfig};
    use cadence_types::Schedule;
    use cosmwasm_std::testing::{MockApi, MockStorage};
    use cosmwasm_std::HexBinary;

    struct MockExecution {
        expired: bool,
        in_execution_mode: bool,
        execution_time: u64,
    }

    impl ExecutionModule for MockExecution {
        fn job_is_expired(&self, _index: u64, _execution_window: u64) -> StdResult<bool> {
            Ok(self.expired)
        }

        fn job_is_in_execution_mode(&self, _index: u64, _execution_window: u64) -> StdResult<bool> {
            Ok(self.in_execution_mode)
        }

        fn execution_time(&self, _index: u64, _execution_window: u64) -> StdResult<u64> {
            Ok(self.execution_time)
        }

        fn on_execute_job_msg(&self, index: u64, _execution_window: u64) -> StdResult<CosmosMsg> {
            Ok(WasmMsg::Execute {
                contract_addr: "execution".to_string(),
                msg: to_json_binary(&index)?,
                funds: vec![],
            }
            .into())
        }
    }

    struct MockFee {
        fee: u128,
        in_zero_fee_window: bool,
    }

    impl FeeModule for MockFee {
        fn execution_fee(
            &self,
            _index: u64,
            _execution_window: u64,
            _zero_fee_window: u64,
            _execution_time: u64,
            _variable_gas_consumption: u64,
        ) -> StdResult<FeeQuote> {
            Ok(FeeQuote {
                fee: if self.in_zero_fee_window {
                    Uint128::zero()
                } else {
                    Uint128::new(self.fee)
                },
                fee_token: "ufee".to_string(),
                in_zero_fee_window: self.in_zero_fee_window,
            })
        }

        fn on_execute_job_msg(
            &self,
            index: u64,
            _execution_window: u64,
            _zero_fee_window: u64,
            _execution_time: u64,
            _variable_gas_consumption: u64,
        ) -> StdResult<CosmosMsg> {
            Ok(WasmMsg::Execute {
                contract_addr: "fee".to_string(),
                msg: to_json_binary(&index)?,
                funds: vec![],
            }
            .into())
        }
    }

    const END: u64 = 10_000;

    // epoch [9700, 10000): commit 60, reveal 60, slashing 30, 5 slots of 30
    fn config(api: &MockApi) -> Config {
        Config {
            owner: api.addr_make("owner"),
            treasury: api.addr_make("treasury"),
            staking_denom: "ustake".to_string(),
            staking_amount_per_module: Uint128::new(1_000),
            minimum_registration_period: 0,
            staking_balance_threshold_per_module: Uint128::new(500),
            inactive_slashing_amount_per_module: Uint128::new(100),
            commit_slashing_amount_per_module: Uint128::new(200),
            max_executors: 10,
            schedule: Schedule {
                round_duration: 20,
                rounds_per_epoch: 5,
                round_buffer: 5,
                commit_phase_duration: 60,
                reveal_phase_duration: 60,
                slashing_duration: 30,
            },
            tax: TaxConfig {
                tax_denom: "utax".to_string(),
                execution_tax: Uint128::new(1_000),
                zero_fee_execution_tax: Uint128::new(100),
                protocol_pool_cut_bps: 2_000,
            },
        }
    }

    fn state() -> CoordinatorState {
        CoordinatorState {
            epoch: 1,
            epoch_end_time: END,
            prev_seed: HexBinary::from(vec![1u8; 32]),
            reveal_mix: Default::default(),
            epoch_pool_balance: Uint128::zero(),
            next_epoch_pool_balance: Uint128::zero(),
            protocol_balance: Uint128::zero(),
            slashed_balance: Uint128::zero(),
            unclaimed_rewards: Uint128::zero(),
            total_staked: Uint128::new(1_000),
            executor_count: 1,
        }
    }

    fn job(mode: ExecutionMode) -> JobExecution {
        JobExecution {
            index: 7,
            mode,
            zero_fee_window: 0,
            variable_gas_consumption: 0,
            ignore_app_revert: false,
            app_call: None,
        }
    }

    fn ready_modules() -> (MockExecution, MockFee) {
        (
            MockExecution {
                expired: false,
                in_execution_mode: true,
                execution_time: 9_000,
            },
            MockFee {
                fee: 50,
                in_zero_fee_window: false,
            },
        )
    }

    /// Single active executor, designated for every round
    fn setup(api: &MockApi) -> (MockStorage, Config, Addr) {
        let mut storage = MockStorage::new();
        let executor = api.addr_make("executor");
        let mut record = Executor::new(executor.clone(), Uint128::new(1_000), 0);
        record.status = ExecutorStatus::Active;
        EXECUTORS.save(&mut storage, &executor, &record).unwrap();
        active_set::insert(&mut storage, &executor).unwrap();
        (storage, config(api), executor)
    }

    #[test]
    fn test_designated_execution_is_tax_free() {
        let api = MockApi::default();
        let (mut storage, config, executor) = setup(&api);
        let mut state = state();
        let (execution, fee) = ready_modules();

        // round 0 window opens at 9850 + 5
        let outcome = admit_execution(
            &mut storage,
            &config,
            &mut state,
            9_855,
            &executor,
            &job(ExecutionMode::Designated),
            60,
            Uint128::new(40),
            &execution,
            &fee,
        )
        .unwrap();

        assert_eq!(outcome.receipt.round, Some(0));
        assert_eq!(outcome.receipt.tax_paid, Uint128::zero());
        assert_eq!(outcome.receipt.execution_fee, Uint128::new(50));
        assert_eq!(outcome.refund, Uint128::new(40));
        assert_eq!(outcome.messages.len(), 2);
        assert!(state.next_epoch_pool_balance.is_zero());

        let record = EXECUTORS.load(&storage, &executor).unwrap();
        assert_eq!(record.rounds_checked_in_epoch, 1);
        assert_eq!(record.executions_in_rounds_in_epoch, 1);
    }

    #[test]
    fn test_designated_execution_rejected_in_buffer() {
        let api = MockApi::default();
        let (mut storage, config, executor) = setup(&api);
        let mut state = state();
        let (execution, fee) = ready_modules();

        let err = admit_execution(
            &mut storage,
            &config,
            &mut state,
            9_854,
            &executor,
            &job(ExecutionMode::Designated),
            60,
            Uint128::zero(),
            &execution,
            &fee,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ContractError::InRoundBuffer {
                round: 0,
                opens_at: 9_855,
                closes_at: 9_875
            }
        ));
        let record = EXECUTORS.load(&storage, &executor).unwrap();
        assert_eq!(record.executions_in_rounds_in_epoch, 0);
    }

    #[test]
    fn test_designated_execution_outside_rounds() {
        let api = MockApi::default();
        let (mut storage, config, executor) = setup(&api);
        let mut state = state();
        let (execution, fee) = ready_modules();

        let err = admit_execution(
            &mut storage,
            &config,
            &mut state,
            9_760,
            &executor,
            &job(ExecutionMode::Designated),
            60,
            Uint128::zero(),
            &execution,
            &fee,
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::WrongPhase { .. }));
    }

    #[test]
    fn test_stranger_cannot_execute_designated() {
        let api = MockApi::default();
        let (mut storage, config, _) = setup(&api);
        let mut state = state();
        let (execution, fee) = ready_modules();
        let stranger = api.addr_make("stranger");

        let err = admit_execution(
            &mut storage,
            &config,
            &mut state,
            9_860,
            &stranger,
            &job(ExecutionMode::Designated),
            60,
            Uint128::zero(),
            &execution,
            &fee,
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::NotDesignatedExecutor { round: 0 }));
    }

    #[test]
    fn test_open_execution_splits_tax() {
        let api = MockApi::default();
        let (mut storage, config, _) = setup(&api);
        let mut state = state();
        let (execution, fee) = ready_modules();
        let stranger = api.addr_make("stranger");

        let outcome = admit_execution(
            &mut storage,
            &config,
            &mut state,
            9_760,
            &stranger,
            &job(ExecutionMode::Open),
            60,
            Uint128::new(1_500),
            &execution,
            &fee,
        )
        .unwrap();

        assert_eq!(outcome.receipt.tax_paid, Uint128::new(1_000));
        assert_eq!(outcome.receipt.round, None);
        assert_eq!(outcome.refund, Uint128::new(500));
        assert_eq!(state.protocol_balance, Uint128::new(200));
        assert_eq!(state.next_epoch_pool_balance, Uint128::new(800));
    }

    #[test]
    fn test_open_execution_in_zero_fee_window() {
        let api = MockApi::default();
        let (mut storage, config, _) = setup(&api);
        let mut state = state();
        let (execution, _) = ready_modules();
        let fee = MockFee {
            fee: 50,
            in_zero_fee_window: true,
        };
        let stranger = api.addr_make("stranger");

        let outcome = admit_execution(
            &mut storage,
            &config,
            &mut state,
            9_760,
            &stranger,
            &job(ExecutionMode::Open),
            60,
            Uint128::new(100),
            &execution,
            &fee,
        )
        .unwrap();

        assert_eq!(outcome.receipt.execution_fee, Uint128::zero());
        assert!(outcome.receipt.in_zero_fee_window);
        assert_eq!(outcome.receipt.tax_paid, Uint128::new(100));
        assert!(outcome.refund.is_zero());
    }

    #[test]
    fn test_open_execution_requires_tax() {
        let api = MockApi::default();
        let (mut storage, config, _) = setup(&api);
        let mut state = state();
        let (execution, fee) = ready_modules();
        let stranger = api.addr_make("stranger");

        let err = admit_execution(
            &mut storage,
            &config,
            &mut state,
            9_760,
            &stranger,
            &job(ExecutionMode::Open),
            60,
            Uint128::new(999),
            &execution,
            &fee,
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::InsufficientTax { .. }));
        assert!(state.protocol_balance.is_zero());
    }

    #[test]
    fn test_module_timing_checks() {
        let api = MockApi::default();
        let (mut storage, config, executor) = setup(&api);
        let mut state = state();
        let (_, fee) = ready_modules();

        let expired = MockExecution {
            expired: true,
            in_execution_mode: true,
            execution_time: 0,
        };
        let err = admit_execution(
            &mut storage,
            &config,
            &mut state,
            9_860,
            &executor,
            &job(ExecutionMode::Designated),
            60,
            Uint128::zero(),
            &expired,
            &fee,
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::JobExpired { index: 7 }));

        let idle = MockExecution {
            expired: false,
            in_execution_mode: false,
            execution_time: 0,
        };
        let err = admit_execution(
            &mut storage,
            &config,
            &mut state,
            9_860,
            &executor,
            &job(ExecutionMode::Open),
            60,
            Uint128::new(1_000),
            &idle,
            &fee,
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::NotInExecutionWindow { index: 7 }));
    }
}
