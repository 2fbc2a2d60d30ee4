use cadence_types::{to_hash32, Hash32, RandomnessError, RevealMix, Schedule};
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, HexBinary, Uint128};
use cw_storage_plus::{Item, Map};

/// Deployment configuration, immutable after instantiation
#[cw_serde]
pub struct Config {
    pub owner: Addr,
    /// Receives the protocol tax share and slashed stake
    pub treasury: Addr,
    pub staking_denom: String,
    /// Minimum stake accepted by `Register`
    pub staking_amount_per_module: Uint128,
    /// Seconds between registration and first active epoch
    pub minimum_registration_period: u64,
    /// Active executors below this balance are pruned at rollover
    pub staking_balance_threshold_per_module: Uint128,
    pub inactive_slashing_amount_per_module: Uint128,
    pub commit_slashing_amount_per_module: Uint128,
    /// Upper bound on pending + active executors, bounds every rollover loop
    pub max_executors: u32,
    pub schedule: Schedule,
    pub tax: TaxConfig,
}

#[cw_serde]
pub struct TaxConfig {
    pub tax_denom: String,
    pub execution_tax: Uint128,
    pub zero_fee_execution_tax: Uint128,
    /// Share of every collected tax credited to the protocol (basis points)
    pub protocol_pool_cut_bps: u64,
}

/// Epoch-wide aggregate
///
/// Field ownership:
/// - `epoch`, `epoch_end_time`, `prev_seed`, `epoch_pool_balance`: rollover
/// - `reveal_mix`: reveal (folded), rollover (reset)
/// - `next_epoch_pool_balance`: execution gate (credited), rollover (promoted)
/// - `protocol_balance`: execution gate, rollover remainder, treasury withdrawal
/// - `slashed_balance`: slashing, treasury withdrawal
/// - `unclaimed_rewards`: rollover (credited), reward claims
/// - `total_staked`, `executor_count`: executor registry, slashing, rollover pruning
#[cw_serde]
pub struct CoordinatorState {
    pub epoch: u64,
    pub epoch_end_time: u64,
    /// Seed of the previous epoch, mixed into this epoch's seed
    pub prev_seed: HexBinary,
    pub reveal_mix: RevealMix,
    /// Tax collected last epoch, paid out at this epoch's rollover
    pub epoch_pool_balance: Uint128,
    /// Tax collected this epoch, paid out at the next epoch's rollover
    pub next_epoch_pool_balance: Uint128,
    pub protocol_balance: Uint128,
    pub slashed_balance: Uint128,
    pub unclaimed_rewards: Uint128,
    pub total_staked: Uint128,
    /// Pending + active executors
    pub executor_count: u32,
}

impl CoordinatorState {
    pub fn prev_seed(&self) -> Result<Hash32, RandomnessError> {
        to_hash32(self.prev_seed.as_slice())
    }

    /// Seed of the current epoch; only final once the reveal phase has closed
    pub fn seed(&self) -> Result<Hash32, RandomnessError> {
        self.reveal_mix.finalize(self.epoch, &self.prev_seed()?)
    }

    /// Tax-denominated tokens the contract owes
    pub fn tax_liabilities(&self) -> Uint128 {
        self.epoch_pool_balance
            + self.next_epoch_pool_balance
            + self.protocol_balance
            + self.unclaimed_rewards
    }

    /// Staking-denominated tokens the contract owes
    pub fn staking_liabilities(&self) -> Uint128 {
        self.total_staked + self.slashed_balance
    }
}

#[cw_serde]
#[derive(Copy, Eq)]
pub enum ExecutorStatus {
    /// Registered, waiting for the registration period and the next rollover
    Pending,
    /// Member of the active set
    Active,
    /// Pruned below the stake threshold; `IncreaseStake` re-queues it
    Inactive,
}

impl ExecutorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutorStatus::Pending => "pending",
            ExecutorStatus::Active => "active",
            ExecutorStatus::Inactive => "inactive",
        }
    }
}

#[cw_serde]
pub struct Executor {
    pub address: Addr,
    pub balance: Uint128,
    pub status: ExecutorStatus,
    pub last_registration_timestamp: u64,
    pub last_checkin_round: u32,
    pub last_checkin_epoch: u64,
    pub rounds_checked_in_epoch: u32,
    /// Designated executions this epoch, the reward weight
    pub executions_in_rounds_in_epoch: u64,
    /// Claimable rewards in the tax denom
    pub rewards: Uint128,
}

impl Executor {
    pub fn new(address: Addr, balance: Uint128, now: u64) -> Self {
        Self {
            address,
            balance,
            status: ExecutorStatus::Pending,
            last_registration_timestamp: now,
            last_checkin_round: 0,
            last_checkin_epoch: 0,
            rounds_checked_in_epoch: 0,
            executions_in_rounds_in_epoch: 0,
            rewards: Uint128::zero(),
        }
    }

    pub fn is_eligible(&self, config: &Config, now: u64) -> bool {
        now.saturating_sub(self.last_registration_timestamp) >= config.minimum_registration_period
            && self.balance >= config.staking_balance_threshold_per_module
    }
}

#[cw_serde]
pub struct CommitData {
    pub commitment: HexBinary,
    pub committed_at: u64,
    pub revealed_at: Option<u64>,
    /// Commit-slash already applied by `SlashMissedReveals`
    pub slashed: bool,
}

/// Modules resolved from their selectors when the job was created
#[cw_serde]
pub struct JobRecord {
    pub execution_selector: u8,
    pub execution_module: Addr,
    pub fee_selector: u8,
    pub fee_module: Addr,
    pub execution_window: u64,
    pub created_at: u64,
}

pub const CONFIG: Item<Config> = Item::new("config");
pub const STATE: Item<CoordinatorState> = Item::new("state");
pub const EXECUTORS: Map<&Addr, Executor> = Map::new("executors");
/// Executors waiting for activation at a rollover
pub const PENDING_EXECUTORS: Map<&Addr, bool> = Map::new("pending_executors");
pub const COMMITMENTS: Map<(u64, &Addr), CommitData> = Map::new("commitments");
/// Archived seeds of finished epochs
pub const EPOCH_SEEDS: Map<u64, HexBinary> = Map::new("epoch_seeds");
pub const JOB_REGISTRIES: Map<&Addr, bool> = Map::new("job_registries");
/// (module kind, selector) -> module contract
pub const MODULES: Map<(u8, u8), Addr> = Map::new("modules");
pub const MODULE_COUNTS: Map<u8, u16> = Map::new("module_counts");
/// (job registry, job index) -> cached module resolution
pub const JOBS: Map<(&Addr, u64), JobRecord> = Map::new("jobs");
