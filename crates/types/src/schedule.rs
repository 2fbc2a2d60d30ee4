//! Epoch and round time partitioning
//!
//! An epoch is laid out as
//! `[commit][reveal][slashing][round 0]..[round N-1]` where every round slot is
//! `round_buffer + round_duration + round_buffer` seconds long. Designated
//! (tax-free) execution is only admitted in the central `round_duration`
//! part of a slot; the buffers on both edges absorb clock skew between
//! executors and block producers.
//!
//! Every function here is pure: the coordinator stores only `epoch_end_time`
//! and derives the rest from the configured durations.

use cosmwasm_schema::cw_serde;
use thiserror::Error;

/// Phase of the current epoch as seen at a given timestamp
#[cw_serde]
#[derive(Copy, Eq)]
pub enum Phase {
    /// Active executors submit commitment hashes
    Commit,
    /// Committed executors reveal their preimages
    Reveal,
    /// Reveals are closed, the epoch seed is final, missed reveals can be slashed
    Slashing,
    /// Designated executors are scheduled round by round
    Rounds,
    /// The epoch is over and waits for the next state-mutating call to roll over
    Ended,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Commit => "commit",
            Phase::Reveal => "reveal",
            Phase::Slashing => "slashing",
            Phase::Rounds => "rounds",
            Phase::Ended => "ended",
        }
    }

    /// True once no more reveals can be accepted for the epoch
    pub fn reveals_closed(&self) -> bool {
        matches!(self, Phase::Slashing | Phase::Rounds | Phase::Ended)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("not in rounds phase: current phase is {phase}")]
    NotInRoundsPhase { phase: Phase },

    #[error("round {round} out of bounds: epoch has {rounds_per_epoch} rounds")]
    RoundOutOfBounds { round: u32, rounds_per_epoch: u32 },

    #[error("round {round} buffer: designated window is [{opens_at}, {closes_at})")]
    InRoundBuffer {
        round: u32,
        opens_at: u64,
        closes_at: u64,
    },

    #[error("epoch starting at {start} ends beyond the representable time range")]
    EpochEndOverflow { start: u64 },
}

/// Absolute boundaries of one round slot
#[cw_serde]
#[derive(Copy, Eq)]
pub struct RoundWindow {
    pub round: u32,
    /// Start of the slot, leading buffer included
    pub slot_start: u64,
    /// First second a designated execution is admitted
    pub opens_at: u64,
    /// First second a designated execution is no longer admitted
    pub closes_at: u64,
    /// End of the slot, trailing buffer included
    pub slot_end: u64,
}

impl RoundWindow {
    pub fn admits(&self, now: u64) -> bool {
        now >= self.opens_at && now < self.closes_at
    }
}

/// Durations (in seconds) that define the epoch layout
#[cw_serde]
#[derive(Copy, Eq)]
pub struct Schedule {
    pub round_duration: u64,
    pub rounds_per_epoch: u32,
    pub round_buffer: u64,
    pub commit_phase_duration: u64,
    pub reveal_phase_duration: u64,
    pub slashing_duration: u64,
}

impl Schedule {
    /// Length of a single round slot including both buffers
    pub fn slot_length(&self) -> u64 {
        self.round_duration
            .saturating_add(self.round_buffer.saturating_mul(2))
    }

    pub fn rounds_phase_duration(&self) -> u64 {
        self.slot_length()
            .saturating_mul(u64::from(self.rounds_per_epoch))
    }

    pub fn epoch_length(&self) -> u64 {
        self.commit_phase_duration
            .saturating_add(self.reveal_phase_duration)
            .saturating_add(self.slashing_duration)
            .saturating_add(self.rounds_phase_duration())
    }

    /// Epoch length, `None` when the layout does not fit in `u64`
    pub fn checked_epoch_length(&self) -> Option<u64> {
        let slot = self
            .round_duration
            .checked_add(self.round_buffer.checked_mul(2)?)?;
        self.commit_phase_duration
            .checked_add(self.reveal_phase_duration)?
            .checked_add(self.slashing_duration)?
            .checked_add(slot.checked_mul(u64::from(self.rounds_per_epoch))?)
    }

    /// End time of an epoch starting at `start`
    pub fn epoch_end_after(&self, start: u64) -> Result<u64, ScheduleError> {
        self.checked_epoch_length()
            .and_then(|length| start.checked_add(length))
            .ok_or(ScheduleError::EpochEndOverflow { start })
    }

    pub fn epoch_start(&self, epoch_end_time: u64) -> u64 {
        epoch_end_time.saturating_sub(self.epoch_length())
    }

    pub fn reveal_start(&self, epoch_end_time: u64) -> u64 {
        self.epoch_start(epoch_end_time)
            .saturating_add(self.commit_phase_duration)
    }

    pub fn slashing_start(&self, epoch_end_time: u64) -> u64 {
        self.reveal_start(epoch_end_time)
            .saturating_add(self.reveal_phase_duration)
    }

    pub fn rounds_start(&self, epoch_end_time: u64) -> u64 {
        self.slashing_start(epoch_end_time)
            .saturating_add(self.slashing_duration)
    }

    /// Phase of the epoch ending at `epoch_end_time`, observed at `now`
    pub fn phase_at(&self, epoch_end_time: u64, now: u64) -> Phase {
        if now >= epoch_end_time {
            Phase::Ended
        } else if now >= self.rounds_start(epoch_end_time) {
            Phase::Rounds
        } else if now >= self.slashing_start(epoch_end_time) {
            Phase::Slashing
        } else if now >= self.reveal_start(epoch_end_time) {
            Phase::Reveal
        } else {
            Phase::Commit
        }
    }

    /// Index of the round slot containing `now`; only defined during `Rounds`
    pub fn round_index(&self, epoch_end_time: u64, now: u64) -> Result<u32, ScheduleError> {
        let phase = self.phase_at(epoch_end_time, now);
        if phase != Phase::Rounds {
            return Err(ScheduleError::NotInRoundsPhase { phase });
        }

        let elapsed = now - self.rounds_start(epoch_end_time);
        let slot = self.slot_length().max(1);
        let round = u32::try_from(elapsed / slot).unwrap_or(u32::MAX);
        if round >= self.rounds_per_epoch {
            return Err(ScheduleError::RoundOutOfBounds {
                round,
                rounds_per_epoch: self.rounds_per_epoch,
            });
        }

        Ok(round)
    }

    pub fn round_window(&self, epoch_end_time: u64, round: u32) -> Result<RoundWindow, ScheduleError> {
        if round >= self.rounds_per_epoch {
            return Err(ScheduleError::RoundOutOfBounds {
                round,
                rounds_per_epoch: self.rounds_per_epoch,
            });
        }

        let slot_start = self
            .rounds_start(epoch_end_time)
            .saturating_add(self.slot_length().saturating_mul(u64::from(round)));
        let opens_at = slot_start.saturating_add(self.round_buffer);
        let closes_at = opens_at.saturating_add(self.round_duration);

        Ok(RoundWindow {
            round,
            slot_start,
            opens_at,
            closes_at,
            slot_end: closes_at.saturating_add(self.round_buffer),
        })
    }

    /// Round whose designated window admits `now`
    ///
    /// Fails with `InRoundBuffer` when `now` falls in the padding of its slot.
    pub fn designated_round(&self, epoch_end_time: u64, now: u64) -> Result<u32, ScheduleError> {
        let round = self.round_index(epoch_end_time, now)?;
        let window = self.round_window(epoch_end_time, round)?;
        if !window.admits(now) {
            return Err(ScheduleError::InRoundBuffer {
                round,
                opens_at: window.opens_at,
                closes_at: window.closes_at,
            });
        }
        Ok(round)
    }

    /// Collects every layout problem instead of stopping at the first one
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.round_duration == 0 {
            errors.push("round_duration must be greater than 0".to_string());
        }
        if self.rounds_per_epoch == 0 {
            errors.push("rounds_per_epoch must be greater than 0".to_string());
        }
        if self.commit_phase_duration == 0 {
            errors.push("commit_phase_duration must be greater than 0".to_string());
        }
        if self.reveal_phase_duration == 0 {
            errors.push("reveal_phase_duration must be greater than 0".to_string());
        }
        if self.checked_epoch_length().is_none() {
            errors.push("epoch length overflows".to_string());
        }

        errors
    }
}
