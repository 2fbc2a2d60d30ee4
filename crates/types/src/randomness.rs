//! Commit-reveal randomness
//!
//! Each active executor commits to `H(domain || epoch || executor || preimage)`
//! during the commit phase and reveals `preimage` during the reveal phase.
//! Binding the executor and epoch into the commitment stops one executor from
//! replaying another's commitment (identical reveals would cancel in the XOR).
//!
//! Reveals are folded into a 32-byte mix by XOR of per-reveal digests, so the
//! final seed is independent of the order reveals are processed in:
//!
//! `seed_k = H(SEED_DOMAIN || seed_{k-1} || k || XOR_i H(REVEAL_DOMAIN || executor_i || preimage_i))`
//!
//! An epoch with zero reveals still needs a seed to schedule rounds. The
//! fallback `H(FALLBACK_DOMAIN || seed_{k-1} || k)` keeps the network live but
//! is predictable by anyone who knows the previous seed.

use cosmwasm_schema::cw_serde;
use cosmwasm_std::HexBinary;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub const COMMITMENT_DOMAIN: &[u8] = b"cadence/commitment/v1";
pub const REVEAL_DOMAIN: &[u8] = b"cadence/reveal/v1";
pub const SEED_DOMAIN: &[u8] = b"cadence/epoch-seed/v1";
pub const FALLBACK_SEED_DOMAIN: &[u8] = b"cadence/epoch-seed-fallback/v1";
pub const SELECTION_DOMAIN: &[u8] = b"cadence/designated-executor/v1";

pub type Hash32 = [u8; 32];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RandomnessError {
    #[error("expected 32 bytes, got {len}")]
    InvalidLength { len: usize },
}

pub fn to_hash32(bytes: &[u8]) -> Result<Hash32, RandomnessError> {
    bytes
        .try_into()
        .map_err(|_| RandomnessError::InvalidLength { len: bytes.len() })
}

/// Commitment an executor submits for `preimage` in `epoch`
pub fn commitment_hash(epoch: u64, executor: &str, preimage: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(COMMITMENT_DOMAIN);
    hasher.update(epoch.to_be_bytes());
    hasher.update((executor.len() as u64).to_be_bytes());
    hasher.update(executor.as_bytes());
    hasher.update(preimage);
    hasher.finalize().into()
}

fn reveal_digest(executor: &str, preimage: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(REVEAL_DOMAIN);
    hasher.update((executor.len() as u64).to_be_bytes());
    hasher.update(executor.as_bytes());
    hasher.update(preimage);
    hasher.finalize().into()
}

/// Running XOR mix of all reveals of an epoch
#[cw_serde]
pub struct RevealMix {
    pub mix: HexBinary,
    pub reveal_count: u32,
}

impl Default for RevealMix {
    fn default() -> Self {
        Self {
            mix: HexBinary::from(vec![0u8; 32]),
            reveal_count: 0,
        }
    }
}

impl RevealMix {
    /// Fold one reveal into the mix; commutative and associative
    pub fn fold(&mut self, executor: &str, preimage: &[u8]) -> Result<(), RandomnessError> {
        let mut mix = to_hash32(self.mix.as_slice())?;
        for (acc, byte) in mix.iter_mut().zip(reveal_digest(executor, preimage)) {
            *acc ^= byte;
        }
        self.mix = HexBinary::from(mix.to_vec());
        self.reveal_count += 1;
        Ok(())
    }

    /// Seed of `epoch` given the previous epoch's seed
    pub fn finalize(&self, epoch: u64, prev_seed: &Hash32) -> Result<Hash32, RandomnessError> {
        if self.reveal_count == 0 {
            return Ok(fallback_seed(epoch, prev_seed));
        }

        let mix = to_hash32(self.mix.as_slice())?;
        let mut hasher = Sha256::new();
        hasher.update(SEED_DOMAIN);
        hasher.update(prev_seed);
        hasher.update(epoch.to_be_bytes());
        hasher.update(mix);
        Ok(hasher.finalize().into())
    }
}

/// Seed used when nobody revealed in `epoch`
pub fn fallback_seed(epoch: u64, prev_seed: &Hash32) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(FALLBACK_SEED_DOMAIN);
    hasher.update(prev_seed);
    hasher.update(epoch.to_be_bytes());
    hasher.finalize().into()
}

/// Index into the active set snapshot of the executor designated for `round`
///
/// `H(SELECTION_DOMAIN || seed || round) mod active_len`; `None` for an empty set.
pub fn designated_index(seed: &Hash32, round: u32, active_len: usize) -> Option<usize> {
    if active_len == 0 {
        return None;
    }

    let mut hasher = Sha256::new();
    hasher.update(SELECTION_DOMAIN);
    hasher.update(seed);
    hasher.update(round.to_be_bytes());
    let digest: Hash32 = hasher.finalize().into();

    let mut word = [0u8; 16];
    word.copy_from_slice(&digest[..16]);
    Some((u128::from_be_bytes(word) % active_len as u128) as usize)
}
