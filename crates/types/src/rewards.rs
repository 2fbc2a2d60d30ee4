//! Tax and reward arithmetic
//!
//! All splits are integer-exact: whatever truncation leaves over is returned
//! as an explicit remainder so callers can account for every token.

use cosmwasm_std::Uint128;

pub const BPS_DENOMINATOR: u64 = 10_000;

/// Result of splitting an epoch pool across executors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardSplit {
    /// One payout per weight, in input order
    pub payouts: Vec<Uint128>,
    /// Truncation dust, or the whole pool when every weight is zero
    pub remainder: Uint128,
}

impl RewardSplit {
    pub fn distributed(&self) -> Uint128 {
        self.payouts.iter().copied().sum()
    }
}

/// Split `pool` pro-rata by `weights`
///
/// `sum(payouts) + remainder == pool` holds for every input.
pub fn split_pro_rata(pool: Uint128, weights: &[u64]) -> RewardSplit {
    let total: u128 = weights.iter().map(|w| u128::from(*w)).sum();
    if total == 0 || pool.is_zero() {
        return RewardSplit {
            payouts: vec![Uint128::zero(); weights.len()],
            remainder: pool,
        };
    }

    let payouts: Vec<Uint128> = weights
        .iter()
        .map(|w| pool.multiply_ratio(u128::from(*w), total))
        .collect();
    let distributed: Uint128 = payouts.iter().copied().sum();

    RewardSplit {
        payouts,
        remainder: pool - distributed,
    }
}

/// Split a collected tax into `(protocol_share, pool_share)`
pub fn split_tax(tax: Uint128, protocol_cut_bps: u64) -> (Uint128, Uint128) {
    let protocol = tax.multiply_ratio(protocol_cut_bps.min(BPS_DENOMINATOR), BPS_DENOMINATOR);
    (protocol, tax - protocol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pro_rata_conserves_value() {
        let pool = Uint128::new(1_000);
        let split = split_pro_rata(pool, &[1, 1, 1]);
        assert_eq!(split.payouts, vec![Uint128::new(333); 3]);
        assert_eq!(split.remainder, Uint128::new(1));
        assert_eq!(split.distributed() + split.remainder, pool);
    }

    #[test]
    fn test_pro_rata_all_zero_weights() {
        let pool = Uint128::new(777);
        let split = split_pro_rata(pool, &[0, 0]);
        assert_eq!(split.distributed(), Uint128::zero());
        assert_eq!(split.remainder, pool);
    }

    #[test]
    fn test_pro_rata_zero_weight_gets_nothing() {
        let split = split_pro_rata(Uint128::new(100), &[3, 0, 1]);
        assert_eq!(
            split.payouts,
            vec![Uint128::new(75), Uint128::zero(), Uint128::new(25)]
        );
        assert!(split.remainder.is_zero());
    }

    #[test]
    fn test_pro_rata_conservation_grid() {
        let weight_sets: [&[u64]; 5] = [&[], &[5], &[7, 11, 13], &[1, 0, 0, 2], &[u64::MAX, 1]];
        for pool in [0u128, 1, 9, 1_000_003, u64::MAX as u128] {
            for weights in weight_sets.iter() {
                let pool = Uint128::new(pool);
                let split = split_pro_rata(pool, weights);
                assert_eq!(split.payouts.len(), weights.len());
                assert_eq!(split.distributed() + split.remainder, pool);
            }
        }
    }

    #[test]
    fn test_split_tax() {
        assert_eq!(
            split_tax(Uint128::new(1_000), 2_500),
            (Uint128::new(250), Uint128::new(750))
        );
        assert_eq!(
            split_tax(Uint128::new(999), 0),
            (Uint128::zero(), Uint128::new(999))
        );
        assert_eq!(
            split_tax(Uint128::new(10), 10_000),
            (Uint128::new(10), Uint128::zero())
        );
        // 3 * 3333 / 10000 truncates to 0
        assert_eq!(
            split_tax(Uint128::new(3), 3_333),
            (Uint128::zero(), Uint128::new(3))
        );
    }
}
