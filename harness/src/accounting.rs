//! Expected financial outcomes of the DAO scenarios
//!
//! Everything in here is pure arithmetic over the per-account token balances
//! the harness funded the DAO with:
//! - splitting a random total supply between accounts
//! - choosing votes that make a proposal pass or fail
//! - the reward share a token holder is entitled to
//! - how balances move when token holders split off into a new DAO

use clap::ValueEnum;
use rand::seq::index;
use rand::Rng;

/// Return `n` random positive integers summing to `total`.
///
/// Every composition of `total` into `n` positive parts is equally likely:
/// `n - 1` distinct dividers are drawn uniformly from `1..total`, sorted, and
/// the gaps between consecutive dividers become the parts.
///
/// Returns `None` when no such composition exists (`n == 0` or `total < n`).
pub fn constrained_sum_sample_pos<R: Rng + ?Sized>(
    rng: &mut R,
    n: usize,
    total: u64,
) -> Option<Vec<u64>> {
    if n == 0 || total < n as u64 {
        return None;
    }
    let slots = usize::try_from(total - 1).ok()?;

    let mut dividers: Vec<u64> = index::sample(rng, slots, n - 1)
        .into_iter()
        .map(|i| i as u64 + 1)
        .collect();
    dividers.sort_unstable();
    dividers.push(total);

    let mut previous = 0;
    Some(
        dividers
            .into_iter()
            .map(|divider| {
                let part = divider - previous;
                previous = divider;
                part
            })
            .collect(),
    )
}

/// The aggregate result a vote is meant to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Pass,
    Fail,
}

impl VoteOutcome {
    pub fn from_should_pass(should_pass: bool) -> Self {
        if should_pass {
            Self::Pass
        } else {
            Self::Fail
        }
    }
}

/// Derive one vote per account so the proposal passes or fails as requested.
///
/// Accounts are walked in order. For `Pass` an account votes yes while the
/// yes-share accumulated so far is at most one half, so the final share ends
/// up strictly above one half. For `Fail` an account votes yes only if the
/// share including its own balance stays strictly below one half.
///
/// Shares are compared in integer arithmetic (`2 * yes <= total`) so rounding
/// can never push a tally across the threshold.
pub fn create_votes(balances: &[u64], outcome: VoteOutcome) -> Vec<bool> {
    let total: u128 = balances.iter().map(|&b| u128::from(b)).sum();
    let mut yes: u128 = 0;

    balances
        .iter()
        .map(|&balance| {
            let balance = u128::from(balance);
            let vote = match outcome {
                VoteOutcome::Pass => 2 * yes <= total,
                VoteOutcome::Fail => 2 * (yes + balance) < total,
            };
            if vote {
                yes += balance;
            }
            vote
        })
        .collect()
}

/// Sum the balances voting yes and no, in that order
pub fn tally(balances: &[u64], votes: &[bool]) -> (u64, u64) {
    balances
        .iter()
        .zip(votes)
        .fold((0, 0), |(yay, nay), (&balance, &vote)| {
            if vote {
                (yay + balance, nay)
            } else {
                (yay, nay + balance)
            }
        })
}

/// How the expected reward share is rounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RewardRounding {
    /// Plain proportional share, compared with float tolerance
    #[default]
    Exact,
    /// Share rounded up to a whole ether
    Ceil,
}

/// Reward owed to a holder of `tokens` out of `total_tokens` when
/// `total_rewards` ether was paid into the reward account.
pub fn calculate_reward(
    tokens: u64,
    total_tokens: u64,
    total_rewards: u64,
    rounding: RewardRounding,
) -> f64 {
    if total_tokens == 0 {
        return 0.0;
    }
    let share = tokens as f64 * total_rewards as f64 / total_tokens as f64;
    match rounding {
        RewardRounding::Exact => share,
        RewardRounding::Ceil => share.ceil(),
    }
}

/// Balances of the original and the newly split DAO after a split
#[derive(Debug, Clone, PartialEq)]
pub struct SplitOutcome {
    /// Token balance per account left in the original DAO
    pub old_balances: Vec<u64>,
    /// Token balance per account in the new DAO
    pub new_balances: Vec<u64>,
    /// Ether moved from the original DAO to the new one
    pub ether_moved: f64,
    /// Ether left in the original DAO
    pub ether_left: f64,
    /// Reward tokens moved to the new DAO
    pub rewards_moved: f64,
    /// Reward tokens left in the original DAO
    pub rewards_left: f64,
}

impl SplitOutcome {
    /// Total supply of the new DAO
    pub fn new_total_supply(&self) -> u64 {
        self.new_balances.iter().sum()
    }

    /// Outcome of a split that never happened: nothing moves
    pub fn unchanged(balances: &[u64], dao_balance: f64, reward_pool: f64) -> Self {
        Self {
            old_balances: balances.to_vec(),
            new_balances: vec![0; balances.len()],
            ether_moved: 0.0,
            ether_left: dao_balance,
            rewards_moved: 0.0,
            rewards_left: reward_pool,
        }
    }
}

/// Expected balances once every yes-voter has split off into a new DAO.
///
/// A yes-voter takes its full token balance along with
/// `balance / total_supply` of both the DAO's ether and its reward tokens.
/// No-voters stay behind untouched.
pub fn split_accounting(
    balances: &[u64],
    votes: &[bool],
    dao_balance: f64,
    reward_pool: f64,
) -> SplitOutcome {
    let total_supply: u64 = balances.iter().sum();
    let mut outcome = SplitOutcome::unchanged(balances, dao_balance, reward_pool);
    if total_supply == 0 {
        return outcome;
    }

    for (i, (&balance, &vote)) in balances.iter().zip(votes).enumerate() {
        if !vote {
            continue;
        }
        let fraction = balance as f64 / total_supply as f64;
        outcome.old_balances[i] = 0;
        outcome.new_balances[i] = balance;
        outcome.ether_moved += fraction * dao_balance;
        outcome.rewards_moved += fraction * reward_pool;
    }
    outcome.ether_left = dao_balance - outcome.ether_moved;
    outcome.rewards_left = reward_pool - outcome.rewards_moved;
    outcome
}
