//! Property tests for the expected-outcome arithmetic
//!
//! - token supply compositions always have the right shape and are uniform
//! - derived votes always produce the requested proposal outcome
//! - result comparison honours the float tolerance

use dao_test_harness::accounting::*;
use dao_test_harness::evaluator::values_equal;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::collections::HashMap;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn composition_has_n_positive_parts(
        seed in any::<u64>(),
        n in 1usize..12,
        extra in 0u64..500,
    ) {
        let total = n as u64 + extra;
        let mut rng = StdRng::seed_from_u64(seed);
        let parts = constrained_sum_sample_pos(&mut rng, n, total).unwrap();

        prop_assert_eq!(parts.len(), n);
        prop_assert!(parts.iter().all(|&p| p > 0), "zero part in {:?}", parts);
        prop_assert_eq!(parts.iter().sum::<u64>(), total);
    }

    #[test]
    fn passing_votes_exceed_half(balances in prop::collection::vec(1u64..1_000_000, 1..10)) {
        let votes = create_votes(&balances, VoteOutcome::Pass);
        let (yay, nay) = tally(&balances, &votes);

        prop_assert_eq!(votes.len(), balances.len());
        prop_assert!(yay > nay, "yay {} nay {} for {:?}", yay, nay, balances);
    }

    #[test]
    fn failing_votes_stay_below_half(balances in prop::collection::vec(1u64..1_000_000, 1..10)) {
        let votes = create_votes(&balances, VoteOutcome::Fail);
        let (yay, nay) = tally(&balances, &votes);

        prop_assert!(yay < nay, "yay {} nay {} for {:?}", yay, nay, balances);
    }

    #[test]
    fn vote_derivation_is_deterministic(
        balances in prop::collection::vec(0u64..1_000, 0..10),
        pass in any::<bool>(),
    ) {
        let outcome = VoteOutcome::from_should_pass(pass);
        prop_assert_eq!(create_votes(&balances, outcome), create_votes(&balances, outcome));
    }

    #[test]
    fn float_comparison_tolerance(base in -1e6f64..1e6, delta in -0.02f64..0.02) {
        let equal = values_equal(&json!(base), &json!(base + delta));
        if delta.abs() < 0.009 {
            prop_assert!(equal);
        }
        if delta.abs() > 0.011 {
            prop_assert!(!equal);
        }
    }

    #[test]
    fn split_conserves_balances(
        balances in prop::collection::vec(1u64..1_000, 1..8),
        pass in any::<bool>(),
        dao_balance in 0f64..10_000.0,
        reward_pool in 0f64..100.0,
    ) {
        let votes = create_votes(&balances, VoteOutcome::from_should_pass(pass));
        let outcome = split_accounting(&balances, &votes, dao_balance, reward_pool);

        for i in 0..balances.len() {
            prop_assert_eq!(outcome.old_balances[i] + outcome.new_balances[i], balances[i]);
        }
        prop_assert!((outcome.ether_moved + outcome.ether_left - dao_balance).abs() < 1e-6);
        prop_assert!((outcome.rewards_moved + outcome.rewards_left - reward_pool).abs() < 1e-6);
    }
}

#[test]
fn compositions_are_uniform() {
    // 6 into 3 positive parts has C(5, 2) = 10 compositions
    const TRIALS: usize = 20_000;
    const COMPOSITIONS: usize = 10;

    let mut rng = StdRng::seed_from_u64(0xDA0);
    let mut counts: HashMap<Vec<u64>, usize> = HashMap::new();
    for _ in 0..TRIALS {
        let parts = constrained_sum_sample_pos(&mut rng, 3, 6).unwrap();
        *counts.entry(parts).or_default() += 1;
    }
    assert_eq!(counts.len(), COMPOSITIONS, "not every composition reached");

    let expected = (TRIALS / COMPOSITIONS) as f64;
    let chi_square: f64 = counts
        .values()
        .map(|&observed| {
            let diff = observed as f64 - expected;
            diff * diff / expected
        })
        .sum();
    // 9 degrees of freedom: p = 0.001 sits at 27.9
    assert!(chi_square < 40.0, "chi-square {} too large: {:?}", chi_square, counts);
}

#[test]
fn documented_examples() {
    assert!(values_equal(&json!(1.0), &json!(1.009)));
    assert!(!values_equal(&json!(1.0), &json!(1.02)));
    assert!(values_equal(&json!(3), &json!(3)));
    assert!(!values_equal(&json!(3), &json!(4)));

    let outcome = split_accounting(&[10, 20, 30], &[true, false, true], 60.0, 12.0);
    assert_eq!(outcome.new_balances, vec![10, 0, 30]);
    assert_eq!(outcome.old_balances, vec![0, 20, 0]);
    assert!((outcome.ether_moved - 40.0).abs() < 1e-9);
    assert!((outcome.rewards_moved - 8.0).abs() < 1e-9);
    assert!((outcome.ether_left - 20.0).abs() < 1e-9);
    assert!((outcome.rewards_left - 4.0).abs() < 1e-9);

    assert!((calculate_reward(10, 100, 78, RewardRounding::Exact) - 7.8).abs() < 1e-9);
    assert_eq!(calculate_reward(10, 100, 78, RewardRounding::Ceil), 8.0);
}
