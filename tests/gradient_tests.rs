mod common;

use common::{close, log_sum_exp, order_score, preserved, random_cost, reachable, shuffled};
use itertools::Itertools;
use permforge::cell::FullCell;
use permforge::chart::{
    build_controller, Chart, ControllerKind, Cubic, ParseController, TrivialCellMap,
};
use permforge::consts::LOG_ZERO;
use permforge::gradient::{AdjacencyChart, LikelihoodChart};
use permforge::kbest::KBest;
use permforge::permutation::Permutation;
use permforge::scorer::{BeforeCost, BeforeScorer};
use rstest::rstest;
use std::collections::HashSet;
use strum::IntoEnumIterator;

const H: f64 = 1e-5;

/// Central difference of `f` in every off-diagonal entry.
fn finite_differences(cost: &BeforeCost, f: impl Fn(&BeforeCost) -> f64) -> BeforeCost {
    let n = cost.len();
    let mut out = BeforeCost::new(n);
    for a in 0..n {
        for b in 0..n {
            if a == b {
                continue;
            }
            let mut up = cost.clone();
            up.add(a, b, H);
            let mut down = cost.clone();
            down.add(a, b, -H);
            out.set(a, b, (f(&up) - f(&down)) / (2.0 * H));
        }
    }
    out
}

fn assert_matrices_close(got: &BeforeCost, want: &BeforeCost, label: &str) {
    let diff = got.max_abs_diff(want);
    assert!(diff < 1e-5, "{label}: max diff {diff}");
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(3)]
#[case(5)]
#[case(6)]
fn test_log_z_matches_enumeration(#[case] n: usize) {
    let cost = random_cost(n, 11, 1.5);
    let perm = shuffled(n, 4);
    let scorer = BeforeScorer::cubic(&cost, &perm);
    let chart = LikelihoodChart::new(&scorer, &Cubic);

    let want = log_sum_exp(reachable(&perm).iter().map(|(_, items)| order_score(&cost, items)));
    assert!(close(chart.log_z(), want, 1e-9), "{} vs {}", chart.log_z(), want);
}

#[test]
fn test_log_likelihood_of_reachable_orders_normalises() {
    let cost = random_cost(5, 2, 1.0);
    let perm = shuffled(5, 8);
    let scorer = BeforeScorer::cubic(&cost, &perm);
    let chart = LikelihoodChart::new(&scorer, &Cubic);
    let total: f64 = reachable(&perm)
        .iter()
        .map(|(_, items)| chart.log_likelihood(&cost, items).exp())
        .sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn test_reaches_only_separable_targets() {
    let perm = Permutation::identity(4);
    let cost = BeforeCost::new(4);
    let scorer = BeforeScorer::cubic(&cost, &perm);
    let chart = LikelihoodChart::new(&scorer, &Cubic);
    assert!(chart.reaches(&[3, 2, 1, 0]));
    assert!(chart.reaches(&[1, 0, 3, 2]));
    assert!(!chart.reaches(&[1, 3, 0, 2]));
    assert!(!chart.reaches(&[2, 0, 3, 1]));
    assert!(!chart.reaches(&[0, 1, 2]));
}

#[test]
fn test_narrow_swaps_make_long_reversals_unreachable() {
    let perm = Permutation::identity(3);
    let cost = BeforeCost::new(3);
    let controller = build_controller(ControllerKind::Cubic, 1, Some(1));
    let scorer = BeforeScorer::new(&cost, &perm, &*controller);
    let chart = LikelihoodChart::new(&scorer, &*controller);

    assert!(!chart.reaches(&[2, 1, 0]));
    assert_eq!(chart.log_likelihood(&cost, &[2, 1, 0]), LOG_ZERO);
    assert!(chart.reaches(&[1, 0, 2]));
    assert!((chart.log_likelihood(&cost, &[1, 0, 2]) + 3f64.ln()).abs() < 1e-12);
}

#[rstest]
fn test_reaches_agrees_with_the_chart_support(
    #[values(None, Some(1), Some(2))] max_swap: Option<usize>,
) {
    let n = 5;
    let cost = random_cost(n, 17, 1.0);
    let perm = shuffled(n, 2);
    for kind in ControllerKind::iter() {
        let controller = build_controller(kind, 1, max_swap);
        let scorer = BeforeScorer::new(&cost, &perm, &*controller);
        let mut full = Chart::new(&perm, &TrivialCellMap, FullCell::new);
        full.permute(&*controller, &scorer);
        let support: HashSet<Vec<usize>> = KBest::new(&full, &*controller, &scorer)
            .best(1000)
            .iter()
            .map(|p| p.leaves())
            .collect();

        let chart = LikelihoodChart::new(&scorer, &*controller);
        let mut mass = 0.0;
        for target in (0..n).permutations(n) {
            let inside = support.contains(&target);
            assert_eq!(chart.reaches(&target), inside, "{kind} {target:?}");
            let ll = chart.log_likelihood(&cost, &target);
            if inside {
                mass += ll.exp();
            } else {
                assert_eq!(ll, LOG_ZERO);
            }
        }
        assert!((mass - 1.0).abs() < 1e-9, "{kind}: mass {mass}");
    }
}

#[test]
fn test_expected_precedence_sums_to_one_per_pair() {
    let n = 5;
    let cost = random_cost(n, 3, 2.0);
    let perm = shuffled(n, 3);
    let scorer = BeforeScorer::cubic(&cost, &perm);
    let chart = LikelihoodChart::new(&scorer, &Cubic);
    let mut grad = BeforeCost::new(n);
    chart.gradient_into(None, 1.0, &mut grad);
    for a in 0..n {
        for b in (a + 1)..n {
            assert!((grad.get(a, b) + grad.get(b, a) + 1.0).abs() < 1e-9);
        }
    }
}

#[test]
fn test_likelihood_gradient_matches_finite_differences() {
    let n = 5;
    let cost = random_cost(n, 21, 1.0);
    let perm = shuffled(n, 6);
    let target = [3, 1, 0, 4, 2];

    for kind in ControllerKind::iter() {
        let controller = build_controller(kind, 1, None);
        let scorer = BeforeScorer::new(&cost, &perm, &*controller);
        let chart = LikelihoodChart::new(&scorer, &*controller);
        let mut grad = BeforeCost::new(n);
        chart.gradient_into(Some(&target), 1.0, &mut grad);

        // Unreachable targets still get `[target] - E`, the derivative of
        // score(target) - log Z.
        let fd = finite_differences(&cost, |c| {
            let s = BeforeScorer::new(c, &perm, &*controller);
            order_score(c, &target) - LikelihoodChart::new(&s, &*controller).log_z()
        });
        assert_matrices_close(&grad, &fd, &kind.to_string());
    }
}

#[test]
fn test_scale_multiplies_gradient() {
    let n = 4;
    let cost = random_cost(n, 1, 1.0);
    let perm = Permutation::identity(n);
    let scorer = BeforeScorer::cubic(&cost, &perm);
    let chart = LikelihoodChart::new(&scorer, &Cubic);
    let mut once = BeforeCost::new(n);
    let mut thrice = BeforeCost::new(n);
    chart.gradient_into(Some(&[1, 0, 2, 3]), 1.0, &mut once);
    chart.gradient_into(Some(&[1, 0, 2, 3]), 3.0, &mut thrice);
    for a in 0..n {
        for b in 0..n {
            assert!((3.0 * once.get(a, b) - thrice.get(a, b)).abs() < 1e-9);
        }
    }
}

#[rstest]
#[case(2)]
#[case(4)]
#[case(6)]
fn test_expected_adjacency_matches_enumeration(#[case] n: usize) {
    let cost = random_cost(n, 40 + n as u64, 1.0);
    let perm = shuffled(n, 12);
    let scorer = BeforeScorer::cubic(&cost, &perm);
    let chart = AdjacencyChart::new(&scorer, &Cubic);

    let orders = reachable(&perm);
    let log_z = log_sum_exp(orders.iter().map(|(_, items)| order_score(&cost, items)));
    let want: f64 = orders
        .iter()
        .map(|(seq, items)| (order_score(&cost, items) - log_z).exp() * preserved(seq) as f64)
        .sum();

    assert!(close(chart.log_z(), log_z, 1e-9));
    assert!(close(chart.expected_preserved(), want, 1e-9), "{} vs {}", chart.expected_preserved(), want);
    assert!(close(chart.expected_loss(), (n - 1) as f64 - want, 1e-9));
}

#[test]
fn test_weighted_gaps_follow_gains() {
    let n = 4;
    let cost = random_cost(n, 9, 1.0);
    let perm = Permutation::identity(n);
    let scorer = BeforeScorer::cubic(&cost, &perm);
    let gains = vec![2.0, 0.0, 0.5];
    let chart = AdjacencyChart::with_gains(&scorer, &Cubic, gains.clone());

    let orders = reachable(&perm);
    let log_z = log_sum_exp(orders.iter().map(|(_, items)| order_score(&cost, items)));
    let want: f64 = orders
        .iter()
        .map(|(seq, items)| {
            let kept: f64 = seq
                .windows(2)
                .filter(|w| w[1] == w[0] + 1)
                .map(|w| gains[w[0]])
                .sum();
            (order_score(&cost, items) - log_z).exp() * kept
        })
        .sum();
    assert!(close(chart.expected_preserved(), want, 1e-9));
    assert_eq!(chart.max_preserved(), 2.5);
}

#[test]
fn test_adjacency_gradient_matches_finite_differences() {
    let n = 5;
    let cost = random_cost(n, 77, 1.0);
    let perm = shuffled(n, 2);

    for kind in ControllerKind::iter() {
        let controller = build_controller(kind, 2, None);
        let scorer = BeforeScorer::new(&cost, &perm, &*controller);
        let chart = AdjacencyChart::new(&scorer, &*controller);
        let mut grad = BeforeCost::new(n);
        chart.gradient_into(1.0, &mut grad);

        let fd = finite_differences(&cost, |c| {
            let s = BeforeScorer::new(c, &perm, &*controller);
            AdjacencyChart::new(&s, &*controller).expected_loss()
        });
        assert_matrices_close(&grad, &fd, &kind.to_string());
    }
}

#[test]
fn test_distortion_limit_gradients_stay_consistent() {
    let n = 5;
    let cost = random_cost(n, 5, 1.0);
    let perm = Permutation::identity(n);
    let controller = build_controller(ControllerKind::Cubic, 1, Some(1));
    assert!(!controller.allows_swap(0, 2, 4, n));

    let scorer = BeforeScorer::new(&cost, &perm, &*controller);
    let chart = LikelihoodChart::new(&scorer, &*controller);
    let mut grad = BeforeCost::new(n);
    chart.gradient_into(None, 1.0, &mut grad);
    let fd = finite_differences(&cost, |c| {
        let s = BeforeScorer::new(c, &perm, &*controller);
        -LikelihoodChart::new(&s, &*controller).log_z()
    });
    assert_matrices_close(&grad, &fd, "distortion");
}
