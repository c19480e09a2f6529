mod common;

use common::{check_tree, order_score, random_cost, reachable, shuffled};
use permforge::cell::{BestCell, Cell, FullCell};
use permforge::chart::{AnchorRight, Chart, Cubic, ParseController, Quadratic, TrivialCellMap};
use permforge::kbest::KBest;
use permforge::path::PathRef;
use permforge::permutation::Permutation;
use permforge::scorer::{BeforeCost, BeforeScorer};
use rstest::rstest;
use std::collections::HashSet;

fn kbest<C: Cell, P: ParseController, F: Fn() -> C>(
    cost: &BeforeCost,
    perm: &Permutation,
    controller: &P,
    make_cell: F,
    k: usize,
) -> Vec<PathRef> {
    let scorer = BeforeScorer::new(cost, perm, controller);
    let mut chart = Chart::new(perm, &TrivialCellMap, make_cell);
    chart.permute(controller, &scorer);
    KBest::new(&chart, controller, &scorer).best(k)
}

fn sorted_desc(mut xs: Vec<f64>) -> Vec<f64> {
    xs.sort_by(|a, b| b.total_cmp(a));
    xs
}

#[rstest]
#[case(1, 1)]
#[case(2, 2)]
#[case(3, 6)]
#[case(4, 22)]
#[case(5, 90)]
#[case(6, 394)]
fn test_enumerates_every_reachable_order(#[case] n: usize, #[case] count: usize) {
    let cost = random_cost(n, n as u64, 2.0);
    let perm = shuffled(n, 1);
    let paths = kbest(&cost, &perm, &Cubic, BestCell::new, 1000);
    assert_eq!(paths.len(), count);

    let orders: HashSet<Vec<usize>> = paths.iter().map(|p| p.leaves()).collect();
    assert_eq!(orders.len(), count, "duplicate orders");

    let want = sorted_desc(
        reachable(&perm)
            .iter()
            .map(|(_, items)| order_score(&cost, items))
            .collect(),
    );
    let got: Vec<f64> = paths.iter().map(|p| p.score()).collect();
    for (g, w) in got.iter().zip(&want) {
        assert!((g - w).abs() < 1e-9, "{got:?} vs {want:?}");
    }
}

#[test]
fn test_scores_are_non_increasing_and_consistent() {
    let cost = random_cost(6, 8, 1.0);
    let perm = shuffled(6, 8);
    let paths = kbest(&cost, &perm, &Cubic, FullCell::new, 40);
    assert_eq!(paths.len(), 40);
    for pair in paths.windows(2) {
        assert!(pair[0].score() >= pair[1].score());
    }
    for p in &paths {
        check_tree(p);
        assert!((p.score() - order_score(&cost, &p.leaves())).abs() < 1e-9);
    }
}

#[test]
fn test_repeated_calls_extend_the_same_list() {
    let cost = random_cost(6, 13, 1.0);
    let perm = Permutation::identity(6);
    let scorer = BeforeScorer::cubic(&cost, &perm);
    let mut chart = Chart::trivial(&perm);
    chart.permute(&Cubic, &scorer);

    let mut kb = KBest::new(&chart, &Cubic, &scorer);
    let first = kb.best(5);
    let touched = kb.vertex_count();
    let more = kb.best(25);
    assert!(kb.vertex_count() >= touched);
    assert_eq!(first.len(), 5);
    for (a, b) in first.iter().zip(&more) {
        assert_eq!(a.leaves(), b.leaves());
    }
    let again = kb.best(3);
    assert_eq!(again.len(), 3);
    assert_eq!(again[0].leaves(), first[0].leaves());
}

#[test]
fn test_first_matches_chart_best() {
    for seed in 0..8 {
        let cost = random_cost(7, seed, 3.0);
        let perm = shuffled(7, seed);
        let scorer = BeforeScorer::cubic(&cost, &perm);
        let mut chart = Chart::trivial(&perm);
        chart.permute(&Cubic, &scorer);
        let best = chart.best_path().unwrap();
        let top = KBest::new(&chart, &Cubic, &scorer).best(1);
        assert!((top[0].score() - best.score()).abs() < 1e-9);
        assert_eq!(top[0].leaves(), best.leaves());
    }
}

#[rstest]
#[case(3)]
#[case(5)]
fn test_ties_follow_the_chart_tie_break(#[case] n: usize) {
    let cost = BeforeCost::new(n);
    let perm = Permutation::identity(n);
    let scorer = BeforeScorer::cubic(&cost, &perm);

    let mut best_chart = Chart::trivial(&perm);
    best_chart.permute(&Cubic, &scorer);
    let best = best_chart.best_path().unwrap();
    assert_eq!(best.leaves(), (0..n).collect::<Vec<_>>());
    let top = KBest::new(&best_chart, &Cubic, &scorer).best(1);
    assert_eq!(top[0].leaves(), best.leaves());

    // Every order ties, so the whole list comes out lexicographically.
    let paths = kbest(&cost, &perm, &Cubic, FullCell::new, 1000);
    let got: Vec<Vec<usize>> = paths.iter().map(|p| p.leaves()).collect();
    let mut want: Vec<Vec<usize>> = reachable(&perm).into_iter().map(|(_, items)| items).collect();
    want.sort();
    assert_eq!(got, want);
}

#[test]
fn test_restricted_controller_lists_only_its_orders() {
    let cost = random_cost(6, 4, 1.0);
    let perm = Permutation::identity(6);
    let controller = AnchorRight::new(Quadratic::new(1));
    let restricted = kbest(&cost, &perm, &controller, BestCell::new, 10_000);
    let full = kbest(&cost, &perm, &Cubic, BestCell::new, 10_000);
    assert!(restricted.len() < full.len());

    let all: HashSet<Vec<usize>> = full.iter().map(|p| p.leaves()).collect();
    for p in &restricted {
        assert!(all.contains(&p.leaves()));
        check_tree(p);
    }
}

#[test]
fn test_empty_permutation_yields_epsilon() {
    let cost = BeforeCost::new(0);
    let perm = Permutation::identity(0);
    let paths = kbest(&cost, &perm, &Cubic, BestCell::new, 3);
    assert_eq!(paths.len(), 1);
    assert!(paths[0].leaves().is_empty());
}
