#![allow(dead_code)]

use itertools::Itertools;
use permforge::path::Path;
use permforge::permutation::{is_separable, Permutation};
use permforge::scorer::BeforeCost;

/// Dense cost matrix with entries in `[-range, range)`.
pub fn random_cost(n: usize, seed: u64, range: f64) -> BeforeCost {
    let mut rng = fastrand::Rng::with_seed(seed);
    BeforeCost::from_fn(n, |_, _| (rng.f64() * 2.0 - 1.0) * range)
}

pub fn shuffled(n: usize, seed: u64) -> Permutation {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut order: Vec<usize> = (0..n).collect();
    rng.shuffle(&mut order);
    Permutation::from_order(order).unwrap()
}

pub fn order_score(cost: &BeforeCost, order: &[usize]) -> f64 {
    let mut total = 0.0;
    for (x, &a) in order.iter().enumerate() {
        for &b in &order[x + 1..] {
            total += cost.get(a, b);
        }
    }
    total
}

/// Every position sequence an unrestricted chart can produce from `perm`,
/// paired with the item order it yields.
pub fn reachable(perm: &Permutation) -> Vec<(Vec<usize>, Vec<usize>)> {
    (0..perm.len())
        .permutations(perm.len())
        .filter(|seq| is_separable(seq))
        .map(|seq| {
            let items = seq.iter().map(|&p| perm.at(p)).collect();
            (seq, items)
        })
        .collect()
}

pub fn log_sum_exp(xs: impl IntoIterator<Item = f64>) -> f64 {
    let xs: Vec<f64> = xs.into_iter().collect();
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return max;
    }
    max + xs.iter().map(|x| (x - max).exp()).sum::<f64>().ln()
}

/// Positions `x` where `x` is immediately followed by `x + 1`.
pub fn preserved(seq: &[usize]) -> usize {
    seq.windows(2).filter(|w| w[1] == w[0] + 1).count()
}

/// Every node is in normal form and local scores add up to the root score.
pub fn check_tree(path: &Path) -> f64 {
    assert!(path.is_normal(), "non-normal node in {}", path);
    match path.children() {
        Some((l, r)) => {
            assert_eq!(l.len() + r.len(), path.len());
            let total = path.local_score() + check_tree(l) + check_tree(r);
            assert!((total - path.score()).abs() < 1e-9);
            total
        }
        None => path.score(),
    }
}

pub fn close(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol * (1.0 + a.abs().max(b.abs()))
}
