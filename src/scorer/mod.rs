pub mod cost;
pub mod loader;
pub mod triangle;

pub use self::cost::{BeforeCost, GradientSink};
pub use self::triangle::TripleTable;

use crate::chart::controller::{Cubic, ParseController, Recurrence};
use crate::permutation::Permutation;
use tracing::debug;

/// Local scores the chart asks for when it combines `[begin, middle)` with
/// `[middle, end)`. Spans are in positions of the current permutation.
pub trait Scorer {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn keep_score(&self, begin: usize, middle: usize, end: usize) -> f64;

    fn swap_score(&self, begin: usize, middle: usize, end: usize) -> f64;
}

/// Reference value of a Keep at `(begin, middle, end)`: every left item
/// stays before every right item.
pub fn naive_keep_score(
    cost: &BeforeCost,
    perm: &Permutation,
    begin: usize,
    middle: usize,
    end: usize,
) -> f64 {
    let mut total = 0.0;
    for a in begin..middle {
        for b in middle..end {
            total += cost.get(perm.at(a), perm.at(b));
        }
    }
    total
}

pub fn naive_swap_score(
    cost: &BeforeCost,
    perm: &Permutation,
    begin: usize,
    middle: usize,
    end: usize,
) -> f64 {
    let mut total = 0.0;
    for a in begin..middle {
        for b in middle..end {
            total += cost.get(perm.at(b), perm.at(a));
        }
    }
    total
}

/// Prefix/suffix sums of the position-space cost used by the anchored rules.
///
/// Each is `(n + 1) x n`, indexed `[bound * n + item]`.
#[derive(Debug, Clone)]
struct Margins {
    /// `sum_{a < j} C[a][b]`
    into: Vec<f64>,
    /// `sum_{a < j} C[b][a]`
    out_of: Vec<f64>,
    /// `sum_{b >= j} C[i][b]`
    ahead: Vec<f64>,
    /// `sum_{b >= j} C[b][i]`
    behind: Vec<f64>,
}

impl Margins {
    fn build(n: usize, c: impl Fn(usize, usize) -> f64) -> Self {
        let size = (n + 1) * n;
        let mut m = Margins {
            into: vec![0.0; size],
            out_of: vec![0.0; size],
            ahead: vec![0.0; size],
            behind: vec![0.0; size],
        };
        for x in 0..n {
            for j in 1..=n {
                let prev = (j - 1) * n + x;
                m.into[j * n + x] = m.into[prev] + c(j - 1, x);
                m.out_of[j * n + x] = m.out_of[prev] + c(x, j - 1);
            }
            for j in (0..n).rev() {
                let next = (j + 1) * n + x;
                m.ahead[j * n + x] = m.ahead[next] + c(x, j);
                m.behind[j * n + x] = m.behind[next] + c(j, x);
            }
        }
        m
    }
}

#[derive(Debug, Clone, Copy)]
struct Step {
    begin: usize,
    middle: usize,
    end: usize,
    rule: Recurrence,
}

/// Keep/Swap scores for every triple a controller allows, in `O(1)` each.
///
/// A Keep of `[i, j) [j, k)` scores `sum C[pi a][pi b]` over `a < j <= b`.
/// Widening the span by one item on the right reuses the narrower triples:
///
/// `K(i,j,k) = K(i,j,k-1) + K(i+1,j,k) - K(i+1,j,k-1) + C[pi i][pi (k-1)]`
///
/// where a triple with an empty side is `0`. Anchored rules replace the
/// telescoping step with a row or column sum so that a restricted span
/// set never needs a predecessor it did not compute.
#[derive(Debug, Clone)]
pub struct BeforeScorer {
    n: usize,
    order: Vec<usize>,
    keep: TripleTable,
    swap: TripleTable,
    plan: Vec<Step>,
}

impl BeforeScorer {
    pub fn new<P: ParseController + ?Sized>(
        cost: &BeforeCost,
        perm: &Permutation,
        controller: &P,
    ) -> Self {
        let n = perm.len();
        let order = perm.order().to_vec();
        let c = |a: usize, b: usize| cost.get(order[a], order[b]);

        let mut plan = Vec::new();
        for width in 2..=n {
            for begin in 0..=(n - width) {
                let end = begin + width;
                for middle in controller.midpoints(begin, end, n) {
                    let rule = controller.recurrence(begin, middle, end, n);
                    plan.push(Step {
                        begin,
                        middle,
                        end,
                        rule,
                    });
                }
            }
        }

        let anchored = plan.iter().any(|s| s.rule != Recurrence::Telescoping);
        let margins = anchored.then(|| Margins::build(n, c));

        let mut keep = TripleTable::new(n, f64::NAN);
        let mut swap = TripleTable::new(n, f64::NAN);
        for s in &plan {
            let (i, j, k) = (s.begin, s.middle, s.end);
            let (kv, sv) = match (s.rule, &margins) {
                (Recurrence::AnchorLeft, Some(m)) => {
                    debug_assert_eq!(i, 0);
                    let at = j * n + (k - 1);
                    (
                        filled(&keep, i, j, k - 1) + m.into[at],
                        filled(&swap, i, j, k - 1) + m.out_of[at],
                    )
                }
                (Recurrence::AnchorRight, Some(m)) => {
                    debug_assert_eq!(k, n);
                    let at = j * n + i;
                    (
                        filled(&keep, i + 1, j, k) + m.ahead[at],
                        filled(&swap, i + 1, j, k) + m.behind[at],
                    )
                }
                _ => (
                    filled(&keep, i, j, k - 1) + filled(&keep, i + 1, j, k)
                        - filled(&keep, i + 1, j, k - 1)
                        + c(i, k - 1),
                    filled(&swap, i, j, k - 1) + filled(&swap, i + 1, j, k)
                        - filled(&swap, i + 1, j, k - 1)
                        + c(k - 1, i),
                ),
            };
            keep.set(i, j, k, kv);
            swap.set(i, j, k, sv);
        }

        debug!("BeforeScorer: n={} triples={} anchored={}", n, plan.len(), anchored);

        Self {
            n,
            order,
            keep,
            swap,
            plan,
        }
    }

    /// Scorer over every triple.
    pub fn cubic(cost: &BeforeCost, perm: &Permutation) -> Self {
        Self::new(cost, perm, &Cubic)
    }

    /// Number of triples filled.
    pub fn filled(&self) -> usize {
        self.plan.len()
    }

    /// Original index at position `p`.
    pub fn item(&self, p: usize) -> usize {
        self.order[p]
    }

    /// Pushes `d f / d C[a][b]` into `sink`, given `d f / d keep_score` and
    /// `d f / d swap_score` for every filled triple.
    ///
    /// Walks the fill order backwards, handing each triple's gradient to the
    /// entries it was built from.
    pub fn backprop<G: GradientSink + ?Sized>(
        &self,
        keep_grad: &TripleTable,
        swap_grad: &TripleTable,
        sink: &mut G,
    ) {
        let n = self.n;
        if n < 2 {
            return;
        }
        let mut gk = keep_grad.clone();
        let mut gs = swap_grad.clone();
        let mut direct = BeforeCost::new(n);
        let size = (n + 1) * n;
        let mut g_into = vec![0.0; size];
        let mut g_out_of = vec![0.0; size];
        let mut g_ahead = vec![0.0; size];
        let mut g_behind = vec![0.0; size];

        for s in self.plan.iter().rev() {
            let (i, j, k) = (s.begin, s.middle, s.end);
            let kg = gk.get(i, j, k);
            let sg = gs.get(i, j, k);
            if kg == 0.0 && sg == 0.0 {
                continue;
            }
            match s.rule {
                Recurrence::AnchorLeft => {
                    if k - 1 > j {
                        gk.add(i, j, k - 1, kg);
                        gs.add(i, j, k - 1, sg);
                    }
                    g_into[j * n + (k - 1)] += kg;
                    g_out_of[j * n + (k - 1)] += sg;
                }
                Recurrence::AnchorRight => {
                    if i + 1 < j {
                        gk.add(i + 1, j, k, kg);
                        gs.add(i + 1, j, k, sg);
                    }
                    g_ahead[j * n + i] += kg;
                    g_behind[j * n + i] += sg;
                }
                Recurrence::Telescoping => {
                    let left = k - 1 > j;
                    let right = i + 1 < j;
                    if left {
                        gk.add(i, j, k - 1, kg);
                        gs.add(i, j, k - 1, sg);
                    }
                    if right {
                        gk.add(i + 1, j, k, kg);
                        gs.add(i + 1, j, k, sg);
                    }
                    if left && right {
                        gk.add(i + 1, j, k - 1, -kg);
                        gs.add(i + 1, j, k - 1, -sg);
                    }
                    direct.add(i, k - 1, kg);
                    direct.add(k - 1, i, sg);
                }
            }
        }

        // Fold the margin gradients back onto individual entries.
        for x in 0..n {
            // into/out_of: entry (a, x) or (x, a) is in every bound j > a
            let mut run_in = 0.0;
            let mut run_out = 0.0;
            for j in (1..=n).rev() {
                run_in += g_into[j * n + x];
                run_out += g_out_of[j * n + x];
                direct.add(j - 1, x, run_in);
                direct.add(x, j - 1, run_out);
            }
            // ahead/behind: entry (x, b) or (b, x) is in every bound j <= b
            let mut run_ahead = 0.0;
            let mut run_behind = 0.0;
            for j in 0..n {
                run_ahead += g_ahead[j * n + x];
                run_behind += g_behind[j * n + x];
                direct.add(x, j, run_ahead);
                direct.add(j, x, run_behind);
            }
        }

        for a in 0..n {
            for b in 0..n {
                let g = direct.get(a, b);
                if a != b && g != 0.0 {
                    sink.accumulate(self.order[a], self.order[b], g);
                }
            }
        }
    }
}

#[inline(always)]
fn filled(table: &TripleTable, begin: usize, middle: usize, end: usize) -> f64 {
    if begin == middle || middle == end {
        return 0.0;
    }
    let v = table.get(begin, middle, end);
    debug_assert!(!v.is_nan(), "triple ({begin},{middle},{end}) read before fill");
    v
}

impl Scorer for BeforeScorer {
    #[inline]
    fn len(&self) -> usize {
        self.n
    }

    #[inline]
    fn keep_score(&self, begin: usize, middle: usize, end: usize) -> f64 {
        filled(&self.keep, begin, middle, end)
    }

    #[inline]
    fn swap_score(&self, begin: usize, middle: usize, end: usize) -> f64 {
        filled(&self.swap, begin, middle, end)
    }
}
