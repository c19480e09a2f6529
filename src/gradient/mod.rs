//! Inside/outside passes over the normal-form grammar.
//!
//! Each span carries four category totals:
//!
//! | slot | derivations of the span that are ... |
//! |------|--------------------------------------|
//! | `L`  | a single leaf                        |
//! | `KR` | a Keep whose right child is a leaf   |
//! | `KN` | a Keep whose right child is a Swap   |
//! | `S`  | a Swap                               |
//!
//! `L` and `KR` are exactly the derivations whose output ends with the
//! span's last source item, which is what the adjacency objective needs to
//! know when a Keep appends a single leaf. Normal form is enforced by the
//! productions themselves: a Keep's right child is never a Keep and a
//! Swap's left child is never a Swap.

pub mod adjacency;
pub mod likelihood;

pub use self::adjacency::AdjacencyChart;
pub use self::likelihood::LikelihoodChart;

use crate::chart::ParseController;
use crate::scorer::TripleTable;
use crate::semiring::Semiring;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

const L: usize = 0;
const KR: usize = 1;
const KN: usize = 2;
const S: usize = 3;

type Slots<W> = [W; 4];

/// Local weights of one combination point.
pub trait LocalWeights<W> {
    /// Keep of `[begin, middle) [middle, end)`. `joins` is set when the left
    /// child's output ends with item `middle - 1` and the right child is the
    /// single item `middle`, i.e. the pair stays adjacent.
    fn keep(&self, begin: usize, middle: usize, end: usize, joins: bool) -> W;

    fn swap(&self, begin: usize, middle: usize, end: usize) -> W;
}

#[inline(always)]
fn span(begin: usize, end: usize) -> usize {
    end * (end - 1) / 2 + begin
}

#[inline(always)]
fn total<W: Semiring>(s: &Slots<W>) -> W {
    s[L].plus(&s[KR]).plus(&s[KN]).plus(&s[S])
}

#[inline(always)]
fn not_swap<W: Semiring>(s: &Slots<W>) -> W {
    s[L].plus(&s[KR]).plus(&s[KN])
}

/// Inside totals of every span plus, on demand, combination marginals.
#[derive(Debug, Clone)]
pub struct InsideOutside<W> {
    n: usize,
    inside: Vec<Slots<W>>,
}

/// Per-triple marginals: the total weight of every full derivation using the
/// Keep (resp. Swap) at that triple.
#[derive(Debug, Clone)]
pub struct Marginals<W> {
    pub keep: TripleTable<W>,
    pub swap: TripleTable<W>,
}

impl<W: Semiring> InsideOutside<W> {
    pub fn inside<P, Lw>(n: usize, controller: &P, weights: &Lw) -> Self
    where
        P: ParseController + ?Sized,
        Lw: LocalWeights<W> + ?Sized,
    {
        let count = n * (n + 1) / 2;
        let mut inside = vec![[W::ZERO; 4]; count];
        for p in 0..n {
            inside[span(p, p + 1)][L] = W::ONE;
        }
        for width in 2..=n {
            for b in 0..=(n - width) {
                let e = b + width;
                let mut acc = [W::ZERO; 4];
                for m in controller.midpoints(b, e, n) {
                    let l = &inside[span(b, m)];
                    let r = &inside[span(m, e)];
                    if e - m == 1 {
                        acc[KR] = acc[KR].plus(&keep_leaf_left(l, weights, b, m, e).times(&r[L]));
                    } else {
                        let w = weights.keep(b, m, e, false);
                        acc[KN] = acc[KN].plus(&total(l).times(&w).times(&r[S]));
                    }
                    if controller.allows_swap(b, m, e, n) {
                        let w = weights.swap(b, m, e);
                        acc[S] = acc[S].plus(&not_swap(l).times(&w).times(&total(r)));
                    }
                }
                inside[span(b, e)] = acc;
            }
        }
        Self { n, inside }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Total weight of every derivation of the whole permutation.
    pub fn total(&self) -> W {
        if self.n == 0 {
            W::ONE
        } else {
            total(&self.inside[span(0, self.n)])
        }
    }

    /// Category totals of `[begin, end)`.
    pub fn span_inside(&self, begin: usize, end: usize) -> [W; 4] {
        self.inside[span(begin, end)]
    }

    /// Runs the outside pass and returns the marginal of every allowed
    /// combination point.
    pub fn marginals<P, Lw>(&self, controller: &P, weights: &Lw) -> Marginals<W>
    where
        P: ParseController + ?Sized,
        Lw: LocalWeights<W> + ?Sized,
    {
        let n = self.n;
        let mut keep = TripleTable::new(n, W::ZERO);
        let mut swap = TripleTable::new(n, W::ZERO);
        if n < 2 {
            return Marginals { keep, swap };
        }
        let inside = &self.inside;
        let mut outside = vec![[W::ZERO; 4]; inside.len()];
        outside[span(0, n)] = [W::ONE; 4];

        for width in (2..=n).rev() {
            for b in 0..=(n - width) {
                let e = b + width;
                let o = outside[span(b, e)];
                for m in controller.midpoints(b, e, n) {
                    let l = inside[span(b, m)];
                    let r = inside[span(m, e)];
                    let mut out_l = [W::ZERO; 4];
                    let mut out_r = [W::ZERO; 4];

                    if e - m == 1 {
                        let parent = o[KR];
                        let joins = weights.keep(b, m, e, true);
                        let apart = weights.keep(b, m, e, false);
                        let via_join = parent.times(&joins).times(&r[L]);
                        let via_apart = parent.times(&apart).times(&r[L]);
                        out_l[L] = via_join;
                        out_l[KR] = via_join;
                        out_l[KN] = via_apart;
                        out_l[S] = via_apart;
                        let left = keep_leaf_left(&l, weights, b, m, e);
                        out_r[L] = parent.times(&left);
                        keep.set(b, m, e, out_r[L].times(&r[L]));
                    } else {
                        let parent = o[KN];
                        let w = weights.keep(b, m, e, false);
                        let to_left = parent.times(&w).times(&r[S]);
                        out_l = [to_left; 4];
                        out_r[S] = parent.times(&w).times(&total(&l));
                        keep.set(b, m, e, out_r[S].times(&r[S]));
                    }

                    if controller.allows_swap(b, m, e, n) {
                        let parent = o[S];
                        let w = weights.swap(b, m, e);
                        let to_left = parent.times(&w).times(&total(&r));
                        let to_right = parent.times(&w).times(&not_swap(&l));
                        for c in [L, KR, KN] {
                            out_l[c] = out_l[c].plus(&to_left);
                        }
                        for slot in out_r.iter_mut() {
                            *slot = slot.plus(&to_right);
                        }
                        swap.set(b, m, e, to_right.times(&total(&r)));
                    }

                    accumulate(&mut outside[span(b, m)], &out_l);
                    accumulate(&mut outside[span(m, e)], &out_r);
                }
            }
        }
        Marginals { keep, swap }
    }
}

/// `(L + KR) * joins + (KN + S) * apart`: every left child of a Keep that
/// appends the single item `middle`.
#[inline(always)]
fn keep_leaf_left<W, Lw>(l: &Slots<W>, weights: &Lw, b: usize, m: usize, e: usize) -> W
where
    W: Semiring,
    Lw: LocalWeights<W> + ?Sized,
{
    let ends_last = l[L].plus(&l[KR]);
    let ends_other = l[KN].plus(&l[S]);
    ends_last
        .times(&weights.keep(b, m, e, true))
        .plus(&ends_other.times(&weights.keep(b, m, e, false)))
}

#[inline(always)]
fn accumulate<W: Semiring>(into: &mut Slots<W>, add: &Slots<W>) {
    for (slot, v) in into.iter_mut().zip(add) {
        *slot = slot.plus(v);
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    Likelihood,
    Adjacency,
}
