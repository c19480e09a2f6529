use super::{InsideOutside, LocalWeights};
use crate::chart::ParseController;
use crate::scorer::{BeforeScorer, GradientSink, Scorer, TripleTable};
use crate::semiring::{Expectation, Semiring};
use tracing::debug;

struct GainWeights<'a> {
    scorer: &'a BeforeScorer,
    gains: &'a [f64],
}

impl LocalWeights<Expectation> for GainWeights<'_> {
    #[inline]
    fn keep(&self, begin: usize, middle: usize, end: usize, joins: bool) -> Expectation {
        let gain = if joins { self.gains[middle - 1] } else { 0.0 };
        Expectation::new(self.scorer.keep_score(begin, middle, end), gain)
    }

    #[inline]
    fn swap(&self, begin: usize, middle: usize, end: usize) -> Expectation {
        Expectation::new(self.scorer.swap_score(begin, middle, end), 0.0)
    }
}

/// Expected adjacency-preservation loss under the log-linear model.
///
/// Gap `g` (between positions `g` and `g + 1` of the current permutation)
/// is preserved by a reordering that still emits item `g + 1` right after
/// item `g`. The loss is `sum(gains) - E[sum of preserved gains]`.
pub struct AdjacencyChart<'a, P: ?Sized> {
    scorer: &'a BeforeScorer,
    controller: &'a P,
    gains: Vec<f64>,
    io: InsideOutside<Expectation>,
}

impl<'a, P: ParseController + ?Sized> AdjacencyChart<'a, P> {
    /// Every gap weighs `1`.
    pub fn new(scorer: &'a BeforeScorer, controller: &'a P) -> Self {
        let gaps = scorer.len().saturating_sub(1);
        Self::with_gains(scorer, controller, vec![1.0; gaps])
    }

    pub fn with_gains(scorer: &'a BeforeScorer, controller: &'a P, gains: Vec<f64>) -> Self {
        debug_assert_eq!(gains.len(), scorer.len().saturating_sub(1));
        let io = InsideOutside::inside(
            scorer.len(),
            controller,
            &GainWeights {
                scorer,
                gains: &gains,
            },
        );
        debug!(
            "AdjacencyChart: n={} E[preserved]={:.6}",
            scorer.len(),
            io.total().expected()
        );
        Self {
            scorer,
            controller,
            gains,
            io,
        }
    }

    pub fn log_z(&self) -> f64 {
        self.io.total().log_prob()
    }

    pub fn expected_preserved(&self) -> f64 {
        self.io.total().expected()
    }

    pub fn max_preserved(&self) -> f64 {
        self.gains.iter().sum()
    }

    pub fn expected_loss(&self) -> f64 {
        self.max_preserved() - self.expected_preserved()
    }

    /// Adds `scale * d expected_loss / d C` into `sink`.
    pub fn gradient_into<G: GradientSink + ?Sized>(&self, scale: f64, sink: &mut G) {
        let n = self.scorer.len();
        let z = self.io.total();
        let weights = GainWeights {
            scorer: self.scorer,
            gains: &self.gains,
        };
        let marg = self.io.marginals(self.controller, &weights);

        // d E[f] / d s_t = P(t) * (E[f | t] - E[f])
        let grad = |m: Expectation| {
            if m.is_zero() {
                0.0
            } else {
                -scale * (m.log_prob() - z.log_prob()).exp() * (m.expected() - z.expected())
            }
        };

        let mut keep_grad = TripleTable::new(n, 0.0);
        let mut swap_grad = TripleTable::new(n, 0.0);
        for e in 2..=n {
            for b in 0..e - 1 {
                for m in self.controller.midpoints(b, e, n) {
                    keep_grad.set(b, m, e, grad(marg.keep.get(b, m, e)));
                    swap_grad.set(b, m, e, grad(marg.swap.get(b, m, e)));
                }
            }
        }
        self.scorer.backprop(&keep_grad, &swap_grad, sink);
    }
}
