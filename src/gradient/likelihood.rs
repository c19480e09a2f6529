use super::{InsideOutside, LocalWeights};
use crate::chart::ParseController;
use crate::consts::LOG_ZERO;
use crate::log_math::{log_div, to_prob};
use crate::permutation::is_separable;
use crate::scorer::{BeforeCost, BeforeScorer, GradientSink, Scorer, TripleTable};
use crate::semiring::{LogWeight, Semiring};
use tracing::{debug, warn};

struct ScoreWeights<'a>(&'a BeforeScorer);

impl LocalWeights<LogWeight> for ScoreWeights<'_> {
    #[inline]
    fn keep(&self, begin: usize, middle: usize, end: usize, _joins: bool) -> LogWeight {
        LogWeight::new(self.0.keep_score(begin, middle, end))
    }

    #[inline]
    fn swap(&self, begin: usize, middle: usize, end: usize) -> LogWeight {
        LogWeight::new(self.0.swap_score(begin, middle, end))
    }
}

/// Log-linear model over the reorderings reachable from the current
/// permutation: `p(order) = exp(score(order)) / Z`.
///
/// The gradient of `log p(target)` with respect to `C[a][b]` is
/// `[a precedes b in target] - P(a precedes b)`.
pub struct LikelihoodChart<'a, P: ?Sized> {
    scorer: &'a BeforeScorer,
    controller: &'a P,
    io: InsideOutside<LogWeight>,
}

impl<'a, P: ParseController + ?Sized> LikelihoodChart<'a, P> {
    /// Runs the inside pass. `scorer` must have been built with the same
    /// controller.
    pub fn new(scorer: &'a BeforeScorer, controller: &'a P) -> Self {
        let io = InsideOutside::inside(scorer.len(), controller, &ScoreWeights(scorer));
        debug!("LikelihoodChart: n={} log Z={:.6}", scorer.len(), io.total().0);
        Self {
            scorer,
            controller,
            io,
        }
    }

    /// Log normaliser over all reachable reorderings.
    pub fn log_z(&self) -> f64 {
        self.io.total().log_prob()
    }

    /// `log p(target)` for `target` given as original indices in output
    /// order. [`LOG_ZERO`] when the chart cannot derive `target`.
    pub fn log_likelihood(&self, cost: &BeforeCost, target: &[usize]) -> f64 {
        if !self.reaches(target) {
            return LOG_ZERO;
        }
        let mut score = 0.0;
        for (x, &a) in target.iter().enumerate() {
            for &b in &target[x + 1..] {
                score += cost.get(a, b);
            }
        }
        score - self.log_z()
    }

    /// Whether the chart derives `target` from the current order under its
    /// controller.
    pub fn reaches(&self, target: &[usize]) -> bool {
        let n = self.scorer.len();
        let mut position = vec![usize::MAX; n];
        for p in 0..n {
            position[self.scorer.item(p)] = p;
        }
        let seq: Option<Vec<usize>> = target
            .iter()
            .map(|&i| position.get(i).copied().filter(|&p| p != usize::MAX))
            .collect();
        match seq {
            Some(seq) if seq.len() == n && is_separable(&seq) => self.derives(&seq, 0, n),
            _ => false,
        }
    }

    /// Walks the normal-form bracketing of `seq`, the output order of
    /// positions `[begin, end)`, checking every split against the controller.
    fn derives(&self, seq: &[usize], begin: usize, end: usize) -> bool {
        let len = end - begin;
        if len <= 1 {
            return true;
        }
        let n = self.scorer.len();
        // Keep: right child is not a Keep, so split after the last prefix
        // that covers [begin, middle).
        let mut high = 0;
        let mut keep = None;
        for (t, &p) in seq[..len - 1].iter().enumerate() {
            high = high.max(p);
            if high == begin + t {
                keep = Some(t + 1);
            }
        }
        if let Some(t) = keep {
            let middle = begin + t;
            return self.controller.midpoints(begin, end, n).contains(&middle)
                && self.derives(&seq[..t], begin, middle)
                && self.derives(&seq[t..], middle, end);
        }
        // Swap: left child is not a Swap, so take the shortest suffix that
        // covers [begin, middle).
        let mut high = 0;
        for t in 1..len {
            high = high.max(seq[len - t]);
            if high == begin + t - 1 {
                let middle = begin + t;
                return self.controller.midpoints(begin, end, n).contains(&middle)
                    && self.controller.allows_swap(begin, middle, end, n)
                    && self.derives(&seq[len - t..], begin, middle)
                    && self.derives(&seq[..len - t], middle, end);
            }
        }
        false
    }

    /// Adds `scale * d log p(target) / d C` into `sink`.
    ///
    /// With no target only the normaliser term `-E[a precedes b]` is
    /// emitted.
    pub fn gradient_into<G: GradientSink + ?Sized>(
        &self,
        target: Option<&[usize]>,
        scale: f64,
        sink: &mut G,
    ) {
        let n = self.scorer.len();
        let log_z = self.log_z();
        let marg = self.io.marginals(self.controller, &ScoreWeights(self.scorer));

        let mut keep_grad = TripleTable::new(n, 0.0);
        let mut swap_grad = TripleTable::new(n, 0.0);
        for e in 2..=n {
            for b in 0..e - 1 {
                for m in self.controller.midpoints(b, e, n) {
                    let keep = to_prob(log_div(marg.keep.get(b, m, e).0, log_z));
                    let swap = to_prob(log_div(marg.swap.get(b, m, e).0, log_z));
                    keep_grad.set(b, m, e, -scale * keep);
                    swap_grad.set(b, m, e, -scale * swap);
                }
            }
        }
        self.scorer.backprop(&keep_grad, &swap_grad, sink);

        if let Some(target) = target {
            if target.len() != n {
                warn!("Target covers {} items, chart has {}", target.len(), n);
            } else if !self.reaches(target) {
                warn!("Target {:?} is not reachable from the current order", target);
            }
            for (x, &a) in target.iter().enumerate() {
                for &b in &target[x + 1..] {
                    sink.accumulate(a, b, scale);
                }
            }
        }
    }
}
