//! Which split points a chart may use.
//!
//! A controller restricts the `(begin, middle, end)` triples considered by
//! the chart, the scorer and the gradient charts alike. All spans are
//! half-open and measured in positions of the current permutation.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// How [`BeforeScorer`](crate::scorer::BeforeScorer) derives a triple
/// from narrower ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    /// Grow by one item on the right, correct with the inner triples.
    Telescoping,
    /// Span touches position 0: grow on the right using a column sum.
    AnchorLeft,
    /// Span touches position `n`: grow on the left using a row sum.
    AnchorRight,
}

pub trait ParseController {
    fn allows(&self, begin: usize, middle: usize, end: usize, n: usize) -> bool;

    /// Allowed split points of `[begin, end)`, ascending.
    fn midpoints(&self, begin: usize, end: usize, n: usize) -> Vec<usize> {
        ((begin + 1)..end)
            .filter(|&m| self.allows(begin, m, end, n))
            .collect()
    }

    fn allows_swap(&self, _begin: usize, _middle: usize, _end: usize, _n: usize) -> bool {
        true
    }

    fn recurrence(&self, _begin: usize, _middle: usize, _end: usize, _n: usize) -> Recurrence {
        Recurrence::Telescoping
    }
}

impl<C: ParseController + ?Sized> ParseController for Box<C> {
    fn allows(&self, begin: usize, middle: usize, end: usize, n: usize) -> bool {
        (**self).allows(begin, middle, end, n)
    }

    fn midpoints(&self, begin: usize, end: usize, n: usize) -> Vec<usize> {
        (**self).midpoints(begin, end, n)
    }

    fn allows_swap(&self, begin: usize, middle: usize, end: usize, n: usize) -> bool {
        (**self).allows_swap(begin, middle, end, n)
    }

    fn recurrence(&self, begin: usize, middle: usize, end: usize, n: usize) -> Recurrence {
        (**self).recurrence(begin, middle, end, n)
    }
}

/// Every split of every span.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cubic;

impl ParseController for Cubic {
    #[inline]
    fn allows(&self, _begin: usize, _middle: usize, _end: usize, _n: usize) -> bool {
        true
    }
}

/// Splits where at least one side is at most `width` items wide.
#[derive(Debug, Clone, Copy)]
pub struct Quadratic {
    width: usize,
}

impl Quadratic {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }
}

impl ParseController for Quadratic {
    #[inline]
    fn allows(&self, begin: usize, middle: usize, end: usize, _n: usize) -> bool {
        middle - begin <= self.width || end - middle <= self.width
    }

    fn midpoints(&self, begin: usize, end: usize, _n: usize) -> Vec<usize> {
        let low = (begin + self.width).min(end - 1);
        let high = end.saturating_sub(self.width).max(low + 1);
        ((begin + 1)..=low).chain(high..end).collect()
    }
}

/// Spans starting at position 0 may split anywhere.
#[derive(Debug, Clone, Copy)]
pub struct AnchorLeft<C> {
    inner: C,
}

impl<C: ParseController> AnchorLeft<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: ParseController> ParseController for AnchorLeft<C> {
    fn allows(&self, begin: usize, middle: usize, end: usize, n: usize) -> bool {
        begin == 0 || self.inner.allows(begin, middle, end, n)
    }

    fn midpoints(&self, begin: usize, end: usize, n: usize) -> Vec<usize> {
        if begin == 0 {
            ((begin + 1)..end).collect()
        } else {
            self.inner.midpoints(begin, end, n)
        }
    }

    fn allows_swap(&self, begin: usize, middle: usize, end: usize, n: usize) -> bool {
        self.inner.allows_swap(begin, middle, end, n)
    }

    fn recurrence(&self, begin: usize, middle: usize, end: usize, n: usize) -> Recurrence {
        if begin == 0 {
            Recurrence::AnchorLeft
        } else {
            self.inner.recurrence(begin, middle, end, n)
        }
    }
}

/// Spans ending at position `n` may split anywhere.
#[derive(Debug, Clone, Copy)]
pub struct AnchorRight<C> {
    inner: C,
}

impl<C: ParseController> AnchorRight<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: ParseController> ParseController for AnchorRight<C> {
    fn allows(&self, begin: usize, middle: usize, end: usize, n: usize) -> bool {
        end == n || self.inner.allows(begin, middle, end, n)
    }

    fn midpoints(&self, begin: usize, end: usize, n: usize) -> Vec<usize> {
        if end == n {
            ((begin + 1)..end).collect()
        } else {
            self.inner.midpoints(begin, end, n)
        }
    }

    fn allows_swap(&self, begin: usize, middle: usize, end: usize, n: usize) -> bool {
        self.inner.allows_swap(begin, middle, end, n)
    }

    fn recurrence(&self, begin: usize, middle: usize, end: usize, n: usize) -> Recurrence {
        if end == n {
            Recurrence::AnchorRight
        } else {
            self.inner.recurrence(begin, middle, end, n)
        }
    }
}

/// Forbids swaps where either side is wider than `max_width`.
#[derive(Debug, Clone, Copy)]
pub struct DistortionLimit<C> {
    inner: C,
    max_width: usize,
}

impl<C: ParseController> DistortionLimit<C> {
    pub fn new(inner: C, max_width: usize) -> Self {
        Self { inner, max_width }
    }
}

impl<C: ParseController> ParseController for DistortionLimit<C> {
    fn allows(&self, begin: usize, middle: usize, end: usize, n: usize) -> bool {
        self.inner.allows(begin, middle, end, n)
    }

    fn midpoints(&self, begin: usize, end: usize, n: usize) -> Vec<usize> {
        self.inner.midpoints(begin, end, n)
    }

    fn allows_swap(&self, begin: usize, middle: usize, end: usize, n: usize) -> bool {
        middle - begin <= self.max_width
            && end - middle <= self.max_width
            && self.inner.allows_swap(begin, middle, end, n)
    }

    fn recurrence(&self, begin: usize, middle: usize, end: usize, n: usize) -> Recurrence {
        self.inner.recurrence(begin, middle, end, n)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    #[default]
    Cubic,
    Quadratic,
    AnchoredLeft,
    AnchoredRight,
    AnchoredBoth,
}

/// Builds the controller named by `kind`. `window` is the quadratic width
/// used by every non-cubic kind; `max_swap_width` optionally wraps the
/// result in a [`DistortionLimit`].
pub fn build_controller(
    kind: ControllerKind,
    window: usize,
    max_swap_width: Option<usize>,
) -> Box<dyn ParseController + Send + Sync> {
    let q = Quadratic::new(window);
    match (kind, max_swap_width) {
        (ControllerKind::Cubic, None) => Box::new(Cubic),
        (ControllerKind::Quadratic, None) => Box::new(q),
        (ControllerKind::AnchoredLeft, None) => Box::new(AnchorLeft::new(q)),
        (ControllerKind::AnchoredRight, None) => Box::new(AnchorRight::new(q)),
        (ControllerKind::AnchoredBoth, None) => Box::new(AnchorRight::new(AnchorLeft::new(q))),
        (ControllerKind::Cubic, Some(w)) => Box::new(DistortionLimit::new(Cubic, w)),
        (ControllerKind::Quadratic, Some(w)) => Box::new(DistortionLimit::new(q, w)),
        (ControllerKind::AnchoredLeft, Some(w)) => {
            Box::new(DistortionLimit::new(AnchorLeft::new(q), w))
        }
        (ControllerKind::AnchoredRight, Some(w)) => {
            Box::new(DistortionLimit::new(AnchorRight::new(q), w))
        }
        (ControllerKind::AnchoredBoth, Some(w)) => Box::new(DistortionLimit::new(
            AnchorRight::new(AnchorLeft::new(q)),
            w,
        )),
    }
}
