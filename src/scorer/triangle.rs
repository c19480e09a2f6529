/// Flat storage for values keyed by a split triple `begin < middle < end`
/// over a sequence of length `n`.
///
/// Triples are laid out by `end`, then `middle`, then `begin`, so the
/// index is `C(end, 3) + C(middle, 2) + begin` and the table holds
/// exactly `C(n + 1, 3)` entries.
#[derive(Debug, Clone, PartialEq)]
pub struct TripleTable<T = f64> {
    n: usize,
    values: Vec<T>,
}

impl<T: Copy> TripleTable<T> {
    pub fn new(n: usize, fill: T) -> Self {
        Self {
            n,
            values: vec![fill; Self::capacity(n)],
        }
    }

    pub fn capacity(n: usize) -> usize {
        if n < 2 {
            0
        } else {
            (n + 1) * n * (n - 1) / 6
        }
    }

    #[inline(always)]
    pub fn index(begin: usize, middle: usize, end: usize) -> usize {
        debug_assert!(begin < middle && middle < end, "bad triple ({begin},{middle},{end})");
        end * (end - 1) * (end - 2) / 6 + middle * (middle - 1) / 2 + begin
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[inline(always)]
    pub fn get(&self, begin: usize, middle: usize, end: usize) -> T {
        debug_assert!(end <= self.n);
        self.values[Self::index(begin, middle, end)]
    }

    #[inline(always)]
    pub fn set(&mut self, begin: usize, middle: usize, end: usize, value: T) {
        debug_assert!(end <= self.n);
        self.values[Self::index(begin, middle, end)] = value;
    }
}

impl TripleTable<f64> {
    #[inline(always)]
    pub fn add(&mut self, begin: usize, middle: usize, end: usize, value: f64) {
        self.values[Self::index(begin, middle, end)] += value;
    }
}
