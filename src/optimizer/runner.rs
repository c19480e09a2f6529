use crate::cell::CellStorage;
use crate::chart::ControllerKind;
use crate::config::Config;
use crate::consts::{DEFAULT_MAX_ITERATIONS, DEFAULT_MIN_IMPROVEMENT, DEFAULT_WINDOW};
use crate::error::{PermForgeError, PfResult};
use crate::optimizer::LocalSearch;
use crate::permutation::Permutation;
use crate::scorer::BeforeCost;
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, TypedBuilder)]
pub struct SearchOptions {
    #[builder(default = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: usize,
    #[builder(default = DEFAULT_MIN_IMPROVEMENT)]
    pub min_improvement: f64,
    #[builder(default)]
    pub controller: ControllerKind,
    #[builder(default = DEFAULT_WINDOW)]
    pub window: usize,
    #[builder(default, setter(strip_option))]
    pub max_swap_width: Option<usize>,
    #[builder(default)]
    pub storage: CellStorage,
    #[builder(default, setter(strip_option))]
    pub beam: Option<f64>,
    #[builder(default)]
    pub restarts: usize,
    #[builder(default, setter(strip_option))]
    pub seed: Option<u64>,
    #[builder(default)]
    pub threads: usize,
}

impl From<&Config> for SearchOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            max_iterations: cfg.search.max_iterations,
            min_improvement: cfg.search.min_improvement,
            controller: cfg.chart.controller,
            window: cfg.chart.window,
            max_swap_width: cfg.chart.max_swap_width,
            storage: cfg.chart.storage,
            beam: cfg.chart.beam,
            restarts: cfg.search.restarts,
            seed: cfg.search.seed,
            threads: cfg.search.threads,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    /// Improving steps taken.
    pub iterations: usize,
    pub initial_score: f64,
    pub final_score: f64,
    /// Score after each step, starting with the initial one.
    pub trajectory: Vec<f64>,
    pub order: Vec<usize>,
}

/// Receives an update after every improving step.
/// Returning `false` stops the search.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, iteration: usize, score: f64, order: &[usize]) -> bool;
}

/// No-op callback.
pub struct Silent;

impl ProgressCallback for Silent {
    fn on_progress(&self, _iteration: usize, _score: f64, _order: &[usize]) -> bool {
        true
    }
}

/// One independent search problem.
#[derive(Debug, Clone)]
pub struct Problem {
    pub cost: BeforeCost,
    pub permutation: Permutation,
}

pub struct Optimizer {
    search: LocalSearch,
    options: SearchOptions,
}

impl Optimizer {
    pub fn new(options: SearchOptions) -> Self {
        Self {
            search: LocalSearch::new(&options),
            options,
        }
    }

    pub fn search(&self) -> &LocalSearch {
        &self.search
    }

    /// Local search from the permutation's current order, plus
    /// `restarts` runs from shuffled orders. Leaves the best order found in
    /// `perm`.
    pub fn run<CB: ProgressCallback>(
        &self,
        perm: &mut Permutation,
        cost: &BeforeCost,
        callback: &CB,
    ) -> PfResult<SearchOutcome> {
        let mut best = self.search.run_with(perm, cost, callback);
        if self.options.restarts == 0 {
            return Ok(best);
        }

        let n = perm.len();
        let seed = self.options.seed;
        let starts: Vec<Vec<usize>> = (0..self.options.restarts)
            .map(|i| {
                let mut rng = match seed {
                    Some(s) => fastrand::Rng::with_seed(s.wrapping_add(i as u64)),
                    None => fastrand::Rng::new(),
                };
                let mut order: Vec<usize> = (0..n).collect();
                rng.shuffle(&mut order);
                order
            })
            .collect();

        let outcomes = self.install(|| {
            starts
                .into_par_iter()
                .map(|order| -> PfResult<SearchOutcome> {
                    let mut p = Permutation::from_order(order)?;
                    Ok(self.search.run_with(&mut p, cost, callback))
                })
                .collect::<PfResult<Vec<_>>>()
        })??;

        for outcome in outcomes {
            if outcome.final_score > best.final_score + self.options.min_improvement {
                best = outcome;
            }
        }
        info!(
            "🏁 Best of {} starts: {:.4}",
            self.options.restarts + 1,
            best.final_score
        );
        perm.assign(&best.order)?;
        Ok(best)
    }

    /// Runs every problem independently, in parallel.
    pub fn run_batch(&self, problems: &mut [Problem]) -> PfResult<Vec<SearchOutcome>> {
        let outcomes = self.install(|| {
            problems
                .par_iter_mut()
                .map(|p| self.search.run_with(&mut p.permutation, &p.cost, &Silent))
                .collect::<Vec<_>>()
        })?;
        let total: f64 = outcomes.iter().map(|o| o.final_score - o.initial_score).sum();
        info!("Batch of {} problems, total gain {:.4}", outcomes.len(), total);
        Ok(outcomes)
    }

    fn install<R: Send, F: FnOnce() -> R + Send>(&self, f: F) -> PfResult<R> {
        if self.options.threads == 0 {
            return Ok(f());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.threads)
            .build()
            .map_err(|e| PermForgeError::Config(format!("thread pool: {}", e)))?;
        Ok(pool.install(f))
    }
}
