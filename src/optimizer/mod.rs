pub mod runner;

pub use self::runner::{
    Optimizer, Problem, ProgressCallback, SearchOptions, SearchOutcome, Silent,
};

use crate::cell::{BeamCell, BestCell, Cell, CellStorage, FullCell};
use crate::chart::{build_controller, Chart, ParseController, TrivialCellMap};
use crate::path::PathRef;
use crate::permutation::Permutation;
use crate::scorer::{BeforeCost, BeforeScorer};
use tracing::{debug, info};

/// Repeated ITG neighbourhood search: permute, take the best path, reorder,
/// until no path beats the current order.
pub struct LocalSearch {
    controller: Box<dyn ParseController + Send + Sync>,
    storage: CellStorage,
    beam: Option<f64>,
    max_iterations: usize,
    min_improvement: f64,
}

impl LocalSearch {
    pub fn new(options: &SearchOptions) -> Self {
        Self {
            controller: build_controller(
                options.controller,
                options.window,
                options.max_swap_width,
            ),
            storage: options.storage,
            beam: options.beam,
            max_iterations: options.max_iterations,
            min_improvement: options.min_improvement,
        }
    }

    pub fn controller(&self) -> &(dyn ParseController + Send + Sync) {
        &*self.controller
    }

    pub fn run(&self, perm: &mut Permutation, cost: &BeforeCost) -> SearchOutcome {
        self.run_with(perm, cost, &Silent)
    }

    pub fn run_with<CB: ProgressCallback + ?Sized>(
        &self,
        perm: &mut Permutation,
        cost: &BeforeCost,
        callback: &CB,
    ) -> SearchOutcome {
        let initial_score = perm.score_under(cost);
        let mut current = initial_score;
        let mut trajectory = vec![initial_score];
        let mut iterations = 0;

        while iterations < self.max_iterations {
            let Some(best) = self.best_path(perm, cost) else {
                break;
            };
            if best.score() <= current + self.min_improvement {
                debug!("No improving path ({:.6} <= {:.6})", best.score(), current);
                break;
            }
            perm.reorder(&best);
            if !perm.changed() {
                break;
            }
            current = best.score();
            iterations += 1;
            trajectory.push(current);
            info!("Iteration {}: score {:.6}", iterations, current);
            if !callback.on_progress(iterations, current, perm.order()) {
                break;
            }
        }

        SearchOutcome {
            iterations,
            initial_score,
            final_score: current,
            trajectory,
            order: perm.order().to_vec(),
        }
    }

    /// Best reordering reachable in one chart pass from `perm`.
    pub fn best_path(&self, perm: &Permutation, cost: &BeforeCost) -> Option<PathRef> {
        match (self.storage, self.beam) {
            (CellStorage::Best, None) => self.step(perm, cost, BestCell::new),
            (CellStorage::Best, Some(w)) => self.step(perm, cost, || BeamCell::new(BestCell::new(), w)),
            (CellStorage::Full, None) => self.step(perm, cost, FullCell::new),
            (CellStorage::Full, Some(w)) => self.step(perm, cost, || BeamCell::new(FullCell::new(), w)),
        }
    }

    fn step<C: Cell, F: Fn() -> C>(
        &self,
        perm: &Permutation,
        cost: &BeforeCost,
        make_cell: F,
    ) -> Option<PathRef> {
        let controller = self.controller();
        let scorer = BeforeScorer::new(cost, perm, controller);
        let mut chart = Chart::new(perm, &TrivialCellMap, make_cell);
        chart.permute(controller, &scorer);
        chart.best_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_a_fixed_point_when_costs_favour_it() {
        let cost = BeforeCost::from_fn(4, |i, j| if i < j { 1.0 } else { 0.0 });
        let mut perm = Permutation::identity(4);
        let search = LocalSearch::new(&SearchOptions::builder().build());
        let out = search.run(&mut perm, &cost);
        assert_eq!(out.iterations, 0);
        assert_eq!(out.final_score, 6.0);
        assert_eq!(perm.order(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_reverses_when_costs_favour_reverse() {
        let cost = BeforeCost::from_fn(5, |i, j| if i > j { 1.0 } else { 0.0 });
        let mut perm = Permutation::identity(5);
        let search = LocalSearch::new(&SearchOptions::builder().build());
        let out = search.run(&mut perm, &cost);
        assert_eq!(out.iterations, 1);
        assert_eq!(perm.order(), &[4, 3, 2, 1, 0]);
        assert_eq!(out.trajectory, vec![0.0, 10.0]);
    }
}
