use crate::reports;
use clap::Args;
use permforge::config::Config;
use permforge::error::PfResult;
use permforge::optimizer::{Optimizer, ProgressCallback, SearchOptions};
use permforge::permutation::Permutation;
use permforge::scorer::BeforeCost;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    #[command(flatten)]
    pub config: Config,
}

struct CliLogger;

impl ProgressCallback for CliLogger {
    fn on_progress(&self, iteration: usize, score: f64, _order: &[usize]) -> bool {
        info!("It {:4} | Score: {:.4}", iteration, score);
        true
    }
}

pub fn run(config: &Config, mut perm: Permutation, cost: &BeforeCost) -> PfResult<()> {
    let optimizer = Optimizer::new(SearchOptions::from(config));
    let outcome = optimizer.run(&mut perm, cost, &CliLogger)?;

    info!("=== 🏆 FINAL RESULT ===");
    reports::print_search_report(&outcome, &perm);
    Ok(())
}
