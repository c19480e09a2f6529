use crate::reports;
use clap::Args;
use permforge::cell::{BeamCell, BestCell, Cell, CellStorage, FullCell};
use permforge::chart::{build_controller, Chart, ParseController, TrivialCellMap};
use permforge::config::Config;
use permforge::error::PfResult;
use permforge::kbest::KBest;
use permforge::path::PathRef;
use permforge::permutation::Permutation;
use permforge::scorer::{BeforeCost, BeforeScorer};
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct KbestArgs {
    #[command(flatten)]
    pub config: Config,
}

pub fn run(config: &Config, perm: &Permutation, cost: &BeforeCost) -> PfResult<()> {
    let chart_cfg = &config.chart;
    let controller = build_controller(
        chart_cfg.controller,
        chart_cfg.window,
        chart_cfg.max_swap_width,
    );
    let scorer = BeforeScorer::new(cost, perm, &*controller);
    info!(
        "🔍 Extracting {} best reorderings ({} controller, {} cells)",
        chart_cfg.kbest, chart_cfg.controller, chart_cfg.storage
    );

    let k = chart_cfg.kbest;
    let paths = match (chart_cfg.storage, chart_cfg.beam) {
        (CellStorage::Best, None) => extract(perm, &*controller, &scorer, k, BestCell::new),
        (CellStorage::Best, Some(w)) => {
            extract(perm, &*controller, &scorer, k, || BeamCell::new(BestCell::new(), w))
        }
        (CellStorage::Full, None) => extract(perm, &*controller, &scorer, k, FullCell::new),
        (CellStorage::Full, Some(w)) => {
            extract(perm, &*controller, &scorer, k, || BeamCell::new(FullCell::new(), w))
        }
    };

    info!("Found {} distinct reorderings", paths.len());
    reports::print_kbest_table(&paths);
    Ok(())
}

fn extract<C, P, F>(
    perm: &Permutation,
    controller: &P,
    scorer: &BeforeScorer,
    k: usize,
    make_cell: F,
) -> Vec<PathRef>
where
    C: Cell,
    P: ParseController + ?Sized,
    F: Fn() -> C,
{
    let mut chart = Chart::new(perm, &TrivialCellMap, make_cell);
    chart.permute(controller, scorer);
    KBest::new(&chart, controller, scorer).best(k)
}
