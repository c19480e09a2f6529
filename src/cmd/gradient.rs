use crate::reports;
use clap::Args;
use permforge::chart::build_controller;
use permforge::config::Config;
use permforge::error::{PermForgeError, PfResult};
use permforge::gradient::{AdjacencyChart, LikelihoodChart, Objective};
use permforge::permutation::Permutation;
use permforge::scorer::loader::parse_order;
use permforge::scorer::{BeforeCost, BeforeScorer};
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct GradientArgs {
    #[command(flatten)]
    pub config: Config,

    /// Reference order for the likelihood objective, e.g. "1,0,2"
    #[arg(long)]
    pub target: Option<String>,
}

pub fn run(
    args: &GradientArgs,
    config: &Config,
    perm: &Permutation,
    cost: &BeforeCost,
) -> PfResult<()> {
    let chart_cfg = &config.chart;
    let controller = build_controller(
        chart_cfg.controller,
        chart_cfg.window,
        chart_cfg.max_swap_width,
    );
    let scorer = BeforeScorer::new(cost, perm, &*controller);
    let scale = config.gradient.scale;
    let mut gradient = BeforeCost::new(cost.len());

    info!("📐 Computing {} gradient", config.gradient.objective);
    match config.gradient.objective {
        Objective::Likelihood => {
            let target = args.target.as_deref().map(parse_order).transpose()?;
            if let Some(t) = &target {
                if t.len() != cost.len() {
                    return Err(PermForgeError::SizeMismatch {
                        what: "target",
                        got: t.len(),
                        expected: cost.len(),
                    });
                }
            }
            let chart = LikelihoodChart::new(&scorer, &*controller);
            chart.gradient_into(target.as_deref(), scale, &mut gradient);

            let mut summary = vec![("log Z", chart.log_z())];
            if let Some(t) = &target {
                let reachable = chart.reaches(t);
                summary.push(("Reachable", if reachable { 1.0 } else { 0.0 }));
                if reachable {
                    summary.push(("log-likelihood", chart.log_likelihood(cost, t)));
                }
            }
            reports::print_gradient_report(&summary, &gradient);
        }
        Objective::Adjacency => {
            if args.target.is_some() {
                return Err(PermForgeError::Config(
                    "--target only applies to the likelihood objective".into(),
                ));
            }
            let chart = AdjacencyChart::new(&scorer, &*controller);
            chart.gradient_into(scale, &mut gradient);
            let summary = [
                ("log Z", chart.log_z()),
                ("Expected preserved", chart.expected_preserved()),
                ("Expected loss", chart.expected_loss()),
            ];
            reports::print_gradient_report(&summary, &gradient);
        }
    }
    Ok(())
}
