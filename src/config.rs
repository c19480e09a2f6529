use crate::cell::CellStorage;
use crate::chart::ControllerKind;
use crate::consts::{DEFAULT_KBEST, DEFAULT_MAX_ITERATIONS, DEFAULT_MIN_IMPROVEMENT, DEFAULT_WINDOW};
use crate::error::{PermForgeError, PfResult};
use crate::gradient::Objective;
use clap::{parser::ValueSource, ArgMatches, Args};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Args, Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[command(flatten)]
    #[serde(default)]
    pub search: SearchParams,
    #[command(flatten)]
    #[serde(default)]
    pub chart: ChartParams,
    #[command(flatten)]
    #[serde(default)]
    pub gradient: GradientParams,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchParams {
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: usize,
    #[arg(long, default_value_t = DEFAULT_MIN_IMPROVEMENT)]
    pub min_improvement: f64,
    /// Extra runs from shuffled starting orders
    #[arg(long, default_value_t = 0)]
    pub restarts: usize,
    #[arg(long)]
    pub seed: Option<u64>,
    /// Worker threads for batch and restart runs (0 = rayon default)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            min_improvement: DEFAULT_MIN_IMPROVEMENT,
            restarts: 0,
            seed: None,
            threads: 0,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChartParams {
    #[arg(long, default_value = "cubic")]
    pub controller: ControllerKind,
    /// Quadratic window for non-cubic controllers
    #[arg(long, default_value_t = DEFAULT_WINDOW)]
    pub window: usize,
    #[arg(long)]
    pub max_swap_width: Option<usize>,
    #[arg(long, default_value = "best")]
    pub storage: CellStorage,
    /// Drop paths scoring this far below their cell's best
    #[arg(long)]
    pub beam: Option<f64>,
    #[arg(long, default_value_t = DEFAULT_KBEST)]
    pub kbest: usize,
}

impl Default for ChartParams {
    fn default() -> Self {
        Self {
            controller: ControllerKind::Cubic,
            window: DEFAULT_WINDOW,
            max_swap_width: None,
            storage: CellStorage::Best,
            beam: None,
            kbest: DEFAULT_KBEST,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GradientParams {
    #[arg(long, default_value = "likelihood")]
    pub objective: Objective,
    /// Multiplier applied to every emitted gradient
    #[arg(long, default_value_t = 1.0)]
    pub scale: f64,
}

impl Default for GradientParams {
    fn default() -> Self {
        Self {
            objective: Objective::Likelihood,
            scale: 1.0,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> PfResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PfResult<()> {
        if self.chart.window == 0 {
            return Err(PermForgeError::Config("window must be at least 1".into()));
        }
        if let Some(beam) = self.chart.beam {
            if !(beam >= 0.0) {
                return Err(PermForgeError::Config(format!(
                    "beam must be non-negative, got {}",
                    beam
                )));
            }
        }
        if !self.search.min_improvement.is_finite() || !self.gradient.scale.is_finite() {
            return Err(PermForgeError::Config(
                "min_improvement and scale must be finite".into(),
            ));
        }
        Ok(())
    }

    /// Copies onto `self` only the values the user typed on the command line.
    pub fn merge_from_cli(&mut self, cli: &Config, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($section:ident, $field:ident) => {
                if matches.value_source(stringify!($field)) == Some(ValueSource::CommandLine) {
                    self.$section.$field = cli.$section.$field.clone();
                }
            };
        }

        update_if_present!(search, max_iterations);
        update_if_present!(search, min_improvement);
        update_if_present!(search, restarts);
        update_if_present!(search, seed);
        update_if_present!(search, threads);

        update_if_present!(chart, controller);
        update_if_present!(chart, window);
        update_if_present!(chart, max_swap_width);
        update_if_present!(chart, storage);
        update_if_present!(chart, beam);
        update_if_present!(chart, kbest);

        update_if_present!(gradient, objective);
        update_if_present!(gradient, scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, FromArgMatches, Parser};

    #[derive(Parser, Debug)]
    struct Cli {
        #[command(flatten)]
        config: Config,
    }

    #[test]
    fn test_clap_defaults_match_default_impl() {
        let cli = Cli::try_parse_from(["permforge"]).unwrap();
        assert_eq!(cli.config, Config::default());
    }

    #[test]
    fn test_merge_only_takes_explicit_flags() {
        let matches = Cli::command()
            .try_get_matches_from(["permforge", "--window", "5", "--controller", "quadratic"])
            .unwrap();
        let cli = Cli::from_arg_matches(&matches).unwrap();

        let mut base = Config::default();
        base.search.max_iterations = 7;
        base.merge_from_cli(&cli.config, &matches);

        assert_eq!(base.chart.window, 5);
        assert_eq!(base.chart.controller, ControllerKind::Quadratic);
        assert_eq!(base.search.max_iterations, 7);
    }
}
