use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use permforge::config::Config;
use permforge::error::{PermForgeError, PfResult};
use permforge::permutation::Permutation;
use permforge::scorer::loader::{load_cost_matrix, parse_order};
use std::process;
use tracing::{error, info, Level};

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pairwise cost matrix (CSV `before,after,cost` or dense JSON)
    #[arg(global = true, short, long, default_value = "data/costs.csv")]
    cost: String,

    /// Starting order, e.g. "2,0,1" (identity if omitted)
    #[arg(global = true, short, long)]
    order: Option<String>,

    /// JSON config; explicit flags override it
    #[arg(global = true, long)]
    config: Option<String>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Search(cmd::search::SearchArgs),
    Kbest(cmd::kbest::KbestArgs),
    Gradient(cmd::gradient::GradientArgs),
}

fn main() {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli, &matches) {
        error!("❌ {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli, matches: &clap::ArgMatches) -> PfResult<()> {
    info!("🚀 Initializing PermForge...");

    let cli_config = match &cli.command {
        Commands::Search(args) => &args.config,
        Commands::Kbest(args) => &args.config,
        Commands::Gradient(args) => &args.config,
    };
    let sub_matches = matches.subcommand().map(|(_, m)| m).unwrap_or(matches);

    let config = match &cli.config {
        Some(path) => {
            info!("⚖️  Loading Config from: {}", path);
            let mut file_config = Config::load_from_file(path)?;
            file_config.merge_from_cli(cli_config, sub_matches);
            file_config
        }
        None => cli_config.clone(),
    };
    config.validate()?;

    let cost = load_cost_matrix(&cli.cost, None)?;
    let perm = match &cli.order {
        Some(s) => Permutation::from_order(parse_order(s)?)?,
        None => Permutation::identity(cost.len()),
    };
    if perm.len() != cost.len() {
        return Err(PermForgeError::SizeMismatch {
            what: "order",
            got: perm.len(),
            expected: cost.len(),
        });
    }

    match &cli.command {
        Commands::Search(_) => cmd::search::run(&config, perm, &cost),
        Commands::Kbest(_) => cmd::kbest::run(&config, &perm, &cost),
        Commands::Gradient(args) => cmd::gradient::run(args, &config, &perm, &cost),
    }
}
