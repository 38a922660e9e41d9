use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "evocluster - genetic-algorithm global optimization of molecular cluster geometries.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a global optimization of the cluster described in a configuration file.
    Run(RunArgs),
    /// Check an XYZ structure for collisions and dissociation.
    Check(CheckArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the search configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Path for the best geometry in XYZ format. With `--keep` above one, further geometries
    /// are written next to it with a rank suffix.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Write the genealogy of every offered candidate to this CSV file.
    #[arg(long, value_name = "PATH")]
    pub history: Option<PathBuf>,

    /// Number of best geometries to write.
    #[arg(short, long, value_name = "INT")]
    pub keep: Option<usize>,

    /// Override the random seed from the config file.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Override the number of global optimization steps.
    #[arg(short = 'n', long, value_name = "INT")]
    pub iterations: Option<usize>,

    /// Override the pool size.
    #[arg(long, value_name = "INT")]
    pub pool_size: Option<usize>,

    /// Relax candidates with local heat pulses on top of the plain local optimizer.
    #[arg(long)]
    pub heat_pulses: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S pool.size=50
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the structure in XYZ format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Atoms per molecule, in file order. Defaults to one atom per molecule.
    #[arg(short, long, value_name = "INT", value_delimiter = ',')]
    pub molecules: Vec<usize>,

    /// Collision blow factor.
    #[arg(long, value_name = "FLOAT", default_value_t = 1.2)]
    pub collision_blow: f64,

    /// Dissociation blow factor.
    #[arg(long, value_name = "FLOAT", default_value_t = 3.0)]
    pub dissociation_blow: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_arguments_parse_with_overrides() {
        let cli = Cli::try_parse_from([
            "evocluster",
            "-vv",
            "run",
            "-c",
            "search.toml",
            "-o",
            "best.xyz",
            "--seed",
            "9",
            "-S",
            "pool.size=12",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.seed, Some(9));
        assert_eq!(args.set_values, vec!["pool.size=12".to_string()]);
        assert!(!args.heat_pulses);
    }

    #[test]
    fn check_arguments_split_molecule_sizes() {
        let cli =
            Cli::try_parse_from(["evocluster", "check", "-i", "w.xyz", "-m", "3,3,1"]).unwrap();
        let Commands::Check(args) = cli.command else {
            panic!("expected check command");
        };
        assert_eq!(args.molecules, vec![3, 3, 1]);
        assert_eq!(args.collision_blow, 1.2);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["evocluster", "-q", "-v", "check", "-i", "a.xyz"]);
        assert!(result.is_err());
    }
}
