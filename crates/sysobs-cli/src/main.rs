//! CLI for sysobs: did the system change, or only how we observe it?

mod commands;

use clap::{Parser, Subcommand};
use commands::driver::DriverCommandConfig;

#[derive(Parser)]
#[command(name = "sysobs")]
#[command(about = "sysobs: system vs. observer effects via Bayesian model reduction")]
#[command(version = sysobs_core::VERSION)]
struct Cli {
    /// Experiment config JSON (unspecified fields take defaults)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct DriverArgs {
    /// Driver length in samples
    #[arg(long)]
    samples: Option<usize>,

    /// Sampling rate in Hz
    #[arg(long)]
    rate: Option<f64>,

    /// Scene-cut file (seconds, one per row). Takes precedence over --scenes.
    #[arg(long)]
    cuts: Option<String>,

    /// Split the driver into this many evenly spaced scenes
    #[arg(long)]
    scenes: Option<usize>,

    /// Smoothing: none, mean (moving mean), gaussian
    #[arg(long, value_parser = ["none", "mean", "gaussian"])]
    smoothing: Option<String>,

    /// Smoothing window in samples
    #[arg(long, default_value = "5")]
    window: usize,

    /// Add an independent standard-normal noise row
    #[arg(long)]
    noise_channel: bool,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write samples as CSV (`.csv`) or the full result as JSON
    #[arg(long)]
    output: Option<String>,
}

impl DriverArgs {
    fn as_command<'a>(&'a self, config_path: Option<&'a str>) -> DriverCommandConfig<'a> {
        DriverCommandConfig {
            config_path,
            samples: self.samples,
            rate: self.rate,
            cuts: self.cuts.as_deref(),
            scenes: self.scenes,
            smoothing: self.smoothing.as_deref(),
            window: self.window,
            noise_channel: self.noise_channel,
            seed: self.seed,
            output: self.output.as_deref(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize a piecewise-constant, noisy, smoothed scene driver
    Driver {
        #[command(flatten)]
        args: DriverArgs,
    },

    /// Synthesize a driver and simulate two-channel recordings from it
    Simulate {
        #[command(flatten)]
        args: DriverArgs,

        /// Observation-noise log-precision (default: first configured level)
        #[arg(long, allow_negative_numbers = true)]
        log_precision: Option<f64>,
    },

    /// Compare reduced models against one persisted inversion
    Reduce {
        /// Inversion record JSON file
        #[arg(long)]
        record: Option<String>,

        /// Result store directory (with --subject and --log-precision)
        #[arg(long, default_value = "results")]
        store: String,

        /// Subject identifier
        #[arg(long)]
        subject: Option<String>,

        /// Observation-noise log-precision of the record
        #[arg(long, allow_negative_numbers = true)]
        log_precision: Option<i32>,

        /// Write the comparison as JSON
        #[arg(long)]
        output: Option<String>,
    },

    /// Compare reduced models for every subject x noise level in a store
    Batch {
        /// Result store directory
        #[arg(long, default_value = "results")]
        store: String,

        /// Comma-separated subjects (default: config, then every subject in the store)
        #[arg(long)]
        subjects: Option<String>,

        /// Comma-separated log-precisions (default: config noise levels)
        #[arg(long, allow_hyphen_values = true)]
        levels: Option<String>,

        /// Write the full batch report as JSON
        #[arg(long)]
        output: Option<String>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match &cli.command {
        Commands::Driver { args } => commands::driver::run(args.as_command(config)),
        Commands::Simulate {
            args,
            log_precision,
        } => commands::simulate::run(args.as_command(config), *log_precision),
        Commands::Reduce {
            record,
            store,
            subject,
            log_precision,
            output,
        } => commands::reduce::run(commands::reduce::ReduceCommandConfig {
            config_path: config,
            record: record.as_deref(),
            store,
            subject: subject.as_deref(),
            log_precision: *log_precision,
            output: output.as_deref(),
        }),
        Commands::Batch {
            store,
            subjects,
            levels,
            output,
        } => commands::batch::run(commands::batch::BatchCommandConfig {
            config_path: config,
            store,
            subjects: subjects.as_deref(),
            levels: levels.as_deref(),
            output: output.as_deref(),
        }),
    }
}
