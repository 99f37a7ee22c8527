use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    density::{self, DensityArgs},
    fit::{self, FitArgs},
    predict::{self, PredictArgs},
    version::{self, VersionArgs},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "cgmfit", about = "Density and metallicity inference for CGM absorbers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sample the posterior described by a YAML configuration.
    Fit(FitArgs),
    /// Least-squares density scan at the grid metallicity.
    Density(DensityArgs),
    /// Print model column densities at one parameter point.
    Predict(PredictArgs),
    /// Print the tool version.
    Version(VersionArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Fit(args) => fit::run(&args),
        Command::Density(args) => density::run(&args),
        Command::Predict(args) => predict::run(&args),
        Command::Version(args) => version::run(&args),
    }
}
