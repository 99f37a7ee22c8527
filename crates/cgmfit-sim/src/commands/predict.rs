use std::error::Error;
use std::path::PathBuf;

use cgmfit_core::ParameterVector;
use cgmfit_grid::{ForwardModel, GridTable, DEFAULT_REFERENCE_LOG_METAL};
use clap::Args;

use super::parse_ions;

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// CSV grid table.
    #[arg(long)]
    pub grid: PathBuf,
    /// Comma-separated ions to predict.
    #[arg(long)]
    pub ions: String,
    /// log10 hydrogen density.
    #[arg(long, allow_negative_numbers = true)]
    pub log_nh: f64,
    /// log10 metallicity relative to solar.
    #[arg(long, allow_negative_numbers = true)]
    pub log_z: f64,
    /// Metallicity the grid was computed at.
    #[arg(long, default_value_t = DEFAULT_REFERENCE_LOG_METAL, allow_negative_numbers = true)]
    pub reference_log_metal: f64,
}

pub fn run(args: &PredictArgs) -> Result<(), Box<dyn Error>> {
    let ions = parse_ions(&args.ions);
    let grid = GridTable::load(&args.grid, &ions)?;
    let model = ForwardModel::from_grid(&grid, &ions, args.reference_log_metal)?;
    let theta = ParameterVector::new(args.log_nh, args.log_z);

    println!("ion,column,log_column");
    for (ion, column) in model.predict(theta) {
        println!("{ion},{column:e},{:.4}", column.log10());
    }
    Ok(())
}
