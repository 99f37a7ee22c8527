use std::error::Error;
use std::path::PathBuf;

use cgmfit_grid::{find_density, GridTable, Observation};
use clap::Args;

use super::parse_ions;

#[derive(Args, Debug)]
pub struct DensityArgs {
    /// CSV grid table.
    #[arg(long)]
    pub grid: PathBuf,
    /// Observation CSV with `ion,column,sigma` rows.
    #[arg(long)]
    pub observed: PathBuf,
    /// Comma-separated ions to compare.
    #[arg(long)]
    pub ions: String,
    /// Print the residual at every grid density.
    #[arg(long)]
    pub table: bool,
}

pub fn run(args: &DensityArgs) -> Result<(), Box<dyn Error>> {
    let ions = parse_ions(&args.ions);
    let grid = GridTable::load(&args.grid, &ions)?;
    let observation = Observation::load_csv(&args.observed)?;
    let scan = find_density(&grid, &observation, &ions)?;

    if args.table {
        println!("hden,residual");
        for (hden, residual) in scan.hden.iter().zip(&scan.residuals) {
            println!("{hden:e},{residual:e}");
        }
    }
    println!(
        "best hden = {:e} (log nH = {:.3}), residual = {:e}",
        scan.best_hden,
        scan.best_hden.log10(),
        scan.best_residual
    );
    Ok(())
}
