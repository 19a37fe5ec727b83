use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use varsity_shifts::config::DashboardConfig;
use varsity_shifts::data::export::{export_cfp, export_ncaa};

#[derive(Debug, Parser)]
#[command(
    name = "export_data",
    about = "Build the chart datasets from the raw transfer sources",
    long_about = "Count the per-transfer college-football portal export by month and position, and reshape the NCAA yearly table (one column per year and level) into yearly and per-sport totals.",
    after_help = "Output file names come from the dashboard config; a failed portal export is logged and the NCAA export still runs."
)]
struct Cli {
    #[arg(
        long,
        value_name = "PATH",
        help = "Per-transfer portal export with transfer_date and position columns"
    )]
    cfp: Option<PathBuf>,

    #[arg(
        long,
        value_name = "PATH",
        help = "NCAA yearly table with a Sport column and one column per year and level"
    )]
    ncaa: Option<PathBuf>,

    #[arg(long = "out-dir", value_name = "DIR", help = "Overrides data_dir from the config")]
    out_dir: Option<PathBuf>,

    #[arg(long, value_name = "PATH", help = "Dashboard config JSON")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.cfp.is_none() && cli.ncaa.is_none() {
        bail!("nothing to export: pass --cfp and/or --ncaa");
    }

    let mut config = match &cli.config {
        Some(path) => DashboardConfig::from_path(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(dir) = cli.out_dir {
        config.data_dir = dir;
    }
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating {}", config.data_dir.display()))?;

    if let Some(source) = &cli.cfp {
        match export_cfp(source, &config) {
            Ok(counts) => log::info!(
                "Exported {} position-month and {} month rows ({} rows dropped)",
                counts.by_position.len(),
                counts.monthly.len(),
                counts.dropped
            ),
            Err(e) => log::error!("portal export failed, continuing with NCAA data: {e:#}"),
        }
    }

    if let Some(source) = &cli.ncaa {
        let yearly = export_ncaa(source, &config)?;
        if let (Some(first), Some(last)) = (yearly.first(), yearly.last()) {
            log::info!(
                "Exported {} yearly records ({} to {})",
                yearly.len(),
                first.year,
                last.year
            );
        }
    }

    Ok(())
}
