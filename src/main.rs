use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use varsity_shifts::color::Theme;
use varsity_shifts::config::DashboardConfig;
use varsity_shifts::pipeline;
use varsity_shifts::render::SummaryRenderer;

#[derive(Debug, Parser)]
#[command(
    name = "varsity-shifts",
    about = "Summarise every transfer-portal chart from the prepared datasets",
    after_help = "Charts whose dataset is missing or malformed are reported as unavailable; the rest still render."
)]
struct Cli {
    /// Directory holding the datasets; overrides `data_dir` from the config.
    #[arg(value_name = "DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[arg(
        long,
        value_name = "PATH",
        help = "Dashboard config JSON [default: <DATA_DIR>/dashboard.json]"
    )]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(|| {
        cli.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("data"))
            .join("dashboard.json")
    });

    let mut config = DashboardConfig::load_or_default(&config_path)?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let theme = Theme::from_config(&config.theme).context("resolving theme colours")?;

    let stdout = std::io::stdout();
    let mut renderer = SummaryRenderer::new(stdout.lock());
    let report = pipeline::run(&config, &theme, &mut renderer)?;

    log::info!(
        "{} charts rendered, {} failed, {} skipped",
        report.rendered.len(),
        report.failed.len(),
        report.skipped.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_dir_and_config_flag() {
        let cli = Cli::try_parse_from(["varsity-shifts", "fixtures", "--config", "alt.json"]).unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("fixtures")));
        assert_eq!(cli.config, Some(PathBuf::from("alt.json")));

        let cli = Cli::try_parse_from(["varsity-shifts"]).unwrap();
        assert!(cli.data_dir.is_none() && cli.config.is_none());
    }
}
