use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::data::series::EraCutoff;
use crate::pipeline::ChartKind;

// ---------------------------------------------------------------------------
// Dashboard configuration
// ---------------------------------------------------------------------------

/// Everything the pipelines need, built once at startup and passed by
/// reference. Every field has a default; a JSON file may override any of
/// them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub data_dir: PathBuf,
    pub files: DatasetFiles,
    /// Cutoff for monthly series.
    pub cutoff_date: NaiveDate,
    /// Cutoff for yearly series.
    pub cutoff_year: i32,
    /// Cumulative annotation thresholds, ascending.
    pub milestones: Vec<f64>,
    /// Accepted spellings of a true flag. Matching is exact.
    pub truthy_literals: Vec<String>,
    /// Bar order of the class-year chart.
    pub periods: Vec<String>,
    /// Layer order of the class-year chart.
    pub class_years: Vec<String>,
    /// Mount points present in the host; charts without one are skipped.
    pub mounts: BTreeSet<String>,
    pub filters: FilterControls,
    pub theme: ThemeConfig,
    pub empty_state: EmptyStateMessages,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasetFiles {
    pub cfp_monthly: String,
    pub cfp_position_monthly: String,
    pub ncaa_yearly: String,
    pub ncaa_sport_yearly: String,
    pub class_year: String,
    pub stoplight: String,
}

/// Which optional filter controls exist in the host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterControls {
    pub position: bool,
    pub sport: bool,
}

/// Colours as `#rrggbb` strings; resolved by [`crate::color::Theme`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    pub pre: String,
    pub post: String,
    pub cutoff_line: String,
    pub cumulative: String,
    pub class_years: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmptyStateMessages {
    pub timeline: String,
    pub volume: String,
    pub class_year: String,
    pub filtered: String,
    pub stoplight_unavailable: String,
    pub unavailable: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            files: DatasetFiles::default(),
            cutoff_date: NaiveDate::from_ymd_opt(2021, 7, 1).unwrap_or_default(),
            cutoff_year: 2021,
            milestones: vec![1000.0, 2000.0, 3000.0, 4000.0, 5000.0],
            truthy_literals: vec!["true".into(), "True".into()],
            periods: vec!["Pre-NIL".into(), "Post-NIL".into()],
            class_years: ["Freshman", "Sophomore", "Junior", "Senior"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            mounts: ChartKind::ALL.iter().map(|k| k.mount().to_string()).collect(),
            filters: FilterControls::default(),
            theme: ThemeConfig::default(),
            empty_state: EmptyStateMessages::default(),
        }
    }
}

impl Default for DatasetFiles {
    fn default() -> Self {
        Self {
            cfp_monthly: "cfp_monthly_transfers.csv".into(),
            cfp_position_monthly: "cfp_position_monthly_transfers.csv".into(),
            ncaa_yearly: "ncaa_yearly_transfers.csv".into(),
            ncaa_sport_yearly: "ncaa_sport_yearly_transfers.csv".into(),
            class_year: "class_year_transfers.csv".into(),
            stoplight: "stoplight_class_year_data.json".into(),
        }
    }
}

impl Default for FilterControls {
    fn default() -> Self {
        Self {
            position: true,
            sport: true,
        }
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            pre: "#5cb85c".into(),
            post: "#d9534f".into(),
            cutoff_line: "#c9302c".into(),
            cumulative: "#2c5f8d".into(),
            class_years: vec![
                "#8B7355".into(),
                "#A0826D".into(),
                "#B8956A".into(),
                "#C9A66B".into(),
            ],
        }
    }
}

impl Default for EmptyStateMessages {
    fn default() -> Self {
        Self {
            timeline: "No transfer data available.".into(),
            volume: "No transfer volume data available.".into(),
            class_year: "No class year transfer data available.".into(),
            filtered: "No transfers recorded for this selection.".into(),
            stoplight_unavailable: "Stoplight visualization data not available.".into(),
            unavailable: "Chart data could not be loaded.".into(),
        }
    }
}

impl DashboardConfig {
    /// Read a JSON config file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: DashboardConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            log::info!("Using dashboard config {}", path.display());
            Self::from_path(path)
        } else {
            log::debug!("No config at {}; using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.milestones.windows(2).any(|w| w[0] >= w[1]) {
            bail!("milestones must be strictly ascending: {:?}", self.milestones);
        }
        if self.truthy_literals.is_empty() {
            bail!("truthy_literals must name at least one literal");
        }
        Ok(())
    }

    pub fn dataset_path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    pub fn monthly_cutoff(&self) -> EraCutoff {
        EraCutoff::Date(self.cutoff_date)
    }

    pub fn yearly_cutoff(&self) -> EraCutoff {
        EraCutoff::Year(self.cutoff_year)
    }

    pub fn has_mount(&self, kind: ChartKind) -> bool {
        self.mounts.contains(kind.mount())
    }
}
