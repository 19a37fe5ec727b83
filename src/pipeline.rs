//! Per-chart pipelines: load → normalise → aggregate → build → render.
//!
//! Each chart runs independently; a failure in one is logged, reported to the
//! renderer as unavailable, and does not affect the others.

use std::fmt;

use anyhow::{Context, Result};

use crate::color::Theme;
use crate::config::DashboardConfig;
use crate::data::aggregate::{GroupRanking, Reducer, bucket_by_time};
use crate::data::loader::load_file;
use crate::data::model::{RecordSchema, TypedRecord};
use crate::data::normalize::normalize;
use crate::data::series::{CumulativeSeries, EraCutoff, EraRates, Milestone, Series, build_series};
use crate::data::stack::{StackedBars, stack};
use crate::render::{Frame, Renderer};
use crate::state::{HoverDetail, TimelineState, cumulative_hover};
use crate::stoplight::{StoplightPanel, derive_panel, load_stoplight};

// ---------------------------------------------------------------------------
// Chart catalogue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    CfpTimeline,
    NcaaTimeline,
    Volume,
    PositionTimeline,
    SportTimeline,
    ClassYear,
    Stoplight,
}

impl ChartKind {
    pub const ALL: [ChartKind; 7] = [
        ChartKind::CfpTimeline,
        ChartKind::NcaaTimeline,
        ChartKind::Volume,
        ChartKind::PositionTimeline,
        ChartKind::SportTimeline,
        ChartKind::ClassYear,
        ChartKind::Stoplight,
    ];

    /// Identifier of the host element the chart draws into.
    pub fn mount(&self) -> &'static str {
        match self {
            ChartKind::CfpTimeline => "cfp-chart-area",
            ChartKind::NcaaTimeline => "ncaa-chart-area",
            ChartKind::Volume => "volume-chart-area",
            ChartKind::PositionTimeline => "position-chart-area",
            ChartKind::SportTimeline => "sport-chart-area",
            ChartKind::ClassYear => "class-year-chart-area",
            ChartKind::Stoplight => "stoplight-container",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::CfpTimeline => "College football transfers by month",
            ChartKind::NcaaTimeline => "NCAA transfers by year",
            ChartKind::Volume => "Cumulative transfer growth",
            ChartKind::PositionTimeline => "Transfers by position",
            ChartKind::SportTimeline => "Transfers by sport",
            ChartKind::ClassYear => "Transfers by class year",
            ChartKind::Stoplight => "Class-year stoplight",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mount())
    }
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Load one dataset and coerce it with `schema`.
pub fn load_records(config: &DashboardConfig, file: &str, schema: &RecordSchema) -> Result<Vec<TypedRecord>> {
    let path = config.dataset_path(file);
    let table = load_file(&path)?;
    let normalized = normalize(&table, schema, &config.truthy_literals)
        .with_context(|| format!("validating {}", path.display()))?;
    Ok(normalized.records)
}

/// Sum rows sharing a time bucket, then sort and partition.
fn timeline(records: &[TypedRecord], cutoff: &EraCutoff) -> Series {
    let buckets = bucket_by_time(records, Reducer::Sum);
    build_series(buckets.into_iter().map(TypedRecord::from), cutoff)
}

pub fn cfp_timeline(config: &DashboardConfig) -> Result<Series> {
    let records = load_records(config, &config.files.cfp_monthly, &RecordSchema::cfp_monthly())?;
    Ok(timeline(&records, &config.monthly_cutoff()))
}

pub fn ncaa_timeline(config: &DashboardConfig) -> Result<Series> {
    let records = load_records(config, &config.files.ncaa_yearly, &RecordSchema::ncaa_yearly())?;
    Ok(timeline(&records, &config.yearly_cutoff()))
}

/// Cumulative growth chart data.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeView {
    pub cumulative: CumulativeSeries,
    pub milestones: Vec<Milestone>,
    pub rates: EraRates,
}

impl VolumeView {
    pub fn from_series(series: &Series, thresholds: &[f64]) -> Self {
        let cumulative = series.cumulative();
        let milestones = cumulative.milestones(thresholds);
        VolumeView {
            milestones,
            rates: series.era_rates(),
            cumulative,
        }
    }

    pub fn hover(&self, index: usize) -> Option<HoverDetail> {
        cumulative_hover(&self.cumulative, &self.rates, index)
    }
}

pub fn volume(config: &DashboardConfig) -> Result<VolumeView> {
    let series = cfp_timeline(config)?;
    Ok(VolumeView::from_series(&series, &config.milestones))
}

pub fn position_state(config: &DashboardConfig) -> Result<TimelineState> {
    let records = load_records(
        config,
        &config.files.cfp_position_monthly,
        &RecordSchema::cfp_position_monthly(),
    )?;
    let ranking = config.filters.position.then_some(GroupRanking::ByTotalDesc);
    Ok(TimelineState::new(records, config.monthly_cutoff(), ranking))
}

pub fn sport_state(config: &DashboardConfig) -> Result<TimelineState> {
    let records = load_records(
        config,
        &config.files.ncaa_sport_yearly,
        &RecordSchema::ncaa_sport_yearly(),
    )?;
    let ranking = config.filters.sport.then_some(GroupRanking::Lexical);
    Ok(TimelineState::new(records, config.yearly_cutoff(), ranking))
}

pub fn class_year(config: &DashboardConfig) -> Result<StackedBars> {
    let records = load_records(config, &config.files.class_year, &RecordSchema::class_year())?;
    Ok(stack(&records, &config.periods, &config.class_years))
}

pub fn stoplight(config: &DashboardConfig) -> Result<StoplightPanel> {
    let path = config.dataset_path(&config.files.stoplight);
    let doc = load_stoplight(&path)?;
    derive_panel(&doc).with_context(|| format!("deriving stoplight from {}", path.display()))
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub rendered: Vec<ChartKind>,
    pub failed: Vec<ChartKind>,
    pub skipped: Vec<ChartKind>,
}

fn frame(kind: ChartKind, empty_message: &str) -> Frame<'_> {
    Frame {
        mount: kind.mount(),
        title: kind.title(),
        empty_message,
    }
}

fn draw(
    kind: ChartKind,
    config: &DashboardConfig,
    theme: &Theme,
    renderer: &mut dyn Renderer,
) -> Result<()> {
    let msgs = &config.empty_state;

    match kind {
        ChartKind::CfpTimeline => {
            let series = cfp_timeline(config)?;
            renderer.draw_series(&frame(kind, &msgs.timeline), &series, None, theme)?;
        }
        ChartKind::NcaaTimeline => {
            let series = ncaa_timeline(config)?;
            renderer.draw_series(&frame(kind, &msgs.timeline), &series, None, theme)?;
        }
        ChartKind::Volume => {
            let view = volume(config)?;
            renderer.draw_volume(&frame(kind, &msgs.volume), &view, theme)?;
        }
        ChartKind::PositionTimeline | ChartKind::SportTimeline => {
            let state = if kind == ChartKind::PositionTimeline {
                position_state(config)?
            } else {
                sport_state(config)?
            };
            let legend = (!state.options().is_empty()).then(|| state.color_map());
            renderer.draw_series(&frame(kind, &msgs.filtered), state.series(), legend, theme)?;
        }
        ChartKind::ClassYear => {
            let bars = class_year(config)?;
            renderer.draw_stack(&frame(kind, &msgs.class_year), &bars, theme)?;
        }
        ChartKind::Stoplight => {
            let panel = stoplight(config)?;
            renderer.draw_stoplight(&frame(kind, &msgs.stoplight_unavailable), &panel)?;
        }
    }
    Ok(())
}

/// Run every chart whose mount point is present. Load failures are terminal
/// for their chart only.
pub fn run(config: &DashboardConfig, theme: &Theme, renderer: &mut dyn Renderer) -> Result<RunReport> {
    let mut report = RunReport::default();

    for kind in ChartKind::ALL {
        if !config.has_mount(kind) {
            log::debug!("{kind}: mount point absent; skipping");
            report.skipped.push(kind);
            continue;
        }

        match draw(kind, config, theme, renderer) {
            Ok(()) => report.rendered.push(kind),
            Err(e) => {
                log::error!("{kind}: {e:#}");
                let message = if kind == ChartKind::Stoplight {
                    &config.empty_state.stoplight_unavailable
                } else {
                    &config.empty_state.unavailable
                };
                renderer
                    .draw_unavailable(&frame(kind, message), message)
                    .with_context(|| format!("{kind}: writing fallback"))?;
                report.failed.push(kind);
            }
        }
    }

    Ok(report)
}
