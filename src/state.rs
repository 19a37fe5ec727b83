use crate::color::ColorMap;
use crate::data::aggregate::{GroupRanking, Reducer, bucket, bucket_by_time};
use crate::data::filter::{GroupSelection, filter_options, filtered_records};
use crate::data::model::{Era, TimeKey, TypedRecord};
use crate::data::series::{CumulativeSeries, EraCutoff, EraRates, Series, build_series};

// ---------------------------------------------------------------------------
// Hover detail
// ---------------------------------------------------------------------------

/// What a tooltip shows for the point under the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverDetail {
    pub index: usize,
    pub time: Option<TimeKey>,
    pub value: f64,
    pub era: Era,
    /// Running total at this point (cumulative charts only).
    pub cumulative: Option<f64>,
    /// Mean value of the point's era.
    pub era_mean: Option<f64>,
    /// Growth of the running total versus the previous point.
    pub growth_pct: Option<f64>,
}

/// Tooltip content for point `index` of a cumulative series.
pub fn cumulative_hover(
    cumulative: &CumulativeSeries,
    rates: &EraRates,
    index: usize,
) -> Option<HoverDetail> {
    let p = cumulative.points().get(index)?;
    Some(HoverDetail {
        index,
        time: p.point.time,
        value: p.point.value,
        era: p.point.era,
        cumulative: Some(p.cumulative),
        era_mean: rates.mean_for(p.point.era),
        growth_pct: cumulative.growth_pct(index),
    })
}

// ---------------------------------------------------------------------------
// Filterable timeline state
// ---------------------------------------------------------------------------

/// UI state of a timeline with a group dropdown, independent of rendering.
///
/// Holds the full normalised record set; every selection change rebuilds the
/// series from it. Nothing here touches a display.
pub struct TimelineState {
    records: Vec<TypedRecord>,
    cutoff: EraCutoff,

    /// Dropdown entries; empty when the host has no filter control.
    options: Vec<String>,

    /// Colour per group key, in option order.
    color_map: ColorMap,

    /// Current dropdown value.
    selection: GroupSelection,

    /// Series for the current selection (cached).
    series: Series,

    /// Index into `series` of the hovered point.
    hovered: Option<usize>,
}

impl TimelineState {
    /// Build the initial (`All`) state. `ranking` is `None` when the filter
    /// control is absent, in which case no options are enumerated.
    pub fn new(records: Vec<TypedRecord>, cutoff: EraCutoff, ranking: Option<GroupRanking>) -> Self {
        let options = match ranking {
            Some(r) => filter_options(&records, r),
            None => {
                log::debug!("filter control absent; skipping option enumeration");
                Vec::new()
            }
        };
        let color_map = ColorMap::new(options.get(1..).unwrap_or_default());
        let mut state = Self {
            records,
            cutoff,
            options,
            color_map,
            selection: GroupSelection::All,
            series: Series::default(),
            hovered: None,
        };
        state.rebuild();
        state
    }

    /// Recompute the series for the current selection. `All` hands every
    /// record to the builder unaggregated, group labels intact; a single
    /// group has its repeated (time, group) rows summed.
    fn rebuild(&mut self) {
        let selected = filtered_records(&self.records, &self.selection);
        self.series = if self.selection.is_all() {
            build_series(selected, &self.cutoff)
        } else {
            let buckets = bucket(&selected, Reducer::Sum);
            build_series(buckets.into_iter().map(TypedRecord::from), &self.cutoff)
        };
        self.hovered = None;
        log::debug!(
            "selection '{}' → {} points",
            self.selection,
            self.series.len()
        );
    }

    /// Apply the raw value emitted by the dropdown.
    pub fn select(&mut self, control_value: &str) {
        let selection = GroupSelection::from_control(control_value);
        if selection != self.selection {
            self.selection = selection;
            self.rebuild();
        }
    }

    /// Mark point `index` as hovered. Out-of-range indices clear the hover.
    pub fn hover(&mut self, index: usize) -> Option<HoverDetail> {
        let rates = self.series.era_rates();
        let detail = self.series.points().get(index).map(|p| HoverDetail {
            index,
            time: p.time,
            value: p.value,
            era: p.era,
            cumulative: None,
            era_mean: rates.mean_for(p.era),
            growth_pct: None,
        });
        self.hovered = detail.as_ref().map(|d| d.index);
        detail
    }

    pub fn clear_hover(&mut self) {
        self.hovered = None;
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn selection(&self) -> &GroupSelection {
        &self.selection
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    /// One point per time bucket, summed across the groups passing the
    /// current selection.
    pub fn totals(&self) -> Series {
        let selected = filtered_records(&self.records, &self.selection);
        let buckets = bucket_by_time(&selected, Reducer::Sum);
        build_series(buckets.into_iter().map(TypedRecord::from), &self.cutoff)
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn color_map(&self) -> &ColorMap {
        &self.color_map
    }
}
