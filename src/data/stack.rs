use std::collections::HashMap;

use super::model::TypedRecord;

/// One layer of a stacked bar, spanning `[y0, y1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct StackSegment {
    pub key: String,
    pub y0: f64,
    pub y1: f64,
}

impl StackSegment {
    pub fn value(&self) -> f64 {
        self.y1 - self.y0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackedBar {
    pub period: String,
    pub segments: Vec<StackSegment>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StackedBars {
    bars: Vec<StackedBar>,
}

impl StackedBars {
    pub fn bars(&self) -> &[StackedBar] {
        &self.bars
    }

    /// True when there is nothing to draw: no bars, or every bar sums to zero.
    pub fn is_empty(&self) -> bool {
        self.bars.iter().all(|b| b.total == 0.0)
    }

    pub fn max_total(&self) -> f64 {
        self.bars.iter().map(|b| b.total).fold(0.0, f64::max)
    }
}

/// Stack `records` into one bar per period (`record.category`) with one
/// segment per key (`record.group`), both in the given fixed orders.
///
/// Cells with no record contribute a zero-height segment; records outside
/// the fixed orders are ignored. Repeated cells are summed.
pub fn stack(records: &[TypedRecord], periods: &[String], keys: &[String]) -> StackedBars {
    let mut cells: HashMap<(&str, &str), f64> = HashMap::new();
    for r in records {
        if let (Some(period), Some(key)) = (r.category.as_deref(), r.group.as_deref()) {
            *cells.entry((period, key)).or_insert(0.0) += r.value;
        }
    }

    if cells.is_empty() {
        return StackedBars::default();
    }

    let bars = periods
        .iter()
        .map(|period| {
            let mut y = 0.0;
            let segments = keys
                .iter()
                .map(|key| {
                    let v = cells
                        .get(&(period.as_str(), key.as_str()))
                        .copied()
                        .unwrap_or(0.0);
                    let seg = StackSegment {
                        key: key.clone(),
                        y0: y,
                        y1: y + v,
                    };
                    y += v;
                    seg
                })
                .collect();
            StackedBar {
                period: period.clone(),
                segments,
                total: y,
            }
        })
        .collect();

    StackedBars { bars }
}
