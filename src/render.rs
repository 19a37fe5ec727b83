//! Renderer contract and a plain-text implementation.
//!
//! Drawing proper lives outside this crate. A renderer receives finished,
//! immutable outputs together with the mount point they belong to; it must
//! turn an empty input into the frame's empty-state message.

use std::io::{self, Write};

use crate::color::{ColorMap, Theme, to_hex};
use crate::data::model::Era;
use crate::data::series::Series;
use crate::data::stack::StackedBars;
use crate::pipeline::VolumeView;
use crate::stoplight::StoplightPanel;

/// Where and how a chart is presented.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub mount: &'a str,
    pub title: &'a str,
    pub empty_message: &'a str,
}

pub trait Renderer {
    fn draw_series(
        &mut self,
        frame: &Frame<'_>,
        series: &Series,
        legend: Option<&ColorMap>,
        theme: &Theme,
    ) -> io::Result<()>;

    fn draw_volume(&mut self, frame: &Frame<'_>, view: &VolumeView, theme: &Theme) -> io::Result<()>;

    fn draw_stack(&mut self, frame: &Frame<'_>, bars: &StackedBars, theme: &Theme) -> io::Result<()>;

    fn draw_stoplight(&mut self, frame: &Frame<'_>, panel: &StoplightPanel) -> io::Result<()>;

    /// The chart's data could not be loaded; show a static fallback.
    fn draw_unavailable(&mut self, frame: &Frame<'_>, message: &str) -> io::Result<()>;
}

// ---------------------------------------------------------------------------
// SummaryRenderer
// ---------------------------------------------------------------------------

/// Writes a short textual summary of each chart.
pub struct SummaryRenderer<W: Write> {
    out: W,
}

impl<W: Write> SummaryRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn header(&mut self, frame: &Frame<'_>) -> io::Result<()> {
        writeln!(self.out, "== {} [#{}]", frame.title, frame.mount)
    }

    fn empty(&mut self, frame: &Frame<'_>) -> io::Result<()> {
        writeln!(self.out, "   {}", frame.empty_message)
    }
}

impl<W: Write> Renderer for SummaryRenderer<W> {
    fn draw_series(
        &mut self,
        frame: &Frame<'_>,
        series: &Series,
        legend: Option<&ColorMap>,
        theme: &Theme,
    ) -> io::Result<()> {
        self.header(frame)?;
        if series.is_empty() {
            return self.empty(frame);
        }
        if let Some((first, last)) = series.extent() {
            writeln!(self.out, "   {first} .. {last}, peak {}", series.max_value().unwrap_or(0.0))?;
        }
        if series.pre().next().is_some() {
            if let Some(boundary) = series.post().find_map(|p| p.time) {
                writeln!(self.out, "   cutoff at {boundary} {}", to_hex(theme.cutoff_line))?;
            }
        }
        for era in [Era::Pre, Era::Post] {
            let points: Vec<_> = series.era(era).collect();
            let total: f64 = points.iter().map(|p| p.value).sum();
            writeln!(
                self.out,
                "   {:<8} {}  {} points, total {}",
                era.label(),
                to_hex(theme.era_color(era)),
                points.len(),
                total
            )?;
        }
        if let Some(map) = legend {
            let entries: Vec<String> = map
                .legend_entries()
                .into_iter()
                .map(|(k, c)| format!("{k} {}", to_hex(c)))
                .collect();
            if !entries.is_empty() {
                writeln!(self.out, "   legend: {}", entries.join(", "))?;
            }
        }
        Ok(())
    }

    fn draw_volume(&mut self, frame: &Frame<'_>, view: &VolumeView, theme: &Theme) -> io::Result<()> {
        self.header(frame)?;
        if view.cumulative.is_empty() {
            return self.empty(frame);
        }
        writeln!(
            self.out,
            "   cumulative total {} ({})",
            view.cumulative.total(),
            to_hex(theme.cumulative)
        )?;
        for m in &view.milestones {
            let point = &view.cumulative.points()[m.index];
            let when = point.point.time.map(|t| t.to_string()).unwrap_or_default();
            writeln!(self.out, "   milestone {} reached {when} at {}", m.threshold, m.cumulative)?;
        }
        let fmt_rate = |r: Option<f64>| r.map(|v| format!("{:.0}/mo", v)).unwrap_or_else(|| "-".into());
        writeln!(
            self.out,
            "   avg rate: pre {}, post {}",
            fmt_rate(view.rates.pre_mean),
            fmt_rate(view.rates.post_mean)
        )?;
        if let Some(acc) = view.rates.acceleration_pct() {
            writeln!(self.out, "   {acc:+.0}% faster")?;
        }
        Ok(())
    }

    fn draw_stack(&mut self, frame: &Frame<'_>, bars: &StackedBars, theme: &Theme) -> io::Result<()> {
        self.header(frame)?;
        if bars.is_empty() {
            return self.empty(frame);
        }
        for bar in bars.bars() {
            let layers: Vec<String> = bar
                .segments
                .iter()
                .enumerate()
                .filter(|(_, s)| s.value() > 0.0)
                .map(|(i, s)| format!("{} {} {}", s.key, to_hex(theme.class_year_color(i)), s.value()))
                .collect();
            writeln!(self.out, "   {:<8} total {}: {}", bar.period, bar.total, layers.join(", "))?;
        }
        Ok(())
    }

    fn draw_stoplight(&mut self, frame: &Frame<'_>, panel: &StoplightPanel) -> io::Result<()> {
        self.header(frame)?;
        for light in panel.pre.iter().chain(panel.post.iter()) {
            let change = light
                .change_from_pre
                .map(|c| format!(" {c:+.0}%"))
                .unwrap_or_default();
            writeln!(
                self.out,
                "   {:<8} {:<10} {:>3.0}% {:>5} opacity {:.2}{}{}",
                light.era.label(),
                light.class_year,
                light.rate * 100.0,
                light.count,
                light.tier.opacity(),
                change,
                if light.highlight { " *" } else { "" }
            )?;
        }
        let c = &panel.comparison;
        writeln!(
            self.out,
            "   total {} -> {} ({})",
            c.pre_total,
            c.post_total,
            c.total_change_pct
                .map(|p| format!("{p:+.0}%"))
                .unwrap_or_else(|| "-".into())
        )?;
        if let (Some(a), Some(b)) = (&c.pre_peak, &c.post_peak) {
            writeln!(self.out, "   peak {a} -> {b}")?;
        }
        if let Some((year, pct)) = &c.biggest_riser {
            writeln!(self.out, "   {year} transfers {pct:+.0}%")?;
        }
        Ok(())
    }

    fn draw_unavailable(&mut self, frame: &Frame<'_>, message: &str) -> io::Result<()> {
        self.header(frame)?;
        writeln!(self.out, "   {message}")
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::config::ThemeConfig;
    use crate::data::model::TypedRecord;
    use crate::data::series::{EraCutoff, build_series};

    fn frame() -> Frame<'static> {
        Frame {
            mount: "cfp-chart-area",
            title: "College football transfers by month",
            empty_message: "No transfer data available.",
        }
    }

    #[test]
    fn two_era_series_marks_the_cutoff() {
        let theme = Theme::from_config(&ThemeConfig::default()).unwrap();
        let month = |m| NaiveDate::from_ymd_opt(2021, m, 1).unwrap();
        let series = build_series(
            vec![
                TypedRecord::monthly(month(1), 50.0, false),
                TypedRecord::monthly(month(7), 80.0, true),
            ],
            &EraCutoff::Date(month(7)),
        );
        let mut r = SummaryRenderer::new(Vec::new());
        r.draw_series(&frame(), &series, None, &theme).unwrap();
        let text = String::from_utf8(r.into_inner()).unwrap();
        assert!(text.contains("cutoff at 2021-07 #c9302c"));

        let post_only = build_series(
            vec![TypedRecord::monthly(month(8), 5.0, true)],
            &EraCutoff::Date(month(7)),
        );
        let mut r = SummaryRenderer::new(Vec::new());
        r.draw_series(&frame(), &post_only, None, &theme).unwrap();
        let text = String::from_utf8(r.into_inner()).unwrap();
        assert!(!text.contains("cutoff at"));
    }

    #[test]
    fn empty_series_prints_empty_state() {
        let theme = Theme::from_config(&ThemeConfig::default()).unwrap();
        let mut r = SummaryRenderer::new(Vec::new());
        let frame = Frame {
            mount: "position-chart-area",
            title: "Transfers by position",
            empty_message: "No transfers recorded for this selection.",
        };
        r.draw_series(&frame, &Series::default(), None, &theme).unwrap();
        let text = String::from_utf8(r.into_inner()).unwrap();
        assert!(text.contains("#position-chart-area"));
        assert!(text.contains("No transfers recorded for this selection."));
    }
}
