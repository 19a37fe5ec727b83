use chrono::NaiveDate;

use super::model::{Era, TimeKey, TypedRecord};

// ---------------------------------------------------------------------------
// EraCutoff
// ---------------------------------------------------------------------------

/// Fixed boundary between the two eras. Closed on the post side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraCutoff {
    /// Compared against the first day covered by a time key.
    Date(NaiveDate),
    /// Compared against the calendar year of a time key.
    Year(i32),
}

impl EraCutoff {
    pub fn classify(&self, time: &TimeKey) -> Era {
        let post = match self {
            EraCutoff::Date(d) => time.start_date() >= *d,
            EraCutoff::Year(y) => time.year() >= *y,
        };
        Era::from_post_flag(post)
    }
}

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub time: Option<TimeKey>,
    pub group: Option<String>,
    pub category: Option<String>,
    pub value: f64,
    pub era: Era,
}

/// Ordered, era-partitioned points ready for a renderer. Built once and not
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    points: Vec<SeriesPoint>,
}

/// Sort records by time (then group, then category) and assign each its era.
///
/// Records with a time key are classified against `cutoff`. Non-temporal
/// records have nothing to compare, so their own era flag decides.
pub fn build_series<I>(records: I, cutoff: &EraCutoff) -> Series
where
    I: IntoIterator<Item = TypedRecord>,
{
    let mut records: Vec<TypedRecord> = records.into_iter().collect();
    records.sort_by(|a, b| {
        a.time
            .cmp(&b.time)
            .then_with(|| a.group.cmp(&b.group))
            .then_with(|| a.category.cmp(&b.category))
    });

    let points = records
        .into_iter()
        .map(|r| SeriesPoint {
            era: match &r.time {
                Some(t) => cutoff.classify(t),
                None => Era::from_post_flag(r.post_flag),
            },
            time: r.time,
            group: r.group,
            category: r.category,
            value: r.value,
        })
        .collect();

    Series { points }
}

impl Series {
    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn era(&self, era: Era) -> impl Iterator<Item = &SeriesPoint> {
        self.points.iter().filter(move |p| p.era == era)
    }

    pub fn pre(&self) -> impl Iterator<Item = &SeriesPoint> {
        self.era(Era::Pre)
    }

    pub fn post(&self) -> impl Iterator<Item = &SeriesPoint> {
        self.era(Era::Post)
    }

    /// First and last time key, if the series is temporal and non-empty.
    pub fn extent(&self) -> Option<(TimeKey, TimeKey)> {
        let first = self.points.iter().find_map(|p| p.time)?;
        let last = self.points.iter().rev().find_map(|p| p.time)?;
        Some((first, last))
    }

    pub fn max_value(&self) -> Option<f64> {
        self.points.iter().map(|p| p.value).reduce(f64::max)
    }

    /// Running total in sorted order, ignoring era.
    pub fn cumulative(&self) -> CumulativeSeries {
        let mut acc = 0.0;
        let points = self
            .points
            .iter()
            .map(|p| {
                acc += p.value;
                CumulativePoint {
                    point: p.clone(),
                    cumulative: acc,
                }
            })
            .collect();
        CumulativeSeries { points }
    }

    /// Mean value of each era's points.
    pub fn era_rates(&self) -> EraRates {
        EraRates {
            pre_mean: mean(self.pre().map(|p| p.value)),
            post_mean: mean(self.post().map(|p| p.value)),
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

// ---------------------------------------------------------------------------
// Era rates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EraRates {
    pub pre_mean: Option<f64>,
    pub post_mean: Option<f64>,
}

impl EraRates {
    pub fn mean_for(&self, era: Era) -> Option<f64> {
        match era {
            Era::Pre => self.pre_mean,
            Era::Post => self.post_mean,
        }
    }

    /// `(post / pre - 1) * 100`; absent unless both eras have data and the
    /// pre-era mean is positive.
    pub fn acceleration_pct(&self) -> Option<f64> {
        match (self.pre_mean, self.post_mean) {
            (Some(pre), Some(post)) if pre > 0.0 => Some((post / pre - 1.0) * 100.0),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Cumulative series and milestones
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CumulativePoint {
    pub point: SeriesPoint,
    pub cumulative: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CumulativeSeries {
    points: Vec<CumulativePoint>,
}

/// First point whose running total reaches `threshold`.
#[derive(Debug, Clone, PartialEq)]
pub struct Milestone {
    pub threshold: f64,
    pub index: usize,
    pub cumulative: f64,
}

impl CumulativeSeries {
    pub fn points(&self) -> &[CumulativePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Final running total; zero for an empty series.
    pub fn total(&self) -> f64 {
        self.points.last().map(|p| p.cumulative).unwrap_or(0.0)
    }

    /// One milestone per reached threshold, in threshold order. Thresholds
    /// beyond the final total are omitted.
    pub fn milestones(&self, thresholds: &[f64]) -> Vec<Milestone> {
        thresholds
            .iter()
            .filter_map(|&threshold| {
                let index = self.points.iter().position(|p| p.cumulative >= threshold)?;
                Some(Milestone {
                    threshold,
                    index,
                    cumulative: self.points[index].cumulative,
                })
            })
            .collect()
    }

    /// Growth of the running total at `index` relative to the previous
    /// point, in percent. Only post-era points with a non-zero predecessor
    /// report growth.
    pub fn growth_pct(&self, index: usize) -> Option<f64> {
        let current = self.points.get(index)?;
        if current.point.era != Era::Post || index == 0 {
            return None;
        }
        let previous = self.points[index - 1].cumulative;
        (previous != 0.0).then(|| (current.cumulative / previous - 1.0) * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn july_2021() -> EraCutoff {
        EraCutoff::Date(month(2021, 7))
    }

    #[test]
    fn cutoff_instant_is_post() {
        let cutoff = july_2021();
        assert_eq!(cutoff.classify(&TimeKey::Month(month(2021, 6))), Era::Pre);
        assert_eq!(cutoff.classify(&TimeKey::Month(month(2021, 7))), Era::Post);
        assert_eq!(cutoff.classify(&TimeKey::Month(month(2023, 1))), Era::Post);

        let yearly = EraCutoff::Year(2021);
        assert_eq!(yearly.classify(&TimeKey::Year(2020)), Era::Pre);
        assert_eq!(yearly.classify(&TimeKey::Year(2021)), Era::Post);
    }

    #[test]
    fn partition_is_total_and_exclusive() {
        let records: Vec<TypedRecord> = (2019..=2023)
            .flat_map(|y| (1..=12).map(move |m| TypedRecord::monthly(month(y, m), 1.0, false)))
            .collect();
        let series = build_series(records.clone(), &july_2021());
        assert_eq!(series.pre().count() + series.post().count(), records.len());
        for p in series.points() {
            let post = p.time.unwrap().start_date() >= month(2021, 7);
            assert_eq!(p.era == Era::Post, post);
        }
    }

    #[test]
    fn era_comes_from_time_not_from_row_flag() {
        // Row flag disagrees with the cutoff; the cutoff wins.
        let series = build_series(
            vec![TypedRecord::monthly(month(2021, 8), 5.0, false)],
            &july_2021(),
        );
        assert_eq!(series.points()[0].era, Era::Post);
    }

    #[test]
    fn sorts_ascending_by_time() {
        let series = build_series(
            vec![
                TypedRecord::yearly(2023, 3.0),
                TypedRecord::yearly(2019, 1.0),
                TypedRecord::yearly(2021, 2.0),
            ],
            &EraCutoff::Year(2021),
        );
        let years: Vec<i32> = series.points().iter().map(|p| p.time.unwrap().year()).collect();
        assert_eq!(years, vec![2019, 2021, 2023]);
        assert_eq!(series.extent(), Some((TimeKey::Year(2019), TimeKey::Year(2023))));
        assert_eq!(series.max_value(), Some(3.0));
    }

    #[test]
    fn cumulative_is_monotone_and_sums_inputs() {
        let values = [4.0, 0.0, 17.0, 3.0, 9.0, 0.0, 21.0];
        let records: Vec<TypedRecord> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| TypedRecord::monthly(month(2021, i as u32 + 1), v, false))
            .collect();
        let cumulative = build_series(records, &july_2021()).cumulative();
        let totals: Vec<f64> = cumulative.points().iter().map(|p| p.cumulative).collect();
        assert!(totals.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(cumulative.total(), values.iter().sum::<f64>());
    }

    #[test]
    fn first_crossing_is_the_milestone() {
        let records: Vec<TypedRecord> = [100.0, 150.0, 650.0, 300.0]
            .iter()
            .enumerate()
            .map(|(i, &v)| TypedRecord::yearly(2018 + i as i32, v))
            .collect();
        let cumulative = build_series(records, &EraCutoff::Year(2021)).cumulative();
        let totals: Vec<f64> = cumulative.points().iter().map(|p| p.cumulative).collect();
        assert_eq!(totals, vec![100.0, 250.0, 900.0, 1200.0]);

        let milestones = cumulative.milestones(&[1000.0]);
        assert_eq!(
            milestones,
            vec![Milestone {
                threshold: 1000.0,
                index: 3,
                cumulative: 1200.0
            }]
        );

        // Exact hit counts; unreachable thresholds vanish.
        let milestones = cumulative.milestones(&[250.0, 5000.0]);
        assert_eq!(milestones.len(), 1);
        assert_eq!(milestones[0].index, 1);
    }

    #[test]
    fn era_rates_and_acceleration() {
        let series = build_series(
            vec![
                TypedRecord::monthly(month(2021, 5), 10.0, false),
                TypedRecord::monthly(month(2021, 6), 30.0, false),
                TypedRecord::monthly(month(2021, 7), 50.0, true),
            ],
            &july_2021(),
        );
        let rates = series.era_rates();
        assert_eq!(rates.pre_mean, Some(20.0));
        assert_eq!(rates.post_mean, Some(50.0));
        assert_eq!(rates.acceleration_pct(), Some(150.0));

        let only_post = build_series(
            vec![TypedRecord::monthly(month(2022, 1), 5.0, true)],
            &july_2021(),
        );
        assert_eq!(only_post.era_rates().acceleration_pct(), None);
    }

    #[test]
    fn growth_only_for_post_points_with_predecessor() {
        let series = build_series(
            vec![
                TypedRecord::monthly(month(2021, 6), 100.0, false),
                TypedRecord::monthly(month(2021, 7), 50.0, true),
            ],
            &july_2021(),
        );
        let cumulative = series.cumulative();
        assert_eq!(cumulative.growth_pct(0), None);
        assert_eq!(cumulative.growth_pct(1), Some(50.0));
        assert_eq!(cumulative.growth_pct(2), None);
    }

    #[test]
    fn empty_input_gives_empty_series() {
        let series = build_series(Vec::new(), &july_2021());
        assert!(series.is_empty());
        assert_eq!(series.extent(), None);
        assert_eq!(series.cumulative().total(), 0.0);
        assert!(series.cumulative().milestones(&[1.0]).is_empty());
    }
}
