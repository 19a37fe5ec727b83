//! Dataset preparation: turns the raw sources into the tables the charts read.
//!
//! Two sources are handled:
//! * the college-football portal export, one row per transfer with a
//!   `transfer_date` and a `position`, counted per month;
//! * the NCAA yearly table, one row per sport and one column per (year,
//!   level), reshaped to long form and summed per year.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use super::loader::load_file;
use super::model::{RawRow, RawTable};
use super::normalize::parse_number;
use crate::config::DashboardConfig;
use crate::error::SchemaError;

/// Position written for transfers whose position is blank.
pub const UNKNOWN_POSITION: &str = "UNKNOWN";

// ---------------------------------------------------------------------------
// Header normalisation
// ---------------------------------------------------------------------------

/// Lower-case `name` and collapse every run of characters outside `[a-z0-9]`
/// into one underscore, trimming underscores at both ends.
fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut gap = false;
    for c in name.trim().to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if gap && !out.is_empty() {
                out.push('_');
            }
            gap = false;
            out.push(c);
        } else {
            gap = true;
        }
    }
    if out.is_empty() {
        "unnamed".to_string()
    } else {
        out
    }
}

/// snake_case every header; later duplicates get `_2`, `_3`, ... suffixes.
pub fn normalize_headers(columns: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    columns
        .iter()
        .map(|name| {
            let clean = snake_case(name);
            let mut deduped = clean.clone();
            let mut counter = 2;
            while seen.contains(&deduped) {
                deduped = format!("{clean}_{counter}");
                counter += 1;
            }
            seen.insert(deduped.clone());
            deduped
        })
        .collect()
}

/// The same table with [`normalize_headers`] applied to columns and rows.
pub fn with_normalized_headers(table: &RawTable) -> RawTable {
    let renamed = normalize_headers(&table.columns);
    let rows = table
        .rows
        .iter()
        .map(|row| {
            table
                .columns
                .iter()
                .zip(&renamed)
                .filter_map(|(old, new)| row.get(old).map(|v| (new.clone(), v.clone())))
                .collect::<RawRow>()
        })
        .collect();
    RawTable::new(renamed, rows)
}

// ---------------------------------------------------------------------------
// CFP portal: per-transfer rows → monthly counts
// ---------------------------------------------------------------------------

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Parse a transfer timestamp. Offsets are converted to UTC and dropped.
pub fn parse_transfer_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|f| DateTime::parse_from_str(s, f).ok())
    {
        return Some(dt.naive_utc());
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
    {
        return Some(dt);
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// First day of the month containing `dt`.
pub fn month_of(dt: &NaiveDateTime) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(dt.year(), dt.month(), 1)
}

/// Trimmed, upper-cased position; blank becomes [`UNKNOWN_POSITION`].
pub fn clean_position(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(p) if !p.is_empty() => p.to_uppercase(),
        _ => UNKNOWN_POSITION.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionMonthCount {
    pub month: NaiveDate,
    pub position: String,
    pub post_nil: bool,
    pub transfer_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthCount {
    pub month: NaiveDate,
    pub post_nil: bool,
    pub transfer_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CfpCounts {
    /// Ordered by position, then month.
    pub by_position: Vec<PositionMonthCount>,
    /// Ordered by month.
    pub monthly: Vec<MonthCount>,
    /// Rows whose `transfer_date` did not parse.
    pub dropped: usize,
}

/// Count transfers per (month, position, post_nil) and per (month,
/// post_nil). A transfer is post-NIL when its timestamp is on or after
/// `cutoff`.
pub fn cfp_counts(table: &RawTable, cutoff: NaiveDate) -> Result<CfpCounts, SchemaError> {
    let table = with_normalized_headers(table);
    for column in ["transfer_date", "position"] {
        if !table.has_column(column) {
            return Err(SchemaError::MissingColumn {
                schema: "cfp_transfers",
                column: column.to_string(),
            });
        }
    }

    let mut by_position: BTreeMap<(String, NaiveDate, bool), u64> = BTreeMap::new();
    let mut monthly: BTreeMap<(NaiveDate, bool), u64> = BTreeMap::new();
    let mut dropped = 0;

    for row in &table.rows {
        let Some(when) = row.get("transfer_date").and_then(|s| parse_transfer_date(s)) else {
            dropped += 1;
            continue;
        };
        let Some(month) = month_of(&when) else {
            dropped += 1;
            continue;
        };
        let post_nil = when.date() >= cutoff;
        let position = clean_position(row.get("position").map(String::as_str));

        *by_position.entry((position, month, post_nil)).or_insert(0) += 1;
        *monthly.entry((month, post_nil)).or_insert(0) += 1;
    }

    if dropped > 0 {
        log::warn!("cfp_transfers: dropped {dropped} rows with an unparseable transfer_date");
    }

    Ok(CfpCounts {
        by_position: by_position
            .into_iter()
            .map(|((position, month, post_nil), transfer_count)| PositionMonthCount {
                month,
                position,
                post_nil,
                transfer_count,
            })
            .collect(),
        monthly: monthly
            .into_iter()
            .map(|((month, post_nil), transfer_count)| MonthCount {
                month,
                post_nil,
                transfer_count,
            })
            .collect(),
        dropped,
    })
}

// ---------------------------------------------------------------------------
// NCAA: wide year columns → long rows → yearly totals
// ---------------------------------------------------------------------------

const SPORT_COLUMN: &str = "Sport";

/// The first run of four ASCII digits in `name`, as a year.
fn embedded_year(name: &str) -> Option<i32> {
    name.as_bytes()
        .windows(4)
        .find(|w| w.iter().all(u8::is_ascii_digit))
        .and_then(|w| std::str::from_utf8(w).ok())
        .and_then(|s| s.parse().ok())
}

/// Year of every value column, aligned with `columns`.
///
/// A column without a four-digit year inherits the previous column's year.
/// Each year holds at most two columns (undergraduate and graduate); a third
/// is pushed to the following year. Leading columns with no year at all map
/// to `None`.
pub fn infer_years(columns: &[String]) -> Vec<Option<i32>> {
    let mut counts: BTreeMap<i32, u32> = BTreeMap::new();
    let mut last_year = None;
    columns
        .iter()
        .map(|col| {
            let mut year = embedded_year(col).or(last_year)?;
            while counts.get(&year).copied().unwrap_or(0) >= 2 {
                year += 1;
            }
            *counts.entry(year).or_insert(0) += 1;
            last_year = Some(year);
            Some(year)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Undergraduate,
    Graduate,
}

impl Level {
    pub fn from_column(name: &str) -> Self {
        if name.contains("Graduate") {
            Level::Graduate
        } else {
            Level::Undergraduate
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LongRow {
    pub sport: String,
    pub year: i32,
    pub level: Level,
    /// `None` when the cell is not numeric.
    pub athletes: Option<f64>,
}

/// One long row per (sport row, value column with a year).
pub fn ncaa_long(table: &RawTable) -> Result<Vec<LongRow>, SchemaError> {
    if !table.has_column(SPORT_COLUMN) {
        return Err(SchemaError::MissingColumn {
            schema: "ncaa_q1",
            column: SPORT_COLUMN.to_string(),
        });
    }
    let value_cols: Vec<String> = table
        .columns
        .iter()
        .filter(|c| c.as_str() != SPORT_COLUMN)
        .cloned()
        .collect();
    let years = infer_years(&value_cols);

    let mut out = Vec::new();
    for row in &table.rows {
        let sport = row.get(SPORT_COLUMN).map(|s| s.trim().to_string()).unwrap_or_default();
        for (col, year) in value_cols.iter().zip(&years) {
            let Some(year) = *year else { continue };
            out.push(LongRow {
                sport: sport.clone(),
                year,
                level: Level::from_column(col),
                athletes: row.get(col).and_then(|v| parse_number(v)),
            });
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearTotal {
    pub year: i32,
    pub total_transfers: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SportYearTotal {
    pub sport: String,
    pub year: i32,
    pub total_transfers: f64,
}

/// Sum across sports and levels; non-numeric cells count as zero.
pub fn yearly_totals(rows: &[LongRow]) -> Vec<YearTotal> {
    let mut totals: BTreeMap<i32, f64> = BTreeMap::new();
    for r in rows {
        *totals.entry(r.year).or_insert(0.0) += r.athletes.unwrap_or(0.0);
    }
    totals
        .into_iter()
        .map(|(year, total_transfers)| YearTotal { year, total_transfers })
        .collect()
}

/// Sum per (sport, year), ordered by sport then year. Rows without a sport
/// are left out.
pub fn sport_yearly_totals(rows: &[LongRow]) -> Vec<SportYearTotal> {
    let mut totals: BTreeMap<(&str, i32), f64> = BTreeMap::new();
    for r in rows.iter().filter(|r| !r.sport.is_empty()) {
        *totals.entry((r.sport.as_str(), r.year)).or_insert(0.0) += r.athletes.unwrap_or(0.0);
    }
    totals
        .into_iter()
        .map(|((sport, year), total_transfers)| SportYearTotal {
            sport: sport.to_string(),
            year,
            total_transfers,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// Booleans as dataframe exporters write them.
pub fn bool_literal(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

fn month_label(month: &NaiveDate) -> String {
    month.format("%Y-%m").to_string()
}

/// Write a header and rows to a CSV file.
pub fn write_csv<I>(path: &Path, header: &[&str], rows: I) -> Result<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    w.write_record(header)?;
    let mut n = 0;
    for row in rows {
        w.write_record(&row)?;
        n += 1;
    }
    w.flush()?;
    log::info!("Wrote {n} rows to {}", path.display());
    Ok(())
}

/// Load the portal export, count it and write both monthly tables where
/// `config` expects them.
pub fn export_cfp(source: &Path, config: &DashboardConfig) -> Result<CfpCounts> {
    let table = load_file(source)?;
    let counts = cfp_counts(&table, config.cutoff_date)
        .with_context(|| format!("counting transfers in {}", source.display()))?;

    write_csv(
        &config.dataset_path(&config.files.cfp_position_monthly),
        &["month", "position", "post_nil", "transfer_count"],
        counts.by_position.iter().map(|c| {
            vec![
                month_label(&c.month),
                c.position.clone(),
                bool_literal(c.post_nil).to_string(),
                c.transfer_count.to_string(),
            ]
        }),
    )?;
    write_csv(
        &config.dataset_path(&config.files.cfp_monthly),
        &["month", "post_nil", "transfer_count"],
        counts.monthly.iter().map(|c| {
            vec![
                month_label(&c.month),
                bool_literal(c.post_nil).to_string(),
                c.transfer_count.to_string(),
            ]
        }),
    )?;
    Ok(counts)
}

/// Load the NCAA wide table, reshape it and write the overall and per-sport
/// yearly totals.
pub fn export_ncaa(source: &Path, config: &DashboardConfig) -> Result<Vec<YearTotal>> {
    let table = load_file(source)?;
    let long = ncaa_long(&table).with_context(|| format!("reshaping {}", source.display()))?;
    let yearly = yearly_totals(&long);
    let by_sport = sport_yearly_totals(&long);

    write_csv(
        &config.dataset_path(&config.files.ncaa_yearly),
        &["year", "total_transfers"],
        yearly
            .iter()
            .map(|t| vec![t.year.to_string(), t.total_transfers.to_string()]),
    )?;
    write_csv(
        &config.dataset_path(&config.files.ncaa_sport_yearly),
        &["Sport", "year", "total_transfers"],
        by_sport.iter().map(|t| {
            vec![t.sport.clone(), t.year.to_string(), t.total_transfers.to_string()]
        }),
    )?;
    Ok(yearly)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_csv_str;

    fn strings(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    fn cutoff() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 7, 1).unwrap()
    }

    #[test]
    fn headers_become_unique_snake_case() {
        let cols = strings(&["Transfer Date", "Position", "position", " ", "Rating (247)", "__"]);
        assert_eq!(
            normalize_headers(&cols),
            vec!["transfer_date", "position", "position_2", "unnamed", "rating_247", "unnamed_2"]
        );
    }

    #[test]
    fn transfer_dates_in_common_shapes() {
        let expected = NaiveDate::from_ymd_opt(2021, 7, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_transfer_date("2021-07-01"), Some(expected));
        assert_eq!(parse_transfer_date("07/01/2021"), Some(expected));
        assert_eq!(parse_transfer_date("2021-07-01T00:00:00Z"), Some(expected));
        assert_eq!(parse_transfer_date("2021-07-01 02:00:00+02:00"), Some(expected));
        assert_eq!(
            parse_transfer_date("2021-06-30T22:00:00"),
            NaiveDate::from_ymd_opt(2021, 6, 30).unwrap().and_hms_opt(22, 0, 0)
        );
        assert_eq!(parse_transfer_date("soon"), None);
        assert_eq!(parse_transfer_date(""), None);
    }

    #[test]
    fn positions_are_cleaned() {
        assert_eq!(clean_position(Some(" wr ")), "WR");
        assert_eq!(clean_position(Some("")), UNKNOWN_POSITION);
        assert_eq!(clean_position(None), UNKNOWN_POSITION);
    }

    #[test]
    fn counts_by_month_position_and_era() {
        let table = parse_csv_str(
            "Transfer Date,Position,Name\n\
             2021-06-30T23:59:00Z,qb,A\n\
             2021-07-01,QB ,B\n\
             2021-07-15,wr,C\n\
             2021-07-20,,D\n\
             not a date,QB,E\n",
        )
        .unwrap();
        let counts = cfp_counts(&table, cutoff()).unwrap();
        assert_eq!(counts.dropped, 1);

        let june = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        let july = NaiveDate::from_ymd_opt(2021, 7, 1).unwrap();
        assert_eq!(
            counts.monthly,
            vec![
                MonthCount { month: june, post_nil: false, transfer_count: 1 },
                MonthCount { month: july, post_nil: true, transfer_count: 3 },
            ]
        );

        let rows: Vec<(&str, NaiveDate, bool, u64)> = counts
            .by_position
            .iter()
            .map(|c| (c.position.as_str(), c.month, c.post_nil, c.transfer_count))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("QB", june, false, 1),
                ("QB", july, true, 1),
                ("UNKNOWN", july, true, 1),
                ("WR", july, true, 1),
            ]
        );
    }

    #[test]
    fn portal_export_needs_dates_and_positions() {
        let table = parse_csv_str("Transfer Date,Name\n2021-07-01,A\n").unwrap();
        assert_eq!(
            cfp_counts(&table, cutoff()).unwrap_err(),
            SchemaError::MissingColumn {
                schema: "cfp_transfers",
                column: "position".into()
            }
        );
    }

    #[test]
    fn years_are_inferred_from_column_names() {
        let cols = strings(&[
            "2019-20 Undergraduate",
            "Graduate",
            "2021 Undergraduate",
            "2021 Graduate",
            "2021 Late",
        ]);
        assert_eq!(
            infer_years(&cols),
            vec![Some(2019), Some(2019), Some(2021), Some(2021), Some(2022)]
        );
        assert_eq!(infer_years(&strings(&["Notes", "2020"])), vec![None, Some(2020)]);
    }

    #[test]
    fn wide_table_reshapes_and_sums() {
        let table = parse_csv_str(
            "Sport,2020 Undergraduate,2020 Graduate,2021 Undergraduate,2021 Graduate\n\
             Soccer,10,2,15,n/a\n\
             Baseball,20,4,30,6\n",
        )
        .unwrap();
        let long = ncaa_long(&table).unwrap();
        assert_eq!(long.len(), 8);
        assert_eq!(long[1].level, Level::Graduate);
        assert_eq!(long[3].athletes, None);

        assert_eq!(
            yearly_totals(&long),
            vec![
                YearTotal { year: 2020, total_transfers: 36.0 },
                YearTotal { year: 2021, total_transfers: 51.0 },
            ]
        );
        let by_sport = sport_yearly_totals(&long);
        assert_eq!(by_sport[0].sport, "Baseball");
        assert_eq!(by_sport[0].total_transfers, 24.0);
        assert_eq!(by_sport[3].sport, "Soccer");
        assert_eq!(by_sport[3].total_transfers, 15.0);
    }
}
