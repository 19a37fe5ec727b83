use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};

// ---------------------------------------------------------------------------
// RawRow / RawTable – untyped loader output
// ---------------------------------------------------------------------------

/// One source record: column name → cell text, exactly as loaded.
pub type RawRow = BTreeMap<String, String>;

/// A loaded table before any coercion.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Header order as found in the source file.
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<RawRow>) -> Self {
        RawTable { columns, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }
}

// ---------------------------------------------------------------------------
// TimeKey – month or year granularity
// ---------------------------------------------------------------------------

/// Temporal key of a record. Months are stored as the first day of the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeKey {
    Month(NaiveDate),
    Year(i32),
}

impl TimeKey {
    /// First calendar day covered by this key; the common axis used for
    /// ordering and for comparison against the era cutoff.
    pub fn start_date(&self) -> NaiveDate {
        match self {
            TimeKey::Month(d) => *d,
            TimeKey::Year(y) => NaiveDate::from_ymd_opt(*y, 1, 1).unwrap_or(NaiveDate::MIN),
        }
    }

    pub fn year(&self) -> i32 {
        match self {
            TimeKey::Month(d) => d.year(),
            TimeKey::Year(y) => *y,
        }
    }
}

impl PartialOrd for TimeKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // A year sorts before the months it contains.
        fn rank(k: &TimeKey) -> u8 {
            match k {
                TimeKey::Year(_) => 0,
                TimeKey::Month(_) => 1,
            }
        }
        self.start_date()
            .cmp(&other.start_date())
            .then_with(|| rank(self).cmp(&rank(other)))
    }
}

impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeKey::Month(d) => write!(f, "{}", d.format("%Y-%m")),
            TimeKey::Year(y) => write!(f, "{y}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Era
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Era {
    Pre,
    Post,
}

impl Era {
    pub fn from_post_flag(post: bool) -> Self {
        if post {
            Era::Post
        } else {
            Era::Pre
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Era::Pre => "Pre-NIL",
            Era::Post => "Post-NIL",
        }
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// TypedRecord – one coerced row
// ---------------------------------------------------------------------------

/// A row narrowed to its semantic types. Which fields are populated depends
/// on the [`RecordSchema`] it was normalised with.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRecord {
    pub time: Option<TimeKey>,
    /// The numeric measure (transfer count, total transfers, athletes).
    pub value: f64,
    /// Primary categorical label (position, sport, class year).
    pub group: Option<String>,
    /// Secondary categorical label (e.g. the period column of the class-year table).
    pub category: Option<String>,
    /// Era flag as carried by the source row; `false` when the schema has none.
    pub post_flag: bool,
}

impl TypedRecord {
    /// Convenience constructor for a monthly record.
    pub fn monthly(month: NaiveDate, value: f64, post_flag: bool) -> Self {
        TypedRecord {
            time: Some(TimeKey::Month(month)),
            value,
            group: None,
            category: None,
            post_flag,
        }
    }

    /// Convenience constructor for a yearly record.
    pub fn yearly(year: i32, value: f64) -> Self {
        TypedRecord {
            time: Some(TimeKey::Year(year)),
            value,
            group: None,
            category: None,
            post_flag: false,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

// ---------------------------------------------------------------------------
// RecordSchema – explicit per-chart row shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeGranularity {
    /// `"YYYY-MM"`
    Month,
    /// Plain integer year.
    Year,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeColumn {
    pub column: String,
    pub granularity: TimeGranularity,
}

/// Boolean column; `truthy` overrides the configured truthy-literal set when
/// the column uses its own vocabulary (e.g. `"Post-NIL"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagColumn {
    pub column: String,
    pub truthy: Option<Vec<String>>,
}

/// Named fields with fixed semantic types, validated once against a table
/// header before any row is coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    pub name: &'static str,
    pub time: Option<TimeColumn>,
    pub value: String,
    pub group: Option<String>,
    pub category: Option<String>,
    pub flag: Option<FlagColumn>,
    /// Drop rows whose value coerces to zero.
    pub skip_zero: bool,
}

impl RecordSchema {
    /// `month, post_nil, transfer_count`
    pub fn cfp_monthly() -> Self {
        RecordSchema {
            name: "cfp_monthly",
            time: Some(TimeColumn {
                column: "month".into(),
                granularity: TimeGranularity::Month,
            }),
            value: "transfer_count".into(),
            group: None,
            category: None,
            flag: Some(FlagColumn {
                column: "post_nil".into(),
                truthy: None,
            }),
            skip_zero: false,
        }
    }

    /// `month, position, post_nil, transfer_count`
    pub fn cfp_position_monthly() -> Self {
        RecordSchema {
            name: "cfp_position_monthly",
            group: Some("position".into()),
            ..Self::cfp_monthly()
        }
    }

    /// `year, total_transfers`
    pub fn ncaa_yearly() -> Self {
        RecordSchema {
            name: "ncaa_yearly",
            time: Some(TimeColumn {
                column: "year".into(),
                granularity: TimeGranularity::Year,
            }),
            value: "total_transfers".into(),
            group: None,
            category: None,
            flag: None,
            skip_zero: false,
        }
    }

    /// `Sport, year, total_transfers`
    pub fn ncaa_sport_yearly() -> Self {
        RecordSchema {
            name: "ncaa_sport_yearly",
            group: Some("Sport".into()),
            ..Self::ncaa_yearly()
        }
    }

    /// `period, class_year, transfer_count`
    pub fn class_year() -> Self {
        RecordSchema {
            name: "class_year",
            time: None,
            value: "transfer_count".into(),
            group: Some("class_year".into()),
            category: Some("period".into()),
            flag: Some(FlagColumn {
                column: "period".into(),
                truthy: Some(vec![Era::Post.label().to_string()]),
            }),
            skip_zero: true,
        }
    }

    /// Every column a conforming table must carry.
    pub fn required_columns(&self) -> Vec<&str> {
        let mut cols = Vec::new();
        if let Some(t) = &self.time {
            cols.push(t.column.as_str());
        }
        cols.push(self.value.as_str());
        for c in [&self.group, &self.category].into_iter().flatten() {
            cols.push(c.as_str());
        }
        if let Some(f) = &self.flag {
            cols.push(f.column.as_str());
        }
        cols.dedup();
        cols
    }
}
