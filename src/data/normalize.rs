use chrono::NaiveDate;

use super::model::{RawRow, RawTable, RecordSchema, TimeGranularity, TimeKey, TypedRecord};
use crate::error::SchemaError;

/// Normaliser output: the surviving records plus how many rows were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub records: Vec<TypedRecord>,
    pub dropped: usize,
}

/// Coerce every row of `table` according to `schema`.
///
/// The header is validated once up front; a missing column is a malformed
/// dataset, not a per-row failure. Rows whose numeric or date field does not
/// coerce are dropped and counted. `truthy` is the accepted literal set for
/// the flag column unless the schema supplies its own.
pub fn normalize(
    table: &RawTable,
    schema: &RecordSchema,
    truthy: &[String],
) -> Result<Normalized, SchemaError> {
    for column in schema.required_columns() {
        if !table.has_column(column) {
            return Err(SchemaError::MissingColumn {
                schema: schema.name,
                column: column.to_string(),
            });
        }
    }

    let mut out = Normalized::default();
    for row in &table.rows {
        match coerce_row(row, schema, truthy) {
            Some(record) => out.records.push(record),
            None => out.dropped += 1,
        }
    }

    if out.dropped > 0 {
        log::warn!(
            "{}: dropped {} of {} rows that failed coercion",
            schema.name,
            out.dropped,
            table.len()
        );
    } else {
        log::debug!("{}: normalised {} rows", schema.name, out.records.len());
    }
    Ok(out)
}

fn coerce_row(row: &RawRow, schema: &RecordSchema, truthy: &[String]) -> Option<TypedRecord> {
    let cell = |name: &str| row.get(name).map(String::as_str).unwrap_or("");

    let value = parse_number(cell(&schema.value))?;
    if schema.skip_zero && value == 0.0 {
        return None;
    }

    let time = match &schema.time {
        Some(t) => Some(match t.granularity {
            TimeGranularity::Month => TimeKey::Month(parse_month(cell(&t.column))?),
            TimeGranularity::Year => TimeKey::Year(parse_year(cell(&t.column))?),
        }),
        None => None,
    };

    let post_flag = schema.flag.as_ref().is_some_and(|f| {
        let literals = f.truthy.as_deref().unwrap_or(truthy);
        is_truthy(cell(&f.column), literals)
    });

    Some(TypedRecord {
        time,
        value,
        group: schema.group.as_ref().map(|c| cell(c).trim().to_string()),
        category: schema.category.as_ref().map(|c| cell(c).trim().to_string()),
        post_flag,
    })
}

// ---------------------------------------------------------------------------
// Field coercions
// ---------------------------------------------------------------------------

/// Base-10 number; surrounding whitespace is ignored. Empty, non-numeric and
/// non-finite values are rejected.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `"YYYY-MM"` → first day of that month.
pub fn parse_month(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let (year, month) = s.split_once('-')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
}

/// Plain integer year. Whole floats such as `"2021.0"` (as written by some
/// dataframe exporters) are accepted. Years outside the calendar range are
/// rejected.
pub fn parse_year(s: &str) -> Option<i32> {
    let s = s.trim();
    let year = match s.parse::<i32>() {
        Ok(y) => y,
        Err(_) => {
            let f = s.parse::<f64>().ok()?;
            if !(f.is_finite() && f.fract() == 0.0 && f.abs() <= i32::MAX as f64) {
                return None;
            }
            f as i32
        }
    };
    NaiveDate::from_ymd_opt(year, 1, 1).map(|_| year)
}

/// Exact, case-sensitive membership in the accepted literal set.
pub fn is_truthy(s: &str, literals: &[String]) -> bool {
    literals.iter().any(|l| l == s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_csv_str;

    fn truthy() -> Vec<String> {
        vec!["true".into(), "True".into()]
    }

    #[test]
    fn coerces_monthly_rows() {
        let table = parse_csv_str(
            "month,transfer_count,post_nil\n2021-01,50,false\n2021-07,80,true\n",
        )
        .unwrap();
        let out = normalize(&table, &RecordSchema::cfp_monthly(), &truthy()).unwrap();
        assert_eq!(out.dropped, 0);
        assert_eq!(
            out.records,
            vec![
                TypedRecord::monthly(NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(), 50.0, false),
                TypedRecord::monthly(NaiveDate::from_ymd_opt(2021, 7, 1).unwrap(), 80.0, true),
            ]
        );
    }

    #[test]
    fn drops_rows_failing_numeric_or_date_coercion() {
        let table = parse_csv_str(
            "month,transfer_count,post_nil\n\
             2021-01,fifty,false\n\
             2021-02,,false\n\
             2021-13,10,false\n\
             Jan 2021,10,false\n\
             2021-03,NaN,false\n\
             2021-04,12,true\n",
        )
        .unwrap();
        let out = normalize(&table, &RecordSchema::cfp_monthly(), &truthy()).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.dropped, 5);
        assert!(out.records.len() <= table.len());
        assert_eq!(out.records[0].value, 12.0);
    }

    #[test]
    fn short_row_is_dropped_and_counted() {
        let table = parse_csv_str(
            "month,post_nil,transfer_count\n2021-01,false,50\n2021-02,false\n2021-07,true,80\n",
        )
        .unwrap();
        let out = normalize(&table, &RecordSchema::cfp_monthly(), &truthy()).unwrap();
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.dropped, 1);
    }

    #[test]
    fn truthy_literals_are_an_explicit_set() {
        let literals = truthy();
        assert!(is_truthy("true", &literals));
        assert!(is_truthy("True", &literals));
        assert!(!is_truthy("TRUE", &literals));
        assert!(!is_truthy("1", &literals));
        assert!(!is_truthy("yes", &literals));
        assert!(!is_truthy("", &literals));
    }

    #[test]
    fn schema_literals_override_the_default_set() {
        let table = parse_csv_str(
            "period,class_year,transfer_count\nPre-NIL,Junior,520\nPost-NIL,Junior,680\nPost-NIL,Senior,0\n",
        )
        .unwrap();
        let out = normalize(&table, &RecordSchema::class_year(), &truthy()).unwrap();
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.dropped, 1);
        assert!(!out.records[0].post_flag);
        assert!(out.records[1].post_flag);
        assert_eq!(out.records[1].category.as_deref(), Some("Post-NIL"));
        assert_eq!(out.records[1].group.as_deref(), Some("Junior"));
    }

    #[test]
    fn missing_column_is_a_schema_error() {
        let table = parse_csv_str("year,athletes\n2020,10\n").unwrap();
        let err = normalize(&table, &RecordSchema::ncaa_yearly(), &truthy()).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingColumn {
                schema: "ncaa_yearly",
                column: "total_transfers".into()
            }
        );
    }

    #[test]
    fn parses_years_and_numbers() {
        assert_eq!(parse_year("2021"), Some(2021));
        assert_eq!(parse_year(" 2021.0 "), Some(2021));
        assert_eq!(parse_year("2021.5"), None);
        assert_eq!(parse_year("twenty"), None);
        assert_eq!(parse_year("999999"), None);
        assert_eq!(parse_year("-999999.0"), None);
        assert_eq!(parse_number(" 42 "), Some(42.0));
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_month("2021-7"), None);
        assert_eq!(parse_month("2021-07"), NaiveDate::from_ymd_opt(2021, 7, 1));
    }
}
