use std::collections::BTreeMap;

use super::model::{TimeKey, TypedRecord};

/// How the values sharing one bucket are reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reducer {
    #[default]
    Sum,
    Mean,
}

/// All records sharing a (time, group) pair, reduced to one value.
///
/// `post_flag` and `category` are taken from the first member seen in input
/// order; every member of a time bucket shares an era by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedBucket {
    pub time: Option<TimeKey>,
    pub group: Option<String>,
    pub category: Option<String>,
    pub value: f64,
    pub post_flag: bool,
    pub members: usize,
}

impl From<AggregatedBucket> for TypedRecord {
    fn from(b: AggregatedBucket) -> Self {
        TypedRecord {
            time: b.time,
            value: b.value,
            group: b.group,
            category: b.category,
            post_flag: b.post_flag,
        }
    }
}

type BucketKey = (Option<TimeKey>, Option<String>);

fn reduce_into(
    records: &[TypedRecord],
    reducer: Reducer,
    key_of: impl Fn(&TypedRecord) -> BucketKey,
) -> Vec<AggregatedBucket> {
    let mut buckets: BTreeMap<BucketKey, AggregatedBucket> = BTreeMap::new();

    for r in records {
        let key = key_of(r);
        let bucket = buckets.entry(key.clone()).or_insert_with(|| AggregatedBucket {
            time: key.0,
            group: key.1,
            category: r.category.clone(),
            value: 0.0,
            post_flag: r.post_flag,
            members: 0,
        });
        bucket.value += r.value;
        bucket.members += 1;
    }

    let mut out: Vec<AggregatedBucket> = buckets.into_values().collect();
    if reducer == Reducer::Mean {
        for b in &mut out {
            b.value /= b.members as f64;
        }
    }
    out
}

/// Reduce records per (time, group) pair. Output is ordered by time, then
/// group.
pub fn bucket(records: &[TypedRecord], reducer: Reducer) -> Vec<AggregatedBucket> {
    reduce_into(records, reducer, |r| (r.time, r.group.clone()))
}

/// Reduce records per time bucket across all groups (the "all positions"
/// line). The resulting buckets carry no group.
pub fn bucket_by_time(records: &[TypedRecord], reducer: Reducer) -> Vec<AggregatedBucket> {
    reduce_into(records, reducer, |r| (r.time, None))
}

/// Partition records by group label, preserving input order inside each
/// group. Records without a group are left out.
pub fn group_by(records: &[TypedRecord]) -> BTreeMap<String, Vec<TypedRecord>> {
    let mut groups: BTreeMap<String, Vec<TypedRecord>> = BTreeMap::new();
    for r in records {
        if let Some(g) = &r.group {
            groups.entry(g.clone()).or_default().push(r.clone());
        }
    }
    groups
}

// ---------------------------------------------------------------------------
// Group enumeration for filter controls
// ---------------------------------------------------------------------------

/// Ordering of group keys offered by a filter control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupRanking {
    /// Largest total first; ties broken lexically. Used for positions.
    ByTotalDesc,
    /// Plain lexical order. Used for sports.
    Lexical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub key: String,
    pub total: f64,
    pub records: usize,
}

/// Deduplicated group keys with their totals, in `ranking` order.
pub fn rank_groups(records: &[TypedRecord], ranking: GroupRanking) -> Vec<GroupSummary> {
    let mut summaries: Vec<GroupSummary> = group_by(records)
        .into_iter()
        .map(|(key, members)| GroupSummary {
            total: members.iter().map(|r| r.value).sum(),
            records: members.len(),
            key,
        })
        .collect();

    // group_by already yields lexical order
    if ranking == GroupRanking::ByTotalDesc {
        summaries.sort_by(|a, b| b.total.total_cmp(&a.total).then_with(|| a.key.cmp(&b.key)));
    }
    summaries
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn month(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, m, 1).unwrap()
    }

    fn position_rows() -> Vec<TypedRecord> {
        vec![
            TypedRecord::monthly(month(1), 5.0, false).with_group("QB"),
            TypedRecord::monthly(month(1), 7.0, false).with_group("WR"),
            TypedRecord::monthly(month(7), 3.0, true).with_group("QB"),
            TypedRecord::monthly(month(7), 11.0, true).with_group("WR"),
            TypedRecord::monthly(month(7), 2.0, true).with_group("QB"),
        ]
    }

    #[test]
    fn sums_shared_time_and_group() {
        let buckets = bucket(&position_rows(), Reducer::Sum);
        assert_eq!(buckets.len(), 4);
        let qb_july = buckets
            .iter()
            .find(|b| b.group.as_deref() == Some("QB") && b.time == Some(TimeKey::Month(month(7))))
            .unwrap();
        assert_eq!(qb_july.value, 5.0);
        assert_eq!(qb_july.members, 2);
        assert!(qb_july.post_flag);
    }

    #[test]
    fn mean_reducer_divides_by_members() {
        let buckets = bucket_by_time(&position_rows(), Reducer::Mean);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].value, 6.0);
        assert!((buckets[1].value - 16.0 / 3.0).abs() < 1e-12);
        assert!(buckets.iter().all(|b| b.group.is_none()));
    }

    #[test]
    fn sum_is_independent_of_input_order() {
        let rows = position_rows();
        let mut reversed = rows.clone();
        reversed.reverse();
        let mut rotated = rows.clone();
        rotated.rotate_left(2);

        let totals = |rs: &[TypedRecord]| -> Vec<f64> {
            bucket(rs, Reducer::Sum).iter().map(|b| b.value).collect()
        };
        assert_eq!(totals(&rows), totals(&reversed));
        assert_eq!(totals(&rows), totals(&rotated));
    }

    #[test]
    fn representative_fields_are_first_seen() {
        // Same bucket, conflicting flags: the first record wins.
        let rows = vec![
            TypedRecord::monthly(month(3), 1.0, false).with_category("first"),
            TypedRecord::monthly(month(3), 2.0, true).with_category("second"),
        ];
        let forward = bucket(&rows, Reducer::Sum);
        assert!(!forward[0].post_flag);
        assert_eq!(forward[0].category.as_deref(), Some("first"));

        let backward: Vec<TypedRecord> = rows.into_iter().rev().collect();
        let backward = bucket(&backward, Reducer::Sum);
        assert!(backward[0].post_flag);
        assert_eq!(backward[0].category.as_deref(), Some("second"));
        assert_eq!(forward[0].value, backward[0].value);
    }

    #[test]
    fn ranks_positions_by_total_and_sports_lexically() {
        let ranked: Vec<String> = rank_groups(&position_rows(), GroupRanking::ByTotalDesc)
            .into_iter()
            .map(|g| g.key)
            .collect();
        assert_eq!(ranked, vec!["WR", "QB"]);

        let sports = vec![
            TypedRecord::yearly(2020, 900.0).with_group("Soccer"),
            TypedRecord::yearly(2020, 10.0).with_group("Baseball"),
            TypedRecord::yearly(2021, 5.0).with_group("Soccer"),
        ];
        let ranked = rank_groups(&sports, GroupRanking::Lexical);
        assert_eq!(ranked[0].key, "Baseball");
        assert_eq!(ranked[1].key, "Soccer");
        assert_eq!(ranked[1].total, 905.0);
        assert_eq!(ranked[1].records, 2);
    }

    #[test]
    fn ties_break_lexically() {
        let rows = vec![
            TypedRecord::yearly(2020, 4.0).with_group("TE"),
            TypedRecord::yearly(2020, 4.0).with_group("DL"),
        ];
        let ranked = rank_groups(&rows, GroupRanking::ByTotalDesc);
        assert_eq!(ranked[0].key, "DL");
    }

    #[test]
    fn group_by_skips_ungrouped_records() {
        let mut rows = position_rows();
        rows.push(TypedRecord::monthly(month(2), 1.0, false));
        let groups = group_by(&rows);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["QB"].len(), 3);
    }
}
