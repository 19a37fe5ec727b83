use std::fmt;

use super::aggregate::{GroupRanking, rank_groups};
use super::model::TypedRecord;

/// Sentinel emitted by filter controls meaning "no filtering".
pub const ALL: &str = "All";

// ---------------------------------------------------------------------------
// Filter predicate: which group is selected
// ---------------------------------------------------------------------------

/// Selection state of a single-choice group filter (dropdown).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GroupSelection {
    #[default]
    All,
    Only(String),
}

impl GroupSelection {
    /// Interpret the raw string emitted by a filter control.
    pub fn from_control(value: &str) -> Self {
        if value == ALL {
            GroupSelection::All
        } else {
            GroupSelection::Only(value.to_string())
        }
    }

    /// A record passes when nothing is selected, or when its group equals the
    /// selected key. Records without a group only pass `All`.
    pub fn matches(&self, record: &TypedRecord) -> bool {
        match self {
            GroupSelection::All => true,
            GroupSelection::Only(key) => record.group.as_deref() == Some(key.as_str()),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, GroupSelection::All)
    }
}

impl fmt::Display for GroupSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupSelection::All => f.write_str(ALL),
            GroupSelection::Only(key) => f.write_str(key),
        }
    }
}

/// Records passing `selection`, in input order. `All` returns every record
/// unaggregated. An unknown key yields an empty vector.
pub fn filtered_records(records: &[TypedRecord], selection: &GroupSelection) -> Vec<TypedRecord> {
    if selection.is_all() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| selection.matches(r))
        .cloned()
        .collect()
}

/// Dropdown entries: the `All` sentinel followed by the ranked group keys.
pub fn filter_options(records: &[TypedRecord], ranking: GroupRanking) -> Vec<String> {
    std::iter::once(ALL.to_string())
        .chain(rank_groups(records, ranking).into_iter().map(|g| g.key))
        .collect()
}
