use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use cognate_types::{ActionCategory, LedgerEntry, Severity};
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    When,
    Sequence,
    Severity,
    Category,
}

impl SortField {
    pub const ALL: [SortField; 4] = [
        SortField::When,
        SortField::Sequence,
        SortField::Severity,
        SortField::Category,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::When => "when",
            Self::Sequence => "sequence",
            Self::Severity => "severity",
            Self::Category => "category",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| QueryError::UnknownSortField(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            _ => Err(QueryError::UnknownSortDirection(s.to_string())),
        }
    }
}

/// Sort order for a query. Entries whose keys compare equal are always
/// ordered by ascending sequence, whatever the direction.
///
/// The default is newest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Sort {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn asc(field: SortField) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: SortField) -> Self {
        Self::new(field, SortDirection::Desc)
    }

    /// Order two entries.
    pub fn compare(&self, a: &LedgerEntry, b: &LedgerEntry) -> Ordering {
        self.compare_positions(
            &SortKey::of(a, self.field),
            a.sequence,
            &SortKey::of(b, self.field),
            b.sequence,
        )
    }

    /// Order two `(key, sequence)` positions. Both keys must belong to this
    /// sort's field.
    pub(crate) fn compare_positions(
        &self,
        a_key: &SortKey,
        a_sequence: u64,
        b_key: &SortKey,
        b_sequence: u64,
    ) -> Ordering {
        let primary = a_key.cmp_same_field(b_key);
        let primary = match self.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then(a_sequence.cmp(&b_sequence))
    }
}

/// The value an entry is sorted on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum SortKey {
    When(DateTime<Utc>),
    Sequence(u64),
    Severity(Severity),
    Category(ActionCategory),
}

impl SortKey {
    pub fn of(entry: &LedgerEntry, field: SortField) -> Self {
        match field {
            SortField::When => Self::When(entry.event.when),
            SortField::Sequence => Self::Sequence(entry.sequence),
            SortField::Severity => Self::Severity(entry.event.what.severity),
            SortField::Category => Self::Category(entry.event.what.category),
        }
    }

    pub fn field(&self) -> SortField {
        match self {
            Self::When(_) => SortField::When,
            Self::Sequence(_) => SortField::Sequence,
            Self::Severity(_) => SortField::Severity,
            Self::Category(_) => SortField::Category,
        }
    }

    /// Severity compares by rank (`debug < ... < critical`); category by
    /// name.
    fn cmp_same_field(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::When(a), Self::When(b)) => a.cmp(b),
            (Self::Sequence(a), Self::Sequence(b)) => a.cmp(b),
            (Self::Severity(a), Self::Severity(b)) => a.rank().cmp(&b.rank()),
            (Self::Category(a), Self::Category(b)) => a.as_str().cmp(b.as_str()),
            // Keys of different fields never meet; cursors are checked
            // against the sort before use.
            _ => self.field().as_str().cmp(other.field().as_str()),
        }
    }
}
