use cognate_types::LedgerEntry;
use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::query::sort::{Sort, SortDirection, SortField, SortKey};

/// How to slice the sorted result set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Pagination {
    /// 1-based page number. `page_size` falls back to the configured default.
    Page { page: u32, page_size: Option<u32> },
    /// Entries strictly after `after` (a cursor from a previous page), or
    /// from the start when unset.
    Cursor {
        after: Option<String>,
        limit: Option<u32>,
    },
}

impl Default for Pagination {
    fn default() -> Self {
        Self::first_page()
    }
}

impl Pagination {
    pub fn first_page() -> Self {
        Self::Page {
            page: 1,
            page_size: None,
        }
    }

    pub fn page(page: u32, page_size: u32) -> Self {
        Self::Page {
            page,
            page_size: Some(page_size),
        }
    }

    pub fn cursor(after: Option<String>, limit: u32) -> Self {
        Self::Cursor {
            after,
            limit: Some(limit),
        }
    }

    /// Requested page size, checked against the configured bounds.
    pub(crate) fn size(&self, default: u32, max: u32) -> Result<usize, QueryError> {
        let requested = match self {
            Self::Page { page_size, .. } => page_size,
            Self::Cursor { limit, .. } => limit,
        }
        .unwrap_or(default);

        if requested == 0 {
            return Err(QueryError::InvalidPageSize);
        }
        if requested > max {
            return Err(QueryError::PageSizeTooLarge { requested, max });
        }
        Ok(requested as usize)
    }
}

/// Decoded position of the last entry on a cursor page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct CursorToken {
    pub field: SortField,
    pub direction: SortDirection,
    pub key: SortKey,
    pub sequence: u64,
}

impl CursorToken {
    pub(crate) fn after(entry: &LedgerEntry, sort: Sort) -> Self {
        Self {
            field: sort.field,
            direction: sort.direction,
            key: SortKey::of(entry, sort.field),
            sequence: entry.sequence,
        }
    }

    /// Hex-encoded JSON. Opaque to callers.
    pub(crate) fn encode(&self) -> String {
        // A struct of plain enums and integers always serializes.
        hex::encode(serde_json::to_vec(self).unwrap_or_default())
    }

    /// Decode `raw` and check it was issued for `sort`.
    pub(crate) fn decode(raw: &str, sort: Sort) -> Result<Self, QueryError> {
        let bytes = hex::decode(raw.trim()).map_err(|e| QueryError::InvalidCursor(e.to_string()))?;
        let token: Self =
            serde_json::from_slice(&bytes).map_err(|e| QueryError::InvalidCursor(e.to_string()))?;
        if token.key.field() != token.field {
            return Err(QueryError::InvalidCursor(
                "sort key does not match its field".into(),
            ));
        }
        if token.field != sort.field || token.direction != sort.direction {
            return Err(QueryError::CursorSortMismatch);
        }
        Ok(token)
    }
}

/// How the candidate set for a query was chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum QueryPlan {
    /// Candidates came from index buckets.
    Indexed { candidates: usize },
    /// Every entry in the snapshot was examined.
    FullScan { scanned: usize },
}

/// A non-fatal condition met while answering a query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryWarning {
    /// The index disagreed with the entry set; the query fell back to a
    /// full scan, so results are complete but were slower to produce.
    IndexInconsistent { reason: String },
}

/// One page of query results.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub entries: Vec<LedgerEntry>,
    /// Entries matching the filter, across all pages.
    pub total_count: u64,
    /// 1-based page number; `None` for cursor pagination.
    pub page: Option<u32>,
    pub page_size: u32,
    /// `0` when nothing matched.
    pub total_pages: u32,
    /// Cursor for the entries after this page, when there are any.
    pub next_cursor: Option<String>,
    pub plan: QueryPlan,
    pub warnings: Vec<QueryWarning>,
}

impl Page {
    /// Whether the query ran in degraded mode.
    pub fn degraded(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn sequences(&self) -> Vec<u64> {
        self.entries.iter().map(|e| e.sequence).collect()
    }

    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}

/// `ceil(total / size)`, saturating at `u32::MAX`.
pub(crate) fn page_count(total: usize, size: usize) -> u32 {
    u32::try_from(total.div_ceil(size)).unwrap_or(u32::MAX)
}
