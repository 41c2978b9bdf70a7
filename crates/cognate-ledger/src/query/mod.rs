//! Filter, sort, and paginate over the ledger.
//!
//! A query is answered from index buckets when the filter names an indexed
//! dimension (actor type, category, severity, space, tag, flagged) and from
//! a full scan otherwise. Either way every candidate is re-checked against
//! the whole filter, so the plan never changes the result.

mod engine;
mod filter;
mod page;
mod sort;

pub use engine::QueryEngine;
pub use filter::LedgerFilter;
pub use page::{Page, Pagination, QueryPlan, QueryWarning};
pub use sort::{Sort, SortDirection, SortField, SortKey};
