//! The Cognate Ledger: an append-only, tamper-evident audit trail.
//!
//! Every significant system event is recorded as a [`LedgerEntry`] along
//! six dimensions (Who, What, When, Where, Why, How), hash-chained to the
//! entry before it. This crate provides:
//! - `EventRecorder`, the single append path (validate, hash, sign, publish)
//! - `ChainVerifier` for range audits that report the first broken link
//! - `IndexManager`, incrementally maintained lookups by dimension value
//! - `QueryEngine` with AND/OR filters, deterministic sorts, and page or
//!   cursor pagination, falling back to a full scan when an index is suspect
//! - Merkle checkpoints, JSON Lines export/restore, and integrity alerting
//! - The [`Ledger`] service handle tying these together
//!
//! [`LedgerEntry`]: cognate_types::LedgerEntry

pub mod alert;
pub mod annotate;
pub mod cancel;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod index;
pub mod ledger;
pub mod payload;
pub mod query;
pub mod recorder;
pub mod replay;
pub mod stats;
pub mod store;
pub mod traits;
pub mod verify;

#[cfg(test)]
mod test_support;

pub use alert::{CollectingAlertSink, IntegrityAlertSink, TracingAlertSink};
pub use annotate::AnnotationUpdate;
pub use cancel::CancelToken;
pub use checkpoint::{Checkpoint, InclusionProof};
pub use config::LedgerConfig;
pub use error::{LedgerError, QueryError, ValidationError};
pub use index::{IndexInconsistency, IndexKey, IndexManager};
pub use ledger::{Ledger, LedgerBuilder};
pub use payload::EventPayload;
pub use query::{
    LedgerFilter, Page, Pagination, QueryEngine, QueryPlan, QueryWarning, Sort, SortDirection,
    SortField, SortKey,
};
pub use recorder::EventRecorder;
pub use replay::{export_jsonl, read_jsonl, restore};
pub use stats::LedgerStats;
pub use store::{LedgerStore, Tail};
pub use traits::{LedgerReader, LedgerWriter};
pub use verify::{
    BreakKind, BrokenLink, ChainVerifier, SequenceRange, VerificationOutcome, VerificationReport,
};
