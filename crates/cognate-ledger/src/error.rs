use cognate_crypto::{HasherError, SignatureError};

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid event payload: {0}")]
    Validation(#[from] ValidationError),

    #[error("invalid query: {0}")]
    Query(#[from] QueryError),

    #[error("chain integrity failure at sequence {sequence}: {reason}")]
    ChainIntegrity { sequence: u64, reason: String },

    #[error("entries out of order at sequence {sequence}")]
    OutOfOrder { sequence: u64 },

    #[error("no sequence number follows {last}")]
    SequenceExhausted { last: u64 },

    #[error("duplicate entry id {0}")]
    DuplicateId(String),

    #[error("invalid sequence range: from={from}, to={to}")]
    InvalidRange { from: u64, to: u64 },

    #[error("entry not found at sequence {0}")]
    EntryNotFound(u64),

    #[error("operation cancelled")]
    Cancelled,

    #[error("ledger {0} lock poisoned")]
    LockPoisoned(&'static str),

    #[error("hashing failed: {0}")]
    Hasher(#[from] HasherError),

    #[error("signing failed: {0}")]
    Signature(#[from] SignatureError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Reasons an append payload is rejected. Nothing is appended.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("who.id must not be empty")]
    MissingActorId,

    #[error("what.type must not be empty")]
    MissingActionType,

    #[error("why.confidence must be within [0, 1], got {0}")]
    ConfidenceOutOfRange(f64),

    #[error("tags must not be empty strings")]
    EmptyTag,

    #[error("evidence #{index} is invalid: {reason}")]
    InvalidEvidence { index: usize, reason: String },

    #[error("how.resources.cost must not be negative, got {0}")]
    NegativeResourceCost(f64),

    #[error("how.resources.cost must be a finite number, got {0}")]
    NonFiniteResourceCost(f64),

    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Invalid filter, sort, or pagination parameters. Raised before any entry
/// is read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("page numbers start at 1")]
    InvalidPage,

    #[error("page size must be at least 1")]
    InvalidPageSize,

    #[error("page size {requested} exceeds the maximum of {max}")]
    PageSizeTooLarge { requested: u32, max: u32 },

    #[error("date range starts after it ends")]
    InvalidDateRange,

    #[error("cursor could not be decoded: {0}")]
    InvalidCursor(String),

    #[error("cursor was issued for a different sort order")]
    CursorSortMismatch,

    #[error("unknown sort field: {0:?}")]
    UnknownSortField(String),

    #[error("unknown sort direction: {0:?}")]
    UnknownSortDirection(String),
}
