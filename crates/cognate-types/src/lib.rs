//! Foundation types for the Cognate Ledger.
//!
//! Every ledger entry describes one significant system event along six fixed
//! dimensions: Who, What, When, Where, Why and How. This crate provides the
//! closed record types for those dimensions plus the identifiers and hashes
//! that the rest of the workspace builds on.
//!
//! # Key Types
//!
//! - [`SixW`] — The hashed six-dimension payload of an entry
//! - [`LedgerEntry`] — An immutable sealed entry plus its mutable [`Annotation`]
//! - [`ContentHash`] — 32-byte chain hash (BLAKE3)
//! - [`EntryId`] — UUID v7 entry identifier
//! - [`ActorType`], [`ActionCategory`], [`Severity`], [`ActionStatus`],
//!   [`Trigger`], [`ReviewStatus`] — closed enumerations

#[macro_use]
mod macros;

pub mod action;
pub mod actor;
pub mod entry;
pub mod error;
pub mod hash;
pub mod id;
pub mod location;
pub mod method;
pub mod reason;

pub use action::{Action, ActionCategory, ActionStatus, Severity};
pub use actor::{Actor, ActorType};
pub use entry::{
    Annotation, CryptoSeal, Evidence, LedgerEntry, RelatedEntity, ReviewStatus, SealedEntry, SixW,
};
pub use error::TypeError;
pub use hash::ContentHash;
pub use id::EntryId;
pub use location::Location;
pub use method::{Method, ResourceUsage};
pub use reason::{Reason, Trigger};
