//! Cryptographic primitives for the Cognate Ledger.
//!
//! Provides domain-separated BLAKE3 hashing of six-dimension payloads, the
//! previous-hash link rule, binary Merkle trees for range checkpoints, and a
//! pass-through signing boundary with an Ed25519 adapter.
//!
//! Everything here is pure: no I/O and no shared state.

pub mod chain;
pub mod hasher;
pub mod merkle;
pub mod signer;

pub use chain::{ChainError, ChainLink, HashChain};
pub use hasher::{ContentHasher, HasherError};
pub use merkle::{MerkleProof, MerkleTree, Side};
pub use signer::{verify_signature, Ed25519EntrySigner, EntrySigner, SignatureError};
