//! Supplier identity resolution and consolidation
//!
//! Suppliers are referenced from materials and invoices by name text, not
//! by id, so "same vendor" is only approximately recoverable. This module
//! is the layer that recovers it:
//!
//! - [`identity`] synthesizes the combined identity set (persisted records
//!   plus identities inferred from bare name references)
//! - [`dedupe`] flags identity pairs that likely denote the same vendor
//! - [`stats`] aggregates approved-invoice revenue and material counts per
//!   identity
//! - [`merge`] consolidates a source identity into a persisted target,
//!   repointing dependent materials and retiring the source

pub mod dedupe;
pub mod identity;
pub mod merge;
pub mod stats;

pub use dedupe::{bigram_similarity, detect_duplicates, duplicate_pairs, DuplicatePair, DuplicateReason};
pub use identity::{synthesize_identities, IdentityKey, InferredSupplier, SupplierIdentity};
pub use merge::{merge_suppliers, pending_intents, resume_merge, MergeError, MergeIntent, MergeOutcome, MigrationFailure};
pub use stats::{compute_usage_stats, UsageStats};
