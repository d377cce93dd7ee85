//! Record trait - common interface for all record types

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::core::identity::RecordId;

/// Common trait for all KBT records
pub trait Record: Serialize + DeserializeOwned {
    /// The record type prefix (e.g., "SUP", "MAT")
    const PREFIX: &'static str;

    /// Get the record's unique ID
    fn id(&self) -> &RecordId;

    /// Get the record's display name
    fn name(&self) -> &str;

    /// Get the creation timestamp
    fn created(&self) -> DateTime<Utc>;

    /// Get the author
    fn author(&self) -> &str;
}
