//! Supplier identities - the unifying view over persisted supplier records
//! and identities inferred from bare name references
//!
//! Materials and invoices reference suppliers by display name only. Any
//! referenced name with no exactly-matching persisted supplier still denotes
//! a real vendor, so it is synthesized into an [`InferredSupplier`] at read
//! time. Inferred identities are never stored; they are recomputed on every
//! load and disappear once no record names them.

use std::collections::HashSet;
use std::fmt;

use crate::core::identity::RecordId;
use crate::entities::{Invoice, Material, Supplier};

/// The value used to group records as referring to the same supplier:
/// the record id for persisted suppliers, the bare name for inferred ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IdentityKey {
    Id(RecordId),
    Name(String),
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Id(id) => write!(f, "{}", id),
            IdentityKey::Name(name) => write!(f, "{}", name),
        }
    }
}

/// A supplier identity that exists only as a name referenced by materials
/// or invoices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredSupplier {
    pub name: String,
}

/// A supplier identity, persisted or inferred
///
/// Operations that need a stable record to attach to (merge targets) take
/// [`Supplier`] directly, so "merge into an inferred supplier" is not
/// representable.
#[derive(Debug, Clone)]
pub enum SupplierIdentity {
    Persisted(Supplier),
    Inferred(InferredSupplier),
}

impl SupplierIdentity {
    /// The display name, whichever variant
    pub fn name(&self) -> &str {
        match self {
            SupplierIdentity::Persisted(s) => &s.name,
            SupplierIdentity::Inferred(i) => &i.name,
        }
    }

    /// The VAT number, if this identity is persisted and has one
    pub fn vat(&self) -> Option<&str> {
        match self {
            SupplierIdentity::Persisted(s) => s.vat.as_deref(),
            SupplierIdentity::Inferred(_) => None,
        }
    }

    /// The grouping key: record id when persisted, name otherwise
    pub fn key(&self) -> IdentityKey {
        match self {
            SupplierIdentity::Persisted(s) => IdentityKey::Id(s.id.clone()),
            SupplierIdentity::Inferred(i) => IdentityKey::Name(i.name.clone()),
        }
    }

    /// The persisted record, if any
    pub fn as_persisted(&self) -> Option<&Supplier> {
        match self {
            SupplierIdentity::Persisted(s) => Some(s),
            SupplierIdentity::Inferred(_) => None,
        }
    }

    pub fn is_inferred(&self) -> bool {
        matches!(self, SupplierIdentity::Inferred(_))
    }
}

/// Build the combined identity set: every persisted supplier, plus one
/// inferred identity per distinct referenced name with no case-sensitive
/// exact match among persisted supplier names.
///
/// Deterministic given identical inputs: persisted suppliers keep their
/// input order, inferred identities appear in first-seen order (materials
/// before invoices). Empty names are ignored. A name differing from a
/// persisted supplier's only by case or whitespace is still unmatched here;
/// it surfaces as an inferred identity and the duplicate detector flags the
/// pair.
pub fn synthesize_identities(
    suppliers: &[Supplier],
    materials: &[Material],
    invoices: &[Invoice],
) -> Vec<SupplierIdentity> {
    let persisted_names: HashSet<&str> = suppliers.iter().map(|s| s.name.as_str()).collect();

    let mut identities: Vec<SupplierIdentity> = suppliers
        .iter()
        .cloned()
        .map(SupplierIdentity::Persisted)
        .collect();

    let mut seen: HashSet<&str> = HashSet::new();
    let referenced = materials
        .iter()
        .map(|m| m.supplier.as_str())
        .chain(invoices.iter().map(|i| i.supplier_name.as_str()));

    for name in referenced {
        if name.is_empty() || persisted_names.contains(name) || !seen.insert(name) {
            continue;
        }
        identities.push(SupplierIdentity::Inferred(InferredSupplier {
            name: name.to_string(),
        }));
    }

    identities
}
