//! Supplier entity type - vendors the contractor buys paint and materials from

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::entity::Record;
use crate::core::identity::{RecordId, RecordPrefix};

/// Supplier lifecycle status
///
/// Suppliers are never hard-deleted while materials or invoices still
/// reference them; they are suspended instead. The only other way a
/// supplier record disappears is as the source of a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplierStatus {
    #[default]
    Active,
    Suspended,
}

impl std::fmt::Display for SupplierStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupplierStatus::Active => write!(f, "active"),
            SupplierStatus::Suspended => write!(f, "suspended"),
        }
    }
}

impl std::str::FromStr for SupplierStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(SupplierStatus::Active),
            "suspended" => Ok(SupplierStatus::Suspended),
            _ => Err(format!("Unknown status: {}. Use 'active' or 'suspended'", s)),
        }
    }
}

/// A Supplier record - a vendor with contact details and a VAT number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    /// Unique identifier
    pub id: RecordId,

    /// Display name. Materials and invoices reference suppliers by this
    /// text, not by id, so renaming a supplier orphans its references.
    pub name: String,

    /// VAT number (e.g., "BE0123456789"). Authoritative for duplicate
    /// detection when both sides carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat: Option<String>,

    /// Contact email (required)
    pub email: String,

    /// Contact phone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Postal address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Logo file reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,

    /// Specialty tags (e.g., "lakken", "spuitwerk")
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specialties: Vec<String>,

    /// Current status
    #[serde(default)]
    pub status: SupplierStatus,

    /// Free-form notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Author (who created this supplier)
    pub author: String,
}

impl Record for Supplier {
    const PREFIX: &'static str = "SUP";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl Supplier {
    /// Create a new supplier with the given parameters
    pub fn new(name: String, email: String, author: String) -> Self {
        Self {
            id: RecordId::new(RecordPrefix::Sup),
            name,
            vat: None,
            email,
            phone: None,
            address: None,
            logo: None,
            specialties: Vec::new(),
            status: SupplierStatus::default(),
            notes: None,
            created: Utc::now(),
            author,
        }
    }

    /// Check required fields before any store write
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        validate_email(&self.email)?;
        Ok(())
    }
}

/// Check that an email is non-empty and has the shape `local@domain.tld`
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::MissingEmail);
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::MalformedEmail(email.to_string()));
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(ValidationError::MalformedEmail(email.to_string()));
    }
    Ok(())
}

/// Rejected supplier input, checked before any file is written
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("supplier name is required")]
    MissingName,

    #[error("contact email is required")]
    MissingEmail,

    #[error("'{0}' is not a valid email address")]
    MalformedEmail(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supplier_creation() {
        let sup = Supplier::new(
            "Verfgroothandel BV".to_string(),
            "info@verfgroothandel.be".to_string(),
            "test".to_string(),
        );

        assert!(sup.id.to_string().starts_with(Supplier::PREFIX));
        assert_eq!(sup.name, "Verfgroothandel BV");
        assert_eq!(sup.status, SupplierStatus::Active);
        assert!(sup.validate().is_ok());
    }

    #[test]
    fn test_supplier_roundtrip() {
        let mut sup = Supplier::new(
            "Jansen Schilderwerken".to_string(),
            "jan@jansen.nl".to_string(),
            "test".to_string(),
        );
        sup.vat = Some("NL111111111B01".to_string());
        sup.specialties = vec!["lakken".to_string()];

        let yaml = serde_yml::to_string(&sup).unwrap();
        let parsed: Supplier = serde_yml::from_str(&yaml).unwrap();

        assert_eq!(sup.id, parsed.id);
        assert_eq!(sup.name, parsed.name);
        assert_eq!(sup.vat, parsed.vat);
        assert_eq!(sup.specialties, parsed.specialties);
    }

    #[test]
    fn test_status_serialization() {
        let mut sup = Supplier::new(
            "ABC Verf".to_string(),
            "abc@verf.nl".to_string(),
            "test".to_string(),
        );
        sup.status = SupplierStatus::Suspended;

        let yaml = serde_yml::to_string(&sup).unwrap();
        assert!(yaml.contains("status: suspended"));
    }

    #[test]
    fn test_validation_rejects_missing_name() {
        let sup = Supplier::new("  ".to_string(), "a@b.com".to_string(), "test".to_string());
        assert!(matches!(
            sup.validate().unwrap_err(),
            ValidationError::MissingName
        ));
    }

    #[test]
    fn test_validation_rejects_bad_email() {
        assert!(matches!(
            validate_email("").unwrap_err(),
            ValidationError::MissingEmail
        ));
        assert!(matches!(
            validate_email("not-an-email").unwrap_err(),
            ValidationError::MalformedEmail(_)
        ));
        assert!(matches!(
            validate_email("a@nodot").unwrap_err(),
            ValidationError::MalformedEmail(_)
        ));
        assert!(validate_email("info@verf.be").is_ok());
    }
}
