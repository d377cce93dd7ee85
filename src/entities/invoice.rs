//! Invoice entity type - purchase invoices received from suppliers
//!
//! Invoices are read-only from the identity-resolution layer's point of
//! view: a merge never rewrites `supplier_name`, so historical invoices
//! keep the text they were booked under.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Record;
use crate::core::identity::{RecordId, RecordPrefix};

/// Invoice status; only `approved` invoices count toward revenue figures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceStatus::Draft => write!(f, "draft"),
            InvoiceStatus::Submitted => write!(f, "submitted"),
            InvoiceStatus::Approved => write!(f, "approved"),
            InvoiceStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(InvoiceStatus::Draft),
            "submitted" => Ok(InvoiceStatus::Submitted),
            "approved" => Ok(InvoiceStatus::Approved),
            "rejected" => Ok(InvoiceStatus::Rejected),
            _ => Err(format!(
                "Unknown status: {}. Use draft, submitted, approved, or rejected",
                s
            )),
        }
    }
}

/// An Invoice record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier
    pub id: RecordId,

    /// Supplier's invoice number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,

    /// Supplier name as printed on the invoice (weak reference by name)
    pub supplier_name: String,

    /// Supplier VAT number as printed on the invoice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_vat: Option<String>,

    /// Approval status
    #[serde(default)]
    pub status: InvoiceStatus,

    /// Invoice total including VAT
    pub total_amount: f64,

    /// Date on the invoice
    pub invoice_date: NaiveDate,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Author (who recorded this invoice)
    pub author: String,
}

impl Record for Invoice {
    const PREFIX: &'static str = "INV";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.supplier_name
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl Invoice {
    /// Create a new invoice with the given parameters
    pub fn new(
        supplier_name: String,
        total_amount: f64,
        invoice_date: NaiveDate,
        author: String,
    ) -> Self {
        Self {
            id: RecordId::new(RecordPrefix::Inv),
            number: None,
            supplier_name,
            supplier_vat: None,
            status: InvoiceStatus::default(),
            total_amount,
            invoice_date,
            created: Utc::now(),
            author,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_invoice_creation() {
        let inv = Invoice::new(
            "Verfgroothandel BV".to_string(),
            512.50,
            date(2026, 3, 14),
            "test".to_string(),
        );

        assert!(inv.id.to_string().starts_with(Invoice::PREFIX));
        assert_eq!(inv.status, InvoiceStatus::Draft);
        assert_eq!(inv.total_amount, 512.50);
    }

    #[test]
    fn test_invoice_roundtrip() {
        let mut inv = Invoice::new(
            "ABC Verf".to_string(),
            99.99,
            date(2026, 1, 31),
            "test".to_string(),
        );
        inv.supplier_vat = Some("NL111111111B01".to_string());
        inv.status = InvoiceStatus::Approved;

        let yaml = serde_yml::to_string(&inv).unwrap();
        let parsed: Invoice = serde_yml::from_str(&yaml).unwrap();

        assert_eq!(inv.id, parsed.id);
        assert_eq!(inv.supplier_vat, parsed.supplier_vat);
        assert_eq!(parsed.status, InvoiceStatus::Approved);
        assert_eq!(parsed.invoice_date, date(2026, 1, 31));
    }

    #[test]
    fn test_status_serialization() {
        let mut inv = Invoice::new(
            "ABC Verf".to_string(),
            10.0,
            date(2026, 2, 2),
            "test".to_string(),
        );
        inv.status = InvoiceStatus::Rejected;

        let yaml = serde_yml::to_string(&inv).unwrap();
        assert!(yaml.contains("status: rejected"));
    }
}
