//! Usage and revenue aggregation per supplier identity
//!
//! A pure read-model: given the identity set plus the material and invoice
//! lists, compute per-name approved-invoice totals and linked-material
//! counts. Nothing is mutated, and only `approved` invoices count toward
//! any figure.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::entities::{Invoice, InvoiceStatus, Material};
use crate::resolve::identity::SupplierIdentity;

/// Aggregated usage figures for one supplier identity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageStats {
    /// Sum of approved invoice totals, lifetime
    pub total_approved_revenue: f64,
    /// Sum of approved invoice totals dated in the current calendar month
    pub current_month_approved_revenue: f64,
    /// Number of approved invoices
    pub approved_invoice_count: usize,
    /// Number of materials referencing this identity's name
    pub material_count: usize,
}

/// Does this invoice belong to the identity? Name match, or VAT match when
/// both sides carry one.
fn invoice_matches(invoice: &Invoice, identity: &SupplierIdentity) -> bool {
    if invoice.supplier_name == identity.name() {
        return true;
    }
    match (identity.vat(), invoice.supplier_vat.as_deref()) {
        (Some(vat), Some(inv_vat)) => !vat.is_empty() && vat == inv_vat,
        _ => false,
    }
}

/// Compute usage stats for every identity, keyed by identity name.
///
/// `today` anchors the current-month figure; callers pass the wall-clock
/// date. Pure function of its inputs.
pub fn compute_usage_stats(
    identities: &[SupplierIdentity],
    materials: &[Material],
    invoices: &[Invoice],
    today: NaiveDate,
) -> BTreeMap<String, UsageStats> {
    let mut stats = BTreeMap::new();

    for identity in identities {
        let mut entry = UsageStats::default();

        for invoice in invoices {
            if invoice.status != InvoiceStatus::Approved || !invoice_matches(invoice, identity) {
                continue;
            }
            entry.total_approved_revenue += invoice.total_amount;
            entry.approved_invoice_count += 1;
            if invoice.invoice_date.year() == today.year()
                && invoice.invoice_date.month() == today.month()
            {
                entry.current_month_approved_revenue += invoice.total_amount;
            }
        }

        entry.material_count = materials
            .iter()
            .filter(|m| m.supplier == identity.name())
            .count();

        stats.insert(identity.name().to_string(), entry);
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Supplier;
    use crate::resolve::identity::{InferredSupplier, SupplierIdentity};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn persisted(name: &str, vat: Option<&str>) -> SupplierIdentity {
        let mut s = Supplier::new(name.to_string(), "x@y.be".to_string(), "test".to_string());
        s.vat = vat.map(str::to_string);
        SupplierIdentity::Persisted(s)
    }

    fn inferred(name: &str) -> SupplierIdentity {
        SupplierIdentity::Inferred(InferredSupplier {
            name: name.to_string(),
        })
    }

    fn invoice(name: &str, status: InvoiceStatus, amount: f64, on: NaiveDate) -> Invoice {
        let mut inv = Invoice::new(name.to_string(), amount, on, "test".to_string());
        inv.status = status;
        inv
    }

    fn material(supplier: &str) -> Material {
        Material::new("Paint".to_string(), supplier.to_string(), "test".to_string())
    }

    #[test]
    fn test_only_approved_invoices_count() {
        let identities = vec![persisted("Verfgroothandel BV", None)];
        let invoices = vec![
            invoice(
                "Verfgroothandel BV",
                InvoiceStatus::Approved,
                500.0,
                date(2026, 3, 10),
            ),
            invoice(
                "Verfgroothandel BV",
                InvoiceStatus::Rejected,
                9000.0,
                date(2026, 3, 11),
            ),
            invoice(
                "Verfgroothandel BV",
                InvoiceStatus::Draft,
                250.0,
                date(2026, 3, 12),
            ),
        ];

        let stats = compute_usage_stats(&identities, &[], &invoices, date(2026, 3, 15));
        let s = &stats["Verfgroothandel BV"];
        assert_eq!(s.total_approved_revenue, 500.0);
        assert_eq!(s.current_month_approved_revenue, 500.0);
        assert_eq!(s.approved_invoice_count, 1);
    }

    #[test]
    fn test_current_month_requires_same_year() {
        let identities = vec![inferred("Lokale Verfwinkel")];
        let invoices = vec![
            invoice(
                "Lokale Verfwinkel",
                InvoiceStatus::Approved,
                100.0,
                date(2025, 3, 10),
            ),
            invoice(
                "Lokale Verfwinkel",
                InvoiceStatus::Approved,
                40.0,
                date(2026, 3, 20),
            ),
        ];

        let stats = compute_usage_stats(&identities, &[], &invoices, date(2026, 3, 1));
        let s = &stats["Lokale Verfwinkel"];
        assert_eq!(s.total_approved_revenue, 140.0);
        assert_eq!(s.current_month_approved_revenue, 40.0);
        assert_eq!(s.approved_invoice_count, 2);
    }

    #[test]
    fn test_vat_match_pulls_in_renamed_invoices() {
        let identities = vec![persisted("Verfgroothandel BV", Some("BE0123456789"))];
        let mut inv = invoice(
            "Verfgroothandel",
            InvoiceStatus::Approved,
            75.0,
            date(2026, 3, 5),
        );
        inv.supplier_vat = Some("BE0123456789".to_string());

        let stats = compute_usage_stats(&identities, &[], &[inv], date(2026, 3, 15));
        assert_eq!(stats["Verfgroothandel BV"].approved_invoice_count, 1);
    }

    #[test]
    fn test_material_count_is_exact_name_match() {
        let identities = vec![persisted("Jansen Schilderwerken", None)];
        let materials = vec![
            material("Jansen Schilderwerken"),
            material("Jansen Schilderwerken"),
            material("jansen schilderwerken"),
        ];

        let stats = compute_usage_stats(&identities, &materials, &[], date(2026, 3, 15));
        assert_eq!(stats["Jansen Schilderwerken"].material_count, 2);
    }

    #[test]
    fn test_identity_without_records_gets_zero_row() {
        let identities = vec![persisted("ABC Verf", None)];
        let stats = compute_usage_stats(&identities, &[], &[], date(2026, 3, 15));
        assert_eq!(stats["ABC Verf"], UsageStats::default());
    }
}
