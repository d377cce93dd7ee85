//! Material entity type - paint, primer, tools and other consumables

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Record;
use crate::core::identity::{RecordId, RecordPrefix};

/// A Material record
///
/// The `supplier` field holds a supplier *name*, not an id. There is no
/// enforced foreign key; the identity-resolution layer reconstructs the
/// relation by text match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    /// Unique identifier
    pub id: RecordId,

    /// Material name (e.g., "Sigma S2U Nova Satin 2.5L")
    pub name: String,

    /// Supplier name this material is bought from (weak reference by name)
    #[serde(default)]
    pub supplier: String,

    /// Unit of purchase (e.g., "liter", "piece")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Price per unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,

    /// Category (e.g., "paint", "primer", "tools")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Author (who created this material)
    pub author: String,
}

impl Record for Material {
    const PREFIX: &'static str = "MAT";

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

impl Material {
    /// Create a new material with the given parameters
    pub fn new(name: String, supplier: String, author: String) -> Self {
        Self {
            id: RecordId::new(RecordPrefix::Mat),
            name,
            supplier,
            unit: None,
            unit_price: None,
            category: None,
            created: Utc::now(),
            author,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_creation() {
        let mat = Material::new(
            "Sigma S2U Nova Satin".to_string(),
            "Verfgroothandel BV".to_string(),
            "test".to_string(),
        );

        assert!(mat.id.to_string().starts_with(Material::PREFIX));
        assert_eq!(mat.supplier, "Verfgroothandel BV");
    }

    #[test]
    fn test_material_roundtrip() {
        let mut mat = Material::new(
            "Painter's tape 50m".to_string(),
            "Lokale Verfwinkel".to_string(),
            "test".to_string(),
        );
        mat.unit = Some("roll".to_string());
        mat.unit_price = Some(4.95);

        let yaml = serde_yml::to_string(&mat).unwrap();
        let parsed: Material = serde_yml::from_str(&yaml).unwrap();

        assert_eq!(mat.id, parsed.id);
        assert_eq!(mat.supplier, parsed.supplier);
        assert_eq!(mat.unit_price, parsed.unit_price);
    }

    #[test]
    fn test_material_supplier_defaults_empty() {
        let yaml = "id: MAT-01HQ3K4N5M6P7R8S9T0VWXYZ01\nname: Brush\ncreated: 2026-01-01T00:00:00Z\nauthor: test\n";
        let parsed: Material = serde_yml::from_str(yaml).unwrap();
        assert_eq!(parsed.supplier, "");
    }
}
