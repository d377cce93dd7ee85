//! Record type definitions
//!
//! KBT manages three record types:
//!
//! - [`Supplier`] - vendors with contact info and VAT numbers
//! - [`Material`] - purchasable materials, referencing suppliers by name
//! - [`Invoice`] - purchase invoices with approval status and totals

pub mod invoice;
pub mod material;
pub mod supplier;

pub use invoice::{Invoice, InvoiceStatus};
pub use material::Material;
pub use supplier::{Supplier, SupplierStatus, ValidationError};
