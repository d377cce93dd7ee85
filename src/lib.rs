//! KBT: Kwast Business Toolkit
//!
//! A Unix-style toolkit for a painting contractor's back office: suppliers,
//! materials, and purchase invoices as plain text files under git version
//! control, with supplier identity resolution and consolidation on top.

pub mod cli;
pub mod core;
pub mod entities;
pub mod resolve;
