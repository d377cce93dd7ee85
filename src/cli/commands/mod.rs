//! Command implementations, one module per top-level command

pub mod completions;
pub mod init;
pub mod inv;
pub mod mat;
pub mod sup;
