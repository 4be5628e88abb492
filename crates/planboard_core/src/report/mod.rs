//! Read-side reporting and export.

pub mod assignments;
pub mod export;
