//! Use-case services over the repository traits.
//!
//! # Responsibility
//! - Combine repository calls into planning operations.
//! - Keep the CLI and any UI shell free of storage details.

pub mod membership_service;
pub mod project_service;
pub mod schedule_service;
