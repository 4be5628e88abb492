//! Timeline layout and interaction.
//!
//! # Responsibility
//! - Map dates to track positions (`geometry`).
//! - Pack a member's assignments into allocation slots (`slots`, `lane`).
//! - Turn pointer gestures into reschedule plans (`drag`).
//!
//! Everything here is pure; persistence happens in `service::schedule_service`.

pub mod drag;
pub mod geometry;
pub mod lane;
pub mod slots;
