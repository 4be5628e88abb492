//! Planning domain model.
//!
//! # Responsibility
//! - Define canonical records for teams, members, projects and allocations.
//! - Own field-level validation shared by repositories and services.
//!
//! # Invariants
//! - Every persisted record is identified by a stable, non-nil `Uuid`.
//! - Percent allocation is always in `[1, 100]`.
//! - Date ranges are inclusive and never reversed.

pub mod assignment;
pub mod dates;
pub mod profile;
pub mod project;
pub mod team;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid color regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Field-level validation failure for domain records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    /// Record id is the nil uuid.
    NilId(&'static str),
    /// Display name is blank after trim.
    BlankName(&'static str),
    /// Percent allocation outside `[1, 100]`.
    InvalidAllocation(i64),
    /// Range end precedes its start.
    ReversedDateRange { start: NaiveDate, end: NaiveDate },
    /// Membership month is not the first day of a month.
    MonthNotAligned(NaiveDate),
    /// Value score outside `[0, 100]`.
    InvalidValueScore(i64),
    /// Color is not `#RRGGBB`.
    InvalidColor(String),
    /// Email does not look like `local@domain.tld`.
    InvalidEmail(String),
    /// Text does not name a known enum value.
    UnknownVariant { field: &'static str, value: String },
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId(entity) => write!(f, "{entity} id must not be nil"),
            Self::BlankName(entity) => write!(f, "{entity} name must not be blank"),
            Self::InvalidAllocation(value) => {
                write!(f, "allocation must be within 1..=100, got {value}")
            }
            Self::ReversedDateRange { start, end } => {
                write!(f, "date range end {end} is before start {start}")
            }
            Self::MonthNotAligned(date) => {
                write!(f, "membership month must start on day 1, got {date}")
            }
            Self::InvalidValueScore(value) => {
                write!(f, "value score must be within 0..=100, got {value}")
            }
            Self::InvalidColor(value) => write!(f, "color must be #RRGGBB, got `{value}`"),
            Self::InvalidEmail(value) => write!(f, "invalid email address `{value}`"),
            Self::UnknownVariant { field, value } => {
                write!(f, "unknown {field} value `{value}`")
            }
        }
    }
}

impl Error for ModelValidationError {}

pub(crate) fn ensure_id(id: Uuid, entity: &'static str) -> Result<(), ModelValidationError> {
    if id.is_nil() {
        return Err(ModelValidationError::NilId(entity));
    }
    Ok(())
}

pub(crate) fn ensure_name(name: &str, entity: &'static str) -> Result<(), ModelValidationError> {
    if name.trim().is_empty() {
        return Err(ModelValidationError::BlankName(entity));
    }
    Ok(())
}

pub(crate) fn ensure_color(color: Option<&str>) -> Result<(), ModelValidationError> {
    match color {
        Some(value) if !HEX_COLOR_RE.is_match(value) => {
            Err(ModelValidationError::InvalidColor(value.to_string()))
        }
        _ => Ok(()),
    }
}

pub(crate) fn ensure_email(email: &str) -> Result<(), ModelValidationError> {
    if !EMAIL_RE.is_match(email.trim()) {
        return Err(ModelValidationError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

/// Trims optional free text, mapping blank input to `None`.
pub(crate) fn normalize_optional_text(value: Option<String>) -> Option<String> {
    value.and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
