//! Project and product records.
//!
//! # Invariants
//! - `end_date >= start_date`.
//! - `value_score` is within `[0, 100]`.
//! - `product_ids` is sorted and free of duplicates.

use super::dates::DateRange;
use super::team::TeamId;
use super::{ensure_color, ensure_id, ensure_name, ModelValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ProjectId = Uuid;
pub type ProductId = Uuid;

const VALUE_SCORE_MAX: u8 = 100;

/// Delivery state of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planned,
    InProgress,
    Completed,
    OnHold,
    Cancelled,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::OnHold => "on_hold",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ModelValidationError> {
        match value {
            "planned" => Ok(Self::Planned),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "on_hold" => Ok(Self::OnHold),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(ModelValidationError::UnknownVariant {
                field: "project status",
                value: other.to_string(),
            }),
        }
    }
}

/// Planning visibility. Tentative projects belong to future planning and
/// are hidden from the published roadmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Published,
    Tentative,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Tentative => "tentative",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ModelValidationError> {
        match value {
            "published" => Ok(Self::Published),
            "tentative" => Ok(Self::Tentative),
            other => Err(ModelValidationError::UnknownVariant {
                field: "visibility",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
}

impl Product {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            description: None,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        ensure_id(self.id, "product")?;
        ensure_name(&self.name, "product")
    }
}

/// Canonical project record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub team_id: TeamId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub value_score: u8,
    pub is_rd: bool,
    pub status: ProjectStatus,
    pub visibility: Visibility,
    pub color: Option<String>,
    pub link: Option<String>,
    pub product_ids: Vec<ProductId>,
}

impl Project {
    /// Creates a planned, published project spanning `range`.
    pub fn new(name: impl Into<String>, team_id: TeamId, range: DateRange) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            team_id,
            start_date: range.start(),
            end_date: range.end(),
            value_score: 0,
            is_rd: false,
            status: ProjectStatus::Planned,
            visibility: Visibility::Published,
            color: None,
            link: None,
            product_ids: Vec::new(),
        }
    }

    pub fn range(&self) -> DateRange {
        DateRange::spanning(self.start_date, self.end_date)
    }

    pub fn set_range(&mut self, range: DateRange) {
        self.start_date = range.start();
        self.end_date = range.end();
    }

    pub fn is_tentative(&self) -> bool {
        self.visibility == Visibility::Tentative
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        ensure_id(self.id, "project")?;
        ensure_id(self.team_id, "team")?;
        ensure_name(&self.name, "project")?;
        DateRange::new(self.start_date, self.end_date)?;
        if self.value_score > VALUE_SCORE_MAX {
            return Err(ModelValidationError::InvalidValueScore(i64::from(
                self.value_score,
            )));
        }
        ensure_color(self.color.as_deref())
    }
}

/// Sorts and deduplicates product links.
pub fn normalize_product_ids(ids: &[ProductId]) -> Vec<ProductId> {
    let mut normalized = ids.to_vec();
    normalized.sort();
    normalized.dedup();
    normalized
}
