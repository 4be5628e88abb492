//! User profile records for basic administration.
//!
//! Identity and sign-in live outside this crate; a profile only mirrors the
//! externally created user with a planning role.

use super::{ensure_email, ensure_id, ensure_name, ModelValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ProfileId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Planner,
    Viewer,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Planner => "planner",
            Self::Viewer => "viewer",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ModelValidationError> {
        match value {
            "admin" => Ok(Self::Admin),
            "planner" => Ok(Self::Planner),
            "viewer" => Ok(Self::Viewer),
            other => Err(ModelValidationError::UnknownVariant {
                field: "user role",
                value: other.to_string(),
            }),
        }
    }

    /// Whether the role may change planning data.
    pub fn can_edit(self) -> bool {
        matches!(self, Self::Admin | Self::Planner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub is_active: bool,
}

impl Profile {
    /// Creates an active profile; email is lowercased.
    pub fn new(email: impl Into<String>, display_name: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into().trim().to_lowercase(),
            display_name: display_name.into().trim().to_string(),
            role,
            is_active: true,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        ensure_id(self.id, "profile")?;
        ensure_email(&self.email)?;
        ensure_name(&self.display_name, "profile")
    }
}
