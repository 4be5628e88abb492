//! Team, role, member and membership records.
//!
//! # Invariants
//! - Membership months are stored as first-of-month dates.
//! - `end_month`, when set, is not before `start_month` (both inclusive).
//! - A member should hold at most one membership covering any given month.
//!   This is maintained by `MembershipService`, not by storage.

use super::dates::{is_month_start, month_start};
use super::{ensure_color, ensure_id, ensure_name, ModelValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TeamId = Uuid;
pub type RoleId = Uuid;
pub type MemberId = Uuid;
pub type MembershipId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub description: Option<String>,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            description: None,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        ensure_id(self.id, "team")?;
        ensure_name(&self.name, "team")
    }
}

/// Job role used to label members and size teams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub color: Option<String>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            color: None,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        ensure_id(self.id, "role")?;
        ensure_name(&self.name, "role")?;
        ensure_color(self.color.as_deref())
    }
}

/// One person whose capacity is planned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: MemberId,
    pub name: String,
    pub role_id: Option<RoleId>,
    /// Home team shown when no membership history is consulted.
    pub team_id: Option<TeamId>,
}

impl TeamMember {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            role_id: None,
            team_id: None,
        }
    }

    pub fn with_role(mut self, role_id: RoleId) -> Self {
        self.role_id = Some(role_id);
        self
    }

    pub fn with_team(mut self, team_id: TeamId) -> Self {
        self.team_id = Some(team_id);
        self
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        ensure_id(self.id, "team member")?;
        ensure_name(&self.name, "team member")
    }
}

/// Time-boxed link between a member and a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMembership {
    pub id: MembershipId,
    pub member_id: MemberId,
    pub team_id: TeamId,
    pub start_month: NaiveDate,
    /// Inclusive last month; `None` means open-ended.
    pub end_month: Option<NaiveDate>,
}

impl TeamMembership {
    /// Creates an open-ended membership starting at the month of `start`.
    pub fn new(member_id: MemberId, team_id: TeamId, start: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id,
            team_id,
            start_month: month_start(start),
            end_month: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_month.is_none()
    }

    /// Whether the membership is active during the month containing `date`.
    pub fn covers_month(&self, date: NaiveDate) -> bool {
        let month = month_start(date);
        month >= self.start_month && self.end_month.map_or(true, |end| month <= end)
    }

    /// Whether two memberships share at least one month.
    pub fn overlaps(&self, other: &TeamMembership) -> bool {
        let self_before_other = self.end_month.is_some_and(|end| end < other.start_month);
        let other_before_self = other.end_month.is_some_and(|end| end < self.start_month);
        !(self_before_other || other_before_self)
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        ensure_id(self.id, "team membership")?;
        ensure_id(self.member_id, "team member")?;
        ensure_id(self.team_id, "team")?;
        if !is_month_start(self.start_month) {
            return Err(ModelValidationError::MonthNotAligned(self.start_month));
        }
        if let Some(end) = self.end_month {
            if !is_month_start(end) {
                return Err(ModelValidationError::MonthNotAligned(end));
            }
            if end < self.start_month {
                return Err(ModelValidationError::ReversedDateRange {
                    start: self.start_month,
                    end,
                });
            }
        }
        Ok(())
    }
}

/// Target head count for one role within a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamIdealSize {
    pub team_id: TeamId,
    pub role_id: RoleId,
    pub ideal_count: u32,
}

impl TeamIdealSize {
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        ensure_id(self.team_id, "team")?;
        ensure_id(self.role_id, "role")
    }
}

#[cfg(test)]
mod tests {
    use super::{TeamMember, TeamMembership};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn membership_new_aligns_start_to_month() {
        let membership = TeamMembership::new(Uuid::new_v4(), Uuid::new_v4(), d(2024, 5, 19));
        assert_eq!(membership.start_month, d(2024, 5, 1));
        assert!(membership.is_open());
        assert!(membership.validate().is_ok());
    }

    #[test]
    fn membership_overlap_respects_closed_end() {
        let member = Uuid::new_v4();
        let mut first = TeamMembership::new(member, Uuid::new_v4(), d(2024, 1, 1));
        first.end_month = Some(d(2024, 3, 1));
        let second = TeamMembership::new(member, Uuid::new_v4(), d(2024, 4, 1));
        assert!(!first.overlaps(&second));
        assert!(first.covers_month(d(2024, 3, 31)));
        assert!(!first.covers_month(d(2024, 4, 1)));

        let third = TeamMembership::new(member, Uuid::new_v4(), d(2024, 3, 1));
        assert!(first.overlaps(&third));
    }

    #[test]
    fn member_rejects_blank_name() {
        assert!(TeamMember::new("  ").validate().is_err());
    }
}
