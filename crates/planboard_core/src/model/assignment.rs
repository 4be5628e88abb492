//! Project assignment (allocation) records.
//!
//! # Invariants
//! - `Allocation` is always within `[1, 100]`.
//! - Missing start/end overrides fall back to the project's own range.

use super::dates::DateRange;
use super::project::{Project, ProjectId};
use super::team::MemberId;
use super::{ensure_id, ModelValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AssignmentId = Uuid;

/// Percentage of a member's capacity, `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Allocation(u8);

impl Allocation {
    pub const FULL: Allocation = Allocation(100);

    pub fn new(percent: u8) -> Result<Self, ModelValidationError> {
        if percent == 0 || percent > 100 {
            return Err(ModelValidationError::InvalidAllocation(i64::from(percent)));
        }
        Ok(Self(percent))
    }

    /// Accepts wider integers from storage or user input.
    pub fn from_i64(percent: i64) -> Result<Self, ModelValidationError> {
        u8::try_from(percent)
            .map_err(|_| ModelValidationError::InvalidAllocation(percent))
            .and_then(Self::new)
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// Number of capacity slots this allocation occupies, rounded up.
    pub fn slots_needed(self, slot_percentage: u8) -> usize {
        let unit = usize::from(slot_percentage.max(1));
        usize::from(self.0).div_ceil(unit)
    }
}

impl TryFrom<u8> for Allocation {
    type Error = ModelValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Allocation> for u8 {
    fn from(value: Allocation) -> Self {
        value.0
    }
}

/// Link between a project and a member with a capacity share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAssignment {
    pub id: AssignmentId,
    pub project_id: ProjectId,
    pub member_id: MemberId,
    pub allocation: Allocation,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ProjectAssignment {
    /// Creates an assignment that inherits the project's range.
    pub fn new(project_id: ProjectId, member_id: MemberId, allocation: Allocation) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            member_id,
            allocation,
            start_date: None,
            end_date: None,
        }
    }

    pub fn with_range(mut self, range: DateRange) -> Self {
        self.start_date = Some(range.start());
        self.end_date = Some(range.end());
        self
    }

    /// Resolves the dates this assignment actually covers.
    ///
    /// Overrides that would invert the range are ignored in favour of the
    /// project's own dates.
    pub fn effective_range(&self, project: &Project) -> DateRange {
        let start = self.start_date.unwrap_or(project.start_date);
        let end = self.end_date.unwrap_or(project.end_date);
        DateRange::new(start, end).unwrap_or_else(|_| project.range())
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        ensure_id(self.id, "assignment")?;
        ensure_id(self.project_id, "project")?;
        ensure_id(self.member_id, "team member")?;
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            DateRange::new(start, end)?;
        }
        Ok(())
    }
}

/// Assignment input used before the owning project exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAssignment {
    pub member_id: MemberId,
    pub allocation: Allocation,
    pub range: Option<DateRange>,
}

impl NewAssignment {
    pub fn new(member_id: MemberId, allocation: Allocation) -> Self {
        Self {
            member_id,
            allocation,
            range: None,
        }
    }

    pub fn into_assignment(self, project_id: ProjectId) -> ProjectAssignment {
        let assignment = ProjectAssignment::new(project_id, self.member_id, self.allocation);
        match self.range {
            Some(range) => assignment.with_range(range),
            None => assignment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Allocation, ProjectAssignment};
    use crate::model::dates::DateRange;
    use crate::model::project::Project;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn allocation_bounds_are_enforced() {
        assert!(Allocation::new(0).is_err());
        assert!(Allocation::new(101).is_err());
        assert!(Allocation::from_i64(-5).is_err());
        assert_eq!(Allocation::new(1).unwrap().percent(), 1);
        assert_eq!(Allocation::FULL.percent(), 100);
    }

    #[test]
    fn slots_needed_rounds_up() {
        assert_eq!(Allocation::new(1).unwrap().slots_needed(25), 1);
        assert_eq!(Allocation::new(25).unwrap().slots_needed(25), 1);
        assert_eq!(Allocation::new(26).unwrap().slots_needed(25), 2);
        assert_eq!(Allocation::new(100).unwrap().slots_needed(25), 4);
    }

    #[test]
    fn allocation_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Allocation>("0").is_err());
        assert_eq!(serde_json::from_str::<Allocation>("40").unwrap().percent(), 40);
    }

    #[test]
    fn effective_range_falls_back_to_project() {
        let project = Project::new(
            "Atlas",
            Uuid::new_v4(),
            DateRange::new(d(2024, 1, 1), d(2024, 6, 30)).unwrap(),
        );
        let mut assignment =
            ProjectAssignment::new(project.id, Uuid::new_v4(), Allocation::new(50).unwrap());
        assert_eq!(assignment.effective_range(&project), project.range());

        assignment.start_date = Some(d(2024, 2, 1));
        let range = assignment.effective_range(&project);
        assert_eq!(range.start(), d(2024, 2, 1));
        assert_eq!(range.end(), d(2024, 6, 30));
    }
}
