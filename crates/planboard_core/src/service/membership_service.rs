//! Time-boxed team membership management.
//!
//! # Invariants
//! - Starting a membership in a new team closes the member's open or
//!   overlapping memberships in other teams at the preceding month.
//! - All checks run before the first write.

use crate::model::dates::{add_months, month_start};
use crate::model::team::{MemberId, MembershipId, TeamId, TeamMember, TeamMembership};
use crate::model::ModelValidationError;
use crate::repo::team_repo::TeamRepository;
use crate::repo::RepoError;
use chrono::NaiveDate;
use log::info;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum MembershipError {
    MemberNotFound(MemberId),
    TeamNotFound(TeamId),
    MembershipNotFound(MembershipId),
    /// An existing membership cannot be closed before the new one starts.
    MembershipConflict {
        existing: MembershipId,
        start_month: NaiveDate,
    },
    /// The member already belongs to the team for that month.
    AlreadyMember(MembershipId),
    Validation(ModelValidationError),
    Repo(RepoError),
}

impl Display for MembershipError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MemberNotFound(id) => write!(f, "team member not found: {id}"),
            Self::TeamNotFound(id) => write!(f, "team not found: {id}"),
            Self::MembershipNotFound(id) => write!(f, "team membership not found: {id}"),
            Self::MembershipConflict {
                existing,
                start_month,
            } => write!(
                f,
                "membership {existing} starts in or after {start_month} and cannot be closed before it"
            ),
            Self::AlreadyMember(id) => {
                write!(f, "member already belongs to the team (membership {id})")
            }
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MembershipError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for MembershipError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ModelValidationError> for MembershipError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

pub struct MembershipService<T: TeamRepository> {
    teams: T,
}

impl<T: TeamRepository> MembershipService<T> {
    pub fn new(teams: T) -> Self {
        Self { teams }
    }

    /// Moves `member_id` into `team_id` from the month of `start`.
    ///
    /// Memberships in other teams that are open or reach into that month end
    /// one month earlier. Returns the new open-ended membership.
    pub fn start_membership(
        &self,
        member_id: MemberId,
        team_id: TeamId,
        start: NaiveDate,
    ) -> Result<TeamMembership, MembershipError> {
        if self.teams.get_member(member_id)?.is_none() {
            return Err(MembershipError::MemberNotFound(member_id));
        }
        if self.teams.get_team(team_id)?.is_none() {
            return Err(MembershipError::TeamNotFound(team_id));
        }

        let membership = TeamMembership::new(member_id, team_id, start);
        membership.validate()?;
        let close_at = add_months(membership.start_month, -1);

        let mut to_close = Vec::new();
        for existing in self.teams.list_memberships_for_member(member_id)? {
            if !existing.overlaps(&membership) {
                continue;
            }
            if existing.team_id == team_id {
                return Err(MembershipError::AlreadyMember(existing.id));
            }
            let end = close_at
                .filter(|end| *end >= existing.start_month)
                .ok_or(MembershipError::MembershipConflict {
                    existing: existing.id,
                    start_month: membership.start_month,
                })?;
            let mut closed = existing;
            closed.end_month = Some(end);
            closed.validate()?;
            to_close.push(closed);
        }

        self.teams.transfer_membership(&to_close, &membership)?;
        info!(
            "event=membership_start module=service status=ok member_id={member_id} team_id={team_id} start_month={} closed={}",
            membership.start_month,
            to_close.len()
        );
        Ok(membership)
    }

    /// Sets the inclusive last month of a membership.
    pub fn end_membership(
        &self,
        id: MembershipId,
        end: NaiveDate,
    ) -> Result<TeamMembership, MembershipError> {
        let mut membership = self
            .teams
            .get_membership(id)?
            .ok_or(MembershipError::MembershipNotFound(id))?;
        membership.end_month = Some(month_start(end));
        membership.validate()?;
        self.teams.update_membership(&membership)?;
        Ok(membership)
    }

    /// Team the member belongs to during the month of `month`.
    ///
    /// Stored data may still contain overlapping memberships; the one that
    /// started last wins.
    pub fn team_for_month(
        &self,
        member_id: MemberId,
        month: NaiveDate,
    ) -> Result<Option<TeamId>, MembershipError> {
        let team = self
            .teams
            .list_memberships_for_member(member_id)?
            .into_iter()
            .filter(|membership| membership.covers_month(month))
            .max_by(|a, b| {
                a.start_month
                    .cmp(&b.start_month)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .map(|membership| membership.team_id);
        Ok(team)
    }

    /// Members whose membership in `team_id` covers the month of `month`.
    pub fn members_of_team(
        &self,
        team_id: TeamId,
        month: NaiveDate,
    ) -> Result<Vec<TeamMember>, MembershipError> {
        let member_ids: BTreeSet<MemberId> = self
            .teams
            .list_memberships_for_team(team_id)?
            .into_iter()
            .filter(|membership| membership.covers_month(month))
            .map(|membership| membership.member_id)
            .collect();

        let mut members = Vec::with_capacity(member_ids.len());
        for member_id in member_ids {
            if let Some(member) = self.teams.get_member(member_id)? {
                members.push(member);
            }
        }
        members.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(members)
    }
}
