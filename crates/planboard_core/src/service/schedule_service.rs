//! Commit side of timeline drag and resize.
//!
//! # Responsibility
//! - Apply a `DropPlan` produced by `timeline::drag` to the store.
//!
//! # Invariants
//! - A plan that changes neither dates nor member touches nothing.
//! - Preconditions are checked before the first write; a failed check leaves
//!   the store unchanged.
//! - Project dates and the assignment set are written in one transaction.
//! - Failures are logged once and returned; nothing is retried.

use crate::model::assignment::AssignmentId;
use crate::model::project::ProjectId;
use crate::model::team::MemberId;
use crate::repo::assignment_repo::AssignmentRepository;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::team_repo::TeamRepository;
use crate::repo::RepoError;
use crate::timeline::drag::DropPlan;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ScheduleError {
    ProjectNotFound(ProjectId),
    MemberNotFound(MemberId),
    /// The dragged assignment is no longer part of the project.
    AssignmentNotFound(AssignmentId),
    /// Target member already holds another assignment on the project.
    MemberAlreadyAssigned {
        project_id: ProjectId,
        member_id: MemberId,
    },
    Repo(RepoError),
}

impl Display for ScheduleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::MemberNotFound(id) => write!(f, "team member not found: {id}"),
            Self::AssignmentNotFound(id) => write!(f, "assignment not found: {id}"),
            Self::MemberAlreadyAssigned {
                project_id,
                member_id,
            } => write!(
                f,
                "member {member_id} is already assigned to project {project_id}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ScheduleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ScheduleError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    NoChange,
    Applied {
        dates_changed: bool,
        member_changed: bool,
    },
}

pub struct ScheduleService<P, A, T>
where
    P: ProjectRepository,
    A: AssignmentRepository,
    T: TeamRepository,
{
    projects: P,
    assignments: A,
    teams: T,
}

impl<P, A, T> ScheduleService<P, A, T>
where
    P: ProjectRepository,
    A: AssignmentRepository,
    T: TeamRepository,
{
    pub fn new(projects: P, assignments: A, teams: T) -> Self {
        Self {
            projects,
            assignments,
            teams,
        }
    }

    /// Persists a drop.
    ///
    /// When dates changed the project's own range follows the dragged bar.
    /// The project's assignment set is then replaced with the moved
    /// assignment re-pointed at `plan.to_member`, carrying the new explicit
    /// range and the allocation it had when the gesture started.
    pub fn apply_drop(&self, plan: &DropPlan) -> Result<ScheduleOutcome, ScheduleError> {
        if plan.is_noop() {
            return Ok(ScheduleOutcome::NoChange);
        }
        match self.apply_checked(plan) {
            Ok(outcome) => {
                info!(
                    "event=schedule_apply module=service status=ok project_id={} assignment_id={} dates_changed={} member_changed={}",
                    plan.project_id,
                    plan.assignment_id,
                    plan.dates_changed(),
                    plan.member_changed()
                );
                Ok(outcome)
            }
            Err(err) => {
                error!(
                    "event=schedule_apply module=service status=error project_id={} assignment_id={} error={err}",
                    plan.project_id, plan.assignment_id
                );
                Err(err)
            }
        }
    }

    fn apply_checked(&self, plan: &DropPlan) -> Result<ScheduleOutcome, ScheduleError> {
        if self.projects.get_project(plan.project_id)?.is_none() {
            return Err(ScheduleError::ProjectNotFound(plan.project_id));
        }
        if plan.member_changed() && self.teams.get_member(plan.to_member)?.is_none() {
            return Err(ScheduleError::MemberNotFound(plan.to_member));
        }

        let current = self.assignments.list_for_project(plan.project_id)?;
        if !current.iter().any(|item| item.id == plan.assignment_id) {
            return Err(ScheduleError::AssignmentNotFound(plan.assignment_id));
        }
        if current
            .iter()
            .any(|item| item.id != plan.assignment_id && item.member_id == plan.to_member)
        {
            return Err(ScheduleError::MemberAlreadyAssigned {
                project_id: plan.project_id,
                member_id: plan.to_member,
            });
        }

        let replacement: Vec<_> = current
            .into_iter()
            .map(|item| {
                if item.id != plan.assignment_id {
                    return item;
                }
                let mut moved = item.with_range(plan.new_range);
                moved.member_id = plan.to_member;
                moved.allocation = plan.allocation;
                moved
            })
            .collect();
        let moved_range = plan.dates_changed().then_some(plan.new_range);
        self.assignments
            .reschedule_project(plan.project_id, moved_range, &replacement)?;

        Ok(ScheduleOutcome::Applied {
            dates_changed: plan.dates_changed(),
            member_changed: plan.member_changed(),
        })
    }
}
