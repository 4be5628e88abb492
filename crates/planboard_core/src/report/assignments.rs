//! Assignment-centric report views.
//!
//! # Responsibility
//! - Flatten assignments with their member, role, project and products.
//! - Sum monthly allocation per member.
//! - Compare a team's head count per role against its ideal size.

use crate::model::assignment::AssignmentId;
use crate::model::dates::{month_end, month_start, DateRange};
use crate::model::project::{Product, ProductId, Project, ProjectId, ProjectStatus, Visibility};
use crate::model::team::{MemberId, Role, RoleId, Team, TeamId, TeamMember};
use crate::repo::assignment_repo::AssignmentRepository;
use crate::repo::project_repo::{ProjectListQuery, ProjectRepository};
use crate::repo::team_repo::TeamRepository;
use crate::repo::RepoResult;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// One flattened assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentReportRow {
    pub assignment_id: AssignmentId,
    pub member_id: MemberId,
    pub member_name: String,
    pub role_name: Option<String>,
    pub team_id: TeamId,
    pub team_name: String,
    pub project_id: ProjectId,
    pub project_name: String,
    pub product_names: Vec<String>,
    pub percent: u8,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ProjectStatus,
    pub visibility: Visibility,
    pub is_rd: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    /// Keeps assignments whose effective range overlaps the window.
    pub window: Option<DateRange>,
    /// Project team.
    pub team_id: Option<TeamId>,
    pub member_id: Option<MemberId>,
    pub include_tentative: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberUtilization {
    pub member_id: MemberId,
    pub member_name: String,
    pub month: NaiveDate,
    pub total_percent: u32,
    pub assignment_count: usize,
    pub over_allocated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffingGap {
    pub role_id: RoleId,
    pub role_name: String,
    pub ideal: u32,
    pub actual: u32,
}

impl StaffingGap {
    /// Positive when the team is short of people in this role.
    pub fn shortfall(&self) -> i64 {
        i64::from(self.ideal) - i64::from(self.actual)
    }
}

/// Read-only report builder over the repositories.
pub struct AssignmentReports<P, A, T>
where
    P: ProjectRepository,
    A: AssignmentRepository,
    T: TeamRepository,
{
    projects: P,
    assignments: A,
    teams: T,
}

impl<P, A, T> AssignmentReports<P, A, T>
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

    /// Rows ordered by member name, then effective start date.
    pub fn assignment_report(&self, filter: &ReportFilter) -> RepoResult<Vec<AssignmentReportRow>> {
        let projects = self.projects_by_id()?;
        let products: HashMap<ProductId, Product> = self
            .projects
            .list_products()?
            .into_iter()
            .map(|product| (product.id, product))
            .collect();
        let members = self.members_by_id()?;
        let roles: HashMap<RoleId, Role> = self
            .teams
            .list_roles()?
            .into_iter()
            .map(|role| (role.id, role))
            .collect();
        let teams: HashMap<TeamId, Team> = self
            .teams
            .list_teams()?
            .into_iter()
            .map(|team| (team.id, team))
            .collect();

        let mut rows = Vec::new();
        for assignment in self.assignments.list_all()? {
            let Some(project) = projects.get(&assignment.project_id) else {
                continue;
            };
            let Some(member) = members.get(&assignment.member_id) else {
                continue;
            };
            if filter.team_id.is_some_and(|team| team != project.team_id)
                || filter.member_id.is_some_and(|id| id != member.id)
                || (!filter.include_tentative && project.is_tentative())
            {
                continue;
            }
            let range = assignment.effective_range(project);
            if filter.window.is_some_and(|window| !window.overlaps(&range)) {
                continue;
            }

            rows.push(AssignmentReportRow {
                assignment_id: assignment.id,
                member_id: member.id,
                member_name: member.name.clone(),
                role_name: member
                    .role_id
                    .and_then(|id| roles.get(&id))
                    .map(|role| role.name.clone()),
                team_id: project.team_id,
                team_name: teams
                    .get(&project.team_id)
                    .map(|team| team.name.clone())
                    .unwrap_or_default(),
                project_id: project.id,
                project_name: project.name.clone(),
                product_names: project
                    .product_ids
                    .iter()
                    .filter_map(|id| products.get(id))
                    .map(|product| product.name.clone())
                    .collect(),
                percent: assignment.allocation.percent(),
                start_date: range.start(),
                end_date: range.end(),
                status: project.status,
                visibility: project.visibility,
                is_rd: project.is_rd,
            });
        }

        rows.sort_by(|a, b| {
            a.member_name
                .to_lowercase()
                .cmp(&b.member_name.to_lowercase())
                .then_with(|| a.start_date.cmp(&b.start_date))
                .then_with(|| a.project_name.cmp(&b.project_name))
                .then_with(|| a.assignment_id.cmp(&b.assignment_id))
        });
        Ok(rows)
    }

    /// Summed allocation per member for the month containing `month`.
    ///
    /// Every member is listed, including those with no work that month.
    pub fn member_utilization(&self, month: NaiveDate) -> RepoResult<Vec<MemberUtilization>> {
        let month_range = DateRange::spanning(month_start(month), month_end(month));
        let projects = self.projects_by_id()?;
        let mut totals: HashMap<MemberId, (u32, usize)> = HashMap::new();
        for assignment in self.assignments.list_all()? {
            let Some(project) = projects.get(&assignment.project_id) else {
                continue;
            };
            if !assignment.effective_range(project).overlaps(&month_range) {
                continue;
            }
            let entry = totals.entry(assignment.member_id).or_insert((0, 0));
            entry.0 += u32::from(assignment.allocation.percent());
            entry.1 += 1;
        }

        let utilization = self
            .teams
            .list_members(None)?
            .into_iter()
            .map(|member| {
                let (total_percent, assignment_count) =
                    totals.get(&member.id).copied().unwrap_or((0, 0));
                MemberUtilization {
                    member_id: member.id,
                    member_name: member.name,
                    month: month_range.start(),
                    total_percent,
                    assignment_count,
                    over_allocated: total_percent > 100,
                }
            })
            .collect();
        Ok(utilization)
    }

    /// Ideal versus actual head count per role for `team_id` in a month.
    ///
    /// Actual members are those whose membership covers the month. Roles
    /// without an ideal size still appear when somebody holds them.
    pub fn staffing_gaps(&self, team_id: TeamId, month: NaiveDate) -> RepoResult<Vec<StaffingGap>> {
        let roles: HashMap<RoleId, Role> = self
            .teams
            .list_roles()?
            .into_iter()
            .map(|role| (role.id, role))
            .collect();
        let members = self.members_by_id()?;

        let mut actual: BTreeMap<RoleId, u32> = BTreeMap::new();
        let mut counted = Vec::new();
        for membership in self.teams.list_memberships_for_team(team_id)? {
            if !membership.covers_month(month) || counted.contains(&membership.member_id) {
                continue;
            }
            counted.push(membership.member_id);
            if let Some(role_id) = members
                .get(&membership.member_id)
                .and_then(|member| member.role_id)
            {
                *actual.entry(role_id).or_insert(0) += 1;
            }
        }

        let mut ideal: BTreeMap<RoleId, u32> = self
            .teams
            .list_ideal_sizes(team_id)?
            .into_iter()
            .map(|size| (size.role_id, size.ideal_count))
            .collect();
        for role_id in actual.keys() {
            ideal.entry(*role_id).or_insert(0);
        }

        let mut gaps: Vec<StaffingGap> = ideal
            .into_iter()
            .map(|(role_id, ideal_count)| StaffingGap {
                role_id,
                role_name: roles
                    .get(&role_id)
                    .map(|role| role.name.clone())
                    .unwrap_or_else(|| role_id.to_string()),
                ideal: ideal_count,
                actual: actual.get(&role_id).copied().unwrap_or(0),
            })
            .collect();
        gaps.sort_by(|a, b| {
            b.shortfall()
                .cmp(&a.shortfall())
                .then_with(|| a.role_name.cmp(&b.role_name))
        });
        Ok(gaps)
    }

    fn projects_by_id(&self) -> RepoResult<HashMap<ProjectId, Project>> {
        Ok(self
            .projects
            .list_projects(&ProjectListQuery::default())?
            .into_iter()
            .map(|project| (project.id, project))
            .collect())
    }

    fn members_by_id(&self) -> RepoResult<HashMap<MemberId, TeamMember>> {
        Ok(self
            .teams
            .list_members(None)?
            .into_iter()
            .map(|member| (member.id, member))
            .collect())
    }
}
