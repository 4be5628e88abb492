//! Project use-case service.
//!
//! # Responsibility
//! - Create projects together with product links and initial assignees.
//! - Manage publication state and the assignee set.
//! - Provide the name+team lookup used by older creation flows.
//!
//! # Invariants
//! - A member appears at most once in a project's assignee set.
//! - Name lookups never guess: several matches are reported as ambiguous.

use crate::model::assignment::{NewAssignment, ProjectAssignment};
use crate::model::dates::DateRange;
use crate::model::project::{ProductId, Project, ProjectId, ProjectStatus, Visibility};
use crate::model::team::{MemberId, TeamId};
use crate::model::ModelValidationError;
use crate::repo::assignment_repo::AssignmentRepository;
use crate::repo::project_repo::{ProjectListQuery, ProjectRepository};
use crate::repo::RepoError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ProjectServiceError {
    ProjectNotFound(ProjectId),
    /// Name+team lookup found nothing.
    ProjectNotFoundAfterCreate { team_id: TeamId, name: String },
    /// Name+team lookup matched more than one project.
    AmbiguousProjectLookup {
        team_id: TeamId,
        name: String,
        matches: Vec<ProjectId>,
    },
    MemberAlreadyAssigned {
        project_id: ProjectId,
        member_id: MemberId,
    },
    MemberNotAssigned {
        project_id: ProjectId,
        member_id: MemberId,
    },
    Validation(ModelValidationError),
    Repo(RepoError),
}

impl Display for ProjectServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::ProjectNotFoundAfterCreate { team_id, name } => write!(
                f,
                "no project named `{name}` found in team {team_id}"
            ),
            Self::AmbiguousProjectLookup {
                team_id,
                name,
                matches,
            } => {
                let ids: Vec<String> = matches.iter().map(ToString::to_string).collect();
                write!(
                    f,
                    "{} projects named `{name}` in team {team_id}: {}",
                    matches.len(),
                    ids.join(", ")
                )
            }
            Self::MemberAlreadyAssigned {
                project_id,
                member_id,
            } => write!(
                f,
                "member {member_id} is already assigned to project {project_id}"
            ),
            Self::MemberNotAssigned {
                project_id,
                member_id,
            } => write!(f, "member {member_id} is not assigned to project {project_id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProjectServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ProjectServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ModelValidationError> for ProjectServiceError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Creation request for a project and its first assignees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub team_id: TeamId,
    pub range: DateRange,
    pub value_score: u8,
    pub is_rd: bool,
    pub status: ProjectStatus,
    pub visibility: Visibility,
    pub color: Option<String>,
    pub link: Option<String>,
    pub product_ids: Vec<ProductId>,
    pub assignees: Vec<NewAssignment>,
}

impl NewProject {
    pub fn new(name: impl Into<String>, team_id: TeamId, range: DateRange) -> Self {
        Self {
            name: name.into(),
            team_id,
            range,
            value_score: 0,
            is_rd: false,
            status: ProjectStatus::Planned,
            visibility: Visibility::Published,
            color: None,
            link: None,
            product_ids: Vec::new(),
            assignees: Vec::new(),
        }
    }

    pub fn tentative(mut self) -> Self {
        self.visibility = Visibility::Tentative;
        self
    }

    pub fn with_assignee(mut self, assignee: NewAssignment) -> Self {
        self.assignees.push(assignee);
        self
    }

    fn into_parts(self) -> (Project, Vec<NewAssignment>) {
        let mut project = Project::new(self.name, self.team_id, self.range);
        project.value_score = self.value_score;
        project.is_rd = self.is_rd;
        project.status = self.status;
        project.visibility = self.visibility;
        project.color = self.color;
        project.link = self.link;
        project.product_ids = self.product_ids;
        (project, self.assignees)
    }
}

pub struct ProjectService<P: ProjectRepository, A: AssignmentRepository> {
    projects: P,
    assignments: A,
}

impl<P: ProjectRepository, A: AssignmentRepository> ProjectService<P, A> {
    pub fn new(projects: P, assignments: A) -> Self {
        Self {
            projects,
            assignments,
        }
    }

    /// Creates the project, its product links and its initial assignees.
    ///
    /// Returns the stored project as read back from the repository.
    pub fn create_project(&self, request: NewProject) -> Result<Project, ProjectServiceError> {
        let (project, assignees) = request.into_parts();
        project.validate()?;
        let assignments: Vec<ProjectAssignment> = assignees
            .into_iter()
            .map(|assignee| assignee.into_assignment(project.id))
            .collect();

        let project_id = self.projects.create_project(&project)?;
        if !assignments.is_empty() {
            self.assignments
                .replace_project_assignments(project_id, &assignments)?;
        }
        info!(
            "event=project_create module=service status=ok project_id={project_id} assignees={}",
            assignments.len()
        );
        self.require_project(project_id)
    }

    pub fn get_project(&self, id: ProjectId) -> Result<Project, ProjectServiceError> {
        self.require_project(id)
    }

    pub fn list_projects(
        &self,
        query: &ProjectListQuery,
    ) -> Result<Vec<Project>, ProjectServiceError> {
        Ok(self.projects.list_projects(query)?)
    }

    pub fn update_project(&self, project: &Project) -> Result<(), ProjectServiceError> {
        self.projects.update_project(project).map_err(|err| match err {
            RepoError::NotFound { .. } => ProjectServiceError::ProjectNotFound(project.id),
            other => other.into(),
        })
    }

    pub fn delete_project(&self, id: ProjectId) -> Result<(), ProjectServiceError> {
        self.projects.delete_project(id).map_err(|err| match err {
            RepoError::NotFound { .. } => ProjectServiceError::ProjectNotFound(id),
            other => other.into(),
        })
    }

    /// Turns a tentative project into a published one. Already published
    /// projects are returned unchanged.
    pub fn publish_project(&self, id: ProjectId) -> Result<Project, ProjectServiceError> {
        let mut project = self.require_project(id)?;
        if project.visibility == Visibility::Published {
            return Ok(project);
        }
        project.visibility = Visibility::Published;
        self.projects.update_project(&project)?;
        info!("event=project_publish module=service status=ok project_id={id}");
        Ok(project)
    }

    pub fn set_products(
        &self,
        id: ProjectId,
        product_ids: &[ProductId],
    ) -> Result<(), ProjectServiceError> {
        self.projects
            .set_project_products(id, product_ids)
            .map_err(|err| match err {
                RepoError::NotFound { .. } => ProjectServiceError::ProjectNotFound(id),
                other => other.into(),
            })
    }

    pub fn assignments(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<ProjectAssignment>, ProjectServiceError> {
        Ok(self.assignments.list_for_project(project_id)?)
    }

    /// Adds one member to the project's assignee set.
    pub fn assign_member(
        &self,
        project_id: ProjectId,
        assignee: NewAssignment,
    ) -> Result<ProjectAssignment, ProjectServiceError> {
        self.require_project(project_id)?;
        let mut current = self.assignments.list_for_project(project_id)?;
        if current
            .iter()
            .any(|item| item.member_id == assignee.member_id)
        {
            return Err(ProjectServiceError::MemberAlreadyAssigned {
                project_id,
                member_id: assignee.member_id,
            });
        }
        let assignment = assignee.into_assignment(project_id);
        current.push(assignment.clone());
        self.assignments
            .replace_project_assignments(project_id, &current)?;
        Ok(assignment)
    }

    pub fn unassign_member(
        &self,
        project_id: ProjectId,
        member_id: MemberId,
    ) -> Result<(), ProjectServiceError> {
        let current = self.assignments.list_for_project(project_id)?;
        let remaining: Vec<ProjectAssignment> = current
            .iter()
            .filter(|item| item.member_id != member_id)
            .cloned()
            .collect();
        if remaining.len() == current.len() {
            return Err(ProjectServiceError::MemberNotAssigned {
                project_id,
                member_id,
            });
        }
        self.assignments
            .replace_project_assignments(project_id, &remaining)?;
        Ok(())
    }

    /// Finds the single project called `name` in `team_id`.
    ///
    /// Names compare trimmed and case-insensitively. Duplicate names are
    /// allowed by the store, so several matches fail with
    /// `AmbiguousProjectLookup` instead of picking one.
    pub fn find_project_by_name(
        &self,
        team_id: TeamId,
        name: &str,
    ) -> Result<Project, ProjectServiceError> {
        let wanted = name.trim();
        let query = ProjectListQuery {
            team_id: Some(team_id),
            name_contains: Some(wanted.to_string()),
            ..ProjectListQuery::default()
        };
        let mut matches: Vec<Project> = self
            .projects
            .list_projects(&query)?
            .into_iter()
            .filter(|project| project.name.trim().eq_ignore_ascii_case(wanted))
            .collect();

        match matches.len() {
            0 => Err(ProjectServiceError::ProjectNotFoundAfterCreate {
                team_id,
                name: wanted.to_string(),
            }),
            1 => Ok(matches.remove(0)),
            count => {
                warn!(
                    "event=project_lookup module=service status=ambiguous team_id={team_id} matches={count}"
                );
                Err(ProjectServiceError::AmbiguousProjectLookup {
                    team_id,
                    name: wanted.to_string(),
                    matches: matches.into_iter().map(|project| project.id).collect(),
                })
            }
        }
    }

    /// Assigns a member to the project located by name and team.
    pub fn assign_member_by_project_name(
        &self,
        team_id: TeamId,
        name: &str,
        assignee: NewAssignment,
    ) -> Result<ProjectAssignment, ProjectServiceError> {
        let project = self.find_project_by_name(team_id, name)?;
        self.assign_member(project.id, assignee)
    }

    fn require_project(&self, id: ProjectId) -> Result<Project, ProjectServiceError> {
        self.projects
            .get_project(id)?
            .ok_or(ProjectServiceError::ProjectNotFound(id))
    }
}
