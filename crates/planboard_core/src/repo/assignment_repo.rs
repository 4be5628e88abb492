//! Assignment repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist `project_assignees` rows.
//! - Own atomic replacement of one project's assignment set.
//!
//! # Invariants
//! - At most one row per `(project_id, member_id)`; duplicates are a
//!   `RepoError::Conflict`.
//! - `replace_project_assignments` deletes and re-inserts inside one
//!   transaction, so readers never observe a partial set.
//! - `reschedule_project` moves the project's range in that same
//!   transaction; a failed insert leaves the old dates in place.

use crate::model::assignment::{Allocation, AssignmentId, ProjectAssignment};
use crate::model::dates::DateRange;
use crate::model::project::ProjectId;
use crate::model::team::MemberId;
use crate::repo::changes::{ChangeFeed, ChangeKind, EntityKind, Notifier};
use crate::repo::{parse_uuid, RepoError, RepoResult};
use log::info;
use rusqlite::{params, Connection, Row};
use std::collections::BTreeSet;

const ASSIGNMENT_SELECT_SQL: &str = "SELECT
    id,
    project_id,
    member_id,
    percent_allocation,
    start_date,
    end_date
FROM project_assignees";

/// Repository interface for project assignments.
pub trait AssignmentRepository {
    fn create_assignment(&self, assignment: &ProjectAssignment) -> RepoResult<AssignmentId>;
    fn update_assignment(&self, assignment: &ProjectAssignment) -> RepoResult<()>;
    fn get_assignment(&self, id: AssignmentId) -> RepoResult<Option<ProjectAssignment>>;
    fn list_for_project(&self, project_id: ProjectId) -> RepoResult<Vec<ProjectAssignment>>;
    fn list_for_member(&self, member_id: MemberId) -> RepoResult<Vec<ProjectAssignment>>;
    fn list_all(&self) -> RepoResult<Vec<ProjectAssignment>>;
    fn delete_assignment(&self, id: AssignmentId) -> RepoResult<()>;
    /// Replaces the whole assignment set of one project in one transaction.
    fn replace_project_assignments(
        &self,
        project_id: ProjectId,
        assignments: &[ProjectAssignment],
    ) -> RepoResult<()>;
    /// Like `replace_project_assignments`, also moving the project's own
    /// range when `range` is set. Both writes commit or neither does.
    fn reschedule_project(
        &self,
        project_id: ProjectId,
        range: Option<DateRange>,
        assignments: &[ProjectAssignment],
    ) -> RepoResult<()>;
}

/// SQLite-backed assignment repository.
pub struct SqliteAssignmentRepository<'conn> {
    conn: &'conn Connection,
    notifier: Notifier<'conn>,
}

impl<'conn> SqliteAssignmentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            notifier: Notifier::new(None),
        }
    }

    /// Publishes committed writes to `feed`.
    pub fn with_feed(mut self, feed: &'conn ChangeFeed) -> Self {
        self.notifier = Notifier::new(Some(feed));
        self
    }

    fn list_where(&self, clause: &str, id: uuid::Uuid) -> RepoResult<Vec<ProjectAssignment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ASSIGNMENT_SELECT_SQL} WHERE {clause} ORDER BY project_id ASC, member_id ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut assignments = Vec::new();
        while let Some(row) = rows.next()? {
            assignments.push(parse_assignment_row(row)?);
        }
        Ok(assignments)
    }
}

impl AssignmentRepository for SqliteAssignmentRepository<'_> {
    fn create_assignment(&self, assignment: &ProjectAssignment) -> RepoResult<AssignmentId> {
        assignment.validate()?;
        insert_assignment(self.conn, assignment)?;
        self.notifier
            .emit(EntityKind::ProjectAssignees, ChangeKind::Insert, assignment.id);
        Ok(assignment.id)
    }

    fn update_assignment(&self, assignment: &ProjectAssignment) -> RepoResult<()> {
        assignment.validate()?;
        let changed = self.conn.execute(
            "UPDATE project_assignees
             SET
                member_id = ?2,
                percent_allocation = ?3,
                start_date = ?4,
                end_date = ?5
             WHERE id = ?1
               AND project_id = ?6;",
            params![
                assignment.id.to_string(),
                assignment.member_id.to_string(),
                i64::from(assignment.allocation.percent()),
                assignment.start_date,
                assignment.end_date,
                assignment.project_id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("assignment", assignment.id));
        }
        self.notifier
            .emit(EntityKind::ProjectAssignees, ChangeKind::Update, assignment.id);
        Ok(())
    }

    fn get_assignment(&self, id: AssignmentId) -> RepoResult<Option<ProjectAssignment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ASSIGNMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_assignment_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_for_project(&self, project_id: ProjectId) -> RepoResult<Vec<ProjectAssignment>> {
        self.list_where("project_id = ?1", project_id)
    }

    fn list_for_member(&self, member_id: MemberId) -> RepoResult<Vec<ProjectAssignment>> {
        self.list_where("member_id = ?1", member_id)
    }

    fn list_all(&self) -> RepoResult<Vec<ProjectAssignment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ASSIGNMENT_SELECT_SQL} ORDER BY project_id ASC, member_id ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut assignments = Vec::new();
        while let Some(row) = rows.next()? {
            assignments.push(parse_assignment_row(row)?);
        }
        Ok(assignments)
    }

    fn delete_assignment(&self, id: AssignmentId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM project_assignees WHERE id = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("assignment", id));
        }
        self.notifier
            .emit(EntityKind::ProjectAssignees, ChangeKind::Delete, id);
        Ok(())
    }

    fn replace_project_assignments(
        &self,
        project_id: ProjectId,
        assignments: &[ProjectAssignment],
    ) -> RepoResult<()> {
        self.write_assignment_set(project_id, None, assignments)
    }

    fn reschedule_project(
        &self,
        project_id: ProjectId,
        range: Option<DateRange>,
        assignments: &[ProjectAssignment],
    ) -> RepoResult<()> {
        self.write_assignment_set(project_id, range, assignments)
    }
}

impl SqliteAssignmentRepository<'_> {
    fn write_assignment_set(
        &self,
        project_id: ProjectId,
        range: Option<DateRange>,
        assignments: &[ProjectAssignment],
    ) -> RepoResult<()> {
        let mut members = BTreeSet::new();
        for assignment in assignments {
            assignment.validate()?;
            if assignment.project_id != project_id {
                return Err(RepoError::InvalidData(format!(
                    "assignment {} belongs to project {}, not {project_id}",
                    assignment.id, assignment.project_id
                )));
            }
            if !members.insert(assignment.member_id) {
                return Err(RepoError::Conflict(format!(
                    "member {} assigned twice to project {project_id}",
                    assignment.member_id
                )));
            }
        }

        let project_text = project_id.to_string();
        let tx = self.conn.unchecked_transaction()?;
        let exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1);",
            [project_text.as_str()],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::not_found("project", project_id));
        }
        if let Some(range) = range {
            tx.execute(
                "UPDATE projects
                 SET
                    start_date = ?2,
                    end_date = ?3,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![project_text.as_str(), range.start(), range.end()],
            )?;
        }

        tx.execute(
            "DELETE FROM project_assignees WHERE project_id = ?1;",
            [project_text.as_str()],
        )?;
        for assignment in assignments {
            insert_assignment(&tx, assignment)?;
        }
        tx.commit()?;

        info!(
            "event=assignments_replace module=repo status=ok project_id={project_id} count={} dates_moved={}",
            assignments.len(),
            range.is_some()
        );
        if range.is_some() {
            self.notifier
                .emit(EntityKind::Projects, ChangeKind::Update, project_id);
        }
        self.notifier
            .emit(EntityKind::ProjectAssignees, ChangeKind::Update, project_id);
        Ok(())
    }
}

fn insert_assignment(conn: &Connection, assignment: &ProjectAssignment) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO project_assignees (
            id,
            project_id,
            member_id,
            percent_allocation,
            start_date,
            end_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            assignment.id.to_string(),
            assignment.project_id.to_string(),
            assignment.member_id.to_string(),
            i64::from(assignment.allocation.percent()),
            assignment.start_date,
            assignment.end_date,
        ],
    )?;
    Ok(())
}

fn parse_assignment_row(row: &Row<'_>) -> RepoResult<ProjectAssignment> {
    let id_text: String = row.get("id")?;
    let project_text: String = row.get("project_id")?;
    let member_text: String = row.get("member_id")?;
    let percent: i64 = row.get("percent_allocation")?;

    let assignment = ProjectAssignment {
        id: parse_uuid(&id_text, "project_assignees.id")?,
        project_id: parse_uuid(&project_text, "project_assignees.project_id")?,
        member_id: parse_uuid(&member_text, "project_assignees.member_id")?,
        allocation: Allocation::from_i64(percent)?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
    };
    assignment.validate()?;
    Ok(assignment)
}
