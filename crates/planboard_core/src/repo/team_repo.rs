//! Team/role/member repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist teams, roles, members, time-boxed memberships and ideal sizes.
//!
//! # Invariants
//! - Listings are deterministic: names `COLLATE NOCASE` then id.
//! - Memberships list by `start_month ASC, id ASC`.
//! - `set_ideal_size` is an upsert keyed by `(team_id, role_id)`.
//! - `transfer_membership` commits its closes and its insert together.

use crate::model::team::{
    MemberId, MembershipId, Role, RoleId, Team, TeamId, TeamIdealSize, TeamMember,
    TeamMembership,
};
use crate::model::normalize_optional_text;
use crate::repo::changes::{ChangeFeed, ChangeKind, EntityKind, Notifier};
use crate::repo::{parse_optional_uuid, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

/// Repository interface for team structure.
pub trait TeamRepository {
    fn create_team(&self, team: &Team) -> RepoResult<TeamId>;
    fn update_team(&self, team: &Team) -> RepoResult<()>;
    fn get_team(&self, id: TeamId) -> RepoResult<Option<Team>>;
    fn list_teams(&self) -> RepoResult<Vec<Team>>;
    /// Deletes a team; its projects, memberships and ideal sizes cascade.
    fn delete_team(&self, id: TeamId) -> RepoResult<()>;

    fn create_role(&self, role: &Role) -> RepoResult<RoleId>;
    fn update_role(&self, role: &Role) -> RepoResult<()>;
    fn get_role(&self, id: RoleId) -> RepoResult<Option<Role>>;
    fn list_roles(&self) -> RepoResult<Vec<Role>>;
    fn delete_role(&self, id: RoleId) -> RepoResult<()>;

    fn create_member(&self, member: &TeamMember) -> RepoResult<MemberId>;
    fn update_member(&self, member: &TeamMember) -> RepoResult<()>;
    fn get_member(&self, id: MemberId) -> RepoResult<Option<TeamMember>>;
    /// Lists members, optionally restricted to one home team.
    fn list_members(&self, team_id: Option<TeamId>) -> RepoResult<Vec<TeamMember>>;
    fn delete_member(&self, id: MemberId) -> RepoResult<()>;

    fn create_membership(&self, membership: &TeamMembership) -> RepoResult<MembershipId>;
    fn update_membership(&self, membership: &TeamMembership) -> RepoResult<()>;
    fn get_membership(&self, id: MembershipId) -> RepoResult<Option<TeamMembership>>;
    fn list_memberships_for_member(&self, member_id: MemberId) -> RepoResult<Vec<TeamMembership>>;
    fn list_memberships_for_team(&self, team_id: TeamId) -> RepoResult<Vec<TeamMembership>>;
    fn delete_membership(&self, id: MembershipId) -> RepoResult<()>;
    /// Updates every `closed` membership and inserts `opened` in one
    /// transaction.
    fn transfer_membership(
        &self,
        closed: &[TeamMembership],
        opened: &TeamMembership,
    ) -> RepoResult<()>;

    fn set_ideal_size(&self, size: &TeamIdealSize) -> RepoResult<()>;
    fn list_ideal_sizes(&self, team_id: TeamId) -> RepoResult<Vec<TeamIdealSize>>;
}

/// SQLite-backed team repository.
pub struct SqliteTeamRepository<'conn> {
    conn: &'conn Connection,
    notifier: Notifier<'conn>,
}

impl<'conn> SqliteTeamRepository<'conn> {
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

    fn delete_row(&self, table: EntityKind, entity: &'static str, id: uuid::Uuid) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1;", table.table_name()),
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(entity, id));
        }
        self.notifier.emit(table, ChangeKind::Delete, id);
        Ok(())
    }
}

impl TeamRepository for SqliteTeamRepository<'_> {
    fn create_team(&self, team: &Team) -> RepoResult<TeamId> {
        team.validate()?;
        self.conn.execute(
            "INSERT INTO teams (id, name, description) VALUES (?1, ?2, ?3);",
            params![
                team.id.to_string(),
                team.name.trim(),
                normalize_optional_text(team.description.clone()),
            ],
        )?;
        self.notifier.emit(EntityKind::Teams, ChangeKind::Insert, team.id);
        Ok(team.id)
    }

    fn update_team(&self, team: &Team) -> RepoResult<()> {
        team.validate()?;
        let changed = self.conn.execute(
            "UPDATE teams
             SET
                name = ?2,
                description = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                team.id.to_string(),
                team.name.trim(),
                normalize_optional_text(team.description.clone()),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("team", team.id));
        }
        self.notifier.emit(EntityKind::Teams, ChangeKind::Update, team.id);
        Ok(())
    }

    fn get_team(&self, id: TeamId) -> RepoResult<Option<Team>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description FROM teams WHERE id = ?1;")?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_team_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_teams(&self) -> RepoResult<Vec<Team>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description FROM teams ORDER BY name COLLATE NOCASE ASC, id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut teams = Vec::new();
        while let Some(row) = rows.next()? {
            teams.push(parse_team_row(row)?);
        }
        Ok(teams)
    }

    fn delete_team(&self, id: TeamId) -> RepoResult<()> {
        self.delete_row(EntityKind::Teams, "team", id)
    }

    fn create_role(&self, role: &Role) -> RepoResult<RoleId> {
        role.validate()?;
        self.conn.execute(
            "INSERT INTO roles (id, name, color) VALUES (?1, ?2, ?3);",
            params![role.id.to_string(), role.name.trim(), role.color.as_deref()],
        )?;
        self.notifier.emit(EntityKind::Roles, ChangeKind::Insert, role.id);
        Ok(role.id)
    }

    fn update_role(&self, role: &Role) -> RepoResult<()> {
        role.validate()?;
        let changed = self.conn.execute(
            "UPDATE roles SET name = ?2, color = ?3 WHERE id = ?1;",
            params![role.id.to_string(), role.name.trim(), role.color.as_deref()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("role", role.id));
        }
        self.notifier.emit(EntityKind::Roles, ChangeKind::Update, role.id);
        Ok(())
    }

    fn get_role(&self, id: RoleId) -> RepoResult<Option<Role>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, color FROM roles WHERE id = ?1;")?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_role_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_roles(&self) -> RepoResult<Vec<Role>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, color FROM roles ORDER BY name COLLATE NOCASE ASC, id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut roles = Vec::new();
        while let Some(row) = rows.next()? {
            roles.push(parse_role_row(row)?);
        }
        Ok(roles)
    }

    fn delete_role(&self, id: RoleId) -> RepoResult<()> {
        self.delete_row(EntityKind::Roles, "role", id)
    }

    fn create_member(&self, member: &TeamMember) -> RepoResult<MemberId> {
        member.validate()?;
        self.conn.execute(
            "INSERT INTO team_members (id, name, role_id, team_id) VALUES (?1, ?2, ?3, ?4);",
            params![
                member.id.to_string(),
                member.name.trim(),
                member.role_id.map(|id| id.to_string()),
                member.team_id.map(|id| id.to_string()),
            ],
        )?;
        self.notifier
            .emit(EntityKind::TeamMembers, ChangeKind::Insert, member.id);
        Ok(member.id)
    }

    fn update_member(&self, member: &TeamMember) -> RepoResult<()> {
        member.validate()?;
        let changed = self.conn.execute(
            "UPDATE team_members
             SET
                name = ?2,
                role_id = ?3,
                team_id = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                member.id.to_string(),
                member.name.trim(),
                member.role_id.map(|id| id.to_string()),
                member.team_id.map(|id| id.to_string()),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("team member", member.id));
        }
        self.notifier
            .emit(EntityKind::TeamMembers, ChangeKind::Update, member.id);
        Ok(())
    }

    fn get_member(&self, id: MemberId) -> RepoResult<Option<TeamMember>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, role_id, team_id FROM team_members WHERE id = ?1;")?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_member_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_members(&self, team_id: Option<TeamId>) -> RepoResult<Vec<TeamMember>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, role_id, team_id
             FROM team_members
             WHERE (?1 IS NULL OR team_id = ?1)
             ORDER BY name COLLATE NOCASE ASC, id ASC;",
        )?;
        let mut rows = stmt.query([team_id.map(|id| id.to_string())])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(parse_member_row(row)?);
        }
        Ok(members)
    }

    fn delete_member(&self, id: MemberId) -> RepoResult<()> {
        self.delete_row(EntityKind::TeamMembers, "team member", id)
    }

    fn create_membership(&self, membership: &TeamMembership) -> RepoResult<MembershipId> {
        membership.validate()?;
        insert_membership(self.conn, membership)?;
        self.notifier
            .emit(EntityKind::TeamMemberships, ChangeKind::Insert, membership.id);
        Ok(membership.id)
    }

    fn update_membership(&self, membership: &TeamMembership) -> RepoResult<()> {
        membership.validate()?;
        update_membership_row(self.conn, membership)?;
        self.notifier
            .emit(EntityKind::TeamMemberships, ChangeKind::Update, membership.id);
        Ok(())
    }

    fn get_membership(&self, id: MembershipId) -> RepoResult<Option<TeamMembership>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, member_id, team_id, start_month, end_month
             FROM team_memberships
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_membership_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_memberships_for_member(&self, member_id: MemberId) -> RepoResult<Vec<TeamMembership>> {
        self.list_memberships_where("member_id", member_id)
    }

    fn list_memberships_for_team(&self, team_id: TeamId) -> RepoResult<Vec<TeamMembership>> {
        self.list_memberships_where("team_id", team_id)
    }

    fn delete_membership(&self, id: MembershipId) -> RepoResult<()> {
        self.delete_row(EntityKind::TeamMemberships, "team membership", id)
    }

    fn transfer_membership(
        &self,
        closed: &[TeamMembership],
        opened: &TeamMembership,
    ) -> RepoResult<()> {
        for membership in closed {
            membership.validate()?;
        }
        opened.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        for membership in closed {
            update_membership_row(&tx, membership)?;
        }
        insert_membership(&tx, opened)?;
        tx.commit()?;

        for membership in closed {
            self.notifier
                .emit(EntityKind::TeamMemberships, ChangeKind::Update, membership.id);
        }
        self.notifier
            .emit(EntityKind::TeamMemberships, ChangeKind::Insert, opened.id);
        Ok(())
    }

    fn set_ideal_size(&self, size: &TeamIdealSize) -> RepoResult<()> {
        size.validate()?;
        self.conn.execute(
            "INSERT INTO team_ideal_sizes (team_id, role_id, ideal_count)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (team_id, role_id) DO UPDATE SET ideal_count = excluded.ideal_count;",
            params![
                size.team_id.to_string(),
                size.role_id.to_string(),
                i64::from(size.ideal_count),
            ],
        )?;
        self.notifier
            .emit(EntityKind::TeamIdealSizes, ChangeKind::Update, size.team_id);
        Ok(())
    }

    fn list_ideal_sizes(&self, team_id: TeamId) -> RepoResult<Vec<TeamIdealSize>> {
        let mut stmt = self.conn.prepare(
            "SELECT team_id, role_id, ideal_count
             FROM team_ideal_sizes
             WHERE team_id = ?1
             ORDER BY role_id ASC;",
        )?;
        let mut rows = stmt.query([team_id.to_string()])?;
        let mut sizes = Vec::new();
        while let Some(row) = rows.next()? {
            let team_text: String = row.get("team_id")?;
            let role_text: String = row.get("role_id")?;
            let count: i64 = row.get("ideal_count")?;
            sizes.push(TeamIdealSize {
                team_id: parse_uuid(&team_text, "team_ideal_sizes.team_id")?,
                role_id: parse_uuid(&role_text, "team_ideal_sizes.role_id")?,
                ideal_count: u32::try_from(count).map_err(|_| {
                    RepoError::InvalidData(format!(
                        "invalid ideal_count `{count}` in team_ideal_sizes.ideal_count"
                    ))
                })?,
            });
        }
        Ok(sizes)
    }
}

impl SqliteTeamRepository<'_> {
    fn list_memberships_where(
        &self,
        column: &'static str,
        id: uuid::Uuid,
    ) -> RepoResult<Vec<TeamMembership>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, member_id, team_id, start_month, end_month
             FROM team_memberships
             WHERE {column} = ?1
             ORDER BY start_month ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut memberships = Vec::new();
        while let Some(row) = rows.next()? {
            memberships.push(parse_membership_row(row)?);
        }
        Ok(memberships)
    }
}

fn insert_membership(conn: &Connection, membership: &TeamMembership) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO team_memberships (id, member_id, team_id, start_month, end_month)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            membership.id.to_string(),
            membership.member_id.to_string(),
            membership.team_id.to_string(),
            membership.start_month,
            membership.end_month,
        ],
    )?;
    Ok(())
}

fn update_membership_row(conn: &Connection, membership: &TeamMembership) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE team_memberships
         SET team_id = ?2, start_month = ?3, end_month = ?4
         WHERE id = ?1;",
        params![
            membership.id.to_string(),
            membership.team_id.to_string(),
            membership.start_month,
            membership.end_month,
        ],
    )?;
    if changed == 0 {
        return Err(RepoError::not_found("team membership", membership.id));
    }
    Ok(())
}

fn parse_team_row(row: &Row<'_>) -> RepoResult<Team> {
    let id_text: String = row.get("id")?;
    let team = Team {
        id: parse_uuid(&id_text, "teams.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
    };
    team.validate()?;
    Ok(team)
}

fn parse_role_row(row: &Row<'_>) -> RepoResult<Role> {
    let id_text: String = row.get("id")?;
    let role = Role {
        id: parse_uuid(&id_text, "roles.id")?,
        name: row.get("name")?,
        color: row.get("color")?,
    };
    role.validate()?;
    Ok(role)
}

fn parse_member_row(row: &Row<'_>) -> RepoResult<TeamMember> {
    let id_text: String = row.get("id")?;
    let member = TeamMember {
        id: parse_uuid(&id_text, "team_members.id")?,
        name: row.get("name")?,
        role_id: parse_optional_uuid(row.get("role_id")?, "team_members.role_id")?,
        team_id: parse_optional_uuid(row.get("team_id")?, "team_members.team_id")?,
    };
    member.validate()?;
    Ok(member)
}

fn parse_membership_row(row: &Row<'_>) -> RepoResult<TeamMembership> {
    let id_text: String = row.get("id")?;
    let member_text: String = row.get("member_id")?;
    let team_text: String = row.get("team_id")?;
    let membership = TeamMembership {
        id: parse_uuid(&id_text, "team_memberships.id")?,
        member_id: parse_uuid(&member_text, "team_memberships.member_id")?,
        team_id: parse_uuid(&team_text, "team_memberships.team_id")?,
        start_month: row.get("start_month")?,
        end_month: row.get("end_month")?,
    };
    membership.validate()?;
    Ok(membership)
}
