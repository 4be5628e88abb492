//! Profile repository for basic user administration.
//!
//! # Invariants
//! - Emails are unique case-insensitively and stored lowercased.
//! - Deactivation is preferred over deletion; `delete_profile` is a hard delete.

use crate::model::profile::{Profile, ProfileId, UserRole};
use crate::repo::changes::{ChangeFeed, ChangeKind, EntityKind, Notifier};
use crate::repo::{bool_to_int, parse_bool, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const PROFILE_SELECT_SQL: &str = "SELECT id, email, display_name, role, is_active FROM profiles";

pub trait ProfileRepository {
    fn create_profile(&self, profile: &Profile) -> RepoResult<ProfileId>;
    fn get_profile(&self, id: ProfileId) -> RepoResult<Option<Profile>>;
    fn find_by_email(&self, email: &str) -> RepoResult<Option<Profile>>;
    fn list_profiles(&self, include_inactive: bool) -> RepoResult<Vec<Profile>>;
    fn set_role(&self, id: ProfileId, role: UserRole) -> RepoResult<()>;
    fn set_active(&self, id: ProfileId, is_active: bool) -> RepoResult<()>;
    fn delete_profile(&self, id: ProfileId) -> RepoResult<()>;
}

pub struct SqliteProfileRepository<'conn> {
    conn: &'conn Connection,
    notifier: Notifier<'conn>,
}

impl<'conn> SqliteProfileRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            notifier: Notifier::new(None),
        }
    }

    pub fn with_feed(mut self, feed: &'conn ChangeFeed) -> Self {
        self.notifier = Notifier::new(Some(feed));
        self
    }

    fn update_column(
        &self,
        id: ProfileId,
        sql: &str,
        value: &dyn rusqlite::ToSql,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(sql, params![id.to_string(), value])?;
        if changed == 0 {
            return Err(RepoError::not_found("profile", id));
        }
        self.notifier.emit(EntityKind::Profiles, ChangeKind::Update, id);
        Ok(())
    }
}

impl ProfileRepository for SqliteProfileRepository<'_> {
    fn create_profile(&self, profile: &Profile) -> RepoResult<ProfileId> {
        profile.validate()?;
        self.conn.execute(
            "INSERT INTO profiles (id, email, display_name, role, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                profile.id.to_string(),
                profile.email.trim().to_lowercase(),
                profile.display_name.trim(),
                profile.role.as_str(),
                bool_to_int(profile.is_active),
            ],
        )?;
        self.notifier
            .emit(EntityKind::Profiles, ChangeKind::Insert, profile.id);
        Ok(profile.id)
    }

    fn get_profile(&self, id: ProfileId) -> RepoResult<Option<Profile>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROFILE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_profile_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<Profile>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROFILE_SELECT_SQL} WHERE email = ?1 COLLATE NOCASE;"))?;
        let mut rows = stmt.query([email.trim()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_profile_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_profiles(&self, include_inactive: bool) -> RepoResult<Vec<Profile>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROFILE_SELECT_SQL}
             WHERE (?1 = 1 OR is_active = 1)
             ORDER BY display_name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([bool_to_int(include_inactive)])?;
        let mut profiles = Vec::new();
        while let Some(row) = rows.next()? {
            profiles.push(parse_profile_row(row)?);
        }
        Ok(profiles)
    }

    fn set_role(&self, id: ProfileId, role: UserRole) -> RepoResult<()> {
        self.update_column(
            id,
            "UPDATE profiles SET role = ?2 WHERE id = ?1;",
            &role.as_str(),
        )
    }

    fn set_active(&self, id: ProfileId, is_active: bool) -> RepoResult<()> {
        self.update_column(
            id,
            "UPDATE profiles SET is_active = ?2 WHERE id = ?1;",
            &bool_to_int(is_active),
        )
    }

    fn delete_profile(&self, id: ProfileId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM profiles WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("profile", id));
        }
        self.notifier.emit(EntityKind::Profiles, ChangeKind::Delete, id);
        Ok(())
    }
}

fn parse_profile_row(row: &Row<'_>) -> RepoResult<Profile> {
    let id_text: String = row.get("id")?;
    let role_text: String = row.get("role")?;
    let profile = Profile {
        id: parse_uuid(&id_text, "profiles.id")?,
        email: row.get("email")?,
        display_name: row.get("display_name")?,
        role: UserRole::parse(&role_text)?,
        is_active: parse_bool(row.get("is_active")?, "profiles.is_active")?,
    };
    profile.validate()?;
    Ok(profile)
}
