//! Ordered schema steps for the planning store.
//!
//! Each step runs in its own transaction together with the
//! `PRAGMA user_version` bump, so a failure leaves the database at the last
//! step that succeeded.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "teams_projects_assignees",
        sql: include_str!("0001_init.sql"),
    },
    Migration {
        version: 2,
        name: "memberships_ideal_sizes",
        sql: include_str!("0002_memberships.sql"),
    },
    Migration {
        version: 3,
        name: "profiles",
        sql: include_str!("0003_profiles.sql"),
    },
];

/// Where a database stands relative to this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaStatus {
    pub current: u32,
    pub latest: u32,
}

impl SchemaStatus {
    pub fn pending(&self) -> usize {
        MIGRATIONS
            .iter()
            .filter(|migration| migration.version > self.current)
            .count()
    }

    pub fn is_newer_than_build(&self) -> bool {
        self.current > self.latest
    }
}

pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

pub fn schema_status(conn: &Connection) -> DbResult<SchemaStatus> {
    Ok(SchemaStatus {
        current: user_version(conn)?,
        latest: latest_version(),
    })
}

/// Applies every step above the stored `user_version`.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let status = schema_status(conn)?;
    if status.is_newer_than_build() {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: status.current,
            latest_supported: status.latest,
        });
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > status.current) {
        if let Err(source) = apply_step(conn, migration) {
            error!(
                "event=db_migrate module=db status=error version={} name={} error={source}",
                migration.version, migration.name
            );
            return Err(DbError::Migration {
                version: migration.version,
                name: migration.name,
                source,
            });
        }
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    Ok(())
}

fn apply_step(conn: &mut Connection, migration: &Migration) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(migration.sql)?;
    tx.pragma_update(None, "user_version", migration.version)?;
    tx.commit()
}

fn user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}
