//! Project/product repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist projects together with their product links.
//! - Own filtered project listing used by roadmap and report views.
//!
//! # Invariants
//! - Project writes replace the product link set in the same transaction.
//! - Listing order is `start_date ASC, name COLLATE NOCASE ASC, id ASC`.

use crate::model::dates::DateRange;
use crate::model::project::{
    normalize_product_ids, Product, ProductId, Project, ProjectId, ProjectStatus, Visibility,
};
use crate::model::team::TeamId;
use crate::model::normalize_optional_text;
use crate::repo::changes::{ChangeFeed, ChangeKind, EntityKind, Notifier};
use crate::repo::{bool_to_int, parse_bool, parse_uuid, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const PROJECT_SELECT_SQL: &str = "SELECT
    id,
    name,
    team_id,
    start_date,
    end_date,
    value_score,
    is_rd,
    status,
    visibility,
    color,
    link
FROM projects";

/// Filter options for project listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectListQuery {
    pub team_id: Option<TeamId>,
    pub status: Option<ProjectStatus>,
    pub visibility: Option<Visibility>,
    pub product_id: Option<ProductId>,
    pub is_rd: Option<bool>,
    /// Case-insensitive substring match on the project name.
    pub name_contains: Option<String>,
    /// Keeps projects whose range overlaps this window.
    pub window: Option<DateRange>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for projects and products.
pub trait ProjectRepository {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId>;
    fn update_project(&self, project: &Project) -> RepoResult<()>;
    /// Moves a project's own date range without touching other fields.
    fn update_project_dates(&self, id: ProjectId, range: DateRange) -> RepoResult<()>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<Project>>;
    /// Deletes a project; its assignments and product links cascade.
    fn delete_project(&self, id: ProjectId) -> RepoResult<()>;
    fn set_project_products(&self, id: ProjectId, product_ids: &[ProductId]) -> RepoResult<()>;

    fn create_product(&self, product: &Product) -> RepoResult<ProductId>;
    fn update_product(&self, product: &Product) -> RepoResult<()>;
    fn get_product(&self, id: ProductId) -> RepoResult<Option<Product>>;
    fn list_products(&self) -> RepoResult<Vec<Product>>;
    fn delete_product(&self, id: ProductId) -> RepoResult<()>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
    notifier: Notifier<'conn>,
}

impl<'conn> SqliteProjectRepository<'conn> {
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
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId> {
        project.validate()?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO projects (
                id,
                name,
                team_id,
                start_date,
                end_date,
                value_score,
                is_rd,
                status,
                visibility,
                color,
                link
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                project.id.to_string(),
                project.name.trim(),
                project.team_id.to_string(),
                project.start_date,
                project.end_date,
                i64::from(project.value_score),
                bool_to_int(project.is_rd),
                project.status.as_str(),
                project.visibility.as_str(),
                project.color.as_deref(),
                normalize_optional_text(project.link.clone()),
            ],
        )?;
        write_product_links(&tx, project.id, &project.product_ids)?;
        tx.commit()?;

        self.notifier
            .emit(EntityKind::Projects, ChangeKind::Insert, project.id);
        Ok(project.id)
    }

    fn update_project(&self, project: &Project) -> RepoResult<()> {
        project.validate()?;
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE projects
             SET
                name = ?2,
                team_id = ?3,
                start_date = ?4,
                end_date = ?5,
                value_score = ?6,
                is_rd = ?7,
                status = ?8,
                visibility = ?9,
                color = ?10,
                link = ?11,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                project.id.to_string(),
                project.name.trim(),
                project.team_id.to_string(),
                project.start_date,
                project.end_date,
                i64::from(project.value_score),
                bool_to_int(project.is_rd),
                project.status.as_str(),
                project.visibility.as_str(),
                project.color.as_deref(),
                normalize_optional_text(project.link.clone()),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("project", project.id));
        }
        write_product_links(&tx, project.id, &project.product_ids)?;
        tx.commit()?;

        self.notifier
            .emit(EntityKind::Projects, ChangeKind::Update, project.id);
        Ok(())
    }

    fn update_project_dates(&self, id: ProjectId, range: DateRange) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE projects
             SET
                start_date = ?2,
                end_date = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), range.start(), range.end()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("project", id));
        }
        self.notifier.emit(EntityKind::Projects, ChangeKind::Update, id);
        Ok(())
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_project_row(self.conn, row)?)),
            None => Ok(None),
        }
    }

    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<Project>> {
        let mut sql = format!("{PROJECT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(team_id) = query.team_id {
            sql.push_str(" AND team_id = ?");
            bind_values.push(Value::Text(team_id.to_string()));
        }
        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(visibility) = query.visibility {
            sql.push_str(" AND visibility = ?");
            bind_values.push(Value::Text(visibility.as_str().to_string()));
        }
        if let Some(is_rd) = query.is_rd {
            sql.push_str(" AND is_rd = ?");
            bind_values.push(Value::Integer(bool_to_int(is_rd)));
        }
        if let Some(product_id) = query.product_id {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM project_products pp
                    WHERE pp.project_id = projects.id
                      AND pp.product_id = ?
                )",
            );
            bind_values.push(Value::Text(product_id.to_string()));
        }
        if let Some(needle) = query
            .name_contains
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            sql.push_str(" AND instr(lower(name), lower(?)) > 0");
            bind_values.push(Value::Text(needle.to_string()));
        }
        if let Some(window) = query.window {
            sql.push_str(" AND start_date <= ? AND end_date >= ?");
            bind_values.push(Value::Text(window.end().format("%F").to_string()));
            bind_values.push(Value::Text(window.start().format("%F").to_string()));
        }

        sql.push_str(" ORDER BY start_date ASC, name COLLATE NOCASE ASC, id ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(self.conn, row)?);
        }
        Ok(projects)
    }

    fn delete_project(&self, id: ProjectId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("project", id));
        }
        self.notifier.emit(EntityKind::Projects, ChangeKind::Delete, id);
        Ok(())
    }

    fn set_project_products(&self, id: ProjectId, product_ids: &[ProductId]) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::not_found("project", id));
        }
        write_product_links(&tx, id, product_ids)?;
        tx.execute(
            "UPDATE projects SET updated_at = (strftime('%s', 'now') * 1000) WHERE id = ?1;",
            [id.to_string()],
        )?;
        tx.commit()?;

        self.notifier.emit(EntityKind::Projects, ChangeKind::Update, id);
        Ok(())
    }

    fn create_product(&self, product: &Product) -> RepoResult<ProductId> {
        product.validate()?;
        self.conn.execute(
            "INSERT INTO products (id, name, description) VALUES (?1, ?2, ?3);",
            params![
                product.id.to_string(),
                product.name.trim(),
                normalize_optional_text(product.description.clone()),
            ],
        )?;
        self.notifier
            .emit(EntityKind::Products, ChangeKind::Insert, product.id);
        Ok(product.id)
    }

    fn update_product(&self, product: &Product) -> RepoResult<()> {
        product.validate()?;
        let changed = self.conn.execute(
            "UPDATE products SET name = ?2, description = ?3 WHERE id = ?1;",
            params![
                product.id.to_string(),
                product.name.trim(),
                normalize_optional_text(product.description.clone()),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("product", product.id));
        }
        self.notifier
            .emit(EntityKind::Products, ChangeKind::Update, product.id);
        Ok(())
    }

    fn get_product(&self, id: ProductId) -> RepoResult<Option<Product>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description FROM products WHERE id = ?1;")?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_product_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_products(&self) -> RepoResult<Vec<Product>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description FROM products ORDER BY name COLLATE NOCASE ASC, id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut products = Vec::new();
        while let Some(row) = rows.next()? {
            products.push(parse_product_row(row)?);
        }
        Ok(products)
    }

    fn delete_product(&self, id: ProductId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM products WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("product", id));
        }
        self.notifier.emit(EntityKind::Products, ChangeKind::Delete, id);
        Ok(())
    }
}

fn write_product_links(
    conn: &Connection,
    project_id: ProjectId,
    product_ids: &[ProductId],
) -> RepoResult<()> {
    let project_text = project_id.to_string();
    conn.execute(
        "DELETE FROM project_products WHERE project_id = ?1;",
        [project_text.as_str()],
    )?;
    for product_id in normalize_product_ids(product_ids) {
        conn.execute(
            "INSERT INTO project_products (project_id, product_id) VALUES (?1, ?2);",
            params![project_text.as_str(), product_id.to_string()],
        )?;
    }
    Ok(())
}

fn load_product_ids(conn: &Connection, project_id: &str) -> RepoResult<Vec<ProductId>> {
    let mut stmt = conn.prepare(
        "SELECT product_id
         FROM project_products
         WHERE project_id = ?1
         ORDER BY product_id ASC;",
    )?;
    let mut rows = stmt.query([project_id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "project_products.product_id")?);
    }
    Ok(normalize_product_ids(&ids))
}

fn parse_project_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Project> {
    let id_text: String = row.get("id")?;
    let team_text: String = row.get("team_id")?;
    let status_text: String = row.get("status")?;
    let visibility_text: String = row.get("visibility")?;
    let score: i64 = row.get("value_score")?;

    let project = Project {
        id: parse_uuid(&id_text, "projects.id")?,
        name: row.get("name")?,
        team_id: parse_uuid(&team_text, "projects.team_id")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        value_score: u8::try_from(score).map_err(|_| {
            RepoError::InvalidData(format!("invalid value score `{score}` in projects.value_score"))
        })?,
        is_rd: parse_bool(row.get("is_rd")?, "projects.is_rd")?,
        status: ProjectStatus::parse(&status_text)?,
        visibility: Visibility::parse(&visibility_text)?,
        color: row.get("color")?,
        link: row.get("link")?,
        product_ids: load_product_ids(conn, &id_text)?,
    };
    project.validate()?;
    Ok(project)
}

fn parse_product_row(row: &Row<'_>) -> RepoResult<Product> {
    let id_text: String = row.get("id")?;
    let product = Product {
        id: parse_uuid(&id_text, "products.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
    };
    product.validate()?;
    Ok(product)
}
