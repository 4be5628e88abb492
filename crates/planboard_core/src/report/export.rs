//! Tabular export pipeline.
//!
//! # Responsibility
//! - Describe export columns per record type (`ExportSchema`).
//! - Resolve reference ids to display names and join list values.
//! - Render tables as CSV.
//!
//! # Invariants
//! - A requested key missing from the schema becomes a plain column with a
//!   title-cased header; unknown keys never fail an export.
//! - Column order follows the requested key order.

use crate::model::project::Project;
use crate::report::assignments::AssignmentReportRow;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;
use uuid::Uuid;

const DEFAULT_LIST_SEPARATOR: &str = ", ";

#[derive(Debug)]
pub enum ExportError {
    Csv(csv::Error),
    Io(std::io::Error),
    Encoding(std::string::FromUtf8Error),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv(err) => write!(f, "csv write failed: {err}"),
            Self::Io(err) => write!(f, "export io failed: {err}"),
            Self::Encoding(err) => write!(f, "export produced invalid utf-8: {err}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Csv(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Encoding(err) => Some(err),
        }
    }
}

impl From<csv::Error> for ExportError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

/// Raw cell value before formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportValue {
    Text(String),
    Integer(i64),
    Number(f64),
    Date(NaiveDate),
    Bool(bool),
    List(Vec<String>),
    Empty,
}

impl ExportValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn optional_text(value: Option<&str>) -> Self {
        match value {
            Some(text) if !text.trim().is_empty() => Self::Text(text.to_string()),
            _ => Self::Empty,
        }
    }

    /// Default formatter used by plain and computed columns.
    pub fn render(&self) -> String {
        self.render_with(DEFAULT_LIST_SEPARATOR)
    }

    fn render_with(&self, separator: &str) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Number(value) => value.to_string(),
            Self::Date(value) => value.format("%Y-%m-%d").to_string(),
            Self::Bool(true) => "Yes".to_string(),
            Self::Bool(false) => "No".to_string(),
            Self::List(values) => values.join(separator),
            Self::Empty => String::new(),
        }
    }
}

/// Record that exposes named fields to the export pipeline.
pub trait ExportRecord {
    /// Value for `key`; unknown keys return `ExportValue::Empty`.
    fn field(&self, key: &str) -> ExportValue;
}

/// Id to display-name lookup for `Reference` columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceIndex {
    names: HashMap<Uuid, String>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: Uuid, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    pub fn resolve(&self, id: Uuid) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    // Unknown or malformed ids pass through unchanged.
    fn resolve_text(&self, raw: &str) -> String {
        Uuid::parse_str(raw.trim())
            .ok()
            .and_then(|id| self.resolve(id))
            .map_or_else(|| raw.to_string(), str::to_string)
    }
}

impl<S: Into<String>> FromIterator<(Uuid, S)> for ReferenceIndex {
    fn from_iter<I: IntoIterator<Item = (Uuid, S)>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(id, name)| (id, name.into()))
                .collect(),
        }
    }
}

/// One export column.
pub enum ExportField<R> {
    Plain {
        key: String,
        header: String,
    },
    /// Field holds an id (or list of ids) shown by display name.
    Reference {
        key: String,
        header: String,
    },
    /// Field holds a list joined with `separator`.
    Array {
        key: String,
        header: String,
        separator: String,
    },
    Computed {
        key: String,
        header: String,
        compute: fn(&R) -> ExportValue,
    },
}

impl<R> ExportField<R> {
    pub fn plain(key: &str, header: &str) -> Self {
        Self::Plain {
            key: key.to_string(),
            header: header.to_string(),
        }
    }

    pub fn reference(key: &str, header: &str) -> Self {
        Self::Reference {
            key: key.to_string(),
            header: header.to_string(),
        }
    }

    pub fn array(key: &str, header: &str, separator: &str) -> Self {
        Self::Array {
            key: key.to_string(),
            header: header.to_string(),
            separator: separator.to_string(),
        }
    }

    pub fn computed(key: &str, header: &str, compute: fn(&R) -> ExportValue) -> Self {
        Self::Computed {
            key: key.to_string(),
            header: header.to_string(),
            compute,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Plain { key, .. }
            | Self::Reference { key, .. }
            | Self::Array { key, .. }
            | Self::Computed { key, .. } => key,
        }
    }

    pub fn header(&self) -> &str {
        match self {
            Self::Plain { header, .. }
            | Self::Reference { header, .. }
            | Self::Array { header, .. }
            | Self::Computed { header, .. } => header,
        }
    }
}

impl<R: ExportRecord> ExportField<R> {
    fn render(&self, record: &R, references: &ReferenceIndex) -> String {
        match self {
            Self::Plain { key, .. } => record.field(key).render(),
            Self::Reference { key, .. } => match record.field(key) {
                ExportValue::Text(raw) => references.resolve_text(&raw),
                ExportValue::List(ids) => ids
                    .iter()
                    .map(|raw| references.resolve_text(raw))
                    .collect::<Vec<_>>()
                    .join(DEFAULT_LIST_SEPARATOR),
                other => other.render(),
            },
            Self::Array { key, separator, .. } => record.field(key).render_with(separator),
            Self::Computed { compute, .. } => compute(record).render(),
        }
    }
}

impl<R> std::fmt::Debug for ExportField<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Plain { .. } => "Plain",
            Self::Reference { .. } => "Reference",
            Self::Array { .. } => "Array",
            Self::Computed { .. } => "Computed",
        };
        f.debug_struct(kind)
            .field("key", &self.key())
            .field("header", &self.header())
            .finish()
    }
}

/// Column catalogue for one record type.
#[derive(Debug)]
pub struct ExportSchema<R> {
    fields: Vec<ExportField<R>>,
}

impl<R> Default for ExportSchema<R> {
    fn default() -> Self {
        Self { fields: Vec::new() }
    }
}

impl<R: ExportRecord> ExportSchema<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column, replacing any earlier column with the same key.
    pub fn with_field(mut self, field: ExportField<R>) -> Self {
        self.fields.retain(|existing| existing.key() != field.key());
        self.fields.push(field);
        self
    }

    pub fn field(&self, key: &str) -> Option<&ExportField<R>> {
        self.fields.iter().find(|field| field.key() == key)
    }

    pub fn default_keys(&self) -> Vec<&str> {
        self.fields.iter().map(ExportField::key).collect()
    }

    /// Builds a table for `keys`, or for every schema column when `keys` is
    /// empty.
    pub fn build_table(
        &self,
        records: &[R],
        keys: &[&str],
        references: &ReferenceIndex,
    ) -> ExportTable {
        let keys: Vec<&str> = if keys.is_empty() {
            self.default_keys()
        } else {
            keys.iter().map(|key| key.trim()).collect()
        };
        let fallbacks: Vec<Option<ExportField<R>>> = keys
            .iter()
            .map(|key| match self.field(key) {
                Some(_) => None,
                None => Some(ExportField::plain(key, &title_case(key))),
            })
            .collect();
        let columns: Vec<&ExportField<R>> = keys
            .iter()
            .zip(&fallbacks)
            .filter_map(|(key, fallback)| fallback.as_ref().or_else(|| self.field(key)))
            .collect();

        ExportTable {
            headers: columns
                .iter()
                .map(|column| column.header().to_string())
                .collect(),
            rows: records
                .iter()
                .map(|record| {
                    columns
                        .iter()
                        .map(|column| column.render(record, references))
                        .collect()
                })
                .collect(),
        }
    }
}

/// Rendered table ready for a sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExportTable {
    pub fn write_csv<W: Write>(&self, sink: W) -> Result<(), ExportError> {
        let mut writer = csv::Writer::from_writer(sink);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush().map_err(ExportError::Io)?;
        Ok(())
    }

    pub fn to_csv(&self) -> Result<String, ExportError> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer).map_err(ExportError::Encoding)
    }
}

/// `start_date` and `startDate` both become `Start Date`.
pub fn title_case(key: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut previous_lower = false;
    for ch in key.trim().chars() {
        if ch == '_' || ch == '-' || ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            previous_lower = false;
            continue;
        }
        if ch.is_uppercase() && previous_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        previous_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

impl ExportRecord for Project {
    fn field(&self, key: &str) -> ExportValue {
        match key {
            "id" => ExportValue::text(self.id.to_string()),
            "name" => ExportValue::text(self.name.clone()),
            "team_id" => ExportValue::text(self.team_id.to_string()),
            "start_date" => ExportValue::Date(self.start_date),
            "end_date" => ExportValue::Date(self.end_date),
            "value_score" => ExportValue::Integer(i64::from(self.value_score)),
            "is_rd" => ExportValue::Bool(self.is_rd),
            "status" => ExportValue::text(self.status.as_str()),
            "visibility" => ExportValue::text(self.visibility.as_str()),
            "color" => ExportValue::optional_text(self.color.as_deref()),
            "link" => ExportValue::optional_text(self.link.as_deref()),
            "product_ids" => {
                ExportValue::List(self.product_ids.iter().map(ToString::to_string).collect())
            }
            _ => ExportValue::Empty,
        }
    }
}

pub fn project_schema() -> ExportSchema<Project> {
    ExportSchema::new()
        .with_field(ExportField::plain("name", "Project"))
        .with_field(ExportField::reference("team_id", "Team"))
        .with_field(ExportField::plain("start_date", "Start Date"))
        .with_field(ExportField::plain("end_date", "End Date"))
        .with_field(ExportField::computed(
            "duration_days",
            "Duration (days)",
            |project: &Project| ExportValue::Integer(project.range().len_days()),
        ))
        .with_field(ExportField::plain("status", "Status"))
        .with_field(ExportField::plain("visibility", "Visibility"))
        .with_field(ExportField::plain("value_score", "Value Score"))
        .with_field(ExportField::plain("is_rd", "R&D"))
        .with_field(ExportField::reference("product_ids", "Products"))
}

impl ExportRecord for AssignmentReportRow {
    fn field(&self, key: &str) -> ExportValue {
        match key {
            "assignment_id" => ExportValue::text(self.assignment_id.to_string()),
            "member_id" => ExportValue::text(self.member_id.to_string()),
            "member_name" => ExportValue::text(self.member_name.clone()),
            "role_name" => ExportValue::optional_text(self.role_name.as_deref()),
            "team_id" => ExportValue::text(self.team_id.to_string()),
            "team_name" => ExportValue::text(self.team_name.clone()),
            "project_id" => ExportValue::text(self.project_id.to_string()),
            "project_name" => ExportValue::text(self.project_name.clone()),
            "product_names" => ExportValue::List(self.product_names.clone()),
            "percent" => ExportValue::Integer(i64::from(self.percent)),
            "start_date" => ExportValue::Date(self.start_date),
            "end_date" => ExportValue::Date(self.end_date),
            "status" => ExportValue::text(self.status.as_str()),
            "visibility" => ExportValue::text(self.visibility.as_str()),
            "is_rd" => ExportValue::Bool(self.is_rd),
            _ => ExportValue::Empty,
        }
    }
}

pub fn assignment_report_schema() -> ExportSchema<AssignmentReportRow> {
    ExportSchema::new()
        .with_field(ExportField::plain("member_name", "Member"))
        .with_field(ExportField::plain("role_name", "Role"))
        .with_field(ExportField::plain("team_name", "Team"))
        .with_field(ExportField::plain("project_name", "Project"))
        .with_field(ExportField::array("product_names", "Products", "; "))
        .with_field(ExportField::computed(
            "allocation",
            "Allocation",
            |row: &AssignmentReportRow| ExportValue::text(format!("{}%", row.percent)),
        ))
        .with_field(ExportField::plain("start_date", "Start Date"))
        .with_field(ExportField::plain("end_date", "End Date"))
        .with_field(ExportField::plain("status", "Status"))
        .with_field(ExportField::plain("visibility", "Visibility"))
}

#[cfg(test)]
mod tests {
    use super::{title_case, ExportField, ExportRecord, ExportSchema, ExportValue, ReferenceIndex};
    use uuid::Uuid;

    struct Row {
        owner: Uuid,
        tags: Vec<String>,
        hours: i64,
    }

    impl ExportRecord for Row {
        fn field(&self, key: &str) -> ExportValue {
            match key {
                "owner" => ExportValue::text(self.owner.to_string()),
                "tags" => ExportValue::List(self.tags.clone()),
                "hours" => ExportValue::Integer(self.hours),
                _ => ExportValue::Empty,
            }
        }
    }

    fn schema() -> ExportSchema<Row> {
        ExportSchema::new()
            .with_field(ExportField::reference("owner", "Owner"))
            .with_field(ExportField::array("tags", "Tags", "|"))
            .with_field(ExportField::computed("days", "Days", |row: &Row| {
                ExportValue::Integer(row.hours / 8)
            }))
    }

    #[test]
    fn title_case_handles_snake_and_camel() {
        assert_eq!(title_case("start_date"), "Start Date");
        assert_eq!(title_case("projectName"), "Project Name");
        assert_eq!(title_case("  value-score "), "Value Score");
    }

    #[test]
    fn columns_resolve_references_join_lists_and_compute() {
        let owner = Uuid::new_v4();
        let references: ReferenceIndex = [(owner, "Ada")].into_iter().collect();
        let rows = [Row {
            owner,
            tags: vec!["a".to_string(), "b".to_string()],
            hours: 40,
        }];
        let table = schema().build_table(&rows, &[], &references);
        assert_eq!(table.headers, vec!["Owner", "Tags", "Days"]);
        assert_eq!(table.rows[0], vec!["Ada", "a|b", "5"]);
    }

    #[test]
    fn unknown_keys_fall_back_to_plain_columns() {
        let rows = [Row {
            owner: Uuid::new_v4(),
            tags: Vec::new(),
            hours: 16,
        }];
        let table = schema().build_table(&rows, &["hours", "days"], &ReferenceIndex::new());
        assert_eq!(table.headers, vec!["Hours", "Days"]);
        assert_eq!(table.rows[0], vec!["16", "2"]);
    }

    #[test]
    fn unresolved_reference_keeps_raw_id() {
        let owner = Uuid::new_v4();
        let rows = [Row {
            owner,
            tags: Vec::new(),
            hours: 0,
        }];
        let table = schema().build_table(&rows, &["owner"], &ReferenceIndex::new());
        assert_eq!(table.rows[0][0], owner.to_string());
    }

    #[test]
    fn csv_quotes_separators() {
        let rows = [Row {
            owner: Uuid::new_v4(),
            tags: vec!["x,y".to_string()],
            hours: 8,
        }];
        let csv = schema()
            .build_table(&rows, &["tags", "hours"], &ReferenceIndex::new())
            .to_csv()
            .unwrap();
        assert_eq!(csv, "Tags,Hours\n\"x,y\",8\n");
    }
}
