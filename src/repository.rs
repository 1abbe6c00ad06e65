use crate::models::Profile;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::PgPool;
use std::{
    collections::HashMap,
    fmt,
    str::FromStr,
    sync::{Arc, RwLock},
};
use thiserror::Error;
use uuid::Uuid;

/// Collection
///
/// The named resource collections of the hosted backend. Table names only ever come
/// from here, never from request input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Profiles,
    Students,
    Classes,
    Courses,
    Disciplines,
    Assessments,
    Events,
    Curricula,
    Messages,
    Announcements,
    CmsContent,
    Contacts,
}

impl Collection {
    pub const ALL: [Collection; 12] = [
        Collection::Profiles,
        Collection::Students,
        Collection::Classes,
        Collection::Courses,
        Collection::Disciplines,
        Collection::Assessments,
        Collection::Events,
        Collection::Curricula,
        Collection::Messages,
        Collection::Announcements,
        Collection::CmsContent,
        Collection::Contacts,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            Collection::Profiles => "profiles",
            Collection::Students => "students",
            Collection::Classes => "classes",
            Collection::Courses => "courses",
            Collection::Disciplines => "disciplines",
            Collection::Assessments => "assessments",
            Collection::Events => "events",
            Collection::Curricula => "curricula",
            Collection::Messages => "messages",
            Collection::Announcements => "announcements",
            Collection::CmsContent => "cms_content",
            Collection::Contacts => "contacts",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Collection::Profiles => "Users",
            Collection::Students => "Students",
            Collection::Classes => "Classes",
            Collection::Courses => "Courses",
            Collection::Disciplines => "Disciplines",
            Collection::Assessments => "Assessments",
            Collection::Events => "Calendar Events",
            Collection::Curricula => "Curriculum",
            Collection::Messages => "Messages",
            Collection::Announcements => "Announcements",
            Collection::CmsContent => "Site Content",
            Collection::Contacts => "Contacts",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

impl FromStr for Collection {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.table() == s)
            .ok_or_else(|| RepositoryError::UnknownCollection(s.to_string()))
    }
}

/// FieldFilter
///
/// Equality filter on one column, compared as text. The field name is a static,
/// trusted identifier; only the value comes from the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: &'static str,
    pub value: String,
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("unknown collection `{0}`")]
    UnknownCollection(String),
    #[error("record payload must be a JSON object")]
    NotAnObject,
    #[error("invalid field name `{0}`")]
    InvalidField(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("repository lock poisoned")]
    Poisoned,
}

/// Repository Trait
///
/// Generic CRUD over named collections, plus the profile lookup login needs. Screens
/// may only reach it after the route guard has cleared the current route.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, RepositoryError>;

    async fn list(
        &self,
        collection: Collection,
        filter: Option<FieldFilter>,
    ) -> Result<Vec<Value>, RepositoryError>;

    async fn count(&self, collection: Collection) -> Result<i64, RepositoryError>;

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, RepositoryError>;

    /// Inserts a record. `id` and `created_at` are assigned when absent.
    async fn create(&self, collection: Collection, record: Value) -> Result<Value, RepositoryError>;

    /// Partial update: only the keys present in `patch` change. `id` is never updated.
    async fn update(
        &self,
        collection: Collection,
        id: Uuid,
        patch: Value,
    ) -> Result<Option<Value>, RepositoryError>;

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the data-access layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

fn into_object(record: Value) -> Result<Map<String, Value>, RepositoryError> {
    match record {
        Value::Object(map) => Ok(map),
        _ => Err(RepositoryError::NotAnObject),
    }
}

// Column names are interpolated into SQL, so they must be plain identifiers.
fn checked_ident(name: &str) -> Result<&str, RepositoryError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(RepositoryError::InvalidField(name.to_string()))
    }
}

fn with_defaults(mut record: Map<String, Value>) -> Map<String, Value> {
    record
        .entry("id")
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
    record
        .entry("created_at")
        .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
    record
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// PostgresRepository
///
/// Backed by the hosted Postgres database. Rows travel as JSONB (`to_jsonb` on the way
/// out, `jsonb_populate_record` on the way in), which keeps the layer schema-agnostic.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, RepositoryError> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, display_name, role FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn list(
        &self,
        collection: Collection,
        filter: Option<FieldFilter>,
    ) -> Result<Vec<Value>, RepositoryError> {
        let table = collection.table();
        let rows = match filter {
            Some(filter) => {
                let field = checked_ident(filter.field)?;
                let sql = format!(
                    "SELECT to_jsonb(t) FROM {table} t WHERE t.{field}::text = $1 \
                     ORDER BY t.created_at DESC NULLS LAST"
                );
                sqlx::query_scalar::<_, Value>(&sql)
                    .bind(filter.value)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT to_jsonb(t) FROM {table} t ORDER BY t.created_at DESC NULLS LAST"
                );
                sqlx::query_scalar::<_, Value>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows)
    }

    async fn count(&self, collection: Collection) -> Result<i64, RepositoryError> {
        let sql = format!("SELECT COUNT(*) FROM {}", collection.table());
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn get(
        &self,
        collection: Collection,
        id: Uuid,
    ) -> Result<Option<Value>, RepositoryError> {
        let sql = format!("SELECT to_jsonb(t) FROM {} t WHERE t.id = $1", collection.table());
        let row = sqlx::query_scalar::<_, Value>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create(
        &self,
        collection: Collection,
        record: Value,
    ) -> Result<Value, RepositoryError> {
        let record = with_defaults(into_object(record)?);
        let columns = record
            .keys()
            .map(|k| checked_ident(k))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");
        let table = collection.table();
        let sql = format!(
            "INSERT INTO {table} ({columns}) \
             SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1) \
             RETURNING to_jsonb({table}.*)"
        );
        let created = sqlx::query_scalar::<_, Value>(&sql)
            .bind(Value::Object(record))
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn update(
        &self,
        collection: Collection,
        id: Uuid,
        patch: Value,
    ) -> Result<Option<Value>, RepositoryError> {
        let mut patch = into_object(patch)?;
        patch.remove("id");
        if patch.is_empty() {
            return self.get(collection, id).await;
        }
        let columns = patch
            .keys()
            .map(|k| checked_ident(k))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");
        let table = collection.table();
        let sql = format!(
            "UPDATE {table} SET ({columns}) = \
             (SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1)) \
             WHERE id = $2 RETURNING to_jsonb({table}.*)"
        );
        let updated = sqlx::query_scalar::<_, Value>(&sql)
            .bind(Value::Object(patch))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, RepositoryError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", collection.table());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

/// InMemoryRepository
///
/// Process-resident implementation used for local development without a database and
/// as the base of test doubles. Records are JSON objects keyed by their `id` field.
/// Profiles are ordinary `Collection::Profiles` records, so edits made through the
/// users screen are what the next login sees, as with the single Postgres table.
#[derive(Default)]
pub struct InMemoryRepository {
    records: RwLock<HashMap<Collection, Vec<Map<String, Value>>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, profile: Profile) -> Self {
        match serde_json::to_value(&profile) {
            Ok(record) => self.with_record(Collection::Profiles, record),
            Err(_) => self,
        }
    }

    /// Seeds one record, assigning `id` and `created_at` when absent.
    pub fn with_record(self, collection: Collection, record: Value) -> Self {
        if let (Ok(map), Ok(mut records)) = (into_object(record), self.records.write()) {
            records.entry(collection).or_default().push(with_defaults(map));
        }
        self
    }
}

fn has_id(record: &Map<String, Value>, id: Uuid) -> bool {
    record.get("id").and_then(text_of).as_deref() == Some(id.to_string().as_str())
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, RepositoryError> {
        let records = self.records.read().map_err(|_| RepositoryError::Poisoned)?;
        let record = records
            .get(&Collection::Profiles)
            .and_then(|rows| rows.iter().find(|r| has_id(r, id)));
        // A row lacking `display_name` or `role` is not a usable profile.
        Ok(record.and_then(|r| serde_json::from_value(Value::Object(r.clone())).ok()))
    }

    async fn list(
        &self,
        collection: Collection,
        filter: Option<FieldFilter>,
    ) -> Result<Vec<Value>, RepositoryError> {
        let records = self.records.read().map_err(|_| RepositoryError::Poisoned)?;
        let rows = records
            .get(&collection)
            .into_iter()
            .flatten()
            .filter(|record| match &filter {
                Some(f) => {
                    record.get(f.field).and_then(text_of).as_deref() == Some(f.value.as_str())
                }
                None => true,
            })
            .cloned()
            .map(Value::Object)
            .collect();
        Ok(rows)
    }

    async fn count(&self, collection: Collection) -> Result<i64, RepositoryError> {
        let records = self.records.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(records.get(&collection).map_or(0, |rows| rows.len() as i64))
    }

    async fn get(
        &self,
        collection: Collection,
        id: Uuid,
    ) -> Result<Option<Value>, RepositoryError> {
        let records = self.records.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(records
            .get(&collection)
            .and_then(|rows| rows.iter().find(|r| has_id(r, id)))
            .cloned()
            .map(Value::Object))
    }

    async fn create(
        &self,
        collection: Collection,
        record: Value,
    ) -> Result<Value, RepositoryError> {
        let record = with_defaults(into_object(record)?);
        let mut records = self.records.write().map_err(|_| RepositoryError::Poisoned)?;
        records.entry(collection).or_default().push(record.clone());
        Ok(Value::Object(record))
    }

    async fn update(
        &self,
        collection: Collection,
        id: Uuid,
        patch: Value,
    ) -> Result<Option<Value>, RepositoryError> {
        let mut patch = into_object(patch)?;
        patch.remove("id");
        let mut records = self.records.write().map_err(|_| RepositoryError::Poisoned)?;
        let Some(record) = records
            .get_mut(&collection)
            .and_then(|rows| rows.iter_mut().find(|r| has_id(r, id)))
        else {
            return Ok(None);
        };
        record.extend(patch);
        Ok(Some(Value::Object(record.clone())))
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, RepositoryError> {
        let mut records = self.records.write().map_err(|_| RepositoryError::Poisoned)?;
        let Some(rows) = records.get_mut(&collection) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|r| !has_id(r, id));
        Ok(rows.len() < before)
    }
}
