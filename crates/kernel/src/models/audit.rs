//! Audit trail records.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{SqliteExecutor, SqlitePool};

use crate::models::Change;
use crate::pagination::{Page, PageParams};

/// What happened to the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditEvent {
    Created,
    Updated,
    Deleted,
    Restored,
}

impl AuditEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditEvent::Created => "created",
            AuditEvent::Updated => "updated",
            AuditEvent::Deleted => "deleted",
            AuditEvent::Restored => "restored",
        }
    }
}

/// Kind of audited entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectType {
    Category,
    Post,
    Comment,
}

impl SubjectType {
    pub fn as_str(self) -> &'static str {
        match self {
            SubjectType::Category => "category",
            SubjectType::Post => "post",
            SubjectType::Comment => "comment",
        }
    }
}

impl fmt::Display for SubjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubjectType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "category" => Ok(SubjectType::Category),
            "post" => Ok(SubjectType::Post),
            "comment" => Ok(SubjectType::Comment),
            other => Err(format!("unknown audit subject type '{other}'")),
        }
    }
}

/// The audited entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditSubject {
    Category(i64),
    Post(i64),
    Comment(i64),
}

impl AuditSubject {
    pub fn subject_type(self) -> SubjectType {
        match self {
            AuditSubject::Category(_) => SubjectType::Category,
            AuditSubject::Post(_) => SubjectType::Post,
            AuditSubject::Comment(_) => SubjectType::Comment,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            AuditSubject::Category(id) | AuditSubject::Post(id) | AuditSubject::Comment(id) => id,
        }
    }
}

/// Bookkeeping columns left out of audit snapshots.
const UNTRACKED: [&str; 2] = ["created_at", "updated_at"];

/// An audit record waiting to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub event: AuditEvent,
    pub subject: AuditSubject,
    pub old_values: Value,
    pub new_values: Value,
    pub actor_id: Option<i64>,
}

impl AuditEntry {
    pub fn created<T: Serialize>(subject: AuditSubject, after: &T, actor_id: Option<i64>) -> Self {
        Self {
            event: AuditEvent::Created,
            subject,
            old_values: Value::Object(Map::new()),
            new_values: Value::Object(snapshot(after)),
            actor_id,
        }
    }

    pub fn updated<T: Serialize>(
        subject: AuditSubject,
        change: &Change<T>,
        actor_id: Option<i64>,
    ) -> Self {
        Self::diffed(AuditEvent::Updated, subject, change, actor_id)
    }

    pub fn deleted<T: Serialize>(subject: AuditSubject, before: &T, actor_id: Option<i64>) -> Self {
        Self {
            event: AuditEvent::Deleted,
            subject,
            old_values: Value::Object(snapshot(before)),
            new_values: Value::Object(Map::new()),
            actor_id,
        }
    }

    pub fn restored<T: Serialize>(
        subject: AuditSubject,
        change: &Change<T>,
        actor_id: Option<i64>,
    ) -> Self {
        Self::diffed(AuditEvent::Restored, subject, change, actor_id)
    }

    fn diffed<T: Serialize>(
        event: AuditEvent,
        subject: AuditSubject,
        change: &Change<T>,
        actor_id: Option<i64>,
    ) -> Self {
        let before = snapshot(&change.before);
        let after = snapshot(&change.after);

        let mut old_values = Map::new();
        let mut new_values = Map::new();
        for (key, new) in after {
            let old = before.get(&key).cloned().unwrap_or(Value::Null);
            if old != new {
                old_values.insert(key.clone(), old);
                new_values.insert(key, new);
            }
        }

        Self {
            event,
            subject,
            old_values: Value::Object(old_values),
            new_values: Value::Object(new_values),
            actor_id,
        }
    }

    /// Whether the entry records no field changes at all.
    pub fn is_noop(&self) -> bool {
        let empty = |v: &Value| v.as_object().is_none_or(Map::is_empty);
        empty(&self.old_values) && empty(&self.new_values)
    }
}

fn snapshot<T: Serialize>(value: &T) -> Map<String, Value> {
    let mut fields = match serde_json::to_value(value) {
        Ok(Value::Object(fields)) => fields,
        _ => Map::new(),
    };
    for key in UNTRACKED {
        fields.remove(key);
    }
    fields
}

/// A stored audit record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Audit {
    pub id: i64,
    pub event: String,
    pub subject_type: String,
    pub subject_id: i64,
    pub old_values: Value,
    pub new_values: Value,
    pub actor_id: Option<i64>,
    pub created_at: i64,
}

impl Audit {
    /// Append an entry.
    pub async fn insert<'e>(db: impl SqliteExecutor<'e>, entry: &AuditEntry) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO audits (event, subject_type, subject_id, old_values, new_values, actor_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(entry.event.as_str())
        .bind(entry.subject.subject_type().as_str())
        .bind(entry.subject.id())
        .bind(&entry.old_values)
        .bind(&entry.new_values)
        .bind(entry.actor_id)
        .bind(crate::db::now())
        .fetch_one(db)
        .await
        .context("failed to write audit record")?;

        Ok(id)
    }

    /// Find an audit record by ID.
    pub async fn find_by_id<'e>(db: impl SqliteExecutor<'e>, id: i64) -> Result<Option<Self>> {
        let audit = sqlx::query_as::<_, Self>("SELECT * FROM audits WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
            .context("failed to fetch audit record")?;

        Ok(audit)
    }

    /// Page through audit records, newest first, optionally filtered.
    pub async fn list(
        pool: &SqlitePool,
        filter: &AuditFilter,
        params: &PageParams,
    ) -> Result<Page<Self>> {
        let subject_type = filter.subject_type.map(SubjectType::as_str);

        // NULL parameters disable the matching condition.
        const WHERE: &str = r#"
            WHERE (?1 IS NULL OR subject_type = ?1)
              AND (?2 IS NULL OR subject_id = ?2)
              AND (?3 IS NULL OR actor_id = ?3)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM audits {WHERE}"))
            .bind(subject_type)
            .bind(filter.subject_id)
            .bind(filter.actor_id)
            .fetch_one(pool)
            .await
            .context("failed to count audit records")?;

        let rows = sqlx::query_as::<_, Self>(&format!(
            "SELECT * FROM audits {WHERE} ORDER BY created_at DESC, id DESC LIMIT ?4 OFFSET ?5"
        ))
        .bind(subject_type)
        .bind(filter.subject_id)
        .bind(filter.actor_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("failed to list audit records")?;

        Ok(Page::new(rows, total, params))
    }
}

/// Optional conditions for [`Audit::list`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditFilter {
    pub subject_type: Option<SubjectType>,
    pub subject_id: Option<i64>,
    pub actor_id: Option<i64>,
}
