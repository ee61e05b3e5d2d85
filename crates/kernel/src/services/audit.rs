//! Audit logging service.
//!
//! Records create, update, delete, and restore of categories, posts, and
//! comments. Handlers call [`AuditService::record`] after the mutation has
//! committed.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::{Audit, AuditEntry, AuditFilter};
use crate::pagination::{Page, PageParams};

/// Audit logging service.
#[derive(Clone)]
pub struct AuditService {
    pool: SqlitePool,
}

impl AuditService {
    /// Create a new audit service.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append an entry and return its id.
    pub async fn log(&self, entry: &AuditEntry) -> Result<i64> {
        let id = Audit::insert(&self.pool, entry).await?;

        debug!(
            audit_id = id,
            event = entry.event.as_str(),
            subject_type = %entry.subject.subject_type(),
            subject_id = entry.subject.id(),
            actor_id = ?entry.actor_id,
            "audit record created"
        );

        Ok(id)
    }

    /// Append an entry unless it records no change.
    ///
    /// The audited mutation has already committed, so a failed write is
    /// logged rather than returned.
    pub async fn record(&self, entry: AuditEntry) {
        if entry.is_noop() {
            return;
        }

        if let Err(e) = self.log(&entry).await {
            warn!(
                error = ?e,
                event = entry.event.as_str(),
                subject_type = %entry.subject.subject_type(),
                subject_id = entry.subject.id(),
                "failed to write audit record"
            );
        }
    }

    /// Get one audit record.
    pub async fn find(&self, id: i64) -> AppResult<Audit> {
        Audit::find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("audit record"))
    }

    /// Page through audit records, newest first.
    pub async fn list(&self, filter: AuditFilter, params: &PageParams) -> AppResult<Page<Audit>> {
        Ok(Audit::list(&self.pool, &filter, params).await?)
    }
}

impl std::fmt::Debug for AuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditService").finish()
    }
}
