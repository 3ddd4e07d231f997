//! Postgres-backed plan repository.
//!
//! Reads and updates the `plan` table owned by the CRUD side of the service:
//!
//! | column | type |
//! |--------|------|
//! | `id` | `uuid` primary key |
//! | `subject_id` | `text` |
//! | `counterparty_id` | `text` |
//! | `counterparty_display_name` | `text` null |
//! | `organization_id` | `text` |
//! | `organization_display_name` | `text` null |
//! | `content` | `jsonb` |
//! | `created_at` | `timestamptz` |
//! | `published_at` | `timestamptz` null, written only by the publication pipeline |
//!
//! ## Error Mapping
//!
//! Every SQLx error becomes `RepositoryError::Storage` tagged with the
//! operation name. A row whose identifying columns are blank becomes
//! `RepositoryError::CorruptRow`; `find_pending` logs such rows with their id
//! and leaves them out, so the remaining plans are still published.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, error, instrument};

use followup_core::{CounterpartyId, OrganizationId, PlanId, PublishableItem, SubjectId};

use super::{PendingItemRepository, RepositoryError};

/// Postgres-backed plan repository.
///
/// Uses the SQLx connection pool (Arc + Send + Sync). Each statement runs in
/// its own implicit transaction; `mark_published` touches exactly one row.
#[derive(Debug, Clone)]
pub struct PostgresPlanRepository {
    pool: Arc<PgPool>,
}

impl PostgresPlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn exists(&self, id: PlanId) -> Result<bool, RepositoryError> {
        let row = sqlx::query("SELECT 1 AS present FROM plan WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("mark_published", e))?;
        Ok(row.is_some())
    }
}

#[async_trait::async_trait]
impl PendingItemRepository for PostgresPlanRepository {
    #[instrument(skip(self), err)]
    async fn find_pending(&self) -> Result<Vec<PublishableItem>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                id,
                subject_id,
                counterparty_id,
                counterparty_display_name,
                organization_id,
                organization_display_name,
                content,
                created_at,
                published_at
            FROM plan
            WHERE published_at IS NULL
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_pending", e))?;

        let rows = rows
            .iter()
            .map(|row| <PlanRow as sqlx::FromRow<_>>::from_row(row))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("find_pending", e))?;

        let plans = plans_from_rows(rows);
        debug!(count = plans.len(), "loaded pending plans");
        Ok(plans)
    }

    #[instrument(skip(self, id), fields(plan_id = %id), err)]
    async fn mark_published(&self, id: PlanId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE plan
            SET published_at = $1
            WHERE id = $2 AND published_at IS NULL
            "#,
        )
        .bind(at)
        .bind(id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("mark_published", e))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // Zero rows: either already published (no-op) or unknown.
        if self.exists(id).await? {
            debug!(plan_id = %id, "plan already published; keeping original timestamp");
            Ok(())
        } else {
            Err(RepositoryError::NotFound(id))
        }
    }
}

/// Convert fetched rows, dropping corrupt ones so they cannot block the rest.
fn plans_from_rows(rows: Vec<PlanRow>) -> Vec<PublishableItem> {
    let mut plans = Vec::with_capacity(rows.len());
    for row in rows {
        match PublishableItem::try_from(row) {
            Ok(plan) => plans.push(plan),
            Err(err) => error!(error = %err, "skipping corrupt plan row"),
        }
    }
    plans
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::PoolClosed => RepositoryError::storage(operation, "connection pool closed"),
        sqlx::Error::PoolTimedOut => {
            RepositoryError::storage(operation, "timed out acquiring a connection")
        }
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            RepositoryError::storage(operation, format!("database error [{code}]: {db_err}"))
        }
        other => RepositoryError::storage(operation, other.to_string()),
    }
}

// SQLx row types

#[derive(Debug)]
struct PlanRow {
    id: uuid::Uuid,
    subject_id: String,
    counterparty_id: String,
    counterparty_display_name: Option<String>,
    organization_id: String,
    organization_display_name: Option<String>,
    content: serde_json::Value,
    created_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for PlanRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(PlanRow {
            id: row.try_get("id")?,
            subject_id: row.try_get("subject_id")?,
            counterparty_id: row.try_get("counterparty_id")?,
            counterparty_display_name: row.try_get("counterparty_display_name")?,
            organization_id: row.try_get("organization_id")?,
            organization_display_name: row.try_get("organization_display_name")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
            published_at: row.try_get("published_at")?,
        })
    }
}

impl TryFrom<PlanRow> for PublishableItem {
    type Error = RepositoryError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = |e: followup_core::DomainError| RepositoryError::CorruptRow {
            id: id.to_string(),
            message: e.to_string(),
        };

        let mut plan = PublishableItem::new(
            PlanId::from_uuid(id),
            SubjectId::new(row.subject_id.as_str()).map_err(corrupt)?,
            CounterpartyId::new(row.counterparty_id.as_str()).map_err(corrupt)?,
            OrganizationId::new(row.organization_id.as_str()).map_err(corrupt)?,
            row.content,
            row.created_at,
        )
        .with_published_at(row.published_at);

        if let Some(name) = row.counterparty_display_name {
            plan = plan.with_counterparty_display_name(name);
        }
        if let Some(name) = row.organization_display_name {
            plan = plan.with_organization_display_name(name);
        }
        Ok(plan)
    }
}
