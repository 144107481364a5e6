use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scs_core::{
    AlarmId, GuidanceId, Incident, IncidentGuidance, IncidentGuidanceStep, IncidentId,
    IncidentMedia, IncidentStatus, MissionStore, Severity, StepId, StoreError, StoreResult,
    TemplateId, UserId,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS incidents (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        alarm_id UUID NULL,
        status TEXT NOT NULL DEFAULT 'new',
        severity TEXT NOT NULL DEFAULT 'medium',
        location TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS incident_guidances (
        id UUID PRIMARY KEY,
        incident_id UUID NOT NULL REFERENCES incidents(id),
        guidance_template_id UUID NOT NULL,
        assigner_id UUID NULL,
        assignee_id UUID NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_incident_template
        ON incident_guidances (incident_id, guidance_template_id)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS incident_guidance_steps (
        id UUID PRIMARY KEY,
        incident_guidance_id UUID NOT NULL REFERENCES incident_guidances(id) ON DELETE CASCADE,
        step_number BIGINT NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        is_completed BOOLEAN NOT NULL DEFAULT FALSE,
        completed_at TIMESTAMPTZ NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS incident_media (
        id UUID PRIMARY KEY,
        incident_id UUID NOT NULL REFERENCES incidents(id),
        media_type TEXT NOT NULL,
        file_url TEXT NOT NULL,
        file_size BIGINT NOT NULL,
        file_type TEXT NOT NULL,
        file_name TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
];

/// Relational store backed by Postgres.
///
/// Ids are UUID columns. An id that is not a UUID cannot name a row, so
/// lookups with one resolve to `NotFound`.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(StoreError::backend)?;
        tracing::info!(max_connections, "postgres pool ready");
        Ok(Self { pool })
    }

    /// Create tables and indexes that do not exist yet.
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA.iter().copied() {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(StoreError::backend)?;
        }
        tracing::debug!("schema ready");
        Ok(())
    }

    fn row_to_step(row: &PgRow) -> StoreResult<IncidentGuidanceStep> {
        Ok(IncidentGuidanceStep {
            id: StepId::new(uuid_col(row, "id")?.to_string()),
            incident_guidance_id: GuidanceId::new(uuid_col(row, "incident_guidance_id")?.to_string()),
            step_number: row.try_get("step_number").map_err(StoreError::backend)?,
            title: row.try_get("title").map_err(StoreError::backend)?,
            description: row.try_get("description").map_err(StoreError::backend)?,
            is_completed: row.try_get("is_completed").map_err(StoreError::backend)?,
            completed_at: row.try_get("completed_at").map_err(StoreError::backend)?,
            created_at: row.try_get("created_at").map_err(StoreError::backend)?,
            updated_at: row.try_get("updated_at").map_err(StoreError::backend)?,
        })
    }

    fn row_to_incident(row: &PgRow) -> StoreResult<Incident> {
        let status: String = row.try_get("status").map_err(StoreError::backend)?;
        let severity: String = row.try_get("severity").map_err(StoreError::backend)?;
        let alarm_id: Option<Uuid> = row.try_get("alarm_id").map_err(StoreError::backend)?;

        Ok(Incident {
            id: IncidentId::new(uuid_col(row, "id")?.to_string()),
            name: row.try_get("name").map_err(StoreError::backend)?,
            description: row.try_get("description").map_err(StoreError::backend)?,
            alarm_id: alarm_id.map(|id| AlarmId::new(id.to_string())),
            status: IncidentStatus::parse(&status).unwrap_or_else(|| {
                tracing::warn!(%status, "unknown incident status, reading as new");
                IncidentStatus::New
            }),
            severity: Severity::parse(&severity).unwrap_or_else(|| {
                tracing::warn!(%severity, "unknown incident severity, reading as medium");
                Severity::Medium
            }),
            location: row.try_get("location").map_err(StoreError::backend)?,
            created_at: row.try_get("created_at").map_err(StoreError::backend)?,
            updated_at: row.try_get("updated_at").map_err(StoreError::backend)?,
        })
    }

    fn row_to_guidance(row: &PgRow) -> StoreResult<IncidentGuidance> {
        let assigner: Option<Uuid> = row.try_get("assigner_id").map_err(StoreError::backend)?;
        let assignee: Option<Uuid> = row.try_get("assignee_id").map_err(StoreError::backend)?;

        Ok(IncidentGuidance {
            id: GuidanceId::new(uuid_col(row, "id")?.to_string()),
            incident_id: IncidentId::new(uuid_col(row, "incident_id")?.to_string()),
            guidance_template_id: TemplateId::new(uuid_col(row, "guidance_template_id")?.to_string()),
            assigner_id: assigner.map(|id| UserId::new(id.to_string())),
            assignee_id: assignee.map(|id| UserId::new(id.to_string())),
            incident_guidance_steps: Vec::new(),
            created_at: row.try_get("created_at").map_err(StoreError::backend)?,
            updated_at: row.try_get("updated_at").map_err(StoreError::backend)?,
        })
    }
}

fn uuid_col(row: &PgRow, column: &str) -> StoreResult<Uuid> {
    row.try_get(column).map_err(StoreError::backend)
}

/// Parse a record id; a malformed id cannot exist in a UUID column.
fn parse_id(entity: &'static str, id: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(id.trim()).map_err(|_| StoreError::not_found(entity, id))
}

#[async_trait]
impl MissionStore for PostgresStore {
    async fn get_step_by_id(&self, id: &StepId) -> StoreResult<IncidentGuidanceStep> {
        let uuid = parse_id("incident guidance step", id.as_str())?;
        let row = sqlx::query("SELECT * FROM incident_guidance_steps WHERE id = $1")
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        match row {
            Some(row) => Self::row_to_step(&row),
            None => Err(StoreError::not_found("incident guidance step", id.as_str())),
        }
    }

    async fn update_step_completed(&self, id: &StepId, completed_at: DateTime<Utc>) -> StoreResult<()> {
        let uuid = parse_id("incident guidance step", id.as_str())?;
        let result = sqlx::query(
            r#"
            UPDATE incident_guidance_steps
            SET is_completed = TRUE, completed_at = $2, updated_at = now()
            WHERE id = $1 AND is_completed = FALSE
            "#,
        )
        .bind(uuid)
        .bind(completed_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Nothing flipped: either the step is gone or someone latched it first.
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM incident_guidance_steps WHERE id = $1)")
                .bind(uuid)
                .fetch_one(&self.pool)
                .await
                .map_err(StoreError::backend)?;
        if exists {
            Err(StoreError::AlreadyCompleted {
                id: id.as_str().to_string(),
            })
        } else {
            Err(StoreError::not_found("incident guidance step", id.as_str()))
        }
    }

    async fn get_incident_by_id(&self, id: &IncidentId) -> StoreResult<Incident> {
        let uuid = parse_id("incident", id.as_str())?;
        let row = sqlx::query("SELECT * FROM incidents WHERE id = $1")
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        match row {
            Some(row) => Self::row_to_incident(&row),
            None => Err(StoreError::not_found("incident", id.as_str())),
        }
    }

    async fn batch_insert_media(&self, media: &[IncidentMedia]) -> StoreResult<()> {
        if media.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;
        for item in media {
            let id = Uuid::parse_str(item.id.as_str())
                .map_err(|_| StoreError::conflict(format!("media id {} is not a uuid", item.id)))?;
            let incident = Uuid::parse_str(item.incident_id.as_str()).map_err(|_| {
                StoreError::conflict(format!(
                    "incident media references unknown incident {}",
                    item.incident_id
                ))
            })?;

            sqlx::query(
                r#"
                INSERT INTO incident_media
                    (id, incident_id, media_type, file_url, file_size, file_type, file_name, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(id)
            .bind(incident)
            .bind(item.media_type.as_str())
            .bind(&item.file_url)
            .bind(item.file_size)
            .bind(&item.file_type)
            .bind(&item.file_name)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::backend)?;
        }
        // Dropping the transaction on an early return rolls it back.
        tx.commit().await.map_err(StoreError::backend)?;
        Ok(())
    }

    async fn get_guidance_by_assignee(&self, assignee: &UserId) -> StoreResult<Vec<IncidentGuidance>> {
        let Ok(assignee) = Uuid::parse_str(assignee.as_str().trim()) else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query(
            "SELECT * FROM incident_guidances WHERE assignee_id = $1 ORDER BY created_at, id",
        )
        .bind(assignee)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        let mut guidances = rows
            .iter()
            .map(Self::row_to_guidance)
            .collect::<StoreResult<Vec<_>>>()?;
        if guidances.is_empty() {
            return Ok(guidances);
        }

        let ids = guidances
            .iter()
            .map(|g| parse_id("incident guidance", g.id.as_str()))
            .collect::<StoreResult<Vec<_>>>()?;
        let step_rows = sqlx::query(
            r#"
            SELECT * FROM incident_guidance_steps
            WHERE incident_guidance_id = ANY($1)
            ORDER BY step_number, created_at
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        let mut steps: HashMap<GuidanceId, Vec<IncidentGuidanceStep>> = HashMap::new();
        for row in &step_rows {
            let step = Self::row_to_step(row)?;
            steps.entry(step.incident_guidance_id.clone()).or_default().push(step);
        }
        for guidance in &mut guidances {
            guidance.incident_guidance_steps = steps.remove(&guidance.id).unwrap_or_default();
        }
        Ok(guidances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_ids_read_as_not_found() {
        let err = parse_id("incident", "I1").unwrap_err();
        assert!(err.is_not_found());
        assert!(parse_id("incident", " 6f1c2f1e-8f5e-4a53-9c1e-2b3a4d5e6f70 ").is_ok());
    }
}
