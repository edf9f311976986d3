//! Job profile repository for PostgreSQL

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use tracing::debug;
use uuid::Uuid;

use super::{JobProfileQuery, JobProfileStore};
use crate::models::JobProfile;

const JOB_PROFILE_COLUMNS: &str = r#"
    id, organization_id, title, organizational_unit, start_date, end_date,
    reporting_manager_id, extension_data, created_at
"#;

/// Job profile repository
#[derive(Clone)]
pub struct JobProfileRepository {
    pool: PgPool,
}

impl JobProfileRepository {
    /// Create a new job profile repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn job_profile_from_row(row: &PgRow) -> Result<JobProfile, sqlx::Error> {
    Ok(JobProfile {
        organization_id: row.try_get("organization_id")?,
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        organizational_unit: row.try_get("organizational_unit")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        reporting_manager_id: row.try_get("reporting_manager_id")?,
        extension_data: row.try_get("extension_data")?,
        created_at: row.try_get("created_at")?,
    })
}

fn job_profiles_from_rows(rows: Vec<PgRow>) -> DatabaseResult<Vec<JobProfile>> {
    rows.iter()
        .map(|row| job_profile_from_row(row).map_err(|e| DatabaseError::Decode(e.to_string())))
        .collect()
}

#[async_trait]
impl JobProfileStore for JobProfileRepository {
    async fn insert(&self, profile: &JobProfile) -> DatabaseResult<()> {
        debug!(
            "Inserting job profile {} in organization {}",
            profile.id, profile.organization_id
        );

        sqlx::query(
            r#"
            INSERT INTO job_profiles (
                id, organization_id, title, organizational_unit, start_date, end_date,
                reporting_manager_id, extension_data, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(profile.id)
        .bind(&profile.organization_id)
        .bind(&profile.title)
        .bind(&profile.organizational_unit)
        .bind(profile.start_date)
        .bind(profile.end_date)
        .bind(profile.reporting_manager_id)
        .bind(&profile.extension_data)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        Ok(())
    }

    async fn find_by_ids(
        &self,
        organization_id: &str,
        ids: &[Uuid],
    ) -> DatabaseResult<Vec<JobProfile>> {
        self.find(&JobProfileQuery::in_organization(organization_id).with_ids(ids))
            .await
    }

    async fn find_by_organization(
        &self,
        organization_id: &str,
    ) -> DatabaseResult<Vec<JobProfile>> {
        self.find(&JobProfileQuery::in_organization(organization_id))
            .await
    }

    async fn find(&self, query: &JobProfileQuery) -> DatabaseResult<Vec<JobProfile>> {
        if query.ids.as_ref().is_some_and(|ids| ids.is_empty()) {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {JOB_PROFILE_COLUMNS} FROM job_profiles WHERE organization_id = "
        ));
        builder.push_bind(&query.organization_id);

        if let Some(manager_id) = query.reporting_manager_id {
            builder.push(" AND reporting_manager_id = ").push_bind(manager_id);
        }

        if let Some(ids) = &query.ids {
            builder.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
        }

        // mirrors DateInterval::overlaps
        if let Some(interval) = query.overlapping {
            builder
                .push(" AND (end_date IS NULL OR end_date >= ")
                .push_bind(interval.start)
                .push(")");
            if let Some(end) = interval.end {
                builder.push(" AND start_date <= ").push_bind(end);
            }
        }

        builder.push(" ORDER BY start_date, id");

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        job_profiles_from_rows(rows)
    }
}
