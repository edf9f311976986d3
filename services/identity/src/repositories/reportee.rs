//! Reportee relation repository for PostgreSQL

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use tracing::{debug, info};
use uuid::Uuid;

use super::ReporteeStore;
use crate::models::ReporteeRelation;

/// Reportee repository
#[derive(Clone)]
pub struct ReporteeRepository {
    pool: PgPool,
}

impl ReporteeRepository {
    /// Create a new reportee repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_where(
        &self,
        column: &str,
        organization_id: &str,
        id: Uuid,
    ) -> DatabaseResult<Vec<ReporteeRelation>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT id, organization_id, manager_id, subordinate_id, job_profile_id, created_at
            FROM reportee_relations
            WHERE organization_id = $1 AND {column} = $2
            ORDER BY created_at, id
            "#
        ))
        .bind(organization_id)
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        rows.iter()
            .map(|row| relation_from_row(row).map_err(|e| DatabaseError::Decode(e.to_string())))
            .collect()
    }
}

fn relation_from_row(row: &PgRow) -> Result<ReporteeRelation, sqlx::Error> {
    Ok(ReporteeRelation {
        id: row.try_get("id")?,
        organization_id: row.try_get("organization_id")?,
        manager_id: row.try_get("manager_id")?,
        subordinate_id: row.try_get("subordinate_id")?,
        job_profile_id: row.try_get("job_profile_id")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl ReporteeStore for ReporteeRepository {
    async fn insert_many(&self, relations: &[ReporteeRelation]) -> DatabaseResult<()> {
        if relations.is_empty() {
            return Ok(());
        }

        debug!("Inserting {} reportee relations", relations.len());

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO reportee_relations \
             (id, organization_id, manager_id, subordinate_id, job_profile_id, created_at) ",
        );
        builder.push_values(relations, |mut row, relation| {
            row.push_bind(relation.id)
                .push_bind(&relation.organization_id)
                .push_bind(relation.manager_id)
                .push_bind(relation.subordinate_id)
                .push_bind(relation.job_profile_id)
                .push_bind(relation.created_at);
        });

        builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        Ok(())
    }

    async fn find_by_manager(
        &self,
        organization_id: &str,
        manager_id: Uuid,
    ) -> DatabaseResult<Vec<ReporteeRelation>> {
        self.find_where("manager_id", organization_id, manager_id)
            .await
    }

    async fn find_by_job_profile(
        &self,
        organization_id: &str,
        job_profile_id: Uuid,
    ) -> DatabaseResult<Vec<ReporteeRelation>> {
        self.find_where("job_profile_id", organization_id, job_profile_id)
            .await
    }

    async fn delete_by_job_profile(
        &self,
        organization_id: &str,
        job_profile_id: Uuid,
    ) -> DatabaseResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM reportee_relations
            WHERE organization_id = $1 AND job_profile_id = $2
            "#,
        )
        .bind(organization_id)
        .bind(job_profile_id)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        info!(
            "Deleted {} reportee relations of job profile {}",
            result.rows_affected(),
            job_profile_id
        );
        Ok(result.rows_affected())
    }
}
