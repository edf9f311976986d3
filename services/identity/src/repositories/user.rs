//! User profile repository for PostgreSQL

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{debug, info};
use uuid::Uuid;

use super::{IdentityStore, UniqueCandidates};
use crate::models::{Phone, UserProfile, UserStatus};

const USER_COLUMNS: &str = r#"
    id, organization_id, username, first_name, middle_name, last_name,
    email, email_verified, phone_number, phone_country_code, phone_verified,
    status, start_date, end_date, job_profile_ids, created_at, updated_at
"#;

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> Result<UserProfile, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<UserStatus>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    Ok(UserProfile {
        organization_id: row.try_get("organization_id")?,
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        first_name: row.try_get("first_name")?,
        middle_name: row.try_get("middle_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        email_verified: row.try_get("email_verified")?,
        phone: Phone {
            number: row.try_get("phone_number")?,
            country_code: row.try_get("phone_country_code")?,
        },
        phone_verified: row.try_get("phone_verified")?,
        status,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        job_profile_ids: row.try_get("job_profile_ids")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn users_from_rows(rows: Vec<PgRow>) -> DatabaseResult<Vec<UserProfile>> {
    rows.iter()
        .map(|row| user_from_row(row).map_err(|e| DatabaseError::Decode(e.to_string())))
        .collect()
}

#[async_trait]
impl IdentityStore for UserRepository {
    async fn find_by_id(
        &self,
        organization_id: &str,
        id: Uuid,
    ) -> DatabaseResult<Option<UserProfile>> {
        debug!("Finding user {} in organization {}", id, organization_id);

        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM user_profiles WHERE organization_id = $1 AND id = $2"
        ))
        .bind(organization_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        match row {
            Some(row) => user_from_row(&row)
                .map(Some)
                .map_err(|e| DatabaseError::Decode(e.to_string())),
            None => Ok(None),
        }
    }

    async fn find_by_ids(
        &self,
        organization_id: &str,
        ids: &[Uuid],
    ) -> DatabaseResult<Vec<UserProfile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM user_profiles WHERE organization_id = $1 AND id = ANY($2)"
        ))
        .bind(organization_id)
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        users_from_rows(rows)
    }

    async fn find_by_unique_attributes(
        &self,
        organization_id: &str,
        candidates: &UniqueCandidates,
    ) -> DatabaseResult<Vec<UserProfile>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let (phone_number, phone_country_code) = match &candidates.phone {
            Some(phone) => (Some(phone.number.as_str()), Some(phone.country_code.as_str())),
            None => (None, None),
        };

        let rows = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM user_profiles
            WHERE organization_id = $1
              AND (username = $2
                   OR email = $3
                   OR (phone_number = $4 AND phone_country_code = $5))
            "#
        ))
        .bind(organization_id)
        .bind(candidates.username.as_deref())
        .bind(candidates.email.as_deref())
        .bind(phone_number)
        .bind(phone_country_code)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        users_from_rows(rows)
    }

    async fn list_by_organization(
        &self,
        organization_id: &str,
    ) -> DatabaseResult<Vec<UserProfile>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM user_profiles WHERE organization_id = $1 ORDER BY created_at, id"
        ))
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        users_from_rows(rows)
    }

    async fn save(&self, profile: &UserProfile) -> DatabaseResult<()> {
        info!(
            "Saving user {} ({}) in organization {}",
            profile.id, profile.username, profile.organization_id
        );

        sqlx::query(
            r#"
            INSERT INTO user_profiles (
                id, organization_id, username, first_name, middle_name, last_name,
                email, email_verified, phone_number, phone_country_code, phone_verified,
                status, start_date, end_date, job_profile_ids, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (id) DO UPDATE SET
                username = EXCLUDED.username,
                first_name = EXCLUDED.first_name,
                middle_name = EXCLUDED.middle_name,
                last_name = EXCLUDED.last_name,
                email = EXCLUDED.email,
                email_verified = EXCLUDED.email_verified,
                phone_number = EXCLUDED.phone_number,
                phone_country_code = EXCLUDED.phone_country_code,
                phone_verified = EXCLUDED.phone_verified,
                status = EXCLUDED.status,
                start_date = LEAST(user_profiles.start_date, EXCLUDED.start_date),
                end_date = EXCLUDED.end_date,
                job_profile_ids = user_profiles.job_profile_ids || ARRAY(
                    SELECT appended.id
                    FROM UNNEST(EXCLUDED.job_profile_ids) WITH ORDINALITY AS appended(id, position)
                    WHERE appended.id <> ALL(user_profiles.job_profile_ids)
                    ORDER BY appended.position
                ),
                updated_at = EXCLUDED.updated_at
            WHERE user_profiles.organization_id = EXCLUDED.organization_id
            "#,
        )
        .bind(profile.id)
        .bind(&profile.organization_id)
        .bind(&profile.username)
        .bind(&profile.first_name)
        .bind(&profile.middle_name)
        .bind(&profile.last_name)
        .bind(&profile.email)
        .bind(profile.email_verified)
        .bind(&profile.phone.number)
        .bind(&profile.phone.country_code)
        .bind(profile.phone_verified)
        .bind(profile.status.as_str())
        .bind(profile.start_date)
        .bind(profile.end_date)
        .bind(&profile.job_profile_ids)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        Ok(())
    }
}
