//! In-memory implementation of every store.
//!
//! Backed by `tokio::sync::RwLock` collections. Used by the test suite and by
//! `IDENTITY__STORAGE=memory` for local runs without PostgreSQL. Uniqueness is
//! enforced the same way the PostgreSQL indexes enforce it, so races between
//! the validator and the final save surface identically.

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    IdentityStore, JobProfileQuery, JobProfileStore, ReporteeStore, UniqueCandidates,
};
use crate::models::{JobProfile, ReporteeRelation, UserProfile};

#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<Uuid, UserProfile>>,
    /// Insertion order is kept so reads are deterministic
    job_profiles: RwLock<Vec<JobProfile>>,
    relations: RwLock<Vec<ReporteeRelation>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored job profiles, across organizations
    pub async fn job_profile_count(&self) -> usize {
        self.job_profiles.read().await.len()
    }

    /// Number of stored reportee relations, across organizations
    pub async fn relation_count(&self) -> usize {
        self.relations.read().await.len()
    }

    /// Number of stored user profiles, across organizations
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }
}

fn unique_conflict(existing: &UserProfile, profile: &UserProfile) -> Option<&'static str> {
    if existing.id == profile.id || existing.organization_id != profile.organization_id {
        return None;
    }

    if existing.username == profile.username {
        Some("user_profiles_organization_id_username_key")
    } else if existing.email == profile.email {
        Some("user_profiles_organization_id_email_key")
    } else if existing.phone == profile.phone {
        Some("user_profiles_organization_id_phone_key")
    } else {
        None
    }
}

/// Stored ids first, then incoming ids not yet stored
fn merge_ids(stored: &[Uuid], incoming: &[Uuid]) -> Vec<Uuid> {
    let mut merged = stored.to_vec();
    merged.extend(incoming.iter().filter(|id| !stored.contains(id)));
    merged
}

#[async_trait]
impl IdentityStore for InMemoryStore {
    async fn find_by_id(
        &self,
        organization_id: &str,
        id: Uuid,
    ) -> DatabaseResult<Option<UserProfile>> {
        let users = self.users.read().await;
        Ok(users
            .get(&id)
            .filter(|user| user.organization_id == organization_id)
            .cloned())
    }

    async fn find_by_ids(
        &self,
        organization_id: &str,
        ids: &[Uuid],
    ) -> DatabaseResult<Vec<UserProfile>> {
        let users = self.users.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| users.get(id))
            .filter(|user| user.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn find_by_unique_attributes(
        &self,
        organization_id: &str,
        candidates: &UniqueCandidates,
    ) -> DatabaseResult<Vec<UserProfile>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .filter(|user| user.organization_id == organization_id && candidates.matches(user))
            .cloned()
            .collect())
    }

    async fn list_by_organization(
        &self,
        organization_id: &str,
    ) -> DatabaseResult<Vec<UserProfile>> {
        let users = self.users.read().await;
        let mut listed: Vec<UserProfile> = users
            .values()
            .filter(|user| user.organization_id == organization_id)
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(listed)
    }

    async fn save(&self, profile: &UserProfile) -> DatabaseResult<()> {
        let mut users = self.users.write().await;

        if let Some(constraint) = users
            .values()
            .find_map(|existing| unique_conflict(existing, profile))
        {
            return Err(DatabaseError::UniqueViolation {
                constraint: constraint.to_string(),
            });
        }

        let mut stored = profile.clone();
        if let Some(existing) = users.get(&profile.id) {
            if existing.organization_id != profile.organization_id {
                return Err(DatabaseError::Decode(format!(
                    "user {} belongs to another organization",
                    profile.id
                )));
            }
            stored.start_date = existing.start_date.min(profile.start_date);
            stored.job_profile_ids = merge_ids(&existing.job_profile_ids, &profile.job_profile_ids);
        }

        users.insert(profile.id, stored);
        Ok(())
    }
}

#[async_trait]
impl JobProfileStore for InMemoryStore {
    async fn insert(&self, profile: &JobProfile) -> DatabaseResult<()> {
        let mut job_profiles = self.job_profiles.write().await;
        if job_profiles.iter().any(|existing| existing.id == profile.id) {
            return Err(DatabaseError::UniqueViolation {
                constraint: "job_profiles_pkey".to_string(),
            });
        }
        job_profiles.push(profile.clone());
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
        let job_profiles = self.job_profiles.read().await;
        Ok(job_profiles
            .iter()
            .filter(|profile| query.matches(profile))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReporteeStore for InMemoryStore {
    async fn insert_many(&self, relations: &[ReporteeRelation]) -> DatabaseResult<()> {
        self.relations.write().await.extend_from_slice(relations);
        Ok(())
    }

    async fn find_by_manager(
        &self,
        organization_id: &str,
        manager_id: Uuid,
    ) -> DatabaseResult<Vec<ReporteeRelation>> {
        let relations = self.relations.read().await;
        Ok(relations
            .iter()
            .filter(|r| r.organization_id == organization_id && r.manager_id == manager_id)
            .cloned()
            .collect())
    }

    async fn find_by_job_profile(
        &self,
        organization_id: &str,
        job_profile_id: Uuid,
    ) -> DatabaseResult<Vec<ReporteeRelation>> {
        let relations = self.relations.read().await;
        Ok(relations
            .iter()
            .filter(|r| r.organization_id == organization_id && r.job_profile_id == job_profile_id)
            .cloned()
            .collect())
    }

    async fn delete_by_job_profile(
        &self,
        organization_id: &str,
        job_profile_id: Uuid,
    ) -> DatabaseResult<u64> {
        let mut relations = self.relations.write().await;
        let before = relations.len();
        relations.retain(|r| {
            !(r.organization_id == organization_id && r.job_profile_id == job_profile_id)
        });
        Ok((before - relations.len()) as u64)
    }
}
