//! Repositories for identity, job profile and reportee storage
//!
//! Every store is a trait so the engine can run against PostgreSQL in
//! production and against [`memory::InMemoryStore`] in tests. All queries are
//! scoped by organization id.

use async_trait::async_trait;
use common::error::DatabaseResult;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{DateInterval, JobProfile, Phone, ReporteeRelation, UserProfile};

pub mod job_profile;
pub mod memory;
pub mod reportee;
pub mod user;

pub use job_profile::JobProfileRepository;
pub use memory::InMemoryStore;
pub use reportee::ReporteeRepository;
pub use user::UserRepository;

/// The three stores the engine works against
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn IdentityStore>,
    pub job_profiles: Arc<dyn JobProfileStore>,
    pub reportees: Arc<dyn ReporteeStore>,
}

impl Stores {
    /// PostgreSQL-backed stores sharing one pool
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            job_profiles: Arc::new(JobProfileRepository::new(pool.clone())),
            reportees: Arc::new(ReporteeRepository::new(pool)),
        }
    }

    /// All three stores backed by one in-memory store
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            users: store.clone(),
            job_profiles: store.clone(),
            reportees: store,
        }
    }
}

/// Candidate values for the unique user attributes.
///
/// `None` means the attribute is not being checked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniqueCandidates {
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Phone>,
}

impl UniqueCandidates {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.phone.is_none()
    }

    /// Whether `profile` holds any of the candidate values
    pub fn matches(&self, profile: &UserProfile) -> bool {
        self.username.as_deref() == Some(profile.username.as_str())
            || self.email.as_deref() == Some(profile.email.as_str())
            || self.phone.as_ref() == Some(&profile.phone)
    }
}

/// Conjunction of job profile predicates
#[derive(Debug, Clone, PartialEq)]
pub struct JobProfileQuery {
    pub organization_id: String,
    pub reporting_manager_id: Option<Uuid>,
    pub ids: Option<Vec<Uuid>>,
    pub overlapping: Option<DateInterval>,
}

impl JobProfileQuery {
    pub fn in_organization(organization_id: &str) -> Self {
        Self {
            organization_id: organization_id.to_string(),
            reporting_manager_id: None,
            ids: None,
            overlapping: None,
        }
    }

    pub fn with_ids(mut self, ids: &[Uuid]) -> Self {
        self.ids = Some(ids.to_vec());
        self
    }

    pub fn reporting_to(mut self, manager_id: Uuid) -> Self {
        self.reporting_manager_id = Some(manager_id);
        self
    }

    pub fn overlapping(mut self, interval: DateInterval) -> Self {
        self.overlapping = Some(interval);
        self
    }

    pub fn matches(&self, profile: &JobProfile) -> bool {
        profile.organization_id == self.organization_id
            && self
                .reporting_manager_id
                .is_none_or(|manager| profile.reporting_manager_id == Some(manager))
            && self.ids.as_ref().is_none_or(|ids| ids.contains(&profile.id))
            && self
                .overlapping
                .is_none_or(|interval| interval.overlaps(&profile.interval()))
    }
}

/// Store of user profiles
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Find a user by ID
    async fn find_by_id(&self, organization_id: &str, id: Uuid)
    -> DatabaseResult<Option<UserProfile>>;

    /// Find every user whose ID is in `ids`; unknown IDs are skipped
    async fn find_by_ids(
        &self,
        organization_id: &str,
        ids: &[Uuid],
    ) -> DatabaseResult<Vec<UserProfile>>;

    /// Find users holding any of the candidate unique values
    async fn find_by_unique_attributes(
        &self,
        organization_id: &str,
        candidates: &UniqueCandidates,
    ) -> DatabaseResult<Vec<UserProfile>>;

    /// List all users of an organization
    async fn list_by_organization(&self, organization_id: &str)
    -> DatabaseResult<Vec<UserProfile>>;

    /// Insert or replace a single profile row
    async fn save(&self, profile: &UserProfile) -> DatabaseResult<()>;
}

/// Store of job profiles
#[async_trait]
pub trait JobProfileStore: Send + Sync {
    /// Insert a new job profile
    async fn insert(&self, profile: &JobProfile) -> DatabaseResult<()>;

    /// Find job profiles by ID; unknown IDs are skipped
    async fn find_by_ids(
        &self,
        organization_id: &str,
        ids: &[Uuid],
    ) -> DatabaseResult<Vec<JobProfile>>;

    /// List all job profiles of an organization
    async fn find_by_organization(&self, organization_id: &str)
    -> DatabaseResult<Vec<JobProfile>>;

    /// Find job profiles matching every predicate in `query`
    async fn find(&self, query: &JobProfileQuery) -> DatabaseResult<Vec<JobProfile>>;
}

/// Store of reportee relations
#[async_trait]
pub trait ReporteeStore: Send + Sync {
    /// Insert a batch of relations
    async fn insert_many(&self, relations: &[ReporteeRelation]) -> DatabaseResult<()>;

    /// Relations where `manager_id` is the manager
    async fn find_by_manager(
        &self,
        organization_id: &str,
        manager_id: Uuid,
    ) -> DatabaseResult<Vec<ReporteeRelation>>;

    /// Relations hanging off one manager job profile
    async fn find_by_job_profile(
        &self,
        organization_id: &str,
        job_profile_id: Uuid,
    ) -> DatabaseResult<Vec<ReporteeRelation>>;

    /// Remove every relation of a job profile, returning how many went
    async fn delete_by_job_profile(
        &self,
        organization_id: &str,
        job_profile_id: Uuid,
    ) -> DatabaseResult<u64>;
}
