//! Identity & hierarchy resolution engine.
//!
//! Create and update run
//! `VALIDATE_INPUT → VALIDATE_UNIQUE → RESOLVE_MANAGERS → LINK_JOB_PROFILES →
//! BUILD_PROFILE → PERSIST`; get runs
//! `LOAD_PROFILE → LOAD_JOB_PROFILES → LOAD_EDGES`. The first failing stage
//! ends the operation, and every operation returns exactly one
//! [`OperationOutcome`].
//!
//! Job profiles and reportee edges are written before the user profile that
//! references them, with no transaction across the two. If the final save
//! fails (or the process dies in between) those rows stay behind,
//! unreferenced. Nothing compensates for that.

pub mod builder;
pub mod fanout;
pub mod hierarchy;
pub mod linker;
pub mod resolver;
pub mod uniqueness;

use chrono::{NaiveDate, Utc};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{IdentityError, IdentityResult};
use crate::models::{
    CreateUserRequest, OperationOutcome, UpdateUser, UpdateUserRequest, UserHierarchy,
    UserStatus, UserSummary,
};
use crate::projection::{parse_fields, project};
use crate::repositories::{IdentityStore, Stores};
use crate::validation::{validate_create_request, validate_update_request};

use fanout::WorkerPool;
use hierarchy::HierarchyComposer;
use linker::JobProfileLinker;
use resolver::ManagerResolver;
use uniqueness::{UniquenessValidator, candidates_for_create, candidates_for_update};

/// Fan-out tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Sub-tasks of one request allowed to run at once
    pub worker_pool_size: usize,
    /// Per sub-task deadline, measured from submission
    pub fanout_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 5,
            fanout_timeout: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    ValidateInput,
    ValidateUnique,
    ResolveManagers,
    LinkJobProfiles,
    BuildProfile,
    Persist,
    LoadProfile,
    LoadJobProfiles,
    LoadEdges,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ValidateInput => "VALIDATE_INPUT",
            Stage::ValidateUnique => "VALIDATE_UNIQUE",
            Stage::ResolveManagers => "RESOLVE_MANAGERS",
            Stage::LinkJobProfiles => "LINK_JOB_PROFILES",
            Stage::BuildProfile => "BUILD_PROFILE",
            Stage::Persist => "PERSIST",
            Stage::LoadProfile => "LOAD_PROFILE",
            Stage::LoadJobProfiles => "LOAD_JOB_PROFILES",
            Stage::LoadEdges => "LOAD_EDGES",
        };
        f.write_str(name)
    }
}

async fn run_stage<T>(
    operation: &'static str,
    organization_id: &str,
    stage: Stage,
    work: impl Future<Output = IdentityResult<T>>,
) -> IdentityResult<T> {
    debug!("{} [{}]: {}", operation, organization_id, stage);
    work.await.inspect_err(|e| {
        warn!(
            "{} [{}] failed at {}: {}",
            operation, organization_id, stage, e
        )
    })
}

/// Orchestrates the create, update and read pipelines
pub struct IdentityEngine {
    users: Arc<dyn IdentityStore>,
    uniqueness: UniquenessValidator,
    resolver: ManagerResolver,
    linker: JobProfileLinker,
    composer: HierarchyComposer,
}

impl IdentityEngine {
    pub fn new(stores: Stores, config: EngineConfig) -> Self {
        // one pool per engine, shared by every fan-out point
        let pool = WorkerPool::new(config.worker_pool_size, config.fanout_timeout);

        Self {
            users: Arc::clone(&stores.users),
            uniqueness: UniquenessValidator::new(Arc::clone(&stores.users)),
            resolver: ManagerResolver::new(
                Arc::clone(&stores.users),
                Arc::clone(&stores.job_profiles),
                pool.clone(),
            ),
            linker: JobProfileLinker::new(
                Arc::clone(&stores.job_profiles),
                Arc::clone(&stores.reportees),
                pool.clone(),
            ),
            composer: HierarchyComposer::new(
                stores.users,
                stores.job_profiles,
                stores.reportees,
                pool,
            ),
        }
    }

    /// Onboard a new user with their employment history
    pub async fn create_user(
        &self,
        organization_id: &str,
        request: CreateUserRequest,
    ) -> OperationOutcome<UserSummary> {
        let result = self.try_create_user(organization_id, &request).await;
        OperationOutcome::from_result(result, "User created")
    }

    /// Overwrite provided fields and append new employment records
    pub async fn update_user(
        &self,
        organization_id: &str,
        user_id: Uuid,
        request: UpdateUserRequest,
    ) -> OperationOutcome<UserSummary> {
        let result = match run_stage("update_user", organization_id, Stage::ValidateInput, async {
            validate_update_request(&request)
        })
        .await
        {
            Ok(update) => self.try_update_user(organization_id, user_id, update).await,
            Err(e) => Err(e),
        };
        OperationOutcome::from_result(result, "User updated")
    }

    /// Mark a user inactive; `end_date` defaults to today
    pub async fn deactivate_user(
        &self,
        organization_id: &str,
        user_id: Uuid,
        end_date: Option<NaiveDate>,
    ) -> OperationOutcome<UserSummary> {
        let update = UpdateUser {
            status: Some(UserStatus::Inactive),
            end_date: Some(end_date.unwrap_or_else(|| Utc::now().date_naive())),
            ..Default::default()
        };
        let result = self.try_update_user(organization_id, user_id, update).await;
        OperationOutcome::from_result(result, "User deactivated")
    }

    /// Reconstruct the user's current and previous job profiles with reportees
    pub async fn get_user(
        &self,
        organization_id: &str,
        user_id: Uuid,
    ) -> OperationOutcome<UserHierarchy> {
        let result = self.try_get_user(organization_id, user_id).await;
        OperationOutcome::from_result(result, "User found")
    }

    /// Every user of the organization, projected to `fields`
    pub async fn list_users(
        &self,
        organization_id: &str,
        fields: &[String],
    ) -> OperationOutcome<Vec<Map<String, Value>>> {
        let result = self.try_list_users(organization_id, fields).await;
        OperationOutcome::from_result(result, "Users listed")
    }

    async fn try_create_user(
        &self,
        organization_id: &str,
        request: &CreateUserRequest,
    ) -> IdentityResult<UserSummary> {
        const OP: &str = "create_user";

        let user = run_stage(OP, organization_id, Stage::ValidateInput, async {
            validate_create_request(request)
        })
        .await?;

        run_stage(
            OP,
            organization_id,
            Stage::ValidateUnique,
            self.uniqueness
                .ensure_unique(organization_id, &candidates_for_create(&user), None),
        )
        .await?;

        let resolved = run_stage(
            OP,
            organization_id,
            Stage::ResolveManagers,
            self.resolver.resolve(organization_id, &user.employment),
        )
        .await?;

        let user_id = Uuid::new_v4();
        let attached = run_stage(
            OP,
            organization_id,
            Stage::LinkJobProfiles,
            self.linker
                .link(organization_id, user_id, &user.employment, &resolved),
        )
        .await?;

        debug!("{} [{}]: {}", OP, organization_id, Stage::BuildProfile);
        let profile =
            builder::build_new_profile(organization_id, user_id, &user, &attached, Utc::now());

        run_stage(OP, organization_id, Stage::Persist, async {
            self.users.save(&profile).await.map_err(IdentityError::from)
        })
        .await?;

        info!(
            "Created user {} ({}) in {} with {} job profiles",
            profile.id,
            profile.username,
            organization_id,
            profile.job_profile_ids.len()
        );
        Ok(UserSummary::from_profile(&profile, "User created"))
    }

    async fn try_update_user(
        &self,
        organization_id: &str,
        user_id: Uuid,
        update: UpdateUser,
    ) -> IdentityResult<UserSummary> {
        const OP: &str = "update_user";

        let existing = run_stage(
            OP,
            organization_id,
            Stage::LoadProfile,
            self.composer.load_profile(organization_id, user_id),
        )
        .await?;

        if update
            .employment
            .iter()
            .any(|record| record.reporting_manager_id == Some(user_id))
        {
            return Err(IdentityError::InvalidInput(
                "A user cannot report to themselves".to_string(),
            ));
        }

        run_stage(
            OP,
            organization_id,
            Stage::ValidateUnique,
            self.uniqueness.ensure_unique(
                organization_id,
                &candidates_for_update(&existing, &update),
                Some(user_id),
            ),
        )
        .await?;

        let resolved = run_stage(
            OP,
            organization_id,
            Stage::ResolveManagers,
            self.resolver.resolve(organization_id, &update.employment),
        )
        .await?;

        let attached = run_stage(
            OP,
            organization_id,
            Stage::LinkJobProfiles,
            self.linker
                .link(organization_id, user_id, &update.employment, &resolved),
        )
        .await?;

        debug!("{} [{}]: {}", OP, organization_id, Stage::BuildProfile);
        let profile = builder::apply_update(existing, &update, &attached, Utc::now());

        run_stage(OP, organization_id, Stage::Persist, async {
            self.users.save(&profile).await.map_err(IdentityError::from)
        })
        .await?;

        info!(
            "Updated user {} in {} (+{} job profiles)",
            user_id,
            organization_id,
            attached.len()
        );
        Ok(UserSummary::from_profile(&profile, "User updated"))
    }

    async fn try_get_user(
        &self,
        organization_id: &str,
        user_id: Uuid,
    ) -> IdentityResult<UserHierarchy> {
        const OP: &str = "get_user";

        let profile = run_stage(
            OP,
            organization_id,
            Stage::LoadProfile,
            self.composer.load_profile(organization_id, user_id),
        )
        .await?;

        let job_profiles = run_stage(
            OP,
            organization_id,
            Stage::LoadJobProfiles,
            self.composer.load_job_profiles(&profile),
        )
        .await?;

        let reportees = run_stage(
            OP,
            organization_id,
            Stage::LoadEdges,
            self.composer.load_reportees(organization_id, &job_profiles),
        )
        .await?;

        Ok(HierarchyComposer::compose(profile, job_profiles, reportees))
    }

    async fn try_list_users(
        &self,
        organization_id: &str,
        fields: &[String],
    ) -> IdentityResult<Vec<Map<String, Value>>> {
        let fields = parse_fields(fields)?;
        let users = self.users.list_by_organization(organization_id).await?;
        Ok(users.iter().map(|user| project(user, &fields)).collect())
    }
}
