//! Reporting-manager resolution.
//!
//! For each employment record that names a manager, find the manager's job
//! profiles whose interval overlaps the record's. Those profiles become the
//! anchors of the reportee edges created by the linker.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::fanout::WorkerPool;
use crate::error::{IdentityError, IdentityResult};
use crate::models::{JobProfile, NewJobProfile};
use crate::repositories::{IdentityStore, JobProfileQuery, JobProfileStore};

/// Overlapping manager job profiles, keyed by employment record index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedManagers {
    overlaps: BTreeMap<usize, Vec<JobProfile>>,
}

impl ResolvedManagers {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Overlapping manager job profiles for record `index`; empty when the
    /// record has no manager or the manager had no overlapping assignment
    pub fn overlaps_for(&self, index: usize) -> &[JobProfile] {
        self.overlaps.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total_overlaps(&self) -> usize {
        self.overlaps.values().map(Vec::len).sum()
    }
}

pub struct ManagerResolver {
    users: Arc<dyn IdentityStore>,
    job_profiles: Arc<dyn JobProfileStore>,
    pool: WorkerPool,
}

impl ManagerResolver {
    pub fn new(
        users: Arc<dyn IdentityStore>,
        job_profiles: Arc<dyn JobProfileStore>,
        pool: WorkerPool,
    ) -> Self {
        Self {
            users,
            job_profiles,
            pool,
        }
    }

    pub async fn resolve(
        &self,
        organization_id: &str,
        records: &[NewJobProfile],
    ) -> IdentityResult<ResolvedManagers> {
        let manager_ids: BTreeSet<Uuid> = records
            .iter()
            .filter_map(|record| record.reporting_manager_id)
            .collect();

        if manager_ids.is_empty() {
            debug!("No reporting managers referenced in {}", organization_id);
            return Ok(ResolvedManagers::empty());
        }

        let requested: Vec<Uuid> = manager_ids.iter().copied().collect();
        let managers: HashMap<Uuid, Vec<Uuid>> = self
            .users
            .find_by_ids(organization_id, &requested)
            .await?
            .into_iter()
            .map(|manager| (manager.id, manager.job_profile_ids))
            .collect();

        let missing: Vec<Uuid> = requested
            .iter()
            .filter(|id| !managers.contains_key(id))
            .copied()
            .collect();
        if !missing.is_empty() {
            info!(
                "Reporting managers {:?} not found in organization {}",
                missing, organization_id
            );
            return Err(IdentityError::not_found("reporting manager", missing));
        }

        let mut tasks = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let Some(manager_profile_ids) = record
                .reporting_manager_id
                .and_then(|manager_id| managers.get(&manager_id))
            else {
                continue;
            };
            if manager_profile_ids.is_empty() {
                continue;
            }

            let query = JobProfileQuery::in_organization(organization_id)
                .with_ids(manager_profile_ids)
                .overlapping(record.interval());
            let store = Arc::clone(&self.job_profiles);
            tasks.push((index, async move {
                store.find(&query).await.map_err(IdentityError::from)
            }));
        }

        let overlaps: BTreeMap<usize, Vec<JobProfile>> = self
            .pool
            .fan_out("resolve_managers", tasks, Vec::new)
            .await?
            .into_iter()
            .collect();

        let resolved = ResolvedManagers { overlaps };
        debug!(
            "Resolved {} overlapping manager job profiles for {} records",
            resolved.total_overlaps(),
            records.len()
        );
        Ok(resolved)
    }
}
