//! Job profile and reportee edge creation

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::fanout::WorkerPool;
use super::resolver::ResolvedManagers;
use crate::error::{IdentityError, IdentityResult};
use crate::models::{JobProfile, NewJobProfile, ReporteeRelation};
use crate::repositories::{JobProfileStore, ReporteeStore};

pub struct JobProfileLinker {
    job_profiles: Arc<dyn JobProfileStore>,
    reportees: Arc<dyn ReporteeStore>,
    pool: WorkerPool,
}

impl JobProfileLinker {
    pub fn new(
        job_profiles: Arc<dyn JobProfileStore>,
        reportees: Arc<dyn ReporteeStore>,
        pool: WorkerPool,
    ) -> Self {
        Self {
            job_profiles,
            reportees,
            pool,
        }
    }

    /// Persist one job profile per record plus one reportee edge per
    /// overlapping manager job profile.
    ///
    /// A record whose write misses the fan-out deadline is left out of the
    /// returned list even though its rows may still land in the store.
    pub async fn link(
        &self,
        organization_id: &str,
        user_id: Uuid,
        records: &[NewJobProfile],
        resolved: &ResolvedManagers,
    ) -> IdentityResult<Vec<JobProfile>> {
        let mut tasks = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            let profile = JobProfile {
                organization_id: organization_id.to_string(),
                id: Uuid::new_v4(),
                title: record.title.clone(),
                organizational_unit: record.organizational_unit.clone(),
                start_date: record.start_date,
                end_date: record.end_date,
                reporting_manager_id: record.reporting_manager_id,
                extension_data: serde_json::to_string(&record.extension_data)?,
                created_at: Utc::now(),
            };

            let relations: Vec<ReporteeRelation> = match record.reporting_manager_id {
                Some(manager_id) => resolved
                    .overlaps_for(index)
                    .iter()
                    .map(|manager_profile| {
                        ReporteeRelation::new(
                            organization_id,
                            manager_id,
                            user_id,
                            manager_profile.id,
                        )
                    })
                    .collect(),
                None => Vec::new(),
            };

            let job_profiles = Arc::clone(&self.job_profiles);
            let reportees = Arc::clone(&self.reportees);
            tasks.push((index, async move {
                job_profiles.insert(&profile).await?;
                reportees.insert_many(&relations).await?;
                debug!(
                    "Linked job profile {} with {} reportee edges",
                    profile.id,
                    relations.len()
                );
                Ok::<_, IdentityError>(Some(profile))
            }));
        }

        let linked = self
            .pool
            .fan_out("link_job_profiles", tasks, || None)
            .await?;

        let dropped: Vec<usize> = linked
            .iter()
            .filter(|(_, profile)| profile.is_none())
            .map(|(index, _)| *index)
            .collect();
        if !dropped.is_empty() {
            // rows for these records may still be written after we give up
            warn!(
                "User {} in {}: job profiles for employment records {:?} timed out and are not attached",
                user_id, organization_id, dropped
            );
        }

        Ok(linked
            .into_iter()
            .filter_map(|(_, profile)| profile)
            .collect())
    }
}
