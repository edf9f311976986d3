//! Read path: rebuild a user's employment hierarchy from the stores

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use super::fanout::WorkerPool;
use crate::error::{IdentityError, IdentityResult};
use crate::models::{JobProfile, JobProfileView, UserHierarchy, UserProfile};
use crate::repositories::{IdentityStore, JobProfileStore, ReporteeStore};

pub struct HierarchyComposer {
    users: Arc<dyn IdentityStore>,
    job_profiles: Arc<dyn JobProfileStore>,
    reportees: Arc<dyn ReporteeStore>,
    pool: WorkerPool,
}

impl HierarchyComposer {
    pub fn new(
        users: Arc<dyn IdentityStore>,
        job_profiles: Arc<dyn JobProfileStore>,
        reportees: Arc<dyn ReporteeStore>,
        pool: WorkerPool,
    ) -> Self {
        Self {
            users,
            job_profiles,
            reportees,
            pool,
        }
    }

    pub async fn load_profile(
        &self,
        organization_id: &str,
        user_id: Uuid,
    ) -> IdentityResult<UserProfile> {
        self.users
            .find_by_id(organization_id, user_id)
            .await?
            .ok_or_else(|| IdentityError::not_found("user", [user_id]))
    }

    /// Load every job profile the user references, failing on any dangling id
    pub async fn load_job_profiles(&self, profile: &UserProfile) -> IdentityResult<Vec<JobProfile>> {
        let job_profiles = self
            .job_profiles
            .find_by_ids(&profile.organization_id, &profile.job_profile_ids)
            .await?;

        let found: HashSet<Uuid> = job_profiles.iter().map(|p| p.id).collect();
        let missing: Vec<Uuid> = profile
            .job_profile_ids
            .iter()
            .filter(|id| !found.contains(id))
            .copied()
            .collect();

        if !missing.is_empty() {
            error!(
                "User {} references missing job profiles {:?}",
                profile.id, missing
            );
            return Err(IdentityError::not_found("job profile", missing));
        }

        Ok(job_profiles)
    }

    /// Subordinate ids per job profile, in the order of `job_profiles`
    pub async fn load_reportees(
        &self,
        organization_id: &str,
        job_profiles: &[JobProfile],
    ) -> IdentityResult<Vec<Vec<Uuid>>> {
        let tasks: Vec<_> = job_profiles
            .iter()
            .map(|job_profile| {
                let reportees = Arc::clone(&self.reportees);
                let organization_id = organization_id.to_string();
                let job_profile_id = job_profile.id;
                (job_profile_id, async move {
                    let relations = reportees
                        .find_by_job_profile(&organization_id, job_profile_id)
                        .await?;
                    let mut seen = HashSet::new();
                    Ok::<_, IdentityError>(
                        relations
                            .into_iter()
                            .map(|relation| relation.subordinate_id)
                            .filter(|id| seen.insert(*id))
                            .collect::<Vec<Uuid>>(),
                    )
                })
            })
            .collect();

        let loaded = self.pool.fan_out("load_edges", tasks, Vec::new).await?;
        Ok(loaded.into_iter().map(|(_, ids)| ids).collect())
    }

    pub fn compose(
        profile: UserProfile,
        job_profiles: Vec<JobProfile>,
        reportees: Vec<Vec<Uuid>>,
    ) -> UserHierarchy {
        let views: Vec<(JobProfile, Vec<Uuid>)> = job_profiles.into_iter().zip(reportees).collect();
        let (current, previous) = partition_current(views);

        debug!(
            "User {} has {} previous job profiles",
            profile.id,
            previous.len()
        );

        UserHierarchy {
            organization_id: profile.organization_id,
            id: profile.id,
            username: profile.username,
            first_name: profile.first_name,
            middle_name: profile.middle_name,
            last_name: profile.last_name,
            email: profile.email,
            email_verified: profile.email_verified,
            phone: profile.phone,
            phone_verified: profile.phone_verified,
            status: profile.status,
            start_date: profile.start_date,
            end_date: profile.end_date,
            current_job_profile: current.map(|(p, ids)| JobProfileView::new(&p, ids)),
            previous_job_profiles: previous
                .into_iter()
                .map(|(p, ids)| JobProfileView::new(&p, ids))
                .collect(),
        }
    }
}

type Entry = (JobProfile, Vec<Uuid>);

/// Split into the current job profile and the rest, newest first.
///
/// Current is the open-ended profile with the latest start, or the latest
/// start overall when every profile has ended.
fn partition_current(mut entries: Vec<Entry>) -> (Option<Entry>, Vec<Entry>) {
    entries.sort_by(|(a, _), (b, _)| {
        b.start_date
            .cmp(&a.start_date)
            .then_with(|| a.id.cmp(&b.id))
    });

    let current_index = entries
        .iter()
        .position(|(profile, _)| profile.interval().is_open())
        .or(if entries.is_empty() { None } else { Some(0) });

    match current_index {
        Some(index) => {
            let current = entries.remove(index);
            (Some(current), entries)
        }
        None => (None, entries),
    }
}
