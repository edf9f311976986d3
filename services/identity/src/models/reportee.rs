//! Reportee relation model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Manager → subordinate edge, scoped to the manager's job profile whose
/// interval overlapped the subordinate's at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReporteeRelation {
    pub id: Uuid,
    pub organization_id: String,
    pub manager_id: Uuid,
    pub subordinate_id: Uuid,
    pub job_profile_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl ReporteeRelation {
    pub fn new(
        organization_id: &str,
        manager_id: Uuid,
        subordinate_id: Uuid,
        job_profile_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id: organization_id.to_string(),
            manager_id,
            subordinate_id,
            job_profile_id,
            created_at: Utc::now(),
        }
    }
}
