//! Job profile model and related functionality

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::models::interval::DateInterval;

/// Free-form key/value payload attached to a job profile
pub type ExtensionData = serde_json::Map<String, serde_json::Value>;

/// Job profile entity: one employment stint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProfile {
    pub organization_id: String,
    pub id: Uuid,
    pub title: String,
    pub organizational_unit: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub reporting_manager_id: Option<Uuid>,
    /// Serialized [`ExtensionData`], kept as text in the store
    pub extension_data: String,
    pub created_at: DateTime<Utc>,
}

impl JobProfile {
    pub fn interval(&self) -> DateInterval {
        DateInterval::new(self.start_date, self.end_date)
    }

    /// Decode the stored extension payload.
    ///
    /// Anything that is not a JSON object decodes to an empty map.
    pub fn extension_map(&self) -> ExtensionData {
        if self.extension_data.trim().is_empty() {
            return ExtensionData::new();
        }

        match serde_json::from_str::<ExtensionData>(&self.extension_data) {
            Ok(map) => map,
            Err(e) => {
                warn!(
                    "Ignoring unreadable extension data on job profile {}: {}",
                    self.id, e
                );
                ExtensionData::new()
            }
        }
    }
}

/// Validated employment record, ready to become a job profile
#[derive(Debug, Clone, PartialEq)]
pub struct NewJobProfile {
    pub title: String,
    pub organizational_unit: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub reporting_manager_id: Option<Uuid>,
    pub extension_data: ExtensionData,
}

impl NewJobProfile {
    pub fn interval(&self) -> DateInterval {
        DateInterval::new(self.start_date, self.end_date)
    }
}
