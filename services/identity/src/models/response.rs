//! Response shapes returned by the engine

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ErrorKind, IdentityResult};
use crate::models::job_profile::{ExtensionData, JobProfile};
use crate::models::user::{Phone, UserProfile, UserStatus};

/// Short acknowledgement for create/update/deactivate
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub status: UserStatus,
    pub message: String,
}

impl UserSummary {
    pub fn from_profile(profile: &UserProfile, message: &str) -> Self {
        Self {
            id: profile.id,
            username: profile.username.clone(),
            status: profile.status,
            message: message.to_string(),
        }
    }
}

/// A job profile together with its resolved reportees
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProfileView {
    pub id: Uuid,
    pub title: String,
    pub organizational_unit: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub reporting_manager_id: Option<Uuid>,
    pub reportee_ids: Vec<Uuid>,
    pub extension_data: ExtensionData,
}

impl JobProfileView {
    pub fn new(profile: &JobProfile, reportee_ids: Vec<Uuid>) -> Self {
        Self {
            id: profile.id,
            title: profile.title.clone(),
            organizational_unit: profile.organizational_unit.clone(),
            start_date: profile.start_date,
            end_date: profile.end_date,
            reporting_manager_id: profile.reporting_manager_id,
            reportee_ids,
            extension_data: profile.extension_map(),
        }
    }
}

/// Full read model: identity fields plus the employment hierarchy
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserHierarchy {
    pub organization_id: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub email_verified: bool,
    pub phone: Phone,
    pub phone_verified: bool,
    pub status: UserStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub current_job_profile: Option<JobProfileView>,
    pub previous_job_profiles: Vec<JobProfileView>,
}

/// Terminal record for every engine operation.
///
/// Callers never see a partial success: either `success` is set and `data`
/// is present, or `reason` carries the failure kind.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ErrorKind>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> OperationOutcome<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            reason: None,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failed(reason: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: Some(reason),
            message: message.into(),
            data: None,
        }
    }

    pub fn from_result(result: IdentityResult<T>, success_message: &str) -> Self {
        match result {
            Ok(data) => Self::ok(data, success_message),
            Err(e) => Self::failed(e.kind(), e.to_string()),
        }
    }
}
