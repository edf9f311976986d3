//! Request payloads accepted by the engine and the HTTP layer

use chrono::NaiveDate;
use serde::Deserialize;

use crate::models::job_profile::ExtensionData;
use crate::models::user::{Phone, UserStatus};

/// One employment stint as submitted by the caller
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmploymentRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub organizational_unit: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Empty or absent means the record has no reporting manager
    #[serde(default)]
    pub reporting_manager_id: Option<String>,
    #[serde(default)]
    pub extension_data: ExtensionData,
}

/// Request for user onboarding
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    pub phone: Phone,
    #[serde(default)]
    pub phone_verified: bool,
    #[serde(default)]
    pub employment: Vec<EmploymentRecord>,
}

/// Request for a partial user update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub phone: Option<Phone>,
    pub phone_verified: Option<bool>,
    pub status: Option<UserStatus>,
    pub end_date: Option<NaiveDate>,
    /// Appended to the user's existing job profiles
    #[serde(default)]
    pub employment: Vec<EmploymentRecord>,
}

/// Request for user deactivation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeactivateUserRequest {
    pub end_date: Option<NaiveDate>,
}
