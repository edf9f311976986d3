//! User profile model and related functionality

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::models::job_profile::NewJobProfile;

/// Lifecycle status of a user profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Inactive => "Inactive",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown user status: {0}")]
pub struct ParseStatusError(String);

impl FromStr for UserStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(UserStatus::Active),
            "Inactive" => Ok(UserStatus::Inactive),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Phone number with its country calling code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phone {
    pub number: String,
    pub country_code: String,
}

/// User profile entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
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
    /// Earliest start date across the attached job profiles
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Append-only, in attachment order
    pub job_profile_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated user creation payload
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub email_verified: bool,
    pub phone: Phone,
    pub phone_verified: bool,
    pub employment: Vec<NewJobProfile>,
}

/// Validated user update payload
///
/// `None` leaves the stored value untouched. Employment records are appended.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
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
    pub employment: Vec<NewJobProfile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        assert_eq!("Active".parse::<UserStatus>().unwrap(), UserStatus::Active);
        assert_eq!(UserStatus::Inactive.to_string(), "Inactive");
        assert!("Suspended".parse::<UserStatus>().is_err());
    }
}
