//! Field selection for user listings.
//!
//! Each selectable attribute is a [`UserField`] variant; the accessor is an
//! explicit match, so adding a field means adding one arm.

use serde_json::{Map, Value, json};
use std::str::FromStr;

use crate::error::{IdentityError, IdentityResult};
use crate::models::UserProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    Id,
    Username,
    FirstName,
    MiddleName,
    LastName,
    Email,
    EmailVerified,
    Phone,
    PhoneCountryCode,
    PhoneVerified,
    Status,
    StartDate,
    EndDate,
    JobProfileIds,
}

impl UserField {
    pub const ALL: [UserField; 14] = [
        UserField::Id,
        UserField::Username,
        UserField::FirstName,
        UserField::MiddleName,
        UserField::LastName,
        UserField::Email,
        UserField::EmailVerified,
        UserField::Phone,
        UserField::PhoneCountryCode,
        UserField::PhoneVerified,
        UserField::Status,
        UserField::StartDate,
        UserField::EndDate,
        UserField::JobProfileIds,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            UserField::Id => "id",
            UserField::Username => "username",
            UserField::FirstName => "firstName",
            UserField::MiddleName => "middleName",
            UserField::LastName => "lastName",
            UserField::Email => "email",
            UserField::EmailVerified => "emailVerified",
            UserField::Phone => "phone",
            UserField::PhoneCountryCode => "phoneCountryCode",
            UserField::PhoneVerified => "phoneVerified",
            UserField::Status => "status",
            UserField::StartDate => "startDate",
            UserField::EndDate => "endDate",
            UserField::JobProfileIds => "jobProfileIds",
        }
    }

    pub fn value(&self, user: &UserProfile) -> Value {
        match self {
            UserField::Id => json!(user.id),
            UserField::Username => json!(user.username),
            UserField::FirstName => json!(user.first_name),
            UserField::MiddleName => json!(user.middle_name),
            UserField::LastName => json!(user.last_name),
            UserField::Email => json!(user.email),
            UserField::EmailVerified => json!(user.email_verified),
            UserField::Phone => json!(user.phone.number),
            UserField::PhoneCountryCode => json!(user.phone.country_code),
            UserField::PhoneVerified => json!(user.phone_verified),
            UserField::Status => json!(user.status),
            UserField::StartDate => json!(user.start_date),
            UserField::EndDate => json!(user.end_date),
            UserField::JobProfileIds => json!(user.job_profile_ids),
        }
    }
}

impl FromStr for UserField {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserField::ALL
            .iter()
            .find(|field| field.name() == s)
            .copied()
            .ok_or_else(|| IdentityError::InvalidInput(format!("Unknown user field '{}'", s)))
    }
}

/// Parse requested field names; no names selects every field
pub fn parse_fields(names: &[String]) -> IdentityResult<Vec<UserField>> {
    let mut fields = Vec::new();
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        let field = name.parse::<UserField>()?;
        if !fields.contains(&field) {
            fields.push(field);
        }
    }

    if fields.is_empty() {
        Ok(UserField::ALL.to_vec())
    } else {
        Ok(fields)
    }
}

pub fn project(user: &UserProfile, fields: &[UserField]) -> Map<String, Value> {
    fields
        .iter()
        .map(|field| (field.name().to_string(), field.value(user)))
        .collect()
}
