//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::error::{IdentityError, IdentityResult};
use crate::models::{
    CreateUserRequest, EmploymentRecord, NewJobProfile, NewUser, Phone, UpdateUser,
    UpdateUserRequest,
};

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() < 3 {
        return Err("Username must be at least 3 characters long".to_string());
    }

    if username.len() > 32 {
        return Err("Username must be at most 32 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_.-]+$").expect("Failed to compile username regex")
    });

    if !regex.is_match(username) {
        return Err(
            "Username can only contain letters, numbers, dots, dashes and underscores".to_string(),
        );
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate phone number and country code
pub fn validate_phone(phone: &Phone) -> Result<(), String> {
    static NUMBER_REGEX: OnceLock<Regex> = OnceLock::new();
    static COUNTRY_CODE_REGEX: OnceLock<Regex> = OnceLock::new();

    let number = NUMBER_REGEX
        .get_or_init(|| Regex::new(r"^[0-9]{4,15}$").expect("Failed to compile phone regex"));
    let country_code = COUNTRY_CODE_REGEX.get_or_init(|| {
        Regex::new(r"^\+[0-9]{1,4}$").expect("Failed to compile country code regex")
    });

    if !number.is_match(&phone.number) {
        return Err("Phone number must contain 4 to 15 digits".to_string());
    }

    if !country_code.is_match(&phone.country_code) {
        return Err("Country code must look like +49".to_string());
    }

    Ok(())
}

/// Validate a first name
pub fn validate_first_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("First name is required".to_string());
    }

    if name.len() > 100 {
        return Err("First name must be at most 100 characters long".to_string());
    }

    Ok(())
}

/// Parse an optional manager reference; blank means "no manager".
pub fn parse_manager_id(raw: Option<&str>) -> Result<Option<Uuid>, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => Uuid::parse_str(value)
            .map(Some)
            .map_err(|_| format!("Reporting manager id '{}' is not a valid id", value)),
    }
}

/// Validate one employment record
pub fn validate_employment_record(record: &EmploymentRecord) -> Result<NewJobProfile, String> {
    if record.title.trim().is_empty() {
        return Err("Employment title is required".to_string());
    }

    if record.organizational_unit.trim().is_empty() {
        return Err("Employment organizational unit is required".to_string());
    }

    let start_date = record
        .start_date
        .ok_or_else(|| "Employment start date is required".to_string())?;

    if let Some(end_date) = record.end_date {
        if end_date < start_date {
            return Err(format!(
                "Employment end date {} is before start date {}",
                end_date, start_date
            ));
        }
    }

    Ok(NewJobProfile {
        title: record.title.trim().to_string(),
        organizational_unit: record.organizational_unit.trim().to_string(),
        start_date,
        end_date: record.end_date,
        reporting_manager_id: parse_manager_id(record.reporting_manager_id.as_deref())?,
        extension_data: record.extension_data.clone(),
    })
}

fn validate_employment(records: &[EmploymentRecord]) -> IdentityResult<Vec<NewJobProfile>> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            validate_employment_record(record)
                .map_err(|e| IdentityError::InvalidInput(format!("employment[{}]: {}", index, e)))
        })
        .collect()
}

fn invalid(result: Result<(), String>) -> IdentityResult<()> {
    result.map_err(IdentityError::InvalidInput)
}

fn trimmed(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validate a creation request into a [`NewUser`]
pub fn validate_create_request(request: &CreateUserRequest) -> IdentityResult<NewUser> {
    let username = request.username.trim().to_string();
    let email = request.email.trim().to_string();

    invalid(validate_username(&username))?;
    invalid(validate_first_name(&request.first_name))?;
    invalid(validate_email(&email))?;
    invalid(validate_phone(&request.phone))?;

    Ok(NewUser {
        username,
        first_name: request.first_name.trim().to_string(),
        middle_name: trimmed(request.middle_name.as_ref()),
        last_name: trimmed(request.last_name.as_ref()),
        email,
        email_verified: request.email_verified,
        phone: request.phone.clone(),
        phone_verified: request.phone_verified,
        employment: validate_employment(&request.employment)?,
    })
}

/// Validate an update request into an [`UpdateUser`]
pub fn validate_update_request(request: &UpdateUserRequest) -> IdentityResult<UpdateUser> {
    let username = request.username.as_ref().map(|u| u.trim().to_string());
    let email = request.email.as_ref().map(|e| e.trim().to_string());

    if let Some(username) = &username {
        invalid(validate_username(username))?;
    }
    if let Some(first_name) = &request.first_name {
        invalid(validate_first_name(first_name))?;
    }
    if let Some(email) = &email {
        invalid(validate_email(email))?;
    }
    if let Some(phone) = &request.phone {
        invalid(validate_phone(phone))?;
    }

    Ok(UpdateUser {
        username,
        first_name: request.first_name.as_ref().map(|n| n.trim().to_string()),
        middle_name: trimmed(request.middle_name.as_ref()),
        last_name: trimmed(request.last_name.as_ref()),
        email,
        email_verified: request.email_verified,
        phone: request.phone.clone(),
        phone_verified: request.phone_verified,
        status: request.status,
        end_date: request.end_date,
        employment: validate_employment(&request.employment)?,
    })
}
