//! User profile assembly. No I/O happens here; the orchestrator persists the
//! result in a single save.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{JobProfile, NewUser, UpdateUser, UserProfile, UserStatus};

/// Earliest start date among `job_profiles`
pub fn earliest_start(job_profiles: &[JobProfile]) -> Option<NaiveDate> {
    job_profiles.iter().map(|profile| profile.start_date).min()
}

/// Build the profile row for a freshly onboarded user
pub fn build_new_profile(
    organization_id: &str,
    user_id: Uuid,
    user: &NewUser,
    attached: &[JobProfile],
    now: DateTime<Utc>,
) -> UserProfile {
    UserProfile {
        organization_id: organization_id.to_string(),
        id: user_id,
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        middle_name: user.middle_name.clone(),
        last_name: user.last_name.clone(),
        email: user.email.clone(),
        email_verified: user.email_verified,
        phone: user.phone.clone(),
        phone_verified: user.phone_verified,
        status: UserStatus::Active,
        start_date: earliest_start(attached).unwrap_or_else(|| now.date_naive()),
        end_date: None,
        job_profile_ids: attached.iter().map(|profile| profile.id).collect(),
        created_at: now,
        updated_at: now,
    }
}

/// Apply an update on top of the stored profile, appending new job profiles
pub fn apply_update(
    mut profile: UserProfile,
    update: &UpdateUser,
    attached: &[JobProfile],
    now: DateTime<Utc>,
) -> UserProfile {
    if let Some(username) = &update.username {
        profile.username = username.clone();
    }
    if let Some(first_name) = &update.first_name {
        profile.first_name = first_name.clone();
    }
    if let Some(middle_name) = &update.middle_name {
        profile.middle_name = Some(middle_name.clone());
    }
    if let Some(last_name) = &update.last_name {
        profile.last_name = Some(last_name.clone());
    }
    if let Some(email) = &update.email {
        if *email != profile.email {
            profile.email_verified = false;
        }
        profile.email = email.clone();
    }
    if let Some(verified) = update.email_verified {
        profile.email_verified = verified;
    }
    if let Some(phone) = &update.phone {
        if *phone != profile.phone {
            profile.phone_verified = false;
        }
        profile.phone = phone.clone();
    }
    if let Some(verified) = update.phone_verified {
        profile.phone_verified = verified;
    }
    if let Some(status) = update.status {
        profile.status = status;
    }
    if update.end_date.is_some() {
        profile.end_date = update.end_date;
    }

    if let Some(start) = earliest_start(attached) {
        profile.start_date = profile.start_date.min(start);
    }
    profile
        .job_profile_ids
        .extend(attached.iter().map(|job_profile| job_profile.id));
    profile.updated_at = now;
    profile
}
