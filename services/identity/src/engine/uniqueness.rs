//! Username / email / phone uniqueness within an organization

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{IdentityError, IdentityResult, UniqueAttribute};
use crate::models::{NewUser, UpdateUser, UserProfile};
use crate::repositories::{IdentityStore, UniqueCandidates};

pub struct UniquenessValidator {
    users: Arc<dyn IdentityStore>,
}

impl UniquenessValidator {
    pub fn new(users: Arc<dyn IdentityStore>) -> Self {
        Self { users }
    }

    /// Fail with `DuplicateResource` if another user already holds any of
    /// the candidate values. `exclude` is the user being updated.
    pub async fn ensure_unique(
        &self,
        organization_id: &str,
        candidates: &UniqueCandidates,
        exclude: Option<Uuid>,
    ) -> IdentityResult<()> {
        if candidates.is_empty() {
            debug!("No unique attributes to check in {}", organization_id);
            return Ok(());
        }

        let matches = self
            .users
            .find_by_unique_attributes(organization_id, candidates)
            .await?;

        let conflicts = conflicting_attributes(candidates, &matches, exclude);
        if conflicts.is_empty() {
            Ok(())
        } else {
            info!(
                "Rejecting duplicate attributes {:?} in organization {}",
                conflicts, organization_id
            );
            Err(IdentityError::DuplicateResource(conflicts))
        }
    }
}

/// Attributes of `candidates` held by a user other than `exclude`
pub fn conflicting_attributes(
    candidates: &UniqueCandidates,
    matches: &[UserProfile],
    exclude: Option<Uuid>,
) -> BTreeSet<UniqueAttribute> {
    let mut conflicts = BTreeSet::new();

    for other in matches.iter().filter(|user| Some(user.id) != exclude) {
        if candidates.username.as_deref() == Some(other.username.as_str()) {
            conflicts.insert(UniqueAttribute::Username);
        }
        if candidates.email.as_deref() == Some(other.email.as_str()) {
            conflicts.insert(UniqueAttribute::Email);
        }
        if candidates.phone.as_ref() == Some(&other.phone) {
            conflicts.insert(UniqueAttribute::Phone);
        }
    }

    conflicts
}

/// Every unique attribute of a new user
pub fn candidates_for_create(user: &NewUser) -> UniqueCandidates {
    UniqueCandidates {
        username: Some(user.username.clone()),
        email: Some(user.email.clone()),
        phone: Some(user.phone.clone()),
    }
}

/// Only the unique attributes an update actually changes
pub fn candidates_for_update(existing: &UserProfile, update: &UpdateUser) -> UniqueCandidates {
    UniqueCandidates {
        username: update
            .username
            .clone()
            .filter(|username| *username != existing.username),
        email: update.email.clone().filter(|email| *email != existing.email),
        phone: update.phone.clone().filter(|phone| *phone != existing.phone),
    }
}
