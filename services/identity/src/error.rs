//! Custom error types for the identity service

use axum::http::StatusCode;
use common::error::DatabaseError;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Stable failure reasons reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    DuplicateResource,
    ResourceNotFound,
    InvalidInput,
    Internal,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::DuplicateResource => "DUPLICATE_RESOURCE",
            ErrorKind::ResourceNotFound => "RESOURCE_NOT_FOUND",
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::DuplicateResource => StatusCode::CONFLICT,
            ErrorKind::ResourceNotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// User attributes that must be unique within an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UniqueAttribute {
    Username,
    Email,
    Phone,
}

impl fmt::Display for UniqueAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UniqueAttribute::Username => "username",
            UniqueAttribute::Email => "email",
            UniqueAttribute::Phone => "phone",
        };
        f.write_str(name)
    }
}

impl UniqueAttribute {
    /// Attribute guarded by a `user_profiles` unique constraint
    pub fn from_constraint(constraint: &str) -> Option<Self> {
        match constraint {
            "user_profiles_organization_id_username_key" => Some(UniqueAttribute::Username),
            "user_profiles_organization_id_email_key" => Some(UniqueAttribute::Email),
            "user_profiles_organization_id_phone_key" => Some(UniqueAttribute::Phone),
            _ => None,
        }
    }
}

fn join<T: fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Custom error type for the identity engine
#[derive(Error, Debug)]
pub enum IdentityError {
    /// Another user in the organization already holds these attributes
    #[error("Duplicate resource: {} already in use", join(.0))]
    DuplicateResource(BTreeSet<UniqueAttribute>),

    /// Referenced records do not exist
    #[error("{resource} not found: {}", join(.ids))]
    ResourceNotFound {
        resource: &'static str,
        ids: Vec<String>,
    },

    /// Request payload failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unexpected internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Store failure
    #[error("Database error: {0}")]
    Database(#[source] DatabaseError),

    /// Payload could not be serialized for storage
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IdentityError {
    pub fn not_found<I, T>(resource: &'static str, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        IdentityError::ResourceNotFound {
            resource,
            ids: ids.into_iter().map(|id| id.to_string()).collect(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            IdentityError::DuplicateResource(_) => ErrorKind::DuplicateResource,
            IdentityError::ResourceNotFound { .. } => ErrorKind::ResourceNotFound,
            IdentityError::InvalidInput(_) => ErrorKind::InvalidInput,
            IdentityError::Database(DatabaseError::UniqueViolation { .. }) => {
                ErrorKind::DuplicateResource
            }
            IdentityError::Internal(_)
            | IdentityError::Database(_)
            | IdentityError::Serialization(_) => ErrorKind::Internal,
        }
    }
}

impl From<DatabaseError> for IdentityError {
    fn from(error: DatabaseError) -> Self {
        // a unique index caught a race the validator could not see
        if let DatabaseError::UniqueViolation { constraint } = &error {
            if let Some(attribute) = UniqueAttribute::from_constraint(constraint) {
                return IdentityError::DuplicateResource(BTreeSet::from([attribute]));
            }
        }
        IdentityError::Database(error)
    }
}

impl From<sqlx::Error> for IdentityError {
    fn from(error: sqlx::Error) -> Self {
        DatabaseError::from_query(error).into()
    }
}

/// Type alias for identity engine results
pub type IdentityResult<T> = Result<T, IdentityError>;
