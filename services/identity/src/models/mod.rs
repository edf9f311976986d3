//! Identity service models

pub mod interval;
pub mod job_profile;
pub mod reportee;
pub mod request;
pub mod response;
pub mod user;

// Re-export for convenience
pub use interval::DateInterval;
pub use job_profile::{ExtensionData, JobProfile, NewJobProfile};
pub use reportee::ReporteeRelation;
pub use request::{CreateUserRequest, DeactivateUserRequest, EmploymentRecord, UpdateUserRequest};
pub use response::{JobProfileView, OperationOutcome, UserHierarchy, UserSummary};
pub use user::{NewUser, Phone, UpdateUser, UserProfile, UserStatus};
