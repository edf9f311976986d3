//! Identity & hierarchy resolution service
//!
//! Onboards users with their employment history, keeps username, email and
//! phone unique per organization, links job profiles to reporting managers
//! and rebuilds the reporting hierarchy on read.

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod projection;
pub mod repositories;
pub mod routes;
pub mod state;
pub mod validation;

pub use engine::{EngineConfig, IdentityEngine};
pub use error::{ErrorKind, IdentityError, IdentityResult};
