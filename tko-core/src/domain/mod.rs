//! Core domain types
//!
//! Templates, sites, deployments and plugins. Each entity is an "info" value
//! (what list operations return) plus, for the package-carrying entities, a
//! wrapper holding the info together with its package.

pub mod deployment;
pub mod plugin;
pub mod site;
pub mod template;

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at the millisecond precision entities are stamped with
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
