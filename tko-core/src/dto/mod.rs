//! Data Transfer Objects for backend calls
//!
//! Selectors narrow list and purge operations; every field is optional and
//! an empty selector matches everything.

pub mod deployment;
pub mod plugin;
pub mod site;
pub mod template;
