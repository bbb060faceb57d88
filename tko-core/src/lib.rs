//! TKO Core
//!
//! Core types and algorithms for the TKO orchestration control plane.
//!
//! This crate contains:
//! - Resource model: documents, GVK identity, annotations
//! - Merge engine and metadata extraction over packages
//! - Pattern matching for ID and metadata filters
//! - Domain types: Templates, Sites, Deployments, Plugins
//! - DTOs: selectors for list and purge operations
//! - The error taxonomy every backend speaks

pub mod domain;
pub mod dto;
pub mod error;
pub mod pattern;
pub mod resource;
pub mod window;

pub use error::{Result, TkoError};
pub use resource::{Gvk, Package, Resource, ResourceIdentifier};
pub use window::Window;
