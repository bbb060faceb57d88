//! TKO Backend
//!
//! The storage contract, an in-memory store, and the validating decorator
//! that sits in front of any store.

pub mod backend;
pub mod modify;
pub mod repository;
pub mod results;
pub mod service;
pub mod validation;

pub use backend::Backend;
pub use modify::modify_deployment;
pub use repository::MemoryBackend;
pub use results::Results;
pub use service::ValidatingBackend;
pub use validation::{RegistryValidation, ResourceValidator, Validation};
