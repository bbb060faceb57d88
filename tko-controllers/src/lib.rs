//! TKO controllers
//!
//! Background reconcilers running against a [`tko_backend::Backend`]:
//! preparation drives deployments to the prepared state, instantiation hands
//! each site's resources to their instantiators. Both dispatch per resource
//! GVK to in-process handlers or to `command` plugins.

pub mod config;
pub mod controller;
pub mod instantiation;
pub mod plugins;
pub mod preparation;

pub use config::Config;
pub use controller::{Controller, Reconciler};
pub use instantiation::{Instantiation, Instantiator};
pub use preparation::{Preparation, Preparer};
