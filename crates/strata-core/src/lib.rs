//! Strata core library
//!
//! Shared building blocks for the release orchestration crates:
//!
//! - **types**: modules, module releases, selectors, failure policy, manifests
//! - **error**: the error taxonomy every crate returns
//! - **config**: `strata.yaml` loading with environment overrides
//! - **templates**: Tera rendering of module spec templates

pub mod config;
pub mod error;
pub mod templates;
pub mod types;

pub use error::{Error, Result};
