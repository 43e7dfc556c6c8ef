//! Release orchestration for Strata
//!
//! The [`Orchestrator`] owns the install, update and delete algorithms over a
//! shared [`ReleaseContext`]: module repository, component provider registry,
//! secret registry and template renderer.

pub mod context;
pub mod locks;
pub mod orchestrator;
pub mod render;
pub mod teardown;

pub use context::{ReleaseContext, DEFAULT_DISPATCH_TIMEOUT};
pub use locks::{ReleaseGuard, ReleaseLocks};
pub use orchestrator::{ComponentSummary, Orchestrator};
pub use render::{convert_manifest, render_manifest, validate_providers};
pub use teardown::{force_delete, TeardownReport};
