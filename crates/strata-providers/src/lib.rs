//! Component providers for Strata
//!
//! A provider owns one component kind: it converts rendered specs into typed
//! components, drives the backing system, and keeps local records. Providers
//! are registered by name in a [`ProviderRegistry`]; the orchestrator sees
//! them only through [`ProviderHandle`].

pub mod chart;
pub mod handle;
pub mod registry;
pub mod stream;
pub mod traits;
pub mod utils;

pub use chart::{ChartProvider, ChartRelease, HelmCli, HelmClient};
pub use handle::{ApplyMode, ConvertedComponent, ProviderHandle, StagedComponent};
pub use registry::ProviderRegistry;
pub use stream::{KinesisBackend, StreamBackend, StreamComponent, StreamProvider};
pub use traits::{next_revision, Component, ComponentProvider};
