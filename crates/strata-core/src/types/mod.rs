//! Data model shared across the workspace

mod manifest;
mod release;

pub use manifest::{Manifest, ManifestEntry, RawComponent};
pub use release::{
    FailurePolicy, Module, ModuleRelease, ModuleSelector, NewModule, RecordId, ReleaseRequest,
    ReleaseState,
};
