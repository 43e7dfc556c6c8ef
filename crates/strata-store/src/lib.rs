//! Persistence for modules, module releases and provider components
//!
//! [`StateStore`] implements both [`ModuleRepository`] and
//! [`ComponentRecords`]; providers wrap the latter in a typed
//! [`ComponentTable`].

pub mod components;
pub mod repository;
pub mod state;

pub use components::ComponentTable;
pub use repository::{ComponentRecords, ModuleRepository};
pub use state::StateStore;
