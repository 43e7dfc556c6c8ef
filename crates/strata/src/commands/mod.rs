//! Command implementations

pub mod component;
pub mod module;
pub mod release;
