//! Resolves, caches and activates per-project Hatch environments for an
//! editor's environment-selection API.

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod settings;
pub mod system;
