// src/core/mod.rs

pub mod env_cache;
pub mod env_manager;
pub mod paths;
pub mod projects;
pub mod scope_map;
