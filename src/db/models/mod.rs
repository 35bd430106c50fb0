// src/db/models/mod.rs

//! Data models for the script store
//!
//! Rust structs corresponding to database tables, each carrying its own
//! CRUD methods against a `rusqlite::Connection`.

mod meta;
mod registry;
mod script;
mod settings;

pub use meta::Meta;
pub use registry::{Registry, RegistryId};
pub use script::InstalledScript;
pub use settings::ScriptSettings;
