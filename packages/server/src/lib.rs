// Icon Server - API Core
//
// Turns a list of installed application names into a zip of recolored App
// Store icons. Jobs run in the background; callers submit, poll, then fetch.
//
// domains/  - icon processing and app-name sources
// kernel/   - shared dependencies and the job manager
// server/   - axum transport

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
