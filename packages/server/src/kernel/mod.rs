//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod jobs;
pub mod traits;

pub use deps::ServerDeps;
pub use traits::{BaseIconResolver, BaseImageFetcher};
