// HTTP routes
pub mod health;
pub mod icons;
pub mod jobs;

pub use health::*;
pub use icons::*;
pub use jobs::*;
