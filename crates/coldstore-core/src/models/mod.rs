//! Data models for the file index API
//!
//! Every payload the backend sends or receives, organized by endpoint family.
//! Fields the backend may omit are `#[serde(default)]` so older servers still parse.

mod browse;
mod disk;
mod progress;
mod search;
mod stats;
mod upload;

// Re-export all models for convenient imports
pub use browse::*;
pub use disk::*;
pub use progress::*;
pub use search::*;
pub use stats::*;
pub use upload::*;
