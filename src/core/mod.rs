// Public modules
pub mod capability;
pub mod check;
pub mod conf;
pub mod context;
pub mod defaults;
pub mod error;
pub mod health;
pub mod pipeline;
pub mod prompt;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod runner;
pub mod session;
pub mod sync;
pub mod threshold;

// Internal modules - not part of public API
pub(crate) mod paths;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
