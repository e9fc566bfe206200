pub mod config;
pub mod error;
pub mod generate;
pub mod pipeline;
pub mod record;
pub mod sample;
pub mod store;

// Re-export key types for convenience
pub use error::{Result, StudentSeedError};
pub use pipeline::{GenerationReport, GenerationRequest, GenerationSettings};
pub use record::{NewStudent, StudentRecord, StudentStatus};
pub use store::{DatabaseStore, DatabaseType, StudentStore};
