//! Persistence of the Seen-Set between runs.
//!
//! Each pipeline owns one file; the two never interact. Files are read once
//! at run start and written once at run end without locking, so overlapping
//! invocations must be prevented by the scheduler.

pub mod local;

// Re-export for convenience
pub use local::SeenStore;
