//! Pipeline entry points.
//!
//! - `calculate_delta`: new findings relative to the Seen-Set
//! - `run_pipeline`: one complete load → fetch → diff → notify → persist pass

pub mod diff;
pub mod run;

pub use diff::{Delta, calculate_delta};
pub use run::{NotificationStatus, RunOptions, RunReport, run_pipeline};
