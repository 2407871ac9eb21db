//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Sweep: removes expired cache entries and aged-out deduplication records
//!   at configured intervals

mod cleanup;

pub use cleanup::{spawn_cleanup_task, CleanupHandle, Sweep};
