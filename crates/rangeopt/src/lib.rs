//! ## Crate layout
//! - `core`: key layout, range trees, seek ranges, group MIN/MAX scan, and
//!   observability.
//!
//! The `prelude` module mirrors the planner-facing surface; storage engines
//! implement `core::scan::StorageCursor`.

pub use rangeopt_core as core;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use core::error::InternalError as Error;

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::{
        prelude::*,
        scan::{CursorError, ReadFlag, StorageCursor},
    };
}
