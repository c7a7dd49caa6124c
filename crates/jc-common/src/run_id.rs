//! Process-level run ID for tracing a matcher invocation.
//!
//! Each process gets a ULID at first access; every log line of a match run carries it
//! so that one invocation can be followed across the pool scan and per-entry skips.
//!
//! # Example
//! ```
//! use jc_common::run_id;
//!
//! let id = run_id::get();
//! assert_eq!(id.len(), 26);
//! ```

use once_cell::sync::Lazy;
use ulid::Ulid;

static RUN_ID: Lazy<String> = Lazy::new(|| Ulid::new().to_string());

/// Returns the process-level run ID (26 characters, time-ordered).
#[inline]
pub fn get() -> &'static str {
    &RUN_ID
}
