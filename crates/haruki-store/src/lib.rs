//! Session storage for harukid
//!
//! Provides:
//! - A generic, in-memory, owner-keyed session store with monotonic deadlines
//! - Lazy expiry on lookup, plus a one-shot expiry report for watchers
//! - Atomic in-place updates
//!
//! Sessions never outlive the process.

mod session;
mod store;

pub use session::*;
pub use store::*;
