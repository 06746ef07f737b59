//! Collaborator interfaces for harukid
//!
//! This crate defines the narrow seams between the wizard core and the
//! outside world: the media catalog, the identity linker, the acquisition
//! services and the chat view. It contains no network code itself.

mod error;
mod mock;
mod traits;

pub use error::*;
pub use mock::*;
pub use traits::*;
