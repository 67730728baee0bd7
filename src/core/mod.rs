//! worldsync - Core traits, types, and constants.
//!
//! This module provides the foundational traits and error types shared by
//! the codec and the synchronization scheduler.

mod constants;
mod error;
mod traits;

pub use constants::*;
pub use error::*;
pub use traits::*;
