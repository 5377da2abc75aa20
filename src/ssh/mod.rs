// src/ssh/mod.rs

//! Turning server names into SSH commands.
//!
//! - [`destination`] parses `[user@]host[:port]`.
//! - [`builder`] renders the `ssh` argument vector for a destination.

pub mod builder;
pub mod destination;

pub use builder::{CommandBuilder, DEFAULT_PROGRAM, LinkedCommand};
pub use destination::Destination;
