//! Bundle submission and confirmation
//!
//! This crate picks a tip account, packages pre-signed transactions into a
//! bundle, submits it to the block engine and follows it to a terminal
//! outcome by polling or by listening on the result stream.

pub mod assembler;
pub mod pipeline;
pub mod submitter;
pub mod tip;
pub mod tracker;

#[cfg(test)]
pub(crate) mod testing;

pub use assembler::*;
pub use pipeline::*;
pub use submitter::*;
pub use tip::*;
pub use tracker::*;
