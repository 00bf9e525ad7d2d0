//! Git operations for mergewise.

pub mod client;

pub use client::{GitCli, GitOperations};
