//! Command implementations.

pub mod common;
pub mod copy;
pub mod download;
pub mod extract;
pub mod pinata;

pub use common::GlobalArgs;
