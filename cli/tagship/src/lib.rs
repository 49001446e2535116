//! tagship - create or update a GitHub release from CI and attach build
//! artifacts to it.
//!
//! The release logic lives in [`tagship_reconcile`]; this crate supplies
//! configuration, the GitHub REST transport, file matching and step outputs.

pub mod config;
pub mod error;
pub mod files;
pub mod github;
pub mod output;
pub mod runner;
