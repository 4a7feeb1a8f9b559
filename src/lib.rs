//! Tablestack: declarative DynamoDB table stacks.
//!
//! Declares users-table stacks as an in-memory construct tree and
//! synthesizes them to CloudFormation templates. Deployment is left to the
//! provider's toolchain.

pub mod cli;
pub mod core;
pub mod error;
pub mod resources;
pub mod stacks;

pub use error::{Error, Result};
