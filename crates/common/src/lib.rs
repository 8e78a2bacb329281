//! Shared error plumbing and step policies used across the clawboot crates.

pub mod error;
pub mod policy;

pub use {
    error::{Error, FromMessage, Result},
    policy::StepPolicy,
};
