//! Container startup launcher for an OpenClaw gateway.
//!
//! Reconciles `openclaw.json`, moves bulky agent state onto ephemeral
//! storage, reclaims space on the persistent volume, checks the model
//! provider, then execs the gateway.

pub mod bootstrap;
pub mod launch;
pub mod probe;

pub use {
    bootstrap::{BootReport, Bootstrap, ConfigSource, Step, StepFailure},
    launch::{DryRunLauncher, ExecLauncher, GatewayInvocation, Launcher},
    probe::{HttpProbe, Reachability, ReadinessProbe},
};
