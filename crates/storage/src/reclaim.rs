//! Tiered invocation of the external cleanup routine.

use std::{path::Path, process::Stdio};

use {
    tokio::{io::AsyncWriteExt, process::Command},
    tracing::{info, warn},
};

use crate::error::{Context, Error, Result};

/// Above this used-space percentage the cleanup runs in aggressive mode.
pub const AGGRESSIVE_THRESHOLD: u8 = 95;
/// Still above this after cleanup: list the largest entries.
pub const DIAGNOSTIC_THRESHOLD: u8 = 90;

const AGGRESSIVE_FLAG: &str = "--aggressive";
/// Answer to any "are you sure?" prompt the routine issues.
const DECLINE: &[u8] = b"n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupMode {
    Default,
    Aggressive,
}

impl CleanupMode {
    /// Choose the tier for a usage reading. An unknown reading gets the default tier.
    #[must_use]
    pub fn for_usage(percent: Option<u8>) -> Self {
        match percent {
            Some(p) if p > AGGRESSIVE_THRESHOLD => Self::Aggressive,
            _ => Self::Default,
        }
    }

    pub fn args(self) -> &'static [&'static str] {
        match self {
            Self::Default => &[],
            Self::Aggressive => &[AGGRESSIVE_FLAG],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Aggressive => "aggressive",
        }
    }
}

/// Whether post-cleanup usage warrants a listing of the largest entries.
#[must_use]
pub fn needs_diagnostics(percent: Option<u8>) -> bool {
    percent.is_some_and(|p| p > DIAGNOSTIC_THRESHOLD)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub mode: CleanupMode,
    /// Exit code of the routine; `None` when killed by a signal.
    pub exit_code: Option<i32>,
}

/// Run `script` in `mode`, declining any confirmation prompt on stdin.
///
/// A nonzero exit is logged and reported, not returned as an error; only a
/// routine that cannot be started or waited on is an error.
pub async fn run_cleanup(script: &Path, mode: CleanupMode) -> Result<CleanupReport> {
    if !script.is_file() {
        return Err(Error::message(format!(
            "cleanup routine not found at {}",
            script.display()
        )));
    }

    info!(script = %script.display(), mode = mode.as_str(), "running cleanup");

    let mut child = Command::new(script)
        .args(mode.args())
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to start {}", script.display()))?;

    if let Some(mut stdin) = child.stdin.take() {
        // The routine may exit without reading; a broken pipe is fine.
        if let Err(e) = stdin.write_all(DECLINE).await {
            warn!(error = %e, "could not answer cleanup prompt");
        }
    }

    let status = child
        .wait()
        .await
        .context("failed to wait for cleanup routine")?;

    if status.success() {
        info!(mode = mode.as_str(), "cleanup finished");
    } else {
        warn!(mode = mode.as_str(), status = %status, "cleanup exited unsuccessfully");
    }

    Ok(CleanupReport {
        mode,
        exit_code: status.code(),
    })
}
