//! Storage layout for the gateway container.
//!
//! The persistent volume is small and survives redeploys; the ephemeral disk
//! is large and wiped. Bulky agent state lives on the ephemeral side behind a
//! symlink, and the persistent side is reclaimed when it fills up.

pub mod disk;
pub mod error;
pub mod layout;
pub mod reclaim;

pub use {
    disk::{DiskUsage, DiskUsageSource, SystemDisks, format_size, top_entries, usage_percent},
    error::{Error, Result},
    layout::{
        LinkOutcome, ensure_dirs, ensure_ephemeral_dirs, link_agents_dir, remove_legacy_paths,
    },
    reclaim::{
        AGGRESSIVE_THRESHOLD, CleanupMode, CleanupReport, DIAGNOSTIC_THRESHOLD, needs_diagnostics,
        run_cleanup,
    },
};
