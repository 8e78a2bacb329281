//! Directory creation, the `agents` symlink, and legacy path cleanup.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use {
    tracing::{debug, info, warn},
    walkdir::WalkDir,
};

use crate::error::{Context, Error, Result};

/// Paths under the persistent root left behind by the pre-symlink layout.
pub const LEGACY_PATHS: &[&str] = &["workspace", "sessions", "logs", "media", ".cache"];

/// Sibling that receives whatever could not be migrated out of a real `agents/`.
const UNMIGRATED_SUFFIX: &str = "unmigrated";

/// Result of reconciling the `agents` link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Nothing existed at the link path; the link was created.
    Created,
    /// A real directory was moved into the target and replaced by the link.
    Migrated { moved: usize, failed: usize },
    /// A symlink was already in place.
    AlreadyLinked,
}

/// Create every directory in `dirs`. The first failure is returned.
pub fn ensure_dirs(dirs: &[&Path]) -> Result<()> {
    for dir in dirs {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        debug!(dir = %dir.display(), "directory ready");
    }
    Ok(())
}

/// Create the agent workspace and sessions directories on the ephemeral disk.
pub fn ensure_ephemeral_dirs(workspace: &Path, sessions: &Path) -> Result<()> {
    ensure_dirs(&[workspace, sessions])
}

/// Make `link` a symlink to `target`, migrating a real directory if present.
pub fn link_agents_dir(link: &Path, target: &Path) -> Result<LinkOutcome> {
    let meta = match std::fs::symlink_metadata(link) {
        Ok(meta) => Some(meta),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    let outcome = match meta {
        Some(meta) if meta.file_type().is_symlink() => {
            debug!(link = %link.display(), "agents link already in place");
            return Ok(LinkOutcome::AlreadyLinked);
        },
        Some(meta) if meta.is_dir() => {
            std::fs::create_dir_all(target)?;
            let (moved, failed) = migrate_entries(link, target)?;
            clear_migrated_dir(link, failed)?;
            LinkOutcome::Migrated { moved, failed }
        },
        Some(_) => {
            return Err(Error::message(format!(
                "{} exists and is neither a directory nor a symlink",
                link.display()
            )));
        },
        None => {
            std::fs::create_dir_all(target)?;
            if let Some(parent) = link.parent() {
                std::fs::create_dir_all(parent)?;
            }
            LinkOutcome::Created
        },
    };

    symlink_dir(target, link)?;
    info!(
        link = %link.display(),
        target = %target.display(),
        outcome = ?outcome,
        "agents directory linked to ephemeral storage"
    );
    Ok(outcome)
}

/// Delete [`LEGACY_PATHS`] under `root`, skipping any that contain a path in
/// `in_use`. Returns what was removed.
///
/// Every path is attempted; failures are collected into a single error.
pub fn remove_legacy_paths(root: &Path, in_use: &[&Path]) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    let mut failures = Vec::new();
    for name in LEGACY_PATHS {
        let path = root.join(name);
        if in_use.iter().any(|p| p.starts_with(&path)) {
            debug!(path = %path.display(), "legacy path still configured, keeping");
            continue;
        }
        match remove_path(&path) {
            Ok(true) => {
                info!(path = %path.display(), "removed legacy path");
                removed.push(path);
            },
            Ok(false) => {},
            Err(e) => failures.push(format!("{}: {e}", path.display())),
        }
    }

    if failures.is_empty() {
        Ok(removed)
    } else {
        Err(Error::message(format!(
            "failed to remove legacy paths ({} removed): {}",
            removed.len(),
            failures.join("; ")
        )))
    }
}

/// Remove a file, link or directory tree. `Ok(false)` when nothing was there.
fn remove_path(path: &Path) -> std::io::Result<bool> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if meta.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else {
        std::fs::remove_file(path)?;
    }
    Ok(true)
}

/// Move each top-level entry of `src` into `dest`. Per-entry failures are
/// logged and counted, never returned.
fn migrate_entries(src: &Path, dest: &Path) -> Result<(usize, usize)> {
    let mut moved = 0;
    let mut failed = 0;
    for entry in std::fs::read_dir(src)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %src.display(), error = %e, "unreadable entry during migration");
                failed += 1;
                continue;
            },
        };
        let from = entry.path();
        let to = dest.join(entry.file_name());
        match move_path(&from, &to) {
            Ok(()) => moved += 1,
            Err(e) => {
                warn!(from = %from.display(), to = %to.display(), error = %e, "failed to migrate entry");
                failed += 1;
            },
        }
    }
    Ok((moved, failed))
}

/// Rename, falling back to copy + remove when `from` and `to` sit on
/// different filesystems or `to` already exists.
fn move_path(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    copy_recursive(from, to)?;
    if std::fs::symlink_metadata(from)?.is_dir() {
        std::fs::remove_dir_all(from)?;
    } else {
        std::fs::remove_file(from)?;
    }
    Ok(())
}

fn copy_recursive(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(from)?;
        let dest = if rel.as_os_str().is_empty() {
            to.to_path_buf()
        } else {
            to.join(rel)
        };
        let file_type = entry.file_type();
        if file_type.is_dir() {
            std::fs::create_dir_all(&dest)?;
        } else if file_type.is_symlink() {
            let link_target = std::fs::read_link(entry.path())?;
            let _ = std::fs::remove_file(&dest);
            symlink_any(&link_target, &dest)?;
        } else {
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

/// Remove the emptied directory so the link can take its place. Leftovers
/// from failed moves are parked next to it under a free name; if that fails
/// the directory stays where it is and no link is created.
fn clear_migrated_dir(dir: &Path, failed: usize) -> Result<()> {
    if failed == 0 && std::fs::remove_dir(dir).is_ok() {
        return Ok(());
    }
    park_unmigrated(dir, &parking_path(dir))
}

/// First of `agents.unmigrated`, `agents.unmigrated.1`, ... that does not exist.
fn parking_path(dir: &Path) -> PathBuf {
    let mut candidate = dir.with_extension(UNMIGRATED_SUFFIX);
    let mut n = 0u32;
    while std::fs::symlink_metadata(&candidate).is_ok() {
        n += 1;
        candidate = dir.with_extension(format!("{UNMIGRATED_SUFFIX}.{n}"));
    }
    candidate
}

fn park_unmigrated(dir: &Path, parked: &Path) -> Result<()> {
    std::fs::rename(dir, parked).with_context(|| {
        format!(
            "could not park unmigrated files of {} at {}; left in place",
            dir.display(),
            parked.display()
        )
    })?;
    warn!(
        dir = %dir.display(),
        parked = %parked.display(),
        "some agent files could not be migrated; kept aside"
    );
    Ok(())
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link)
        .with_context(|| format!("failed to link {} -> {}", link.display(), target.display()))
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
        .with_context(|| format!("failed to link {} -> {}", link.display(), target.display()))
}

#[cfg(unix)]
fn symlink_any(target: &Path, link: &Path) -> Result<()> {
    Ok(std::os::unix::fs::symlink(target, link)?)
}

#[cfg(windows)]
fn symlink_any(target: &Path, link: &Path) -> Result<()> {
    Ok(std::os::windows::fs::symlink_file(target, link)?)
}
