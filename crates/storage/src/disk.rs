//! Disk usage readings for the persistent volume.

use std::path::{Path, PathBuf};

use {sysinfo::Disks, walkdir::WalkDir};

/// Space figures of the filesystem mounted at `mount_point`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskUsage {
    pub mount_point: PathBuf,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl DiskUsage {
    /// Used space as a percentage (0-100), rounded up like `df`'s `Use%`.
    #[must_use]
    pub fn used_percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 0;
        }
        let used = u128::from(self.total_bytes.saturating_sub(self.available_bytes));
        let percent = (used * 100).div_ceil(u128::from(self.total_bytes));
        u8::try_from(percent.min(100)).unwrap_or(100)
    }
}

/// Source of usage readings, so the reclaimer can be driven with fixed numbers.
pub trait DiskUsageSource: Send + Sync {
    fn usage(&self, path: &Path) -> Option<DiskUsage>;

    fn used_percent(&self, path: &Path) -> Option<u8> {
        self.usage(path).map(|u| u.used_percent())
    }
}

/// Reads mounted filesystems through `sysinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDisks;

impl DiskUsageSource for SystemDisks {
    fn usage(&self, path: &Path) -> Option<DiskUsage> {
        let disks = Disks::new_with_refreshed_list();
        let candidates = disks.list().iter().map(|d| DiskUsage {
            mount_point: d.mount_point().to_path_buf(),
            total_bytes: d.total_space(),
            available_bytes: d.available_space(),
        });
        let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        disk_for_path(candidates, &resolved)
    }
}

/// Used-space percentage of the filesystem holding `path`, if it can be found.
pub fn usage_percent(path: &Path) -> Option<u8> {
    SystemDisks.used_percent(path)
}

/// Pick the filesystem whose mount point is the longest prefix of `path`.
fn disk_for_path(candidates: impl Iterator<Item = DiskUsage>, path: &Path) -> Option<DiskUsage> {
    candidates
        .filter(|d| path.starts_with(&d.mount_point))
        .max_by_key(|d| d.mount_point.components().count())
}

/// The `limit` largest top-level entries under `root`, largest first.
///
/// Sizes are apparent file sizes summed recursively without following links.
pub fn top_entries(root: &Path, limit: usize) -> Vec<(PathBuf, u64)> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut sized: Vec<(PathBuf, u64)> = entries
        .flatten()
        .map(|e| {
            let path = e.path();
            let size = tree_size(&path);
            (path, size)
        })
        .collect();
    sized.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sized.truncate(limit);
    sized
}

fn tree_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .flatten()
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum()
}

/// Human-readable size, `du -h` style.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "K", "M", "G", "T"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes}B")
    } else {
        format!("{value:.1}{}", UNITS[unit])
    }
}
