use std::path::{Path, PathBuf};

use nix::sys::statvfs::statvfs;
use serde::Serialize;

use crate::error::Result;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

impl DiskUsage {
    #[allow(clippy::cast_precision_loss)]
    pub fn percent_used(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.used as f64 / self.total as f64 * 100.0
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Drive {
    pub name: String,
    pub path: PathBuf,
    pub usage: Option<DiskUsage>,
    pub error: Option<String>,
}

impl Drive {
    fn at(name: &str, path: PathBuf) -> Self {
        let (usage, error) = match disk_usage(&path) {
            Ok(usage) => (Some(usage), None),
            Err(err) => (None, Some(err.to_string())),
        };

        Drive {
            name: name.to_owned(),
            path,
            usage,
            error,
        }
    }
}

/// Usage of the filesystem containing `path`. `free` counts the blocks
/// available to unprivileged users.
#[allow(clippy::useless_conversion)]
pub fn disk_usage(path: &Path) -> Result<DiskUsage> {
    let stat = statvfs(path)?;
    let fragment_size = u64::from(stat.fragment_size());
    let total = u64::from(stat.blocks()) * fragment_size;
    let free = u64::from(stat.blocks_available()) * fragment_size;
    let used = total.saturating_sub(u64::from(stat.blocks_free()) * fragment_size);

    Ok(DiskUsage { total, used, free })
}

/// The root filesystem and the home directory.
pub fn drives() -> Vec<Drive> {
    let mut drives = vec![Drive::at("Root (/)", PathBuf::from("/"))];
    if let Some(home) = dirs::home_dir() {
        drives.push(Drive::at("Home", home));
    }

    drives
}
