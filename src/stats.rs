use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current: u64,
    pub total: u64,
}

impl Progress {
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.current as f64 / self.total as f64 * 100.0
        }
    }
}

pub type ProgressFn = Arc<dyn Fn(Progress) + Send + Sync>;

pub fn report(progress: Option<&ProgressFn>, current: u64, total: u64) {
    if let Some(callback) = progress {
        callback(Progress { current, total });
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ArchiveStats {
    pub start_time: DateTime<Utc>,
    pub elapsed: Duration,
    pub original_size: u64,
    pub compressed_size: u64,
    pub files_processed: u64,
}

impl ArchiveStats {
    pub fn new() -> Self {
        ArchiveStats {
            start_time: Utc::now(),
            elapsed: Duration::ZERO,
            original_size: 0,
            compressed_size: 0,
            files_processed: 0,
        }
    }

    pub fn end(&mut self) -> Duration {
        let delta = Utc::now() - self.start_time;
        self.elapsed = delta.to_std().unwrap_or_default();
        self.elapsed
    }

    /// Space saved, as a percentage of the original size.
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio(&self) -> f64 {
        if self.original_size == 0 {
            0.0
        } else {
            (1.0 - self.compressed_size as f64 / self.original_size as f64) * 100.0
        }
    }
}

impl Default for ArchiveStats {
    fn default() -> Self {
        ArchiveStats::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{ArchiveStats, Progress};

    #[test]
    fn ratio_of_empty_archive_is_zero() {
        assert!(ArchiveStats::new().ratio().abs() < f64::EPSILON);
    }

    #[test]
    fn ratio_is_space_saved() {
        let mut stats = ArchiveStats::new();
        stats.original_size = 200;
        stats.compressed_size = 50;
        assert!((stats.ratio() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn progress_percent() {
        let progress = Progress {
            current: 1,
            total: 4,
        };
        assert!((progress.percent() - 25.0).abs() < 1e-9);
        let empty = Progress {
            current: 0,
            total: 0,
        };
        assert!(empty.percent().abs() < f64::EPSILON);
    }
}
