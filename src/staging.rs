use chrono::Local;
use log::debug;
use std::path::PathBuf;

/// Transient files belonging to one run.
///
/// Names carry a sub-second timestamp so concurrent runs sharing a working directory do not
/// collide. Every path handed out is removed by [`StagingArea::cleanup`], which also runs on
/// drop.
#[derive(Debug)]
pub struct StagingArea {
    dir: PathBuf,
    stamp: String,
    created: Vec<PathBuf>,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_stamp(dir, Local::now().format("%H%M%S%6f").to_string())
    }

    fn with_stamp(dir: impl Into<PathBuf>, stamp: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            stamp: stamp.into(),
            created: Vec::new(),
        }
    }

    #[cfg(test)]
    fn stamp(&self) -> &str {
        &self.stamp
    }

    /// Reserves `<prefix>_<stamp>.<ext>` and registers it for cleanup.
    fn reserve(&mut self, prefix: &str, ext: &str) -> PathBuf {
        let path = self.dir.join(format!("{}_{}.{}", prefix, self.stamp, ext));
        if !self.created.contains(&path) {
            self.created.push(path.clone());
        }
        path
    }

    /// Path the CSV response body is streamed into.
    pub fn csv_path(&mut self) -> PathBuf {
        self.reserve("output", "csv")
    }

    #[cfg(test)]
    fn paths(&self) -> &[PathBuf] {
        &self.created
    }

    /// Best-effort removal of every reserved file. Failures are only logged.
    pub fn cleanup(&mut self) {
        for path in self.created.drain(..) {
            if !path.exists() {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("removed {}", path.display()),
                Err(e) => debug!("could not remove {}: {}", path.display(), e),
            }
        }
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_stamped_and_scoped_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut staging = StagingArea::with_stamp(dir.path(), "101530123456");
        let csv = staging.csv_path();
        assert_eq!(csv, dir.path().join("output_101530123456.csv"));
        assert_eq!(staging.csv_path(), csv);
        assert_eq!(staging.paths().len(), 1);
    }

    #[test]
    fn default_stamp_has_sub_second_precision() {
        let staging = StagingArea::new(".");
        assert_eq!(staging.stamp().len(), 12);
        assert!(staging.stamp().chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn cleanup_removes_created_files_and_tolerates_missing_ones() {
        let dir = tempfile::tempdir().unwrap();
        let mut staging = StagingArea::with_stamp(dir.path(), "1");
        let csv = staging.csv_path();
        let never_written = staging.reserve("cookies", "txt");
        std::fs::write(&csv, "a,b\n").unwrap();

        staging.cleanup();
        assert!(!csv.exists());
        assert!(!never_written.exists());
        assert!(staging.paths().is_empty());

        // A second pass has nothing left to do.
        staging.cleanup();
    }

    #[test]
    fn drop_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let csv = {
            let mut staging = StagingArea::with_stamp(dir.path(), "2");
            let csv = staging.csv_path();
            std::fs::write(&csv, "x").unwrap();
            csv
        };
        assert!(!csv.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
