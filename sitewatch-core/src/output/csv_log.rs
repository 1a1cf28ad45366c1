//! Append-only CSV log of check results.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::check::{CheckResult, CSV_HEADER};
use crate::error::{Result, WatchError};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(15);
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Appends rows to the results log.
///
/// Writers in this process queue on a mutex; writers in other processes are
/// excluded by an advisory lock on `<log>.lock`.
#[derive(Debug)]
pub struct CsvLog {
    path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
    guard: Mutex<()>,
}

impl CsvLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_name = path.as_os_str().to_owned();
        lock_name.push(".lock");

        Self {
            path,
            lock_path: PathBuf::from(lock_name),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            guard: Mutex::new(()),
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Append one row per record, writing the header first if the log is
    /// missing or empty. Returns the number of rows written.
    pub async fn append(&self, records: &[CheckResult]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let _guard = self.guard.lock().await;

        let rows: Vec<[String; 15]> = records.iter().map(CheckResult::to_row).collect();
        let path = self.path.clone();
        let lock_path = self.lock_path.clone();
        let lock_timeout = self.lock_timeout;

        let written = tokio::task::spawn_blocking(move || {
            append_locked(&path, &lock_path, lock_timeout, &rows)
        })
        .await
        .map_err(|e| WatchError::Other(format!("log writer task failed: {}", e)))??;

        info!(path = %self.path.display(), rows = written, "Results appended");
        Ok(written)
    }
}

fn append_locked(
    path: &Path,
    lock_path: &Path,
    lock_timeout: Duration,
    rows: &[[String; 15]],
) -> Result<usize> {
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path)?;
    acquire(&lock_file, lock_path, lock_timeout)?;

    let result = write_rows(path, rows);

    if let Err(e) = FileExt::unlock(&lock_file) {
        debug!(error = %e, "Releasing log lock failed");
    }
    result
}

fn acquire(lock_file: &File, lock_path: &Path, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        match lock_file.try_lock_exclusive() {
            Ok(()) => return Ok(()),
            Err(e) => {
                if Instant::now() >= deadline {
                    debug!(error = %e, "Gave up waiting for log lock");
                    return Err(WatchError::LockTimeout(lock_path.to_path_buf()));
                }
                std::thread::sleep(LOCK_POLL_INTERVAL);
            }
        }
    }
}

fn write_rows(path: &Path, rows: &[[String; 15]]) -> Result<usize> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let write_header = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    if write_header {
        writer.write_record(CSV_HEADER)?;
    }
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;

    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(name: &str, notes: &str) -> CheckResult {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let mut record = CheckResult::initial(name, "https://example.org", at);
        record.notes = notes.to_string();
        record
    }

    #[tokio::test]
    async fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = CsvLog::new(dir.path().join("log.csv"));

        log.append(&[record("a", "")]).await.unwrap();
        log.append(&[record("b", ""), record("c", "")]).await.unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("DateTime,Website Name,URL,Status,Ping (ms)"));
        assert_eq!(contents.matches("DateTime").count(), 1);
    }

    #[tokio::test]
    async fn test_notes_with_commas_stay_in_one_field() {
        let dir = tempfile::tempdir().unwrap();
        let log = CsvLog::new(dir.path().join("log.csv"));
        log.append(&[record("a", "Keyword 'a, b' not found in content.")])
            .await
            .unwrap();

        let mut reader = csv::Reader::from_path(log.path()).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 15);
        assert_eq!(&rows[0][14], "Keyword 'a, b' not found in content.");
    }

    #[tokio::test]
    async fn test_empty_append_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let log = CsvLog::new(dir.path().join("log.csv"));
        assert_eq!(log.append(&[]).await.unwrap(), 0);
        assert!(!log.path().exists());
    }

    #[tokio::test]
    async fn test_lock_held_elsewhere_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let log = CsvLog::new(dir.path().join("log.csv")).with_lock_timeout(Duration::from_millis(300));

        let holder = File::create(log.lock_path()).unwrap();
        holder.lock_exclusive().unwrap();

        let result = log.append(&[record("a", "")]).await;
        assert!(matches!(result, Err(WatchError::LockTimeout(_))));

        FileExt::unlock(&holder).unwrap();
        assert_eq!(log.append(&[record("a", "")]).await.unwrap(), 1);
    }
}
