use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::models::{CompetitorBoard, DailySnapshot, MarketIndicators, StoredSnapshot};

pub const RAW_POOLS_FILE: &str = "pools_raw.json";
pub const MARKET_FILE: &str = "market.json";
pub const COMPETITORS_FILE: &str = "competitors.json";
pub const SUMMARY_FILE: &str = "summary.json";
pub const LATEST: &str = "latest";

/// Everything written into one date directory.
pub struct SnapshotArtifacts<'a> {
    pub raw_pages: &'a [serde_json::Value],
    pub market: &'a MarketIndicators,
    pub competitors: &'a CompetitorBoard,
    pub summary: &'a DailySnapshot<'a>,
}

/// Date-partitioned snapshot store.
///
/// Layout: `<root>/<YYYY-MM-DD>/{pools_raw,market,competitors,summary}.json`
/// plus a `latest` pointer at the most recently published date. A date
/// directory only appears once all of its files are fully written, and
/// `latest` is swapped by rename so readers never see a half-published day.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

fn validate_date(date: &str) -> Result<(), StoreError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| StoreError::InvalidDate(date.to_string()))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let file = File::create(path).map_err(|e| StoreError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| StoreError::json(path, e))?;
    writer.flush().map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

fn remove_dir_if_present(path: &Path) -> Result<(), StoreError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn date_dir(&self, date: &str) -> PathBuf {
        self.root.join(date)
    }

    pub fn exists(&self, date: &str) -> bool {
        self.date_dir(date).exists()
    }

    /// Write all artifacts for `date`, then repoint `latest` unless it
    /// already names a newer date.
    ///
    /// An already published date is left alone unless `force` is set.
    pub fn publish(&self, date: &str, artifacts: &SnapshotArtifacts<'_>, force: bool) -> Result<PathBuf, StoreError> {
        validate_date(date)?;

        let target = self.date_dir(date);
        if self.exists(date) && !force {
            return Err(StoreError::AlreadyPublished(date.to_string()));
        }

        fs::create_dir_all(&self.root).map_err(|e| StoreError::io(&self.root, e))?;

        let staging = self.root.join(format!(".staging-{date}"));
        remove_dir_if_present(&staging)?;
        fs::create_dir_all(&staging).map_err(|e| StoreError::io(&staging, e))?;

        let written = self.write_artifacts(&staging, artifacts);
        if let Err(e) = written {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        if target.exists() {
            self.swap_into_place(&staging, &target, date)?;
        } else {
            fs::rename(&staging, &target).map_err(|e| StoreError::io(&target, e))?;
        }

        match self.latest_date() {
            Ok(Some(current)) if current.as_str() > date => {
                tracing::info!("  latest stays at {} (backfilled {})", current, date);
            }
            _ => self.point_latest(date)?,
        }
        tracing::info!("💾 Snapshot published: {}", target.display());

        Ok(target)
    }

    fn write_artifacts(&self, dir: &Path, artifacts: &SnapshotArtifacts<'_>) -> Result<(), StoreError> {
        write_json(&dir.join(RAW_POOLS_FILE), artifacts.raw_pages)?;
        write_json(&dir.join(MARKET_FILE), artifacts.market)?;
        write_json(&dir.join(COMPETITORS_FILE), artifacts.competitors)?;
        write_json(&dir.join(SUMMARY_FILE), artifacts.summary)?;
        Ok(())
    }

    /// Replace an existing date directory. The old copy is restored if the
    /// new one cannot be moved in.
    fn swap_into_place(&self, staging: &Path, target: &Path, date: &str) -> Result<(), StoreError> {
        let retired = self.root.join(format!(".replaced-{date}"));
        remove_dir_if_present(&retired)?;

        fs::rename(target, &retired).map_err(|e| StoreError::io(target, e))?;
        if let Err(e) = fs::rename(staging, target) {
            let _ = fs::rename(&retired, target);
            return Err(StoreError::io(target, e));
        }

        if let Err(e) = fs::remove_dir_all(&retired) {
            tracing::warn!("⚠️ Could not remove replaced snapshot {}: {}", retired.display(), e);
        }
        tracing::debug!("Replaced existing snapshot for {}", date);
        Ok(())
    }

    #[cfg(unix)]
    fn point_latest(&self, date: &str) -> Result<(), StoreError> {
        let tmp = self.root.join(format!(".{LATEST}.tmp"));
        if fs::symlink_metadata(&tmp).is_ok() {
            fs::remove_file(&tmp).map_err(|e| StoreError::io(&tmp, e))?;
        }
        // relative target keeps the data dir relocatable
        std::os::unix::fs::symlink(date, &tmp).map_err(|e| StoreError::io(&tmp, e))?;

        let latest = self.root.join(LATEST);
        fs::rename(&tmp, &latest).map_err(|e| StoreError::io(&latest, e))
    }

    #[cfg(not(unix))]
    fn point_latest(&self, date: &str) -> Result<(), StoreError> {
        let tmp = self.root.join(format!(".{LATEST}.tmp"));
        fs::write(&tmp, date).map_err(|e| StoreError::io(&tmp, e))?;

        let latest = self.root.join(LATEST);
        fs::rename(&tmp, &latest).map_err(|e| StoreError::io(&latest, e))
    }

    /// Date the `latest` pointer resolves to. Accepts either a symlink or a
    /// plain pointer file holding the date.
    pub fn latest_date(&self) -> Result<Option<String>, StoreError> {
        let latest = self.root.join(LATEST);
        let meta = match fs::symlink_metadata(&latest) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&latest, e)),
        };

        let date = if meta.file_type().is_symlink() {
            let target = fs::read_link(&latest).map_err(|e| StoreError::io(&latest, e))?;
            target.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        } else if meta.is_file() {
            fs::read_to_string(&latest)
                .map_err(|e| StoreError::io(&latest, e))?
                .trim()
                .to_string()
        } else {
            String::new()
        };

        Ok(validate_date(&date).ok().map(|_| date))
    }

    fn read_summary<T: DeserializeOwned>(&self, date: &str) -> Result<Option<T>, StoreError> {
        validate_date(date)?;

        let path = self.date_dir(date).join(SUMMARY_FILE);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        let value = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| StoreError::json(&path, e))?;
        Ok(Some(value))
    }

    /// Read back the summary document for `date`, if one was published.
    pub fn load(&self, date: &str) -> Result<Option<StoredSnapshot>, StoreError> {
        self.read_summary(date)
    }

    /// The summary exactly as published, ranking views included.
    pub fn load_document(&self, date: &str) -> Result<Option<serde_json::Value>, StoreError> {
        self.read_summary(date)
    }

    pub fn load_latest(&self) -> Result<Option<StoredSnapshot>, StoreError> {
        match self.latest_date()? {
            Some(date) => self.load(&date),
            None => Ok(None),
        }
    }

    /// Published dates, newest first. Staging leftovers and `latest` are skipped.
    pub fn list_dates(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.root, e)),
        };

        let mut dates: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| validate_date(name).is_ok())
            .collect();

        dates.sort_unstable_by(|a, b| b.cmp(a));
        Ok(dates)
    }
}
