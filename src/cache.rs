use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use tracing::{info, warn};

use crate::data;
use crate::error::DashboardError;
use crate::types::Table;

struct CacheEntry {
    modified: SystemTime,
    table: Arc<Table>,
    /// Modification time of a version that failed to load; not retried until it changes.
    rejected: Option<SystemTime>,
}

/// Holds the loaded table keyed by the source file's modification time.
pub struct TableCache {
    path: PathBuf,
    sheet: Option<String>,
    entry: Mutex<Option<CacheEntry>>,
}

impl TableCache {
    pub fn new(path: impl Into<PathBuf>, sheet: Option<String>) -> Self {
        TableCache { path: path.into(), sheet, entry: Mutex::new(None) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the cached table, reloading first if the file changed on disk.
    ///
    /// A failed reload keeps serving the previously loaded table.
    pub fn get(&self) -> Result<Arc<Table>, DashboardError> {
        let mut entry = self.entry.lock().unwrap_or_else(PoisonError::into_inner);

        let modified = match modified_time(&self.path) {
            Ok(m) => m,
            Err(err) => {
                return match entry.as_ref() {
                    Some(cached) => {
                        warn!(error = %err, "Data file unavailable, serving cached table");
                        Ok(cached.table.clone())
                    }
                    None => Err(err),
                };
            }
        };

        if let Some(cached) = entry.as_ref() {
            if cached.modified == modified || cached.rejected == Some(modified) {
                return Ok(cached.table.clone());
            }
            info!(path = ?self.path, "Data file changed, reloading");
        }

        match data::load_table(&self.path, self.sheet.as_deref()) {
            Ok(table) => {
                let table = Arc::new(table);
                *entry = Some(CacheEntry { modified, table: table.clone(), rejected: None });
                Ok(table)
            }
            Err(err) => match entry.as_mut() {
                Some(cached) => {
                    warn!(error = %err, "Reload failed, serving cached table until the file changes");
                    cached.rejected = Some(modified);
                    Ok(cached.table.clone())
                }
                None => Err(err),
            },
        }
    }

}

fn modified_time(path: &Path) -> Result<SystemTime, DashboardError> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| DashboardError::Io { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, record};
    use std::fs::{self, File};
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(path: &Path, offset_secs: u64) -> SystemTime {
        let when = SystemTime::now() + Duration::from_secs(offset_secs);
        set_modified(path, when);
        when
    }

    fn set_modified(path: &Path, when: SystemTime) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(when).unwrap();
    }

    #[test]
    fn unchanged_file_is_served_from_cache() {
        let dir = TempDir::new().unwrap();
        let path = fixtures::write_csv(&dir, &fixtures::sample_records());
        let cache = TableCache::new(&path, None);

        let first = cache.get().unwrap();
        let second = cache.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.row_count(), 5);
    }

    #[test]
    fn modified_file_is_reloaded() {
        let dir = TempDir::new().unwrap();
        let path = fixtures::write_csv(&dir, &fixtures::sample_records());
        let cache = TableCache::new(&path, None);
        let first = cache.get().unwrap();

        fixtures::write_csv(&dir, &[record(None, "A", "Santos", "Urbana", Some(1.0), [0.0; 4])]);
        touch(&path, 60);

        let second = cache.get().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.row_count(), 1);
    }

    #[test]
    fn broken_reload_keeps_previous_table() {
        let dir = TempDir::new().unwrap();
        let path = fixtures::write_csv(&dir, &fixtures::sample_records());
        let cache = TableCache::new(&path, None);
        cache.get().unwrap();

        fs::write(&path, "Cidade\nSantos\n").unwrap();
        touch(&path, 120);
        assert_eq!(cache.get().unwrap().row_count(), 5);

        fs::remove_file(&path).unwrap();
        assert_eq!(cache.get().unwrap().row_count(), 5);
    }

    #[test]
    fn missing_file_without_cache_is_an_error() {
        let cache = TableCache::new("/nonexistent/dados.csv", None);
        assert!(matches!(cache.get(), Err(DashboardError::Io { .. })));
    }

    #[test]
    fn rejected_version_is_not_reparsed() {
        let dir = TempDir::new().unwrap();
        let path = fixtures::write_csv(&dir, &fixtures::sample_records());
        let cache = TableCache::new(&path, None);
        let first = cache.get().unwrap();

        fs::write(&path, "Cidade\nSantos\n").unwrap();
        let broken_at = touch(&path, 120);
        assert!(Arc::ptr_eq(&first, &cache.get().unwrap()));

        // Valid content under the rejected timestamp is not picked up.
        fixtures::write_csv(&dir, &[record(None, "A", "Santos", "Urbana", Some(1.0), [0.0; 4])]);
        set_modified(&path, broken_at);
        assert!(Arc::ptr_eq(&first, &cache.get().unwrap()));

        touch(&path, 180);
        assert_eq!(cache.get().unwrap().row_count(), 1);
    }
}
