//! Promotion of the temporary result into a bounded gallery.

use super::retention::{self, is_item_name, ITEM_EXTENSION, ITEM_PREFIX};
use crate::capture::ConfigError;
use crate::state::RunState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors that can occur during gallery operations.
#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("no captured image waiting to be kept")]
    NothingToPromote,
    #[error("invalid gallery item id: {0}")]
    InvalidId(String),
    #[error("gallery item not found: {0}")]
    NotFound(String),
    #[error("gallery i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Gallery storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    /// Directory holding kept photos.
    pub dir: PathBuf,
    /// The single temporary slot for the latest stacked image.
    pub temp_file: PathBuf,
    /// Maximum number of kept photos.
    pub limit: usize,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("static/gallery"),
            temp_file: PathBuf::from("static/temp.jpg"),
            limit: 50,
        }
    }
}

impl GalleryConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit == 0 {
            return Err(ConfigError::InvalidGallery("limit is 0".into()));
        }
        if self.temp_file.parent() == Some(self.dir.as_path()) {
            return Err(ConfigError::InvalidGallery(
                "temp_file must live outside the gallery directory".into(),
            ));
        }
        Ok(())
    }
}

/// A kept photo.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GalleryItem {
    /// File name, `photo_<unix millis>.jpg`.
    pub id: String,
    /// Location on disk.
    #[serde(skip)]
    pub path: PathBuf,
    /// Creation time decoded from the id.
    pub created: DateTime<Utc>,
}

impl GalleryItem {
    fn from_id(id: String, path: PathBuf) -> Option<Self> {
        let millis = id
            .strip_prefix(ITEM_PREFIX)?
            .strip_suffix(ITEM_EXTENSION)?
            .strip_suffix('.')?
            .parse::<i64>()
            .ok()?;
        let created = DateTime::from_timestamp_millis(millis)?;
        Some(Self { id, path, created })
    }
}

fn item_id(millis: i64) -> String {
    format!("{ITEM_PREFIX}{millis:013}.{ITEM_EXTENSION}")
}

/// Manages the temporary slot and the bounded gallery directory.
pub struct GalleryStore {
    config: GalleryConfig,
    state: Arc<RunState>,
    // Serializes promote/discard so the slot is never moved twice.
    op_lock: Mutex<()>,
}

impl GalleryStore {
    /// Opens the store, creating the gallery directory if needed.
    pub fn open(config: GalleryConfig, state: Arc<RunState>) -> Result<Self, GalleryError> {
        std::fs::create_dir_all(&config.dir)?;
        if let Some(parent) = config.temp_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        tracing::debug!(dir = %config.dir.display(), limit = config.limit, "Gallery opened");
        Ok(Self {
            config,
            state,
            op_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &GalleryConfig {
        &self.config
    }

    /// Path of the temporary slot.
    pub fn temp_path(&self) -> &Path {
        &self.config.temp_file
    }

    /// Returns true if a stacked image is waiting in the temporary slot.
    pub fn has_pending(&self) -> bool {
        self.config.temp_file.is_file()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        match self.op_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Moves the temporary image into the gallery and applies retention.
    pub fn promote(&self) -> Result<GalleryItem, GalleryError> {
        let _op = self.lock();

        if !self.has_pending() {
            return Err(GalleryError::NothingToPromote);
        }

        let mut millis = Utc::now().timestamp_millis();
        let mut path = self.config.dir.join(item_id(millis));
        while path.exists() {
            millis += 1;
            path = self.config.dir.join(item_id(millis));
        }

        std::fs::rename(&self.config.temp_file, &path)?;
        self.state.set_capture_done(false);

        let id = item_id(millis);
        tracing::info!(photo = %id, "Kept photo");

        let evicted = retention::evict_oldest(&self.config.dir, self.config.limit)?;
        if !evicted.is_empty() {
            tracing::debug!(count = evicted.len(), "Gallery limit enforced");
        }

        GalleryItem::from_id(id.clone(), path).ok_or(GalleryError::InvalidId(id))
    }

    /// Deletes the temporary image without keeping it.
    pub fn discard(&self) -> Result<(), GalleryError> {
        let _op = self.lock();

        match std::fs::remove_file(&self.config.temp_file) {
            Ok(()) => tracing::info!("Discarded photo"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.state.set_capture_done(false);
        Ok(())
    }

    /// Applies the retention limit, returning the evicted ids.
    pub fn enforce_limit(&self) -> Result<Vec<String>, GalleryError> {
        Ok(retention::evict_oldest(&self.config.dir, self.config.limit)?)
    }

    /// Lists kept photos, newest first.
    pub fn list(&self) -> Result<Vec<GalleryItem>, GalleryError> {
        let mut items: Vec<GalleryItem> = retention::list_items(&self.config.dir)?
            .into_iter()
            .filter_map(|file| GalleryItem::from_id(file.name, file.path))
            .collect();
        items.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(items)
    }

    /// Returns the number of kept photos.
    pub fn count(&self) -> Result<usize, GalleryError> {
        Ok(retention::list_items(&self.config.dir)?.len())
    }

    /// Resolves an item id to its file, rejecting anything outside the gallery.
    pub fn resolve(&self, id: &str) -> Result<PathBuf, GalleryError> {
        if !is_item_name(id) {
            return Err(GalleryError::InvalidId(id.to_string()));
        }
        let path = self.config.dir.join(id);
        if !path.is_file() {
            return Err(GalleryError::NotFound(id.to_string()));
        }
        Ok(path)
    }
}

impl std::fmt::Debug for GalleryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GalleryStore")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::{Duration, SystemTime};

    fn store(dir: &tempfile::TempDir, limit: usize) -> (Arc<RunState>, GalleryStore) {
        let state = Arc::new(RunState::new());
        let config = GalleryConfig {
            dir: dir.path().join("gallery"),
            temp_file: dir.path().join("temp.jpg"),
            limit,
        };
        let store = GalleryStore::open(config, Arc::clone(&state)).unwrap();
        (state, store)
    }

    fn write_temp(store: &GalleryStore, state: &RunState) {
        std::fs::write(store.temp_path(), b"jpeg").unwrap();
        state.set_capture_done(true);
    }

    fn seed(store: &GalleryStore, id: &str, age_secs: u64) {
        let file = File::create(store.config().dir.join(id)).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
    }

    #[test]
    fn test_promote_moves_temp_and_clears_done() {
        let dir = tempfile::tempdir().unwrap();
        let (state, store) = store(&dir, 50);
        write_temp(&store, &state);

        let item = store.promote().unwrap();

        assert!(!store.has_pending());
        assert!(item.path.is_file());
        assert!(item.id.starts_with("photo_"));
        assert!(!state.capture_done());
        assert_eq!(store.resolve(&item.id).unwrap(), item.path);
        assert!((Utc::now() - item.created).num_seconds() < 5);
    }

    #[test]
    fn test_promote_without_temp_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (_state, store) = store(&dir, 50);

        assert!(matches!(store.promote(), Err(GalleryError::NothingToPromote)));
    }

    #[test]
    fn test_rapid_promotions_get_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let (state, store) = store(&dir, 50);

        let mut ids = Vec::new();
        for _ in 0..3 {
            write_temp(&store, &state);
            ids.push(store.promote().unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 3);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_discard_deletes_temp() {
        let dir = tempfile::tempdir().unwrap();
        let (state, store) = store(&dir, 50);
        write_temp(&store, &state);

        store.discard().unwrap();
        assert!(!store.has_pending());
        assert!(!state.capture_done());

        // Nothing pending is not an error
        store.discard().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_promotion_evicts_oldest_over_limit() {
        let dir = tempfile::tempdir().unwrap();
        let (state, store) = store(&dir, 3);
        seed(&store, "photo_0000000000003.jpg", 100);
        seed(&store, "photo_0000000000001.jpg", 300);
        seed(&store, "photo_0000000000002.jpg", 200);

        write_temp(&store, &state);
        let kept = store.promote().unwrap();

        let remaining: Vec<String> = store.list().unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(remaining.len(), 3);
        assert!(!remaining.contains(&"photo_0000000000001.jpg".to_string()));
        assert_eq!(remaining[0], kept.id);
    }

    #[test]
    fn test_count_never_exceeds_limit() {
        let dir = tempfile::tempdir().unwrap();
        let (state, store) = store(&dir, 2);

        for _ in 0..6 {
            write_temp(&store, &state);
            store.promote().unwrap();
            assert!(store.count().unwrap() <= 2);
        }
    }

    #[test]
    fn test_list_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let (_state, store) = store(&dir, 50);
        seed(&store, "photo_1700000000000.jpg", 10);
        seed(&store, "photo_1700000002000.jpg", 10);
        seed(&store, "photo_1700000001000.jpg", 10);

        let ids: Vec<String> = store.list().unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(
            ids,
            vec![
                "photo_1700000002000.jpg",
                "photo_1700000001000.jpg",
                "photo_1700000000000.jpg"
            ]
        );
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let (_state, store) = store(&dir, 50);

        assert!(matches!(
            store.resolve("../temp.jpg"),
            Err(GalleryError::InvalidId(_))
        ));
        assert!(matches!(
            store.resolve("photo_0000000000042.jpg"),
            Err(GalleryError::NotFound(_))
        ));
    }
}
