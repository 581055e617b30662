//! Oldest-first eviction for the gallery directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// File name prefix of persisted photos.
pub const ITEM_PREFIX: &str = "photo_";
/// File name extension of persisted photos.
pub const ITEM_EXTENSION: &str = "jpg";

/// Returns true if `name` looks like a persisted gallery photo.
pub fn is_item_name(name: &str) -> bool {
    name.starts_with(ITEM_PREFIX)
        && name.ends_with(&format!(".{ITEM_EXTENSION}"))
        && !name.contains(['/', '\\'])
        && name != ".."
}

/// A gallery file with its modification time.
#[derive(Debug, Clone)]
pub(crate) struct StoredFile {
    pub name: String,
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Lists persisted photos in `dir` in no particular order.
pub(crate) fn list_items(dir: &Path) -> io::Result<Vec<StoredFile>> {
    let mut items = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_item_name(&name) {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        items.push(StoredFile {
            name,
            path: entry.path(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        });
    }
    Ok(items)
}

/// Deletes the oldest photos until at most `limit` remain.
///
/// Age is the file modification time; ties fall back to the name, which
/// encodes the creation timestamp. Returns the names of evicted files,
/// oldest first. Running it again without new photos evicts nothing.
pub(crate) fn evict_oldest(dir: &Path, limit: usize) -> io::Result<Vec<String>> {
    let mut items = list_items(dir)?;
    if items.len() <= limit {
        return Ok(Vec::new());
    }

    items.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)));

    let excess = items.len() - limit;
    let mut evicted = Vec::with_capacity(excess);
    for item in items.into_iter().take(excess) {
        match fs::remove_file(&item.path) {
            Ok(()) => {}
            // Already gone: the goal state is reached either way
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        tracing::info!(photo = %item.name, "Deleted old photo");
        evicted.push(item.name);
    }
    Ok(evicted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn touch(dir: &Path, name: &str, age_secs: u64) {
        let file = File::create(dir.join(name)).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        file.set_modified(mtime).unwrap();
    }

    #[test]
    fn test_item_names() {
        assert!(is_item_name("photo_1700000000000.jpg"));
        assert!(!is_item_name("temp.jpg"));
        assert!(!is_item_name("photo_1.png"));
        assert!(!is_item_name("photo_/../x.jpg"));
    }

    #[test]
    fn test_evicts_by_mtime_not_name() {
        let dir = tempfile::tempdir().unwrap();
        // Name order disagrees with age order on purpose
        touch(dir.path(), "photo_3.jpg", 300);
        touch(dir.path(), "photo_1.jpg", 100);
        touch(dir.path(), "photo_2.jpg", 200);
        touch(dir.path(), "notes.txt", 1000);

        let evicted = evict_oldest(dir.path(), 1).unwrap();

        assert_eq!(evicted, vec!["photo_3.jpg", "photo_2.jpg"]);
        assert!(dir.path().join("photo_1.jpg").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_under_limit_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "photo_1.jpg", 10);
        touch(dir.path(), "photo_2.jpg", 5);

        assert!(evict_oldest(dir.path(), 2).unwrap().is_empty());
        assert!(evict_oldest(dir.path(), 5).unwrap().is_empty());
        assert_eq!(list_items(dir.path()).unwrap().len(), 2);
    }

    #[test]
    fn test_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            touch(dir.path(), &format!("photo_{i}.jpg"), 100 - i);
        }

        assert_eq!(evict_oldest(dir.path(), 3).unwrap().len(), 2);
        assert!(evict_oldest(dir.path(), 3).unwrap().is_empty());
        assert_eq!(list_items(dir.path()).unwrap().len(), 3);
    }
}
