//! In-memory fingerprint → file name index.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use tracing::{debug, warn};

use super::Fingerprint;

/// Maps content fingerprints to the name of the file that first held them.
///
/// Lookups and registrations may race; the first committed registration of a
/// fingerprint wins and later ones are ignored.
#[derive(Debug, Default)]
pub struct DuplicateIndex {
    entries: RwLock<HashMap<Fingerprint, String>>,
}

impl DuplicateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint the named files inside `dir`.
    ///
    /// Blocking; `names` usually comes from
    /// [`StorageSink::list`](crate::storage::StorageSink::list). Files that
    /// cannot be read are skipped. Returns the number of new fingerprints added.
    pub fn seed<S: AsRef<str>>(&self, dir: &Path, names: &[S]) -> usize {
        let mut added = 0;
        for name in names {
            let name = name.as_ref();
            let path = dir.join(name);
            match Fingerprint::of_file(&path) {
                Ok(fingerprint) => {
                    if self.register_fingerprint(fingerprint, name) {
                        added += 1;
                    }
                }
                Err(e) => warn!("Skipping unreadable file {}: {}", path.display(), e),
            }
        }

        debug!("Seeded {} fingerprints from {}", added, dir.display());
        added
    }

    /// Name of the file already holding `content`, if any.
    pub fn check(&self, content: &[u8]) -> Option<String> {
        self.lookup(&Fingerprint::of(content))
    }

    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(fingerprint).cloned()
    }

    /// Record `content` under `name`. Returns false if it was already known.
    pub fn register(&self, content: &[u8], name: &str) -> bool {
        self.register_fingerprint(Fingerprint::of(content), name)
    }

    pub fn register_fingerprint(&self, fingerprint: Fingerprint, name: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match entries.entry(fingerprint) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(name.to_string());
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    use crate::storage::{FsStorage, StorageSink};

    #[test]
    fn test_seed_distinct_files() {
        let dir = tempdir().unwrap();
        let names: Vec<String> = (0..4).map(|i| format!("{}.png", i)).collect();
        for (i, name) in names.iter().enumerate() {
            std::fs::write(dir.path().join(name), format!("image {}", i)).unwrap();
        }

        let index = DuplicateIndex::new();
        assert_eq!(index.seed(dir.path(), &names), 4);
        assert_eq!(index.len(), 4);

        // Fresh bytes equal to a seeded file are reported once, by name
        assert_eq!(index.check(b"image 2"), Some("2.png".to_string()));
        assert_eq!(index.check(b"image 9"), None);
    }

    #[test]
    fn test_seed_identical_files_keeps_first() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"same").unwrap();
        std::fs::write(dir.path().join("b.jpg"), b"same").unwrap();

        let index = DuplicateIndex::new();
        assert_eq!(index.seed(dir.path(), &["a.jpg", "b.jpg"]), 1);
        assert_eq!(index.check(b"same"), Some("a.jpg".to_string()));
    }

    #[tokio::test]
    async fn test_seed_from_storage_listing_ignores_subdirectories() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("x.gif"), b"hidden").unwrap();
        std::fs::write(dir.path().join("top.gif"), b"visible").unwrap();

        let names = FsStorage.list(dir.path()).await.unwrap();
        let index = DuplicateIndex::new();
        assert_eq!(index.seed(dir.path(), &names), 1);
        assert!(index.check(b"hidden").is_none());
        assert_eq!(index.check(b"visible"), Some("top.gif".to_string()));
    }

    #[test]
    fn test_seed_skips_unreadable_names() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("kept.png"), b"kept").unwrap();

        let index = DuplicateIndex::new();
        assert_eq!(index.seed(dir.path(), &["gone.png", "kept.png"]), 1);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_first_registration_wins() {
        let index = DuplicateIndex::new();
        assert!(index.register(b"payload", "first.webm"));
        assert!(!index.register(b"payload", "second.webm"));
        assert_eq!(index.check(b"payload"), Some("first.webm".to_string()));
    }

    #[test]
    fn test_concurrent_registration_single_winner() {
        let index = Arc::new(DuplicateIndex::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let index = index.clone();
                std::thread::spawn(move || index.register(b"contended", &format!("{}.png", i)))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(index.len(), 1);
    }
}
