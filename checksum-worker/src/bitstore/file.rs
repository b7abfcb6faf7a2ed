use super::{BitstreamStore, RetrieveError};
use crate::db::{MetadataRepository, StorageError};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directory levels derived from the internal id
const DIRECTORY_LEVELS: usize = 3;
/// Characters per directory level
const DIGITS_PER_LEVEL: usize = 2;

/// Assetstore on the local filesystem
///
/// A bitstream with internal id `1234567890` lives at
/// `<root>/12/34/56/1234567890`. Ids of six characters or fewer, and
/// non-ASCII ids, cannot be split and are stored directly under the root.
pub struct FileBitstreamStore {
    root: PathBuf,
    repo: Arc<dyn MetadataRepository>,
}

impl FileBitstreamStore {
    pub fn new(root: impl Into<PathBuf>, repo: Arc<dyn MetadataRepository>) -> Self {
        Self {
            root: root.into(),
            repo,
        }
    }

    /// Location of an internal id under `root`; `None` for ids that would escape it
    pub fn path_for(root: &Path, internal_id: &str) -> Option<PathBuf> {
        if internal_id.is_empty()
            || internal_id.starts_with('.')
            || internal_id.contains(['/', '\\'])
        {
            return None;
        }

        let mut path = root.to_path_buf();
        if internal_id.len() > DIRECTORY_LEVELS * DIGITS_PER_LEVEL && internal_id.is_ascii() {
            for level in 0..DIRECTORY_LEVELS {
                let start = level * DIGITS_PER_LEVEL;
                path.push(&internal_id[start..start + DIGITS_PER_LEVEL]);
            }
        }
        path.push(internal_id);
        Some(path)
    }
}

impl BitstreamStore for FileBitstreamStore {
    fn retrieve(&self, bitstream_id: u64) -> Result<Box<dyn Read + '_>, RetrieveError> {
        let info = self
            .repo
            .load_bitstream(bitstream_id)?
            .ok_or(StorageError::BitstreamNotFound(bitstream_id))?;

        let path = Self::path_for(&self.root, &info.internal_id)
            .ok_or(RetrieveError::NotFound(bitstream_id))?;

        match File::open(&path) {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(bitstream_id, path = %path.display(), "Bitstream file missing");
                Err(RetrieveError::NotFound(bitstream_id))
            }
            Err(e) => Err(RetrieveError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ChecksumStorage;
    use shared::BitstreamInfo;

    fn register(storage: &ChecksumStorage, id: u64, internal_id: &str) {
        storage
            .register_bitstream(
                &BitstreamInfo {
                    bitstream_id: id,
                    internal_id: internal_id.to_string(),
                    checksum: String::new(),
                    checksum_algorithm: "MD5".to_string(),
                    deleted: false,
                },
                None,
            )
            .unwrap();
    }

    #[test]
    fn test_path_layout() {
        let root = Path::new("/assets");
        assert_eq!(
            FileBitstreamStore::path_for(root, "1234567890").unwrap(),
            PathBuf::from("/assets/12/34/56/1234567890")
        );
        assert_eq!(
            FileBitstreamStore::path_for(root, "1234").unwrap(),
            PathBuf::from("/assets/1234")
        );
        assert_eq!(
            FileBitstreamStore::path_for(root, "123456").unwrap(),
            PathBuf::from("/assets/123456")
        );
        assert_eq!(
            FileBitstreamStore::path_for(root, "éé1234567").unwrap(),
            PathBuf::from("/assets/éé1234567")
        );
        assert!(FileBitstreamStore::path_for(root, "../etc/passwd").is_none());
        assert!(FileBitstreamStore::path_for(root, "").is_none());
    }

    #[test]
    fn test_retrieve_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ChecksumStorage::open_in_memory().unwrap();
        register(&storage, 1, "1234567890");

        let path = FileBitstreamStore::path_for(dir.path(), "1234567890").unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"hello").unwrap();

        let store = FileBitstreamStore::new(dir.path(), Arc::new(storage));
        let mut content = String::new();
        store.retrieve(1).unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello");
    }

    #[test]
    fn test_retrieve_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ChecksumStorage::open_in_memory().unwrap();
        register(&storage, 1, "1234567890");

        let store = FileBitstreamStore::new(dir.path(), Arc::new(storage));
        assert!(matches!(store.retrieve(1), Err(RetrieveError::NotFound(1))));
    }

    #[test]
    fn test_retrieve_without_metadata_is_repository_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ChecksumStorage::open_in_memory().unwrap();

        let store = FileBitstreamStore::new(dir.path(), Arc::new(storage));
        assert!(matches!(
            store.retrieve(7),
            Err(RetrieveError::Repository(StorageError::BitstreamNotFound(7)))
        ));
    }
}
