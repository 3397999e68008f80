//! JSON-file-backed storage backend.
//!
//! The whole mapping lives in one compact JSON object. The file is read on
//! every call and rewritten on every `set` by writing a temporary file in the
//! same directory and renaming it over the original, so the file on disk is
//! always a complete document.

use super::backend::{KeyStream, Store};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::debug;

/// Filename used when no override is configured.
pub const DEFAULT_FILENAME: &str = "json-store.json";

type Document = BTreeMap<String, String>;

/// JSON-file-backed key-value backend.
///
/// # Thread Safety
///
/// `FileStore` is `Clone`; clones share one mutex, so every operation on an
/// instance and its clones is serialized. Separate instances opened on the
/// same path are not coordinated with each other.
#[derive(Clone)]
pub struct FileStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileStore {
    /// Creates a store persisted at `path`.
    ///
    /// Nothing is touched on disk until the first operation; a missing file
    /// reads as an empty mapping.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document, treating a missing file as empty.
    fn load(&self) -> Result<Document> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(Error::io(format!("reading {}", self.path.display()), e)),
        }
    }

    /// Writes `data` to a sibling temp file and renames it over the target.
    fn persist(&self, data: &Document) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)
            .map_err(|e| Error::io(format!("creating {}", dir.display()), e))?;

        let temp = NamedTempFile::new_in(dir)
            .map_err(|e| Error::io(format!("creating temp file in {}", dir.display()), e))?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, data)?;
            writer
                .flush()
                .map_err(|e| Error::io("flushing temp file", e))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| Error::io("syncing temp file", e))?;
        temp.persist(&self.path)
            .map_err(|e| Error::io(format!("replacing {}", self.path.display()), e.error))?;
        Ok(())
    }

    fn get_sync(&self, key: &str) -> Result<String> {
        let _guard = self.lock.lock();
        let mut data = self.load()?;
        Ok(data.remove(key).unwrap_or_default())
    }

    fn set_sync(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut data = self.load()?;
        if value.is_empty() {
            data.remove(key);
        } else {
            data.insert(key.to_string(), value.to_string());
        }
        self.persist(&data)?;
        debug!(path = %self.path.display(), key, entries = data.len(), "json store written");
        Ok(())
    }

    fn replace_all_sync(&self, mut data: Document) -> Result<()> {
        let _guard = self.lock.lock();
        data.retain(|_, value| !value.is_empty());
        self.persist(&data)?;
        debug!(path = %self.path.display(), entries = data.len(), "json store replaced");
        Ok(())
    }

    fn keys_sync(&self) -> Result<Vec<String>> {
        let _guard = self.lock.lock();
        Ok(self.load()?.into_keys().collect())
    }

    /// Replaces the whole document with `entries` in one atomic write.
    ///
    /// Entries with empty values are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written. The previous
    /// document is left intact in that case.
    pub async fn replace_all(&self, entries: BTreeMap<String, String>) -> Result<()> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.replace_all_sync(entries)).await?
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new(DEFAULT_FILENAME)
    }
}

#[async_trait]
impl Store for FileStore {
    async fn get(&self, key: &str) -> Result<String> {
        let store = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || store.get_sync(&key)).await?
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let store = self.clone();
        let key = key.to_string();
        let value = value.to_string();
        tokio::task::spawn_blocking(move || store.set_sync(&key, &value)).await?
    }

    fn keys(&self) -> KeyStream<'_> {
        let store = self.clone();
        stream::once(async move {
            let items: Vec<Result<String>> =
                match tokio::task::spawn_blocking(move || store.keys_sync()).await {
                    Ok(Ok(keys)) => keys.into_iter().map(Ok).collect(),
                    Ok(Err(e)) => vec![Err(e)],
                    Err(e) => vec![Err(e.into())],
                };
            stream::iter(items)
        })
        .flatten()
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(tmp: &TempDir) -> FileStore {
        FileStore::new(tmp.path().join("store.json"))
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);

        assert_eq!(store.get("anything").await.unwrap(), "");
        assert!(store.collect_keys().await.unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_document_is_compact_and_sorted() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);

        store.set("b", "2").await.unwrap();
        store.set("a", "1").await.unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, r#"{"a":"1","b":"2"}"#);
    }

    #[tokio::test]
    async fn test_empty_value_removes_entry() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);

        store.set("a", "1").await.unwrap();
        store.set("a", "").await.unwrap();

        assert_eq!(fs::read_to_string(store.path()).unwrap(), "{}");
        assert_eq!(store.get("a").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);

        for i in 0..5 {
            store.set(&format!("k{i}"), "v").await.unwrap();
        }

        let entries: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_document_is_error() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        fs::write(store.path(), "not json").unwrap();

        let err = store.get("a").await.unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_original_intact() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.set("a", "1").await.unwrap();

        // A document that fails to parse aborts the write before any temp
        // file is created; the original bytes must survive untouched.
        fs::write(store.path(), r#"{"a":1}"#).unwrap();
        assert!(store.set("b", "2").await.is_err());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn test_write_replaces_file_instead_of_rewriting_it() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.set("a", "1").await.unwrap();

        // A hard link keeps the old inode reachable. Had the document been
        // rewritten in place, the link would show the new bytes too.
        let link = tmp.path().join("store.json.link");
        fs::hard_link(store.path(), &link).unwrap();

        store.set("b", "2").await.unwrap();

        assert_eq!(fs::read_to_string(&link).unwrap(), r#"{"a":"1"}"#);
        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            r#"{"a":"1","b":"2"}"#
        );

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            let old = fs::metadata(&link).unwrap().ino();
            let new = fs::metadata(store.path()).unwrap().ino();
            assert_ne!(old, new);
        }
    }

    #[tokio::test]
    async fn test_replace_all_overwrites_document() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.set("stale", "x").await.unwrap();

        let entries = BTreeMap::from([
            ("a".to_string(), "1".to_string()),
            ("skip".to_string(), String::new()),
        ]);
        store.replace_all(entries).await.unwrap();

        assert_eq!(fs::read_to_string(store.path()).unwrap(), r#"{"a":"1"}"#);
    }

    #[tokio::test]
    async fn test_creates_parent_directory() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("nested/dir/store.json"));

        store.set("a", "1").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), "1");
    }
}
