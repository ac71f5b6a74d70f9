use bincode::Options;
use bytes::Bytes;
use num_traits::CheckedAdd;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error as ThisError;
use tracing::{debug, info};

pub const DEFAULT_SNAPSHOT_PATH: &str = "dump.rdb";

const SNAPSHOT_VERSION: u32 = 1;

/// The Store is responsible for managing key-value pairs. Keys and values are binary safe.
///
/// The store is designed to be thread-safe, allowing it to be shared and cloned cheaply using
/// reference counting. All access goes through a single read-write lock: any number of readers may
/// hold [`InnerStore::read`] at once, while [`InnerStore::write`] is exclusive. A command that
/// acquires one guard for its whole body is atomic with respect to every other command.
#[derive(Clone)]
pub struct Store {
    inner: Arc<InnerStore>,
}

impl Store {
    pub fn new() -> Store {
        Self::with_snapshot_path(DEFAULT_SNAPSHOT_PATH)
    }

    /// Creates an empty store that persists to `path` when saved.
    pub fn with_snapshot_path(path: impl Into<PathBuf>) -> Store {
        let state = State {
            keys: HashMap::new(),
        };

        let inner = Arc::new(InnerStore {
            state: RwLock::new(state),
            snapshot_path: path.into(),
        });

        Self { inner }
    }

    /// Creates a store populated from the snapshot at `path`. A missing file yields an empty store,
    /// any other failure is returned since the process cannot safely continue without its data.
    pub fn open(path: impl Into<PathBuf>) -> Result<Store, SnapshotError> {
        let store = Self::with_snapshot_path(path);

        if store.load_snapshot(&store.snapshot_path)? {
            info!(
                "Loaded {} keys from {}",
                store.read().size(),
                store.snapshot_path.display()
            );
        } else {
            info!(
                "No snapshot found at {}, starting empty",
                store.snapshot_path.display()
            );
        }

        Ok(store)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

pub struct InnerStore {
    state: RwLock<State>,
    snapshot_path: PathBuf,
}

impl Deref for Store {
    type Target = InnerStore;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl InnerStore {
    // Every critical section leaves the map consistent, so a panic while holding the lock does not
    // make the data unusable.
    pub fn read(&self) -> StoreRead<'_> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        StoreRead { state }
    }

    pub fn write(&self) -> StoreWrite<'_> {
        let state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        StoreWrite { state }
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Writes a snapshot to the path the store was created with.
    pub fn save(&self) -> Result<(), SnapshotError> {
        self.save_snapshot(&self.snapshot_path)
    }

    /// Serializes the whole map to `path`.
    ///
    /// The map is cloned under the read lock and the file is written after the lock is released.
    /// Data goes to a temporary sibling file first, then is renamed over `path`.
    pub fn save_snapshot(&self, path: &Path) -> Result<(), SnapshotError> {
        let entries: BTreeMap<Bytes, Bytes> = {
            let state = self.read();
            state
                .keys
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        };

        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            entries,
        };

        let mut tmp_path = path.as_os_str().to_owned();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        bincode_options().serialize_into(&mut writer, &snapshot)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        fs::rename(&tmp_path, path)?;

        debug!(
            "Saved {} keys to {}",
            snapshot.entries.len(),
            path.display()
        );

        Ok(())
    }

    /// Replaces the whole map with the snapshot stored at `path`. Returns `false`, leaving the
    /// store untouched, when the file does not exist.
    pub fn load_snapshot(&self, path: &Path) -> Result<bool, SnapshotError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        // Length prefixes in a corrupt file must not make us allocate more than the file holds.
        let limit = file.metadata()?.len();
        let snapshot: Snapshot = bincode_options()
            .with_limit(limit)
            .deserialize_from(BufReader::new(file))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }

        let mut state = self.write();
        state.keys = snapshot.entries.into_iter().collect();

        Ok(true)
    }
}

pub struct StoreRead<'a> {
    state: RwLockReadGuard<'a, State>,
}

impl<'a> Deref for StoreRead<'a> {
    type Target = State;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

pub struct StoreWrite<'a> {
    state: RwLockWriteGuard<'a, State>,
}

impl<'a> Deref for StoreWrite<'a> {
    type Target = State;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

impl<'a> DerefMut for StoreWrite<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.state
    }
}

pub struct State {
    keys: HashMap<Bytes, Bytes>,
}

impl State {
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.keys.get(key).cloned()
    }

    pub fn exists(&self, key: &[u8]) -> bool {
        self.keys.contains_key(key)
    }

    pub fn size(&self) -> usize {
        self.keys.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Bytes> {
        self.keys.keys()
    }

    pub fn set(&mut self, key: Bytes, value: Bytes) {
        self.keys.insert(key, value);
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<Bytes> {
        self.keys.remove(key)
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Adds `increment` to the base-10 integer stored at `key`, an absent key counts as zero. The
    /// value is left untouched when it is not a number or the result overflows `T`.
    pub fn incr_by<T>(&mut self, key: Bytes, increment: T) -> Result<T, NotAnInteger>
    where
        T: FromStr + ToString + CheckedAdd + Default,
    {
        let value = match self.keys.get(&key) {
            Some(value) => std::str::from_utf8(value.as_ref())
                .ok()
                .and_then(|s| s.parse::<T>().ok())
                .ok_or(NotAnInteger)?,
            None => T::default(),
        };

        let value = value.checked_add(&increment).ok_or(NotAnInteger)?;
        self.set(key, value.to_string().into());

        Ok(value)
    }
}

#[derive(Debug, ThisError, PartialEq)]
#[error("value is not an integer or out of range")]
pub struct NotAnInteger;

#[derive(Debug, ThisError)]
pub enum SnapshotError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}

/// On-disk layout: a version tag followed by every entry sorted by key, so that equal stores
/// always produce identical files.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    entries: BTreeMap<Bytes, Bytes>,
}

fn bincode_options() -> impl Options {
    bincode::DefaultOptions::new().with_fixint_encoding()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn set_get_remove() {
        let store = Store::new();

        {
            let mut store = store.write();
            store.set(Bytes::from("key1"), Bytes::from("value1"));
            store.set(Bytes::from_static(b"\x00bin\xff"), Bytes::from_static(b"\r\n"));
        }

        assert_eq!(store.read().get(b"key1"), Some(Bytes::from("value1")));
        assert_eq!(
            store.read().get(b"\x00bin\xff"),
            Some(Bytes::from_static(b"\r\n"))
        );
        assert_eq!(store.read().size(), 2);

        assert_eq!(store.write().remove(b"key1"), Some(Bytes::from("value1")));
        assert_eq!(store.write().remove(b"key1"), None);
        assert!(!store.read().exists(b"key1"));
    }

    #[test]
    fn incr_by() {
        let store = Store::new();
        let mut state = store.write();

        assert_eq!(state.incr_by(Bytes::from("counter"), 5i64), Ok(5));
        assert_eq!(state.incr_by(Bytes::from("counter"), -7i64), Ok(-2));
        assert_eq!(state.get(b"counter"), Some(Bytes::from("-2")));

        state.set(Bytes::from("text"), Bytes::from("abc"));
        assert_eq!(state.incr_by(Bytes::from("text"), 1i64), Err(NotAnInteger));

        state.set(Bytes::from("max"), Bytes::from(i64::MAX.to_string()));
        assert_eq!(state.incr_by(Bytes::from("max"), 1i64), Err(NotAnInteger));
        assert_eq!(state.get(b"max"), Some(Bytes::from(i64::MAX.to_string())));
    }

    #[test]
    fn snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.rdb");

        let store = Store::with_snapshot_path(&path);
        {
            let mut store = store.write();
            store.set(Bytes::from("key1"), Bytes::from("value1"));
            store.set(Bytes::from("empty"), Bytes::new());
            store.set(Bytes::from_static(b"\xff\x00"), Bytes::from_static(b"\x00\r\n"));
        }
        store.save().unwrap();

        let loaded = Store::open(&path).unwrap();
        let loaded = loaded.read();

        assert_eq!(loaded.size(), 3);
        assert_eq!(loaded.get(b"key1"), Some(Bytes::from("value1")));
        assert_eq!(loaded.get(b"empty"), Some(Bytes::new()));
        assert_eq!(
            loaded.get(b"\xff\x00"),
            Some(Bytes::from_static(b"\x00\r\n"))
        );
    }

    #[test]
    fn snapshot_overwrites_previous_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.rdb");

        let store = Store::with_snapshot_path(&path);
        store.write().set(Bytes::from("old"), Bytes::from("1"));
        store.save().unwrap();

        store.write().remove(b"old");
        store.write().set(Bytes::from("new"), Bytes::from("2"));
        store.save().unwrap();

        let loaded = Store::open(&path).unwrap();
        assert!(!loaded.read().exists(b"old"));
        assert_eq!(loaded.read().get(b"new"), Some(Bytes::from("2")));
    }

    #[test]
    fn snapshot_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.rdb");
        let second = dir.path().join("second.rdb");

        let store = Store::new();
        for i in 0..100 {
            store
                .write()
                .set(Bytes::from(format!("key{i}")), Bytes::from(format!("{i}")));
        }

        store.save_snapshot(&first).unwrap();
        store.save_snapshot(&second).unwrap();

        assert_eq!(fs::read(first).unwrap(), fs::read(second).unwrap());
    }

    #[test]
    fn open_missing_snapshot_starts_empty() {
        let dir = tempfile::tempdir().unwrap();

        let store = Store::open(dir.path().join("missing.rdb")).unwrap();

        assert_eq!(store.read().size(), 0);
    }

    #[test]
    fn open_corrupt_snapshot_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.rdb");
        fs::write(&path, b"definitely not a snapshot").unwrap();

        let res = Store::open(&path);

        assert!(res.is_err());
    }

    #[test]
    fn load_replaces_existing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.rdb");

        let saved = Store::new();
        saved.write().set(Bytes::from("saved"), Bytes::from("1"));
        saved.save_snapshot(&path).unwrap();

        let store = Store::new();
        store.write().set(Bytes::from("unsaved"), Bytes::from("1"));

        assert!(store.load_snapshot(&path).unwrap());
        assert!(store.read().exists(b"saved"));
        assert!(!store.read().exists(b"unsaved"));
    }

    #[test]
    fn concurrent_writers() {
        let store = Store::new();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        store
                            .write()
                            .incr_by(Bytes::from("counter"), 1i64)
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.read().get(b"counter"), Some(Bytes::from("8000")));
    }
}
