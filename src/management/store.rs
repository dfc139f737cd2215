use std::{
    collections::HashMap,
    future::Future,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{error::Result, warning};

/// Called with the new value of a key, `None` once the key is deleted.
pub type Listener = Arc<dyn Fn(Option<&Value>) + Send + Sync>;

/// Wraps a closure as a [`Listener`].
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(Option<&Value>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Small document store holding the shared and per-machine singletons.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replaces the whole document stored under `key`.
    async fn put(&self, key: &str, value: Value) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Registers `listener` for changes to `key`. The listener is never invoked
    /// during registration, only for writes that happen afterwards.
    fn subscribe(&self, key: &str, listener: Listener) -> Subscription;
}

/// Disposer returned by [`KvStore::subscribe`]. Dropping it unsubscribes too.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

type ListenerMap = HashMap<String, Vec<(u64, Listener)>>;

/// Listener registry shared by the store implementations.
#[derive(Clone, Default)]
struct Listeners {
    inner: Arc<Mutex<ListenerMap>>,
    next_id: Arc<AtomicU64>,
}

impl Listeners {
    fn add(&self, key: &str, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut map) = self.inner.lock() {
            map.entry(key.to_string()).or_default().push((id, listener));
        }

        let inner = Arc::clone(&self.inner);
        let key = key.to_string();
        Subscription::new(move || {
            if let Ok(mut map) = inner.lock() {
                if let Some(list) = map.get_mut(&key) {
                    list.retain(|(lid, _)| *lid != id);
                }
            }
        })
    }

    fn notify(&self, key: &str, value: Option<&Value>) {
        // clone out so listeners run without the lock held and may write back
        let listeners: Vec<Listener> = match self.inner.lock() {
            Ok(map) => map
                .get(key)
                .map(|l| l.iter().map(|(_, f)| Arc::clone(f)).collect())
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        };

        for listener in listeners {
            listener(value);
        }
    }
}

/// In-memory store. Used by the long-running server and by tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    docs: Arc<Mutex<HashMap<String, Value>>>,
    listeners: Listeners,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self
            .docs
            .lock()
            .ok()
            .and_then(|docs| docs.get(key).cloned()))
    }

    async fn put(&self, key: &str, value: Value) -> Result<()> {
        if let Ok(mut docs) = self.docs.lock() {
            docs.insert(key.to_string(), value.clone());
        }
        self.listeners.notify(key, Some(&value));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let removed = self
            .docs
            .lock()
            .ok()
            .and_then(|mut docs| docs.remove(key));
        if removed.is_some() {
            self.listeners.notify(key, None);
        }
        Ok(())
    }

    fn subscribe(&self, key: &str, listener: Listener) -> Subscription {
        self.listeners.add(key, listener)
    }
}

/// One pretty-printed JSON file per key under `root`.
///
/// Subscriptions see writes from every process sharing the directory. Writes
/// through this instance are delivered before `put`/`delete` return; writes by
/// others arrive from a filesystem watcher shortly after they land.
#[derive(Clone)]
pub struct FileStore {
    root: PathBuf,
    listeners: Listeners,
    seen: Arc<Mutex<HashMap<String, Vec<Weak<Mutex<Seen>>>>>>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            listeners: Listeners::default(),
            seen: Arc::default(),
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{}.json", file))
    }

    /// Applies `f` to what every live subscription of `key` has seen.
    fn update_seen(&self, key: &str, f: impl Fn(&mut Seen)) {
        let Ok(mut by_key) = self.seen.lock() else {
            return;
        };
        if let Some(list) = by_key.get_mut(key) {
            list.retain(|weak| match weak.upgrade() {
                Some(seen) => {
                    if let Ok(mut seen) = seen.lock() {
                        f(&mut seen);
                    }
                    true
                }
                None => false,
            });
        }
    }

    /// Runs one of our own writes to `key`. While it is in flight the watchers
    /// stand down; the in-process notification delivers it instead.
    async fn own_write<F>(&self, key: &str, result: Option<&Value>, write: F) -> Result<bool>
    where
        F: Future<Output = Result<bool>>,
    {
        self.update_seen(key, |seen| seen.writing += 1);
        let outcome = write.await;
        self.update_seen(key, |seen| {
            // subscribed mid-write: never counted this one
            seen.writing = seen.writing.saturating_sub(1);
            if matches!(outcome, Ok(true)) {
                seen.last = result.cloned();
            }
        });
        outcome
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        match async_fs::read_to_string(self.path(key)).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: Value) -> Result<()> {
        async_fs::create_dir_all(&self.root).await?;

        // write then rename: readers never see a half-written record
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&value)?;
        self.own_write(key, Some(&value), async {
            async_fs::write(&tmp, json).await?;
            async_fs::rename(&tmp, &path).await?;
            Ok(true)
        })
        .await?;

        self.listeners.notify(key, Some(&value));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path(key);
        let removed = self
            .own_write(key, None, async {
                match async_fs::remove_file(&path).await {
                    Ok(()) => Ok(true),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                    Err(e) => Err(e.into()),
                }
            })
            .await?;

        if removed {
            self.listeners.notify(key, None);
        }
        Ok(())
    }

    fn subscribe(&self, key: &str, listener: Listener) -> Subscription {
        let path = self.path(key);
        let seen = Arc::new(Mutex::new(Seen {
            last: read_doc(&path).ok().flatten(),
            live: true,
            writing: 0,
        }));
        if let Ok(mut by_key) = self.seen.lock() {
            by_key
                .entry(key.to_string())
                .or_default()
                .push(Arc::downgrade(&seen));
        }

        let local = self.listeners.add(key, Arc::clone(&listener));

        let watcher = match watch_file(&self.root, path, Arc::clone(&seen), listener) {
            Ok(w) => Some(w),
            Err(e) => {
                warning!(
                    "Cannot watch {}, changes from other processes go unnoticed: {}",
                    self.root.display(),
                    e
                );
                None
            }
        };

        Subscription::new(move || {
            if let Ok(mut seen) = seen.lock() {
                seen.live = false;
            }
            drop(watcher);
            local.unsubscribe();
        })
    }
}

/// What one `FileStore` subscription last saw of its key.
struct Seen {
    last: Option<Value>,
    live: bool,
    /// Own writes to the key currently in flight.
    writing: usize,
}

impl Seen {
    /// Records `next` and reports whether it is news to the listener.
    fn advance(&mut self, next: Option<Value>) -> bool {
        if !self.live || self.writing > 0 || self.last == next {
            return false;
        }
        self.last = next;
        true
    }
}

/// Current document at `path`, `None` when absent.
fn read_doc(path: &Path) -> Result<Option<Value>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Watches `root` and delivers the document at `path` whenever it differs from
/// what `seen` last recorded. The file is re-read under the `seen` lock, so a
/// late event never delivers an older value than the one already seen.
fn watch_file(
    root: &Path,
    path: PathBuf,
    seen: Arc<Mutex<Seen>>,
    listener: Listener,
) -> Result<RecommendedWatcher> {
    std::fs::create_dir_all(root)?;
    let file_name = path.file_name().map(|n| n.to_os_string());

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let Ok(event) = res else {
            return;
        };
        if matches!(event.kind, EventKind::Access(_)) {
            return;
        }
        let touches_key = event
            .paths
            .iter()
            .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
        if !touches_key {
            return;
        }

        let changed = {
            let Ok(mut seen) = seen.lock() else {
                return;
            };
            match read_doc(&path) {
                Ok(current) if seen.advance(current.clone()) => Some(current),
                // unchanged, or caught mid-write: the next event settles it
                _ => None,
            }
        };
        if let Some(current) = changed {
            listener(current.as_ref());
        }
    })?;

    watcher.watch(root, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

pub async fn load<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

pub async fn save<T: Serialize>(store: &dyn KvStore, key: &str, value: &T) -> Result<()> {
    store.put(key, serde_json::to_value(value)?).await
}
