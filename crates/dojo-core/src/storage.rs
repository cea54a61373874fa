//! 키-값 영속 저장소.
//!
//! 역할 값처럼 재시작 후에도 유지되어야 하는 작은 문자열을 보관합니다.
//! 여러 실행 컨텍스트가 같은 저장소를 공유할 수 있으며, 동시 쓰기는
//! 조정하지 않고 마지막 쓰기가 이깁니다.
//!
//! - [`MemoryStore`]: 프로세스 내 저장소. [`MemoryStore::open_context`]로
//!   같은 데이터를 공유하는 다른 컨텍스트를 열 수 있습니다.
//! - [`FileStore`]: JSON 파일 기반 저장소. 다른 프로세스의 변경은
//!   [`FileStore::sync_external_changes`] 또는 [`FileStore::watch`]로 감지합니다.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{CoreError, CoreResult};

/// 저장소 이벤트 채널 버퍼 크기.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// 다른 컨텍스트에서 발생한 저장소 변경 알림.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEvent {
    /// 변경된 키 (`None`이면 전체 삭제)
    pub key: Option<String>,
    /// 이전 값
    pub old_value: Option<String>,
    /// 새 값 (`None`이면 삭제)
    pub new_value: Option<String>,
}

/// 키-값 저장소 인터페이스.
pub trait KeyValueStore: Send + Sync {
    /// 값 조회.
    fn get(&self, key: &str) -> CoreResult<Option<String>>;

    /// 값 저장.
    fn set(&self, key: &str, value: &str) -> CoreResult<()>;

    /// 값 삭제.
    fn remove(&self, key: &str) -> CoreResult<()>;

    /// 다른 컨텍스트의 변경 알림 구독.
    ///
    /// 자기 컨텍스트에서 쓴 변경은 전달되지 않습니다. 알림 시점은 구현마다
    /// 다릅니다. [`FileStore`]는 변경을 확인할 때만 알립니다.
    fn subscribe(&self) -> broadcast::Receiver<StorageEvent>;
}

// ==================== MemoryStore ====================

struct SharedMemory {
    data: RwLock<HashMap<String, String>>,
    contexts: Mutex<Vec<(u64, broadcast::Sender<StorageEvent>)>>,
    next_context: AtomicU64,
}

/// 프로세스 내 키-값 저장소.
pub struct MemoryStore {
    shared: Arc<SharedMemory>,
    context_id: u64,
    events: broadcast::Sender<StorageEvent>,
}

impl MemoryStore {
    /// 새 저장소와 첫 컨텍스트 생성.
    pub fn new() -> Self {
        let shared = Arc::new(SharedMemory {
            data: RwLock::new(HashMap::new()),
            contexts: Mutex::new(Vec::new()),
            next_context: AtomicU64::new(0),
        });
        Self::attach(shared)
    }

    /// 같은 데이터를 공유하는 새 실행 컨텍스트를 엽니다.
    pub fn open_context(&self) -> Self {
        Self::attach(Arc::clone(&self.shared))
    }

    fn attach(shared: Arc<SharedMemory>) -> Self {
        let context_id = shared.next_context.fetch_add(1, Ordering::SeqCst);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        if let Ok(mut contexts) = shared.contexts.lock() {
            contexts.push((context_id, events.clone()));
        }
        Self {
            shared,
            context_id,
            events,
        }
    }

    fn notify_others(&self, event: StorageEvent) {
        let contexts = match self.shared.contexts.lock() {
            Ok(c) => c,
            Err(_) => {
                warn!("storage context registry poisoned; dropping change notification");
                return;
            }
        };
        for (id, tx) in contexts.iter() {
            if *id != self.context_id {
                // 구독자가 없으면 전송 실패는 무시
                let _ = tx.send(event.clone());
            }
        }
    }

    fn write(&self, key: &str, value: Option<&str>) -> CoreResult<()> {
        let old_value = {
            let mut data = self
                .shared
                .data
                .write()
                .map_err(|_| CoreError::Storage("memory store lock poisoned".to_string()))?;
            match value {
                Some(v) => data.insert(key.to_string(), v.to_string()),
                None => data.remove(key),
            }
        };

        self.notify_others(StorageEvent {
            key: Some(key.to_string()),
            old_value,
            new_value: value.map(str::to_string),
        });
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        if let Ok(mut contexts) = self.shared.contexts.lock() {
            contexts.retain(|(id, _)| *id != self.context_id);
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        let data = self
            .shared
            .data
            .read()
            .map_err(|_| CoreError::Storage("memory store lock poisoned".to_string()))?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        self.write(key, Some(value))
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        self.write(key, None)
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}

// ==================== FileStore ====================

/// JSON 파일 기반 키-값 저장소.
///
/// 작업마다 파일 전체를 읽고 씁니다. 마지막으로 본 내용을 기억해 두고,
/// [`FileStore::sync_external_changes`]가 호출되면 다른 프로세스가 바꾼
/// 키마다 [`StorageEvent`]를 보냅니다.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
    seen: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl FileStore {
    /// 주어진 경로의 파일 저장소를 엽니다. 파일은 첫 쓰기 때 생성됩니다.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let store = Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
            seen: Mutex::new(HashMap::new()),
            events,
        };
        match store.load() {
            Ok(data) => store.remember(data),
            Err(e) => warn!(path = %store.path.display(), error = %e, "file store unreadable on open"),
        }
        store
    }

    /// 저장소 파일 경로.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 다른 프로세스의 변경 확인.
    ///
    /// 마지막으로 본 내용과 파일을 비교해 바뀐 키마다 이벤트를 보내고,
    /// 바뀐 키 개수를 반환합니다.
    pub fn sync_external_changes(&self) -> CoreResult<usize> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| CoreError::Storage("file store lock poisoned".to_string()))?;
        let current = self.load()?;

        let mut seen = self.seen.lock().unwrap_or_else(|p| p.into_inner());
        let mut changed = Vec::new();
        for (key, value) in &current {
            if seen.get(key) != Some(value) {
                changed.push(StorageEvent {
                    key: Some(key.clone()),
                    old_value: seen.get(key).cloned(),
                    new_value: Some(value.clone()),
                });
            }
        }
        for (key, value) in seen.iter() {
            if !current.contains_key(key) {
                changed.push(StorageEvent {
                    key: Some(key.clone()),
                    old_value: Some(value.clone()),
                    new_value: None,
                });
            }
        }
        *seen = current;
        drop(seen);

        let count = changed.len();
        if count > 0 {
            debug!(path = %self.path.display(), count, "external storage changes detected");
        }
        for event in changed {
            // 구독자가 없으면 전송 실패는 무시
            let _ = self.events.send(event);
        }
        Ok(count)
    }

    /// 주기적으로 [`FileStore::sync_external_changes`]를 실행하는 작업 시작.
    ///
    /// 저장소가 drop되면 작업도 끝납니다.
    pub fn watch(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let Some(store) = weak.upgrade() else {
                    break;
                };
                if let Err(e) = store.sync_external_changes() {
                    warn!(error = %e, "failed to check file store for changes");
                }
            }
        })
    }

    fn remember(&self, data: HashMap<String, String>) {
        *self.seen.lock().unwrap_or_else(|p| p.into_inner()) = data;
    }

    fn load(&self) -> CoreResult<HashMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, data: &HashMap<String, String>) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(data)?;
        std::fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), entries = data.len(), "file store saved");
        Ok(())
    }

    fn update(&self, key: &str, value: Option<&str>) -> CoreResult<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| CoreError::Storage("file store lock poisoned".to_string()))?;
        let mut data = self.load()?;
        match value {
            Some(v) => data.insert(key.to_string(), v.to_string()),
            None => data.remove(key),
        };
        self.save(&data)?;
        // 자기 쓰기는 알리지 않음
        self.remember(data);
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        self.update(key, Some(value))
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        self.update(key, None)
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_basic() {
        let store = MemoryStore::new();
        assert_eq!(store.get("user_role").unwrap(), None);

        store.set("user_role", "teacher").unwrap();
        assert_eq!(store.get("user_role").unwrap().as_deref(), Some("teacher"));

        store.remove("user_role").unwrap();
        assert_eq!(store.get("user_role").unwrap(), None);
    }

    #[test]
    fn test_memory_store_contexts_share_data() {
        let tab_a = MemoryStore::new();
        let tab_b = tab_a.open_context();

        tab_a.set("user_role", "student").unwrap();
        assert_eq!(tab_b.get("user_role").unwrap().as_deref(), Some("student"));
    }

    #[test]
    fn test_memory_store_notifies_only_other_contexts() {
        let tab_a = MemoryStore::new();
        let tab_b = tab_a.open_context();
        let mut rx_a = tab_a.subscribe();
        let mut rx_b = tab_b.subscribe();

        tab_a.set("user_role", "teacher").unwrap();

        let event = rx_b.try_recv().unwrap();
        assert_eq!(event.key.as_deref(), Some("user_role"));
        assert_eq!(event.old_value, None);
        assert_eq!(event.new_value.as_deref(), Some("teacher"));
        assert!(rx_a.try_recv().is_err());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        let store = FileStore::open(&path);

        assert_eq!(store.get("user_role").unwrap(), None);
        store.set("user_role", "student").unwrap();

        // 새 핸들로 다시 열어도 값이 유지되어야 함
        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get("user_role").unwrap().as_deref(), Some("student"));

        reopened.remove("user_role").unwrap();
        assert_eq!(store.get("user_role").unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileStore::open(&path);
        assert!(matches!(store.get("user_role"), Err(CoreError::Serialization(_))));
    }

    #[test]
    fn test_file_store_reports_other_process_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mine = FileStore::open(&path);
        let other = FileStore::open(&path);
        let mut rx = mine.subscribe();

        mine.set("auth_session", "{}").unwrap();
        assert_eq!(mine.sync_external_changes().unwrap(), 0);
        assert!(rx.try_recv().is_err());

        other.set("user_role", "teacher").unwrap();
        assert_eq!(mine.sync_external_changes().unwrap(), 1);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.key.as_deref(), Some("user_role"));
        assert_eq!(event.new_value.as_deref(), Some("teacher"));

        other.remove("user_role").unwrap();
        mine.sync_external_changes().unwrap();
        let event = rx.try_recv().unwrap();
        assert_eq!(event.old_value.as_deref(), Some("teacher"));
        assert_eq!(event.new_value, None);

        // 이미 본 변경은 다시 알리지 않음
        assert_eq!(mine.sync_external_changes().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_file_store_watch_delivers_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mine = Arc::new(FileStore::open(&path));
        let mut rx = mine.subscribe();
        let handle = mine.watch(Duration::from_secs(1));

        FileStore::open(&path).set("user_role", "student").unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.new_value.as_deref(), Some("student"));

        drop(mine);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(handle.is_finished());
    }
}
