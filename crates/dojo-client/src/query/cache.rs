//! 쿼리 캐시 클라이언트.
//!
//! 키별로 마지막 성공 응답을 보관합니다. 무효화는 항목을 stale로 표시하고
//! 세대(generation)를 올리므로, 무효화 이전에 시작된 조회 결과는 캐시에
//! 기록되지 않습니다.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use super::poll::{QueryPoll, QueryState};
use super::{QueryKey, QueryOptions};
use crate::ApiResult;

type CachedValue = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
struct CacheEntry {
    data: Option<CachedValue>,
    updated_at: Option<Instant>,
    stale: bool,
    generation: u64,
}

/// 쿼리 캐시.
#[derive(Default)]
pub struct QueryClient {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
}

impl QueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// 캐시된 값 조회 (신선도와 무관).
    pub fn get_query_data<T>(&self, key: &QueryKey) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.read_entries()
            .get(key)
            .and_then(|entry| entry.data.as_ref())
            .and_then(|data| data.downcast_ref::<T>())
            .cloned()
    }

    /// 값을 직접 캐시에 기록.
    pub fn set_query_data<T>(&self, key: &QueryKey, data: T)
    where
        T: Send + Sync + 'static,
    {
        let mut entries = self.write_entries();
        let entry = entries.entry(key.clone()).or_default();
        entry.data = Some(Arc::new(data));
        entry.updated_at = Some(Instant::now());
        entry.stale = false;
    }

    /// 키가 무효화되어 다시 조회해야 하는지 확인.
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.read_entries()
            .get(key)
            .map(|entry| entry.stale || entry.data.is_none())
            .unwrap_or(true)
    }

    /// 캐시된 키 개수.
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 접두사가 일치하는 모든 키 무효화.
    ///
    /// 반환값은 무효화된 키 개수입니다.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.write_entries();
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.stale = true;
                entry.generation += 1;
                count += 1;
            }
        }
        debug!(prefix = %prefix, count, "Invalidated queries");
        count
    }

    /// 모든 캐시 삭제.
    pub fn clear(&self) {
        self.write_entries().clear();
    }

    /// 쿼리 실행.
    ///
    /// 비활성 쿼리는 `Ok(None)`을 반환하고 조회하지 않습니다. 신선한 캐시가
    /// 있으면 그대로 반환하고, 없으면 재시도 정책에 따라 조회합니다.
    pub async fn fetch<T, F, Fut>(
        &self,
        key: &QueryKey,
        options: &QueryOptions,
        fetcher: F,
    ) -> ApiResult<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        if !options.enabled {
            return Ok(None);
        }

        if let Some(data) = self.fresh::<T>(key, options.stale_time) {
            debug!(key = %key, "Query cache hit");
            return Ok(Some(data));
        }

        let generation = self.begin(key);
        let data = self.run_with_retry(key, options, &fetcher).await?;

        if !self.commit(key, generation, data.clone()) {
            debug!(key = %key, "Discarding result of invalidated query");
        }

        Ok(Some(data))
    }

    /// 변경 작업 실행 후 관련 키 무효화.
    ///
    /// 실패한 변경은 아무것도 무효화하지 않습니다.
    pub async fn mutate<T, Fut>(&self, invalidates: &[QueryKey], mutation: Fut) -> ApiResult<T>
    where
        Fut: Future<Output = ApiResult<T>>,
    {
        let result = mutation.await?;
        for key in invalidates {
            self.invalidate(key);
        }
        Ok(result)
    }

    /// 주기적으로 쿼리를 다시 실행하는 백그라운드 작업 시작.
    ///
    /// 주기는 `options.refetch_interval`을 따릅니다. 주기가 없거나 0이면
    /// 한 번만 조회하고 작업을 마칩니다. 반환된 [`QueryPoll`]을 drop하면
    /// 폴링이 중단됩니다.
    pub fn poll<T, F, Fut>(
        self: &Arc<Self>,
        key: QueryKey,
        options: QueryOptions,
        fetcher: F,
    ) -> QueryPoll<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        let (tx, rx) = tokio::sync::watch::channel(QueryState::<T>::loading());
        let client = Arc::clone(self);
        let interval = options.refetch_interval.filter(|d| !d.is_zero());

        let handle = tokio::spawn(async move {
            let mut ticker = interval.map(tokio::time::interval);
            loop {
                if let Some(ticker) = ticker.as_mut() {
                    ticker.tick().await;
                }

                // 폴링 주기마다 캐시를 건너뛰고 새로 조회
                client.invalidate(&key);
                let state = match client.fetch(&key, &options, &fetcher).await {
                    Ok(Some(data)) => QueryState::success(data),
                    Ok(None) => QueryState::idle(),
                    Err(e) => {
                        let previous = tx.borrow().data.clone();
                        QueryState::error(e, previous)
                    }
                };

                if tx.send(state).is_err() {
                    debug!(key = %key, "Poll receiver dropped, stopping");
                    break;
                }
                if ticker.is_none() {
                    debug!(key = %key, "No refetch interval, single fetch done");
                    break;
                }
            }
        });

        QueryPoll::new(rx, handle)
    }

    fn fresh<T>(&self, key: &QueryKey, stale_time: Duration) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entries = self.read_entries();
        let entry = entries.get(key)?;
        if entry.stale {
            return None;
        }
        let updated_at = entry.updated_at?;
        if updated_at.elapsed() >= stale_time {
            return None;
        }
        entry.data.as_ref()?.downcast_ref::<T>().cloned()
    }

    /// 조회 시작 시점의 세대 기록.
    fn begin(&self, key: &QueryKey) -> u64 {
        self.write_entries()
            .entry(key.clone())
            .or_default()
            .generation
    }

    /// 시작 이후 무효화되지 않았다면 결과를 기록.
    fn commit<T>(&self, key: &QueryKey, generation: u64, data: T) -> bool
    where
        T: Send + Sync + 'static,
    {
        let mut entries = self.write_entries();
        let entry = entries.entry(key.clone()).or_default();
        if entry.generation != generation {
            return false;
        }
        entry.data = Some(Arc::new(data));
        entry.updated_at = Some(Instant::now());
        entry.stale = false;
        true
    }

    async fn run_with_retry<T, F, Fut>(
        &self,
        key: &QueryKey,
        options: &QueryOptions,
        fetcher: &F,
    ) -> ApiResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match fetcher().await {
                Ok(data) => return Ok(data),
                Err(e) if attempt < options.retry && e.is_retryable() => {
                    let delay = options.retry_delay(attempt);
                    warn!(
                        key = %key,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Query failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ApiError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn key(segments: &[&str]) -> QueryKey {
        QueryKey::new(segments.iter().copied())
    }

    fn cached_options() -> QueryOptions {
        QueryOptions::default().stale_time(Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_fetch() {
        let client = QueryClient::new();
        let calls = AtomicU32::new(0);
        let k = key(&["store", "items"]);

        for _ in 0..3 {
            let value = client
                .fetch(&k, &cached_options(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7u32)
                })
                .await
                .unwrap();
            assert_eq!(value, Some(7));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_query_never_fetches() {
        let client = QueryClient::new();
        let calls = AtomicU32::new(0);
        let value = client
            .fetch(
                &key(&["students", ""]),
                &QueryOptions::default().enabled(false),
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(1u32)
                },
            )
            .await
            .unwrap();
        assert_eq!(value, None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(client.is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_by_prefix() {
        let client = QueryClient::new();
        client.set_query_data(&key(&["students", "1"]), 1u32);
        client.set_query_data(&key(&["students", "1", "room"]), 2u32);
        client.set_query_data(&key(&["students", "2"]), 3u32);
        client.set_query_data(&key(&["quests"]), 4u32);

        assert_eq!(client.invalidate(&key(&["students", "1"])), 2);
        assert!(client.is_stale(&key(&["students", "1", "room"])));
        assert!(!client.is_stale(&key(&["students", "2"])));
        assert!(!client.is_stale(&key(&["quests"])));

        // 무효화된 값도 다시 조회되기 전까지는 읽을 수 있음
        assert_eq!(client.get_query_data::<u32>(&key(&["students", "1"])), Some(1));
    }

    #[tokio::test]
    async fn test_result_after_invalidation_is_not_cached() {
        let client = Arc::new(QueryClient::new());
        let k = key(&["transactions", "s-1"]);
        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let channels = std::sync::Mutex::new(Some((started_tx, release_rx)));

        let fetching = {
            let client = Arc::clone(&client);
            let k = k.clone();
            tokio::spawn(async move {
                client
                    .fetch(&k, &cached_options(), || {
                        let pair = channels.lock().unwrap().take();
                        async move {
                            if let Some((started, release)) = pair {
                                let _ = started.send(());
                                let _ = release.await;
                            }
                            Ok("old".to_string())
                        }
                    })
                    .await
            })
        };

        started_rx.await.unwrap();
        client.invalidate(&k);
        release_tx.send(()).unwrap();

        // 호출자는 결과를 받지만 캐시에는 기록되지 않음
        let value = fetching.await.unwrap().unwrap();
        assert_eq!(value.as_deref(), Some("old"));
        assert_eq!(client.get_query_data::<String>(&k), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_with_backoff() {
        let client = QueryClient::new();
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let value = client
            .fetch(&key(&["health"]), &QueryOptions::default(), || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(ApiError::Network("connection reset".to_string()))
                } else {
                    Ok(n)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1초 + 2초 대기
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_auth_errors_are_not_retried() {
        let client = QueryClient::new();
        let calls = AtomicU32::new(0);

        let err = client
            .fetch(&key(&["students", "1"]), &QueryOptions::default(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(ApiError::PermissionDenied)
            })
            .await
            .unwrap_err();

        assert_eq!(err, ApiError::PermissionDenied);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mutation_invalidates_only_on_success() {
        let client = QueryClient::new();
        let k = key(&["students", "1"]);
        client.set_query_data(&k, 10u32);

        let failed: ApiResult<()> = client
            .mutate(&[k.clone()], async {
                Err(ApiError::RequestFailed {
                    status: 400,
                    message: "Insufficient balance".to_string(),
                })
            })
            .await;
        assert!(failed.is_err());
        assert!(!client.is_stale(&k));

        client.mutate(&[k.clone()], async { Ok(()) }).await.unwrap();
        assert!(client.is_stale(&k));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_publishes_each_tick() {
        let client = Arc::new(QueryClient::new());
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let mut poll = client.poll(
            key(&["health"]),
            QueryOptions::default()
                .retry(0)
                .refetch_interval(Duration::from_secs(30)),
            move || {
                let counter = Arc::clone(&counter);
                async move { Ok(counter.fetch_add(1, Ordering::SeqCst)) }
            },
        );

        let first = poll.next().await.unwrap();
        assert_eq!(first.data, Some(0));

        let second = poll.next().await.unwrap();
        assert_eq!(second.data, Some(1));

        drop(poll);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_cadence_follows_refetch_interval() {
        let client = Arc::new(QueryClient::new());
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let _poll = client.poll(
            key(&["health"]),
            QueryOptions::default()
                .retry(0)
                .refetch_interval(Duration::from_millis(20)),
            move || {
                let counter = Arc::clone(&counter);
                async move { Ok(counter.fetch_add(1, Ordering::SeqCst)) }
            },
        );

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(calls.load(Ordering::SeqCst) > 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_without_interval_fetches_once() {
        let client = Arc::new(QueryClient::new());
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let mut poll = client.poll(
            key(&["health"]),
            QueryOptions::default().retry(0),
            move || {
                let counter = Arc::clone(&counter);
                async move { Ok(counter.fetch_add(1, Ordering::SeqCst)) }
            },
        );

        let first = poll.next().await.unwrap();
        assert_eq!(first.data, Some(0));

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(poll.latest().data, Some(0));
    }
}
