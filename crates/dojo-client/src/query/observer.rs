//! 쿼리 구독자.
//!
//! 화면 하나가 쿼리 하나를 구독하는 단위입니다. 구독이 해제(unmount)된
//! 뒤에 도착한 응답은 상태에 반영하지 않습니다.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::{QueryClient, QueryKey, QueryOptions, QueryState};
use crate::ApiResult;

/// 쿼리 구독자.
///
/// 복제본은 같은 상태와 마운트 플래그를 공유합니다.
pub struct QueryObserver<T> {
    client: Arc<QueryClient>,
    key: QueryKey,
    options: QueryOptions,
    state: Arc<Mutex<QueryState<T>>>,
    mounted: Arc<AtomicBool>,
}

impl<T> Clone for QueryObserver<T> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            key: self.key.clone(),
            options: self.options.clone(),
            state: Arc::clone(&self.state),
            mounted: Arc::clone(&self.mounted),
        }
    }
}

impl<T> QueryObserver<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(client: Arc<QueryClient>, key: QueryKey, options: QueryOptions) -> Self {
        let initial = if options.enabled {
            QueryState::loading()
        } else {
            QueryState::idle()
        };
        Self {
            client,
            key,
            options,
            state: Arc::new(Mutex::new(initial)),
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// 현재 상태 스냅샷.
    pub fn state(&self) -> QueryState<T> {
        self.lock_state().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// 구독 해제. 이후 도착하는 응답은 무시됩니다.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    /// 쿼리를 실행하고 결과를 상태에 반영.
    pub async fn refetch<F, Fut>(&self, fetcher: F) -> QueryState<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        if !self.options.enabled || !self.is_mounted() {
            return self.state();
        }

        {
            let mut state = self.lock_state();
            state.status = super::QueryStatus::Loading;
        }

        let result = self.client.fetch(&self.key, &self.options, fetcher).await;

        if !self.is_mounted() {
            debug!(key = %self.key, "Observer unmounted, dropping response");
            return self.state();
        }

        let mut state = self.lock_state();
        let next = match result {
            Ok(Some(data)) => QueryState::success(data),
            Ok(None) => QueryState::idle(),
            Err(e) => QueryState::error(e, state.data.clone()),
        };
        *state = next;
        state.clone()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, QueryState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ApiError, QueryStatus};

    fn observer(options: QueryOptions) -> QueryObserver<String> {
        QueryObserver::new(
            Arc::new(QueryClient::new()),
            QueryKey::new(["students", "s-1"]),
            options,
        )
    }

    #[tokio::test]
    async fn test_refetch_success() {
        let obs = observer(QueryOptions::default());
        assert!(obs.state().is_loading());

        let state = obs.refetch(|| async { Ok("Mina".to_string()) }).await;
        assert!(state.is_success());
        assert_eq!(state.data.as_deref(), Some("Mina"));
    }

    #[tokio::test]
    async fn test_disabled_observer_stays_idle() {
        let obs = observer(QueryOptions::default().enabled(false));
        let state = obs.refetch(|| async { Ok("x".to_string()) }).await;
        assert_eq!(state.status, QueryStatus::Idle);
        assert!(state.data.is_none());
    }

    #[tokio::test]
    async fn test_error_keeps_previous_data() {
        let obs = observer(QueryOptions::default().retry(0));
        obs.refetch(|| async { Ok("Mina".to_string()) }).await;
        obs.client.invalidate(obs.key());

        let state = obs
            .refetch(|| async {
                Err(ApiError::RequestFailed {
                    status: 404,
                    message: "Student not found".to_string(),
                })
            })
            .await;
        assert!(state.is_error());
        assert_eq!(state.data.as_deref(), Some("Mina"));
    }

    #[tokio::test]
    async fn test_response_after_unmount_is_ignored() {
        let obs = observer(QueryOptions::default());
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let channels = Mutex::new(Some((started_tx, release_rx)));

        let pending = {
            let obs = obs.clone();
            tokio::spawn(async move {
                obs.refetch(|| {
                    let pair = channels.lock().unwrap().take();
                    async move {
                        if let Some((started, release)) = pair {
                            let _ = started.send(());
                            let _ = release.await;
                        }
                        Ok("late".to_string())
                    }
                })
                .await
            })
        };

        started_rx.await.unwrap();
        obs.unmount();
        release_tx.send(()).unwrap();
        pending.await.unwrap();

        assert!(obs.state().data.is_none());
    }
}
