//! 쿼리 상태와 폴링 핸들.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::ApiError;

/// 쿼리 진행 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// 비활성 (조회하지 않음)
    Idle,
    Loading,
    Success,
    Error,
}

/// 구독자가 보는 쿼리 상태.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    pub status: QueryStatus,
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub updated_at: Option<Instant>,
}

impl<T> QueryState<T> {
    pub fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            updated_at: None,
        }
    }

    pub fn loading() -> Self {
        Self {
            status: QueryStatus::Loading,
            ..Self::idle()
        }
    }

    pub fn success(data: T) -> Self {
        Self {
            status: QueryStatus::Success,
            data: Some(data),
            error: None,
            updated_at: Some(Instant::now()),
        }
    }

    /// 실패 상태. 이전에 받은 데이터는 유지합니다.
    pub fn error(error: ApiError, previous: Option<T>) -> Self {
        Self {
            status: QueryStatus::Error,
            data: previous,
            error: Some(error),
            updated_at: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self::idle()
    }
}

/// 주기적 폴링 핸들.
///
/// drop하면 백그라운드 작업이 중단됩니다.
pub struct QueryPoll<T> {
    rx: watch::Receiver<QueryState<T>>,
    handle: JoinHandle<()>,
}

impl<T: Clone> QueryPoll<T> {
    pub(crate) fn new(rx: watch::Receiver<QueryState<T>>, handle: JoinHandle<()>) -> Self {
        Self { rx, handle }
    }

    /// 가장 최근 상태.
    pub fn latest(&self) -> QueryState<T> {
        self.rx.borrow().clone()
    }

    /// 다음 폴링 결과까지 대기.
    ///
    /// 폴링 작업이 끝났으면 `None`을 반환합니다.
    pub async fn next(&mut self) -> Option<QueryState<T>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

impl<T> Drop for QueryPoll<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
