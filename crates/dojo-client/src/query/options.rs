//! 쿼리 옵션.

use std::time::Duration;

/// 기본 재시도 횟수.
pub const DEFAULT_RETRY: u32 = 3;

/// 재시도 지연 상한.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// 쿼리별 옵션.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// false면 조회하지 않음 (식별자가 없을 때 등)
    pub enabled: bool,
    /// 이 시간 동안은 캐시된 값을 그대로 사용
    pub stale_time: Duration,
    /// 주기적 재조회 간격
    pub refetch_interval: Option<Duration>,
    /// 실패 시 재시도 횟수
    pub retry: u32,
    /// 첫 재시도 지연 (이후 두 배씩 증가)
    pub retry_base_delay: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            stale_time: Duration::ZERO,
            refetch_interval: None,
            retry: DEFAULT_RETRY,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

impl QueryOptions {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = Some(interval);
        self
    }

    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// `attempt`번째(0부터) 재시도 전 대기 시간.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.retry_base_delay
            .saturating_mul(factor)
            .min(MAX_RETRY_DELAY)
    }
}
