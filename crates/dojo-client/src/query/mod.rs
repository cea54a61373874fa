//! 서버 상태 쿼리 계층.
//!
//! 계층적 키로 서버 응답을 캐싱하고, 변경 작업 후 관련 키를 무효화하며,
//! 주기적 폴링과 구독자(observer) 생명주기를 관리합니다.

mod cache;
mod key;
mod observer;
mod options;
mod poll;

pub use cache::QueryClient;
pub use key::QueryKey;
pub use observer::QueryObserver;
pub use options::QueryOptions;
pub use poll::{QueryPoll, QueryState, QueryStatus};
