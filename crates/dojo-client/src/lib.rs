//! BankDojo Jr. REST API 클라이언트.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - [`ApiClient`]: Bearer 토큰을 붙이고 HTTP 실패를 분류하는 클라이언트
//! - 리소스별 타입 모델과 엔드포인트 (학생, 교사, 반, 퀘스트, 상점, 거래, 헬스)
//! - [`QueryClient`]: 키 기반 캐시, 명시적 무효화, 주기적 폴링
//! - [`DojoQueries`]: 리소스별 조회/변경 바인딩

pub mod bindings;
pub mod client;
pub mod error;
pub mod query;
pub mod resources;

pub use bindings::DojoQueries;
pub use client::ApiClient;
pub use error::{ApiError, ApiResult};
pub use query::{
    QueryClient, QueryKey, QueryObserver, QueryOptions, QueryPoll, QueryState, QueryStatus,
};
pub use resources::*;
