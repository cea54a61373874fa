//! 인증 에러 타입.

use dojo_core::{CoreError, ErrorInfo};
use thiserror::Error;

/// 인증 계층 에러.
#[derive(Debug, Error)]
pub enum AuthError {
    /// 로그인이 필요함 (세션 없음 또는 갱신 불가)
    #[error("로그인이 필요합니다")]
    LoginRequired,

    /// 토큰을 조용히 획득하지 못함
    #[error("토큰 획득 실패: {0}")]
    TokenAcquisitionFailed(String),

    /// 신원 제공자가 보고한 에러 (사용자에게 그대로 표시)
    #[error("신원 제공자 에러: {0}")]
    Provider(ErrorInfo),

    /// 로그인 콜백이 유효하지 않음
    #[error("잘못된 로그인 콜백: {0}")]
    InvalidCallback(String),

    /// ID 토큰을 해석할 수 없음
    #[error("잘못된 ID 토큰: {0}")]
    InvalidIdToken(String),

    /// 네트워크 에러
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 저장소/설정 에러
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// 인증 작업을 위한 Result 타입.
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// 사용자가 다시 로그인해야 하는 에러인지 확인.
    pub fn is_login_required(&self) -> bool {
        matches!(self, AuthError::LoginRequired)
    }

    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuthError::Network(_) | AuthError::TokenAcquisitionFailed(_)
        )
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Network(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AuthError::InvalidIdToken(err.to_string())
    }
}
