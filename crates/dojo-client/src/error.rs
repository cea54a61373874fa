//! API 에러 타입.

use reqwest::StatusCode;
use thiserror::Error;

/// API 요청 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// 401 - 로그인 필요
    #[error("Authentication required")]
    AuthenticationRequired,

    /// 403 - 권한 없음
    #[error("Permission denied")]
    PermissionDenied,

    /// 그 외 2xx가 아닌 응답
    #[error("Request failed ({status}): {message}")]
    RequestFailed { status: u16, message: String },

    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    Network(String),

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 성공 응답 본문 파싱 에러
    #[error("Parse error: {0}")]
    Parse(String),

    /// 잘못된 클라이언트 설정
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// API 작업을 위한 Result 타입.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// HTTP 실패 응답 분류.
    ///
    /// 에러 본문은 `error`(문자열), `error.message`, `message` 순으로 메시지를
    /// 찾고, 파싱할 수 없으면 상태 코드로 메시지를 만듭니다.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ApiError::AuthenticationRequired,
            StatusCode::FORBIDDEN => ApiError::PermissionDenied,
            _ => ApiError::RequestFailed {
                status: status.as_u16(),
                message: error_message(body)
                    .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16())),
            },
        }
    }

    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::Timeout(_) => true,
            ApiError::RequestFailed { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            _ => false,
        }
    }

    /// 인증/권한 에러인지 확인.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            ApiError::AuthenticationRequired | ApiError::PermissionDenied
        )
    }

    /// HTTP 상태 코드 (있으면).
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::AuthenticationRequired => Some(401),
            ApiError::PermissionDenied => Some(403),
            ApiError::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// 에러 본문에서 서버 메시지 추출.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    let non_empty = |v: Option<&serde_json::Value>| {
        v.and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    };

    let error = value.get("error");
    non_empty(error)
        .or_else(|| non_empty(error.and_then(|e| e.get("message"))))
        .or_else(|| non_empty(value.get("message")))
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Parse(err.to_string())
    }
}
