//! 접근 토큰.
//!
//! 제공자가 만료를 관리하는 불투명 Bearer 자격 증명입니다.
//! 이 계층에서는 저장하지 않고 요청마다 새로 받아옵니다.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};

use crate::CoreResult;

/// 만료 임박 판정 여유 시간 (초).
const EXPIRY_LEEWAY_SECS: i64 = 60;

/// Bearer 접근 토큰.
///
/// `Debug` 출력에서 토큰 값은 가려집니다.
#[derive(Debug, Clone)]
pub struct AccessToken {
    secret: SecretString,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// 새 토큰 생성.
    pub fn new(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            secret: SecretString::from(token.into()),
            expires_at,
        }
    }

    /// 만료 시각 반환.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// 토큰이 만료되었거나 곧 만료되는지 확인.
    pub fn is_expired_or_expiring(&self) -> bool {
        match self.expires_at {
            Some(at) => at <= Utc::now() + Duration::seconds(EXPIRY_LEEWAY_SECS),
            None => false,
        }
    }

    /// 원본 토큰 문자열 노출.
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    /// Authorization 헤더 값 반환.
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.expose())
    }
}

/// 외부 요청에 붙일 토큰 공급자.
///
/// API 클라이언트는 이 trait만 알고, 실제 토큰 획득은 세션/역할 해석기가
/// 담당합니다.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// 세션이 인증 상태라고 주장하는지 여부.
    fn is_authenticated(&self) -> bool;

    /// 토큰을 조용히 획득합니다.
    ///
    /// 토큰이 없으면 `Ok(None)`, 획득 자체가 실패하면 `Err`를 반환합니다.
    async fn access_token(&self) -> CoreResult<Option<AccessToken>>;
}
