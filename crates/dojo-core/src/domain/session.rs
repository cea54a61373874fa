//! 세션 및 신원.
//!
//! 신원 제공자가 비동기로 갱신하는 인증 상태의 스냅샷입니다.
//! 다른 구성 요소에게는 읽기 전용입니다.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 신원 제공자가 보고한 에러 정보.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// 에러 코드 (예: "access_denied")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// 사용자에게 그대로 노출되는 메시지
    pub message: String,
}

impl ErrorInfo {
    /// 메시지만으로 에러 정보 생성.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// 코드를 포함한 에러 정보 생성.
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

/// 인증된 사용자의 신원.
///
/// 세션이 인증된 동안에만 존재하는 불변 스냅샷입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// 제공자 주체 ID (예: "auth0|abc123")
    pub subject_id: String,
    /// 표시 이름
    pub display_name: String,
    /// 이메일
    pub email: String,
    /// 아바타 이미지 URL
    pub avatar_url: String,
    /// 이메일 인증 여부
    pub email_verified: bool,
    /// 네임스페이스가 붙은 추가 클레임 (메타데이터 등)
    #[serde(default)]
    pub claims: HashMap<String, serde_json::Value>,
}

impl Identity {
    /// 기본 필드로 신원 생성.
    pub fn new(subject_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            display_name: display_name.into(),
            email: String::new(),
            avatar_url: String::new(),
            email_verified: false,
            claims: HashMap::new(),
        }
    }

    /// 이메일 설정.
    pub fn with_email(mut self, email: impl Into<String>, verified: bool) -> Self {
        self.email = email.into();
        self.email_verified = verified;
        self
    }

    /// 추가 클레임 설정.
    pub fn with_claim(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.claims.insert(key.into(), value);
        self
    }

    /// 추가 클레임 조회.
    pub fn claim(&self, key: &str) -> Option<&serde_json::Value> {
        self.claims.get(key)
    }
}

/// 현재 실행 컨텍스트의 인증 상태.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// 인증 여부
    pub is_authenticated: bool,
    /// 제공자가 상태를 확인하는 중인지 여부
    pub is_loading: bool,
    /// 제공자 에러
    pub error: Option<ErrorInfo>,
    /// 인증된 사용자 신원
    pub identity: Option<Identity>,
}

impl Session {
    /// 아직 확인 중인 세션.
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Default::default()
        }
    }

    /// 인증되지 않은 세션.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// 인증된 세션.
    pub fn authenticated(identity: Identity) -> Self {
        Self {
            is_authenticated: true,
            is_loading: false,
            error: None,
            identity: Some(identity),
        }
    }

    /// 에러가 발생한 세션.
    pub fn failed(error: ErrorInfo) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    /// 현재 사용자 주체 ID.
    pub fn subject_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.subject_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_constructors() {
        assert!(Session::loading().is_loading);
        assert!(!Session::anonymous().is_authenticated);

        let session = Session::authenticated(Identity::new("auth0|1", "Mina"));
        assert!(session.is_authenticated);
        assert_eq!(session.subject_id(), Some("auth0|1"));

        let failed = Session::failed(ErrorInfo::with_code("access_denied", "denied"));
        assert!(!failed.is_authenticated);
        assert_eq!(failed.error.unwrap().to_string(), "denied (access_denied)");
    }

    #[test]
    fn test_identity_claims() {
        let identity = Identity::new("auth0|1", "Mina")
            .with_email("mina@example.com", true)
            .with_claim("https://bankdojo.com/app_metadata", serde_json::json!({"role": "student"}));

        assert!(identity.email_verified);
        assert_eq!(
            identity.claim("https://bankdojo.com/app_metadata").and_then(|v| v.get("role")),
            Some(&serde_json::json!("student"))
        );
    }
}
