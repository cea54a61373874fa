//! 신원 제공자 경계.
//!
//! 토큰 발급과 암호학적 검증은 외부 제공자의 몫이며, 이 모듈은 그
//! 기능을 사용하는 인터페이스만 정의합니다.
//!
//! - [`OidcProvider`]: Authorization Code + PKCE 흐름의 OIDC 클라이언트
//! - [`InMemoryProvider`]: 테스트 및 오프라인 호스트용 스크립트 제공자

mod claims;
mod memory;
mod oidc;
mod pkce;

pub use claims::decode_id_token;
pub use memory::{InMemoryProvider, TokenScript};
pub use oidc::{OidcConfig, OidcProvider, PersistedSession};
pub use pkce::{generate_code_challenge, generate_code_verifier};

use async_trait::async_trait;
use dojo_core::{AccessToken, Role, Session};
use serde::{Deserialize, Serialize};

use crate::AuthResult;

/// 로그인 후 라우팅에 사용하는 애플리케이션 상태.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    /// 로그인 후 이동할 경로
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_to: Option<String>,
    /// 로그인 버튼이 의도한 역할 (역할을 지정하지는 않음)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intended_role: Option<Role>,
}

/// 로그인 시작 옵션.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOptions {
    /// 제공자가 콜백할 URI
    pub redirect_uri: String,
    /// 콜백까지 유지되는 애플리케이션 상태
    pub app_state: AppState,
}

/// 로그아웃 옵션.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutOptions {
    /// 로그아웃 후 돌아올 URI
    pub return_to: String,
}

/// 호스트가 열어야 하는 로그인 URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    pub url: String,
}

/// 호스트가 열어야 하는 로그아웃 URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutRedirect {
    pub url: String,
}

/// 외부 신원 제공자 인터페이스.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// 현재 세션 스냅샷.
    fn session(&self) -> Session;

    /// 연합 로그인 리다이렉트를 시작합니다.
    async fn login_with_redirect(&self, options: LoginOptions) -> AuthResult<LoginRedirect>;

    /// 로그인 콜백을 처리하고 시작 시 전달한 애플리케이션 상태를 돌려줍니다.
    async fn handle_redirect_callback(&self, callback_url: &str) -> AuthResult<AppState>;

    /// 사용자 상호작용 없이 새 접근 토큰을 요청합니다.
    async fn get_access_token_silently(&self) -> AuthResult<AccessToken>;

    /// 제공자 로그아웃. 세션을 비웁니다.
    async fn logout(&self, options: LogoutOptions) -> AuthResult<LogoutRedirect>;
}
