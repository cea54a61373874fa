//! OIDC 신원 제공자 클라이언트.
//!
//! 처리 기능:
//! - 로그인 URL 생성 (GET /authorize, PKCE S256)
//! - 콜백 처리 및 코드 교환 (POST /oauth/token, authorization_code)
//! - 접근 토큰 조용한 갱신 (POST /oauth/token, refresh_token)
//! - 로그아웃 URL 생성 (GET /v2/logout)

use super::{
    claims::decode_id_token, pkce, AppState, IdentityProvider, LoginOptions, LoginRedirect,
    LogoutOptions, LogoutRedirect,
};
use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dojo_core::{AccessToken, AuthConfig, ErrorInfo, Session};
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, error, info, warn};

/// 기본 요청 scope.
const DEFAULT_SCOPE: &str = "openid profile email offline_access";

/// 콜백 대기 로그인 최대 보관 수.
const MAX_PENDING_LOGINS: usize = 8;

/// 콜백 대기 로그인 유효 시간.
const PENDING_LOGIN_TTL: std::time::Duration = std::time::Duration::from_secs(600);

/// OIDC 제공자 설정.
#[derive(Debug, Clone)]
pub struct OidcConfig {
    /// 제공자 기본 URL (예: "https://bankdojo.us.auth0.com")
    pub domain: String,
    /// OAuth 클라이언트 ID
    pub client_id: String,
    /// API audience
    pub audience: Option<String>,
    /// 요청 scope
    pub scope: String,
    /// HTTP 타임아웃 (초)
    pub timeout_secs: u64,
}

impl OidcConfig {
    /// 인증 설정에서 생성.
    pub fn from_auth_config(config: &AuthConfig, timeout_secs: u64) -> Self {
        Self {
            domain: config.domain.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            audience: config.audience.clone(),
            scope: DEFAULT_SCOPE.to_string(),
            timeout_secs,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.domain.trim_end_matches('/'), path)
    }
}

/// 토큰 엔드포인트 응답.
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    /// 만료 시간 (초)
    expires_in: i64,
}

/// OAuth 에러 응답.
#[derive(Debug, Clone, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// 호스트가 보관할 수 있는 세션 정보.
///
/// 접근 토큰은 포함하지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSession {
    /// ID 토큰
    pub id_token: String,
    /// 리프레시 토큰
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// 콜백 대기 중인 로그인.
#[derive(Debug, Clone)]
struct PendingLogin {
    created_at: std::time::Instant,
    code_verifier: String,
    redirect_uri: String,
    app_state: AppState,
}

/// 발급받은 토큰 묶음.
#[derive(Debug, Clone)]
struct TokenSet {
    access_token: Option<AccessToken>,
    refresh_token: Option<SecretString>,
    id_token: String,
}

#[derive(Debug, Default)]
struct ProviderState {
    session: Session,
    tokens: Option<TokenSet>,
    pending: HashMap<String, PendingLogin>,
}

/// OIDC 신원 제공자.
///
/// 접근 토큰은 메모리에만 보관하며, 만료가 임박하면 리프레시 토큰으로
/// 조용히 갱신합니다.
pub struct OidcProvider {
    config: OidcConfig,
    client: Client,
    state: RwLock<ProviderState>,
}

impl OidcProvider {
    /// 새 OIDC 제공자 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `AuthError::Network`를 반환합니다.
    pub fn new(config: OidcConfig) -> AuthResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AuthError::Network(format!("HTTP client 생성 실패: {}", e)))?;

        Ok(Self {
            config,
            client,
            state: RwLock::new(ProviderState::default()),
        })
    }

    /// 설정 반환.
    pub fn config(&self) -> &OidcConfig {
        &self.config
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, ProviderState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, ProviderState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 보관할 세션 정보 내보내기.
    pub fn export_session(&self) -> Option<PersistedSession> {
        let state = self.read_state();
        state.tokens.as_ref().map(|tokens| PersistedSession {
            id_token: tokens.id_token.clone(),
            refresh_token: tokens
                .refresh_token
                .as_ref()
                .map(|t| t.expose_secret().to_string()),
        })
    }

    /// 보관한 세션 정보로 인증 상태 복원.
    ///
    /// 접근 토큰은 첫 요청 시 리프레시 토큰으로 새로 받아옵니다.
    pub fn restore_session(&self, persisted: PersistedSession) -> AuthResult<()> {
        let identity = decode_id_token(&persisted.id_token)?;
        debug!(subject = %identity.subject_id, "restoring persisted session");

        let mut state = self.write_state();
        state.tokens = Some(TokenSet {
            access_token: None,
            refresh_token: persisted.refresh_token.map(SecretString::from),
            id_token: persisted.id_token,
        });
        state.session = Session::authenticated(identity);
        Ok(())
    }

    fn set_session_error(&self, info: ErrorInfo) {
        let mut state = self.write_state();
        state.tokens = None;
        state.session = Session::failed(info);
    }

    /// 토큰 엔드포인트 호출.
    async fn request_token(&self, body: &serde_json::Value) -> AuthResult<TokenResponse> {
        let url = self.config.endpoint("/oauth/token");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json; charset=utf-8")
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("Token request failed: {} - {}", status, text);

            if let Ok(oauth_error) = serde_json::from_str::<OAuthErrorResponse>(&text) {
                return Err(match oauth_error.error.as_str() {
                    "invalid_grant" | "login_required" | "consent_required" => {
                        AuthError::LoginRequired
                    }
                    _ => AuthError::Provider(ErrorInfo {
                        message: oauth_error
                            .error_description
                            .unwrap_or_else(|| oauth_error.error.clone()),
                        code: Some(oauth_error.error),
                    }),
                });
            }

            return Err(AuthError::TokenAcquisitionFailed(format!(
                "Token request failed with status {}",
                status.as_u16()
            )));
        }

        serde_json::from_str(&text).map_err(|e| {
            AuthError::TokenAcquisitionFailed(format!("Failed to parse token response: {}", e))
        })
    }

    /// 리프레시 토큰으로 접근 토큰 갱신.
    async fn refresh(&self, refresh_token: &str) -> AuthResult<AccessToken> {
        info!("Refreshing access token...");

        let body = serde_json::json!({
            "grant_type": "refresh_token",
            "client_id": self.config.client_id,
            "refresh_token": refresh_token,
        });

        let response = self.request_token(&body).await?;
        let access_token = AccessToken::new(
            response.access_token,
            expiry_from(response.expires_in),
        );

        let mut state = self.write_state();
        if let Some(tokens) = state.tokens.as_mut() {
            tokens.access_token = Some(access_token.clone());
            // 회전된 토큰만 교체
            if let Some(rotated) = response.refresh_token {
                tokens.refresh_token = Some(SecretString::from(rotated));
            }
            if let Some(id_token) = response.id_token {
                tokens.id_token = id_token;
            }
        }

        debug!(expires_at = ?access_token.expires_at(), "access token refreshed");
        Ok(access_token)
    }
}

/// `expires_in`(초)으로 만료 시각 계산.
///
/// 표현할 수 없는 값이면 만료 시각 없이 취급합니다.
fn expiry_from(expires_in: i64) -> Option<DateTime<Utc>> {
    let expiry = Duration::try_seconds(expires_in).and_then(|d| Utc::now().checked_add_signed(d));
    if expiry.is_none() {
        warn!(expires_in, "ignoring unrepresentable token lifetime");
    }
    expiry
}

/// 만료된 대기 로그인을 정리하고, 상한을 넘으면 가장 오래된 것부터 제거.
fn prune_pending(pending: &mut HashMap<String, PendingLogin>) {
    pending.retain(|_, login| login.created_at.elapsed() < PENDING_LOGIN_TTL);
    while pending.len() >= MAX_PENDING_LOGINS {
        let oldest = pending
            .iter()
            .min_by_key(|(_, login)| login.created_at)
            .map(|(state, _)| state.clone());
        match oldest {
            Some(state) => {
                debug!("dropping abandoned login attempt");
                pending.remove(&state);
            }
            None => break,
        }
    }
}

/// 콜백 URL에서 쿼리 파라미터 추출.
fn callback_params(callback_url: &str) -> AuthResult<HashMap<String, String>> {
    let url = Url::parse(callback_url)
        .map_err(|e| AuthError::InvalidCallback(format!("URL 파싱 실패: {}", e)))?;
    Ok(url.query_pairs().into_owned().collect())
}

#[async_trait]
impl IdentityProvider for OidcProvider {
    fn session(&self) -> Session {
        self.read_state().session.clone()
    }

    async fn login_with_redirect(&self, options: LoginOptions) -> AuthResult<LoginRedirect> {
        let code_verifier = pkce::generate_code_verifier();
        let code_challenge = pkce::generate_code_challenge(&code_verifier);
        let state_param = uuid::Uuid::new_v4().simple().to_string();

        let mut params = vec![
            ("response_type", "code".to_string()),
            ("client_id", self.config.client_id.clone()),
            ("redirect_uri", options.redirect_uri.clone()),
            ("scope", self.config.scope.clone()),
            ("state", state_param.clone()),
            ("code_challenge", code_challenge),
            ("code_challenge_method", "S256".to_string()),
        ];
        if let Some(audience) = &self.config.audience {
            params.push(("audience", audience.clone()));
        }

        let url = Url::parse_with_params(&self.config.endpoint("/authorize"), &params)
            .map_err(|e| AuthError::InvalidCallback(format!("authorize URL 생성 실패: {}", e)))?;

        info!(return_to = ?options.app_state.return_to, "login redirect prepared");

        {
            let mut state = self.write_state();
            prune_pending(&mut state.pending);
            state.pending.insert(
                state_param,
                PendingLogin {
                    created_at: std::time::Instant::now(),
                    code_verifier,
                    redirect_uri: options.redirect_uri,
                    app_state: options.app_state,
                },
            );
        }

        Ok(LoginRedirect {
            url: url.to_string(),
        })
    }

    async fn handle_redirect_callback(&self, callback_url: &str) -> AuthResult<AppState> {
        let params = callback_params(callback_url)?;

        if let Some(code) = params.get("error") {
            let message = params
                .get("error_description")
                .cloned()
                .unwrap_or_else(|| code.clone());
            let info = ErrorInfo::with_code(code.clone(), message);
            warn!(error = %info, "provider returned an error on callback");
            self.set_session_error(info.clone());
            return Err(AuthError::Provider(info));
        }

        let code = params
            .get("code")
            .ok_or_else(|| AuthError::InvalidCallback("code 파라미터 없음".to_string()))?;
        let state_param = params
            .get("state")
            .ok_or_else(|| AuthError::InvalidCallback("state 파라미터 없음".to_string()))?;

        let pending = self
            .write_state()
            .pending
            .remove(state_param)
            .ok_or_else(|| AuthError::InvalidCallback("알 수 없는 state".to_string()))?;

        self.write_state().session.is_loading = true;

        let body = serde_json::json!({
            "grant_type": "authorization_code",
            "client_id": self.config.client_id,
            "code": code,
            "code_verifier": pending.code_verifier,
            "redirect_uri": pending.redirect_uri,
        });

        let response = match self.request_token(&body).await {
            Ok(r) => r,
            Err(e) => {
                let info = match &e {
                    AuthError::Provider(info) => info.clone(),
                    other => ErrorInfo::new(other.to_string()),
                };
                self.set_session_error(info);
                return Err(e);
            }
        };

        let id_token = match response.id_token {
            Some(t) => t,
            None => {
                let info = ErrorInfo::new("ID 토큰이 응답에 없습니다");
                self.set_session_error(info.clone());
                return Err(AuthError::Provider(info));
            }
        };

        let identity = match decode_id_token(&id_token) {
            Ok(identity) => identity,
            Err(e) => {
                self.set_session_error(ErrorInfo::new(e.to_string()));
                return Err(e);
            }
        };

        info!(subject = %identity.subject_id, "login completed");

        let mut state = self.write_state();
        state.tokens = Some(TokenSet {
            access_token: Some(AccessToken::new(
                response.access_token,
                expiry_from(response.expires_in),
            )),
            refresh_token: response.refresh_token.map(SecretString::from),
            id_token,
        });
        state.session = Session::authenticated(identity);

        Ok(pending.app_state)
    }

    async fn get_access_token_silently(&self) -> AuthResult<AccessToken> {
        let refresh_token = {
            let state = self.read_state();
            let tokens = state.tokens.as_ref().ok_or(AuthError::LoginRequired)?;

            if let Some(token) = &tokens.access_token {
                if !token.is_expired_or_expiring() {
                    debug!("Using cached access token");
                    return Ok(token.clone());
                }
                warn!(expires_at = ?token.expires_at(), "access token expired or expiring soon");
            }

            tokens
                .refresh_token
                .as_ref()
                .map(|t| t.expose_secret().to_string())
                .ok_or(AuthError::LoginRequired)?
        };

        self.refresh(&refresh_token).await
    }

    async fn logout(&self, options: LogoutOptions) -> AuthResult<LogoutRedirect> {
        {
            let mut state = self.write_state();
            state.tokens = None;
            state.pending.clear();
            state.session = Session::anonymous();
        }

        let url = Url::parse_with_params(
            &self.config.endpoint("/v2/logout"),
            &[
                ("client_id", self.config.client_id.as_str()),
                ("returnTo", options.return_to.as_str()),
            ],
        )
        .map_err(|e| AuthError::InvalidCallback(format!("logout URL 생성 실패: {}", e)))?;

        info!("Logged out");
        Ok(LogoutRedirect {
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(domain: &str) -> OidcProvider {
        OidcProvider::new(OidcConfig {
            domain: domain.to_string(),
            client_id: "client-123".to_string(),
            audience: Some("https://api.bankdojo.com".to_string()),
            scope: DEFAULT_SCOPE.to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_login_url_contains_pkce_and_state() {
        let provider = provider("https://tenant.example.com");
        let redirect = provider
            .login_with_redirect(LoginOptions {
                redirect_uri: "http://localhost/callback".to_string(),
                app_state: AppState::default(),
            })
            .await
            .unwrap();

        let url = Url::parse(&redirect.url).unwrap();
        assert_eq!(url.path(), "/authorize");
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "client-123");
        assert_eq!(params["code_challenge_method"], "S256");
        assert_eq!(params["audience"], "https://api.bankdojo.com");
        assert!(provider.read_state().pending.contains_key(&params["state"]));
    }

    #[tokio::test]
    async fn test_callback_with_unknown_state_is_rejected() {
        let provider = provider("https://tenant.example.com");
        let err = provider
            .handle_redirect_callback("http://localhost/callback?code=abc&state=nope")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCallback(_)));
    }

    #[tokio::test]
    async fn test_callback_error_is_recorded_on_session() {
        let provider = provider("https://tenant.example.com");
        let err = provider
            .handle_redirect_callback(
                "http://localhost/callback?error=access_denied&error_description=Please%20verify%20your%20email",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Provider(_)));
        let session = provider.session();
        assert!(!session.is_authenticated);
        assert_eq!(
            session.error.unwrap().message,
            "Please verify your email"
        );
    }

    #[tokio::test]
    async fn test_silent_token_without_session_requires_login() {
        let provider = provider("https://tenant.example.com");
        assert!(matches!(
            provider.get_access_token_silently().await,
            Err(AuthError::LoginRequired)
        ));
    }

    #[tokio::test]
    async fn test_logout_url() {
        let provider = provider("https://tenant.example.com/");
        let redirect = provider
            .logout(LogoutOptions {
                return_to: "http://localhost:5173".to_string(),
            })
            .await
            .unwrap();
        assert!(redirect
            .url
            .starts_with("https://tenant.example.com/v2/logout?client_id=client-123"));
        assert!(!provider.session().is_authenticated);
    }

    #[test]
    fn test_huge_expires_in_does_not_panic() {
        assert!(expiry_from(i64::MAX).is_none());
        let expiry = expiry_from(3600).unwrap();
        assert!(expiry > Utc::now());
    }

    #[tokio::test]
    async fn test_abandoned_logins_are_bounded() {
        let provider = provider("https://tenant.example.com");
        for _ in 0..(MAX_PENDING_LOGINS * 3) {
            provider
                .login_with_redirect(LoginOptions {
                    redirect_uri: "http://localhost/callback".to_string(),
                    app_state: AppState::default(),
                })
                .await
                .unwrap();
        }
        assert!(provider.read_state().pending.len() <= MAX_PENDING_LOGINS);
    }
}
