//! 메모리 신원 제공자.
//!
//! 세션과 토큰 결과를 직접 지정할 수 있는 제공자입니다. 테스트와
//! 네트워크 없이 동작하는 호스트에서 사용합니다.

use super::{AppState, IdentityProvider, LoginOptions, LoginRedirect, LogoutOptions, LogoutRedirect};
use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use dojo_core::{AccessToken, Session};
use std::sync::RwLock;

/// 조용한 토큰 요청의 결과 스크립트.
#[derive(Debug, Clone)]
pub enum TokenScript {
    /// 주어진 토큰 반환
    Issue(AccessToken),
    /// 로그인 필요
    LoginRequired,
    /// 획득 실패 (예: 리프레시 상태 만료)
    Fail(String),
}

#[derive(Debug)]
struct MemoryState {
    session: Session,
    token: TokenScript,
    logins: Vec<LoginOptions>,
    logouts: Vec<LogoutOptions>,
    callback_session: Option<Session>,
}

/// 메모리 신원 제공자.
#[derive(Debug)]
pub struct InMemoryProvider {
    state: RwLock<MemoryState>,
}

impl InMemoryProvider {
    /// 주어진 세션으로 생성.
    pub fn new(session: Session) -> Self {
        Self {
            state: RwLock::new(MemoryState {
                session,
                token: TokenScript::LoginRequired,
                logins: Vec::new(),
                logouts: Vec::new(),
                callback_session: None,
            }),
        }
    }

    /// 토큰 결과 지정.
    pub fn with_token(self, token: TokenScript) -> Self {
        self.set_token(token);
        self
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 세션 교체.
    pub fn set_session(&self, session: Session) {
        self.write().session = session;
    }

    /// 토큰 결과 교체.
    pub fn set_token(&self, token: TokenScript) {
        self.write().token = token;
    }

    /// 로그인 콜백이 완료되면 적용할 세션 지정.
    pub fn set_callback_session(&self, session: Session) {
        self.write().callback_session = Some(session);
    }

    /// 지금까지의 로그인 요청.
    pub fn login_requests(&self) -> Vec<LoginOptions> {
        self.read().logins.clone()
    }

    /// 지금까지의 로그아웃 요청.
    pub fn logout_requests(&self) -> Vec<LogoutOptions> {
        self.read().logouts.clone()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryProvider {
    fn session(&self) -> Session {
        self.read().session.clone()
    }

    async fn login_with_redirect(&self, options: LoginOptions) -> AuthResult<LoginRedirect> {
        let url = format!(
            "memory://authorize?redirect_uri={}&return_to={}",
            options.redirect_uri,
            options.app_state.return_to.as_deref().unwrap_or("")
        );
        self.write().logins.push(options);
        Ok(LoginRedirect { url })
    }

    async fn handle_redirect_callback(&self, _callback_url: &str) -> AuthResult<AppState> {
        let mut state = self.write();
        let login = state
            .logins
            .last()
            .cloned()
            .ok_or_else(|| AuthError::InvalidCallback("대기 중인 로그인 없음".to_string()))?;
        if let Some(session) = state.callback_session.take() {
            state.session = session;
        }
        Ok(login.app_state)
    }

    async fn get_access_token_silently(&self) -> AuthResult<AccessToken> {
        match &self.read().token {
            TokenScript::Issue(token) => Ok(token.clone()),
            TokenScript::LoginRequired => Err(AuthError::LoginRequired),
            TokenScript::Fail(reason) => Err(AuthError::TokenAcquisitionFailed(reason.clone())),
        }
    }

    async fn logout(&self, options: LogoutOptions) -> AuthResult<LogoutRedirect> {
        let url = format!("memory://logout?return_to={}", options.return_to);
        let mut state = self.write();
        state.session = Session::anonymous();
        state.logouts.push(options);
        Ok(LogoutRedirect { url })
    }
}
