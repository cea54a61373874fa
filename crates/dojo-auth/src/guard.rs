//! 라우트 가드.
//!
//! 세션, 역할, 요구 역할, 현재 경로로부터 보호된 페이지의 처리 방식을
//! 결정합니다. 가드 자체는 상태를 갖지 않으며 매번 현재 입력으로 다시
//! 평가합니다.
//!
//! | 결과 | 조건 |
//! |---|---|
//! | `Loading` | 세션 확인 중 |
//! | `Errored` | 제공자 에러 |
//! | `Unauthenticated` | 인증되지 않음 |
//! | `NeedsRoleSelection` | 요구 역할이 있고 역할 선택이 필요함 |
//! | `AccessDenied` | 요구 역할과 현재 역할이 다름 |
//! | `Granted` | 위 조건에 해당하지 않음 |

use dojo_core::{Role, RoutesConfig, Session};
use serde::Serialize;

use crate::RoleResolver;

/// 가드 결과에 따른 후속 동작.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GuardAction {
    /// 세션 전체 다시 불러오기
    Reload,
    /// 로그인 후 `return_to`로 복귀
    Login { return_to: String },
    /// 다른 경로로 이동
    Navigate { to: String },
}

/// 가드 평가 결과.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GuardOutcome {
    /// 로딩 표시
    Loading,
    /// 에러 표시 (다시 시도 = 전체 새로고침)
    Errored { message: String },
    /// 로그인 안내. 로그인 후 현재 경로로 돌아옴
    Unauthenticated { return_to: String },
    /// 역할 선택 페이지로 리다이렉트
    NeedsRoleSelection { redirect_to: String },
    /// 접근 거부 (요구 역할과 현재 역할 표시)
    AccessDenied {
        required: Role,
        current: Option<Role>,
        fallback: String,
    },
    /// 보호된 콘텐츠 렌더링
    Granted,
}

impl GuardOutcome {
    /// 보호된 콘텐츠를 렌더링해도 되는지 여부.
    pub fn is_granted(&self) -> bool {
        matches!(self, GuardOutcome::Granted)
    }

    /// 결과에 딸린 후속 동작.
    pub fn action(&self) -> Option<GuardAction> {
        match self {
            GuardOutcome::Loading | GuardOutcome::Granted => None,
            GuardOutcome::Errored { .. } => Some(GuardAction::Reload),
            GuardOutcome::Unauthenticated { return_to } => Some(GuardAction::Login {
                return_to: return_to.clone(),
            }),
            GuardOutcome::NeedsRoleSelection { redirect_to } => Some(GuardAction::Navigate {
                to: redirect_to.clone(),
            }),
            GuardOutcome::AccessDenied { fallback, .. } => Some(GuardAction::Navigate {
                to: fallback.clone(),
            }),
        }
    }
}

/// 라우트 가드.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    role_setup_path: String,
    fallback_path: String,
}

impl RouteGuard {
    /// 경로 설정으로 생성.
    pub fn new(routes: &RoutesConfig) -> Self {
        Self {
            role_setup_path: routes.role_setup_path.clone(),
            fallback_path: routes.fallback_path.clone(),
        }
    }

    /// 접근 거부 시 돌아갈 경로 변경.
    pub fn with_fallback(mut self, fallback_path: impl Into<String>) -> Self {
        self.fallback_path = fallback_path.into();
        self
    }

    /// 주어진 입력으로 가드를 평가합니다.
    ///
    /// 요구 역할이 없으면 역할이 없어도 역할 선택을 요구하지 않습니다.
    /// 역할이 없는 사용자는 어떤 요구 역할과도 일치하지 않습니다.
    pub fn evaluate(
        &self,
        session: &Session,
        role: Option<Role>,
        required_role: Option<Role>,
        current_path: &str,
    ) -> GuardOutcome {
        if session.is_loading {
            return GuardOutcome::Loading;
        }

        if let Some(error) = &session.error {
            return GuardOutcome::Errored {
                message: error.message.clone(),
            };
        }

        if !session.is_authenticated {
            return GuardOutcome::Unauthenticated {
                return_to: current_path.to_string(),
            };
        }

        let Some(required) = required_role else {
            return GuardOutcome::Granted;
        };

        let needs_role_selection = session.identity.is_some() && role.is_none();
        if needs_role_selection {
            return GuardOutcome::NeedsRoleSelection {
                redirect_to: self.role_setup_path.clone(),
            };
        }

        if role != Some(required) {
            return GuardOutcome::AccessDenied {
                required,
                current: role,
                fallback: self.fallback_path.clone(),
            };
        }

        GuardOutcome::Granted
    }

    /// 해석기의 현재 상태로 가드를 평가합니다.
    pub fn check(
        &self,
        resolver: &RoleResolver,
        required_role: Option<Role>,
        current_path: &str,
    ) -> GuardOutcome {
        let session = resolver.session();
        // 인증 전에는 역할을 해석하지 않음 (메타데이터 반영 부작용 방지)
        let role = if session.is_authenticated {
            resolver.current_role()
        } else {
            None
        };
        self.evaluate(&session, role, required_role, current_path)
    }
}
