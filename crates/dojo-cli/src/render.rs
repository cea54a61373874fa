//! 터미널 출력 형식.
//!
//! 모든 함수는 출력할 문자열을 반환하며, 실제 출력은 명령 계층이 담당합니다.

use std::fmt::Write;

use dojo_auth::{AuthSnapshot, GuardOutcome};
use dojo_client::{
    ApiError, HealthStatus, InventoryItem, QueryState, QueryStatus, Quest, RoomLayout, StoreItem, Student,
    Transaction,
};
use dojo_core::Role;
use rust_decimal::Decimal;

/// 로딩 카드.
pub fn loading_card() -> String {
    "⏳ Loading...".to_string()
}

/// 에러 카드. 다시 시도하면 세션 전체를 새로 불러옵니다.
pub fn error_card(message: &str) -> String {
    format!(
        "⚠️  Something went wrong\n   {}\n   Try again: rerun the command or `dojo login`",
        message
    )
}

/// 명령 실패 표시.
///
/// API가 401을 돌려주면 로그인 안내를, 403이면 접근 거부를 보여 줍니다.
pub fn failure(error: &anyhow::Error) -> String {
    match error.chain().find_map(|cause| cause.downcast_ref::<ApiError>()) {
        Some(ApiError::AuthenticationRequired) => format!(
            "🔒 Your session has expired or you are not signed in\n   {}",
            LOGIN_HINT
        ),
        Some(ApiError::PermissionDenied) => {
            "⛔ Access denied\n   Your role does not allow this action.\n   Check it with `dojo role show`"
                .to_string()
        }
        _ => error_card(&format!("{:#}", error)),
    }
}

/// 다른 곳에서 역할이 바뀌었을 때 표시.
pub fn role_changed(role: Option<Role>) -> String {
    format!(
        "🔄 Role changed: {}",
        role.map(|r| r.display_name()).unwrap_or("none")
    )
}

const LOGIN_HINT: &str = "Run `dojo login --as student` or `dojo login --as teacher`";

/// 가드 결과 표시.
pub fn guard_outcome(outcome: &GuardOutcome) -> String {
    match outcome {
        GuardOutcome::Loading => loading_card(),
        GuardOutcome::Errored { message } => error_card(message),
        GuardOutcome::Unauthenticated { return_to } => format!(
            "🔒 Please log in to continue\n   You will return to {} after signing in.\n   {}",
            return_to, LOGIN_HINT
        ),
        GuardOutcome::NeedsRoleSelection { redirect_to } => format!(
            "🧭 Choose your role first ({})\n   Run `dojo role set student` or `dojo role set teacher`",
            redirect_to
        ),
        GuardOutcome::AccessDenied {
            required,
            current,
            fallback,
        } => format!(
            "⛔ Access denied\n   Required role: {}\n   Your role:     {}\n   Go back to {}",
            required.display_name(),
            current.map(|r| r.display_name()).unwrap_or("none"),
            fallback
        ),
        GuardOutcome::Granted => "✅ Access granted".to_string(),
    }
}

/// 사용자 메뉴 (이름, 이메일, 역할).
pub fn user_menu(snapshot: &AuthSnapshot) -> String {
    let Some(identity) = snapshot.session.identity.as_ref() else {
        return "Not signed in".to_string();
    };

    let mut out = String::new();
    let initial = identity
        .display_name
        .chars()
        .next()
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_else(|| "?".to_string());
    let _ = writeln!(out, "[{}] {}", initial, identity.display_name);
    if !identity.email.is_empty() {
        let verified = if identity.email_verified { "" } else { " (unverified)" };
        let _ = writeln!(out, "    {}{}", identity.email, verified);
    }
    let role = match snapshot.role {
        Some(role) => role.display_name().to_string(),
        None if snapshot.needs_role_selection => "not selected".to_string(),
        None => "none".to_string(),
    };
    let _ = write!(out, "    Role: {}", role);
    out
}

/// 코인 금액 표시.
pub fn coins(amount: Decimal) -> String {
    format!("{} coins", amount.normalize())
}

pub fn student_summary(student: &Student) -> String {
    format!("{} · balance {}", student.name, coins(student.balance))
}

pub fn store_items(items: &[StoreItem]) -> String {
    if items.is_empty() {
        return "The store is empty.".to_string();
    }
    let mut out = format!("{:<12} {:<24} {:<12} {:>10}\n", "ID", "NAME", "CATEGORY", "PRICE");
    for item in items {
        let _ = writeln!(
            out,
            "{:<12} {:<24} {:<12} {:>10}",
            item.id,
            item.name,
            format!("{:?}", item.category).to_lowercase(),
            item.price.normalize()
        );
    }
    out.trim_end().to_string()
}

pub fn inventory(items: &[InventoryItem]) -> String {
    if items.is_empty() {
        return "No items yet. Visit the store with `dojo store items`.".to_string();
    }
    items
        .iter()
        .map(|item| format!("• {} ({})", item.name, item.item_id))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 퀘스트 목록. 학생 ID가 있으면 완료 여부를 표시합니다.
pub fn quests(quests: &[Quest], student_id: Option<&str>) -> String {
    if quests.is_empty() {
        return "No quests for this class.".to_string();
    }
    quests
        .iter()
        .map(|quest| {
            let mark = match student_id {
                Some(id) if quest.is_completed_by(id) => "[x]",
                Some(_) => "[ ]",
                None => " - ",
            };
            format!(
                "{} {} · {} (+{})",
                mark,
                quest.id,
                quest.title,
                coins(quest.reward)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn transactions(transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return "No transactions yet.".to_string();
    }
    transactions
        .iter()
        .map(|tx| {
            let sign = if tx.kind.is_debit() { "-" } else { "+" };
            format!(
                "{}  {}{:<8} {}",
                tx.created_at.format("%Y-%m-%d"),
                sign,
                tx.amount.abs().normalize(),
                tx.description.as_deref().unwrap_or("")
            )
            .trim_end()
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn room(layout: &RoomLayout) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Wallpaper: {}",
        layout.wallpaper.as_deref().unwrap_or("default")
    );
    let _ = writeln!(out, "Floor:     {}", layout.floor.as_deref().unwrap_or("default"));
    if layout.items.is_empty() {
        out.push_str("No furniture placed.");
    } else {
        for item in &layout.items {
            let _ = writeln!(out, "• {} at ({}, {})", item.item_id, item.x, item.y);
        }
    }
    out.trim_end().to_string()
}

/// 헬스 폴링 상태 표시.
pub fn health(state: &QueryState<HealthStatus>) -> String {
    match (state.status, &state.data, &state.error) {
        (QueryStatus::Loading, _, _) | (QueryStatus::Idle, _, _) => loading_card(),
        (QueryStatus::Error, _, Some(e)) => format!("🔴 API unreachable: {}", e),
        (_, Some(health), _) if health.is_healthy() => format!("🟢 API {}", health.status),
        (_, Some(health), _) => format!("🟡 API {}", health.status),
        _ => "🔴 API status unknown".to_string(),
    }
}
