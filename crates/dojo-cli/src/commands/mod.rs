//! CLI 명령어 구현 모듈.

pub mod auth;
pub mod health;
pub mod open;
pub mod quests;
pub mod room;
pub mod store;
pub mod transactions;

use dojo_core::Role;

use crate::{render, AppContext};

/// 가드를 통과하지 못하면 결과를 출력하고 false를 반환.
pub(crate) fn guarded(ctx: &AppContext, required: Option<Role>, path: &str) -> bool {
    let outcome = ctx.check(required, path);
    if outcome.is_granted() {
        return true;
    }
    println!("{}", render::guard_outcome(&outcome));
    false
}

/// 학생 데이터 명령의 대상 학생 결정.
///
/// 다른 학생을 명시하면 로그인만 확인하고, 본인 데이터는 학생 역할을
/// 요구합니다.
pub(crate) fn target_student(
    ctx: &AppContext,
    explicit: Option<String>,
    path: &str,
) -> Option<String> {
    let required = if explicit.is_some() {
        None
    } else {
        Some(Role::Student)
    };
    if !guarded(ctx, required, path) {
        return None;
    }
    ctx.student_id(explicit)
}
