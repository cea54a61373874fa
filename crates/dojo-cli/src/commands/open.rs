//! 보호된 경로 열기.

use dojo_auth::GuardAction;
use dojo_core::Role;

use crate::{render, AppContext};

/// 경로에 대한 가드 결과와 후속 동작 출력.
pub fn open(ctx: &AppContext, path: &str, require: Option<Role>) {
    let outcome = ctx.check(require, path);
    println!("{}", render::guard_outcome(&outcome));

    match outcome.action() {
        Some(GuardAction::Navigate { to }) => println!("→ redirecting to {}", to),
        Some(GuardAction::Login { return_to }) => {
            println!("→ after login you will return to {}", return_to)
        }
        Some(GuardAction::Reload) => println!("→ reload with `dojo whoami`"),
        None => {}
    }
}
