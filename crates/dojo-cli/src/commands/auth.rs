//! 로그인, 로그아웃, 사용자 정보, 역할 선택.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use dojo_core::Role;
use tracing::info;

use super::guarded;
use crate::{render, AppContext};

/// 역할별 로그인.
///
/// 인증 URL을 출력하고, 사용자가 붙여 넣은 콜백 URL로 로그인을 완료합니다.
/// 로그인은 역할을 지정하지 않으며, 역할이 없으면 역할 선택으로 안내됩니다.
pub async fn login(ctx: &AppContext, role: Role) -> Result<()> {
    let redirect = match role {
        Role::Student => ctx.resolver.login_as_student().await?,
        Role::Teacher => ctx.resolver.login_as_teacher().await?,
    };

    println!(
        "Open this URL in your browser to sign in as a {}:\n\n  {}\n",
        role.display_name(),
        redirect.url
    );
    print!("Paste the callback URL: ");
    io::stdout().flush()?;

    let mut callback = String::new();
    io::stdin()
        .lock()
        .read_line(&mut callback)
        .context("Failed to read callback URL")?;

    let destination = match ctx.resolver.handle_redirect_callback(callback.trim()).await {
        Ok(destination) => destination,
        Err(e) => {
            let message = ctx
                .resolver
                .session()
                .error
                .map(|info| info.message)
                .unwrap_or_else(|| e.to_string());
            println!("{}", render::error_card(&message));
            return Err(e.into());
        }
    };

    ctx.persist_session()?;
    info!(role = %role, destination = %destination, "login completed");

    println!("\n{}\n", render::user_menu(&ctx.resolver.snapshot()));
    println!("→ {}", destination);
    println!("{}", render::guard_outcome(&ctx.check(Some(role), &destination)));
    Ok(())
}

pub async fn logout(ctx: &AppContext) -> Result<()> {
    let redirect = ctx.resolver.logout().await?;
    ctx.persist_session()?;
    println!("Signed out. Finish in the browser: {}", redirect.url);
    Ok(())
}

pub fn whoami(ctx: &AppContext) {
    println!("{}", render::user_menu(&ctx.resolver.snapshot()));
}

pub fn show_role(ctx: &AppContext) {
    let snapshot = ctx.resolver.snapshot();
    if !snapshot.session.is_authenticated {
        println!("Not signed in");
        return;
    }
    match snapshot.role {
        Some(role) => println!("{}", role.display_name()),
        None => println!("No role selected. Run `dojo role set student` or `dojo role set teacher`"),
    }
}

/// 역할 선택. 선택한 역할의 홈으로 안내합니다.
pub fn set_role(ctx: &AppContext, role: Role) -> Result<()> {
    let setup_path = ctx.config.routes.role_setup_path.clone();
    if !guarded(ctx, None, &setup_path) {
        return Ok(());
    }

    ctx.resolver.set_role(role)?;
    let home = ctx.home_for(role);
    println!("Role set to {}. Continue at {}", role.display_name(), home);
    println!("{}", render::guard_outcome(&ctx.check(Some(role), home)));
    Ok(())
}
