//! 서버 상태 확인.

use std::time::Duration;

use anyhow::Result;
use dojo_core::KeyValueStore;
use tracing::info;

use crate::{render, AppContext};

/// 다른 프로세스의 저장소 변경 확인 주기.
const STORAGE_WATCH_INTERVAL: Duration = Duration::from_secs(2);

pub async fn check(ctx: &AppContext) -> Result<()> {
    match ctx.queries.health().await? {
        Some(health) => println!("{}", render::health(&dojo_client::QueryState::success(health))),
        None => println!("{}", render::loading_card()),
    }
    Ok(())
}

/// Ctrl+C까지 주기적으로 상태 출력.
///
/// 다른 터미널에서 역할을 바꾸면 새 역할도 출력합니다.
pub async fn watch(ctx: &AppContext) -> Result<()> {
    info!(
        interval_secs = ctx.config.api.health_poll_secs,
        "watching API health"
    );
    let mut poll = ctx.queries.watch_health();
    let mut storage = ctx.store.subscribe();
    let storage_watch = ctx.store.watch(STORAGE_WATCH_INTERVAL);

    loop {
        tokio::select! {
            state = poll.next() => match state {
                Some(state) => println!("{}", render::health(&state)),
                None => break,
            },
            event = storage.recv() => {
                if let Ok(event) = event {
                    if event.key.as_deref() == Some(ctx.config.auth.role_storage_key.as_str()) {
                        println!("{}", render::role_changed(ctx.resolver.current_role()));
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    storage_watch.abort();
    Ok(())
}
