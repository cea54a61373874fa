//! 퀘스트 명령.

use anyhow::Result;
use dojo_core::Role;

use super::{guarded, target_student};
use crate::{render, AppContext};

const QUESTS_PATH: &str = "/quests";

pub async fn list(ctx: &AppContext, class_id: &str) -> Result<()> {
    if !guarded(ctx, None, QUESTS_PATH) {
        return Ok(());
    }
    let quests = ctx.queries.quests(Some(class_id)).await?.unwrap_or_default();

    // 학생에게만 완료 표시
    let student_id = if ctx.resolver.current_role() == Some(Role::Student) {
        ctx.student_id(None)
    } else {
        None
    };
    println!("{}", render::quests(&quests, student_id.as_deref()));
    Ok(())
}

pub async fn complete(ctx: &AppContext, quest_id: &str, student: Option<String>) -> Result<()> {
    let Some(student_id) = target_student(ctx, student, QUESTS_PATH) else {
        return Ok(());
    };
    let completion = ctx.queries.complete_quest(quest_id, &student_id).await?;
    println!(
        "Quest complete! +{}. New balance: {}",
        render::coins(completion.reward),
        render::coins(completion.new_balance)
    );
    Ok(())
}
