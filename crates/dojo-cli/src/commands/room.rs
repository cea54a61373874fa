//! 방 꾸미기 명령.

use std::path::Path;

use anyhow::{Context, Result};
use dojo_client::RoomLayout;

use super::target_student;
use crate::{render, AppContext};

const ROOM_PATH: &str = "/room";

pub async fn show(ctx: &AppContext, student: Option<String>) -> Result<()> {
    let Some(student_id) = target_student(ctx, student, ROOM_PATH) else {
        return Ok(());
    };
    let layout = ctx
        .queries
        .student_room(Some(&student_id))
        .await?
        .unwrap_or_default();
    println!("{}", render::room(&layout));
    Ok(())
}

/// JSON 파일의 배치로 방을 저장.
pub async fn set(ctx: &AppContext, layout_file: &Path) -> Result<()> {
    let Some(student_id) = target_student(ctx, None, ROOM_PATH) else {
        return Ok(());
    };

    let raw = std::fs::read_to_string(layout_file)
        .with_context(|| format!("Failed to read {}", layout_file.display()))?;
    let layout: RoomLayout = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid room layout in {}", layout_file.display()))?;

    let saved = ctx.queries.update_room(&student_id, &layout).await?;
    println!("Room saved.\n{}", render::room(&saved));
    Ok(())
}
