//! 거래 내역 명령.

use anyhow::Result;

use super::target_student;
use crate::{render, AppContext};

pub async fn list(ctx: &AppContext, student: Option<String>) -> Result<()> {
    let Some(student_id) = target_student(ctx, student, "/transactions") else {
        return Ok(());
    };
    let history = ctx
        .queries
        .transactions(Some(&student_id))
        .await?
        .unwrap_or_default();
    println!("{}", render::transactions(&history));
    Ok(())
}
