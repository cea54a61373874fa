//! 상점 명령.

use anyhow::Result;
use dojo_client::PurchaseRequest;

use super::{guarded, target_student};
use crate::{render, AppContext};

const STORE_PATH: &str = "/store";

pub async fn items(ctx: &AppContext) -> Result<()> {
    if !guarded(ctx, None, STORE_PATH) {
        return Ok(());
    }
    let items = ctx.queries.store_items().await?.unwrap_or_default();
    println!("{}", render::store_items(&items));
    Ok(())
}

/// 아이템 구매 후 갱신된 잔액 출력.
pub async fn buy(ctx: &AppContext, item_id: &str, student: Option<String>) -> Result<()> {
    let Some(student_id) = target_student(ctx, student, STORE_PATH) else {
        return Ok(());
    };

    let receipt = ctx
        .queries
        .purchase_item(&PurchaseRequest {
            student_id: student_id.clone(),
            item_id: item_id.to_string(),
        })
        .await?;
    println!(
        "Bought {} for {}. New balance: {}",
        receipt.item_id,
        render::coins(receipt.price),
        render::coins(receipt.new_balance)
    );

    if let Some(student) = ctx.queries.student(Some(&student_id)).await? {
        println!("{}", render::student_summary(&student));
    }
    Ok(())
}

pub async fn inventory(ctx: &AppContext, student: Option<String>) -> Result<()> {
    let Some(student_id) = target_student(ctx, student, STORE_PATH) else {
        return Ok(());
    };
    let items = ctx
        .queries
        .inventory(Some(&student_id))
        .await?
        .unwrap_or_default();
    println!("{}", render::inventory(&items));
    Ok(())
}
