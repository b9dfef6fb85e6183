use bankline_core::{CatalogHead, CatalogSubHead, CategoryCatalog, CompanyId, HeadId, SubHeadId};
use sqlx::SqliteExecutor;

use crate::db::DbPool;

/// Inserts a head, or returns the id of the existing one with the same name.
pub async fn insert_head(pool: &DbPool, company_id: CompanyId, name: &str) -> Result<HeadId, sqlx::Error> {
    let name = name.trim();
    sqlx::query("INSERT OR IGNORE INTO narration_heads (company_id, name) VALUES (?, ?)")
        .bind(company_id.0)
        .bind(name)
        .execute(pool)
        .await?;

    let (id,): (i64,) = sqlx::query_as("SELECT id FROM narration_heads WHERE company_id = ? AND name = ?")
        .bind(company_id.0)
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(HeadId(id))
}

pub async fn insert_sub_head(pool: &DbPool, head_id: HeadId, name: &str) -> Result<SubHeadId, sqlx::Error> {
    let name = name.trim();
    sqlx::query("INSERT OR IGNORE INTO narration_sub_heads (head_id, name) VALUES (?, ?)")
        .bind(head_id.0)
        .bind(name)
        .execute(pool)
        .await?;

    let (id,): (i64,) = sqlx::query_as("SELECT id FROM narration_sub_heads WHERE head_id = ? AND name = ?")
        .bind(head_id.0)
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(SubHeadId(id))
}

pub async fn set_head_active(pool: &DbPool, head_id: HeadId, active: bool) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE narration_heads SET is_active = ? WHERE id = ?")
        .bind(active)
        .bind(head_id.0)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_sub_head_active(pool: &DbPool, sub_head_id: SubHeadId, active: bool) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE narration_sub_heads SET is_active = ? WHERE id = ?")
        .bind(active)
        .bind(sub_head_id.0)
        .execute(pool)
        .await?;
    Ok(())
}

/// Active heads with their active sub-heads, ordered by name.
pub async fn get_category_catalog<'e>(
    executor: impl SqliteExecutor<'e>,
    company_id: CompanyId,
) -> Result<CategoryCatalog, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, String, Option<i64>, Option<String>)>(
        r#"
        SELECT h.id, h.name, s.id, s.name
        FROM narration_heads h
        LEFT JOIN narration_sub_heads s ON s.head_id = h.id AND s.is_active = 1
        WHERE h.company_id = ? AND h.is_active = 1
        ORDER BY h.name, h.id, s.name
        "#,
    )
    .bind(company_id.0)
    .fetch_all(executor)
    .await?;

    let mut heads: Vec<CatalogHead> = Vec::new();
    for (head_id, head_name, sub_id, sub_name) in rows {
        if heads.last().map(|h| h.id.0) != Some(head_id) {
            heads.push(CatalogHead { id: HeadId(head_id), name: head_name, sub_heads: Vec::new() });
        }
        if let (Some(id), Some(name), Some(head)) = (sub_id, sub_name, heads.last_mut()) {
            head.sub_heads.push(CatalogSubHead { id: SubHeadId(id), name });
        }
    }
    Ok(CategoryCatalog { heads })
}
