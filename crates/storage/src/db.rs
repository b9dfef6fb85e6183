use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;
use tracing::debug;

pub type DbPool = Pool<Sqlite>;

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite:{}?mode=rwc", path.display()))
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;
    debug!(path = %path.display(), "database ready");

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bank_accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            account_number TEXT,
            bank_name TEXT,
            current_balance_cents INTEGER,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS narration_heads (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            UNIQUE (company_id, name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS narration_sub_heads (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            head_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            UNIQUE (head_id, name),
            FOREIGN KEY (head_id) REFERENCES narration_heads(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categorization_rules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_id INTEGER NOT NULL,
            match_type TEXT NOT NULL,
            match_value TEXT NOT NULL,
            transaction_type TEXT NOT NULL DEFAULT 'both',
            amount_min_cents INTEGER,
            amount_max_cents INTEGER,
            head_id INTEGER NOT NULL,
            sub_head_id INTEGER,
            priority INTEGER NOT NULL DEFAULT 0,
            note_template TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            match_count INTEGER NOT NULL DEFAULT 0,
            last_matched_at TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (head_id) REFERENCES narration_heads(id),
            FOREIGN KEY (sub_head_id) REFERENCES narration_sub_heads(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            bank_account_id INTEGER NOT NULL,
            transaction_date TEXT NOT NULL,
            transaction_type TEXT NOT NULL CHECK (transaction_type IN ('credit', 'debit')),
            amount_cents INTEGER NOT NULL CHECK (amount_cents > 0),
            raw_narration TEXT NOT NULL,
            bank_reference TEXT NOT NULL DEFAULT '',
            party_name TEXT,
            balance_after_cents INTEGER,
            bank_name TEXT,
            narration_head_id INTEGER,
            narration_sub_head_id INTEGER,
            narration_note TEXT,
            suggestion_source TEXT,
            confidence REAL,
            applied_rule_id INTEGER,
            alternatives TEXT,
            suggestion_metadata TEXT,
            dedup_hash TEXT NOT NULL,
            is_duplicate INTEGER NOT NULL DEFAULT 0,
            review_status TEXT NOT NULL DEFAULT 'pending',
            import_batch_id TEXT,
            import_source TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (bank_account_id) REFERENCES bank_accounts(id),
            FOREIGN KEY (narration_head_id) REFERENCES narration_heads(id),
            FOREIGN KEY (narration_sub_head_id) REFERENCES narration_sub_heads(id),
            FOREIGN KEY (applied_rule_id) REFERENCES categorization_rules(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_transactions_dedup ON transactions (bank_account_id, dedup_hash)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_transactions_batch ON transactions (import_batch_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Fresh database in its own temp directory; keep the guard alive.
    pub async fn temp_db() -> (DbPool, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_db(&dir.path().join("bankline.db")).await.unwrap();
        (pool, dir)
    }
}
