use bankline_core::{AccountId, BankAccount, CompanyId, Money};
use sqlx::SqliteExecutor;

use crate::db::DbPool;

type AccountRow = (i64, i64, String, Option<String>, Option<String>, Option<i64>);

fn account_from_row(r: AccountRow) -> BankAccount {
    BankAccount {
        id: Some(AccountId(r.0)),
        company_id: CompanyId(r.1),
        name: r.2,
        account_number: r.3,
        bank_name: r.4,
        current_balance: r.5.map(Money::from_cents),
    }
}

pub async fn insert_bank_account(pool: &DbPool, account: &BankAccount) -> Result<AccountId, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO bank_accounts (company_id, name, account_number, bank_name, current_balance_cents) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(account.company_id.0)
    .bind(&account.name)
    .bind(&account.account_number)
    .bind(&account.bank_name)
    .bind(account.current_balance.map(Money::to_cents))
    .execute(pool)
    .await?;

    Ok(AccountId(result.last_insert_rowid()))
}

pub async fn get_bank_account<'e>(
    executor: impl SqliteExecutor<'e>,
    id: AccountId,
) -> Result<Option<BankAccount>, sqlx::Error> {
    let row = sqlx::query_as::<_, AccountRow>(
        "SELECT id, company_id, name, account_number, bank_name, current_balance_cents FROM bank_accounts WHERE id = ?",
    )
    .bind(id.0)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(account_from_row))
}

pub async fn list_bank_accounts(pool: &DbPool, company_id: CompanyId) -> Result<Vec<BankAccount>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AccountRow>(
        "SELECT id, company_id, name, account_number, bank_name, current_balance_cents FROM bank_accounts WHERE company_id = ? ORDER BY id",
    )
    .bind(company_id.0)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(account_from_row).collect())
}

/// Sets the account's running balance; returns false when no such account exists.
pub async fn update_current_balance<'e>(
    executor: impl SqliteExecutor<'e>,
    id: AccountId,
    balance: Money,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE bank_accounts SET current_balance_cents = ? WHERE id = ?")
        .bind(balance.to_cents())
        .bind(id.0)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}
