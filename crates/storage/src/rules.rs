use std::str::FromStr;

use bankline_core::{CategorizationRule, CompanyId, HeadId, Money, RuleId, SubHeadId};
use sqlx::SqliteExecutor;

use crate::db::DbPool;

type RuleRow = (
    i64,
    i64,
    String,
    String,
    String,
    Option<i64>,
    Option<i64>,
    i64,
    Option<i64>,
    i64,
    Option<String>,
    bool,
);

fn rule_from_row(r: RuleRow) -> Result<CategorizationRule, sqlx::Error> {
    let decode = |e: String| sqlx::Error::Decode(e.into());
    Ok(CategorizationRule {
        id: Some(RuleId(r.0)),
        company_id: Some(CompanyId(r.1)),
        match_type: FromStr::from_str(&r.2).map_err(decode)?,
        match_value: r.3,
        transaction_type: FromStr::from_str(&r.4).map_err(decode)?,
        amount_min: r.5.map(Money::from_cents),
        amount_max: r.6.map(Money::from_cents),
        head_id: HeadId(r.7),
        sub_head_id: r.8.map(SubHeadId),
        priority: i32::try_from(r.9).map_err(|e| sqlx::Error::Decode(e.into()))?,
        note_template: r.10,
        is_active: r.11,
    })
}

/// Usage counters kept next to each rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleStats {
    pub rule_id: RuleId,
    pub match_count: i64,
    pub last_matched_at: Option<String>,
}

pub async fn save_rule(
    pool: &DbPool,
    company_id: CompanyId,
    rule: &CategorizationRule,
) -> Result<RuleId, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO categorization_rules
            (company_id, match_type, match_value, transaction_type, amount_min_cents, amount_max_cents,
             head_id, sub_head_id, priority, note_template, is_active)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(company_id.0)
    .bind(rule.match_type.as_str())
    .bind(&rule.match_value)
    .bind(rule.transaction_type.as_str())
    .bind(rule.amount_min.map(Money::to_cents))
    .bind(rule.amount_max.map(Money::to_cents))
    .bind(rule.head_id.0)
    .bind(rule.sub_head_id.map(|s| s.0))
    .bind(rule.priority)
    .bind(&rule.note_template)
    .bind(rule.is_active)
    .execute(pool)
    .await?;

    Ok(RuleId(result.last_insert_rowid()))
}

/// Active rules in evaluation order: priority, then insertion order.
pub async fn get_active_rules<'e>(
    executor: impl SqliteExecutor<'e>,
    company_id: CompanyId,
) -> Result<Vec<CategorizationRule>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RuleRow>(
        r#"
        SELECT id, company_id, match_type, match_value, transaction_type, amount_min_cents, amount_max_cents,
               head_id, sub_head_id, priority, note_template, is_active
        FROM categorization_rules
        WHERE company_id = ? AND is_active = 1
        ORDER BY priority, id
        "#,
    )
    .bind(company_id.0)
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(rule_from_row).collect()
}

pub async fn set_rule_active(pool: &DbPool, rule_id: RuleId, active: bool) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE categorization_rules SET is_active = ? WHERE id = ?")
        .bind(active)
        .bind(rule_id.0)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn record_rule_match<'e>(executor: impl SqliteExecutor<'e>, rule_id: RuleId) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE categorization_rules SET match_count = match_count + 1, last_matched_at = datetime('now') WHERE id = ?",
    )
    .bind(rule_id.0)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn get_rule_stats(pool: &DbPool, rule_id: RuleId) -> Result<Option<RuleStats>, sqlx::Error> {
    let row = sqlx::query_as::<_, (i64, i64, Option<String>)>(
        "SELECT id, match_count, last_matched_at FROM categorization_rules WHERE id = ?",
    )
    .bind(rule_id.0)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| RuleStats { rule_id: RuleId(r.0), match_count: r.1, last_matched_at: r.2 }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::insert_head;
    use crate::db::test_support::temp_db;
    use bankline_core::{MatchType, RuleScope};

    fn rule(value: &str, head_id: HeadId, priority: i32) -> CategorizationRule {
        CategorizationRule {
            id: None,
            company_id: None,
            match_type: MatchType::StartsWith,
            match_value: value.into(),
            transaction_type: RuleScope::Debit,
            amount_min: Some(Money::from_cents(100)),
            amount_max: None,
            head_id,
            sub_head_id: None,
            priority,
            note_template: Some("{match}".into()),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn active_rules_come_back_in_priority_order() {
        let (pool, _dir) = temp_db().await;
        let company = CompanyId(1);
        let head = insert_head(&pool, company, "Bank Charges").await.unwrap();
        let late = save_rule(&pool, company, &rule("sms", head, 5)).await.unwrap();
        let early = save_rule(&pool, company, &rule("atm", head, 1)).await.unwrap();
        let off = save_rule(&pool, company, &rule("fee", head, 0)).await.unwrap();
        set_rule_active(&pool, off, false).await.unwrap();

        let rules = get_active_rules(&pool, company).await.unwrap();
        let ids: Vec<Option<RuleId>> = rules.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![Some(early), Some(late)]);
        assert_eq!(rules[0].match_type, MatchType::StartsWith);
        assert_eq!(rules[0].transaction_type, RuleScope::Debit);
        assert_eq!(rules[0].amount_min, Some(Money::from_cents(100)));
        assert_eq!(rules[0].company_id, Some(company));
    }

    #[tokio::test]
    async fn matches_are_counted() {
        let (pool, _dir) = temp_db().await;
        let head = insert_head(&pool, CompanyId(1), "Rent").await.unwrap();
        let id = save_rule(&pool, CompanyId(1), &rule("rent", head, 1)).await.unwrap();

        let fresh = get_rule_stats(&pool, id).await.unwrap().unwrap();
        assert_eq!(fresh.match_count, 0);
        assert!(fresh.last_matched_at.is_none());

        record_rule_match(&pool, id).await.unwrap();
        record_rule_match(&pool, id).await.unwrap();
        let stats = get_rule_stats(&pool, id).await.unwrap().unwrap();
        assert_eq!(stats.match_count, 2);
        assert!(stats.last_matched_at.is_some());
    }
}
