use bankline_core::{CategorizationRule, MatchType, Money, NarrationSuggestion, TransactionType};
use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Failed to parse rules TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// What a rule is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub narration: &'a str,
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch<'a> {
    pub rule: &'a CategorizationRule,
    /// The text the pattern matched.
    pub matched_text: String,
    pub note: Option<String>,
}

impl RuleMatch<'_> {
    pub fn to_suggestion(&self) -> NarrationSuggestion {
        NarrationSuggestion::from_rule(
            self.rule.id,
            self.rule.head_id,
            self.rule.sub_head_id,
            self.note.clone(),
        )
    }
}

/// Internal pairing of a rule with its precompiled regex (if applicable).
#[derive(Debug)]
struct CompiledRule {
    rule: CategorizationRule,
    compiled_regex: Option<regex::Regex>,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<CategorizationRule>,
}

/// Tier-1 categorization over one company's saved rules.
#[derive(Debug)]
pub struct RuleMatchEngine {
    rules: Vec<CompiledRule>,
}

impl RuleMatchEngine {
    pub fn new(rules: Vec<CategorizationRule>) -> Self {
        let mut compiled: Vec<CompiledRule> = rules
            .into_iter()
            .map(|rule| {
                let compiled_regex = if rule.match_type == MatchType::Regex {
                    regex::Regex::new(&rule.match_value).ok()
                } else {
                    None
                };
                CompiledRule { rule, compiled_regex }
            })
            .collect();
        // Lowest priority value first; stable, so catalog order breaks ties.
        compiled.sort_by_key(|cr| cr.rule.priority);
        Self { rules: compiled }
    }

    /// Reads `[[rules]]` tables.
    pub fn from_toml(toml_content: &str) -> Result<Self, RuleError> {
        Ok(Self::new(parse_rules_toml(toml_content)?))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> impl Iterator<Item = &CategorizationRule> {
        self.rules.iter().map(|cr| &cr.rule)
    }

    pub fn find_match(&self, input: &RuleInput<'_>) -> Option<RuleMatch<'_>> {
        self.rules.iter().find_map(|cr| {
            let matched_text = rule_matches(cr, input)?;
            let note = cr
                .rule
                .note_template
                .as_deref()
                .map(|template| render_note(template, &matched_text, input));
            Some(RuleMatch { rule: &cr.rule, matched_text, note })
        })
    }
}

pub fn parse_rules_toml(toml_content: &str) -> Result<Vec<CategorizationRule>, RuleError> {
    let file: RuleFile = toml::from_str(toml_content)?;
    Ok(file.rules)
}

fn rule_matches(cr: &CompiledRule, input: &RuleInput<'_>) -> Option<String> {
    let rule = &cr.rule;
    if !rule.is_active || !rule.transaction_type.admits(input.transaction_type) {
        return None;
    }
    if rule.amount_min.is_some_and(|min| input.amount < min) {
        return None;
    }
    if rule.amount_max.is_some_and(|max| input.amount > max) {
        return None;
    }

    let pattern = rule.match_value.trim().to_lowercase();
    if pattern.is_empty() {
        return None;
    }
    let text = input.narration.trim().to_lowercase();
    let hit = match rule.match_type {
        MatchType::Contains => text.contains(&pattern),
        MatchType::StartsWith => text.starts_with(&pattern),
        MatchType::EndsWith => text.ends_with(&pattern),
        MatchType::Exact => text == pattern,
        MatchType::Regex => {
            return cr
                .compiled_regex
                .as_ref()
                .and_then(|re| re.find(input.narration))
                .map(|m| m.as_str().to_string());
        }
    };
    hit.then(|| rule.match_value.trim().to_string())
}

/// Expands `{match}`, `{raw}`, `{amount}` and `{date}` in a note template.
pub fn render_note(template: &str, matched: &str, input: &RuleInput<'_>) -> String {
    template
        .replace("{match}", matched)
        .replace("{raw}", input.narration)
        .replace("{amount}", &input.amount.to_string())
        .replace("{date}", &input.date.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankline_core::{HeadId, RuleId, RuleScope, SubHeadId, SuggestionSource};

    fn input(narration: &str, transaction_type: TransactionType, cents: i64) -> RuleInput<'_> {
        RuleInput {
            narration,
            transaction_type,
            amount: Money::from_cents(cents),
            date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        }
    }

    fn make_rule(value: &str, match_type: MatchType, head: i64, priority: i32) -> CategorizationRule {
        CategorizationRule {
            id: Some(RuleId(head * 100 + priority as i64)),
            company_id: None,
            match_type,
            match_value: value.to_string(),
            transaction_type: RuleScope::Both,
            amount_min: None,
            amount_max: None,
            head_id: HeadId(head),
            sub_head_id: None,
            priority,
            note_template: None,
            is_active: true,
        }
    }

    fn head_of(engine: &RuleMatchEngine, input: &RuleInput<'_>) -> Option<HeadId> {
        engine.find_match(input).map(|m| m.rule.head_id)
    }

    #[test]
    fn contains_match_case_insensitive() {
        let engine = RuleMatchEngine::new(vec![make_rule("acme payroll", MatchType::Contains, 1, 1)]);
        assert_eq!(head_of(&engine, &input("NEFT ACME PAYROLL FEB", TransactionType::Credit, 100)), Some(HeadId(1)));
        assert_eq!(head_of(&engine, &input("STARBUCKS", TransactionType::Credit, 100)), None);
    }

    #[test]
    fn starts_ends_exact() {
        let engine = RuleMatchEngine::new(vec![
            make_rule("atm", MatchType::StartsWith, 1, 1),
            make_rule("charges", MatchType::EndsWith, 2, 2),
            make_rule("interest", MatchType::Exact, 3, 3),
        ]);
        assert_eq!(head_of(&engine, &input("ATM WDL 0042", TransactionType::Debit, 1)), Some(HeadId(1)));
        assert_eq!(head_of(&engine, &input("SMS CHARGES", TransactionType::Debit, 1)), Some(HeadId(2)));
        assert_eq!(head_of(&engine, &input(" Interest ", TransactionType::Credit, 1)), Some(HeadId(3)));
        assert_eq!(head_of(&engine, &input("Interest credit", TransactionType::Credit, 1)), None);
    }

    #[test]
    fn regex_matches_raw_text_and_reports_match() {
        let engine = RuleMatchEngine::new(vec![make_rule(r"UPI/\d+", MatchType::Regex, 4, 1)]);
        let m = engine.find_match(&input("UPI/401234/ACME", TransactionType::Debit, 1)).unwrap();
        assert_eq!(m.matched_text, "UPI/401234");
        assert!(engine.find_match(&input("upi/401234", TransactionType::Debit, 1)).is_none());
    }

    #[test]
    fn invalid_regex_never_matches() {
        let engine = RuleMatchEngine::new(vec![make_rule("(unclosed", MatchType::Regex, 1, 1)]);
        assert!(engine.find_match(&input("(unclosed", TransactionType::Debit, 1)).is_none());
    }

    #[test]
    fn lowest_priority_value_wins_regardless_of_order() {
        let rules = vec![
            make_rule("amazon", MatchType::Contains, 5, 5),
            make_rule("amazon", MatchType::Contains, 1, 1),
        ];
        let engine = RuleMatchEngine::new(rules);
        assert_eq!(head_of(&engine, &input("AMAZON MKTPLACE", TransactionType::Debit, 1)), Some(HeadId(1)));
    }

    #[test]
    fn equal_priority_keeps_catalog_order() {
        let engine = RuleMatchEngine::new(vec![
            make_rule("amazon", MatchType::Contains, 7, 2),
            make_rule("amazon", MatchType::Contains, 8, 2),
        ]);
        assert_eq!(head_of(&engine, &input("AMAZON", TransactionType::Debit, 1)), Some(HeadId(7)));
    }

    #[test]
    fn scope_inactive_and_amount_filters() {
        let mut debit_only = make_rule("fee", MatchType::Contains, 1, 1);
        debit_only.transaction_type = RuleScope::Debit;
        let mut inactive = make_rule("fee", MatchType::Contains, 2, 2);
        inactive.is_active = false;
        let mut bounded = make_rule("fee", MatchType::Contains, 3, 3);
        bounded.amount_min = Some(Money::from_cents(1_000));
        bounded.amount_max = Some(Money::from_cents(5_000));
        let engine = RuleMatchEngine::new(vec![debit_only, inactive, bounded]);

        assert_eq!(head_of(&engine, &input("FEE", TransactionType::Debit, 1)), Some(HeadId(1)));
        assert_eq!(head_of(&engine, &input("FEE", TransactionType::Credit, 999)), None);
        assert_eq!(head_of(&engine, &input("FEE", TransactionType::Credit, 1_000)), Some(HeadId(3)));
        assert_eq!(head_of(&engine, &input("FEE", TransactionType::Credit, 5_000)), Some(HeadId(3)));
        assert_eq!(head_of(&engine, &input("FEE", TransactionType::Credit, 5_001)), None);
    }

    #[test]
    fn note_template_is_rendered() {
        let mut rule = make_rule("acme", MatchType::Contains, 1, 1);
        rule.note_template = Some("{match} payout of {amount} on {date} ({raw})".into());
        rule.sub_head_id = Some(SubHeadId(9));
        let engine = RuleMatchEngine::new(vec![rule]);
        let m = engine.find_match(&input("NEFT ACME", TransactionType::Credit, 5_000_000)).unwrap();
        assert_eq!(
            m.note.as_deref(),
            Some("acme payout of 50000.00 on 2026-02-01 (NEFT ACME)")
        );
        let suggestion = m.to_suggestion();
        assert_eq!(suggestion.source, SuggestionSource::Rule);
        assert_eq!(suggestion.confidence, 1.0);
        assert_eq!(suggestion.narration_sub_head_id, Some(SubHeadId(9)));
        assert_eq!(suggestion.applied_rule_id, Some(RuleId(101)));
    }

    #[test]
    fn rules_load_from_toml() {
        let toml = r#"
            [[rules]]
            match_value = "salary"
            head_id = 1
            priority = 10

            [[rules]]
            match_type = "regex"
            match_value = "^ATM"
            transaction_type = "debit"
            amount_max = 20000
            head_id = 2
            sub_head_id = 5
            priority = 1
            note_template = "Cash {amount}"
        "#;
        let engine = RuleMatchEngine::from_toml(toml).unwrap();
        assert_eq!(engine.len(), 2);
        let first = engine.rules().next().unwrap();
        assert_eq!(first.match_type, MatchType::Regex);
        assert_eq!(first.amount_max, Some(Money::from_cents(2_000_000)));
        assert!(first.is_active);
        assert_eq!(head_of(&engine, &input("ATM 42", TransactionType::Debit, 100)), Some(HeadId(2)));
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(RuleMatchEngine::from_toml("[[rules]]\nmatch_value = 3").is_err());
    }
}
