use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::account::CompanyId;
use super::money::Money;
use super::transaction::TransactionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeadId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubHeadId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(pub i64);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    Rule,
    Ai,
}

impl SuggestionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            SuggestionSource::Rule => "rule",
            SuggestionSource::Ai => "ai",
        }
    }
}

impl std::str::FromStr for SuggestionSource {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rule" => Ok(SuggestionSource::Rule),
            "ai" => Ok(SuggestionSource::Ai),
            other => Err(format!("Unknown suggestion source: '{other}'")),
        }
    }
}

/// Outcome of one categorization attempt (tier 1 or tier 2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationSuggestion {
    pub narration_head_id: Option<HeadId>,
    pub narration_sub_head_id: Option<SubHeadId>,
    pub note: Option<String>,
    pub party_name: Option<String>,
    pub source: SuggestionSource,
    /// Always 1.0 for rule-sourced suggestions.
    pub confidence: f32,
    pub alternatives: Vec<String>,
    pub applied_rule_id: Option<RuleId>,
    pub metadata: BTreeMap<String, String>,
}

impl NarrationSuggestion {
    pub fn from_rule(
        rule_id: Option<RuleId>,
        head_id: HeadId,
        sub_head_id: Option<SubHeadId>,
        note: Option<String>,
    ) -> Self {
        NarrationSuggestion {
            narration_head_id: Some(head_id),
            narration_sub_head_id: sub_head_id,
            note,
            party_name: None,
            source: SuggestionSource::Rule,
            confidence: 1.0,
            alternatives: Vec::new(),
            applied_rule_id: rule_id,
            metadata: BTreeMap::new(),
        }
    }

    pub fn from_ai(
        head_id: Option<HeadId>,
        sub_head_id: Option<SubHeadId>,
        note: Option<String>,
        confidence: f32,
    ) -> Self {
        NarrationSuggestion {
            narration_head_id: head_id,
            narration_sub_head_id: sub_head_id,
            note,
            party_name: None,
            source: SuggestionSource::Ai,
            confidence: if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) },
            alternatives: Vec::new(),
            applied_rule_id: None,
            metadata: BTreeMap::new(),
        }
    }

    /// An AI answer whose names resolved to nothing in the catalog.
    pub fn is_uncategorized(&self) -> bool {
        self.narration_head_id.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    #[default]
    Contains,
    StartsWith,
    EndsWith,
    Exact,
    Regex,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Contains => "contains",
            MatchType::StartsWith => "starts_with",
            MatchType::EndsWith => "ends_with",
            MatchType::Exact => "exact",
            MatchType::Regex => "regex",
        }
    }
}

impl std::str::FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "contains" => Ok(MatchType::Contains),
            "starts_with" => Ok(MatchType::StartsWith),
            "ends_with" => Ok(MatchType::EndsWith),
            "exact" => Ok(MatchType::Exact),
            "regex" => Ok(MatchType::Regex),
            other => Err(format!("Unknown match type: '{other}'")),
        }
    }
}

/// Which transaction direction a rule applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    Credit,
    Debit,
    #[default]
    Both,
}

impl RuleScope {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleScope::Credit => "credit",
            RuleScope::Debit => "debit",
            RuleScope::Both => "both",
        }
    }

    pub fn admits(self, transaction_type: TransactionType) -> bool {
        match self {
            RuleScope::Both => true,
            RuleScope::Credit => transaction_type == TransactionType::Credit,
            RuleScope::Debit => transaction_type == TransactionType::Debit,
        }
    }
}

impl std::str::FromStr for RuleScope {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "credit" => Ok(RuleScope::Credit),
            "debit" => Ok(RuleScope::Debit),
            "both" => Ok(RuleScope::Both),
            other => Err(format!("Unknown rule scope: '{other}'")),
        }
    }
}

/// A saved categorization rule. Lower `priority` values are evaluated first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategorizationRule {
    #[serde(default)]
    pub id: Option<RuleId>,
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    #[serde(default)]
    pub match_type: MatchType,
    pub match_value: String,
    #[serde(default)]
    pub transaction_type: RuleScope,
    #[serde(default)]
    pub amount_min: Option<Money>,
    #[serde(default)]
    pub amount_max: Option<Money>,
    pub head_id: HeadId,
    #[serde(default)]
    pub sub_head_id: Option<SubHeadId>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub note_template: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSubHead {
    pub id: SubHeadId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogHead {
    pub id: HeadId,
    pub name: String,
    pub sub_heads: Vec<CatalogSubHead>,
}

/// Snapshot of a company's heads and their active sub-heads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryCatalog {
    pub heads: Vec<CatalogHead>,
}

impl CategoryCatalog {
    /// Resolves names back to ids, case-insensitively. An unknown head nulls
    /// both ids; a known head with an unknown sub-head keeps the head.
    pub fn resolve(&self, head_name: &str, sub_head_name: Option<&str>) -> (Option<HeadId>, Option<SubHeadId>) {
        let Some(head) = self.heads.iter().find(|h| names_match(&h.name, head_name)) else {
            return (None, None);
        };
        let sub_head = sub_head_name.and_then(|wanted| {
            head.sub_heads
                .iter()
                .find(|s| names_match(&s.name, wanted))
                .map(|s| s.id)
        });
        (Some(head.id), sub_head)
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }
}

fn names_match(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn catalog() -> CategoryCatalog {
        CategoryCatalog {
            heads: vec![CatalogHead {
                id: HeadId(1),
                name: "Salary".into(),
                sub_heads: vec![CatalogSubHead { id: SubHeadId(10), name: "Engineering Staff".into() }],
            }],
        }
    }

    #[test]
    fn resolve_is_case_insensitive() {
        assert_eq!(
            catalog().resolve(" salary ", Some("ENGINEERING staff")),
            (Some(HeadId(1)), Some(SubHeadId(10)))
        );
    }

    #[test]
    fn resolve_unknown_head_is_uncategorized() {
        assert_eq!(catalog().resolve("Rent", Some("Engineering Staff")), (None, None));
    }

    #[test]
    fn resolve_unknown_sub_head_keeps_head() {
        assert_eq!(catalog().resolve("Salary", Some("Sales")), (Some(HeadId(1)), None));
    }

    #[test]
    fn rule_suggestion_is_fully_confident() {
        let s = NarrationSuggestion::from_rule(Some(RuleId(4)), HeadId(1), None, None);
        assert_eq!(s.source, SuggestionSource::Rule);
        assert_eq!(s.confidence, 1.0);
    }

    #[test]
    fn ai_confidence_is_clamped() {
        assert_eq!(NarrationSuggestion::from_ai(None, None, None, 1.7).confidence, 1.0);
        assert_eq!(NarrationSuggestion::from_ai(None, None, None, -0.2).confidence, 0.0);
        assert_eq!(NarrationSuggestion::from_ai(None, None, None, f32::NAN).confidence, 0.0);
        assert!(NarrationSuggestion::from_ai(None, None, None, 0.4).is_uncategorized());
    }

    #[test]
    fn rule_scope_admits_matching_direction() {
        assert!(RuleScope::Both.admits(TransactionType::Credit));
        assert!(RuleScope::Debit.admits(TransactionType::Debit));
        assert!(!RuleScope::Credit.admits(TransactionType::Debit));
        assert_eq!(RuleScope::from_str("BOTH").unwrap(), RuleScope::Both);
        assert_eq!(MatchType::from_str("ends_with").unwrap(), MatchType::EndsWith);
    }
}
