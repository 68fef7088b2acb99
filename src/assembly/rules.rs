//! Clause selection rules
//!
//! A document profile lists rules like "when `artis_yuzdesi > 25`, include
//! `yuksek-artis-itirazi`". Rules run against the answer bag (derived values
//! included) in priority order, and the selected clause ids keep the order
//! in which rules first named them.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::assembly::mapping::AnswerBag;
use crate::clause::model::is_valid_clause_id;
use crate::schema::condition::{all_match, Condition};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseRule {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Lower runs first; equal priorities keep file order
    #[serde(default)]
    pub priority: u32,
    /// All must hold
    pub when: Vec<Condition>,
    pub include: Vec<String>,
    /// Included when the rule does not match
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub otherwise: Vec<String>,
}

/// What one rule decided
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleEvaluation {
    pub rule_id: String,
    pub matched: bool,
    pub clauses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClauseSelection {
    /// Selected clause ids, without duplicates
    pub clause_ids: Vec<String>,
    pub evaluations: Vec<RuleEvaluation>,
}

/// Run `rules` against the answer bag
pub fn select_clauses(rules: &[ClauseRule], bag: &AnswerBag) -> ClauseSelection {
    let mut ordered: Vec<&ClauseRule> = rules.iter().collect();
    ordered.sort_by_key(|r| r.priority);

    let mut selection = ClauseSelection::default();
    let mut seen = HashSet::new();
    for rule in ordered {
        let matched = all_match(&rule.when, |field| bag.get(field));
        let clauses = if matched { &rule.include } else { &rule.otherwise };
        tracing::debug!(rule = %rule.id, matched, clauses = clauses.len(), "clause rule evaluated");

        for clause_id in clauses {
            if seen.insert(clause_id.clone()) {
                selection.clause_ids.push(clause_id.clone());
            }
        }
        selection.evaluations.push(RuleEvaluation {
            rule_id: rule.id.clone(),
            matched,
            clauses: clauses.clone(),
        });
    }
    selection
}

/// Problems in a rule set; empty when it is usable
pub fn check_rules(rules: &[ClauseRule]) -> Vec<String> {
    let mut issues = Vec::new();
    let mut ids = HashSet::new();

    for rule in rules {
        if rule.id.trim().is_empty() {
            issues.push("clause rule has no id".to_string());
        } else if !ids.insert(rule.id.as_str()) {
            issues.push(format!("duplicate clause rule '{}'", rule.id));
        }
        if rule.when.is_empty() {
            issues.push(format!("clause rule '{}' has no conditions", rule.id));
        }
        if rule.include.is_empty() && rule.otherwise.is_empty() {
            issues.push(format!("clause rule '{}' selects no clauses", rule.id));
        }
        for condition in &rule.when {
            for issue in condition.check() {
                issues.push(format!("clause rule '{}': {}", rule.id, issue));
            }
        }
        for clause_id in rule.include.iter().chain(&rule.otherwise) {
            if !is_valid_clause_id(clause_id) {
                issues.push(format!(
                    "clause rule '{}' names invalid clause id '{}'",
                    rule.id, clause_id
                ));
            }
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules() -> Vec<ClauseRule> {
        serde_yml::from_str(
            r#"
- id: uzun-sure
  priority: 20
  when: [{field: kira_suresi_yil, op: '>', value: 3}]
  include: [uzun-sureli-kiraci]
- id: yuksek-artis
  priority: 10
  when: [{field: artis_yuzdesi, op: '>', value: 25}]
  include: [yuksek-artis-itirazi, emsal-kira]
- id: ekonomik
  priority: 10
  when:
    - {field: ekonomik_durum, op: '==', value: zor}
    - {field: artis_yuzdesi, op: '>', value: 15}
  include: [ekonomik-zorluk, emsal-kira]
  otherwise: [genel-itiraz]
"#,
        )
        .unwrap()
    }

    fn bag(pairs: &[(&str, serde_json::Value)]) -> AnswerBag {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_select_in_priority_order_without_duplicates() {
        let answers = bag(&[
            ("artis_yuzdesi", json!(50)),
            ("ekonomik_durum", json!("zor")),
            ("kira_suresi_yil", json!(5)),
        ]);
        let selection = select_clauses(&rules(), &answers);
        assert_eq!(
            selection.clause_ids,
            vec!["yuksek-artis-itirazi", "emsal-kira", "ekonomik-zorluk", "uzun-sureli-kiraci"]
        );
        let order: Vec<_> = selection.evaluations.iter().map(|e| e.rule_id.as_str()).collect();
        assert_eq!(order, vec!["yuksek-artis", "ekonomik", "uzun-sure"]);
        assert!(selection.evaluations.iter().all(|e| e.matched));
    }

    #[test]
    fn test_unmatched_rule_takes_otherwise() {
        let answers = bag(&[("artis_yuzdesi", json!(20)), ("ekonomik_durum", json!("iyi"))]);
        let selection = select_clauses(&rules(), &answers);
        assert_eq!(selection.clause_ids, vec!["genel-itiraz"]);
        assert_eq!(selection.evaluations.iter().filter(|e| e.matched).count(), 0);
    }

    #[test]
    fn test_check_rules_reports_problems() {
        assert!(check_rules(&rules()).is_empty());

        let mut bad = rules();
        bad[1].id = "uzun-sure".to_string();
        bad[2].when.clear();
        bad[0].include = vec!["Bad Id".to_string()];
        let issues = check_rules(&bad);
        assert!(issues.iter().any(|i| i.contains("duplicate clause rule 'uzun-sure'")));
        assert!(issues.iter().any(|i| i.contains("'ekonomik' has no conditions")));
        assert!(issues.iter().any(|i| i.contains("invalid clause id 'Bad Id'")));
    }
}
