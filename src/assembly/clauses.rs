//! Fill selected clauses into a document
//!
//! Each selected clause contributes the text of its active version, with
//! `{{ field }}` placeholders filled from the answer bag. A clause that is
//! missing or has no active version is skipped and noted in the log.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::assembly::mapping::AnswerBag;
use crate::assembly::rules::{select_clauses, ClauseRule, ClauseSelection};
use crate::clause::repository::ClauseRepository;
use crate::clause::version::ClauseVersionNumber;
use crate::core::answers::{is_blank_value, value_as_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyLogEntry {
    pub level: LogLevel,
    pub clause_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssembledClause {
    pub clause_id: String,
    pub version: ClauseVersionNumber,
    pub title: String,
    pub text: String,
    /// Active references, e.g. "TBK m.344"
    pub legal_references: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClauseAssembly {
    pub selection: ClauseSelection,
    pub clauses: Vec<AssembledClause>,
    /// Placeholders no answer filled, sorted
    pub missing_variables: Vec<String>,
    pub log: Vec<AssemblyLogEntry>,
}

impl ClauseAssembly {
    /// `<clause id>@<version>` of every assembled clause
    pub fn labels(&self) -> Vec<String> {
        self.clauses
            .iter()
            .map(|c| format!("{}@{}", c.clause_id, c.version))
            .collect()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &AssemblyLogEntry> {
        self.log.iter().filter(|e| e.level == LogLevel::Warning)
    }
}

/// Select clauses with `rules` and fill in their active versions
pub fn assemble_clauses<R: ClauseRepository + ?Sized>(
    rules: &[ClauseRule],
    bag: &AnswerBag,
    repo: &R,
) -> ClauseAssembly {
    let selection = select_clauses(rules, bag);
    let mut clauses = Vec::new();
    let mut missing = BTreeSet::new();
    let mut log = Vec::new();

    for clause_id in &selection.clause_ids {
        let history = match repo.load(clause_id) {
            Ok(Some(history)) => history,
            Ok(None) => {
                warn(&mut log, clause_id, "clause not found, skipped".to_string());
                continue;
            }
            Err(e) => {
                warn(&mut log, clause_id, format!("clause unreadable, skipped: {}", e));
                continue;
            }
        };
        let Some(active) = history.active() else {
            warn(&mut log, clause_id, "clause has no active version, skipped".to_string());
            continue;
        };

        let mut unfilled = Vec::new();
        let text = fill_placeholders(&active.content, bag, &mut unfilled);
        for field in &active.metadata.required_fields {
            if bag.get(field).map_or(true, is_blank_value) {
                unfilled.push(field.clone());
            }
        }
        unfilled.sort();
        unfilled.dedup();
        if !unfilled.is_empty() {
            warn(&mut log, clause_id, format!("unfilled fields: {}", unfilled.join(", ")));
            missing.extend(unfilled);
        }

        clauses.push(AssembledClause {
            clause_id: clause_id.clone(),
            version: active.version,
            title: active.metadata.title.clone(),
            text,
            legal_references: active
                .legal_references
                .iter()
                .filter(|r| r.is_active)
                .map(|r| format!("{} {}", r.code, r.article))
                .collect(),
        });
        log.push(AssemblyLogEntry {
            level: LogLevel::Info,
            clause_id: clause_id.clone(),
            message: format!("version {} included", active.version),
        });
    }

    ClauseAssembly {
        selection,
        clauses,
        missing_variables: missing.into_iter().collect(),
        log,
    }
}

fn warn(log: &mut Vec<AssemblyLogEntry>, clause_id: &str, message: String) {
    tracing::warn!(clause = clause_id, "{}", message);
    log.push(AssemblyLogEntry {
        level: LogLevel::Warning,
        clause_id: clause_id.to_string(),
        message,
    });
}

/// Replace `{{ name }}` with the bag's value; unknown or blank names become
/// `[name]` and are pushed to `unfilled`
fn fill_placeholders(content: &str, bag: &AnswerBag, unfilled: &mut Vec<String>) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = after[..end].trim();
        if !is_placeholder_name(name) {
            out.push_str(&rest[start..start + 2 + end + 2]);
        } else {
            match bag.get(name).filter(|v| !is_blank_value(v)) {
                Some(value) => out.push_str(&value_as_text(value)),
                None => {
                    out.push('[');
                    out.push_str(name);
                    out.push(']');
                    unfilled.push(name.to_string());
                }
            }
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::model::ClauseMetadata;
    use crate::clause::repository::InMemoryClauseRepository;
    use crate::clause::service::{ClauseService, NewClause};
    use serde_json::json;

    fn rules() -> Vec<ClauseRule> {
        serde_yml::from_str(
            r#"
- id: uzun-sure
  when: [{field: kira_suresi_yil, op: '>', value: 3}]
  include: [uzun-sureli-kiraci]
- id: yuksek-artis
  when: [{field: artis_yuzdesi, op: '>', value: 25}]
  include: [yuksek-artis-itirazi]
- id: taslak
  when: [{field: artis_yuzdesi, op: '>', value: 0}]
  include: [taslak-madde]
"#,
        )
        .unwrap()
    }

    fn library() -> InMemoryClauseRepository {
        let mut service = ClauseService::new(InMemoryClauseRepository::new());
        let clause = |title: &str, content: &str, required: &[&str]| NewClause {
            content: content.to_string(),
            metadata: ClauseMetadata {
                title: title.to_string(),
                required_fields: required.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
            ..Default::default()
        };
        service
            .create_clause(
                "uzun-sureli-kiraci",
                clause(
                    "Uzun Süreli Kiracılık",
                    "Müvekkil {{ kira_suresi_yil }} yıldır {{kiraci_ad}} olarak kiracıdır.",
                    &[],
                ),
                "test",
            )
            .unwrap();
        service
            .activate("uzun-sureli-kiraci", ClauseVersionNumber::INITIAL, "test")
            .unwrap();
        service
            .create_clause(
                "yuksek-artis-itirazi",
                clause("Yüksek Artış", "Artış %{{artis_yuzdesi}} oranındadır.", &["emsal_kira"]),
                "test",
            )
            .unwrap();
        service
            .activate("yuksek-artis-itirazi", ClauseVersionNumber::INITIAL, "test")
            .unwrap();
        service
            .create_clause("taslak-madde", clause("Taslak", "Henüz yürürlükte değil.", &[]), "test")
            .unwrap();
        service.into_repository()
    }

    #[test]
    fn test_active_versions_are_filled_and_logged() {
        let bag: AnswerBag = [
            ("kira_suresi_yil".to_string(), json!(5)),
            ("artis_yuzdesi".to_string(), json!(50)),
        ]
        .into_iter()
        .collect();
        let assembly = assemble_clauses(&rules(), &bag, &library());

        assert_eq!(assembly.labels(), vec!["uzun-sureli-kiraci@1.0.0", "yuksek-artis-itirazi@1.0.0"]);
        assert_eq!(
            assembly.clauses[0].text,
            "Müvekkil 5 yıldır [kiraci_ad] olarak kiracıdır."
        );
        assert_eq!(assembly.clauses[1].text, "Artış %50 oranındadır.");
        assert_eq!(assembly.missing_variables, vec!["emsal_kira", "kiraci_ad"]);

        let warnings: Vec<_> = assembly.warnings().map(|w| w.clause_id.as_str()).collect();
        assert_eq!(warnings, vec!["uzun-sureli-kiraci", "yuksek-artis-itirazi", "taslak-madde"]);
        assert!(assembly
            .warnings()
            .any(|w| w.message.contains("no active version")));
    }

    #[test]
    fn test_unknown_clause_is_skipped() {
        let rules: Vec<ClauseRule> = serde_yml::from_str(
            "- {id: yok, when: [{field: a, op: is_not_empty}], include: [olmayan-madde]}",
        )
        .unwrap();
        let bag: AnswerBag = [("a".to_string(), json!("x"))].into_iter().collect();
        let assembly = assemble_clauses(&rules, &bag, &InMemoryClauseRepository::new());
        assert!(assembly.clauses.is_empty());
        assert_eq!(assembly.selection.clause_ids, vec!["olmayan-madde"]);
        assert!(assembly.log[0].message.contains("not found"));
    }

    #[test]
    fn test_fill_placeholders_leaves_other_braces() {
        let bag: AnswerBag = [("ad".to_string(), json!("Ayşe"))].into_iter().collect();
        let mut unfilled = Vec::new();
        let text = fill_placeholders("{{ad}} {{ bir şey }} {{ad", &bag, &mut unfilled);
        assert_eq!(text, "Ayşe {{ bir şey }} {{ad");
        assert!(unfilled.is_empty());
    }
}
