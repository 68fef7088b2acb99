//! Document text generation
//!
//! Each document type has a Tera prose template
//! (`templates/documents/<type>.txt.tera`) and an optional profile
//! (`templates/documents/<type>.yaml`) naming its legal basis, attachments
//! and party fields. Types without a prose template get a generic listing of
//! every answered question.
//!
//! A profile's `clause_rules` pick clauses from the clause library; their
//! active versions are rendered after the body as "EK HÜKÜMLER".

use chrono::{Datelike, NaiveDate};
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tera::Tera;
use thiserror::Error;

use crate::assembly::clauses::{assemble_clauses, ClauseAssembly};
use crate::assembly::format::{
    currency_value, document_file_stem, format_date, format_date_text, turkish_uppercase,
};
use crate::assembly::mapping::{map_answers, AnswerBag};
use crate::assembly::rules::ClauseRule;
use crate::clause::repository::ClauseRepository;
use crate::core::answers::{value_as_bool, value_as_text, WizardAnswers};
use crate::core::document::DocumentMetadata;
use crate::schema::model::{FieldKind, WizardTemplate};
use crate::schema::registry::EmbeddedAssets;

/// Embedded path prefix of document templates and profiles
const DOCUMENT_PREFIX: &str = "documents/";

pub const DEFAULT_CASE_PREFIX: &str = "DILEKCE";

const CASE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Failed to load document template {name}: {message}")]
    Load { name: String, message: String },

    #[error("Failed to render {name}: {message}")]
    Render { name: String, message: String },
}

/// Per-document-type facts that are not prose
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DocumentProfile {
    /// Human-readable document type, e.g. "Kira Sözleşmesi"
    pub title: Option<String>,
    pub case_prefix: Option<String>,
    pub applicant_field: Option<String>,
    pub respondent_field: Option<String>,
    pub legal_basis: Vec<String>,
    pub attachments: Vec<String>,
    pub clause_rules: Vec<ClauseRule>,
}

/// Inputs that vary per generation run
#[derive(Debug, Clone)]
pub struct GenerationContext {
    pub today: NaiveDate,
    /// `HH:MM` printed next to the date
    pub time: String,
    /// Fixed case number; a random one is drawn when absent
    pub case_number: Option<String>,
}

impl GenerationContext {
    pub fn now() -> Self {
        let now = chrono::Local::now();
        Self {
            today: now.date_naive(),
            time: now.format("%H:%M").to_string(),
            case_number: None,
        }
    }

    pub fn on(today: NaiveDate) -> Self {
        Self {
            today,
            time: "00:00".to_string(),
            case_number: None,
        }
    }

    pub fn with_case_number(mut self, case_number: impl Into<String>) -> Self {
        self.case_number = Some(case_number.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub content: String,
    pub metadata: DocumentMetadata,
    /// Suggested export file name without extension
    pub file_stem: String,
    pub answers: AnswerBag,
    /// Empty when generated without a clause library
    pub clauses: ClauseAssembly,
}

/// `<prefix>-<year>-<6 base-36 chars>`. Not unique; never use as a key.
pub fn case_number<R: Rng + ?Sized>(prefix: &str, year: i32, rng: &mut R) -> String {
    let suffix: String = (0..6)
        .map(|_| CASE_ALPHABET[rng.random_range(0..CASE_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}-{}", prefix, year, suffix)
}

pub struct DocumentGenerator {
    tera: Tera,
    profiles: BTreeMap<String, DocumentProfile>,
}

impl DocumentGenerator {
    /// Generator over the embedded document templates
    pub fn new() -> Result<Self, GenerateError> {
        let mut tera = Tera::default();
        register_filters(&mut tera);
        let mut profiles = BTreeMap::new();

        for file in EmbeddedAssets::iter() {
            let filename = file.as_ref();
            let Some(stem) = filename.strip_prefix(DOCUMENT_PREFIX) else {
                continue;
            };
            let Some(content) = EmbeddedAssets::get(filename) else {
                continue;
            };
            let Ok(text) = std::str::from_utf8(&content.data) else {
                tracing::warn!(file = filename, "document asset is not UTF-8");
                continue;
            };

            if stem.ends_with(".txt.tera") {
                tera.add_raw_template(filename, text)
                    .map_err(|e| GenerateError::Load {
                        name: filename.to_string(),
                        message: render_chain(&e),
                    })?;
            } else if let Some(doc_type) = stem.strip_suffix(".yaml") {
                let profile: DocumentProfile =
                    serde_yml::from_str(text).map_err(|e| GenerateError::Load {
                        name: filename.to_string(),
                        message: e.to_string(),
                    })?;
                profiles.insert(doc_type.to_string(), profile);
            }
        }

        Ok(Self { tera, profiles })
    }

    pub fn has_template(&self, document_type: &str) -> bool {
        let name = template_name(document_type);
        self.tera.get_template_names().any(|n| n == name)
    }

    pub fn profile(&self, document_type: &str) -> Option<&DocumentProfile> {
        self.profiles.get(document_type)
    }

    /// Render the document for a template's answers.
    ///
    /// Missing answers show as bracketed placeholders; generation never
    /// requires a complete answer set.
    pub fn generate(
        &self,
        template: &WizardTemplate,
        answers: &WizardAnswers,
        ctx: &GenerationContext,
    ) -> Result<GeneratedDocument, GenerateError> {
        self.render(template, answers, ctx, None)
    }

    /// [`generate`](Self::generate), adding the clauses the profile's rules
    /// select from `library`
    pub fn generate_with_clauses(
        &self,
        template: &WizardTemplate,
        answers: &WizardAnswers,
        ctx: &GenerationContext,
        library: &dyn ClauseRepository,
    ) -> Result<GeneratedDocument, GenerateError> {
        self.render(template, answers, ctx, Some(library))
    }

    fn render(
        &self,
        template: &WizardTemplate,
        answers: &WizardAnswers,
        ctx: &GenerationContext,
        library: Option<&dyn ClauseRepository>,
    ) -> Result<GeneratedDocument, GenerateError> {
        let doc_type = template.document_type();
        let profile = self.profiles.get(doc_type).cloned().unwrap_or_default();
        let bag = map_answers(template, answers, ctx.today);
        let clauses = match library {
            Some(library) if !profile.clause_rules.is_empty() => {
                assemble_clauses(&profile.clause_rules, &bag, library)
            }
            _ => ClauseAssembly::default(),
        };

        let case_number = ctx.case_number.clone().unwrap_or_else(|| {
            let prefix = profile.case_prefix.as_deref().unwrap_or(DEFAULT_CASE_PREFIX);
            case_number(prefix, ctx.today.year(), &mut rand::rng())
        });

        let content = if self.has_template(doc_type) {
            let name = template_name(doc_type);
            let mut context = tera::Context::new();
            for (key, value) in &bag {
                context.insert(key.as_str(), value);
            }
            context.insert("belge_no", &case_number);
            context.insert("bugun", &format_date(ctx.today));
            context.insert("saat", &ctx.time);
            context.insert("sablon_adi", &template.name);
            context.insert("yasal_dayanak", &profile.legal_basis);
            context.insert("ekler", &profile.attachments);
            context.insert("maddeler", &clauses.clauses);

            self.tera
                .render(&name, &context)
                .map_err(|e| GenerateError::Render {
                    name,
                    message: render_chain(&e),
                })?
        } else {
            tracing::debug!(document_type = doc_type, "no prose template, using generic listing");
            generic_document(template, answers, &clauses, &case_number, ctx.today)
        };

        let document_title = profile
            .title
            .clone()
            .unwrap_or_else(|| template.name.clone());
        let party = |field: &Option<String>, placeholder: &str| {
            field
                .as_deref()
                .and_then(|f| bag.get(f))
                .map(value_as_text)
                .unwrap_or_else(|| placeholder.to_string())
        };
        let mut parties = Vec::new();
        if profile.applicant_field.is_some() {
            parties.push(party(&profile.applicant_field, "[BAŞVURUCU]"));
        }
        if profile.respondent_field.is_some() {
            parties.push(party(&profile.respondent_field, "[KARŞI TARAF]"));
        }

        let applicant = profile
            .applicant_field
            .as_deref()
            .and_then(|f| bag.get(f))
            .map(value_as_text)
            .unwrap_or_default();
        let file_stem = document_file_stem(
            &format!("{} {}", document_title, applicant),
            &case_number,
            ctx.today,
        );

        Ok(GeneratedDocument {
            content,
            metadata: DocumentMetadata {
                document_type: document_title,
                created_date: ctx.today,
                case_number,
                parties,
                legal_basis: profile.legal_basis,
                attachments: profile.attachments,
                clauses: clauses.labels(),
            },
            file_stem,
            answers: bag,
            clauses,
        })
    }
}

fn template_name(document_type: &str) -> String {
    format!("{}{}.txt.tera", DOCUMENT_PREFIX, document_type)
}

/// "BÖLÜM: <step title>" sections listing each answered field
fn generic_document(
    template: &WizardTemplate,
    answers: &WizardAnswers,
    clauses: &ClauseAssembly,
    case_number: &str,
    today: NaiveDate,
) -> String {
    let date = format_date(today);
    let hidden = template.hidden_fields(answers);
    let mut sections = Vec::new();

    for step in &template.steps {
        let lines: Vec<String> = step
            .fields
            .iter()
            .filter(|field| !hidden.contains(&field.id))
            .filter_map(|field| {
                let answer = answers
                    .get(&step.id, &field.id)
                    .or_else(|| answers.find(&field.id))?;
                if answer.is_blank() {
                    return None;
                }
                let value = answer.value();
                let text = match field.kind {
                    FieldKind::Select | FieldKind::Radio => {
                        let raw = value_as_text(value);
                        field.option_label(&raw).map(str::to_string).unwrap_or(raw)
                    }
                    FieldKind::Checkbox if field.is_confirmation() => {
                        if value_as_bool(value) { "Evet" } else { "Hayır" }.to_string()
                    }
                    FieldKind::Checkbox => answer
                        .as_list()
                        .iter()
                        .map(|v| field.option_label(v).unwrap_or(v).to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                    FieldKind::Date => format_date_text(&value_as_text(value)),
                    _ => value_as_text(value),
                };
                Some(format!("- {}: {}", field.label, text))
            })
            .collect();

        if !lines.is_empty() {
            sections.push(format!("BÖLÜM: {}\n{}", step.title, lines.join("\n")));
        }
    }
    if !clauses.clauses.is_empty() {
        let items: Vec<String> = clauses
            .clauses
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}. {}\n{}", i + 1, c.title, c.text))
            .collect();
        sections.push(format!("EK HÜKÜMLER\n{}", items.join("\n\n")));
    }

    let rule = "═".repeat(67);
    let thin = "─".repeat(67);
    format!(
        "{title}\n\nBELGE NO: {case}\nTARİH: {date}\n\n{rule}\n\n{body}\n\n{rule}\n\n{date}                                                [İMZA]\n\n{thin}\nBelge No: {case}",
        title = turkish_uppercase(&template.name),
        case = case_number,
        date = date,
        rule = rule,
        body = sections.join("\n\n"),
        thin = thin,
    )
}

fn register_filters(tera: &mut Tera) {
    tera.register_filter("para", para_filter);
    tera.register_filter("tarih", tarih_filter);
}

/// `{{ amount | para }}` → Turkish-grouped amount
fn para_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(currency_value(value)))
}

/// `{{ date | tarih }}` → dd.mm.yyyy
fn tarih_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(format_date_text(&value_as_text(value))))
}

/// Tera nests the useful message in the error source chain
fn render_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = std::error::Error::source(inner);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::rules::check_rules;
    use crate::clause::model::ClauseMetadata;
    use crate::clause::repository::InMemoryClauseRepository;
    use crate::clause::service::{ClauseService, NewClause};
    use crate::clause::version::ClauseVersionNumber;
    use crate::schema::registry::TemplateRegistry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn ctx() -> GenerationContext {
        GenerationContext::on(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .with_case_number("DILEKCE-2024-TEST01")
    }

    fn dispute_answers() -> WizardAnswers {
        let mut a = WizardAnswers::new();
        a.set("kiraci_bilgileri", "kiraci_ad", "Ayşe Demir");
        a.set("kiraci_bilgileri", "kiraci_tc", "12345678901");
        a.set("ev_sahibi", "ev_sahibi_ad", "Mehmet Özkan");
        a.set("mulk_bilgileri", "mulk_tipi", "daire");
        a.set("mevcut_sozlesme", "mevcut_kira", json!(4000));
        a.set("mevcut_sozlesme", "sozlesme_baslama", "2020-01-01");
        a.set("artirim_bilgileri", "yeni_kira", json!(6000));
        a.set("artirim_bilgileri", "bildirim_tarihi", "2024-01-01");
        a.set("itiraz", "itiraz_nedenleri", json!(["asiri_artirim"]));
        a.set("talepler", "talep_turu", "azaltim");
        a.set("talepler", "onerilen_kira", json!(4500));
        a
    }

    #[test]
    fn test_case_number_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = case_number("DILEKCE", 2024, &mut rng);
        assert!(n.starts_with("DILEKCE-2024-"));
        let suffix = &n["DILEKCE-2024-".len()..];
        assert_eq!(suffix.len(), 6);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_rent_dispute_substitutes_values() {
        let registry = TemplateRegistry::builtin().unwrap();
        let template = registry.get("kira-itiraz-v1").unwrap();
        let generator = DocumentGenerator::new().unwrap();
        let doc = generator
            .generate(template, &dispute_answers(), &ctx())
            .unwrap();

        assert!(doc.content.contains("KİRA ARTIRIMI İTİRAZ DİLEKÇESİ"));
        assert!(doc.content.contains("BELGE NO: DILEKCE-2024-TEST01"));
        assert!(doc.content.contains("Ad Soyad        : Ayşe Demir"));
        assert!(doc.content.contains("Mevcut Kira Bedeli: 4.000 TL/Ay"));
        assert!(doc.content.contains("Artırım oranı: %50"));
        assert!(doc.content.contains("Sözleşme Tarihi: 01.01.2020"));
        assert!(doc.content.contains("Taşınmaz türü: Daire"));
        assert!(doc.content.contains("TÜFE + %25"));
        assert!(doc.content.contains("4.500 TL olarak belirlenmesi"));
        assert!(doc.content.contains("6570 Sayılı Kira Artış Oranları Hakkında Kanun"));
        assert!(doc.content.contains("4 yıldır"));

        assert_eq!(doc.metadata.document_type, "Kira Artırımı İtiraz Dilekçesi");
        assert_eq!(doc.metadata.parties, vec!["Ayşe Demir", "Mehmet Özkan"]);
        assert_eq!(
            doc.file_stem,
            "kira_artirimi_itiraz_dilekcesi_ayse_demir_DILEKCE-2024-TEST01_2024-06-01"
        );
    }

    #[test]
    fn test_incomplete_answers_render_placeholders() {
        let registry = TemplateRegistry::builtin().unwrap();
        let template = registry.get("kira-itiraz-v1").unwrap();
        let generator = DocumentGenerator::new().unwrap();
        let doc = generator
            .generate(template, &WizardAnswers::new(), &ctx())
            .unwrap();

        assert!(doc.content.contains("[AD SOYAD]"));
        assert!(doc.content.contains("[TARİH]"));
        assert!(doc.content.contains("[TUTAR]"));
        assert_eq!(doc.metadata.parties, vec!["[BAŞVURUCU]", "[KARŞI TARAF]"]);
    }

    #[test]
    fn test_rental_agreement_end_date() {
        let registry = TemplateRegistry::builtin().unwrap();
        let template = registry.get("kira-sozlesmesi-v1").unwrap();
        let generator = DocumentGenerator::new().unwrap();
        let mut answers = WizardAnswers::new();
        answers.set("sozlesme", "baslangic_tarihi", "2024-03-01");
        answers.set("sozlesme", "sozlesme_suresi", "12_ay");
        answers.set("ev_bilgileri", "kira_bedeli", json!(15000));

        let doc = generator.generate(template, &answers, &ctx()).unwrap();
        assert!(doc.content.contains("Sözleşme Bitişi: 28.02.2025"));
        assert!(doc.content.contains("Aylık Kira Bedeli: 15.000 TL"));
        assert!(doc.content.contains("Sözleşme Süresi: 1 Yıl"));
    }

    #[test]
    fn test_unknown_type_falls_back_to_listing() {
        let template: WizardTemplate = serde_yml::from_str(
            r#"
id: serbest
name: Serbest Dilekçe
category: genel
steps:
  - id: s1
    title: Başvuru
    fields:
      - {id: ad, kind: text, label: Ad}
      - {id: onay, kind: checkbox, label: Onay}
      - {id: bos, kind: text, label: Boş}
"#,
        )
        .unwrap();
        let mut answers = WizardAnswers::new();
        answers.set("s1", "ad", "Veli");
        answers.set("s1", "onay", json!(true));

        let generator = DocumentGenerator::new().unwrap();
        let doc = generator.generate(&template, &answers, &ctx()).unwrap();
        assert!(doc.content.starts_with("SERBEST DİLEKÇE"));
        assert!(doc.content.contains("BÖLÜM: Başvuru\n- Ad: Veli\n- Onay: Evet"));
        assert!(!doc.content.contains("Boş"));
        assert!(doc.metadata.parties.is_empty());
    }

    fn clause_library() -> InMemoryClauseRepository {
        let mut service = ClauseService::new(InMemoryClauseRepository::new());
        for (id, title, content) in [
            ("yuksek-artis-itirazi", "Fahiş Artış", "Talep edilen %{{ artis_yuzdesi }} artış fahiştir."),
            ("uzun-sureli-kiraci", "Uzun Süreli Kiracılık", "Kiracı {{ kira_suresi_yil }} yıldır taşınmazda oturmaktadır."),
            ("karsi-oneri", "Karşı Öneri", "Kiracı karşı öneride bulunmaktadır."),
        ] {
            let clause = NewClause {
                content: content.to_string(),
                metadata: ClauseMetadata {
                    title: title.to_string(),
                    ..Default::default()
                },
                ..Default::default()
            };
            service.create_clause(id, clause, "test").unwrap();
            if id != "karsi-oneri" {
                service
                    .activate(id, ClauseVersionNumber::INITIAL, "test")
                    .unwrap();
            }
        }
        service.into_repository()
    }

    #[test]
    fn test_selected_active_clauses_are_rendered() {
        let registry = TemplateRegistry::builtin().unwrap();
        let template = registry.get("kira-itiraz-v1").unwrap();
        let generator = DocumentGenerator::new().unwrap();
        let library = clause_library();
        let doc = generator
            .generate_with_clauses(template, &dispute_answers(), &ctx(), &library)
            .unwrap();

        assert!(doc.content.contains("EK HÜKÜMLER"));
        assert!(doc.content.contains("1. Fahiş Artış\nTalep edilen %50 artış fahiştir."));
        assert!(doc.content.contains("Kiracı 4 yıldır taşınmazda oturmaktadır."));
        assert!(!doc.content.contains("karşı öneride"));
        assert_eq!(
            doc.metadata.clauses,
            vec!["yuksek-artis-itirazi@1.0.0", "uzun-sureli-kiraci@1.0.0"]
        );
        assert!(doc
            .clauses
            .selection
            .clause_ids
            .contains(&"karsi-oneri".to_string()));
        assert!(doc.clauses.warnings().any(|w| w.clause_id == "karsi-oneri"));
    }

    #[test]
    fn test_plain_generation_has_no_clause_section() {
        let registry = TemplateRegistry::builtin().unwrap();
        let template = registry.get("kira-itiraz-v1").unwrap();
        let doc = DocumentGenerator::new()
            .unwrap()
            .generate(template, &dispute_answers(), &ctx())
            .unwrap();
        assert!(!doc.content.contains("EK HÜKÜMLER"));
        assert!(doc.metadata.clauses.is_empty());
    }

    #[test]
    fn test_embedded_clause_rules_are_consistent() {
        let generator = DocumentGenerator::new().unwrap();
        for doc_type in ["kira-itiraz-v1", "kira-sozlesmesi-v1"] {
            let profile = generator.profile(doc_type).unwrap();
            assert!(check_rules(&profile.clause_rules).is_empty(), "{}", doc_type);
        }
        assert_eq!(generator.profile("kira-itiraz-v1").unwrap().clause_rules.len(), 5);
    }

    #[test]
    fn test_hidden_proposal_is_not_rendered() {
        let registry = TemplateRegistry::builtin().unwrap();
        let template = registry.get("kira-itiraz-v1").unwrap();
        let mut answers = dispute_answers();
        answers.set("talepler", "talep_turu", "ret");
        let doc = DocumentGenerator::new()
            .unwrap()
            .generate(template, &answers, &ctx())
            .unwrap();
        assert!(!doc.answers.contains_key("onerilen_kira"));
        assert!(!doc.content.contains("4.500"));
        assert!(doc.content.contains("Uygun kira bedelinin mahkemece takdir edilmesi"));
    }

    #[test]
    fn test_random_case_number_uses_profile_prefix() {
        let registry = TemplateRegistry::builtin().unwrap();
        let template = registry.get("kira-itiraz-v1").unwrap();
        let generator = DocumentGenerator::new().unwrap();
        let doc = generator
            .generate(
                template,
                &WizardAnswers::new(),
                &GenerationContext::on(NaiveDate::from_ymd_opt(2025, 2, 3).unwrap()),
            )
            .unwrap();
        assert!(doc.metadata.case_number.starts_with("DILEKCE-2025-"));
    }
}
