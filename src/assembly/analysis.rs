//! Readiness check of a rent dispute before generating the petition

use serde::Serialize;

use crate::assembly::derived::{increase_percentage, EconomicStatus};
use crate::assembly::mapping::AnswerBag;
use crate::core::answers::{is_blank_value, value_as_bool, value_as_number, value_as_text};

/// Fields a rent dispute petition cannot do without
pub const CRITICAL_FIELDS: &[&str] = &[
    "kiraci_ad",
    "kiraci_tc",
    "kiraci_adres",
    "mulk_adres",
    "ev_sahibi_ad",
    "sozlesme_baslama",
    "mevcut_kira",
    "yeni_kira",
    "bildirim_tarihi",
    "talep_turu",
];

/// Optional fields that noticeably strengthen the petition
pub const SUPPORTING_FIELDS: &[&str] = &["aylik_gelir", "ev_sahibi_tel", "detayli_gerekce"];

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReadinessReport {
    /// Share of critical fields answered, 0-100
    pub completion_rate: u8,
    pub missing_critical_fields: Vec<String>,
    pub warnings: Vec<String>,
    pub recommended_actions: Vec<String>,
}

impl ReadinessReport {
    pub fn is_ready(&self) -> bool {
        self.missing_critical_fields.is_empty()
    }
}

/// Assess a mapped answer bag of the rent dispute template
pub fn analyze_rent_dispute(bag: &AnswerBag) -> ReadinessReport {
    let answered = |key: &str| bag.get(key).is_some_and(|v| !is_blank_value(v));
    let mut report = ReadinessReport::default();

    report.missing_critical_fields = CRITICAL_FIELDS
        .iter()
        .filter(|&&f| !answered(f))
        .map(|f| f.to_string())
        .collect();

    for field in SUPPORTING_FIELDS.iter().filter(|&&f| !answered(f)) {
        report
            .warnings
            .push(format!("{} alanı doldurulmamış - belge kalitesini artırabilir", field));
    }

    if answered("mevcut_kira") && answered("yeni_kira") {
        let old = bag.get("mevcut_kira").map(value_as_number).unwrap_or(0.0);
        let new = bag.get("yeni_kira").map(value_as_number).unwrap_or(0.0);
        let rate = increase_percentage(old, new);
        if rate > 50 {
            report
                .warnings
                .push("Artırım oranı çok yüksek - ek hukuki destek önerilir".to_string());
            report
                .recommended_actions
                .push("Avukat desteği alınması önerilir".to_string());
        } else if rate < 10 {
            report.warnings.push(
                "Artırım oranı düşük - itirazın gerekli olup olmadığını değerlendirin".to_string(),
            );
        }
    }

    if bag.get("yasal_sure_ihlali").is_some_and(value_as_bool) {
        report
            .warnings
            .push("Artırım yürürlükten en az 30 gün önce bildirilmemiş".to_string());
        report
            .recommended_actions
            .push("Bildirim süresine uyulmadığını dilekçede vurgulayın".to_string());
    }

    let economy = bag.get("ekonomik_durum").map(value_as_text).unwrap_or_default();
    if economy == EconomicStatus::Hard.as_str() {
        report
            .recommended_actions
            .push("Gelir belgelerinizi dilekçeye ekleyin".to_string());
    }

    report
        .recommended_actions
        .push("Bölgesel piyasa araştırması yapılması önerilir".to_string());

    let total = CRITICAL_FIELDS.len();
    let present = total - report.missing_critical_fields.len();
    report.completion_rate = ((present as f64 / total as f64) * 100.0).round() as u8;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_bag() -> AnswerBag {
        CRITICAL_FIELDS
            .iter()
            .chain(SUPPORTING_FIELDS)
            .map(|f| (f.to_string(), json!("x")))
            .collect()
    }

    #[test]
    fn test_missing_fields_lower_completion() {
        let mut bag = full_bag();
        bag.remove("kiraci_tc");
        bag.remove("talep_turu");
        let report = analyze_rent_dispute(&bag);
        assert_eq!(report.completion_rate, 80);
        assert_eq!(report.missing_critical_fields, vec!["kiraci_tc", "talep_turu"]);
        assert!(!report.is_ready());
    }

    #[test]
    fn test_high_increase_warns_and_recommends_counsel() {
        let mut bag = full_bag();
        bag.insert("mevcut_kira".into(), json!(4000));
        bag.insert("yeni_kira".into(), json!(8000));
        let report = analyze_rent_dispute(&bag);
        assert!(report.is_ready());
        assert!(report.warnings.iter().any(|w| w.contains("çok yüksek")));
        assert!(report
            .recommended_actions
            .contains(&"Avukat desteği alınması önerilir".to_string()));
    }

    #[test]
    fn test_low_increase_warns() {
        let mut bag = full_bag();
        bag.insert("mevcut_kira".into(), json!(10000));
        bag.insert("yeni_kira".into(), json!(10500));
        let report = analyze_rent_dispute(&bag);
        assert!(report.warnings.iter().any(|w| w.contains("düşük")));
    }

    #[test]
    fn test_unanswered_supporting_fields_warn() {
        let mut bag = full_bag();
        bag.remove("aylik_gelir");
        let report = analyze_rent_dispute(&bag);
        assert!(report.warnings.iter().any(|w| w.starts_with("aylik_gelir")));
    }
}
