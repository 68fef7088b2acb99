//! Values computed from answers rather than asked for
//!
//! None of these fail: unusable input yields 0, `false` or
//! [`EconomicStatus::Unknown`].

use chrono::{Datelike, Months, NaiveDate};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::core::answers::{parse_date, value_as_number, value_as_text};

/// Minimum days between a rent increase notice and its effective date
pub const NOTICE_PERIOD_DAYS: i64 = 30;

/// Notice delivery method exempt from the deadline check
pub const FORMAL_SERVICE: &str = "resmi_tebligat";

/// Rent-to-income burden of the tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EconomicStatus {
    Hard,
    Medium,
    Good,
    Unknown,
}

impl EconomicStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EconomicStatus::Hard => "zor",
            EconomicStatus::Medium => "orta",
            EconomicStatus::Good => "iyi",
            EconomicStatus::Unknown => "bilinmiyor",
        }
    }
}

impl std::fmt::Display for EconomicStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whole-number percentage change from `old` to `new`
pub fn increase_percentage(old: f64, new: f64) -> i64 {
    if !old.is_finite() || !new.is_finite() || old <= 0.0 || new <= 0.0 {
        return 0;
    }
    (((new - old) / old) * 100.0).round() as i64
}

/// Years between the contract start and `today`, counted in calendar
/// months (the day of month is ignored), never negative
pub fn tenancy_years(start: &str, today: NaiveDate) -> i64 {
    let Some(start) = parse_date(start) else {
        return 0;
    };
    let months = (today.year() as i64 - start.year() as i64) * 12
        + (today.month() as i64 - start.month() as i64);
    (months / 12).max(0)
}

/// True when the increase takes effect less than [`NOTICE_PERIOD_DAYS`] after notice
pub fn legal_deadline_violated(notification: &str, effective: &str) -> bool {
    match (parse_date(notification), parse_date(effective)) {
        (Some(n), Some(e)) => (e - n).num_days() < NOTICE_PERIOD_DAYS,
        _ => false,
    }
}

pub fn economic_status(monthly_income: f64, rent: f64) -> EconomicStatus {
    if !monthly_income.is_finite() || !rent.is_finite() || monthly_income <= 0.0 || rent <= 0.0 {
        return EconomicStatus::Unknown;
    }
    let ratio = rent / monthly_income;
    if ratio > 0.4 {
        EconomicStatus::Hard
    } else if ratio > 0.3 {
        EconomicStatus::Medium
    } else {
        EconomicStatus::Good
    }
}

/// Months encoded in a duration option such as `12_ay` or `2_yil`
pub fn duration_months(option: &str) -> Option<u32> {
    let (count, unit) = option.split_once('_')?;
    let count: u32 = count.parse().ok()?;
    match unit {
        "ay" => Some(count),
        "yil" | "yıl" => Some(count * 12),
        _ => None,
    }
}

/// Last day of a contract: start plus the duration, minus one day
pub fn contract_end_date(start: &str, duration: &str) -> Option<NaiveDate> {
    let start = parse_date(start)?;
    let months = duration_months(duration)?;
    start
        .checked_add_months(Months::new(months))?
        .pred_opt()
}

/// Derived placeholder values for a normalized answer bag
pub fn derive_values(bag: &BTreeMap<String, Value>, today: NaiveDate) -> BTreeMap<String, Value> {
    let number = |key: &str| bag.get(key).map(value_as_number).unwrap_or(0.0);
    let text = |key: &str| bag.get(key).map(value_as_text).unwrap_or_default();
    let mut derived = BTreeMap::new();

    if bag.contains_key("mevcut_kira") || bag.contains_key("yeni_kira") {
        derived.insert(
            "artis_yuzdesi".to_string(),
            Value::from(increase_percentage(number("mevcut_kira"), number("yeni_kira"))),
        );
        derived.insert(
            "ekonomik_durum".to_string(),
            Value::from(economic_status(number("aylik_gelir"), number("mevcut_kira")).as_str()),
        );
    }

    if bag.contains_key("sozlesme_baslama") {
        derived.insert(
            "kira_suresi_yil".to_string(),
            Value::from(tenancy_years(&text("sozlesme_baslama"), today)),
        );
    }

    if bag.contains_key("bildirim_tarihi") && text("bildirim_sekli") != FORMAL_SERVICE {
        derived.insert(
            "yasal_sure_ihlali".to_string(),
            Value::from(legal_deadline_violated(
                &text("bildirim_tarihi"),
                &text("yururluk_tarihi"),
            )),
        );
    }

    if let Some(end) = contract_end_date(&text("baslangic_tarihi"), &text("sozlesme_suresi")) {
        derived.insert(
            "sozlesme_bitis".to_string(),
            Value::from(end.format("%Y-%m-%d").to_string()),
        );
    }

    derived
}
