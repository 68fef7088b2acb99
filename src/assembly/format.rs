//! Turkish number, date and filename formatting

use chrono::NaiveDate;
use serde_json::Value;

use crate::core::answers::{parse_date, parse_number};

/// Group an amount the Turkish way: `5000` → `5.000`, `1234.5` → `1.234,5`
pub fn format_currency(amount: f64) -> String {
    if !amount.is_finite() {
        return String::new();
    }
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let fraction = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    if fraction > 0 {
        let decimals = format!("{:02}", fraction);
        grouped.push(',');
        grouped.push_str(decimals.trim_end_matches('0'));
    }
    if negative {
        grouped.insert(0, '-');
    }
    grouped
}

/// `dd.mm.yyyy`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Format a stored date string; anything unparsable is returned as given
pub fn format_date_text(input: &str) -> String {
    parse_date(input)
        .map(format_date)
        .unwrap_or_else(|| input.to_string())
}

/// Currency rendering of a JSON value; non-numeric text passes through
pub fn currency_value(value: &Value) -> String {
    match value {
        Value::Number(n) => n.as_f64().map(format_currency).unwrap_or_default(),
        Value::String(s) => parse_number(s)
            .map(format_currency)
            .unwrap_or_else(|| s.clone()),
        other => other.to_string(),
    }
}

/// Replace Turkish letters with their closest ASCII counterparts
pub fn transliterate(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'ç' => 'c',
            'Ç' => 'C',
            'ğ' => 'g',
            'Ğ' => 'G',
            'ı' => 'i',
            'İ' => 'I',
            'ö' => 'o',
            'Ö' => 'O',
            'ş' => 's',
            'Ş' => 'S',
            'ü' => 'u',
            'Ü' => 'U',
            other => other,
        })
        .collect()
}

/// Uppercase with the dotted/dotless i pair handled the Turkish way
pub fn turkish_uppercase(input: &str) -> String {
    input
        .chars()
        .flat_map(|c| match c {
            'i' => vec!['İ'],
            'ı' => vec!['I'],
            other => other.to_uppercase().collect(),
        })
        .collect()
}

/// Lowercase ASCII slug joined by underscores
pub fn slugify(input: &str) -> String {
    let ascii = transliterate(input).to_lowercase();
    let cleaned: String = ascii
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .map(|c| if c == '-' { ' ' } else { c })
        .collect();
    cleaned
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// `<slug>_<case number>_<yyyy-mm-dd>` without extension
pub fn document_file_stem(title: &str, case_number: &str, date: NaiveDate) -> String {
    let slug = slugify(title);
    let slug = if slug.is_empty() { "belge".to_string() } else { slug };
    format!("{}_{}_{}", slug, case_number, date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(5000.0), "5.000");
        assert_eq!(format_currency(750.0), "750");
        assert_eq!(format_currency(1234567.0), "1.234.567");
        assert_eq!(format_currency(1234.5), "1.234,5");
        assert_eq!(format_currency(-2500.25), "-2.500,25");
    }

    #[test]
    fn test_currency_value_passes_placeholders_through() {
        assert_eq!(currency_value(&json!(6000)), "6.000");
        assert_eq!(currency_value(&json!("7.500")), "7.500");
        assert_eq!(currency_value(&json!("[TUTAR]")), "[TUTAR]");
    }

    #[test]
    fn test_format_dates() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(format_date(d), "15.01.2024");
        assert_eq!(format_date_text("2024-01-15"), "15.01.2024");
        assert_eq!(format_date_text("[TARİH]"), "[TARİH]");
    }

    #[test]
    fn test_slugify_transliterates() {
        assert_eq!(transliterate("Şükrü Çağlayan"), "Sukru Caglayan");
        assert_eq!(slugify("Kira İtiraz Dilekçesi - Ayşe"), "kira_itiraz_dilekcesi_ayse");
        assert_eq!(slugify("  ?? "), "");
    }

    #[test]
    fn test_turkish_uppercase() {
        assert_eq!(turkish_uppercase("Serbest Dilekçe"), "SERBEST DİLEKÇE");
        assert_eq!(turkish_uppercase("ısırgan"), "ISIRGAN");
    }

    #[test]
    fn test_document_file_stem() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(
            document_file_stem("Görüş", "DILEKCE-2024-ABC123", d),
            "gorus_DILEKCE-2024-ABC123_2024-01-15"
        );
        assert_eq!(
            document_file_stem("", "X", d),
            "belge_X_2024-01-15"
        );
    }
}
