//! Print-styled HTML export
//!
//! User text is escaped before any markup is introduced, so the only tags in
//! the output are the ones produced here: `<h3>` for heading lines, `<hr>`
//! for separator lines, `<strong>`/`<em>` for `**bold**`/`*italic*` spans.

use chrono::NaiveDate;

use super::{is_heading, text, DISCLAIMER_TITLE, SEPARATOR};
use crate::assembly::format::format_date;

const PRINT_CSS: &str = r#"
      body {
        font-family: 'Times New Roman', serif;
        line-height: 1.8;
        margin: 40px;
        color: #2c3e50;
        background: white;
      }
      h1 {
        text-align: center;
        margin-bottom: 40px;
        color: #1a365d;
        font-size: 24px;
        font-weight: bold;
        border-bottom: 2px solid #1a365d;
        padding-bottom: 10px;
      }
      h3 {
        color: #2d3748;
        font-size: 16px;
        font-weight: bold;
        margin: 25px 0 15px 0;
        text-transform: uppercase;
        letter-spacing: 0.5px;
      }
      h3.warning { color: #dc2626; }
      hr.warning { border: 2px solid #dc2626; margin: 20px 0; }
      .content { font-size: 14px; text-align: justify; margin-bottom: 40px; }
      .content strong { font-weight: bold; color: #1a365d; }
      .content em { font-style: italic; }
      .footer {
        margin-top: 50px;
        text-align: center;
        font-size: 12px;
        color: #718096;
        border-top: 1px solid #e2e8f0;
        padding-top: 20px;
      }
      @media print {
        body { margin: 20px; -webkit-print-color-adjust: exact; print-color-adjust: exact; }
        .footer { page-break-inside: avoid; }
        h1, h3 { page-break-after: avoid; }
      }
"#;

/// Full HTML page for the document, disclaimer included
pub fn render(title: &str, content: &str, created: NaiveDate) -> String {
    let body = format_content(&text::render(content));
    format!(
        "<!DOCTYPE html>\n<html lang=\"tr\">\n  <head>\n    <meta charset=\"UTF-8\">\n    <title>{title}</title>\n    <style>{css}    </style>\n  </head>\n  <body>\n    <h1>{title}</h1>\n    <div class=\"content\">\n{body}\n    </div>\n    <div class=\"footer\">Oluşturulma Tarihi: {date}</div>\n  </body>\n</html>\n",
        title = escape_html(title),
        css = PRINT_CSS,
        body = body,
        date = format_date(created),
    )
}

/// Convert plain document text into the constrained HTML subset
pub fn format_content(content: &str) -> String {
    let mut out = String::new();
    let mut pending_break = false;

    for raw in content.lines() {
        let line = raw.trim();
        let block = if line == SEPARATOR || is_rule(line) {
            Some("<hr class=\"warning\">".to_string())
        } else if line == DISCLAIMER_TITLE {
            Some(format!("<h3 class=\"warning\">{}</h3>", escape_html(line)))
        } else if is_heading(line) {
            let text = line.strip_suffix(':').unwrap_or(line).trim_end();
            Some(format!("<h3>{}</h3>", escape_html(text)))
        } else {
            None
        };

        match block {
            Some(tag) => {
                out.push_str(&tag);
                out.push('\n');
                pending_break = false;
            }
            None => {
                if pending_break {
                    out.push_str("<br>\n");
                }
                out.push_str(&inline_markup(&escape_html(raw)));
                pending_break = true;
            }
        }
    }
    out
}

/// A line made only of box-drawing rule characters
fn is_rule(line: &str) -> bool {
    line.chars().count() >= 3 && line.chars().all(|c| c == '━' || c == '═')
}

/// `**x**` → strong, then `*x*` → em, within one line
fn inline_markup(line: &str) -> String {
    let bolded = wrap_pairs(line, "**", "strong");
    wrap_pairs(&bolded, "*", "em")
}

fn wrap_pairs(line: &str, marker: &str, tag: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(start) = rest.find(marker) {
        let after = &rest[start + marker.len()..];
        let Some(end) = after.find(marker) else {
            break;
        };
        if end == 0 {
            // Empty span: keep the markers as text
            out.push_str(&rest[..start + marker.len() * 2]);
            rest = &after[marker.len()..];
            continue;
        }
        out.push_str(&rest[..start]);
        out.push_str(&format!("<{tag}>{}</{tag}>", &after[..end], tag = tag));
        rest = &after[end + marker.len()..];
    }
    out.push_str(rest);
    out
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_text_is_escaped() {
        let html = format_content("Not: <script>alert(1)</script> & \"tırnak\"");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&amp; &quot;tırnak&quot;"));
    }

    #[test]
    fn test_markup_subset() {
        let html = format_content("SONUÇ VE TALEP\n**Önemli** ve *vurgulu* metin\n═══════\nson");
        assert!(html.contains("<h3>SONUÇ VE TALEP</h3>"));
        assert!(html.contains("<strong>Önemli</strong> ve <em>vurgulu</em> metin"));
        assert!(html.contains("<hr class=\"warning\">"));
        assert!(html.ends_with("son"));
    }

    #[test]
    fn test_unpaired_markers_stay_literal() {
        assert_eq!(inline_markup("5 * 3 = 15"), "5 * 3 = 15");
        assert_eq!(inline_markup("**yarım"), "**yarım");
    }

    #[test]
    fn test_page_has_title_disclaimer_and_print_css() {
        let page = render(
            "Kira <İtiraz>",
            "Metin",
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        );
        assert!(page.contains("<title>Kira &lt;İtiraz&gt;</title>"));
        assert!(page.contains("Times New Roman"));
        assert!(page.contains("@media print"));
        assert!(page.contains("<h3 class=\"warning\">🚨 YASAL UYARI:</h3>"));
        assert!(page.contains("Oluşturulma Tarihi: 15.01.2024"));
    }
}
