//! Word-processor export as a minimal OOXML package
//!
//! The package holds the four parts Word and LibreOffice need to open a
//! document: content types, package relationships, the main document part
//! and core properties.

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{is_heading, ExportError, ExportSource, DISCLAIMER_LINES, DISCLAIMER_TITLE, SEPARATOR};
use crate::assembly::format::format_date;
use crate::core::document::DocumentFormat;

const FONT: &str = "Times New Roman";
const WARNING_COLOR: &str = "DC2626";
const MUTED_COLOR: &str = "666666";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Center,
    Justify,
}

/// Formatting of a single-run paragraph
#[derive(Debug, Clone, Copy)]
struct Style {
    align: Option<Align>,
    bold: bool,
    italic: bool,
    /// Half-points
    size: u32,
    color: Option<&'static str>,
    before: u32,
    after: u32,
}

impl Style {
    const TITLE: Style = Style {
        align: Some(Align::Center),
        bold: true,
        italic: false,
        size: 32,
        color: None,
        before: 0,
        after: 400,
    };
    const HEADING: Style = Style {
        align: None,
        bold: true,
        italic: false,
        size: 24,
        color: None,
        before: 300,
        after: 200,
    };
    const BODY: Style = Style {
        align: Some(Align::Justify),
        bold: false,
        italic: false,
        size: 22,
        color: None,
        before: 0,
        after: 120,
    };
}

/// Bytes of a `.docx` package for the document
pub fn render(source: &ExportSource) -> Result<Vec<u8>, ExportError> {
    let document = document_xml(source);
    let core = core_xml(source);

    let package = |e: &dyn std::fmt::Display| ExportError::Package {
        format: DocumentFormat::Docx,
        message: e.to_string(),
    };

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, body) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", PACKAGE_RELS),
        ("word/document.xml", document.as_str()),
        ("docProps/core.xml", core.as_str()),
    ] {
        zip.start_file(name, options).map_err(|e| package(&e))?;
        zip.write_all(body.as_bytes()).map_err(|e| package(&e))?;
    }
    let cursor = zip.finish().map_err(|e| package(&e))?;
    Ok(cursor.into_inner())
}

/// The `word/document.xml` part
fn document_xml(source: &ExportSource) -> String {
    let mut body = String::new();
    body.push_str(&paragraph(&source.title, Style::TITLE));

    for line in source.content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if is_heading(line) {
            let text = line.strip_suffix(':').unwrap_or(line).trim_end();
            body.push_str(&paragraph(text, Style::HEADING));
        } else {
            body.push_str(&paragraph(line, Style::BODY));
        }
    }

    body.push_str(&paragraph(
        SEPARATOR,
        Style {
            align: Some(Align::Center),
            size: 18,
            color: Some(WARNING_COLOR),
            before: 300,
            after: 0,
            ..Style::BODY
        },
    ));
    body.push_str(&paragraph(
        DISCLAIMER_TITLE,
        Style {
            align: Some(Align::Center),
            bold: true,
            size: 20,
            color: Some(WARNING_COLOR),
            before: 200,
            after: 0,
            ..Style::BODY
        },
    ));
    body.push_str(&paragraph(
        &DISCLAIMER_LINES.join(" "),
        Style {
            size: 18,
            color: Some(MUTED_COLOR),
            before: 200,
            after: 300,
            ..Style::BODY
        },
    ));
    body.push_str(&paragraph(
        &format!("Oluşturulma Tarihi: {}", format_date(source.created)),
        Style {
            align: Some(Align::Center),
            italic: true,
            size: 18,
            before: 400,
            after: 0,
            ..Style::BODY
        },
    ));

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
            "<w:body>{}",
            r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1417" w:right="1417" w:bottom="1417" w:left="1417" w:header="708" w:footer="708" w:gutter="0"/></w:sectPr>"#,
            "</w:body></w:document>"
        ),
        body
    )
}

fn paragraph(text: &str, style: Style) -> String {
    let mut p = String::from("<w:p><w:pPr>");
    p.push_str(&format!(
        r#"<w:spacing w:before="{}" w:after="{}"/>"#,
        style.before, style.after
    ));
    match style.align {
        Some(Align::Center) => p.push_str(r#"<w:jc w:val="center"/>"#),
        Some(Align::Justify) => p.push_str(r#"<w:jc w:val="both"/>"#),
        None => {}
    }
    p.push_str("</w:pPr><w:r><w:rPr>");
    p.push_str(&format!(
        r#"<w:rFonts w:ascii="{f}" w:hAnsi="{f}" w:cs="{f}"/>"#,
        f = FONT
    ));
    if style.bold {
        p.push_str("<w:b/>");
    }
    if style.italic {
        p.push_str("<w:i/>");
    }
    if let Some(color) = style.color {
        p.push_str(&format!(r#"<w:color w:val="{}"/>"#, color));
    }
    p.push_str(&format!(r#"<w:sz w:val="{}"/>"#, style.size));
    p.push_str(r#"</w:rPr><w:t xml:space="preserve">"#);
    p.push_str(&escape_xml(text));
    p.push_str("</w:t></w:r></w:p>");
    p
}

fn core_xml(source: &ExportSource) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
            "<dc:title>{}</dc:title><dc:creator>dilekce</dc:creator>",
            r#"<dcterms:created xsi:type="dcterms:W3CDTF">{}T00:00:00Z</dcterms:created>"#,
            "</cp:coreProperties>"
        ),
        escape_xml(&source.title),
        source.created.format("%Y-%m-%d")
    )
}

/// Escape markup characters and drop control characters XML 1.0 forbids
fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' => out.push(c),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Read;

    fn source(content: &str) -> ExportSource {
        ExportSource {
            title: "Kira İtirazı".to_string(),
            content: content.to_string(),
            created: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            file_stem: "x".to_string(),
        }
    }

    fn read_part(bytes: Vec<u8>, name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut out = String::new();
        part.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_package_contains_required_parts() {
        let bytes = render(&source("TARAFLAR\nAd: Ali")).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/document.xml",
            "docProps/core.xml",
        ] {
            assert!(names.contains(&part), "{} missing", part);
        }
    }

    #[test]
    fn test_headings_body_and_footer() {
        let bytes = render(&source("TARAFLAR:\n\nKiracı <Ali> & eşi\n")).unwrap();
        let xml = read_part(bytes, "word/document.xml");

        let title = xml.find("Kira İtirazı").unwrap();
        let heading = xml.find(">TARAFLAR<").unwrap();
        assert!(title < heading);
        assert!(xml.contains("Kiracı &lt;Ali&gt; &amp; eşi"));
        assert!(xml.contains(r#"<w:jc w:val="both"/>"#));
        assert!(xml.contains("Oluşturulma Tarihi: 01.06.2024"));
        assert!(xml.contains(DISCLAIMER_TITLE));
    }

    #[test]
    fn test_escape_drops_control_characters() {
        assert_eq!(escape_xml("a\u{0007}b\t\"c\""), "ab\t&quot;c&quot;");
    }
}
