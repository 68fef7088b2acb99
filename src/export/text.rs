//! Plain-text export

use super::{DISCLAIMER_LINES, DISCLAIMER_TITLE, SEPARATOR};

/// Generated content unchanged, followed by the legal disclaimer
pub fn render(content: &str) -> String {
    let mut out = String::with_capacity(content.len() + 512);
    out.push_str(content);
    out.push_str("\n\n");
    out.push_str(SEPARATOR);
    out.push_str("\n\n");
    out.push_str(DISCLAIMER_TITLE);
    for line in DISCLAIMER_LINES {
        out.push('\n');
        out.push_str(line);
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_is_kept_verbatim() {
        let content = "Kiracı: Şükrü Öğüt\nTutar: 12.500 TL\n  girintili satır";
        let out = render(content);
        assert!(out.starts_with(content));
        assert!(out.contains(DISCLAIMER_TITLE));
        assert!(out.trim_end().ends_with("sorumlu değildir."));
    }
}
