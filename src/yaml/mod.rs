//! YAML loading with source-located diagnostics

pub mod diagnostics;

pub use diagnostics::YamlSyntaxError;

use serde::de::DeserializeOwned;

/// Parse YAML into a typed record, reporting failures against the source
pub fn parse<T: DeserializeOwned>(source: &str, filename: &str) -> Result<T, YamlSyntaxError> {
    serde_yml::from_str(source).map_err(|e| YamlSyntaxError::from_serde_error(&e, source, filename))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_parse_ok() {
        let map: BTreeMap<String, u32> = parse("a: 1\nb: 2\n", "x.yaml").unwrap();
        assert_eq!(map["b"], 2);
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = parse::<BTreeMap<String, u32>>("a: [1\n", "cevaplar.yaml").unwrap_err();
        assert!(err.message().starts_with("cevaplar.yaml"));
    }
}
