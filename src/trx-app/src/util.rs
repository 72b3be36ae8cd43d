// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

/// Normalize a name to lowercase alphanumeric.
pub fn normalize_name(name: &str) -> String {
    name.to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Split a `key=value` driver option. Whitespace around both halves is
/// dropped; the value may itself contain `=`.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected 'key=value', got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("FT-817"), "ft817");
        assert_eq!(normalize_name("Dummy"), "dummy");
        assert_eq!(normalize_name("foo_bar-baz"), "foobarbaz");
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("civaddr = 0x94").unwrap(),
            ("civaddr".to_string(), "0x94".to_string())
        );
        assert_eq!(
            parse_key_value("init=AI0;ID=1").unwrap(),
            ("init".to_string(), "AI0;ID=1".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }
}
