//! A string newtype that expands `{{ env.VAR }}` placeholders against the
//! process environment at deserialization time.
//!
//! Used by the config crate for fields that are frequently supplied as
//! environment references in TOML (API keys, base URLs) rather than
//! literal values, so secrets never have to live in a config file.

use std::fmt;
use std::ops::Deref;

use regex::Regex;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use std::sync::OnceLock;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{\s*env\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid regex"))
}

/// A `String` wrapper that expands `{{ env.VAR }}` references on
/// deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicString(String);

impl DynamicString {
    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Expand `{{ env.VAR }}` placeholders in `raw` using `lookup`.
    /// Exposed directly so callers (and tests) can expand without going
    /// through serde.
    pub fn expand_with(raw: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String, MissingEnvVar> {
        let mut missing = None;

        let expanded = placeholder_pattern().replace_all(raw, |caps: &regex::Captures<'_>| {
            let var = &caps[1];
            match lookup(var) {
                Some(value) => value,
                None => {
                    missing.get_or_insert_with(|| MissingEnvVar(var.to_string()));
                    String::new()
                }
            }
        });

        match missing {
            Some(err) => Err(err),
            None => Ok(expanded.into_owned()),
        }
    }
}

impl Deref for DynamicString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DynamicString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DynamicString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<DynamicString> for String {
    fn from(value: DynamicString) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("environment variable '{0}' is not set")]
pub struct MissingEnvVar(pub String);

impl<'de> Deserialize<'de> for DynamicString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let expanded = DynamicString::expand_with(&raw, |var| std::env::var(var).ok())
            .map_err(serde::de::Error::custom)?;
        Ok(DynamicString(expanded))
    }
}

impl Serialize for DynamicString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_placeholder() {
        let result = DynamicString::expand_with("prefix-{{ env.FOO }}-suffix", |var| {
            (var == "FOO").then(|| "bar".to_string())
        })
        .unwrap();
        assert_eq!(result, "prefix-bar-suffix");
    }

    #[test]
    fn leaves_plain_strings_untouched() {
        let result = DynamicString::expand_with("plain-value", |_| None).unwrap();
        assert_eq!(result, "plain-value");
    }

    #[test]
    fn missing_variable_is_an_error() {
        let result = DynamicString::expand_with("{{ env.MISSING }}", |_| None);
        assert!(result.is_err());
    }

    #[test]
    fn multiple_placeholders_expand_independently() {
        let result = DynamicString::expand_with("{{ env.A }}:{{ env.B }}", |var| match var {
            "A" => Some("1".to_string()),
            "B" => Some("2".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(result, "1:2");
    }
}
