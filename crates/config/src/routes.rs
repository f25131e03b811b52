use indexmap::IndexMap;
use serde::Deserialize;

/// Route table: model pattern → ordered list of adapter names to try for
/// that pattern. Registration order is preserved (`IndexMap`) since it is
/// the router's final tiebreaker when two patterns tie on specificity.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RoutesConfig {
    /// Pattern → adapter names. A pattern containing `*` (and not equal
    /// to the bare literal `*`) is a glob; anything else is matched
    /// exactly.
    pub routes: IndexMap<String, Vec<String>>,

    /// Adapter names tried when no route matches and no catch-all `*`
    /// pattern is present.
    pub default: Vec<String>,
}

impl RoutesConfig {
    /// Specificity of a glob pattern: the count of non-wildcard
    /// characters. Higher specificity wins when multiple glob patterns
    /// match the same model.
    pub fn specificity(pattern: &str) -> usize {
        pattern.chars().filter(|&c| c != '*').count()
    }

    pub fn is_glob(pattern: &str) -> bool {
        pattern.contains('*') && pattern != "*"
    }
}
