//! Resolution of the fixed set of template variables (`:distro`,
//! `:release`, `:build_name`, ...) and their literal substitution.

use indexmap::IndexMap;

/// Name to value substitution table for one template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableResolver {
    delim: String,
    values: IndexMap<String, String>,
}

impl VariableResolver {
    /// Creates an empty resolver for variables introduced by `delim`.
    pub fn new(delim: impl Into<String>) -> Self {
        Self {
            delim: delim.into(),
            values: IndexMap::new(),
        }
    }

    pub fn delim(&self) -> &str {
        &self.delim
    }

    /// Sets `name` (without delimiter) to `value`.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.values
            .insert(format!("{}{}", self.delim, name), value.into());
    }

    /// Returns the resolved value of `name` (without delimiter).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(&format!("{}{}", self.delim, name))
            .map(String::as_str)
    }

    /// Replaces every known variable token in `s` with its value.
    ///
    /// A single pass is made over the table: a value that introduces another
    /// token is not resolved again.
    pub fn replace(&self, s: &str) -> String {
        if self.delim.is_empty() || !s.contains(self.delim.as_str()) {
            return s.to_string();
        }
        let mut replaced = s.to_string();
        for (token, value) in &self.values {
            replaced = replaced.replace(token.as_str(), value);
        }
        replaced
    }

    /// Returns `default` for an empty `s`, otherwise `s` with variables
    /// replaced and one trailing `/` removed. A bare `/` is kept.
    pub fn merge_string(&self, s: &str, default: &str) -> String {
        if s.is_empty() {
            return default.to_string();
        }
        let replaced = self.replace(s);
        match replaced.strip_suffix('/') {
            Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
            _ => replaced,
        }
    }
}
