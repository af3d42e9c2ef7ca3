//! `$(Name)` macro substitution (§6 `Macros` section): applied wherever a
//! path is expected, and to the `Paths`/`files` include directives
//! themselves before they are resolved.

use std::collections::HashMap;

use va_core::{VaError, VaResult};

/// A flat `Name -> Value` table, built from the `[Macros]` section plus any
/// caller-supplied overrides (environment-style values the embedding
/// application wants available without writing them to a file).
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    values: HashMap<String, String>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|s| s.as_str())
    }

    /// Replace every `$(Name)` occurrence in `input` with its macro value.
    /// An unresolved reference is an error (§7 `INVALID_PARAMETER`) rather
    /// than passed through verbatim, since a silently-unsubstituted path
    /// would fail file lookup with a confusing message later.
    pub fn substitute(&self, input: &str) -> VaResult<String> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("$(") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find(')').ok_or_else(|| VaError::invalid_parameter(format!("unterminated macro reference in '{input}'")))?;
            let name = &after[..end];
            let value = self.get(name).ok_or_else(|| VaError::invalid_parameter(format!("undefined macro '$({name})' in '{input}'")))?;
            out.push_str(value);
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_macro() {
        let mut macros = MacroTable::new();
        macros.set("Root", "/opt/va");
        assert_eq!(macros.substitute("$(Root)/data").unwrap(), "/opt/va/data");
    }

    #[test]
    fn unknown_macro_is_an_error() {
        let macros = MacroTable::new();
        assert!(macros.substitute("$(Missing)/data").is_err());
    }

    #[test]
    fn string_without_macros_passes_through() {
        let macros = MacroTable::new();
        assert_eq!(macros.substitute("plain/path").unwrap(), "plain/path");
    }
}
</content>
