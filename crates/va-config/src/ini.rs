//! Hand-written INI-style parser (§4.11): no mainstream `serde`-integrated
//! INI crate exists in this stack, so the raw section/key-value map is
//! parsed by hand here; only the final typed mapping (`crate::model`) goes
//! through `serde`.
//!
//! Grammar: `[Section]` or `[Section:id]` headers, `Key=Value` lines,
//! `;`/`#` full-line or trailing comments, blank lines ignored. Keys within
//! one section preserve declaration order (an `IndexMap`-style behavior
//! implemented here with a plain `Vec` since the section count is small and
//! this only runs at startup).

use std::collections::BTreeMap;

use va_core::{VaError, VaResult};

/// One `[Section]` or `[Section:id]` block: an ordered key/value list.
#[derive(Debug, Clone, Default)]
pub struct RawSection {
    pub id: Option<String>,
    entries: Vec<(String, String)>,
}

impl RawSection {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    fn insert(&mut self, key: String, value: String) -> VaResult<()> {
        if self.entries.iter().any(|(k, _)| k.eq_ignore_ascii_case(&key)) {
            return Err(VaError::invalid_parameter(format!("duplicate key '{key}' within one section")));
        }
        self.entries.push((key, value));
        Ok(())
    }
}

/// A fully parsed (but not yet merged, macro-substituted, or typed) INI
/// document: an ordered map of section-name to [`RawSection`]. Sections
/// sharing a base name but different ids (`Output:A`, `Output:B`) are kept
/// as distinct entries keyed by the literal header text.
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    sections: BTreeMap<String, RawSection>,
}

impl RawConfig {
    pub fn section(&self, name: &str) -> Option<&RawSection> {
        self.sections.get(name)
    }

    /// All section headers whose base name (before `:`) matches `base`,
    /// e.g. every `OutputDevice:<id>` (§6).
    pub fn sections_with_base(&self, base: &str) -> Vec<(&str, &RawSection)> {
        self.sections
            .iter()
            .filter(|(header, _)| header.split(':').next() == Some(base))
            .map(|(header, section)| (header.as_str(), section))
            .collect()
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(|s| s.as_str())
    }

    /// Merge `other` into `self`. A key present in both under the same
    /// section header is a hard error (§6 "Merged struct keys must be
    /// unique") — later files extend the tree, they never silently
    /// override it.
    pub fn merge(&mut self, other: RawConfig) -> VaResult<()> {
        for (header, section) in other.sections {
            let existing = self.sections.entry(header.clone()).or_insert_with(|| RawSection { id: section.id.clone(), ..Default::default() });
            for (key, value) in section.entries {
                existing.insert(key, value).map_err(|_| VaError::invalid_parameter(format!("duplicate key in section '{header}' across merged config files")))?;
            }
        }
        Ok(())
    }
}

/// Parse one INI document's text into a [`RawConfig`]. Does not resolve
/// `files`/`paths` includes or `$(Name)` macros — see `crate::loader`.
pub fn parse(text: &str) -> VaResult<RawConfig> {
    let mut sections = BTreeMap::new();
    let mut current_header: Option<String> = None;

    for (line_no, raw_line) in text.lines().enumerate() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(stripped) = line.strip_prefix('[') {
            let header = stripped.strip_suffix(']').ok_or_else(|| VaError::invalid_parameter(format!("unterminated section header at line {}", line_no + 1)))?.trim().to_string();
            let id = header.split_once(':').map(|(_, id)| id.trim().to_string());
            sections.entry(header.clone()).or_insert(RawSection { id, entries: Vec::new() });
            current_header = Some(header);
            continue;
        }

        let header = current_header.as_ref().ok_or_else(|| VaError::invalid_parameter(format!("key/value line before any section header at line {}", line_no + 1)))?;
        let (key, value) = line.split_once('=').ok_or_else(|| VaError::invalid_parameter(format!("expected 'Key=Value' at line {}", line_no + 1)))?;
        let section = sections.get_mut(header).expect("header was just inserted or already present");
        section.insert(key.trim().to_string(), value.trim().to_string())?;
    }

    Ok(RawConfig { sections })
}

fn strip_comment(line: &str) -> &str {
    for (i, c) in line.char_indices() {
        if c == ';' || c == '#' {
            return &line[..i];
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections_and_keys() {
        let cfg = parse(
            "[Debug]\nLogLevel=3\n; a comment\n[OutputDevice:A]\nType=Virtual\nChannels=1,2\n",
        )
        .unwrap();
        assert_eq!(cfg.section("Debug").unwrap().get("LogLevel"), Some("3"));
        let (header, section) = cfg.sections_with_base("OutputDevice")[0];
        assert_eq!(header, "OutputDevice:A");
        assert_eq!(section.get("Type"), Some("Virtual"));
    }

    #[test]
    fn duplicate_key_in_one_section_is_an_error() {
        assert!(parse("[Debug]\nLogLevel=1\nLogLevel=2\n").is_err());
    }

    #[test]
    fn merge_rejects_duplicate_key_across_files() {
        let mut a = parse("[Debug]\nLogLevel=1\n").unwrap();
        let b = parse("[Debug]\nLogLevel=2\n").unwrap();
        assert!(a.merge(b).is_err());
    }

    #[test]
    fn merge_extends_distinct_keys() {
        let mut a = parse("[Debug]\nLogLevel=1\n").unwrap();
        let b = parse("[Debug]\nTriggerUpdateMilliseconds=10\n").unwrap();
        a.merge(b).unwrap();
        assert_eq!(a.section("Debug").unwrap().get("TriggerUpdateMilliseconds"), Some("10"));
    }
}
</content>
