//! List filtering helpers shared by the collection endpoints.

use regex::{Regex, RegexBuilder};

use stockroom_core::DomainError;

const PATTERN_SIZE_LIMIT: usize = 1 << 16;

/// A case-insensitive `search` pattern, matched against several text fields.
#[derive(Debug, Clone)]
pub struct SearchPattern {
    regex: Regex,
}

impl SearchPattern {
    /// Compile a user-supplied pattern. Blank input means "no filter".
    pub fn parse(input: Option<&str>) -> Result<Option<Self>, DomainError> {
        let Some(pattern) = input.map(str::trim).filter(|p| !p.is_empty()) else {
            return Ok(None);
        };

        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
            .map_err(|e| DomainError::validation(format!("invalid search pattern: {e}")))?;
        Ok(Some(Self { regex }))
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// True when any of the given fields matches. Absent fields never match.
    pub fn matches_any<'a>(&self, fields: impl IntoIterator<Item = Option<&'a str>>) -> bool {
        fields.into_iter().flatten().any(|f| self.is_match(f))
    }
}

/// Keep only the items accepted by `search`, or everything when it is absent.
pub fn apply_search<T>(
    items: Vec<T>,
    search: Option<&SearchPattern>,
    fields: impl Fn(&T) -> Vec<Option<&str>>,
) -> Vec<T> {
    match search {
        None => items,
        Some(pattern) => items
            .into_iter()
            .filter(|item| pattern.matches_any(fields(item)))
            .collect(),
    }
}
