//! Compiled regular expressions.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

/// A compiled regular expression with its source pattern.
///
/// The regex is shared, so cloning is cheap and compiled automata are reused
/// across expectations registered with the same pattern.
#[derive(Clone)]
pub struct CompiledRegex {
    pattern: String,
    regex: Arc<Regex>,
}

impl CompiledRegex {
    /// Wrap an already compiled regex.
    #[must_use]
    pub fn new(pattern: impl Into<String>, regex: Arc<Regex>) -> Self {
        Self {
            pattern: pattern.into(),
            regex,
        }
    }

    /// Get the source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check for a match anywhere in the text.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Find the first match anywhere in the text.
    #[must_use]
    pub fn find<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.regex.find(text).map(|m| m.as_str())
    }
}

impl fmt::Debug for CompiledRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Regex({:?})", self.pattern)
    }
}

impl PartialEq for CompiledRegex {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for CompiledRegex {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unanchored_search() {
        let re = CompiledRegex::new("/api/login", Arc::new(Regex::new("/api/login").unwrap()));
        assert!(re.is_match("https://x/api/login?next=1"));
        assert_eq!(re.find("https://x/api/login"), Some("/api/login"));
        assert!(!re.is_match("https://x/api/logout"));
    }

    #[test]
    fn debug_shows_pattern() {
        let re = CompiledRegex::new(r"\d+", Arc::new(Regex::new(r"\d+").unwrap()));
        assert_eq!(format!("{re:?}"), r#"Regex("\\d+")"#);
    }
}
