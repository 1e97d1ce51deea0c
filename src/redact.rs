//! Keyword matching for redaction rules.

use regex::{Regex, RegexBuilder};

use crate::config::Redaction;

/// A compiled [`Redaction`]. Matching is substring containment.
#[derive(Debug, Clone)]
pub(crate) enum KeywordMatcher {
    Exact(String),
    IgnoreCase(Regex),
    /// Used only if the keyword is too large to compile as a regex.
    Lowercase(String),
}

impl KeywordMatcher {
    pub(crate) fn new(rule: &Redaction) -> Self {
        if rule.case_sensitive {
            return KeywordMatcher::Exact(rule.keyword.clone());
        }
        match RegexBuilder::new(&regex::escape(&rule.keyword))
            .case_insensitive(true)
            .build()
        {
            Ok(regex) => KeywordMatcher::IgnoreCase(regex),
            Err(_) => KeywordMatcher::Lowercase(rule.keyword.to_lowercase()),
        }
    }

    pub(crate) fn matches(&self, text: &str) -> bool {
        match self {
            KeywordMatcher::Exact(keyword) => text.contains(keyword.as_str()),
            KeywordMatcher::IgnoreCase(regex) => regex.is_match(text),
            KeywordMatcher::Lowercase(keyword) => text.to_lowercase().contains(keyword.as_str()),
        }
    }
}
