//! Match predicates
//!
//! Pure string predicates parameterized by a match-type enum. Each positive
//! form and its negation are strict complements, so for any `(targets,
//! subject)` pair exactly one of the two returns true. An empty target list
//! matches nothing: the positive forms return false and the negated forms
//! return true.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// How a condition value is compared against the page state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Any target is a case-insensitive substring of the subject.
    #[default]
    Icontains,
    /// No target is a case-insensitive substring of the subject.
    NotIcontains,
    /// Any target, parsed as a regular expression, matches the subject.
    Regex,
    /// No target, parsed as a regular expression, matches the subject.
    NotRegex,
    /// Any target equals the subject literally.
    Exact,
    /// No target equals the subject literally.
    IsNot,
}

impl MatchType {
    /// Evaluate this predicate for an ordered list of targets against one
    /// subject string.
    pub fn matches(&self, targets: &[String], subject: &str) -> bool {
        match self {
            MatchType::Icontains => any_icontains(targets, subject),
            MatchType::NotIcontains => !any_icontains(targets, subject),
            MatchType::Regex => any_regex_match(targets, subject),
            MatchType::NotRegex => !any_regex_match(targets, subject),
            MatchType::Exact => any_exact(targets, subject),
            MatchType::IsNot => !any_exact(targets, subject),
        }
    }

    /// The complementary predicate.
    pub fn negated(&self) -> MatchType {
        match self {
            MatchType::Icontains => MatchType::NotIcontains,
            MatchType::NotIcontains => MatchType::Icontains,
            MatchType::Regex => MatchType::NotRegex,
            MatchType::NotRegex => MatchType::Regex,
            MatchType::Exact => MatchType::IsNot,
            MatchType::IsNot => MatchType::Exact,
        }
    }
}

fn any_icontains(targets: &[String], subject: &str) -> bool {
    let subject = subject.to_lowercase();
    targets.iter().any(|t| subject.contains(&t.to_lowercase()))
}

/// An unparseable pattern never matches.
fn any_regex_match(targets: &[String], subject: &str) -> bool {
    targets
        .iter()
        .any(|t| Regex::new(t).map(|re| re.is_match(subject)).unwrap_or(false))
}

fn any_exact(targets: &[String], subject: &str) -> bool {
    targets.iter().any(|t| t == subject)
}
