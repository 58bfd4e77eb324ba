//! Keyword-overlap relevance filter
//!
//! An entry is surfaced when any whitespace token of the user's interest
//! or profile text appears, case-insensitively, inside the entry's title or
//! summary. Extraction and matching are separate so a scoring model can
//! replace [`KeywordSet::matches`] without touching how keywords are read.

use std::collections::BTreeSet;

/// Lowercased keyword bag built from free text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: BTreeSet<String>,
}

impl KeywordSet {
    /// Tokenize every source on whitespace and lowercase each token
    pub fn from_texts<'a, I>(texts: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let keywords = texts
            .into_iter()
            .flat_map(str::split_whitespace)
            .map(str::to_lowercase)
            .collect();
        Self { keywords }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.keywords.contains(&keyword.to_lowercase())
    }

    /// First keyword found as a substring of the lowercased haystack
    pub fn first_match(&self, haystack: &str) -> Option<&str> {
        let haystack = haystack.to_lowercase();
        self.keywords
            .iter()
            .find(|kw| haystack.contains(kw.as_str()))
            .map(String::as_str)
    }

    pub fn matches(&self, haystack: &str) -> bool {
        self.first_match(haystack).is_some()
    }
}

/// Keyword set for the interest and profile texts
pub fn extract_keywords(interest: &str, profile: &str) -> KeywordSet {
    KeywordSet::from_texts([interest, profile])
}

/// Whether an entry should be delivered.
///
/// Pure: the result depends only on the four arguments. Empty interest and
/// profile text never match.
pub fn is_relevant(title: &str, summary: &str, interest: &str, profile: &str) -> bool {
    let keywords = extract_keywords(interest, profile);
    if keywords.is_empty() {
        return false;
    }
    keywords.matches(&format!("{} {}", title, summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_interest_and_profile_never_match() {
        assert!(!is_relevant("Rust 2.0", "Everything changes", "", ""));
        assert!(!is_relevant("a", "b", "   \n\t", ""));
        assert!(!is_relevant("", "", "", ""));
    }

    #[test]
    fn test_interest_keyword_matches_case_insensitive() {
        assert!(is_relevant(
            "NASA launches orbiter",
            "A new mission",
            "nasa\nbaking",
            ""
        ));
        assert!(is_relevant("nothing", "about SPACE travel", "Space", ""));
    }

    #[test]
    fn test_profile_keyword_matches() {
        let profile = "Positive interest in: Mars Rover Update\n";
        assert!(is_relevant("Mars sample return delayed", "", "", profile));
    }

    #[test]
    fn test_no_overlap() {
        assert!(!is_relevant(
            "Stock markets rally",
            "Indices close higher",
            "rust tokio",
            ""
        ));
    }

    #[test]
    fn test_substring_match_is_broad() {
        // "art" is found inside "startup"; kept as-is, a known weakness
        assert!(is_relevant("Startup raises seed round", "", "art", ""));
    }

    #[test]
    fn test_every_keyword_hits_its_own_text() {
        let interest = "Quantum Rust Gardening";
        let profile = "Custom Feedback: more Astronomy";
        let keywords = extract_keywords(interest, profile);
        for kw in interest.split_whitespace().chain(profile.split_whitespace()) {
            assert!(keywords.contains(kw));
            assert!(is_relevant(
                &format!("xx {} yy", kw.to_uppercase()),
                "",
                interest,
                profile
            ));
        }
    }

    #[test]
    fn test_keyword_set_dedup_and_first_match() {
        let set = KeywordSet::from_texts(["Rust rust RUST", "go"]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.first_match("Learning Go today"), Some("go"));
        assert_eq!(set.first_match("python"), None);
    }
}
