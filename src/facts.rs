//! Rule-based extraction of profile facts from raw message text.
//!
//! Each field has exactly one case-insensitive pattern anchored on word
//! boundaries. Rules are evaluated independently, so a single message can
//! yield several fields. Matching runs against the original-case text so
//! stored values keep their casing.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex_lite::Regex;

/// Profile columns the extractor (and the store) are allowed to touch.
pub const PROFILE_FIELDS: &[&str] = &[
    "name",
    "location",
    "favorite_color",
    "favorite_sport",
    "favorite_anime",
    "favorite_food",
];

/// One extraction rule: the capture group holds the field value.
struct FactRule {
    field: &'static str,
    pattern: &'static str,
}

const FACT_RULES: &[FactRule] = &[
    FactRule {
        field: "name",
        pattern: r"(?i)\b(?:my name is|i am|i'm|im)\s+([A-Za-z][A-Za-z\s\.'-]{0,60})\b",
    },
    FactRule {
        field: "location",
        pattern: r"(?i)\b(?:i live in|i'm from|i am from)\s+([A-Za-z][A-Za-z\s\.'-]{1,80})\b",
    },
    FactRule {
        field: "favorite_color",
        pattern: r"(?i)\bmy (?:favorite|favourite) color is\s+([A-Za-z0-9\-\s]{1,30})\b",
    },
    FactRule {
        field: "favorite_sport",
        pattern: r"(?i)\bmy (?:favorite|favourite) sport is\s+([A-Za-z0-9\-\s]{1,40})\b",
    },
    FactRule {
        field: "favorite_anime",
        pattern: r"(?i)\bmy (?:favorite|favourite) anime is\s+([A-Za-z0-9:'\-\s]{1,60})\b",
    },
    FactRule {
        field: "favorite_food",
        pattern: r"(?i)\bmy (?:favorite|favourite) food is\s+([A-Za-z0-9\-\s]{1,60})\b",
    },
];

fn compiled_rules() -> &'static [(&'static str, Regex)] {
    static COMPILED: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        FACT_RULES
            .iter()
            .filter_map(|rule| {
                Regex::new(rule.pattern)
                    .ok()
                    .map(|re| (rule.field, re))
            })
            .collect()
    })
}

/// Extract every recognized profile field from a raw message.
///
/// A field is present only when its specific pattern matched; values are
/// trimmed of surrounding whitespace.
pub fn extract_facts(raw: &str) -> HashMap<&'static str, String> {
    let text = raw.trim();
    let mut facts = HashMap::new();
    for (field, re) in compiled_rules() {
        if let Some(caps) = re.captures(text) {
            if let Some(group) = caps.get(1) {
                let value = group.as_str().trim();
                if !value.is_empty() {
                    facts.insert(*field, value.to_string());
                }
            }
        }
    }
    facts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_name() {
        let facts = extract_facts("My name is Alice");
        assert_eq!(facts.get("name").map(String::as_str), Some("Alice"));
    }

    #[test]
    fn test_name_lead_in_variants() {
        assert_eq!(
            extract_facts("i'm Bob").get("name").map(String::as_str),
            Some("Bob")
        );
        assert_eq!(
            extract_facts("im Carol").get("name").map(String::as_str),
            Some("Carol")
        );
        assert_eq!(
            extract_facts("I am Dave").get("name").map(String::as_str),
            Some("Dave")
        );
    }

    #[test]
    fn test_word_boundary_blocks_partial_lead_ins() {
        // "naming" must not satisfy the "name is" lead-in
        assert!(extract_facts("the naming is odd here").is_empty());
    }

    #[test]
    fn test_extracts_location() {
        let facts = extract_facts("I live in Berlin");
        assert_eq!(facts.get("location").map(String::as_str), Some("Berlin"));
        let facts = extract_facts("i'm from New York");
        assert_eq!(facts.get("location").map(String::as_str), Some("New York"));
    }

    #[test]
    fn test_extracts_favorites_with_spelling_variants() {
        let facts = extract_facts("my favourite color is teal");
        assert_eq!(facts.get("favorite_color").map(String::as_str), Some("teal"));
        let facts = extract_facts("My favorite sport is table tennis");
        assert_eq!(
            facts.get("favorite_sport").map(String::as_str),
            Some("table tennis")
        );
        let facts = extract_facts("my favorite anime is Cowboy Bebop");
        assert_eq!(
            facts.get("favorite_anime").map(String::as_str),
            Some("Cowboy Bebop")
        );
    }

    #[test]
    fn test_multiple_fields_from_one_message() {
        let facts = extract_facts("My favorite color is green. My favorite food is sushi.");
        assert_eq!(facts.get("favorite_color").map(String::as_str), Some("green"));
        assert_eq!(facts.get("favorite_food").map(String::as_str), Some("sushi"));
    }

    #[test]
    fn test_no_match_yields_empty_map() {
        assert!(extract_facts("what a lovely day").is_empty());
        assert!(extract_facts("").is_empty());
    }
}
