//! Prompt assembly for the generation fallback.

use crate::database::UserProfile;
use crate::text::Tone;

pub const PERSONA: &str = "You are Stan Pal, a friendly assistant with memory.";

/// Compose the single prompt string handed to the gateway: persona, known
/// profile pairs in field declaration order, rolling memory, tone, and the
/// new input, ending with an open continuation marker.
pub fn build_prompt(
    memory_summary: &str,
    profile: &UserProfile,
    tone: Tone,
    new_input: &str,
) -> String {
    let profile_str = profile
        .known_fields()
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{}\nKnown profile: {}\nMemory summary: {}\n\nTone: {}\nUser: {}\nAssistant:",
        PERSONA, profile_str, memory_summary, tone, new_input
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile() -> UserProfile {
        UserProfile {
            id: "u1".to_string(),
            name: Some("Alice".to_string()),
            location: None,
            favorite_color: Some("green".to_string()),
            favorite_sport: None,
            favorite_anime: None,
            favorite_food: None,
            summary: Some("User: hi\nAssistant: hello".to_string()),
            last_seen: Utc::now(),
        }
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = build_prompt("earlier context", &profile(), Tone::Playful, "tell me a joke");
        assert!(prompt.starts_with(PERSONA));
        assert!(prompt.contains("Memory summary: earlier context"));
        assert!(prompt.contains("Tone: playful"));
        assert!(prompt.contains("User: tell me a joke"));
        assert!(prompt.ends_with("Assistant:"));
    }

    #[test]
    fn test_profile_pairs_in_declaration_order() {
        let prompt = build_prompt("", &profile(), Tone::Formal, "hi");
        let name_at = prompt.find("name: Alice").expect("name present");
        let color_at = prompt.find("favorite_color: green").expect("color present");
        let summary_at = prompt.find("summary: User: hi").expect("summary present");
        assert!(name_at < color_at && color_at < summary_at);
        // Empty fields are omitted entirely
        assert!(!prompt.contains("location"));
    }
}
