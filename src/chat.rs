//! One request-scoped chat turn: normalize, extract facts, route through
//! the intent rules, fall back to generation, and persist the exchange.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::database::MemoryStore;
use crate::facts::extract_facts;
use crate::llm_client::Generate;
use crate::prompt::build_prompt;
use crate::rules::{self, RuleContext};
use crate::text::{detect_tone, normalize_text, tail_chars, Tone};

/// How many recent messages seed the rolling memory window.
pub const RECENT_WINDOW: usize = 6;
/// Trailing character budget for memory text inside the prompt.
pub const PROMPT_MEMORY_LIMIT: usize = 1200;
/// Trailing character budget for the persisted rolling summary.
pub const STORED_SUMMARY_LIMIT: usize = 2000;

pub const EMPTY_INPUT_REPLY: &str = "Please say something.";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
    pub tone: Tone,
}

/// Run one full turn for a user. Every store operation is its own short
/// transaction; nothing spans the gateway call, and no store lock is held
/// across its await.
pub async fn handle_turn(
    store: &MemoryStore,
    llm: &dyn Generate,
    user_id: &str,
    message: &str,
) -> Result<ChatReply> {
    let raw = message.trim();
    if raw.is_empty() {
        // Short-circuit without touching the store
        return Ok(ChatReply {
            reply: EMPTY_INPUT_REPLY.to_string(),
            tone: Tone::Formal,
        });
    }

    let clean = normalize_text(raw);
    store.get_or_create_user(user_id)?;

    // Facts are matched against the raw text so stored values keep their
    // original casing
    let facts = extract_facts(raw);
    if !facts.is_empty() {
        store.update_profile(user_id, &facts)?;
    }

    let tone = detect_tone(raw);

    let ctx = RuleContext {
        user_id,
        raw,
        clean: &clean,
        facts: &facts,
    };
    if let Some(reply) = rules::route(&ctx, store)? {
        store.add_message(user_id, "user", raw)?;
        store.add_message(user_id, "assistant", &reply)?;
        return Ok(ChatReply { reply, tone });
    }

    // No rule matched: seed the prompt with profile and rolling memory,
    // then generate
    let recent = store.get_recent_messages(user_id, RECENT_WINDOW)?;
    let profile = store.get_or_create_user(user_id)?;
    let summary_seed = profile.summary.clone().unwrap_or_default();

    let convo_lines: Vec<String> = recent
        .iter()
        .map(|m| {
            let prefix = if m.role == "user" { "User:" } else { "Assistant:" };
            format!("{} {}", prefix, m.content)
        })
        .collect();
    let combined = format!("{}\n{}", summary_seed, convo_lines.join("\n"));
    let memory_summary = tail_chars(combined.trim(), PROMPT_MEMORY_LIMIT);

    let prompt = build_prompt(memory_summary, &profile, tone, raw);
    let reply = llm.complete(&prompt).await?;

    store.add_message(user_id, "user", raw)?;
    store.add_message(user_id, "assistant", &reply)?;

    // Refresh the rolling summary with this exchange
    let refreshed = format!("{}\nUser: {}\nAssistant: {}", summary_seed, raw, reply);
    store.set_summary(user_id, tail_chars(&refreshed, STORED_SUMMARY_LIMIT))?;

    Ok(ChatReply { reply, tone })
}
