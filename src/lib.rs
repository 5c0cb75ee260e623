//! Stan Pal backend: a conversational service that keeps per-user profile
//! facts and message history, answers a fixed set of questions through
//! ordered intent rules, and falls back to a language model seeded with a
//! rolling conversation summary.

pub mod chat;
pub mod config;
pub mod database;
pub mod facts;
pub mod llm_client;
pub mod prompt;
pub mod rules;
pub mod server;
pub mod text;
