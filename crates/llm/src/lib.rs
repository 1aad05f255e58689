//! Client for the remote annotation gateway (an OpenAI-compatible
//! chat-completion service) and the retry/fallback orchestration around it.
//!
//! - [`api`] performs one classified HTTP call.
//! - [`retry`] holds the attempt budget and linear backoff schedule.
//! - [`annotator`] drives the attempts and falls back to the local
//!   heuristic from `offnotes_core::fallback` when they run out.

pub mod annotator;
pub mod api;
pub mod config;
pub mod prompt;
pub mod retry;
