//! Completion request pipeline: context gathering, prompt assembly, and
//! candidate cleanup.
//!
//! Runs entirely off the dispatch path on a spawned task. Context gathering
//! is best-effort and cannot abort a request; provider failures are logged
//! and collapse to "no suggestion" — nothing from here ever surfaces as an
//! error to input handling.
use std::sync::Arc;

use completion::CompletionProvider;
use screenctx::ContextSource;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::Cmd;

/// Minimum length of a cleaned candidate worth rendering.
const MIN_CANDIDATE_CHARS: usize = 2;

/// Assemble the ordered prompt parts for the provider.
pub(crate) fn build_prompt(text: &str, window_title: &str, ocr_text: &str) -> Vec<String> {
    vec![
        "You are an intelligent inline completion tool. This is your context.".to_string(),
        format!("The user is in an application with the window title: '{window_title}'."),
        "Sometimes you provide huge completions, sometimes less. Behave appropriately.".to_string(),
        "Here is the text context from the screen (via OCR):".to_string(),
        "--- OCR CONTEXT ---".to_string(),
        ocr_text.to_string(),
        "--- END OCR CONTEXT ---".to_string(),
        "The user might be typing a new text altogether; be careful about that.".to_string(),
        "Continue the text the user is currently typing:".to_string(),
        text.to_string(),
    ]
}

/// Strip a case-insensitive repetition of `input` from the front of `raw`.
/// Providers often echo the prompt text before the continuation.
fn strip_echoed_input<'a>(raw: &'a str, input: &str) -> &'a str {
    let mut rest = raw.char_indices();
    for want in input.chars() {
        match rest.next() {
            Some((_, got)) if got.to_lowercase().eq(want.to_lowercase()) => {}
            _ => return raw,
        }
    }
    match rest.next() {
        Some((i, _)) => &raw[i..],
        None => "",
    }
}

/// Clean a raw provider response into a renderable candidate, or nothing.
pub(crate) fn clean_candidate(input: &str, raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let stripped = strip_echoed_input(trimmed, input.trim()).trim();
    let cleaned = stripped
        .trim_matches(['"', '\'', '*', '`'])
        .trim()
        .to_string();
    if cleaned.chars().count() < MIN_CANDIDATE_CHARS {
        return None;
    }
    Some(cleaned)
}

/// Run one completion request and report the outcome back to the engine as
/// [`Cmd::Completion`]. The generation lets the engine discard the result
/// if the user has typed in the meantime.
pub(crate) fn spawn_request(
    generation: u64,
    text: String,
    context: Arc<dyn ContextSource>,
    provider: Arc<dyn CompletionProvider>,
    tx: UnboundedSender<Cmd>,
) {
    tokio::spawn(async move {
        let ctx = context.get_context().await;
        debug!(
            generation,
            title = %ctx.window_title,
            ocr_chars = ctx.ocr_text.len(),
            "requesting_completion"
        );
        let parts = build_prompt(&text, &ctx.window_title, &ctx.ocr_text);
        let candidate = match provider.complete(&parts).await {
            Ok(raw) => {
                let cleaned = clean_candidate(&text, &raw);
                if cleaned.is_none() {
                    info!(generation, "completion_empty_or_too_short");
                }
                cleaned
            }
            Err(e) => {
                warn!(generation, error = %e, "completion_failed");
                None
            }
        };
        let _ = tx.send(Cmd::Completion {
            generation,
            candidate,
        });
    });
}
