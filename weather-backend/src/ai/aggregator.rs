//! Merges per-agent results into a single user-facing paragraph.
//!
//! Pure text logic: deduplication of near-identical snippets, degraded-agent
//! notes, a hard word cap, and a fixed trailing disclaimer. No I/O.

use crate::ai::types::{AgentInvocationResult, AgentStatus};
use std::collections::HashSet;

/// Fixed sentence appended to every aggregated result
pub const DISCLAIMER: &str = "Information is approximate—verify locally before planning.";

/// Hard cap on paragraph length, excluding the disclaimer
const MAX_WORDS: usize = 60;

/// Merge agent results into one polite paragraph.
///
/// Results are visited in slice order, which the orchestrator keeps in
/// declared agent order. Total over any input: always returns non-empty text
/// ending in the disclaimer.
pub fn aggregate(city: &str, results: &[(&'static str, AgentInvocationResult)]) -> String {
    let mut snippets: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut degraded: Vec<&str> = Vec::new();

    for (name, result) in results {
        let text = result.text.trim();
        if result.status == AgentStatus::Success && !text.is_empty() {
            if seen.insert(normalize_for_dedup(text)) {
                let mut snippet = text.to_string();
                if !snippet.ends_with(['.', '!', '?']) {
                    snippet.push('.');
                }
                snippets.push(snippet);
            }
        } else {
            degraded.push(name);
        }
    }

    let mut paragraph = if snippets.is_empty() {
        format!("We could not gather fresh insights for {}.", city)
    } else {
        snippets.join(" ")
    };

    if !degraded.is_empty() {
        let labels = degraded
            .iter()
            .map(|name| agent_label(name))
            .collect::<Vec<_>>()
            .join(", ");
        paragraph = format!(
            "{} {} encountered delays so treat this as partial guidance.",
            paragraph, labels
        );
    }

    if !city.is_empty() && !mentions_city(&paragraph, city) {
        paragraph = format!("In {}, {}", city, paragraph);
    }

    let words: Vec<&str> = paragraph.split_whitespace().collect();
    if words.len() > MAX_WORDS {
        paragraph = format!("{}…", words[..MAX_WORDS - 1].join(" "));
    }

    format!("{} {}", paragraph.trim(), DISCLAIMER)
        .trim()
        .to_string()
}

/// Case-insensitive substring check, shared with boundary validation so both
/// sides agree on what "mentions the city" means.
pub fn mentions_city(text: &str, city: &str) -> bool {
    text.to_lowercase().contains(&city.to_lowercase())
}

/// Lowercase and collapse whitespace so similar snippets deduplicate
fn normalize_for_dedup(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// "weather" -> "WeatherAgent"
fn agent_label(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("{}{}Agent", first.to_uppercase(), chars.as_str()),
        None => "Agent".to_string(),
    }
}
