//! Lightweight fact extraction from free-text campaign requests.
//!
//! Ad-creation turns often carry structured facts inline ("a $5,000 budget
//! for my restaurant targeting families"). These are pulled into the turn
//! context's campaign data so downstream handlers see them without
//! re-parsing the message.

use serde_json::{Map, Value};

const BUSINESS_TYPES: &[&str] = &[
    "restaurant",
    "retail",
    "pharmacy",
    "automotive",
    "technology",
    "healthcare",
    "finance",
];

const TARGET_AUDIENCES: &[&str] =
    &["families", "students", "professionals", "seniors", "millennials", "gen z"];

/// Extracts budget, business type, and target audience from a campaign
/// request. Keys are camelCase to line up with the context's campaign data.
/// Absent facts are simply omitted.
pub fn extract_campaign_facts(text: &str) -> Map<String, Value> {
    let mut facts = Map::new();

    if let Some(budget) = first_numeric_figure(text) {
        if let Some(number) = serde_json::Number::from_f64(budget) {
            facts.insert("budget".to_string(), Value::Number(number));
        }
    }

    let lowered = text.to_lowercase();
    if let Some(kind) = BUSINESS_TYPES.iter().find(|kind| lowered.contains(*kind)) {
        facts.insert("businessType".to_string(), Value::String((*kind).to_string()));
    }
    if let Some(audience) = TARGET_AUDIENCES.iter().find(|audience| lowered.contains(*audience)) {
        facts.insert("targetAudience".to_string(), Value::String((*audience).to_string()));
    }

    facts
}

/// First dollar-or-plain figure in the text, commas allowed ("$5,000",
/// "1200.50").
fn first_numeric_figure(text: &str) -> Option<f64> {
    for raw in text.split_whitespace() {
        let token = raw.trim_start_matches('$').trim_end_matches(|ch: char| {
            !ch.is_ascii_digit()
        });
        if !token.chars().next().is_some_and(|ch| ch.is_ascii_digit()) {
            continue;
        }
        let cleaned: String =
            token.chars().filter(|ch| ch.is_ascii_digit() || *ch == '.').collect();
        if let Ok(value) = cleaned.parse::<f64>() {
            return Some(value);
        }
    }
    None
}
