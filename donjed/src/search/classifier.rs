//! Go/no-go decision for knowledge-base retrieval.
//!
//! Small talk is answered from the persona alone; anything mentioning the
//! products, pricing or solar conditions is grounded in the documentation.

/// Messages that are only a greeting, or start with one followed by a space.
pub const GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
    "how are you",
];

/// Substrings that mark a query as answerable from the documentation.
pub const DOMAIN_KEYWORDS: &[&str] = &[
    "price",
    "cost",
    "system",
    "solar",
    "panel",
    "battery",
    "inverter",
    "installation",
    "warranty",
    "maintenance",
    "product",
    "service",
    "kw",
    "kwh",
    "watt",
    "power",
    "energy",
    "donjed",
    "appliance",
    "ac",
    "air conditioner",
    "refrigerator",
    "rain",
    "weather",
    "cloudy",
];

/// Whether `query` warrants a knowledge-base lookup.
///
/// The greeting rule is an exact match on the trimmed query or a
/// starts-with on `"{greeting} "`, never a substring test, so a greeting
/// glued to punctuation ("hi, what's the price") falls through to the
/// keyword check.
pub fn is_document_query(query: &str) -> bool {
    let lower = query.to_lowercase();
    let trimmed = lower.trim();

    let is_greeting = GREETINGS.iter().any(|greeting| {
        trimmed == *greeting
            || lower
                .strip_prefix(greeting)
                .is_some_and(|rest| rest.starts_with(' '))
    });
    if is_greeting {
        return false;
    }

    DOMAIN_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}
