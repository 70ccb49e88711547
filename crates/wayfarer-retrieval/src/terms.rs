//! Lexical tag extraction driving graph lookups.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

const DEFAULT_LOCATIONS: &[&str] = &[
    "hanoi",
    "ha long",
    "halong",
    "hue",
    "hoi an",
    "da nang",
    "nha trang",
    "saigon",
    "ho chi minh",
    "mekong",
    "sapa",
    "ninh binh",
    "phu quoc",
    "northern",
    "central",
    "southern",
    "da lat",
];

const DEFAULT_INTENTS: &[&str] = &[
    "romantic",
    "adventure",
    "budget",
    "luxury",
    "family",
    "solo",
    "couple",
    "beach",
    "mountain",
    "culture",
    "food",
    "historical",
    "itinerary",
    "tour",
    "relax",
    "explore",
    "hiking",
    "cruise",
    "island",
    "city",
    "countryside",
];

const DEFAULT_FALLBACK: &[&str] = &["vietnam", "travel"];

static DAY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*day").expect("day-count regex is valid"));

/// Matches a query against a fixed vocabulary of place names and travel intents.
///
/// Vocabulary terms are matched as lower-case substrings; trip lengths written as
/// `<n> day` contribute `<n>`. A query that matches nothing yields the fallback set,
/// so the graph predicate is never empty.
#[derive(Debug, Clone)]
pub struct TermExtractor {
    locations: Vec<String>,
    intents: Vec<String>,
    fallback: Vec<String>,
}

impl Default for TermExtractor {
    fn default() -> Self {
        Self {
            locations: to_owned_terms(DEFAULT_LOCATIONS),
            intents: to_owned_terms(DEFAULT_INTENTS),
            fallback: to_owned_terms(DEFAULT_FALLBACK),
        }
    }
}

impl TermExtractor {
    /// Extend the default vocabulary. Blank entries are ignored.
    #[must_use]
    pub fn with_extra_terms(mut self, locations: &[String], intents: &[String]) -> Self {
        extend_terms(&mut self.locations, locations);
        extend_terms(&mut self.intents, intents);
        self
    }

    #[must_use]
    pub fn extract(&self, query: &str) -> BTreeSet<String> {
        let query = query.to_lowercase();

        let mut terms: BTreeSet<String> = self
            .intents
            .iter()
            .chain(&self.locations)
            .filter(|term| query.contains(term.as_str()))
            .cloned()
            .collect();

        terms.extend(
            DAY_PATTERN
                .captures_iter(&query)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().to_owned()),
        );

        if terms.is_empty() {
            return self.fallback.iter().cloned().collect();
        }
        terms
    }
}

fn to_owned_terms(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|t| (*t).to_owned()).collect()
}

fn extend_terms(target: &mut Vec<String>, extra: &[String]) {
    for term in extra {
        let term = term.trim().to_lowercase();
        if !term.is_empty() && !target.contains(&term) {
            target.push(term);
        }
    }
}
