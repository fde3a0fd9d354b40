//! Trend extraction from chat answer text
//!
//! Turns free text into an ordered list of `{priority, name}` records.
//! Lines that do not carry a leading integer marker are expected (prose),
//! so they are dropped silently and only counted.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

// Matches "1. Edge AI", "2) Quantum", "3 Sustainability"
static LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)[.)\s]+(.+)$").unwrap());

/// A trend extracted from answer text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    /// Priority marker as written in the text; not necessarily unique
    /// or contiguous
    pub priority: u32,
    /// Trimmed text following the marker
    pub name: String,
}

/// Parser output: matched trends in order of appearance, plus the number
/// of non-blank lines that carried no marker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTrends {
    /// Trends in source-text order (never sorted by priority)
    pub trends: Vec<Trend>,
    /// Non-blank lines dropped for lacking a leading integer marker
    pub skipped: usize,
}

impl ParsedTrends {
    /// Keep only the first `max` trends in output order
    pub fn truncate(&mut self, max: usize) {
        self.trends.truncate(max);
    }

    /// Whether no trends were extracted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trends.is_empty()
    }
}

/// Parse trends out of free text. Pure and idempotent; recomputed per call.
#[must_use]
pub fn parse(text: &str) -> ParsedTrends {
    let mut parsed = ParsedTrends::default();

    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let matched = LINE.captures(line).and_then(|caps| {
            let priority = caps[1].parse::<u32>().ok()?;
            Some(Trend {
                priority,
                name: caps[2].trim().to_string(),
            })
        });
        match matched {
            Some(trend) => parsed.trends.push(trend),
            None => parsed.skipped += 1,
        }
    }

    parsed
}
