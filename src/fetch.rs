//! Batch trends fetch
//!
//! One-shot binding that asks the configured trends question, extracts the
//! structured trend list, and writes a JSON snapshot for front-ends that
//! have no live proxy.

use std::fs;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Result;
use crate::forwarder::{ChatForwarder, Source};
use crate::trends::{self, Trend};

/// Snapshot written for static consumption
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendsSnapshot {
    /// When the snapshot was produced (ISO-8601)
    pub last_update: String,
    /// Question that produced it
    pub query: String,
    /// Extracted trends, in answer order
    pub trends: Vec<Trend>,
    /// Full answer text the trends were extracted from
    pub raw_response: String,
    /// Citations attached to the answer
    pub sources: Vec<Source>,
}

/// Ask the trends question and build a snapshot.
///
/// # Errors
///
/// Propagates forwarder failures; parsing itself never fails, lines
/// without a marker are simply dropped.
pub async fn fetch_trends(
    forwarder: &ChatForwarder,
    query: &str,
    max_trends: Option<usize>,
) -> Result<TrendsSnapshot> {
    let answer = forwarder.forward(query).await?;

    let mut parsed = trends::parse(&answer.message);
    if parsed.skipped > 0 {
        debug!(skipped = parsed.skipped, "dropped unstructured lines");
    }
    if let Some(max) = max_trends {
        parsed.truncate(max);
    }
    info!(count = parsed.trends.len(), "parsed trends");

    Ok(TrendsSnapshot {
        last_update: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        query: query.to_string(),
        trends: parsed.trends,
        raw_response: answer.message,
        sources: answer.sources,
    })
}

/// Write a snapshot pretty-printed, creating parent directories.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file
/// cannot be written.
pub fn write_snapshot(snapshot: &TrendsSnapshot, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(snapshot)?)?;
    info!(path = %path.display(), "snapshot written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn snapshot() -> TrendsSnapshot {
        TrendsSnapshot {
            last_update: "2026-08-07T00:00:00.000Z".to_string(),
            query: "top trends".to_string(),
            trends: vec![Trend {
                priority: 1,
                name: "Edge AI".to_string(),
            }],
            raw_response: "1. Edge AI".to_string(),
            sources: vec![],
        }
    }

    #[test]
    fn snapshot_serializes_with_camel_case_keys() {
        let value = serde_json::to_value(snapshot()).unwrap();
        assert!(value.get("lastUpdate").is_some());
        assert!(value.get("rawResponse").is_some());
        assert!(value.get("trends").is_some());
        assert!(value.get("last_update").is_none());
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("public").join("data").join("cbi-trends.json");

        write_snapshot(&snapshot(), &path).unwrap();

        let written: TrendsSnapshot =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.trends.len(), 1);
        assert_eq!(written.query, "top trends");
    }

    #[test]
    fn snapshot_round_trips() {
        let json = serde_json::to_string(&snapshot()).unwrap();
        let back: TrendsSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.raw_response, "1. Edge AI");
    }
}
