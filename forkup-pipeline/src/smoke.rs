//! Smoke check commands and result parsing.

use forkup_core::SmokeCheck;
use serde::Serialize;
use serde_json::Value;

use crate::runner::CommandSpec;

/// Outcome of one smoke check that exited zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmokeReport {
    pub agent: String,
    /// Records returned, when the output was recognisable JSON.
    pub matches: Option<usize>,
}

/// `<cli> memory search <query> --agent <agent> --max-results 1 --min-score 0.1 --json`
pub fn smoke_command(cli_bin: &str, check: &SmokeCheck) -> CommandSpec {
    CommandSpec::new(
        cli_bin,
        [
            "memory",
            "search",
            check.query.as_str(),
            "--agent",
            check.agent.as_str(),
            "--max-results",
            "1",
            "--min-score",
            "0.1",
            "--json",
        ],
    )
}

/// Count records in search output: a JSON array, or an object with a
/// `results` array.
pub fn count_matches(stdout: &str) -> Option<usize> {
    match serde_json::from_str::<Value>(stdout.trim()).ok()? {
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => map.get("results").and_then(Value::as_array).map(Vec::len),
        _ => None,
    }
}
