//! Build metadata reader.
//!
//! The installed package ships `<install_root>/dist/build-info.json`, written
//! at build time. Reading is tolerant: a missing file, unreadable file,
//! malformed JSON, or a non-object document all yield an empty record.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::RepoId;

/// Path of the metadata file relative to the install root.
pub const BUILD_INFO_RELATIVE_PATH: &str = "dist/build-info.json";

/// Persisted build metadata. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub built_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_repo: Option<String>,
}

impl BuildInfo {
    /// Decode a JSON document, keeping only string-valued known fields.
    pub fn from_json(contents: &str) -> Self {
        let value = match serde_json::from_str::<Value>(contents) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(error = %err, "build info is not valid JSON");
                return Self::default();
            }
        };
        let Some(object) = value.as_object() else {
            tracing::debug!("build info is not a JSON object");
            return Self::default();
        };
        let field = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        Self {
            version: field("version"),
            commit: field("commit"),
            built_at: field("builtAt"),
            source_repo: field("sourceRepo"),
        }
    }

    /// `sourceRepo` as a repository identifier, when present and well formed.
    pub fn source_repo_id(&self) -> Option<RepoId> {
        let raw = self.source_repo.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        RepoId::parse(raw).ok()
    }

    /// `builtAt` parsed as an RFC 3339 timestamp.
    pub fn built_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.built_at.as_deref()?;
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Location of the metadata file for `install_root`.
pub fn build_info_path(install_root: &Path) -> PathBuf {
    install_root.join(BUILD_INFO_RELATIVE_PATH)
}

/// Load build metadata for `install_root`, never failing.
pub fn load_at(install_root: &Path) -> BuildInfo {
    let path = build_info_path(install_root);
    match std::fs::read_to_string(&path) {
        Ok(contents) => BuildInfo::from_json(&contents),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "build info unavailable");
            BuildInfo::default()
        }
    }
}
