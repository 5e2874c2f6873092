use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Name of an ingest source, e.g. `heal` or `bdc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceName(String);

impl SourceName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SourceName {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        let is_valid = !normalized.is_empty()
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        if !is_valid {
            return Err(IngestError::InvalidSourceName(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryName(String);

impl RepositoryName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RepositoryName {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        if normalized.is_empty() || normalized.contains(['/', ' ']) {
            return Err(IngestError::InvalidRepositoryName(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchName(String);

impl BranchName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BranchName {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        if normalized.is_empty()
            || normalized.contains(char::is_whitespace)
            || normalized.contains('/')
        {
            return Err(IngestError::InvalidBranchName(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// One local-to-remote mapping synced (and committed) per run.
///
/// `local` is a subdirectory of the source's staging directory; `remote`
/// is the prefix under the branch in the LakeFS repository. An empty
/// `remote` syncs into the branch root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathGroup {
    pub local: String,
    #[serde(default)]
    pub remote: String,
}

impl PathGroup {
    pub fn new(local: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            remote: remote.into(),
        }
    }

    /// `local` must stay inside the source's staging directory: relative,
    /// non-empty, no `.`/`..` components.
    pub fn validate(&self) -> Result<(), IngestError> {
        let is_valid = !self.local.is_empty()
            && !self.local.starts_with('/')
            && self
                .local
                .split('/')
                .all(|part| !part.is_empty() && part != "." && part != "..");
        if !is_valid {
            return Err(IngestError::InvalidLocalPath(self.local.clone()));
        }
        Ok(())
    }

    /// Renders the rclone destination for this group, e.g.
    /// `lakefs:heal-studies/main/data_dicts`.
    pub fn remote_spec(&self, remote_name: &str, repo: &RepositoryName, branch: &BranchName) -> String {
        let trimmed = self.remote.trim_matches('/');
        if trimmed.is_empty() {
            format!("{remote_name}:{repo}/{branch}")
        } else {
            format!("{remote_name}:{repo}/{branch}/{trimmed}")
        }
    }
}
