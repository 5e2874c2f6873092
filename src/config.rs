use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::{BranchName, PathGroup, RepositoryName, SourceName};
use crate::error::IngestError;

/// LakeFS connection settings, taken from the environment the way the
/// scheduled jobs provide them.
#[derive(Debug, Clone)]
pub struct LakeFsSettings {
    pub host: String,
    pub username: String,
    pub password: String,
    pub repository: RepositoryName,
    pub branch: BranchName,
    pub remote_name: String,
}

impl LakeFsSettings {
    pub fn from_env() -> Result<Self, IngestError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self, IngestError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| IngestError::MissingEnv(name.to_string()))
        };

        let host = require("LAKEFS_HOST")?;
        let username = require("LAKEFS_USERNAME")?;
        let password = require("LAKEFS_PASSWORD")?;
        let repository = require("LAKEFS_REPOSITORY")?.parse::<RepositoryName>()?;
        let branch = lookup("LAKEFS_BRANCH")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "main".to_string())
            .parse::<BranchName>()?;

        Ok(Self {
            host,
            username,
            password,
            repository,
            branch,
            remote_name: lookup("RCLONE_REMOTE")
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| "lakefs".to_string()),
        })
    }
}

/// One external fetch command. The source's staging directory is passed
/// as the final argument after `args`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchStep {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment variables forwarded from the job environment to the
    /// fetch subprocess, e.g. a PicSure access token.
    #[serde(default)]
    pub pass_env: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceEntry {
    pub name: String,
    pub fetch: Vec<FetchStep>,
    pub groups: Vec<PathGroup>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub name: SourceName,
    pub fetch: Vec<FetchStep>,
    pub groups: Vec<PathGroup>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub sources: Vec<SourceSpec>,
}

impl ResolvedConfig {
    pub fn source(&self, name: &SourceName) -> Result<&SourceSpec, IngestError> {
        self.sources
            .iter()
            .find(|source| source.name == *name)
            .ok_or_else(|| IngestError::UnknownSource(name.to_string()))
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `dug-ingest.json` when present and merges it over the
    /// built-in sources. An explicit `path` must exist; the default path
    /// is optional.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, IngestError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from("dug-ingest.json"),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config {
                schema_version: None,
                sources: Vec::new(),
            });
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| IngestError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| IngestError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    /// Built-in sources first; a config entry with the same name replaces
    /// the built-in definition.
    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, IngestError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let mut sources = default_sources()?;
        for entry in config.sources {
            for group in &entry.groups {
                group.validate()?;
            }
            let spec = SourceSpec {
                name: entry.name.parse()?,
                fetch: entry.fetch,
                groups: entry.groups,
            };
            if let Some(existing) = sources.iter_mut().find(|source| source.name == spec.name) {
                *existing = spec;
            } else {
                sources.push(spec);
            }
        }

        Ok(ResolvedConfig {
            schema_version,
            sources,
        })
    }
}

/// The two sources that ship with the tool. Directory layouts follow
/// what the fetch scripts write.
pub fn default_sources() -> Result<Vec<SourceSpec>, IngestError> {
    Ok(vec![
        SourceSpec {
            name: "heal".parse()?,
            fetch: vec![FetchStep {
                program: "get_heal_platform_mds_data_dicts".to_string(),
                args: Vec::new(),
                pass_env: Vec::new(),
            }],
            groups: vec![
                PathGroup::new("studies", "studies"),
                PathGroup::new("data_dicts", "data_dicts"),
                PathGroup::new("studies_with_data_dicts", "studies_with_data_dicts"),
            ],
        },
        SourceSpec {
            name: "bdc".parse()?,
            fetch: vec![
                FetchStep {
                    program: "get_bdc_studies_from_gen3".to_string(),
                    args: Vec::new(),
                    pass_env: Vec::new(),
                },
                FetchStep {
                    program: "get_dbgap_data_dicts".to_string(),
                    args: Vec::new(),
                    pass_env: vec!["PICSURE_TOKEN".to_string()],
                },
            ],
            groups: vec![
                PathGroup::new("studies", "studies"),
                PathGroup::new("dbGaPs", "dbGaPs"),
            ],
        },
    ])
}
