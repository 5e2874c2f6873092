use std::time::Duration;

use serde::Serialize;

use crate::config::{LakeFsSettings, SourceSpec};
use crate::error::IngestError;
use crate::fetch::Fetcher;
use crate::lakefs::LakeFsClient;
use crate::staging::Workspace;
use crate::sync::SyncClient;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Reuse whatever the staging directory already holds instead of
    /// resetting it and invoking the fetch commands, so a prior run's
    /// output can be re-synced.
    pub skip_fetch: bool,
    /// Plan the run without touching the filesystem, the fetch source,
    /// the object store, or the commit endpoint.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub source: String,
    pub started_at: String,
    pub finished_at: String,
    pub fetch_steps: usize,
    pub groups: Vec<GroupResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupResult {
    pub local: String,
    pub remote: String,
    pub action: String,
    pub committed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourcesResult {
    pub sources: Vec<SourceListing>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceListing {
    pub name: String,
    pub fetch_steps: usize,
    pub groups: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Clone)]
pub struct App<F: Fetcher, S: SyncClient, L: LakeFsClient> {
    workspace: Workspace,
    fetcher: F,
    sync: S,
    lakefs: L,
}

impl<F: Fetcher, S: SyncClient, L: LakeFsClient> App<F, S, L> {
    pub fn new(workspace: Workspace, fetcher: F, sync: S, lakefs: L) -> Self {
        Self {
            workspace,
            fetcher,
            sync,
            lakefs,
        }
    }

    /// Runs the ingest pipeline for one source: reset, fetch, then sync
    /// and commit each path group in order. Any step failure aborts the
    /// run; content already synced stays in the object store.
    pub fn run(
        &self,
        spec: &SourceSpec,
        settings: &LakeFsSettings,
        options: RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunResult, IngestError> {
        let started_at = iso_timestamp();
        let commit_message = format!(
            "dug-ingest {} run started at {started_at}",
            spec.name.as_str()
        );

        if options.dry_run {
            let groups = spec
                .groups
                .iter()
                .map(|group| GroupResult {
                    local: self.workspace.group_dir(&spec.name, group).to_string(),
                    remote: group.remote_spec(
                        &settings.remote_name,
                        &settings.repository,
                        &settings.branch,
                    ),
                    action: "planned".to_string(),
                    committed: false,
                })
                .collect();
            return Ok(RunResult {
                source: spec.name.to_string(),
                started_at,
                finished_at: iso_timestamp(),
                fetch_steps: if options.skip_fetch { 0 } else { spec.fetch.len() },
                groups,
            });
        }

        let mut fetch_steps = 0;
        if options.skip_fetch {
            sink.event(ProgressEvent {
                message: "phase=Fetch; skipped, reusing staged content".to_string(),
                elapsed: None,
            });
        } else {
            sink.event(ProgressEvent {
                message: format!("phase=Reset; clearing staging for {}", spec.name),
                elapsed: None,
            });
            self.workspace.reset(&spec.name)?;

            let staging_dir = self.workspace.source_dir(&spec.name);
            for step in &spec.fetch {
                sink.event(ProgressEvent {
                    message: format!("phase=Fetch; running {}", step.program),
                    elapsed: None,
                });
                let start = std::time::Instant::now();
                let output = self.fetcher.fetch(step, &staging_dir)?;
                self.workspace.append_log(&spec.name, &output.stdout)?;
                self.workspace.append_log(&spec.name, &output.stderr)?;
                sink.event(ProgressEvent {
                    message: format!("phase=Fetch; {} finished", step.program),
                    elapsed: Some(start.elapsed()),
                });
                fetch_steps += 1;
            }
        }

        let mut groups = Vec::new();
        for group in &spec.groups {
            let local = self.workspace.group_dir(&spec.name, group);
            let remote = group.remote_spec(
                &settings.remote_name,
                &settings.repository,
                &settings.branch,
            );

            sink.event(ProgressEvent {
                message: format!("phase=Sync; {local} -> {remote}"),
                elapsed: None,
            });
            let output = self.sync.sync(&local, &remote)?;
            self.workspace.append_log(&spec.name, &output.stdout)?;
            self.workspace.append_log(&spec.name, &output.stderr)?;

            sink.event(ProgressEvent {
                message: format!("phase=Commit; {}/{}", settings.repository, settings.branch),
                elapsed: None,
            });
            self.lakefs
                .commit(&settings.repository, &settings.branch, &commit_message)?;

            groups.push(GroupResult {
                local: local.to_string(),
                remote,
                action: "synced".to_string(),
                committed: true,
            });
        }

        let finished_at = iso_timestamp();
        sink.event(ProgressEvent {
            message: format!("phase=Done; finished at {finished_at}"),
            elapsed: None,
        });

        Ok(RunResult {
            source: spec.name.to_string(),
            started_at,
            finished_at,
            fetch_steps,
            groups,
        })
    }

    pub fn sources(&self, config: &crate::config::ResolvedConfig) -> SourcesResult {
        SourcesResult {
            sources: config
                .sources
                .iter()
                .map(|source| SourceListing {
                    name: source.name.to_string(),
                    fetch_steps: source.fetch.len(),
                    groups: source.groups.iter().map(|g| g.local.clone()).collect(),
                })
                .collect(),
        }
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
