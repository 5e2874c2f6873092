use std::fs;
use std::sync::{Arc, Mutex};

use camino::Utf8Path;

use dug_data_ingest::app::{App, RunOptions};
use dug_data_ingest::config::{FetchStep, LakeFsSettings, SourceSpec};
use dug_data_ingest::domain::{BranchName, PathGroup, RepositoryName};
use dug_data_ingest::error::IngestError;
use dug_data_ingest::fetch::{FetchOutput, Fetcher};
use dug_data_ingest::output::JsonOutput;
use dug_data_ingest::staging::Workspace;
use dug_data_ingest::sync::{SyncClient, SyncOutput};

type CallLog = Arc<Mutex<Vec<String>>>;

struct RecordingFetcher {
    log: CallLog,
    fail: bool,
}

impl Fetcher for RecordingFetcher {
    fn fetch(&self, step: &FetchStep, staging_dir: &Utf8Path) -> Result<FetchOutput, IngestError> {
        // The real fetch scripts find an empty staging directory; assert
        // the reset happened before us.
        let entries: Vec<_> = fs::read_dir(staging_dir.as_std_path())
            .unwrap()
            .collect();
        assert!(entries.is_empty(), "staging dir not empty at fetch time");

        self.log
            .lock()
            .unwrap()
            .push(format!("fetch {}", step.program));
        if self.fail {
            return Err(IngestError::Fetch("boom".to_string()));
        }
        Ok(FetchOutput {
            stdout: b"fetched 3 studies\n".to_vec(),
            stderr: Vec::new(),
        })
    }
}

struct RecordingSync {
    log: CallLog,
}

impl SyncClient for RecordingSync {
    fn sync(&self, local: &Utf8Path, remote_spec: &str) -> Result<SyncOutput, IngestError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("sync {local} -> {remote_spec}"));
        // Zero transfers; the commit must still happen.
        Ok(SyncOutput::default())
    }
}

struct RecordingLakeFs {
    log: CallLog,
}

impl dug_data_ingest::lakefs::LakeFsClient for RecordingLakeFs {
    fn commit(
        &self,
        repo: &RepositoryName,
        branch: &BranchName,
        message: &str,
    ) -> Result<(), IngestError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("commit {repo}/{branch}: {message}"));
        Ok(())
    }
}

fn settings() -> LakeFsSettings {
    LakeFsSettings::from_vars(|name| match name {
        "LAKEFS_HOST" => Some("https://lakefs.example.org".to_string()),
        "LAKEFS_USERNAME" => Some("ingest".to_string()),
        "LAKEFS_PASSWORD" => Some("secret".to_string()),
        "LAKEFS_REPOSITORY" => Some("heal-studies".to_string()),
        _ => None,
    })
    .unwrap()
}

fn heal_spec() -> SourceSpec {
    SourceSpec {
        name: "heal".parse().unwrap(),
        fetch: vec![FetchStep {
            program: "fetch-heal".to_string(),
            args: Vec::new(),
            pass_env: Vec::new(),
        }],
        groups: vec![
            PathGroup::new("studies", "studies"),
            PathGroup::new("dbGaPs", "dbGaPs"),
        ],
    }
}

fn harness(fail_fetch: bool) -> (tempfile::TempDir, CallLog, App<RecordingFetcher, RecordingSync, RecordingLakeFs>) {
    let temp = tempfile::tempdir().unwrap();
    let workspace = Workspace::new(Some(temp.path().to_str().unwrap()));
    let log: CallLog = Arc::default();
    let app = App::new(
        workspace,
        RecordingFetcher {
            log: log.clone(),
            fail: fail_fetch,
        },
        RecordingSync { log: log.clone() },
        RecordingLakeFs { log: log.clone() },
    );
    (temp, log, app)
}

#[test]
fn run_syncs_then_commits_each_group() {
    let (_temp, log, app) = harness(false);

    let result = app
        .run(&heal_spec(), &settings(), RunOptions::default(), &JsonOutput)
        .unwrap();

    let calls = log.lock().unwrap().clone();
    assert_eq!(calls.len(), 5);
    assert_eq!(calls[0], "fetch fetch-heal");
    assert!(calls[1].starts_with("sync ") && calls[1].contains("heal/studies"));
    assert!(calls[1].ends_with("lakefs:heal-studies/main/studies"));
    assert!(calls[2].starts_with("commit heal-studies/main"));
    assert!(calls[3].contains("heal/dbGaPs"));
    assert!(calls[4].starts_with("commit heal-studies/main"));

    assert_eq!(result.fetch_steps, 1);
    assert_eq!(result.groups.len(), 2);
    assert!(result.groups.iter().all(|group| group.committed));
}

#[test]
fn commit_message_carries_start_timestamp() {
    let (_temp, log, app) = harness(false);

    let result = app
        .run(&heal_spec(), &settings(), RunOptions::default(), &JsonOutput)
        .unwrap();

    let calls = log.lock().unwrap().clone();
    let commit = calls
        .iter()
        .find(|call| call.starts_with("commit"))
        .unwrap();
    assert!(commit.contains(&result.started_at));
}

#[test]
fn empty_sync_still_commits_once_per_group() {
    let (_temp, log, app) = harness(false);

    app.run(&heal_spec(), &settings(), RunOptions::default(), &JsonOutput)
        .unwrap();

    let calls = log.lock().unwrap().clone();
    let commits = calls.iter().filter(|call| call.starts_with("commit")).count();
    assert_eq!(commits, heal_spec().groups.len());
}

#[test]
fn fetch_failure_stops_the_run() {
    let (_temp, log, app) = harness(true);

    let err = app
        .run(&heal_spec(), &settings(), RunOptions::default(), &JsonOutput)
        .unwrap_err();
    assert!(matches!(err, IngestError::Fetch(_)));

    let calls = log.lock().unwrap().clone();
    assert_eq!(calls, vec!["fetch fetch-heal".to_string()]);
}

#[test]
fn skip_fetch_reuses_staged_content() {
    let (temp, log, app) = harness(false);

    // Simulate a previous run's output.
    let staged = temp.path().join("heal/studies");
    fs::create_dir_all(&staged).unwrap();
    fs::write(staged.join("study1.csv"), b"id,name\n").unwrap();

    app.run(
        &heal_spec(),
        &settings(),
        RunOptions {
            skip_fetch: true,
            dry_run: false,
        },
        &JsonOutput,
    )
    .unwrap();

    let calls = log.lock().unwrap().clone();
    assert!(calls.iter().all(|call| !call.starts_with("fetch")));
    assert!(staged.join("study1.csv").exists(), "staged content was reset");
}

#[test]
fn fetch_output_lands_in_run_log() {
    let (temp, _log, app) = harness(false);

    app.run(&heal_spec(), &settings(), RunOptions::default(), &JsonOutput)
        .unwrap();

    let log_content = fs::read_to_string(temp.path().join("heal.log")).unwrap();
    assert!(log_content.contains("fetched 3 studies"));
}
