use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;

use crate::domain::{BranchName, RepositoryName};
use crate::error::IngestError;

pub trait LakeFsClient: Send + Sync {
    /// Records a commit on the branch. Unconditional: LakeFS accepts the
    /// request even when the sync transferred nothing, producing an
    /// empty commit.
    fn commit(
        &self,
        repo: &RepositoryName,
        branch: &BranchName,
        message: &str,
    ) -> Result<(), IngestError>;
}

#[derive(Debug, Serialize)]
struct CommitBody<'a> {
    message: &'a str,
}

#[derive(Clone)]
pub struct LakeFsHttpClient {
    client: Client,
    host: String,
    username: String,
    password: String,
}

impl LakeFsHttpClient {
    pub fn new(host: &str, username: &str, password: &str) -> Result<Self, IngestError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("dug-ingest/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| IngestError::LakeFsHttp(err.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| IngestError::LakeFsHttp(err.to_string()))?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn commit_url(&self, repo: &RepositoryName, branch: &BranchName) -> String {
        format!(
            "{}/api/v1/repositories/{}/branches/{}/commits",
            self.host,
            repo.as_str(),
            branch.as_str()
        )
    }
}

impl LakeFsClient for LakeFsHttpClient {
    fn commit(
        &self,
        repo: &RepositoryName,
        branch: &BranchName,
        message: &str,
    ) -> Result<(), IngestError> {
        let url = self.commit_url(repo, branch);
        tracing::info!(%url, "recording LakeFS commit");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&CommitBody { message })
            .send()
            .map_err(|err| IngestError::LakeFsHttp(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "LakeFS commit failed".to_string());
            return Err(IngestError::LakeFsStatus { status, message });
        }
        Ok(())
    }
}
