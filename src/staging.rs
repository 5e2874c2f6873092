use std::fs;
use std::fs::OpenOptions;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::{PathGroup, SourceName};
use crate::error::IngestError;

pub const DEFAULT_ROOT: &str = "/data";

/// The staging directory tree. Ephemeral, owned by the active run and
/// recreated at the start of the next one.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: Utf8PathBuf,
}

impl Workspace {
    pub fn new(root_override: Option<&str>) -> Self {
        let root = Utf8PathBuf::from(root_override.unwrap_or(DEFAULT_ROOT));
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn source_dir(&self, source: &SourceName) -> Utf8PathBuf {
        self.root.join(source.as_str())
    }

    pub fn group_dir(&self, source: &SourceName, group: &PathGroup) -> Utf8PathBuf {
        self.source_dir(source).join(&group.local)
    }

    pub fn log_path(&self, source: &SourceName) -> Utf8PathBuf {
        self.root.join(format!("{source}.log"))
    }

    /// Removes the source's staging directory if present and recreates it
    /// empty, so leftovers from a previous run never survive into the
    /// fetch step. The previous run's log file is truncated too.
    pub fn reset(&self, source: &SourceName) -> Result<(), IngestError> {
        let dir = self.source_dir(source);
        if dir.as_std_path().exists() {
            fs::remove_dir_all(dir.as_std_path())
                .map_err(|err| IngestError::Filesystem(format!("clear {dir}: {err}")))?;
        }
        fs::create_dir_all(dir.as_std_path())
            .map_err(|err| IngestError::Filesystem(format!("create {dir}: {err}")))?;

        let log = self.log_path(source);
        fs::write(log.as_std_path(), b"")
            .map_err(|err| IngestError::Filesystem(format!("truncate {log}: {err}")))?;
        Ok(())
    }

    /// Appends captured subprocess output to the per-run log file.
    pub fn append_log(&self, source: &SourceName, content: &[u8]) -> Result<(), IngestError> {
        let log = self.log_path(source);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log.as_std_path())
            .map_err(|err| IngestError::Filesystem(format!("open {log}: {err}")))?;
        file.write_all(content)
            .map_err(|err| IngestError::Filesystem(format!("write {log}: {err}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_workspace() -> (tempfile::TempDir, Workspace) {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().to_str().unwrap().to_string();
        let workspace = Workspace::new(Some(&root));
        (temp, workspace)
    }

    #[test]
    fn default_root() {
        let workspace = Workspace::new(None);
        assert_eq!(workspace.root().as_str(), DEFAULT_ROOT);
    }

    #[test]
    fn layout_paths() {
        let workspace = Workspace::new(Some("/tmp/staging"));
        let source: SourceName = "heal".parse().unwrap();
        let group = PathGroup::new("data_dicts", "data_dicts");

        assert_eq!(
            workspace.source_dir(&source).as_str(),
            "/tmp/staging/heal"
        );
        assert_eq!(
            workspace.group_dir(&source, &group).as_str(),
            "/tmp/staging/heal/data_dicts"
        );
        assert_eq!(workspace.log_path(&source).as_str(), "/tmp/staging/heal.log");
    }

    #[test]
    fn reset_clears_leftovers() {
        let (_temp, workspace) = temp_workspace();
        let source: SourceName = "heal".parse().unwrap();

        let dir = workspace.source_dir(&source);
        fs::create_dir_all(dir.join("dbGaPs").as_std_path()).unwrap();
        fs::write(dir.join("dbGaPs/leftover.xml").as_std_path(), b"stale").unwrap();

        workspace.reset(&source).unwrap();

        assert!(dir.as_std_path().exists());
        let entries: Vec<_> = fs::read_dir(dir.as_std_path()).unwrap().collect();
        assert!(entries.is_empty());
    }

    #[test]
    fn log_appends() {
        let (_temp, workspace) = temp_workspace();
        let source: SourceName = "bdc".parse().unwrap();
        workspace.reset(&source).unwrap();

        workspace.append_log(&source, b"first\n").unwrap();
        workspace.append_log(&source, b"second\n").unwrap();

        let content = fs::read_to_string(workspace.log_path(&source).as_std_path()).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }
}
