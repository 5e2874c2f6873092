use std::path::{Path, PathBuf};
use std::process::Command;

use camino::Utf8Path;

use crate::config::FetchStep;
use crate::error::IngestError;

/// Combined output of one fetch command, kept for the run log.
#[derive(Debug, Clone, Default)]
pub struct FetchOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

pub trait Fetcher: Send + Sync {
    fn fetch(&self, step: &FetchStep, staging_dir: &Utf8Path) -> Result<FetchOutput, IngestError>;
}

/// Runs fetch commands as external subprocesses. The staging directory
/// is appended as the command's final argument.
#[derive(Debug, Clone, Default)]
pub struct SubprocessFetcher;

impl SubprocessFetcher {
    pub fn new() -> Self {
        Self
    }

    fn resolve_program(&self, program: &str) -> Result<PathBuf, IngestError> {
        let direct = Path::new(program);
        if direct.is_absolute() {
            if direct.exists() {
                return Ok(direct.to_path_buf());
            }
            return Err(IngestError::MissingTool(program.to_string()));
        }
        find_in_path(program).ok_or_else(|| IngestError::MissingTool(program.to_string()))
    }
}

impl Fetcher for SubprocessFetcher {
    fn fetch(&self, step: &FetchStep, staging_dir: &Utf8Path) -> Result<FetchOutput, IngestError> {
        for name in &step.pass_env {
            let present = std::env::var(name)
                .map(|value| !value.trim().is_empty())
                .unwrap_or(false);
            if !present {
                return Err(IngestError::MissingEnv(name.clone()));
            }
        }

        let program = self.resolve_program(&step.program)?;
        tracing::info!(program = %program.display(), dir = %staging_dir, "running fetch step");

        let output = Command::new(&program)
            .args(&step.args)
            .arg(staging_dir.as_str())
            .output()
            .map_err(|err| IngestError::Fetch(format!("{}: {err}", step.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("command failed: {}", program.display())
            } else {
                stderr
            };
            return Err(IngestError::Fetch(message));
        }

        Ok(FetchOutput {
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}
