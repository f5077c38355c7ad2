use std::{
    env, fs,
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{Context, Result};
use tempfile::TempDir;

mod ci;
mod init;
mod status;
mod translate;
mod update;

const BIN_NAME: &str = "algebras";

/// Locate the freshly built `algebras` binary the way `cargo test`
/// exposes it: alongside the test binary itself.
fn cargo_bin() -> PathBuf {
    let mut path = env::current_exe().expect("failed to resolve test binary path");
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push(BIN_NAME);
    path
}

pub struct CliTest {
    _temp_dir: TempDir,
    project_dir: PathBuf,
}

impl CliTest {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let project_dir = temp_dir.path().canonicalize()?;
        Ok(Self {
            _temp_dir: temp_dir,
            project_dir,
        })
    }

    pub fn with_file(path: &str, content: &str) -> Result<Self> {
        let test = Self::new()?;
        test.write_file(path, content)?;
        Ok(test)
    }

    pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let file_path = self.project_dir.join(path);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        fs::write(&file_path, content)
            .with_context(|| format!("Failed to write file: {}", file_path.display()))?;

        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.project_dir
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(cargo_bin());
        cmd.current_dir(&self.project_dir);
        cmd.env_clear();
        cmd.env("NO_COLOR", "1"); // disable colors for consistent assertions
        cmd
    }

    pub fn init_command(&self) -> Command {
        let mut cmd = self.command();
        cmd.arg("init");
        cmd
    }

    pub fn translate_command(&self) -> Command {
        let mut cmd = self.command();
        cmd.arg("translate");
        cmd
    }

    pub fn update_command(&self) -> Command {
        let mut cmd = self.command();
        cmd.arg("update");
        cmd
    }

    pub fn ci_command(&self) -> Command {
        let mut cmd = self.command();
        cmd.arg("ci");
        cmd
    }

    pub fn status_command(&self) -> Command {
        let mut cmd = self.command();
        cmd.arg("status");
        cmd
    }

    pub fn read_file(&self, path: &str) -> Result<String> {
        let file_path = self.project_dir.join(path);
        fs::read_to_string(&file_path)
            .with_context(|| format!("Failed to read file: {}", file_path.display()))
    }
}
