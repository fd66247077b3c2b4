//! External archive tool integration
//!
//! PCK members are extracted and re-inserted by shelling out to
//! `godotpcktool`, which is treated as an opaque subprocess with a fixed
//! argument contract: archive path, `--action {extract|add}`, an
//! optional `--include-regex-filter`, an optional `--output` directory,
//! and trailing file paths for `add`.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};

const TOOL_NAME: &str = if cfg!(windows) {
    "godotpcktool.exe"
} else {
    "godotpcktool"
};

/// Handle on the external `godotpcktool` executable.
pub struct PckTool {
    executable: PathBuf,
}

impl PckTool {
    /// Prefer a tool sitting next to the current executable, otherwise
    /// let the OS resolve the bare name through `PATH`.
    pub fn locate() -> Self {
        let sibling = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(TOOL_NAME)))
            .filter(|candidate| candidate.exists());
        Self {
            executable: sibling.unwrap_or_else(|| PathBuf::from(TOOL_NAME)),
        }
    }

    /// Use a specific executable instead of searching for one.
    pub fn with_executable(path: impl Into<PathBuf>) -> Self {
        Self {
            executable: path.into(),
        }
    }

    /// Extract the members matching `member` into `output`.
    pub fn extract(&self, pck: &Path, member: &str, output: &Path) -> Result<()> {
        self.run(pck, "extract", Some(member), Some(output), &[])
    }

    /// Add files into the archive.
    pub fn add(&self, pck: &Path, files: &[PathBuf]) -> Result<()> {
        self.run(pck, "add", None, None, files)
    }

    fn run(
        &self,
        pck: &Path,
        action: &str,
        filter: Option<&str>,
        output: Option<&Path>,
        files: &[PathBuf],
    ) -> Result<()> {
        let mut command = Command::new(&self.executable);
        command.arg(pck).arg("--action").arg(action);
        if let Some(filter) = filter {
            command.arg("--include-regex-filter").arg(filter);
        }
        if let Some(output) = output {
            command.arg("--output").arg(output);
        }
        for file in files {
            command.arg(file);
        }

        tracing::info!(?command, "running archive tool");
        let status = command.status().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ArchiveToolFailure {
                    message: format!(
                        "{TOOL_NAME} not found; place it next to the gdtrans executable or on PATH"
                    ),
                }
            } else {
                Error::Io(e)
            }
        })?;

        if !status.success() {
            return Err(Error::ArchiveToolFailure {
                message: format!("{} exited with {status}", self.executable.display()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_executable_is_archive_tool_failure() {
        let tool = PckTool::with_executable("/nonexistent/godotpcktool-test");
        let result = tool.extract(
            Path::new("game.pck"),
            "text.en.translation",
            Path::new("."),
        );
        assert!(matches!(result, Err(Error::ArchiveToolFailure { .. })));
    }
}
