use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const MULTILINE_DELIMITER: &str = "SLASH_DISPATCH_EOF";

/// Name of the output carrying an informational dispatch rejection.
pub const ERROR_MESSAGE_OUTPUT: &str = "error-message";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Appends workflow step outputs to the runner's output file.
pub struct StepOutputWriter {
    path: Option<PathBuf>,
}

impl StepOutputWriter {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path: path.filter(|path| !path.as_os_str().is_empty()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Writes `name=value`, or the delimited form when `value` spans lines.
    /// Without an output file the value is only logged.
    pub fn set_output(&self, name: &str, value: &str) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            tracing::debug!(name, value, "no step output file configured");
            return Ok(());
        };
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open step output file {}", path.display()))?;
        file.write_all(render_output(name, value).as_bytes())
            .with_context(|| format!("failed to write step output file {}", path.display()))?;
        Ok(())
    }
}

fn render_output(name: &str, value: &str) -> String {
    if value.contains('\n') || value.contains('\r') {
        format!("{name}<<{MULTILINE_DELIMITER}\n{value}\n{MULTILINE_DELIMITER}\n")
    } else {
        format!("{name}={value}\n")
    }
}
