use std::process::{Command, Stdio};

use crate::foundation::error::{PackError, PackResult};

/// Run an external tool to completion.
///
/// stdout is discarded and stderr captured; a non-zero exit (or failure to spawn) becomes
/// [`PackError::Process`] carrying the trimmed stderr.
pub fn run_tool(cmd: &mut Command) -> PackResult<()> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    tracing::debug!(
        args = ?cmd.get_args().collect::<Vec<_>>(),
        "running {program}"
    );

    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| PackError::Process {
            program: program.clone(),
            status: "not started".to_string(),
            stderr: format!("failed to spawn (is it installed and on PATH?): {e}"),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::error!("{program} exited with {}: {stderr}", output.status);
        return Err(PackError::Process {
            program,
            status: output.status.to_string(),
            stderr,
        });
    }

    tracing::debug!("{program} finished");
    Ok(())
}

/// Whether `program` can be spawned and answers `version_arg` successfully.
pub fn is_tool_available(program: &str, version_arg: &str) -> bool {
    Command::new(program)
        .arg(version_arg)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
pub(crate) fn args_of(cmd: &Command) -> Vec<String> {
    cmd.get_args()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}
