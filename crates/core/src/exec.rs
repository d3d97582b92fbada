//! External tool invocation with streamed output
//!
//! Packaging tools run as blocking child processes with structured argument
//! lists; no shell is involved. Their stdout is copied to the operator
//! line-by-line as it is produced, on the invoking thread. stderr is drained
//! concurrently (a pipe left unread can fill and deadlock the child) and both
//! streams are captured into one transcript used for diagnostics on failure.

use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::{Error, Result};

/// Human-readable rendering of a command line, for logs and errors.
pub fn render_command(cmd: &Command) -> String {
    let mut rendered = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        rendered.push(' ');
        rendered.push_str(&arg.to_string_lossy());
    }
    rendered
}

/// Run `cmd` to completion, streaming its output to the operator.
///
/// Returns [`Error::ExternalTool`] with the captured transcript if the
/// process exits non-zero.
pub fn run_streamed(cmd: &mut Command) -> Result<()> {
    let command = render_command(cmd);
    info!(%command, "running");

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn()?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Io(std::io::Error::other("child stdout was not captured")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::Io(std::io::Error::other("child stderr was not captured")))?;

    let stderr_lines = std::thread::spawn(move || {
        let mut lines = Vec::new();
        for line in BufReader::new(stderr).lines().map_while(|l| l.ok()) {
            eprintln!("{line}");
            lines.push(line);
        }
        lines
    });

    // A stdout read error (e.g. non-UTF-8 output) must not leave the child
    // unreaped; wait() runs before the error propagates.
    let mut transcript = Vec::new();
    let mut read_error = None;
    for line in BufReader::new(stdout).lines() {
        match line {
            Ok(line) => {
                println!("{line}");
                transcript.push(line);
            }
            Err(e) => {
                read_error = Some(e);
                break;
            }
        }
    }

    transcript.extend(stderr_lines.join().unwrap_or_default());
    let status = child.wait()?;
    debug!(%command, %status, "command finished");

    if let Some(e) = read_error {
        return Err(e.into());
    }

    if !status.success() {
        return Err(Error::ExternalTool {
            command,
            status,
            output: transcript.join("\n"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_program_and_args() {
        let mut cmd = Command::new("debuild");
        cmd.args(["-S", "-sa"]);
        assert_eq!(render_command(&cmd), "debuild -S -sa");
    }

    #[cfg(unix)]
    #[test]
    fn successful_command_runs_to_completion() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo hello"]);
        run_streamed(&mut cmd).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn respects_working_directory() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "touch marker"]).current_dir(temp.path());
        run_streamed(&mut cmd).unwrap();
        assert!(temp.path().join("marker").exists());
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_reports_status_and_output() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo broken >&2; exit 2"]);
        let err = run_streamed(&mut cmd).unwrap_err();
        match err {
            Error::ExternalTool {
                command,
                status,
                output,
            } => {
                assert!(command.starts_with("sh -c"));
                assert_eq!(status.code(), Some(2));
                assert!(output.contains("broken"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_output_is_io_error() {
        // \377\376 is not valid UTF-8; the child still exits cleanly and
        // must be reaped before the read error surfaces.
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "printf 'ok\\n\\377\\376\\n'"]);
        let err = run_streamed(&mut cmd).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn missing_program_is_io_error() {
        let mut cmd = Command::new("definitely-not-a-real-tool");
        let err = run_streamed(&mut cmd).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
