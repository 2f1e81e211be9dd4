//! Adapters that shell out to user-configured commands
//!
//! Every command runs as `sh -c <command> timed-filters <args...>`, so the
//! configured string sees its arguments as `$1`, `$2`, ...

mod action;
mod mailbox;
mod sendmail;

pub use action::CommandAction;
pub use mailbox::CommandMailbox;
pub use sendmail::SendmailSender;

use std::io::Write;
use std::process::{Command, Stdio};

use tracing::debug;

/// `$0` seen by configured commands
const SHELL_NAME: &str = "timed-filters";

/// Build a `sh -c` invocation of `command` with positional `args`.
pub(crate) fn shell(command: &str, args: &[&str]) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command).arg(SHELL_NAME).args(args);
    cmd
}

/// Run `cmd` to completion, feeding it `input` on stdin, and return its
/// stdout. A non-zero exit becomes an error carrying the trimmed stderr.
pub(crate) fn run(mut cmd: Command, input: Option<&[u8]>) -> Result<Vec<u8>, String> {
    debug!("Running {:?}", cmd);
    cmd.stdin(if input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| format!("failed to start command: {}", e))?;

    if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
        stdin
            .write_all(input)
            .map_err(|e| format!("failed to write to command: {}", e))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| format!("failed to wait for command: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        return Err(if stderr.is_empty() {
            format!("command {}", output.status)
        } else {
            format!("command {}: {}", output.status, stderr)
        });
    }

    Ok(output.stdout)
}
