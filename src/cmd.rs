use std::process::{Command, Output, Stdio};

use colored::Colorize;

use crate::error::{DeployError, DeployResult};

/// An ordered list of shell tokens, optionally prefixed with
/// inline environment assignments, executed as one `sh -c`
/// invocation with the terminal attached.
///
/// ```
/// use totoro::cmd::CommandLine;
///
/// let line = CommandLine::new("docker")
///     .env("ENV_FILE", ".envs/.env-dev")
///     .args(["--context", "default", "compose"])
///     .arg_if(true, "-d");
///
/// assert_eq!(
///     line.render(),
///     "ENV_FILE=.envs/.env-dev docker --context default compose -d"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct CommandLine {
    env: Vec<(String, String)>,
    tokens: Vec<String>,
}

impl CommandLine {
    #[must_use]
    pub fn new(program: &str) -> Self {
        Self {
            env: Vec::new(),
            tokens: vec![program.to_string()],
        }
    }

    /// Append a raw token. Empty tokens are dropped so optional
    /// flags can be passed through unconditionally.
    #[must_use]
    pub fn arg(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        if !token.trim().is_empty() {
            self.tokens.push(token);
        }
        self
    }

    #[must_use]
    pub fn args<I, S>(self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        tokens.into_iter().fold(self, Self::arg)
    }

    #[must_use]
    pub fn arg_if(self, condition: bool, token: impl Into<String>) -> Self {
        if condition { self.arg(token) } else { self }
    }

    /// Append a value that must survive the shell as one word.
    #[must_use]
    pub fn quoted(self, value: &str) -> Self {
        self.arg(shell_quote(value))
    }

    #[must_use]
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut parts: Vec<String> = self
            .env
            .iter()
            .map(|(k, v)| format!("{k}={}", shell_quote(v)))
            .collect();
        parts.extend(self.tokens.iter().cloned());
        parts.join(" ").trim().to_string()
    }

    /// Execute the line, echoing it first when `echo` is set.
    pub fn run(&self, echo: bool) -> DeployResult<()> {
        let rendered = self.render();
        if echo {
            eprintln!("{}", rendered.as_str().dimmed().italic().blue());
        }
        tracing::debug!(command = %rendered, "executing");
        run_pipeline(&rendered)
    }
}

/// Quote a value for `sh` when it contains anything beyond a
/// conservative set of safe characters.
#[must_use]
pub fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}

/// Run a command and capture its output. Fails if the command
/// returns a non-zero exit code.
pub fn run(program: &str, args: &[&str]) -> DeployResult<String> {
    let output = spawn(program, args)?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let command = format_command(program, args);
        tracing::debug!(%command, %stderr, "command failed");
        Err(DeployError::CommandFailed {
            command,
            status: output.status,
        })
    }
}

/// Run a command quietly and report only whether it succeeded.
#[must_use]
pub fn succeeds(program: &str, args: &[&str]) -> bool {
    spawn(program, args).is_ok_and(|o| o.status.success())
}

/// Run a command with stdin/stdout/stderr inherited (interactive).
pub fn run_interactive(program: &str, args: &[&str]) -> DeployResult<()> {
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| not_found_or_io(program, e))?;

    if status.success() {
        Ok(())
    } else {
        Err(DeployError::CommandFailed {
            command: format_command(program, args),
            status,
        })
    }
}

/// Run a command that pipes its stdin from a byte slice.
pub fn run_with_stdin(program: &str, args: &[&str], stdin_data: &[u8]) -> DeployResult<String> {
    use std::io::Write;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| not_found_or_io(program, e))?;

    if let Some(stdin) = &mut child.stdin {
        stdin.write_all(stdin_data)?;
    }
    drop(child.stdin.take());

    let output = child.wait_with_output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        Err(DeployError::CommandFailed {
            command: format_command(program, args),
            status: output.status,
        })
    }
}

/// Run a shell pipeline (via `sh -c`).
pub fn run_pipeline(shell_cmd: &str) -> DeployResult<()> {
    run_interactive("sh", &["-c", shell_cmd]).map_err(|e| match e {
        DeployError::CommandFailed { status, .. } => DeployError::CommandFailed {
            command: shell_cmd.to_string(),
            status,
        },
        other => other,
    })
}

/// Check if a command exists on PATH.
#[must_use]
pub fn command_exists(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

fn spawn(program: &str, args: &[&str]) -> DeployResult<Output> {
    Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| not_found_or_io(program, e))
}

fn not_found_or_io(program: &str, e: std::io::Error) -> DeployError {
    if e.kind() == std::io::ErrorKind::NotFound {
        DeployError::CommandNotFound(program.to_string())
    } else {
        DeployError::Io(e)
    }
}

fn format_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| (*a).to_string()));
    parts.join(" ")
}
