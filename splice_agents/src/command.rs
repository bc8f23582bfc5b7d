use std::env;
use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use splice_agent_api::{
    AgentGateway, AgentRequest, AgentResponse, GatewayCapabilities, GatewayError, GatewayResult,
};
use splice_api::EditEncoding;
use wait_timeout::ChildExt;

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const COMMAND_ENV: &str = "SPLICE_AGENT_CMD";
const TIMEOUT_ENV: &str = "SPLICE_AGENT_TIMEOUT_SECS";

/// Gateway that pipes the prompt into an external CLI and reads its stdout.
///
/// The program receives the flattened prompt on stdin. A non-zero exit status
/// or a run longer than the timeout is reported as a [`GatewayError`].
#[derive(Debug, Clone)]
pub struct CommandGateway {
    program: OsString,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    timeout: Duration,
    preferred_encoding: EditEncoding,
}

impl CommandGateway {
    /// Gateway running `program` with no extra arguments.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            preferred_encoding: EditEncoding::SearchReplace,
        }
    }

    /// Gateway configured from `SPLICE_AGENT_CMD` (whitespace separated program
    /// and arguments) and `SPLICE_AGENT_TIMEOUT_SECS`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let raw = env::var(COMMAND_ENV).ok()?;
        let mut parts = raw.split_whitespace();
        let program = parts.next()?;
        let mut gateway = Self::new(program).with_args(parts);
        if let Some(seconds) = env::var(TIMEOUT_ENV)
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
        {
            gateway = gateway.with_timeout(Duration::from_secs(seconds));
        }
        Some(gateway)
    }

    /// Append arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child process.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Override the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the encoding advertised in the capabilities.
    #[must_use]
    pub const fn with_preferred_encoding(mut self, encoding: EditEncoding) -> Self {
        self.preferred_encoding = encoding;
        self
    }

    /// Configured timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn run(&self, payload: String) -> GatewayResult<ProcessOutput> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.envs.iter().map(|(key, value)| (key, value)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|err| {
            GatewayError::message(format!(
                "failed to spawn agent command {}: {err}",
                self.program.to_string_lossy()
            ))
        })?;

        let stdin_handle = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || -> io::Result<()> {
                stdin.write_all(payload.as_bytes())?;
                stdin.flush()
            })
        });

        let stdout_handle = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || -> io::Result<Vec<u8>> {
                let mut buffer = Vec::new();
                stdout.read_to_end(&mut buffer)?;
                Ok(buffer)
            })
        });

        let stderr_handle = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || -> io::Result<Vec<u8>> {
                let mut buffer = Vec::new();
                stderr.read_to_end(&mut buffer)?;
                Ok(buffer)
            })
        });

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(GatewayError::Timeout {
                    seconds: self.timeout.as_secs(),
                });
            }
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(GatewayError::message(format!(
                    "failed waiting on agent command: {err}"
                )));
            }
        };

        if let Some(handle) = stdin_handle {
            // A child that exits without draining stdin closes the pipe early.
            match handle.join() {
                Ok(Err(err)) if err.kind() != io::ErrorKind::BrokenPipe => {
                    return Err(GatewayError::message(format!(
                        "failed to write agent stdin: {err}"
                    )));
                }
                Err(_) => return Err(GatewayError::message("failed to join agent stdin writer")),
                _ => {}
            }
        }

        let stdout = join_reader(stdout_handle, "stdout")?;
        let stderr = join_reader(stderr_handle, "stderr")?;

        if !status.success() {
            let code = status
                .code()
                .map_or_else(|| "terminated".to_string(), |c| c.to_string());
            return Err(GatewayError::message(format!(
                "agent command failed with status {code}: {}",
                stderr.trim()
            )));
        }

        Ok(ProcessOutput { stdout, stderr })
    }
}

impl AgentGateway for CommandGateway {
    fn id(&self) -> &'static str {
        "command"
    }

    fn label(&self) -> &'static str {
        "External command"
    }

    fn capabilities(&self) -> GatewayCapabilities {
        GatewayCapabilities::new(false, false, self.preferred_encoding)
    }

    fn complete(&self, request: &AgentRequest) -> GatewayResult<AgentResponse> {
        let started = Instant::now();
        tracing::debug!(
            program = %self.program.to_string_lossy(),
            file = request.file_path.as_deref().unwrap_or("-"),
            "invoking agent command"
        );
        let output = self.run(request.flattened())?;
        if !output.stderr.trim().is_empty() {
            tracing::debug!(stderr = %output.stderr.trim(), "agent command wrote to stderr");
        }
        tracing::debug!(
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            bytes = output.stdout.len(),
            "agent command finished"
        );
        Ok(AgentResponse::new(self.id(), output.stdout))
    }
}

fn join_reader(
    handle: Option<thread::JoinHandle<io::Result<Vec<u8>>>>,
    stream: &str,
) -> GatewayResult<String> {
    match handle {
        Some(handle) => {
            let bytes = handle
                .join()
                .map_err(|_| GatewayError::message(format!("failed to join agent {stream} reader")))?
                .map_err(|err| GatewayError::message(format!("failed to read agent {stream}: {err}")))?;
            Ok(String::from_utf8_lossy(&bytes).to_string())
        }
        None => Ok(String::new()),
    }
}

#[derive(Debug)]
struct ProcessOutput {
    stdout: String,
    stderr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_arguments() {
        let gateway = CommandGateway::new("agent")
            .with_args(["--model", "small"])
            .with_env("AGENT_KEY", "k")
            .with_timeout(Duration::from_secs(3));
        assert_eq!(gateway.args.len(), 2);
        assert_eq!(gateway.envs.len(), 1);
        assert_eq!(gateway.timeout(), Duration::from_secs(3));
        assert!(!gateway.capabilities().offline);
    }

    #[cfg(unix)]
    #[test]
    fn cat_echoes_prompt() {
        let gateway = CommandGateway::new("cat");
        let request = AgentRequest::new("<<<<<<< SEARCH\na\n=======\nb\n>>>>>>> REPLACE\n")
            .with_system("system");
        let response = gateway.complete(&request).expect("cat runs");
        assert_eq!(response.gateway_id, "command");
        assert!(response.text.starts_with("system\n\n<<<<<<< SEARCH"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_reports_status() {
        let gateway = CommandGateway::new("sh").with_args(["-c", "echo broken >&2; exit 3"]);
        let err = gateway
            .complete(&AgentRequest::new("x"))
            .expect_err("non-zero exit");
        let message = err.to_string();
        assert!(message.contains("status 3"), "unexpected message: {message}");
        assert!(message.contains("broken"));
    }

    #[cfg(unix)]
    #[test]
    fn slow_command_times_out() {
        let gateway = CommandGateway::new("sleep")
            .with_args(["5"])
            .with_timeout(Duration::from_millis(100));
        let err = gateway
            .complete(&AgentRequest::new(""))
            .expect_err("timeout");
        assert!(matches!(err, GatewayError::Timeout { .. }));
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let gateway = CommandGateway::new("splice-definitely-not-installed");
        let err = gateway
            .complete(&AgentRequest::new("x"))
            .expect_err("spawn failure");
        assert!(err.to_string().contains("failed to spawn"));
    }
}
