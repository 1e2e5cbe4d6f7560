//! Process runner abstraction
//!
//! The prober never talks to the operating system directly. It asks a
//! [`ProcessRunner`] to start a [`ProbeCommand`] and then reads lines from the
//! returned [`ProbeProcess`]. [`SystemRunner`] spawns the real utility;
//! [`ScriptedRunner`] replays canned output and is what the tests use.

use crate::probe::{ProbeCommand, ProbeError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};

/// Starts probe processes
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Launch `command` and return a handle to its output
    ///
    /// # Errors
    ///
    /// * `ProbeError::ProcessLaunch` - the program is missing or cannot start
    async fn start(&self, command: &ProbeCommand) -> Result<Box<dyn ProbeProcess>, ProbeError>;
}

/// A running probe process
///
/// `read_line` must tolerate being dropped mid-await: the prober races it
/// against cancellation and its deadline, and kills the process afterwards.
#[async_trait]
pub trait ProbeProcess: Send {
    /// Next line of standard output without the line terminator, `None` at EOF
    async fn read_line(&mut self) -> Result<Option<String>, ProbeError>;

    /// Wait for exit and return the exit code, if the platform reports one
    async fn wait(&mut self) -> Result<Option<i32>, ProbeError>;

    /// Terminate the process
    async fn kill(&mut self) -> Result<(), ProbeError>;
}

/// Runs the real ping utility as a child process
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Create a new system runner
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn start(&self, command: &ProbeCommand) -> Result<Box<dyn ProbeProcess>, ProbeError> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProbeError::ProcessLaunch(format!("{}: {}", command.program, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProbeError::ProcessLaunch("stdout was not captured".to_string()))?;

        Ok(Box::new(SystemProcess {
            child,
            stdout: BufReader::new(stdout),
            buf: Vec::with_capacity(256),
        }))
    }
}

struct SystemProcess {
    child: Child,
    stdout: BufReader<ChildStdout>,
    buf: Vec<u8>,
}

#[async_trait]
impl ProbeProcess for SystemProcess {
    async fn read_line(&mut self) -> Result<Option<String>, ProbeError> {
        self.buf.clear();
        let n = self.stdout.read_until(b'\n', &mut self.buf).await?;
        if n == 0 {
            return Ok(None);
        }
        // Windows consoles emit OEM code pages; a bad byte must not end the probe
        let line = String::from_utf8_lossy(&self.buf);
        Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
    }

    async fn wait(&mut self) -> Result<Option<i32>, ProbeError> {
        let status = self.child.wait().await?;
        Ok(status.code())
    }

    async fn kill(&mut self) -> Result<(), ProbeError> {
        match self.child.kill().await {
            Ok(()) => Ok(()),
            // Already reaped
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// One step of scripted process output
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    /// Emit a line
    Line(String),
    /// Pause before the next step
    Delay(Duration),
    /// Produce no more output until killed
    Hang,
}

/// Canned behaviour for one target
#[derive(Debug, Clone)]
pub enum Script {
    /// Replay output, then exit with the given code
    Output {
        /// Steps replayed in order
        steps: Vec<ScriptStep>,
        /// Exit code reported after the last step
        exit_code: i32,
    },
    /// Fail to launch with the given message
    LaunchFailure(String),
    /// Panic while launching
    Panic(String),
}

impl Script {
    /// An empty script that exits with code 0
    pub fn new() -> Self {
        Script::Output {
            steps: Vec::new(),
            exit_code: 0,
        }
    }

    /// Append an output line
    pub fn line(self, line: impl Into<String>) -> Self {
        self.push(ScriptStep::Line(line.into()))
    }

    /// Append several output lines
    pub fn lines<I, S>(self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lines.into_iter().fold(self, |script, line| script.line(line))
    }

    /// Append a pause
    pub fn delay(self, delay: Duration) -> Self {
        self.push(ScriptStep::Delay(delay))
    }

    /// Stop producing output until killed
    pub fn hang(self) -> Self {
        self.push(ScriptStep::Hang)
    }

    /// Set the exit code
    pub fn exit_code(self, code: i32) -> Self {
        match self {
            Script::Output { steps, .. } => Script::Output {
                steps,
                exit_code: code,
            },
            other => other,
        }
    }

    /// A script whose launch fails
    pub fn launch_failure(msg: impl Into<String>) -> Self {
        Script::LaunchFailure(msg.into())
    }

    /// A script whose launch panics
    pub fn panic(msg: impl Into<String>) -> Self {
        Script::Panic(msg.into())
    }

    fn push(self, step: ScriptStep) -> Self {
        match self {
            Script::Output {
                mut steps,
                exit_code,
            } => {
                steps.push(step);
                Script::Output { steps, exit_code }
            }
            other => other,
        }
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

/// Replays canned output per target instead of spawning processes
///
/// The target is taken from the last argument of the command. Targets
/// without a script get the default script (no output, exit code 1).
///
/// # Examples
///
/// ```
/// use pingsweep::probe::{Script, ScriptedRunner};
///
/// let runner = ScriptedRunner::new().with_script(
///     "10.0.0.1",
///     Script::new().line("64 bytes from 10.0.0.1: icmp_seq=1 ttl=64 time=0.5 ms"),
/// );
/// assert!(runner.launched().is_empty());
/// ```
#[derive(Debug)]
pub struct ScriptedRunner {
    scripts: HashMap<String, Script>,
    default: Script,
    launched: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    /// Create a runner where every target is silent and exits with code 1
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            default: Script::new().exit_code(1),
            launched: Mutex::new(Vec::new()),
        }
    }

    /// Set the script for one target
    pub fn with_script(mut self, target: impl Into<String>, script: Script) -> Self {
        self.scripts.insert(target.into(), script);
        self
    }

    /// Set the script for targets without their own
    pub fn with_default(mut self, script: Script) -> Self {
        self.default = script;
        self
    }

    /// Argument vectors of every launch attempt, in order
    pub fn launched(&self) -> Vec<Vec<String>> {
        self.launched.lock().expect("launch log poisoned").clone()
    }
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    #[allow(clippy::panic)]
    async fn start(&self, command: &ProbeCommand) -> Result<Box<dyn ProbeProcess>, ProbeError> {
        self.launched
            .lock()
            .expect("launch log poisoned")
            .push(command.argv());

        let target = command.args.last().cloned().unwrap_or_default();
        let script = self.scripts.get(&target).unwrap_or(&self.default).clone();

        match script {
            Script::Output { steps, exit_code } => Ok(Box::new(ScriptedProcess {
                steps: steps.into(),
                exit_code,
                killed: false,
            })),
            Script::LaunchFailure(msg) => Err(ProbeError::ProcessLaunch(msg)),
            Script::Panic(msg) => panic!("{msg}"),
        }
    }
}

struct ScriptedProcess {
    steps: VecDeque<ScriptStep>,
    exit_code: i32,
    killed: bool,
}

#[async_trait]
impl ProbeProcess for ScriptedProcess {
    async fn read_line(&mut self) -> Result<Option<String>, ProbeError> {
        loop {
            if self.killed {
                return Ok(None);
            }
            // Steps are only consumed once complete so a dropped read resumes cleanly
            match self.steps.front().cloned() {
                None => return Ok(None),
                Some(ScriptStep::Line(line)) => {
                    self.steps.pop_front();
                    return Ok(Some(line));
                }
                Some(ScriptStep::Delay(delay)) => {
                    tokio::time::sleep(delay).await;
                    self.steps.pop_front();
                }
                Some(ScriptStep::Hang) => std::future::pending::<()>().await,
            }
        }
    }

    async fn wait(&mut self) -> Result<Option<i32>, ProbeError> {
        if self.killed {
            Ok(None)
        } else {
            Ok(Some(self.exit_code))
        }
    }

    async fn kill(&mut self) -> Result<(), ProbeError> {
        self.killed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(target: &str) -> ProbeCommand {
        ProbeCommand {
            program: "ping".to_string(),
            args: vec!["-c".to_string(), "1".to_string(), target.to_string()],
        }
    }

    #[tokio::test]
    async fn test_scripted_output() {
        let runner = ScriptedRunner::new().with_script(
            "10.0.0.1",
            Script::new().line("first").line("second").exit_code(0),
        );

        let mut process = runner.start(&command("10.0.0.1")).await.unwrap();
        assert_eq!(process.read_line().await.unwrap().as_deref(), Some("first"));
        assert_eq!(process.read_line().await.unwrap().as_deref(), Some("second"));
        assert_eq!(process.read_line().await.unwrap(), None);
        assert_eq!(process.wait().await.unwrap(), Some(0));

        assert_eq!(runner.launched(), vec![command("10.0.0.1").argv()]);
    }

    #[tokio::test]
    async fn test_default_script() {
        let runner = ScriptedRunner::new();
        let mut process = runner.start(&command("10.9.9.9")).await.unwrap();
        assert_eq!(process.read_line().await.unwrap(), None);
        assert_eq!(process.wait().await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_launch_failure() {
        let runner =
            ScriptedRunner::new().with_default(Script::launch_failure("ping: not installed"));
        let result = runner.start(&command("10.0.0.1")).await;
        assert!(matches!(result, Err(ProbeError::ProcessLaunch(_))));
    }

    #[tokio::test]
    async fn test_kill_ends_output() {
        let runner =
            ScriptedRunner::new().with_default(Script::new().line("one").hang());
        let mut process = runner.start(&command("10.0.0.1")).await.unwrap();
        assert_eq!(process.read_line().await.unwrap().as_deref(), Some("one"));

        let pending =
            tokio::time::timeout(Duration::from_millis(50), process.read_line()).await;
        assert!(pending.is_err(), "hang step should not produce output");

        process.kill().await.unwrap();
        assert_eq!(process.read_line().await.unwrap(), None);
        assert_eq!(process.wait().await.unwrap(), None);
    }

    #[test]
    fn test_script_builders_ignore_non_output() {
        let script = Script::launch_failure("boom").line("ignored").exit_code(3);
        assert!(matches!(script, Script::LaunchFailure(_)));
    }

    #[tokio::test]
    async fn test_system_runner_missing_program() {
        let runner = SystemRunner::new();
        let cmd = ProbeCommand {
            program: "pingsweep-definitely-not-a-real-program".to_string(),
            args: vec!["127.0.0.1".to_string()],
        };
        let result = runner.start(&cmd).await;
        assert!(matches!(result, Err(ProbeError::ProcessLaunch(_))));
    }
}
