//! Out-of-process step execution.
//!
//! `ProcessRunner` is the process-invocation primitive of the host runtime;
//! `StepRunner` renders an `Operation` against an `ExecutionContext` and runs
//! it once. There are no retries.

use serde::Serialize;
use serde_json::{Map, Value};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::context::ExecutionContext;
use crate::utils::shell;

/// One shell invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub command: String,
    pub env: Vec<(String, String)>,
    pub dir: Option<String>,
}

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

pub trait ProcessRunner {
    /// Run to completion. With `streaming`, output is forwarded as produced
    /// (stderr is still captured). Spawn failures come back as exit code -1.
    fn run(&self, invocation: &Invocation, streaming: bool) -> CommandOutput;
}

/// Runs invocations through the local shell.
#[derive(Debug, Default)]
pub struct LocalProcessRunner;

impl LocalProcessRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(invocation: &Invocation) -> Command {
        #[cfg(windows)]
        let mut cmd = {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", &invocation.command]);
            cmd
        };

        #[cfg(not(windows))]
        let mut cmd = {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", &invocation.command]);
            cmd
        };

        if let Some(dir) = &invocation.dir {
            cmd.current_dir(dir);
        }
        cmd.envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        cmd
    }

    fn run_buffered(invocation: &Invocation) -> CommandOutput {
        match Self::command(invocation).output() {
            Ok(out) => CommandOutput {
                stdout: String::from_utf8_lossy(&out.stdout).to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).to_string(),
                success: out.status.success(),
                exit_code: out.status.code().unwrap_or(-1),
            },
            Err(e) => spawn_failure(e),
        }
    }

    fn run_streaming(invocation: &Invocation) -> CommandOutput {
        let mut cmd = Self::command(invocation);
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return spawn_failure(e),
        };

        // stdout is inherited, so draining stderr here cannot deadlock
        let mut stderr = String::new();
        if let Some(pipe) = child.stderr.take() {
            for line in BufReader::new(pipe).lines().map_while(|l| l.ok()) {
                eprintln!("{}", line);
                stderr.push_str(&line);
                stderr.push('\n');
            }
        }

        match child.wait() {
            Ok(status) => CommandOutput {
                stdout: String::new(),
                stderr,
                success: status.success(),
                exit_code: status.code().unwrap_or(-1),
            },
            Err(e) => spawn_failure(e),
        }
    }
}

fn spawn_failure(e: std::io::Error) -> CommandOutput {
    CommandOutput {
        stdout: String::new(),
        stderr: format!("Command error: {}", e),
        success: false,
        exit_code: -1,
    }
}

impl ProcessRunner for LocalProcessRunner {
    fn run(&self, invocation: &Invocation, streaming: bool) -> CommandOutput {
        if streaming {
            Self::run_streaming(invocation)
        } else {
            Self::run_buffered(invocation)
        }
    }
}

/// An external operation a step performs.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// A drush command. `alias` overrides the context's name.
    Drush {
        alias: Option<String>,
        command: String,
        args: Vec<String>,
        options: Map<String, Value>,
    },
    /// A literal shell line.
    Shell { command: String, dir: Option<String> },
    /// Create the directory if missing, otherwise make it writable.
    EnsureWritableDir { path: PathBuf },
    /// Succeeds iff the file exists.
    RequireFile { path: PathBuf },
}

impl Operation {
    pub fn drush(command: &str) -> Self {
        Operation::Drush {
            alias: None,
            command: command.to_string(),
            args: Vec::new(),
            options: Map::new(),
        }
    }

    pub fn shell(command: impl Into<String>, dir: Option<String>) -> Self {
        Operation::Shell {
            command: command.into(),
            dir,
        }
    }

    pub fn arg(mut self, value: &str) -> Self {
        if let Operation::Drush { args, .. } = &mut self {
            args.push(value.to_string());
        }
        self
    }

    pub fn option(mut self, key: &str, value: impl Into<Value>) -> Self {
        if let Operation::Drush { options, .. } = &mut self {
            options.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn on_alias(mut self, name: &str) -> Self {
        if let Operation::Drush { alias, .. } = &mut self {
            *alias = Some(name.to_string());
        }
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct StepResult {
    pub success: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub output: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error_output: String,
    pub exit_code: i32,
}

impl StepResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn failed(error_output: impl Into<String>) -> Self {
        Self {
            success: false,
            error_output: error_output.into(),
            exit_code: 1,
            ..Default::default()
        }
    }
}

impl From<CommandOutput> for StepResult {
    fn from(output: CommandOutput) -> Self {
        Self {
            success: output.exit_code == 0,
            output: output.stdout,
            error_output: if output.exit_code == 0 {
                String::new()
            } else {
                output.stderr
            },
            exit_code: output.exit_code,
        }
    }
}

pub struct StepRunner<'a> {
    runner: &'a dyn ProcessRunner,
    drush_bin: String,
}

impl<'a> StepRunner<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, drush_bin: &str) -> Self {
        Self {
            runner,
            drush_bin: drush_bin.to_string(),
        }
    }

    pub fn drush_bin(&self) -> &str {
        &self.drush_bin
    }

    pub fn run(&self, context: &ExecutionContext, operation: &Operation, streaming: bool) -> StepResult {
        match operation {
            Operation::Drush { .. } | Operation::Shell { .. } => {
                let invocation = self.invocation(context, operation);
                self.runner.run(&invocation, streaming).into()
            }
            Operation::EnsureWritableDir { path } => ensure_writable_dir(path),
            Operation::RequireFile { path } => {
                if path.is_file() {
                    StepResult::ok()
                } else {
                    StepResult::failed(format!("{} does not exist", path.display()))
                }
            }
        }
    }

    /// Render a process operation into the shell invocation it would run.
    pub fn invocation(&self, context: &ExecutionContext, operation: &Operation) -> Invocation {
        let env: Vec<(String, String)> = context
            .env_vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let (command, dir) = match operation {
            Operation::Drush {
                alias,
                command,
                args,
                options,
            } => {
                let target = alias.clone().unwrap_or_else(|| context.name.clone());
                let mut merged = context.options.clone();
                for (key, value) in options {
                    merged.insert(key.clone(), value.clone());
                }
                let mut positional = vec![target, command.clone()];
                positional.extend(args.iter().cloned());
                (shell::command_line(&self.drush_bin, &positional, &merged), None)
            }
            Operation::Shell { command, dir } => (command.clone(), dir.clone()),
            Operation::EnsureWritableDir { path } | Operation::RequireFile { path } => {
                (format!("test -e {}", shell::quote_path(&path.to_string_lossy())), None)
            }
        };

        Invocation { command, env, dir }
    }
}

fn ensure_writable_dir(path: &std::path::Path) -> StepResult {
    if !path.exists() {
        return match std::fs::create_dir_all(path) {
            Ok(()) => StepResult::ok(),
            Err(e) => StepResult::failed(format!("Failure creating {}: {}", path.display(), e)),
        };
    }

    match make_writable(path) {
        Ok(()) => StepResult::ok(),
        Err(e) => StepResult::failed(format!(
            "Failure adjusting permissions on {}: {}",
            path.display(),
            e
        )),
    }
}

#[cfg(unix)]
fn make_writable(path: &std::path::Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o777))
}

#[cfg(not(unix))]
fn make_writable(path: &std::path::Path) -> std::io::Result<()> {
    let mut permissions = std::fs::metadata(path)?.permissions();
    permissions.set_readonly(false);
    std::fs::set_permissions(path, permissions)
}
