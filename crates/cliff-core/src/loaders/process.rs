//! Executables as commands and hooks.
//!
//! A target is a file below the plugin root with an executable bit. Its output
//! is forwarded into the invocation's [`Streams`]; stdin is inherited.
//!
//! Commands get their argv as arguments. A nonzero exit status ends the
//! invocation with that code and no further output: the child has already
//! said what it had to say.
//!
//! Hooks get the hook name and JSON input through `CLIFF_*` variables. Exit
//! status [`HOOK_STOP_EXIT`] stops the round, [`HOOK_FATAL_EXIT`] aborts it,
//! any other nonzero status is a non-fatal listener failure.
//!
//! Metadata is read from `# @key value` comment lines at the top of the file:
//!
//! ```sh
//! #!/bin/sh
//! # @description Say hello
//! # @usage hello NAME
//! # @alias hi
//! # @arg name Who to greet
//! # @flag -l --loud Shout it
//! # @hidden
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::command::{
    ArgMeta, Command, CommandLoader, CommandMeta, FlagMeta, Hook, LoadError, RunContext, TargetRef,
};
use crate::errors::{Failure, RuntimeError};
use crate::hooks::{HookContext, HookFailure, HookSignal};
use crate::streams::Streams;

/// Prefix of every environment variable handed to child processes.
pub const ENV_PREFIX: &str = "CLIFF_";

/// Hook exit status meaning "stop this round".
pub const HOOK_STOP_EXIT: i32 = 3;

/// Hook exit status meaning "abort this round".
pub const HOOK_FATAL_EXIT: i32 = 4;

/// Only this many leading lines are scanned for metadata.
const META_SCAN_LINES: usize = 40;

const SIGINT: i32 = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLoader;

impl ProcessLoader {
    pub fn new() -> Self {
        Self
    }

    fn locate(
        kind: &'static str,
        reference: &TargetRef,
        plugin_root: &Path,
    ) -> Result<PathBuf, LoadError> {
        let path = reference.path_in(plugin_root);
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LoadError::NotFound {
                    kind,
                    reference: reference.key(),
                });
            }
            Err(source) => return Err(LoadError::Io { path, source }),
        };
        if !metadata.is_file() || !is_executable(&metadata) {
            return Err(LoadError::NotExecutable { path });
        }
        Ok(path)
    }
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    true
}

impl CommandLoader for ProcessLoader {
    fn load_command(
        &self,
        reference: &TargetRef,
        plugin_root: &Path,
    ) -> Result<Arc<dyn Command>, LoadError> {
        let path = Self::locate("command", reference, plugin_root)?;
        let meta = read_meta(&path);
        Ok(Arc::new(ProcessCommand {
            path,
            export: reference.export.clone(),
            meta,
        }))
    }

    fn load_hook(
        &self,
        reference: &TargetRef,
        plugin_root: &Path,
    ) -> Result<Arc<dyn Hook>, LoadError> {
        let path = Self::locate("hook", reference, plugin_root)?;
        Ok(Arc::new(ProcessHook {
            path,
            export: reference.export.clone(),
        }))
    }
}

#[derive(Debug)]
struct ProcessCommand {
    path: PathBuf,
    export: Option<String>,
    meta: CommandMeta,
}

#[async_trait]
impl Command for ProcessCommand {
    fn meta(&self) -> CommandMeta {
        self.meta.clone()
    }

    async fn run(&self, ctx: &mut RunContext, argv: &[String]) -> Result<(), Failure> {
        let mut command = tokio::process::Command::new(&self.path);
        command
            .args(argv)
            .env(env_name("BIN"), &ctx.bin)
            .env(env_name("COMMAND_ID"), &ctx.id)
            .env(env_name("PLUGIN_ROOT"), &ctx.plugin_root)
            .env(env_name("DEBUG"), if ctx.debug { "1" } else { "0" });
        if let Some(export) = &self.export {
            command.env(env_name("EXPORT"), export);
        }

        tracing::debug!(path = ?self.path, id = %ctx.id, "Spawning command process");
        let status = run_forwarding(command, &ctx.streams).await.map_err(|e| {
            RuntimeError::new(anyhow::Error::new(e).context(format!(
                "failed to run {}",
                self.path.display()
            )))
        })?;

        if status.success() {
            return Ok(());
        }
        match status.code() {
            Some(code) => Err(Failure::exit(code)),
            None if signal_of(&status) == Some(SIGINT) => Err(Failure::interrupted()),
            None => Err(Failure::msg(format!(
                "{} was terminated by a signal",
                self.path.display()
            ))),
        }
    }
}

#[derive(Debug)]
struct ProcessHook {
    path: PathBuf,
    export: Option<String>,
}

#[async_trait]
impl Hook for ProcessHook {
    async fn call(&self, ctx: &mut HookContext, input: &Value) -> Result<HookSignal, HookFailure> {
        let mut command = tokio::process::Command::new(&self.path);
        command
            .env(env_name("BIN"), &ctx.bin)
            .env(env_name("HOOK"), &ctx.hook)
            .env(env_name("PLUGIN"), &ctx.plugin)
            .env(env_name("HOOK_INPUT"), input.to_string())
            .env(env_name("HOOK_DATA"), Value::Object(ctx.data.clone()).to_string());
        if let Some(export) = &self.export {
            command.env(env_name("EXPORT"), export);
        }

        tracing::debug!(path = ?self.path, hook = %ctx.hook, "Spawning hook process");
        let status = run_forwarding(command, &ctx.streams).await.map_err(|e| {
            HookFailure::new(format!("failed to run {}", self.path.display())).with_source(e)
        })?;

        match status.code() {
            Some(0) => Ok(HookSignal::Continue),
            Some(HOOK_STOP_EXIT) => Ok(HookSignal::Stop),
            Some(HOOK_FATAL_EXIT) => Err(HookFailure::fatal(format!(
                "{} exited with status {HOOK_FATAL_EXIT}",
                self.path.display()
            ))),
            Some(code) => Err(HookFailure::new(format!(
                "{} exited with status {code}",
                self.path.display()
            ))),
            None => Err(HookFailure::new(format!(
                "{} was terminated by a signal",
                self.path.display()
            ))),
        }
    }
}

fn env_name(name: &str) -> String {
    format!("{ENV_PREFIX}{name}")
}

async fn run_forwarding(
    mut command: tokio::process::Command,
    streams: &Streams,
) -> io::Result<ExitStatus> {
    let mut child = command
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let out_streams = streams.clone();
    let err_streams = streams.clone();

    let (status, out, err) = tokio::join!(
        child.wait(),
        forward(stdout, move |bytes| out_streams.write_stdout_bytes(bytes)),
        forward(stderr, move |bytes| err_streams.write_stderr_bytes(bytes)),
    );
    out?;
    err?;
    status
}

async fn forward<R>(reader: Option<R>, write: impl Fn(&[u8])) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok(());
    };
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        write(&buf[..n]);
    }
}

#[cfg(unix)]
fn signal_of(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: &ExitStatus) -> Option<i32> {
    None
}

/// Metadata from `# @key value` header comments. Unreadable files have none.
fn read_meta(path: &Path) -> CommandMeta {
    match std::fs::read(path) {
        Ok(bytes) => parse_meta(&String::from_utf8_lossy(&bytes)),
        Err(e) => {
            tracing::debug!(?path, error = %e, "Cannot read command metadata");
            CommandMeta::default()
        }
    }
}

pub(crate) fn parse_meta(source: &str) -> CommandMeta {
    let mut meta = CommandMeta::default();

    for line in source.lines().take(META_SCAN_LINES) {
        let Some(comment) = line.trim_start().strip_prefix('#') else {
            continue;
        };
        let Some(directive) = comment.trim().strip_prefix('@') else {
            continue;
        };
        let (key, value) = directive
            .split_once(char::is_whitespace)
            .map(|(k, v)| (k, v.trim()))
            .unwrap_or((directive, ""));

        match key {
            "description" => meta.description = Some(value.to_string()),
            "usage" => meta.usage = Some(value.to_string()),
            "alias" if !value.is_empty() => meta.aliases.push(value.to_string()),
            "hidden" => meta.hidden = true,
            "arg" => {
                let (name, description) = split_word(value);
                let required = !name.starts_with('[');
                meta.args.push(ArgMeta {
                    name: name.trim_matches(|c| c == '[' || c == ']').to_string(),
                    description,
                    required,
                });
            }
            "flag" => {
                if let Some(flag) = parse_flag(value) {
                    meta.flags.push(flag);
                }
            }
            _ => {}
        }
    }

    meta
}

fn split_word(value: &str) -> (&str, Option<String>) {
    match value.split_once(char::is_whitespace) {
        Some((word, rest)) if !rest.trim().is_empty() => (word, Some(rest.trim().to_string())),
        Some((word, _)) => (word, None),
        None => (value, None),
    }
}

/// `-l --loud Shout it`, `--loud Shout it`, or `--loud`.
fn parse_flag(value: &str) -> Option<FlagMeta> {
    let (first, rest) = split_word(value);
    let (short, long, description) = match first.strip_prefix("--") {
        Some(long) => (None, long.to_string(), rest),
        None => {
            let short = first.strip_prefix('-')?.chars().next()?;
            let rest = rest.unwrap_or_default();
            let (long, description) = split_word(&rest);
            (Some(short), long.strip_prefix("--")?.to_string(), description)
        }
    };
    Some(FlagMeta {
        name: long,
        short,
        description,
    })
}
