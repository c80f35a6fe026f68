//! The lifecycle driver.
//!
//! One invocation:
//!
//! ```text
//! init → --version / --help fast paths → resolve (JIT load if needed)
//!      → command_not_found on a miss → prerun → run → postrun
//!      → finally (always, after init)
//! ```
//!
//! [`Runner::execute`] hands the outcome to the exit funnel.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::command::RunContext;
use crate::environment::Environment;
use crate::errors::{CliError, Failure, RuntimeError};
use crate::exit::Terminator;
use crate::help::HelpSection;
use crate::hooks::{names, DispatchError, HookReport};
use crate::registry::CommandEntry;
use crate::resolver::Resolution;

const VERSION_FLAGS: &[&str] = &["--version"];
const HELP_FLAGS: &[&str] = &["--help"];

/// Everything after this is passed through untouched.
const END_OF_FLAGS: &str = "--";

#[derive(Debug)]
pub struct Runner {
    env: Environment,
}

impl Runner {
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn into_environment(self) -> Environment {
        self.env
    }

    /// Run `argv` and pass the outcome to the exit funnel.
    ///
    /// Returns the exit code for terminators that return.
    pub async fn execute(&mut self, argv: &[String], terminator: Arc<dyn Terminator>) -> i32 {
        let outcome = self.run(argv).await;
        self.env.exit_funnel(terminator).handle(outcome)
    }

    /// Run `argv` through the full lifecycle.
    pub async fn run(&mut self, argv: &[String]) -> Result<(), Failure> {
        let init = json!({ "id": argv.first(), "argv": argv.get(1..).unwrap_or_default() });
        self.fire(names::INIT, &init).await?;

        let mut finished = Finished::default();
        let outcome = self.dispatch(argv, &mut finished).await;

        let error = outcome.as_ref().err().map(ToString::to_string);
        let input = json!({ "id": finished.id, "argv": argv, "error": error });
        let finally = self.fire(names::FINALLY, &input).await;

        match (outcome, finally) {
            (Err(failure), _) => Err(failure),
            (Ok(()), Err(failure)) => Err(failure),
            (Ok(()), Ok(_)) => Ok(()),
        }
    }

    async fn dispatch(&mut self, argv: &[String], finished: &mut Finished) -> Result<(), Failure> {
        if let Some(first) = argv.first() {
            if self.is_version_flag(first) {
                self.show_version();
                return Ok(());
            }
        }
        if let Some(rest) = self.strip_help_flag(argv) {
            return self.show_help(&rest);
        }

        let mut resolution = self.env.resolve_argv(argv);
        if let Some((name, version)) = self.env.needs_jit(resolution.id()) {
            if let Err(e) = self.env.load_jit_plugin(&name, &version).await {
                tracing::warn!(plugin = %name, version = %version, error = %e, "JIT plugin install failed");
                let input = json!({
                    "id": resolution.id(),
                    "plugin": name,
                    "version": version,
                    "error": e.to_string(),
                });
                self.fire(names::JIT_PLUGIN_NOT_INSTALLED, &input).await?;
                return Err(CliError::new(format!("plugin {name}@{version} is not installed"))
                    .with_suggestions([format!("install {name} and try again")])
                    .into());
            }
            resolution = self.env.resolve_argv(argv);
        }
        finished.id = Some(resolution.id().to_string());

        match resolution {
            Resolution::Command { id, aliases, argv } => {
                if !aliases.is_empty() {
                    tracing::debug!(id = %id, ?aliases, "Running aliased command");
                }
                let entry = self
                    .env
                    .command(&id)
                    .cloned()
                    .ok_or_else(|| Failure::msg(format!("command {id} vanished from the registry")))?;
                self.run_command(&entry, &argv).await
            }
            Resolution::Topic { id, .. } => {
                if let Some(listing) = self.env.listing(&id) {
                    self.env
                        .streams()
                        .write_stdout(&self.env.help().render_topic(&listing));
                }
                Ok(())
            }
            Resolution::NotFound {
                id,
                nearest_topic,
                argv,
            } => self.not_found(&id, nearest_topic.as_deref(), &argv).await,
        }
    }

    async fn not_found(
        &self,
        id: &str,
        nearest_topic: Option<&str>,
        argv: &[String],
    ) -> Result<(), Failure> {
        let report = self
            .fire(names::COMMAND_NOT_FOUND, &json!({ "id": id, "argv": argv }))
            .await?;
        if report.stopped() {
            tracing::debug!(id, handled_by = ?report.stopped_by, "Missing command handled by a hook");
            return Ok(());
        }

        if let Some(listing) = nearest_topic.and_then(|topic| self.env.listing(topic)) {
            self.env
                .streams()
                .write_stderr(&self.env.help().render_topic(&listing));
        }
        let display = self.env.separator().display_id(id);
        Err(CliError::new(format!("command {display} not found")).into())
    }

    async fn run_command(&self, entry: &CommandEntry, argv: &[String]) -> Result<(), Failure> {
        let command = self
            .env
            .load_command(entry)
            .map_err(|e| RuntimeError::new(anyhow::Error::new(e)))?;

        let input = json!({ "id": entry.id, "plugin": entry.plugin(), "argv": argv });
        self.fire(names::PRERUN, &input).await?;

        let mut ctx = RunContext {
            bin: self.env.bin().to_string(),
            id: entry.id.clone(),
            separator: self.env.separator(),
            plugin_root: self.env.plugin_root(entry),
            streams: self.env.streams().clone(),
            debug: self.env.settings().debug,
        };
        tracing::debug!(id = %entry.id, plugin = %entry.plugin(), "Running command");
        command
            .run(&mut ctx, argv)
            .await
            .map_err(|failure| attach_command(failure, entry))?;

        self.fire(names::POSTRUN, &input).await?;
        Ok(())
    }

    async fn fire(&self, hook: &str, input: &Value) -> Result<HookReport, Failure> {
        self.env.run_hook(hook, input).await.map_err(hook_failure)
    }

    fn is_version_flag(&self, arg: &str) -> bool {
        VERSION_FLAGS.contains(&arg)
            || self
                .env
                .root_descriptor()
                .additional_version_flags
                .iter()
                .any(|f| f == arg)
    }

    fn is_help_flag(&self, arg: &str) -> bool {
        HELP_FLAGS.contains(&arg)
            || self
                .env
                .root_descriptor()
                .additional_help_flags
                .iter()
                .any(|f| f == arg)
    }

    /// `argv` without its help flag, when one appears before `--`.
    fn strip_help_flag(&self, argv: &[String]) -> Option<Vec<String>> {
        let flags_end = argv
            .iter()
            .position(|a| a == END_OF_FLAGS)
            .unwrap_or(argv.len());
        let position = argv[..flags_end].iter().position(|a| self.is_help_flag(a))?;
        let mut rest = argv.to_vec();
        rest.remove(position);
        Some(rest)
    }

    fn show_version(&self) {
        let line = format!(
            "{}/{} {}-{}\n",
            self.env.bin(),
            self.env.version(),
            std::env::consts::OS,
            std::env::consts::ARCH
        );
        self.env.streams().write_stdout(&line);
    }

    fn show_help(&self, argv: &[String]) -> Result<(), Failure> {
        let help = self.env.help();
        let text = match self.env.resolve_argv(argv) {
            Resolution::Command { id, .. } => self
                .env
                .command(&id)
                .map(|entry| help.render_command(entry, &HelpSection::ALL)),
            Resolution::Topic { id, .. } => self.env.listing(&id).map(|l| help.render_topic(&l)),
            Resolution::NotFound { id, .. } => {
                let display = self.env.separator().display_id(&id);
                return Err(CliError::new(format!("command {display} not found")).into());
            }
        };
        if let Some(text) = text {
            self.env.streams().write_stdout(&text);
        }
        Ok(())
    }
}

/// State the `finally` hook reports on.
#[derive(Debug, Default)]
struct Finished {
    id: Option<String>,
}

fn hook_failure(error: DispatchError) -> Failure {
    RuntimeError::new(anyhow::Error::new(error)).into()
}

/// Parse failures raised without a command get the running one, so usage
/// help can be shown.
fn attach_command(failure: Failure, entry: &CommandEntry) -> Failure {
    match failure {
        Failure::Parse(error) if error.command.is_none() => Failure::Parse(error.for_command(entry)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::environment::EnvironmentOptions;
    use crate::exit::RecordingTerminator;
    use crate::hooks::{HookFailure, HookSignal};
    use crate::loaders::{FnCommand, FnHook, StaticLoader};
    use crate::streams::{CapturedOutput, Streams};
    use std::fs;
    use std::path::Path;

    const DESCRIPTOR: &str = r#"
commands = "commands"
additional-help-flags = ["-h"]
additional-version-flags = ["-v"]

[plugin]
name = "mycli"
version = "1.2.3"

[hooks]
init = "hooks/init"
command_not_found = "hooks/not-found"

[topics.foo]
description = "foo topic description"

[aliases]
"foo:alias" = "foo:bar"
"#;

    fn fixture(loader: StaticLoader) -> (tempfile::TempDir, Runner, CapturedOutput) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cliff-plugin.toml"), DESCRIPTOR).unwrap();
        for file in ["commands/foo/bar.sh", "commands/foo/fail.sh", "commands/foo/parse.sh"] {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }

        let loader = loader
            .with_command(
                "mycli",
                "commands/foo/bar.sh",
                FnCommand::new(|ctx, _| {
                    ctx.log("hello world!");
                    Ok(())
                }),
            )
            .with_command(
                "mycli",
                "commands/foo/fail.sh",
                FnCommand::new(|_, _| Err(Failure::msg("foo bar baz"))),
            )
            .with_command(
                "mycli",
                "commands/foo/parse.sh",
                FnCommand::new(|_, _| Err(Failure::parse("Unexpected argument: x"))),
            )
            .with_hook(
                "mycli",
                "hooks/init",
                FnHook::new(|ctx, input| {
                    let id = input["id"].as_str().unwrap_or_default().to_string();
                    ctx.log(format!("example hook running {id}"));
                    Ok(HookSignal::Continue)
                }),
            );

        let (streams, captured) = Streams::capture();
        let env = Environment::load(
            dir.path(),
            EnvironmentOptions::new(Arc::new(loader))
                .with_settings(Settings::default())
                .with_streams(streams),
        )
        .unwrap();
        (dir, Runner::new(env), captured)
    }

    fn not_found_hook(signal: HookSignal) -> StaticLoader {
        StaticLoader::new().with_hook(
            "mycli",
            "hooks/not-found",
            FnHook::new(move |_, _| Ok(signal)),
        )
    }

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[tokio::test]
    async fn test_runs_command_and_alias() {
        let (_dir, mut runner, captured) = fixture(not_found_hook(HookSignal::Continue));
        runner.run(&argv(&["foo:bar"])).await.unwrap();
        runner.run(&argv(&["foo:alias"])).await.unwrap();
        assert_eq!(
            captured.stdout(),
            "example hook running foo:bar\nhello world!\nexample hook running foo:alias\nhello world!\n"
        );
    }

    #[tokio::test]
    async fn test_help_flag_lists_topic() {
        let (_dir, mut runner, captured) = fixture(not_found_hook(HookSignal::Continue));
        runner.run(&argv(&["--help", "foo"])).await.unwrap();
        let stdout = captured.stdout();
        assert!(stdout.starts_with("example hook running --help\nfoo topic description\n"));
        assert!(stdout.contains("  $ mycli foo:COMMAND"));
        assert!(stdout.contains("foo:alias"));
    }

    #[tokio::test]
    async fn test_version_flags() {
        let (_dir, mut runner, captured) = fixture(not_found_hook(HookSignal::Continue));
        runner.run(&argv(&["-v"])).await.unwrap();
        assert!(captured.stdout().contains("mycli/1.2.3 "));
    }

    #[tokio::test]
    async fn test_not_found_lists_nearest_topic() {
        let (_dir, mut runner, captured) = fixture(not_found_hook(HookSignal::Continue));
        let terminator = Arc::new(RecordingTerminator::new());
        let code = runner.execute(&argv(&["foo:nope"]), terminator.clone()).await;

        assert_eq!(code, 2);
        assert_eq!(terminator.codes(), vec![2]);
        let stderr = captured.stderr();
        assert!(stderr.starts_with("foo topic description\n"));
        assert!(stderr.contains("foo:bar"));
        assert!(stderr.ends_with("Error: command foo:nope not found\n"));
    }

    #[tokio::test]
    async fn test_not_found_handled_by_hook() {
        let (_dir, mut runner, captured) = fixture(not_found_hook(HookSignal::Stop));
        runner.run(&argv(&["nope"])).await.unwrap();
        assert!(captured.stderr().is_empty());
    }

    #[tokio::test]
    async fn test_topic_invocation_lists_on_stdout() {
        let (_dir, mut runner, captured) = fixture(not_found_hook(HookSignal::Continue));
        runner.run(&argv(&["foo"])).await.unwrap();
        assert!(captured.stdout().contains("COMMANDS\n"));
        assert!(captured.stderr().is_empty());
    }

    #[tokio::test]
    async fn test_generic_failure_exit_code() {
        let (_dir, mut runner, captured) = fixture(not_found_hook(HookSignal::Continue));
        let code = runner
            .execute(&argv(&["foo:fail"]), Arc::new(RecordingTerminator::new()))
            .await;
        assert_eq!(code, 1);
        assert_eq!(captured.stderr(), "foo bar baz\n");
    }

    #[tokio::test]
    async fn test_parse_failure_shows_usage() {
        let (_dir, mut runner, captured) = fixture(not_found_hook(HookSignal::Continue));
        let code = runner
            .execute(&argv(&["foo:parse", "x"]), Arc::new(RecordingTerminator::new()))
            .await;
        assert_eq!(code, 1);
        let stderr = captured.stderr();
        assert!(stderr.starts_with("USAGE\n  $ mycli foo:parse"));
        assert!(stderr.ends_with("Unexpected argument: x\n"));
    }

    #[tokio::test]
    async fn test_failing_hook_fails_invocation() {
        let loader = StaticLoader::new().with_hook(
            "mycli",
            "hooks/not-found",
            FnHook::new(|_, _| Err(HookFailure::new("listener broke"))),
        );
        let (_dir, mut runner, _captured) = fixture(loader);
        let err = runner.run(&argv(&["nope"])).await.unwrap_err();
        assert!(err.to_string().contains("listener broke"), "{err}");
    }

    #[test]
    fn test_strip_help_flag_stops_at_double_dash() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cliff-plugin.toml"), DESCRIPTOR).unwrap();
        let env = Environment::load(
            Path::new(dir.path()),
            EnvironmentOptions::new(Arc::new(StaticLoader::new()))
                .with_settings(Settings::default())
                .with_streams(Streams::capture().0),
        )
        .unwrap();
        let runner = Runner::new(env);

        assert_eq!(
            runner.strip_help_flag(&argv(&["foo", "-h", "x"])),
            Some(argv(&["foo", "x"]))
        );
        assert_eq!(runner.strip_help_flag(&argv(&["foo", "--", "--help"])), None);
    }
}
