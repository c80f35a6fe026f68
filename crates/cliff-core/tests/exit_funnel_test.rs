//! Every way a command can end, through the runner and the exit funnel.

mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use cliff_core::config::Settings;
use cliff_core::errors::MARKER;
use cliff_core::loaders::{FnCommand, StaticLoader};
use cliff_core::streams::CapturedOutput;
use cliff_core::{
    ArgMeta, CliError, CommandMeta, Failure, FlagMeta, RecordingTerminator, RuntimeError, Runner,
};

use common::{argv, isolated_settings, load_env, touch, write_descriptor};

const COMMANDS: &[&str] = &[
    "structured",
    "structured-zero",
    "structured-big",
    "generic",
    "directive",
    "directive-big",
    "parse",
    "interrupted",
    "quiet",
    "chained",
];

fn failing_commands() -> StaticLoader {
    let parse_meta = CommandMeta {
        description: Some("takes one thing".to_string()),
        args: vec![ArgMeta {
            name: "thing".to_string(),
            description: Some("what to take".to_string()),
            required: true,
        }],
        flags: vec![FlagMeta {
            name: "force".to_string(),
            short: Some('f'),
            description: None,
        }],
        ..CommandMeta::default()
    };

    StaticLoader::new()
        .with_command(
            "mycli",
            "commands/structured.sh",
            FnCommand::new(|_, _| Err(Failure::cli("uh oh!"))),
        )
        .with_command(
            "mycli",
            "commands/structured-zero.sh",
            FnCommand::new(|_, _| Err(CliError::new("nothing to do").with_exit(0).into())),
        )
        .with_command(
            "mycli",
            "commands/structured-big.sh",
            FnCommand::new(|_, _| Err(CliError::new("way off").with_exit(9999).into())),
        )
        .with_command(
            "mycli",
            "commands/generic.sh",
            FnCommand::new(|_, _| Err(Failure::msg("foo bar baz"))),
        )
        .with_command(
            "mycli",
            "commands/directive.sh",
            FnCommand::new(|_, _| Err(Failure::exit(0))),
        )
        .with_command(
            "mycli",
            "commands/directive-big.sh",
            FnCommand::new(|_, _| Err(Failure::exit(9000))),
        )
        .with_command(
            "mycli",
            "commands/parse.sh",
            FnCommand::new(|_, _| Err(Failure::parse("Missing 1 required arg: thing")))
                .with_meta(parse_meta),
        )
        .with_command(
            "mycli",
            "commands/interrupted.sh",
            FnCommand::new(|_, _| Err(Failure::interrupted())),
        )
        .with_command(
            "mycli",
            "commands/quiet.sh",
            FnCommand::new(|_, _| {
                Err(RuntimeError::new(anyhow::anyhow!("already reported"))
                    .with_exit(3)
                    .skip_handling()
                    .into())
            }),
        )
        .with_command(
            "mycli",
            "commands/chained.sh",
            FnCommand::new(|_, _| {
                let inner: Result<(), std::io::Error> = Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "config.toml missing",
                ));
                inner.context("failed to read config")?;
                Ok(())
            }),
        )
}

fn create_tree(base: &Path, extra: &str) {
    write_descriptor(base, "mycli", &format!("commands = \"commands\"\n{extra}"));
    for id in COMMANDS {
        touch(base, &format!("commands/{id}.sh"));
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    runner: Runner,
    captured: CapturedOutput,
}

impl Harness {
    fn new(extra: &str, settings: impl FnOnce(&Path) -> Settings) -> Self {
        let dir = tempfile::tempdir().unwrap();
        create_tree(dir.path(), extra);
        let settings = settings(dir.path());
        let (env, captured) = load_env(dir.path(), failing_commands(), settings);
        Self {
            _dir: dir,
            runner: Runner::new(env),
            captured,
        }
    }

    fn plain() -> Self {
        Self::new("", |dir| isolated_settings(&dir.join("data")))
    }

    /// Run `id` and return the exit code handed to the terminator.
    async fn exit_code(&mut self, id: &str) -> i32 {
        let terminator = Arc::new(RecordingTerminator::new());
        let returned = self.runner.execute(&argv(&[id]), terminator.clone()).await;
        assert_eq!(terminator.codes(), vec![returned], "terminated exactly once");
        returned
    }
}

#[tokio::test]
async fn test_structured_error_exit_and_output() {
    let mut harness = Harness::plain();
    assert_eq!(harness.exit_code("structured").await, 2);
    assert_eq!(harness.captured.stderr(), format!(" {MARKER}   Error: uh oh!\n"));
    assert!(harness.captured.stdout().is_empty());
}

#[tokio::test]
async fn test_structured_error_explicit_exit() {
    let mut harness = Harness::plain();
    assert_eq!(harness.exit_code("structured-zero").await, 0);
    assert!(harness.captured.stderr().contains("Error: nothing to do"));

    let mut harness = Harness::plain();
    assert_eq!(harness.exit_code("structured-big").await, 9999);
    assert!(harness.captured.stderr().contains("Error: way off"));
}

#[tokio::test]
async fn test_generic_error_exit_and_output() {
    let mut harness = Harness::plain();
    assert_eq!(harness.exit_code("generic").await, 1);
    assert!(harness.captured.stderr().contains("foo bar baz"));
    assert!(harness.captured.stdout().is_empty());
}

#[tokio::test]
async fn test_exit_directive_is_silent() {
    let mut harness = Harness::plain();
    assert_eq!(harness.exit_code("directive").await, 0);
    assert!(harness.captured.stdout().is_empty());
    assert!(harness.captured.stderr().is_empty());

    let mut harness = Harness::plain();
    assert_eq!(harness.exit_code("directive-big").await, 9000);
    assert!(harness.captured.stderr().is_empty());
}

#[tokio::test]
async fn test_parse_failure_shows_usage_sections() {
    let mut harness = Harness::plain();
    assert_eq!(harness.exit_code("parse").await, 1);

    let stderr = harness.captured.stderr();
    assert_eq!(
        stderr,
        "USAGE\n  $ mycli parse THING [FLAGS]\n\n\
         ARGUMENTS\n  THING  what to take\n\n\
         FLAGS\n  -f, --force\n\n\
         Missing 1 required arg: thing\n"
    );
    assert!(!stderr.contains("takes one thing"));
}

#[tokio::test]
async fn test_descriptor_exit_codes_apply() {
    let mut harness = Harness::new(
        "[exit-codes]\ndefault = 7\nfailed-flag-parsing = 64\n",
        |dir| isolated_settings(&dir.join("data")),
    );
    assert_eq!(harness.exit_code("parse").await, 64);
    assert_eq!(harness.exit_code("generic").await, 7);
    // Structured errors keep their own default.
    assert_eq!(harness.exit_code("structured").await, 2);
}

#[tokio::test]
async fn test_interrupt_and_suppressed_errors_are_silent() {
    let mut harness = Harness::plain();
    assert_eq!(harness.exit_code("interrupted").await, 1);
    assert_eq!(harness.exit_code("quiet").await, 3);
    assert!(harness.captured.stderr().is_empty());
}

#[tokio::test]
async fn test_debug_shows_error_chain() {
    let mut harness = Harness::plain();
    assert_eq!(harness.exit_code("chained").await, 1);
    assert_eq!(harness.captured.stderr(), "failed to read config\n");

    let mut harness = Harness::new("", |dir| Settings {
        debug: true,
        ..isolated_settings(&dir.join("data"))
    });
    assert_eq!(harness.exit_code("chained").await, 1);
    let stderr = harness.captured.stderr();
    assert!(stderr.starts_with("failed to read config"), "stderr: {stderr}");
    assert!(stderr.contains("Caused by:"));
    assert!(stderr.contains("config.toml missing"));
}

#[tokio::test]
async fn test_error_log_records_failures() {
    let log_dir = tempfile::tempdir().unwrap();
    let log = log_dir.path().join("error.log");
    let log_path = log.display().to_string();

    let mut harness = Harness::new("", |dir| Settings {
        error_log: Some(log_path.clone()),
        ..isolated_settings(&dir.join("data"))
    });
    harness.exit_code("structured").await;
    harness.exit_code("generic").await;
    harness.exit_code("directive").await;

    let contents = fs::read_to_string(&log).unwrap();
    let entries: Vec<&str> = contents.lines().filter(|l| l.starts_with('[')).collect();
    assert_eq!(entries.len(), 2, "log: {contents}");
    assert!(entries[0].ends_with("] uh oh!"));
    assert!(entries[1].starts_with('[') && entries[1].contains("] foo bar baz"));
}

#[tokio::test]
async fn test_success_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    create_tree(dir.path(), "");
    touch(dir.path(), "commands/ok.sh");
    let loader = failing_commands().with_command(
        "mycli",
        "commands/ok.sh",
        FnCommand::new(|ctx, argv| {
            ctx.log(format!("ok {}", argv.join(" ")));
            Ok(())
        }),
    );
    let (env, captured) = load_env(dir.path(), loader, isolated_settings(&dir.path().join("data")));
    let mut runner = Runner::new(env);

    let terminator = Arc::new(RecordingTerminator::new());
    let code = runner
        .execute(&argv(&["ok", "a", "b"]), terminator.clone())
        .await;
    assert_eq!(code, 0);
    assert_eq!(terminator.last(), Some(0));
    assert_eq!(captured.stdout(), "ok a b\n");
}
