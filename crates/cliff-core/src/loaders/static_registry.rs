//! In-process implementations keyed by target reference.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::command::{Command, CommandLoader, CommandMeta, Hook, LoadError, RunContext, TargetRef};
use crate::errors::Failure;
use crate::hooks::{HookContext, HookFailure, HookSignal};

/// Table of commands and hooks compiled into the binary.
///
/// Keys are [`TargetRef::key`] values, so the same path may be registered for
/// several plugins without clashing.
#[derive(Debug, Default, Clone)]
pub struct StaticLoader {
    commands: BTreeMap<String, Arc<dyn Command>>,
    hooks: BTreeMap<String, Arc<dyn Hook>>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command for `plugin` at `reference` (`path[#Export]`).
    #[must_use]
    pub fn with_command(
        mut self,
        plugin: &str,
        reference: &str,
        command: impl Command + 'static,
    ) -> Self {
        self.register_command(plugin, reference, Arc::new(command));
        self
    }

    #[must_use]
    pub fn with_hook(mut self, plugin: &str, reference: &str, hook: impl Hook + 'static) -> Self {
        self.register_hook(plugin, reference, Arc::new(hook));
        self
    }

    pub fn register_command(&mut self, plugin: &str, reference: &str, command: Arc<dyn Command>) {
        self.commands
            .insert(TargetRef::parse(plugin, reference).key(), command);
    }

    pub fn register_hook(&mut self, plugin: &str, reference: &str, hook: Arc<dyn Hook>) {
        self.hooks
            .insert(TargetRef::parse(plugin, reference).key(), hook);
    }

    pub fn len(&self) -> usize {
        self.commands.len() + self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CommandLoader for StaticLoader {
    fn load_command(
        &self,
        reference: &TargetRef,
        _plugin_root: &Path,
    ) -> Result<Arc<dyn Command>, LoadError> {
        let key = reference.key();
        self.commands
            .get(&key)
            .cloned()
            .ok_or(LoadError::NotFound {
                kind: "command",
                reference: key,
            })
    }

    fn load_hook(
        &self,
        reference: &TargetRef,
        _plugin_root: &Path,
    ) -> Result<Arc<dyn Hook>, LoadError> {
        let key = reference.key();
        self.hooks.get(&key).cloned().ok_or(LoadError::NotFound {
            kind: "hook",
            reference: key,
        })
    }
}

type CommandFn = dyn Fn(&mut RunContext, &[String]) -> Result<(), Failure> + Send + Sync;
type HookFn = dyn Fn(&mut HookContext, &Value) -> Result<HookSignal, HookFailure> + Send + Sync;

/// A command backed by a closure.
#[derive(Clone)]
pub struct FnCommand {
    meta: CommandMeta,
    run: Arc<CommandFn>,
}

impl FnCommand {
    pub fn new<F>(run: F) -> Self
    where
        F: Fn(&mut RunContext, &[String]) -> Result<(), Failure> + Send + Sync + 'static,
    {
        Self {
            meta: CommandMeta::default(),
            run: Arc::new(run),
        }
    }

    #[must_use]
    pub fn with_meta(mut self, meta: CommandMeta) -> Self {
        self.meta = meta;
        self
    }
}

impl fmt::Debug for FnCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCommand")
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Command for FnCommand {
    fn meta(&self) -> CommandMeta {
        self.meta.clone()
    }

    async fn run(&self, ctx: &mut RunContext, argv: &[String]) -> Result<(), Failure> {
        (self.run)(ctx, argv)
    }
}

/// A hook listener backed by a closure.
#[derive(Clone)]
pub struct FnHook {
    call: Arc<HookFn>,
}

impl FnHook {
    pub fn new<F>(call: F) -> Self
    where
        F: Fn(&mut HookContext, &Value) -> Result<HookSignal, HookFailure> + Send + Sync + 'static,
    {
        Self {
            call: Arc::new(call),
        }
    }
}

impl fmt::Debug for FnHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHook").finish_non_exhaustive()
    }
}

#[async_trait]
impl Hook for FnHook {
    async fn call(&self, ctx: &mut HookContext, input: &Value) -> Result<HookSignal, HookFailure> {
        (self.call)(ctx, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streams::Streams;
    use crate::topics::Separator;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_registered_command_runs() {
        let loader = StaticLoader::new().with_command(
            "p",
            "./hello.rs#Hello",
            FnCommand::new(|ctx, argv| {
                ctx.log(format!("hello {}", argv.join(" ")));
                Ok(())
            }),
        );
        assert_eq!(loader.len(), 1);

        let command = loader
            .load_command(&TargetRef::parse("p", "hello.rs#Hello"), Path::new("/p"))
            .unwrap();
        let (streams, captured) = Streams::capture();
        let mut ctx = RunContext {
            bin: "mycli".to_string(),
            id: "hello".to_string(),
            separator: Separator::Colon,
            plugin_root: PathBuf::from("/p"),
            streams,
            debug: false,
        };
        command.run(&mut ctx, &["world".to_string()]).await.unwrap();
        assert_eq!(captured.stdout(), "hello world\n");
    }

    #[test]
    fn test_plugins_do_not_share_targets() {
        let loader = StaticLoader::new().with_hook(
            "a",
            "init.sh",
            FnHook::new(|_, _| Ok(HookSignal::Continue)),
        );
        let root = Path::new("/p");
        assert!(loader
            .load_hook(&TargetRef::new("a", "init.sh", None), root)
            .is_ok());
        let err = loader
            .load_hook(&TargetRef::new("b", "init.sh", None), root)
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(loader
            .load_command(&TargetRef::new("a", "init.sh", None), root)
            .is_err());
    }
}
