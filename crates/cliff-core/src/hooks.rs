//! Lifecycle hook dispatch.
//!
//! Registrations are flattened once into `(plugin, hook, target)` entries in
//! plugin load order, then declaration order. A dispatch round walks that list
//! sequentially; nothing runs concurrently.
//!
//! Listener failures are isolated: a non-fatal failure is recorded and the
//! round carries on, and the recorded failures are raised together as
//! [`DispatchError::Composite`] once the round is over. A fatal failure ends
//! the round immediately.

use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::command::{CommandLoader, TargetRef};
use crate::plugins::Plugin;
use crate::streams::Streams;

/// Hook names fired by the runner.
pub mod names {
    pub const INIT: &str = "init";
    pub const PRERUN: &str = "prerun";
    pub const POSTRUN: &str = "postrun";
    pub const COMMAND_NOT_FOUND: &str = "command_not_found";
    pub const JIT_PLUGIN_NOT_INSTALLED: &str = "jit_plugin_not_installed";
    pub const FINALLY: &str = "finally";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookRegistration {
    pub plugin: String,
    pub hook: String,
    pub target: TargetRef,
    /// Root of the declaring plugin, handed to the loader.
    pub root: PathBuf,
}

/// What a listener asks the dispatcher to do next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HookSignal {
    #[default]
    Continue,
    /// No further listeners run in this round.
    Stop,
}

/// Failure raised by a single listener.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct HookFailure {
    pub message: String,
    /// Abort the round instead of recording and carrying on.
    pub fatal: bool,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HookFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: false,
            source: None,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            fatal: true,
            ..Self::new(message)
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

/// State shared by every listener of one round.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub hook: String,
    /// Plugin of the listener currently running.
    pub plugin: String,
    pub bin: String,
    pub streams: Streams,
    /// Scratch space listeners may read and write.
    pub data: Map<String, Value>,
}

impl HookContext {
    pub fn new(hook: impl Into<String>, bin: impl Into<String>, streams: Streams) -> Self {
        Self {
            hook: hook.into(),
            plugin: String::new(),
            bin: bin.into(),
            streams,
            data: Map::new(),
        }
    }

    pub fn log(&self, message: impl std::fmt::Display) {
        self.streams.write_stdout(&format!("{message}\n"));
    }
}

/// Outcome of a round that raised no failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookReport {
    /// Listeners that were called.
    pub invoked: usize,
    /// Plugin whose listener stopped the round, if any.
    pub stopped_by: Option<String>,
}

impl HookReport {
    pub fn stopped(&self) -> bool {
        self.stopped_by.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFailure {
    pub plugin: String,
    pub target: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("{hook} hook in plugin {plugin} failed: {failure}")]
    Fatal {
        hook: String,
        plugin: String,
        #[source]
        failure: HookFailure,
    },
    #[error("{}", composite_message(.hook, .failures))]
    Composite {
        hook: String,
        failures: Vec<ListenerFailure>,
    },
}

fn composite_message(hook: &str, failures: &[ListenerFailure]) -> String {
    let details = failures
        .iter()
        .map(|f| format!("{} ({}): {}", f.plugin, f.target, f.message))
        .collect::<Vec<_>>()
        .join("; ");
    format!("{} {hook} hook listener(s) failed: {details}", failures.len())
}

#[derive(Debug, Clone, Default)]
pub struct HookDispatcher {
    registrations: Vec<HookRegistration>,
}

impl HookDispatcher {
    /// Flatten registrations from `plugins`, which must be in load order.
    pub fn build(plugins: &[Plugin]) -> Self {
        let mut registrations = Vec::new();
        for plugin in plugins {
            for (hook, target) in plugin.hook_targets() {
                registrations.push(HookRegistration {
                    plugin: plugin.name.clone(),
                    hook: hook.to_string(),
                    target,
                    root: plugin.root.clone(),
                });
            }
        }
        tracing::debug!(count = registrations.len(), "Built hook registrations");
        Self { registrations }
    }

    /// Registrations for `hook` in dispatch order.
    pub fn listeners<'a>(&'a self, hook: &'a str) -> impl Iterator<Item = &'a HookRegistration> {
        self.registrations.iter().filter(move |r| r.hook == hook)
    }

    pub fn registrations(&self) -> &[HookRegistration] {
        &self.registrations
    }

    /// Run one dispatch round for `hook`.
    pub async fn run(
        &self,
        loader: &dyn CommandLoader,
        hook: &str,
        ctx: &mut HookContext,
        input: &Value,
    ) -> Result<HookReport, DispatchError> {
        let mut report = HookReport::default();
        let mut failures = Vec::new();
        ctx.hook = hook.to_string();

        for registration in self.listeners(hook) {
            let listener = match loader.load_hook(&registration.target, &registration.root) {
                Ok(listener) => listener,
                Err(e) => {
                    tracing::warn!(plugin = %registration.plugin, hook, target = %registration.target, error = %e, "Hook listener failed to load");
                    failures.push(ListenerFailure {
                        plugin: registration.plugin.clone(),
                        target: registration.target.to_string(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            ctx.plugin.clone_from(&registration.plugin);
            report.invoked += 1;
            tracing::debug!(plugin = %registration.plugin, hook, target = %registration.target, "Calling hook listener");

            match listener.call(ctx, input).await {
                Ok(HookSignal::Continue) => {}
                Ok(HookSignal::Stop) => {
                    tracing::debug!(plugin = %registration.plugin, hook, "Hook listener stopped the round");
                    report.stopped_by = Some(registration.plugin.clone());
                    break;
                }
                Err(failure) if failure.fatal => {
                    return Err(DispatchError::Fatal {
                        hook: hook.to_string(),
                        plugin: registration.plugin.clone(),
                        failure,
                    });
                }
                Err(failure) => {
                    tracing::warn!(plugin = %registration.plugin, hook, error = %failure, "Hook listener failed");
                    failures.push(ListenerFailure {
                        plugin: registration.plugin.clone(),
                        target: registration.target.to_string(),
                        message: failure.message,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(DispatchError::Composite {
                hook: hook.to_string(),
                failures,
            })
        }
    }
}
