//! The per-invocation environment.
//!
//! One value holds everything resolution, dispatch, and error handling need:
//! the ordered plugin set, the merged registry and topic tree derived from it,
//! the hook dispatcher, the theme, and the capabilities used to load targets
//! and install plugins. It is built once and passed down explicitly.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::command::{Command, CommandLoader};
use crate::config::{load_settings, Settings};
use crate::descriptor::{DescriptorError, PluginDescriptor};
use crate::errors::{ClassifyOptions, DEFAULT_EXIT};
use crate::exit::{ExitFunnel, Terminator};
use crate::help::{HelpRenderer, PlainHelp};
use crate::hooks::{DispatchError, HookContext, HookDispatcher, HookReport};
use crate::plugins::{DataDirInstaller, Plugin, PluginError, PluginInstaller, PluginSet, PluginType};
use crate::registry::{CommandEntry, CommandRegistry};
use crate::resolver::{DefaultCommands, Resolution, Resolver};
use crate::streams::Streams;
use crate::theme::Theme;
use crate::topics::{Separator, TopicListing, TopicTree, CANONICAL_SEPARATOR};

/// How to build an [`Environment`].
#[derive(Debug, Clone)]
pub struct EnvironmentOptions {
    /// Settings to use; discovered from disk for the root's bin when unset.
    pub settings: Option<Settings>,
    pub loader: Arc<dyn CommandLoader>,
    /// JIT installer; a [`DataDirInstaller`] over the data directory when unset.
    pub installer: Option<Arc<dyn PluginInstaller>>,
    pub streams: Streams,
}

impl EnvironmentOptions {
    pub fn new(loader: Arc<dyn CommandLoader>) -> Self {
        Self {
            settings: None,
            loader,
            installer: None,
            streams: Streams::terminal(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    #[must_use]
    pub fn with_installer(mut self, installer: Arc<dyn PluginInstaller>) -> Self {
        self.installer = Some(installer);
        self
    }

    #[must_use]
    pub fn with_streams(mut self, streams: Streams) -> Self {
        self.streams = streams;
        self
    }
}

#[derive(Debug)]
pub struct Environment {
    bin: String,
    version: String,
    root: PathBuf,
    separator: Separator,
    theme: Theme,
    settings: Settings,
    plugins: PluginSet,
    registry: CommandRegistry,
    topics: TopicTree,
    defaults: DefaultCommands,
    hooks: HookDispatcher,
    loader: Arc<dyn CommandLoader>,
    installer: Arc<dyn PluginInstaller>,
    streams: Streams,
}

impl Environment {
    /// Load the root plugin at `root` and everything it pulls in.
    pub fn load(root: &Path, options: EnvironmentOptions) -> Result<Self, EnvironmentError> {
        let settings = match options.settings {
            Some(settings) => settings,
            None => load_settings(PluginDescriptor::load(root)?.bin()),
        };

        let plugins = PluginSet::load(root, &settings, options.loader.as_ref())?;
        let root_plugin = plugins.root();
        let bin = root_plugin.descriptor.bin().to_string();
        let version = root_plugin.version.clone();
        let separator = root_plugin.descriptor.topic_separator;
        let root = root_plugin.root.clone();
        let theme = load_theme(root_plugin);

        let installer = options.installer.unwrap_or_else(|| {
            Arc::new(DataDirInstaller::new(settings.plugin_search_paths(&bin)))
        });

        let mut env = Self {
            bin,
            version,
            root,
            separator,
            theme,
            settings,
            plugins,
            registry: CommandRegistry::default(),
            topics: TopicTree::default(),
            defaults: DefaultCommands::default(),
            hooks: HookDispatcher::default(),
            loader: options.loader,
            installer,
            streams: options.streams,
        };
        env.rebuild();

        tracing::debug!(
            bin = %env.bin,
            plugins = env.plugins.len(),
            commands = env.registry.len(),
            topics = env.topics.len(),
            "Environment loaded"
        );
        Ok(env)
    }

    fn rebuild(&mut self) {
        let plugins = self.plugins.as_slice();
        self.registry = CommandRegistry::build(plugins);
        self.topics = TopicTree::build(plugins, &self.registry);
        self.defaults = DefaultCommands::build(plugins, &self.registry);
        self.hooks = HookDispatcher::build(plugins);
    }

    pub fn bin(&self) -> &str {
        &self.bin
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn separator(&self) -> Separator {
        self.separator
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn plugins(&self) -> &PluginSet {
        &self.plugins
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn topics(&self) -> &TopicTree {
        &self.topics
    }

    /// Default command per topic, from every plugin's `default-command`.
    pub fn default_commands(&self) -> &DefaultCommands {
        &self.defaults
    }

    pub fn hooks(&self) -> &HookDispatcher {
        &self.hooks
    }

    pub fn streams(&self) -> &Streams {
        &self.streams
    }

    pub fn root_descriptor(&self) -> &PluginDescriptor {
        &self.plugins.root().descriptor
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.registry, &self.topics, self.separator, &self.defaults)
    }

    pub fn resolve(&self, identifier: &str) -> Resolution {
        self.resolver().resolve(identifier)
    }

    pub fn resolve_argv(&self, argv: &[String]) -> Resolution {
        self.resolver().resolve_argv(argv)
    }

    pub fn command(&self, id: &str) -> Option<&CommandEntry> {
        self.registry.get(id)
    }

    pub fn listing(&self, topic: &str) -> Option<TopicListing> {
        self.topics.listing(topic, &self.registry)
    }

    /// JIT plugin (name, pinned version) that must be loaded before `id` can run.
    ///
    /// Either the registry holds a placeholder entry for `id` owned by an
    /// unloaded JIT plugin, or the first segment of `id` names one.
    pub fn needs_jit(&self, id: &str) -> Option<(String, String)> {
        let jit_plugins = &self.root_descriptor().jit_plugins;
        let name = match self.registry.get(id) {
            Some(entry) if entry.plugin_type == PluginType::Jit => entry.plugin(),
            Some(_) => return None,
            None => id.split(CANONICAL_SEPARATOR).next().unwrap_or(id),
        };
        if self.plugins.is_loaded(name) {
            return None;
        }
        jit_plugins
            .get(name)
            .map(|version| (name.to_string(), version.clone()))
    }

    /// Install and load a JIT plugin, then rebuild everything derived from
    /// the plugin list.
    ///
    /// Loading a plugin that is already loaded is a no-op.
    pub async fn load_jit_plugin(&mut self, name: &str, version: &str) -> Result<(), EnvironmentError> {
        if self.plugins.is_loaded(name) {
            return Ok(());
        }
        let path = self
            .installer
            .install(name, version)
            .await
            .map_err(PluginError::from)?;
        self.plugins.add(
            &path,
            PluginType::Jit,
            self.settings.use_manifest,
            self.loader.as_ref(),
        )?;
        self.rebuild();
        tracing::debug!(plugin = name, version, "Loaded JIT plugin");
        Ok(())
    }

    /// Load the implementation behind a registry entry.
    pub fn load_command(&self, entry: &CommandEntry) -> Result<Arc<dyn Command>, EnvironmentError> {
        let plugin = self
            .plugins
            .get(entry.plugin())
            .ok_or_else(|| EnvironmentError::PluginNotLoaded {
                plugin: entry.plugin().to_string(),
                id: entry.id.clone(),
            })?;
        Ok(self.loader.load_command(&entry.target, &plugin.root)?)
    }

    /// Root directory of the plugin that owns `entry`.
    pub fn plugin_root(&self, entry: &CommandEntry) -> PathBuf {
        self.plugins
            .get(entry.plugin())
            .map_or_else(|| self.root.clone(), |p| p.root.clone())
    }

    /// Fire `hook` across every plugin.
    pub async fn run_hook(&self, hook: &str, input: &Value) -> Result<HookReport, DispatchError> {
        let mut ctx = HookContext::new(hook, &self.bin, self.streams.clone());
        self.hooks
            .run(self.loader.as_ref(), hook, &mut ctx, input)
            .await
    }

    pub fn help(&self) -> Arc<dyn HelpRenderer> {
        Arc::new(PlainHelp::new(&self.bin, self.separator, self.theme.clone()))
    }

    /// Exit-code policy from the root descriptor plus the debug setting.
    pub fn classify_options(&self) -> ClassifyOptions {
        let codes = self.root_descriptor().exit_codes;
        ClassifyOptions {
            default_exit: codes.default.unwrap_or(DEFAULT_EXIT),
            failed_flag_parsing: codes.failed_flag_parsing,
            debug: self.settings.debug,
        }
    }

    pub fn exit_funnel(&self, terminator: Arc<dyn Terminator>) -> ExitFunnel {
        ExitFunnel::new(
            self.streams.clone(),
            terminator,
            self.help(),
            self.classify_options(),
        )
        .with_error_log(self.settings.error_log())
    }
}

fn load_theme(root: &Plugin) -> Theme {
    let Some(file) = &root.descriptor.theme else {
        return Theme::default();
    };
    match Theme::load(&root.root.join(file)) {
        Ok(theme) => theme,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring theme that failed to load");
            Theme::default()
        }
    }
}

/// Errors that can occur while building or extending an environment.
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error(transparent)]
    Load(#[from] crate::command::LoadError),
    #[error("command {id} belongs to plugin {plugin}, which is not loaded")]
    PluginNotLoaded { plugin: String, id: String },
}
