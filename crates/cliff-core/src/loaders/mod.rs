//! [`CommandLoader`] back-ends.
//!
//! - [`StaticLoader`]: implementations registered in-process, keyed by target.
//! - [`ProcessLoader`]: targets are executables below the plugin root.
//! - [`ChainLoader`]: the first loader that knows a target wins.

mod process;
mod static_registry;

pub use process::{ProcessLoader, ENV_PREFIX, HOOK_FATAL_EXIT, HOOK_STOP_EXIT};
pub use static_registry::{FnCommand, FnHook, StaticLoader};

use std::path::Path;
use std::sync::Arc;

use crate::command::{Command, CommandLoader, Hook, LoadError, TargetRef};

#[derive(Debug, Default)]
pub struct ChainLoader {
    loaders: Vec<Arc<dyn CommandLoader>>,
}

impl ChainLoader {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, loader: Arc<dyn CommandLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    fn first<T>(
        &self,
        kind: &'static str,
        reference: &TargetRef,
        load: impl Fn(&dyn CommandLoader) -> Result<T, LoadError>,
    ) -> Result<T, LoadError> {
        for loader in &self.loaders {
            match load(loader.as_ref()) {
                Err(e) if e.is_not_found() => continue,
                other => return other,
            }
        }
        Err(LoadError::NotFound {
            kind,
            reference: reference.key(),
        })
    }
}

impl CommandLoader for ChainLoader {
    fn load_command(
        &self,
        reference: &TargetRef,
        plugin_root: &Path,
    ) -> Result<Arc<dyn Command>, LoadError> {
        self.first("command", reference, |l| l.load_command(reference, plugin_root))
    }

    fn load_hook(
        &self,
        reference: &TargetRef,
        plugin_root: &Path,
    ) -> Result<Arc<dyn Hook>, LoadError> {
        self.first("hook", reference, |l| l.load_hook(reference, plugin_root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandMeta, RunContext};
    use crate::errors::Failure;

    fn described(description: &str) -> FnCommand {
        FnCommand::new(|_ctx: &mut RunContext, _argv: &[String]| -> Result<(), Failure> { Ok(()) })
            .with_meta(CommandMeta {
                description: Some(description.to_string()),
                ..Default::default()
            })
    }

    #[test]
    fn test_chain_prefers_earlier_loaders() {
        let first = StaticLoader::new().with_command("p", "hello.sh", described("first"));
        let second = StaticLoader::new()
            .with_command("p", "hello.sh", described("second"))
            .with_command("p", "other.sh", described("other"));
        let chain = ChainLoader::new()
            .with(Arc::new(first))
            .with(Arc::new(second));

        let root = Path::new("/plugins/p");
        let hello = chain
            .load_command(&TargetRef::new("p", "hello.sh", None), root)
            .unwrap();
        assert_eq!(hello.meta().description.as_deref(), Some("first"));
        let other = chain
            .load_command(&TargetRef::new("p", "other.sh", None), root)
            .unwrap();
        assert_eq!(other.meta().description.as_deref(), Some("other"));
    }

    #[test]
    fn test_chain_reports_not_found() {
        let chain = ChainLoader::new().with(Arc::new(StaticLoader::new()));
        let err = chain
            .load_hook(&TargetRef::new("p", "missing.sh", None), Path::new("/p"))
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("p::missing.sh"));
    }
}
