//! Single strategy: the target is the CLI's only command, with the root id.

use super::CommandDiscovery;
use crate::command::TargetRef;

/// Id of the root command.
const ROOT_ID: &str = "";

pub(super) fn target(plugin: &str, discovery: &CommandDiscovery) -> Vec<(String, TargetRef)> {
    vec![(
        ROOT_ID.to_string(),
        TargetRef::new(plugin, &discovery.target, None),
    )]
}
