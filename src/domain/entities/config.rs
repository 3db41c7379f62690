use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::command::{CommandOverride, CommandVerb};
use super::registry::Registry;

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Command line used by `edit` and `config edit`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,

    /// Command line used by `ui`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitui: Option<String>,

    /// Worker pool size for dispatching
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub commands: BTreeMap<String, CommandOverride>,

    #[serde(default)]
    pub repositories: Registry,
}

impl Config {
    /// Override for a verb, if the file has one.
    pub fn command_override(&self, name: &str) -> Option<&CommandOverride> {
        self.commands.get(name)
    }

    /// `[commands.*]` keys that do not name a known verb.
    pub fn unknown_command_names(&self) -> Vec<&str> {
        self.commands
            .keys()
            .map(String::as_str)
            .filter(|name| !CommandVerb::is_configurable(name))
            .collect()
    }
}
